//! Binary container for the fingerprint database
//!
//! Self-describing little-endian layout, readable as one sequential stream:
//!
//! ```text
//! magic:  8 bytes  "AFP\0v001"
//! num_tracks: u32
//!   per track: track_id u32, name_len u16, name utf-8, fp_count u32
//! num_addresses: u32
//!   per address: address u64, posting_count u32,
//!                postings [(track_id u32, t_anchor u32)]
//! ```
//!
//! The version tag in the magic pins the address width (v001 = u64) and the
//! address bit layout. Readers cross-check the stream: unknown track
//! references, per-track posting totals that disagree with the declared
//! counts, duplicate ids or addresses, and trailing bytes all fail as
//! corruption, so a partially written or damaged file never loads.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::error::EngineError;
use crate::store::{Posting, Track};

/// File magic: format name plus version tag
pub const MAGIC: [u8; 8] = *b"AFP\0v001";

/// Serialize tracks and index into a writer
///
/// Addresses are written in ascending order so equal stores produce
/// byte-identical files.
pub(crate) fn write_store<W: Write>(
    writer: &mut W,
    tracks: &[Track],
    index: &HashMap<u64, Vec<Posting>>,
) -> io::Result<()> {
    writer.write_all(&MAGIC)?;

    writer.write_all(&(tracks.len() as u32).to_le_bytes())?;
    for track in tracks {
        writer.write_all(&track.id.to_le_bytes())?;
        let name = track.name.as_bytes();
        writer.write_all(&(name.len() as u16).to_le_bytes())?;
        writer.write_all(name)?;
        writer.write_all(&track.fingerprint_count.to_le_bytes())?;
    }

    let mut addresses: Vec<u64> = index.keys().copied().collect();
    addresses.sort_unstable();

    writer.write_all(&(addresses.len() as u32).to_le_bytes())?;
    for address in addresses {
        let postings = &index[&address];
        writer.write_all(&address.to_le_bytes())?;
        writer.write_all(&(postings.len() as u32).to_le_bytes())?;
        for posting in postings {
            writer.write_all(&posting.track_id.to_le_bytes())?;
            writer.write_all(&posting.anchor.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Deserialize tracks and index from a reader
///
/// # Errors
///
/// `EngineError::IndexCorrupt` for structural failures (bad magic,
/// truncation, invalid UTF-8, inconsistent counts, trailing bytes),
/// `EngineError::IndexIo` for underlying read failures.
pub(crate) fn read_store<R: Read>(
    reader: &mut R,
) -> Result<(Vec<Track>, HashMap<u64, Vec<Posting>>), EngineError> {
    let mut magic = [0u8; 8];
    read_exact(reader, &mut magic)?;
    if magic != MAGIC {
        return Err(EngineError::IndexCorrupt(format!(
            "bad magic {:02x?}",
            magic
        )));
    }

    let num_tracks = read_u32(reader)?;
    let mut tracks = Vec::with_capacity(num_tracks.min(1024) as usize);
    for _ in 0..num_tracks {
        let id = read_u32(reader)?;
        let name_len = read_u16(reader)? as usize;
        let mut name_bytes = vec![0u8; name_len];
        read_exact(reader, &mut name_bytes)?;
        let name = String::from_utf8(name_bytes)
            .map_err(|_| EngineError::IndexCorrupt("track name is not UTF-8".to_string()))?;
        let fingerprint_count = read_u32(reader)?;
        if tracks.iter().any(|t: &Track| t.id == id) {
            return Err(EngineError::IndexCorrupt(format!(
                "duplicate track id {}",
                id
            )));
        }
        tracks.push(Track {
            id,
            name,
            fingerprint_count,
        });
    }

    let num_addresses = read_u32(reader)?;
    let mut index: HashMap<u64, Vec<Posting>> =
        HashMap::with_capacity(num_addresses.min(1 << 20) as usize);
    let mut postings_per_track: HashMap<u32, u64> = HashMap::new();

    for _ in 0..num_addresses {
        let address = read_u64(reader)?;
        let posting_count = read_u32(reader)?;
        let mut postings = Vec::with_capacity(posting_count.min(1024) as usize);
        for _ in 0..posting_count {
            let track_id = read_u32(reader)?;
            let anchor = read_u32(reader)?;
            if !tracks.iter().any(|t| t.id == track_id) {
                return Err(EngineError::IndexCorrupt(format!(
                    "posting references unknown track id {}",
                    track_id
                )));
            }
            *postings_per_track.entry(track_id).or_insert(0) += 1;
            postings.push(Posting { track_id, anchor });
        }
        if index.insert(address, postings).is_some() {
            return Err(EngineError::IndexCorrupt(format!(
                "duplicate address {:#x}",
                address
            )));
        }
    }

    for track in &tracks {
        let stored = postings_per_track.get(&track.id).copied().unwrap_or(0);
        if stored != track.fingerprint_count as u64 {
            return Err(EngineError::IndexCorrupt(format!(
                "track {} declares {} fingerprints but {} postings found",
                track.id, track.fingerprint_count, stored
            )));
        }
    }

    // The stream must end exactly here.
    let mut probe = [0u8; 1];
    match reader.read(&mut probe) {
        Ok(0) => {}
        Ok(_) => {
            return Err(EngineError::IndexCorrupt(
                "trailing bytes after index".to_string(),
            ))
        }
        Err(err) => return Err(EngineError::IndexIo(err)),
    }

    Ok((tracks, index))
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), EngineError> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            EngineError::IndexCorrupt("truncated file".to_string())
        } else {
            EngineError::IndexIo(err)
        }
    })
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16, EngineError> {
    let mut buf = [0u8; 2];
    read_exact(reader, &mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, EngineError> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64, EngineError> {
    let mut buf = [0u8; 8];
    read_exact(reader, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
