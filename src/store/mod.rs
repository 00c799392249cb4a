//! Persistent fingerprint database
//!
//! An inverted index from fingerprint address to postings - fixed-width
//! `(track_id, t_anchor)` records - plus the track table. The index is
//! mutated only while learning; queries borrow read-only views. `insert` is
//! not called concurrently with `recall`.
//!
//! Persistence uses the explicit binary container in [`format`], saved by
//! atomic replacement: the new file is written to a sibling temporary path
//! and renamed into place, so a crashed save leaves the previous file
//! intact and a partially written file never loads.

pub mod format;

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::features::Fingerprint;

/// A learned recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Stable integer id, unique for the lifetime of the database
    pub id: u32,
    /// Display name; not deduplicated - re-learning a name yields a new id
    pub name: String,
    /// Number of fingerprints stored for this track
    pub fingerprint_count: u32,
}

/// One index entry: a track and the anchor frame the address occurred at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Owning track id
    pub track_id: u32,
    /// Anchor frame index within that track
    pub anchor: u32,
}

/// Inverted fingerprint index with its track table
#[derive(Debug, Default)]
pub struct FingerprintStore {
    tracks: Vec<Track>,
    index: HashMap<u64, Vec<Posting>>,
    next_id: u32,
}

impl FingerprintStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert all fingerprints of a new track
    ///
    /// Every call allocates a fresh id, even for a previously seen name;
    /// callers that want deduplication check [`FingerprintStore::tracks`]
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` when the name does not fit the
    /// on-disk format or the id space is exhausted.
    pub fn insert(&mut self, name: &str, prints: &[Fingerprint]) -> Result<u32, EngineError> {
        if name.len() > u16::MAX as usize {
            return Err(EngineError::InvalidInput(format!(
                "track name of {} bytes exceeds the format limit",
                name.len()
            )));
        }
        if prints.len() > u32::MAX as usize {
            return Err(EngineError::InvalidInput(
                "too many fingerprints for one track".to_string(),
            ));
        }
        let id = self.next_id;
        self.next_id = self.next_id.checked_add(1).ok_or_else(|| {
            EngineError::InvalidInput("track id space exhausted".to_string())
        })?;

        for print in prints {
            self.index
                .entry(print.address)
                .or_default()
                .push(Posting {
                    track_id: id,
                    anchor: print.anchor,
                });
        }
        self.tracks.push(Track {
            id,
            name: name.to_string(),
            fingerprint_count: prints.len() as u32,
        });

        log::debug!(
            "Inserted track {} ({:?}) with {} fingerprints",
            id,
            name,
            prints.len()
        );
        Ok(id)
    }

    /// Postings stored under an address; empty when the address is unknown
    pub fn recall(&self, address: u64) -> &[Posting] {
        self.index
            .get(&address)
            .map(|postings| postings.as_slice())
            .unwrap_or(&[])
    }

    /// All learned tracks in insertion order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    /// Look up one track by id
    pub fn track(&self, id: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Number of learned tracks
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Number of distinct addresses in the index
    pub fn num_addresses(&self) -> usize {
        self.index.len()
    }

    /// Total postings across all addresses
    pub fn num_postings(&self) -> usize {
        self.index.values().map(|p| p.len()).sum()
    }

    /// True when no track has been learned
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// All distinct addresses, in arbitrary order
    pub fn addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.index.keys().copied()
    }

    /// Merge another store with a disjoint track-id set into this one
    ///
    /// Postings are concatenated per address without re-hashing, which is
    /// the contract that lets batch learning shard over tracks and combine
    /// the partitions afterwards.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` when any track id exists in both
    /// stores; this store is left unchanged in that case.
    pub fn merge(&mut self, other: FingerprintStore) -> Result<(), EngineError> {
        let own_ids: HashSet<u32> = self.tracks.iter().map(|t| t.id).collect();
        if let Some(clash) = other.tracks.iter().find(|t| own_ids.contains(&t.id)) {
            return Err(EngineError::InvalidInput(format!(
                "track id {} exists in both stores",
                clash.id
            )));
        }

        for (address, postings) in other.index {
            self.index.entry(address).or_default().extend(postings);
        }
        self.tracks.extend(other.tracks);
        self.next_id = self.next_id.max(other.next_id);
        Ok(())
    }

    /// Save the store to a file by atomic replacement
    ///
    /// Writes to `<path>.tmp`, syncs, then renames over `path`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::IndexIo` on any write failure; the previous
    /// file, if one existed, is untouched.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let mut tmp_os = path.as_os_str().to_os_string();
        tmp_os.push(".tmp");
        let tmp_path = std::path::PathBuf::from(tmp_os);

        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        format::write_store(&mut writer, &self.tracks, &self.index)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        std::fs::rename(&tmp_path, path)?;

        log::debug!(
            "Saved {} tracks / {} addresses to {}",
            self.tracks.len(),
            self.index.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a store from a file
    ///
    /// Streams the file sequentially; no random access is required.
    ///
    /// # Errors
    ///
    /// `EngineError::IndexCorrupt` when the file fails magic or structure
    /// checks, `EngineError::IndexIo` on read failures. Nothing is loaded
    /// partially: on error the caller keeps whatever store it had.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let (tracks, index) = format::read_store(&mut reader)?;
        let next_id = tracks.iter().map(|t| t.id + 1).max().unwrap_or(0);

        log::debug!(
            "Loaded {} tracks / {} addresses from {}",
            tracks.len(),
            index.len(),
            path.display()
        );
        Ok(Self {
            tracks,
            index,
            next_id,
        })
    }
}
