//! Example: build a fingerprint database from WAV files and identify a clip
//!
//! Usage:
//!   teach_and_identify <db> learn <wav> [<wav>...]
//!   teach_and_identify <db> identify <wav>
//!   teach_and_identify <db> list
//!
//! Audio decoding stays outside the engine; this example feeds it mono
//! float samples decoded with hound.

use std::path::Path;

use waveprint::{Engine, EngineConfig, MatchOutcome};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (db, command, files) = match args.as_slice() {
        [db, command, rest @ ..] => (Path::new(db), command.as_str(), rest),
        _ => {
            eprintln!("usage: teach_and_identify <db> learn|identify|list [wav...]");
            std::process::exit(2);
        }
    };

    let config = EngineConfig::default();
    let mut engine = if db.exists() {
        Engine::open(db, config)?
    } else {
        Engine::new(config)?
    };

    match command {
        "learn" => {
            for file in files {
                let (samples, rate) = read_wav_mono(Path::new(file))?;
                let name = Path::new(file)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.clone());
                let start = std::time::Instant::now();
                let id = engine.learn(&name, &samples, rate)?;
                println!(
                    "Learned {:?} as track {} ({:.1} s)",
                    name,
                    id,
                    start.elapsed().as_secs_f32()
                );
            }
            engine.save(db)?;
        }
        "identify" => {
            let [file] = files else {
                eprintln!("identify takes exactly one wav file");
                std::process::exit(2);
            };
            let (samples, rate) = read_wav_mono(Path::new(file))?;
            match engine.identify(&samples, rate)? {
                MatchOutcome::Match(m) => {
                    let name = engine
                        .tracks()
                        .find(|t| t.id == m.track_id)
                        .map(|t| t.name.as_str())
                        .unwrap_or("?");
                    println!("Match: {:?} (score {}, offset {} frames)", name, m.score, m.offset);
                }
                MatchOutcome::NoMatch => println!("No match"),
                MatchOutcome::Ambiguous { best, runner_up } => println!(
                    "Ambiguous between tracks {} and {} (scores {} / {})",
                    best.track_id, runner_up.track_id, best.score, runner_up.score
                ),
            }
        }
        "list" => {
            for track in engine.tracks() {
                println!(
                    "{:>6}  {:<40}  {} fingerprints",
                    track.id, track.name, track.fingerprint_count
                );
            }
            println!("Total: {} tracks", engine.tracks().count());
        }
        other => {
            eprintln!("unknown command {:?}", other);
            std::process::exit(2);
        }
    }
    Ok(())
}

/// Decode a WAV file to mono f32 samples in [-1, 1]
fn read_wav_mono(path: &Path) -> Result<(Vec<f32>, u32), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}
