//! Minimal tour of the index crate: insert tracks, probe with toggled bits,
//! snapshot and reload.
//!
//! Run with `cargo run -p index --example index_demo`.

use index::{load_snapshot, save_snapshot, LookupConfig, SnapshotConfig, TrackIndex};

fn main() -> Result<(), index::IndexError> {
    let mut index = TrackIndex::new();

    // Two tracks sharing some frame values.
    let first: Vec<u32> = (1..=300).map(|i| i * 50).collect();
    let second: Vec<u32> = (1..=300).map(|i| i * 50 + 25).collect();
    index.insert_track(1, &first)?;
    index.insert_track(2, &second)?;
    println!(
        "indexed {} entries across {} tracks ({} hash slots, ~{} bytes)",
        index.len(),
        index.track_count(),
        index.hash_count(),
        index.memory_usage()
    );

    // Probe with an excerpt of the first track, low bit corrupted and marked
    // unreliable in the toggle mask.
    let probe: Vec<u32> = first[40..190].iter().map(|f| f ^ 0x1).collect();
    let toggles = vec![0x1u32; probe.len()];
    let cfg = LookupConfig::default();
    for hit in index.lookup(&probe, &toggles, 0.80, &cfg)? {
        println!(
            "matched track {} at position {} (score {:.2})",
            hit.id, hit.pos, hit.score
        );
    }

    // Round-trip through the snapshot codec.
    let snapshot_cfg = SnapshotConfig::default();
    let mut buffer = Vec::new();
    save_snapshot(&index, &snapshot_cfg, &mut buffer)?;
    let restored = load_snapshot(&snapshot_cfg, buffer.as_slice())?;
    println!(
        "snapshot: {} bytes, reloaded {} entries",
        buffer.len(),
        restored.len()
    );

    Ok(())
}
