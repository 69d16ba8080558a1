//! Snapshot codec for the track index.
//!
//! A snapshot is the type-name magic, one encoding version byte, then a
//! bincode body (optionally zstd-compressed, see [`SnapshotConfig`]). The
//! body is the track table: per id, the chain's `(hash_value, pos)` records
//! in chain order, with the integer fields widened to 64 bits. Description
//! side keys are persisted by their own mechanism and never appear here.
//!
//! Loaders refuse any version other than [`ENCODING_VERSION`] outright; no
//! migration is attempted.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::{IndexError, SnapshotConfig, TrackIndex};

/// Type name written at the head of every snapshot stream.
pub const SNAPSHOT_TYPE_NAME: &[u8; 9] = b"AuScoutDS";

/// Snapshot encoding version. Bump only with a format change.
pub const ENCODING_VERSION: u8 = 0;

#[derive(Serialize, Deserialize)]
struct TrackRecord {
    id: i64,
    frames: Vec<FrameRecord>,
}

#[derive(Serialize, Deserialize)]
struct FrameRecord {
    hash_value: u64,
    pos: i64,
}

/// Serializes the whole index to `writer`.
pub fn save_snapshot<W: Write>(
    index: &TrackIndex,
    cfg: &SnapshotConfig,
    mut writer: W,
) -> Result<(), IndexError> {
    let mut tracks = Vec::with_capacity(index.track_count());
    for (id, frames) in index.tracks() {
        let frames = frames
            .map(|frame| FrameRecord {
                hash_value: u64::from(frame.hash_value),
                pos: i64::from(frame.pos),
            })
            .collect();
        tracks.push(TrackRecord { id, frames });
    }

    let body = bincode::serde::encode_to_vec(&tracks, bincode::config::standard())?;
    let body = cfg.compress(&body)?;

    writer.write_all(SNAPSHOT_TYPE_NAME)?;
    writer.write_all(&[ENCODING_VERSION])?;
    writer.write_all(&body)?;
    Ok(())
}

/// Rebuilds an index from a snapshot stream. Stored positions are taken
/// verbatim; the duplicate-adjacent suppression performed at original
/// insertion survives the round trip.
pub fn load_snapshot<R: Read>(cfg: &SnapshotConfig, mut reader: R) -> Result<TrackIndex, IndexError> {
    let mut magic = [0u8; SNAPSHOT_TYPE_NAME.len()];
    reader.read_exact(&mut magic)?;
    if &magic != SNAPSHOT_TYPE_NAME {
        return Err(IndexError::BadMagic);
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    if version[0] != ENCODING_VERSION {
        return Err(IndexError::EncodingVersion {
            found: version[0],
            expected: ENCODING_VERSION,
        });
    }

    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;
    let body = cfg.decompress(&body)?;
    let (tracks, _): (Vec<TrackRecord>, usize) =
        bincode::serde::decode_from_slice(&body, bincode::config::standard())?;

    let mut index = TrackIndex::new();
    for track in tracks {
        let mut frames = Vec::with_capacity(track.frames.len());
        for frame in track.frames {
            let hash_value = u32::try_from(frame.hash_value)
                .map_err(|_| IndexError::Decode(format!("hash out of range: {}", frame.hash_value)))?;
            let pos = u32::try_from(frame.pos)
                .map_err(|_| IndexError::Decode(format!("position out of range: {}", frame.pos)))?;
            frames.push((hash_value, pos));
        }
        index.restore_track(track.id, frames)?;
    }
    Ok(index)
}
