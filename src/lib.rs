//! Workspace umbrella crate for AuScout.
//!
//! AuScout is an in-memory index for audio fingerprint tracks: per-track
//! sequences of 32-bit perceptual hash frames, stored in a dual mapping
//! (hash frame → posting list, track id → ownership chain) and queried by
//! bit-toggle permutation with sliding-window voting. The umbrella crate
//! re-exports the three layers so applications can drive the whole system
//! through a single dependency:
//!
//! - [`index`]: the core data structure, lookup engine, and snapshot codec.
//! - [`store`]: the in-process keyspace standing in for the host key-value
//!   server (typed slots, counter and description side keys, replication
//!   sink).
//! - [`commands`]: the command surface (`add`, `addtrack`, `del`, `lookup`,
//!   `size`, `count`, `delkey`, plus the two debug listers).
//!
//! ## Quick start
//!
//! ```
//! use auscout::{encode_frames, Dispatcher, LookupConfig};
//!
//! let mut dispatcher = Dispatcher::new(LookupConfig::default());
//!
//! let frames: Vec<u32> = (1..=300).map(|i| i * 100).collect();
//! let reply = dispatcher
//!     .add_track("songs", &encode_frames(&frames), "some song", None)
//!     .unwrap();
//! let id = reply.as_integer().unwrap();
//!
//! // Probe with a 150-frame excerpt starting 20 frames into the track.
//! let probe = encode_frames(&frames[20..170]);
//! let toggles = encode_frames(&vec![0u32; 150]);
//! let reply = dispatcher.lookup("songs", &probe, &toggles, Some(0.80)).unwrap();
//!
//! let hits = reply.as_array().unwrap();
//! let hit = hits[0].as_array().unwrap();
//! assert_eq!(hit[1].as_integer(), Some(id));
//! assert_eq!(hit[2].as_integer(), Some(20));
//! ```
//!
//! Configuration can be loaded from a versioned YAML file via
//! [`config::AuscoutConfig`].

pub use commands::{
    decode_frames, encode_frames, rewrite_replay_log, CommandError, Dispatcher, Reply,
};
pub use index::{
    load_snapshot, save_snapshot, FrameEntry, IndexError, LookupConfig, Match, PostingEntry,
    SnapshotCompression, SnapshotConfig, TrackIndex, ENCODING_VERSION, SNAPSHOT_TYPE_NAME,
};
pub use store::{
    counter_key, description_key, Keyspace, NullReplication, RecordedReplication,
    ReplicationSink, StoreError, Value,
};

pub mod config;

pub use config::{AuscoutConfig, ConfigLoadError};
