//! # AuScout command surface
//!
//! Binds the fingerprint index to the keyspace's command vocabulary:
//! argument parsing, byte-format decoding, ownership transfer into the
//! index, reply shaping, and replication emission. Commands run to
//! completion under the keyspace's per-key write discipline; an error of any
//! kind aborts the command with the keyspace unchanged and nothing
//! replicated.
//!
//! | command    | arguments                                | reply |
//! |------------|------------------------------------------|-------|
//! | `add`      | key hashbytes `[id]`                     | id |
//! | `addtrack` | key hashbytes description `[id]`         | id |
//! | `del`      | key id                                   | entries removed |
//! | `lookup`   | key hashbytes togglebytes `[threshold]`  | array of matches |
//! | `size`     | key                                      | entry count |
//! | `count`    | key                                      | track count |
//! | `delkey`   | key                                      | `OK` |
//! | `list`     | key                                      | track count (debug log) |
//! | `index`    | key                                      | hash-slot count (debug log) |
//!
//! Hash and toggle buffers are big-endian 32-bit words. A lookup match is
//! `[description, id, pos, score]` when a description side key exists, and
//! `[id, pos, score]` otherwise.

mod reply;

pub use reply::Reply;

use index::{IndexError, LookupConfig, TrackIndex};
use store::{Keyspace, NullReplication, ReplicationSink, StoreError};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced as typed error replies.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("wrong number of arguments")]
    Arity,
    #[error("key exists for different type. Delete first.")]
    WrongType,
    #[error("no such key")]
    NoSuchKey,
    #[error("unable to parse key arg")]
    BadKey,
    #[error("unable to parse id arg")]
    BadId,
    #[error("unable to parse threshold parameter")]
    BadThreshold,
    #[error("unable to parse description arg")]
    BadDescription,
    #[error("hash byte array length must be a multiple of 4")]
    UnalignedFrames,
    #[error("insufficient length arrays")]
    EmptyProbe,
    #[error("hash array must be equal to toggle array length")]
    ProbeLengthMismatch,
    #[error("id already exists")]
    DuplicateId,
    #[error("no such id found")]
    UnknownId,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error(transparent)]
    Index(IndexError),
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::WrongType { .. } => CommandError::WrongType,
        }
    }
}

impl From<IndexError> for CommandError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DuplicateId(_) => CommandError::DuplicateId,
            IndexError::UnknownId(_) => CommandError::UnknownId,
            IndexError::EmptyProbe => CommandError::EmptyProbe,
            IndexError::ProbeLengthMismatch { .. } => CommandError::ProbeLengthMismatch,
            other => CommandError::Index(other),
        }
    }
}

/// Decodes a buffer of network-byte-order 32-bit words.
pub fn decode_frames(bytes: &[u8]) -> Result<Vec<u32>, CommandError> {
    if bytes.len() % 4 != 0 {
        return Err(CommandError::UnalignedFrames);
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|word| u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
        .collect())
}

/// Encodes frames into the network-byte-order wire form.
pub fn encode_frames(frames: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frames.len() * 4);
    for frame in frames {
        bytes.extend_from_slice(&frame.to_be_bytes());
    }
    bytes
}

/// Emits one `add` command per track, carrying the chain's frames in wire
/// order and the explicit id, so replaying the stream rebuilds the index.
pub fn rewrite_replay_log(key: &str, index: &TrackIndex, sink: &mut dyn ReplicationSink) {
    for (id, frames) in index.tracks() {
        let hashes: Vec<u32> = frames.map(|frame| frame.hash_value).collect();
        let hashbytes = encode_frames(&hashes);
        let id_arg = id.to_string();
        sink.emit(&[b"add", key.as_bytes(), &hashbytes, id_arg.as_bytes()]);
    }
}

/// The command dispatcher: owns the keyspace, the replication sink, and the
/// lookup tuning shared by every index under it.
pub struct Dispatcher {
    keyspace: Keyspace,
    replication: Box<dyn ReplicationSink>,
    lookup_config: LookupConfig,
}

impl Dispatcher {
    pub fn new(lookup_config: LookupConfig) -> Self {
        Self {
            keyspace: Keyspace::new(),
            replication: Box::new(NullReplication),
            lookup_config,
        }
    }

    pub fn with_replication(mut self, sink: Box<dyn ReplicationSink>) -> Self {
        self.replication = sink;
        self
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    pub fn keyspace_mut(&mut self) -> &mut Keyspace {
        &mut self.keyspace
    }

    pub fn lookup_config(&self) -> &LookupConfig {
        &self.lookup_config
    }

    /// Dispatches a raw argv the way the host server would.
    pub fn execute(&mut self, argv: &[&[u8]]) -> Result<Reply, CommandError> {
        let (name, rest) = argv.split_first().ok_or(CommandError::Arity)?;
        let name = std::str::from_utf8(name)
            .map_err(|_| CommandError::UnknownCommand("<binary>".into()))?
            .to_ascii_lowercase();

        match name.as_str() {
            "add" => match rest {
                [key, hashbytes] => self.add(parse_key(key)?, hashbytes, None),
                [key, hashbytes, id] => self.add(parse_key(key)?, hashbytes, Some(parse_id(id)?)),
                _ => Err(CommandError::Arity),
            },
            "addtrack" => match rest {
                [key, hashbytes, descr] => {
                    self.add_track(parse_key(key)?, hashbytes, parse_descr(descr)?, None)
                }
                [key, hashbytes, descr, id] => self.add_track(
                    parse_key(key)?,
                    hashbytes,
                    parse_descr(descr)?,
                    Some(parse_id(id)?),
                ),
                _ => Err(CommandError::Arity),
            },
            "del" => match rest {
                [key, id] => self.del(parse_key(key)?, parse_id(id)?),
                _ => Err(CommandError::Arity),
            },
            "lookup" => match rest {
                [key, hashbytes, togglebytes] => {
                    self.lookup(parse_key(key)?, hashbytes, togglebytes, None)
                }
                [key, hashbytes, togglebytes, threshold] => self.lookup(
                    parse_key(key)?,
                    hashbytes,
                    togglebytes,
                    Some(parse_threshold(threshold)?),
                ),
                _ => Err(CommandError::Arity),
            },
            "size" => match rest {
                [key] => self.size(parse_key(key)?),
                _ => Err(CommandError::Arity),
            },
            "count" => match rest {
                [key] => self.count(parse_key(key)?),
                _ => Err(CommandError::Arity),
            },
            "delkey" => match rest {
                [key] => self.del_key(parse_key(key)?),
                _ => Err(CommandError::Arity),
            },
            "list" => match rest {
                [key] => self.list_tracks(parse_key(key)?),
                _ => Err(CommandError::Arity),
            },
            "index" => match rest {
                [key] => self.list_hashes(parse_key(key)?),
                _ => Err(CommandError::Arity),
            },
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    /// Inserts a track from its wire-format hash buffer, allocating an id
    /// unless one is supplied. Replies with the id.
    pub fn add(
        &mut self,
        key: &str,
        hashbytes: &[u8],
        explicit_id: Option<i64>,
    ) -> Result<Reply, CommandError> {
        let id = self.insert_frames(key, hashbytes, explicit_id)?;
        let id_arg = id.to_string();
        self.replication
            .emit(&[b"add", key.as_bytes(), hashbytes, id_arg.as_bytes()]);
        Ok(Reply::Integer(id))
    }

    /// `add` plus a description stored in the `(key, id)` side channel.
    pub fn add_track(
        &mut self,
        key: &str,
        hashbytes: &[u8],
        descr: &str,
        explicit_id: Option<i64>,
    ) -> Result<Reply, CommandError> {
        let id = self.insert_frames(key, hashbytes, explicit_id)?;
        self.keyspace.set_description(key, id, descr);
        let id_arg = id.to_string();
        self.replication.emit(&[
            b"addtrack",
            key.as_bytes(),
            hashbytes,
            descr.as_bytes(),
            id_arg.as_bytes(),
        ]);
        Ok(Reply::Integer(id))
    }

    fn insert_frames(
        &mut self,
        key: &str,
        hashbytes: &[u8],
        explicit_id: Option<i64>,
    ) -> Result<i64, CommandError> {
        let frames = decode_frames(hashbytes)?;
        let id = match explicit_id {
            Some(id) => id,
            None => self.keyspace.next_track_id(key)?,
        };
        let index = self.keyspace.index_entry(key)?;
        index.insert_track(id, &frames)?;
        debug!(key, id, n_frames = frames.len(), "added track");
        Ok(id)
    }

    /// Removes a track and its description. Replies with the number of
    /// entries removed.
    pub fn del(&mut self, key: &str, id: i64) -> Result<Reply, CommandError> {
        let removed = {
            let index = self
                .keyspace
                .index_mut(key)?
                .ok_or(CommandError::NoSuchKey)?;
            index.remove_track(id)?
        };
        self.keyspace.remove_description_field(key, id);
        debug!(key, id, removed, "deleted track");

        let id_arg = id.to_string();
        self.replication
            .emit(&[b"del", key.as_bytes(), id_arg.as_bytes()]);
        Ok(Reply::Integer(i64::from(removed)))
    }

    /// Probes the index with a hash/toggle pair. Replies with an array of
    /// match arrays: `[description, id, pos, score]`, the description
    /// omitted when no side key exists.
    pub fn lookup(
        &self,
        key: &str,
        hashbytes: &[u8],
        togglebytes: &[u8],
        threshold: Option<f64>,
    ) -> Result<Reply, CommandError> {
        if hashbytes.len() < 4 || togglebytes.len() < 4 {
            return Err(CommandError::EmptyProbe);
        }
        if hashbytes.len() != togglebytes.len() {
            return Err(CommandError::ProbeLengthMismatch);
        }
        let frames = decode_frames(hashbytes)?;
        let toggles = decode_frames(togglebytes)?;

        let index = self.keyspace.index(key)?.ok_or(CommandError::NoSuchKey)?;
        let threshold = threshold.unwrap_or(self.lookup_config.default_threshold);
        let matches = index.lookup(&frames, &toggles, threshold, &self.lookup_config)?;

        let mut replies = Vec::with_capacity(matches.len());
        for found in matches {
            let mut item = Vec::with_capacity(4);
            if let Some(descr) = self.keyspace.description(key, found.id) {
                item.push(Reply::Bulk(descr.as_bytes().to_vec()));
            }
            item.push(Reply::Integer(found.id));
            item.push(Reply::Integer(i64::from(found.pos)));
            item.push(Reply::Double(found.score));
            replies.push(Reply::Array(item));
        }
        Ok(Reply::Array(replies))
    }

    /// Total live entries at `key`; 0 for a missing key.
    pub fn size(&self, key: &str) -> Result<Reply, CommandError> {
        let n_entries = match self.keyspace.index(key)? {
            Some(index) => index.len() as i64,
            None => 0,
        };
        Ok(Reply::Integer(n_entries))
    }

    /// Distinct track ids at `key`; 0 for a missing key.
    pub fn count(&self, key: &str) -> Result<Reply, CommandError> {
        let n_ids = match self.keyspace.index(key)? {
            Some(index) => index.track_count() as i64,
            None => 0,
        };
        Ok(Reply::Integer(n_ids))
    }

    /// Tears down the index at `key` along with its counter and description
    /// side keys.
    pub fn del_key(&mut self, key: &str) -> Result<Reply, CommandError> {
        let ids: Vec<i64> = match self.keyspace.index(key)? {
            Some(index) => index.track_ids().collect(),
            None => return Err(CommandError::NoSuchKey),
        };
        for id in ids {
            self.keyspace.remove_description_key(key, id);
        }
        self.keyspace.remove_counter(key);
        self.keyspace.remove(key);
        debug!(key, "deleted index key");
        Ok(Reply::Simple("OK"))
    }

    /// Debug lister: logs every track with its entries, replies with the
    /// track count.
    pub fn list_tracks(&self, key: &str) -> Result<Reply, CommandError> {
        let index = self.keyspace.index(key)?.ok_or(CommandError::NoSuchKey)?;
        debug!(key, "track listing");
        let mut count = 0i64;
        for (id, frames) in index.tracks() {
            count += 1;
            debug!(seq = count, id, length = index.track_len(id), "track");
            for (n, frame) in frames.enumerate() {
                debug!(
                    seq = n + 1,
                    id,
                    hash_value = frame.hash_value,
                    pos = frame.pos,
                    "entry"
                );
            }
        }
        debug!(key, count, "track listing done");
        Ok(Reply::Integer(count))
    }

    /// Debug lister: logs every posting list with its entries, replies with
    /// the hash-slot count.
    pub fn list_hashes(&self, key: &str) -> Result<Reply, CommandError> {
        let index = self.keyspace.index(key)?.ok_or(CommandError::NoSuchKey)?;
        debug!(key, "hash listing");
        let mut count = 0i64;
        for (hash_value, entries) in index.hash_slots() {
            count += 1;
            debug!(seq = count, hash_value, "hash slot");
            for (n, entry) in entries.enumerate() {
                debug!(
                    seq = n + 1,
                    id = entry.id,
                    hash_value,
                    pos = entry.pos,
                    "entry"
                );
            }
        }
        debug!(key, count, "hash listing done");
        Ok(Reply::Integer(count))
    }

    /// Emits the replay log for the index at `key` into `sink`.
    pub fn rewrite_replay_log(
        &self,
        key: &str,
        sink: &mut dyn ReplicationSink,
    ) -> Result<(), CommandError> {
        let index = self.keyspace.index(key)?.ok_or(CommandError::NoSuchKey)?;
        rewrite_replay_log(key, index, sink);
        Ok(())
    }
}

fn parse_key(bytes: &[u8]) -> Result<&str, CommandError> {
    std::str::from_utf8(bytes).map_err(|_| CommandError::BadKey)
}

fn parse_descr(bytes: &[u8]) -> Result<&str, CommandError> {
    std::str::from_utf8(bytes).map_err(|_| CommandError::BadDescription)
}

fn parse_id(bytes: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or(CommandError::BadId)
}

fn parse_threshold(bytes: &[u8]) -> Result<f64, CommandError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .ok_or(CommandError::BadThreshold)
}
