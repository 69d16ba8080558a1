//! # AuScout keyspace
//!
//! In-process stand-in for the host key-value server the index type plugs
//! into. The four primitives the index core needs from its host — a typed
//! value slot per key, an atomic integer increment on a side key, a
//! hash-typed side key for descriptions, and the replication sink — live
//! here with the same contracts.
//!
//! The keyspace follows the host's single-threaded cooperative model:
//! commands run to completion under `&mut` access and nothing locks
//! internally. Typed accessors never coerce; a key holding the wrong type is
//! a [`StoreError::WrongType`] and the caller is expected to surface it
//! unchanged.

pub mod replication;

pub use replication::{NullReplication, RecordedReplication, ReplicationSink};

use chrono::Utc;
use hashbrown::HashMap;
use index::TrackIndex;
use thiserror::Error;

/// Field under which a track's description is stored in its side key.
pub const DESCR_FIELD: &str = "descr";

/// Errors surfaced by the keyspace.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("key exists for different type. Delete first.")]
    WrongType { key: String },
}

/// A single keyspace slot. The fingerprint index is this module's own data
/// type; integers and hashes stand in for the host's native types used by
/// the side keys.
#[derive(Debug)]
pub enum Value {
    Integer(i64),
    Hash(HashMap<String, String>),
    Fingerprints(TrackIndex),
}

/// The key → typed-value mapping.
#[derive(Debug, Default)]
pub struct Keyspace {
    entries: HashMap<String, Value>,
}

/// Side key holding the monotone id counter for `key`.
pub fn counter_key(key: &str) -> String {
    format!("{key}:counter")
}

/// Side key holding the description hash for `(key, id)`.
pub fn description_key(key: &str, id: i64) -> String {
    format!("{key}:{id}")
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Read access to the index at `key`; `Ok(None)` when the key is empty.
    pub fn index(&self, key: &str) -> Result<Option<&TrackIndex>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Fingerprints(index)) => Ok(Some(index)),
            Some(_) => Err(StoreError::WrongType { key: key.into() }),
        }
    }

    /// Write access to the index at `key`; `Ok(None)` when the key is empty.
    pub fn index_mut(&mut self, key: &str) -> Result<Option<&mut TrackIndex>, StoreError> {
        match self.entries.get_mut(key) {
            None => Ok(None),
            Some(Value::Fingerprints(index)) => Ok(Some(index)),
            Some(_) => Err(StoreError::WrongType { key: key.into() }),
        }
    }

    /// Opens the index at `key`, creating an empty one when the key is
    /// empty. A key of any other type is a type conflict.
    pub fn index_entry(&mut self, key: &str) -> Result<&mut TrackIndex, StoreError> {
        if let Some(value) = self.entries.get(key) {
            if !matches!(value, Value::Fingerprints(_)) {
                return Err(StoreError::WrongType { key: key.into() });
            }
        }
        let slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Fingerprints(TrackIndex::new()));
        match slot {
            Value::Fingerprints(index) => Ok(index),
            _ => Err(StoreError::WrongType { key: key.into() }),
        }
    }

    /// Installs an index at `key`, replacing whatever was there. Used when a
    /// snapshot is loaded back into the keyspace.
    pub fn install_index(&mut self, key: &str, index: TrackIndex) {
        self.entries
            .insert(key.to_string(), Value::Fingerprints(index));
    }

    /// Removes the value at `key` outright; teardown of an index value frees
    /// every entry with it. Returns whether the key existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// The INCRBY-style primitive: adds `delta` to the integer at `key`,
    /// creating it at zero. Fails if the key holds a non-integer.
    pub fn incr_by(&mut self, key: &str, delta: i64) -> Result<i64, StoreError> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert(Value::Integer(0))
        {
            Value::Integer(current) => {
                *current = current.wrapping_add(delta);
                Ok(*current)
            }
            _ => Err(StoreError::WrongType { key: key.into() }),
        }
    }

    /// Allocates the next track id for `key`: wall-clock milliseconds in the
    /// high half, sixteen pseudo-random bits, then the low sixteen bits of
    /// the per-index counter to disambiguate within a millisecond.
    pub fn next_track_id(&mut self, key: &str) -> Result<i64, StoreError> {
        let counter = self.incr_by(&counter_key(key), 1)?;
        let millis = Utc::now().timestamp_millis();
        let random = i64::from(fastrand::u16(..));
        Ok((millis << 32) | (random << 16) | (counter & 0xFFFF))
    }

    /// Drops the counter side key for `key`.
    pub fn remove_counter(&mut self, key: &str) {
        self.entries.remove(&counter_key(key));
    }

    /// Stores a description for `(key, id)`. Never overwrites: if the side
    /// key already exists, under any type, the write is skipped (matching
    /// the host side-channel contract).
    pub fn set_description(&mut self, key: &str, id: i64, descr: &str) {
        let side_key = description_key(key, id);
        if self.entries.contains_key(&side_key) {
            return;
        }
        let mut fields = HashMap::new();
        fields.insert(DESCR_FIELD.to_string(), descr.to_string());
        self.entries.insert(side_key, Value::Hash(fields));
    }

    /// Fetches the description for `(key, id)`, if the side key exists and
    /// is hash-typed.
    pub fn description(&self, key: &str, id: i64) -> Option<&str> {
        match self.entries.get(&description_key(key, id)) {
            Some(Value::Hash(fields)) => fields.get(DESCR_FIELD).map(String::as_str),
            _ => None,
        }
    }

    /// Deletes the description field for `(key, id)`; the side key vanishes
    /// with its last field. A key of another type is left alone.
    pub fn remove_description_field(&mut self, key: &str, id: i64) {
        let side_key = description_key(key, id);
        if let Some(Value::Hash(fields)) = self.entries.get_mut(&side_key) {
            fields.remove(DESCR_FIELD);
            if fields.is_empty() {
                self.entries.remove(&side_key);
            }
        }
    }

    /// Deletes the whole description side key for `(key, id)` when it is
    /// hash-typed. A key of another type is left alone.
    pub fn remove_description_key(&mut self, key: &str, id: i64) {
        let side_key = description_key(key, id);
        if matches!(self.entries.get(&side_key), Some(Value::Hash(_))) {
            self.entries.remove(&side_key);
        }
    }
}
