//! # AuScout index core
//!
//! In-memory index for audio fingerprint tracks. A track is a sequence of
//! 32-bit perceptual hash frames; the index stores every frame as a posting
//! entry reachable two ways:
//!
//! - `hash_dict`: hash frame → doubly linked posting list of the entries
//!   sharing that frame, newest first.
//! - `id_dict`: track id → singly linked chain of the track's entries in
//!   insertion order (strictly ascending positions).
//!
//! Entries live in a slot arena ([`arena`]) and the two structures hold
//! handles into it, so an entry participates in both without shared
//! ownership. The track chain drives teardown; the posting list is unlinked
//! entry by entry.
//!
//! ## Example
//!
//! ```
//! use index::{LookupConfig, TrackIndex};
//!
//! let mut index = TrackIndex::new();
//! let frames: Vec<u32> = (1..=200).map(|i| i * 100).collect();
//! index.insert_track(1, &frames).unwrap();
//!
//! // Probe with a 120-frame excerpt starting 40 frames in.
//! let probe = &frames[40..160];
//! let toggles = vec![0u32; probe.len()];
//! let cfg = LookupConfig::default();
//! let hits = index.lookup(probe, &toggles, 0.80, &cfg).unwrap();
//! assert_eq!(hits[0].id, 1);
//! assert_eq!(hits[0].pos, 40);
//! ```
//!
//! Consecutive duplicate frames are suppressed on insert: plateaus in the
//! hash stream add no positional information to the voting window, so they
//! occupy no entries (their positions are simply absent from the chain).

mod arena;
mod codec;
mod config;
mod error;
mod lookup;

pub use codec::{load_snapshot, save_snapshot, ENCODING_VERSION, SNAPSHOT_TYPE_NAME};
pub use config::{LookupConfig, SnapshotCompression, SnapshotConfig};
pub use error::IndexError;
pub use lookup::Match;

use arena::{Entry, EntryArena, EntryRef};
use hashbrown::HashMap;
use std::mem;
use tracing::debug;

/// Posting list header: the entries sharing one hash frame, front-inserted.
#[derive(Clone, Copy, Debug, Default)]
struct PostingList {
    head: Option<EntryRef>,
    length: u32,
}

/// Track chain header: one track's entries in insertion order. The cached
/// tail keeps appends O(1).
#[derive(Clone, Copy, Debug, Default)]
struct TrackChain {
    head: Option<EntryRef>,
    tail: Option<EntryRef>,
    length: u32,
}

/// One frame of a track chain, as exposed by [`TrackIndex::track_frames`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameEntry {
    pub hash_value: u32,
    /// Zero-based frame offset within the track at insertion time.
    pub pos: u32,
}

/// One entry of a posting list, as exposed by [`TrackIndex::hash_slots`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostingEntry {
    pub id: i64,
    pub pos: u32,
}

/// The dual-mapped fingerprint index.
#[derive(Debug, Default)]
pub struct TrackIndex {
    hash_dict: HashMap<u32, PostingList>,
    id_dict: HashMap<i64, TrackChain>,
    arena: EntryArena,
    n_entries: u64,
}

impl TrackIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total live entries across all tracks.
    pub fn len(&self) -> u64 {
        self.n_entries
    }

    pub fn is_empty(&self) -> bool {
        self.n_entries == 0
    }

    /// Number of distinct track ids (a zero-frame track still counts).
    pub fn track_count(&self) -> usize {
        self.id_dict.len()
    }

    /// Number of distinct hash frames with a live posting list.
    pub fn hash_count(&self) -> usize {
        self.hash_dict.len()
    }

    pub fn contains_track(&self, id: i64) -> bool {
        self.id_dict.contains_key(&id)
    }

    pub fn track_len(&self, id: i64) -> Option<u32> {
        self.id_dict.get(&id).map(|chain| chain.length)
    }

    /// Inserts a track, suppressing consecutive duplicate frames (the frame
    /// before the first one is taken to be 0). Returns the number of entries
    /// created. Fails without writing anything if the id already exists.
    pub fn insert_track(&mut self, id: i64, frames: &[u32]) -> Result<u32, IndexError> {
        if self.id_dict.contains_key(&id) {
            return Err(IndexError::DuplicateId(id));
        }
        debug!(id, n_frames = frames.len(), "inserting track");

        let mut chain = TrackChain::default();
        let mut prev_frame = 0u32;
        for (i, &frame) in frames.iter().enumerate() {
            if frame == prev_frame {
                continue;
            }
            self.append_to_chain(&mut chain, id, i as u32, frame);
            prev_frame = frame;
        }
        let created = chain.length;
        self.id_dict.insert(id, chain);
        Ok(created)
    }

    /// Removes a track, unlinking every entry from its posting list. Returns
    /// the number of entries released.
    pub fn remove_track(&mut self, id: i64) -> Result<u32, IndexError> {
        let chain = self.id_dict.remove(&id).ok_or(IndexError::UnknownId(id))?;

        let mut cursor = chain.head;
        while let Some(handle) = cursor {
            self.unlink_posting(handle);
            let entry = self.arena.remove(handle);
            cursor = entry.succ;
        }
        self.n_entries -= u64::from(chain.length);
        debug!(id, removed = chain.length, "removed track");
        Ok(chain.length)
    }

    /// Rebuilds a track from stored `(hash_value, pos)` pairs verbatim; used
    /// by the snapshot loader. Positions are taken from the stream, never
    /// re-derived, so duplicate suppression performed at original insertion
    /// is preserved.
    pub(crate) fn restore_track<I>(&mut self, id: i64, frames: I) -> Result<u32, IndexError>
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        if self.id_dict.contains_key(&id) {
            return Err(IndexError::DuplicateId(id));
        }
        let mut chain = TrackChain::default();
        for (hash_value, pos) in frames {
            self.append_to_chain(&mut chain, id, pos, hash_value);
        }
        let restored = chain.length;
        self.id_dict.insert(id, chain);
        Ok(restored)
    }

    fn append_to_chain(&mut self, chain: &mut TrackChain, id: i64, pos: u32, hash_value: u32) {
        let handle = self.arena.insert(Entry::new(id, pos, hash_value));
        match chain.tail {
            None => chain.head = Some(handle),
            Some(tail) => self.arena.get_mut(tail).succ = Some(handle),
        }
        chain.tail = Some(handle);
        chain.length += 1;
        self.link_posting(handle);
        self.n_entries += 1;
    }

    fn link_posting(&mut self, handle: EntryRef) {
        let hash_value = self.arena.get(handle).hash_value;
        let list = self.hash_dict.entry(hash_value).or_default();
        let old_head = list.head;
        list.head = Some(handle);
        list.length += 1;
        if let Some(head) = old_head {
            self.arena.get_mut(head).prev = Some(handle);
            self.arena.get_mut(handle).next = Some(head);
        }
    }

    fn unlink_posting(&mut self, handle: EntryRef) {
        let (hash_value, prev, next) = {
            let entry = self.arena.get(handle);
            (entry.hash_value, entry.prev, entry.next)
        };

        // Sole member: erase the hash's mapping entry outright.
        if prev.is_none() && next.is_none() {
            self.hash_dict.remove(&hash_value);
            return;
        }

        match prev {
            None => {
                // Head of the list.
                if let Some(n) = next {
                    self.arena.get_mut(n).prev = None;
                }
                if let Some(list) = self.hash_dict.get_mut(&hash_value) {
                    list.head = next;
                    list.length -= 1;
                }
            }
            Some(p) => {
                self.arena.get_mut(p).next = next;
                if let Some(n) = next {
                    self.arena.get_mut(n).prev = prev;
                }
                if let Some(list) = self.hash_dict.get_mut(&hash_value) {
                    list.length -= 1;
                }
            }
        }
    }

    pub(crate) fn posting_head(&self, hash_value: u32) -> Option<EntryRef> {
        self.hash_dict.get(&hash_value).and_then(|list| list.head)
    }

    pub(crate) fn entry(&self, handle: EntryRef) -> &Entry {
        self.arena.get(handle)
    }

    /// Iterates track ids in dictionary order (arbitrary but stable between
    /// mutations).
    pub fn track_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.id_dict.keys().copied()
    }

    /// Iterates every track as `(id, frames-in-chain-order)`.
    pub fn tracks(&self) -> impl Iterator<Item = (i64, TrackFrames<'_>)> {
        self.id_dict.iter().map(move |(&id, chain)| {
            (
                id,
                TrackFrames {
                    arena: &self.arena,
                    cursor: chain.head,
                },
            )
        })
    }

    /// Frames of one track in chain order, or `None` for an unknown id.
    pub fn track_frames(&self, id: i64) -> Option<TrackFrames<'_>> {
        self.id_dict.get(&id).map(|chain| TrackFrames {
            arena: &self.arena,
            cursor: chain.head,
        })
    }

    /// Iterates every posting list as `(hash_value, entries-head-first)`.
    pub fn hash_slots(&self) -> impl Iterator<Item = (u32, PostingEntries<'_>)> {
        self.hash_dict.iter().map(move |(&hash_value, list)| {
            (
                hash_value,
                PostingEntries {
                    arena: &self.arena,
                    cursor: list.head,
                },
            )
        })
    }

    /// Estimated heap footprint: live entries plus list headers plus one
    /// pointer-sized dictionary slot per list.
    pub fn memory_usage(&self) -> usize {
        self.n_entries as usize * mem::size_of::<Entry>()
            + self.id_dict.len() * (mem::size_of::<TrackChain>() + mem::size_of::<usize>())
            + self.hash_dict.len() * (mem::size_of::<PostingList>() + mem::size_of::<usize>())
    }

    /// Asserts the structural invariants: list lengths match reachable
    /// entries, chain positions strictly ascend, and the entry total agrees
    /// with both mappings.
    #[cfg(test)]
    pub(crate) fn check_consistency(&self) {
        let mut from_chains = 0u64;
        for (id, chain) in &self.id_dict {
            let mut reachable = 0u32;
            let mut last_pos: Option<u32> = None;
            let mut cursor = chain.head;
            while let Some(handle) = cursor {
                let entry = self.arena.get(handle);
                assert_eq!(entry.id, *id);
                if let Some(last) = last_pos {
                    assert!(entry.pos > last, "positions must strictly ascend");
                }
                last_pos = Some(entry.pos);
                reachable += 1;
                cursor = entry.succ;
            }
            assert_eq!(reachable, chain.length, "chain length drift for {id}");
            from_chains += u64::from(chain.length);
        }

        let mut from_postings = 0u64;
        for (hash_value, list) in &self.hash_dict {
            let mut reachable = 0u32;
            let mut cursor = list.head;
            let mut prev: Option<EntryRef> = None;
            while let Some(handle) = cursor {
                let entry = self.arena.get(handle);
                assert_eq!(entry.hash_value, *hash_value);
                assert_eq!(entry.prev, prev, "back link drift");
                prev = Some(handle);
                reachable += 1;
                cursor = entry.next;
            }
            assert!(list.length > 0, "empty posting list left behind");
            assert_eq!(reachable, list.length, "posting length drift");
            from_postings += u64::from(list.length);
        }

        assert_eq!(from_chains, self.n_entries);
        assert_eq!(from_postings, self.n_entries);
        assert_eq!(self.arena.len() as u64, self.n_entries);
    }
}

/// Iterator over a track chain; see [`TrackIndex::track_frames`].
pub struct TrackFrames<'a> {
    arena: &'a EntryArena,
    cursor: Option<EntryRef>,
}

impl Iterator for TrackFrames<'_> {
    type Item = FrameEntry;

    fn next(&mut self) -> Option<FrameEntry> {
        let handle = self.cursor?;
        let entry = self.arena.get(handle);
        self.cursor = entry.succ;
        Some(FrameEntry {
            hash_value: entry.hash_value,
            pos: entry.pos,
        })
    }
}

/// Iterator over a posting list, head first; see [`TrackIndex::hash_slots`].
pub struct PostingEntries<'a> {
    arena: &'a EntryArena,
    cursor: Option<EntryRef>,
}

impl Iterator for PostingEntries<'_> {
    type Item = PostingEntry;

    fn next(&mut self) -> Option<PostingEntry> {
        let handle = self.cursor?;
        let entry = self.arena.get(handle);
        self.cursor = entry.next;
        Some(PostingEntry {
            id: entry.id,
            pos: entry.pos,
        })
    }
}
