//! Slot-addressed storage for posting entries.
//!
//! Entries participate in two linked structures at once (a posting list and a
//! track chain), so they live in one pool and are referenced by stable
//! integer handles instead of pointers. Freed slots are recycled through a
//! vacancy stack.

/// Stable handle to an entry slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct EntryRef(u32);

impl EntryRef {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One posting record: the frame it indexes, the track that owns it, and the
/// links tying it into its posting list (`prev`/`next`) and track chain
/// (`succ`). Immutable once inserted, apart from the link slots.
#[derive(Debug)]
pub(crate) struct Entry {
    pub id: i64,
    pub pos: u32,
    pub hash_value: u32,
    pub prev: Option<EntryRef>,
    pub next: Option<EntryRef>,
    pub succ: Option<EntryRef>,
}

impl Entry {
    pub fn new(id: i64, pos: u32, hash_value: u32) -> Self {
        Self {
            id,
            pos,
            hash_value,
            prev: None,
            next: None,
            succ: None,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct EntryArena {
    slots: Vec<Option<Entry>>,
    vacant: Vec<u32>,
    live: usize,
}

impl EntryArena {
    pub fn insert(&mut self, entry: Entry) -> EntryRef {
        self.live += 1;
        match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(entry);
                EntryRef(slot)
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Some(entry));
                EntryRef(slot)
            }
        }
    }

    /// Frees the slot and returns the entry. Handles never escape this crate,
    /// so a stale handle is a linkage bug, not a caller error.
    pub fn remove(&mut self, handle: EntryRef) -> Entry {
        let entry = self.slots[handle.index()]
            .take()
            .expect("stale entry handle");
        self.vacant.push(handle.0);
        self.live -= 1;
        entry
    }

    pub fn get(&self, handle: EntryRef) -> &Entry {
        self.slots[handle.index()]
            .as_ref()
            .expect("stale entry handle")
    }

    pub fn get_mut(&mut self, handle: EntryRef) -> &mut Entry {
        self.slots[handle.index()]
            .as_mut()
            .expect("stale entry handle")
    }

    pub fn len(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freed_slots_are_recycled() {
        let mut arena = EntryArena::default();
        let a = arena.insert(Entry::new(1, 0, 10));
        let b = arena.insert(Entry::new(1, 1, 20));
        assert_eq!(arena.len(), 2);

        let freed = arena.remove(a);
        assert_eq!(freed.hash_value, 10);
        assert_eq!(arena.len(), 1);

        let c = arena.insert(Entry::new(2, 0, 30));
        assert_eq!(c, a, "vacant slot should be reused");
        assert_eq!(arena.get(b).hash_value, 20);
        assert_eq!(arena.get(c).id, 2);
    }

    #[test]
    fn links_start_empty() {
        let mut arena = EntryArena::default();
        let e = arena.insert(Entry::new(7, 3, 0xdead));
        let entry = arena.get(e);
        assert!(entry.prev.is_none());
        assert!(entry.next.is_none());
        assert!(entry.succ.is_none());
    }
}
