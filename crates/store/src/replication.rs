//! Replication seam between the command layer and the host's replay stream.
//!
//! Successful writes are forwarded as command argv records; the replay-log
//! rewriter pushes synthesized `add` commands through the same trait. In the
//! embedded setting the sink is a recording buffer or a no-op; a networked
//! host would forward the records to its replicas.

use std::cell::RefCell;
use std::rc::Rc;

/// Receives the command stream that would be forwarded to replicas.
pub trait ReplicationSink {
    fn emit(&mut self, argv: &[&[u8]]);
}

/// Sink that drops every record.
#[derive(Debug, Default)]
pub struct NullReplication;

impl ReplicationSink for NullReplication {
    fn emit(&mut self, _argv: &[&[u8]]) {}
}

/// Sink that records every argv for inspection or replay. Clones share the
/// same buffer, so a test can keep a handle after moving the sink into the
/// dispatcher (single-executor model; nothing here is thread-safe).
#[derive(Clone, Debug, Default)]
pub struct RecordedReplication {
    records: Rc<RefCell<Vec<Vec<Vec<u8>>>>>,
}

impl RecordedReplication {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records emitted so far.
    pub fn records(&self) -> Vec<Vec<Vec<u8>>> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl ReplicationSink for RecordedReplication {
    fn emit(&mut self, argv: &[&[u8]]) {
        self.records
            .borrow_mut()
            .push(argv.iter().map(|arg| arg.to_vec()).collect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_sink_is_shared_across_clones() {
        let sink = RecordedReplication::new();
        let mut writer = sink.clone();
        writer.emit(&[b"add", b"songs", b"\x00\x00\x00\x01"]);

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0][0], b"add".to_vec());
    }

    #[test]
    fn null_sink_swallows_records() {
        let mut sink = NullReplication;
        sink.emit(&[b"del", b"songs", b"42"]);
    }
}
