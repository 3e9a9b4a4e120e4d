//! Future-ack queue (spec §4.B): a min-heap of term-switch announcements
//! whose predecessor consensus position hasn't been reached yet.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A deferred term-switch announcement, either from a gapped heartbeat or an
/// out-of-order resend. Applied once `previousConsensusPosition` reaches
/// `start_position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FutureAck {
    pub term: i32,
    pub leader_session_id: i32,
    pub start_position: i64,
    pub stream_start_position: i64,
    pub stream_position: i64,
}

impl PartialOrd for FutureAck {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FutureAck {
    /// Reversed on `(start_position, term)` so that a `BinaryHeap` (normally
    /// a max-heap) pops the ack with the *smallest* key first, per §9's
    /// design note that `startPosition` (not `term`) is the heap key.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.start_position, other.term).cmp(&(self.start_position, self.term))
    }
}

/// Wraps the `BinaryHeap` rather than exposing it, both to enforce the
/// dedup-on-push behavior (testable property 4: enqueuing the same
/// `(term, startPosition)` twice has the same effect as enqueuing it once)
/// and to keep the min-heap-via-reversed-`Ord` trick in one place.
#[derive(Debug, Default)]
pub struct FutureAckQueue {
    heap: BinaryHeap<FutureAck>,
}

impl FutureAckQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Enqueues `ack` unless an ack with the same `(term, start_position)` is
    /// already queued.
    pub fn push(&mut self, ack: FutureAck) {
        let already_queued = self
            .heap
            .iter()
            .any(|existing| existing.term == ack.term && existing.start_position == ack.start_position);
        if !already_queued {
            self.heap.push(ack);
        }
    }

    /// Pops and returns the head ack if its `start_position` matches
    /// `previous_consensus_position`; otherwise leaves the queue untouched.
    pub fn pop_ready(&mut self, previous_consensus_position: i64) -> Option<FutureAck> {
        match self.heap.peek() {
            Some(head) if head.start_position == previous_consensus_position => self.heap.pop(),
            _ => None,
        }
    }
}
