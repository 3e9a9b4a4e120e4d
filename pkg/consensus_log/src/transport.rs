//! Transport contracts (spec §4.I): the trait seams that decouple the
//! subscriber's state machine from any concrete Aeron-like transport, so
//! `tests/subscriber.rs` can exercise it against in-memory fakes.
//!
//! Grounded on the teacher's general comfort with blanket trait impls over
//! closures (`pkg/common/src/io.rs`'s `StreamExt2`) for `FragmentHandler`, and
//! on the `Option`-for-absence-not-error convention used throughout the
//! teacher's `common` crate for `image_by_session_id` / `Archive::session`.

use crate::errors::*;

/// What a fragment handler (or the message filter dispatching to it) returns
/// after looking at one fragment: keep polling, stop this poll cycle cleanly,
/// or abort the whole operation the fragment was delivered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    Continue,
    Break,
    Abort,
}

/// The position and cluster-stream tag carried alongside a delivered
/// fragment's bytes. `reserved_value` is the raw 64-bit field this crate
/// reads the cluster-stream tag out of (§4.G's `extract_cluster_stream_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    pub position: i64,
    pub reserved_value: i64,
}

impl FragmentHeader {
    pub fn new(position: i64, reserved_value: i64) -> Self {
        Self {
            position,
            reserved_value,
        }
    }
}

/// Receives one fragment at a time during a poll cycle.
pub trait FragmentHandler {
    fn on_fragment(&mut self, header: FragmentHeader, body: &[u8]) -> PollAction;
}

impl<F> FragmentHandler for F
where
    F: FnMut(FragmentHeader, &[u8]) -> PollAction,
{
    fn on_fragment(&mut self, header: FragmentHeader, body: &[u8]) -> PollAction {
        (self)(header, body)
    }
}

/// A live subscription to one leader's application-data stream.
pub trait Image {
    /// Stream-space position this image currently sits at.
    fn position(&self) -> i64;

    /// Polls for available fragments, calling `handler` for each, stopping
    /// early if `handler` returns anything other than `Continue`. Returns the
    /// number of fragments delivered.
    fn poll(&mut self, handler: &mut dyn FragmentHandler) -> Result<usize>;
}

/// The data transport: application fragments from whichever replica is
/// currently leading.
pub trait DataTransport {
    /// Looks up (or lazily opens) the image for a given leader session,
    /// returning `None` if this transport has no source for that session
    /// (not an error: the source may simply not have arrived yet).
    fn image_by_session_id(&mut self, leader_session_id: i32) -> Option<&mut dyn Image>;

    fn close(&mut self);
}

/// The control transport: heartbeats and resends carrying consensus
/// metadata. Decoding is this crate's job (`wire.rs`), not the transport's —
/// the transport simply calls `handler` with the raw bytes of one message.
pub trait ControlTransport {
    fn poll(&mut self, handler: &mut dyn FnMut(&[u8]) -> PollAction) -> Result<usize>;

    fn close(&mut self);
}

/// Reads previously-committed fragments back out of the archive during
/// catch-up (spec §4.D).
pub trait SessionReader {
    /// Polls for fragments in `[start, end)` stream-position range the
    /// session was opened for, calling `handler` for each.
    fn poll(&mut self, handler: &mut dyn FragmentHandler) -> Result<usize>;

    fn is_done(&self) -> bool;
}

/// The archive: an on-disk record of previously-committed fragments used to
/// fill gaps the live data transport can't.
pub trait Archive {
    /// Opens a replay session over `[start_position, end_position)` of the
    /// stream identified by `stream_start_position`/`leadership_term`, or
    /// `None` if the archive has nothing to offer (e.g. not yet recorded that
    /// far) — absence, not failure.
    fn session(
        &mut self,
        leadership_term: i32,
        stream_start_position: i64,
        start_position: i64,
        end_position: i64,
    ) -> Option<Box<dyn SessionReader>>;

    fn close(&mut self);
}
