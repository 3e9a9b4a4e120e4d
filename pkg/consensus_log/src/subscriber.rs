//! Subscriber driver (spec §4.F): the public `poll` entry point and the state
//! it threads through the Message Filter, Control Dispatcher, and Archive
//! Catch-Up (§4.C/§4.E/§4.D, in `filter.rs`/`control.rs`/`archive.rs`).

use crate::errors::*;
use crate::future_ack::FutureAckQueue;
use crate::transport::{Archive, ControlTransport, DataTransport, FragmentHandler, Image};

/// Length in bytes of the synthetic header this crate constructs for bytes
/// delivered out of a resend or an archive replay, analogous to a data
/// transport's own per-fragment header length. Simplified from the upstream
/// Aeron design's image-bound synthetic header (initial term id + term
/// buffer length), since this crate's `FragmentHeader` carries only a
/// position and a reserved value; see DESIGN.md.
pub const FRAME_HEADER_LEN: i64 = 32;

/// Mutable state held by the subscriber (spec §3's "State held by the
/// subscriber" table), separated from the `Subscriber` struct itself so that
/// `control.rs`/`filter.rs`/`archive.rs` can each borrow just the state they
/// need alongside the transport/archive handles.
pub(crate) struct SubscriberState {
    pub current_term: Option<i32>,
    pub stream_consensus_position: i64,
    pub last_applied_position: i64,
    pub previous_consensus_position: i64,
    pub leader_session_id: Option<i32>,
    pub future_acks: FutureAckQueue,
}

impl SubscriberState {
    fn new() -> Self {
        Self {
            current_term: None,
            stream_consensus_position: 0,
            last_applied_position: 0,
            previous_consensus_position: 0,
            leader_session_id: None,
            future_acks: FutureAckQueue::new(),
        }
    }
}

/// A single-reader cluster log subscriber. Owns a data transport, a control
/// transport, and an archive, plus a scoped archive reader for the current
/// leader's session once one has been opened.
///
/// Non-thread-safe by design (spec §5): one instance per consumer thread.
pub struct Subscriber {
    pub(crate) cluster_stream_id: i64,
    pub(crate) data_transport: Option<Box<dyn DataTransport>>,
    pub(crate) control_transport: Option<Box<dyn ControlTransport>>,
    pub(crate) archive: Option<Box<dyn Archive>>,
    pub(crate) leader_archive_reader: Option<Box<dyn crate::transport::SessionReader>>,
    pub(crate) state: SubscriberState,
}

impl Subscriber {
    /// Validates `cluster_stream_id != 0` per spec §4.H/§6 ("a zero tag means
    /// 'no filter'") before accepting ownership of the three collaborators.
    pub fn new(
        cluster_stream_id: i64,
        data_transport: Box<dyn DataTransport>,
        control_transport: Box<dyn ControlTransport>,
        archive: Box<dyn Archive>,
    ) -> Result<Self> {
        if cluster_stream_id == 0 {
            return Err(SubscriberError::Configuration(
                "cluster_stream_id must be non-zero".to_string(),
            )
            .into());
        }

        Ok(Self {
            cluster_stream_id,
            data_transport: Some(data_transport),
            control_transport: Some(control_transport),
            archive: Some(archive),
            leader_archive_reader: None,
            state: SubscriberState::new(),
        })
    }

    /// `streamConsensusPosition`: the highest stream position of the current
    /// term that consensus has committed.
    pub fn stream_position(&self) -> i64 {
        self.state.stream_consensus_position
    }

    /// Same value as `stream_position()` regardless of `session_id`: a
    /// single-reader subscriber only ever tracks one position. The parameter
    /// is preserved for interface symmetry with multi-session APIs (spec §9,
    /// "Unused parameter").
    pub fn position_of(&self, _session_id: i32) -> i64 {
        self.state.stream_consensus_position
    }

    pub fn current_leadership_term(&self) -> i32 {
        self.state.current_term.unwrap_or(0)
    }

    /// True when the driver cannot make forward progress purely by polling
    /// the live data image: no image yet, or the image has already consumed
    /// everything consensus has committed so far.
    fn cannot_advance(&mut self) -> bool {
        let transport = match self.data_transport.as_mut() {
            Some(t) => t,
            None => return true,
        };
        let session_id = match self.state.leader_session_id {
            Some(sid) => sid,
            None => return true,
        };
        match transport.image_by_session_id(session_id) {
            Some(image) => self.state.stream_consensus_position <= image.position(),
            None => true,
        }
    }

    /// Orchestrates the Control Dispatcher, Archive Catch-Up, and Message
    /// Filter to deliver up to `limit` fragments, per spec §4.F's algorithm.
    pub fn poll(&mut self, handler: &mut dyn FragmentHandler, limit: usize) -> Result<usize> {
        if self.cannot_advance() {
            if self.apply_ready_future_ack().is_none() {
                self.drain_control(handler, limit)?;
            }

            if self.cannot_advance() {
                return match self.try_catch_up_from_archive(handler)? {
                    true => Ok(1),
                    false => Ok(0),
                };
            }

            self.try_catch_up_from_archive(handler)?;
        }

        self.poll_data(handler, limit)
    }

    /// Releases the three owned resources exactly once; safe to call
    /// repeatedly (property 6, "Close idempotence"), following the teacher's
    /// `Option<T>::take()` one-shot-release idiom.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.data_transport.take() {
            transport.close();
        }
        if let Some(mut transport) = self.control_transport.take() {
            transport.close();
        }
        if let Some(mut archive) = self.archive.take() {
            archive.close();
        }
        self.leader_archive_reader = None;
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{FragmentHeader, PollAction};

    struct EmptyDataTransport;
    impl DataTransport for EmptyDataTransport {
        fn image_by_session_id(&mut self, _session_id: i32) -> Option<&mut dyn Image> {
            None
        }
        fn close(&mut self) {}
    }

    struct EmptyControlTransport;
    impl ControlTransport for EmptyControlTransport {
        fn poll(&mut self, _handler: &mut dyn FnMut(&[u8]) -> PollAction) -> Result<usize> {
            Ok(0)
        }
        fn close(&mut self) {}
    }

    struct EmptyArchive;
    impl Archive for EmptyArchive {
        fn session(
            &mut self,
            _leadership_term: i32,
            _stream_start_position: i64,
            _start_position: i64,
            _end_position: i64,
        ) -> Option<Box<dyn crate::transport::SessionReader>> {
            None
        }
        fn close(&mut self) {}
    }

    #[test]
    fn rejects_zero_cluster_stream_id() {
        let result = Subscriber::new(
            0,
            Box::new(EmptyDataTransport),
            Box::new(EmptyControlTransport),
            Box::new(EmptyArchive),
        );
        assert!(result.is_err());
    }

    #[test]
    fn close_is_idempotent() {
        let mut subscriber = Subscriber::new(
            1,
            Box::new(EmptyDataTransport),
            Box::new(EmptyControlTransport),
            Box::new(EmptyArchive),
        )
        .unwrap();
        subscriber.close();
        subscriber.close();
    }

    #[test]
    fn poll_with_no_image_and_no_control_progress_returns_zero() {
        let mut subscriber = Subscriber::new(
            1,
            Box::new(EmptyDataTransport),
            Box::new(EmptyControlTransport),
            Box::new(EmptyArchive),
        )
        .unwrap();

        let mut handler = |_header: FragmentHeader, _body: &[u8]| PollAction::Continue;
        let delivered = subscriber.poll(&mut handler, 10).unwrap();
        assert_eq!(delivered, 0);
    }
}
