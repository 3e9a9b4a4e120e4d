//! Control dispatcher (spec §4.E): decodes heartbeat and resend control
//! envelopes and updates term/position state, including the two-phase term
//! switch ("update sources" then "update positions") that keeps a handler
//! ABORT from leaving the subscriber half-switched.

use crate::errors::*;
use crate::future_ack::FutureAck;
use crate::position;
use crate::subscriber::Subscriber;
use crate::transport::{FragmentHandler, FragmentHeader, PollAction};
use crate::wire::{self, ControlFrame};

impl Subscriber {
    /// Drains the control transport, dispatching each decoded frame, up to
    /// `limit` frames examined.
    pub(crate) fn drain_control(
        &mut self,
        handler: &mut dyn FragmentHandler,
        limit: usize,
    ) -> Result<usize> {
        let mut transport = match self.control_transport.take() {
            Some(transport) => transport,
            None => return Ok(0),
        };

        let mut consumed = 0usize;
        let poll_result = transport.poll(&mut |buf: &[u8]| {
            if consumed >= limit {
                return PollAction::Break;
            }
            let action = match wire::decode_control_frame(buf) {
                Ok(frame) => self.dispatch_control_frame(frame, handler),
                Err(_) => PollAction::Continue,
            };
            consumed += 1;
            action
        });

        self.control_transport = Some(transport);
        poll_result?;
        Ok(consumed)
    }

    /// Applies the head of the future-ack queue if its `start_position`
    /// matches `previous_consensus_position`. Never delivers fragments
    /// itself — the switch only updates metadata; the actual bytes are
    /// picked up by the data transport or archive once positions allow it.
    pub(crate) fn apply_ready_future_ack(&mut self) -> Option<()> {
        let ack = self
            .state
            .future_acks
            .pop_ready(self.state.previous_consensus_position)?;

        let length = position::term_length(ack.stream_start_position, ack.stream_position);
        let previous_consensus_position = ack.start_position + length;

        self.begin_term_switch(
            ack.leader_session_id,
            ack.term,
            ack.stream_start_position,
            ack.stream_position,
        );
        self.commit_term_switch(
            ack.term,
            ack.stream_start_position,
            ack.stream_position,
            previous_consensus_position,
        );
        Some(())
    }

    fn dispatch_control_frame(
        &mut self,
        frame: ControlFrame,
        handler: &mut dyn FragmentHandler,
    ) -> PollAction {
        match frame {
            ControlFrame::Heartbeat(hb) => self.dispatch_heartbeat(hb),
            ControlFrame::Resend(resend) => self.dispatch_resend(resend, handler),
            ControlFrame::Unknown { .. } => PollAction::Continue,
        }
    }

    fn dispatch_heartbeat(&mut self, hb: wire::Heartbeat) -> PollAction {
        let current_term = self.state.current_term;

        if position::is_stale(hb.leadership_term, current_term) {
            return PollAction::Continue;
        }

        if position::is_extension(hb.leadership_term, current_term) {
            if hb.stream_position > self.state.stream_consensus_position {
                self.state.stream_consensus_position = hb.stream_position;
            }
            self.state.previous_consensus_position = hb.position;
            return PollAction::Break;
        }

        let length = position::term_length(hb.stream_start_position, hb.stream_position);
        let start_consensus = position::start_consensus_position(hb.position, length);
        let had_no_image = self.state.leader_session_id.is_none();

        if position::is_next_term(hb.leadership_term, current_term, !had_no_image) {
            if start_consensus == self.state.previous_consensus_position {
                self.begin_term_switch(
                    hb.leader_session_id,
                    hb.leadership_term,
                    hb.stream_start_position,
                    hb.stream_position,
                );
                self.commit_term_switch(
                    hb.leadership_term,
                    hb.stream_start_position,
                    hb.stream_position,
                    hb.position,
                );
                if had_no_image && hb.leadership_term != 1 {
                    eprintln!(
                        "consensus_log: bootstrapping on leadership term {} (expected first term to be 1)",
                        hb.leadership_term
                    );
                }
                return PollAction::Break;
            }

            self.state.future_acks.push(FutureAck {
                term: hb.leadership_term,
                leader_session_id: hb.leader_session_id,
                start_position: start_consensus,
                stream_start_position: hb.stream_start_position,
                stream_position: hb.stream_position,
            });
            return PollAction::Continue;
        }

        debug_assert!(position::is_gap(hb.leadership_term, current_term));
        self.state.future_acks.push(FutureAck {
            term: hb.leadership_term,
            leader_session_id: hb.leader_session_id,
            start_position: start_consensus,
            stream_start_position: hb.stream_start_position,
            stream_position: hb.stream_position,
        });
        PollAction::Continue
    }

    fn dispatch_resend(
        &mut self,
        resend: wire::Resend,
        handler: &mut dyn FragmentHandler,
    ) -> PollAction {
        let body_len = resend.body.len() as i64;

        if resend.start_position < self.state.previous_consensus_position {
            return PollAction::Continue;
        }

        if resend.start_position > self.state.previous_consensus_position {
            self.state.future_acks.push(FutureAck {
                term: resend.leadership_term,
                leader_session_id: resend.leader_session_id,
                start_position: resend.start_position,
                stream_start_position: resend.stream_start_position,
                stream_position: resend.stream_start_position + body_len,
            });
            return PollAction::Continue;
        }

        let is_switch = self.state.current_term != Some(resend.leadership_term);
        let stream_end_position = resend.stream_start_position + body_len;

        if is_switch {
            self.begin_term_switch(
                resend.leader_session_id,
                resend.leadership_term,
                resend.stream_start_position,
                stream_end_position,
            );
        }

        let header = FragmentHeader::new(stream_end_position, self.cluster_stream_id);
        let action = handler.on_fragment(header, resend.body);

        if action == PollAction::Abort {
            return action;
        }

        if is_switch {
            self.commit_term_switch(
                resend.leadership_term,
                resend.stream_start_position,
                stream_end_position,
                resend.start_position + body_len,
            );
            // The resend body itself is the new term's first `body_len`
            // bytes, already handed to the caller above: the new term's
            // consumed-start is past them, not at its literal beginning, so
            // a live fragment covering the same range is skipped as stale
            // (spec S5/S6).
            self.state.last_applied_position = stream_end_position;
        } else {
            self.state.last_applied_position += body_len;
            self.state.previous_consensus_position += body_len;
        }

        // Mirrors the heartbeat-switch `Break` above: yield control back to
        // the driver after a committed advance instead of letting the control
        // drain over-consume into the next control message in the same poll.
        PollAction::Break
    }

    pub(crate) fn begin_term_switch(
        &mut self,
        leader_session_id: i32,
        term: i32,
        stream_start_position: i64,
        stream_end_position: i64,
    ) {
        self.state.leader_session_id = Some(leader_session_id);
        self.leader_archive_reader = self.archive.as_mut().and_then(|archive| {
            archive.session(term, stream_start_position, stream_start_position, stream_end_position)
        });
    }

    pub(crate) fn commit_term_switch(
        &mut self,
        term: i32,
        stream_start_position: i64,
        stream_end_position: i64,
        previous_consensus_position: i64,
    ) {
        self.state.current_term = Some(term);
        self.state.stream_consensus_position = stream_end_position;
        self.state.last_applied_position = stream_start_position;
        self.state.previous_consensus_position = previous_consensus_position;
    }
}
