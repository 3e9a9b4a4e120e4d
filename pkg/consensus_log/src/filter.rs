//! Message Filter (spec §4.C): the stateful gate that decides, per fragment
//! off the live data transport, whether the caller's handler ever sees it.
//! Grounded on `pkg/net/src/dns/client.rs`'s single early-return `match`
//! chain over a fixed priority list of outcomes (see DESIGN.md), generalized
//! here to the five ordered rules the spec lays out.

use crate::errors::*;
use crate::subscriber::Subscriber;
use crate::transport::{FragmentHandler, FragmentHeader, Image, PollAction};
use crate::wire;

impl Subscriber {
    /// Polls the data transport image for the current leader's session
    /// through the five-rule filter, delivering accepted fragments to
    /// `handler`. Returns the number of fragments delivered (rule 5 only;
    /// skipped fragments under rules 2-4 don't count).
    pub(crate) fn poll_data(&mut self, handler: &mut dyn FragmentHandler, limit: usize) -> Result<usize> {
        let leader_session_id = match self.state.leader_session_id {
            Some(sid) => sid,
            None => return Ok(0),
        };

        let transport = match self.data_transport.as_mut() {
            Some(transport) => transport,
            None => return Ok(0),
        };

        let image: &mut dyn Image = match transport.image_by_session_id(leader_session_id) {
            Some(image) => image,
            None => return Ok(0),
        };

        let stream_consensus_position = self.state.stream_consensus_position;
        let cluster_stream_id = self.cluster_stream_id;
        let last_applied_position = &mut self.state.last_applied_position;
        let mut delivered = 0usize;

        let mut filter = |header: FragmentHeader, body: &[u8]| -> PollAction {
            if delivered >= limit {
                return PollAction::Break;
            }

            let fragment_length = body.len() as i64;
            let fragment_start_position = header.position - fragment_length;

            // Rule 1: not yet committed by consensus. ABORT stops the
            // transport's internal fragment loop cleanly at the commit
            // boundary (§9's "Message filter on the hot path").
            if header.position > stream_consensus_position {
                return PollAction::Abort;
            }

            // Rule 2: already delivered, or published by a since-superseded
            // leader whose bytes must never reach the caller.
            if fragment_start_position < *last_applied_position {
                return PollAction::Continue;
            }

            // Rule 3: not this subscriber's cluster-stream.
            if wire::extract_cluster_stream_id(header.reserved_value) != cluster_stream_id {
                return PollAction::Continue;
            }

            // Rule 4: in-band control noise (a heartbeat that leaked onto the
            // data stream) rather than an application fragment.
            if let Some(template_id) = wire::peek_template_id(body) {
                if template_id == wire::TEMPLATE_ID_HEARTBEAT || template_id == wire::TEMPLATE_ID_RESEND {
                    return PollAction::Continue;
                }
            }

            // Rule 5: deliver. Advance past it unless the caller aborts.
            let action = handler.on_fragment(header, body);
            if action != PollAction::Abort {
                *last_applied_position += fragment_length;
                delivered += 1;
            }
            action
        };

        image.poll(&mut filter)?;
        Ok(delivered)
    }
}
