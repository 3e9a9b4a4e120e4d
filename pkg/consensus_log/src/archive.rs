//! Archive catch-up (spec §4.D): replays committed bytes from the on-disk
//! archive when the live data image hasn't caught up with what consensus has
//! already committed.

use crate::errors::*;
use crate::subscriber::{Subscriber, FRAME_HEADER_LEN};
use crate::transport::{FragmentHandler, FragmentHeader, PollAction};

impl Subscriber {
    /// Reads as much of `[lastAppliedPosition, streamConsensusPosition)` as
    /// the currently-open archive session for the leader can deliver,
    /// skipping the first `FRAME_HEADER_LEN` bytes already accounted for by
    /// the prior delivery (the archive's on-disk frames carry their own
    /// header, unlike the logical positions this crate otherwise tracks).
    /// Returns `true` iff at least one fragment was delivered.
    pub(crate) fn try_catch_up_from_archive(
        &mut self,
        handler: &mut dyn FragmentHandler,
    ) -> Result<bool> {
        if self.state.stream_consensus_position <= self.state.last_applied_position {
            return Ok(false);
        }

        let reader = match self.leader_archive_reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(false),
        };

        let stream_consensus_position = self.state.stream_consensus_position;
        let skip_before = self.state.last_applied_position + FRAME_HEADER_LEN;
        let mut last_applied_position = self.state.last_applied_position;
        let mut progressed = false;

        let mut wrapped = |header: FragmentHeader, body: &[u8]| -> PollAction {
            let fragment_length = body.len() as i64;
            let fragment_start_position = header.position - fragment_length;

            if header.position > stream_consensus_position {
                return PollAction::Abort;
            }
            if fragment_start_position < skip_before {
                return PollAction::Continue;
            }

            let action = handler.on_fragment(header, body);
            if action != PollAction::Abort {
                last_applied_position = header.position;
                progressed = true;
            }
            action
        };

        reader.poll(&mut wrapped)?;

        if reader.is_done() {
            self.leader_archive_reader = None;
        }

        if progressed {
            self.state.last_applied_position = last_applied_position;
            Ok(true)
        } else {
            eprintln!(
                "consensus_log: archive catch-up made no progress at stream position {}",
                self.state.last_applied_position
            );
            Ok(false)
        }
    }
}
