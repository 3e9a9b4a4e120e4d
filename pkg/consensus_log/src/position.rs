//! Position arithmetic (spec §4.A). Converts between consensus positions and
//! per-publication stream positions and classifies a heartbeat's term against
//! the currently-applied term. No struct here: a handful of free functions,
//! mirroring the teacher's small binary-format helper modules (e.g.
//! `pkg/net/src/ip_syntax.rs`).

/// `length = streamEnd - streamStart` for a heartbeat's announced range.
pub fn term_length(stream_start_position: i64, stream_position: i64) -> i64 {
    stream_position - stream_start_position
}

/// The consensus position at which a term beginning at `position` (the
/// consensus-space end of the announced range) and spanning `length` bytes
/// started: `p - length`.
pub fn start_consensus_position(position: i64, length: i64) -> i64 {
    position - length
}

/// A term is "next" if it is the current term's successor, or if there is no
/// current image at all yet (first-time bootstrap, §4.A / §9's Open
/// Question). The second disjunct is intentionally permissive: preserved as
/// specified rather than tightened, per DESIGN.md.
pub fn is_next_term(term: i32, current_term: Option<i32>, has_image: bool) -> bool {
    if !has_image {
        return true;
    }
    match current_term {
        Some(current) => term == current.wrapping_add(1),
        None => true,
    }
}

/// A term is an "extension" of the current term if it *is* the current term:
/// the heartbeat only widens `streamConsensusPosition`, no switch occurs.
pub fn is_extension(term: i32, current_term: Option<i32>) -> bool {
    current_term == Some(term)
}

/// A term we never saw the start of: strictly more than one term ahead of the
/// current term. Must be buffered as a `FutureAck` rather than applied.
pub fn is_gap(term: i32, current_term: Option<i32>) -> bool {
    match current_term {
        Some(current) => term > current.wrapping_add(1),
        None => false,
    }
}

/// A heartbeat for a term strictly behind the current one never mutates
/// state (invariant 4 in the spec's Data Model section).
pub fn is_stale(term: i32, current_term: Option<i32>) -> bool {
    match current_term {
        Some(current) => term < current,
        None => false,
    }
}
