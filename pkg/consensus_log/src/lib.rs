//! Single-reader cluster log subscriber: reconstructs an ordered, gap-free
//! stream of application fragments from a replicated log by reconciling a
//! data transport (application fragments, published by whoever leads at the
//! time) with a control transport (consensus heartbeats and resends), falling
//! back to an on-disk archive when the data transport lags consensus.
//!
//! See the component breakdown: `position` (§4.A), `future_ack` (§4.B),
//! `filter` (§4.C), `archive` (§4.D), `control` (§4.E), `subscriber` (§4.F).

mod archive;
mod control;
mod filter;
pub mod errors;
pub mod future_ack;
pub mod position;
pub mod subscriber;
pub mod transport;
pub mod wire;

pub use errors::{Error, Result};
pub use subscriber::Subscriber;
pub use transport::{
    Archive, ControlTransport, DataTransport, FragmentHandler, FragmentHeader, Image, PollAction,
    SessionReader,
};
