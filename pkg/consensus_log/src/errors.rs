//! Crate-local error plumbing, following `dennisss/dacha`'s `common::errors`
//! convention: a `Result<T>` alias over `failure::Error`, plus the two
//! `failure` re-exports used everywhere for ad hoc errors.

pub use failure::err_msg;
pub use failure::format_err;
pub use failure::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The semantic error kinds named in the spec (§7). Most internal code raises
/// ad hoc errors with `err_msg`/`format_err!` like the rest of the teacher's
/// crates; this enum exists so callers who want to match on kind (rather than
/// just print the error) have something to match on. It converts into the
/// `Error` alias above via `failure::Fail`'s blanket `Into<failure::Error>`.
#[derive(Debug, failure::Fail)]
pub enum SubscriberError {
    #[fail(display = "invalid cluster stream id: {}", _0)]
    Configuration(String),

    #[fail(display = "transport error: {}", _0)]
    Transport(String),
}
