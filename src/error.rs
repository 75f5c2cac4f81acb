// src/error.rs

//! Error types for the snapd client.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to snapd
#[derive(Debug, Error)]
pub enum Error {
    /// The daemon socket kept timing out and the retry budget ran out.
    ///
    /// snapd briefly restarts while refreshing itself (e.g. the core snap),
    /// which drops connections mid-request; the transport retries through
    /// that window before giving up with this error.
    #[error("snapd did not respond after {attempts} retries: {source}")]
    DaemonUnavailable {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// The daemon sent something that is not the documented protocol
    /// (non-JSON body, malformed HTTP framing, unknown change status).
    #[error("invalid response from snapd: {0}")]
    InvalidResponse(String),

    /// The daemon answered an expected-asynchronous request with an error
    /// envelope. The message is the daemon's, verbatim.
    #[error("snapd rejected the request: {0}")]
    RequestRejected(String),

    /// A change reached a terminal failure status (Abort, Hold or Error).
    #[error("change {id} failed: {payload}")]
    ChangeFailed {
        id: String,
        payload: serde_json::Value,
    },

    /// A status code outside the documented set for an endpoint.
    #[error("unexpected status {status_code} from {endpoint}")]
    UnexpectedDaemonResponse { status_code: u16, endpoint: String },

    /// A `hold_time=` option value that is neither `forever` nor a date.
    #[error("could not parse hold time {0:?}")]
    InvalidHoldTime(String),

    /// Socket-level I/O failure that is not a retryable timeout.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
