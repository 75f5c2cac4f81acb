// src/lib.rs

//! snapd-client
//!
//! Client for the snap daemon's control API, which is exposed exclusively
//! over a Unix domain socket speaking HTTP/1.1.
//!
//! # Architecture
//!
//! - `transport` - HTTP framing over the socket, timeout retries
//! - `protocol` - response envelope, change statuses, snap records
//! - `request` - action verbs and the `/v2/snaps/{name}` body builder
//! - `resolve` - channel and hold-time reconciliation
//! - `poller` - blocking wait for asynchronous changes
//! - `client` - the façade composing all of the above
//!
//! Package actions are asynchronous on the daemon side: submitting one
//! returns a change id. The client hides that by polling every change to a
//! terminal status before returning, so each call is an ordinary blocking
//! operation with an ordinary `Result`.

mod error;

pub mod client;
pub mod poller;
pub mod protocol;
pub mod request;
pub mod resolve;
pub mod transport;

pub use client::{SnapdClient, daemon_socket_present};
pub use error::{Error, Result};
pub use poller::{ChangePoller, POLL_INTERVAL};
pub use protocol::{ApiResponse, ChangeStatus, InstalledSnap, ResponseKind, SnapCandidate};
pub use request::{Action, build_request};
pub use resolve::{
    DEFAULT_CHANNEL, HoldTime, resolve_channel, resolve_hold_time, should_replace_hold,
};
pub use transport::{MAX_RETRIES, SNAPD_SOCKET, Transport};
