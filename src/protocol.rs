// src/protocol.rs

//! Wire types for the snapd control API
//!
//! Every endpoint answers with the same envelope:
//!
//! ```json
//! {"type": "sync|async|error", "status-code": 200, "result": ...}
//! ```
//!
//! Async responses additionally carry a `change` id that must be polled to a
//! terminal status before the operation is considered complete.

use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

/// Response envelope common to every snapd endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    #[serde(rename = "status-code")]
    pub status_code: u16,
    #[serde(default)]
    pub result: Value,
    /// Change id, present on `async` responses
    #[serde(default)]
    pub change: Option<String>,
}

/// The three envelope kinds snapd emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Sync,
    Async,
    Error,
}

impl ApiResponse {
    /// Deserialize an envelope from a parsed JSON body.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::InvalidResponse(format!("malformed envelope: {}", e)))
    }

    /// Extract the change id from an asynchronous response.
    ///
    /// An `error` envelope here means the daemon rejected the request
    /// synchronously; its message is preserved verbatim.
    pub fn change_id(&self) -> Result<&str> {
        if self.kind == ResponseKind::Error {
            let message = self
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| self.result.to_string());
            return Err(Error::RequestRejected(message));
        }

        self.change.as_deref().ok_or_else(|| {
            Error::InvalidResponse("asynchronous response without a change id".to_string())
        })
    }

    /// Message from an `error` envelope's result, if present
    pub fn error_message(&self) -> Option<&str> {
        self.result.get("message")?.as_str()
    }
}

/// Status of an in-flight change, as reported by `GET /v2/changes/{id}`
///
/// Any string outside this set is a protocol violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Do,
    Doing,
    Undo,
    Undoing,
    Abort,
    Hold,
    Error,
    Done,
}

impl ChangeStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Do" => Some(Self::Do),
            "Doing" => Some(Self::Doing),
            "Undo" => Some(Self::Undo),
            "Undoing" => Some(Self::Undoing),
            "Abort" => Some(Self::Abort),
            "Hold" => Some(Self::Hold),
            "Error" => Some(Self::Error),
            "Done" => Some(Self::Done),
            _ => None,
        }
    }

    /// Still in flight; keep polling.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Do | Self::Doing | Self::Undo | Self::Undoing)
    }

    /// Terminal failure.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Abort | Self::Hold | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Do => "Do",
            Self::Doing => "Doing",
            Self::Undo => "Undo",
            Self::Undoing => "Undoing",
            Self::Abort => "Abort",
            Self::Hold => "Hold",
            Self::Error => "Error",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installed-snap record from `GET /v2/snaps`
///
/// A fresh projection on every query; the client never caches these.
#[derive(Debug, Clone, Deserialize)]
pub struct InstalledSnap {
    pub name: String,
    /// Channel the snap currently tracks
    #[serde(rename = "tracking-channel", default)]
    pub tracking_channel: Option<String>,
    /// Hold expiry (RFC 3339), set while automatic refreshes are inhibited
    #[serde(default)]
    pub hold: Option<String>,
}

/// Store candidate from `GET /v2/find`
#[derive(Debug, Clone, Deserialize)]
pub struct SnapCandidate {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}
