// src/client.rs

//! Daemon client façade
//!
//! The only type callers need. Composes the transport, request builder and
//! change poller into blocking package operations:
//!
//! ```ignore
//! use snapd_client::SnapdClient;
//!
//! let client = SnapdClient::new();
//! client.install("hello", Some("latest/stable"), None)?;
//! for snap in client.list_installed()? {
//!     println!("{} tracks {:?}", snap.name, snap.tracking_channel);
//! }
//! ```
//!
//! Each operation is strictly synchronous: a `modify` call does not return
//! until its change reached a terminal status, so sequential callers
//! observe the daemon's state in program order.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};
use url::form_urlencoded;

use crate::poller::ChangePoller;
use crate::protocol::{ApiResponse, InstalledSnap, SnapCandidate};
use crate::request::{Action, build_request};
use crate::transport::{SNAPD_SOCKET, Transport};
use crate::{Error, Result};

/// Whether the snapd control socket exists on this host.
///
/// Cheap precondition check for callers that want to skip the client
/// entirely on hosts without snapd.
pub fn daemon_socket_present() -> bool {
    Path::new(SNAPD_SOCKET).exists()
}

/// Blocking client for the snapd control API
#[derive(Debug, Clone)]
pub struct SnapdClient {
    transport: Transport,
    poller: ChangePoller,
}

impl SnapdClient {
    /// Client against the default snapd socket
    pub fn new() -> Self {
        Self {
            transport: Transport::new(),
            poller: ChangePoller::new(),
        }
    }

    /// Client against a custom socket path (tests, sandboxes)
    pub fn with_socket_path<P: AsRef<Path>>(socket_path: P) -> Self {
        Self {
            transport: Transport::with_socket_path(socket_path),
            poller: ChangePoller::new(),
        }
    }

    /// Set the per-attempt connect/read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_timeout(timeout);
        self
    }

    /// Set the wait between change-status polls
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller = ChangePoller::with_interval(interval);
        self
    }

    /// `GET` an endpoint and parse the envelope
    pub fn get(&self, path: &str) -> Result<ApiResponse> {
        self.call("GET", path, None)
    }

    /// `POST` a JSON body and parse the envelope
    pub fn post(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.call("POST", path, Some(body))
    }

    /// `PUT` a JSON body and parse the envelope
    pub fn put(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.call("PUT", path, Some(body))
    }

    fn call(&self, method: &str, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        debug!(method, path, "calling snapd");
        let body_text = body.map(Value::to_string);
        let response = self
            .transport
            .request(method, path, body_text.as_deref())?;
        ApiResponse::from_value(response.json()?)
    }

    /// Submit an action for a snap and block until its change completes.
    ///
    /// The request body is built per the daemon schema from the action,
    /// the resolved channel and the option set; the response's change id
    /// is then polled to a terminal status.
    pub fn modify(
        &self,
        action: Action,
        name: &str,
        channel: Option<&str>,
        options: Option<&[String]>,
    ) -> Result<()> {
        let body = build_request(action, channel, options)?;
        info!(snap = name, action = %action, "submitting snap action");

        let response = self.post(&format!("/v2/snaps/{}", name), &body)?;
        let change_id = response.change_id()?.to_string();

        debug!(snap = name, change = %change_id, "waiting for change");
        self.poller
            .wait(&change_id, |id| self.get(&format!("/v2/changes/{}", id)))
    }

    /// Install a snap from a channel
    pub fn install(
        &self,
        name: &str,
        channel: Option<&str>,
        options: Option<&[String]>,
    ) -> Result<()> {
        self.modify(Action::Install, name, channel, options)
    }

    /// Refresh a snap, optionally switching its channel
    pub fn refresh(
        &self,
        name: &str,
        channel: Option<&str>,
        options: Option<&[String]>,
    ) -> Result<()> {
        self.modify(Action::Refresh, name, channel, options)
    }

    /// Remove a snap, keeping its data snapshot
    pub fn remove(&self, name: &str) -> Result<()> {
        self.modify(Action::Remove, name, None, None)
    }

    /// Remove a snap without saving a data snapshot
    pub fn purge(&self, name: &str) -> Result<()> {
        let options = vec!["purge".to_string()];
        self.modify(Action::Remove, name, None, Some(&options))
    }

    /// Hold automatic refreshes for a snap (`hold_time=` option, else forever)
    pub fn hold(&self, name: &str, options: Option<&[String]>) -> Result<()> {
        self.modify(Action::Hold, name, None, options)
    }

    /// Lift a refresh hold
    pub fn unhold(&self, name: &str) -> Result<()> {
        self.modify(Action::Unhold, name, None, None)
    }

    /// List installed snaps.
    ///
    /// 404 means nothing is installed and yields an empty list; any status
    /// other than 200/404 is outside the endpoint's contract.
    pub fn list_installed(&self) -> Result<Vec<InstalledSnap>> {
        let response = self.get("/v2/snaps")?;
        match response.status_code {
            200 => serde_json::from_value(response.result)
                .map_err(|e| Error::InvalidResponse(format!("malformed snap list: {}", e))),
            404 => Ok(Vec::new()),
            status_code => Err(Error::UnexpectedDaemonResponse {
                status_code,
                endpoint: "/v2/snaps".to_string(),
            }),
        }
    }

    /// Query the store for candidate snaps by name
    pub fn find(&self, name: &str) -> Result<Vec<SnapCandidate>> {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("name", name)
            .finish();
        let path = format!("/v2/find?{}", query);

        let response = self.get(&path)?;
        match response.status_code {
            200 => serde_json::from_value(response.result)
                .map_err(|e| Error::InvalidResponse(format!("malformed find result: {}", e))),
            404 => Ok(Vec::new()),
            status_code => Err(Error::UnexpectedDaemonResponse {
                status_code,
                endpoint: "/v2/find".to_string(),
            }),
        }
    }

    /// Read one configuration option of a snap.
    ///
    /// Returns `None` when the option is not set. `snap` may be the
    /// reserved name `system` for system-wide options.
    pub fn get_conf(&self, snap: &str, key: &str) -> Result<Option<Value>> {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("keys", key)
            .finish();
        let path = format!("/v2/snaps/{}/conf?{}", snap, query);

        let response = self.get(&path)?;
        match response.status_code {
            200 => Ok(response
                .result
                .get(key)
                .filter(|value| !value.is_null())
                .cloned()),
            400 if response.result.get("kind").and_then(Value::as_str)
                == Some("option-not-found") =>
            {
                Ok(None)
            }
            status_code => Err(Error::UnexpectedDaemonResponse {
                status_code,
                endpoint: format!("/v2/snaps/{}/conf", snap),
            }),
        }
    }

    /// Write one configuration option of a snap and wait for completion.
    ///
    /// Setting `Value::Null` unsets the option.
    pub fn set_conf(&self, snap: &str, key: &str, value: Value) -> Result<()> {
        let mut entries = serde_json::Map::new();
        entries.insert(key.to_string(), value);
        let body = Value::Object(entries);
        info!(snap, key, "writing snap configuration");

        let response = self.put(&format!("/v2/snaps/{}/conf", snap), &body)?;
        let change_id = response.change_id()?.to_string();

        self.poller
            .wait(&change_id, |id| self.get(&format!("/v2/changes/{}", id)))
    }
}

impl Default for SnapdClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_client_points_at_snapd_socket() {
        let client = SnapdClient::new();
        assert_eq!(client.transport.socket_path(), Path::new(SNAPD_SOCKET));
    }

    #[test]
    fn test_custom_socket_path() {
        let client = SnapdClient::with_socket_path("/tmp/snapd-test.socket");
        assert_eq!(
            client.transport.socket_path(),
            Path::new("/tmp/snapd-test.socket")
        );
    }
}
