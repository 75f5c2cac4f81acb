// src/transport.rs

//! HTTP/1.1 transport over the snapd Unix socket
//!
//! snapd exposes its control API exclusively on a Unix domain socket, so the
//! transport frames requests by hand instead of going through an HTTP client
//! stack: request line, fixed headers, `Content-Length` body, then read the
//! response to EOF (`Connection: close`).
//!
//! Two operational details live here so callers never see them:
//!
//! - Interim `1xx` responses (snapd can answer `100 Continue` before the
//!   final response) are skipped, not surfaced.
//! - Connect/read timeouts are retried up to a fixed bound. The daemon
//!   restarts during its own refresh and drops the socket mid-request;
//!   retrying at this layer keeps higher layers ignorant of that.

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::{Error, Result};

/// Well-known path of the snapd control socket
pub const SNAPD_SOCKET: &str = "/run/snapd.socket";

/// Retries allowed after the initial attempt before giving up
pub const MAX_RETRIES: u32 = 5;

/// Default per-attempt read/write timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A parsed HTTP response from the daemon
#[derive(Debug)]
pub struct HttpResponse {
    pub status_code: u16,
    #[allow(dead_code)]
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Parse the body as JSON.
    ///
    /// Every snapd response body is a JSON envelope; anything else is a
    /// protocol mismatch, not something to pass through.
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(self.body.trim())
            .map_err(|e| Error::InvalidResponse(format!("body is not valid JSON: {}", e)))
    }
}

/// One-connection-per-request transport to the daemon socket
#[derive(Debug, Clone)]
pub struct Transport {
    socket_path: PathBuf,
    timeout: Duration,
    max_retries: u32,
}

impl Transport {
    /// Transport against the default snapd socket
    pub fn new() -> Self {
        Self {
            socket_path: PathBuf::from(SNAPD_SOCKET),
            timeout: DEFAULT_TIMEOUT,
            max_retries: MAX_RETRIES,
        }
    }

    /// Transport against a custom socket path (tests, sandboxes)
    pub fn with_socket_path<P: AsRef<Path>>(socket_path: P) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            ..Self::new()
        }
    }

    /// Set the per-attempt connect/read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send a request, retrying timeouts up to the retry bound.
    ///
    /// Non-2xx statuses are returned unchanged; the transport does not
    /// interpret daemon semantics, only framing.
    pub fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> Result<HttpResponse> {
        let mut retries = 0;
        loop {
            match self.attempt(method, path, body) {
                Ok(response) => {
                    if retries > 0 {
                        debug!(retries, "request to snapd succeeded after retries");
                    }
                    return Ok(response);
                }
                Err(Error::Io(e)) if is_retryable(&e) => {
                    if retries >= self.max_retries {
                        return Err(Error::DaemonUnavailable {
                            attempts: retries,
                            source: e,
                        });
                    }
                    retries += 1;
                    warn!(
                        socket = %self.socket_path.display(),
                        retries,
                        "timeout talking to snapd, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// A single request/response exchange on a fresh connection
    fn attempt(&self, method: &str, path: &str, body: Option<&str>) -> Result<HttpResponse> {
        let mut stream = UnixStream::connect(&self.socket_path)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let payload = body.unwrap_or("");
        let request = format!(
            "{} {} HTTP/1.1\r\n\
             Host: localhost\r\n\
             Accept: application/json\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            method,
            path,
            payload.len(),
            payload
        );

        stream.write_all(request.as_bytes())?;

        let mut raw = String::new();
        stream.read_to_string(&mut raw)?;

        parse_http_response(&raw)
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

/// Connect/read timeouts worth retrying.
///
/// `ConnectionRefused` covers the window where the restarting daemon has not
/// re-bound its socket yet. Mid-stream drops (reset, broken pipe) are not
/// retried: by then the daemon may already be acting on the request, and
/// resubmitting it could queue the same change twice.
fn is_retryable(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::ConnectionRefused
    )
}

/// Parse a raw HTTP/1.1 response, skipping interim 1xx responses.
fn parse_http_response(raw: &str) -> Result<HttpResponse> {
    let mut rest = raw;
    loop {
        let (head, body) = rest
            .split_once("\r\n\r\n")
            .ok_or_else(|| Error::InvalidResponse("truncated response from snapd".to_string()))?;

        let mut lines = head.lines();
        let status_line = lines
            .next()
            .ok_or_else(|| Error::InvalidResponse("empty response from snapd".to_string()))?;

        let status_code: u16 = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                Error::InvalidResponse(format!("malformed status line: {}", status_line))
            })?;

        // Interim response; the final one follows on the same connection.
        if (100..200).contains(&status_code) {
            rest = body;
            continue;
        }

        let headers = lines
            .filter_map(|line| {
                line.split_once(':')
                    .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            })
            .collect();

        return Ok(HttpResponse {
            status_code,
            headers,
            body: body.to_string(),
        });
    }
}
