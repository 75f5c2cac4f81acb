// src/poller.rs

//! Waits for asynchronous changes to reach a terminal status
//!
//! Submitting an action yields a change id, not a result. The poller turns
//! that id into a blocking wait: fetch the change, sleep, repeat until the
//! daemon reports a terminal status. The loop is unbounded by iteration
//! count; the daemon is trusted to terminate every change, and a caller
//! that needs a deadline runs the whole call under its own timeout.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::protocol::{ApiResponse, ChangeStatus};
use crate::{Error, Result};

/// Default wait between status polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep-and-repeat poller for change completion
#[derive(Debug, Clone)]
pub struct ChangePoller {
    interval: Duration,
}

impl ChangePoller {
    pub fn new() -> Self {
        Self {
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Poll `fetch` (typically `GET /v2/changes/{id}`) until the change is
    /// terminal.
    ///
    /// Returns `Ok(())` on `Done`. A terminal failure or an unknown status
    /// string embeds the daemon's full status payload in the error. Fetch
    /// errors propagate immediately; transport retries already happened a
    /// layer below.
    pub fn wait<F>(&self, id: &str, mut fetch: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<ApiResponse>,
    {
        loop {
            let response = fetch(id)?;
            let status = response
                .result
                .get("status")
                .and_then(|s| s.as_str())
                .and_then(ChangeStatus::parse);

            match status {
                Some(status) if status.is_running() => {
                    debug!(change = id, status = %status, "change still running");
                    thread::sleep(self.interval);
                }
                Some(ChangeStatus::Done) => {
                    debug!(change = id, "change complete");
                    return Ok(());
                }
                Some(_) => {
                    return Err(Error::ChangeFailed {
                        id: id.to_string(),
                        payload: response.result,
                    });
                }
                None => {
                    return Err(Error::InvalidResponse(format!(
                        "unknown change status in {}",
                        response.result
                    )));
                }
            }
        }
    }
}

impl Default for ChangePoller {
    fn default() -> Self {
        Self::new()
    }
}
