// src/request.rs

//! Action verbs and the daemon request builder
//!
//! `build_request` is a pure mapping from (action, resolved channel,
//! options) to the JSON body `POST /v2/snaps/{name}` expects. It does no
//! network or clock access; hold times come pre-resolved from the option
//! set via the resolver.

use std::fmt;

use serde_json::{Map, Value, json};

use crate::Result;
use crate::resolve::resolve_hold_time;

/// Package lifecycle verb sent to the daemon
///
/// The protocol accepts more (e.g. `switch`, `enable`), but these are the
/// ones this client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Refresh,
    Remove,
    Revert,
    Hold,
    Unhold,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Refresh => "refresh",
            Self::Remove => "remove",
            Self::Revert => "revert",
            Self::Hold => "hold",
            Self::Unhold => "unhold",
        }
    }

    /// Confinement flags (`classic`, `devmode`, `jailmode`) only apply to
    /// these actions.
    fn supports_confinement_flags(self) -> bool {
        matches!(self, Self::Install | Self::Refresh | Self::Revert)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the JSON body for a snap action.
///
/// Identical inputs always yield an identical mapping. Flag membership in
/// `options` is exact; `hold_time=` is a prefix match handled by the
/// resolver.
pub fn build_request(
    action: Action,
    channel: Option<&str>,
    options: Option<&[String]>,
) -> Result<Value> {
    let mut body = Map::new();
    body.insert("action".to_string(), json!(action.as_str()));

    if let Some(channel) = channel {
        body.insert("channel".to_string(), json!(channel));
    }

    if action == Action::Hold {
        body.insert("hold-level".to_string(), json!("general"));
        let time = resolve_hold_time(options.unwrap_or(&[]))?;
        body.insert("time".to_string(), json!(time.to_string()));
    }

    if let Some(options) = options {
        if action.supports_confinement_flags() {
            for flag in ["classic", "devmode", "jailmode"] {
                if options.iter().any(|opt| opt == flag) {
                    body.insert(flag.to_string(), json!(true));
                }
            }
        }

        if action == Action::Remove && options.iter().any(|opt| opt == "purge") {
            body.insert("purge".to_string(), json!(true));
        }
    }

    Ok(Value::Object(body))
}
