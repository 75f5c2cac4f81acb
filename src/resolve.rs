// src/resolve.rs

//! Channel and hold-time resolution
//!
//! Two caller-facing knobs can express the same intent twice: a desired
//! state ("ensure") value that may itself be a channel, and free-form
//! install options like `channel=latest/beta` or `hold_time=2025-10-10`.
//! This module reconciles them deterministically:
//!
//! - ensure wins over a `channel=` option; the option form is deprecated
//!   and only warned about.
//! - hold times default to the protocol sentinel `forever`, and anything
//!   the daemon reports more than 100 years out is treated as that
//!   sentinel too.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::warn;

use crate::{Error, Result};

/// Channel used when neither ensure nor options name one
pub const DEFAULT_CHANNEL: &str = "latest/stable";

/// Ensure values that carry state intent, not channel information
const RESERVED_ENSURE: [&str; 5] = ["present", "absent", "purged", "installed", "latest"];

/// Daemon-side holds this far in the future count as `forever`.
const FOREVER_HORIZON_DAYS: i64 = 365 * 100;

/// Extract a channel from an ensure value, if it names one
pub fn channel_from_ensure(value: &str) -> Option<&str> {
    if RESERVED_ENSURE.contains(&value) {
        None
    } else {
        Some(value)
    }
}

/// Extract a channel from a `channel=`-prefixed option string
pub fn channel_from_options(options: &[String]) -> Option<&str> {
    options
        .iter()
        .find_map(|opt| opt.strip_prefix("channel="))
}

/// Pick the effective channel from an ensure value and an option set.
///
/// Always yields a channel; `latest/stable` is the protocol default.
pub fn resolve_channel(ensure: Option<&str>, options: Option<&[String]>) -> String {
    let from_ensure = ensure.and_then(channel_from_ensure);
    let from_options = options.and_then(channel_from_options);

    match (from_ensure, from_options) {
        (Some(channel), Some(redundant)) => {
            warn!(
                "install option 'channel={}' is deprecated and redundant, using '{}'",
                redundant, channel
            );
            channel.to_string()
        }
        (Some(channel), None) => channel.to_string(),
        (None, Some(channel)) => {
            warn!(
                "install option 'channel' is deprecated, request '{}' as the desired state instead",
                channel
            );
            channel.to_string()
        }
        (None, None) => DEFAULT_CHANNEL.to_string(),
    }
}

/// A resolved hold duration: until a concrete instant, or indefinitely
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldTime {
    /// The protocol sentinel for an indefinite hold
    Forever,
    /// Hold until the given instant, serialized as strict RFC 3339
    Until(DateTime<FixedOffset>),
}

impl fmt::Display for HoldTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldTime::Forever => f.write_str("forever"),
            HoldTime::Until(t) => f.write_str(&t.to_rfc3339()),
        }
    }
}

/// Resolve the hold time from a `hold_time=`-prefixed option.
///
/// No option, or the literal `forever`, resolves to the sentinel. Anything
/// else is parsed permissively and normalized to RFC 3339.
pub fn resolve_hold_time(options: &[String]) -> Result<HoldTime> {
    let value = options
        .iter()
        .find_map(|opt| opt.strip_prefix("hold_time="));

    match value {
        None | Some("forever") => Ok(HoldTime::Forever),
        Some(value) => parse_datetime(value).map(HoldTime::Until),
    }
}

/// Permissive calendar parser for user-supplied hold times.
///
/// Accepts RFC 3339, a naive date-time (`T` or space separated, assumed
/// UTC), or a bare date (midnight UTC).
fn parse_datetime(value: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(t.and_utc().fixed_offset());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }

    Err(Error::InvalidHoldTime(value.to_string()))
}

/// Does the hold state need to be reasserted?
///
/// True when no hold is in place or the current hold differs from the
/// desired one. Daemon-side holds far enough out to be effectively
/// infinite are compared as `forever`, since snapd represents indefinite
/// holds with a concrete far-future timestamp rather than the sentinel.
pub fn should_replace_hold(desired: &HoldTime, current: Option<&str>) -> bool {
    should_replace_hold_at(desired, current, Utc::now())
}

fn should_replace_hold_at(
    desired: &HoldTime,
    current: Option<&str>,
    now: DateTime<Utc>,
) -> bool {
    let Some(current) = current else {
        return true;
    };

    let current = match normalize_current_hold(current, now) {
        Some(hold) => hold,
        // A hold we cannot even parse is not the desired one.
        None => return true,
    };

    current != *desired
}

fn normalize_current_hold(current: &str, now: DateTime<Utc>) -> Option<HoldTime> {
    if current == "forever" {
        return Some(HoldTime::Forever);
    }

    let parsed = parse_datetime(current).ok()?;
    let horizon = now + Duration::days(FOREVER_HORIZON_DAYS);
    if parsed.with_timezone(&Utc) > horizon {
        Some(HoldTime::Forever)
    } else {
        Some(HoldTime::Until(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reserved_ensure_values_carry_no_channel() {
        for reserved in ["present", "absent", "purged", "installed", "latest"] {
            assert_eq!(channel_from_ensure(reserved), None);
        }
        assert_eq!(channel_from_ensure("latest/beta"), Some("latest/beta"));
    }

    #[test]
    fn test_resolve_channel_defaults_to_latest_stable() {
        assert_eq!(resolve_channel(None, None), DEFAULT_CHANNEL);
        assert_eq!(resolve_channel(Some("present"), None), DEFAULT_CHANNEL);
    }

    #[test]
    fn test_resolve_channel_ensure_wins_over_option() {
        let options = opts(&["classic", "channel=latest/edge"]);
        assert_eq!(
            resolve_channel(Some("latest/beta"), Some(&options)),
            "latest/beta"
        );
    }

    #[test]
    fn test_resolve_channel_falls_back_to_option() {
        let options = opts(&["channel=latest/edge"]);
        assert_eq!(resolve_channel(Some("present"), Some(&options)), "latest/edge");
        assert_eq!(resolve_channel(None, Some(&options)), "latest/edge");
    }

    #[test]
    fn test_resolve_channel_is_idempotent() {
        let first = resolve_channel(Some("candidate/stable"), None);
        let second = resolve_channel(Some(&first), None);
        assert_eq!(first, second);

        let defaulted = resolve_channel(None, None);
        assert_eq!(resolve_channel(Some(&defaulted), None), defaulted);
    }

    #[test]
    fn test_hold_time_defaults_to_forever() {
        assert_eq!(resolve_hold_time(&[]).unwrap(), HoldTime::Forever);
        assert_eq!(
            resolve_hold_time(&opts(&["hold_time=forever"])).unwrap(),
            HoldTime::Forever
        );
        assert_eq!(
            resolve_hold_time(&opts(&["classic"])).unwrap(),
            HoldTime::Forever
        );
    }

    #[test]
    fn test_hold_time_parses_bare_dates() {
        let hold = resolve_hold_time(&opts(&["hold_time=2025-10-10"])).unwrap();
        assert_eq!(hold.to_string(), "2025-10-10T00:00:00+00:00");
    }

    #[test]
    fn test_hold_time_round_trips_rfc3339() {
        let hold = resolve_hold_time(&opts(&["hold_time=2025-10-10T12:30:00+02:00"])).unwrap();
        let formatted = hold.to_string();
        let reparsed = resolve_hold_time(&opts(&[&format!("hold_time={}", formatted)])).unwrap();
        assert_eq!(hold, reparsed);
    }

    #[test]
    fn test_hold_time_rejects_garbage() {
        assert!(matches!(
            resolve_hold_time(&opts(&["hold_time=next tuesday"])),
            Err(Error::InvalidHoldTime(_))
        ));
    }

    #[test]
    fn test_missing_current_hold_is_always_replaced() {
        let now = Utc::now();
        assert!(should_replace_hold_at(&HoldTime::Forever, None, now));
        let desired = HoldTime::Until(parse_datetime("2025-10-10").unwrap());
        assert!(should_replace_hold_at(&desired, None, now));
    }

    #[test]
    fn test_matching_hold_is_kept() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let desired = HoldTime::Until(parse_datetime("2026-10-10T00:00:00+00:00").unwrap());

        // Same instant, different offset spelling.
        assert!(!should_replace_hold_at(
            &desired,
            Some("2026-10-10T02:00:00+02:00"),
            now
        ));
        assert!(should_replace_hold_at(
            &desired,
            Some("2026-10-11T00:00:00+00:00"),
            now
        ));
    }

    #[test]
    fn test_far_future_hold_counts_as_forever() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        // snapd reports indefinite holds as concrete far-future timestamps.
        assert!(!should_replace_hold_at(
            &HoldTime::Forever,
            Some("2262-04-11T23:47:16Z"),
            now
        ));
        assert!(should_replace_hold_at(
            &HoldTime::Forever,
            Some("2027-01-01T00:00:00Z"),
            now
        ));
    }
}
