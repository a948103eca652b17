//! Time windows for viewing stored history.

use std::process::Command;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};

use crate::config::SystemPaths;
use crate::error::{Result, SampleError};
use crate::store::TimeRange;

/// Parse `YY/MM/DD-HH:MM:SS`, `YY/MM/DD-HH:MM`, `YY/MM/DD-HH` or `YY/MM/DD`.
///
/// Omitted time components are zero.
pub fn parse_user_time(input: &str) -> Result<NaiveDateTime> {
    let bad = || SampleError::BadTimeFormat {
        input: input.to_string(),
    };
    let trimmed = input.trim();
    let (date_part, time_part) = match trimmed.split_once('-') {
        Some((date, time)) => (date, Some(time)),
        None => (trimmed, None),
    };

    let date = NaiveDate::parse_from_str(date_part, "%y/%m/%d").map_err(|_| bad())?;

    let mut hms = [0u32; 3];
    if let Some(time_part) = time_part {
        let parts: Vec<&str> = time_part.split(':').collect();
        if parts.len() > 3 {
            return Err(bad());
        }
        for (slot, part) in hms.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad());
            }
            *slot = part.parse().map_err(|_| bad())?;
        }
    }
    let time = NaiveTime::from_hms_opt(hms[0], hms[1], hms[2]).ok_or_else(bad)?;
    Ok(date.and_time(time))
}

/// Combine explicit bounds with an optional login-session window.
///
/// An explicit bound always wins; the session only fills the sides the
/// user left open.
pub fn resolve_window(
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    session: Option<(NaiveDateTime, NaiveDateTime)>,
) -> TimeRange {
    let (session_from, session_to) = match session {
        Some((from, to)) => (Some(from), Some(to)),
        None => (None, None),
    };
    TimeRange {
        from: from.or(session_from),
        to: to.or(session_to),
    }
}

/// Start of the current login session and the present moment.
///
/// Asks `last` for the most recent login; when that is unavailable the
/// kernel boot time stands in.
pub fn session_window(paths: &SystemPaths) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let now = Local::now().naive_local();
    let start = match last_login() {
        Some(start) => start,
        None => {
            warn!("could not determine last login, using boot time as session start");
            boot_time(paths)?
        }
    };
    debug!("session window {start} .. {now}");
    Ok((start, now))
}

fn last_login() -> Option<NaiveDateTime> {
    let output = Command::new("last")
        .args(["-1", "--time-format", "iso"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_last_line(stdout.lines().next()?)
}

/// First ISO-8601 timestamp on a `last --time-format iso` line, in local time.
pub fn parse_last_line(line: &str) -> Option<NaiveDateTime> {
    line.split_whitespace().find_map(|token| {
        DateTime::parse_from_rfc3339(token)
            .or_else(|_| DateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S%z"))
            .ok()
            .map(|t| t.with_timezone(&Local).naive_local())
    })
}

fn boot_time(paths: &SystemPaths) -> Result<NaiveDateTime> {
    let path = paths.proc_stat();
    let raw = std::fs::read_to_string(&path)
        .map_err(|source| SampleError::CounterUnavailable { path: path.clone(), source })?;
    let seconds = parse_btime(&raw).ok_or_else(|| SampleError::CounterUnavailable {
        path,
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, "no btime line"),
    })?;
    DateTime::from_timestamp(seconds, 0)
        .map(|t| t.with_timezone(&Local).naive_local())
        .ok_or_else(|| SampleError::CounterUnavailable {
            path: paths.proc_stat(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "btime out of range"),
        })
}

fn parse_btime(raw: &str) -> Option<i64> {
    raw.lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|v| v.trim().parse().ok())
}
