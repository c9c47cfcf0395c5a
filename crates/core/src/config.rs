//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the core services.
//! Request handling never reads process-wide environment variables, so every request in a
//! running process sees the same timezone, page size and data directory.

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_UTC_OFFSET, HOSPITAL_PAGEABLE_COUNT};
use crate::{CoreError, CoreResult};
use chrono::{FixedOffset, Offset, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    utc_offset: FixedOffset,
    page_size: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(data_dir: PathBuf, utc_offset: FixedOffset, page_size: usize) -> CoreResult<Self> {
        if page_size == 0 {
            return Err(CoreError::InvalidInput(
                "page_size must be at least 1".into(),
            ));
        }

        Ok(Self {
            data_dir,
            utc_offset,
            page_size,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The fixed operating timezone all "today" and "now" readings use.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            utc_offset: kst(),
            page_size: HOSPITAL_PAGEABLE_COUNT,
        }
    }
}

/// Korea Standard Time, UTC+9.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix())
}

/// Resolve the data directory from an optional environment value.
///
/// Empty or missing values fall back to `hospital_data`. The directory must exist.
pub fn data_dir_from_env_value(value: Option<String>) -> CoreResult<PathBuf> {
    let dir = match value {
        Some(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => PathBuf::from(DEFAULT_DATA_DIR),
    };
    if !dir.is_dir() {
        return Err(CoreError::InvalidInput(format!(
            "data directory {} does not exist",
            dir.display()
        )));
    }
    Ok(dir)
}

/// Parse a `±HH:MM` offset, defaulting to `+09:00`.
pub fn utc_offset_from_env_value(value: Option<String>) -> CoreResult<FixedOffset> {
    let raw = match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_owned(),
        _ => DEFAULT_UTC_OFFSET.to_owned(),
    };
    parse_offset(&raw).ok_or_else(|| {
        CoreError::InvalidInput(format!(
            "MOONLIGHT_UTC_OFFSET must look like +09:00, got {raw:?}"
        ))
    })
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parse the search page size, defaulting to 15.
pub fn page_size_from_env_value(value: Option<String>) -> CoreResult<usize> {
    match value {
        Some(v) if !v.trim().is_empty() => match v.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(CoreError::InvalidInput(format!(
                "MOONLIGHT_PAGE_SIZE must be a positive integer, got {v:?}"
            ))),
        },
        _ => Ok(HOSPITAL_PAGEABLE_COUNT),
    }
}

/// Parse an interval in whole seconds, falling back to `default_secs`.
pub fn interval_from_env_value(value: Option<String>, default_secs: u64) -> CoreResult<Duration> {
    match value {
        Some(v) if !v.trim().is_empty() => match v.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
            _ => Err(CoreError::InvalidInput(format!(
                "interval must be a positive number of seconds, got {v:?}"
            ))),
        },
        _ => Ok(Duration::from_secs(default_secs)),
    }
}
