//! Runtime configuration for the projection.
//!
//! # Responsibility
//! - Hold the tunables shared by store, entities and the filesystem adapter.
//! - Provide the defaults the CLI starts from.
//!
//! # Invariants
//! - A config value is built once at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default metadata staleness window.
pub const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_secs(10);
/// Default number of idle store connections kept for reuse.
pub const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 2;
/// Default attribute/entry TTL handed to the kernel.
pub const DEFAULT_ATTR_TTL: Duration = Duration::from_secs(1);
/// Largest body the projection will materialize (SQLite's default
/// `SQLITE_MAX_LENGTH`).
pub const DEFAULT_MAX_BODY_LEN: u64 = 1_000_000_000;

/// Seconds between 1970-01-01 and 2001-01-01 (Core Data reference date).
const CORE_DATA_EPOCH_OFFSET_SECS: f64 = 978_307_200.0;

/// Reference date the store's REAL/INTEGER timestamps count from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampEpoch {
    /// Seconds since 1970-01-01T00:00:00Z.
    #[default]
    Unix,
    /// Seconds since 2001-01-01T00:00:00Z.
    CoreData,
}

impl TimestampEpoch {
    /// Converts raw store seconds into a wall-clock time.
    ///
    /// Non-finite values collapse to the Unix epoch.
    pub fn to_system_time(self, raw_seconds: f64) -> SystemTime {
        let unix_seconds = match self {
            Self::Unix => raw_seconds,
            Self::CoreData => raw_seconds + CORE_DATA_EPOCH_OFFSET_SECS,
        };
        if !unix_seconds.is_finite() {
            return UNIX_EPOCH;
        }

        let magnitude = Duration::try_from_secs_f64(unix_seconds.abs()).unwrap_or(Duration::ZERO);
        if unix_seconds >= 0.0 {
            UNIX_EPOCH.checked_add(magnitude).unwrap_or(UNIX_EPOCH)
        } else {
            UNIX_EPOCH.checked_sub(magnitude).unwrap_or(UNIX_EPOCH)
        }
    }
}

impl Display for TimestampEpoch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unix => write!(f, "unix"),
            Self::CoreData => write!(f, "core-data"),
        }
    }
}

impl FromStr for TimestampEpoch {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unix" => Ok(Self::Unix),
            "core-data" | "coredata" => Ok(Self::CoreData),
            other => Err(format!(
                "unsupported timestamp epoch `{other}`; expected unix|core-data"
            )),
        }
    }
}

/// Projection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FsConfig {
    /// How long cached note metadata may be served without a refresh.
    pub staleness_window: Duration,
    /// Epoch of the store's timestamp columns.
    pub timestamp_epoch: TimestampEpoch,
    /// Idle connections kept between units of work. `0` opens one
    /// connection per statement.
    pub max_idle_connections: usize,
    /// Kernel-side cache TTL for attributes and lookups.
    pub attr_ttl: Duration,
    /// Upper bound on a body length produced by a write or truncate.
    pub max_body_len: u64,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            staleness_window: DEFAULT_STALENESS_WINDOW,
            timestamp_epoch: TimestampEpoch::default(),
            max_idle_connections: DEFAULT_MAX_IDLE_CONNECTIONS,
            attr_ttl: DEFAULT_ATTR_TTL,
            max_body_len: DEFAULT_MAX_BODY_LEN,
        }
    }
}
