//! Report configuration.
//!
//! A [`ReportConfig`] is built programmatically or read from any
//! [`Settings`] source. Reading settings never fails: an absent or
//! malformed value falls back to the default of the report kind and a
//! warning is logged.

use crate::{
    defaults::{
        DEFAULT_DELIVERY_STATISTICS_INTERVAL, DEFAULT_HOST_OCCUPANCY_INTERVAL, DEFAULT_PRECISION,
        DEFAULT_WARMUP, MAX_PRECISION,
    },
    time::Duration,
};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};
use thiserror::Error;

/// Setting key of the snapshot interval.
pub const OCCUPANCY_INTERVAL: &str = "occupancyInterval";
/// Setting key of the warm-up period.
pub const WARMUP: &str = "warmup";
/// Setting key of the number of decimals of floating point columns.
pub const PRECISION: &str = "precision";
/// Setting key of the event driving the entries of a statistics report.
pub const TRIGGER: &str = "trigger";
/// Option naming the kind of a report, e.g. `report = host-occupancy`.
pub const REPORT: &str = "report";

/// A read-only source of `key = value` settings.
///
/// Parsing settings files is the engine's business, the reports only
/// look values up.
pub trait Settings {
    fn get(&self, key: &str) -> Option<&str>;
}

impl Settings for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}

impl Settings for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        BTreeMap::get(self, key).map(String::as_str)
    }
}

impl Settings for [(&str, &str)] {
    fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

impl<const N: usize> Settings for [(&str, &str); N] {
    fn get(&self, key: &str) -> Option<&str> {
        Settings::get(self.as_slice(), key)
    }
}

/// The shape of the entries a report writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// One `host occupancy` row per host.
    HostOccupancy,
    /// One line of aggregated occupancy and delivery statistics.
    DeliveryStatistics,
}

impl ReportKind {
    pub fn default_interval(self) -> Duration {
        match self {
            Self::HostOccupancy => DEFAULT_HOST_OCCUPANCY_INTERVAL,
            Self::DeliveryStatistics => DEFAULT_DELIVERY_STATISTICS_INTERVAL,
        }
    }

    pub fn default_trigger(self) -> Trigger {
        match self {
            Self::HostOccupancy => Trigger::WorldTick,
            Self::DeliveryStatistics => Trigger::MessageTransfer,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostOccupancy => f.write_str("host-occupancy"),
            Self::DeliveryStatistics => f.write_str("delivery-statistics"),
        }
    }
}

impl FromStr for ReportKind {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "host-occupancy" => Ok(Self::HostOccupancy),
            "delivery-statistics" => Ok(Self::DeliveryStatistics),
            other => Err(SettingError::UnknownValue {
                key: REPORT,
                value: other.to_owned(),
            }),
        }
    }
}

/// The event that may write a report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// the periodic world update
    WorldTick,
    /// a message copy arriving at a host
    MessageTransfer,
    /// whichever of the two comes first once the interval elapsed
    Any,
}

impl Trigger {
    #[inline]
    pub fn on_tick(self) -> bool {
        matches!(self, Self::WorldTick | Self::Any)
    }

    #[inline]
    pub fn on_transfer(self) -> bool {
        matches!(self, Self::MessageTransfer | Self::Any)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorldTick => f.write_str("tick"),
            Self::MessageTransfer => f.write_str("transfer"),
            Self::Any => f.write_str("any"),
        }
    }
}

impl FromStr for Trigger {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "tick" => Ok(Self::WorldTick),
            "transfer" => Ok(Self::MessageTransfer),
            "any" => Ok(Self::Any),
            other => Err(SettingError::UnknownValue {
                key: TRIGGER,
                value: other.to_owned(),
            }),
        }
    }
}

/// Error of a single setting value. Only ever logged: the reports fall
/// back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingError {
    #[error("unknown value `{value}' for `{key}'")]
    UnknownValue { key: &'static str, value: String },
    #[error("invalid value `{value}' for `{key}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Subscriptions a report registers with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscriptions {
    pub world: bool,
    pub messages: bool,
}

/// Configuration of one report instance.
///
/// ```
/// use netreport_core::config::{ReportConfig, ReportKind, Trigger};
///
/// let settings = [("occupancyInterval", "-1"), ("warmup", "10m")];
/// let config = ReportConfig::from_settings(ReportKind::DeliveryStatistics, &settings);
///
/// assert_eq!(config.interval().to_string(), "5s"); // fell back to the default
/// assert_eq!(config.warmup().to_string(), "600s");
/// assert_eq!(config.trigger(), Trigger::MessageTransfer);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    kind: ReportKind,
    interval: Duration,
    trigger: Trigger,
    warmup: Duration,
    precision: usize,
}

impl ReportConfig {
    /// default configuration of the given kind of report
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            interval: kind.default_interval(),
            trigger: kind.default_trigger(),
            warmup: DEFAULT_WARMUP,
            precision: DEFAULT_PRECISION,
        }
    }

    /// Read the configuration from `settings`. Invalid values are logged
    /// and replaced by the defaults.
    pub fn from_settings<S>(kind: ReportKind, settings: &S) -> Self
    where
        S: Settings + ?Sized,
    {
        let mut config = Self::new(kind);

        if let Some(interval) = read(settings, OCCUPANCY_INTERVAL, |value| {
            parse_duration(OCCUPANCY_INTERVAL, value)
        }) {
            config.interval = interval;
        }
        if let Some(warmup) = read(settings, WARMUP, |value| parse_duration(WARMUP, value)) {
            config.warmup = warmup;
        }
        if let Some(precision) = read(settings, PRECISION, parse_precision) {
            config.precision = precision;
        }
        // the per-host report only knows how to sample world ticks
        if kind == ReportKind::DeliveryStatistics
            && let Some(trigger) = read(settings, TRIGGER, Trigger::from_str)
        {
            config.trigger = trigger;
        }

        config
    }

    pub fn set_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn set_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Clamped to [`MAX_PRECISION`].
    pub fn set_precision(mut self, precision: usize) -> Self {
        self.precision = precision.min(MAX_PRECISION);
        self
    }

    /// Ignored by [`ReportKind::HostOccupancy`] reports, they are always
    /// driven by world ticks.
    pub fn set_trigger(mut self, trigger: Trigger) -> Self {
        if self.kind == ReportKind::DeliveryStatistics {
            self.trigger = trigger;
        }
        self
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn warmup(&self) -> Duration {
        self.warmup
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// The per-host report only listens to the world. The statistics
    /// report listens to messages and to the world, the latter to keep
    /// the occupancy of the hosts current.
    pub fn subscriptions(&self) -> Subscriptions {
        match self.kind {
            ReportKind::HostOccupancy => Subscriptions {
                world: true,
                messages: false,
            },
            ReportKind::DeliveryStatistics => Subscriptions {
                world: true,
                messages: true,
            },
        }
    }
}

fn read<S, T, E, F>(settings: &S, key: &'static str, parse: F) -> Option<T>
where
    S: Settings + ?Sized,
    F: FnOnce(&str) -> Result<T, E>,
    E: fmt::Display,
{
    let value = settings.get(key)?;
    match parse(value) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, value, %error, "invalid setting, using the default");
            None
        }
    }
}

fn parse_duration(key: &'static str, value: &str) -> Result<Duration, SettingError> {
    value.parse().map_err(|error: crate::time::DurationParseError| {
        SettingError::Invalid {
            key,
            value: value.to_owned(),
            reason: error.to_string(),
        }
    })
}

fn parse_precision(value: &str) -> Result<usize, SettingError> {
    let invalid = |reason: String| SettingError::Invalid {
        key: PRECISION,
        value: value.to_owned(),
        reason,
    };

    let precision: usize = value
        .trim()
        .parse()
        .map_err(|error: std::num::ParseIntError| invalid(error.to_string()))?;
    if precision > MAX_PRECISION {
        return Err(invalid(format!("at most {MAX_PRECISION} decimals")));
    }
    Ok(precision)
}
