use crate::time::Duration;

/// Default snapshot interval of the per-host occupancy report
///
/// Used when the `occupancyInterval` setting is absent or invalid.
///
/// ```
/// # use netreport_core::defaults::*;
/// assert_eq!(DEFAULT_HOST_OCCUPANCY_INTERVAL.to_string(), "3600s");
/// ```
pub const DEFAULT_HOST_OCCUPANCY_INTERVAL: Duration = Duration::from_secs(3_600);

/// Default snapshot interval of the delivery statistics report
///
/// This report is usually driven by message transfers, so it samples a
/// lot more often than the per-host report.
///
/// ```
/// # use netreport_core::defaults::*;
/// assert_eq!(DEFAULT_DELIVERY_STATISTICS_INTERVAL.to_string(), "5s");
/// ```
pub const DEFAULT_DELIVERY_STATISTICS_INTERVAL: Duration = Duration::from_secs(5);

/// Default warm-up period: no warm-up.
pub const DEFAULT_WARMUP: Duration = Duration::ZERO;

/// Default number of decimals of the floating point columns.
pub const DEFAULT_PRECISION: usize = 4;

/// Largest accepted number of decimals. An `f64` carries at most 17
/// significant decimal digits, anything above only prints noise.
pub const MAX_PRECISION: usize = 17;
