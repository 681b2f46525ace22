use crate::time::{Duration, SimTime};

/// Time gate deciding when a report writes its next entry.
///
/// The gate lets an entry through when at least `interval` simulated
/// seconds elapsed since the last accepted one, and records the
/// acceptance as part of the same call. A report feeds world ticks and
/// message transfers through the same gate, whichever arrives first after
/// the interval wins, the other is suppressed.
///
/// The first window starts at [`SimTime::ZERO`].
///
/// ```
/// # use netreport_core::{gate::ObservationGate, time::Duration, SimTime};
/// let mut gate = ObservationGate::new(Duration::from_secs(10));
///
/// assert!(!gate.should_emit(SimTime::from_secs(5.0)));
/// assert!(gate.should_emit(SimTime::from_secs(12.0)));
/// assert!(!gate.should_emit(SimTime::from_secs(21.0)));
/// assert!(gate.should_emit(SimTime::from_secs(22.0)));
/// ```
#[derive(Debug, Clone)]
pub struct ObservationGate {
    interval: f64,
    last_record: SimTime,
}

impl ObservationGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.as_secs_f64(),
            last_record: SimTime::ZERO,
        }
    }

    /// the simulated time of the last accepted entry
    #[inline]
    pub fn last_record(&self) -> SimTime {
        self.last_record
    }

    #[inline]
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Returns `true` and moves the window forward if an entry may be
    /// written at `now`.
    ///
    /// A `now` earlier than the last accepted entry is never accepted, the
    /// last record only ever moves forward.
    pub fn should_emit(&mut self, now: SimTime) -> bool {
        let elapsed = now.elapsed_since(self.last_record);
        if elapsed < 0.0 || elapsed < self.interval {
            tracing::trace!(%now, elapsed, interval = self.interval, "snapshot suppressed");
            return false;
        }

        self.last_record = now;
        true
    }
}
