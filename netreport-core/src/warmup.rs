use crate::{message::MessageId, time::SimTime};
use std::collections::HashSet;

/// Excludes the messages created during the warm-up period.
///
/// The warm-up window is `[0, warmup)` in simulated time. A message
/// created in that window is registered here and stays excluded from
/// every statistic for the rest of the run, including the events that
/// happen to it after the window closed.
///
/// ```
/// # use netreport_core::{warmup::WarmupFilter, message::MessageId, SimTime};
/// let mut filter = WarmupFilter::new(SimTime::from_secs(5.0));
///
/// assert!(filter.is_active(SimTime::from_secs(2.0)));
/// filter.register(MessageId::new(2));
///
/// assert!(!filter.is_active(SimTime::from_secs(8.0)));
/// assert!(filter.is_excluded(MessageId::new(2)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct WarmupFilter {
    ends_at: SimTime,
    excluded: HashSet<MessageId>,
}

impl WarmupFilter {
    pub fn new(ends_at: SimTime) -> Self {
        Self {
            ends_at,
            excluded: HashSet::new(),
        }
    }

    /// a filter without warm-up period
    pub fn disabled() -> Self {
        Self::new(SimTime::ZERO)
    }

    #[inline]
    pub fn ends_at(&self) -> SimTime {
        self.ends_at
    }

    /// Moving the boundary only affects future calls to [`Self::is_active`].
    /// Already registered messages stay excluded.
    pub fn set_ends_at(&mut self, ends_at: SimTime) {
        self.ends_at = ends_at;
    }

    #[inline]
    pub fn is_active(&self, now: SimTime) -> bool {
        now < self.ends_at
    }

    pub fn register(&mut self, id: MessageId) {
        self.excluded.insert(id);
    }

    #[inline]
    pub fn is_excluded(&self, id: MessageId) -> bool {
        self.excluded.contains(&id)
    }

    /// number of messages excluded so far
    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_is_never_active() {
        let filter = WarmupFilter::disabled();
        assert!(!filter.is_active(SimTime::ZERO));
        assert!(!filter.is_active(SimTime::from_secs(1.0)));
    }

    #[test]
    fn window_is_half_open() {
        let filter = WarmupFilter::new(SimTime::from_secs(5.0));
        assert!(filter.is_active(SimTime::ZERO));
        assert!(filter.is_active(SimTime::from_secs(4.999)));
        assert!(!filter.is_active(SimTime::from_secs(5.0)));
    }

    #[test]
    fn exclusion_survives_boundary_changes() {
        let mut filter = WarmupFilter::new(SimTime::from_secs(5.0));
        filter.register(MessageId::new(1));

        filter.set_ends_at(SimTime::ZERO);
        assert!(filter.is_excluded(MessageId::new(1)));
        assert!(!filter.is_excluded(MessageId::new(2)));
        assert_eq!(filter.excluded_count(), 1);
    }
}
