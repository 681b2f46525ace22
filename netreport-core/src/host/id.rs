use anyhow::anyhow;
use std::{fmt, str};

/// The identifier of a host in the simulated world.
///
/// Host identifiers are totally ordered, and that order is the order in
/// which per-host rows are written by the occupancy report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostId(u64);

impl HostId {
    pub const ZERO: Self = HostId::new(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for HostId {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl str::FromStr for HostId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self).map_err(|error| anyhow!("{error}"))
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
