use crate::{
    host::{Host, HostId},
    measure::Occupancy,
    stats::OccupancyStats,
};
use std::collections::BTreeMap;

/// Last observed buffer occupancy of every host.
///
/// Entries are keyed, and iterated, by [`HostId`], so two runs over the
/// same host set write their rows in the same order whatever order the
/// engine lists its hosts in.
///
/// # Known limitation
///
/// A host is never removed. A host that leaves the simulation keeps its
/// last observed occupancy in the store, and keeps contributing to the
/// snapshot rows and the [`OccupancyStats`].
#[derive(Debug, Clone, Default)]
pub struct OccupancyStore {
    hosts: BTreeMap<HostId, Occupancy>,
}

impl OccupancyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the occupancy of every host and upsert it.
    ///
    /// ```
    /// # use netreport_core::{host::HostId, snapshot::OccupancyStore};
    /// let mut store = OccupancyStore::new();
    /// store.observe(&[(HostId::new(2), 40.0), (HostId::new(1), 120.0)]);
    ///
    /// let rows: Vec<_> = store.iter().map(|(id, o)| (id.value(), o.value())).collect();
    /// assert_eq!(rows, vec![(1, 100.0), (2, 40.0)]);
    /// ```
    pub fn observe<'a, H, I>(&mut self, hosts: I)
    where
        H: Host + 'a,
        I: IntoIterator<Item = &'a H>,
    {
        for host in hosts {
            self.hosts
                .insert(host.id(), Occupancy::clamped(host.buffer_occupancy()));
        }
    }

    pub fn get(&self, id: HostId) -> Option<Occupancy> {
        self.hosts.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// rows in [`HostId`] order
    pub fn iter(&self) -> impl Iterator<Item = (HostId, Occupancy)> + '_ {
        self.hosts.iter().map(|(id, occupancy)| (*id, *occupancy))
    }

    pub fn stats(&self) -> OccupancyStats {
        OccupancyStats::from_occupancies(self.hosts.values().copied())
    }
}
