mod id;

pub use self::id::HostId;

/// The capability the reports need from a simulated host.
///
/// Hosts are owned by the simulation engine. The reports never keep a
/// reference to a host beyond a callback, only its [`HostId`].
///
/// ```
/// # use netreport_core::host::{Host, HostId};
/// struct Relay {
///     id: HostId,
///     used: u64,
///     capacity: u64,
/// }
///
/// impl Host for Relay {
///     fn id(&self) -> HostId {
///         self.id
///     }
///
///     fn buffer_occupancy(&self) -> f64 {
///         100.0 * self.used as f64 / self.capacity as f64
///     }
/// }
/// # let relay = Relay { id: HostId::new(1), used: 1, capacity: 4 };
/// # assert_eq!(relay.buffer_occupancy(), 25.0);
/// ```
pub trait Host {
    /// Returns the stable identity of the host.
    fn id(&self) -> HostId;

    /// Returns the current occupancy of the host's message buffer, as a
    /// percentage.
    ///
    /// Values are expected within `[0, 100]` but the reports clamp
    /// whatever is returned.
    fn buffer_occupancy(&self) -> f64;
}

impl<H: Host + ?Sized> Host for &H {
    fn id(&self) -> HostId {
        (**self).id()
    }

    fn buffer_occupancy(&self) -> f64 {
        (**self).buffer_occupancy()
    }
}

impl Host for (HostId, f64) {
    fn id(&self) -> HostId {
        self.0
    }

    fn buffer_occupancy(&self) -> f64 {
        self.1
    }
}
