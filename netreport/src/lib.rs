/*!
# Network simulation reports

Wires the reports of [`netreport_core`] into a simulation run: a
[`ReportHub`] fans the engine callbacks out to any number of reports,
[`FileSink`] writes a report to disk and [`SyntheticWorld`] is a small
seeded engine to drive them without a real simulator.

```
use netreport::{ReportConfig, ReportHub, ReportKind, SimTime, SyntheticConfig, SyntheticWorld};

let mut hub = ReportHub::<Vec<u8>>::new();
hub.register("per-host", ReportConfig::new(ReportKind::HostOccupancy), Vec::new());
hub.register("stats", ReportConfig::new(ReportKind::DeliveryStatistics), Vec::new());

let mut world = SyntheticWorld::new(SyntheticConfig::default())?;
world.run_until(SimTime::from_secs(3_600.0), &mut hub)?;

for finished in hub.finish() {
    let output = finished.output?;
    assert!(!output.is_empty(), "{} wrote nothing", finished.name);
}
# Ok::<(), anyhow::Error>(())
```
*/

mod hub;
mod sink;
pub mod synthetic;

// convenient re-export of `netreport_core` core objects
pub use netreport_core::{
    Host, HostId, Message, MessageId, Occupancy, Report, ReportConfig, ReportError, ReportKind,
    Request, SimTime, Trigger,
};

pub use self::{
    hub::{Failure, Finished, ReportHub, ReportId},
    sink::FileSink,
    synthetic::{SyntheticConfig, SyntheticHost, SyntheticWorld},
};
