/*!
# Network simulation reports

`netreport_core` turns the events of a discrete-event network simulation
into periodic, deterministic text reports:

- the buffer occupancy of every host ([`ReportKind::HostOccupancy`]);
- aggregated occupancy and message delivery statistics: counts, latency,
  hop count, round trip time ([`ReportKind::DeliveryStatistics`]).

The simulation engine stays in charge of the clock, the hosts and the
messages. It calls a [`Report`] through the [`UpdateListener`] and
[`MessageListener`] traits, synchronously and in non-decreasing
simulated time.

```
use netreport_core::{
    config::{ReportConfig, ReportKind, Trigger},
    host::HostId,
    listener::{MessageListener, UpdateListener},
    message::{Message, MessageId},
    report::Report,
    time::Duration,
    SimTime,
};

let config = ReportConfig::new(ReportKind::DeliveryStatistics)
    .set_interval(Duration::from_secs(10))
    .set_trigger(Trigger::Any);
let mut report = Report::new(config, Vec::<u8>::new());

let (a, b) = (HostId::new(1), HostId::new(2));
let mut message = Message::builder().id(MessageId::new(1)).build()?;

report.new_message(SimTime::from_secs(0.0), &message)?;
report.updated(SimTime::from_secs(5.0), &[(a, 20.0), (b, 60.0)])?;

message.push_hop(SimTime::from_secs(12.0));
report.message_transferred(SimTime::from_secs(12.0), &message, a, b, true)?;

assert_eq!(report.entries(), 1);
assert_eq!(report.stats().delivered, 1);
# Ok::<(), anyhow::Error>(())
```

[`ReportKind::HostOccupancy`]: crate::config::ReportKind::HostOccupancy
[`ReportKind::DeliveryStatistics`]: crate::config::ReportKind::DeliveryStatistics
[`Report`]: crate::report::Report
[`UpdateListener`]: crate::listener::UpdateListener
[`MessageListener`]: crate::listener::MessageListener
*/

pub mod config;
pub mod defaults;
pub mod gate;
pub mod host;
pub mod listener;
pub mod measure;
pub mod message;
pub mod report;
pub mod snapshot;
pub mod stats;
pub mod time;
pub mod tracker;
pub mod warmup;

pub use self::{
    config::{ReportConfig, ReportKind, Trigger},
    host::{Host, HostId},
    measure::Occupancy,
    message::{Message, MessageId, Request},
    report::{Report, ReportError},
    time::SimTime,
};
