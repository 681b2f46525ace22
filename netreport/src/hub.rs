use netreport_core::{
    config::{ReportConfig, Subscriptions},
    host::{Host, HostId},
    listener::{MessageListener, UpdateListener},
    message::Message,
    report::{Report, ReportError},
    time::SimTime,
};
use std::{fmt, io::Write};

/// Identifier of a report registered in a [`ReportHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportId(usize);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "report#{}", self.0)
    }
}

/// A failure of one report during the run.
#[derive(Debug)]
pub struct Failure {
    pub id: ReportId,
    pub name: String,
    pub at: SimTime,
    pub error: ReportError,
}

/// A report at the end of the run.
pub struct Finished<W> {
    pub id: ReportId,
    pub name: String,
    pub entries: u64,
    pub output: Result<W, ReportError>,
}

struct Registered<W> {
    name: String,
    subscriptions: Subscriptions,
    report: Report<W>,
}

/// Fans the engine callbacks out to every registered report.
///
/// Each report only receives the events it subscribed to (see
/// [`ReportConfig::subscriptions`]). Reports are independent: each has
/// its own gate, accumulators and output, and a failing output only
/// disables the report it belongs to. The failure is logged and kept in
/// [`ReportHub::failures`], the hub callbacks themselves never fail.
///
/// ```
/// use netreport::{ReportHub, ReportConfig, ReportKind};
/// use netreport_core::{host::HostId, listener::UpdateListener, time::Duration, SimTime};
///
/// let mut hub = ReportHub::<Vec<u8>>::new();
/// let per_host = hub.register(
///     "BufferOccupancyReportPerNode",
///     ReportConfig::new(ReportKind::HostOccupancy).set_interval(Duration::ZERO),
///     Vec::new(),
/// );
///
/// hub.updated(SimTime::from_secs(1.0), &[(HostId::new(1), 12.5)]).unwrap();
///
/// assert_eq!(hub.report(per_host).unwrap().entries(), 1);
/// ```
pub struct ReportHub<W> {
    reports: Vec<Registered<W>>,
    failures: Vec<Failure>,
}

impl<W> Default for ReportHub<W>
where
    W: Write,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<W> ReportHub<W>
where
    W: Write,
{
    pub fn new() -> Self {
        Self {
            reports: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Register a new report. The report starts with empty accumulators.
    pub fn register(&mut self, name: impl Into<String>, config: ReportConfig, output: W) -> ReportId {
        let id = ReportId(self.reports.len());
        let name = name.into();
        tracing::debug!(
            %id, %name, kind = %config.kind(), interval = %config.interval(),
            trigger = %config.trigger(), "report registered"
        );

        self.reports.push(Registered {
            name,
            subscriptions: config.subscriptions(),
            report: Report::new(config, output),
        });
        id
    }

    pub fn report(&self, id: ReportId) -> Option<&Report<W>> {
        self.reports.get(id.0).map(|registered| &registered.report)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// every report failure so far, in the order they happened
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// End of the run: flush every report and hand back the outputs.
    pub fn finish(self) -> Vec<Finished<W>> {
        self.reports
            .into_iter()
            .enumerate()
            .map(|(index, registered)| {
                let Registered { name, report, .. } = registered;
                let entries = report.entries();
                let output = report.finish();
                if let Err(error) = &output {
                    tracing::warn!(%name, %error, "report did not finish cleanly");
                }
                Finished {
                    id: ReportId(index),
                    name,
                    entries,
                    output,
                }
            })
            .collect()
    }

    fn dispatch<F>(&mut self, now: SimTime, wants: fn(&Subscriptions) -> bool, mut event: F)
    where
        F: FnMut(&mut Report<W>) -> Result<(), ReportError>,
    {
        for (index, registered) in self.reports.iter_mut().enumerate() {
            if !wants(&registered.subscriptions) || registered.report.is_disabled() {
                continue;
            }

            if let Err(error) = event(&mut registered.report) {
                let id = ReportId(index);
                tracing::error!(%id, name = %registered.name, %now, %error, "report failed");
                self.failures.push(Failure {
                    id,
                    name: registered.name.clone(),
                    at: now,
                    error,
                });
            }
        }
    }
}

fn world(subscriptions: &Subscriptions) -> bool {
    subscriptions.world
}

fn messages(subscriptions: &Subscriptions) -> bool {
    subscriptions.messages
}

impl<W> UpdateListener for ReportHub<W>
where
    W: Write,
{
    fn updated<H: Host>(&mut self, now: SimTime, hosts: &[H]) -> Result<(), ReportError> {
        self.dispatch(now, world, |report| report.updated(now, hosts));
        Ok(())
    }
}

impl<W> MessageListener for ReportHub<W>
where
    W: Write,
{
    fn new_message(&mut self, now: SimTime, message: &Message) -> Result<(), ReportError> {
        self.dispatch(now, messages, |report| report.new_message(now, message));
        Ok(())
    }

    fn message_transfer_started(
        &mut self,
        now: SimTime,
        message: &Message,
        from: HostId,
        to: HostId,
    ) -> Result<(), ReportError> {
        self.dispatch(now, messages, |report| {
            report.message_transfer_started(now, message, from, to)
        });
        Ok(())
    }

    fn message_transferred(
        &mut self,
        now: SimTime,
        message: &Message,
        from: HostId,
        to: HostId,
        final_target: bool,
    ) -> Result<(), ReportError> {
        self.dispatch(now, messages, |report| {
            report.message_transferred(now, message, from, to, final_target)
        });
        Ok(())
    }

    fn message_transfer_aborted(
        &mut self,
        now: SimTime,
        message: &Message,
        from: HostId,
        to: HostId,
    ) -> Result<(), ReportError> {
        self.dispatch(now, messages, |report| {
            report.message_transfer_aborted(now, message, from, to)
        });
        Ok(())
    }

    fn message_deleted(
        &mut self,
        now: SimTime,
        message: &Message,
        at: HostId,
        dropped: bool,
    ) -> Result<(), ReportError> {
        self.dispatch(now, messages, |report| {
            report.message_deleted(now, message, at, dropped)
        });
        Ok(())
    }
}
