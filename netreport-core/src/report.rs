use crate::{
    config::{ReportConfig, ReportKind},
    gate::ObservationGate,
    host::{Host, HostId},
    listener::{MessageListener, UpdateListener},
    message::Message,
    snapshot::OccupancyStore,
    stats::Summary,
    time::SimTime,
    tracker::{MessageStats, MessageTracker},
    warmup::WarmupFilter,
};
use std::{
    fmt::Write as _,
    io::{self, Write},
};
use thiserror::Error;

/// Columns of a [`ReportKind::DeliveryStatistics`] entry, in order.
///
/// Statistics over an empty list, and ratios with a zero denominator,
/// are written as `NaN`.
pub const DELIVERY_STATISTICS_COLUMNS: [&str; 20] = [
    "sim_time",
    "delivered",
    "occupancy_mean",
    "occupancy_variance",
    "created",
    "started",
    "relayed",
    "aborted",
    "dropped",
    "removed",
    "latency_avg",
    "latency_med",
    "hopcount_avg",
    "hopcount_med",
    "buffertime_avg",
    "rtt_avg",
    "rtt_med",
    "delivery_prob",
    "response_prob",
    "overhead_ratio",
];

/// Error of a report instance.
///
/// Only the sink can fail. Once it did, the report stops writing and the
/// other reports of the run are not affected.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{kind} report failed to write to its output")]
    Sink {
        kind: ReportKind,
        #[source]
        source: io::Error,
    },
    #[error("{kind} report was disabled by an earlier output failure")]
    Disabled { kind: ReportKind },
}

enum Output<W> {
    Active(W),
    Failed,
}

/// A report instance: the aggregator and its output.
///
/// The report owns all of its state: the [`ObservationGate`], the
/// [`OccupancyStore`] and the [`MessageTracker`]. The engine hands it the
/// world updates (see [`UpdateListener`]) and the message events (see
/// [`MessageListener`]) it subscribed to, and every accepted trigger
/// writes exactly one entry to `W` with a single
/// [`write_all`](Write::write_all).
///
/// # Entries
///
/// - [`ReportKind::HostOccupancy`]: one `host<TAB>occupancy` row per host,
///   in host identity order.
/// - [`ReportKind::DeliveryStatistics`]: one line of space separated
///   values, see [`DELIVERY_STATISTICS_COLUMNS`].
///
/// # Example
///
/// ```
/// use netreport_core::{
///     config::{ReportConfig, ReportKind},
///     host::HostId,
///     listener::UpdateListener,
///     report::Report,
///     time::Duration,
///     SimTime,
/// };
///
/// let config = ReportConfig::new(ReportKind::HostOccupancy)
///     .set_interval(Duration::from_secs(10))
///     .set_precision(1);
/// let mut report = Report::new(config, Vec::<u8>::new());
///
/// let hosts = [(HostId::new(2), 25.0), (HostId::new(1), 50.0)];
/// report.updated(SimTime::from_secs(5.0), &hosts).unwrap();
/// report.updated(SimTime::from_secs(10.0), &hosts).unwrap();
///
/// let output = report.finish().unwrap();
/// assert_eq!(String::from_utf8(output).unwrap(), "1\t50.0\n2\t25.0\n");
/// ```
pub struct Report<W> {
    config: ReportConfig,
    gate: ObservationGate,
    store: OccupancyStore,
    tracker: MessageTracker,
    output: Output<W>,
    entries: u64,
}

impl<W> Report<W>
where
    W: Write,
{
    /// Start a run. All the accumulators start empty.
    pub fn new(config: ReportConfig, output: W) -> Self {
        let warmup = WarmupFilter::new(SimTime::from_secs(config.warmup().as_secs_f64()));
        Self {
            gate: ObservationGate::new(config.interval()),
            store: OccupancyStore::new(),
            tracker: MessageTracker::new(warmup),
            output: Output::Active(output),
            entries: 0,
            config,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn kind(&self) -> ReportKind {
        self.config.kind()
    }

    pub fn occupancy(&self) -> &OccupancyStore {
        &self.store
    }

    pub fn stats(&self) -> &MessageStats {
        self.tracker.stats()
    }

    pub fn gate(&self) -> &ObservationGate {
        &self.gate
    }

    /// number of entries written so far
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// `true` once the output failed
    pub fn is_disabled(&self) -> bool {
        matches!(self.output, Output::Failed)
    }

    /// End of the run: flush and hand back the output.
    ///
    /// # Errors
    ///
    /// [`ReportError::Disabled`] if the output failed during the run,
    /// [`ReportError::Sink`] if the final flush fails.
    pub fn finish(self) -> Result<W, ReportError> {
        let kind = self.kind();
        match self.output {
            Output::Failed => Err(ReportError::Disabled { kind }),
            Output::Active(mut output) => {
                output
                    .flush()
                    .map_err(|source| ReportError::Sink { kind, source })?;
                Ok(output)
            }
        }
    }

    fn during_warmup(&self, now: SimTime) -> bool {
        self.tracker.warmup().is_active(now)
    }

    fn write_entry(&mut self, now: SimTime) -> Result<(), ReportError> {
        let kind = self.kind();
        let Output::Active(output) = &mut self.output else {
            tracing::debug!(%kind, %now, "output disabled, entry skipped");
            return Ok(());
        };

        let entry = match kind {
            ReportKind::HostOccupancy => format_host_occupancy(&self.store, self.config.precision()),
            ReportKind::DeliveryStatistics => format_delivery_statistics(
                now,
                &self.store,
                self.tracker.stats(),
                self.config.precision(),
            ),
        };

        match output.write_all(entry.as_bytes()) {
            Ok(()) => {
                self.entries += 1;
                Ok(())
            }
            Err(source) => {
                tracing::error!(%kind, %now, error = %source, "report output failed, disabling the report");
                self.output = Output::Failed;
                Err(ReportError::Sink { kind, source })
            }
        }
    }
}

impl<W> UpdateListener for Report<W>
where
    W: Write,
{
    fn updated<H: Host>(&mut self, now: SimTime, hosts: &[H]) -> Result<(), ReportError> {
        if self.during_warmup(now) {
            return Ok(());
        }

        let emit = self.config.trigger().on_tick() && self.gate.should_emit(now);
        // the statistics line may be written by a later transfer, keep
        // the occupancy current for it
        if emit || self.kind() == ReportKind::DeliveryStatistics {
            self.store.observe(hosts);
        }

        if emit {
            self.write_entry(now)?;
        }
        Ok(())
    }
}

impl<W> MessageListener for Report<W>
where
    W: Write,
{
    fn new_message(&mut self, now: SimTime, message: &Message) -> Result<(), ReportError> {
        self.tracker.created(now, message);
        Ok(())
    }

    fn message_transfer_started(
        &mut self,
        _now: SimTime,
        message: &Message,
        from: HostId,
        to: HostId,
    ) -> Result<(), ReportError> {
        self.tracker.transfer_started(message, from, to);
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
        self.tracker
            .transferred(now, message, from, to, final_target);

        if self.config.trigger().on_transfer()
            && !self.during_warmup(now)
            && !self.tracker.is_excluded(message.id())
            && self.gate.should_emit(now)
        {
            self.write_entry(now)?;
        }
        Ok(())
    }

    fn message_transfer_aborted(
        &mut self,
        _now: SimTime,
        message: &Message,
        from: HostId,
        to: HostId,
    ) -> Result<(), ReportError> {
        self.tracker.transfer_aborted(message, from, to);
        Ok(())
    }

    fn message_deleted(
        &mut self,
        now: SimTime,
        message: &Message,
        at: HostId,
        dropped: bool,
    ) -> Result<(), ReportError> {
        self.tracker.deleted(now, message, at, dropped);
        Ok(())
    }
}

fn format_host_occupancy(store: &OccupancyStore, precision: usize) -> String {
    let mut entry = String::new();
    for (host, occupancy) in store.iter() {
        let _ = writeln!(entry, "{host}\t{:.precision$}", occupancy.value());
    }
    entry
}

fn format_delivery_statistics(
    now: SimTime,
    store: &OccupancyStore,
    stats: &MessageStats,
    precision: usize,
) -> String {
    let occupancy = store.stats();
    let latency = stats.latency();
    let hop_count = stats.hop_count();
    let buffer_time = stats.buffer_time();
    let rtt = stats.rtt();

    let decimal = |value: Option<f64>| match value {
        Some(value) => format!("{value:.precision$}"),
        None => "NaN".to_owned(),
    };
    let mean = |summary: Option<Summary>| decimal(summary.map(|s| s.mean));
    let median = |summary: Option<Summary>| decimal(summary.map(|s| s.median));

    let columns = [
        decimal(Some(now.as_secs())),
        stats.delivered.to_string(),
        decimal(Some(occupancy.mean)),
        decimal(Some(occupancy.variance)),
        stats.created.to_string(),
        stats.started.to_string(),
        stats.relayed.to_string(),
        stats.aborted.to_string(),
        stats.dropped.to_string(),
        stats.removed.to_string(),
        mean(latency),
        median(latency),
        mean(hop_count),
        median(hop_count),
        mean(buffer_time),
        mean(rtt),
        median(rtt),
        decimal(stats.delivery_probability()),
        decimal(stats.response_probability()),
        decimal(stats.overhead_ratio()),
    ];
    debug_assert_eq!(columns.len(), DELIVERY_STATISTICS_COLUMNS.len());

    let mut entry = columns.join(" ");
    entry.push('\n');
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Trigger, message::MessageId, time::Duration};

    const A: HostId = HostId::new(1);
    const B: HostId = HostId::new(2);

    fn t(secs: f64) -> SimTime {
        SimTime::from_secs(secs)
    }

    fn message(id: u64) -> Message {
        Message::builder().id(MessageId::new(id)).build().unwrap()
    }

    fn text(report: Report<Vec<u8>>) -> String {
        String::from_utf8(report.finish().unwrap()).unwrap()
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// counts the calls to `write_all`
    #[derive(Default)]
    struct Writes(Vec<Vec<u8>>);

    impl Write for Writes {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.write_all(buf)?;
            Ok(buf.len())
        }

        fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
            self.0.push(buf.to_vec());
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn host_occupancy_writes_current_rows_only() {
        let config = ReportConfig::new(ReportKind::HostOccupancy)
            .set_interval(Duration::ZERO)
            .set_precision(0);
        let mut report = Report::new(config, Writes::default());

        report.updated(t(1.0), &[(B, 10.0), (A, 20.0)]).unwrap();
        report.updated(t(2.0), &[(A, 30.0), (B, 40.0)]).unwrap();

        let writes = report.finish().unwrap().0;
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], b"1\t20\n2\t10\n");
        assert_eq!(writes[1], b"1\t30\n2\t40\n");
    }

    #[test]
    fn host_occupancy_respects_interval() {
        let config = ReportConfig::new(ReportKind::HostOccupancy).set_precision(0);
        let mut report = Report::new(config, Vec::<u8>::new());

        for now in [0.0, 1_800.0, 3_599.0, 3_600.0, 5_000.0, 7_200.0] {
            report.updated(t(now), &[(A, now / 100.0)]).unwrap();
        }

        assert_eq!(report.entries(), 2);
        assert_eq!(text(report), "1\t36\n1\t72\n");
    }

    #[test]
    fn host_occupancy_ignores_messages() {
        let config = ReportConfig::new(ReportKind::HostOccupancy).set_interval(Duration::ZERO);
        let mut report = Report::new(config, Vec::<u8>::new());

        report.new_message(t(0.0), &message(1)).unwrap();
        report
            .message_transferred(t(1.0), &message(1), A, B, true)
            .unwrap();

        assert_eq!(report.entries(), 0);
    }

    #[test]
    fn transfer_triggered_statistics() {
        let config = ReportConfig::new(ReportKind::DeliveryStatistics)
            .set_interval(Duration::from_secs(10))
            .set_trigger(Trigger::Any)
            .set_precision(1);
        let mut report = Report::new(config, Vec::<u8>::new());

        report.new_message(t(0.0), &message(1)).unwrap();
        report.updated(t(5.0), &[(A, 0.0), (B, 100.0)]).unwrap();
        assert_eq!(report.entries(), 0);

        let mut delivered = message(1);
        delivered.push_hop(t(12.0));
        report
            .message_transferred(t(12.0), &delivered, A, B, true)
            .unwrap();

        assert_eq!(report.entries(), 1);
        assert_eq!(report.gate().last_record(), t(12.0));
        assert_eq!(report.stats().delivered, 1);

        let output = text(report);
        let columns: Vec<&str> = output.trim_end().split(' ').collect();
        assert_eq!(columns.len(), DELIVERY_STATISTICS_COLUMNS.len());
        assert_eq!(&columns[..4], &["12.0", "1", "50.0", "25.0"]);
        // latency and hop count
        assert_eq!(columns[10], "12.0");
        assert_eq!(columns[12], "1.0");
        // no response delivered
        assert_eq!(columns[15], "NaN");
    }

    #[test]
    fn tick_triggered_statistics() {
        let config = ReportConfig::new(ReportKind::DeliveryStatistics)
            .set_trigger(Trigger::WorldTick)
            .set_interval(Duration::from_secs(5))
            .set_precision(0);
        let mut report = Report::new(config, Vec::<u8>::new());

        report.new_message(t(0.0), &message(1)).unwrap();
        report
            .message_transferred(t(6.0), &message(1), A, B, true)
            .unwrap();
        assert_eq!(report.entries(), 0);

        report.updated(t(7.0), &[(A, 40.0)]).unwrap();
        assert_eq!(report.entries(), 1);
        assert!(text(report).starts_with("7 1 40 0 1 0 1 "));
    }

    #[test]
    fn warmup_messages_are_excluded_from_statistics() {
        let config = ReportConfig::new(ReportKind::DeliveryStatistics)
            .set_interval(Duration::ZERO)
            .set_warmup(Duration::from_secs(5));
        let mut report = Report::new(config, Vec::<u8>::new());

        report.new_message(t(2.0), &message(2)).unwrap();
        report
            .message_transferred(t(8.0), &message(2), A, B, true)
            .unwrap();

        assert_eq!(report.stats().delivered, 0);
        assert!(report.stats().latencies.is_empty());
        assert_eq!(report.entries(), 0);
    }

    #[test]
    fn ticks_during_warmup_are_ignored() {
        let config = ReportConfig::new(ReportKind::HostOccupancy)
            .set_interval(Duration::ZERO)
            .set_warmup(Duration::from_secs(5));
        let mut report = Report::new(config, Vec::<u8>::new());

        report.updated(t(1.0), &[(A, 10.0)]).unwrap();
        assert!(report.occupancy().is_empty());

        report.updated(t(5.0), &[(A, 10.0)]).unwrap();
        assert_eq!(report.entries(), 1);
    }

    #[test]
    fn every_lifecycle_event_is_counted() {
        let config = ReportConfig::new(ReportKind::DeliveryStatistics);
        let mut report = Report::new(config, Vec::<u8>::new());
        let msg = message(1);

        report.new_message(t(0.0), &msg).unwrap();
        report.message_transfer_started(t(1.0), &msg, A, B).unwrap();
        report.message_transfer_aborted(t(1.5), &msg, A, B).unwrap();
        report.message_deleted(t(2.0), &msg, A, true).unwrap();

        let stats = report.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.started, 1);
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn oversized_precision_setting_still_writes() {
        let settings = [("precision", "70000"), ("occupancyInterval", "0")];
        let config = ReportConfig::from_settings(ReportKind::HostOccupancy, &settings);
        let mut report = Report::new(config, Vec::<u8>::new());

        report.updated(t(1.0), &[(A, 10.0)]).unwrap();

        assert_eq!(text(report), "1\t10.0000\n");
    }

    #[test]
    fn broken_output_is_reported_once() {
        let config = ReportConfig::new(ReportKind::HostOccupancy).set_interval(Duration::ZERO);
        let mut report = Report::new(config, BrokenPipe);

        let error = report.updated(t(1.0), &[(A, 10.0)]).unwrap_err();
        assert!(matches!(error, ReportError::Sink { .. }));
        assert!(report.is_disabled());

        report.updated(t(2.0), &[(A, 10.0)]).unwrap();
        assert_eq!(report.entries(), 0);
        assert!(matches!(
            report.finish(),
            Err(ReportError::Disabled {
                kind: ReportKind::HostOccupancy
            })
        ));
    }
}
