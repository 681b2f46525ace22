use anyhow::{Context as _, Result};
use clap::Parser;
use indicatif::ProgressBar;
use netreport::{
    FileSink, ReportConfig, ReportHub, ReportKind, SimTime, SyntheticConfig, SyntheticWorld,
};
use std::{collections::BTreeMap, path::PathBuf};
use tracing_subscriber::EnvFilter;

/// Run a seeded epidemic world and write its reports.
#[derive(Parser)]
struct Command {
    /// simulated seconds
    #[arg(long, default_value = "43200")]
    time: u64,

    #[arg(long, default_value = "40")]
    hosts: u64,

    #[arg(long, default_value = "0")]
    seed: u64,

    /// directory receiving the report files
    #[arg(long, default_value = "reports")]
    output: PathBuf,

    /// reports to write: `host-occupancy`, `delivery-statistics`
    #[arg(
        long = "report",
        default_values_t = [ReportKind::HostOccupancy, ReportKind::DeliveryStatistics]
    )]
    reports: Vec<ReportKind>,

    /// report setting, e.g. `--set occupancyInterval=10m --set warmup=1h`
    #[arg(long = "set", value_parser = parse_setting)]
    settings: Vec<(String, String)>,
}

fn parse_setting(setting: &str) -> Result<(String, String)> {
    let (key, value) = setting
        .split_once('=')
        .with_context(|| format!("Expecting `key=value', got `{setting}'"))?;
    Ok((key.trim().to_owned(), value.trim().to_owned()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cmd = Command::parse();
    let settings: BTreeMap<String, String> = cmd.settings.into_iter().collect();

    let mut hub = ReportHub::new();
    for kind in cmd.reports {
        let name = kind.to_string();
        let config = ReportConfig::from_settings(kind, &settings);
        let sink = FileSink::create(cmd.output.join(format!("{name}.txt")))?;
        hub.register(name, config, sink);
    }

    let mut world = SyntheticWorld::new(SyntheticConfig {
        hosts: cmd.hosts,
        seed: cmd.seed,
        ..SyntheticConfig::default()
    })?;

    let pb = ProgressBar::new(cmd.time);
    for second in 1..=cmd.time {
        world.run_until(SimTime::from_secs(second as f64), &mut hub)?;
        pb.inc(1);
    }
    pb.finish_with_message("Simulation done");

    for failure in hub.failures() {
        eprintln!("{} failed at {}: {}", failure.name, failure.at, failure.error);
    }

    for finished in hub.finish() {
        match finished.output {
            Ok(sink) => {
                println!(
                    "{}: {} entries in {}",
                    finished.name,
                    finished.entries,
                    sink.path().display()
                );
                sink.close()?;
            }
            Err(error) => eprintln!("{}: {error}", finished.name),
        }
    }

    Ok(())
}
