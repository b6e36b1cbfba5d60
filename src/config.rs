use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::reading::RecordKind;

/// Upper bound for `--days`, about a century.
const MAX_DAYS: i64 = 36_500;

#[derive(Parser, Debug)]
#[command(
    name = "wattswatch",
    about = "Three-phase electrical telemetry store and peak report generator"
)]
pub struct Config {
    /// Directory holding the JSON-lines reading store
    #[arg(long, env = "WATTSWATCH_STORE", default_value = "wattswatch-data", global = true)]
    pub store_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Subscribe to MQTT and store every reading the device publishes
    Ingest(IngestArgs),
    /// Insert synthetic readings for an owner
    Seed(SeedArgs),
    /// Roll raw readings up into periodic peak snapshots
    Compact(CompactArgs),
    /// Print the latest reading of an owner as JSON
    Latest(LatestArgs),
    /// Poll the latest reading and show values with running session peaks
    Live(LiveArgs),
    /// Produce the daily / all-time peak report
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// MQTT broker hostname
    #[arg(long, default_value = "127.0.0.1")]
    pub mqtt_host: String,

    /// MQTT broker port
    #[arg(long, default_value_t = 1883)]
    pub mqtt_port: u16,

    /// MQTT client ID
    #[arg(long, default_value = "wattswatch-ingest")]
    pub mqtt_client_id: String,

    /// MQTT topic (filter) the device publishes readings to
    #[arg(long, default_value = "wattswatch/readings")]
    pub mqtt_topic: String,
}

#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Owner the readings belong to
    #[arg(long)]
    pub user: String,

    /// Number of readings to generate
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=1_000_000))]
    pub count: u32,

    /// Minutes between consecutive readings, going back from now
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u32).range(1..=1440))]
    pub spacing_minutes: u32,

    #[arg(long, value_enum, default_value_t = RecordKind::Raw)]
    pub kind: RecordKind,
}

#[derive(Args, Debug)]
pub struct CompactArgs {
    #[arg(long)]
    pub user: String,

    /// Snapshot interval in minutes
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u32).range(1..=1440))]
    pub interval_minutes: u32,

    /// How many 24-hour periods of raw readings, ending now, to compact
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_DAYS))]
    pub days: u32,
}

#[derive(Args, Debug)]
pub struct LatestArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long, value_enum, default_value_t = RecordKind::Raw)]
    pub kind: RecordKind,
}

#[derive(Args, Debug)]
pub struct LiveArgs {
    #[arg(long)]
    pub user: String,

    /// Seconds between refreshes
    #[arg(long, default_value_t = 5)]
    pub interval_secs: u64,

    /// Show all three phases instead of single-phase
    #[arg(long)]
    pub three_phase: bool,

    /// Print one frame and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(long)]
    pub user: String,

    /// Number of calendar days covered, ending now
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=MAX_DAYS))]
    pub days: u32,

    #[arg(long, value_enum, default_value_t = RecordKind::Raw)]
    pub kind: RecordKind,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Write the report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}
