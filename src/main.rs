mod aggregate;
mod bucket;
mod chart;
mod commands;
mod config;
mod document;
mod live;
mod mqtt;
mod peaks;
mod projection;
mod reading;
mod seed;
mod store;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use log::info;

use crate::config::{Command, Config, ReportArgs, ReportFormat};
use crate::store::ReadingStore;

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::parse();
    let store = ReadingStore::open(&config.store_dir)?;
    info!("Using reading store at {}", config.store_dir.display());

    match &config.command {
        Command::Ingest(args) => mqtt::ingest(args, &store),
        Command::Seed(args) => {
            let readings = seed::synthetic_readings(
                &args.user,
                Utc::now(),
                args.count,
                Duration::minutes(i64::from(args.spacing_minutes)),
            )?;
            store.append_all(args.kind, &readings)?;
            info!("Inserted {} fake readings for {}", readings.len(), args.user);
            Ok(())
        }
        Command::Compact(args) => {
            commands::compact_saved(&store, args, Utc::now())?;
            Ok(())
        }
        Command::Latest(args) => {
            let Some(latest) = store.latest(args.kind, &args.user)? else {
                bail!("No readings found for {}", args.user);
            };
            println!("{}", serde_json::to_string_pretty(&latest)?);
            Ok(())
        }
        Command::Live(args) => live::run(args, &store),
        Command::Report(args) => report(args, &store),
    }
}

fn report(args: &ReportArgs, store: &ReadingStore) -> Result<()> {
    let report = commands::build_report(store, args, Utc::now())?;
    let rendered = match args.format {
        ReportFormat::Text => report.render_text(&mut chart::TextChartRenderer)?,
        ReportFormat::Json => report.to_json()?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
