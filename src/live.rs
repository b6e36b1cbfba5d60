use anyhow::Result;
use log::{error, info, warn};
use std::time::Duration;

use crate::config::LiveArgs;
use crate::peaks::{PeakAccumulator, Peaks};
use crate::reading::{Channel, LinePair, Phase, Reading, RecordKind};
use crate::store::ReadingStore;

/// Channels on screen. Single-phase mode hides phase 3 and the lines to L3.
fn visible_channels(three_phase: bool) -> impl Iterator<Item = Channel> {
    Channel::ALL.into_iter().filter(move |ch| {
        three_phase
            || !matches!(
                ch,
                Channel::Voltage(Phase::P3)
                    | Channel::Current(Phase::P3)
                    | Channel::Power(Phase::P3)
                    | Channel::LineVoltage(LinePair::L1L3)
                    | Channel::LineVoltage(LinePair::L2L3)
            )
    })
}

/// One dashboard frame: the latest value of each channel next to its session peak.
pub fn render_frame(latest: &Reading, peaks: &Peaks, three_phase: bool) -> String {
    let mut lines = vec![format!("Latest reading at {}", latest.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))];
    for channel in visible_channels(three_phase) {
        let current = match latest.channel(channel).filter(|v| v.is_finite()) {
            Some(v) => format!("{:.2} {}", v, channel.unit()),
            None => "0".to_string(),
        };
        lines.push(format!(
            "{:<14} {:>12}   peak {:>10.2} {}",
            channel.to_string(),
            current,
            peaks.get(channel),
            channel.unit()
        ));
    }
    lines.join("\n")
}

/// Poll the latest raw reading and print it with running peaks. Peaks live
/// only as long as this session.
pub fn run(args: &LiveArgs, store: &ReadingStore) -> Result<()> {
    let mut session = PeakAccumulator::new();
    info!("Watching latest readings for {}", args.user);
    loop {
        match store.latest(RecordKind::Raw, &args.user) {
            Ok(Some(reading)) => {
                session.observe(&reading);
                println!("{}\n", render_frame(&reading, &session.snapshot(), args.three_phase));
            }
            Ok(None) => warn!("No readings found for {}", args.user),
            Err(e) => error!("Failed to fetch latest reading: {:#}", e),
        }
        if args.once {
            return Ok(());
        }
        std::thread::sleep(Duration::from_secs(args.interval_secs.max(1)));
    }
}
