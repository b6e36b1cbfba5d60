use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

use crate::reading::{Channel, LinePair, Phase, Reading};

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Deterministic fake readings for `user_id`, newest first, `spacing` apart
/// going back from `now`. Power is derived from voltage and current, line
/// voltages from the two phase voltages they join.
pub fn synthetic_readings(
    user_id: &str,
    now: DateTime<Utc>,
    count: u32,
    spacing: Duration,
) -> Result<Vec<Reading>> {
    (0..count)
        .map(|i| {
            let t = f64::from(i);
            let at = i32::try_from(i)
                .ok()
                .and_then(|n| spacing.checked_mul(n))
                .and_then(|back| now.checked_sub_signed(back))
                .with_context(|| format!("Reading {} would be dated before the supported range", i))?;
            let mut r = Reading::new(user_id, at);
            for (n, phase) in Phase::ALL.into_iter().enumerate() {
                let shift = n as f64 * 2.1;
                let voltage = round2(230.0 + 5.0 * (t * 0.7 + shift).sin());
                let current = round2(6.5 + 1.5 * (t * 0.3 + shift).cos());
                r.set_channel(Channel::Voltage(phase), Some(voltage));
                r.set_channel(Channel::Current(phase), Some(current));
            }
            for pair in LinePair::ALL {
                let (a, b) = match pair {
                    LinePair::L1L2 => (Phase::P1, Phase::P2),
                    LinePair::L1L3 => (Phase::P1, Phase::P3),
                    LinePair::L2L3 => (Phase::P2, Phase::P3),
                };
                let va = r.channel(Channel::Voltage(a)).unwrap_or(0.0);
                let vb = r.channel(Channel::Voltage(b)).unwrap_or(0.0);
                let line = round2(3f64.sqrt() * (va + vb) / 2.0);
                r.set_channel(Channel::LineVoltage(pair), Some(line));
            }
            Ok(r.with_derived_power())
        })
        .collect()
}
