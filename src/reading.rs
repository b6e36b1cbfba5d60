use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One sample from the sensing device, as posted over MQTT and kept in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub user_id: String,
    /// Ingestion time when the device leaves it out.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Phase 1 voltage (V)
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub voltage_p1: Option<f64>,
    /// Phase 1 current (A)
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub current_p1: Option<f64>,
    /// Phase 1 power (W)
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub power_p1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub voltage_p2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub current_p2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub power_p2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub voltage_p3: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub current_p3: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub power_p3: Option<f64>,
    /// Line-to-line voltage L1-L2 (V)
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub voltage_l1_l2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub voltage_l1_l3: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub voltage_l2_l3: Option<f64>,
}

impl Reading {
    /// An empty reading for `user_id` at `timestamp`, every channel absent.
    pub fn new(user_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            timestamp,
            voltage_p1: None,
            current_p1: None,
            power_p1: None,
            voltage_p2: None,
            current_p2: None,
            power_p2: None,
            voltage_p3: None,
            current_p3: None,
            power_p3: None,
            voltage_l1_l2: None,
            voltage_l1_l3: None,
            voltage_l2_l3: None,
        }
    }

    /// Raw field value for a channel. No coalescing happens here.
    pub fn channel(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Voltage(Phase::P1) => self.voltage_p1,
            Channel::Voltage(Phase::P2) => self.voltage_p2,
            Channel::Voltage(Phase::P3) => self.voltage_p3,
            Channel::Current(Phase::P1) => self.current_p1,
            Channel::Current(Phase::P2) => self.current_p2,
            Channel::Current(Phase::P3) => self.current_p3,
            Channel::Power(Phase::P1) => self.power_p1,
            Channel::Power(Phase::P2) => self.power_p2,
            Channel::Power(Phase::P3) => self.power_p3,
            Channel::LineVoltage(LinePair::L1L2) => self.voltage_l1_l2,
            Channel::LineVoltage(LinePair::L1L3) => self.voltage_l1_l3,
            Channel::LineVoltage(LinePair::L2L3) => self.voltage_l2_l3,
        }
    }

    pub fn set_channel(&mut self, channel: Channel, value: Option<f64>) {
        let slot = match channel {
            Channel::Voltage(Phase::P1) => &mut self.voltage_p1,
            Channel::Voltage(Phase::P2) => &mut self.voltage_p2,
            Channel::Voltage(Phase::P3) => &mut self.voltage_p3,
            Channel::Current(Phase::P1) => &mut self.current_p1,
            Channel::Current(Phase::P2) => &mut self.current_p2,
            Channel::Current(Phase::P3) => &mut self.current_p3,
            Channel::Power(Phase::P1) => &mut self.power_p1,
            Channel::Power(Phase::P2) => &mut self.power_p2,
            Channel::Power(Phase::P3) => &mut self.power_p3,
            Channel::LineVoltage(LinePair::L1L2) => &mut self.voltage_l1_l2,
            Channel::LineVoltage(LinePair::L1L3) => &mut self.voltage_l1_l3,
            Channel::LineVoltage(LinePair::L2L3) => &mut self.voltage_l2_l3,
        };
        *slot = value;
    }

    /// Fill in absent per-phase power as voltage × current, rounded to 2 decimals.
    pub fn with_derived_power(mut self) -> Self {
        for phase in Phase::ALL {
            if self.channel(Channel::Power(phase)).is_some() {
                continue;
            }
            if let (Some(v), Some(i)) = (
                self.channel(Channel::Voltage(phase)),
                self.channel(Channel::Current(phase)),
            ) {
                let power = (v * i * 100.0).round() / 100.0;
                self.set_channel(Channel::Power(phase), Some(power));
            }
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    P1,
    P2,
    P3,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::P1, Phase::P2, Phase::P3];

    pub fn name(self) -> &'static str {
        match self {
            Phase::P1 => "P1",
            Phase::P2 => "P2",
            Phase::P3 => "P3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinePair {
    L1L2,
    L1L3,
    L2L3,
}

impl LinePair {
    pub const ALL: [LinePair; 3] = [LinePair::L1L2, LinePair::L1L3, LinePair::L2L3];

    pub fn name(self) -> &'static str {
        match self {
            LinePair::L1L2 => "L1L2",
            LinePair::L1L3 => "L1L3",
            LinePair::L2L3 => "L2L3",
        }
    }
}

/// The three per-phase quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Voltage,
    Current,
    Power,
}

impl Quantity {
    pub const ALL: [Quantity; 3] = [Quantity::Voltage, Quantity::Current, Quantity::Power];

    pub fn channel(self, phase: Phase) -> Channel {
        match self {
            Quantity::Voltage => Channel::Voltage(phase),
            Quantity::Current => Channel::Current(phase),
            Quantity::Power => Channel::Power(phase),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quantity::Voltage => "Voltage",
            Quantity::Current => "Current",
            Quantity::Power => "Power",
        }
    }
}

/// One of the twelve named electrical measurements carried by a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Voltage(Phase),
    Current(Phase),
    Power(Phase),
    LineVoltage(LinePair),
}

impl Channel {
    pub const COUNT: usize = 12;

    /// Every channel, in table order: per phase V/A/W, then the line pairs.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Voltage(Phase::P1),
        Channel::Current(Phase::P1),
        Channel::Power(Phase::P1),
        Channel::Voltage(Phase::P2),
        Channel::Current(Phase::P2),
        Channel::Power(Phase::P2),
        Channel::Voltage(Phase::P3),
        Channel::Current(Phase::P3),
        Channel::Power(Phase::P3),
        Channel::LineVoltage(LinePair::L1L2),
        Channel::LineVoltage(LinePair::L1L3),
        Channel::LineVoltage(LinePair::L2L3),
    ];

    /// Position of this channel in [`Channel::ALL`].
    pub fn index(self) -> usize {
        let phase_base = |p: Phase| p as usize * 3;
        match self {
            Channel::Voltage(p) => phase_base(p),
            Channel::Current(p) => phase_base(p) + 1,
            Channel::Power(p) => phase_base(p) + 2,
            Channel::LineVoltage(l) => 9 + l as usize,
        }
    }

    /// Field name as it appears in the JSON payload, e.g. `voltageP1`.
    pub fn field_name(self) -> &'static str {
        match self {
            Channel::Voltage(Phase::P1) => "voltageP1",
            Channel::Voltage(Phase::P2) => "voltageP2",
            Channel::Voltage(Phase::P3) => "voltageP3",
            Channel::Current(Phase::P1) => "currentP1",
            Channel::Current(Phase::P2) => "currentP2",
            Channel::Current(Phase::P3) => "currentP3",
            Channel::Power(Phase::P1) => "powerP1",
            Channel::Power(Phase::P2) => "powerP2",
            Channel::Power(Phase::P3) => "powerP3",
            Channel::LineVoltage(LinePair::L1L2) => "voltageL1L2",
            Channel::LineVoltage(LinePair::L1L3) => "voltageL1L3",
            Channel::LineVoltage(LinePair::L2L3) => "voltageL2L3",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Channel::Voltage(_) | Channel::LineVoltage(_) => "V",
            Channel::Current(_) => "A",
            Channel::Power(_) => "W",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Voltage(p) => write!(f, "Voltage {}", p.name()),
            Channel::Current(p) => write!(f, "Current {}", p.name()),
            Channel::Power(p) => write!(f, "Power {}", p.name()),
            Channel::LineVoltage(l) => {
                let (a, b) = l.name().split_at(2);
                write!(f, "Voltage {}-{}", a, b)
            }
        }
    }
}

/// Raw high-frequency samples versus periodic peak snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RecordKind {
    Raw,
    Saved,
}

impl RecordKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            RecordKind::Raw => "raw",
            RecordKind::Saved => "saved",
        }
    }
}

/// Accept a JSON number or a numeric string; anything else becomes `None`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
