use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::reading::{Channel, Reading};

/// Running per-channel maximum. Every channel starts at 0.
///
/// Absent or non-finite channel values count as 0. This is the only place
/// where that coalescing happens.
#[derive(Debug, Clone, Default)]
pub struct PeakAccumulator {
    max: [f64; Channel::COUNT],
}

impl PeakAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, reading: &Reading) {
        for channel in Channel::ALL {
            self.observe_value(channel, reading.channel(channel));
        }
    }

    pub fn observe_value(&mut self, channel: Channel, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite()).unwrap_or(0.0);
        let slot = &mut self.max[channel.index()];
        if value > *slot {
            *slot = value;
        }
    }

    pub fn snapshot(&self) -> Peaks {
        Peaks { max: self.max }
    }
}

/// Immutable per-channel maxima taken from a [`PeakAccumulator`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Peaks {
    max: [f64; Channel::COUNT],
}

impl Peaks {
    pub fn get(&self, channel: Channel) -> f64 {
        self.max[channel.index()]
    }

    /// `(channel, value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        Channel::ALL.into_iter().map(move |ch| (ch, self.get(ch)))
    }
}

impl Serialize for Peaks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Channel::COUNT))?;
        for (channel, value) in self.iter() {
            map.serialize_entry(channel.field_name(), &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{LinePair, Phase};
    use chrono::Utc;

    #[test]
    fn starts_at_zero() {
        let peaks = PeakAccumulator::new().snapshot();
        assert!(peaks.iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn keeps_channel_wise_maximum() {
        let mut acc = PeakAccumulator::new();
        let mut a = Reading::new("u1", Utc::now());
        a.voltage_p1 = Some(120.0);
        a.current_p1 = Some(5.0);
        let mut b = Reading::new("u1", Utc::now());
        b.voltage_p1 = Some(118.0);
        b.current_p1 = Some(6.0);
        acc.observe(&a);
        acc.observe(&b);
        let peaks = acc.snapshot();
        assert_eq!(peaks.get(Channel::Voltage(Phase::P1)), 120.0);
        assert_eq!(peaks.get(Channel::Current(Phase::P1)), 6.0);
        assert_eq!(peaks.get(Channel::Power(Phase::P1)), 0.0);
    }

    #[test]
    fn missing_and_non_finite_count_as_zero() {
        let mut acc = PeakAccumulator::new();
        acc.observe_value(Channel::Power(Phase::P2), None);
        acc.observe_value(Channel::Power(Phase::P3), Some(f64::NAN));
        acc.observe_value(Channel::Current(Phase::P3), Some(f64::INFINITY));
        let peaks = acc.snapshot();
        assert_eq!(peaks.get(Channel::Power(Phase::P2)), 0.0);
        assert_eq!(peaks.get(Channel::Power(Phase::P3)), 0.0);
        assert_eq!(peaks.get(Channel::Current(Phase::P3)), 0.0);
    }

    #[test]
    fn negative_values_do_not_lower_the_floor() {
        let mut acc = PeakAccumulator::new();
        acc.observe_value(Channel::Power(Phase::P1), Some(-250.0));
        assert_eq!(acc.snapshot().get(Channel::Power(Phase::P1)), 0.0);
    }

    #[test]
    fn snapshot_does_not_reset() {
        let mut acc = PeakAccumulator::new();
        acc.observe_value(Channel::LineVoltage(LinePair::L1L2), Some(400.0));
        let first = acc.snapshot();
        acc.observe_value(Channel::LineVoltage(LinePair::L1L2), Some(390.0));
        assert_eq!(acc.snapshot(), first);
    }

    #[test]
    fn serializes_as_flat_map() {
        let mut acc = PeakAccumulator::new();
        acc.observe_value(Channel::LineVoltage(LinePair::L2L3), Some(401.5));
        let json = serde_json::to_value(acc.snapshot()).unwrap();
        assert_eq!(json["voltageL2L3"], 401.5);
        assert_eq!(json["voltageP1"], 0.0);
        assert_eq!(json.as_object().unwrap().len(), Channel::COUNT);
    }
}
