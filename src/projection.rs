use serde::Serialize;

use crate::aggregate::{AggregationResult, DayPeaks};
use crate::peaks::Peaks;
use crate::reading::Channel;

/// Daily peaks of one channel, oldest day first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSeries {
    #[serde(serialize_with = "serialize_channel")]
    pub channel: Channel,
    pub points: Vec<(String, f64)>,
}

impl ChannelSeries {
    pub fn labels(&self) -> Vec<String> {
        self.points.iter().map(|(day, _)| day.clone()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "day")]
pub enum RowLabel {
    Day(String),
    AllTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub label: RowLabel,
    pub peaks: Peaks,
}

fn sorted_days(result: &AggregationResult) -> Vec<&DayPeaks> {
    let mut days: Vec<&DayPeaks> = result.days().iter().collect();
    days.sort_by(|a, b| a.day.cmp(&b.day));
    days
}

/// One series per channel, each with one point per day bucket.
pub fn chronological_series(result: &AggregationResult) -> Vec<ChannelSeries> {
    let days = sorted_days(result);
    Channel::ALL
        .into_iter()
        .map(|channel| ChannelSeries {
            channel,
            points: days
                .iter()
                .map(|d| (d.day.clone(), d.peaks.get(channel)))
                .collect(),
        })
        .collect()
}

/// One row per day bucket, oldest first, then the window's all-time row.
pub fn summary_table(result: &AggregationResult) -> Vec<SummaryRow> {
    sorted_days(result)
        .into_iter()
        .map(|d| SummaryRow {
            label: RowLabel::Day(d.day.clone()),
            peaks: d.peaks,
        })
        .chain(std::iter::once(SummaryRow {
            label: RowLabel::AllTime,
            peaks: result.all_time(),
        }))
        .collect()
}

fn serialize_channel<S: serde::Serializer>(channel: &Channel, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(channel.field_name())
}
