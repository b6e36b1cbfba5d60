use anyhow::{bail, Result};

use crate::projection::ChannelSeries;
use crate::reading::{Channel, LinePair, Phase, Quantity};

const BAR_WIDTH: usize = 40;

/// Display colour token handed to the chart renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Blue,
    Green,
    Red,
    Purple,
    Orange,
    Teal,
}

impl Color {
    pub fn name(self) -> &'static str {
        match self {
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Red => "red",
            Color::Purple => "purple",
            Color::Orange => "orange",
            Color::Teal => "teal",
        }
    }

    /// Colour used for a channel: one per quantity, one per line pair.
    pub fn for_channel(channel: Channel) -> Self {
        match channel {
            Channel::Voltage(_) => Color::Blue,
            Channel::Current(_) => Color::Green,
            Channel::Power(_) => Color::Red,
            Channel::LineVoltage(LinePair::L1L2) => Color::Purple,
            Channel::LineVoltage(LinePair::L1L3) => Color::Orange,
            Channel::LineVoltage(LinePair::L2L3) => Color::Teal,
        }
    }
}

/// Everything a renderer needs to draw one line chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub label: String,
    pub color: Color,
}

impl ChartRequest {
    pub fn from_series(series: &ChannelSeries) -> Self {
        Self {
            labels: series.labels(),
            values: series.values(),
            label: series.channel.to_string(),
            color: Color::for_channel(series.channel),
        }
    }
}

/// Turns a chart request into something a document can place on a page.
pub trait ChartRenderer {
    type Artifact;

    fn render(&mut self, request: &ChartRequest) -> Result<Self::Artifact>;
}

/// Draws a horizontal bar chart as plain text, one line per label.
#[derive(Debug, Default)]
pub struct TextChartRenderer;

impl ChartRenderer for TextChartRenderer {
    type Artifact = Vec<String>;

    fn render(&mut self, request: &ChartRequest) -> Result<Vec<String>> {
        if request.labels.len() != request.values.len() {
            bail!(
                "Chart '{}' has {} labels but {} values",
                request.label,
                request.labels.len(),
                request.values.len()
            );
        }

        let mut lines = vec![format!("{} [{}]", request.label, request.color.name())];
        if request.values.is_empty() {
            lines.push("(no data)".to_string());
            return Ok(lines);
        }

        // y axis starts at zero
        let top = request.values.iter().cloned().fold(0.0_f64, f64::max);
        for (label, value) in request.labels.iter().zip(&request.values) {
            let len = if top > 0.0 {
                ((value.max(0.0) / top) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            lines.push(format!(
                "{} |{:<width$}| {:.2}",
                label,
                "#".repeat(len),
                value,
                width = BAR_WIDTH
            ));
        }
        Ok(lines)
    }
}

/// Pages of charts in report order: per quantity P1 & P2 together, then P3
/// alone; then one page per line pair.
pub fn chart_pages(series: &[ChannelSeries]) -> Vec<(String, Vec<ChartRequest>)> {
    let request = |channel: Channel| {
        series
            .iter()
            .find(|s| s.channel == channel)
            .map(ChartRequest::from_series)
    };

    let mut pages = Vec::new();
    for quantity in Quantity::ALL {
        let pair: Vec<_> = [Phase::P1, Phase::P2]
            .into_iter()
            .filter_map(|p| request(quantity.channel(p)))
            .collect();
        pages.push((format!("{} P1 & P2", quantity.label()), pair));
        let third: Vec<_> = request(quantity.channel(Phase::P3)).into_iter().collect();
        pages.push((format!("{} P3", quantity.label()), third));
    }
    for pair in LinePair::ALL {
        let channel = Channel::LineVoltage(pair);
        let charts: Vec<_> = request(channel).into_iter().collect();
        pages.push((channel.to_string(), charts));
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(channel: Channel, points: &[(&str, f64)]) -> ChannelSeries {
        ChannelSeries {
            channel,
            points: points.iter().map(|(d, v)| (d.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn request_carries_label_and_colour() {
        let s = series(Channel::Power(Phase::P2), &[("2024-06-01", 708.0)]);
        let req = ChartRequest::from_series(&s);
        assert_eq!(req.label, "Power P2");
        assert_eq!(req.color, Color::Red);
        assert_eq!(req.labels, ["2024-06-01"]);
        assert_eq!(req.values, [708.0]);
    }

    #[test]
    fn line_pairs_have_distinct_colours() {
        let colours: Vec<_> = LinePair::ALL
            .into_iter()
            .map(|l| Color::for_channel(Channel::LineVoltage(l)))
            .collect();
        assert_eq!(colours, [Color::Purple, Color::Orange, Color::Teal]);
    }

    #[test]
    fn text_bars_scale_to_maximum() {
        let req = ChartRequest {
            labels: vec!["2024-06-01".into(), "2024-06-02".into()],
            values: vec![100.0, 50.0],
            label: "Voltage P1".into(),
            color: Color::Blue,
        };
        let lines = TextChartRenderer.render(&req).unwrap();
        assert_eq!(lines[0], "Voltage P1 [blue]");
        assert_eq!(lines[1].matches('#').count(), BAR_WIDTH);
        assert_eq!(lines[2].matches('#').count(), BAR_WIDTH / 2);
        assert!(lines[2].ends_with("50.00"));
    }

    #[test]
    fn all_zero_series_draws_empty_bars() {
        let req = ChartRequest {
            labels: vec!["2024-06-01".into()],
            values: vec![0.0],
            label: "Current P3".into(),
            color: Color::Green,
        };
        let lines = TextChartRenderer.render(&req).unwrap();
        assert_eq!(lines[1].matches('#').count(), 0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let req = ChartRequest {
            labels: vec!["2024-06-01".into()],
            values: vec![],
            label: "Voltage P1".into(),
            color: Color::Blue,
        };
        assert!(TextChartRenderer.render(&req).is_err());
    }

    #[test]
    fn pages_follow_report_layout() {
        let all: Vec<_> = Channel::ALL.into_iter().map(|c| series(c, &[])).collect();
        let pages = chart_pages(&all);
        let titles: Vec<_> = pages.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(
            titles,
            [
                "Voltage P1 & P2",
                "Voltage P3",
                "Current P1 & P2",
                "Current P3",
                "Power P1 & P2",
                "Power P3",
                "Voltage L1-L2",
                "Voltage L1-L3",
                "Voltage L2-L3",
            ]
        );
        assert_eq!(pages[0].1.len(), 2);
        assert_eq!(pages[1].1.len(), 1);
    }
}
