use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::{AggregationResult, Window};
use crate::chart::{chart_pages, ChartRenderer};
use crate::peaks::Peaks;
use crate::projection::{chronological_series, summary_table, ChannelSeries, RowLabel, SummaryRow};
use crate::reading::{Channel, LinePair, Phase};

const PAGE_BREAK: &str = "\n\u{c}\n";

/// Everything needed to lay out the peak report for one owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub user_id: String,
    pub days: u32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub reading_count: usize,
    pub series: Vec<ChannelSeries>,
    pub table: Vec<SummaryRow>,
    pub all_time_ever: Peaks,
}

impl Report {
    pub fn new(user_id: &str, days: u32, window: Window, result: &AggregationResult) -> Self {
        Self {
            user_id: user_id.to_string(),
            days,
            window_start: window.start,
            window_end: window.end,
            reading_count: result.reading_count(),
            series: chronological_series(result),
            table: summary_table(result),
            all_time_ever: result.all_time_ever(),
        }
    }

    pub fn title(&self) -> String {
        format!("WattsWatch {}-Day Report", self.days)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report to JSON")
    }

    /// Lay the report out as text pages separated by form feeds.
    pub fn render_text<R>(&self, renderer: &mut R) -> Result<String>
    where
        R: ChartRenderer<Artifact = Vec<String>>,
    {
        let mut pages = vec![self.title_page()];

        for (title, charts) in chart_pages(&self.series) {
            let mut page = vec![centered(&title), String::new()];
            for chart in &charts {
                let lines = renderer
                    .render(chart)
                    .with_context(|| format!("Failed to render chart '{}'", chart.label))?;
                page.extend(lines);
                page.push(String::new());
            }
            pages.push(page.join("\n"));
        }

        pages.push(self.daily_table_page());
        pages.push(self.all_time_page());
        Ok(pages.join(PAGE_BREAK))
    }

    fn title_page(&self) -> String {
        [
            centered(&self.title()),
            String::new(),
            format!("User:     {}", self.user_id),
            format!(
                "Window:   {} .. {} (UTC)",
                self.window_start.format("%Y-%m-%d %H:%M"),
                self.window_end.format("%Y-%m-%d %H:%M")
            ),
            format!("Readings: {}", self.reading_count),
        ]
        .join("\n")
    }

    fn daily_table_page(&self) -> String {
        let mut lines = vec![
            centered("Daily Peaks Summary"),
            String::new(),
            "Date       | V(P1) | A(P1) | W(P1) || V(P2) | A(P2) | W(P2) || V(P3) | A(P3) | W(P3) || L1L2 | L1L3 | L2L3"
                .to_string(),
            "-".repeat(110),
        ];
        for row in &self.table {
            if row.label == RowLabel::AllTime {
                lines.push("-".repeat(110));
            }
            lines.push(table_line(row));
        }
        lines.join("\n")
    }

    fn all_time_page(&self) -> String {
        let window_peaks = self
            .table
            .last()
            .map(|row| row.peaks)
            .unwrap_or_default();

        let mut lines = vec![centered("All-Time Peaks Summary"), String::new()];
        lines.extend(peak_lines(&window_peaks));
        lines.push(String::new());
        lines.push("Across all stored readings:".to_string());
        lines.extend(peak_lines(&self.all_time_ever));
        lines.join("\n")
    }
}

fn table_line(row: &SummaryRow) -> String {
    let label = match &row.label {
        RowLabel::Day(day) => day.as_str(),
        RowLabel::AllTime => "All-time",
    };
    let phase = |p: Phase| {
        format!(
            "{:.2} | {:.2} | {:.2}",
            row.peaks.get(Channel::Voltage(p)),
            row.peaks.get(Channel::Current(p)),
            row.peaks.get(Channel::Power(p))
        )
    };
    let lines = LinePair::ALL
        .iter()
        .map(|l| format!("{:.2}", row.peaks.get(Channel::LineVoltage(*l))))
        .collect::<Vec<_>>()
        .join(" | ");
    format!(
        "{:<10} | {} || {} || {} || {}",
        label,
        phase(Phase::P1),
        phase(Phase::P2),
        phase(Phase::P3),
        lines
    )
}

fn peak_lines(peaks: &Peaks) -> Vec<String> {
    let mut lines: Vec<String> = Phase::ALL
        .iter()
        .map(|p| {
            format!(
                "Phase {}: Voltage: {:.2} V | Current: {:.2} A | Power: {:.2} W",
                p.name(),
                peaks.get(Channel::Voltage(*p)),
                peaks.get(Channel::Current(*p)),
                peaks.get(Channel::Power(*p))
            )
        })
        .collect();
    lines.extend(LinePair::ALL.iter().map(|l| {
        let channel = Channel::LineVoltage(*l);
        format!("{}: {:.2} V", channel, peaks.get(channel))
    }));
    lines
}

fn centered(text: &str) -> String {
    format!("{:^80}", text).trim_end().to_string()
}
