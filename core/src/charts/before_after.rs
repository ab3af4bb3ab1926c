//! Before/after impact chart of the projected optimizations.

use super::figure::{palette, Figure, Grid};
use crate::{
    config::ProjectionConfig,
    error::OpsResult,
    rng::StreamRng,
    stats,
    store::AnalysisRow,
};
use serde_json::json;
use std::path::{Path, PathBuf};

pub const IMPACT_CHART: &str = "10_before_after_impact";

/// Current figures and their projected counterparts.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactSummary {
    pub transactions: usize,
    pub mean_seconds_before: f64,
    pub mean_seconds_after: f64,
    pub error_rate_before_pct: f64,
    pub error_rate_after_pct: f64,
    pub time_reduction: f64,
    pub error_reduction: f64,
    /// Settled processing times drawn for the distribution panel.
    pub sample_before: Vec<f64>,
}

impl ImpactSummary {
    pub fn sample_after(&self) -> Vec<f64> {
        self.sample_before
            .iter()
            .map(|t| t * (1.0 - self.time_reduction))
            .collect()
    }

    pub fn saved_hours(&self) -> f64 {
        (self.mean_seconds_before - self.mean_seconds_after) * self.transactions as f64 / 3600.0
    }

    /// Extra throughput from the shorter processing time, as a fraction.
    pub fn capacity_gain(&self) -> f64 {
        1.0 / (1.0 - self.time_reduction) - 1.0
    }

    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            "Processing time:".to_string(),
            format!("  before: {:.0} s", self.mean_seconds_before),
            format!("  after:  {:.0} s", self.mean_seconds_after),
            format!(
                "  gain:   -{:.0} s ({:.1}% reduction)",
                self.mean_seconds_before - self.mean_seconds_after,
                self.time_reduction * 100.0
            ),
            "Error rate:".to_string(),
            format!("  before: {:.2}%", self.error_rate_before_pct),
            format!("  after:  {:.2}%", self.error_rate_after_pct),
            format!("  gain:   {:.1}% reduction", self.error_reduction * 100.0),
            "Operational impact:".to_string(),
            format!("  ~{} transactions processed", self.transactions),
            format!("  ~{:.1} hours saved", self.saved_hours()),
            format!("  capacity up ~{:.0}%", self.capacity_gain() * 100.0),
            "Key optimizations:".to_string(),
            "  1. Automatic validation (30% impact)".to_string(),
            "  2. Priority queue system (15% impact)".to_string(),
            "  3. Batch processing (10% impact)".to_string(),
        ]
    }
}

/// Mean time over settled rows, error rate over all rows, and a seeded
/// sample of up to `sample_size` settled times.
pub fn impact_summary(
    rows: &[AnalysisRow],
    projection: &ProjectionConfig,
    sample_size: usize,
    rng: &mut StreamRng,
) -> ImpactSummary {
    let settled: Vec<f64> = rows
        .iter()
        .filter(|r| r.is_settled())
        .map(|r| r.processing_seconds as f64)
        .collect();
    let mean_before = stats::mean(&settled).unwrap_or(0.0);
    let error_before = stats::pct(rows.iter().filter(|r| r.is_failed()).count(), rows.len());
    ImpactSummary {
        transactions: rows.len(),
        mean_seconds_before: mean_before,
        mean_seconds_after: mean_before * (1.0 - projection.time_reduction),
        error_rate_before_pct: error_before,
        error_rate_after_pct: error_before * (1.0 - projection.error_reduction),
        time_reduction: projection.time_reduction,
        error_reduction: projection.error_reduction,
        sample_before: sample_without_replacement(&settled, sample_size, rng),
    }
}

/// Partial Fisher-Yates draw; returns everything when `n` covers the input.
pub fn sample_without_replacement<T: Clone>(items: &[T], n: usize, rng: &mut StreamRng) -> Vec<T> {
    let mut pool = items.to_vec();
    let take = n.min(pool.len());
    for i in 0..take {
        let j = i + rng.next_u64_below((pool.len() - i) as u64) as usize;
        pool.swap(i, j);
    }
    pool.truncate(take);
    pool
}

pub fn impact_chart(summary: &ImpactSummary) -> Figure {
    let grid = Grid::new(2, 2);
    let mut fig = Figure::new("Optimization Impact: BEFORE vs AFTER");
    grid.apply(
        &mut fig,
        &[
            "Processing Time",
            "Error Rate",
            "Time Distribution",
            "Projected Improvements",
        ],
    );
    let labels = ["BEFORE (current)", "AFTER (optimized)"];
    let colors = [palette::DANGER, palette::SUCCESS];

    let times = [summary.mean_seconds_before, summary.mean_seconds_after];
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "x": labels,
            "y": times,
            "text": times.iter().map(|v| format!("{v:.0}s")).collect::<Vec<_>>(),
            "textposition": "outside",
            "marker": { "color": colors, "opacity": 0.7, "line": { "color": "black", "width": 2 } },
            "showlegend": false,
        }),
        1,
        1,
    ));
    fig.add_annotation(grid.label(1, 1, &format!("-{:.1}%", summary.time_reduction * 100.0)));

    let errors = [summary.error_rate_before_pct, summary.error_rate_after_pct];
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "x": labels,
            "y": errors,
            "text": errors.iter().map(|v| format!("{v:.2}%")).collect::<Vec<_>>(),
            "textposition": "outside",
            "marker": { "color": colors, "opacity": 0.7, "line": { "color": "black", "width": 2 } },
            "showlegend": false,
        }),
        1,
        2,
    ));
    fig.add_annotation(grid.label(1, 2, &format!("-{:.1}%", summary.error_reduction * 100.0)));

    for (name, color, values) in [
        ("BEFORE", palette::DANGER, summary.sample_before.clone()),
        ("AFTER", palette::SUCCESS, summary.sample_after()),
    ] {
        fig.add_trace(grid.place(
            json!({
                "type": "histogram",
                "name": name,
                "x": values,
                "nbinsx": 40,
                "opacity": 0.6,
                "marker": { "color": color, "line": { "color": "black", "width": 1 } },
            }),
            2,
            1,
        ));
    }
    fig.add_shape(grid.vline(2, 1, summary.mean_seconds_before, palette::DANGER));
    fig.add_shape(grid.vline(2, 1, summary.mean_seconds_after, palette::SUCCESS));
    fig.add_annotation(grid.label(
        2,
        1,
        &format!(
            "Mean BEFORE: {:.0}s<br>Mean AFTER: {:.0}s",
            summary.mean_seconds_before, summary.mean_seconds_after
        ),
    ));

    // The summary panel is text only.
    let (x_key, y_key) = grid.axis_keys(2, 2);
    fig.merge(&x_key, json!({ "visible": false }));
    fig.merge(&y_key, json!({ "visible": false }));
    let (x_domain, y_domain) = grid.domain(2, 2);
    fig.add_annotation(json!({
        "text": summary.summary_lines().join("<br>"),
        "xref": "paper",
        "yref": "paper",
        "x": x_domain[0] + 0.02,
        "y": y_domain[1] - 0.02,
        "xanchor": "left",
        "yanchor": "top",
        "align": "left",
        "showarrow": false,
        "font": { "family": "monospace", "size": 12 },
        "bgcolor": "rgba(245, 222, 179, 0.3)",
    }));

    grid.axis_titles(&mut fig, 1, 1, "", "Mean time (seconds)");
    grid.axis_titles(&mut fig, 1, 2, "", "Error rate (%)");
    grid.axis_titles(&mut fig, 2, 1, "Processing time (seconds)", "Frequency");
    fig.set("barmode", json!("overlay"));
    fig.set("height", json!(1000));
    fig
}

pub fn write_impact_chart(summary: &ImpactSummary, dir: &Path) -> OpsResult<PathBuf> {
    impact_chart(summary).write_html(dir, IMPACT_CHART)
}
