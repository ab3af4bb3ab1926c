//! The eight operational charts.

use super::figure::{palette, Figure, Grid};
use crate::{
    error::OpsResult,
    stats,
    store::AnalysisRow,
    types::{Crypto, Period, TxnStatus, DATE_FMT},
};
use chrono::{Datelike, NaiveDate};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const HEATMAP: &str = "01_transaction_heatmap";
pub const TIME_BY_HOUR: &str = "02_processing_time_by_hour";
pub const PEAK_VS_NORMAL: &str = "03_peak_vs_normal";
pub const TIME_DISTRIBUTION: &str = "04_time_distribution";
pub const CRYPTO_PERFORMANCE: &str = "05_crypto_performance";
pub const DAILY_EVOLUTION: &str = "06_daily_evolution";
pub const FAILURE_REASONS: &str = "07_failure_reasons";
pub const INTERACTIVE_DASHBOARD: &str = "08_interactive_dashboard";

const WEEKDAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];
const PEAK_BAND: (f64, f64) = (
    Period::PEAK_START_HOUR as f64,
    Period::PEAK_END_HOUR as f64,
);
const CRITICAL_ERROR_PCT: f64 = 10.0;

/// Build and write all eight charts into `dir`.
pub fn render_all(rows: &[AnalysisRow], dir: &Path) -> OpsResult<Vec<PathBuf>> {
    let charts = [
        (HEATMAP, transaction_heatmap(rows)),
        (TIME_BY_HOUR, processing_time_by_hour(rows)),
        (PEAK_VS_NORMAL, peak_vs_normal(rows)),
        (TIME_DISTRIBUTION, time_distribution(rows)),
        (CRYPTO_PERFORMANCE, crypto_performance(rows)),
        (DAILY_EVOLUTION, daily_evolution(rows)),
        (FAILURE_REASONS, failure_reasons(rows)),
        (INTERACTIVE_DASHBOARD, interactive_dashboard(rows)),
    ];
    charts
        .iter()
        .map(|(stem, fig)| fig.write_html(dir, stem))
        .collect()
}

// ── Aggregation helpers ────────────────────────────────────────────

fn settled(rows: &[AnalysisRow]) -> Vec<&AnalysisRow> {
    rows.iter().filter(|r| r.is_settled()).collect()
}

fn successful(rows: &[AnalysisRow]) -> Vec<&AnalysisRow> {
    rows.iter().filter(|r| r.status == TxnStatus::Success).collect()
}

fn seconds(rows: &[&AnalysisRow]) -> Vec<f64> {
    rows.iter().map(|r| r.processing_seconds as f64).collect()
}

fn error_pct(rows: &[&AnalysisRow]) -> f64 {
    stats::pct(rows.iter().filter(|r| r.is_failed()).count(), rows.len())
}

/// Group rows by a key, preserving key order.
fn group_by<'a, K: Ord>(
    rows: impl IntoIterator<Item = &'a AnalysisRow>,
    key: impl Fn(&AnalysisRow) -> K,
) -> BTreeMap<K, Vec<&'a AnalysisRow>> {
    let mut groups: BTreeMap<K, Vec<&'a AnalysisRow>> = BTreeMap::new();
    for r in rows {
        groups.entry(key(r)).or_default().push(r);
    }
    groups
}

#[derive(Debug, Clone, Copy, Default)]
struct TimeSummary {
    count: usize,
    mean: f64,
    median: f64,
    p95: f64,
}

fn summarize(rows: &[&AnalysisRow]) -> TimeSummary {
    let times = seconds(rows);
    TimeSummary {
        count: rows.len(),
        mean: stats::mean(&times).unwrap_or(0.0),
        median: stats::median(&times).unwrap_or(0.0),
        p95: stats::quantile(&times, 0.95).unwrap_or(0.0),
    }
}

// ── 1. Heatmap ─────────────────────────────────────────────────────

/// Transaction counts by weekday (rows) and hour (columns).
pub fn weekday_hour_counts(rows: &[AnalysisRow]) -> [[u64; 24]; 7] {
    let mut counts = [[0u64; 24]; 7];
    for r in rows {
        let day = r.started_at.weekday().num_days_from_monday() as usize;
        counts[day][r.hour() as usize] += 1;
    }
    counts
}

pub fn transaction_heatmap(rows: &[AnalysisRow]) -> Figure {
    let counts = weekday_hour_counts(rows);
    let mut fig = Figure::new("Transaction Volume by Hour and Weekday");
    fig.add_trace(json!({
        "type": "heatmap",
        "z": counts,
        "x": (0..24).collect::<Vec<u32>>(),
        "y": WEEKDAYS,
        "colorscale": "YlOrRd",
        "texttemplate": "%{z}",
        "colorbar": { "title": { "text": "Transactions" } },
    }));
    fig.set("xaxis", json!({ "title": { "text": "Hour of day" }, "dtick": 1 }));
    fig.set("yaxis", json!({ "title": { "text": "Weekday" }, "autorange": "reversed" }));
    fig.set("height", json!(600));
    fig
}

// ── 2. Processing time by hour ─────────────────────────────────────

pub fn processing_time_by_hour(rows: &[AnalysisRow]) -> Figure {
    let by_hour = group_by(settled(rows), |r| r.hour());
    let hours: Vec<u32> = by_hour.keys().copied().collect();
    let summaries: Vec<TimeSummary> = by_hour.values().map(|g| summarize(g)).collect();

    let grid = Grid::new(2, 1);
    let mut fig = Figure::new("Processing Time by Hour of Day");
    grid.apply(&mut fig, &["Processing Time by Hour", "Transactions by Hour"]);
    for (name, color, symbol, values) in [
        ("Mean", palette::PRIMARY, "circle", summaries.iter().map(|s| s.mean).collect::<Vec<_>>()),
        ("Median", palette::SUCCESS, "square", summaries.iter().map(|s| s.median).collect()),
        ("P95", palette::DANGER, "triangle-up", summaries.iter().map(|s| s.p95).collect()),
    ] {
        fig.add_trace(grid.place(
            json!({
                "type": "scatter",
                "mode": "lines+markers",
                "name": name,
                "x": hours,
                "y": values,
                "line": { "color": color, "width": 2 },
                "marker": { "symbol": symbol, "size": 8 },
            }),
            1,
            1,
        ));
    }
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "name": "Transactions",
            "x": hours,
            "y": summaries.iter().map(|s| s.count).collect::<Vec<_>>(),
            "marker": { "color": palette::INFO, "opacity": 0.7 },
        }),
        2,
        1,
    ));
    for row in 1..=2 {
        fig.add_shape(grid.vrect(row, 1, PEAK_BAND.0, PEAK_BAND.1, "red"));
    }
    fig.add_annotation(grid.label(1, 1, "Peak hour band: 18-23h"));
    grid.axis_titles(&mut fig, 1, 1, "Hour of day", "Time (seconds)");
    grid.axis_titles(&mut fig, 2, 1, "Hour of day", "Transactions");
    fig.set("height", json!(900));
    fig
}

// ── 3. Peak vs normal ──────────────────────────────────────────────

pub fn peak_vs_normal(rows: &[AnalysisRow]) -> Figure {
    let by_period = group_by(settled(rows), |r| r.period());
    let labels: Vec<&str> = by_period.keys().map(|p| p.as_str()).collect();
    let summaries: Vec<TimeSummary> = by_period.values().map(|g| summarize(g)).collect();
    let errors: Vec<f64> = by_period.values().map(|g| error_pct(g)).collect();

    let grid = Grid::new(1, 3).with_gaps(0.07, 0.0);
    let mut fig = Figure::new("Peak Hour vs Normal Hour");
    grid.apply(&mut fig, &["Processing Time", "Error Rate", "Transaction Volume"]);
    for (name, color, values) in [
        ("Mean", palette::PRIMARY, summaries.iter().map(|s| s.mean).collect::<Vec<_>>()),
        ("Median", palette::SUCCESS, summaries.iter().map(|s| s.median).collect()),
        ("P95", palette::DANGER, summaries.iter().map(|s| s.p95).collect()),
    ] {
        fig.add_trace(grid.place(
            json!({ "type": "bar", "name": name, "x": labels, "y": values, "marker": { "color": color } }),
            1,
            1,
        ));
    }
    let error_colors: Vec<&str> = by_period
        .keys()
        .map(|p| if *p == Period::Normal { palette::SUCCESS } else { palette::DANGER })
        .collect();
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "name": "Error rate",
            "x": labels,
            "y": errors,
            "text": errors.iter().map(|e| format!("{e:.2}%")).collect::<Vec<_>>(),
            "textposition": "outside",
            "marker": { "color": error_colors, "opacity": 0.7 },
            "showlegend": false,
        }),
        1,
        2,
    ));
    let counts: Vec<usize> = summaries.iter().map(|s| s.count).collect();
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "name": "Transactions",
            "x": labels,
            "y": counts,
            "text": counts.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            "textposition": "outside",
            "marker": { "color": palette::INFO, "opacity": 0.7 },
            "showlegend": false,
        }),
        1,
        3,
    ));
    grid.axis_titles(&mut fig, 1, 1, "", "Time (seconds)");
    grid.axis_titles(&mut fig, 1, 2, "", "Error rate (%)");
    grid.axis_titles(&mut fig, 1, 3, "", "Transactions");
    fig.set("barmode", json!("group"));
    fig.set("height", json!(550));
    fig
}

// ── 4. Time distribution ───────────────────────────────────────────

pub fn time_distribution(rows: &[AnalysisRow]) -> Figure {
    let ok = successful(rows);
    let times = seconds(&ok);
    let mut sorted = times.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mean = stats::mean(&times).unwrap_or(0.0);
    let median = stats::median(&times).unwrap_or(0.0);
    let p95 = if sorted.is_empty() { 0.0 } else { stats::quantile_sorted(&sorted, 0.95) };

    let grid = Grid::new(2, 2);
    let mut fig = Figure::new("Processing Time Distribution");
    grid.apply(
        &mut fig,
        &[
            "Overall Distribution",
            "Distribution by Period",
            "BTC vs ETH",
            "Cumulative Distribution (CDF)",
        ],
    );

    fig.add_trace(grid.place(
        json!({
            "type": "histogram",
            "name": "Successful",
            "x": times,
            "nbinsx": 50,
            "marker": { "color": palette::PRIMARY, "opacity": 0.7 },
        }),
        1,
        1,
    ));
    fig.add_shape(grid.vline(1, 1, mean, "red"));
    fig.add_shape(grid.vline(1, 1, median, "green"));
    fig.add_annotation(grid.label(1, 1, &format!("Mean {mean:.0}s / Median {median:.0}s")));

    for (period, color) in [(Period::Normal, palette::SUCCESS), (Period::Peak, palette::DANGER)] {
        let group: Vec<&AnalysisRow> = ok.iter().copied().filter(|r| r.period() == period).collect();
        fig.add_trace(grid.place(
            json!({
                "type": "box",
                "name": period.as_str(),
                "y": seconds(&group),
                "marker": { "color": color },
                "boxpoints": false,
            }),
            1,
            2,
        ));
    }

    for (crypto, color) in [(Crypto::Btc, palette::WARNING), (Crypto::Eth, palette::INFO)] {
        let group: Vec<&AnalysisRow> = ok.iter().copied().filter(|r| r.crypto == crypto).collect();
        fig.add_trace(grid.place(
            json!({
                "type": "histogram",
                "name": crypto.as_str(),
                "x": seconds(&group),
                "nbinsx": 30,
                "opacity": 0.6,
                "marker": { "color": color },
            }),
            2,
            1,
        ));
    }

    let n = sorted.len().max(1) as f64;
    let cdf: Vec<f64> = (1..=sorted.len()).map(|i| i as f64 * 100.0 / n).collect();
    fig.add_trace(grid.place(
        json!({
            "type": "scatter",
            "mode": "lines",
            "name": "CDF",
            "x": sorted,
            "y": cdf,
            "line": { "color": palette::PRIMARY, "width": 2 },
        }),
        2,
        2,
    ));
    fig.add_shape(grid.hline(2, 2, 95.0, "red"));
    fig.add_shape(grid.vline(2, 2, p95, "red"));
    fig.add_annotation(grid.label(2, 2, &format!("P95 = {p95:.0}s")));

    grid.axis_titles(&mut fig, 1, 1, "Time (seconds)", "Frequency");
    grid.axis_titles(&mut fig, 1, 2, "", "Time (seconds)");
    grid.axis_titles(&mut fig, 2, 1, "Time (seconds)", "Frequency");
    grid.axis_titles(&mut fig, 2, 2, "Time (seconds)", "Percentile (%)");
    fig.set("barmode", json!("overlay"));
    fig.set("height", json!(900));
    fig
}

// ── 5. Crypto performance ──────────────────────────────────────────

/// Colour band of an error rate: green < 5 %, orange < 10 %, red otherwise.
pub fn error_color(pct: f64) -> &'static str {
    if pct < 5.0 {
        palette::SUCCESS
    } else if pct < CRITICAL_ERROR_PCT {
        palette::WARNING
    } else {
        palette::DANGER
    }
}

pub fn crypto_performance(rows: &[AnalysisRow]) -> Figure {
    let ok = group_by(successful(rows), |r| r.crypto);
    let all = group_by(rows.iter(), |r| r.crypto);

    let mut per_crypto: Vec<(Crypto, usize, f64, f64, f64)> = ok
        .iter()
        .map(|(crypto, group)| {
            let volume: f64 = group.iter().map(|r| r.amount_usd).sum();
            let mean = stats::mean(&seconds(group)).unwrap_or(0.0);
            let err = all.get(crypto).map(|g| error_pct(g)).unwrap_or(0.0);
            (*crypto, group.len(), volume, mean, err)
        })
        .collect();
    per_crypto.sort_by(|a, b| b.2.total_cmp(&a.2));

    let names: Vec<&str> = per_crypto.iter().map(|c| c.0.as_str()).collect();
    let grid = Grid::new(2, 2);
    let mut fig = Figure::new("Performance by Cryptocurrency");
    grid.apply(
        &mut fig,
        &[
            "Total Volume by Cryptocurrency",
            "Number of Transactions",
            "Mean Processing Time",
            "Error Rate by Cryptocurrency",
        ],
    );
    let volumes: Vec<f64> = per_crypto.iter().map(|c| c.2).collect();
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "orientation": "h",
            "x": volumes,
            "y": names,
            "text": volumes.iter().map(|v| format!("${:.1}M", v / 1e6)).collect::<Vec<_>>(),
            "textposition": "outside",
            "marker": { "color": volumes, "colorscale": "Viridis" },
        }),
        1,
        1,
    ));
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "x": names,
            "y": per_crypto.iter().map(|c| c.1).collect::<Vec<_>>(),
            "marker": { "color": palette::INFO, "opacity": 0.7 },
        }),
        1,
        2,
    ));
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "x": names,
            "y": per_crypto.iter().map(|c| c.3).collect::<Vec<_>>(),
            "marker": { "color": palette::PRIMARY, "opacity": 0.7 },
        }),
        2,
        1,
    ));
    let errors: Vec<f64> = per_crypto.iter().map(|c| c.4).collect();
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "x": names,
            "y": errors,
            "marker": { "color": errors.iter().map(|e| error_color(*e)).collect::<Vec<_>>(), "opacity": 0.7 },
        }),
        2,
        2,
    ));
    fig.add_shape(grid.hline(2, 2, CRITICAL_ERROR_PCT, "red"));
    fig.add_annotation(grid.label(2, 2, "Critical threshold (10%)"));
    grid.axis_titles(&mut fig, 1, 1, "Volume (USD)", "");
    grid.axis_titles(&mut fig, 1, 2, "", "Transactions");
    grid.axis_titles(&mut fig, 2, 1, "", "Time (seconds)");
    grid.axis_titles(&mut fig, 2, 2, "", "Error rate (%)");
    fig.set("showlegend", json!(false));
    fig.set("height", json!(900));
    fig
}

// ── 6. Daily evolution ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub txn_count: usize,
    pub active_users: usize,
    pub volume_usd: f64,
    pub mean_seconds: f64,
    pub error_rate_pct: f64,
}

pub fn daily_points(rows: &[AnalysisRow]) -> Vec<DailyPoint> {
    group_by(rows.iter(), |r| r.started_at.date())
        .into_iter()
        .map(|(date, group)| DailyPoint {
            date,
            txn_count: group.len(),
            active_users: group.iter().map(|r| r.user_id).collect::<HashSet<_>>().len(),
            volume_usd: group
                .iter()
                .filter(|r| r.status == TxnStatus::Success)
                .map(|r| r.amount_usd)
                .sum(),
            mean_seconds: stats::mean(&seconds(&group)).unwrap_or(0.0),
            error_rate_pct: error_pct(&group),
        })
        .collect()
}

pub fn daily_evolution(rows: &[AnalysisRow]) -> Figure {
    let points = daily_points(rows);
    let dates: Vec<String> = points.iter().map(|p| p.date.format(DATE_FMT).to_string()).collect();
    let means: Vec<f64> = points.iter().map(|p| p.mean_seconds).collect();
    let overall = stats::mean(&means).unwrap_or(0.0);
    let spread = stats::std_dev(&means).unwrap_or(0.0);

    let grid = Grid::new(3, 1).with_gaps(0.0, 0.08);
    let mut fig = Figure::new("Daily Evolution of Key Metrics");
    grid.apply(
        &mut fig,
        &[
            "Volume and Number of Transactions",
            "Processing Time",
            "Error Rate",
        ],
    );
    fig.add_trace(grid.place(
        json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": "Volume USD",
            "x": dates,
            "y": points.iter().map(|p| p.volume_usd).collect::<Vec<_>>(),
            "line": { "color": palette::PRIMARY, "width": 2 },
            "marker": { "size": 4 },
        }),
        1,
        1,
    ));
    // Transaction count on a right-hand axis overlaying the first cell.
    fig.add_trace(json!({
        "type": "scatter",
        "mode": "lines+markers",
        "name": "Transactions",
        "x": dates,
        "y": points.iter().map(|p| p.txn_count).collect::<Vec<_>>(),
        "xaxis": "x",
        "yaxis": "y4",
        "line": { "color": palette::SUCCESS, "width": 2 },
        "marker": { "symbol": "square", "size": 4 },
    }));
    fig.set(
        "yaxis4",
        json!({ "overlaying": "y", "side": "right", "anchor": "x", "title": { "text": "Transactions" } }),
    );

    fig.add_trace(grid.place(
        json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": "Mean time",
            "x": dates,
            "y": means,
            "line": { "color": palette::WARNING, "width": 2 },
            "marker": { "size": 4 },
        }),
        2,
        1,
    ));
    fig.add_shape(json!({
        "type": "rect",
        "xref": "x2 domain",
        "yref": "y2",
        "x0": 0,
        "x1": 1,
        "y0": overall - spread,
        "y1": overall + spread,
        "fillcolor": "red",
        "opacity": 0.2,
        "layer": "below",
        "line": { "width": 0 },
    }));
    fig.add_shape(grid.hline(2, 1, overall, "red"));
    fig.add_annotation(grid.label(2, 1, &format!("Mean: {overall:.2}s (band: ±1 std)")));

    fig.add_trace(grid.place(
        json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": "Error rate",
            "x": dates,
            "y": points.iter().map(|p| p.error_rate_pct).collect::<Vec<_>>(),
            "line": { "color": palette::DANGER, "width": 2 },
            "marker": { "size": 4 },
        }),
        3,
        1,
    ));
    fig.add_shape(grid.hline(3, 1, CRITICAL_ERROR_PCT, "red"));
    fig.add_annotation(grid.label(3, 1, "Critical threshold (10%)"));

    grid.axis_titles(&mut fig, 1, 1, "Date", "Volume (USD)");
    grid.axis_titles(&mut fig, 2, 1, "Date", "Mean time (seconds)");
    grid.axis_titles(&mut fig, 3, 1, "Date", "Error rate (%)");
    fig.set("height", json!(1100));
    fig
}

// ── 7. Failure reasons ─────────────────────────────────────────────

/// The `limit` most frequent failure reasons, most frequent first.
pub fn top_failure_reasons(rows: &[AnalysisRow], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in rows.iter().filter(|r| r.is_failed()) {
        let reason = r.failure_reason.as_deref().unwrap_or("Unknown");
        *counts.entry(reason).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

pub fn failure_reasons(rows: &[AnalysisRow]) -> Figure {
    let top = top_failure_reasons(rows, 8);
    let labels: Vec<&str> = top.iter().map(|(r, _)| r.as_str()).collect();
    let counts: Vec<usize> = top.iter().map(|(_, n)| *n).collect();

    let grid = Grid::new(1, 2).with_gaps(0.25, 0.0);
    let mut fig = Figure::new("Failure Reasons");
    grid.apply(&mut fig, &["Top Failure Reasons", "Share of Failures"]);
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "orientation": "h",
            "x": counts,
            "y": labels,
            "text": counts.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            "textposition": "outside",
            "marker": { "color": palette::DANGER, "opacity": 0.7 },
        }),
        1,
        1,
    ));
    fig.add_trace(grid.place_domain(
        json!({
            "type": "pie",
            "labels": labels,
            "values": counts,
            "textinfo": "percent",
            "sort": false,
            "rotation": 90,
        }),
        1,
        2,
    ));
    grid.axis_titles(&mut fig, 1, 1, "Failed transactions", "");
    fig.merge("yaxis", json!({ "autorange": "reversed" }));
    fig.set("height", json!(600));
    fig
}

// ── 8. Interactive overview ────────────────────────────────────────

pub fn interactive_dashboard(rows: &[AnalysisRow]) -> Figure {
    let by_hour_settled = group_by(settled(rows), |r| r.hour());
    let by_hour_all = group_by(rows.iter(), |r| r.hour());
    let hours: Vec<u32> = by_hour_settled.keys().copied().collect();
    let means: Vec<f64> = by_hour_settled
        .values()
        .map(|g| stats::mean(&seconds(g)).unwrap_or(0.0))
        .collect();
    let counts: Vec<usize> = by_hour_settled.values().map(Vec::len).collect();
    let error_hours: Vec<u32> = by_hour_all.keys().copied().collect();
    let errors: Vec<f64> = by_hour_all.values().map(|g| error_pct(g)).collect();

    let grid = Grid::new(2, 2);
    let mut fig = Figure::new("Crypto Operations Dashboard - Performance Overview");
    grid.apply(
        &mut fig,
        &[
            "Processing Time by Hour",
            "Transaction Volume",
            "Error Rate by Hour",
            "Time Distribution",
        ],
    );
    fig.add_trace(grid.place(
        json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": "Mean time",
            "x": hours,
            "y": means,
            "line": { "color": palette::PRIMARY, "width": 3 },
            "marker": { "size": 8 },
        }),
        1,
        1,
    ));
    fig.add_shape(grid.vrect(1, 1, PEAK_BAND.0, PEAK_BAND.1, "red"));
    fig.add_annotation(grid.label(1, 1, "Peak hour"));
    fig.add_trace(grid.place(
        json!({ "type": "bar", "name": "Transactions", "x": hours, "y": counts, "marker": { "color": palette::SUCCESS } }),
        1,
        2,
    ));
    fig.add_trace(grid.place(
        json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": "Error rate",
            "x": error_hours,
            "y": errors,
            "fill": "tozeroy",
            "line": { "color": palette::DANGER, "width": 3 },
            "marker": { "size": 8 },
        }),
        2,
        1,
    ));
    fig.add_shape(grid.hline(2, 1, CRITICAL_ERROR_PCT, "red"));
    fig.add_annotation(grid.label(2, 1, "Critical threshold"));
    fig.add_trace(grid.place(
        json!({
            "type": "histogram",
            "name": "Distribution",
            "x": seconds(&successful(rows)),
            "nbinsx": 50,
            "marker": { "color": palette::INFO },
        }),
        2,
        2,
    ));
    grid.axis_titles(&mut fig, 1, 1, "Hour of day", "Time (s)");
    grid.axis_titles(&mut fig, 1, 2, "Hour of day", "Transactions");
    grid.axis_titles(&mut fig, 2, 1, "Hour of day", "Error rate (%)");
    grid.axis_titles(&mut fig, 2, 2, "Time (s)", "Frequency");
    fig.set("showlegend", json!(false));
    fig.set("height", json!(800));
    fig
}
