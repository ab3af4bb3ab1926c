//! Executive dashboard: projected KPIs, four figures and a consolidated page.

use super::figure::{html_escape, palette, Figure, Grid};
use crate::{
    config::ProjectionConfig,
    error::OpsResult,
    hourly_metrics::HourlyMetric,
    stats,
    store::AnalysisRow,
    types::{Period, TxnStatus, DATE_FMT, TIMESTAMP_FMT},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

pub const KPIS: &str = "dashboard_01_kpis";
pub const EVOLUTION: &str = "dashboard_02_evolution";
pub const BOTTLENECKS: &str = "dashboard_03_bottlenecks";
pub const OPTIMIZATIONS: &str = "dashboard_04_optimizations";
pub const FULL: &str = "dashboard_full";

/// Proposed optimizations and their estimated time reduction (%).
pub const OPTIMIZATION_IMPACTS: [(&str, u32); 5] = [
    ("Automatic Validation", 30),
    ("Queue System", 15),
    ("Batch Processing", 10),
    ("Payment Method Optimization", 10),
    ("Hourly Scaling", 12),
];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Kpis {
    pub total_transactions: f64,
    pub active_users: f64,
    pub volume_usd: f64,
    pub mean_ticket_usd: f64,
    pub mean_seconds: f64,
    pub p95_seconds: f64,
    pub error_rate_pct: f64,
    pub fees_usd: f64,
}

impl Kpis {
    /// Current values. Volume, ticket and fees count successful rows;
    /// timing counts success and failed rows; error rate counts all rows.
    pub fn measure(rows: &[AnalysisRow]) -> Self {
        let ok: Vec<&AnalysisRow> = rows.iter().filter(|r| r.status == TxnStatus::Success).collect();
        let amounts: Vec<f64> = ok.iter().map(|r| r.amount_usd).collect();
        let times: Vec<f64> = rows
            .iter()
            .filter(|r| r.is_settled())
            .map(|r| r.processing_seconds as f64)
            .collect();
        Self {
            total_transactions: rows.len() as f64,
            active_users: rows.iter().map(|r| r.user_id).collect::<HashSet<_>>().len() as f64,
            volume_usd: amounts.iter().sum(),
            mean_ticket_usd: stats::mean(&amounts).unwrap_or(0.0),
            mean_seconds: stats::mean(&times).unwrap_or(0.0),
            p95_seconds: stats::quantile(&times, 0.95).unwrap_or(0.0),
            error_rate_pct: stats::pct(rows.iter().filter(|r| r.is_failed()).count(), rows.len()),
            fees_usd: ok.iter().map(|r| r.fee_usd).sum(),
        }
    }

    /// Values projected once the optimizations are in place.
    pub fn projected(&self, projection: &ProjectionConfig) -> Self {
        let faster = 1.0 - projection.time_reduction;
        Self {
            total_transactions: self.total_transactions * (1.0 + projection.capacity_growth),
            active_users: self.active_users,
            volume_usd: self.volume_usd * (1.0 + projection.volume_growth),
            mean_ticket_usd: self.mean_ticket_usd,
            mean_seconds: self.mean_seconds * faster,
            p95_seconds: self.p95_seconds * faster,
            error_rate_pct: self.error_rate_pct * (1.0 - projection.error_reduction),
            fees_usd: self.fees_usd * (1.0 + projection.volume_growth),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum KpiFormat {
    Number,
    Money,
    Percent,
}

struct KpiTile {
    title: &'static str,
    value: fn(&Kpis) -> f64,
    format: KpiFormat,
    lower_is_better: bool,
}

const TILES: [KpiTile; 8] = [
    KpiTile { title: "Total Transactions", value: |k| k.total_transactions, format: KpiFormat::Number, lower_is_better: false },
    KpiTile { title: "Volume (USD)", value: |k| k.volume_usd, format: KpiFormat::Money, lower_is_better: false },
    KpiTile { title: "Mean Time (s)", value: |k| k.mean_seconds, format: KpiFormat::Number, lower_is_better: true },
    KpiTile { title: "Error Rate (%)", value: |k| k.error_rate_pct, format: KpiFormat::Percent, lower_is_better: true },
    KpiTile { title: "Active Users", value: |k| k.active_users, format: KpiFormat::Number, lower_is_better: false },
    KpiTile { title: "Mean Ticket (USD)", value: |k| k.mean_ticket_usd, format: KpiFormat::Money, lower_is_better: false },
    KpiTile { title: "P95 Time (s)", value: |k| k.p95_seconds, format: KpiFormat::Number, lower_is_better: true },
    KpiTile { title: "Fees (USD)", value: |k| k.fees_usd, format: KpiFormat::Money, lower_is_better: false },
];

pub fn kpi_figure(before: &Kpis, after: &Kpis) -> Figure {
    let grid = Grid::new(2, 4).with_gaps(0.1, 0.15);
    let mut fig = Figure::new("Key KPIs: Projection with Optimizations");
    let titles: Vec<&str> = TILES.iter().map(|t| t.title).collect();
    grid.apply(&mut fig, &titles);
    for (i, tile) in TILES.iter().enumerate() {
        let (row, col) = (i / 4 + 1, i % 4 + 1);
        let (good, bad) = (palette::SUCCESS, palette::DANGER);
        let (increasing, decreasing) = if tile.lower_is_better { (bad, good) } else { (good, bad) };
        let value_format = match tile.format {
            KpiFormat::Number => ",.0f",
            KpiFormat::Money => "$,.0f",
            KpiFormat::Percent => ".2f",
        };
        fig.add_trace(grid.place_domain(
            json!({
                "type": "indicator",
                "mode": "number+delta",
                "value": (tile.value)(after),
                "number": { "valueformat": value_format },
                "delta": {
                    "reference": (tile.value)(before),
                    "relative": true,
                    "valueformat": ".1%",
                    "increasing": { "color": increasing },
                    "decreasing": { "color": decreasing },
                },
            }),
            row,
            col,
        ));
    }
    // Indicators carry no cartesian axes.
    for row in 1..=grid.rows {
        for col in 1..=grid.cols {
            let (x_key, y_key) = grid.axis_keys(row, col);
            fig.merge(&x_key, json!({ "visible": false }));
            fig.merge(&y_key, json!({ "visible": false }));
        }
    }
    fig.merge("title", json!({ "font": { "size": 24, "color": palette::DARK } }));
    fig.set("height", json!(500));
    fig.set("showlegend", json!(false));
    fig.set("paper_bgcolor", json!("white"));
    fig.set("plot_bgcolor", json!(palette::LIGHT));
    fig
}

// ── Daily evolution ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub txn_count: u64,
    pub mean_seconds: f64,
    pub error_rate_pct: f64,
    pub volume_usd: f64,
}

/// Daily totals from hourly metrics: counts and volume are summed, the
/// hourly mean time and error rate are averaged.
pub fn daily_trends(metrics: &[HourlyMetric]) -> Vec<DailyTrend> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&HourlyMetric>> = BTreeMap::new();
    for m in metrics {
        by_date.entry(m.date).or_default().push(m);
    }
    by_date
        .into_iter()
        .map(|(date, hours)| {
            let means: Vec<f64> = hours.iter().map(|m| m.mean_processing_seconds).collect();
            let errors: Vec<f64> = hours.iter().map(|m| m.error_rate_pct).collect();
            DailyTrend {
                date,
                txn_count: hours.iter().map(|m| m.txn_count as u64).sum(),
                mean_seconds: stats::mean(&means).unwrap_or(0.0),
                error_rate_pct: stats::mean(&errors).unwrap_or(0.0),
                volume_usd: hours.iter().map(|m| m.total_volume_usd).sum(),
            }
        })
        .collect()
}

pub fn evolution_figure(metrics: &[HourlyMetric], projection: &ProjectionConfig) -> Figure {
    let trends = daily_trends(metrics);
    let dates: Vec<String> = trends.iter().map(|t| t.date.format(DATE_FMT).to_string()).collect();
    let means: Vec<f64> = trends.iter().map(|t| t.mean_seconds).collect();
    let target = stats::mean(&means).unwrap_or(0.0) * (1.0 - projection.time_reduction);

    let grid = Grid::new(2, 2);
    let mut fig = Figure::new("Evolution of Key Metrics");
    grid.apply(
        &mut fig,
        &[
            "Transaction Volume",
            "Processing Time (s)",
            "Error Rate (%)",
            "Financial Volume (USD)",
        ],
    );
    let series = [
        ("Transactions", palette::PRIMARY, Some("rgba(31, 119, 180, 0.2)"), trends.iter().map(|t| t.txn_count as f64).collect::<Vec<_>>()),
        ("Mean time", palette::WARNING, None, means.clone()),
        ("Error rate", palette::DANGER, Some("rgba(231, 76, 60, 0.2)"), trends.iter().map(|t| t.error_rate_pct).collect()),
        ("Volume USD", palette::SUCCESS, Some("rgba(46, 204, 113, 0.2)"), trends.iter().map(|t| t.volume_usd).collect()),
    ];
    for (i, (name, color, fill, values)) in series.iter().enumerate() {
        let mut trace = json!({
            "type": "scatter",
            "mode": "lines",
            "name": name,
            "x": dates,
            "y": values,
            "line": { "color": color, "width": 2 },
        });
        if let Some(fill) = fill {
            trace["fill"] = json!("tozeroy");
            trace["fillcolor"] = json!(fill);
        }
        fig.add_trace(grid.place(trace, i / 2 + 1, i % 2 + 1));
    }
    fig.add_shape(grid.hline(1, 2, target, palette::SUCCESS));
    fig.add_annotation(grid.label(1, 2, "Target with optimizations"));
    fig.add_shape(grid.hline(2, 1, 10.0, "red"));
    fig.add_annotation(grid.label(2, 1, "Critical threshold (10%)"));

    for (row, col, y_title) in [(1, 1, "Count"), (1, 2, "Seconds"), (2, 1, "Percent"), (2, 2, "USD")] {
        grid.axis_titles(&mut fig, row, col, "Date", y_title);
    }
    fig.set("height", json!(700));
    fig.set("showlegend", json!(false));
    fig.set("hovermode", json!("x unified"));
    fig
}

// ── Bottlenecks and optimizations ──────────────────────────────────

pub fn bottleneck_figure(rows: &[AnalysisRow]) -> Figure {
    let mut by_period: BTreeMap<Period, Vec<&AnalysisRow>> = BTreeMap::new();
    for r in rows.iter().filter(|r| r.is_settled()) {
        by_period.entry(r.period()).or_default().push(r);
    }
    let periods: Vec<&str> = by_period.keys().map(|p| p.as_str()).collect();
    let period_means: Vec<f64> = by_period
        .values()
        .map(|g| stats::mean(&g.iter().map(|r| r.processing_seconds as f64).collect::<Vec<_>>()).unwrap_or(0.0))
        .collect();
    let period_errors: Vec<f64> = by_period
        .values()
        .map(|g| stats::pct(g.iter().filter(|r| r.is_failed()).count(), g.len()))
        .collect();

    let mut by_flag: BTreeMap<bool, Vec<f64>> = BTreeMap::new();
    for r in rows {
        by_flag
            .entry(r.requires_manual_validation)
            .or_default()
            .push(r.processing_seconds as f64);
    }
    let flag_labels: Vec<&str> = by_flag
        .keys()
        .map(|flag| if *flag { "With validation" } else { "Without validation" })
        .collect();
    let flag_colors: Vec<&str> = by_flag
        .keys()
        .map(|flag| if *flag { palette::DANGER } else { palette::SUCCESS })
        .collect();
    let flag_means: Vec<f64> = by_flag.values().map(|t| stats::mean(t).unwrap_or(0.0)).collect();

    let grid = Grid::new(1, 2);
    let mut fig = Figure::new("Identified Bottlenecks");
    grid.apply(&mut fig, &["Peak Hour Impact", "Manual Validation Impact"]);
    for (name, color, values) in [
        ("Mean time", palette::PRIMARY, &period_means),
        ("Error rate", palette::DANGER, &period_errors),
    ] {
        fig.add_trace(grid.place(
            json!({
                "type": "bar",
                "name": name,
                "x": periods,
                "y": values,
                "text": values.iter().map(|v| format!("{v:.1}")).collect::<Vec<_>>(),
                "textposition": "outside",
                "marker": { "color": color },
            }),
            1,
            1,
        ));
    }
    fig.add_trace(grid.place(
        json!({
            "type": "bar",
            "name": "Mean time",
            "x": flag_labels,
            "y": flag_means,
            "text": flag_means.iter().map(|v| format!("{v:.0}")).collect::<Vec<_>>(),
            "textposition": "outside",
            "marker": { "color": flag_colors },
        }),
        1,
        2,
    ));
    grid.axis_titles(&mut fig, 1, 1, "", "Value");
    grid.axis_titles(&mut fig, 1, 2, "", "Time (s)");
    fig.set("height", json!(500));
    fig.set("showlegend", json!(false));
    fig.set("barmode", json!("group"));
    fig
}

pub fn optimizations_figure() -> Figure {
    let names: Vec<&str> = OPTIMIZATION_IMPACTS.iter().map(|(n, _)| *n).collect();
    let impacts: Vec<u32> = OPTIMIZATION_IMPACTS.iter().map(|(_, i)| *i).collect();
    let cumulative: Vec<u32> = impacts
        .iter()
        .scan(0, |acc, i| {
            *acc += i;
            Some(*acc)
        })
        .collect();

    let mut fig = Figure::new("Estimated Impact of Proposed Optimizations");
    fig.add_trace(json!({
        "type": "bar",
        "name": "Estimated impact",
        "x": names,
        "y": impacts,
        "text": impacts.iter().map(|i| format!("{i}%")).collect::<Vec<_>>(),
        "textposition": "outside",
        "marker": { "color": palette::WARNING },
    }));
    fig.add_trace(json!({
        "type": "scatter",
        "mode": "lines+markers",
        "name": "Cumulative impact",
        "x": names,
        "y": cumulative,
        "yaxis": "y2",
        "line": { "color": palette::PRIMARY, "width": 3 },
        "marker": { "size": 10 },
    }));
    fig.set("yaxis", json!({ "title": { "text": "Processing time reduction (%)" } }));
    fig.set(
        "yaxis2",
        json!({ "title": { "text": "Cumulative impact (%)" }, "overlaying": "y", "side": "right" }),
    );
    fig.set("height", json!(500));
    fig.set("showlegend", json!(false));
    fig
}

// ── Consolidated page ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DashboardOutput {
    pub before: Kpis,
    pub after: Kpis,
    pub saved_hours: f64,
    pub files: Vec<PathBuf>,
}

/// Hours saved across all analysed transactions by the projected mean time.
pub fn saved_hours(before: &Kpis, after: &Kpis) -> f64 {
    (before.mean_seconds - after.mean_seconds) * before.total_transactions / 3600.0
}

fn thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0.0 && digits != "0" {
        out.insert(0, '-');
    }
    out
}

pub fn full_page(
    before: &Kpis,
    after: &Kpis,
    projection: &ProjectionConfig,
    period: (NaiveDate, NaiveDate),
    generated_at: NaiveDateTime,
) -> String {
    let cards = [
        ("Time Reduction", format!("{:.1}%", projection.time_reduction * 100.0)),
        ("Error Rate Improvement", format!("{:.1}%", projection.error_reduction * 100.0)),
        ("Transactions Analysed", thousands(before.total_transactions)),
        ("Time Saved", format!("{:.0}h", saved_hours(before, after))),
    ]
    .iter()
    .map(|(label, value)| {
        format!(
            "      <div class=\"metric-card\"><div class=\"metric-label\">{}</div>\
             <div class=\"metric-value\">{}</div></div>",
            html_escape(label),
            html_escape(value)
        )
    })
    .collect::<Vec<_>>()
    .join("\n");

    let sections = [
        ("Key KPIs", KPIS, 550),
        ("Evolution Over Time", EVOLUTION, 750),
        ("Identified Bottlenecks", BOTTLENECKS, 550),
        ("Impact of Proposed Optimizations", OPTIMIZATIONS, 550),
    ]
    .iter()
    .map(|(title, stem, height)| {
        format!(
            "    <div class=\"section\">\n      <h2 class=\"section-title\">{title}</h2>\n      \
             <iframe src=\"{stem}.html\" height=\"{height}\"></iframe>\n    </div>"
        )
    })
    .collect::<Vec<_>>()
    .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>CryptoOps Analyzer - Executive Dashboard</title>
  <style>
    body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 0; padding: 20px; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); }}
    .container {{ max-width: 1400px; margin: 0 auto; background: white; padding: 30px; border-radius: 10px; box-shadow: 0 10px 40px rgba(0,0,0,0.3); }}
    h1 {{ color: #2c3e50; text-align: center; font-size: 2.5em; margin-bottom: 10px; }}
    .subtitle {{ text-align: center; color: #7f8c8d; font-size: 1.2em; margin-bottom: 40px; }}
    .section {{ margin-bottom: 50px; }}
    .section-title {{ font-size: 1.8em; color: #34495e; border-bottom: 3px solid #3498db; padding-bottom: 10px; margin-bottom: 20px; }}
    iframe {{ width: 100%; border: none; border-radius: 5px; }}
    .footer {{ text-align: center; color: #95a5a6; margin-top: 50px; padding-top: 20px; border-top: 1px solid #ecf0f1; }}
    .metrics-summary {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(250px, 1fr)); gap: 20px; margin: 30px 0; }}
    .metric-card {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 20px; border-radius: 10px; color: white; text-align: center; }}
    .metric-value {{ font-size: 2.5em; font-weight: bold; margin: 10px 0; }}
    .metric-label {{ font-size: 1em; opacity: 0.9; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>CryptoOps Analyzer</h1>
    <p class="subtitle">Operations Optimization Executive Dashboard</p>
    <div class="metrics-summary">
{cards}
    </div>
{sections}
    <div class="footer">
      <p>Generated {generated}</p>
      <p>Analysis window: {from} to {to} | Total transactions: {total}</p>
    </div>
  </div>
</body>
</html>
"#,
        generated = generated_at.format(TIMESTAMP_FMT),
        from = period.0.format(DATE_FMT),
        to = period.1.format(DATE_FMT),
        total = thousands(before.total_transactions),
    )
}

/// Write the four dashboard figures and the page embedding them.
pub fn write_dashboard(
    rows: &[AnalysisRow],
    metrics: &[HourlyMetric],
    projection: &ProjectionConfig,
    dir: &Path,
    generated_at: NaiveDateTime,
) -> OpsResult<DashboardOutput> {
    let before = Kpis::measure(rows);
    let after = before.projected(projection);
    let mut files = vec![
        kpi_figure(&before, &after).write_html(dir, KPIS)?,
        evolution_figure(metrics, projection).write_html(dir, EVOLUTION)?,
        bottleneck_figure(rows).write_html(dir, BOTTLENECKS)?,
        optimizations_figure().write_html(dir, OPTIMIZATIONS)?,
    ];

    let first = rows.iter().map(|r| r.started_at.date()).min();
    let last = rows.iter().map(|r| r.started_at.date()).max();
    let period = match (first, last) {
        (Some(first), Some(last)) => (first, last),
        _ => (generated_at.date(), generated_at.date()),
    };
    let page = dir.join(format!("{FULL}.html"));
    std::fs::write(&page, full_page(&before, &after, projection, period, generated_at))?;
    log::info!("saved {}", page.display());
    files.push(page);

    Ok(DashboardOutput {
        saved_hours: saved_hours(&before, &after),
        before,
        after,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(0.0), "0");
        assert_eq!(thousands(999.0), "999");
        assert_eq!(thousands(1000.0), "1,000");
        assert_eq!(thousands(1234567.4), "1,234,567");
    }

    #[test]
    fn projection_scales_each_kpi() {
        let before = Kpis {
            total_transactions: 1000.0,
            active_users: 50.0,
            volume_usd: 10_000.0,
            mean_ticket_usd: 100.0,
            mean_seconds: 200.0,
            p95_seconds: 600.0,
            error_rate_pct: 10.0,
            fees_usd: 150.0,
        };
        let after = before.projected(&ProjectionConfig::default());
        assert!((after.total_transactions - 1120.0).abs() < 1e-9);
        assert_eq!(after.active_users, 50.0);
        assert!((after.volume_usd - 11_000.0).abs() < 1e-9);
        assert_eq!(after.mean_ticket_usd, 100.0);
        assert!((after.mean_seconds - 154.6).abs() < 1e-9);
        assert!((after.p95_seconds - 463.8).abs() < 1e-9);
        assert!((after.error_rate_pct - 5.33).abs() < 1e-9);
        assert!((after.fees_usd - 165.0).abs() < 1e-9);
        assert!((saved_hours(&before, &after) - 45.4 * 1000.0 / 3600.0).abs() < 1e-9);
    }
}
