//! Chart files, the before/after projection and the executive dashboard.

use chrono::NaiveDate;
use cryptoops_core::{
    charts::{
        before_after::{impact_summary, write_impact_chart, IMPACT_CHART},
        dashboard::{self, daily_trends, write_dashboard, Kpis},
        palette,
        visualizations::{
            error_color, render_all, top_failure_reasons, weekday_hour_counts, HEATMAP,
            INTERACTIVE_DASHBOARD,
        },
    },
    config::{GeneratorConfig, ProjectionConfig, Settings},
    hourly_metrics::HourlyMetric,
    pipeline::Pipeline,
    rng::{RngBank, StreamSlot},
    stage::StageContext,
    stages::GENERATE,
    store::AnalysisRow,
};
use tempfile::TempDir;

fn dataset() -> (Vec<AnalysisRow>, Vec<HourlyMetric>) {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        data_dir: dir.path().to_path_buf(),
        ..Settings::default()
    };
    let ctx = StageContext::in_memory(settings, GeneratorConfig::default_test()).unwrap();
    let mut pipeline = Pipeline::build(ctx);
    pipeline.run_one(GENERATE).unwrap();
    let store = &pipeline.context().store;
    let rows = store
        .analysis_rows(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
        .unwrap();
    (rows, store.hourly_metrics().unwrap())
}

#[test]
fn render_all_writes_eight_html_files() {
    let (rows, _) = dataset();
    let dir = TempDir::new().unwrap();
    let written = render_all(&rows, &dir.path().join("viz")).unwrap();
    assert_eq!(written.len(), 8);
    assert!(written.iter().all(|p| p.exists()));
    assert_eq!(written[0].file_name().unwrap(), format!("{HEATMAP}.html").as_str());
    assert_eq!(written[7].file_name().unwrap(), format!("{INTERACTIVE_DASHBOARD}.html").as_str());

    let html = std::fs::read_to_string(&written[0]).unwrap();
    assert!(html.contains("plotly"));
    assert!(html.contains("heatmap"));
}

#[test]
fn heatmap_counts_every_row_once() {
    let (rows, _) = dataset();
    let counts = weekday_hour_counts(&rows);
    let total: u64 = counts.iter().flat_map(|day| day.iter()).sum();
    assert_eq!(total, rows.len() as u64);
}

#[test]
fn failure_reasons_are_ranked_and_limited() {
    let (rows, _) = dataset();
    let top = top_failure_reasons(&rows, 3);
    assert!(top.len() <= 3);
    assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
    assert!(top.iter().all(|(reason, _)| !reason.is_empty()));
}

#[test]
fn error_colour_bands() {
    assert_eq!(error_color(1.0), palette::SUCCESS);
    assert_eq!(error_color(5.0), palette::WARNING);
    assert_eq!(error_color(9.99), palette::WARNING);
    assert_eq!(error_color(10.0), palette::DANGER);
}

#[test]
fn impact_summary_applies_projection_and_samples_deterministically() {
    let (rows, _) = dataset();
    let projection = ProjectionConfig::default();
    let draw = || {
        let mut rng = RngBank::new(42).for_stream(StreamSlot::Sampling);
        impact_summary(&rows, &projection, 500, &mut rng)
    };
    let summary = draw();
    assert_eq!(summary.transactions, rows.len());
    assert_eq!(summary.sample_before.len(), 500);
    assert!((summary.mean_seconds_after - summary.mean_seconds_before * 0.773).abs() < 1e-6);
    assert!((summary.error_rate_after_pct - summary.error_rate_before_pct * 0.533).abs() < 1e-6);
    assert!(summary.saved_hours() > 0.0);
    assert_eq!(summary, draw());

    let dir = TempDir::new().unwrap();
    let path = write_impact_chart(&summary, dir.path()).unwrap();
    assert_eq!(path, dir.path().join(format!("{IMPACT_CHART}.html")));
    assert!(path.exists());
}

#[test]
fn dashboard_writes_four_panels_and_the_page() {
    let (rows, metrics) = dataset();
    let dir = TempDir::new().unwrap();
    let generated_at = NaiveDate::from_ymd_opt(2024, 12, 31)
        .unwrap()
        .and_hms_opt(18, 30, 0)
        .unwrap();
    let output = write_dashboard(&rows, &metrics, &ProjectionConfig::default(), dir.path(), generated_at)
        .unwrap();
    assert_eq!(output.files.len(), 5);
    assert!(output.files.iter().all(|p| p.exists()));
    assert_eq!(output.before, Kpis::measure(&rows));
    assert!(output.after.mean_seconds < output.before.mean_seconds);
    assert!(output.saved_hours > 0.0);

    let page = std::fs::read_to_string(dir.path().join(format!("{}.html", dashboard::FULL))).unwrap();
    for stem in [dashboard::KPIS, dashboard::EVOLUTION, dashboard::BOTTLENECKS, dashboard::OPTIMIZATIONS] {
        assert!(page.contains(&format!("src=\"{stem}.html\"")), "missing {stem}");
    }
    assert!(page.contains("Generated 2024-12-31 18:30:00"));
    assert!(page.contains("22.7%"));
}

#[test]
fn daily_trends_sum_hourly_counts() {
    let (rows, metrics) = dataset();
    let trends = daily_trends(&metrics);
    let total: u64 = trends.iter().map(|t| t.txn_count).sum();
    assert_eq!(total, rows.len() as u64);
    assert!(trends.windows(2).all(|w| w[0].date < w[1].date));
    for m in &metrics {
        assert_eq!(m.success_count + m.failed_count, m.txn_count);
    }
}
