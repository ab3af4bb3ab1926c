//! The eight pipeline stages.

use crate::{
    analysis::{bottlenecks, sql_reports},
    charts::{before_after, dashboard, visualizations},
    error::{OpsError, OpsResult},
    export::export_dataset,
    hourly_metrics::aggregate_hourly,
    optimizer::{self, Priority},
    report::fmt2,
    rng::{RngBank, StreamSlot},
    schema_check,
    stage::{Stage, StageContext, StageReport},
    store::AnalysisRow,
    transaction_generator::{generate_transactions, TxnStreams},
    user_generator::generate_users,
};

pub const GENERATE: &str = "generate";
pub const ANALYZE_SQL: &str = "analyze-sql";
pub const VISUALIZE: &str = "visualize";
pub const BOTTLENECKS: &str = "bottlenecks";
pub const OPTIMIZE: &str = "optimize";
pub const BEFORE_AFTER: &str = "before-after";
pub const DASHBOARD: &str = "dashboard";
pub const VERIFY_SCHEMA: &str = "verify-schema";

/// Rows since the analysis start; an empty result means nothing was generated.
fn load_rows(ctx: &StageContext, stage: &str) -> OpsResult<Vec<AnalysisRow>> {
    let rows = ctx.store.analysis_rows(ctx.analyzer.analysis_start)?;
    if rows.is_empty() {
        return Err(OpsError::EmptyDataset(format!(
            "no transactions since {} for '{stage}', run '{GENERATE}' first",
            ctx.analyzer.analysis_start
        )));
    }
    log::info!("{} transactions loaded for '{stage}'", rows.len());
    Ok(rows)
}

// ── 1. Generate ────────────────────────────────────────────────────

pub struct GenerateStage;

impl Stage for GenerateStage {
    fn name(&self) -> &'static str {
        GENERATE
    }

    fn run(&mut self, ctx: &mut StageContext) -> OpsResult<StageReport> {
        let config = &ctx.generator;
        let bank = RngBank::new(ctx.settings.seed);
        let mut users_rng = bank.for_stream(StreamSlot::Users);
        let mut identity_rng = bank.for_stream(StreamSlot::Identity);
        let mut txn_rng = bank.for_stream(StreamSlot::Transactions);
        let mut network_rng = bank.for_stream(StreamSlot::Network);

        let users = generate_users(config, &mut users_rng, &mut identity_rng);
        let txns = generate_transactions(
            &users,
            config,
            TxnStreams {
                main: &mut txn_rng,
                network: &mut network_rng,
                identity: &mut identity_rng,
            },
        )?;
        let metrics = aggregate_hourly(&txns);

        let files = export_dataset(&ctx.settings.data_dir, &users, &txns, &metrics)?;

        ctx.store.reset_dataset()?;
        let loaded_users = ctx.store.insert_users(&users)?;
        let loaded_txns = ctx.store.insert_transactions(&txns)?;
        let loaded_metrics = ctx.store.insert_hourly_metrics(&metrics)?;

        let mut report = StageReport::new(GENERATE);
        report
            .line(format!("seed {}", ctx.settings.seed))
            .line(format!("{loaded_users} users loaded"))
            .line(format!("{loaded_txns} transactions loaded"))
            .line(format!("{loaded_metrics} hourly metric rows loaded"))
            .artifact(files.users)
            .artifact(files.transactions)
            .artifact(files.hourly_metrics);
        Ok(report)
    }
}

// ── 2. SQL reports ─────────────────────────────────────────────────

pub struct AnalyzeSqlStage;

impl Stage for AnalyzeSqlStage {
    fn name(&self) -> &'static str {
        ANALYZE_SQL
    }

    fn run(&mut self, ctx: &mut StageContext) -> OpsResult<StageReport> {
        let reports = sql_reports::run_sql_reports(&ctx.store, &ctx.analyzer)?;
        let written = sql_reports::export_reports(&reports, &ctx.settings.data_dir)?;
        let mut report = StageReport::new(ANALYZE_SQL);
        report.line(format!("{} reports exported", written.len()));
        report.tables = reports;
        report.artifacts = written;
        Ok(report)
    }
}

// ── 3. Charts ──────────────────────────────────────────────────────

pub struct VisualizeStage;

impl Stage for VisualizeStage {
    fn name(&self) -> &'static str {
        VISUALIZE
    }

    fn run(&mut self, ctx: &mut StageContext) -> OpsResult<StageReport> {
        let rows = load_rows(ctx, VISUALIZE)?;
        let written = visualizations::render_all(&rows, &ctx.settings.viz_dir)?;
        let mut report = StageReport::new(VISUALIZE);
        report.line(format!("{} charts written to {}", written.len(), ctx.settings.viz_dir.display()));
        report.artifacts = written;
        Ok(report)
    }
}

// ── 4. Bottlenecks ─────────────────────────────────────────────────

pub struct BottlenecksStage;

impl Stage for BottlenecksStage {
    fn name(&self) -> &'static str {
        BOTTLENECKS
    }

    fn run(&mut self, ctx: &mut StageContext) -> OpsResult<StageReport> {
        let rows = load_rows(ctx, BOTTLENECKS)?;
        let analysis = bottlenecks::analyze_bottlenecks(&rows, &ctx.analyzer);
        let mut report = StageReport::new(BOTTLENECKS);
        for a in &analysis.analyses {
            report.line(format!("[{}]", a.finding.name));
            for h in &a.highlights {
                report.line(format!("  {h}"));
            }
            report.table(a.table.clone());
        }
        report
            .line(format!("total wasted time: {} hours", fmt2(analysis.total_wasted_hours)))
            .table(analysis.summary_table())
            .artifact(analysis.export(&ctx.settings.data_dir)?);
        Ok(report)
    }
}

// ── 5. Optimization simulation ─────────────────────────────────────

pub struct OptimizeStage;

impl Stage for OptimizeStage {
    fn name(&self) -> &'static str {
        OPTIMIZE
    }

    fn run(&mut self, ctx: &mut StageContext) -> OpsResult<StageReport> {
        let result = optimizer::simulate_optimizations(&ctx.store, &ctx.analyzer)?;
        let mut report = StageReport::new(OPTIMIZE);
        report
            .line(format!("{} transactions in the sample", result.sample_size))
            .line(format!("{} flagged for manual validation", result.manual_candidates))
            .line(format!(
                "automation rate {:.1}%, {} s of validation saved",
                result.validator.automation_rate() * 100.0,
                result.validator.seconds_saved
            ));
        match &result.queues {
            Some(q) => {
                report.line(format!(
                    "{} peak-hour transactions: {} {}, {} {}, {} {}, ~{:.1} h to process",
                    result.peak_transactions,
                    q.high,
                    Priority::High.label(),
                    q.normal,
                    Priority::Normal.label(),
                    q.low,
                    Priority::Low.label(),
                    q.estimated_seconds as f64 / 3600.0
                ));
            }
            None => {
                report.line("no peak-hour transactions in the sample");
            }
        }
        report.line(format!("projected saving: {} hours", fmt2(result.saved_hours())));
        report.artifacts = result.export(&ctx.settings.data_dir)?;
        report
            .table(result.validator_table.clone())
            .table(result.comparison.clone())
            .table(result.proposals.clone());
        Ok(report)
    }
}

// ── 6. Before/after chart ──────────────────────────────────────────

pub struct BeforeAfterStage;

impl Stage for BeforeAfterStage {
    fn name(&self) -> &'static str {
        BEFORE_AFTER
    }

    fn run(&mut self, ctx: &mut StageContext) -> OpsResult<StageReport> {
        let rows = load_rows(ctx, BEFORE_AFTER)?;
        let mut rng = RngBank::new(ctx.settings.seed).for_stream(StreamSlot::Sampling);
        let summary = before_after::impact_summary(
            &rows,
            &ctx.analyzer.projection,
            ctx.analyzer.before_after_sample_size,
            &mut rng,
        );
        let mut report = StageReport::new(BEFORE_AFTER);
        report.lines = summary.summary_lines();
        report.artifact(before_after::write_impact_chart(&summary, &ctx.settings.viz_dir)?);
        Ok(report)
    }
}

// ── 7. Executive dashboard ─────────────────────────────────────────

pub struct DashboardStage;

impl Stage for DashboardStage {
    fn name(&self) -> &'static str {
        DASHBOARD
    }

    fn run(&mut self, ctx: &mut StageContext) -> OpsResult<StageReport> {
        let rows = load_rows(ctx, DASHBOARD)?;
        let metrics = ctx.store.hourly_metrics()?;
        log::info!("{} hourly metric rows loaded", metrics.len());
        let output = dashboard::write_dashboard(
            &rows,
            &metrics,
            &ctx.analyzer.projection,
            &ctx.settings.viz_dir,
            chrono::Local::now().naive_local(),
        )?;
        let mut report = StageReport::new(DASHBOARD);
        report
            .line(format!(
                "mean time {:.0} s -> {:.0} s",
                output.before.mean_seconds, output.after.mean_seconds
            ))
            .line(format!(
                "error rate {:.2}% -> {:.2}%",
                output.before.error_rate_pct, output.after.error_rate_pct
            ))
            .line(format!("~{:.0} hours saved", output.saved_hours));
        report.artifacts = output.files;
        Ok(report)
    }
}

// ── 8. Schema verification ─────────────────────────────────────────

pub struct VerifySchemaStage;

impl Stage for VerifySchemaStage {
    fn name(&self) -> &'static str {
        VERIFY_SCHEMA
    }

    fn run(&mut self, ctx: &mut StageContext) -> OpsResult<StageReport> {
        let verification = schema_check::verify_schema(&ctx.store)?;
        let mut report = StageReport::new(VERIFY_SCHEMA);
        report.line(verification.verdict()).table(verification.table());
        Ok(report)
    }
}
