//! The batch pipeline.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. generate
//!   2. analyze-sql
//!   3. visualize
//!   4. bottlenecks
//!   5. optimize
//!   6. before-after
//!   7. dashboard
//!   8. verify-schema
//!
//! RULES:
//!   - `run_all` stops at the first failing stage.
//!   - Every start, finish and failure is persisted to `system_logs`.
//!     A database opened as-is may lack that table; the write failure is
//!     then only logged, never allowed to fail the stage.

use crate::{
    error::{OpsError, OpsResult},
    stage::{Stage, StageContext, StageReport},
    stages::{
        AnalyzeSqlStage, BeforeAfterStage, BottlenecksStage, DashboardStage, GenerateStage,
        OptimizeStage, VerifySchemaStage, VisualizeStage,
    },
};

const LOG_COMPONENT_PREFIX: &str = "pipeline";

pub struct Pipeline {
    ctx: StageContext,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(ctx: StageContext) -> Self {
        Self {
            ctx,
            stages: Vec::new(),
        }
    }

    /// Build a pipeline with every stage registered in execution order.
    pub fn build(ctx: StageContext) -> Self {
        let mut pipeline = Pipeline::new(ctx);
        pipeline.register(Box::new(GenerateStage));
        pipeline.register(Box::new(AnalyzeSqlStage));
        pipeline.register(Box::new(VisualizeStage));
        pipeline.register(Box::new(BottlenecksStage));
        pipeline.register(Box::new(OptimizeStage));
        pipeline.register(Box::new(BeforeAfterStage));
        pipeline.register(Box::new(DashboardStage));
        pipeline.register(Box::new(VerifySchemaStage));
        pipeline
    }

    /// Register a stage. Call in execution order.
    pub fn register(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn context(&self) -> &StageContext {
        &self.ctx
    }

    /// Run a single stage by name.
    pub fn run_one(&mut self, name: &str) -> OpsResult<StageReport> {
        let index = self
            .stages
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| OpsError::StageNotFound { name: name.to_string() })?;
        self.run_index(index)
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn run_all(&mut self) -> OpsResult<Vec<StageReport>> {
        let mut reports = Vec::with_capacity(self.stages.len());
        for index in 0..self.stages.len() {
            reports.push(self.run_index(index)?);
        }
        Ok(reports)
    }

    fn run_index(&mut self, index: usize) -> OpsResult<StageReport> {
        let stage = &mut self.stages[index];
        let name = stage.name();
        let component = format!("{LOG_COMPONENT_PREFIX}/{name}");

        log::info!("stage '{name}' started");
        record(&self.ctx, "INFO", &component, "stage started");

        match stage.run(&mut self.ctx) {
            Ok(report) => {
                let message = format!(
                    "stage finished: {} tables, {} artifacts",
                    report.tables.len(),
                    report.artifacts.len()
                );
                log::info!("stage '{name}' finished");
                record(&self.ctx, "INFO", &component, &message);
                Ok(report)
            }
            Err(e) => {
                log::error!("stage '{name}' failed: {e}");
                record(&self.ctx, "ERROR", &component, &e.to_string());
                Err(e)
            }
        }
    }
}

fn record(ctx: &StageContext, level: &str, component: &str, message: &str) {
    if let Err(e) = ctx.store.append_log(level, component, message) {
        log::warn!("could not write {level} log row for {component}: {e}");
    }
}
