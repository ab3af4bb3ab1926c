//! Stage trait and the context shared by every stage.
//!
//! RULE: Stages communicate only through the store and the files they write.
//! No stage calls another stage; the pipeline runs them in a fixed order.

use crate::{
    config::{AnalyzerConfig, GeneratorConfig, Settings},
    error::OpsResult,
    report::ReportTable,
    store::OpsStore,
};
use std::path::PathBuf;

/// Everything a stage may read or write.
pub struct StageContext {
    pub store: OpsStore,
    pub settings: Settings,
    pub generator: GeneratorConfig,
    pub analyzer: AnalyzerConfig,
}

impl StageContext {
    /// Open the database named by `settings`, apply the schema and load the
    /// generator config (built-in defaults when the file is absent).
    pub fn open(settings: Settings) -> OpsResult<Self> {
        let store = OpsStore::open(&settings.db_path)?;
        store.migrate()?;
        let generator = GeneratorConfig::load_or_default(&settings.generator_config)?;
        Ok(Self {
            store,
            settings,
            generator,
            analyzer: AnalyzerConfig::default(),
        })
    }

    /// Open the database named by `settings` as it is: no file is created
    /// and no schema is applied. Schema verification runs on this.
    pub fn open_existing(settings: Settings) -> OpsResult<Self> {
        let store = OpsStore::open_existing(&settings.db_path)?;
        let generator = GeneratorConfig::load_or_default(&settings.generator_config)?;
        Ok(Self {
            store,
            settings,
            generator,
            analyzer: AnalyzerConfig::default(),
        })
    }

    /// Migrated in-memory database with the given generator config.
    pub fn in_memory(settings: Settings, generator: GeneratorConfig) -> OpsResult<Self> {
        generator.validate()?;
        let store = OpsStore::in_memory()?;
        store.migrate()?;
        Ok(Self {
            store,
            settings,
            generator,
            analyzer: AnalyzerConfig::default(),
        })
    }
}

/// What a stage produced: console lines, tables and files on disk.
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    pub stage: &'static str,
    pub lines: Vec<String>,
    pub tables: Vec<ReportTable>,
    pub artifacts: Vec<PathBuf>,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            ..Self::default()
        }
    }

    pub fn line(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines.push(text.into());
        self
    }

    pub fn table(&mut self, table: ReportTable) -> &mut Self {
        self.tables.push(table);
        self
    }

    pub fn artifact(&mut self, path: PathBuf) -> &mut Self {
        self.artifacts.push(path);
        self
    }
}

/// The contract every pipeline stage fulfils.
pub trait Stage {
    /// Stable name, also used as the CLI subcommand.
    fn name(&self) -> &'static str;

    fn run(&mut self, ctx: &mut StageContext) -> OpsResult<StageReport>;
}
