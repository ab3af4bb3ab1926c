//! cryptoops: batch runner for the CryptoOps Analyzer pipeline.
//!
//! Usage:
//!   cryptoops all --seed 42
//!   cryptoops generate --db run.db --data-dir data/processed
//!   cryptoops verify-schema --db run.db

use anyhow::Result;
use clap::{Parser, Subcommand};
use cryptoops_core::{
    analysis::sql_reports::PREVIEW_ROWS,
    config::Settings,
    pipeline::Pipeline,
    stage::{StageContext, StageReport},
    stages,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cryptoops")]
#[command(about = "Crypto exchange operations analyzer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database path
    #[arg(long, global = true)]
    db: Option<String>,

    /// Directory for CSV exports
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for HTML charts
    #[arg(long, global = true)]
    viz_dir: Option<PathBuf>,

    /// Generator config (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Master seed for every random stream
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print every table row instead of a preview
    #[arg(long, global = true)]
    full: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize users, transactions and hourly metrics and load them
    Generate,
    /// Run the SQL reports and export them to CSV
    AnalyzeSql,
    /// Render the operational charts
    Visualize,
    /// Analyze processing bottlenecks
    Bottlenecks,
    /// Simulate automatic validation and peak-hour prioritization
    Optimize,
    /// Render the before/after impact chart
    BeforeAfter,
    /// Build the executive dashboard
    Dashboard,
    /// Verify the database schema
    VerifySchema,
    /// Run every stage in order
    All,
}

impl Commands {
    fn stage_name(&self) -> Option<&'static str> {
        match self {
            Commands::Generate => Some(stages::GENERATE),
            Commands::AnalyzeSql => Some(stages::ANALYZE_SQL),
            Commands::Visualize => Some(stages::VISUALIZE),
            Commands::Bottlenecks => Some(stages::BOTTLENECKS),
            Commands::Optimize => Some(stages::OPTIMIZE),
            Commands::BeforeAfter => Some(stages::BEFORE_AFTER),
            Commands::Dashboard => Some(stages::DASHBOARD),
            Commands::VerifySchema => Some(stages::VERIFY_SCHEMA),
            Commands::All => None,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    if let Some(db) = cli.db.clone() {
        settings.db_path = db;
    }
    if let Some(dir) = cli.data_dir.clone() {
        settings.data_dir = dir;
    }
    if let Some(dir) = cli.viz_dir.clone() {
        settings.viz_dir = dir;
    }
    if let Some(path) = cli.config.clone() {
        settings.generator_config = path;
    }
    if let Some(seed) = cli.seed {
        settings.seed = seed;
    }

    println!("CryptoOps Analyzer");
    println!("  db:        {}", settings.db_path);
    println!("  data_dir:  {}", settings.data_dir.display());
    println!("  viz_dir:   {}", settings.viz_dir.display());
    println!("  seed:      {}", settings.seed);
    println!();

    // Schema verification inspects the database as found; every other
    // command applies the schema first.
    let ctx = match cli.command {
        Commands::VerifySchema => StageContext::open_existing(settings)?,
        _ => StageContext::open(settings)?,
    };
    let mut pipeline = Pipeline::build(ctx);
    let limit = if cli.full { None } else { Some(PREVIEW_ROWS) };

    match cli.command.stage_name() {
        Some(name) => print_report(&pipeline.run_one(name)?, limit),
        None => {
            for report in pipeline.run_all()? {
                print_report(&report, limit);
            }
        }
    }
    Ok(())
}

fn print_report(report: &StageReport, limit: Option<usize>) {
    println!("{}", "=".repeat(80));
    println!("{}", report.stage.to_uppercase());
    println!("{}", "=".repeat(80));
    for line in &report.lines {
        println!("{line}");
    }
    for table in &report.tables {
        println!();
        println!("{} ({} rows)", table.title, table.len());
        if table.is_empty() {
            println!("  (no rows)");
        } else {
            println!("{}", table.render(limit));
        }
    }
    if !report.artifacts.is_empty() {
        println!();
        println!("Files written:");
        for path in &report.artifacts {
            println!("  {}", path.display());
        }
    }
    println!();
}
