use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use chrono::Duration;
use std::sync::Arc;

mod providers;

use odds_oracle_core::{authorize_admin, AppConfig, ConfigLoader};
use odds_oracle_data::{DatabaseClient, JobQueueRepository, PredictionRepository};
use odds_oracle_synthesizer::Synthesizer;
use odds_oracle_worker::{AnalysisWorker, ResultsReconciler, SignalFetcher};

use providers::FixtureProviders;

#[derive(Parser)]
#[command(name = "odds-oracle")]
#[command(about = "Match analysis pipeline: job queue, predictions, reconciliation", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create database tables and indexes (idempotent)
    InitDb,
    /// Enqueue an analysis job for a match
    Enqueue {
        /// Requesting user id
        #[arg(long)]
        user: i64,
        /// Upstream match id
        #[arg(long)]
        match_id: String,
    },
    /// Run one analysis worker pass
    Worker {
        /// JSON fixture bundle backing the upstream providers
        #[arg(long)]
        fixtures: String,
    },
    /// Run one results reconciler pass
    Reconcile {
        /// JSON fixture bundle backing the upstream providers
        #[arg(long)]
        fixtures: String,
    },
    /// Show a user's recent jobs and prediction accuracy
    Status {
        /// User id to report on
        #[arg(long)]
        user: i64,
        /// Number of recent rows to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
    /// Sweep stale processing jobs immediately (admin only)
    Sweep {
        /// Requesting user id
        #[arg(long)]
        requester: i64,
        /// Admin shared secret
        #[arg(long)]
        secret: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ConfigLoader::load_from(&cli.config)?;

    match cli.command {
        Commands::InitDb => run_init_db(&config).await?,
        Commands::Enqueue { user, match_id } => run_enqueue(&config, user, &match_id).await?,
        Commands::Worker { fixtures } => run_worker(&config, &fixtures).await?,
        Commands::Reconcile { fixtures } => run_reconcile(&config, &fixtures).await?,
        Commands::Status { user, limit } => run_status(&config, user, limit).await?,
        Commands::Sweep { requester, secret } => run_sweep(&config, requester, &secret).await?,
    }

    Ok(())
}

async fn run_init_db(config: &AppConfig) -> Result<()> {
    let db = DatabaseClient::connect(&config.database).await?;
    db.ensure_schema().await?;
    println!("Schema is up to date");
    Ok(())
}

async fn run_enqueue(config: &AppConfig, user: i64, match_id: &str) -> Result<()> {
    let db = DatabaseClient::connect(&config.database).await?;
    let queue = JobQueueRepository::new(db.pool());
    let job_id = queue.enqueue(user, match_id).await?;
    println!("Enqueued job {job_id} for match {match_id}");
    Ok(())
}

async fn run_worker(config: &AppConfig, fixtures: &str) -> Result<()> {
    let db = DatabaseClient::connect(&config.database).await?;
    let providers = FixtureProviders::from_file(fixtures)?;

    let signals = SignalFetcher::new(
        Arc::clone(&providers) as _,
        Arc::clone(&providers) as _,
        Arc::clone(&providers) as _,
        config.cache.clone(),
    );
    let synthesizer = Synthesizer::new(config.synthesizer.clone())?;
    let worker = AnalysisWorker::new(
        JobQueueRepository::new(db.pool()),
        PredictionRepository::new(db.pool()),
        signals,
        synthesizer,
        config.worker.clone(),
    );

    let summary = worker.run_pass().await?;
    println!(
        "Pass done: {} completed, {} failed, {} deferred ({} requeued, {} abandoned by sweep)",
        summary.completed,
        summary.failed,
        summary.deferred,
        summary.sweep.requeued,
        summary.sweep.abandoned
    );
    Ok(())
}

async fn run_reconcile(config: &AppConfig, fixtures: &str) -> Result<()> {
    let db = DatabaseClient::connect(&config.database).await?;
    let providers = FixtureProviders::from_file(fixtures)?;

    let reconciler = ResultsReconciler::new(
        PredictionRepository::new(db.pool()),
        providers,
        config.reconciler.clone(),
    );

    let summary = reconciler.run_pass().await?;
    println!(
        "Reconciled {} due: {} correct, {} incorrect, {} awaiting results, {} fetch errors",
        summary.due,
        summary.resolved_correct,
        summary.resolved_incorrect,
        summary.awaiting_result,
        summary.fetch_errors
    );
    Ok(())
}

async fn run_status(config: &AppConfig, user: i64, limit: i64) -> Result<()> {
    let db = DatabaseClient::connect(&config.database).await?;
    let queue = JobQueueRepository::new(db.pool());
    let predictions = PredictionRepository::new(db.pool());

    println!("Recent jobs:");
    for job in queue.recent_for_user(user, limit).await? {
        let error = job.error_message.as_deref().unwrap_or("-");
        println!(
            "  #{} match={} status={} attempts={} error={}",
            job.id, job.match_id, job.status, job.attempts, error
        );
    }

    println!("Recent predictions:");
    for p in predictions.recent_for_user(user, limit).await? {
        println!(
            "  #{} {} vs {} pick={} confidence={:.3} risk={} status={}",
            p.id, p.home_team, p.away_team, p.predicted_winner, p.confidence_score, p.risk_level,
            p.status
        );
    }

    let stats = predictions.accuracy_for_user(user).await?;
    println!(
        "Accuracy: {}/{} resolved correct ({:.1}%), {} pending",
        stats.correct,
        stats.resolved,
        stats.accuracy() * 100.0,
        stats.pending
    );
    Ok(())
}

async fn run_sweep(config: &AppConfig, requester: i64, secret: &str) -> Result<()> {
    if !authorize_admin(requester, secret, &config.admin).is_allowed() {
        bail!("user {requester} is not authorized for admin operations");
    }

    let db = DatabaseClient::connect(&config.database).await?;
    let queue = JobQueueRepository::new(db.pool());
    let summary = queue
        .sweep_stale(
            Duration::seconds(config.worker.stale_timeout_secs.min(i64::MAX as u64) as i64),
            config.worker.max_attempts,
        )
        .await?;
    println!(
        "Swept stale jobs: {} requeued, {} abandoned",
        summary.requeued, summary.abandoned
    );
    Ok(())
}
