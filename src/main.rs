use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cluster;
mod comparative;
mod config;
mod db;
mod error;
mod ingest;
mod models;
mod ranking;
mod recommendation;
mod report;
mod stats;
mod traits;

use config::QueryConfig;
use models::SessionBatch;
use ranking::ComparisonMetric;

#[derive(Parser)]
#[command(name = "session-analytics")]
#[command(about = "Comparative analytics for psychometric assessment sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Args)]
struct ReportOptions {
    /// JSON file with a base query configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    metric: Option<ComparisonMetric>,
    /// Number of participants listed as top performers
    #[arg(long)]
    top: Option<usize>,
    /// Include the performance cluster section
    #[arg(long)]
    clusters: bool,
    #[arg(long)]
    no_rankings: bool,
    #[arg(long)]
    no_distribution: bool,
    #[arg(long)]
    language: Option<String>,
}

impl ReportOptions {
    fn query_config(&self) -> anyhow::Result<QueryConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid query config in {}", path.display()))?
            }
            None => QueryConfig::default(),
        };

        if let Some(metric) = self.metric {
            config.comparison_metric = metric;
        }
        if let Some(top) = self.top {
            config.top_performers_count = top;
        }
        if self.clusters {
            config.include_cluster_analysis = true;
        }
        if self.no_rankings {
            config.include_rankings = false;
        }
        if self.no_distribution {
            config.include_distribution_analysis = false;
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a realistic demo session
    Seed,
    /// Import attempt results from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank a session's participants by a comparison metric
    Rank {
        #[arg(long)]
        session: String,
        #[arg(long, value_enum, default_value_t = ComparisonMetric::ScaledScore)]
        metric: ComparisonMetric,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a comparative report for a session
    #[command(group(
        ArgGroup::new("source")
            .args(["session", "input"])
            .required(true)
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        session: Option<String>,
        /// Read the session batch from a JSON file instead of the database
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        options: ReportOptions,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn read_batch(path: &Path) -> anyhow::Result<SessionBatch> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid session batch in {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&connect().await?).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&connect().await?, &csv).await?;
            println!("Inserted {inserted} attempts from {}.", csv.display());
        }
        Commands::Rank {
            session,
            metric,
            limit,
        } => {
            let batch = db::fetch_session_batch(&connect().await?, &session).await?;
            let participants = comparative::qualifying_participants(&batch.participants);
            if participants.is_empty() {
                println!("No completed attempts found for this session.");
                return Ok(());
            }

            println!("Participants by {}:", metric.label());
            for ranked in ranking::rank_participants(&participants, metric)
                .iter()
                .take(limit)
            {
                println!(
                    "{}. {} ({}) {:.2} across {}/{} attempts",
                    ranked.rank,
                    ranked.participant.name,
                    ranked.participant.email,
                    ranked.metric_value,
                    ranked.participant.completed_attempts,
                    ranked.participant.total_attempts
                );
            }
        }
        Commands::Report {
            session,
            input,
            options,
            format,
            out,
        } => {
            let config = options.query_config()?;
            let batch = match (session, input) {
                (_, Some(path)) => read_batch(&path)?,
                (Some(code), None) => db::fetch_session_batch(&connect().await?, &code).await?,
                (None, None) => anyhow::bail!("either --session or --input is required"),
            };

            let data = comparative::build_comparative_report(&batch, &config)
                .with_context(|| format!("cannot build report for session {}", batch.session.code))?;
            let rendered = match format {
                OutputFormat::Markdown => report::render_markdown(&data),
                OutputFormat::Json => serde_json::to_string_pretty(&data)?,
            };
            std::fs::write(&out, rendered)?;
            info!(path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
