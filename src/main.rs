use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use inbox_agent::config::AppConfig;
use inbox_agent::emails::{clear_emails, ingest_mock_inbox};
use inbox_agent::prompts::seed_default_prompts;
use inbox_agent::server::{self, AppState};
use inbox_agent::store::{Database, LibSqlBackend};

#[derive(Parser)]
#[command(
    name = "inbox-agent",
    version,
    about = "Email enrichment pipeline with an HTTP management API"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Enrich every unprocessed email once and exit")]
    Process,

    #[command(about = "Load the mock inbox, then process pending emails")]
    Ingest {
        /// Override INBOX_AGENT_MOCK_INBOX.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    #[command(about = "Insert the default prompt templates that are missing")]
    SeedPrompts,

    #[command(about = "Delete every stored email")]
    ClearEmails,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            eprintln!("📬 Inbox Agent v{}", env!("CARGO_PKG_VERSION"));
            eprintln!("   API: http://0.0.0.0:{}/api/emails", config.port);
            eprintln!("   Database: {}", config.db_path.display());
            server::serve(config).await?;
        }
        Commands::Process => {
            let state = AppState::from_config(&config).await?;
            let report = state.pipeline.run_pending().await?;
            println!(
                "Processed {} emails ({} committed, {} skipped)",
                report.attempted, report.committed, report.skipped
            );
        }
        Commands::Ingest { file } => {
            let state = AppState::from_config(&config).await?;
            let path = file.unwrap_or_else(|| config.mock_inbox_path.clone());
            let report = ingest_mock_inbox(state.db.as_ref(), &state.pipeline, &path)
                .await
                .with_context(|| format!("Failed to ingest {}", path.display()))?;
            println!("{}", report.message());
        }
        Commands::SeedPrompts => {
            let db = open_db(&config).await?;
            let inserted = seed_default_prompts(db.as_ref()).await?;
            println!("Seeded {inserted} prompts");
        }
        Commands::ClearEmails => {
            let db = open_db(&config).await?;
            let removed = clear_emails(db.as_ref()).await?;
            println!("Removed {removed} emails");
        }
    }

    Ok(())
}

async fn open_db(config: &AppConfig) -> anyhow::Result<Arc<dyn Database>> {
    let db = LibSqlBackend::new_local(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;
    Ok(Arc::new(db))
}
