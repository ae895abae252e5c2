//! PlanEngine - Conversational plan section engine
//!
//! CLI entry point for chatting sections of a plan document into shape.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use planengine::assistant::OpenAiAssistantClient;
use planengine::cli::{Cli, Command};
use planengine::config::Config;
use planengine::engine::{RateLimiter, RunExecutor, SectionService, ThreadRegistry};
use planengine::sections::SectionRegistry;
use planstore::PlanStore;

fn setup_logging(verbose: bool) -> Result<()> {
    // Log to file, not stdout: the terminal belongs to the conversation
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plansmith")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("planengine.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

fn build_service(config: &Config) -> Result<SectionService> {
    let store = Arc::new(PlanStore::open(&config.storage.plans_dir)?);
    let client = Arc::new(OpenAiAssistantClient::from_config(&config.assistant)?);
    let limiter = Arc::new(RateLimiter::new(std::time::Duration::from_millis(
        config.engine.min_gap_ms,
    )));

    let threads = ThreadRegistry::new(
        Arc::clone(&store),
        Arc::clone(&client) as Arc<dyn planengine::assistant::AssistantClient>,
        Arc::clone(&limiter),
    );
    let executor = RunExecutor::new(client, limiter, &config.engine);

    Ok(SectionService::new(
        store,
        SectionRegistry::with_defaults(),
        threads,
        executor,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::New { name } => {
            let store = PlanStore::open(&config.storage.plans_dir)?;
            let doc = store.create(&name)?;
            println!("{} Created plan: {} ({})", "✓".green(), name.cyan(), doc.id);
        }
        Command::Send {
            document_id,
            section,
            message,
        } => {
            config.validate()?;
            let service = build_service(&config)?;

            let reply = service.send_message(&document_id, &section, &message).await?;

            println!("{}", reply.assistant_text);
            if !reply.rendered_text.is_empty() {
                println!();
                println!("{}", "--- Section ---".dimmed());
                println!("{}", reply.rendered_text);
            }
        }
        Command::Show { document_id, section } => {
            let store = Arc::new(PlanStore::open(&config.storage.plans_dir)?);
            let doc = store.get(&document_id)?;
            let data = planengine::document::section_data(&doc.content, &section);

            let registry = SectionRegistry::with_defaults();
            let spec = registry
                .get(&section)
                .ok_or_else(|| eyre::eyre!("Unknown section: {}", section))?;

            println!("{}", spec.title.cyan().bold());
            println!();
            let rendered = spec.renderer.render(&data);
            if rendered.is_empty() {
                println!("{}", "(no data yet)".dimmed());
            } else {
                println!("{}", rendered);
            }
        }
        Command::Sections => {
            let registry = SectionRegistry::with_defaults();
            for key in registry.keys() {
                if let Some(spec) = registry.get(key) {
                    println!("{} {}", key.yellow(), spec.title.dimmed());
                }
            }
        }
    }

    Ok(())
}
