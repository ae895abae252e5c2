use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use planstore::PlanStore;
use planstore::cli::{Cli, Command};
use planstore::config::Config;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("planstore starting");

    match cli.command {
        Command::New { name } => {
            let store = PlanStore::open(&config.store_path)?;
            let doc = store.create(&name)?;
            println!("{} Created plan: {} ({})", "✓".green(), name.cyan(), doc.id);
        }
        Command::Show { document_id } => {
            let store = PlanStore::open(&config.store_path)?;
            let doc = store.get(&document_id)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Command::List => {
            let store = PlanStore::open(&config.store_path)?;
            let docs = store.list()?;
            if docs.is_empty() {
                println!("No plan documents found");
            } else {
                for doc in docs {
                    println!(
                        "{} {} rev {} (updated {})",
                        doc.id.yellow(),
                        doc.name.cyan(),
                        doc.revision,
                        doc.updated_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
                    );
                }
            }
        }
        Command::Delete { document_id } => {
            let store = PlanStore::open(&config.store_path)?;
            store.delete(&document_id)?;
            println!("{} Deleted plan: {}", "✓".green(), document_id);
        }
    }

    Ok(())
}
