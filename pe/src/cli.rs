//! CLI argument parsing for planengine

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pe")]
#[command(author, version = env!("GIT_DESCRIBE"), about = "Conversational plan section engine", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new plan document
    New {
        /// Human-readable plan name
        #[arg(required = true)]
        name: String,
    },

    /// Send a message to a document section
    Send {
        /// Document ID
        #[arg(required = true)]
        document_id: String,

        /// Section key (see `pe sections`)
        #[arg(required = true)]
        section: String,

        /// The message text
        #[arg(required = true)]
        message: String,
    },

    /// Show a section's data and rendered text
    Show {
        /// Document ID
        #[arg(required = true)]
        document_id: String,

        /// Section key
        #[arg(required = true)]
        section: String,
    },

    /// List the available section keys
    Sections,
}
