//! CLI argument parsing for planstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ps")]
#[command(author, version = env!("GIT_DESCRIBE"), about = "Plan document store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new empty plan document
    New {
        /// Human-readable plan name
        #[arg(required = true)]
        name: String,
    },

    /// Print a document as JSON
    Show {
        /// Document ID
        #[arg(required = true)]
        document_id: String,
    },

    /// List all documents
    List,

    /// Delete a document
    Delete {
        /// Document ID to delete
        #[arg(required = true)]
        document_id: String,
    },
}
