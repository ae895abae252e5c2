//! PlanEngine - Conversational section engine for plan documents
//!
//! PlanEngine turns free-form conversations with an assistant service into a
//! structured plan document. Each document section owns its own conversation;
//! replies that carry a JSON payload are merged additively into that
//! section's data and rendered into canonical display text.
//!
//! # Core Concepts
//!
//! - **One Conversation Per Section**: Each section keeps its own thread,
//!   created lazily and persisted in the document before first use
//! - **Extraction Never Fails**: A reply without a parseable payload is a
//!   normal conversational turn, not an error
//! - **Additive Merge**: An incomplete answer can never erase data gathered
//!   in an earlier turn
//! - **Paced Upstream Calls**: A process-wide rate limiter spaces every
//!   assistant service request
//!
//! # Modules
//!
//! - [`assistant`] - Assistant service client trait and OpenAI implementation
//! - [`engine`] - Rate limiter, thread registry, run executor and the
//!   section message pipeline
//! - [`extract`] - Payload extraction and response cleaning
//! - [`document`] - Section merge and rendering
//! - [`sections`] - Declarative per-section configuration
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod assistant;
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod extract;
pub mod sections;

pub use engine::{SectionReply, SectionService, SectionView};
pub use error::EngineError;
