//! Document merger and renderer
//!
//! A plan document's content is a JSON object whose top-level keys are owned
//! by independent sections. Each section subtree holds the conversation
//! handle and the structured data gathered so far:
//!
//! ```text
//! {
//!   "vision":  { "thread": "thread_abc", "data": { ... } },
//!   "market":  { "thread": "thread_def", "data": { ... } }
//! }
//! ```

mod merge;
mod render;

pub use merge::{merge_section, section_data, section_handle, set_section_handle};
pub use render::{Block, CellFormat, Column, SectionRenderer};

/// Section field holding the conversation handle
pub const THREAD_FIELD: &str = "thread";

/// Section field holding the structured data
pub const DATA_FIELD: &str = "data";
