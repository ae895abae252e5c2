//! Section configuration - registry and builtin section table

mod builtin;
mod registry;

pub use builtin::builtin_sections;
pub use registry::{SectionRegistry, SectionSpec};
