//! Section registry - declarative per-section configuration
//!
//! One engine, many sections: each section is a table entry carrying its
//! prompt, schema hint and renderer. No per-section subclassing.

use std::collections::HashMap;

use crate::document::SectionRenderer;

/// Configuration for one document section
#[derive(Debug, Clone)]
pub struct SectionSpec {
    /// Stable key, used as the section's subtree name in the document
    pub key: String,
    /// Human-readable title
    pub title: String,
    /// Run instructions framing the conversation for this section
    pub system_prompt: String,
    /// JSON shape the assistant is asked to emit
    pub schema_hint: String,
    /// Whether to send an auxiliary "summarize as JSON" turn when the
    /// conversational reply carried no payload
    pub structured_followup: bool,
    /// Renderer producing canonical display text from the section's data
    pub renderer: SectionRenderer,
}

/// Lookup table of section specs
#[derive(Debug, Clone, Default)]
pub struct SectionRegistry {
    sections: HashMap<String, SectionSpec>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the builtin business-plan sections
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for spec in super::builtin::builtin_sections() {
            registry.register(spec);
        }
        registry
    }

    /// Register a section spec, replacing any existing entry for its key
    pub fn register(&mut self, spec: SectionSpec) {
        self.sections.insert(spec.key.clone(), spec);
    }

    pub fn get(&self, key: &str) -> Option<&SectionSpec> {
        self.sections.get(key)
    }

    /// Section keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.sections.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
