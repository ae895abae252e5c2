//! Builtin business-plan sections
//!
//! Each section is pure configuration: prompt, schema hint, renderer. Adding
//! a section means adding an entry here, not writing new engine code.

use super::SectionSpec;
use crate::document::{Block, CellFormat, Column, SectionRenderer};

const VISION_PROMPT: &str = "You are a business planning coach helping the user articulate \
their company vision. Ask focused questions about where they want the business to be in \
5-10 years and what the first year must accomplish. When the user states a vision or \
goals, restate them crisply and include a fenced JSON block matching the schema.";

const MARKET_PROMPT: &str = "You are a business planning coach helping the user describe \
their target market. Probe for who the customer is, how large the market is in USD, and \
who the main competitors are. When the user supplies details, include a fenced JSON block \
matching the schema.";

const FINANCIALS_PROMPT: &str = "You are a business planning coach helping the user sketch \
financial projections. Ask for yearly revenue expectations and margins. Keep numbers plain \
(no currency symbols) and include a fenced JSON block matching the schema when the user \
provides figures.";

/// The default section set
pub fn builtin_sections() -> Vec<SectionSpec> {
    vec![
        SectionSpec {
            key: "vision".to_string(),
            title: "Vision".to_string(),
            system_prompt: VISION_PROMPT.to_string(),
            schema_hint: r#"{"long_term_vision": "string", "year_one_goals": ["string"]}"#.to_string(),
            structured_followup: true,
            renderer: SectionRenderer::new(vec![
                Block::text("Long-Term Vision", "long_term_vision"),
                Block::list("Year One Goals", "year_one_goals"),
            ]),
        },
        SectionSpec {
            key: "market".to_string(),
            title: "Target Market".to_string(),
            system_prompt: MARKET_PROMPT.to_string(),
            schema_hint: r#"{"target_market": "string", "market_size_usd": 0, "competitors": ["string"]}"#
                .to_string(),
            structured_followup: true,
            renderer: SectionRenderer::new(vec![
                Block::text("Target Market", "target_market"),
                Block::currency("Market Size (USD)", "market_size_usd"),
                Block::list("Competitors", "competitors"),
            ]),
        },
        SectionSpec {
            key: "financial-metrics".to_string(),
            title: "Financial Metrics".to_string(),
            system_prompt: FINANCIALS_PROMPT.to_string(),
            schema_hint: r#"{"revenue_projections": [{"year": "string", "revenue": 0, "growth_pct": 0}], "gross_margin_pct": 0}"#
                .to_string(),
            structured_followup: true,
            renderer: SectionRenderer::new(vec![
                Block::table(
                    "Revenue Projections",
                    "revenue_projections",
                    vec![
                        Column::new("year", "Year", CellFormat::Text),
                        Column::new("revenue", "Revenue", CellFormat::Currency).summable(),
                        Column::new("growth_pct", "Growth", CellFormat::Percent),
                    ],
                ),
                Block::percent("Gross Margin", "gross_margin_pct"),
            ]),
        },
    ]
}
