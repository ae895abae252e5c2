//! Deterministic section renderer
//!
//! A renderer is an ordered list of named blocks over a section's structured
//! data. A block is emitted only when its backing field is non-empty. Pure
//! function of the data: no clock, no randomness, no locale.

use serde_json::Value;

/// How a table cell or scalar block formats its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    Text,
    Currency,
    Percent,
}

/// One column of a table block
#[derive(Debug, Clone)]
pub struct Column {
    pub key: String,
    pub label: String,
    pub format: CellFormat,
    /// Summable columns get an aggregate row beneath the table
    pub summable: bool,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>, format: CellFormat) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            format,
            summable: false,
        }
    }

    pub fn summable(mut self) -> Self {
        self.summable = true;
        self
    }
}

/// A named display block backed by one data field
#[derive(Debug, Clone)]
pub enum Block {
    /// Free text paragraph
    Text { heading: String, field: String },
    /// Single currency-like number
    Currency { heading: String, field: String },
    /// Single ratio, rendered with a % suffix
    Percent { heading: String, field: String },
    /// Bullet list of entries
    List { heading: String, field: String },
    /// Table of row objects, with a sum row for summable columns
    Table {
        heading: String,
        field: String,
        columns: Vec<Column>,
    },
}

impl Block {
    pub fn text(heading: impl Into<String>, field: impl Into<String>) -> Self {
        Block::Text {
            heading: heading.into(),
            field: field.into(),
        }
    }

    pub fn currency(heading: impl Into<String>, field: impl Into<String>) -> Self {
        Block::Currency {
            heading: heading.into(),
            field: field.into(),
        }
    }

    pub fn percent(heading: impl Into<String>, field: impl Into<String>) -> Self {
        Block::Percent {
            heading: heading.into(),
            field: field.into(),
        }
    }

    pub fn list(heading: impl Into<String>, field: impl Into<String>) -> Self {
        Block::List {
            heading: heading.into(),
            field: field.into(),
        }
    }

    pub fn table(heading: impl Into<String>, field: impl Into<String>, columns: Vec<Column>) -> Self {
        Block::Table {
            heading: heading.into(),
            field: field.into(),
            columns,
        }
    }

    fn field(&self) -> &str {
        match self {
            Block::Text { field, .. }
            | Block::Currency { field, .. }
            | Block::Percent { field, .. }
            | Block::List { field, .. }
            | Block::Table { field, .. } => field,
        }
    }

    fn heading(&self) -> &str {
        match self {
            Block::Text { heading, .. }
            | Block::Currency { heading, .. }
            | Block::Percent { heading, .. }
            | Block::List { heading, .. }
            | Block::Table { heading, .. } => heading,
        }
    }
}

/// Schema-specific renderer for one section
#[derive(Debug, Clone)]
pub struct SectionRenderer {
    blocks: Vec<Block>,
}

impl SectionRenderer {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Render canonical display text from structured data
    pub fn render(&self, data: &Value) -> String {
        let mut parts = Vec::new();

        for block in &self.blocks {
            let Some(value) = data.get(block.field()) else {
                continue;
            };
            if is_empty_value(value) {
                continue;
            }

            let body = match block {
                Block::Text { .. } => format_cell(value, CellFormat::Text),
                Block::Currency { .. } => format_cell(value, CellFormat::Currency),
                Block::Percent { .. } => format_cell(value, CellFormat::Percent),
                Block::List { .. } => render_list(value),
                Block::Table { columns, .. } => render_table(value, columns),
            };

            if !body.is_empty() {
                parts.push(format!("## {}\n\n{}", block.heading(), body));
            }
        }

        parts.join("\n\n")
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64().or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn format_cell(value: &Value, format: CellFormat) -> String {
    match format {
        CellFormat::Text => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        CellFormat::Currency => as_number(value)
            .map(format_currency)
            .unwrap_or_else(|| format_cell(value, CellFormat::Text)),
        CellFormat::Percent => as_number(value)
            .map(format_percent)
            .unwrap_or_else(|| format_cell(value, CellFormat::Text)),
    }
}

/// Fixed-precision, locale-independent: `1234567.5` → `1,234,567.50`
fn format_currency(n: f64) -> String {
    let sign = if n < 0.0 { "-" } else { "" };
    let formatted = format!("{:.2}", n.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{}", sign, grouped, frac_part)
}

/// `12.5` → `12.5%`
fn format_percent(n: f64) -> String {
    format!("{:.1}%", n)
}

fn render_list(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| format!("- {}", format_cell(item, CellFormat::Text)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => format!("- {}", format_cell(other, CellFormat::Text)),
    }
}

fn render_table(value: &Value, columns: &[Column]) -> String {
    let Some(rows) = value.as_array() else {
        return String::new();
    };

    let mut lines = Vec::new();

    let header = columns.iter().map(|c| c.label.as_str()).collect::<Vec<_>>();
    lines.push(format!("| {} |", header.join(" | ")));
    lines.push(format!("|{}|", vec!["---"; columns.len()].join("|")));

    for row in rows {
        let cells = columns
            .iter()
            .map(|col| {
                row.get(&col.key)
                    .filter(|v| !v.is_null())
                    .map(|v| format_cell(v, col.format))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    // Aggregate row beneath the table when any column is summable
    if columns.iter().any(|c| c.summable) {
        let cells = columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                if col.summable {
                    let sum: f64 = rows.iter().filter_map(|row| row.get(&col.key)).filter_map(as_number).sum();
                    format_cell(&serde_json::json!(sum), col.format)
                } else if i == 0 {
                    "Total".to_string()
                } else {
                    String::new()
                }
            })
            .collect::<Vec<_>>();
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vision_renderer() -> SectionRenderer {
        SectionRenderer::new(vec![
            Block::text("Long-Term Vision", "long_term_vision"),
            Block::list("Year One Goals", "year_one_goals"),
        ])
    }

    #[test]
    fn test_render_text_block() {
        let data = json!({"long_term_vision": "simplify bookkeeping for small retailers"});
        let text = vision_renderer().render(&data);
        assert!(text.contains("## Long-Term Vision"));
        assert!(text.contains("simplify bookkeeping for small retailers"));
    }

    #[test]
    fn test_empty_fields_skipped() {
        let data = json!({"long_term_vision": "", "year_one_goals": []});
        assert_eq!(vision_renderer().render(&data), "");
    }

    #[test]
    fn test_missing_fields_skipped() {
        let data = json!({"year_one_goals": ["open a second location"]});
        let text = vision_renderer().render(&data);
        assert!(!text.contains("Long-Term Vision"));
        assert!(text.contains("- open a second location"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let data = json!({
            "long_term_vision": "grow",
            "year_one_goals": ["a", "b", "c"]
        });
        let renderer = vision_renderer();
        let first = renderer.render(&data);
        for _ in 0..10 {
            assert_eq!(renderer.render(&data), first);
        }
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "0.00");
        assert_eq!(format_currency(1234.5), "1,234.50");
        assert_eq!(format_currency(1234567.891), "1,234,567.89");
        assert_eq!(format_currency(-9876.0), "-9,876.00");
        assert_eq!(format_currency(100.0), "100.00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(12.5), "12.5%");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_percent(33.333), "33.3%");
    }

    #[test]
    fn test_render_table_with_sum_row() {
        let renderer = SectionRenderer::new(vec![Block::table(
            "Revenue Projections",
            "revenue_projections",
            vec![
                Column::new("year", "Year", CellFormat::Text),
                Column::new("revenue", "Revenue", CellFormat::Currency).summable(),
                Column::new("growth_pct", "Growth", CellFormat::Percent),
            ],
        )]);

        let data = json!({
            "revenue_projections": [
                {"year": "2026", "revenue": 120000, "growth_pct": 0},
                {"year": "2027", "revenue": 180000, "growth_pct": 50}
            ]
        });

        let text = renderer.render(&data);
        assert!(text.contains("| Year | Revenue | Growth |"));
        assert!(text.contains("| 2026 | 120,000.00 | 0.0% |"));
        assert!(text.contains("| 2027 | 180,000.00 | 50.0% |"));
        assert!(text.contains("| Total | 300,000.00 |  |"));
    }

    #[test]
    fn test_currency_block_parses_string_numbers() {
        let renderer = SectionRenderer::new(vec![Block::currency("Market Size", "market_size_usd")]);
        let text = renderer.render(&json!({"market_size_usd": "2500000"}));
        assert!(text.contains("2,500,000.00"));
    }

    #[test]
    fn test_blocks_render_in_declared_order() {
        let data = json!({
            "long_term_vision": "grow",
            "year_one_goals": ["a"]
        });
        let text = vision_renderer().render(&data);
        let vision_pos = text.find("Long-Term Vision").unwrap();
        let goals_pos = text.find("Year One Goals").unwrap();
        assert!(vision_pos < goals_pos);
    }
}
