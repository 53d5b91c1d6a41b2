//! Table output for list commands
//!
//! One row type feeds every tabular format so each command only decides
//! which columns to show.

use console::style;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::escape_csv;
use crate::cli::OutputFormat;

/// Column headers plus plain-text rows
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            headers: headers.into_iter().collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: impl IntoIterator<Item = String>) {
        self.rows.push(row.into_iter().collect());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render for a tabular format, newline-terminated; `Auto` renders an aligned text table
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Csv => self.render_separated(",", true),
            OutputFormat::Tsv => self.render_separated("\t", false),
            OutputFormat::Md => format!("{}\n", self.build().build().with(Style::markdown())),
            _ => format!("{}\n", self.build().build().with(Style::blank())),
        }
    }

    fn build(&self) -> Builder {
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().copied());
        for row in &self.rows {
            builder.push_record(row.iter().map(String::as_str));
        }
        builder
    }

    fn render_separated(&self, sep: &str, quote: bool) -> String {
        let cell = |s: &str| {
            if quote {
                escape_csv(s)
            } else {
                s.replace(['\t', '\n'], " ")
            }
        };

        let mut out = self
            .headers
            .iter()
            .map(|h| cell(&h.to_lowercase()))
            .collect::<Vec<_>>()
            .join(sep);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.iter().map(|c| cell(c)).collect::<Vec<_>>().join(sep));
            out.push('\n');
        }
        out
    }
}

/// Trailing "N thing(s) found" line shown under human-readable tables
pub fn print_summary(count: usize, noun: &str, format: OutputFormat) {
    if format == OutputFormat::Auto {
        println!();
        println!(
            "{} {}(s) found. Use {} to reference by short ID.",
            style(count).cyan(),
            noun,
            style("@N").cyan()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(["SHORT", "CODE", "DESCRIPTION"]);
        table.push(["@1".to_string(), "LOTE-000001".to_string(), "Bolts, M8".to_string()]);
        table
    }

    #[test]
    fn test_csv_quotes_cells() {
        let out = sample().render(OutputFormat::Csv);
        assert_eq!(out, "short,code,description\n@1,LOTE-000001,\"Bolts, M8\"\n");
    }

    #[test]
    fn test_tsv_is_tab_separated() {
        let out = sample().render(OutputFormat::Tsv);
        assert!(out.starts_with("short\tcode\tdescription\n"));
        assert!(out.contains("@1\tLOTE-000001\tBolts, M8"));
    }

    #[test]
    fn test_markdown_and_text() {
        let md = sample().render(OutputFormat::Md);
        assert!(md.contains("| SHORT"));
        assert!(md.contains("LOTE-000001"));

        let text = sample().render(OutputFormat::Auto);
        assert!(text.contains("DESCRIPTION"));
        assert!(!text.contains('|'));
    }
}
