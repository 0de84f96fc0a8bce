//! Table output formatting using the `tabled` crate

use super::{truncate, OutputConfig};
use tabled::{
    builder::Builder,
    settings::{object::Columns, style::Style, Alignment, Modify, Width},
};

/// Table output formatter
pub struct TableOutput;

impl TableOutput {
    /// Create a table from rows of strings.
    ///
    /// When truncation is on, the last column is cut so each row fits the
    /// terminal and the whole table is wrapped to its width.
    pub fn from_rows(headers: &[&str], rows: &[Vec<String>], config: &OutputConfig) -> String {
        if rows.is_empty() {
            return "(no results)".to_string();
        }

        let term_width = config.effective_width();
        let mut builder = Builder::default();
        builder.push_record(headers.iter().copied());

        for row in rows {
            if config.should_truncate() {
                let fixed: usize = row
                    .iter()
                    .take(row.len().saturating_sub(1))
                    .map(|cell| cell.chars().count() + 3)
                    .sum();
                let last_width = term_width.saturating_sub(fixed + 8).max(12);
                let cells: Vec<String> = row
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        if i + 1 == row.len() {
                            truncate(cell, last_width)
                        } else {
                            cell.clone()
                        }
                    })
                    .collect();
                builder.push_record(cells);
            } else {
                builder.push_record(row.iter().map(|s| s.as_str()));
            }
        }

        let mut table = builder.build();

        if config.compact {
            table.with(Style::blank());
        } else {
            table.with(Style::rounded());
        }

        table.with(Modify::new(Columns::first()).with(Alignment::right()));

        if config.should_truncate() {
            table.with(Width::wrap(term_width));
        }

        table.to_string()
    }

    /// Format a simple key-value table
    pub fn format_key_value(pairs: &[(&str, String)], config: &OutputConfig) -> String {
        let mut builder = Builder::default();

        for (key, value) in pairs {
            builder.push_record([*key, value.as_str()]);
        }

        let mut table = builder.build();

        if config.compact {
            table.with(Style::blank());
        } else {
            table.with(Style::rounded());
        }

        table.with(Modify::new(Columns::first()).with(Alignment::right()));

        if config.should_truncate() {
            table.with(Width::wrap(config.effective_width()));
        }

        table.to_string()
    }
}
