//! Delimited-text drug catalogue import.
//!
//! The first non-empty line is a header naming the columns. `name` is
//! required; `id`, `type` and `strength` are optional. Values are trimmed and
//! surrounding double quotes are stripped.

use medibridge_core::DrugRecord;
use tracing::{debug, info};

use crate::errors::ImportError;

/// Parsed catalogue plus row accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Records in file order
    pub drugs: Vec<DrugRecord>,
    /// Data rows skipped because they had no name
    pub skipped_rows: usize,
}

#[derive(Debug, Default)]
struct ColumnLayout {
    name: usize,
    id: Option<usize>,
    category: Option<usize>,
    strength: Option<usize>,
}

impl ColumnLayout {
    fn from_header(header: &str) -> Result<Self, ImportError> {
        let mut name = None;
        let mut layout = ColumnLayout::default();

        for (index, column) in split_row(header).enumerate() {
            match column.to_lowercase().as_str() {
                "name" => name = Some(index),
                "id" => layout.id = Some(index),
                "type" => layout.category = Some(index),
                "strength" => layout.strength = Some(index),
                _ => {}
            }
        }

        layout.name = name.ok_or_else(|| ImportError::MissingNameColumn {
            header: header.trim().to_string(),
        })?;
        Ok(layout)
    }
}

/// Parses a delimited drug list.
///
/// Rows without a name are skipped. A row without an id gets `drug-<n>`,
/// where `n` is its 1-based data row position. Rows without a type get
/// `default_category`.
///
/// # Errors
///
/// - `ImportError::Empty` - If the text has no header line
/// - `ImportError::MissingNameColumn` - If the header has no `name` column
pub fn parse_drug_csv(text: &str, default_category: &str) -> Result<ImportReport, ImportError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or(ImportError::Empty)?;
    let layout = ColumnLayout::from_header(header)?;

    let mut drugs = Vec::new();
    let mut skipped_rows = 0;

    for (position, line) in lines.enumerate() {
        let row: Vec<String> = split_row(line).collect();
        let field = |index: Option<usize>| {
            index
                .and_then(|i| row.get(i))
                .filter(|value| !value.is_empty())
                .cloned()
        };

        let Some(name) = field(Some(layout.name)) else {
            debug!("Skipping import row {}: no name", position + 1);
            skipped_rows += 1;
            continue;
        };

        let id = field(layout.id).unwrap_or_else(|| format!("drug-{}", position + 1));
        let category = field(layout.category).unwrap_or_else(|| default_category.to_string());

        drugs.push(DrugRecord::new(
            id,
            name,
            Some(category),
            field(layout.strength),
        ));
    }

    info!(
        "Parsed {} drugs from import ({} rows skipped)",
        drugs.len(),
        skipped_rows
    );

    Ok(ImportReport {
        drugs,
        skipped_rows,
    })
}

fn split_row(line: &str) -> impl Iterator<Item = String> + '_ {
    line.split(',').map(|value| {
        let value = value.trim();
        let value = value.strip_prefix('"').unwrap_or(value);
        let value = value.strip_suffix('"').unwrap_or(value);
        value.trim().to_string()
    })
}
