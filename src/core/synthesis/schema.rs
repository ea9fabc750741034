//! Column Whitelist
//!
//! The fixed set of catalog columns a generated predicate may reference.
//! Anything not listed here is unknown to the validator and rejects.

use serde::Serialize;

/// How a column's values are typed, which decides where literal correction
/// applies and which functions may wrap the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Date,
    Enum,
}

/// An entry in the compile-time column whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllowedColumn {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// Columns of the `books` table that generated predicates may touch.
pub const ALLOWED_COLUMNS: &[AllowedColumn] = &[
    AllowedColumn { name: "title", kind: ColumnKind::Text },
    AllowedColumn { name: "author", kind: ColumnKind::Text },
    AllowedColumn { name: "genre", kind: ColumnKind::Enum },
    AllowedColumn { name: "description", kind: ColumnKind::Text },
    AllowedColumn { name: "published_date", kind: ColumnKind::Date },
    AllowedColumn { name: "isbn", kind: ColumnKind::Text },
];

/// Look up a column by name, case-insensitively.
pub fn allowed_column(name: &str) -> Option<&'static AllowedColumn> {
    ALLOWED_COLUMNS
        .iter()
        .find(|column| column.name.eq_ignore_ascii_case(name))
}

/// One-line-per-column schema summary handed to the generator.
pub fn schema_description() -> String {
    let mut out = String::from("Table: books\nColumns:\n");
    for column in ALLOWED_COLUMNS {
        let kind = match column.kind {
            ColumnKind::Text => "text",
            ColumnKind::Date => "date (use EXTRACT(YEAR FROM ...) or EXTRACT(MONTH FROM ...))",
            ColumnKind::Enum => "text, one of the catalog genres",
        };
        out.push_str(&format!("- {}: {}\n", column.name, kind));
    }
    out
}
