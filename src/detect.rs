use crate::error::AnalysisError;
use crate::table::{Cell, Column, ColumnKind, Table};
use log::{info, warn};
use std::collections::BTreeMap;

/// Column-name fragments identifying sample identifiers. Identifier columns
/// are never eligible as class columns and are excluded from the data matrix
/// when a class column is found.
pub const ID_KEYWORDS: [&str; 5] = ["id", "sample", "patient", "subject", "name"];

/// Column-name fragments identifying an explicit group factor.
pub const CLASS_KEYWORDS: [&str; 7] = [
    "group",
    "class",
    "treatment",
    "label",
    "category",
    "type",
    "condition",
];

/// Outcome of class-column detection. The synthetic all-ones fallback is an
/// explicit variant so callers can tell "no grouping found" apart from a
/// genuine single-group design.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Detected { column: usize, labels: Vec<i32> },
    NotDetected { labels: Vec<i32> },
}

impl Detection {
    pub fn labels(&self) -> &[i32] {
        match self {
            Detection::Detected { labels, .. } => labels,
            Detection::NotDetected { labels } => labels,
        }
    }

    pub fn column(&self) -> Option<usize> {
        match self {
            Detection::Detected { column, .. } => Some(*column),
            Detection::NotDetected { .. } => None,
        }
    }
}

pub fn is_id_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    ID_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn is_class_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    CLASS_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// A column is class-like when it has no missing values and its distinct
/// count u satisfies 2 <= u <= 10 and u < 0.5 * nrows. The row-count bound
/// rules out identifier-like and continuous columns.
pub fn is_class_column(column: &Column, nrows: usize) -> bool {
    if column.has_missing() {
        return false;
    }
    let u = column.distinct_count();
    2 <= u && u <= 10 && (u as f64) < 0.5 * nrows as f64
}

/// Scan columns for the group factor. First pass: columns whose name matches
/// a class keyword (identifier columns skipped, not eliminated). Second
/// pass: first class-like column regardless of name.
pub fn find_class_column(table: &Table) -> Option<usize> {
    for (idx, column) in table.columns.iter().enumerate() {
        if is_id_column(&column.name) {
            continue;
        }
        if is_class_name(&column.name) && is_class_column(column, table.nrows) {
            return Some(idx);
        }
    }

    for (idx, column) in table.columns.iter().enumerate() {
        if is_id_column(&column.name) {
            continue;
        }
        if is_class_column(column, table.nrows) {
            return Some(idx);
        }
    }

    None
}

/// Convert a chosen class column to integer labels.
///
/// Integer columns are used directly and float columns (numeric-looking
/// strings normalize to floats at ingestion) are truncated. Text columns are
/// mapped through their sorted distinct values to 1..n, so group numbering
/// is deterministic for a given table.
pub fn convert_labels(column: &Column) -> Result<Vec<i32>, AnalysisError> {
    let missing: Vec<usize> = column
        .cells
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_missing())
        .map(|(i, _)| i)
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::LabelConversion(format!(
            "column '{}' has missing values at rows {:?}",
            column.name, missing
        )));
    }

    match column.kind() {
        ColumnKind::Integer | ColumnKind::Float => Ok(column
            .cells
            .iter()
            .map(|cell| match cell {
                Cell::Int(v) => *v as i32,
                Cell::Float(v) => *v as i32,
                _ => unreachable!("numeric column holds only numeric cells"),
            })
            .collect()),
        ColumnKind::Text => {
            let mut mapping: BTreeMap<String, i32> = BTreeMap::new();
            for cell in &column.cells {
                mapping.entry(cell.token()).or_insert(0);
            }
            for (rank, (_, v)) in mapping.iter_mut().enumerate() {
                *v = rank as i32 + 1;
            }
            info!("Converting class labels: {:?}", mapping);
            Ok(column.cells.iter().map(|cell| mapping[&cell.token()]).collect())
        }
    }
}

/// Detect the class column of a table, or synthesize a single implicit group.
pub fn detect(table: &Table) -> Result<Detection, AnalysisError> {
    match find_class_column(table) {
        Some(idx) => {
            let labels = convert_labels(&table.columns[idx])?;
            info!("Using '{}' as class column", table.columns[idx].name);
            Ok(Detection::Detected {
                column: idx,
                labels,
            })
        }
        None => {
            warn!("No class column detected, using default class=1 for all samples");
            Ok(Detection::NotDetected {
                labels: vec![1; table.nrows],
            })
        }
    }
}
