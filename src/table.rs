use csv::ReaderBuilder;
use log::info;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A single normalized cell value. Raw text is classified once at ingestion
/// so that downstream heuristics never re-inspect strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Numeric view of the cell, NaN when the cell carries no usable number.
    pub fn as_f64(&self) -> f64 {
        match self {
            Cell::Int(v) => *v as f64,
            Cell::Float(v) => *v,
            Cell::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
            Cell::Missing => f64::NAN,
        }
    }

    /// Canonical token used for distinct-value counting and sorted label
    /// mapping. Deterministic for a given cell.
    pub fn token(&self) -> String {
        match self {
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => format!("{:?}", v),
            Cell::Text(s) => s.clone(),
            Cell::Missing => String::new(),
        }
    }
}

/// Column value kinds, decided over all non-missing cells of the column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn has_missing(&self) -> bool {
        self.cells.iter().any(|c| c.is_missing())
    }

    /// Kind of the column: Integer if every non-missing cell parsed as an
    /// integer, Float if every non-missing cell is numeric, Text otherwise.
    pub fn kind(&self) -> ColumnKind {
        let mut all_int = true;
        let mut all_num = true;
        let mut seen = false;
        for cell in &self.cells {
            match cell {
                Cell::Int(_) => seen = true,
                Cell::Float(_) => {
                    seen = true;
                    all_int = false;
                }
                Cell::Text(_) => {
                    seen = true;
                    all_int = false;
                    all_num = false;
                }
                Cell::Missing => {}
            }
        }
        if seen && all_int {
            ColumnKind::Integer
        } else if seen && all_num {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        }
    }

    pub fn distinct_count(&self) -> usize {
        let mut set: BTreeSet<String> = BTreeSet::new();
        for cell in &self.cells {
            if !cell.is_missing() {
                set.insert(cell.token());
            }
        }
        set.len()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind(), ColumnKind::Integer | ColumnKind::Float)
    }
}

/// A raw rectangular table with named columns, as delivered by ingestion.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<Column>,
    pub nrows: usize,
}

/// Clip a preview line to roughly `limit` bytes, backing up to a char
/// boundary so multibyte names never split mid-character.
pub(crate) fn clip(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit.saturating_sub(3);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn parse_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
    {
        return Cell::Missing;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Cell::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        if v.is_nan() {
            return Cell::Missing;
        }
        return Cell::Float(v);
    }
    Cell::Text(trimmed.to_string())
}

impl Table {
    /// Load a delimited table. The delimiter is inferred from the file
    /// extension: `.tsv`/`.txt` are tab-separated, everything else is CSV.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Table, Box<dyn Error>> {
        let path = path.as_ref();
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some("tsv") | Some("txt") => b'\t',
            _ => b',',
        };
        let file = File::open(path)?;
        let table = Table::from_reader(file, delimiter)?;
        info!(
            "Loaded {}: {} rows x {} columns",
            path.display(),
            table.nrows,
            table.columns.len()
        );
        Ok(table)
    }

    /// Parse a delimited table from any reader. The first record is the
    /// header; completely empty rows are dropped.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Table, Box<dyn Error>> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column {
                name,
                cells: Vec::new(),
            })
            .collect();

        let mut nrows = 0;
        for record in csv_reader.records() {
            let record = record?;
            let cells: Vec<Cell> = (0..columns.len())
                .map(|i| parse_cell(record.get(i).unwrap_or("")))
                .collect();
            if cells.iter().all(|c| c.is_missing()) {
                continue;
            }
            for (column, cell) in columns.iter_mut().zip(cells.into_iter()) {
                column.cells.push(cell);
            }
            nrows += 1;
        }

        Ok(Table { columns, nrows })
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join("\t");
        let truncated = clip(&names, 100);
        writeln!(f, "Columns: {}   Rows: {}", self.columns.len(), self.nrows)?;
        writeln!(f, "{}", truncated)
    }
}
