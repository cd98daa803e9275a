use crate::detect::{self, Detection};
use crate::error::AnalysisError;
use crate::table::{clip, Table};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The (matrix, labels, names) triple both engines consume.
///
/// `X` is dense row-major (sample-major) with NaN marking a missing
/// measurement. `y` holds one integer group label per sample.
#[derive(Clone, Serialize, Deserialize)]
pub struct Data {
    pub X: Vec<f64>,
    pub y: Vec<i32>,
    pub features: Vec<String>,
    pub feature_len: usize,
    pub sample_len: usize,
    /// Name of the detected class column, if any.
    pub class_column: Option<String>,
}

impl Data {
    pub fn new() -> Data {
        Data {
            X: Vec::new(),
            y: Vec::new(),
            features: Vec::new(),
            feature_len: 0,
            sample_len: 0,
            class_column: None,
        }
    }

    #[inline]
    pub fn value(&self, sample: usize, feature: usize) -> f64 {
        self.X[sample * self.feature_len + feature]
    }

    /// Distinct group labels, in ascending order.
    pub fn class_levels(&self) -> Vec<i32> {
        let mut levels = self.y.clone();
        levels.sort_unstable();
        levels.dedup();
        levels
    }

    /// Build the numeric dataset from a raw table.
    ///
    /// Runs class detection, excludes the class column and identifier
    /// columns from the matrix, coerces the remaining columns to numeric,
    /// drops all-missing rows (keeping y aligned) and validates the
    /// minimum dataset size.
    pub fn from_table(table: &Table) -> Result<Data, AnalysisError> {
        let detection = detect::detect(table)?;

        let (columns, class_column): (Vec<usize>, Option<String>) = match &detection {
            Detection::Detected { column, .. } => {
                let mut kept = Vec::new();
                for (idx, col) in table.columns.iter().enumerate() {
                    if idx == *column {
                        continue;
                    }
                    if detect::is_id_column(&col.name) {
                        info!("Skipping ID column: {}", col.name);
                        continue;
                    }
                    kept.push(idx);
                }
                // Prefer natively numeric columns; only when none exist are
                // text columns coerced cell-wise, dropping the ones that
                // yield no numbers at all.
                let numeric: Vec<usize> = kept
                    .iter()
                    .copied()
                    .filter(|&idx| table.columns[idx].is_numeric())
                    .collect();
                let usable = if !numeric.is_empty() {
                    numeric
                } else {
                    kept.into_iter()
                        .filter(|&idx| {
                            table.columns[idx]
                                .cells
                                .iter()
                                .any(|c| !c.as_f64().is_nan())
                        })
                        .collect()
                };
                (usable, Some(table.columns[*column].name.clone()))
            }
            Detection::NotDetected { .. } => {
                // Without a class column the whole table is data, coerced
                // to numeric as-is.
                ((0..table.columns.len()).collect(), None)
            }
        };

        let labels = detection.labels();
        let feature_len = columns.len();
        let features: Vec<String> = columns
            .iter()
            .map(|&idx| table.columns[idx].name.clone())
            .collect();

        let mut x: Vec<f64> = Vec::with_capacity(table.nrows * feature_len);
        let mut y: Vec<i32> = Vec::with_capacity(table.nrows);
        let mut dropped = 0;
        for row in 0..table.nrows {
            let values: Vec<f64> = columns
                .iter()
                .map(|&idx| table.columns[idx].cells[row].as_f64())
                .collect();
            if feature_len > 0 && values.iter().all(|v| v.is_nan()) {
                dropped += 1;
                continue;
            }
            x.extend(values);
            y.push(labels[row]);
        }
        if dropped > 0 {
            warn!("Dropped {} rows with no numeric measurement", dropped);
        }

        let sample_len = y.len();
        if sample_len < 3 {
            return Err(AnalysisError::InsufficientData(format!(
                "{} samples (minimum 3 required)",
                sample_len
            )));
        }
        if feature_len < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "{} variables (minimum 2 required)",
                feature_len
            )));
        }

        let data = Data {
            X: x,
            y,
            features,
            feature_len,
            sample_len,
            class_column,
        };
        info!(
            "Parsed: {} samples x {} variables, {} classes",
            data.sample_len,
            data.feature_len,
            data.class_levels().len()
        );
        Ok(data)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Variables: {}   Samples: {}", self.feature_len, self.sample_len)?;

        let header = self.features.join("\t");
        writeln!(f, "X:      {}", clip(&header, 100))?;

        // Limit to the first 20 samples
        for i in (0..self.sample_len).take(20) {
            let row_display: String = (0..self.feature_len)
                .map(|j| {
                    let v = self.value(i, j);
                    if v.is_nan() {
                        "".to_string()
                    } else {
                        format!("{:.2}", v)
                    }
                })
                .collect::<Vec<_>>()
                .join("\t");
            writeln!(f, "{:<7} {}", format!("y={}", self.y[i]), clip(&row_display, 80))?;
        }

        Ok(())
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the Display formatter
        write!(f, "{}", self)
    }
}
