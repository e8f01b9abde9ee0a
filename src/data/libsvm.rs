//! Text dataset loader for binary indicator features
//!
//! Each non-empty line holds a label followed by the features present in
//! that example. Two token styles are accepted, and may be mixed:
//!
//! ```text
//! 1 0 3 7          # zero-based feature indices
//! 0 1:1 4:1 8:1    # LibSVM style, one-based index:value
//! ```
//!
//! LibSVM entries with value 0 are absent features and are skipped; any
//! other value marks the feature as present.

use crate::core::{Dataset, FtrlError, Result};
use crate::data::CsrBinaryMatrix;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Feature matrix plus one label per row
#[derive(Debug, Clone)]
pub struct BinaryDataset {
    matrix: CsrBinaryMatrix,
    labels: Vec<f32>,
}

impl BinaryDataset {
    /// Pair a matrix with its labels
    pub fn new(matrix: CsrBinaryMatrix, labels: Vec<f32>) -> Result<Self> {
        if matrix.num_rows() != labels.len() {
            return Err(FtrlError::ShapeMismatch(format!(
                "{} labels for {} rows",
                labels.len(),
                matrix.num_rows()
            )));
        }
        Ok(Self { matrix, labels })
    }

    /// Load a dataset from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(FtrlError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader, sizing columns by the largest index seen
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::read(reader, None)
    }

    /// Load a dataset whose matrix has a fixed column count
    ///
    /// Useful when scoring data against a model trained on a wider
    /// vocabulary than this file happens to use.
    pub fn from_reader_with_columns<R: BufRead>(reader: R, num_columns: usize) -> Result<Self> {
        Self::read(reader, Some(num_columns))
    }

    fn read<R: BufRead>(reader: R, num_columns: Option<usize>) -> Result<Self> {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        let mut dimensions = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(FtrlError::IoError)?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, row) = Self::parse_line(line).map_err(|e| {
                FtrlError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;

            if let Some(&max_idx) = row.iter().max() {
                dimensions = dimensions.max(max_idx as usize + 1);
            }
            labels.push(label);
            rows.push(row);
        }

        let num_columns = match num_columns {
            Some(n) if n < dimensions => {
                return Err(FtrlError::ShapeMismatch(format!(
                    "data references feature {} but only {n} columns were requested",
                    dimensions - 1
                )))
            }
            Some(n) => n,
            None => dimensions,
        };

        let matrix = CsrBinaryMatrix::from_rows(&rows, num_columns)?;
        Self::new(matrix, labels)
    }

    /// Parse a single line into its label and feature indices
    fn parse_line(line: &str) -> Result<(f32, Vec<u32>)> {
        let mut parts = line.split_whitespace();

        let label_str = parts
            .next()
            .ok_or_else(|| FtrlError::ParseError("Empty line".to_string()))?;
        let label = label_str
            .parse::<f32>()
            .map_err(|_| FtrlError::ParseError(format!("Invalid label: {label_str}")))?;

        let mut indices = Vec::new();
        for token in parts {
            match token.split_once(':') {
                Some((index_str, value_str)) => {
                    let index = index_str.parse::<u32>().map_err(|_| {
                        FtrlError::ParseError(format!("Invalid feature index: {index_str}"))
                    })?;
                    let value = value_str.parse::<f32>().map_err(|_| {
                        FtrlError::ParseError(format!("Invalid feature value: {value_str}"))
                    })?;

                    // LibSVM uses 1-based indexing
                    if index == 0 {
                        return Err(FtrlError::ParseError(format!(
                            "Feature index must be positive: {token}"
                        )));
                    }
                    if value != 0.0 {
                        indices.push(index - 1);
                    }
                }
                None => {
                    let index = token.parse::<u32>().map_err(|_| {
                        FtrlError::ParseError(format!("Invalid feature index: {token}"))
                    })?;
                    indices.push(index);
                }
            }
        }

        Ok((label, indices))
    }

    pub fn matrix(&self) -> &CsrBinaryMatrix {
        &self.matrix
    }

    pub fn labels(&self) -> &[f32] {
        &self.labels
    }
}

impl Dataset for BinaryDataset {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn dim(&self) -> usize {
        self.matrix.num_columns()
    }

    fn matrix(&self) -> &CsrBinaryMatrix {
        &self.matrix
    }

    fn labels(&self) -> &[f32] {
        &self.labels
    }
}
