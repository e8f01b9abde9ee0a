//! Compressed sparse row matrix with implicit unit values
//!
//! Row `i` holds the feature indices `columns[indptr[i]..indptr[i + 1]]`.
//! There is no value array: every listed feature is present with value 1.

use crate::core::{FtrlError, Result};

/// Read-only CSR view of a binary feature matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrBinaryMatrix {
    indptr: Vec<usize>,
    columns: Vec<u32>,
    num_columns: usize,
}

impl CsrBinaryMatrix {
    /// Build a matrix from raw CSR arrays, validating its structure
    ///
    /// Fails with `ShapeMismatch` when `indptr` is empty, does not start at 0,
    /// decreases, does not end at `columns.len()`, when a column index is
    /// `>= num_columns`, or when a row lists the same column twice.
    pub fn new(indptr: Vec<usize>, columns: Vec<u32>, num_columns: usize) -> Result<Self> {
        if indptr.first() != Some(&0) {
            return Err(FtrlError::ShapeMismatch(
                "indptr must be non-empty and start at 0".to_string(),
            ));
        }
        if let Some(pos) = indptr.windows(2).position(|w| w[1] < w[0]) {
            return Err(FtrlError::ShapeMismatch(format!(
                "indptr decreases at offset {}",
                pos + 1
            )));
        }
        let end = indptr[indptr.len() - 1];
        if end != columns.len() {
            return Err(FtrlError::ShapeMismatch(format!(
                "indptr ends at {end} but there are {} column entries",
                columns.len()
            )));
        }

        let matrix = Self {
            indptr,
            columns,
            num_columns,
        };

        let mut scratch = Vec::new();
        for (i, row) in matrix.rows().enumerate() {
            if let Some(&col) = row.iter().find(|&&c| c as usize >= num_columns) {
                return Err(FtrlError::ShapeMismatch(format!(
                    "row {i} references column {col} but the matrix has {num_columns} columns"
                )));
            }

            scratch.clear();
            scratch.extend_from_slice(row);
            scratch.sort_unstable();
            if let Some(dup) = scratch.windows(2).find(|w| w[0] == w[1]) {
                return Err(FtrlError::ShapeMismatch(format!(
                    "row {i} lists column {} more than once",
                    dup[0]
                )));
            }
        }

        Ok(matrix)
    }

    /// Build a matrix from per-row feature index lists
    pub fn from_rows(rows: &[Vec<u32>], num_columns: usize) -> Result<Self> {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut columns = Vec::new();
        indptr.push(0);
        for row in rows {
            columns.extend_from_slice(row);
            indptr.push(columns.len());
        }
        Self::new(indptr, columns, num_columns)
    }

    /// Number of rows (examples)
    pub fn num_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Number of columns (features) the matrix was built against
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Total number of present entries
    pub fn nnz(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Feature indices of row `i`
    ///
    /// # Panics
    /// Panics if `i >= num_rows()`
    pub fn row(&self, i: usize) -> &[u32] {
        &self.columns[self.indptr[i]..self.indptr[i + 1]]
    }

    /// Iterate rows in matrix order
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.indptr
            .windows(2)
            .map(move |w| &self.columns[w[0]..w[1]])
    }

    /// Largest column index present, if any
    pub fn max_column(&self) -> Option<u32> {
        self.columns.iter().copied().max()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn columns(&self) -> &[u32] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let matrix = CsrBinaryMatrix::from_rows(&[vec![0, 2], vec![], vec![1]], 3).unwrap();

        assert_eq!(matrix.num_rows(), 3);
        assert_eq!(matrix.num_columns(), 3);
        assert_eq!(matrix.nnz(), 3);
        assert_eq!(matrix.indptr(), &[0, 2, 2, 3]);
        assert_eq!(matrix.row(0), &[0, 2]);
        assert!(matrix.row(1).is_empty());
        assert_eq!(matrix.row(2), &[1]);
        assert_eq!(matrix.max_column(), Some(2));
    }

    #[test]
    fn test_rows_iterator_matches_row() {
        let matrix = CsrBinaryMatrix::new(vec![0, 1, 3], vec![4, 0, 3], 5).unwrap();
        let rows: Vec<&[u32]> = matrix.rows().collect();
        assert_eq!(rows, vec![matrix.row(0), matrix.row(1)]);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = CsrBinaryMatrix::new(vec![0], vec![], 4).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.rows().count(), 0);
        assert_eq!(matrix.max_column(), None);
    }

    #[test]
    fn test_invalid_indptr() {
        assert!(matches!(
            CsrBinaryMatrix::new(vec![], vec![], 1),
            Err(FtrlError::ShapeMismatch(_))
        ));
        assert!(CsrBinaryMatrix::new(vec![1, 2], vec![0, 1], 2).is_err());
        assert!(CsrBinaryMatrix::new(vec![0, 2, 1], vec![0, 1], 2).is_err());
        assert!(CsrBinaryMatrix::new(vec![0, 1], vec![0, 1], 2).is_err());
    }

    #[test]
    fn test_column_out_of_range() {
        let result = CsrBinaryMatrix::from_rows(&[vec![0, 3]], 3);
        assert!(matches!(result, Err(FtrlError::ShapeMismatch(_))));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = CsrBinaryMatrix::from_rows(&[vec![1], vec![2, 0, 2]], 3);
        match result {
            Err(FtrlError::ShapeMismatch(msg)) => assert!(msg.contains("row 1")),
            other => panic!("expected shape mismatch, got {other:?}"),
        }

        // Same column in different rows is fine
        assert!(CsrBinaryMatrix::from_rows(&[vec![2], vec![2]], 3).is_ok());
    }
}
