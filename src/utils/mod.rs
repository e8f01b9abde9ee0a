//! Utility functions for evaluating models and inspecting data

use crate::core::{FtrlError, Result};
use crate::data::CsrBinaryMatrix;

fn check_lengths(labels: &[f32], predictions: &[f32]) -> Result<()> {
    if labels.len() != predictions.len() {
        return Err(FtrlError::ShapeMismatch(format!(
            "{} labels for {} predictions",
            labels.len(),
            predictions.len()
        )));
    }
    if labels.is_empty() {
        return Err(FtrlError::ShapeMismatch(
            "cannot score an empty prediction set".to_string(),
        ));
    }
    Ok(())
}

/// Evaluation metrics over label/prediction pairs
pub mod metrics {
    use super::*;
    use crate::core::types::log_loss as example_log_loss;

    /// Mean binary cross-entropy of probabilities against {0, 1} labels
    pub fn log_loss(labels: &[f32], probabilities: &[f32]) -> Result<f64> {
        check_lengths(labels, probabilities)?;
        let total: f64 = labels
            .iter()
            .zip(probabilities)
            .map(|(&y, &p)| f64::from(example_log_loss(y, p)))
            .sum();
        Ok(total / labels.len() as f64)
    }

    /// Mean squared error
    pub fn mean_squared_error(targets: &[f32], predictions: &[f32]) -> Result<f64> {
        check_lengths(targets, predictions)?;
        let total: f64 = targets
            .iter()
            .zip(predictions)
            .map(|(&y, &p)| {
                let diff = f64::from(p) - f64::from(y);
                diff * diff
            })
            .sum();
        Ok(total / targets.len() as f64)
    }

    /// Fraction of rows where `p >= 0.5` agrees with `y == 1`
    pub fn accuracy(labels: &[f32], probabilities: &[f32]) -> Result<f64> {
        check_lengths(labels, probabilities)?;
        let correct = labels
            .iter()
            .zip(probabilities)
            .filter(|(&y, &p)| (p >= 0.5) == (y > 0.5))
            .count();
        Ok(correct as f64 / labels.len() as f64)
    }

    /// Area under the ROC curve via the rank-sum statistic
    ///
    /// Tied scores share their average rank. Returns `None` when only one
    /// class is present.
    pub fn roc_auc(labels: &[f32], scores: &[f32]) -> Result<Option<f64>> {
        check_lengths(labels, scores)?;

        let mut pairs: Vec<(f32, bool)> = scores
            .iter()
            .copied()
            .zip(labels.iter().map(|&y| y > 0.5))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n_pos = pairs.iter().filter(|p| p.1).count();
        let n_neg = pairs.len() - n_pos;
        if n_pos == 0 || n_neg == 0 {
            return Ok(None);
        }

        let mut rank_sum = 0.0_f64;
        let mut start = 0;
        while start < pairs.len() {
            let score = pairs[start].0;
            let end = start
                + pairs[start..]
                    .iter()
                    .take_while(|p| p.0.total_cmp(&score).is_eq())
                    .count();
            // ranks start+1 ..= end share their mean
            let avg_rank = (start + 1 + end) as f64 / 2.0;
            let positives = pairs[start..end].iter().filter(|p| p.1).count();
            rank_sum += avg_rank * positives as f64;
            start = end;
        }

        let n_pos = n_pos as f64;
        let n_neg = n_neg as f64;
        Ok(Some((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)))
    }
}

/// Validation and preprocessing utilities
pub mod validation {
    /// Count positive and negative labels and their ratio
    pub fn check_label_balance(labels: &[f32]) -> (usize, usize, f64) {
        let positive_count = labels.iter().filter(|&&l| l > 0.5).count();
        let negative_count = labels.len() - positive_count;
        let balance_ratio = if negative_count == 0 {
            f64::INFINITY
        } else {
            positive_count as f64 / negative_count as f64
        };
        (positive_count, negative_count, balance_ratio)
    }
}

/// Statistical utilities for sparse binary matrices
pub mod stats {
    use super::*;

    /// Row-length statistics of a matrix
    pub fn matrix_stats(matrix: &CsrBinaryMatrix) -> MatrixStats {
        if matrix.is_empty() {
            return MatrixStats {
                num_columns: matrix.num_columns(),
                ..MatrixStats::default()
            };
        }

        let lengths = matrix.rows().map(<[u32]>::len);
        let (min_nnz, max_nnz) = lengths.fold((usize::MAX, 0), |(lo, hi), len| {
            (lo.min(len), hi.max(len))
        });

        let num_rows = matrix.num_rows();
        let cells = num_rows as f64 * matrix.num_columns() as f64;
        MatrixStats {
            num_rows,
            num_columns: matrix.num_columns(),
            nnz: matrix.nnz(),
            mean_nnz: matrix.nnz() as f64 / num_rows as f64,
            min_nnz,
            max_nnz,
            density: if cells > 0.0 {
                matrix.nnz() as f64 / cells
            } else {
                0.0
            },
        }
    }

    /// Number of rows each column appears in
    pub fn feature_frequency(matrix: &CsrBinaryMatrix) -> Vec<usize> {
        let mut frequency = vec![0; matrix.num_columns()];
        for &col in matrix.columns() {
            frequency[col as usize] += 1;
        }
        frequency
    }
}

/// Summary of a matrix's sparsity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixStats {
    pub num_rows: usize,
    pub num_columns: usize,
    pub nnz: usize,
    pub mean_nnz: f64,
    pub min_nnz: usize,
    pub max_nnz: usize,
    pub density: f64,
}
