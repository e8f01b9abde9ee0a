//! Core traits for FTRL-Proximal

use crate::core::{ModelType, Result};
use crate::data::CsrBinaryMatrix;

/// Labelled binary-feature data
pub trait Dataset {
    /// Number of examples in the dataset
    fn len(&self) -> usize;

    /// Number of feature columns
    fn dim(&self) -> usize;

    /// Feature incidence structure
    fn matrix(&self) -> &CsrBinaryMatrix;

    /// One target per example, in row order
    fn labels(&self) -> &[f32];

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scores sparse binary rows
pub trait Predictor {
    /// Task type deciding the output transform
    fn model_type(&self) -> ModelType;

    /// Raw linear score of one row (active weights plus intercept)
    fn decision_value(&self, row: &[u32]) -> Result<f32>;

    /// Transformed prediction for one row
    fn predict_row(&self, row: &[u32]) -> Result<f32> {
        let score = self.decision_value(row)?;
        Ok(self.model_type().transform(score))
    }

    /// Predictions for every row of a matrix, in row order
    fn predict_matrix(&self, matrix: &CsrBinaryMatrix) -> Result<Vec<f32>> {
        matrix.rows().map(|row| self.predict_row(row)).collect()
    }
}
