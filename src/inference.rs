//! Batch inference over a trained model state
//!
//! Inference reads the stored proximal weights as-is; the update engine keeps
//! them consistent with the accumulators, so no regularization terms are
//! re-applied here and the state is never mutated.

use crate::core::{FtrlError, ModelType, Predictor, Result};
use crate::data::CsrBinaryMatrix;
use crate::optimizer::ModelState;

impl ModelState {
    /// Raw score of a row whose indices are known to be in range
    fn score_unchecked(&self, row: &[u32]) -> f32 {
        row.iter()
            .fold(self.intercept.w, |acc, &i| acc + self.w[i as usize])
    }

    /// Predict every row of `matrix` into `out`
    ///
    /// Column indices beyond the model's feature count are rejected with
    /// `ShapeMismatch` before anything is written.
    pub fn predict_into(&self, matrix: &CsrBinaryMatrix, out: &mut [f32]) -> Result<()> {
        if out.len() != matrix.num_rows() {
            return Err(FtrlError::ShapeMismatch(format!(
                "output buffer holds {} values for {} rows",
                out.len(),
                matrix.num_rows()
            )));
        }
        if let Some(max) = matrix.max_column() {
            if max as usize >= self.num_features() {
                return Err(FtrlError::ShapeMismatch(format!(
                    "feature index {max} is out of range for a model with {} features",
                    self.num_features()
                )));
            }
        }

        let model_type = self.params().model_type();
        for (slot, row) in out.iter_mut().zip(matrix.rows()) {
            *slot = model_type.transform(self.score_unchecked(row));
        }
        Ok(())
    }

    /// Predictions for every row of `matrix`, in row order
    pub fn predict(&self, matrix: &CsrBinaryMatrix) -> Result<Vec<f32>> {
        let mut out = vec![0.0; matrix.num_rows()];
        self.predict_into(matrix, &mut out)?;
        Ok(out)
    }
}

impl Predictor for ModelState {
    fn model_type(&self) -> ModelType {
        self.params().model_type()
    }

    fn decision_value(&self, row: &[u32]) -> Result<f32> {
        self.check_row(row)?;
        Ok(self.score_unchecked(row))
    }

    fn predict_matrix(&self, matrix: &CsrBinaryMatrix) -> Result<Vec<f32>> {
        self.predict(matrix)
    }
}
