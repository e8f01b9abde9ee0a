//! High-level API for FTRL-Proximal training and inference
//!
//! This module provides a user-friendly handle that owns at most one model
//! state, initializes it on first fit, and exposes prediction, weight
//! inspection, evaluation and persistence.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ftrl::api::FtrlProximal;
//! use ftrl::{CsrBinaryMatrix, FtrlParams, ModelType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = FtrlParams::new(0.5, 1.0, 0.0, 0.0, ModelType::Classification)?;
//! let mut model = FtrlProximal::new(params);
//!
//! let matrix = CsrBinaryMatrix::from_rows(&[vec![0], vec![1]], 2)?;
//! let loss = model.fit(&matrix, &[1.0, 0.0], 10)?;
//! println!("Mean loss of last pass: {loss:.4}");
//!
//! let probabilities = model.predict(&matrix)?;
//! model.save("model.ftrl")?;
//! # Ok(())
//! # }
//! ```

use crate::core::{
    Dataset, FitReport, FtrlError, FtrlParams, ModelType, Predictor, Result, Shuffle,
    TrainingConfig,
};
use crate::data::{BinaryDataset, CsrBinaryMatrix};
use crate::optimizer::{FtrlOptimizer, ModelState};
use crate::persistence::{self, ModelHeader};
use crate::utils::metrics;
use log::info;
use std::path::Path;

/// FTRL-Proximal model handle with builder-style configuration
#[derive(Debug, Clone)]
pub struct FtrlProximal {
    params: FtrlParams,
    config: TrainingConfig,
    state: Option<ModelState>,
}

impl FtrlProximal {
    /// Create an uninitialized model with the given hyperparameters
    pub fn new(params: FtrlParams) -> Self {
        Self {
            params,
            config: TrainingConfig::default(),
            state: None,
        }
    }

    /// Enable or disable updates of the intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.config.fit_intercept = fit_intercept;
        self
    }

    /// Set the row order used by each pass
    pub fn with_shuffle(mut self, shuffle: Shuffle) -> Self {
        self.config.shuffle = shuffle;
        self
    }

    pub fn params(&self) -> &FtrlParams {
        &self.params
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Borrow the model state, if initialized
    pub fn state(&self) -> Option<&ModelState> {
        self.state.as_ref()
    }

    fn require_state(&self) -> Result<&ModelState> {
        self.state.as_ref().ok_or(FtrlError::ModelNotInitialized)
    }

    /// Reset to a zeroed state for `num_features` features
    ///
    /// The previous state is replaced only once the new one is built; a
    /// rejected call leaves the handle untouched.
    pub fn init_model(&mut self, num_features: usize) -> Result<()> {
        let state = ModelState::new(self.params, num_features)?;
        self.state = Some(state);
        info!("Initialized model with {num_features} features");
        Ok(())
    }

    /// Train for `num_passes` passes and return the last pass's mean loss
    ///
    /// The first fit on an uninitialized model sizes it by the matrix's
    /// column count.
    pub fn fit(
        &mut self,
        matrix: &CsrBinaryMatrix,
        labels: &[f32],
        num_passes: usize,
    ) -> Result<f32> {
        Ok(self.fit_report(matrix, labels, num_passes)?.final_loss())
    }

    /// Like [`FtrlProximal::fit`] but returns every pass's mean loss
    pub fn fit_report(
        &mut self,
        matrix: &CsrBinaryMatrix,
        labels: &[f32],
        num_passes: usize,
    ) -> Result<FitReport> {
        let optimizer = FtrlOptimizer::new(TrainingConfig {
            num_passes,
            ..self.config.clone()
        });

        if let Some(state) = self.state.as_mut() {
            return optimizer.fit(state, matrix, labels);
        }

        // First fit trains a fresh state and keeps it only on success
        let num_features = matrix.num_columns();
        let mut state = ModelState::new(self.params, num_features)?;
        let report = optimizer.fit(&mut state, matrix, labels)?;
        self.state = Some(state);
        info!("Initialized model with {num_features} features");
        Ok(report)
    }

    /// Train on a labelled dataset
    pub fn fit_dataset<D: Dataset>(&mut self, dataset: &D, num_passes: usize) -> Result<f32> {
        self.fit(dataset.matrix(), dataset.labels(), num_passes)
    }

    /// Update an initialized model with one example
    pub fn fit_example(&mut self, row: &[u32], y: f32) -> Result<f32> {
        let optimizer = FtrlOptimizer::new(self.config.clone());
        let state = self.state.as_mut().ok_or(FtrlError::ModelNotInitialized)?;
        optimizer.fit_example(state, row, y)
    }

    /// Predictions for every row, in row order
    ///
    /// Values lie in (0, 1) for classification. A column index at or beyond
    /// the model's feature count is a `ShapeMismatch`.
    pub fn predict(&self, matrix: &CsrBinaryMatrix) -> Result<Vec<f32>> {
        self.require_state()?.predict(matrix)
    }

    /// Prediction for a single example
    pub fn predict_example(&self, row: &[u32]) -> Result<f32> {
        self.require_state()?.predict_row(row)
    }

    /// Intercept weight and a dense copy of the per-feature weights
    pub fn weights(&self) -> Result<(f32, Vec<f32>)> {
        let (intercept, weights) = self.require_state()?.weights();
        Ok((intercept, weights.to_vec()))
    }

    /// Score a labelled dataset
    pub fn evaluate<D: Dataset>(&self, dataset: &D) -> Result<EvaluationMetrics> {
        let predictions = self.predict(dataset.matrix())?;
        EvaluationMetrics::compute(self.params.model_type(), dataset.labels(), &predictions)
    }

    /// Evaluate against a dataset file
    pub fn evaluate_from_file<P: AsRef<Path>>(&self, path: P) -> Result<EvaluationMetrics> {
        let dataset = BinaryDataset::from_file(path)?;
        self.evaluate(&dataset)
    }

    /// Save the model state to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self.require_state()?, path)
    }

    /// Load a model saved with [`FtrlProximal::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let state = persistence::load_from_file(path)?;
        Ok(Self::from_state(state))
    }

    /// Load a model together with its stored header
    pub fn load_with_header<P: AsRef<Path>>(path: P) -> Result<(ModelHeader, Self)> {
        let (header, state) = persistence::load_with_header(path)?;
        Ok((header, Self::from_state(state)))
    }

    /// Wrap an existing state
    pub fn from_state(state: ModelState) -> Self {
        Self {
            params: *state.params(),
            config: TrainingConfig::default(),
            state: Some(state),
        }
    }
}

impl Default for FtrlProximal {
    fn default() -> Self {
        Self::new(FtrlParams::default())
    }
}

/// Detailed evaluation metrics
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationMetrics {
    pub model_type: ModelType,
    pub num_examples: usize,
    /// Mean log loss (classification) or mean squared error (regression)
    pub mean_loss: f64,
    /// Classification accuracy at a 0.5 threshold
    pub accuracy: Option<f64>,
    /// ROC AUC, absent when only one class is present
    pub auc: Option<f64>,
    /// Root mean squared error, regression only
    pub rmse: Option<f64>,
}

impl EvaluationMetrics {
    /// Compute metrics for predictions against their targets
    pub fn compute(model_type: ModelType, labels: &[f32], predictions: &[f32]) -> Result<Self> {
        match model_type {
            ModelType::Classification => Ok(Self {
                model_type,
                num_examples: labels.len(),
                mean_loss: metrics::log_loss(labels, predictions)?,
                accuracy: Some(metrics::accuracy(labels, predictions)?),
                auc: metrics::roc_auc(labels, predictions)?,
                rmse: None,
            }),
            ModelType::Regression => {
                let mse = metrics::mean_squared_error(labels, predictions)?;
                Ok(Self {
                    model_type,
                    num_examples: labels.len(),
                    mean_loss: mse,
                    accuracy: None,
                    auc: None,
                    rmse: Some(mse.sqrt()),
                })
            }
        }
    }
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;

    /// Train a model on a dataset file
    pub fn train_file<P: AsRef<Path>>(
        path: P,
        params: FtrlParams,
        num_passes: usize,
    ) -> Result<FtrlProximal> {
        let dataset = BinaryDataset::from_file(path)?;
        let mut model = FtrlProximal::new(params);
        model.fit_dataset(&dataset, num_passes)?;
        Ok(model)
    }

    /// Quick evaluation: train on training file, test on test file
    pub fn evaluate_split<P1: AsRef<Path>, P2: AsRef<Path>>(
        train_path: P1,
        test_path: P2,
        params: FtrlParams,
        num_passes: usize,
    ) -> Result<EvaluationMetrics> {
        let model = train_file(train_path, params, num_passes)?;
        model.evaluate_from_file(test_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toy_matrix() -> (CsrBinaryMatrix, Vec<f32>) {
        let matrix = CsrBinaryMatrix::from_rows(
            &[vec![0, 2], vec![1, 2], vec![0, 3], vec![1, 3]],
            4,
        )
        .unwrap();
        (matrix, vec![1.0, 0.0, 1.0, 0.0])
    }

    #[test]
    fn test_uninitialized_model_errors() {
        let model = FtrlProximal::default();
        let (matrix, _) = toy_matrix();

        assert!(!model.is_initialized());
        assert!(matches!(
            model.predict(&matrix),
            Err(FtrlError::ModelNotInitialized)
        ));
        assert!(matches!(model.weights(), Err(FtrlError::ModelNotInitialized)));
        assert!(matches!(
            model.predict_example(&[0]),
            Err(FtrlError::ModelNotInitialized)
        ));

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        assert!(matches!(
            model.save(temp_file.path()),
            Err(FtrlError::ModelNotInitialized)
        ));

        let mut model = model;
        assert!(matches!(
            model.fit_example(&[0], 1.0),
            Err(FtrlError::ModelNotInitialized)
        ));
    }

    #[test]
    fn test_fit_auto_initializes() {
        let mut model = FtrlProximal::default();
        let (matrix, labels) = toy_matrix();

        let loss = model.fit(&matrix, &labels, 1).unwrap();
        assert!(loss.is_finite() && loss > 0.0);
        assert!(model.is_initialized());

        let (_, weights) = model.weights().unwrap();
        assert_eq!(weights.len(), 4);
    }

    #[test]
    fn test_fit_on_zero_column_matrix_fails() {
        let mut model = FtrlProximal::default();
        let matrix = CsrBinaryMatrix::from_rows(&[vec![]], 0).unwrap();
        assert!(matches!(
            model.fit(&matrix, &[1.0], 1),
            Err(FtrlError::InvalidParameter(_))
        ));
        assert!(!model.is_initialized());
    }

    #[test]
    fn test_predict_with_wider_matrix_is_shape_mismatch() {
        let mut model = FtrlProximal::default();
        let (matrix, labels) = toy_matrix();
        model.fit(&matrix, &labels, 1).unwrap();

        let wider = CsrBinaryMatrix::from_rows(&[vec![0], vec![4]], 5).unwrap();
        assert!(matches!(
            model.predict(&wider),
            Err(FtrlError::ShapeMismatch(_))
        ));

        // Wider column count is fine as long as no index is out of range
        let padded = CsrBinaryMatrix::from_rows(&[vec![0], vec![3]], 8).unwrap();
        assert_eq!(model.predict(&padded).unwrap().len(), 2);
    }

    #[test]
    fn test_init_model_resets_state() {
        let mut model = FtrlProximal::default();
        let (matrix, labels) = toy_matrix();
        model.fit(&matrix, &labels, 3).unwrap();

        model.init_model(6).unwrap();
        let (intercept, weights) = model.weights().unwrap();
        assert_eq!(intercept, 0.0);
        assert_eq!(weights, vec![0.0; 6]);
    }

    #[test]
    fn test_rejected_init_model_keeps_state() {
        let mut model = FtrlProximal::default();
        let (matrix, labels) = toy_matrix();
        model.fit(&matrix, &labels, 3).unwrap();
        let trained = model.state().unwrap().clone();

        assert!(matches!(
            model.init_model(0),
            Err(FtrlError::InvalidParameter(_))
        ));
        assert_eq!(model.state(), Some(&trained));
        assert_eq!(model.predict(&matrix).unwrap(), trained.predict(&matrix).unwrap());
    }

    #[test]
    fn test_failed_first_fit_leaves_model_uninitialized() {
        let mut model = FtrlProximal::default();
        let narrow = CsrBinaryMatrix::from_rows(&[vec![0], vec![1]], 2).unwrap();

        assert!(matches!(
            model.fit(&narrow, &[1.0], 1),
            Err(FtrlError::ShapeMismatch(_))
        ));
        assert!(matches!(
            model.fit(&narrow, &[1.0, 0.0], 0),
            Err(FtrlError::InvalidParameter(_))
        ));
        assert!(matches!(
            model.fit(&narrow, &[1.0, 0.5], 1),
            Err(FtrlError::InvalidLabel(_))
        ));
        let empty = CsrBinaryMatrix::new(vec![0], vec![], 2).unwrap();
        assert!(matches!(
            model.fit(&empty, &[], 1),
            Err(FtrlError::ShapeMismatch(_))
        ));

        assert!(!model.is_initialized());
        assert!(matches!(
            model.predict(&narrow),
            Err(FtrlError::ModelNotInitialized)
        ));

        // A corrected retry with a different width sizes the model afresh
        let (matrix, labels) = toy_matrix();
        model.fit(&matrix, &labels, 1).unwrap();
        assert_eq!(model.state().unwrap().num_features(), 4);
    }

    #[test]
    fn test_fit_report_and_continued_training() {
        let mut model = FtrlProximal::default().with_shuffle(Shuffle::Seeded(7));
        let (matrix, labels) = toy_matrix();

        let report = model.fit_report(&matrix, &labels, 4).unwrap();
        assert_eq!(report.num_passes(), 4);

        // a second call keeps training the same state
        let before = model.state().unwrap().n().to_vec();
        model.fit(&matrix, &labels, 1).unwrap();
        let after = model.state().unwrap().n();
        assert!(before.iter().zip(after).all(|(b, a)| a > b));
    }

    #[test]
    fn test_fit_example_after_init() {
        let mut model = FtrlProximal::default();
        model.init_model(3).unwrap();
        let loss = model.fit_example(&[0, 2], 1.0).unwrap();
        assert_relative_eq!(loss, 2.0_f32.ln(), epsilon = 1e-6);
        assert!(model.predict_example(&[0, 2]).unwrap() > 0.5);
        assert!(model.fit_example(&[3], 1.0).is_err());
    }

    #[test]
    fn test_evaluate_classification() {
        let mut model = FtrlProximal::default();
        let (matrix, labels) = toy_matrix();
        model.fit(&matrix, &labels, 10).unwrap();

        let dataset = BinaryDataset::new(matrix, labels).unwrap();
        let metrics = model.evaluate(&dataset).unwrap();
        assert_eq!(metrics.num_examples, 4);
        assert_eq!(metrics.accuracy, Some(1.0));
        assert_eq!(metrics.auc, Some(1.0));
        assert!(metrics.rmse.is_none());
    }

    #[test]
    fn test_evaluate_regression() {
        let metrics =
            EvaluationMetrics::compute(ModelType::Regression, &[1.0, 3.0], &[2.0, 3.0]).unwrap();
        assert_relative_eq!(metrics.mean_loss, 0.5);
        assert_relative_eq!(metrics.rmse.unwrap(), 0.5_f64.sqrt());
        assert!(metrics.accuracy.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let mut model = FtrlProximal::new(
            FtrlParams::new(0.1, 1.0, 0.01, 0.1, ModelType::Classification).unwrap(),
        );
        let (matrix, labels) = toy_matrix();
        model.fit(&matrix, &labels, 2).unwrap();

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        model.save(temp_file.path()).unwrap();
        let loaded = FtrlProximal::load(temp_file.path()).unwrap();

        assert_eq!(loaded.params(), model.params());
        assert_eq!(loaded.weights().unwrap(), model.weights().unwrap());
        assert_eq!(loaded.predict(&matrix).unwrap(), model.predict(&matrix).unwrap());

        let (header, reloaded) = FtrlProximal::load_with_header(temp_file.path()).unwrap();
        assert_eq!(header.num_features, 4);
        assert_eq!(header.params, *model.params());
        assert_eq!(reloaded.state(), loaded.state());
    }

    #[test]
    fn test_quick_functions() {
        let mut train_file = NamedTempFile::new().expect("Failed to create temp file");
        for _ in 0..5 {
            writeln!(train_file, "1 0 2").expect("Failed to write");
            writeln!(train_file, "0 1 2").expect("Failed to write");
        }
        train_file.flush().expect("Failed to flush");

        let model = quick::train_file(train_file.path(), FtrlParams::default(), 5)
            .expect("Quick training should succeed");
        assert!(model.is_initialized());

        let metrics =
            quick::evaluate_split(train_file.path(), train_file.path(), FtrlParams::default(), 5)
                .expect("Quick evaluation should succeed");
        assert_eq!(metrics.accuracy, Some(1.0));
    }
}
