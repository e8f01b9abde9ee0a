//! FTRL-Proximal update engine
//!
//! Implements the per-coordinate update of McMahan et al., "Ad Click
//! Prediction: a View from the Trenches":
//!
//! ```text
//! w_i   = 0                                              if |z_i| <= l1
//!       = -(z_i - sign(z_i) l1) / ((beta + sqrt(n_i)) / alpha + l2)   otherwise
//! g     = p - y
//! sigma = (sqrt(n_i + g^2) - sqrt(n_i)) / alpha
//! z_i  += g - sigma w_i
//! n_i  += g^2
//! ```
//!
//! Only the coordinates active in an example (plus the intercept) are
//! touched by an update.

pub mod state;

pub use self::state::{Coordinate, ModelState};

use crate::core::{FitReport, FtrlError, FtrlParams, Result, Shuffle, TrainingConfig};
use crate::data::CsrBinaryMatrix;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Proximal weight for accumulators `(z, n)`
///
/// Zero inside the L1 dead zone `|z| <= l1`, soft-thresholded otherwise.
pub fn proximal_weight(z: f32, n: f32, params: &FtrlParams) -> f32 {
    if z.abs() <= params.l1() {
        return 0.0;
    }

    let sign = if z < 0.0 { -1.0 } else { 1.0 };
    -(z - sign * params.l1()) / ((params.beta() + n.sqrt()) / params.alpha() + params.l2())
}

/// Change in the inverse learning rate caused by gradient `grad`
pub fn sigma(n: f32, grad: f32, alpha: f32) -> f32 {
    ((n + grad * grad).sqrt() - n.sqrt()) / alpha
}

impl Coordinate {
    /// Fold gradient `grad` into the accumulators and refresh the weight
    ///
    /// `self.w` must be the proximal weight of the current `(z, n)`.
    pub fn update(&mut self, grad: f32, params: &FtrlParams) {
        let sigma = sigma(self.n, grad, params.alpha());
        self.z += grad - sigma * self.w;
        self.n += grad * grad;
        self.w = proximal_weight(self.z, self.n, params);
    }
}

/// Apply one FTRL step for a single example and return its loss
///
/// Indices in `row` must be in range for `state`; callers validate first.
pub(crate) fn update_example(
    state: &mut ModelState,
    row: &[u32],
    y: f32,
    fit_intercept: bool,
) -> f32 {
    let params = *state.params();
    let model_type = params.model_type();

    state.intercept.w = proximal_weight(state.intercept.z, state.intercept.n, &params);
    let mut score = state.intercept.w;
    for &i in row {
        let i = i as usize;
        let w = proximal_weight(state.z[i], state.n[i], &params);
        state.w[i] = w;
        score += w;
    }

    let prediction = model_type.transform(score);
    let loss = model_type.loss(y, prediction);
    let grad = prediction - y;

    if fit_intercept {
        state.intercept.update(grad, &params);
    }

    for &i in row {
        let i = i as usize;
        let mut coord = Coordinate {
            n: state.n[i],
            z: state.z[i],
            w: state.w[i],
        };
        coord.update(grad, &params);
        state.n[i] = coord.n;
        state.z[i] = coord.z;
        state.w[i] = coord.w;
    }

    loss
}

/// Drives FTRL-Proximal training over sparse binary matrices
#[derive(Debug, Clone, Default)]
pub struct FtrlOptimizer {
    config: TrainingConfig,
}

impl FtrlOptimizer {
    /// Create an optimizer with the given training configuration
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Update `state` with one example and return its loss
    pub fn fit_example(&self, state: &mut ModelState, row: &[u32], y: f32) -> Result<f32> {
        state.check_row(row)?;
        state.params().model_type().validate_label(y)?;
        Ok(update_example(state, row, y, self.config.fit_intercept))
    }

    /// Run the configured number of passes over `matrix`
    ///
    /// All inputs are validated before the first update, so a failed call
    /// leaves `state` untouched. Each entry of the report is the mean loss
    /// of one pass, measured while the model evolves during that pass.
    pub fn fit(
        &self,
        state: &mut ModelState,
        matrix: &CsrBinaryMatrix,
        labels: &[f32],
    ) -> Result<FitReport> {
        if self.config.num_passes == 0 {
            return Err(FtrlError::InvalidParameter(
                "num_passes must be > 0".to_string(),
            ));
        }
        validate_training_data(state, matrix, labels)?;

        let num_rows = matrix.num_rows();
        let empty_rows = matrix.rows().filter(|row| row.is_empty()).count();
        if empty_rows > 0 {
            warn!("{empty_rows} of {num_rows} rows have no active features");
        }

        let mut order: Vec<usize> = (0..num_rows).collect();
        let mut rng = match self.config.shuffle {
            Shuffle::None => None,
            Shuffle::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
        };

        let fit_intercept = self.config.fit_intercept;
        let mut pass_losses = Vec::with_capacity(self.config.num_passes);
        for pass in 0..self.config.num_passes {
            if let Some(rng) = rng.as_mut() {
                order.shuffle(rng);
            }

            let mut total_loss = 0.0_f64;
            for &i in &order {
                let row = matrix.row(i);
                total_loss += f64::from(update_example(state, row, labels[i], fit_intercept));
            }

            let mean_loss = (total_loss / num_rows as f64) as f32;
            debug!(
                "Pass {}/{}: mean loss {:.6}",
                pass + 1,
                self.config.num_passes,
                mean_loss
            );
            pass_losses.push(mean_loss);
        }

        let report = FitReport { pass_losses };
        info!(
            "Fitted {} rows x {} passes, final mean loss {:.6}",
            num_rows,
            report.num_passes(),
            report.final_loss()
        );
        Ok(report)
    }
}

/// Check labels and column indices against a state before training
fn validate_training_data(
    state: &ModelState,
    matrix: &CsrBinaryMatrix,
    labels: &[f32],
) -> Result<()> {
    if matrix.is_empty() {
        return Err(FtrlError::ShapeMismatch(
            "cannot fit on a matrix with no rows".to_string(),
        ));
    }
    if labels.len() != matrix.num_rows() {
        return Err(FtrlError::ShapeMismatch(format!(
            "{} labels for {} rows",
            labels.len(),
            matrix.num_rows()
        )));
    }
    if let Some(max) = matrix.max_column() {
        if max as usize >= state.num_features() {
            return Err(FtrlError::ShapeMismatch(format!(
                "feature index {max} is out of range for a model with {} features",
                state.num_features()
            )));
        }
    }

    let model_type = state.params().model_type();
    labels
        .iter()
        .try_for_each(|&y| model_type.validate_label(y))
}
