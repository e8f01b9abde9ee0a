//! Core type definitions for FTRL-Proximal

use crate::core::{FtrlError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Raw scores beyond this magnitude saturate the sigmoid.
const SCORE_BOUND: f32 = 35.0;

/// Classification outputs are kept this far away from 0 and 1.
pub const PROBABILITY_EPSILON: f32 = 1e-7;

/// Floor applied inside `ln` when computing log loss.
pub const LOSS_TOLERANCE: f32 = 1e-6;

/// Task type of a model: selects the output transform and the loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Logistic output in (0, 1), binary cross-entropy loss
    #[default]
    Classification,
    /// Identity output, squared error loss
    Regression,
}

impl ModelType {
    /// Name used in configuration and CLI flags
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Classification => "classification",
            ModelType::Regression => "regression",
        }
    }

    /// Numeric tag stored in persisted models
    pub fn code(&self) -> u32 {
        match self {
            ModelType::Classification => 0,
            ModelType::Regression => 1,
        }
    }

    /// Inverse of [`ModelType::code`]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(ModelType::Classification),
            1 => Some(ModelType::Regression),
            _ => None,
        }
    }

    /// Map a raw linear score to the model output
    pub fn transform(&self, score: f32) -> f32 {
        match self {
            ModelType::Classification => sigmoid(score),
            ModelType::Regression => score,
        }
    }

    /// Per-example loss of `prediction` against the target `y`
    pub fn loss(&self, y: f32, prediction: f32) -> f32 {
        match self {
            ModelType::Classification => log_loss(y, prediction),
            ModelType::Regression => {
                let diff = prediction - y;
                diff * diff
            }
        }
    }

    /// Check that a target is usable for this task
    pub fn validate_label(&self, y: f32) -> Result<()> {
        let valid = match self {
            ModelType::Classification => y == 0.0 || y == 1.0,
            ModelType::Regression => y.is_finite(),
        };
        if valid {
            Ok(())
        } else {
            Err(FtrlError::InvalidLabel(y))
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = FtrlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classification" => Ok(ModelType::Classification),
            "regression" => Ok(ModelType::Regression),
            other => Err(FtrlError::InvalidParameter(format!(
                "unknown model_type: allowed classification, regression; got {other}"
            ))),
        }
    }
}

/// Logistic function with saturation at +/-35 and output clamped into (0, 1)
pub fn sigmoid(score: f32) -> f32 {
    let x = score.clamp(-SCORE_BOUND, SCORE_BOUND);
    (1.0 / (1.0 + (-x).exp())).clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON)
}

/// Binary cross-entropy, guarded against `ln(0)`
pub fn log_loss(y: f32, p: f32) -> f32 {
    let p = p.clamp(0.0, 1.0);
    -(y * p.max(LOSS_TOLERANCE).ln() + (1.0 - y) * (1.0 - p).max(LOSS_TOLERANCE).ln())
}

/// Hyperparameters of the FTRL-Proximal update rule
///
/// Immutable once constructed. Use [`FtrlParams::new`] to validate a
/// combination, or [`FtrlParams::default`] for alpha=1, beta=1, l1=0, l2=0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FtrlParams {
    alpha: f32,
    beta: f32,
    l1: f32,
    l2: f32,
    model_type: ModelType,
}

impl FtrlParams {
    /// Create a validated parameter set
    pub fn new(alpha: f32, beta: f32, l1: f32, l2: f32, model_type: ModelType) -> Result<Self> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(FtrlError::InvalidParameter(format!(
                "alpha must be finite and > 0, got {alpha}"
            )));
        }
        for (name, value) in [("beta", beta), ("l1", l1), ("l2", l2)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FtrlError::InvalidParameter(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }

        Ok(Self {
            alpha,
            beta,
            l1,
            l2,
            model_type,
        })
    }

    /// Learning-rate scale
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Learning-rate smoothing constant
    pub fn beta(&self) -> f32 {
        self.beta
    }

    /// L1 regularization strength
    pub fn l1(&self) -> f32 {
        self.l1
    }

    /// L2 regularization strength
    pub fn l2(&self) -> f32 {
        self.l2
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }
}

impl Default for FtrlParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            l1: 0.0,
            l2: 0.0,
            model_type: ModelType::Classification,
        }
    }
}

/// Row ordering used by each training pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shuffle {
    /// Visit rows in matrix order
    #[default]
    None,
    /// Reshuffle rows before every pass with a seeded generator
    Seeded(u64),
}

/// Configuration for a training call
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of full sweeps over the matrix
    pub num_passes: usize,
    /// Whether the intercept accumulators are updated
    pub fit_intercept: bool,
    /// Row visiting order
    pub shuffle: Shuffle,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            num_passes: 1,
            fit_intercept: true,
            shuffle: Shuffle::None,
        }
    }
}

/// Mean loss observed during each pass of a fit call
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub pass_losses: Vec<f32>,
}

impl FitReport {
    /// Mean loss of the last pass (NaN if no pass ran)
    pub fn final_loss(&self) -> f32 {
        self.pass_losses.last().copied().unwrap_or(f32::NAN)
    }

    pub fn num_passes(&self) -> usize {
        self.pass_losses.len()
    }
}
