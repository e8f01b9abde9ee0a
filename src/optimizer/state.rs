//! Mutable FTRL model state
//!
//! Per-feature accumulators live in three parallel buffers (`n`, `z`, `w`);
//! the always-active intercept carries the same triple as scalars. Storage is
//! owned by the value and released when it is dropped, so replacing a state
//! frees the previous buffers exactly once.

use crate::core::{FtrlError, FtrlParams, Result};

/// Accumulator triple for one coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coordinate {
    /// Cumulative squared gradient
    pub n: f32,
    /// Dual-average accumulator
    pub z: f32,
    /// Proximal weight derived from `n` and `z`
    pub w: f32,
}

/// Per-feature and intercept accumulators plus the live weight vector
#[derive(Debug, Clone, PartialEq)]
pub struct ModelState {
    params: FtrlParams,
    pub(crate) n: Box<[f32]>,
    pub(crate) z: Box<[f32]>,
    pub(crate) w: Box<[f32]>,
    pub(crate) intercept: Coordinate,
}

impl ModelState {
    /// Create a zeroed state for `num_features` features
    pub fn new(params: FtrlParams, num_features: usize) -> Result<Self> {
        if num_features == 0 {
            return Err(FtrlError::InvalidParameter(
                "num_features must be > 0".to_string(),
            ));
        }

        Ok(Self {
            params,
            n: vec![0.0; num_features].into_boxed_slice(),
            z: vec![0.0; num_features].into_boxed_slice(),
            w: vec![0.0; num_features].into_boxed_slice(),
            intercept: Coordinate::default(),
        })
    }

    /// Rebuild a state from stored parts without recomputing weights
    pub(crate) fn from_parts(
        params: FtrlParams,
        intercept: Coordinate,
        n: Vec<f32>,
        z: Vec<f32>,
        w: Vec<f32>,
    ) -> Result<Self> {
        if n.is_empty() || n.len() != z.len() || n.len() != w.len() {
            return Err(FtrlError::DecodeError(format!(
                "accumulator lengths disagree: n={}, z={}, w={}",
                n.len(),
                z.len(),
                w.len()
            )));
        }

        Ok(Self {
            params,
            n: n.into_boxed_slice(),
            z: z.into_boxed_slice(),
            w: w.into_boxed_slice(),
            intercept,
        })
    }

    pub fn params(&self) -> &FtrlParams {
        &self.params
    }

    pub fn num_features(&self) -> usize {
        self.w.len()
    }

    /// Cumulative squared gradients per feature
    pub fn n(&self) -> &[f32] {
        &self.n
    }

    /// Dual-average accumulators per feature
    pub fn z(&self) -> &[f32] {
        &self.z
    }

    /// Current proximal weights per feature
    pub fn w(&self) -> &[f32] {
        &self.w
    }

    pub fn intercept(&self) -> Coordinate {
        self.intercept
    }

    /// Intercept weight and per-feature weights, read without recomputation
    pub fn weights(&self) -> (f32, &[f32]) {
        (self.intercept.w, &self.w)
    }

    /// Number of features whose weight is exactly zero
    pub fn num_zero_weights(&self) -> usize {
        self.w.iter().filter(|&&w| w == 0.0).count()
    }

    /// Check that every index of `row` addresses a feature of this state
    pub(crate) fn check_row(&self, row: &[u32]) -> Result<()> {
        let num_features = self.num_features();
        match row.iter().find(|&&i| i as usize >= num_features) {
            Some(&i) => Err(FtrlError::ShapeMismatch(format!(
                "feature index {i} is out of range for a model with {num_features} features"
            ))),
            None => Ok(()),
        }
    }
}
