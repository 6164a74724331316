//! Elastic-net linear regression

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

fn default_max_iter() -> usize {
    1000
}

fn default_tol() -> f64 {
    1e-4
}

/// Hyperparameters of an elastic-net fit, as read from `params.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetParams {
    /// Overall regularization strength
    pub alpha: f64,
    /// L1 ratio (0.0 = pure L2/Ridge, 1.0 = pure L1/Lasso)
    pub l1_ratio: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_tol")]
    pub tol: f64,
}

impl Default for ElasticNetParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            l1_ratio: 0.5,
            max_iter: default_max_iter(),
            tol: default_tol(),
        }
    }
}

/// Elastic Net Regression (L1 + L2 regularization via coordinate descent)
///
/// Minimises `1/(2n) * ||y - Xw - b||^2 + alpha * l1_ratio * ||w||_1
/// + 0.5 * alpha * (1 - l1_ratio) * ||w||^2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNetRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    pub fit_intercept: bool,
    /// Overall regularization strength
    pub alpha: f64,
    /// L1 ratio (0.0 = pure L2/Ridge, 1.0 = pure L1/Lasso)
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
    /// Coordinate-descent sweeps used by the last fit
    pub n_iter: usize,
    pub is_fitted: bool,
}

impl Default for ElasticNetRegression {
    fn default() -> Self {
        Self::from_params(&ElasticNetParams::default())
    }
}

impl ElasticNetRegression {
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        Self::from_params(&ElasticNetParams {
            alpha,
            l1_ratio,
            ..Default::default()
        })
    }

    pub fn from_params(params: &ElasticNetParams) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            alpha: params.alpha,
            l1_ratio: params.l1_ratio,
            max_iter: params.max_iter,
            tol: params.tol,
            n_iter: 0,
            is_fitted: false,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Soft-threshold operator for the L1 proximal step
    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }

    fn check_params(&self) -> Result<()> {
        if !(self.alpha >= 0.0 && self.alpha.is_finite()) {
            return Err(PipelineError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be a finite value >= 0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(PipelineError::InvalidParameter {
                name: "l1_ratio".to_string(),
                value: self.l1_ratio.to_string(),
                reason: "must be within [0, 1]".to_string(),
            });
        }
        if self.max_iter == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "max_iter".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        self.check_params()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PipelineError::EmptyDataset("training set has no rows".to_string()));
        }
        if n_features == 0 {
            return Err(PipelineError::TrainingError(
                "training set has no feature columns".to_string(),
            ));
        }

        let (x_c, y_c, x_mean, y_mean) = if self.fit_intercept {
            let xm = x
                .mean_axis(Axis(0))
                .ok_or_else(|| PipelineError::EmptyDataset("training set has no rows".into()))?;
            let ym = y.mean().unwrap_or(0.0);
            (x - &xm.clone().insert_axis(Axis(0)), y - ym, Some(xm), Some(ym))
        } else {
            (x.clone(), y.clone(), None, None)
        };

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).mapv(|v| v * v).sum())
            .collect();

        let n = n_samples as f64;
        let l1_penalty = self.alpha * self.l1_ratio * n;
        let l2_penalty = self.alpha * (1.0 - self.l1_ratio) * n;

        let mut w = Array1::<f64>::zeros(n_features);
        // Residual y - Xw, kept current across coordinate updates
        let mut r = y_c.clone();
        let mut converged = false;

        for iter in 1..=self.max_iter {
            let mut max_delta = 0.0_f64;
            let mut max_weight = 0.0_f64;

            for j in 0..n_features {
                let denom = col_norms[j] + l2_penalty;
                if denom < 1e-15 {
                    continue;
                }
                let col = x_c.column(j);
                let old_wj = w[j];
                let rho = col.dot(&r) + col_norms[j] * old_wj;
                let new_wj = Self::soft_threshold(rho, l1_penalty) / denom;

                if new_wj != old_wj {
                    r.scaled_add(old_wj - new_wj, &col);
                    w[j] = new_wj;
                }
                max_delta = max_delta.max((new_wj - old_wj).abs());
                max_weight = max_weight.max(new_wj.abs());
            }

            if max_weight == 0.0 || max_delta / max_weight < self.tol {
                self.n_iter = iter;
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(PipelineError::ConvergenceError {
                iterations: self.max_iter,
            });
        }

        self.intercept = match (x_mean, y_mean) {
            (Some(xm), Some(ym)) => Some(ym - w.dot(&xm)),
            _ => Some(0.0),
        };
        self.coefficients = Some(w);
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = match (&self.coefficients, self.is_fitted) {
            (Some(c), true) => c,
            _ => return Err(PipelineError::ModelNotFitted),
        };
        if x.ncols() != coefficients.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} feature columns", coefficients.len()),
                actual: format!("{} feature columns", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    /// Coefficient of determination on `(x, y)`
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let p = self.predict(x)?;
        Ok(super::metrics::eval_metrics(y, &p)?.r2)
    }
}
