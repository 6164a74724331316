//! Regression metrics

use crate::error::{PipelineError, Result};
use ndarray::{ArrayBase, Data, Dimension};
use serde::{Deserialize, Serialize};

/// Held-out regression quality, as written to the metrics file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    /// Metric name/value pairs in reporting order
    pub fn as_pairs(&self) -> [(&'static str, f64); 3] {
        [("rmse", self.rmse), ("mae", self.mae), ("r2", self.r2)]
    }
}

/// Compute RMSE, MAE and R² of `predicted` against `actual`.
///
/// Inputs of any dimensionality are accepted and compared element-wise, so a
/// column vector and a flat vector of the same length score the same. When
/// `actual` is constant, R² is 1.0 for an exact fit and 0.0 otherwise.
pub fn eval_metrics<S1, S2, D1, D2>(
    actual: &ArrayBase<S1, D1>,
    predicted: &ArrayBase<S2, D2>,
) -> Result<RegressionMetrics>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D1: Dimension,
    D2: Dimension,
{
    if actual.len() != predicted.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} predictions", actual.len()),
            actual: format!("{} predictions", predicted.len()),
        });
    }
    if actual.is_empty() {
        return Err(PipelineError::ShapeError {
            expected: "at least one observation".to_string(),
            actual: "0 observations".to_string(),
        });
    }

    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;

    let mut ss_res = 0.0;
    let mut abs_err = 0.0;
    let mut ss_tot = 0.0;
    for (&a, &p) in actual.iter().zip(predicted.iter()) {
        let e = a - p;
        ss_res += e * e;
        abs_err += e.abs();
        ss_tot += (a - mean) * (a - mean);
    }

    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    Ok(RegressionMetrics {
        rmse: (ss_res / n).sqrt(),
        mae: abs_err / n,
        r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use proptest::prelude::*;

    #[test]
    fn test_reference_values() {
        let actual = array![3.0, -0.5, 2.0, 7.0];
        let predicted = array![2.5, 0.0, 2.0, 8.0];
        let m = eval_metrics(&actual, &predicted).unwrap();

        assert!((m.rmse - 0.612_372_435_695_794_5).abs() < 1e-9);
        assert!((m.mae - 0.5).abs() < 1e-12);
        assert!((m.r2 - 0.948_608_137_044_967_9).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_prediction() {
        let y = array![1.0, 2.0, 3.0];
        let m = eval_metrics(&y, &y).unwrap();
        assert_eq!(m, RegressionMetrics { rmse: 0.0, mae: 0.0, r2: 1.0 });
    }

    #[test]
    fn test_column_vector_matches_flat() {
        let actual = array![[3.0], [-0.5], [2.0], [7.0]];
        let predicted = array![2.5, 0.0, 2.0, 8.0];
        let column = eval_metrics(&actual, &predicted).unwrap();
        let flat = eval_metrics(&actual.column(0), &predicted).unwrap();
        assert_eq!(column, flat);
    }

    #[test]
    fn test_constant_target() {
        let actual = array![5.0, 5.0, 5.0];
        assert_eq!(eval_metrics(&actual, &array![5.0, 5.0, 5.0]).unwrap().r2, 1.0);
        assert_eq!(eval_metrics(&actual, &array![4.0, 5.0, 6.0]).unwrap().r2, 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let result = eval_metrics(&array![1.0, 2.0], &array![1.0]);
        assert!(matches!(result, Err(PipelineError::ShapeError { .. })));
    }

    #[test]
    fn test_empty_input() {
        let empty = Array1::<f64>::zeros(0);
        assert!(eval_metrics(&empty, &empty).is_err());
    }

    proptest! {
        #[test]
        fn prop_metric_bounds(pairs in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 1..50)) {
            let actual: Array1<f64> = pairs.iter().map(|p| p.0).collect();
            let predicted: Array1<f64> = pairs.iter().map(|p| p.1).collect();
            let m = eval_metrics(&actual, &predicted).unwrap();

            prop_assert!(m.mae >= 0.0);
            prop_assert!(m.rmse >= m.mae - 1e-9);
            prop_assert!(m.r2 <= 1.0 + 1e-12);
        }
    }
}
