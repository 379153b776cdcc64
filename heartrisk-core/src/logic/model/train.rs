//! Logistic regression training
//!
//! Damped Newton (IRLS) on the L2-regularized log loss, with a backtracking
//! line search. The intercept is not penalized.

use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::inference::{sigmoid, Classifier, InferenceError, LogisticRegression};

/// Sufficient-decrease constant of the line search
const ARMIJO: f64 = 1e-4;
/// Smallest step tried before the line search gives up
const MIN_STEP: f64 = 1e-10;
/// Added to the Hessian diagonal so the unpenalized intercept stays solvable
const HESSIAN_JITTER: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the gradient norm drops below this
    pub tolerance: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            c: 10.0,
            max_iter: 100,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("no training samples")]
    EmptyDataset,
    #[error("{rows} feature rows but {labels} labels")]
    LabelCount { rows: usize, labels: usize },
    #[error("label at row {row} is {value}, expected 0 or 1")]
    InvalidLabel { row: usize, value: u8 },
    #[error("feature at row {row}, column {col} is not finite")]
    NonFiniteFeature { row: usize, col: usize },
    #[error("invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),
    #[error("Hessian not positive definite at iteration {0}")]
    SingularHessian(usize),
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: LogisticRegression,
    pub iterations: usize,
    pub converged: bool,
    pub final_loss: f64,
}

pub fn fit_logistic_regression(
    features: ArrayView2<'_, f64>,
    labels: &[u8],
    config: &TrainerConfig,
) -> Result<TrainingOutcome, TrainingError> {
    let (rows, cols) = features.dim();
    if rows == 0 {
        return Err(TrainingError::EmptyDataset);
    }
    if labels.len() != rows {
        return Err(TrainingError::LabelCount { rows, labels: labels.len() });
    }
    if let Some((row, &value)) = labels.iter().enumerate().find(|&(_, &v)| v > 1) {
        return Err(TrainingError::InvalidLabel { row, value });
    }
    if let Some(((row, col), _)) = features.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(TrainingError::NonFiniteFeature { row, col });
    }
    if !(config.c > 0.0) || !config.c.is_finite() {
        return Err(TrainingError::InvalidHyperparameter(format!("C={}", config.c)));
    }

    let n = rows as f64;
    let y: Array1<f64> = labels.iter().map(|&l| f64::from(l)).collect();
    let penalty = 1.0 / (config.c * n);

    // Last column is the intercept
    let mut design = Array2::<f64>::ones((rows, cols + 1));
    design.slice_mut(s![.., ..cols]).assign(&features);

    let mut reg = Array1::<f64>::from_elem(cols + 1, penalty);
    reg[cols] = 0.0;

    let objective = |theta: &Array1<f64>| -> f64 {
        let z = design.dot(theta);
        let data: f64 = z.iter().zip(y.iter()).map(|(&z, &y)| softplus(z) - y * z).sum::<f64>() / n;
        let w = theta.slice(s![..cols]);
        data + 0.5 * penalty * w.dot(&w)
    };

    let mut theta = Array1::<f64>::zeros(cols + 1);
    let mut loss = objective(&theta);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        let p = design.dot(&theta).mapv(sigmoid);
        let grad = design.t().dot(&(&p - &y)) / n + &reg * &theta;

        if grad.dot(&grad).sqrt() < config.tolerance {
            converged = true;
            break;
        }
        iterations += 1;

        let curvature = p.mapv(|p| p * (1.0 - p));
        let weighted = &design * &curvature.insert_axis(Axis(1));
        let mut hessian = design.t().dot(&weighted) / n;
        for (j, r) in reg.iter().enumerate() {
            hessian[[j, j]] += r + HESSIAN_JITTER;
        }

        let direction = cholesky_solve(&hessian, &grad).ok_or(TrainingError::SingularHessian(iterations))?;
        let decrement = grad.dot(&direction);
        let slack = 4.0 * f64::EPSILON * (1.0 + loss.abs());

        let mut step = 1.0;
        let accepted = loop {
            let candidate = &theta - &(&direction * step);
            let candidate_loss = objective(&candidate);
            if candidate_loss <= loss - ARMIJO * step * decrement + slack {
                break Some((candidate, candidate_loss));
            }
            step *= 0.5;
            if step < MIN_STEP {
                break None;
            }
        };

        match accepted {
            Some((candidate, candidate_loss)) => {
                theta = candidate;
                loss = candidate_loss;
            }
            None => {
                log::warn!("Line search stalled at iteration {} (loss {:.6})", iterations, loss);
                break;
            }
        }
    }

    if converged {
        log::info!("Logistic regression converged after {} iterations (loss {:.6})", iterations, loss);
    } else {
        log::warn!("Logistic regression stopped after {} iterations without converging (loss {:.6})", iterations, loss);
    }

    Ok(TrainingOutcome {
        model: LogisticRegression::new(theta.slice(s![..cols]).to_vec(), theta[cols]),
        iterations,
        converged,
        final_loss: loss,
    })
}

/// `ln(1 + e^z)` without overflow
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

/// Solve `a · x = b` for symmetric positive-definite `a`
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let dim = b.len();
    let mut l = Array2::<f64>::zeros((dim, dim));

    for i in 0..dim {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if !(diag > 0.0) || !diag.is_finite() {
                    return None;
                }
                l[[i, i]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L · z = b
    let mut z = Array1::<f64>::zeros(dim);
    for i in 0..dim {
        let sum: f64 = (0..i).map(|k| l[[i, k]] * z[k]).sum();
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ · x = z
    let mut x = Array1::<f64>::zeros(dim);
    for i in (0..dim).rev() {
        let sum: f64 = (i + 1..dim).map(|k| l[[k, i]] * x[k]).sum();
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Fraction of rows where the predicted label matches
pub fn accuracy(
    model: &dyn Classifier,
    features: ArrayView2<'_, f64>,
    labels: &[u8],
) -> Result<f64, InferenceError> {
    if labels.is_empty() {
        return Ok(0.0);
    }

    let predicted = model.predict(features)?;
    let correct = predicted.iter().zip(labels).filter(|(p, l)| p == l).count();
    Ok(correct as f64 / labels.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_data() {
        let x = array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]];
        let y = [0, 0, 0, 1, 1, 1];

        let outcome = fit_logistic_regression(x.view(), &y, &TrainerConfig::default()).unwrap();
        assert!(outcome.converged);
        assert!(outcome.model.coefficients()[0] > 0.0);
        assert_eq!(accuracy(&outcome.model, x.view(), &y).unwrap(), 1.0);
        assert!(outcome.final_loss < 0.5);
    }

    #[test]
    fn test_stronger_regularization_shrinks_weights() {
        let x = array![[-2.0], [-1.0], [1.0], [2.0]];
        let y = [0, 0, 1, 1];

        let loose = fit_logistic_regression(x.view(), &y, &TrainerConfig::default()).unwrap();
        let tight = fit_logistic_regression(
            x.view(),
            &y,
            &TrainerConfig { c: 0.01, ..TrainerConfig::default() },
        )
        .unwrap();

        assert!(tight.converged);
        assert!(tight.model.coefficients()[0] > 0.0);
        assert!(tight.model.coefficients()[0].abs() < loose.model.coefficients()[0].abs());
    }

    #[test]
    fn test_any_positive_c_trains_on_tiny_data() {
        let x = array![[-1.0, 0.5], [1.0, -0.5]];
        let y = [0, 1];

        for c in [1e-6, 1e-3, 0.01, 1.0, 1e4] {
            let outcome = fit_logistic_regression(x.view(), &y, &TrainerConfig { c, ..TrainerConfig::default() })
                .unwrap_or_else(|e| panic!("C={} failed: {}", c, e));
            assert!(outcome.converged, "C={} did not converge", c);
            assert!(outcome.model.coefficients().iter().all(|w| w.is_finite()));
            assert!(outcome.final_loss.is_finite());
        }
    }

    #[test]
    fn test_rare_scaled_indicator_converges() {
        // Scale-only one-hot of a 1%-frequency category: both indicators ~10
        let n = 200;
        let scale = (0.01f64 * 0.99).sqrt();
        let mut x = Array2::<f64>::zeros((n, 3));
        let mut y = Vec::with_capacity(n);

        for i in 0..n {
            let rare = i % 100 == 0;
            let value = ((i % 20) as f64 - 9.5) / 5.77;
            x[[i, 0]] = value;
            x[[i, 1]] = if rare { 0.0 } else { 1.0 / scale };
            x[[i, 2]] = if rare { 1.0 / scale } else { 0.0 };
            y.push(u8::from((value > 0.0) != (i % 17 == 0)));
        }

        let config = TrainerConfig::default();
        let outcome = fit_logistic_regression(x.view(), &y, &config).unwrap();

        assert!(outcome.converged);
        assert!(outcome.iterations < config.max_iter);
        assert!(accuracy(&outcome.model, x.view(), &y).unwrap() > 0.8);
    }

    #[test]
    fn test_constant_labels_push_bias() {
        let x = array![[0.5, -0.5], [-0.5, 0.5], [0.0, 0.0]];
        let outcome = fit_logistic_regression(x.view(), &[1, 1, 1], &TrainerConfig::default()).unwrap();
        assert!(outcome.model.intercept() > 0.0);
    }

    #[test]
    fn test_final_loss_is_penalized_objective() {
        let x = array![[-2.0], [-0.5], [0.5], [2.0]];
        let y = [0, 1, 0, 1];
        let config = TrainerConfig::default();

        let outcome = fit_logistic_regression(x.view(), &y, &config).unwrap();
        let w = outcome.model.coefficients()[0];
        let penalty = 0.5 * w * w / (config.c * 4.0);

        let scores = outcome.model.decision_function(x.view()).unwrap();
        let data: f64 = scores
            .iter()
            .zip(y)
            .map(|(&z, y)| softplus(z) - f64::from(y) * z)
            .sum::<f64>()
            / 4.0;
        assert!((outcome.final_loss - (data + penalty)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let x = array![[1.0], [2.0]];
        let config = TrainerConfig::default();

        assert!(matches!(
            fit_logistic_regression(x.view(), &[0], &config),
            Err(TrainingError::LabelCount { rows: 2, labels: 1 })
        ));
        assert!(matches!(
            fit_logistic_regression(x.view(), &[0, 2], &config),
            Err(TrainingError::InvalidLabel { row: 1, value: 2 })
        ));
        assert!(matches!(
            fit_logistic_regression(x.view(), &[0, 1], &TrainerConfig { c: 0.0, ..config }),
            Err(TrainingError::InvalidHyperparameter(_))
        ));

        let nan = array![[1.0], [f64::NAN]];
        assert!(matches!(
            fit_logistic_regression(nan.view(), &[0, 1], &config),
            Err(TrainingError::NonFiniteFeature { row: 1, col: 0 })
        ));

        let empty = Array2::<f64>::zeros((0, 1));
        assert!(matches!(
            fit_logistic_regression(empty.view(), &[], &config),
            Err(TrainingError::EmptyDataset)
        ));
    }

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let x = cholesky_solve(&a, &array![2.0, 5.0]).unwrap();
        assert!((x[0] + 0.5).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);

        let indefinite = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(cholesky_solve(&indefinite, &array![1.0, 1.0]).is_none());
    }
}
