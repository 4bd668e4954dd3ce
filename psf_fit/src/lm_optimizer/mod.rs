//! Levenberg-Marquardt optimizer for profile fitting.
//!
//! Minimises `sum(f_i(p)^2)` for a problem that supplies normalised residuals
//! `f` and their column-oriented Jacobian. Termination follows the MINPACK
//! `lmder` conventions so callers can treat status codes 1-4 as success.
//! Uses f64 throughout; the normal equations are small (at most 6x6) and are
//! solved with a Cholesky factorisation.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Configuration for Levenberg-Marquardt optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of Jacobian evaluations.
    pub max_iterations: usize,
    /// Relative chi-square reduction (actual and predicted) below which the
    /// solve is considered converged.
    pub ftol: f64,
    /// Relative scaled step length below which the solve is considered converged.
    pub xtol: f64,
    /// Gradient cosine threshold. Zero disables the test, as in MINPACK.
    pub gtol: f64,
    /// Initial damping parameter.
    pub initial_lambda: f64,
    /// Factor to increase lambda on a rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on an accepted step.
    pub lambda_down: f64,
    /// Damping above which the solve gives up.
    pub max_lambda: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            initial_lambda: 0.001,
            lambda_up: 10.0,
            lambda_down: 0.1,
            max_lambda: 1e16,
        }
    }
}

impl LmConfig {
    pub fn validate(&self) {
        assert!(self.max_iterations > 0, "max_iterations must be at least 1");
        assert!(self.ftol >= 0.0, "ftol must be non-negative, got {}", self.ftol);
        assert!(self.xtol >= 0.0, "xtol must be non-negative, got {}", self.xtol);
        assert!(self.gtol >= 0.0, "gtol must be non-negative, got {}", self.gtol);
        assert!(
            self.initial_lambda > 0.0,
            "initial_lambda must be positive, got {}",
            self.initial_lambda
        );
        assert!(
            self.lambda_up > 1.0,
            "lambda_up must be > 1, got {}",
            self.lambda_up
        );
        assert!(
            self.lambda_down > 0.0 && self.lambda_down < 1.0,
            "lambda_down must be in (0, 1), got {}",
            self.lambda_down
        );
        assert!(
            self.max_lambda > self.initial_lambda,
            "max_lambda must exceed initial_lambda, got {}",
            self.max_lambda
        );
    }
}

/// Termination status. Numbering follows MINPACK `lmder` where it overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LmStatus {
    /// Fewer residuals than parameters, or a parameter vector of the wrong length.
    ImproperInput,
    /// Actual and predicted relative chi-square reduction are both at most `ftol`.
    ChiSquareConverged,
    /// Relative scaled step is at most `xtol`.
    ParamsConverged,
    /// Both chi-square and step criteria hold.
    BothConverged,
    /// Residual vector is orthogonal to the Jacobian columns within `gtol`,
    /// or the chi-square is exactly zero.
    GradientConverged,
    MaxIterations,
    DampingOverflow,
    /// The residuals at the starting point are not finite.
    NonFiniteResiduals,
}

impl LmStatus {
    pub fn code(self) -> i32 {
        match self {
            LmStatus::ImproperInput => 0,
            LmStatus::ChiSquareConverged => 1,
            LmStatus::ParamsConverged => 2,
            LmStatus::BothConverged => 3,
            LmStatus::GradientConverged => 4,
            LmStatus::MaxIterations => 5,
            LmStatus::DampingOverflow => 6,
            LmStatus::NonFiniteResiduals => 7,
        }
    }

    pub fn is_success(self) -> bool {
        (1..=4).contains(&self.code())
    }

    pub fn message(self) -> &'static str {
        match self {
            LmStatus::ImproperInput => "improper input parameters",
            LmStatus::ChiSquareConverged => "relative reduction in chi-square is at most ftol",
            LmStatus::ParamsConverged => "relative change between iterates is at most xtol",
            LmStatus::BothConverged => "chi-square and parameter changes are both below tolerance",
            LmStatus::GradientConverged => "residuals are orthogonal to the Jacobian columns",
            LmStatus::MaxIterations => "maximum number of iterations reached",
            LmStatus::DampingOverflow => "damping grew without finding a better step",
            LmStatus::NonFiniteResiduals => "residuals are not finite at the starting point",
        }
    }

    fn from_flags(chi2_converged: bool, params_converged: bool) -> Option<Self> {
        match (chi2_converged, params_converged) {
            (true, true) => Some(LmStatus::BothConverged),
            (true, false) => Some(LmStatus::ChiSquareConverged),
            (false, true) => Some(LmStatus::ParamsConverged),
            (false, false) => None,
        }
    }
}

/// A weighted least-squares problem.
pub trait LeastSquaresProblem {
    fn n_params(&self) -> usize;

    fn n_residuals(&self) -> usize;

    /// Normalised residuals at `params`. `out` is cleared first.
    fn residuals(&self, params: &[f64], out: &mut Vec<f64>);

    /// Column-oriented Jacobian of the residuals: `out[k][i] = d f_i / d p_k`.
    /// `out` has `n_params()` columns; each is cleared first.
    fn jacobian(&self, params: &[f64], out: &mut [Vec<f64>]);
}

/// Result of L-M optimization.
#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: Vec<f64>,
    /// Unscaled covariance `(J^T J)^-1` at the solution. `None` when the
    /// solve failed or the normal matrix is singular.
    pub covariance: Option<DMatrix<f64>>,
    pub chi2: f64,
    pub status: LmStatus,
    pub iterations: usize,
}

impl LmSolution {
    fn failed(params: Vec<f64>, chi2: f64, status: LmStatus, iterations: usize) -> Self {
        Self {
            params,
            covariance: None,
            chi2,
            status,
            iterations,
        }
    }

    /// Square roots of the covariance diagonal.
    pub fn standard_errors(&self) -> Option<Vec<f64>> {
        self.covariance
            .as_ref()
            .map(|c| c.diagonal().iter().map(|v| v.sqrt()).collect())
    }
}

/// Run L-M optimization from `initial`.
pub fn optimize<P: LeastSquaresProblem>(
    problem: &P,
    initial: &[f64],
    config: &LmConfig,
) -> LmSolution {
    let n = problem.n_params();
    let m = problem.n_residuals();
    let mut params = DVector::from_column_slice(initial);

    if initial.len() != n || m < n || n == 0 {
        return LmSolution::failed(params.as_slice().to_vec(), f64::NAN, LmStatus::ImproperInput, 0);
    }

    let mut residuals = Vec::with_capacity(m);
    let mut trial_residuals = Vec::with_capacity(m);
    let mut jacobian = vec![Vec::with_capacity(m); n];

    problem.residuals(params.as_slice(), &mut residuals);
    let mut chi2 = sum_squares(&residuals);
    if !chi2.is_finite() {
        return LmSolution::failed(
            params.as_slice().to_vec(),
            chi2,
            LmStatus::NonFiniteResiduals,
            0,
        );
    }

    let mut lambda = config.initial_lambda;
    let mut status = LmStatus::MaxIterations;
    let mut iterations = 0;

    'outer: for iter in 0..config.max_iterations {
        iterations = iter + 1;

        if chi2 == 0.0 {
            status = LmStatus::GradientConverged;
            break;
        }

        problem.jacobian(params.as_slice(), &mut jacobian);
        let (hessian, gradient) = normal_equations(&jacobian, &residuals);

        if gradient_cosine(&hessian, &gradient, chi2) <= config.gtol {
            status = LmStatus::GradientConverged;
            break;
        }

        let scale: DVector<f64> = hessian.diagonal().map(f64::sqrt);
        let diag_floor = hessian.diagonal().max() * f64::EPSILON;
        let diag_floor = if diag_floor > 0.0 {
            diag_floor
        } else {
            f64::MIN_POSITIVE
        };
        let neg_gradient = -&gradient;

        loop {
            let mut damped = hessian.clone();
            for i in 0..n {
                damped[(i, i)] += lambda * hessian[(i, i)].max(diag_floor);
            }

            let Some(step) = damped.cholesky().map(|c| c.solve(&neg_gradient)) else {
                lambda *= config.lambda_up;
                if lambda > config.max_lambda {
                    status = LmStatus::DampingOverflow;
                    break 'outer;
                }
                continue;
            };

            let trial = &params + &step;
            problem.residuals(trial.as_slice(), &mut trial_residuals);
            let trial_chi2 = sum_squares(&trial_residuals);

            // Quadratic-model prediction of the chi-square decrease.
            let predicted = -(2.0 * gradient.dot(&step) + (&hessian * &step).dot(&step)) / chi2;
            let actual = (chi2 - trial_chi2) / chi2;
            let chi2_converged =
                trial_chi2.is_finite() && actual.abs() <= config.ftol && predicted <= config.ftol;
            let params_converged =
                step.component_mul(&scale).norm() <= config.xtol * params.component_mul(&scale).norm();

            if trial_chi2.is_finite() && trial_chi2 < chi2 {
                params = trial;
                std::mem::swap(&mut residuals, &mut trial_residuals);
                chi2 = trial_chi2;
                lambda = (lambda * config.lambda_down).max(f64::MIN_POSITIVE);

                if let Some(s) = LmStatus::from_flags(chi2_converged, params_converged) {
                    status = s;
                    break 'outer;
                }
                break;
            }

            if let Some(s) = LmStatus::from_flags(chi2_converged, params_converged) {
                status = s;
                break 'outer;
            }

            lambda *= config.lambda_up;
            if lambda > config.max_lambda {
                status = LmStatus::DampingOverflow;
                break 'outer;
            }
        }
    }

    let params = params.as_slice().to_vec();
    if !status.is_success() {
        return LmSolution::failed(params, chi2, status, iterations);
    }

    problem.jacobian(&params, &mut jacobian);
    let (hessian, _) = normal_equations(&jacobian, &residuals);
    let covariance = hessian.cholesky().map(|c| c.inverse());

    LmSolution {
        params,
        covariance,
        chi2,
        status,
        iterations,
    }
}

#[inline]
fn sum_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// `J^T J` and `J^T f` from column-oriented Jacobian. Only the upper triangle
/// is accumulated, then mirrored.
pub(crate) fn normal_equations(
    jacobian: &[Vec<f64>],
    residuals: &[f64],
) -> (DMatrix<f64>, DVector<f64>) {
    let n = jacobian.len();
    let mut hessian = DMatrix::zeros(n, n);
    let mut gradient = DVector::zeros(n);

    for i in 0..n {
        let ci = &jacobian[i];
        gradient[i] = ci.iter().zip(residuals).map(|(a, r)| a * r).sum();
        for j in i..n {
            let value: f64 = ci.iter().zip(&jacobian[j]).map(|(a, b)| a * b).sum();
            hessian[(i, j)] = value;
            hessian[(j, i)] = value;
        }
    }

    (hessian, gradient)
}

/// Largest |cos| of the angle between the residual vector and any Jacobian column.
fn gradient_cosine(hessian: &DMatrix<f64>, gradient: &DVector<f64>, chi2: f64) -> f64 {
    let fnorm = chi2.sqrt();
    gradient
        .iter()
        .enumerate()
        .filter_map(|(i, g)| {
            let cnorm = hessian[(i, i)].sqrt();
            (cnorm > 0.0).then(|| (g / (cnorm * fnorm)).abs())
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests;
