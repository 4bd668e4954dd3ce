//! Tests for the Levenberg-Marquardt optimizer.

use super::*;

/// Straight line `a + b*x` with uniform uncertainty.
struct Line {
    x: Vec<f64>,
    y: Vec<f64>,
    sigma: f64,
}

impl LeastSquaresProblem for Line {
    fn n_params(&self) -> usize {
        2
    }

    fn n_residuals(&self) -> usize {
        self.x.len()
    }

    fn residuals(&self, params: &[f64], out: &mut Vec<f64>) {
        out.clear();
        out.extend(
            self.x
                .iter()
                .zip(&self.y)
                .map(|(&x, &y)| (y - params[0] - params[1] * x) / self.sigma),
        );
    }

    fn jacobian(&self, _params: &[f64], out: &mut [Vec<f64>]) {
        out[0].clear();
        out[0].extend(self.x.iter().map(|_| -1.0 / self.sigma));
        out[1].clear();
        out[1].extend(self.x.iter().map(|&x| -x / self.sigma));
    }
}

/// `amp * exp(-rate * t)`
struct Decay {
    t: Vec<f64>,
    y: Vec<f64>,
}

impl LeastSquaresProblem for Decay {
    fn n_params(&self) -> usize {
        2
    }

    fn n_residuals(&self) -> usize {
        self.t.len()
    }

    fn residuals(&self, params: &[f64], out: &mut Vec<f64>) {
        let [amp, rate] = [params[0], params[1]];
        out.clear();
        out.extend(
            self.t
                .iter()
                .zip(&self.y)
                .map(|(&t, &y)| y - amp * (-rate * t).exp()),
        );
    }

    fn jacobian(&self, params: &[f64], out: &mut [Vec<f64>]) {
        let [amp, rate] = [params[0], params[1]];
        out[0].clear();
        out[0].extend(self.t.iter().map(|&t| -(-rate * t).exp()));
        out[1].clear();
        out[1].extend(self.t.iter().map(|&t| amp * t * (-rate * t).exp()));
    }
}

fn make_decay(amp: f64, rate: f64) -> Decay {
    let t: Vec<f64> = (0..40).map(|i| i as f64 * 0.1).collect();
    let y = t.iter().map(|&t| amp * (-rate * t).exp()).collect();
    Decay { t, y }
}

#[test]
fn test_status_codes_follow_minpack() {
    assert_eq!(LmStatus::ImproperInput.code(), 0);
    assert_eq!(LmStatus::ChiSquareConverged.code(), 1);
    assert_eq!(LmStatus::ParamsConverged.code(), 2);
    assert_eq!(LmStatus::BothConverged.code(), 3);
    assert_eq!(LmStatus::GradientConverged.code(), 4);
    assert_eq!(LmStatus::MaxIterations.code(), 5);

    assert!(!LmStatus::ImproperInput.is_success());
    assert!(LmStatus::ChiSquareConverged.is_success());
    assert!(LmStatus::GradientConverged.is_success());
    assert!(!LmStatus::MaxIterations.is_success());
    assert!(!LmStatus::DampingOverflow.is_success());
    assert!(!LmStatus::NonFiniteResiduals.is_success());
}

#[test]
fn test_line_fit_recovers_exact_parameters() {
    let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let y = x.iter().map(|&x| 3.0 + 0.5 * x).collect();
    let problem = Line { x, y, sigma: 2.0 };

    let result = optimize(&problem, &[0.0, 0.0], &LmConfig::default());

    assert!(result.status.is_success(), "{:?}", result.status);
    assert!((result.params[0] - 3.0).abs() < 1e-8);
    assert!((result.params[1] - 0.5).abs() < 1e-9);
    assert!(result.chi2 < 1e-12);
}

#[test]
fn test_line_covariance_matches_analytic() {
    let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(i, &x)| 1.0 + 2.0 * x + if i % 2 == 0 { 0.3 } else { -0.3 })
        .collect();
    let sigma = 0.5;
    let problem = Line {
        x: x.clone(),
        y,
        sigma,
    };

    let result = optimize(&problem, &[0.0, 1.0], &LmConfig::default());
    assert!(result.status.is_success());
    let cov = result.covariance.as_ref().expect("covariance");

    // (X^T X / sigma^2)^-1 for design matrix rows [1, x]
    let n = x.len() as f64;
    let sx: f64 = x.iter().sum();
    let sxx: f64 = x.iter().map(|v| v * v).sum();
    let det = n * sxx - sx * sx;
    let var_a = sigma * sigma * sxx / det;
    let var_b = sigma * sigma * n / det;
    let cov_ab = -sigma * sigma * sx / det;

    assert!((cov[(0, 0)] - var_a).abs() < 1e-10);
    assert!((cov[(1, 1)] - var_b).abs() < 1e-10);
    assert!((cov[(0, 1)] - cov_ab).abs() < 1e-10);

    let errors = result.standard_errors().unwrap();
    assert!((errors[0] - var_a.sqrt()).abs() < 1e-10);
}

#[test]
fn test_decay_converges_from_far_start() {
    let problem = make_decay(5.0, 0.7);

    let result = optimize(&problem, &[1.0, 0.1], &LmConfig::default());

    assert!(result.status.is_success(), "{:?}", result.status);
    assert!((result.params[0] - 5.0).abs() < 1e-6);
    assert!((result.params[1] - 0.7).abs() < 1e-6);
}

#[test]
fn test_exact_start_is_gradient_converged() {
    let problem = make_decay(2.0, 0.3);

    let result = optimize(&problem, &[2.0, 0.3], &LmConfig::default());

    assert_eq!(result.status, LmStatus::GradientConverged);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.params, vec![2.0, 0.3]);
}

#[test]
fn test_too_few_residuals_is_improper_input() {
    let problem = Line {
        x: vec![1.0],
        y: vec![2.0],
        sigma: 1.0,
    };

    let result = optimize(&problem, &[0.0, 0.0], &LmConfig::default());

    assert_eq!(result.status, LmStatus::ImproperInput);
    assert!(result.covariance.is_none());
}

#[test]
fn test_wrong_parameter_count_is_improper_input() {
    let problem = make_decay(1.0, 1.0);
    let result = optimize(&problem, &[1.0], &LmConfig::default());
    assert_eq!(result.status, LmStatus::ImproperInput);
}

#[test]
fn test_non_finite_start_is_reported() {
    let mut problem = make_decay(1.0, 1.0);
    problem.y[3] = f64::NAN;

    let result = optimize(&problem, &[1.0, 1.0], &LmConfig::default());

    assert_eq!(result.status, LmStatus::NonFiniteResiduals);
    assert!(!result.status.is_success());
}

#[test]
fn test_iteration_cap_reports_failure() {
    let problem = make_decay(5.0, 0.7);
    let config = LmConfig {
        max_iterations: 1,
        ..LmConfig::default()
    };

    let result = optimize(&problem, &[1.0, 0.1], &config);

    assert_eq!(result.status, LmStatus::MaxIterations);
    assert!(result.covariance.is_none());
}

#[test]
fn test_normal_equations_symmetric() {
    let jacobian = vec![vec![1.0, 2.0, 3.0], vec![0.5, -1.0, 2.0]];
    let residuals = [1.0, 1.0, -1.0];

    let (h, g) = normal_equations(&jacobian, &residuals);

    assert_eq!(h[(0, 0)], 14.0);
    assert_eq!(h[(1, 1)], 5.25);
    assert_eq!(h[(0, 1)], 4.5);
    assert_eq!(h[(1, 0)], 4.5);
    assert_eq!(g[0], 0.0);
    assert_eq!(g[1], -2.5);
}

#[test]
#[should_panic(expected = "lambda_down must be in (0, 1)")]
fn test_config_validate_rejects_bad_lambda_down() {
    LmConfig {
        lambda_down: 2.0,
        ..LmConfig::default()
    }
    .validate();
}

#[test]
#[should_panic(expected = "max_lambda must exceed initial_lambda")]
fn test_config_validate_rejects_nan_max_lambda() {
    LmConfig {
        max_lambda: f64::NAN,
        ..LmConfig::default()
    }
    .validate();
}
