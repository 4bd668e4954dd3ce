//! Robust profile fitting: weighted least squares with a FWHM floor and
//! iterative sigma-clipping of outlying pixels.
//!
//! Each pass fits from the caller's initial parameters. When the FWHM is
//! free and the fit returns a FWHM at or below `fwhm_min`, the fit is
//! repeated with FWHM pinned to `fwhm_min`. Pixels whose normalised residual
//! exceeds `reject_threshold` times the RMS normalised residual are then
//! rejected and the pass repeats, until a pass rejects nothing. Standard
//! errors are finally scaled by `sqrt(chisq / (n_ok - n_params))`.


use common::Buffer2;

use crate::config::{FitConfig, FitOptions};
use crate::error::{FitError, Result};
use crate::lm_optimizer::{optimize, LeastSquaresProblem, LmConfig};
use crate::noise::{NoiseModel, SigmaMap};
use crate::profile::{ProfileKind, ProfileParams};
use crate::residual::{FwhmMode, ProfileResidual};
use crate::result::{summary, FitResult};
use crate::window::{CoordGrid, Window};

/// Fit a profile to `window` with uncertainties from `noise`.
pub fn fit_profile(
    window: &Window,
    kind: ProfileKind,
    initial: &ProfileParams,
    noise: &NoiseModel,
    options: &FitOptions,
    config: &FitConfig,
) -> Result<FitResult> {
    let sigma = noise.sigma_map(window.data())?;
    fit_profile_with_sigma(window, kind, initial, sigma, options, config)
}

/// [`fit_profile`] with the profile chosen by tag: `'g'` Gaussian, `'m'` Moffat.
pub fn fit_profile_tagged(
    window: &Window,
    method: char,
    initial: &ProfileParams,
    noise: &NoiseModel,
    options: &FitOptions,
    config: &FitConfig,
) -> Result<FitResult> {
    let kind = ProfileKind::try_from(method)?;
    fit_profile(window, kind, initial, noise, options, config)
}

/// Fit starting from an existing sigma map. Pixels already negative in
/// `sigma` stay rejected; the map returned in the result is this one with
/// any further rejections applied.
pub fn fit_profile_with_sigma(
    window: &Window,
    kind: ProfileKind,
    initial: &ProfileParams,
    mut sigma: SigmaMap,
    options: &FitOptions,
    config: &FitConfig,
) -> Result<FitResult> {
    options.validate();
    config.validate();

    let data = window.data();
    if sigma.dims() != data.dims() {
        return Err(FitError::ShapeMismatch {
            what: "sigma map",
            expected: data.dims(),
            actual: sigma.dims(),
        });
    }

    let grid = window.grid();
    let mut pass = 0;

    loop {
        pass += 1;

        let pass_fit = fit_pass(kind, initial, &grid, data, &sigma, options, &config.lm)?;
        let stats = ResidualStats::compute(data, &pass_fit.model, &sigma);
        let scale = stats.scale(pass_fit.n_params)?;
        let n_new = reject_outliers(&mut sigma, data, &pass_fit.model, scale * options.reject_threshold);

        tracing::debug!(
            "Rejection pass {}: chisq={:.3}, nok={}, scale={:.4}, newly rejected={}",
            pass,
            stats.chisq,
            stats.n_ok,
            scale,
            n_new
        );

        if n_new == 0 {
            return finish(kind, window, grid, sigma, pass_fit, stats, scale);
        }

        if config.max_rejection_passes.is_some_and(|max| pass >= max) {
            return Err(FitError::RejectionLimit { passes: pass });
        }
    }
}

/// Outcome of the FWHM strategy for one pixel set.
#[derive(Debug)]
struct PassFit {
    params: ProfileParams,
    /// Unscaled standard errors with `NOT_ESTIMATED` for fixed parameters.
    errors: ProfileParams,
    model: Buffer2<f64>,
    n_params: usize,
}

fn fit_pass(
    kind: ProfileKind,
    initial: &ProfileParams,
    grid: &CoordGrid,
    data: &Buffer2<f64>,
    sigma: &SigmaMap,
    options: &FitOptions,
    lm: &LmConfig,
) -> Result<PassFit> {
    if options.fwhm_fix {
        let mode = FwhmMode::Fixed(initial.fwhm);
        return solve(kind, mode, initial, grid, data, sigma, lm);
    }

    let free = solve(kind, FwhmMode::Free, initial, grid, data, sigma, lm)?;
    if free.params.fwhm > options.fwhm_min {
        return Ok(free);
    }

    tracing::debug!(
        "Free fit FWHM {:.3} at or below minimum {:.3}, refitting with FWHM fixed",
        free.params.fwhm,
        options.fwhm_min
    );
    let mode = FwhmMode::Fixed(options.fwhm_min);
    solve(kind, mode, initial, grid, data, sigma, lm)
}

fn solve(
    kind: ProfileKind,
    mode: FwhmMode,
    initial: &ProfileParams,
    grid: &CoordGrid,
    data: &Buffer2<f64>,
    sigma: &SigmaMap,
    lm: &LmConfig,
) -> Result<PassFit> {
    let problem = ProfileResidual::new(kind, mode, grid, data, sigma);
    let n_params = problem.n_params();
    let n_ok = problem.n_residuals();
    if n_ok <= n_params {
        return Err(FitError::DegenerateFit { n_ok, n_params });
    }

    let solution = optimize(&problem, &problem.pack(initial), lm);
    if !solution.status.is_success() {
        return Err(FitError::SolverFailure {
            status: solution.status,
        });
    }
    let errors = solution
        .standard_errors()
        .ok_or(FitError::SingularCovariance)?;

    Ok(PassFit {
        params: problem.unpack(&solution.params),
        errors: problem.unpack_errors(&errors),
        model: problem.model(&solution.params),
        n_params,
    })
}

#[derive(Debug, Clone, Copy)]
struct ResidualStats {
    chisq: f64,
    n_ok: usize,
}

impl ResidualStats {
    fn compute(data: &Buffer2<f64>, model: &Buffer2<f64>, sigma: &SigmaMap) -> Self {
        let s = sigma.values();
        let chisq = sigma
            .included()
            .map(|i| {
                let r = (data[i] - model[i]) / s[i];
                r * r
            })
            .sum();
        Self {
            chisq,
            n_ok: sigma.n_included(),
        }
    }

    /// `sqrt(chisq / (n_ok - n_params))`.
    fn scale(&self, n_params: usize) -> Result<f64> {
        if self.n_ok <= n_params || !self.chisq.is_finite() {
            return Err(FitError::DegenerateFit {
                n_ok: self.n_ok,
                n_params,
            });
        }
        Ok((self.chisq / (self.n_ok - n_params) as f64).sqrt())
    }
}

/// Reject included pixels with `|data - model| / sigma > limit`. Returns the
/// number newly rejected.
fn reject_outliers(sigma: &mut SigmaMap, data: &Buffer2<f64>, model: &Buffer2<f64>, limit: f64) -> usize {
    let outliers: Vec<usize> = sigma
        .included()
        .filter(|&i| ((data[i] - model[i]) / sigma.values()[i]).abs() > limit)
        .collect();
    for &i in &outliers {
        sigma.reject(i);
    }
    outliers.len()
}

fn finish(
    kind: ProfileKind,
    window: &Window,
    grid: CoordGrid,
    sigma: SigmaMap,
    pass_fit: PassFit,
    stats: ResidualStats,
    scale: f64,
) -> Result<FitResult> {
    // Only estimated errors are non-negative.
    let errors = ProfileParams::from_array(
        pass_fit
            .errors
            .to_array()
            .map(|e| if e >= 0.0 { e * scale } else { e }),
    );
    let n_ok = sigma.n_included();
    let n_rejected = sigma.n_rejected();
    let message = summary(kind, &pass_fit.params, &errors, stats.chisq, n_ok, n_rejected);
    tracing::info!("{} fit: {}", kind, message);

    Ok(FitResult {
        kind,
        params: pass_fit.params,
        errors,
        fit: window.with_data(pass_fit.model)?,
        grid,
        sigma,
        chisq: stats.chisq,
        n_ok,
        n_rejected,
        n_params: pass_fit.n_params,
        message,
    })
}
