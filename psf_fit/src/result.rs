//! Outcome of a profile fit.

use crate::noise::SigmaMap;
use crate::profile::{ProfileKind, ProfileParams};
use crate::window::{CoordGrid, Window};

/// Error value reported for a parameter that was not estimated: a fixed or
/// floored FWHM, or beta for a Gaussian.
pub const NOT_ESTIMATED: f64 = -1.0;

#[derive(Debug, Clone)]
pub struct FitResult {
    pub kind: ProfileKind,
    /// Best-fit parameters. `beta` is zero for a Gaussian.
    pub params: ProfileParams,
    /// One-sigma uncertainties scaled by `sqrt(reduced chi-square)`, or
    /// [`NOT_ESTIMATED`].
    pub errors: ProfileParams,
    /// Best-fit model, same header as the fitted window.
    pub fit: Window,
    /// Absolute unbinned coordinates of every pixel.
    pub grid: CoordGrid,
    /// Final per-pixel uncertainties; negative entries were rejected.
    pub sigma: SigmaMap,
    /// Sum of squared normalised residuals over included pixels.
    pub chisq: f64,
    pub n_ok: usize,
    pub n_rejected: usize,
    /// Number of free parameters in the final solve.
    pub n_params: usize,
    pub message: String,
}

impl FitResult {
    /// Whether the FWHM was a free parameter of the final solve.
    pub fn fwhm_estimated(&self) -> bool {
        self.errors.fwhm != NOT_ESTIMATED
    }

    /// `chisq / (n_ok - n_params)`; infinite without degrees of freedom.
    pub fn reduced_chisq(&self) -> f64 {
        self.chisq / self.n_ok.saturating_sub(self.n_params) as f64
    }
}

/// Single-line summary of a fit.
pub(crate) fn summary(
    kind: ProfileKind,
    params: &ProfileParams,
    errors: &ProfileParams,
    chisq: f64,
    n_ok: usize,
    n_rejected: usize,
) -> String {
    let (p, e) = (params, errors);
    let beta = match kind {
        ProfileKind::Gaussian => String::new(),
        ProfileKind::Moffat => format!(", beta = {:.2}({:.2})", p.beta, e.beta),
    };
    format!(
        "x,y = {:.1}({:.1}),{:.1}({:.1}), FWHM = {:.2}({:.2}), peak = {:.1}({:.1}), \
         sky = {:.1}({:.1}){beta}, chi**2 = {chisq:.1}, nok = {n_ok}, nrej = {n_rejected}",
        p.xcen, e.xcen, p.ycen, e.ycen, p.fwhm, e.fwhm, p.height, e.height, p.sky, e.sky,
    )
}
