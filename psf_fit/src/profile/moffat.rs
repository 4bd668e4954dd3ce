//! Moffat profile parameterised by FWHM and beta.

use super::{Partials, ProfileParams, BETA, FWHM, HEIGHT, SKY, XCEN, YCEN};

/// Lower bound applied to beta before any evaluation.
pub const MIN_BETA: f64 = 0.01;

const FOUR_LN2: f64 = 4.0 * std::f64::consts::LN_2;

#[inline]
fn alpha(fwhm: f64, beta: f64) -> f64 {
    4.0 * ((1.0 / beta).exp2() - 1.0) / (fwhm * fwhm)
}

#[inline]
pub(crate) fn value(x: f64, y: f64, p: &ProfileParams) -> f64 {
    let beta = p.beta.max(MIN_BETA);
    let dx = x - p.xcen;
    let dy = y - p.ycen;
    let d = 1.0 + alpha(p.fwhm, beta) * (dx * dx + dy * dy);
    p.sky + p.height / d.powf(beta)
}

#[inline]
pub(crate) fn partials(x: f64, y: f64, p: &ProfileParams) -> Partials {
    let beta = p.beta.max(MIN_BETA);
    let fwhm2 = p.fwhm * p.fwhm;
    let alpha = alpha(p.fwhm, beta);
    let dx = x - p.xcen;
    let dy = y - p.ycen;
    let r2 = dx * dx + dy * dy;
    let d = 1.0 + alpha * r2;

    // d^(-beta) once, d^(-beta-1) from it
    let d_neg_beta = d.powf(-beta);
    let s1 = p.height * d_neg_beta / d;
    let s2 = s1 * r2;
    let common = 2.0 * alpha * beta;

    let mut out = [0.0; 6];
    out[SKY] = 1.0;
    out[HEIGHT] = d_neg_beta;
    out[XCEN] = common * dx * s1;
    out[YCEN] = common * dy * s1;
    out[FWHM] = common / p.fwhm * s2;
    out[BETA] = -d.ln() * p.height * d_neg_beta
        + FOUR_LN2 * (1.0 / beta).exp2() / beta / fwhm2 * s2;
    out
}
