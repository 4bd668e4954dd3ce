//! Gaussian profile parameterised by FWHM.

use super::{Partials, ProfileParams, BETA, FWHM, HEIGHT, SKY, XCEN, YCEN};

const FOUR_LN2: f64 = 4.0 * std::f64::consts::LN_2;

#[inline]
fn alpha(fwhm: f64) -> f64 {
    FOUR_LN2 / (fwhm * fwhm)
}

#[inline]
pub(crate) fn value(x: f64, y: f64, p: &ProfileParams) -> f64 {
    let dx = x - p.xcen;
    let dy = y - p.ycen;
    p.sky + p.height * (-alpha(p.fwhm) * (dx * dx + dy * dy)).exp()
}

#[inline]
pub(crate) fn partials(x: f64, y: f64, p: &ProfileParams) -> Partials {
    let alpha = alpha(p.fwhm);
    let dx = x - p.xcen;
    let dy = y - p.ycen;
    let r2 = dx * dx + dy * dy;
    let e = (-alpha * r2).exp();
    let common = 2.0 * alpha * p.height * e;

    let mut d = [0.0; 6];
    d[SKY] = 1.0;
    d[HEIGHT] = e;
    d[XCEN] = common * dx;
    d[YCEN] = common * dy;
    d[FWHM] = common * r2 / p.fwhm;
    d[BETA] = 0.0;
    d
}
