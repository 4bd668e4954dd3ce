//! Symmetric 2D stellar profiles on a constant sky, with analytic derivatives.
//!
//! Two families are supported:
//!
//! - Gaussian: `sky + height * exp(-alpha * r^2)`, `alpha = 4 ln2 / fwhm^2`
//! - Moffat: `sky + height / (1 + alpha * r^2)^beta`,
//!   `alpha = 4 (2^(1/beta) - 1) / fwhm^2`
//!
//! Both are parameterised by FWHM so that the width means the same thing for
//! either family. Derivatives are always produced in the order
//! sky, height, xcen, ycen, fwhm, beta.

pub(crate) mod gaussian;
pub(crate) mod moffat;

use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::window::CoordGrid;

/// Number of profile parameters including beta.
pub const N_PROFILE_PARAMS: usize = 6;

/// Positions of each parameter in [`ProfileParams::to_array`] and in
/// the full set of partial derivatives.
pub(crate) const SKY: usize = 0;
pub(crate) const HEIGHT: usize = 1;
pub(crate) const XCEN: usize = 2;
pub(crate) const YCEN: usize = 3;
pub(crate) const FWHM: usize = 4;
pub(crate) const BETA: usize = 5;

/// Partial derivatives of the model at one point, indexed as above.
pub(crate) type Partials = [f64; N_PROFILE_PARAMS];

/// Profile family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileKind {
    Gaussian,
    Moffat,
}

impl ProfileKind {
    /// Single-character method tag: `'g'` or `'m'`.
    pub fn tag(self) -> char {
        match self {
            ProfileKind::Gaussian => 'g',
            ProfileKind::Moffat => 'm',
        }
    }

    pub fn has_beta(self) -> bool {
        matches!(self, ProfileKind::Moffat)
    }

    /// Model value at `(x, y)`.
    #[inline]
    pub fn value(self, x: f64, y: f64, params: &ProfileParams) -> f64 {
        match self {
            ProfileKind::Gaussian => gaussian::value(x, y, params),
            ProfileKind::Moffat => moffat::value(x, y, params),
        }
    }

    /// All six partial derivatives at `(x, y)`. The beta entry is zero for
    /// a Gaussian.
    #[inline]
    pub(crate) fn partials(self, x: f64, y: f64, params: &ProfileParams) -> Partials {
        match self {
            ProfileKind::Gaussian => gaussian::partials(x, y, params),
            ProfileKind::Moffat => moffat::partials(x, y, params),
        }
    }

    /// Indices of the partial derivatives that form Jacobian columns.
    pub(crate) fn columns(self, skip_fwhm: bool) -> &'static [usize] {
        match (self, skip_fwhm) {
            (ProfileKind::Gaussian, false) => &[SKY, HEIGHT, XCEN, YCEN, FWHM],
            (ProfileKind::Gaussian, true) => &[SKY, HEIGHT, XCEN, YCEN],
            (ProfileKind::Moffat, false) => &[SKY, HEIGHT, XCEN, YCEN, FWHM, BETA],
            (ProfileKind::Moffat, true) => &[SKY, HEIGHT, XCEN, YCEN, BETA],
        }
    }
}

impl TryFrom<char> for ProfileKind {
    type Error = FitError;

    fn try_from(tag: char) -> Result<Self, Self::Error> {
        match tag {
            'g' => Ok(ProfileKind::Gaussian),
            'm' => Ok(ProfileKind::Moffat),
            other => Err(FitError::UnsupportedMethod(other)),
        }
    }
}

impl std::fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileKind::Gaussian => write!(f, "gaussian"),
            ProfileKind::Moffat => write!(f, "moffat"),
        }
    }
}

/// Profile parameters. Positions and FWHM are in unbinned pixels.
/// `beta` is only used by the Moffat family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
    pub sky: f64,
    pub height: f64,
    pub xcen: f64,
    pub ycen: f64,
    pub fwhm: f64,
    pub beta: f64,
}

impl ProfileParams {
    pub fn gaussian(sky: f64, height: f64, xcen: f64, ycen: f64, fwhm: f64) -> Self {
        Self {
            sky,
            height,
            xcen,
            ycen,
            fwhm,
            beta: 0.0,
        }
    }

    pub fn moffat(sky: f64, height: f64, xcen: f64, ycen: f64, fwhm: f64, beta: f64) -> Self {
        Self {
            sky,
            height,
            xcen,
            ycen,
            fwhm,
            beta,
        }
    }

    pub fn to_array(&self) -> [f64; N_PROFILE_PARAMS] {
        [self.sky, self.height, self.xcen, self.ycen, self.fwhm, self.beta]
    }

    pub fn from_array(values: [f64; N_PROFILE_PARAMS]) -> Self {
        let [sky, height, xcen, ycen, fwhm, beta] = values;
        Self {
            sky,
            height,
            xcen,
            ycen,
            fwhm,
            beta,
        }
    }
}

/// Model evaluated over every point of `grid`.
pub fn evaluate_profile(kind: ProfileKind, grid: &CoordGrid, params: &ProfileParams) -> Buffer2<f64> {
    grid.x.zip_map(&grid.y, |&x, &y| kind.value(x, y, params))
}

/// Partial derivatives of the model over `grid`, one array per parameter in
/// the order sky, height, xcen, ycen, [fwhm], [beta]. With `skip_fwhm` the
/// FWHM derivative is omitted.
pub fn evaluate_jacobian(
    kind: ProfileKind,
    grid: &CoordGrid,
    params: &ProfileParams,
    skip_fwhm: bool,
) -> Vec<Buffer2<f64>> {
    let columns = kind.columns(skip_fwhm);
    let (width, height) = grid.dims();
    let mut out: Vec<Vec<f64>> = vec![Vec::with_capacity(grid.len()); columns.len()];

    for (x, y) in grid.points() {
        let partials = kind.partials(x, y, params);
        for (col, &k) in out.iter_mut().zip(columns) {
            col.push(partials[k]);
        }
    }

    out.into_iter()
        .map(|values| Buffer2::new(width, height, values))
        .collect()
}
