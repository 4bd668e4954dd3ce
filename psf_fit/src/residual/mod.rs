//! Weighted residuals and Jacobian of a profile over the included pixels.
//!
//! A [`ProfileResidual`] borrows the coordinate grid, the data and the sigma
//! map for the duration of one solve. It covers both profile families and
//! both FWHM modes; the free parameter vector is
//! `[sky, height, xcen, ycen, (fwhm if free), (beta if Moffat)]`.


use common::Buffer2;

use crate::lm_optimizer::LeastSquaresProblem;
use crate::noise::SigmaMap;
use crate::profile::{evaluate_profile, ProfileKind, ProfileParams, N_PROFILE_PARAMS};
use crate::result::NOT_ESTIMATED;
use crate::window::CoordGrid;

/// Whether FWHM is a free parameter or pinned to a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FwhmMode {
    Free,
    Fixed(f64),
}

impl FwhmMode {
    pub fn is_free(self) -> bool {
        matches!(self, FwhmMode::Free)
    }
}

pub struct ProfileResidual<'a> {
    kind: ProfileKind,
    mode: FwhmMode,
    grid: &'a CoordGrid,
    data: &'a Buffer2<f64>,
    sigma: &'a SigmaMap,
    n_included: usize,
}

impl<'a> ProfileResidual<'a> {
    /// Panics if the grid, data and sigma map differ in shape.
    pub fn new(
        kind: ProfileKind,
        mode: FwhmMode,
        grid: &'a CoordGrid,
        data: &'a Buffer2<f64>,
        sigma: &'a SigmaMap,
    ) -> Self {
        assert_eq!(grid.dims(), data.dims(), "grid and data shapes differ");
        assert_eq!(sigma.dims(), data.dims(), "sigma and data shapes differ");
        Self {
            kind,
            mode,
            grid,
            data,
            sigma,
            n_included: sigma.n_included(),
        }
    }

    /// Indices into the full parameter set of the free parameters.
    #[inline]
    fn columns(&self) -> &'static [usize] {
        self.kind.columns(!self.mode.is_free())
    }

    /// Free parameter vector for `params`.
    pub fn pack(&self, params: &ProfileParams) -> Vec<f64> {
        let all = params.to_array();
        self.columns().iter().map(|&k| all[k]).collect()
    }

    fn scatter(&self, free: &[f64], fill: f64) -> ProfileParams {
        let mut all = [fill; N_PROFILE_PARAMS];
        for (&k, &v) in self.columns().iter().zip(free) {
            all[k] = v;
        }
        ProfileParams::from_array(all)
    }

    /// Full parameter set from a free parameter vector. A fixed FWHM is
    /// filled in; beta is zero for a Gaussian.
    pub fn unpack(&self, free: &[f64]) -> ProfileParams {
        let mut params = self.scatter(free, 0.0);
        if let FwhmMode::Fixed(fwhm) = self.mode {
            params.fwhm = fwhm;
        }
        params
    }

    /// Per-parameter standard errors laid out like [`Self::unpack`].
    /// Parameters that are not free get [`NOT_ESTIMATED`].
    pub fn unpack_errors(&self, errors: &[f64]) -> ProfileParams {
        self.scatter(errors, NOT_ESTIMATED)
    }

    /// Model over the full grid, included or not.
    pub fn model(&self, free: &[f64]) -> Buffer2<f64> {
        evaluate_profile(self.kind, self.grid, &self.unpack(free))
    }

    /// `(x, y, data, sigma)` for each included pixel, row-major.
    #[inline]
    fn included_pixels(&self) -> impl Iterator<Item = (f64, f64, f64, f64)> + '_ {
        self.sigma.included().map(|i| {
            (
                self.grid.x[i],
                self.grid.y[i],
                self.data[i],
                self.sigma.values()[i],
            )
        })
    }
}

impl LeastSquaresProblem for ProfileResidual<'_> {
    fn n_params(&self) -> usize {
        self.columns().len()
    }

    fn n_residuals(&self) -> usize {
        self.n_included
    }

    fn residuals(&self, free: &[f64], out: &mut Vec<f64>) {
        let params = self.unpack(free);
        out.clear();
        out.extend(
            self.included_pixels()
                .map(|(x, y, d, s)| (d - self.kind.value(x, y, &params)) / s),
        );
    }

    fn jacobian(&self, free: &[f64], out: &mut [Vec<f64>]) {
        let params = self.unpack(free);
        let columns = self.columns();
        for col in out.iter_mut() {
            col.clear();
        }
        for (x, y, _, s) in self.included_pixels() {
            let partials = self.kind.partials(x, y, &params);
            for (col, &k) in out.iter_mut().zip(columns) {
                col.push(-partials[k] / s);
            }
        }
    }
}
