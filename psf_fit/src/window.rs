//! Minimal windowed-CCD view: a pixel grid plus the binning and offset needed
//! to map pixel indices onto absolute unbinned CCD coordinates.

use common::Buffer2;

use crate::error::{FitError, Result};

/// Rectangular sub-region of a CCD.
///
/// `llx`, `lly` are the absolute unbinned coordinates (1-based) of the lower
/// left unbinned pixel of the window; `xbin`, `ybin` the binning factors.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    llx: usize,
    lly: usize,
    xbin: usize,
    ybin: usize,
    data: Buffer2<f64>,
}

impl Window {
    pub fn new(llx: usize, lly: usize, xbin: usize, ybin: usize, data: Buffer2<f64>) -> Result<Self> {
        if xbin == 0 || ybin == 0 {
            return Err(FitError::InvalidWindow(format!(
                "binning factors must be >= 1, got {xbin}x{ybin}"
            )));
        }
        if data.is_empty() {
            return Err(FitError::InvalidWindow("window has no pixels".to_string()));
        }
        Ok(Self {
            llx,
            lly,
            xbin,
            ybin,
            data,
        })
    }

    /// Window with the same header as `self` holding `data` (e.g. a fit image).
    pub fn with_data(&self, data: Buffer2<f64>) -> Result<Self> {
        if !data.same_shape(&self.data) {
            return Err(FitError::ShapeMismatch {
                what: "window data",
                expected: self.data.dims(),
                actual: data.dims(),
            });
        }
        Ok(Self {
            data,
            ..self.clone()
        })
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.data.width()
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.data.height()
    }

    pub fn llx(&self) -> usize {
        self.llx
    }

    pub fn lly(&self) -> usize {
        self.lly
    }

    pub fn xbin(&self) -> usize {
        self.xbin
    }

    pub fn ybin(&self) -> usize {
        self.ybin
    }

    #[inline]
    pub fn data(&self) -> &Buffer2<f64> {
        &self.data
    }

    /// Absolute unbinned X of the centre of binned column `ix`.
    #[inline]
    pub fn x(&self, ix: usize) -> f64 {
        self.llx as f64 + self.xbin as f64 * (ix as f64 + 0.5) - 0.5
    }

    /// Absolute unbinned Y of the centre of binned row `iy`.
    #[inline]
    pub fn y(&self, iy: usize) -> f64 {
        self.lly as f64 + self.ybin as f64 * (iy as f64 + 0.5) - 0.5
    }

    /// Coordinate grids for every pixel of the window.
    pub fn grid(&self) -> CoordGrid {
        let xs: Vec<f64> = (0..self.nx()).map(|ix| self.x(ix)).collect();
        let ys: Vec<f64> = (0..self.ny()).map(|iy| self.y(iy)).collect();
        CoordGrid::from_axes(&xs, &ys)
    }
}

/// Pixel-centred ordinates, one 2D array per axis, same shape as the data.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordGrid {
    pub x: Buffer2<f64>,
    pub y: Buffer2<f64>,
}

impl CoordGrid {
    /// Meshgrid of the two ordinate vectors: `x` varies along rows.
    pub fn from_axes(xs: &[f64], ys: &[f64]) -> Self {
        Self {
            x: Buffer2::from_fn(xs.len(), ys.len(), |ix, _| xs[ix]),
            y: Buffer2::from_fn(xs.len(), ys.len(), |_, iy| ys[iy]),
        }
    }

    /// (width, height)
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        self.x.dims()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// `(x, y)` pairs in row-major order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}
