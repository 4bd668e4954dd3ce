//! Per-pixel noise model and the sign-encoded sigma map.
//!
//! `sigma = sqrt(read^2 + max(0, data) / gain)`. Negative counts (e.g. after
//! bias subtraction) contribute no Poisson term. The resulting [`SigmaMap`]
//! also carries pixel inclusion: positive entries are fitted, negative ones
//! are rejected and keep their magnitude.

use common::Buffer2;

use crate::error::{FitError, Result};

/// Readout noise or gain: one value for the whole window or one per pixel.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseParam {
    Scalar(f64),
    PerPixel(Buffer2<f64>),
}

impl NoiseParam {
    #[inline]
    fn at(&self, idx: usize) -> f64 {
        match self {
            NoiseParam::Scalar(v) => *v,
            NoiseParam::PerPixel(values) => values[idx],
        }
    }

    fn check_shape(&self, what: &'static str, expected: (usize, usize)) -> Result<()> {
        match self {
            NoiseParam::PerPixel(values) if values.dims() != expected => {
                Err(FitError::ShapeMismatch {
                    what,
                    expected,
                    actual: values.dims(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl From<f64> for NoiseParam {
    fn from(value: f64) -> Self {
        NoiseParam::Scalar(value)
    }
}

impl From<Buffer2<f64>> for NoiseParam {
    fn from(values: Buffer2<f64>) -> Self {
        NoiseParam::PerPixel(values)
    }
}

/// Readout noise (RMS counts) and gain (electrons per count).
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseModel {
    pub read: NoiseParam,
    pub gain: NoiseParam,
}

impl NoiseModel {
    pub fn new(read: impl Into<NoiseParam>, gain: impl Into<NoiseParam>) -> Self {
        Self {
            read: read.into(),
            gain: gain.into(),
        }
    }

    /// Fresh sigma map for `data` with every pixel included.
    pub fn sigma_map(&self, data: &Buffer2<f64>) -> Result<SigmaMap> {
        self.read.check_shape("read noise", data.dims())?;
        self.gain.check_shape("gain", data.dims())?;

        let values: Vec<f64> = data
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                let read = self.read.at(i);
                (read * read + d.max(0.0) / self.gain.at(i)).sqrt()
            })
            .collect();

        Ok(SigmaMap(Buffer2::new(data.width(), data.height(), values)))
    }
}

/// Per-pixel uncertainties whose sign encodes inclusion.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaMap(Buffer2<f64>);

impl SigmaMap {
    /// Wraps caller-supplied uncertainties, e.g. the map returned by an
    /// earlier fit so that its rejections carry over.
    pub fn from_values(values: Buffer2<f64>) -> Self {
        Self(values)
    }

    #[inline]
    pub fn values(&self) -> &Buffer2<f64> {
        &self.0
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        self.0.dims()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn is_included(&self, idx: usize) -> bool {
        self.0[idx] > 0.0
    }

    /// Indices (row-major) of included pixels.
    pub fn included(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s > 0.0)
            .map(|(i, _)| i)
    }

    pub fn n_included(&self) -> usize {
        self.0.iter().filter(|&&s| s > 0.0).count()
    }

    /// Pixels not currently fitted, including any with zero sigma.
    pub fn n_rejected(&self) -> usize {
        self.len() - self.n_included()
    }

    /// Marks an included pixel as rejected. Returns `false` if it was not included.
    pub fn reject(&mut self, idx: usize) -> bool {
        let s = &mut self.0[idx];
        if *s > 0.0 {
            *s = -*s;
            true
        } else {
            false
        }
    }
}
