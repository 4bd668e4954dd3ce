//! Weighted fitting of stellar profiles on windowed CCD data.
//!
//! Fits a symmetric 2D Gaussian or Moffat profile plus constant sky to a
//! [`Window`] of pixel data, weighting each pixel by a read-noise and
//! Poisson noise model and iteratively rejecting outlying pixels.
//!
//! ```no_run
//! use common::Buffer2;
//! use psf_fit::{fit_profile, FitConfig, FitOptions, NoiseModel, ProfileKind, ProfileParams, Window};
//!
//! # fn main() -> Result<(), psf_fit::FitError> {
//! let window = Window::new(1, 1, 1, 1, Buffer2::new_filled(21, 21, 10.0))?;
//! let initial = ProfileParams::gaussian(10.0, 500.0, 11.0, 11.0, 4.0);
//! let result = fit_profile(
//!     &window,
//!     ProfileKind::Gaussian,
//!     &initial,
//!     &NoiseModel::new(5.0, 1.0),
//!     &FitOptions::default(),
//!     &FitConfig::default(),
//! )?;
//! println!("{}", result.message);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fit;
pub mod lm_optimizer;
pub mod noise;
pub mod profile;
pub mod residual;
pub mod result;
pub mod window;

pub use config::{FitConfig, FitOptions};
pub use error::FitError;
pub use fit::{fit_profile, fit_profile_tagged, fit_profile_with_sigma};
pub use lm_optimizer::{LmConfig, LmStatus};
pub use noise::{NoiseModel, NoiseParam, SigmaMap};
pub use profile::{evaluate_jacobian, evaluate_profile, ProfileKind, ProfileParams};
pub use result::{FitResult, NOT_ESTIMATED};
pub use window::{CoordGrid, Window};

#[cfg(test)]
mod tests;
