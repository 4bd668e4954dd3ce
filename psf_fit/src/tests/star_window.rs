//! Synthetic star windows.

use common::Buffer2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::{evaluate_profile, NoiseModel, ProfileKind, ProfileParams, Window};

pub(super) const READ: f64 = 5.0;
pub(super) const GAIN: f64 = 1.0;

pub(super) fn noise_model() -> NoiseModel {
    NoiseModel::new(READ, GAIN)
}

pub(super) fn init_logging() {
    common::log_setup::try_setup_test_logging("debug");
}

/// Unbinned `nx` x `ny` window at the CCD origin with nothing in it.
pub(super) fn blank(nx: usize, ny: usize) -> Window {
    Window::new(1, 1, 1, 1, Buffer2::new_filled(nx, ny, 0.0)).unwrap()
}

/// `blank` holding a noiseless profile.
pub(super) fn clean_star(blank: &Window, kind: ProfileKind, truth: &ProfileParams) -> Window {
    let data = evaluate_profile(kind, &blank.grid(), truth);
    blank.with_data(data).unwrap()
}

/// Like [`clean_star`] plus Gaussian noise of `noise_scale` times the modelled
/// sigma. Draws are truncated at 3 sigma so that no pixel is a genuine outlier.
pub(super) fn noisy_star(
    blank: &Window,
    kind: ProfileKind,
    truth: &ProfileParams,
    noise_scale: f64,
    seed: u64,
) -> Window {
    let clean = clean_star(blank, kind, truth);
    let sigma = noise_model().sigma_map(clean.data()).unwrap();
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);

    let data = clean.data().zip_map(sigma.values(), |&d, &s| {
        let z: f64 = normal.sample(&mut rng);
        d + noise_scale * s * z.clamp(-3.0, 3.0)
    });
    clean.with_data(data).unwrap()
}
