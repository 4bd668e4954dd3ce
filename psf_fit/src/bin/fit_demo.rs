//! Fits a synthetic star carrying a cosmic-ray hit with both profile
//! families and logs the summaries.
//!
//! ```bash
//! RUST_LOG=psf_fit=debug cargo run -p psf_fit --bin fit_demo [config.yaml]
//! ```

use std::time::Instant;

use anyhow::Result;
use common::log_setup::setup_logging;
use psf_fit::{
    evaluate_profile, fit_profile, FitConfig, FitOptions, NoiseModel, ProfileKind, ProfileParams,
    Window,
};

/// Window size in binned pixels.
const SIZE: usize = 25;

fn main() -> Result<()> {
    setup_logging("info");

    let config = match std::env::args().nth(1) {
        Some(path) => FitConfig::from_yaml_file(path)?,
        None => FitConfig::default(),
    };

    // 2x2 binned window starting at unbinned pixel (101, 201).
    let blank = Window::new(101, 201, 2, 2, common::Buffer2::new_filled(SIZE, SIZE, 0.0))?;
    let truth = ProfileParams::moffat(120.0, 2500.0, 125.7, 224.2, 7.5, 3.5);
    let mut data = evaluate_profile(ProfileKind::Moffat, &blank.grid(), &truth);
    data[(4, 19)] += 4000.0;
    let window = blank.with_data(data)?;
    tracing::info!(
        nx = window.nx(),
        ny = window.ny(),
        xbin = window.xbin(),
        ybin = window.ybin(),
        "Synthetic star window ready"
    );

    let noise = NoiseModel::new(4.5, 1.1);
    let options = FitOptions {
        fwhm_min: 2.0 * window.xbin() as f64,
        ..FitOptions::default()
    };
    let initial = ProfileParams::moffat(100.0, 2000.0, 126.5, 223.0, 9.0, 3.0);

    for kind in [ProfileKind::Gaussian, ProfileKind::Moffat] {
        let start = Instant::now();
        let result = fit_profile(&window, kind, &initial, &noise, &options, &config)?;
        tracing::info!(
            method = %kind.tag(),
            elapsed_us = start.elapsed().as_micros(),
            n_params = result.n_params,
            "{}",
            result.message
        );
    }

    Ok(())
}
