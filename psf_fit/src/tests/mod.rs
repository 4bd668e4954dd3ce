//! End-to-end fitting tests on synthetic stars.
//!
//! - `star_window` - synthetic star windows with seeded, bounded noise
//! - `fitting` - parameter recovery and the FWHM strategy
//! - `rejection` - outlier rejection and its termination

mod star_window;
