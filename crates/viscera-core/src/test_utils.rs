//! Shared test helpers for unit and integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests and, via the `test-utils` feature, in the
//! integration-test crate.

use crate::fluid::FluidType;
use crate::units::Dt;

/// Default tolerance for floating-point comparisons in tests.
pub const TOLERANCE: f64 = 1e-9;

/// Assert two floats are equal within [`TOLERANCE`].
#[track_caller]
pub fn assert_close(actual: f64, expected: f64) {
    assert_close_within(actual, expected, TOLERANCE);
}

/// Assert two floats are equal within `tolerance`.
#[track_caller]
pub fn assert_close_within(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual} (tolerance {tolerance})"
    );
}

/// Shorthand for a validated time step. Panics on negative input.
pub fn dt(value: f64) -> Dt {
    Dt::new(value).expect("test time step must be valid")
}

pub fn cum() -> FluidType {
    FluidType::Cum
}

pub fn milk() -> FluidType {
    FluidType::Milk
}

pub fn saliva() -> FluidType {
    FluidType::Saliva
}

pub fn water() -> FluidType {
    FluidType::Water
}
