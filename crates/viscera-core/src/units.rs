use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ensure_finite};

/// Ticks are the atomic unit of session time.
pub type Ticks = u64;

/// Fluid volume in millilitres.
pub type Volume = f64;

/// Volumes at or below this are treated as empty.
pub const VOLUME_EPSILON: Volume = 1e-9;

/// A non-negative time delta in abstract ticks (usually 1.0).
///
/// Negative time is a programmer error and is rejected at construction, so
/// every `tick(dt)` downstream can stay infallible.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Dt(f64);

impl Dt {
    pub const ZERO: Dt = Dt(0.0);
    pub const ONE: Dt = Dt(1.0);

    pub fn new(dt: f64) -> Result<Self, ValidationError> {
        let dt = ensure_finite("dt", dt)?;
        if dt < 0.0 {
            return Err(ValidationError::NegativeTimeStep { dt });
        }
        Ok(Dt(dt))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl Default for Dt {
    fn default() -> Self {
        Dt::ONE
    }
}

impl TryFrom<f64> for Dt {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Dt::new(value)
    }
}

impl From<Dt> for f64 {
    fn from(dt: Dt) -> f64 {
        dt.0
    }
}

/// Clamp a caller-supplied amount to a usable non-negative volume.
#[inline]
pub fn non_negative(amount: Volume) -> Volume {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}
