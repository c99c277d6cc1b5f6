//! Validation errors for structurally impossible inputs.
//!
//! Absent references (no reservoir, no sink, empty container) are never
//! errors in Viscera; they produce zero results. The variants here cover
//! only the values a caller should never have produced in the first place.

/// A constructor or entry point was handed a value outside its domain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Container capacity below zero.
    #[error("capacity must be non-negative, got {capacity}")]
    NegativeCapacity { capacity: f64 },

    /// Time step below zero.
    #[error("time step must be non-negative, got {dt}")]
    NegativeTimeStep { dt: f64 },

    /// NaN or infinity where a finite number is required.
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// A bounded parameter fell outside its range.
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Reject NaN and infinities.
pub fn ensure_finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NonFinite { field, value })
    }
}

/// Reject values outside `[min, max]` (and non-finite values).
pub fn ensure_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ValidationError> {
    let value = ensure_finite(field, value)?;
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(value)
}
