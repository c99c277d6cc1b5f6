//! Pressure and pressure tiers derived from container fullness.
//!
//! Pressure is a piecewise-linear function of `fullness = total / capacity`.
//! The tier is a pure function of the same input, so it can never disagree
//! with the pressure value it was computed alongside.

use serde::{Deserialize, Serialize};

use crate::container::FluidContainer;

/// Fullness at or above which the tier leaves [`PressureTier::Low`].
pub const NORMAL_THRESHOLD: f64 = 0.50;
pub const HIGH_THRESHOLD: f64 = 0.80;
pub const CRITICAL_THRESHOLD: f64 = 0.95;
pub const RUPTURE_THRESHOLD: f64 = 1.00;

/// Pressure above which a rupture-risk organ takes trauma damage.
pub const TRAUMA_PRESSURE: f64 = 120.0;
/// Damage applied by one trauma event.
pub const TRAUMA_DAMAGE: f64 = 0.1;

/// Discrete pressure severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PressureTier {
    Low,
    #[default]
    Normal,
    High,
    Critical,
    RuptureRisk,
}

impl PressureTier {
    pub fn name(self) -> &'static str {
        match self {
            PressureTier::Low => "low",
            PressureTier::Normal => "normal",
            PressureTier::High => "high",
            PressureTier::Critical => "critical",
            PressureTier::RuptureRisk => "rupture_risk",
        }
    }

    /// Combine member tiers into one reservoir-level tier.
    ///
    /// Checks run in the order rupture_risk, critical, high, low; if none
    /// of those is present (including an empty input) the result is
    /// `Normal`. A reservoir with one low and one normal member therefore
    /// reports `Low`.
    pub fn pooled<I>(tiers: I) -> PressureTier
    where
        I: IntoIterator<Item = PressureTier>,
    {
        let mut seen = [false; 5];
        for tier in tiers {
            seen[tier as usize] = true;
        }
        [
            PressureTier::RuptureRisk,
            PressureTier::Critical,
            PressureTier::High,
            PressureTier::Low,
        ]
        .into_iter()
        .find(|t| seen[*t as usize])
        .unwrap_or(PressureTier::Normal)
    }
}

impl std::fmt::Display for PressureTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One evaluation of the pressure curve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PressureReading {
    pub fullness: f64,
    pub pressure: f64,
    pub tier: PressureTier,
}

impl PressureReading {
    /// Evaluate the curve for a stored total against a capacity.
    pub fn from_fill(stored: f64, capacity: f64) -> Self {
        if capacity <= 0.0 {
            return Self::default();
        }
        let fullness = stored.max(0.0) / capacity;
        let (pressure, tier) = if fullness < NORMAL_THRESHOLD {
            (fullness * 20.0, PressureTier::Low)
        } else if fullness < HIGH_THRESHOLD {
            (10.0 + (fullness - 0.50) * 100.0, PressureTier::Normal)
        } else if fullness < CRITICAL_THRESHOLD {
            (40.0 + (fullness - 0.80) * 300.0, PressureTier::High)
        } else if fullness < RUPTURE_THRESHOLD {
            (85.0 + (fullness - 0.95) * 200.0, PressureTier::Critical)
        } else {
            let overflow = (stored - capacity) / capacity;
            (95.0 + overflow * 100.0, PressureTier::RuptureRisk)
        };
        Self {
            fullness,
            pressure,
            tier,
        }
    }

    pub fn of(container: &FluidContainer) -> Self {
        Self::from_fill(container.total(), container.capacity())
    }

    /// Whether this reading is bad enough to cause trauma.
    pub fn is_traumatic(&self) -> bool {
        self.tier == PressureTier::RuptureRisk && self.pressure > TRAUMA_PRESSURE
    }
}

/// Scale factor internal pressure applies to expulsion strength.
pub fn pressure_multiplier(pressure: f64) -> f64 {
    if pressure < 20.0 {
        0.5 + pressure / 40.0
    } else if pressure < 80.0 {
        1.0 + ((pressure - 20.0) / 60.0) * 0.5
    } else {
        1.5 + ((pressure - 80.0) / 40.0).min(1.0)
    }
}

/// What changed when a [`PressureModel`] was re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureUpdate {
    pub previous: PressureTier,
    pub reading: PressureReading,
    /// Damage the owning organ should take (0 unless trauma fired).
    pub trauma: f64,
}

impl PressureUpdate {
    pub fn tier_changed(&self) -> bool {
        self.previous != self.reading.tier
    }
}

/// Tracks the last pressure reading of one container so tier transitions
/// can be detected between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PressureModel {
    reading: PressureReading,
}

impl PressureModel {
    pub fn new(container: &FluidContainer) -> Self {
        Self {
            reading: PressureReading::of(container),
        }
    }

    pub fn reading(&self) -> PressureReading {
        self.reading
    }

    /// Re-evaluate against the container's current contents.
    ///
    /// `already_damaged` suppresses the one-shot trauma increment.
    pub fn update(&mut self, container: &FluidContainer, already_damaged: bool) -> PressureUpdate {
        let previous = self.reading.tier;
        self.reading = PressureReading::of(container);
        let trauma = if self.reading.is_traumatic() && !already_damaged {
            TRAUMA_DAMAGE
        } else {
            0.0
        };
        PressureUpdate {
            previous,
            reading: self.reading,
            trauma,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::FillPolicy;
    use viscera_core::test_utils::*;

    #[test]
    fn zero_capacity_reads_normal_and_zero() {
        let r = PressureReading::from_fill(50.0, 0.0);
        assert_eq!(r.pressure, 0.0);
        assert_eq!(r.tier, PressureTier::Normal);
    }

    #[test]
    fn empty_container_is_low() {
        let r = PressureReading::from_fill(0.0, 100.0);
        assert_eq!(r.tier, PressureTier::Low);
        assert_eq!(r.pressure, 0.0);
    }

    #[test]
    fn ninety_six_percent_is_critical() {
        let r = PressureReading::from_fill(96.0, 100.0);
        assert_eq!(r.tier, PressureTier::Critical);
        assert_close_within(r.pressure, 87.0, 1e-9);
    }

    #[test]
    fn band_edges() {
        assert_eq!(PressureReading::from_fill(50.0, 100.0).tier, PressureTier::Normal);
        assert_close(PressureReading::from_fill(50.0, 100.0).pressure, 10.0);
        assert_eq!(PressureReading::from_fill(80.0, 100.0).tier, PressureTier::High);
        assert_close(PressureReading::from_fill(80.0, 100.0).pressure, 40.0);
        assert_eq!(PressureReading::from_fill(95.0, 100.0).tier, PressureTier::Critical);
        assert_eq!(
            PressureReading::from_fill(100.0, 100.0).tier,
            PressureTier::RuptureRisk
        );
        assert_close(PressureReading::from_fill(100.0, 100.0).pressure, 95.0);
    }

    #[test]
    fn overflow_raises_pressure_past_ninety_five() {
        let r = PressureReading::from_fill(130.0, 100.0);
        assert_eq!(r.tier, PressureTier::RuptureRisk);
        assert_close(r.pressure, 125.0);
        assert!(r.is_traumatic());
    }

    #[test]
    fn mild_overflow_is_not_traumatic() {
        let r = PressureReading::from_fill(110.0, 100.0);
        assert_eq!(r.tier, PressureTier::RuptureRisk);
        assert!(!r.is_traumatic());
    }

    #[test]
    fn tiers_order_by_severity() {
        assert!(PressureTier::Low < PressureTier::Normal);
        assert!(PressureTier::Normal < PressureTier::High);
        assert!(PressureTier::High < PressureTier::Critical);
        assert!(PressureTier::Critical < PressureTier::RuptureRisk);
    }

    #[test]
    fn pooled_tier_priority() {
        use PressureTier::*;
        assert_eq!(PressureTier::pooled(Vec::<PressureTier>::new()), Normal);
        assert_eq!(PressureTier::pooled([Normal, Normal]), Normal);
        assert_eq!(PressureTier::pooled([Low, Normal]), Low);
        assert_eq!(PressureTier::pooled([Low, High]), High);
        assert_eq!(PressureTier::pooled([Critical, RuptureRisk, Low]), RuptureRisk);
    }

    #[test]
    fn multiplier_bands() {
        assert_close(pressure_multiplier(0.0), 0.5);
        assert_close(pressure_multiplier(20.0), 1.0);
        assert_close(pressure_multiplier(80.0), 1.5);
        assert_close(pressure_multiplier(100.0), 2.0);
        assert_close(pressure_multiplier(500.0), 2.5);
    }

    #[test]
    fn model_reports_trauma_once_per_evaluation() {
        let mut c = FluidContainer::new(10.0).unwrap();
        c.add(cum(), 13.0, FillPolicy::Overflow);
        let mut model = PressureModel::default();

        let update = model.update(&c, false);
        assert_eq!(update.reading.tier, PressureTier::RuptureRisk);
        assert_close(update.trauma, TRAUMA_DAMAGE);
        assert!(update.tier_changed());

        let again = model.update(&c, true);
        assert_eq!(again.trauma, 0.0);
        assert!(!again.tier_changed());
    }

    #[test]
    fn tier_names() {
        assert_eq!(PressureTier::RuptureRisk.to_string(), "rupture_risk");
        assert_eq!(PressureTier::Low.name(), "low");
    }
}
