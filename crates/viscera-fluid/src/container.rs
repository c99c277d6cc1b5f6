//! Typed fluid storage with a capacity but no clamping policy of its own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use viscera_core::error::{ValidationError, ensure_finite, ensure_range};
use viscera_core::fluid::FluidType;
use viscera_core::units::{VOLUME_EPSILON, Volume, non_negative};

/// How [`FluidContainer::add`] treats an amount that exceeds headroom.
///
/// The container never picks for the caller: producers that want a buffer
/// clamp, external fill effects overflow on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillPolicy {
    /// Store at most the remaining headroom.
    Clamp,
    /// Store everything, pushing the total past capacity if needed.
    Overflow,
}

/// A typed fluid store.
///
/// The sum of stored amounts normally stays at or below `capacity`, but an
/// [`FillPolicy::Overflow`] add may push past it. That is a valid state the
/// pressure model reads as rupture risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContainer")]
pub struct FluidContainer {
    capacity: Volume,
    stored: BTreeMap<FluidType, Volume>,
}

/// Unchecked on-disk form; goes through the same checks as `new`.
#[derive(Deserialize)]
struct RawContainer {
    capacity: Volume,
    #[serde(default)]
    stored: BTreeMap<FluidType, Volume>,
}

impl TryFrom<RawContainer> for FluidContainer {
    type Error = ValidationError;

    fn try_from(raw: RawContainer) -> Result<Self, Self::Error> {
        let mut container = FluidContainer::new(raw.capacity)?;
        for (fluid, amount) in raw.stored {
            let amount = ensure_range("stored", amount, 0.0, f64::MAX)?;
            if amount > VOLUME_EPSILON {
                container.stored.insert(fluid, amount);
            }
        }
        Ok(container)
    }
}

impl FluidContainer {
    /// Create an empty container. Negative or non-finite capacity is rejected.
    pub fn new(capacity: Volume) -> Result<Self, ValidationError> {
        let capacity = ensure_finite("capacity", capacity)?;
        if capacity < 0.0 {
            return Err(ValidationError::NegativeCapacity { capacity });
        }
        Ok(Self {
            capacity,
            stored: BTreeMap::new(),
        })
    }

    pub fn capacity(&self) -> Volume {
        self.capacity
    }

    /// Amount of one fluid type currently stored.
    pub fn amount(&self, fluid: FluidType) -> Volume {
        self.stored.get(&fluid).copied().unwrap_or(0.0)
    }

    /// All stored amounts, keyed by fluid type.
    pub fn contents(&self) -> &BTreeMap<FluidType, Volume> {
        &self.stored
    }

    /// Sum over all fluid types.
    pub fn total(&self) -> Volume {
        self.stored.values().sum()
    }

    /// Capacity left before the container is full. Zero when overflowing.
    pub fn headroom(&self) -> Volume {
        (self.capacity - self.total()).max(0.0)
    }

    /// `total / capacity`, or 0 for a zero-capacity container.
    pub fn fullness(&self) -> f64 {
        if self.capacity > 0.0 {
            self.total() / self.capacity
        } else {
            0.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total() <= VOLUME_EPSILON
    }

    pub fn is_overflowing(&self) -> bool {
        self.total() > self.capacity
    }

    /// The fluid type with the largest stored amount. Ties go to the type
    /// that orders first.
    pub fn dominant(&self) -> Option<(FluidType, Volume)> {
        self.stored
            .iter()
            .filter(|(_, v)| **v > VOLUME_EPSILON)
            .fold(None, |best: Option<(FluidType, Volume)>, (&fluid, &amount)| {
                match best {
                    Some((_, b)) if b >= amount => best,
                    _ => Some((fluid, amount)),
                }
            })
    }

    /// Store fluid and return how much was accepted.
    pub fn add(&mut self, fluid: FluidType, amount: Volume, policy: FillPolicy) -> Volume {
        let amount = non_negative(amount);
        let accepted = match policy {
            FillPolicy::Clamp => amount.min(self.headroom()),
            FillPolicy::Overflow => amount,
        };
        if accepted > 0.0 {
            *self.stored.entry(fluid).or_insert(0.0) += accepted;
        }
        accepted
    }

    /// Remove up to `amount` of one fluid type and return what was removed.
    pub fn drain(&mut self, fluid: FluidType, amount: Volume) -> Volume {
        let amount = non_negative(amount);
        let Some(stored) = self.stored.get_mut(&fluid) else {
            return 0.0;
        };
        let actual = amount.min(*stored);
        *stored -= actual;
        if *stored <= VOLUME_EPSILON {
            self.stored.remove(&fluid);
        }
        actual
    }

    /// Remove `ratio` of every stored type in one pass.
    ///
    /// `ratio` is clamped to `[0, 1]`. Returns the amount taken per type.
    pub fn drain_all(&mut self, ratio: f64) -> BTreeMap<FluidType, Volume> {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        let mut drained = BTreeMap::new();
        for (&fluid, stored) in self.stored.iter_mut() {
            let take = *stored * ratio;
            *stored -= take;
            if take > 0.0 {
                drained.insert(fluid, take);
            }
        }
        self.stored.retain(|_, v| *v > VOLUME_EPSILON);
        drained
    }

    /// Empty the container. Capacity is kept.
    pub fn reset(&mut self) {
        self.stored.clear();
    }
}
