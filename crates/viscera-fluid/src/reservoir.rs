//! Aggregate reservoirs: a pooled view over several producing organs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use viscera_core::fluid::FluidType;
use viscera_core::units::{Dt, VOLUME_EPSILON, Volume, non_negative};

use crate::event::FluidEvent;
use crate::organ::ProducingOrgan;
use crate::pressure::{PressureTier, pressure_multiplier};

/// Arousal above which the reservoir retracts.
pub const RETRACTION_AROUSAL: f64 = 0.95;

/// Owns a set of producing organs and drains them as one pool.
///
/// Drains are split across members in proportion to what each holds, so
/// relative fill levels survive a drain and no member is emptied first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReservoir {
    name: String,
    organs: Vec<ProducingOrgan>,
    retracted: bool,
}

impl AggregateReservoir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            organs: Vec::new(),
            retracted: false,
        }
    }

    pub fn with_organ(mut self, organ: ProducingOrgan) -> Self {
        self.organs.push(organ);
        self
    }

    pub fn add_organ(&mut self, organ: ProducingOrgan) {
        self.organs.push(organ);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn organs(&self) -> &[ProducingOrgan] {
        &self.organs
    }

    pub fn organs_mut(&mut self) -> &mut [ProducingOrgan] {
        &mut self.organs
    }

    pub fn organ(&self, name: &str) -> Option<&ProducingOrgan> {
        self.organs.iter().find(|o| o.name() == name)
    }

    pub fn organ_mut(&mut self, name: &str) -> Option<&mut ProducingOrgan> {
        self.organs.iter_mut().find(|o| o.name() == name)
    }

    pub fn is_retracted(&self) -> bool {
        self.retracted
    }

    // -----------------------------------------------------------------------
    // Pooled reads
    // -----------------------------------------------------------------------

    /// Pooled amount of one fluid type.
    pub fn stored(&self, fluid: FluidType) -> Volume {
        self.organs.iter().map(|o| o.stored(fluid)).sum()
    }

    /// Pooled contents of every member, keyed by fluid type.
    pub fn contents(&self) -> BTreeMap<FluidType, Volume> {
        let mut pooled = BTreeMap::new();
        for organ in &self.organs {
            for (&fluid, &amount) in organ.container().contents() {
                *pooled.entry(fluid).or_insert(0.0) += amount;
            }
        }
        pooled
    }

    pub fn total(&self) -> Volume {
        self.organs.iter().map(|o| o.total()).sum()
    }

    pub fn capacity(&self) -> Volume {
        self.organs.iter().map(|o| o.capacity()).sum()
    }

    pub fn fullness(&self) -> f64 {
        let capacity = self.capacity();
        if capacity > 0.0 {
            self.total() / capacity
        } else {
            0.0
        }
    }

    /// Highest member pressure, or 0 with no members.
    pub fn pressure(&self) -> f64 {
        self.organs
            .iter()
            .map(|o| o.pressure())
            .fold(0.0, f64::max)
    }

    pub fn pressure_tier(&self) -> PressureTier {
        PressureTier::pooled(self.organs.iter().map(|o| o.tier()))
    }

    pub fn pressure_multiplier(&self) -> f64 {
        pressure_multiplier(self.pressure())
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Drain up to `amount` of `fluid`, split proportionally across members.
    ///
    /// Returns the amount actually removed.
    pub fn drain_fluid(&mut self, fluid: FluidType, amount: Volume) -> Volume {
        let amount = non_negative(amount);
        let available = self.stored(fluid);
        if available <= VOLUME_EPSILON || amount == 0.0 {
            return 0.0;
        }
        let ratio = (amount / available).min(1.0);
        self.organs
            .iter_mut()
            .map(|organ| {
                let share = organ.stored(fluid) * ratio;
                organ.drain(fluid, share)
            })
            .sum()
    }

    /// Inject fluid from outside, split by member capacity. Overflow allowed.
    pub fn add_fluid(&mut self, fluid: FluidType, amount: Volume) -> Volume {
        let amount = non_negative(amount);
        if self.organs.is_empty() || amount == 0.0 {
            return 0.0;
        }
        let capacity = self.capacity();
        let count = self.organs.len() as f64;
        self.organs
            .iter_mut()
            .map(|organ| {
                let share = if capacity > 0.0 {
                    organ.capacity() / capacity
                } else {
                    1.0 / count
                };
                organ.add_fluid(fluid, amount * share)
            })
            .sum()
    }

    pub fn damage(&mut self, amount: f64) {
        self.organs.iter_mut().for_each(|o| o.damage(amount));
    }

    pub fn heal(&mut self, amount: f64) {
        self.organs.iter_mut().for_each(|o| o.heal(amount));
    }

    pub fn overheat(&mut self, amount: f64) {
        self.organs.iter_mut().for_each(|o| o.overheat(amount));
    }

    pub fn cool_down(&mut self, amount: f64) {
        self.organs.iter_mut().for_each(|o| o.cool_down(amount));
    }

    /// Tick every member and update the retraction flag.
    pub fn tick(&mut self, dt: Dt, arousal: f64) -> Vec<FluidEvent> {
        let mut events: Vec<FluidEvent> = self
            .organs
            .iter_mut()
            .flat_map(|o| o.tick(dt, arousal))
            .collect();

        let retracted = arousal > RETRACTION_AROUSAL;
        if retracted != self.retracted {
            self.retracted = retracted;
            events.push(if retracted {
                FluidEvent::Retracted {
                    reservoir: self.name.clone(),
                }
            } else {
                FluidEvent::Released {
                    reservoir: self.name.clone(),
                }
            });
        }
        events
    }
}
