//! Producing organs: a container plus production rates and condition.
//!
//! A producing organ fills its own container each tick at a rate scaled by
//! arousal, stimulation, heat and damage. Ordinary production always leaves
//! a 10% headroom buffer; only external injection through
//! [`ProducingOrgan::add_fluid`] can push the container past capacity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use viscera_core::error::{ValidationError, ensure_finite, ensure_range};
use viscera_core::fluid::FluidType;
use viscera_core::units::{Dt, VOLUME_EPSILON, Volume, non_negative};

use crate::container::{FillPolicy, FluidContainer};
use crate::event::FluidEvent;
use crate::pressure::{PressureModel, PressureReading, PressureTier};

/// Temperature above which an organ is overheated.
pub const OVERHEAT_THRESHOLD: f64 = 37.5;
/// Temperature below which an overheated organ recovers.
pub const RECOVERY_THRESHOLD: f64 = 36.5;
/// Lowest temperature `cool_down` can reach.
pub const MIN_TEMPERATURE: f64 = 34.0;
/// Resting temperature passive cooling moves toward.
pub const BASELINE_TEMPERATURE: f64 = 35.0;
/// Fraction of the baseline gap closed per tick of passive cooling.
pub const PASSIVE_COOLING_RATE: f64 = 0.1;

/// Fraction of the gap to baseline that passive cooling closes over `dt`.
pub fn passive_cooling_factor(dt: Dt) -> f64 {
    (PASSIVE_COOLING_RATE * dt.get()).min(1.0)
}

/// Share of headroom ordinary production may fill in one call.
pub const PRODUCTION_HEADROOM_SHARE: f64 = 0.9;
/// Damage level above which an organ counts as damaged.
pub const DAMAGED_THRESHOLD: f64 = 0.1;
/// Damage level at which production stops.
pub const PRODUCTION_DAMAGE_LIMIT: f64 = 0.8;

/// An organ that produces one or more fluid types into its own container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawOrgan")]
pub struct ProducingOrgan {
    name: String,
    container: FluidContainer,
    pressure: PressureModel,
    temperature: f64,
    damage_level: f64,
    is_overheated: bool,
    is_damaged: bool,
    /// Heat state as of the last tick, so transitions are reported once.
    reported_hot: bool,
    production_rates: BTreeMap<FluidType, f64>,
}

/// Unchecked on-disk form of [`ProducingOrgan`].
#[derive(Deserialize)]
struct RawOrgan {
    name: String,
    container: FluidContainer,
    temperature: f64,
    damage_level: f64,
    is_overheated: bool,
    #[serde(default)]
    reported_hot: bool,
    #[serde(default)]
    production_rates: BTreeMap<FluidType, f64>,
}

impl TryFrom<RawOrgan> for ProducingOrgan {
    type Error = ValidationError;

    fn try_from(raw: RawOrgan) -> Result<Self, Self::Error> {
        let damage_level = ensure_range("damage_level", raw.damage_level, 0.0, 1.0)?;
        let mut organ = Self {
            name: raw.name,
            pressure: PressureModel::new(&raw.container),
            container: raw.container,
            temperature: ensure_finite("temperature", raw.temperature)?,
            damage_level,
            is_overheated: raw.is_overheated,
            is_damaged: damage_level > DAMAGED_THRESHOLD,
            reported_hot: raw.reported_hot,
            production_rates: BTreeMap::new(),
        };
        for (fluid, rate) in raw.production_rates {
            organ.set_rate(fluid, rate)?;
        }
        organ.refresh_heat_state();
        Ok(organ)
    }
}

impl ProducingOrgan {
    /// Create an empty, healthy organ at baseline temperature.
    pub fn new(name: impl Into<String>, capacity: Volume) -> Result<Self, ValidationError> {
        let container = FluidContainer::new(capacity)?;
        Ok(Self {
            name: name.into(),
            pressure: PressureModel::new(&container),
            container,
            temperature: BASELINE_TEMPERATURE,
            damage_level: 0.0,
            is_overheated: false,
            is_damaged: false,
            reported_hot: false,
            production_rates: BTreeMap::new(),
        })
    }

    /// Builder form of [`set_rate`](Self::set_rate).
    pub fn with_rate(mut self, fluid: FluidType, rate: f64) -> Result<Self, ValidationError> {
        self.set_rate(fluid, rate)?;
        Ok(self)
    }

    /// Builder: start at a given temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Result<Self, ValidationError> {
        self.temperature = ensure_finite("temperature", temperature)?;
        self.refresh_heat_state();
        Ok(self)
    }

    /// Set the base production rate (per tick) for a fluid type.
    pub fn set_rate(&mut self, fluid: FluidType, rate: f64) -> Result<(), ValidationError> {
        let rate = ensure_range("production_rate", rate, 0.0, f64::MAX)?;
        self.production_rates.insert(fluid, rate);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> &FluidContainer {
        &self.container
    }

    pub fn production_rates(&self) -> &BTreeMap<FluidType, f64> {
        &self.production_rates
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn damage_level(&self) -> f64 {
        self.damage_level
    }

    pub fn is_overheated(&self) -> bool {
        self.is_overheated
    }

    pub fn is_damaged(&self) -> bool {
        self.is_damaged
    }

    pub fn can_produce(&self) -> bool {
        !self.is_overheated && self.damage_level < PRODUCTION_DAMAGE_LIMIT
    }

    pub fn stored(&self, fluid: FluidType) -> Volume {
        self.container.amount(fluid)
    }

    pub fn total(&self) -> Volume {
        self.container.total()
    }

    pub fn capacity(&self) -> Volume {
        self.container.capacity()
    }

    pub fn fullness(&self) -> f64 {
        self.container.fullness()
    }

    /// Live pressure reading for the current contents.
    pub fn pressure_reading(&self) -> PressureReading {
        PressureReading::of(&self.container)
    }

    pub fn pressure(&self) -> f64 {
        self.pressure_reading().pressure
    }

    pub fn tier(&self) -> PressureTier {
        self.pressure_reading().tier
    }

    /// Rate for `fluid` after arousal, stimulation, heat and damage.
    pub fn effective_rate(&self, fluid: FluidType, arousal: f64, stimulation: f64) -> f64 {
        let Some(&base) = self.production_rates.get(&fluid) else {
            return 0.0;
        };
        let arousal = if arousal.is_nan() { 0.0 } else { arousal.clamp(0.0, 1.0) };
        let stimulation = non_negative(stimulation);
        let heat = if self.is_overheated { 0.5 } else { 1.0 };
        let wear = 1.0 - 0.5 * self.damage_level;
        base * (1.0 + 2.0 * arousal) * stimulation * heat * wear
    }

    // -----------------------------------------------------------------------
    // Production
    // -----------------------------------------------------------------------

    /// Produce fluid for `dt` ticks and return what was added per type.
    ///
    /// Each type adds at most 90% of the headroom left at that point, so
    /// ordinary production approaches capacity without overflowing it.
    pub fn produce(
        &mut self,
        dt: Dt,
        arousal: f64,
        stimulation: f64,
    ) -> BTreeMap<FluidType, Volume> {
        let mut added = BTreeMap::new();
        if !self.can_produce() || dt.is_zero() {
            return added;
        }
        let fluids: Vec<FluidType> = self.production_rates.keys().copied().collect();
        for fluid in fluids {
            let wanted = self.effective_rate(fluid, arousal, stimulation) * dt.get();
            let amount = wanted.min(self.container.headroom() * PRODUCTION_HEADROOM_SHARE);
            // Rounding must never close the last sliver of headroom.
            if amount <= VOLUME_EPSILON {
                continue;
            }
            let accepted = self.container.add(fluid, amount, FillPolicy::Overflow);
            if accepted > 0.0 {
                added.insert(fluid, accepted);
            }
        }
        added
    }

    /// Inject fluid from outside. Capacity is not enforced.
    pub fn add_fluid(&mut self, fluid: FluidType, amount: Volume) -> Volume {
        self.container.add(fluid, amount, FillPolicy::Overflow)
    }

    pub fn drain(&mut self, fluid: FluidType, amount: Volume) -> Volume {
        self.container.drain(fluid, amount)
    }

    pub fn drain_all(&mut self, ratio: f64) -> BTreeMap<FluidType, Volume> {
        self.container.drain_all(ratio)
    }

    /// Empty the organ's container.
    pub fn reset(&mut self) {
        self.container.reset();
        self.pressure = PressureModel::new(&self.container);
    }

    // -----------------------------------------------------------------------
    // Condition
    // -----------------------------------------------------------------------

    pub fn damage(&mut self, amount: f64) {
        self.damage_level = (self.damage_level + non_negative(amount)).min(1.0);
        self.is_damaged = self.damage_level > DAMAGED_THRESHOLD;
    }

    pub fn heal(&mut self, amount: f64) {
        self.damage_level = (self.damage_level - non_negative(amount)).max(0.0);
        self.is_damaged = self.damage_level > DAMAGED_THRESHOLD;
    }

    pub fn overheat(&mut self, amount: f64) {
        self.temperature += non_negative(amount);
        self.refresh_heat_state();
    }

    pub fn cool_down(&mut self, amount: f64) {
        self.temperature = (self.temperature - non_negative(amount)).max(MIN_TEMPERATURE);
        self.refresh_heat_state();
    }

    fn refresh_heat_state(&mut self) {
        if self.temperature > OVERHEAT_THRESHOLD {
            self.is_overheated = true;
        } else if self.temperature < RECOVERY_THRESHOLD {
            self.is_overheated = false;
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the organ: passive cooling, production, pressure evaluation.
    pub fn tick(&mut self, dt: Dt, arousal: f64) -> Vec<FluidEvent> {
        let mut events = Vec::new();

        let factor = passive_cooling_factor(dt);
        self.temperature += (BASELINE_TEMPERATURE - self.temperature) * factor;
        self.refresh_heat_state();
        if self.is_overheated != self.reported_hot {
            self.reported_hot = self.is_overheated;
            let organ = self.name.clone();
            let temperature = self.temperature;
            events.push(if self.is_overheated {
                log::debug!("{organ}: overheated at {temperature:.1}");
                FluidEvent::Overheated { organ, temperature }
            } else {
                FluidEvent::CooledDown { organ, temperature }
            });
        }

        self.produce(dt, arousal, 1.0);
        self.evaluate_pressure(&mut events);
        events
    }

    /// Re-read pressure, emitting tier transitions and applying trauma.
    pub fn evaluate_pressure(&mut self, events: &mut Vec<FluidEvent>) {
        let update = self.pressure.update(&self.container, self.is_damaged);
        if update.tier_changed() {
            log::debug!(
                "{}: pressure tier {} -> {} (pressure {:.1})",
                self.name,
                update.previous,
                update.reading.tier,
                update.reading.pressure
            );
            events.push(FluidEvent::TierChanged {
                organ: self.name.clone(),
                from: update.previous,
                to: update.reading.tier,
            });
        }
        if update.trauma > 0.0 {
            self.damage(update.trauma);
            log::warn!(
                "{}: overpressure trauma at {:.1}, damage now {:.2}",
                self.name,
                update.reading.pressure,
                self.damage_level
            );
            events.push(FluidEvent::Trauma {
                organ: self.name.clone(),
                pressure: update.reading.pressure,
                damage_level: self.damage_level,
            });
        }
    }
}
