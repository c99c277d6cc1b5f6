use serde::{Deserialize, Serialize};
use viscera_core::units::Volume;

use crate::pressure::PressureTier;

/// Events emitted by organs on state transitions.
///
/// Like pressure-low/restored in a fluid network, these fire only when
/// something changes, never every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FluidEvent {
    /// An organ's pressure tier moved.
    TierChanged {
        organ: String,
        from: PressureTier,
        to: PressureTier,
    },
    /// Overpressure caused a one-shot damage increment.
    Trauma {
        organ: String,
        pressure: f64,
        damage_level: f64,
    },
    /// An organ crossed the overheat threshold.
    Overheated { organ: String, temperature: f64 },
    /// An organ cooled enough to produce again.
    CooledDown { organ: String, temperature: f64 },
    /// A reservoir's retraction flag flipped on.
    Retracted { reservoir: String },
    /// A reservoir's retraction flag flipped off.
    Released { reservoir: String },
    /// An outlet expelled fluid.
    Expelled {
        outlet: String,
        amount: Volume,
        pulses: u32,
    },
}

impl FluidEvent {
    /// The organ, reservoir or outlet the event concerns.
    pub fn subject(&self) -> &str {
        match self {
            FluidEvent::TierChanged { organ, .. }
            | FluidEvent::Trauma { organ, .. }
            | FluidEvent::Overheated { organ, .. }
            | FluidEvent::CooledDown { organ, .. } => organ,
            FluidEvent::Retracted { reservoir } | FluidEvent::Released { reservoir } => reservoir,
            FluidEvent::Expelled { outlet, .. } => outlet,
        }
    }
}
