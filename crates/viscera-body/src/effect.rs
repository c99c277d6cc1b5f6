//! Effects: composable modifiers a body carries for a number of ticks.
//!
//! An effect is applied once, ticked with the body, and dropped when it
//! reports itself expired. Effects only reach the body through the public
//! API handed to each hook.

use std::fmt;

use viscera_core::fluid::FluidType;
use viscera_core::units::{Dt, Volume};
use viscera_fluid::organ::passive_cooling_factor;

use crate::body::Body;

pub trait Effect: fmt::Debug {
    fn name(&self) -> &str;

    /// Called once when the effect is attached.
    fn on_apply(&mut self, _body: &mut Body) {}

    /// Called at the start of every body tick.
    fn on_tick(&mut self, body: &mut Body, dt: Dt);

    fn is_expired(&self) -> bool {
        false
    }

    /// Called once after the tick on which the effect expired.
    fn on_expire(&mut self, _body: &mut Body) {}
}

/// Remaining lifetime of a timed effect, in ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Duration {
    remaining: f64,
}

impl Duration {
    pub fn ticks(ticks: f64) -> Self {
        Self {
            remaining: ticks.max(0.0),
        }
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn advance(&mut self, dt: Dt) {
        self.remaining = (self.remaining - dt.get()).max(0.0);
    }

    pub fn is_over(&self) -> bool {
        self.remaining <= 0.0
    }
}

/// Cools every reservoir each tick.
#[derive(Debug, Clone)]
pub struct Chill {
    pub per_tick: f64,
    pub duration: Duration,
}

impl Effect for Chill {
    fn name(&self) -> &str {
        "chill"
    }

    fn on_tick(&mut self, body: &mut Body, dt: Dt) {
        let amount = self.per_tick * dt.get();
        body.reservoirs_mut().for_each(|r| r.cool_down(amount));
        self.duration.advance(dt);
    }

    fn is_expired(&self) -> bool {
        self.duration.is_over()
    }
}

/// Raises every reservoir's temperature on apply and takes it back on expiry.
///
/// Passive cooling already sheds part of the added heat while the fever
/// runs, so expiry removes only the share still outstanding.
#[derive(Debug, Clone)]
pub struct Fever {
    degrees: f64,
    duration: Duration,
    outstanding: f64,
    /// Share of `outstanding` left after the cooling of the previous tick.
    retention: f64,
}

impl Fever {
    pub fn new(degrees: f64, duration: Duration) -> Self {
        Self {
            degrees: degrees.max(0.0),
            duration,
            outstanding: 0.0,
            retention: 1.0,
        }
    }

    /// Heat this fever still contributes to each organ.
    pub fn outstanding(&self) -> f64 {
        self.outstanding
    }
}

impl Effect for Fever {
    fn name(&self) -> &str {
        "fever"
    }

    fn on_apply(&mut self, body: &mut Body) {
        body.reservoirs_mut().for_each(|r| r.overheat(self.degrees));
        self.outstanding = self.degrees;
    }

    fn on_tick(&mut self, _body: &mut Body, dt: Dt) {
        // Effects run before organs cool, so this tick's cooling lands next time.
        self.outstanding *= self.retention;
        self.retention = 1.0 - passive_cooling_factor(dt);
        self.duration.advance(dt);
    }

    fn is_expired(&self) -> bool {
        self.duration.is_over()
    }

    fn on_expire(&mut self, body: &mut Body) {
        let residual = self.outstanding;
        body.reservoirs_mut().for_each(|r| r.cool_down(residual));
        self.outstanding = 0.0;
    }
}

/// Pumps fluid into the body's source of that fluid every tick.
///
/// Goes through `add_fluid`, so it can push a reservoir past capacity.
#[derive(Debug, Clone)]
pub struct Inflate {
    pub fluid: FluidType,
    pub per_tick: Volume,
    pub duration: Duration,
}

impl Effect for Inflate {
    fn name(&self) -> &str {
        "inflate"
    }

    fn on_tick(&mut self, body: &mut Body, dt: Dt) {
        if let Some(source) = body.fluid_source_mut(self.fluid) {
            source.add_fluid(self.fluid, self.per_tick * dt.get());
        }
        self.duration.advance(dt);
    }

    fn is_expired(&self) -> bool {
        self.duration.is_over()
    }
}
