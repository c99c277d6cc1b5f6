//! An explicitly constructed simulation session holding several bodies.
//!
//! There is no process-wide session; callers create one and pass it by
//! reference to whatever drives turns.

use slotmap::SlotMap;
use viscera_core::id::BodyId;
use viscera_core::units::{Dt, Ticks};
use viscera_fluid::FluidEvent;

use crate::body::Body;

#[derive(Debug, Default)]
pub struct Session {
    bodies: SlotMap<BodyId, Body>,
    tick: Ticks,
    elapsed: f64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_body(&mut self, body: Body) -> BodyId {
        self.bodies.insert(body)
    }

    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        self.bodies.remove(id)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    pub fn body_id(&self, name: &str) -> Option<BodyId> {
        self.bodies
            .iter()
            .find(|(_, b)| b.name() == name)
            .map(|(id, _)| id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies.iter()
    }

    /// Number of completed steps.
    pub fn tick(&self) -> Ticks {
        self.tick
    }

    /// Sum of all `dt` stepped so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advance every body by `dt` and collect their events.
    pub fn step(&mut self, dt: Dt) -> Vec<(BodyId, FluidEvent)> {
        let mut events = Vec::new();
        for (id, body) in self.bodies.iter_mut() {
            events.extend(body.tick(dt).into_iter().map(|e| (id, e)));
        }
        self.tick += 1;
        self.elapsed += dt.get();
        events
    }
}
