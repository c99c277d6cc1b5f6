//! A body: the arena that owns every container, reservoir, outlet and
//! conduit, and resolves the ids they use to refer to each other.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use viscera_core::fluid::FluidType;
use viscera_core::id::{ConduitId, ContainerId, OutletId, ReservoirId};
use viscera_core::units::{Dt, Volume};
use viscera_fluid::{
    AggregateReservoir, ContainerArena, ExpelFailure, Expulsion, ExpulsionOrgan, FillPolicy,
    FluidContainer, FluidEvent, PressureReading, PressureTier, TransportConduit,
};

use crate::effect::Effect;

/// Where an external fill or drain should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluidTarget {
    Container(ContainerId),
    Reservoir(ReservoirId),
    /// Whatever reservoir is registered as the source of this fluid.
    Source(FluidType),
}

/// Read-only snapshot of one vessel for display or combat code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselStatus {
    pub contents: BTreeMap<FluidType, Volume>,
    pub total: Volume,
    pub capacity: Volume,
    pub fullness: f64,
    pub pressure: f64,
    pub tier: PressureTier,
}

impl VesselStatus {
    pub fn stored(&self, fluid: FluidType) -> Volume {
        self.contents.get(&fluid).copied().unwrap_or(0.0)
    }
}

/// Read-only snapshot of an outlet's shape and state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutletStatus {
    pub erect: bool,
    pub length_cm: f64,
    pub girth_cm: f64,
    pub orifice_diameter_mm: f64,
    pub has_knot: bool,
    pub attached: bool,
}

#[derive(Debug, Default)]
pub struct Body {
    name: String,
    arousal: f64,
    containers: ContainerArena,
    container_names: BTreeMap<String, ContainerId>,
    reservoirs: SlotMap<ReservoirId, AggregateReservoir>,
    outlets: SlotMap<OutletId, ExpulsionOrgan>,
    conduits: SlotMap<ConduitId, TransportConduit>,
    sources: BTreeMap<FluidType, ReservoirId>,
    effects: Vec<Box<dyn Effect>>,
}

impl Body {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arousal(&self) -> f64 {
        self.arousal
    }

    /// Set arousal, clamped to `[0, 1]`.
    pub fn set_arousal(&mut self, arousal: f64) {
        self.arousal = if arousal.is_nan() { 0.0 } else { arousal.clamp(0.0, 1.0) };
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn add_container(&mut self, name: impl Into<String>, container: FluidContainer) -> ContainerId {
        let id = self.containers.insert(container);
        self.container_names.insert(name.into(), id);
        id
    }

    pub fn add_reservoir(&mut self, reservoir: AggregateReservoir) -> ReservoirId {
        self.reservoirs.insert(reservoir)
    }

    pub fn add_outlet(&mut self, outlet: ExpulsionOrgan) -> OutletId {
        self.outlets.insert(outlet)
    }

    pub fn add_conduit(&mut self, conduit: TransportConduit) -> ConduitId {
        self.conduits.insert(conduit)
    }

    /// Declare `reservoir` as the body's source of `fluid`.
    ///
    /// Returns the reservoir previously registered for `fluid`, if any.
    pub fn register_source(&mut self, fluid: FluidType, reservoir: ReservoirId) -> Option<ReservoirId> {
        self.sources.insert(fluid, reservoir)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// The reservoir that supplies `fluid`, if this body has one.
    pub fn fluid_source(&self, fluid: FluidType) -> Option<&AggregateReservoir> {
        self.sources.get(&fluid).and_then(|id| self.reservoirs.get(*id))
    }

    pub fn fluid_source_mut(&mut self, fluid: FluidType) -> Option<&mut AggregateReservoir> {
        let id = *self.sources.get(&fluid)?;
        self.reservoirs.get_mut(id)
    }

    pub fn container(&self, id: ContainerId) -> Option<&FluidContainer> {
        self.containers.get(id)
    }

    pub fn container_mut(&mut self, id: ContainerId) -> Option<&mut FluidContainer> {
        self.containers.get_mut(id)
    }

    pub fn container_id(&self, name: &str) -> Option<ContainerId> {
        self.container_names.get(name).copied()
    }

    pub fn containers(&self) -> &ContainerArena {
        &self.containers
    }

    pub fn reservoir(&self, id: ReservoirId) -> Option<&AggregateReservoir> {
        self.reservoirs.get(id)
    }

    pub fn reservoir_mut(&mut self, id: ReservoirId) -> Option<&mut AggregateReservoir> {
        self.reservoirs.get_mut(id)
    }

    pub fn reservoir_id(&self, name: &str) -> Option<ReservoirId> {
        self.reservoirs
            .iter()
            .find(|(_, r)| r.name() == name)
            .map(|(id, _)| id)
    }

    pub fn reservoirs_mut(&mut self) -> impl Iterator<Item = &mut AggregateReservoir> {
        self.reservoirs.values_mut()
    }

    pub fn outlet(&self, id: OutletId) -> Option<&ExpulsionOrgan> {
        self.outlets.get(id)
    }

    pub fn outlet_mut(&mut self, id: OutletId) -> Option<&mut ExpulsionOrgan> {
        self.outlets.get_mut(id)
    }

    pub fn outlet_id(&self, name: &str) -> Option<OutletId> {
        self.outlets
            .iter()
            .find(|(_, o)| o.name() == name)
            .map(|(id, _)| id)
    }

    pub fn conduit(&self, id: ConduitId) -> Option<&TransportConduit> {
        self.conduits.get(id)
    }

    pub fn conduit_mut(&mut self, id: ConduitId) -> Option<&mut TransportConduit> {
        self.conduits.get_mut(id)
    }

    pub fn conduit_id(&self, name: &str) -> Option<ConduitId> {
        self.conduits
            .iter()
            .find(|(_, c)| c.name() == name)
            .map(|(id, _)| id)
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    pub fn container_status(&self, id: ContainerId) -> Option<VesselStatus> {
        let c = self.containers.get(id)?;
        let reading = PressureReading::of(c);
        Some(VesselStatus {
            contents: c.contents().clone(),
            total: c.total(),
            capacity: c.capacity(),
            fullness: c.fullness(),
            pressure: reading.pressure,
            tier: reading.tier,
        })
    }

    pub fn outlet_status(&self, id: OutletId) -> Option<OutletStatus> {
        let o = self.outlets.get(id)?;
        Some(OutletStatus {
            erect: o.is_erect(),
            length_cm: o.effective_length_cm(),
            girth_cm: o.effective_girth_cm(),
            orifice_diameter_mm: o.effective_orifice_diameter_mm(),
            has_knot: o.factors().has_knot,
            attached: o.source().is_some_and(|r| self.reservoirs.contains_key(r)),
        })
    }

    pub fn reservoir_status(&self, id: ReservoirId) -> Option<VesselStatus> {
        let r = self.reservoirs.get(id)?;
        Some(VesselStatus {
            contents: r.contents(),
            total: r.total(),
            capacity: r.capacity(),
            fullness: r.fullness(),
            pressure: r.pressure(),
            tier: r.pressure_tier(),
        })
    }

    // -----------------------------------------------------------------------
    // Fluid operations
    // -----------------------------------------------------------------------

    /// Inject fluid from outside. Reservoirs accept overflow; standalone
    /// containers clamp to capacity.
    pub fn add_fluid(&mut self, target: FluidTarget, fluid: FluidType, amount: Volume) -> Volume {
        match target {
            FluidTarget::Container(id) => self
                .containers
                .get_mut(id)
                .map_or(0.0, |c| c.add(fluid, amount, FillPolicy::Clamp)),
            FluidTarget::Reservoir(id) => self
                .reservoirs
                .get_mut(id)
                .map_or(0.0, |r| r.add_fluid(fluid, amount)),
            FluidTarget::Source(kind) => self
                .fluid_source_mut(kind)
                .map_or(0.0, |r| r.add_fluid(fluid, amount)),
        }
    }

    pub fn drain_fluid(&mut self, target: FluidTarget, fluid: FluidType, amount: Volume) -> Volume {
        match target {
            FluidTarget::Container(id) => self
                .containers
                .get_mut(id)
                .map_or(0.0, |c| c.drain(fluid, amount)),
            FluidTarget::Reservoir(id) => self
                .reservoirs
                .get_mut(id)
                .map_or(0.0, |r| r.drain_fluid(fluid, amount)),
            FluidTarget::Source(kind) => self
                .fluid_source_mut(kind)
                .map_or(0.0, |r| r.drain_fluid(fluid, amount)),
        }
    }

    /// Expel through `outlet` from whatever reservoir it is attached to.
    pub fn expel(
        &mut self,
        outlet: OutletId,
        requested: Option<Volume>,
        fluid: FluidType,
        force: f64,
    ) -> Expulsion {
        let Some(organ) = self.outlets.get(outlet) else {
            return Expulsion::failed(ExpelFailure::NoReservoir);
        };
        let reservoir = organ.source().and_then(|id| self.reservoirs.get_mut(id));
        organ.expel(reservoir, requested, fluid, force)
    }

    pub fn expel_all(&mut self, outlet: OutletId, fluid: FluidType, force: f64) -> Expulsion {
        let Some(organ) = self.outlets.get(outlet) else {
            return Expulsion::failed(ExpelFailure::NoReservoir);
        };
        let reservoir = organ.source().and_then(|id| self.reservoirs.get_mut(id));
        organ.expel_all(reservoir, fluid, force)
    }

    /// Put fluid straight into a conduit (swallowing from outside).
    pub fn swallow(&mut self, conduit: ConduitId, fluid: FluidType, amount: Volume) -> Volume {
        self.conduits
            .get_mut(conduit)
            .map_or(0.0, |c| c.accept(fluid, amount))
    }

    /// Move fluid from a conduit's source into the conduit.
    pub fn intake(&mut self, conduit: ConduitId, fluid: FluidType, amount: Volume) -> Volume {
        let Some(c) = self.conduits.get_mut(conduit) else {
            return 0.0;
        };
        c.intake(&mut self.containers, fluid, amount)
    }

    pub fn reflux(&mut self, conduit: ConduitId, fluid: FluidType, amount: Volume) -> Volume {
        let Some(c) = self.conduits.get_mut(conduit) else {
            return 0.0;
        };
        c.reflux(&mut self.containers, fluid, amount)
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    pub fn apply_effect(&mut self, mut effect: Box<dyn Effect>) {
        log::info!("{}: applying effect {}", self.name, effect.name());
        effect.on_apply(self);
        self.effects.push(effect);
    }

    pub fn effects(&self) -> impl Iterator<Item = &dyn Effect> {
        self.effects.iter().map(|e| e.as_ref())
    }

    fn tick_effects(&mut self, dt: Dt) {
        let mut active = std::mem::take(&mut self.effects);
        for effect in active.iter_mut() {
            effect.on_tick(self, dt);
        }
        let (expired, mut kept): (Vec<_>, Vec<_>) =
            active.into_iter().partition(|e| e.is_expired());
        for mut effect in expired {
            log::info!("{}: effect {} expired", self.name, effect.name());
            effect.on_expire(self);
        }
        // Effects applied from inside a hook land after the survivors.
        kept.append(&mut self.effects);
        self.effects = kept;
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the body: effects, reservoirs, outlet arousal, conduits.
    pub fn tick(&mut self, dt: Dt) -> Vec<FluidEvent> {
        self.tick_effects(dt);

        let arousal = self.arousal;
        let events: Vec<FluidEvent> = self
            .reservoirs
            .values_mut()
            .flat_map(|r| r.tick(dt, arousal))
            .collect();

        for outlet in self.outlets.values_mut() {
            outlet.respond_to_arousal(arousal);
        }

        for conduit in self.conduits.values_mut() {
            conduit.tick(&mut self.containers, dt);
        }

        events
    }

    /// Expel and report it as an event alongside the result.
    pub fn expel_with_event(
        &mut self,
        outlet: OutletId,
        requested: Option<Volume>,
        fluid: FluidType,
        force: f64,
    ) -> (Expulsion, Option<FluidEvent>) {
        let result = self.expel(outlet, requested, fluid, force);
        let event = match self.outlets.get(outlet) {
            Some(organ) if result.succeeded() => Some(FluidEvent::Expelled {
                outlet: organ.name().to_string(),
                amount: result.amount,
                pulses: result.pulses,
            }),
            _ => None,
        };
        (result, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viscera_core::test_utils::*;
    use viscera_fluid::{OrificeProfile, OutletGeometry, ProducingOrgan};

    struct Fixture {
        body: Body,
        pool: ReservoirId,
        outlet: OutletId,
        mouth: ContainerId,
        stomach: ContainerId,
        throat: ConduitId,
    }

    fn fixture() -> Fixture {
        let mut body = Body::new("subject");
        let pool = body.add_reservoir(
            AggregateReservoir::new("pool")
                .with_organ(ProducingOrgan::new("left", 20.0).unwrap().with_rate(cum(), 0.5).unwrap())
                .with_organ(ProducingOrgan::new("right", 20.0).unwrap().with_rate(cum(), 0.5).unwrap()),
        );
        body.register_source(cum(), pool);
        let outlet = body.add_outlet(
            ExpulsionOrgan::new("outlet", OutletGeometry::default(), OrificeProfile::Standard)
                .unwrap()
                .with_source(pool),
        );
        let mouth = body.add_container("mouth", FluidContainer::new(50.0).unwrap());
        let stomach = body.add_container("stomach", FluidContainer::new(1000.0).unwrap());
        let throat = body.add_conduit(
            TransportConduit::new("throat", 40.0)
                .unwrap()
                .connect(Some(mouth), Some(stomach)),
        );
        Fixture {
            body,
            pool,
            outlet,
            mouth,
            stomach,
            throat,
        }
    }

    #[test]
    fn fluid_source_is_a_capability() {
        let f = fixture();
        assert!(f.body.fluid_source(cum()).is_some());
        assert!(f.body.fluid_source(milk()).is_none());
    }

    #[test]
    fn reregistering_a_source_returns_the_old_one() {
        let mut f = fixture();
        let spare = f.body.add_reservoir(AggregateReservoir::new("spare"));
        assert_eq!(f.body.register_source(cum(), spare), Some(f.pool));
        assert_eq!(f.body.register_source(milk(), spare), None);
        assert_eq!(f.body.fluid_source(cum()).unwrap().name(), "spare");
    }

    #[test]
    fn lookups_by_name() {
        let f = fixture();
        assert_eq!(f.body.reservoir_id("pool"), Some(f.pool));
        assert_eq!(f.body.outlet_id("outlet"), Some(f.outlet));
        assert_eq!(f.body.container_id("mouth"), Some(f.mouth));
        assert_eq!(f.body.conduit_id("throat"), Some(f.throat));
        assert_eq!(f.body.container_id("liver"), None);
    }

    #[test]
    fn add_fluid_routes_by_target() {
        let mut f = fixture();
        assert_close(f.body.add_fluid(FluidTarget::Source(cum()), cum(), 10.0), 10.0);
        assert_close(f.body.add_fluid(FluidTarget::Container(f.mouth), water(), 80.0), 50.0);
        assert_eq!(f.body.add_fluid(FluidTarget::Source(milk()), milk(), 10.0), 0.0);
        assert_close(f.body.reservoir(f.pool).unwrap().stored(cum()), 10.0);
    }

    #[test]
    fn reservoir_overflow_is_allowed_from_outside() {
        let mut f = fixture();
        f.body.add_fluid(FluidTarget::Reservoir(f.pool), cum(), 60.0);
        let status = f.body.reservoir_status(f.pool).unwrap();
        assert_eq!(status.tier, PressureTier::RuptureRisk);
        assert_close(status.fullness, 1.5);
    }

    #[test]
    fn expel_resolves_the_attached_reservoir() {
        let mut f = fixture();
        f.body.add_fluid(FluidTarget::Source(cum()), cum(), 20.0);
        let (result, event) = f.body.expel_with_event(f.outlet, Some(2.0), cum(), 1.0);
        assert!(result.succeeded());
        assert_close(result.amount, 2.0);
        assert!(matches!(event, Some(FluidEvent::Expelled { .. })));
        assert_close(f.body.reservoir(f.pool).unwrap().stored(cum()), 18.0);
    }

    #[test]
    fn detached_outlet_expels_nothing() {
        let mut f = fixture();
        f.body.add_fluid(FluidTarget::Source(cum()), cum(), 20.0);
        f.body.outlet_mut(f.outlet).unwrap().detach();
        let result = f.body.expel_all(f.outlet, cum(), 1.0);
        assert_eq!(result.reason, Some(ExpelFailure::NoReservoir));
        assert_eq!(result.pulses, 0);
    }

    #[test]
    fn tick_produces_engorges_and_moves_conduit_contents() {
        let mut f = fixture();
        f.body.set_arousal(0.5);
        f.body.swallow(f.throat, water(), 10.0);
        f.body.tick(dt(1.0));

        assert_close(f.body.reservoir(f.pool).unwrap().stored(cum()), 2.0);
        assert!(f.body.outlet(f.outlet).unwrap().is_erect());
        assert_close(f.body.container(f.stomach).unwrap().amount(water()), 5.0);
    }

    #[test]
    fn intake_and_reflux_go_through_the_arena() {
        let mut f = fixture();
        f.body.add_fluid(FluidTarget::Container(f.mouth), saliva(), 6.0);
        assert_close(f.body.intake(f.throat, saliva(), 4.0), 4.0);
        f.body.tick(dt(2.0));
        assert_close(f.body.container(f.stomach).unwrap().amount(saliva()), 4.0);
        assert_close(f.body.reflux(f.throat, saliva(), 3.0), 3.0);
        let mouth = f.body.container_status(f.mouth).unwrap();
        assert_close(mouth.stored(saliva()), 5.0);
    }

    #[test]
    fn outlet_status_tracks_engorgement() {
        let mut f = fixture();
        let flaccid = f.body.outlet_status(f.outlet).unwrap();
        assert!(!flaccid.erect);
        assert!(flaccid.attached);
        assert_close(flaccid.girth_cm, 3.5 * std::f64::consts::PI);
        assert_close(flaccid.orifice_diameter_mm, 8.0);

        f.body.set_arousal(0.6);
        f.body.tick(dt(1.0));
        let erect = f.body.outlet_status(f.outlet).unwrap();
        assert!(erect.erect);
        assert!(erect.length_cm > flaccid.length_cm);
        assert_close(erect.orifice_diameter_mm, 8.0 * 1.3);

        f.body.outlet_mut(f.outlet).unwrap().detach();
        assert!(!f.body.outlet_status(f.outlet).unwrap().attached);
    }

    #[test]
    fn arousal_is_clamped() {
        let mut body = Body::new("b");
        body.set_arousal(4.0);
        assert_eq!(body.arousal(), 1.0);
        body.set_arousal(-1.0);
        assert_eq!(body.arousal(), 0.0);
    }
}
