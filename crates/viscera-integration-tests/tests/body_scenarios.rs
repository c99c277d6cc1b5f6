//! Cross-crate scenarios: a body assembled from presets or by hand, ticked
//! through a session, with expulsion, swallowing and effects interleaved.

use std::path::Path;

use viscera_body::{Body, Duration, Fever, FluidTarget, Inflate, Session};
use viscera_core::fluid::FluidType;
use viscera_core::test_utils::*;
use viscera_core::units::Dt;
use viscera_data::{Format, parse_body};
use viscera_fluid::{
    AggregateReservoir, ExpelFailure, ExpulsionOrgan, FluidContainer, FluidEvent, OrificeProfile,
    OutletGeometry, PressureTier, ProducingOrgan, TransportConduit,
};

// ===========================================================================
// Fixtures
// ===========================================================================

const PRESET: &str = r#"(
    name: "subject",
    containers: [
        (name: "mouth", capacity: 60.0),
        (name: "stomach", capacity: 1500.0),
    ],
    reservoirs: [
        (
            name: "testes",
            supplies: ["cum"],
            organs: [
                (name: "left", capacity: 20.0, rates: {"cum": 0.3}),
                (name: "right", capacity: 20.0, rates: {"cum": 0.3}),
            ],
        ),
        (
            name: "breasts",
            supplies: ["milk"],
            organs: [
                (name: "left", capacity: 300.0, rates: {"milk": 1.5}),
                (name: "right", capacity: 300.0, rates: {"milk": 1.5}),
            ],
        ),
    ],
    outlets: [
        (name: "penis", reservoir: Some("testes")),
        (name: "nipples", reservoir: Some("breasts"), profile: "flared", urethra_diameter_mm: Some(1.0)),
    ],
    conduits: [
        (name: "esophagus", volume: 40.0, from: Some("mouth"), to: Some("stomach")),
    ],
)"#;

fn subject() -> Body {
    parse_body(PRESET, Format::Ron, Path::new("subject.ron")).unwrap()
}

fn stored(body: &Body, fluid: FluidType) -> f64 {
    body.fluid_source(fluid).map_or(0.0, |r| r.stored(fluid))
}

// ===========================================================================
// Production and pressure
// ===========================================================================

#[test]
fn idle_body_fills_toward_but_not_past_capacity() {
    let mut body = subject();
    for _ in 0..500 {
        body.tick(dt(1.0));
    }
    let testes = body.fluid_source(cum()).unwrap();
    assert!(testes.total() < testes.capacity());
    assert!(testes.fullness() > 0.9);
    assert!(testes.organs().iter().all(|o| o.damage_level() == 0.0));
}

#[test]
fn arousal_speeds_up_production() {
    let mut calm = subject();
    let mut excited = subject();
    excited.set_arousal(1.0);
    for _ in 0..5 {
        calm.tick(dt(1.0));
        excited.tick(dt(1.0));
    }
    assert!(stored(&excited, cum()) > 2.0 * stored(&calm, cum()));
}

#[test]
fn external_overfill_causes_trauma_and_rupture_risk() {
    let mut body = subject();
    body.add_fluid(FluidTarget::Source(cum()), cum(), 60.0);

    let events = body.tick(dt(1.0));

    let testes = body.fluid_source(cum()).unwrap();
    assert_eq!(testes.pressure_tier(), PressureTier::RuptureRisk);
    assert!(testes.pressure() > 120.0);
    let trauma = events
        .iter()
        .filter(|e| matches!(e, FluidEvent::Trauma { .. }))
        .count();
    assert_eq!(trauma, 2);
}

#[test]
fn zero_dt_tick_changes_nothing() {
    let mut body = subject();
    body.add_fluid(FluidTarget::Source(milk()), milk(), 250.0);
    let before = body.reservoir_status(body.reservoir_id("breasts").unwrap()).unwrap();
    body.tick(Dt::ZERO);
    let after = body.reservoir_status(body.reservoir_id("breasts").unwrap()).unwrap();
    assert_eq!(before, after);
}

// ===========================================================================
// Expulsion
// ===========================================================================

#[test]
fn expelling_drains_both_organs_evenly() {
    let mut body = subject();
    body.add_fluid(FluidTarget::Source(cum()), cum(), 30.0);
    let penis = body.outlet_id("penis").unwrap();

    let result = body.expel(penis, Some(10.0), cum(), 2.0);

    assert_close(result.amount, 10.0);
    assert_eq!(result.pulses, 3);
    assert_close(result.remaining, 20.0);
    let testes = body.fluid_source(cum()).unwrap();
    assert_close(testes.organs()[0].stored(cum()), 10.0);
    assert_close(testes.organs()[1].stored(cum()), 10.0);
}

#[test]
fn narrow_ducts_need_several_pulses() {
    let mut body = subject();
    body.add_fluid(FluidTarget::Source(milk()), milk(), 400.0);
    let nipples = body.outlet_id("nipples").unwrap();

    let result = body.expel_all(nipples, milk(), 0.5);

    assert_eq!(result.pulses, 5);
    assert!(result.amount < 400.0);
    assert_close(result.remaining, 400.0 - result.amount);
}

#[test]
fn detached_outlet_reports_no_reservoir() {
    let mut body = subject();
    let penis = body.outlet_id("penis").unwrap();
    body.outlet_mut(penis).unwrap().detach();

    let result = body.expel(penis, Some(5.0), cum(), 1.0);

    assert_eq!(result.amount, 0.0);
    assert_eq!(result.pulses, 0);
    assert_eq!(result.reason, Some(ExpelFailure::NoReservoir));
}

#[test]
fn expel_with_event_reports_success_only() {
    let mut body = subject();
    let penis = body.outlet_id("penis").unwrap();

    let (empty, none) = body.expel_with_event(penis, None, cum(), 1.0);
    assert_eq!(empty.reason, Some(ExpelFailure::Empty));
    assert!(none.is_none());

    body.add_fluid(FluidTarget::Source(cum()), cum(), 20.0);
    let (result, event) = body.expel_with_event(penis, None, cum(), 1.0);
    match event {
        Some(FluidEvent::Expelled { outlet, amount, pulses }) => {
            assert_eq!(outlet, "penis");
            assert_close(amount, result.amount);
            assert_eq!(pulses, result.pulses);
        }
        other => panic!("expected an expulsion event, got {other:?}"),
    }
}

// ===========================================================================
// Conduits
// ===========================================================================

#[test]
fn swallowed_fluid_reaches_the_stomach() {
    let mut body = subject();
    let esophagus = body.conduit_id("esophagus").unwrap();
    let stomach = body.container_id("stomach").unwrap();

    assert_close(body.swallow(esophagus, water(), 30.0), 30.0);
    for _ in 0..40 {
        body.tick(dt(1.0));
    }

    assert_close_within(body.container(stomach).unwrap().amount(water()), 30.0, 1e-6);
}

#[test]
fn mouth_intake_and_reflux() {
    let mut body = subject();
    let esophagus = body.conduit_id("esophagus").unwrap();
    let mouth = body.container_id("mouth").unwrap();
    let stomach = body.container_id("stomach").unwrap();

    body.add_fluid(FluidTarget::Container(mouth), saliva(), 10.0);
    assert_close(body.intake(esophagus, saliva(), 10.0), 10.0);
    assert_close(body.container(mouth).unwrap().amount(saliva()), 0.0);

    body.tick(dt(2.0));
    assert_close(body.container(stomach).unwrap().amount(saliva()), 10.0);

    let moved = body.reflux(esophagus, saliva(), 4.0);
    assert_close(moved, 4.0);
    assert_close(body.container(mouth).unwrap().amount(saliva()), 4.0);
    assert_close(body.container(stomach).unwrap().amount(saliva()), 6.0);
}

// ===========================================================================
// Effects and sessions
// ===========================================================================

#[test]
fn fever_stops_production_until_it_breaks() {
    let mut healthy = subject();
    let mut feverish = subject();
    feverish.apply_effect(Box::new(Fever::new(4.0, Duration::ticks(3.0))));

    healthy.tick(dt(1.0));
    let events = feverish.tick(dt(1.0));

    assert!(events.iter().any(|e| matches!(e, FluidEvent::Overheated { .. })));
    assert_eq!(stored(&feverish, cum()), 0.0);
    assert_close(stored(&healthy, cum()), 0.6);

    for _ in 0..3 {
        feverish.tick(dt(1.0));
    }
    assert_eq!(feverish.effects().count(), 0);
    assert!(stored(&feverish, cum()) > 0.0);
}

#[test]
fn session_steps_independent_bodies() {
    let mut session = Session::new();
    let a = session.add_body(subject());
    let b = session.add_body(subject());
    session.body_mut(b).unwrap().apply_effect(Box::new(Inflate {
        fluid: cum(),
        per_tick: 20.0,
        duration: Duration::ticks(3.0),
    }));

    let mut events = Vec::new();
    for _ in 0..3 {
        events.extend(session.step(dt(1.0)));
    }

    assert_eq!(session.tick(), 3);
    assert!(events
        .iter()
        .any(|(id, e)| *id == b && matches!(e, FluidEvent::Trauma { .. })));
    assert!(events.iter().all(|(id, e)| *id != a || !matches!(e, FluidEvent::Trauma { .. })));
}

#[test]
fn hand_built_body_matches_preset_behavior() {
    let mut body = Body::new("manual");
    let mouth = body.add_container("mouth", FluidContainer::new(60.0).unwrap());
    let stomach = body.add_container("stomach", FluidContainer::new(1500.0).unwrap());
    let testes = body.add_reservoir(
        AggregateReservoir::new("testes")
            .with_organ(ProducingOrgan::new("left", 20.0).unwrap().with_rate(cum(), 0.3).unwrap())
            .with_organ(ProducingOrgan::new("right", 20.0).unwrap().with_rate(cum(), 0.3).unwrap()),
    );
    body.register_source(cum(), testes);
    body.add_outlet(
        ExpulsionOrgan::new("penis", OutletGeometry::default(), OrificeProfile::Standard)
            .unwrap()
            .with_source(testes),
    );
    body.add_conduit(
        TransportConduit::new("esophagus", 40.0)
            .unwrap()
            .connect(Some(mouth), Some(stomach)),
    );

    let mut preset = subject();
    for _ in 0..20 {
        body.tick(dt(1.0));
        preset.tick(dt(1.0));
    }
    assert_close(stored(&body, cum()), stored(&preset, cum()));
}
