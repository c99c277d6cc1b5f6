//! Expulsion organs: outlets that drain a reservoir in bounded pulses.
//!
//! Output strength comes from orifice geometry, the applied force and the
//! reservoir's pressure multiplier. An outlet never owns its reservoir; it
//! is handed one (or `None`) per call, and with `None` every output is zero.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use viscera_core::error::{ValidationError, ensure_range};
use viscera_core::fluid::FluidType;
use viscera_core::id::ReservoirId;
use viscera_core::units::{Volume, non_negative};

use crate::pressure::PressureTier;
use crate::reservoir::AggregateReservoir;

/// Hard cap on pulses per expulsion.
pub const MAX_PULSES: u32 = 5;
/// Expulsion stops once less than this remains of the request. A
/// reservoir holding less than this of a fluid counts as empty for it.
pub const MIN_REMAINING: Volume = 0.1;
/// Smallest volume a single pulse may carry.
pub const MIN_PULSE_VOLUME: Volume = 1.0;
/// Scale constant applied to the pulse volume formula.
pub const PULSE_SCALE: f64 = 0.5;
/// Orifice diameter multiplier while engorged.
pub const ENGORGED_EXPANSION: f64 = 1.3;
/// Arousal at which the organ becomes engorged.
pub const ENGORGE_AROUSAL: f64 = 0.4;
/// Share of full length while flaccid.
pub const FLACCID_LENGTH_SHARE: f64 = 0.6;

/// Shape family of an outlet, resolved once into [`ProfileFactors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrificeProfile {
    #[default]
    Standard,
    Tapered,
    Flared,
    Knotted,
}

/// Numeric factors a profile contributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileFactors {
    pub length_factor: f64,
    pub girth_factor: f64,
    pub has_knot: bool,
    /// Multiplies pulse volume.
    pub volume_multiplier: f64,
}

impl OrificeProfile {
    pub const fn factors(self) -> ProfileFactors {
        match self {
            OrificeProfile::Standard => ProfileFactors {
                length_factor: 1.0,
                girth_factor: 1.0,
                has_knot: false,
                volume_multiplier: 1.0,
            },
            OrificeProfile::Tapered => ProfileFactors {
                length_factor: 1.1,
                girth_factor: 0.9,
                has_knot: false,
                volume_multiplier: 0.9,
            },
            OrificeProfile::Flared => ProfileFactors {
                length_factor: 1.3,
                girth_factor: 1.2,
                has_knot: false,
                volume_multiplier: 1.5,
            },
            OrificeProfile::Knotted => ProfileFactors {
                length_factor: 1.0,
                girth_factor: 1.1,
                has_knot: true,
                volume_multiplier: 1.3,
            },
        }
    }
}

/// Physical dimensions of an outlet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry")]
pub struct OutletGeometry {
    pub length_cm: f64,
    pub diameter_cm: f64,
    pub urethra_diameter_mm: f64,
}

#[derive(Deserialize)]
struct RawGeometry {
    length_cm: f64,
    diameter_cm: f64,
    urethra_diameter_mm: f64,
}

impl TryFrom<RawGeometry> for OutletGeometry {
    type Error = ValidationError;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        OutletGeometry {
            length_cm: raw.length_cm,
            diameter_cm: raw.diameter_cm,
            urethra_diameter_mm: raw.urethra_diameter_mm,
        }
        .validate()
    }
}

impl Default for OutletGeometry {
    fn default() -> Self {
        Self {
            length_cm: 14.0,
            diameter_cm: 3.5,
            urethra_diameter_mm: 8.0,
        }
    }
}

impl OutletGeometry {
    fn validate(self) -> Result<Self, ValidationError> {
        for (field, value) in [
            ("length_cm", self.length_cm),
            ("diameter_cm", self.diameter_cm),
            ("urethra_diameter_mm", self.urethra_diameter_mm),
        ] {
            ensure_range(field, value, 0.0, f64::MAX)?;
        }
        Ok(self)
    }
}

/// Why an expulsion produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpelFailure {
    NoReservoir,
    /// Less than [`MIN_REMAINING`] of the fluid is stored.
    Empty,
}

impl ExpelFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpelFailure::NoReservoir => "no_reservoir",
            ExpelFailure::Empty => "empty",
        }
    }
}

/// Result of one expulsion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Expulsion {
    pub amount: Volume,
    pub pulses: u32,
    pub reason: Option<ExpelFailure>,
    /// Reservoir tier before the first pulse.
    pub tier: PressureTier,
    /// Pulse cap at the start of the expulsion.
    pub max_per_pulse: Volume,
    /// Reservoir volume of the expelled fluid left afterwards.
    pub remaining: Volume,
}

impl Expulsion {
    /// A zero result carrying the reason nothing was expelled.
    pub fn failed(reason: ExpelFailure) -> Self {
        Self {
            amount: 0.0,
            pulses: 0,
            reason: Some(reason),
            tier: PressureTier::Normal,
            max_per_pulse: 0.0,
            remaining: 0.0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.reason.is_none() && self.amount > 0.0
    }
}

/// An outlet that may consume from one reservoir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpulsionOrgan {
    name: String,
    source: Option<ReservoirId>,
    geometry: OutletGeometry,
    profile: OrificeProfile,
    factors: ProfileFactors,
    erect: bool,
}

impl ExpulsionOrgan {
    pub fn new(
        name: impl Into<String>,
        geometry: OutletGeometry,
        profile: OrificeProfile,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: name.into(),
            source: None,
            geometry: geometry.validate()?,
            profile,
            factors: profile.factors(),
            erect: false,
        })
    }

    pub fn with_source(mut self, source: ReservoirId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn attach(&mut self, source: ReservoirId) {
        self.source = Some(source);
    }

    pub fn detach(&mut self) {
        self.source = None;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Option<ReservoirId> {
        self.source
    }

    pub fn geometry(&self) -> OutletGeometry {
        self.geometry
    }

    pub fn profile(&self) -> OrificeProfile {
        self.profile
    }

    pub fn factors(&self) -> ProfileFactors {
        self.factors
    }

    pub fn is_erect(&self) -> bool {
        self.erect
    }

    pub fn set_erect(&mut self, erect: bool) {
        self.erect = erect;
    }

    /// Engorge or relax according to arousal. Returns whether state changed.
    pub fn respond_to_arousal(&mut self, arousal: f64) -> bool {
        let erect = arousal >= ENGORGE_AROUSAL;
        let changed = erect != self.erect;
        self.erect = erect;
        changed
    }

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    pub fn effective_length_cm(&self) -> f64 {
        let state = if self.erect { 1.0 } else { FLACCID_LENGTH_SHARE };
        self.geometry.length_cm * self.factors.length_factor * state
    }

    pub fn effective_girth_cm(&self) -> f64 {
        self.geometry.diameter_cm * self.factors.girth_factor * PI
    }

    /// Orifice diameter in millimetres, expanded while engorged.
    pub fn effective_orifice_diameter_mm(&self) -> f64 {
        let expansion = if self.erect { ENGORGED_EXPANSION } else { 1.0 };
        self.geometry.urethra_diameter_mm * expansion
    }

    /// Orifice cross-section in square centimetres.
    pub fn orifice_area_cm2(&self) -> f64 {
        let radius_cm = self.effective_orifice_diameter_mm() / 10.0 / 2.0;
        PI * radius_cm * radius_cm
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    pub fn available_volume(&self, reservoir: Option<&AggregateReservoir>, fluid: FluidType) -> Volume {
        reservoir.map_or(0.0, |r| r.stored(fluid))
    }

    /// Largest volume one pulse can carry at `force`.
    pub fn max_pulse_volume(&self, reservoir: Option<&AggregateReservoir>, force: f64) -> Volume {
        let force = non_negative(force);
        let multiplier = reservoir.map_or(1.0, |r| r.pressure_multiplier());
        let ejection_length = 2.0 + force * 3.0 + (multiplier - 1.0) * 2.0;
        let volume = self.orifice_area_cm2()
            * ejection_length
            * force
            * self.factors.volume_multiplier
            * multiplier
            * PULSE_SCALE;
        volume.max(MIN_PULSE_VOLUME)
    }

    /// How much an unspecified expulsion aims for, given what is available.
    fn desired_volume(available: Volume, force: f64, multiplier: f64) -> Volume {
        let force_share = 0.25 * force.min(2.0);
        let pressure_bonus = ((multiplier - 1.0).max(0.0) * 0.25).min(0.25);
        available * (0.5 + force_share + pressure_bonus).min(1.0)
    }

    /// Expel fluid from `reservoir` in at most [`MAX_PULSES`] pulses.
    ///
    /// With `requested == None` the target grows with force and pressure.
    /// The target is always clamped to what the reservoir holds.
    pub fn expel(
        &self,
        reservoir: Option<&mut AggregateReservoir>,
        requested: Option<Volume>,
        fluid: FluidType,
        force: f64,
    ) -> Expulsion {
        let Some(reservoir) = reservoir else {
            return Expulsion::failed(ExpelFailure::NoReservoir);
        };
        let available = reservoir.stored(fluid);
        if available < MIN_REMAINING {
            return Expulsion::failed(ExpelFailure::Empty);
        }

        let force = non_negative(force);
        let tier = reservoir.pressure_tier();
        let max_per_pulse = self.max_pulse_volume(Some(&*reservoir), force);
        let target = match requested {
            Some(amount) => non_negative(amount),
            None => Self::desired_volume(available, force, reservoir.pressure_multiplier()),
        }
        .min(available);

        let mut remaining = target;
        let mut amount = 0.0;
        let mut pulses = 0;
        while pulses < MAX_PULSES && remaining >= MIN_REMAINING {
            let cap = self.max_pulse_volume(Some(&*reservoir), force);
            let got = reservoir.drain_fluid(fluid, remaining.min(cap));
            if got <= 0.0 {
                break;
            }
            amount += got;
            remaining -= got;
            pulses += 1;
        }

        if amount > 0.0 {
            log::info!(
                "{}: expelled {:.2} ml {} in {} pulse(s) at {} pressure",
                self.name,
                amount,
                fluid,
                pulses,
                tier
            );
        }

        Expulsion {
            amount,
            pulses,
            reason: None,
            tier,
            max_per_pulse,
            remaining: reservoir.stored(fluid),
        }
    }

    /// Expel everything available of `fluid`, still bounded by pulse count.
    pub fn expel_all(
        &self,
        reservoir: Option<&mut AggregateReservoir>,
        fluid: FluidType,
        force: f64,
    ) -> Expulsion {
        let available = self.available_volume(reservoir.as_deref(), fluid);
        self.expel(reservoir, Some(available), fluid, force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organ::ProducingOrgan;
    use viscera_core::test_utils::*;

    fn outlet() -> ExpulsionOrgan {
        ExpulsionOrgan::new("outlet", OutletGeometry::default(), OrificeProfile::Standard).unwrap()
    }

    fn reservoir(left: f64, right: f64) -> AggregateReservoir {
        let mut r = AggregateReservoir::new("pool")
            .with_organ(ProducingOrgan::new("left", 20.0).unwrap())
            .with_organ(ProducingOrgan::new("right", 20.0).unwrap());
        r.organs_mut()[0].add_fluid(cum(), left);
        r.organs_mut()[1].add_fluid(cum(), right);
        r
    }

    #[test]
    fn no_reservoir_expels_nothing() {
        let result = outlet().expel(None, Some(10.0), cum(), 1.0);
        assert_eq!(result.amount, 0.0);
        assert_eq!(result.pulses, 0);
        assert_eq!(result.reason, Some(ExpelFailure::NoReservoir));
        assert_eq!(result.reason.unwrap().as_str(), "no_reservoir");
    }

    #[test]
    fn empty_reservoir_reports_empty() {
        let mut r = reservoir(0.0, 0.0);
        let result = outlet().expel(Some(&mut r), Some(10.0), cum(), 1.0);
        assert_eq!(result.reason, Some(ExpelFailure::Empty));
        assert_eq!(result.amount, 0.0);
    }

    #[test]
    fn available_volume_without_reservoir_is_zero() {
        assert_eq!(outlet().available_volume(None, cum()), 0.0);
    }

    #[test]
    fn pulse_volume_has_a_floor() {
        let o = outlet();
        assert_eq!(o.max_pulse_volume(None, 0.0), MIN_PULSE_VOLUME);
    }

    #[test]
    fn pulse_volume_matches_formula() {
        let mut o = outlet();
        o.set_erect(true);
        let r = reservoir(10.0, 10.0); // 50% full -> pressure 10 -> multiplier 0.75
        let multiplier = 0.75;
        let radius = 8.0 * 1.3 / 20.0;
        let area = PI * radius * radius;
        let length = 2.0 + 2.0 * 3.0 + (multiplier - 1.0) * 2.0;
        let expected = area * length * 2.0 * 1.0 * multiplier * PULSE_SCALE;
        assert_close(o.max_pulse_volume(Some(&r), 2.0), expected.max(1.0));
    }

    #[test]
    fn engorged_orifice_is_wider() {
        let mut o = outlet();
        let relaxed = o.orifice_area_cm2();
        assert!(o.respond_to_arousal(0.9));
        assert!(o.orifice_area_cm2() > relaxed);
        assert!(!o.respond_to_arousal(0.5));
        assert!(o.respond_to_arousal(0.1));
        assert!(!o.is_erect());
    }

    #[test]
    fn requested_amount_is_clamped_to_available() {
        let mut r = reservoir(2.0, 2.0);
        let result = outlet().expel(Some(&mut r), Some(50.0), cum(), 5.0);
        assert!(result.amount <= 4.0 + 1e-9);
        assert!(result.pulses <= MAX_PULSES);
        assert!(result.reason.is_none());
    }

    #[test]
    fn pulses_are_capped_at_five() {
        let mut r = reservoir(20.0, 20.0);
        // Force 0 pins every pulse at the 1 ml floor.
        let result = outlet().expel(Some(&mut r), Some(30.0), cum(), 0.0);
        assert_eq!(result.pulses, MAX_PULSES);
        assert_close(result.amount, 5.0);
        assert_close(result.remaining, 35.0);
        assert_close(result.max_per_pulse, 1.0);
    }

    #[test]
    fn unspecified_amount_takes_a_share_of_available() {
        let mut r = reservoir(10.0, 10.0);
        let result = outlet().expel(Some(&mut r), None, cum(), 0.0);
        // force 0 and multiplier below 1: half of the 20 available, in 1 ml pulses.
        assert_eq!(result.pulses, MAX_PULSES);
        assert_close(result.amount, 5.0);
    }

    #[test]
    fn expel_all_drains_what_pulses_allow() {
        let mut o = outlet();
        o.set_erect(true);
        let mut r = reservoir(1.0, 1.0);
        let result = o.expel_all(Some(&mut r), cum(), 3.0);
        assert_close(result.amount, 2.0);
        assert!(result.remaining < 1e-9);
    }

    #[test]
    fn trace_below_pulse_floor_counts_as_empty() {
        let mut r = reservoir(0.04, 0.04);
        let result = outlet().expel(Some(&mut r), None, cum(), 2.0);
        assert_eq!(result.reason, Some(ExpelFailure::Empty));
        assert_eq!(result.pulses, 0);
        assert_close(r.stored(cum()), 0.08);
    }

    #[test]
    fn girth_follows_profile_factor() {
        let standard = outlet();
        let flared =
            ExpulsionOrgan::new("f", OutletGeometry::default(), OrificeProfile::Flared).unwrap();
        assert_close(standard.effective_girth_cm(), 3.5 * PI);
        assert_close(flared.effective_girth_cm(), 3.5 * 1.2 * PI);
    }

    #[test]
    fn profile_factors_resolve_at_construction() {
        let o = ExpulsionOrgan::new("k", OutletGeometry::default(), OrificeProfile::Knotted).unwrap();
        assert!(o.factors().has_knot);
        assert_eq!(o.factors(), OrificeProfile::Knotted.factors());
    }

    #[test]
    fn flaccid_length_is_shorter() {
        let mut o = outlet();
        let flaccid = o.effective_length_cm();
        o.set_erect(true);
        assert_close(o.effective_length_cm(), 14.0);
        assert!(flaccid < 14.0);
    }

    #[test]
    fn geometry_snapshots_are_validated() {
        let ok: OutletGeometry =
            serde_json::from_str(r#"{"length_cm":12.0,"diameter_cm":3.0,"urethra_diameter_mm":6.0}"#)
                .unwrap();
        assert_close(ok.length_cm, 12.0);
        let bad = r#"{"length_cm":12.0,"diameter_cm":-3.0,"urethra_diameter_mm":6.0}"#;
        assert!(serde_json::from_str::<OutletGeometry>(bad).is_err());
    }

    #[test]
    fn negative_geometry_is_rejected() {
        let geometry = OutletGeometry {
            urethra_diameter_mm: -1.0,
            ..OutletGeometry::default()
        };
        assert!(ExpulsionOrgan::new("bad", geometry, OrificeProfile::Standard).is_err());
    }
}
