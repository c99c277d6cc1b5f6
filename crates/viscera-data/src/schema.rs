//! Serde data file structs for body presets.
//!
//! These structs define the on-disk format for a body: standalone
//! containers, reservoirs of producing organs, outlets and conduits. Fluid
//! types, profiles and cross-references are plain strings here and are
//! resolved by the loader.

use std::collections::BTreeMap;

use serde::Deserialize;

/// A complete body preset.
#[derive(Debug, Clone, Deserialize)]
pub struct BodyData {
    pub name: String,
    #[serde(default)]
    pub arousal: f64,
    #[serde(default)]
    pub containers: Vec<ContainerData>,
    #[serde(default)]
    pub reservoirs: Vec<ReservoirData>,
    #[serde(default)]
    pub outlets: Vec<OutletData>,
    #[serde(default)]
    pub conduits: Vec<ConduitData>,
}

/// A standalone container (mouth, stomach).
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerData {
    pub name: String,
    pub capacity: f64,
    /// Initial contents, fluid name to volume.
    #[serde(default)]
    pub contents: BTreeMap<String, f64>,
}

/// A reservoir and the organs it owns.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservoirData {
    pub name: String,
    /// Fluids this reservoir is registered as the body's source of.
    #[serde(default)]
    pub supplies: Vec<String>,
    pub organs: Vec<OrganData>,
}

/// One producing organ.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganData {
    pub name: String,
    pub capacity: f64,
    /// Base production per tick, fluid name to rate.
    #[serde(default)]
    pub rates: BTreeMap<String, f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub contents: BTreeMap<String, f64>,
}

/// An outlet. Geometry fields default individually.
#[derive(Debug, Clone, Deserialize)]
pub struct OutletData {
    pub name: String,
    /// Name of the reservoir this outlet drains.
    #[serde(default)]
    pub reservoir: Option<String>,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub length_cm: Option<f64>,
    #[serde(default)]
    pub diameter_cm: Option<f64>,
    #[serde(default)]
    pub urethra_diameter_mm: Option<f64>,
}

fn default_profile() -> String {
    "standard".to_string()
}

/// A conduit between two named containers.
#[derive(Debug, Clone, Deserialize)]
pub struct ConduitData {
    pub name: String,
    /// Transit volume.
    pub volume: f64,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}
