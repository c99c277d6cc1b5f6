//! Resolution pipeline: reads a body preset, resolves names, builds a [`Body`].
//!
//! Provides format detection (RON/JSON/TOML) and deserialization helpers,
//! then turns the string-keyed schema into arena ids.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use viscera_body::Body;
use viscera_core::error::ValidationError;
use viscera_core::fluid::FluidType;
use viscera_core::id::{ConduitId, ContainerId, OutletId, ReservoirId};
use viscera_fluid::{
    AggregateReservoir, ExpulsionOrgan, FillPolicy, FluidContainer, OrificeProfile,
    OutletGeometry, ProducingOrgan, TransportConduit,
};

use crate::schema::*;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading a body preset.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A value was structurally invalid (negative capacity and the like).
    #[error("invalid value in {file}: {source}")]
    Invalid {
        file: PathBuf,
        #[source]
        source: ValidationError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `origin` is only used in errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<T, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
fn resolve_name<V: Copy>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<V, DataLoadError> {
    map.get(name).copied().ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

fn check_duplicate<V>(map: &HashMap<String, V>, name: &str, file: &Path) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

fn parse_fluid(name: &str, file: &Path) -> Result<FluidType, DataLoadError> {
    name.parse().map_err(|_| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind: "fluid",
    })
}

fn parse_profile(name: &str, file: &Path) -> Result<OrificeProfile, DataLoadError> {
    match name {
        "standard" => Ok(OrificeProfile::Standard),
        "tapered" => Ok(OrificeProfile::Tapered),
        "flared" => Ok(OrificeProfile::Flared),
        "knotted" => Ok(OrificeProfile::Knotted),
        _ => Err(DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: name.to_string(),
            expected_kind: "profile",
        }),
    }
}

// ===========================================================================
// Body construction
// ===========================================================================

/// Load a body preset from a `.ron`, `.toml` or `.json` file.
pub fn load_body(path: &Path) -> Result<Body, DataLoadError> {
    let data: BodyData = deserialize_file(path)?;
    build_body(&data, path)
}

/// Parse and build a body from an in-memory preset.
pub fn parse_body(content: &str, format: Format, origin: &Path) -> Result<Body, DataLoadError> {
    let data: BodyData = deserialize_str(content, format, origin)?;
    build_body(&data, origin)
}

/// Resolve a deserialized preset into a [`Body`].
pub fn build_body(data: &BodyData, file: &Path) -> Result<Body, DataLoadError> {
    let invalid = |source: ValidationError| DataLoadError::Invalid {
        file: file.to_path_buf(),
        source,
    };
    let mut body = Body::new(data.name.clone());
    body.set_arousal(data.arousal);

    // -----------------------------------------------------------------------
    // Containers
    // -----------------------------------------------------------------------
    let mut containers: HashMap<String, ContainerId> = HashMap::new();
    for c in &data.containers {
        check_duplicate(&containers, &c.name, file)?;
        let mut container = FluidContainer::new(c.capacity).map_err(invalid)?;
        for (fluid, amount) in &c.contents {
            container.add(parse_fluid(fluid, file)?, *amount, FillPolicy::Overflow);
        }
        let id = body.add_container(c.name.clone(), container);
        containers.insert(c.name.clone(), id);
    }

    // -----------------------------------------------------------------------
    // Reservoirs
    // -----------------------------------------------------------------------
    let mut reservoirs: HashMap<String, ReservoirId> = HashMap::new();
    // One source per fluid across the whole body.
    let mut supplied: HashMap<String, ReservoirId> = HashMap::new();
    for r in &data.reservoirs {
        check_duplicate(&reservoirs, &r.name, file)?;
        let mut reservoir = AggregateReservoir::new(r.name.clone());
        let mut organs: HashMap<String, ()> = HashMap::new();
        for o in &r.organs {
            check_duplicate(&organs, &o.name, file)?;
            reservoir.add_organ(build_organ(o, file)?);
            organs.insert(o.name.clone(), ());
        }
        let id = body.add_reservoir(reservoir);
        for name in &r.supplies {
            let fluid = parse_fluid(name, file)?;
            check_duplicate(&supplied, fluid.name(), file)?;
            body.register_source(fluid, id);
            supplied.insert(fluid.name().to_string(), id);
        }
        reservoirs.insert(r.name.clone(), id);
    }

    // -----------------------------------------------------------------------
    // Outlets
    // -----------------------------------------------------------------------
    let mut outlets: HashMap<String, OutletId> = HashMap::new();
    for o in &data.outlets {
        check_duplicate(&outlets, &o.name, file)?;
        let defaults = OutletGeometry::default();
        let geometry = OutletGeometry {
            length_cm: o.length_cm.unwrap_or(defaults.length_cm),
            diameter_cm: o.diameter_cm.unwrap_or(defaults.diameter_cm),
            urethra_diameter_mm: o.urethra_diameter_mm.unwrap_or(defaults.urethra_diameter_mm),
        };
        let profile = parse_profile(&o.profile, file)?;
        let mut outlet = ExpulsionOrgan::new(o.name.clone(), geometry, profile).map_err(invalid)?;
        if let Some(name) = &o.reservoir {
            outlet.attach(resolve_name(&reservoirs, name, file, "reservoir")?);
        }
        let id = body.add_outlet(outlet);
        outlets.insert(o.name.clone(), id);
    }

    // -----------------------------------------------------------------------
    // Conduits
    // -----------------------------------------------------------------------
    let mut conduits: HashMap<String, ConduitId> = HashMap::new();
    for c in &data.conduits {
        check_duplicate(&conduits, &c.name, file)?;
        let source = c
            .from
            .as_deref()
            .map(|name| resolve_name(&containers, name, file, "container"))
            .transpose()?;
        let sink = c
            .to
            .as_deref()
            .map(|name| resolve_name(&containers, name, file, "container"))
            .transpose()?;
        let conduit = TransportConduit::new(c.name.clone(), c.volume)
            .map_err(invalid)?
            .connect(source, sink);
        let id = body.add_conduit(conduit);
        conduits.insert(c.name.clone(), id);
    }

    Ok(body)
}

fn build_organ(data: &OrganData, file: &Path) -> Result<ProducingOrgan, DataLoadError> {
    let invalid = |source: ValidationError| DataLoadError::Invalid {
        file: file.to_path_buf(),
        source,
    };
    let mut organ = ProducingOrgan::new(data.name.clone(), data.capacity).map_err(invalid)?;
    for (fluid, rate) in &data.rates {
        organ.set_rate(parse_fluid(fluid, file)?, *rate).map_err(invalid)?;
    }
    if let Some(temperature) = data.temperature {
        organ = organ.with_temperature(temperature).map_err(invalid)?;
    }
    for (fluid, amount) in &data.contents {
        organ.add_fluid(parse_fluid(fluid, file)?, *amount);
    }
    Ok(organ)
}

// ===========================================================================
// Tests
// ===========================================================================
