//! Body presets for the Viscera simulation.
//!
//! A preset describes one body (containers, reservoirs of producing organs,
//! outlets and conduits) in RON, TOML or JSON. [`load_body`] reads a file,
//! resolves every name reference and returns a ready-to-tick [`Body`].
//!
//! [`Body`]: viscera_body::Body

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format, load_body, parse_body};
