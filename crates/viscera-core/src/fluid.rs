use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kinds of fluid a container can hold. Cheap to copy and compare.
///
/// Ordered so containers can key their contents in a `BTreeMap` and iterate
/// deterministically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FluidType {
    Cum,
    Milk,
    Saliva,
    Water,
    Generic,
}

impl FluidType {
    /// Every variant, in ordering order.
    pub const ALL: [FluidType; 5] = [
        FluidType::Cum,
        FluidType::Milk,
        FluidType::Saliva,
        FluidType::Water,
        FluidType::Generic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FluidType::Cum => "cum",
            FluidType::Milk => "milk",
            FluidType::Saliva => "saliva",
            FluidType::Water => "water",
            FluidType::Generic => "generic",
        }
    }
}

impl fmt::Display for FluidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing an unknown fluid name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fluid type '{0}'")]
pub struct UnknownFluid(pub String);

impl FromStr for FluidType {
    type Err = UnknownFluid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FluidType::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownFluid(s.to_string()))
    }
}
