//! Viscera Core -- shared vocabulary for the anatomical fluid simulation.
//!
//! This crate holds the types every other Viscera crate depends on: the
//! closed [`fluid::FluidType`] enum, slotmap keys used as non-owning
//! references between organs, volume/time units, and the validation error
//! returned when a caller hands the model a structurally impossible value.
//!
//! # Key Types
//!
//! - [`fluid::FluidType`] -- Kinds of fluid a container can hold.
//! - [`id::ContainerId`], [`id::ReservoirId`], [`id::OutletId`],
//!   [`id::ConduitId`], [`id::BodyId`] -- Arena keys.
//! - [`units::Dt`] -- A validated, non-negative time step.
//! - [`error::ValidationError`] -- Programmer errors rejected at entry.

pub mod error;
pub mod fluid;
pub mod id;
pub mod units;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
