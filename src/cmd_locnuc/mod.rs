//! Subcommand modules for the `locnuc` binary.

pub mod classify;
pub mod diag;
pub mod normalize;
pub mod params;
pub mod predict;
