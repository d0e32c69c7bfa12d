//! Shared setup for the simulation binaries.

pub mod systems;
