//! Collection of pre-defined systems.

pub mod swapmotion;
