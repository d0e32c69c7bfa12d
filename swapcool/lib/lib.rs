#![allow(dead_code, non_snake_case, non_upper_case_globals)]

//! Density-matrix simulation of sawtooth-wave adiabatic passage cooling for a
//! three-level atom with quantized recoil momentum.
//!
//! The atom has a ground level, a long-lived low level, and an excited level
//! that decays to both. A laser drives the low-excited transition with a
//! sawtooth frequency sweep and a softly switched Rabi frequency; each
//! absorption or stimulated emission changes the atom's momentum by one
//! photon recoil. The full density matrix over levels and a finite window of
//! momenta is integrated through the Lindblad master equation one sweep
//! period at a time.

pub type Arr1<S> = ndarray::ArrayBase<S, ndarray::Ix1>;

pub mod error;
pub mod units;
pub mod config;
pub mod utils;
pub mod quad;
pub mod index;
pub mod sweep;
pub mod master;
pub mod stepper;
pub mod cycle;
pub mod init;
pub mod observe;
