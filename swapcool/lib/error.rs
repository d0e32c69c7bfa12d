//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow].
//!
//! [anyhow]: https://crates.io/crates/anyhow

use thiserror::Error;

/// Returned when a configuration source cannot be turned into a valid set of
/// model parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Returned when a configuration file cannot be read.
    #[error("could not read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Returned when a configuration file is not valid TOML.
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Returned when a required parameter is absent.
    #[error("missing required parameter '{0}'")]
    Missing(String),

    /// Returned when a parameter is present but not a number.
    #[error("parameter '{key}' must be numeric; got {found}")]
    NotNumeric { key: String, found: String },

    /// Returned when a parameter is numeric but outside its allowed domain.
    #[error("parameter '{key}' is out of range: {reason}")]
    BadValue { key: String, reason: String },

    /// Returned when the minimum tracked momentum exceeds the maximum.
    #[error("min momentum greater than max momentum; got [{kmin}, {kmax}]")]
    MomentumRange { kmin: i64, kmax: i64 },
}

impl ConfigError {
    pub(crate) fn bad_value<K, R>(key: K, reason: R) -> Self
    where
        K: Into<String>,
        R: Into<String>,
    {
        Self::BadValue { key: key.into(), reason: reason.into() }
    }

    pub(crate) fn check_momentum(kmin: i64, kmax: i64) -> Result<(), Self> {
        (kmin <= kmax).then_some(()).ok_or(Self::MomentumRange { kmin, kmax })
    }
}

/// Returned from the adaptive stepper.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// Returned when a non-positive `epsilon` value is encountered.
    #[error("epsilon values must be greater than 0; got {0}")]
    BadEpsilon(f64),

    /// Returned when the end time of an integration segment is negative or
    /// non-finite.
    #[error("integration end time must be finite and non-negative; got {0}")]
    BadEndTime(f64),

    /// Returned when step size control shrinks the step below its floor.
    #[error("step size fell below its floor at t = {t}: dt = {dt:e}")]
    StepFloor { t: f64, dt: f64 },

    /// Returned when no step size could satisfy the error bound within the
    /// retry limit.
    #[error("rka error bound could not be satisfied at t = {0}")]
    ErrorBound(f64),

    /// Returned when the state acquires NaN or infinite entries.
    #[error("encountered non-finite state at t = {0}")]
    NonFinite(f64),
}

impl IntegrationError {
    pub(crate) fn check_epsilon(epsilon: f64) -> Result<(), Self> {
        (epsilon > 0.0 && epsilon.is_finite())
            .then_some(()).ok_or(Self::BadEpsilon(epsilon))
    }

    pub(crate) fn check_end_time(t_end: f64) -> Result<(), Self> {
        (t_end >= 0.0 && t_end.is_finite())
            .then_some(()).ok_or(Self::BadEndTime(t_end))
    }
}

/// Returned when a density matrix buffer has the wrong number of entries for
/// its momentum window.
#[derive(Debug, Error)]
#[error("density matrix must have {expected} entries; got {got}")]
pub struct DimensionError {
    pub expected: usize,
    pub got: usize,
}

/// Returned when simulation output cannot be written.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Returned when a file or directory cannot be created.
    #[error("cannot create '{path}': {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Returned when an array cannot be added to an `.npz` archive.
    #[error("cannot write array '{name}': {source}")]
    Array {
        name: String,
        #[source]
        source: ndarray_npy::WriteNpzError,
    },

    /// Returned when an `.npz` archive cannot be finalized.
    #[error("cannot finish archive: {0}")]
    Finish(#[from] ndarray_npy::WriteNpzError),
}

/// Top-level error for a simulation run.
#[derive(Debug, Error)]
pub enum SwapError {
    /// [`ConfigError`]
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// [`IntegrationError`]
    #[error("integration error: {0}")]
    Integration(#[from] IntegrationError),

    /// [`DimensionError`]
    #[error("dimension error: {0}")]
    Dimension(#[from] DimensionError),

    /// [`OutputError`]
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

pub type SwapResult<T> = Result<T, SwapError>;
