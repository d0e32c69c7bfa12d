//! Loading of named scalar parameters from TOML sources.
//!
//! Configuration files are flat tables of numbers, e.g.
//! ```toml
//! spontaneous_decay_rate = 6.26e8
//! mass = 1.67e-27
//! max_momentum = 20
//! detuning_amplitude = 40.0
//! enable_decay = true
//! ```
//! Integers and floats are interchangeable everywhere; flags additionally
//! accept booleans.

use std::path::Path;
use crate::error::ConfigError;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// A mapping of named numeric parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamTable(toml::Table);

impl From<toml::Table> for ParamTable {
    fn from(table: toml::Table) -> Self { Self(table) }
}

impl std::str::FromStr for ParamTable {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<toml::Table>()?))
    }
}

impl ParamTable {
    /// Read and parse a TOML file.
    pub fn from_file<P>(path: P) -> ConfigResult<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        let contents
            = std::fs::read_to_string(path)
            .map_err(|source| {
                ConfigError::Io { path: path.display().to_string(), source }
            })?;
        contents.parse()
    }

    /// Set a numeric parameter, overwriting any previous value.
    pub fn set(&mut self, key: &str, val: f64) -> &mut Self {
        self.0.insert(key.to_string(), toml::Value::Float(val));
        self
    }

    /// Set a flag parameter, overwriting any previous value.
    pub fn set_flag(&mut self, key: &str, val: bool) -> &mut Self {
        self.0.insert(key.to_string(), toml::Value::Boolean(val));
        self
    }

    /// Return `true` if `key` is present.
    pub fn contains(&self, key: &str) -> bool { self.0.contains_key(key) }

    /// Get a required numeric parameter.
    pub fn get_f64(&self, key: &str) -> ConfigResult<f64> {
        self.get_f64_opt(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Get an optional numeric parameter.
    ///
    /// A present but non-numeric value is still an error.
    pub fn get_f64_opt(&self, key: &str) -> ConfigResult<Option<f64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(toml::Value::Float(x)) => Ok(Some(*x)),
            Some(toml::Value::Integer(n)) => Ok(Some(*n as f64)),
            Some(other) => Err(ConfigError::NotNumeric {
                key: key.to_string(),
                found: other.to_string(),
            }),
        }
    }

    /// Get a required numeric parameter that must additionally be an integer.
    pub fn get_int(&self, key: &str) -> ConfigResult<i64> {
        let x = self.get_f64(key)?;
        as_int(key, x)
    }

    /// Get an optional integer parameter.
    pub fn get_int_opt(&self, key: &str) -> ConfigResult<Option<i64>> {
        self.get_f64_opt(key)?
            .map(|x| as_int(key, x))
            .transpose()
    }

    /// Get a required flag. Numbers are interpreted as `true` if non-zero.
    pub fn get_bool(&self, key: &str) -> ConfigResult<bool> {
        self.get_bool_opt(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Get an optional flag.
    pub fn get_bool_opt(&self, key: &str) -> ConfigResult<Option<bool>> {
        match self.0.get(key) {
            Some(toml::Value::Boolean(b)) => Ok(Some(*b)),
            _ => Ok(self.get_f64_opt(key)?.map(|x| x != 0.0)),
        }
    }
}

fn as_int(key: &str, x: f64) -> ConfigResult<i64> {
    if x.is_finite() && x.fract() == 0.0 {
        Ok(x as i64)
    } else {
        Err(ConfigError::bad_value(key, format!("expected an integer; got {x}")))
    }
}

/// Parameters for a single simulation run, beyond those describing the atom
/// and laser.
#[derive(Clone, Debug, PartialEq)]
pub struct RunParams {
    /// Total duration in units of the inverse decay rate.
    pub duration: f64,
    /// Tolerance passed to the adaptive stepper.
    pub tolerance: f64,
    /// Initial temperature, in kelvin, for thermal initial states.
    pub initial_temperature: f64,
    /// If present, start from a single momentum state instead of a thermal
    /// distribution.
    pub initial_momentum: Option<i64>,
    /// Use the antihydrogen 2s axial distribution instead of a Boltzmann one.
    pub use_antihydrogen_distr: bool,
    /// Approximate number of output samples per sawtooth period.
    pub output_points_per_cycle: f64,
}

impl RunParams {
    pub const DEF_OUTPUT_POINTS_PER_CYCLE: f64 = 100.0;

    /// Extract run parameters from a table.
    pub fn from_table(table: &ParamTable) -> ConfigResult<Self> {
        let duration = table.get_f64("duration")?;
        if !(duration >= 0.0 && duration.is_finite()) {
            return Err(ConfigError::bad_value(
                "duration", format!("must be non-negative; got {duration}")));
        }
        let tolerance = table.get_f64("tolerance")?;
        if !(tolerance > 0.0 && tolerance.is_finite()) {
            return Err(ConfigError::bad_value(
                "tolerance", format!("must be positive; got {tolerance}")));
        }
        let initial_momentum = table.get_int_opt("initial_momentum")?;
        let initial_temperature
            = match table.get_f64_opt("initial_temperature")? {
                Some(temp) => temp,
                None if initial_momentum.is_some() => f64::NAN,
                None => {
                    return Err(
                        ConfigError::Missing("initial_temperature".into()));
                },
            };
        let use_antihydrogen_distr
            = table.get_bool_opt("use_antihydrogen_distr")?.unwrap_or(false);
        let output_points_per_cycle
            = table.get_f64_opt("output_points_per_cycle")?
            .unwrap_or(Self::DEF_OUTPUT_POINTS_PER_CYCLE);
        if !(output_points_per_cycle > 0.0) {
            return Err(ConfigError::bad_value(
                "output_points_per_cycle",
                format!("must be positive; got {output_points_per_cycle}"),
            ));
        }
        Ok(Self {
            duration,
            tolerance,
            initial_temperature,
            initial_momentum,
            use_antihydrogen_distr,
            output_points_per_cycle,
        })
    }

    /// Return `true` if the initial state is drawn from a temperature.
    pub fn is_thermal(&self) -> bool { self.initial_momentum.is_none() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_lookups_accept_ints_and_floats() {
        let table: ParamTable
            = "a = 3\nb = 2.5\nc = \"x\"\nd = true".parse().unwrap();
        assert_eq!(table.get_f64("a").unwrap(), 3.0);
        assert_eq!(table.get_f64("b").unwrap(), 2.5);
        assert!(matches!(
            table.get_f64("c"),
            Err(ConfigError::NotNumeric { .. })
        ));
        assert!(matches!(table.get_f64("z"), Err(ConfigError::Missing(_))));
        assert_eq!(table.get_f64_opt("z").unwrap(), None);
        assert!(table.get_bool("d").unwrap());
        assert!(table.get_bool("a").unwrap());
        assert!(matches!(table.get_int("b"), Err(ConfigError::BadValue { .. })));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let res: ConfigResult<ParamTable> = "a = = 1".parse();
        assert!(matches!(res, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn run_params_defaults() {
        let table: ParamTable
            = "duration = 10\ntolerance = 1e-6\ninitial_momentum = 3"
            .parse().unwrap();
        let run = RunParams::from_table(&table).unwrap();
        assert_eq!(run.initial_momentum, Some(3));
        assert!(!run.is_thermal());
        assert!(!run.use_antihydrogen_distr);
        assert_eq!(
            run.output_points_per_cycle,
            RunParams::DEF_OUTPUT_POINTS_PER_CYCLE,
        );

        let table: ParamTable
            = "duration = 10\ntolerance = 1e-6".parse().unwrap();
        assert!(matches!(
            RunParams::from_table(&table),
            Err(ConfigError::Missing(k)) if k == "initial_temperature"
        ));
    }
}
