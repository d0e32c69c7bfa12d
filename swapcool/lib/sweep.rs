//! Time dependence of the driving laser: a sawtooth detuning sweep and an
//! exponential soft switch on the Rabi frequency.
//!
//! All times are measured in units of the inverse spontaneous decay rate, and
//! all frequencies in units of the decay rate, so that the natural time
//! coordinate is `gt` = Γ*t. Within each sweep period the fractional position
//! is
//! ```text
//! φ(gt) = frac(f * gt)
//! ```
//! and
//! ```text
//! δ(gt) = A * (2φ - 1)
//! Ω(gt) = Ω0 * exp(-a * |2φ - 1|^p)
//! ```

use rustc_hash::FxHashMap as HashMap;
use crate::{
    config::{ ConfigResult, ParamTable },
    error::ConfigError,
    units::hbar,
};

/// Provider of the time-dependent laser parameters.
pub trait SweepDrive {
    /// Frequency of the sawtooth sweep.
    fn sweep_frequency(&self) -> f64;

    /// Detuning at a given time.
    fn detuning(&self, gt: f64) -> f64;

    /// Soft-switched Rabi frequency at a given time.
    fn coupling(&self, gt: f64) -> f64;

    /// Integral of the laser frequency (transition frequency plus detuning)
    /// from 0 to `gt`.
    fn cumulative_phase(&self, gt: f64) -> f64;

    /// Length of a single sweep period.
    fn period(&self) -> f64 { self.sweep_frequency().recip() }
}

/// Fixed shape parameters of the sweep, all in decay-rate units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SweepParams {
    /// Peak Rabi frequency Ω0, reached at the middle of each period.
    pub rabi_freq: f64,
    /// Steepness `a` of the soft switch.
    pub rabi_switch_coeff: f64,
    /// Shape exponent `p` of the soft switch.
    pub rabi_switch_power: f64,
    /// Sawtooth amplitude `A`.
    pub detun_amp: f64,
    /// Sawtooth frequency `f`; must be positive.
    pub detun_freq: f64,
    /// Angular frequency of the driven transition.
    pub transition_freq: f64,
}

impl SweepParams {
    /// Read sweep parameters from a table.
    ///
    /// The transition frequency is derived from the `low_energy_level` and
    /// `high_energy_level` energies (J) and `spontaneous_decay_rate` (s^-1).
    pub fn from_table(table: &ParamTable) -> ConfigResult<Self> {
        let decay_rate = table.get_f64("spontaneous_decay_rate")?;
        if !(decay_rate > 0.0) {
            return Err(ConfigError::bad_value(
                "spontaneous_decay_rate",
                format!("must be positive; got {decay_rate}"),
            ));
        }
        let low_energy = table.get_f64("low_energy_level")?;
        let high_energy = table.get_f64("high_energy_level")?;
        Ok(Self {
            rabi_freq: table.get_f64("rabi_frequency")?,
            rabi_switch_coeff: table.get_f64("rabi_switch_coeff")?,
            rabi_switch_power: table.get_f64("rabi_switch_power")?,
            detun_amp: table.get_f64("detuning_amplitude")?,
            detun_freq: table.get_f64("detuning_frequency")?,
            transition_freq: (high_energy - low_energy) / (hbar * decay_rate),
        })
    }

    fn check(&self) -> ConfigResult<()> {
        (self.detun_freq > 0.0 && self.detun_freq.is_finite())
            .then_some(())
            .ok_or_else(|| {
                ConfigError::bad_value(
                    "detuning_frequency",
                    format!("must be positive and finite; got {}", self.detun_freq),
                )
            })
    }
}

/// Names the quantities held in a [`ParamCache`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The time at which the other entries were computed.
    Time,
    /// Half the detuning.
    HalfDetuning,
    /// Half the soft-switched Rabi frequency.
    HalfCoupling,
}

/// Small key-value store for values that are expensive to compute but fixed
/// at a single time.
///
/// Entries are only meaningful together with [`CacheKey::Time`]; storing a new
/// time always replaces every other entry.
#[derive(Clone, Debug, Default)]
pub struct ParamCache {
    values: HashMap<CacheKey, f64>,
    refreshes: usize,
}

impl ParamCache {
    /// Create a new, empty cache.
    pub fn new() -> Self { Self::default() }

    /// Return the time the cache currently refers to, if any.
    pub fn time(&self) -> Option<f64> { self.get(CacheKey::Time) }

    /// Get a single cached value.
    pub fn get(&self, key: CacheKey) -> Option<f64> {
        self.values.get(&key).copied()
    }

    /// Return `true` if the cache holds values computed at exactly `gt`.
    pub fn is_valid_at(&self, gt: f64) -> bool {
        self.time().is_some_and(|t| t == gt)
    }

    /// Drop all cached values.
    pub fn invalidate(&mut self) { self.values.clear(); }

    /// Replace the cache contents with values computed at `gt`.
    pub fn store(&mut self, gt: f64, half_detuning: f64, half_coupling: f64) {
        self.values.clear();
        self.values.insert(CacheKey::Time, gt);
        self.values.insert(CacheKey::HalfDetuning, half_detuning);
        self.values.insert(CacheKey::HalfCoupling, half_coupling);
        self.refreshes += 1;
    }

    /// Number of times the cache has been filled since creation.
    pub fn refreshes(&self) -> usize { self.refreshes }
}

/// Sawtooth detuning with a soft-switched Rabi frequency.
#[derive(Clone, Debug)]
pub struct SwapDrive {
    params: SweepParams,
    cache: ParamCache,
}

impl SwapDrive {
    /// Create a new `SwapDrive` with an empty cache.
    ///
    /// Fails if the sweep frequency is not positive.
    pub fn new(params: SweepParams) -> ConfigResult<Self> {
        Self::with_cache(params, ParamCache::new())
    }

    /// Create a new `SwapDrive`, taking ownership of an existing cache.
    ///
    /// The cache is invalidated on entry.
    pub fn with_cache(params: SweepParams, mut cache: ParamCache)
        -> ConfigResult<Self>
    {
        params.check()?;
        cache.invalidate();
        Ok(Self { params, cache })
    }

    /// Read parameters from a table; see [`SweepParams::from_table`].
    pub fn from_table(table: &ParamTable) -> ConfigResult<Self> {
        Self::new(SweepParams::from_table(table)?)
    }

    /// Return a reference to the fixed parameters.
    pub fn params(&self) -> &SweepParams { &self.params }

    /// Return a reference to the cache.
    pub fn cache(&self) -> &ParamCache { &self.cache }

    /// Drop all cached values.
    pub fn invalidate_cache(&mut self) { self.cache.invalidate(); }

    /// Give up ownership of the cache.
    pub fn into_cache(self) -> ParamCache { self.cache }

    // fractional progress through the current sweep period
    fn cycle_fraction(&self, gt: f64) -> f64 {
        (self.params.detun_freq * gt).fract()
    }

    /// Return half the detuning and half the Rabi frequency at `gt`, reusing
    /// cached values if `gt` was also the last time requested.
    pub fn half_values(&mut self, gt: f64) -> (f64, f64) {
        if !self.cache.is_valid_at(gt) {
            let hd = 0.5 * self.detuning(gt);
            let hr = 0.5 * self.coupling(gt);
            self.cache.store(gt, hd, hr);
            return (hd, hr);
        }
        (
            self.cache.get(CacheKey::HalfDetuning).unwrap_or(f64::NAN),
            self.cache.get(CacheKey::HalfCoupling).unwrap_or(f64::NAN),
        )
    }
}

impl SweepDrive for SwapDrive {
    fn sweep_frequency(&self) -> f64 { self.params.detun_freq }

    fn detuning(&self, gt: f64) -> f64 {
        self.params.detun_amp * (2.0 * self.cycle_fraction(gt) - 1.0)
    }

    fn coupling(&self, gt: f64) -> f64 {
        let SweepParams { rabi_freq, rabi_switch_coeff, rabi_switch_power, .. }
            = self.params;
        let x = (2.0 * self.cycle_fraction(gt) - 1.0).abs();
        rabi_freq * (-rabi_switch_coeff * x.powf(rabi_switch_power)).exp()
    }

    fn cumulative_phase(&self, gt: f64) -> f64 {
        let SweepParams { detun_amp, detun_freq, transition_freq, .. }
            = self.params;
        let x = gt * detun_freq;
        let ncycles = x.trunc();
        let frac = x - ncycles;
        // a full period of the sawtooth contributes no net detuning phase
        (
            ncycles * transition_freq
            + frac * (transition_freq + detun_amp * (frac - 1.0))
        ) / detun_freq
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use crate::quad::romberg;
    use super::*;

    fn params() -> SweepParams {
        SweepParams {
            rabi_freq: 3.0,
            rabi_switch_coeff: 4.0,
            rabi_switch_power: 2.0,
            detun_amp: 20.0,
            detun_freq: 0.25,
            transition_freq: 7.5,
        }
    }

    #[test]
    fn sawtooth_spans_amplitude() {
        let drive = SwapDrive::new(params()).unwrap();
        assert_relative_eq!(drive.detuning(0.0), -20.0);
        assert_relative_eq!(drive.detuning(2.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(drive.detuning(3.0), 10.0, epsilon = 1e-12);
        // periodic
        assert_relative_eq!(drive.detuning(7.0), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn soft_switch_peaks_mid_period() {
        let drive = SwapDrive::new(params()).unwrap();
        assert_relative_eq!(drive.coupling(2.0), 3.0, epsilon = 1e-12);
        assert_relative_eq!(drive.coupling(0.0), 3.0 * (-4.0_f64).exp());
        // symmetric about the midpoint
        assert_relative_eq!(
            drive.coupling(1.3), drive.coupling(2.7), epsilon = 1e-12);
        assert!(drive.coupling(1.0) < drive.coupling(1.5));
    }

    #[test]
    fn cumulative_phase_matches_quadrature() {
        let drive = SwapDrive::new(params()).unwrap();
        let SweepParams { detun_amp, detun_freq, transition_freq, .. }
            = *drive.params();
        // laser frequency measured from the start of a period
        let local = |t: f64| {
            transition_freq + detun_amp * (2.0 * detun_freq * t - 1.0)
        };
        for &gt in [0.0, 0.7, 3.99, 4.0, 5.3, 13.1].iter() {
            // integrate period by period to keep the integrand smooth
            let period = drive.period();
            let mut numeric = 0.0;
            let mut t0 = 0.0;
            while t0 < gt {
                let t1 = (t0 + period).min(gt);
                numeric += romberg(local, t1 - t0, None, Some(1e-11)).unwrap();
                t0 = t1;
            }
            assert_relative_eq!(
                drive.cumulative_phase(gt), numeric, epsilon = 1e-7);
        }
    }

    #[test]
    fn cache_reused_for_repeated_times() {
        let mut drive = SwapDrive::new(params()).unwrap();
        let a = drive.half_values(1.1);
        let b = drive.half_values(1.1);
        assert_eq!(a, b);
        assert_eq!(drive.cache().refreshes(), 1);
        drive.half_values(1.2);
        assert_eq!(drive.cache().refreshes(), 2);
        assert!(drive.cache().is_valid_at(1.2));
        drive.invalidate_cache();
        assert_eq!(drive.cache().time(), None);
        let c = drive.half_values(1.1);
        assert_eq!(a, c);
        assert_eq!(drive.cache().refreshes(), 3);
    }

    #[test]
    fn zero_sweep_frequency_rejected() {
        let mut p = params();
        p.detun_freq = 0.0;
        assert!(matches!(
            SwapDrive::new(p),
            Err(ConfigError::BadValue { .. })
        ));
    }
}
