//! Read-only reductions of the density matrix.

use std::fmt;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    Arr1,
    index::{ Level, StateIndex },
    sweep::SweepParams,
};

/// RMS momentum over all levels.
pub fn k_rms<S>(index: &StateIndex, rho: &Arr1<S>) -> f64
where S: nd::Data<Elem = C64>
{
    index.momenta()
        .map(|k| index.partial_trace_n(rho, k).re * (k * k) as f64)
        .sum::<f64>()
        .sqrt()
}

/// RMS momentum over the low and excited levels, renormalized to their total
/// population.
///
/// Returns NaN if the low and excited levels are empty.
pub fn k_rms_unleaked<S>(index: &StateIndex, rho: &Arr1<S>) -> f64
where S: nd::Data<Elem = C64>
{
    let unleaked
        = (
            index.partial_trace_k(rho, Level::Low)
            + index.partial_trace_k(rho, Level::Excited)
        ).re;
    if unleaked <= 0.0 { return f64::NAN; }
    index.momenta()
        .map(|k| {
            let p
                = index.at(rho, Level::Low, k, Level::Low, k).re
                + index.at(rho, Level::Excited, k, Level::Excited, k).re;
            p * (k * k) as f64 / unleaked
        })
        .sum::<f64>()
        .sqrt()
}

/// Summary quantities of a single density matrix.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StateInfo {
    /// Populations of the ground, low, and excited levels, in that order.
    pub populations: [f64; Level::NUM],
    pub trace: f64,
    pub purity: f64,
    pub k_rms: f64,
    pub k_rms_unleaked: f64,
}

impl StateInfo {
    /// Compute all summary quantities.
    pub fn new<S>(index: &StateIndex, rho: &Arr1<S>) -> Self
    where S: nd::Data<Elem = C64>
    {
        let mut populations = [0.0; Level::NUM];
        Level::ALL.iter()
            .for_each(|&n| {
                populations[n.index()] = index.partial_trace_k(rho, n).re;
            });
        Self {
            populations,
            trace: index.total_trace(rho).re,
            purity: index.purity(rho).re,
            k_rms: k_rms(index, rho),
            k_rms_unleaked: k_rms_unleaked(index, rho),
        }
    }

    /// Flatten into `[ground, low, excited, trace, purity, k_rms,
    /// k_rms_unleaked]`.
    pub fn to_array(&self) -> nd::Array1<f64> {
        let [g, l, e] = self.populations;
        nd::array![
            g, l, e, self.trace, self.purity, self.k_rms, self.k_rms_unleaked,
        ]
    }
}

/// Momentum distribution of a single density matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct KDist {
    /// Momentum values, in photon recoils.
    pub k: nd::Array1<i64>,
    /// Total probability of each `k`.
    pub total: nd::Array1<f64>,
    /// Probability of each `(k, level)`, with shape `[nk, 3]`.
    pub by_level: nd::Array2<f64>,
}

impl KDist {
    pub fn new<S>(index: &StateIndex, rho: &Arr1<S>) -> Self
    where S: nd::Data<Elem = C64>
    {
        let k: nd::Array1<i64> = index.momenta().collect();
        let total: nd::Array1<f64>
            = k.mapv(|kj| index.partial_trace_n(rho, kj).re);
        let by_level: nd::Array2<f64>
            = nd::Array2::from_shape_fn(
                (k.len(), Level::NUM),
                |(j, n)| {
                    let kj = k[j];
                    let n = Level::ALL[n];
                    index.at(rho, n, kj, n, kj).re
                },
            );
        Self { k, total, by_level }
    }
}

/// Rating of a dimensionless figure of merit against two thresholds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rating {
    Okay,
    Low,
    VeryLow,
}

impl Rating {
    /// Threshold below which a figure of merit is rated `Low`.
    pub const LOW_THRESH: f64 = 10.0;
    /// Threshold below which a figure of merit is rated `VeryLow`.
    pub const VERY_LOW_THRESH: f64 = 1.0;

    /// Rate `metric` against the default thresholds.
    pub fn of(metric: f64) -> Self {
        Self::with_thresholds(metric, Self::LOW_THRESH, Self::VERY_LOW_THRESH)
    }

    pub fn with_thresholds(metric: f64, low: f64, very_low: f64) -> Self {
        if metric < very_low {
            Self::VeryLow
        } else if metric < low {
            Self::Low
        } else {
            Self::Okay
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Okay => write!(f, "ok"),
            Self::Low => write!(f, "LOW"),
            Self::VeryLow => write!(f, "VERY LOW"),
        }
    }
}

/// Dimensionless figures of merit for sawtooth-wave adiabatic passage
/// cooling, all of which should be large.
///
/// With Doppler shift `d = ωr k_rms`:
/// - ramp size: `A / 4d`, the sweep range relative to the Doppler width
/// - Q factor: `A f / (2(d - ωr) + Ω)`, sweep period relative to the time
///   spent near resonance
/// - adiabaticity: `Ω^2 / 2 A f`, the Landau-Zener parameter
/// - Doppler splitting: `2(d - ωr) / Ω`, resolution of neighbouring momentum
///   resonances
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QualityMetrics {
    pub doppler_shift: f64,
    pub ramp_size: f64,
    pub q_factor: f64,
    pub adiabaticity: f64,
    pub splitting: f64,
}

impl QualityMetrics {
    pub fn new(sweep: &SweepParams, recoil_freq: f64, k_rms: f64) -> Self {
        let SweepParams { rabi_freq, detun_amp, detun_freq, .. } = *sweep;
        let doppler_shift = recoil_freq * k_rms;
        let excess = doppler_shift - recoil_freq;
        Self {
            doppler_shift,
            ramp_size: detun_amp / (4.0 * doppler_shift),
            q_factor: detun_amp * detun_freq / (2.0 * excess + rabi_freq),
            adiabaticity: rabi_freq.powi(2) / (2.0 * detun_amp * detun_freq),
            splitting: 2.0 * excess / rabi_freq,
        }
    }

    /// Return each metric with its name and rating.
    pub fn ratings(&self) -> [(&'static str, f64, Rating); 4] {
        [
            ("ramp size", self.ramp_size, Rating::of(self.ramp_size)),
            ("Q factor", self.q_factor, Rating::of(self.q_factor)),
            ("adiabaticity", self.adiabaticity, Rating::of(self.adiabaticity)),
            ("Doppler splitting", self.splitting, Rating::of(self.splitting)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use super::*;

    fn mixed(index: &StateIndex) -> nd::Array1<C64> {
        let mut rho = index.zeros();
        *index.at_mut(&mut rho, Level::Low, 2, Level::Low, 2) = 0.25.into();
        *index.at_mut(&mut rho, Level::Excited, -2, Level::Excited, -2)
            = 0.25.into();
        *index.at_mut(&mut rho, Level::Ground, 0, Level::Ground, 0) = 0.25.into();
        *index.at_mut(&mut rho, Level::Ground, 4, Level::Ground, 4) = 0.25.into();
        rho
    }

    #[test]
    fn momentum_spread() {
        let index = StateIndex::new(None, 4).unwrap();
        let rho = mixed(&index);
        // (0.25 * 4 + 0.25 * 4 + 0.25 * 16)^(1/2)
        assert_relative_eq!(k_rms(&index, &rho), 6.0_f64.sqrt());
        assert_relative_eq!(k_rms_unleaked(&index, &rho), 2.0);
        assert!(k_rms_unleaked(&index, &index.zeros()).is_nan());
    }

    #[test]
    fn state_info_and_kdist() {
        let index = StateIndex::new(None, 4).unwrap();
        let rho = mixed(&index);
        let info = StateInfo::new(&index, &rho);
        assert_eq!(info.populations, [0.5, 0.25, 0.25]);
        assert_relative_eq!(info.trace, 1.0);
        assert_relative_eq!(info.purity, 0.25);
        assert_eq!(info.to_array().len(), 7);

        let kdist = KDist::new(&index, &rho);
        assert_eq!(kdist.k.len(), 9);
        assert_eq!(kdist.k[0], -4);
        assert_relative_eq!(kdist.total.sum(), 1.0);
        // k = 2 is index 6
        assert_eq!(kdist.by_level[[6, Level::Low.index()]], 0.25);
        assert_eq!(kdist.by_level[[6, Level::Excited.index()]], 0.0);
        assert_eq!(kdist.total[8], 0.25);
    }

    #[test]
    fn quality_metrics() {
        let sweep = SweepParams {
            rabi_freq: 2.0,
            rabi_switch_coeff: 0.0,
            rabi_switch_power: 2.0,
            detun_amp: 40.0,
            detun_freq: 0.5,
            transition_freq: 1.0,
        };
        let q = QualityMetrics::new(&sweep, 0.5, 5.0);
        assert_relative_eq!(q.doppler_shift, 2.5);
        assert_relative_eq!(q.ramp_size, 4.0);
        assert_relative_eq!(q.q_factor, 20.0 / 6.0);
        assert_relative_eq!(q.adiabaticity, 0.1);
        assert_relative_eq!(q.splitting, 2.0);
        let ratings = q.ratings();
        assert_eq!(ratings[0].2, Rating::Low);
        assert_eq!(ratings[2].2, Rating::VeryLow);
        assert_eq!(Rating::of(12.0), Rating::Okay);
        assert_eq!(Rating::VeryLow.to_string(), "VERY LOW");
    }
}
