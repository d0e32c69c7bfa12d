//! Initial density matrices, all supported entirely on the low level.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    config::ConfigResult,
    error::ConfigError,
    index::{ Level, StateIndex },
    quad::romberg,
    units::{ hbar, kB },
};

/// Truncation of the antihydrogen momentum distribution, in standard
/// deviations along each axis.
pub const NUM_STDDEVS: f64 = 5.0;

/// Physical scales needed to convert temperatures into momentum-state
/// weights.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThermalScale {
    /// Recoil frequency in units of the decay rate.
    pub recoil_freq: f64,
    /// Spontaneous decay rate (s^-1).
    pub decay_rate: f64,
}

impl ThermalScale {
    // recoil energy over k_B T
    fn recoil_over_kt(&self, temperature: f64) -> f64 {
        hbar * self.recoil_freq * self.decay_rate / (kB * temperature)
    }
}

fn check_temperature(temperature: f64) -> ConfigResult<()> {
    (temperature > 0.0 && temperature.is_finite())
        .then_some(())
        .ok_or_else(|| {
            ConfigError::bad_value(
                "initial_temperature",
                format!("must be positive and finite; got {temperature}"),
            )
        })
}

// place normalized weights on the diagonal of the low-level block
fn low_diagonal<I>(index: &StateIndex, weights: I) -> ConfigResult<nd::Array1<C64>>
where I: IntoIterator<Item = (i64, f64)>
{
    let mut rho = index.zeros();
    let mut norm: f64 = 0.0;
    for (k, w) in weights.into_iter() {
        *index.at_mut(&mut rho, Level::Low, k, Level::Low, k) = C64::from(w);
        norm += w;
    }
    if !(norm > 0.0 && norm.is_finite()) {
        return Err(ConfigError::bad_value(
            "initial_temperature",
            format!("initial distribution cannot be normalized: total weight {norm}"),
        ));
    }
    rho /= C64::from(norm);
    Ok(rho)
}

/// All population in `|L, k><L, k|`.
pub fn single_k(index: &StateIndex, k: i64) -> ConfigResult<nd::Array1<C64>> {
    if !index.contains_k(k) {
        return Err(ConfigError::bad_value(
            "initial_momentum",
            format!(
                "must lie in [{}, {}]; got {}", index.kmin(), index.kmax(), k),
        ));
    }
    let mut rho = index.zeros();
    *index.at_mut(&mut rho, Level::Low, k, Level::Low, k) = C64::from(1.0);
    Ok(rho)
}

/// Boltzmann distribution over the momentum states of the low level,
/// `P(k) ∝ exp(-ħ ωr k^2 / k_B T)`.
pub fn thermal(index: &StateIndex, temperature: f64, scale: ThermalScale)
    -> ConfigResult<nd::Array1<C64>>
{
    check_temperature(temperature)?;
    let beta = scale.recoil_over_kt(temperature);
    low_diagonal(
        index,
        index.momenta().map(|k| (k, (-beta * (k * k) as f64).exp())),
    )
}

/// Weight of axial momentum `k_axial` in an isotropic three-dimensional
/// Gaussian of width `sigma`, truncated at a radius of `NUM_STDDEVS * √3 *
/// sigma`:
/// ```text
/// ∫_{|k_a|}^{b} k exp(-k^2 / 2σ^2) / sqrt(1 - k_a^2 / k^2) dk
/// ```
/// Evaluated with the substitution `k^2 = k_a^2 + u^2`, which removes the
/// square-root singularity at the lower bound.
pub fn axial_weight(k_axial: f64, sigma: f64) -> Option<f64> {
    let ka2 = k_axial.powi(2);
    let b = NUM_STDDEVS * 3.0_f64.sqrt() * sigma;
    if b * b <= ka2 { return Some(0.0); }
    let u_max = (b * b - ka2).sqrt();
    let two_sig2 = 2.0 * sigma * sigma;
    romberg(
        |u| {
            let k2 = ka2 + u * u;
            k2.sqrt() * (-k2 / two_sig2).exp()
        },
        u_max,
        None,
        Some(1e-9 * sigma * sigma),
    )
}

/// Axial momentum distribution of antihydrogen in the 2s state produced from
/// a thermal cloud; see [`axial_weight`].
pub fn antihydrogen_2s(index: &StateIndex, temperature: f64, scale: ThermalScale)
    -> ConfigResult<nd::Array1<C64>>
{
    check_temperature(temperature)?;
    let sigma = (2.0 * scale.recoil_over_kt(temperature)).recip().sqrt();
    let weights: Vec<(i64, f64)>
        = index.momenta()
        .map(|k| {
            axial_weight(k as f64, sigma)
                .map(|w| (k, w))
                .ok_or_else(|| {
                    ConfigError::bad_value(
                        "initial_temperature",
                        format!("axial weight for k = {k} did not converge"),
                    )
                })
        })
        .collect::<ConfigResult<_>>()?;
    low_diagonal(index, weights)
}
