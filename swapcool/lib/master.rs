//! Right-hand side of the Lindblad master equation for a three-level atom with
//! quantized recoil momentum, driven by a [`SwapDrive`].
//!
//! Under the rotating wave approximation, the integrated quantities are the
//! coefficients `c` of the density matrix in a frame rotating with the laser
//! phase `Φ(gt)`, which differ from the density matrix `ρ` only on the
//! low-excited coherences:
//! ```text
//! ρ[L k, E k] = c[L k, E k] * exp(i Φ(gt))
//! ρ[E k, L k] = c[E k, L k] * exp(-i Φ(gt))
//! ```
//! In this frame the derivative with respect to `gt` is
//! ```text
//! dc/d(gt) = -i [H, c] + D(c)
//! ```
//! with
//! ```text
//! <n k| H |n' k'> = (ωr k^2 + s(n) δ/2) δ_{n n'} δ_{k k'}
//!                   + Ω/2 (for {n, n'} = {L, E}, k' = k ± 1)
//! ```
//! where `s(L) = +1`, `s(E) = -1`, `s(G) = 0`, and `D` is the spontaneous decay
//! dissipator described at [`MotionOperator::decay_term`]. Momentum states
//! outside the tracked window are dropped from both terms, which makes the
//! window edges a sink for population.

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::warn;
use crate::{
    Arr1,
    config::{ ConfigResult, ParamTable },
    error::ConfigError,
    index::{ Level, State, StateIndex },
    sweep::{ ParamCache, SwapDrive, SweepDrive, SweepParams },
    units::{ c, hbar },
};

/// Hermiticity defects larger than this are reported at cycle boundaries.
pub const HERMITIAN_WARN: f64 = 1e-8;

/// Derivative evaluator for a master equation driven by a [`SweepDrive`].
pub trait MasterEquation: SweepDrive {
    /// Return the addressing scheme of the density matrix.
    fn state_index(&self) -> &StateIndex;

    /// Compute the time derivative of the rotating-frame coefficients at `gt`.
    ///
    /// `gt` only enters through the periodic detuning and coupling, so it may
    /// be given modulo the sweep period.
    fn derivative(&mut self, gt: f64, coeffs: &nd::Array1<C64>)
        -> nd::Array1<C64>;

    /// Transform rotating-frame coefficients at `gt` into the physical density
    /// matrix.
    fn density_matrix(&self, gt: f64, coeffs: &nd::Array1<C64>)
        -> nd::Array1<C64>;

    /// Inverse of [`Self::density_matrix`].
    fn coefficients(&self, gt: f64, rho: &nd::Array1<C64>)
        -> nd::Array1<C64>;

    /// Prepare the coefficients and any time-local state for a new sweep
    /// period.
    fn initialize_cycle(&mut self, coeffs: &mut nd::Array1<C64>);
}

/// Spontaneous decay parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecayParams {
    /// Fraction of decays from the excited state that land in the low state;
    /// the rest go to the ground state.
    pub branching_ratio: f64,
    /// Include the dissipator.
    pub enable_decay: bool,
    /// Probability that a decay into the low state leaves the momentum
    /// unchanged; the remainder is split evenly between `k - 1` and `k + 1`,
    /// approximating the anisotropic dipole radiation pattern.
    pub stationary_decay_prob: f64,
}

impl DecayParams {
    pub const DEF_STATIONARY_DECAY_PROB: f64 = 0.6;

    /// Read decay parameters from a table.
    pub fn from_table(table: &ParamTable) -> ConfigResult<Self> {
        let params = Self {
            branching_ratio: table.get_f64("branching_ratio")?,
            enable_decay: table.get_bool("enable_decay")?,
            stationary_decay_prob:
                table.get_f64_opt("stationary_decay_prob")?
                .unwrap_or(Self::DEF_STATIONARY_DECAY_PROB),
        };
        params.check()?;
        Ok(params)
    }

    fn check(&self) -> ConfigResult<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.branching_ratio) {
            return Err(ConfigError::bad_value(
                "branching_ratio",
                format!("must be in [0, 1]; got {}", self.branching_ratio),
            ));
        }
        if !unit.contains(&self.stationary_decay_prob) {
            return Err(ConfigError::bad_value(
                "stationary_decay_prob",
                format!("must be in [0, 1]; got {}", self.stationary_decay_prob),
            ));
        }
        Ok(())
    }
}

/// Compute the recoil frequency, in units of the decay rate, for an atom of
/// mass `mass` (kg) on a transition of angular frequency `transition_freq`
/// (decay-rate units) with decay rate `decay_rate` (s^-1).
pub fn recoil_freq_per_decay(decay_rate: f64, mass: f64, transition_freq: f64)
    -> f64
{
    let k_photon_per_decay = transition_freq / c;
    hbar * k_photon_per_decay.powi(2) * decay_rate / (2.0 * mass)
}

/// Master equation for the three-level atom with a momentum ladder.
#[derive(Clone, Debug)]
pub struct MotionOperator {
    drive: SwapDrive,
    decay: DecayParams,
    index: StateIndex,
    recoil_freq: f64,
}

impl MotionOperator {
    /// Create a new `MotionOperator`.
    ///
    /// `recoil_freq` is the recoil frequency in units of the decay rate; see
    /// [`recoil_freq_per_decay`].
    pub fn new(
        sweep: SweepParams,
        decay: DecayParams,
        index: StateIndex,
        recoil_freq: f64,
    ) -> ConfigResult<Self>
    {
        Self::with_cache(sweep, decay, index, recoil_freq, ParamCache::new())
    }

    /// Like [`Self::new`], but handing an existing cache to the drive.
    pub fn with_cache(
        sweep: SweepParams,
        decay: DecayParams,
        index: StateIndex,
        recoil_freq: f64,
        cache: ParamCache,
    ) -> ConfigResult<Self>
    {
        decay.check()?;
        let drive = SwapDrive::with_cache(sweep, cache)?;
        Ok(Self { drive, decay, index, recoil_freq })
    }

    /// Build from a table of named parameters.
    ///
    /// Required: `spontaneous_decay_rate`, `mass`, `max_momentum`,
    /// `branching_ratio`, `enable_decay`, `rabi_frequency`,
    /// `rabi_switch_coeff`, `rabi_switch_power`, `detuning_amplitude`,
    /// `detuning_frequency`, `low_energy_level`, `high_energy_level`.
    ///
    /// Optional: `min_momentum` (defaults to `-max_momentum`),
    /// `stationary_decay_prob` (defaults to 0.6).
    pub fn from_table(table: &ParamTable) -> ConfigResult<Self> {
        let sweep = SweepParams::from_table(table)?;
        let decay = DecayParams::from_table(table)?;
        let kmax = table.get_int("max_momentum")?;
        let kmin = table.get_int_opt("min_momentum")?;
        let index = StateIndex::new(kmin, kmax)?;
        let decay_rate = table.get_f64("spontaneous_decay_rate")?;
        let mass = table.get_f64("mass")?;
        if !(mass > 0.0) {
            return Err(ConfigError::bad_value(
                "mass", format!("must be positive; got {mass}")));
        }
        let recoil_freq
            = recoil_freq_per_decay(decay_rate, mass, sweep.transition_freq);
        Self::new(sweep, decay, index, recoil_freq)
    }

    /// Return a reference to the drive.
    pub fn drive(&self) -> &SwapDrive { &self.drive }

    /// Return a reference to the decay parameters.
    pub fn decay_params(&self) -> &DecayParams { &self.decay }

    /// Recoil frequency in units of the decay rate.
    pub fn recoil_freq(&self) -> f64 { self.recoil_freq }

    /// Compute the single element `<nl kl| H c |nr kr>`.
    pub fn haction<S>(
        &mut self,
        gt: f64,
        coeffs: &Arr1<S>,
        nl: Level,
        kl: i64,
        nr: Level,
        kr: i64,
    ) -> C64
    where S: nd::Data<Elem = C64>
    {
        let (half_detun, half_rabi) = self.drive.half_values(gt);
        let index = &self.index;

        let mut diag = self.recoil_freq * (kl * kl) as f64;
        match nl {
            Level::Ground => { },
            Level::Low => { diag += half_detun; },
            Level::Excited => { diag -= half_detun; },
        }
        let mut val = diag * index.at(coeffs, nl, kl, nr, kr);

        if let Some(partner) = nl.partner() {
            if index.contains_k(kl - 1) {
                val += half_rabi * index.at(coeffs, partner, kl - 1, nr, kr);
            }
            if index.contains_k(kl + 1) {
                val += half_rabi * index.at(coeffs, partner, kl + 1, nr, kr);
            }
        }
        val
    }

    /// Compute the dissipator element `<nl kl| D(c) |nr kr>`.
    ///
    /// - ground populations/coherences gain `(1 - B) c[E kl, E kr]`
    /// - low populations/coherences gain `B` times the excited-state block,
    ///   redistributed over `k` and `k ± 1` by the dipole radiation pattern
    /// - excited-excited elements decay at the full rate
    /// - coherences between the excited state and any other level decay at
    ///   half the rate
    pub fn decay_term<S>(
        &self,
        coeffs: &Arr1<S>,
        nl: Level,
        kl: i64,
        nr: Level,
        kr: i64,
    ) -> C64
    where S: nd::Data<Elem = C64>
    {
        let index = &self.index;
        let DecayParams { branching_ratio, stationary_decay_prob, .. }
            = self.decay;
        if nl == nr {
            match nl {
                Level::Ground => {
                    (1.0 - branching_ratio)
                        * index.at(coeffs, Level::Excited, kl, Level::Excited, kr)
                },
                Level::Low => {
                    let side = (1.0 - stationary_decay_prob) / 2.0;
                    let mut diprad
                        = stationary_decay_prob
                        * index.at(coeffs, Level::Excited, kl, Level::Excited, kr);
                    if index.contains_k(kl - 1) && index.contains_k(kr - 1) {
                        diprad += side * index.at(
                            coeffs, Level::Excited, kl - 1, Level::Excited, kr - 1);
                    }
                    if index.contains_k(kl + 1) && index.contains_k(kr + 1) {
                        diprad += side * index.at(
                            coeffs, Level::Excited, kl + 1, Level::Excited, kr + 1);
                    }
                    branching_ratio * diprad
                },
                // double decay of coherences within the excited state
                Level::Excited => {
                    -index.at(coeffs, Level::Excited, kl, Level::Excited, kr)
                },
            }
        } else if nl == Level::Excited || nr == Level::Excited {
            -0.5 * index.at(coeffs, nl, kl, nr, kr)
        } else {
            C64::from(0.0)
        }
    }

    /// Compute a single element of the derivative directly from the
    /// commutator and dissipator, without using Hermiticity.
    pub fn derivative_entry<S>(
        &mut self,
        gt: f64,
        coeffs: &Arr1<S>,
        l: State,
        r: State,
    ) -> C64
    where S: nd::Data<Elem = C64>
    {
        let (nl, kl) = l;
        let (nr, kr) = r;
        let mut val
            = -C64::i() * self.haction(gt, coeffs, nl, kl, nr, kr)
            + C64::i() * self.haction(gt, coeffs, nr, kr, nl, kl).conj();
        if self.decay.enable_decay {
            val += self.decay_term(coeffs, nl, kl, nr, kr);
        }
        val
    }

    // multiply <L k| . |E k> by `cexp` and <E k| . |L k> by its conjugate
    fn rotate(&self, a: &nd::Array1<C64>, cexp: C64) -> nd::Array1<C64> {
        let mut b = a.clone();
        for k in self.index.momenta() {
            *self.index.at_mut(&mut b, Level::Low, k, Level::Excited, k) *= cexp;
            *self.index.at_mut(&mut b, Level::Excited, k, Level::Low, k)
                *= cexp.conj();
        }
        b
    }
}

impl SweepDrive for MotionOperator {
    fn sweep_frequency(&self) -> f64 { self.drive.sweep_frequency() }

    fn detuning(&self, gt: f64) -> f64 { self.drive.detuning(gt) }

    fn coupling(&self, gt: f64) -> f64 { self.drive.coupling(gt) }

    fn cumulative_phase(&self, gt: f64) -> f64 {
        self.drive.cumulative_phase(gt)
    }
}

impl MasterEquation for MotionOperator {
    fn state_index(&self) -> &StateIndex { &self.index }

    /// Only elements on or above the diagonal are evaluated; those below are
    /// the conjugates of their mirror images.
    fn derivative(&mut self, gt: f64, coeffs: &nd::Array1<C64>)
        -> nd::Array1<C64>
    {
        let index = self.index;
        let n = index.nstates();
        let states: Vec<State> = index.states().collect();
        let mut dcoeffs: nd::Array1<C64> = index.zeros();
        let mut val: C64;
        for (i, &l) in states.iter().enumerate() {
            val = self.derivative_entry(gt, coeffs, l, l);
            dcoeffs[i * n + i] = val;
            for (j, &r) in states.iter().enumerate().skip(i + 1) {
                val = self.derivative_entry(gt, coeffs, l, r);
                dcoeffs[i * n + j] = val;
                dcoeffs[j * n + i] = val.conj();
            }
        }
        dcoeffs
    }

    fn density_matrix(&self, gt: f64, coeffs: &nd::Array1<C64>)
        -> nd::Array1<C64>
    {
        let cexp = C64::cis(self.cumulative_phase(gt));
        self.rotate(coeffs, cexp)
    }

    fn coefficients(&self, gt: f64, rho: &nd::Array1<C64>)
        -> nd::Array1<C64>
    {
        let cexp = C64::cis(self.cumulative_phase(gt));
        self.rotate(rho, cexp.conj())
    }

    /// The rotating phase is referenced to global time and is continuous
    /// across period boundaries, so the coefficients only need to be
    /// re-symmetrized; the drive cache is dropped because local time restarts
    /// at zero.
    fn initialize_cycle(&mut self, coeffs: &mut nd::Array1<C64>) {
        self.drive.invalidate_cache();
        let defect = self.index.hermitian_defect(coeffs);
        if defect > HERMITIAN_WARN {
            warn!(defect, "coefficients drifted from hermiticity");
        }
        self.index.hermitize(coeffs);
    }
}
