//! Addressing of density matrix elements over the product of internal levels
//! and momentum states.
//!
//! Each composite state `|n, k>` is assigned the flat index
//! ```text
//! stateidx(n, k) = (k - kmin) + (kmax - kmin + 1) * n
//! ```
//! and the density matrix is stored row-major in a single flat buffer of
//! length `N^2`, with `<nl, kl| ρ |nr, kr>` at
//! ```text
//! stateidx(nl, kl) * N + stateidx(nr, kr)
//! ```

use std::ops::RangeInclusive;
use itertools::Itertools;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    Arr1,
    error::{ ConfigError, DimensionError },
};

/// Internal atomic level.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    /// Ground state; not addressed by the laser.
    Ground = 0,
    /// Low-lying metastable state; lower level of the driven transition.
    Low = 1,
    /// Upper level of the driven transition.
    Excited = 2,
}

impl Level {
    /// Number of internal levels.
    pub const NUM: usize = 3;

    /// All levels, in index order.
    pub const ALL: [Self; 3] = [Self::Ground, Self::Low, Self::Excited];

    /// Return the level's index.
    pub fn index(self) -> usize { self as usize }

    /// Convert from an index, if valid.
    pub fn from_index(n: usize) -> Option<Self> { Self::ALL.get(n).copied() }

    /// Return the other level of the driven transition, if `self` is part of
    /// it.
    pub fn partner(self) -> Option<Self> {
        match self {
            Self::Ground => None,
            Self::Low => Some(Self::Excited),
            Self::Excited => Some(Self::Low),
        }
    }
}

/// A single composite basis state `|n, k>`.
pub type State = (Level, i64);

/// Bijective map between composite basis states and flat storage indices for
/// a fixed momentum window `[kmin, kmax]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StateIndex {
    kmin: i64,
    kmax: i64,
}

impl StateIndex {
    /// Create a new `StateIndex`.
    ///
    /// If `kmin` is not given, the window is symmetric: `kmin = -kmax`.
    pub fn new(kmin: Option<i64>, kmax: i64) -> Result<Self, ConfigError> {
        let kmin = kmin.unwrap_or(-kmax);
        ConfigError::check_momentum(kmin, kmax)?;
        Ok(Self { kmin, kmax })
    }

    /// Minimum tracked momentum.
    pub fn kmin(&self) -> i64 { self.kmin }

    /// Maximum tracked momentum.
    pub fn kmax(&self) -> i64 { self.kmax }

    /// Iterate over all tracked momenta in ascending order.
    pub fn momenta(&self) -> RangeInclusive<i64> { self.kmin..=self.kmax }

    /// Number of tracked momentum states.
    pub fn nk(&self) -> usize { (self.kmax - self.kmin + 1) as usize }

    /// Number of composite states `N`.
    pub fn nstates(&self) -> usize { Level::NUM * self.nk() }

    /// Number of density matrix elements `N^2`.
    pub fn nmat(&self) -> usize { self.nstates().pow(2) }

    /// Return `true` if `k` lies within the tracked window.
    pub fn contains_k(&self, k: i64) -> bool {
        (self.kmin..=self.kmax).contains(&k)
    }

    /// Flat index of the composite state `|n, k>`.
    ///
    /// `k` must lie within the tracked window; see [`Self::contains_k`] and
    /// [`Self::try_state_index`].
    pub fn state_index(&self, n: Level, k: i64) -> usize {
        debug_assert!(self.contains_k(k), "momentum {k} outside window");
        (k - self.kmin) as usize + self.nk() * n.index()
    }

    /// Like [`Self::state_index`], but returning `None` for out-of-window
    /// momenta.
    pub fn try_state_index(&self, n: Level, k: i64) -> Option<usize> {
        self.contains_k(k).then(|| self.state_index(n, k))
    }

    /// Inverse of [`Self::state_index`].
    pub fn state_of(&self, idx: usize) -> Option<State> {
        let nk = self.nk();
        Level::from_index(idx / nk)
            .map(|n| (n, (idx % nk) as i64 + self.kmin))
    }

    /// Flat index of the density matrix element `<nl, kl| ρ |nr, kr>`.
    pub fn entry_index(&self, nl: Level, kl: i64, nr: Level, kr: i64)
        -> usize
    {
        self.state_index(nr, kr) + self.nstates() * self.state_index(nl, kl)
    }

    /// Inverse of [`Self::entry_index`].
    pub fn entry_of(&self, idx: usize) -> Option<(State, State)> {
        let n = self.nstates();
        if idx >= self.nmat() { return None; }
        self.state_of(idx / n).zip(self.state_of(idx % n))
    }

    /// Iterate over all composite states in index order.
    pub fn states(&self) -> impl Iterator<Item = State> + Clone + '_ {
        Level::ALL.into_iter().cartesian_product(self.momenta())
    }

    /// Return a density matrix of the right size filled with zeros.
    pub fn zeros(&self) -> nd::Array1<C64> { nd::Array1::zeros(self.nmat()) }

    /// Check that a buffer has `N^2` elements.
    pub fn check_dim<S>(&self, rho: &Arr1<S>) -> Result<(), DimensionError>
    where S: nd::Data<Elem = C64>
    {
        let expected = self.nmat();
        let got = rho.len();
        (expected == got).then_some(()).ok_or(DimensionError { expected, got })
    }

    /// Get a single density matrix element.
    pub fn at<S>(&self, rho: &Arr1<S>, nl: Level, kl: i64, nr: Level, kr: i64)
        -> C64
    where S: nd::Data<Elem = C64>
    {
        rho[self.entry_index(nl, kl, nr, kr)]
    }

    /// Get a mutable reference to a single density matrix element.
    pub fn at_mut<'a, S>(
        &self,
        rho: &'a mut Arr1<S>,
        nl: Level,
        kl: i64,
        nr: Level,
        kr: i64,
    ) -> &'a mut C64
    where S: nd::DataMut<Elem = C64>
    {
        &mut rho[self.entry_index(nl, kl, nr, kr)]
    }

    /// Sum of all diagonal elements.
    pub fn total_trace<S>(&self, rho: &Arr1<S>) -> C64
    where S: nd::Data<Elem = C64>
    {
        self.states()
            .map(|(n, k)| self.at(rho, n, k, n, k))
            .sum()
    }

    /// Trace over momentum at fixed internal level, i.e. the population of
    /// level `n`.
    pub fn partial_trace_k<S>(&self, rho: &Arr1<S>, n: Level) -> C64
    where S: nd::Data<Elem = C64>
    {
        self.momenta()
            .map(|k| self.at(rho, n, k, n, k))
            .sum()
    }

    /// Trace over internal levels at fixed momentum, i.e. the population of
    /// momentum state `k`.
    pub fn partial_trace_n<S>(&self, rho: &Arr1<S>, k: i64) -> C64
    where S: nd::Data<Elem = C64>
    {
        Level::ALL.into_iter()
            .map(|n| self.at(rho, n, k, n, k))
            .sum()
    }

    /// Compute `tr(ρ^2)`.
    pub fn purity<S>(&self, rho: &Arr1<S>) -> C64
    where S: nd::Data<Elem = C64>
    {
        let n = self.nstates();
        (0..n).cartesian_product(0..n)
            .map(|(i, j)| rho[i * n + j] * rho[j * n + i])
            .sum()
    }

    /// Largest deviation from Hermiticity, `max |ρ[i, j] - conj(ρ[j, i])|`.
    pub fn hermitian_defect<S>(&self, rho: &Arr1<S>) -> f64
    where S: nd::Data<Elem = C64>
    {
        let n = self.nstates();
        (0..n).cartesian_product(0..n)
            .filter(|(i, j)| i <= j)
            .map(|(i, j)| (rho[i * n + j] - rho[j * n + i].conj()).norm())
            .fold(0.0, f64::max)
    }

    /// Replace `ρ` by its Hermitian part `(ρ + ρ^†) / 2` in place.
    pub fn hermitize<S>(&self, rho: &mut Arr1<S>)
    where S: nd::DataMut<Elem = C64>
    {
        let n = self.nstates();
        let mut avg: C64;
        for i in 0..n {
            for j in i..n {
                avg = (rho[i * n + j] + rho[j * n + i].conj()) / 2.0;
                rho[i * n + j] = avg;
                rho[j * n + i] = avg.conj();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rustc_hash::FxHashSet as HashSet;
    use super::*;

    #[test]
    fn default_window_is_symmetric() {
        let index = StateIndex::new(None, 4).unwrap();
        assert_eq!((index.kmin(), index.kmax()), (-4, 4));
        assert_eq!(index.nk(), 9);
        assert_eq!(index.nstates(), 27);
        assert_eq!(index.nmat(), 729);
    }

    #[test]
    fn inverted_window_rejected() {
        assert!(matches!(
            StateIndex::new(Some(3), 2),
            Err(ConfigError::MomentumRange { kmin: 3, kmax: 2 })
        ));
    }

    #[test]
    fn state_index_is_bijective() {
        let index = StateIndex::new(Some(-2), 5).unwrap();
        let mut seen: HashSet<usize> = HashSet::default();
        for (n, k) in index.states() {
            let idx = index.state_index(n, k);
            assert!(idx < index.nstates());
            assert!(seen.insert(idx));
            assert_eq!(index.state_of(idx), Some((n, k)));
        }
        assert_eq!(seen.len(), index.nstates());
        assert_eq!(index.state_of(index.nstates()), None);
        assert_eq!(index.try_state_index(Level::Low, 6), None);
        assert_eq!(index.try_state_index(Level::Low, -3), None);
    }

    #[test]
    fn entry_index_is_bijective() {
        let index = StateIndex::new(None, 1).unwrap();
        let mut seen: HashSet<usize> = HashSet::default();
        for ((nl, kl), (nr, kr))
            in index.states().cartesian_product(index.states())
        {
            let idx = index.entry_index(nl, kl, nr, kr);
            assert!(seen.insert(idx));
            assert_eq!(index.entry_of(idx), Some(((nl, kl), (nr, kr))));
        }
        assert_eq!(seen.len(), index.nmat());
        // role swap lands on the transposed element
        let l = index.entry_index(Level::Low, -1, Level::Excited, 1);
        let r = index.entry_index(Level::Excited, 1, Level::Low, -1);
        let n = index.nstates();
        assert_eq!((l / n, l % n), (r % n, r / n));
    }

    #[test]
    fn traces_and_purity() {
        let index = StateIndex::new(Some(0), 1).unwrap();
        let mut rho = index.zeros();
        *index.at_mut(&mut rho, Level::Low, 0, Level::Low, 0) = 0.5.into();
        *index.at_mut(&mut rho, Level::Excited, 1, Level::Excited, 1)
            = 0.25.into();
        *index.at_mut(&mut rho, Level::Ground, 1, Level::Ground, 1)
            = 0.25.into();
        assert_relative_eq!(index.total_trace(&rho).re, 1.0);
        assert_relative_eq!(index.partial_trace_k(&rho, Level::Low).re, 0.5);
        assert_relative_eq!(index.partial_trace_n(&rho, 1).re, 0.5);
        assert_relative_eq!(index.partial_trace_n(&rho, 0).re, 0.5);
        assert_relative_eq!(index.purity(&rho).re, 0.375);

        // a pure superposition has unit purity
        let mut rho = index.zeros();
        for (a, b) in [(Level::Low, 0), (Level::Excited, 1)]
            .into_iter()
            .cartesian_product([(Level::Low, 0), (Level::Excited, 1)])
        {
            *index.at_mut(&mut rho, a.0, a.1, b.0, b.1) = 0.5.into();
        }
        assert_relative_eq!(index.purity(&rho).re, 1.0, epsilon = 1e-14);
        assert_eq!(index.hermitian_defect(&rho), 0.0);
    }

    #[test]
    fn hermitize_restores_symmetry() {
        let index = StateIndex::new(Some(0), 0).unwrap();
        let mut rho = index.zeros();
        *index.at_mut(&mut rho, Level::Low, 0, Level::Excited, 0)
            = C64::new(0.1, 0.2);
        *index.at_mut(&mut rho, Level::Excited, 0, Level::Low, 0)
            = C64::new(0.1, -0.1);
        assert!(index.hermitian_defect(&rho) > 0.0);
        index.hermitize(&mut rho);
        assert_eq!(index.hermitian_defect(&rho), 0.0);
        assert_relative_eq!(
            index.at(&rho, Level::Low, 0, Level::Excited, 0).im, 0.15);
    }
}
