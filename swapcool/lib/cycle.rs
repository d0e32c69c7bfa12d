//! Integration over whole sweep periods.
//!
//! The adaptive stepper is restarted at the beginning of every period of the
//! sawtooth, with local time running from zero. The derivative is evaluated at
//! local time, where the periodic detuning and coupling start exactly at the
//! beginning of the ramp, so the discontinuity of the detuning at period
//! boundaries stays out of any single step. Results are down-sampled to a
//! fixed grid in global time and passed to an observer as physical density
//! matrices, with the laser phase taken at global time.

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::{ debug, info };
use crate::{
    error::SwapResult,
    master::MasterEquation,
    stepper::{ IntegrationResult, Rka },
};

/// Decides which integrator outputs are passed on to an observer.
///
/// Global time is divided into bins of width `1 / (points_per_cycle * f)`; a
/// sample is accepted only if it falls in a later bin than the last accepted
/// sample.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OutputSampler {
    interval: f64,
    last: i64,
}

impl OutputSampler {
    /// Create a new `OutputSampler` for a sweep of frequency `sweep_freq`.
    pub fn new(points_per_cycle: f64, sweep_freq: f64) -> Self {
        Self { interval: (points_per_cycle * sweep_freq).recip(), last: -1 }
    }

    /// Width of each output bin.
    pub fn interval(&self) -> f64 { self.interval }

    /// Return `true` and advance if `gt` falls in a new output bin.
    pub fn accept(&mut self, gt: f64) -> bool {
        let n = (gt / self.interval).floor() as i64;
        if n > self.last {
            self.last = n;
            true
        } else {
            false
        }
    }
}

/// Summary of a completed [`CycleIntegrator::run`].
#[derive(Clone, Debug)]
pub struct CycleRun {
    /// Global time of the final state.
    pub gt: f64,
    /// Final rotating-frame coefficients.
    pub coeffs: nd::Array1<C64>,
    /// Final density matrix.
    pub rho: nd::Array1<C64>,
    /// Number of stepper passes, including a final partial period.
    pub passes: usize,
    /// Total number of accepted steps.
    pub steps: usize,
    /// Number of samples passed to the observer.
    pub samples: usize,
}

/// Drives a [`MasterEquation`] through a number of sweep periods.
#[derive(Clone, Debug)]
pub struct CycleIntegrator<M> {
    op: M,
    stepper: Rka,
    points_per_cycle: f64,
}

impl<M> CycleIntegrator<M>
where M: MasterEquation
{
    pub const DEF_POINTS_PER_CYCLE: f64 = 100.0;

    /// Create a new `CycleIntegrator` with stepper error bound `tolerance`.
    pub fn new(op: M, tolerance: f64) -> IntegrationResult<Self> {
        Ok(Self::with_stepper(op, Rka::new(tolerance)?))
    }

    /// Create a new `CycleIntegrator` using a pre-configured stepper.
    pub fn with_stepper(op: M, stepper: Rka) -> Self {
        Self { op, stepper, points_per_cycle: Self::DEF_POINTS_PER_CYCLE }
    }

    /// Set the approximate number of samples per sweep period.
    pub fn with_points_per_cycle(mut self, points_per_cycle: f64) -> Self {
        self.points_per_cycle = points_per_cycle;
        self
    }

    /// Return a reference to the master equation.
    pub fn operator(&self) -> &M { &self.op }

    /// Give up ownership of the master equation.
    pub fn into_operator(self) -> M { self.op }

    /// Number of stepper passes needed to cover `duration`.
    pub fn num_passes(&self, duration: f64) -> usize {
        let x = self.op.sweep_frequency() * duration;
        let full = x.floor() as usize;
        if x.fract() != 0.0 { full + 1 } else { full }
    }

    /// Integrate the density matrix `rho0`, given at `gt = 0`, for `duration`.
    ///
    /// `observer` receives `(gt, rho)` for every down-sampled point and once
    /// more for the final state. Points that end a period are not sampled
    /// there because they begin the next.
    pub fn run<F>(
        &mut self,
        rho0: &nd::Array1<C64>,
        duration: f64,
        mut observer: F,
    ) -> SwapResult<CycleRun>
    where F: FnMut(f64, &nd::Array1<C64>)
    {
        self.op.state_index().check_dim(rho0)?;
        let freq = self.op.sweep_frequency();
        let passes = self.num_passes(duration);
        let mut sampler = OutputSampler::new(self.points_per_cycle, freq);
        info!(duration, passes, "begin integration");

        let mut coeffs = self.op.coefficients(0.0, rho0);
        let mut gt: f64 = 0.0;
        let mut steps: usize = 0;
        let mut samples: usize = 0;
        for c in 0..passes {
            let t0 = c as f64 / freq;
            let t_end = duration.min((c + 1) as f64 / freq) - t0;
            self.op.initialize_cycle(&mut coeffs);

            let op = &mut self.op;
            let mut traj
                = self.stepper.integrate(
                    |tau, y| op.derivative(tau, y), &coeffs, t_end)?;
            steps += traj.len() - 1;
            debug!(pass = c, t0, t_end, steps = traj.len() - 1, "sweep period");

            let last = traj.pop();
            for (tau, y) in traj.iter() {
                let gt_k = tau + t0;
                if sampler.accept(gt_k) {
                    observer(gt_k, &self.op.density_matrix(gt_k, y));
                    samples += 1;
                }
            }
            if let Some((tau, y)) = last {
                gt = tau + t0;
                coeffs = y;
            }
        }

        let rho = self.op.density_matrix(gt, &coeffs);
        observer(gt, &rho);
        samples += 1;
        info!(gt, steps, samples, "end integration");
        Ok(CycleRun { gt, coeffs, rho, passes, steps, samples })
    }
}
