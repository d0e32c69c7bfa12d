//! Fourth-order Runge-Kutta integration with adaptive step size, controlled by
//! step doubling.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::error::IntegrationError;

pub type IntegrationResult<T> = Result<T, IntegrationError>;

/// Maximum number of step size reductions attempted for a single step.
pub const MAX_RETRIES: usize = 100;

// safety numbers -- particular to rk4
const SAFE1: f64 = 0.9;
const SAFE2: f64 = 4.0;

/// A sequence of `(time, state)` pairs.
pub type Trajectory = Vec<(f64, nd::Array1<C64>)>;

/// Adaptive RK4 integrator.
///
/// Each step is taken once at full size and once as two half steps; the
/// difference, relative to the largest entry of either result, estimates the
/// local truncation error. Steps whose error exceeds `epsilon` are retried
/// with a smaller size, and accepted steps propose the size of the next.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rka {
    epsilon: f64,
    dt_init: Option<f64>,
    dt_min: f64,
}

impl Rka {
    /// Default smallest permitted step size, relative to the integration
    /// interval (or to 1 for intervals shorter than 1).
    pub const DEF_DT_MIN: f64 = 1e-12;

    /// Default initial step size as a fraction of the integration interval.
    pub const DEF_DT_INIT_FRAC: f64 = 1e-2;

    /// Create a new `Rka` with relative error bound `epsilon`.
    pub fn new(epsilon: f64) -> IntegrationResult<Self> {
        IntegrationError::check_epsilon(epsilon)?;
        Ok(Self { epsilon, dt_init: None, dt_min: Self::DEF_DT_MIN })
    }

    /// Set the size of the first attempted step.
    pub fn with_dt_init(mut self, dt: f64) -> Self {
        self.dt_init = Some(dt);
        self
    }

    /// Set the smallest step size, relative to `max(t_end, 1)`, below which
    /// integration is abandoned.
    pub fn with_dt_min(mut self, dt: f64) -> Self {
        self.dt_min = dt;
        self
    }

    /// Return the relative error bound.
    pub fn epsilon(&self) -> f64 { self.epsilon }

    /// Integrate `rhs` from 0 to `t_end`, starting from `y0`.
    ///
    /// Every accepted step is recorded; both `0` and `t_end` are guaranteed to
    /// be the first and last times of the returned trajectory.
    pub fn integrate<F>(&self, mut rhs: F, y0: &nd::Array1<C64>, t_end: f64)
        -> IntegrationResult<Trajectory>
    where F: FnMut(f64, &nd::Array1<C64>) -> nd::Array1<C64>
    {
        IntegrationError::check_end_time(t_end)?;
        let dt_min = self.dt_min * t_end.max(1.0);
        let mut t: f64 = 0.0;
        let mut y: nd::Array1<C64> = y0.clone();
        let mut dt: f64
            = self.dt_init.unwrap_or(Self::DEF_DT_INIT_FRAC * t_end);
        let mut traj: Trajectory = vec![(t, y.clone())];
        let mut taken: f64;
        while t < t_end {
            dt = dt.min(t_end - t);
            (taken, dt) = self.step(&mut rhs, &mut y, t, dt, dt_min)?;
            t = if taken >= t_end - t { t_end } else { t + taken };
            traj.push((t, y.clone()));
        }
        Ok(traj)
    }

    // take a single adaptive step *in place*, returning the size of the step
    // taken and a proposal for the next
    fn step<F>(
        &self,
        rhs: &mut F,
        y: &mut nd::Array1<C64>,
        t: f64,
        dt: f64,
        dt_min: f64,
    ) -> IntegrationResult<(f64, f64)>
    where F: FnMut(f64, &nd::Array1<C64>) -> nd::Array1<C64>
    {
        let k1 = rhs(t, y);
        let mut dt_try = dt;
        let mut dt_new: f64;
        let mut y_half: nd::Array1<C64>;
        let mut y_full: nd::Array1<C64>;
        let mut er: f64;
        for _ in 0..MAX_RETRIES {
            // two half-sized steps
            y_half = rk4_step(rhs, t, y, &k1, dt_try / 2.0);
            let k1_mid = rhs(t + dt_try / 2.0, &y_half);
            y_half = rk4_step(rhs, t + dt_try / 2.0, &y_half, &k1_mid, dt_try / 2.0);

            // one full-sized step
            y_full = rk4_step(rhs, t, y, &k1, dt_try);

            if !is_finite(&y_half) || !is_finite(&y_full) {
                return Err(IntegrationError::NonFinite(t));
            }

            er = error_ratio(&y_half, &y_full, self.epsilon);
            dt_new
                = if er == 0.0 {
                    dt_try * SAFE2
                } else {
                    (dt_try * SAFE1 * er.powf(-0.2))
                        .clamp(dt_try / SAFE2, dt_try * SAFE2)
                };

            if er < 1.0 {
                *y = y_half;
                return Ok((dt_try, dt_new));
            }
            if dt_new < dt_min {
                return Err(IntegrationError::StepFloor { t, dt: dt_new });
            }
            dt_try = dt_new;
        }
        Err(IntegrationError::ErrorBound(t))
    }
}

/// Integrate `rhs` from 0 to `t_end` with default step size settings.
///
/// See [`Rka::integrate`].
pub fn rka<F>(rhs: F, y0: &nd::Array1<C64>, t_end: f64, epsilon: f64)
    -> IntegrationResult<Trajectory>
where F: FnMut(f64, &nd::Array1<C64>) -> nd::Array1<C64>
{
    Rka::new(epsilon)?.integrate(rhs, y0, t_end)
}

fn array_step(y: &nd::Array1<C64>, dt: f64, dy: &nd::Array1<C64>)
    -> nd::Array1<C64>
{
    let mut out = y.clone();
    nd::Zip::from(&mut out).and(dy)
        .for_each(|ok, dyk| { *ok += dt * *dyk; });
    out
}

// classic RK4 step from (t, y) with the initial slope k1 already evaluated
fn rk4_step<F>(
    rhs: &mut F,
    t: f64,
    y: &nd::Array1<C64>,
    k1: &nd::Array1<C64>,
    dt: f64,
) -> nd::Array1<C64>
where F: FnMut(f64, &nd::Array1<C64>) -> nd::Array1<C64>
{
    let dth = dt / 2.0;
    let k2 = rhs(t + dth, &array_step(y, dth, k1));
    let k3 = rhs(t + dth, &array_step(y, dth, &k2));
    let k4 = rhs(t + dt, &array_step(y, dt, &k3));
    let mut out = y.clone();
    nd::Zip::from(&mut out).and(k1).and(&k2).and(&k3).and(&k4)
        .for_each(|ok, k1k, k2k, k3k, k4k| {
            *ok += dt / 6.0 * (k1k + 2.0 * (k2k + k3k) + k4k);
        });
    out
}

fn is_finite(y: &nd::Array1<C64>) -> bool {
    y.iter().all(|yk| yk.is_finite())
}

fn max_norm(y: &nd::Array1<C64>) -> f64 {
    y.iter().map(|yk| yk.norm()).fold(0.0, f64::max)
}

// largest difference relative to the largest entry and the error bound
fn error_ratio(a: &nd::Array1<C64>, b: &nd::Array1<C64>, epsilon: f64)
    -> f64
{
    let diff
        = a.iter().zip(b)
        .map(|(ak, bk)| (ak - bk).norm())
        .fold(0.0, f64::max);
    if diff == 0.0 { return 0.0; }
    diff / (epsilon * max_norm(a).max(max_norm(b)))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use super::*;

    #[test]
    fn exponential_decay() {
        let y0 = nd::array![C64::from(1.0), C64::from(2.0)];
        let traj = rka(|_, y| -y, &y0, 5.0, 1e-12).unwrap();
        let (t0, _) = traj[0];
        let (t1, y1) = traj.last().unwrap();
        assert_eq!(t0, 0.0);
        assert_eq!(*t1, 5.0);
        assert_relative_eq!(y1[0].re, (-5.0_f64).exp(), epsilon = 1e-8);
        assert_relative_eq!(y1[1].re, 2.0 * (-5.0_f64).exp(), epsilon = 1e-8);
        assert!(traj.windows(2).all(|w| w[1].0 > w[0].0));
    }

    #[test]
    fn rotation_with_explicit_time() {
        // y' = i t y  =>  y = exp(i t^2 / 2)
        let y0 = nd::array![C64::from(1.0)];
        let traj
            = rka(|t, y| y.mapv(|yk| C64::i() * t * yk), &y0, 4.0, 1e-12)
            .unwrap();
        let (t, y) = traj.last().unwrap();
        let exact = C64::cis(t * t / 2.0);
        assert_relative_eq!(y[0].re, exact.re, epsilon = 1e-7);
        assert_relative_eq!(y[0].im, exact.im, epsilon = 1e-7);
    }

    #[test]
    fn zero_interval_returns_initial_state() {
        let y0 = nd::array![C64::new(0.5, 0.5)];
        let traj = rka(|_, y| y.clone(), &y0, 0.0, 1e-6).unwrap();
        assert_eq!(traj.len(), 1);
        assert_eq!(traj[0].1, y0);
    }

    #[test]
    fn constant_state_is_accepted() {
        let y0 = nd::array![C64::from(0.0), C64::from(0.0)];
        let traj = rka(|_, y| y.mapv(|_| C64::from(0.0)), &y0, 1.0, 1e-6)
            .unwrap();
        assert_eq!(traj.last().unwrap().0, 1.0);
    }

    #[test]
    fn bad_inputs() {
        let y0 = nd::array![C64::from(1.0)];
        assert!(matches!(
            rka(|_, y| -y, &y0, 1.0, 0.0),
            Err(IntegrationError::BadEpsilon(_))
        ));
        assert!(matches!(
            rka(|_, y| -y, &y0, -1.0, 1e-6),
            Err(IntegrationError::BadEndTime(_))
        ));
    }

    #[test]
    fn non_finite_state_is_an_error() {
        let y0 = nd::array![C64::from(1.0)];
        assert!(matches!(
            rka(|_, y| y.mapv(|_| C64::from(f64::NAN)), &y0, 1.0, 1e-6),
            Err(IntegrationError::NonFinite(_))
        ));
    }

    #[test]
    fn step_floor_is_an_error() {
        let y0 = nd::array![C64::from(1.0)];
        let res
            = Rka::new(1e-12).unwrap()
            .with_dt_init(1.0)
            .with_dt_min(0.05)
            .integrate(|_, y| y.mapv(|yk| 20.0 * C64::i() * yk), &y0, 10.0);
        assert!(matches!(res, Err(IntegrationError::StepFloor { .. })));
    }
}
