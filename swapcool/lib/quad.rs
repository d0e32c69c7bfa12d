//! Numerical quadrature for smooth one-dimensional integrands.

pub(crate) const DEF_ROMBERG_NMAX: usize = 24;
pub(crate) const DEF_ROMBERG_EPSILON: f64 = 1e-9;

/// Integrate `integrand` from 0 to `t` by Romberg extrapolation of the
/// trapezoidal rule.
///
/// Each refinement halves the step size and evaluates the integrand only at
/// the new midpoints. Refinement stops once successive diagonal extrapolants
/// differ by less than `epsilon` (default 1e-9), or after `n_max` halvings
/// (default 24), in which case `None` is returned.
pub fn romberg<F>(
    integrand: F,
    t: f64,
    n_max: Option<usize>,
    epsilon: Option<f64>,
) -> Option<f64>
where F: Fn(f64) -> f64
{
    let n_max = n_max.unwrap_or(DEF_ROMBERG_NMAX);
    let epsilon = epsilon.unwrap_or(DEF_ROMBERG_EPSILON);
    let mut prev: Vec<f64> = vec![t / 2.0 * (integrand(0.0) + integrand(t))];
    let mut cur: Vec<f64>;
    let mut h: f64 = t;
    let mut four_m: f64;
    let mut midpoints: f64;
    for n in 1..=n_max {
        h /= 2.0;
        midpoints
            = (0..1_usize << (n - 1))
            .map(|j| integrand((2 * j + 1) as f64 * h))
            .sum();
        cur = Vec::with_capacity(n + 1);
        cur.push(prev[0] / 2.0 + h * midpoints);
        for m in 1..=n {
            four_m = 4.0_f64.powi(m as i32);
            cur.push((four_m * cur[m - 1] - prev[m - 1]) / (four_m - 1.0));
        }
        if (cur[n] - prev[n - 1]).abs() < epsilon {
            return Some(cur[n]);
        }
        prev = cur;
    }
    None
}
