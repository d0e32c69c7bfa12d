//! Sawtooth-wave adiabatic passage cooling with recoil momentum: initial
//! states, run labels, and accumulation of results for output.

use std::path::Path;
use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::info;
use swapcool::{
    write_npz,
    config::{ ConfigResult, RunParams },
    index::{ Level, StateIndex },
    init::{ self, ThermalScale },
    master::{ MasterEquation, MotionOperator },
    observe::{ self, KDist, QualityMetrics, StateInfo },
    sweep::SweepDrive,
    utils::OutputResult,
};

pub const DEF_CONFIG: &str = "config/params_swapcool.toml";
pub const DEF_OUTDIR: &str = "output/swapcool/swapmotion";

/// Significant digits of parameter values in output file names.
pub const TAG_PRECISION: usize = 3;

/// Build the initial density matrix requested by `run`.
pub fn initial_state(index: &StateIndex, run: &RunParams, scale: ThermalScale)
    -> ConfigResult<nd::Array1<C64>>
{
    match run.initial_momentum {
        Some(k) => init::single_k(index, k),
        None if run.use_antihydrogen_distr
            => init::antihydrogen_2s(index, run.initial_temperature, scale),
        None => init::thermal(index, run.initial_temperature, scale),
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Format `x` with `prec` significant digits, switching to exponential
/// notation for very large or small magnitudes and dropping trailing zeros.
pub fn fmt_sig(x: f64, prec: usize) -> String {
    if x == 0.0 || !x.is_finite() { return format!("{x}"); }
    let prec = prec.max(1);
    // the exponent is taken after rounding to `prec` digits
    let s = format!("{:.*e}", prec - 1, x);
    let (mant, e) = s.split_once('e').unwrap_or((s.as_str(), "0"));
    let exp: i32 = e.parse().unwrap_or(0);
    if exp < -4 || exp >= prec as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mant), sign, exp.abs())
    } else {
        let dec = (prec as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{:.*}", dec, x)).to_string()
    }
}

/// Label identifying the parameters of a run, used in output file names.
pub fn run_tag(op: &MotionOperator, run: &RunParams) -> String {
    let p = op.drive().params();
    let d = op.decay_params();
    let g = |x: f64| fmt_sig(x, TAG_PRECISION);
    let mut tag
        = format!(
            "A{}_f{}_Omega{}_recoil{}_{}decay_B{}",
            g(p.detun_amp),
            g(p.detun_freq),
            g(p.rabi_freq),
            g(op.recoil_freq()),
            if d.enable_decay { "" } else { "no" },
            g(d.branching_ratio),
        );
    match run.initial_momentum {
        Some(k) => { tag += &format!("_k{k}"); },
        None => { tag += &format!("_T{}", g(run.initial_temperature)); },
    }
    tag
}

/// Log the model parameters, the initial state, and the figures of merit
/// derived from it.
pub fn log_system_info(
    op: &MotionOperator,
    run: &RunParams,
    decay_rate: f64,
    rho0: &nd::Array1<C64>,
) {
    let p = op.drive().params();
    let d = op.decay_params();
    let index = op.state_index();
    info!(decay_rate, "decay rate (s^-1); other frequencies in units of it");
    info!(
        enable_decay = d.enable_decay,
        branching_ratio = d.branching_ratio,
        stationary_decay_prob = d.stationary_decay_prob,
        "decay"
    );
    info!(
        detuning_amplitude = p.detun_amp,
        sawtooth_frequency = p.detun_freq,
        rabi_frequency = p.rabi_freq,
        recoil_frequency = op.recoil_freq(),
        "sweep"
    );
    match run.initial_momentum {
        Some(k) => { info!(k, "initial momentum state"); },
        None => {
            let distr
                = if run.use_antihydrogen_distr {
                    "antihydrogen 2s axial"
                } else {
                    "thermal"
                };
            info!(temperature = run.initial_temperature, distr, "initial temperature (K)");
        },
    }
    info!(kmin = index.kmin(), kmax = index.kmax(), "momentum state range");
    info!(
        duration = run.duration,
        periods = op.sweep_frequency() * run.duration,
        tolerance = run.tolerance,
        "integration"
    );

    let k_rms = observe::k_rms(index, rho0);
    let metrics = QualityMetrics::new(p, op.recoil_freq(), k_rms);
    info!(k_rms, doppler_shift = metrics.doppler_shift, "initial state");
    for (name, value, rating) in metrics.ratings() {
        info!("[{rating}] {name}: {value}");
    }
}

/// Accumulates down-sampled states for output.
#[derive(Clone, Debug)]
pub struct Recorder {
    index: StateIndex,
    decay_rate: f64,
    gt: Vec<f64>,
    info: Vec<StateInfo>,
    kdist: Vec<KDist>,
}

impl Recorder {
    /// Create a new, empty `Recorder`.
    ///
    /// `decay_rate` converts dimensionless times to seconds.
    pub fn new(index: StateIndex, decay_rate: f64) -> Self {
        Self {
            index,
            decay_rate,
            gt: Vec::new(),
            info: Vec::new(),
            kdist: Vec::new(),
        }
    }

    /// Reduce and store a single state.
    pub fn record(&mut self, gt: f64, rho: &nd::Array1<C64>) {
        self.gt.push(gt);
        self.info.push(StateInfo::new(&self.index, rho));
        self.kdist.push(KDist::new(&self.index, rho));
    }

    /// Number of recorded states.
    pub fn len(&self) -> usize { self.gt.len() }

    pub fn is_empty(&self) -> bool { self.gt.is_empty() }

    /// Return the most recently recorded summary.
    pub fn last_info(&self) -> Option<&StateInfo> { self.info.last() }

    /// Write `rho_<tag>.npz`, `kdist_<tag>.npz`, and `kdist_final_<tag>.npz`
    /// to `outdir`.
    pub fn write(&self, outdir: &Path, tag: &str) -> OutputResult<()> {
        let n = self.len();
        let nk = self.index.nk();
        let gt: nd::Array1<f64> = self.gt.iter().copied().collect();
        let time: nd::Array1<f64> = gt.mapv(|gtk| gtk / self.decay_rate);
        let k: nd::Array1<i64> = self.index.momenta().collect();
        let populations: nd::Array2<f64>
            = nd::Array2::from_shape_fn(
                (n, Level::NUM), |(i, j)| self.info[i].populations[j]);
        let column = |f: fn(&StateInfo) -> f64| -> nd::Array1<f64> {
            self.info.iter().map(f).collect()
        };
        write_npz!(
            outdir.join(format!("rho_{tag}.npz")),
            arrays: {
                "gt" => &gt,
                "time" => &time,
                "populations" => &populations,
                "trace" => &column(|s| s.trace),
                "purity" => &column(|s| s.purity),
                "k_rms" => &column(|s| s.k_rms),
                "k_rms_unleaked" => &column(|s| s.k_rms_unleaked),
            }
        )?;

        let p_k: nd::Array2<f64>
            = nd::Array2::from_shape_fn((n, nk), |(i, j)| self.kdist[i].total[j]);
        let p_nk: nd::Array3<f64>
            = nd::Array3::from_shape_fn(
                (n, nk, Level::NUM), |(i, j, l)| self.kdist[i].by_level[[j, l]]);
        write_npz!(
            outdir.join(format!("kdist_{tag}.npz")),
            arrays: {
                "time" => &time,
                "k" => &k,
                "P_k" => &p_k,
                "P_nk" => &p_nk,
            }
        )?;

        if let (Some(t_final), Some(kd)) = (time.last(), self.kdist.last()) {
            write_npz!(
                outdir.join(format!("kdist_final_{tag}.npz")),
                arrays: {
                    "time" => &nd::array![*t_final],
                    "k" => &k,
                    "P_k" => &kd.total,
                    "P_nk" => &kd.by_level,
                }
            )?;
        }
        Ok(())
    }
}
