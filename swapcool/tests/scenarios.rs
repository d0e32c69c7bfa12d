use approx::assert_relative_eq;
use ndarray as nd;
use num_complex::Complex64 as C64;
use swapcool::{
    cycle::CycleIntegrator,
    index::{ Level, StateIndex },
    init,
    master::{ DecayParams, MasterEquation, MotionOperator },
    observe::StateInfo,
    sweep::SweepParams,
};

fn sweep(rabi_freq: f64) -> SweepParams {
    SweepParams {
        rabi_freq,
        rabi_switch_coeff: 2.0,
        rabi_switch_power: 4.0,
        detun_amp: 10.0,
        detun_freq: 0.1,
        transition_freq: 2.5e7,
    }
}

fn decay(enable_decay: bool, stationary_decay_prob: f64) -> DecayParams {
    DecayParams { branching_ratio: 0.7, enable_decay, stationary_decay_prob }
}

fn integrator(
    sweep: SweepParams,
    decay: DecayParams,
    kmin: i64,
    kmax: i64,
) -> CycleIntegrator<MotionOperator>
{
    let index = StateIndex::new(Some(kmin), kmax).unwrap();
    let op = MotionOperator::new(sweep, decay, index, 0.05).unwrap();
    CycleIntegrator::new(op, 1e-9).unwrap()
        .with_points_per_cycle(20.0)
}

// run and collect (gt, rho) at every sample
fn samples(
    integ: &mut CycleIntegrator<MotionOperator>,
    rho0: &nd::Array1<C64>,
    duration: f64,
) -> Vec<(f64, nd::Array1<C64>)>
{
    let mut out: Vec<(f64, nd::Array1<C64>)> = Vec::new();
    integ.run(rho0, duration, |gt, rho| { out.push((gt, rho.clone())); })
        .unwrap();
    out
}

#[test]
fn excited_decay_without_coupling() {
    let mut integ = integrator(sweep(0.0), decay(true, 0.6), 0, 0);
    let index = *integ.operator().state_index();
    let mut rho0 = index.zeros();
    *index.at_mut(&mut rho0, Level::Excited, 0, Level::Excited, 0)
        = C64::from(1.0);

    // without coupling only the populations move
    let mut op = MotionOperator::new(sweep(0.0), decay(true, 0.6), index, 0.05)
        .unwrap();
    for &gt in [0.0, 2.5, 7.3].iter() {
        let drho = op.derivative(gt, &rho0);
        for (idx, d) in drho.iter().enumerate() {
            let (l, r) = index.entry_of(idx).unwrap();
            if l != r { assert_eq!(*d, C64::from(0.0)); }
        }
        let rate = |n: Level| index.at(&drho, n, 0, n, 0).re;
        assert_relative_eq!(rate(Level::Excited), -1.0, epsilon = 1e-14);
        assert_relative_eq!(rate(Level::Ground), 0.3, epsilon = 1e-14);
        assert_relative_eq!(rate(Level::Low), 0.7 * 0.6, epsilon = 1e-14);
    }

    let out = samples(&mut integ, &rho0, 15.0);
    assert!(out.len() > 20);
    for (gt, rho) in out.iter() {
        let info = StateInfo::new(&index, rho);
        let [g, l, e] = info.populations;
        let decayed = 1.0 - (-gt).exp();
        assert_relative_eq!(e, (-gt).exp(), epsilon = 1e-7);
        assert_relative_eq!(g, 0.3 * decayed, epsilon = 1e-7);
        // recoil into the (absent) neighbouring momenta is lost
        assert_relative_eq!(l, 0.7 * 0.6 * decayed, epsilon = 1e-7);
    }
    assert_eq!(out.last().unwrap().0, 15.0);
}

#[test]
fn single_momentum_window_freezes_populations() {
    let mut integ = integrator(sweep(1.5), decay(false, 0.6), 0, 0);
    let index = *integ.operator().state_index();
    let rho0 = init::single_k(&index, 0).unwrap();
    let out = samples(&mut integ, &rho0, 25.0);
    for (_, rho) in out.iter() {
        let info = StateInfo::new(&index, rho);
        assert_relative_eq!(info.populations[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(info.populations[2], 0.0, epsilon = 1e-12);
    }
}

#[test]
fn trace_conserved_without_decay() {
    let mut integ = integrator(sweep(1.0), decay(false, 0.6), -6, 6);
    let index = *integ.operator().state_index();
    let rho0 = init::single_k(&index, 0).unwrap();
    let out = samples(&mut integ, &rho0, 15.0);
    let mut excited_max: f64 = 0.0;
    for (_, rho) in out.iter() {
        let info = StateInfo::new(&index, rho);
        assert_relative_eq!(info.trace, 1.0, epsilon = 1e-10);
        assert!(index.hermitian_defect(rho) < 1e-10);
        excited_max = excited_max.max(info.populations[2]);
    }
    // the sweep passes through resonance during the first period
    assert!(excited_max > 0.1);
}

#[test]
fn trace_never_increases() {
    let mut integ = integrator(sweep(1.0), decay(true, 0.6), -1, 1);
    let index = *integ.operator().state_index();
    let rho0 = init::single_k(&index, 1).unwrap();
    let out = samples(&mut integ, &rho0, 30.0);
    let traces: Vec<f64>
        = out.iter()
        .map(|(_, rho)| index.total_trace(rho).re)
        .collect();
    assert!(traces.windows(2).all(|w| w[1] <= w[0] + 1e-9));
    // population has leaked out of the window
    assert!(*traces.last().unwrap() < 1.0 - 1e-6);
    for (_, rho) in out.iter() {
        assert!(index.hermitian_defect(rho) < 1e-10);
    }
}

#[test]
fn trace_conserved_with_momentum_preserving_decay() {
    let mut integ = integrator(sweep(1.0), decay(true, 1.0), -2, 2);
    let index = *integ.operator().state_index();
    let rho0 = init::single_k(&index, 0).unwrap();
    let out = samples(&mut integ, &rho0, 20.0);
    for (_, rho) in out.iter() {
        assert_relative_eq!(index.total_trace(rho).re, 1.0, epsilon = 1e-9);
    }
}

#[test]
fn final_state_matches_summary() {
    let mut integ = integrator(sweep(1.0), decay(true, 0.6), -3, 3);
    let index = *integ.operator().state_index();
    let rho0 = init::single_k(&index, 0).unwrap();
    let mut last: Option<(f64, nd::Array1<C64>)> = None;
    let run
        = integ.run(&rho0, 12.5, |gt, rho| { last = Some((gt, rho.clone())); })
        .unwrap();
    let (gt, rho) = last.unwrap();
    assert_eq!(run.passes, 2);
    assert_eq!(gt, run.gt);
    assert_eq!(rho, run.rho);
    let back = integ.operator().coefficients(run.gt, &run.rho);
    for (a, b) in back.iter().zip(run.coeffs.iter()) {
        assert!((a - b).norm() < 1e-12);
    }
}
