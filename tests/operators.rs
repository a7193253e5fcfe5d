use approx::assert_abs_diff_eq;
use qip_sim::prelude::*;

fn term(s: &str) -> PauliTerm {
    s.parse().unwrap()
}

fn bell() -> SimulatorResult<Simulator<f64>> {
    let mut sim = Simulator::new();
    sim.allocate_qubit(0)?;
    sim.allocate_qubit(1)?;
    sim.apply_controlled_gate(&GateMatrix::hadamard(), &[0], &[])?;
    sim.apply_controlled_gate(&GateMatrix::x(), &[1], &[0])?;
    Ok(sim)
}

#[test]
fn test_expectation_single_qubit() -> SimulatorResult<()> {
    let mut sim = Simulator::<f64>::new();
    sim.allocate_qubit(0)?;
    sim.apply_controlled_gate(&GateMatrix::hadamard(), &[0], &[])?;

    let terms = vec![(term("X0"), 2.0), (term("Z0"), 3.0), (PauliTerm::identity(), 0.25)];
    let e = sim.get_expectation_value(&terms, &[0])?;
    assert_abs_diff_eq!(e, 2.25, epsilon = 1e-12);

    // The state is restored after every term.
    assert_abs_diff_eq!(sim.get_probability(&[true], &[0])?, 0.5, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_expectation_bell() -> SimulatorResult<()> {
    let mut sim = bell()?;
    let ids = [0, 1];
    let zz = sim.get_expectation_value(&vec![(term("Z0 Z1"), 1.0)], &ids)?;
    let xx = sim.get_expectation_value(&vec![(term("X0 X1"), 1.0)], &ids)?;
    let yy = sim.get_expectation_value(&vec![(term("Y0 Y1"), 1.0)], &ids)?;
    let z = sim.get_expectation_value(&vec![(term("Z1"), 1.0)], &ids)?;
    assert_abs_diff_eq!(zz, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(xx, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(yy, -1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(z, 0.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_expectation_positions_follow_ids() -> SimulatorResult<()> {
    let mut sim = Simulator::<f64>::new();
    sim.allocate_qubit(4)?;
    sim.allocate_qubit(9)?;
    sim.apply_controlled_gate(&GateMatrix::x(), &[9], &[])?;

    // Position 0 is qubit 9 here.
    let e = sim.get_expectation_value(&vec![(term("Z0"), 1.0)], &[9, 4])?;
    assert_abs_diff_eq!(e, -1.0, epsilon = 1e-12);
    let e = sim.get_expectation_value(&vec![(term("Z1"), 1.0)], &[9, 4])?;
    assert_abs_diff_eq!(e, 1.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_apply_qubit_operator() -> SimulatorResult<()> {
    let mut sim = Simulator::<f64>::new();
    sim.allocate_qubit(0)?;

    let terms = vec![
        (term("X0"), Complex::new(0.6, 0.0)),
        (term("Z0"), Complex::new(0.8, 0.0)),
    ];
    sim.apply_qubit_operator(&terms, &[0])?;
    let (_, amps) = sim.cheat()?;
    assert_abs_diff_eq!(amps[0].re, 0.8, epsilon = 1e-12);
    assert_abs_diff_eq!(amps[1].re, 0.6, epsilon = 1e-12);

    // i Y |0> = -|1>
    let mut sim = Simulator::<f64>::new();
    sim.allocate_qubit(0)?;
    sim.apply_qubit_operator(&vec![(term("Y0"), Complex::new(0.0, 1.0))], &[0])?;
    let amp = sim.get_amplitude(&[true], &[0])?;
    assert_abs_diff_eq!(amp.re, -1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(amp.im, 0.0, epsilon = 1e-12);
    Ok(())
}

/// `H = a X0 + b Z0 Z1 + c Y1 + d` applied to a dense vector where bit `i` is qubit `i`.
fn apply_hamiltonian(v: &[Complex<f64>], coeffs: (f64, f64, f64, f64)) -> Vec<Complex<f64>> {
    let (a, b, c, d) = coeffs;
    let i = Complex::new(0.0, 1.0);
    (0..v.len())
        .map(|idx| {
            let b0 = idx & 1;
            let b1 = (idx >> 1) & 1;
            let zz = if b0 ^ b1 == 1 { -1.0 } else { 1.0 };
            // <idx| Y1 |idx ^ 2>: Y|0> = i|1>, Y|1> = -i|0>
            let y = if b1 == 1 { i } else { -i };
            v[idx ^ 1] * a + v[idx] * (b * zz) + v[idx ^ 2] * y * c + v[idx] * d
        })
        .collect()
}

fn exact_evolution(
    v: &[Complex<f64>],
    coeffs: (f64, f64, f64, f64),
    time: f64,
) -> Vec<Complex<f64>> {
    let mut result = v.to_vec();
    let mut power = v.to_vec();
    let minus_i_t = Complex::new(0.0, -time);
    for k in 1..80 {
        power = apply_hamiltonian(&power, coeffs)
            .into_iter()
            .map(|x| x * minus_i_t / k as f64)
            .collect();
        result.iter_mut().zip(power.iter()).for_each(|(r, p)| *r += p);
    }
    result
}

#[test]
fn test_time_evolution_matches_exponential() -> SimulatorResult<()> {
    let (a, b, c, d) = (0.7, -0.4, 0.3, 0.5);
    let time = 1.3;

    let mut sim = Simulator::<f64>::new();
    sim.allocate_qubit(0)?;
    sim.allocate_qubit(1)?;
    sim.apply_controlled_gate(&GateMatrix::hadamard(), &[0], &[])?;
    sim.apply_controlled_gate(&GateMatrix::hadamard(), &[1], &[])?;
    sim.apply_controlled_gate(&GateMatrix::z(), &[1], &[0])?;
    let (_, start) = sim.cheat()?;
    let expected = exact_evolution(start, (a, b, c, d), time);

    let terms = vec![
        (term("X0"), a),
        (term("Z0 Z1"), b),
        (term("Y1"), c),
        (PauliTerm::identity(), d),
    ];
    sim.emulate_time_evolution(&terms, time, &[0, 1], &[])?;
    let (_, found) = sim.cheat()?;
    expected.iter().zip(found.iter()).for_each(|(e, f)| {
        assert_abs_diff_eq!(e.re, f.re, epsilon = 1e-9);
        assert_abs_diff_eq!(e.im, f.im, epsilon = 1e-9);
    });
    assert_abs_diff_eq!(sim.state_norm(), 1.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_time_evolution_respects_controls() -> SimulatorResult<()> {
    let terms = vec![(term("X0"), std::f64::consts::FRAC_PI_2)];

    // Control off, nothing happens.
    let mut sim = Simulator::<f64>::new();
    sim.allocate_qubit(0)?;
    sim.allocate_qubit(1)?;
    sim.emulate_time_evolution(&terms, 1.0, &[0], &[1])?;
    assert_abs_diff_eq!(sim.get_probability(&[false, false], &[0, 1])?, 1.0, epsilon = 1e-12);

    // Control on, exp(-i pi/2 X) = -i X flips qubit 0.
    sim.apply_controlled_gate(&GateMatrix::x(), &[1], &[])?;
    sim.emulate_time_evolution(&terms, 1.0, &[0], &[1])?;
    let amp = sim.get_amplitude(&[true, true], &[0, 1])?;
    assert_abs_diff_eq!(amp.re, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(amp.im, -1.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_identity_only_evolution_is_a_phase() -> SimulatorResult<()> {
    let mut sim = Simulator::<f64>::new();
    sim.allocate_qubit(0)?;
    sim.emulate_time_evolution(&vec![(PauliTerm::identity(), 2.0)], 0.25, &[0], &[])?;
    let amp = sim.get_amplitude(&[false], &[0])?;
    assert_abs_diff_eq!(amp.re, 0.5f64.cos(), epsilon = 1e-12);
    assert_abs_diff_eq!(amp.im, -(0.5f64.sin()), epsilon = 1e-12);
    Ok(())
}

fn register_value(sim: &mut Simulator<f64>, ids: &[QubitId]) -> SimulatorResult<usize> {
    ids.iter().enumerate().try_fold(0, |acc, (bit, id)| {
        Ok(acc | (usize::from(sim.get_classical_value(*id)?) << bit))
    })
}

#[test]
fn test_emulate_math_adds() -> SimulatorResult<()> {
    let mut sim = Simulator::<f64>::new();
    (0..6).try_for_each(|id| sim.allocate_qubit(id))?;
    let a = vec![0, 1, 2];
    let b = vec![3, 4, 5];
    // a = 3, b = 6
    sim.apply_controlled_gate(&GateMatrix::x(), &[0], &[])?;
    sim.apply_controlled_gate(&GateMatrix::x(), &[1], &[])?;
    sim.apply_controlled_gate(&GateMatrix::x(), &[4], &[])?;
    sim.apply_controlled_gate(&GateMatrix::x(), &[5], &[])?;

    sim.emulate_math(|regs| regs[1] = (regs[0] + regs[1]) % 8, &[a.clone(), b.clone()], &[], None)?;
    assert_eq!(register_value(&mut sim, &a)?, 3);
    assert_eq!(register_value(&mut sim, &b)?, 1);

    sim.emulate_math(|regs| regs[0] = (regs[0] + 5) % 8, &[a.clone()], &[], Some(2))?;
    assert_eq!(register_value(&mut sim, &a)?, 0);
    Ok(())
}

#[test]
fn test_emulate_math_superposition_and_controls() -> SimulatorResult<()> {
    let mut sim = Simulator::<f64>::new();
    (0..3).try_for_each(|id| sim.allocate_qubit(id))?;
    let reg = vec![0, 1];
    sim.apply_controlled_gate(&GateMatrix::hadamard(), &[0], &[])?;

    // Control qubit 2 is |0>, so nothing moves.
    sim.emulate_math(|regs| regs[0] = (regs[0] + 2) % 4, &[reg.clone()], &[2], None)?;
    assert_abs_diff_eq!(sim.get_probability(&[false], &[1])?, 1.0, epsilon = 1e-12);

    sim.apply_controlled_gate(&GateMatrix::x(), &[2], &[])?;
    sim.emulate_math(|regs| regs[0] = (regs[0] + 2) % 4, &[reg.clone()], &[2], None)?;
    // Values 0 and 1 become 2 and 3.
    assert_abs_diff_eq!(sim.get_probability(&[false, true], &[0, 1])?, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(sim.get_probability(&[true, true], &[0, 1])?, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(sim.state_norm(), 1.0, epsilon = 1e-12);
    Ok(())
}
