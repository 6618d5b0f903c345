//! Statevector engine with mid-circuit measurement.

use num_complex::Complex64;
use rand::Rng;
use std::f64::consts::PI;

use qcoin_ir::StandardGate;

/// Probabilities closer than this to 0 or 1 are treated as exact.
const PROBABILITY_EPSILON: f64 = 1e-12;

/// A pure state of `num_qubits` qubits.
///
/// Amplitude `i` belongs to the basis state whose bit `q` is the value of
/// qubit `q`.
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Return every qubit to |0⟩.
    pub fn reinitialize(&mut self) {
        self.amplitudes.fill(Complex64::new(0.0, 0.0));
        self.amplitudes[0] = Complex64::new(1.0, 0.0);
    }

    /// Apply a gate. `qubits` must match the gate's arity.
    pub fn apply_gate(&mut self, gate: StandardGate, qubits: &[usize]) {
        match gate {
            StandardGate::I => {}
            StandardGate::X => self.apply_x(qubits[0]),
            StandardGate::Y => self.apply_y(qubits[0]),
            StandardGate::Z => self.apply_phase(qubits[0], PI),
            StandardGate::H => self.apply_h(qubits[0]),
            StandardGate::S => self.apply_phase(qubits[0], PI / 2.0),
            StandardGate::T => self.apply_phase(qubits[0], PI / 4.0),
            StandardGate::Cnot => self.apply_cnot(qubits[0], qubits[1]),
            StandardGate::Cz => self.apply_cz(qubits[0], qubits[1]),
            StandardGate::Swap => self.apply_swap(qubits[0], qubits[1]),
            StandardGate::Ccnot => self.apply_ccnot(qubits[0], qubits[1], qubits[2]),
        }
    }

    /// Probability that measuring `qubit` yields 1.
    pub fn probability_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Measure `qubit`, collapsing the state onto the observed outcome.
    pub fn measure<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) -> u8 {
        let p1 = self.probability_one(qubit);
        let outcome = if p1 < PROBABILITY_EPSILON {
            0
        } else if p1 > 1.0 - PROBABILITY_EPSILON {
            1
        } else {
            u8::from(rng.gen_bool(p1))
        };
        let p = if outcome == 1 { p1 } else { 1.0 - p1 };
        self.collapse(qubit, outcome, p);
        outcome
    }

    /// Measure `qubit` and flip it back to |0⟩ if it read 1.
    pub fn reset<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) {
        if self.measure(qubit, rng) == 1 {
            self.apply_x(qubit);
        }
    }

    fn collapse(&mut self, qubit: usize, outcome: u8, probability: f64) {
        let mask = 1 << qubit;
        let keep = if outcome == 1 { mask } else { 0 };
        let scale = 1.0 / probability.max(PROBABILITY_EPSILON).sqrt();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask == keep {
                *amp *= scale;
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
    }

    // =========================================================================
    // Gate kernels
    // =========================================================================

    fn apply_x(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                self.amplitudes.swap(i, i | mask);
            }
        }
    }

    fn apply_y(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let i_unit = Complex64::new(0.0, 1.0);
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                self.amplitudes[i] = -i_unit * self.amplitudes[j];
                self.amplitudes[j] = i_unit * a;
            }
        }
    }

    fn apply_h(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let norm = std::f64::consts::FRAC_1_SQRT_2;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = norm * (a + b);
                self.amplitudes[j] = norm * (a - b);
            }
        }
    }

    fn apply_phase(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase = Complex64::from_polar(1.0, theta);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask != 0 {
                *amp *= phase;
            }
        }
    }

    fn apply_cnot(&mut self, control: usize, target: usize) {
        let c = 1 << control;
        let t = 1 << target;
        for i in 0..self.amplitudes.len() {
            if i & c != 0 && i & t == 0 {
                self.amplitudes.swap(i, i | t);
            }
        }
    }

    fn apply_cz(&mut self, control: usize, target: usize) {
        let both = (1 << control) | (1 << target);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & both == both {
                *amp = -*amp;
            }
        }
    }

    fn apply_swap(&mut self, q1: usize, q2: usize) {
        let m1 = 1 << q1;
        let m2 = 1 << q2;
        for i in 0..self.amplitudes.len() {
            // Visit each |..1..0..⟩ / |..0..1..⟩ pair once.
            if i & m1 != 0 && i & m2 == 0 {
                self.amplitudes.swap(i, (i & !m1) | m2);
            }
        }
    }

    fn apply_ccnot(&mut self, c1: usize, c2: usize, target: usize) {
        let controls = (1 << c1) | (1 << c2);
        let t = 1 << target;
        for i in 0..self.amplitudes.len() {
            if i & controls == controls && i & t == 0 {
                self.amplitudes.swap(i, i | t);
            }
        }
    }
}
