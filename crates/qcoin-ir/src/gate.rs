//! Quantum gate types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard gates with known semantics.
///
/// The set is the fixed-gate subset of the Quil standard gate library; it
/// covers everything the coin games need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// T gate (fourth root of Z).
    T,
    /// Controlled-X gate.
    Cnot,
    /// Controlled-Z gate.
    Cz,
    /// SWAP gate.
    Swap,
    /// Toffoli gate.
    Ccnot,
}

impl StandardGate {
    /// Quil mnemonic of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "I",
            StandardGate::X => "X",
            StandardGate::Y => "Y",
            StandardGate::Z => "Z",
            StandardGate::H => "H",
            StandardGate::S => "S",
            StandardGate::T => "T",
            StandardGate::Cnot => "CNOT",
            StandardGate::Cz => "CZ",
            StandardGate::Swap => "SWAP",
            StandardGate::Ccnot => "CCNOT",
        }
    }

    /// Number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::S
            | StandardGate::T => 1,

            StandardGate::Cnot | StandardGate::Cz | StandardGate::Swap => 2,

            StandardGate::Ccnot => 3,
        }
    }

    /// Look a gate up by mnemonic, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let gate = match name.to_ascii_uppercase().as_str() {
            "I" | "ID" => StandardGate::I,
            "X" => StandardGate::X,
            "Y" => StandardGate::Y,
            "Z" => StandardGate::Z,
            "H" => StandardGate::H,
            "S" => StandardGate::S,
            "T" => StandardGate::T,
            "CNOT" | "CX" => StandardGate::Cnot,
            "CZ" => StandardGate::Cz,
            "SWAP" => StandardGate::Swap,
            "CCNOT" | "CCX" => StandardGate::Ccnot,
            _ => return None,
        };
        Some(gate)
    }
}

impl fmt::Display for StandardGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::Cnot.num_qubits(), 2);
        assert_eq!(StandardGate::Ccnot.num_qubits(), 3);
        assert_eq!(StandardGate::Cnot.name(), "CNOT");
    }

    #[test]
    fn test_gate_from_name() {
        assert_eq!(StandardGate::from_name("h"), Some(StandardGate::H));
        assert_eq!(StandardGate::from_name("cx"), Some(StandardGate::Cnot));
        assert_eq!(StandardGate::from_name("RX"), None);
    }
}
