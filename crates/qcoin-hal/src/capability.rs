//! Backend capability introspection.
//!
//! A [`Capabilities`] value is built once when a backend is constructed and
//! handed out by reference; validation and the CLI read it, nothing mutates it.

use serde::{Deserialize, Serialize};

use qcoin_ir::StandardGate;

/// Feature flag: conditional jumps on measured values.
pub const FEATURE_DYNAMIC_CIRCUITS: &str = "dynamic_circuits";
/// Feature flag: measurement before the end of the program.
pub const FEATURE_MID_CIRCUIT_MEASUREMENT: &str = "mid_circuit_measurement";
/// Feature flag: exact statevector simulation.
pub const FEATURE_STATEVECTOR: &str = "statevector";

/// Hardware capabilities of a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the backend.
    pub name: String,
    /// Number of qubits available.
    pub num_qubits: u32,
    /// Supported gates.
    pub gate_set: GateSet,
    /// Maximum number of shots per job.
    pub max_shots: u32,
    /// Whether this is a simulator.
    pub is_simulator: bool,
    /// Additional capability flags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Capabilities {
    /// Capabilities of a local quantum virtual machine with `num_qubits` qubits.
    pub fn qvm(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gate_set: GateSet::standard(),
            max_shots: 100_000,
            is_simulator: true,
            features: vec![
                FEATURE_STATEVECTOR.into(),
                FEATURE_DYNAMIC_CIRCUITS.into(),
                FEATURE_MID_CIRCUIT_MEASUREMENT.into(),
            ],
        }
    }

    /// Check for a capability flag.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Gates a backend can execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSet {
    /// Quil gate mnemonics.
    pub gates: Vec<String>,
}

impl GateSet {
    /// Every gate in [`StandardGate`].
    pub fn standard() -> Self {
        use StandardGate::*;
        let gates = [I, X, Y, Z, H, S, T, Cnot, Cz, Swap, Ccnot]
            .iter()
            .map(|g| g.name().to_string())
            .collect();
        Self { gates }
    }

    /// Check if a gate is supported.
    pub fn contains(&self, gate: &StandardGate) -> bool {
        self.gates.iter().any(|g| g == gate.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qvm_capabilities() {
        let caps = Capabilities::qvm("2q-qvm", 2);
        assert_eq!(caps.num_qubits, 2);
        assert!(caps.is_simulator);
        assert!(caps.has_feature(FEATURE_DYNAMIC_CIRCUITS));
        assert!(caps.has_feature(FEATURE_MID_CIRCUIT_MEASUREMENT));
        assert!(!caps.has_feature("photonic"));
    }

    #[test]
    fn test_standard_gate_set() {
        let gates = GateSet::standard();
        assert!(gates.contains(&StandardGate::H));
        assert!(gates.contains(&StandardGate::Ccnot));

        let limited = GateSet {
            gates: vec!["H".into()],
        };
        assert!(!limited.contains(&StandardGate::X));
    }
}
