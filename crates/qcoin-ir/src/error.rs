//! Error types for the IR crate.

use crate::memory::MemoryType;
use crate::qubit::QubitId;
use thiserror::Error;

/// Errors that can occur while building a program.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// A memory region was declared twice with a different shape.
    #[error(
        "Memory region '{name}' already declared as {existing}[{existing_size}], cannot redeclare as {requested}[{requested_size}]"
    )]
    ConflictingDeclaration {
        /// Region name.
        name: String,
        /// Type of the existing declaration.
        existing: MemoryType,
        /// Size of the existing declaration.
        existing_size: usize,
        /// Requested type.
        requested: MemoryType,
        /// Requested size.
        requested_size: usize,
    },

    /// Memory regions must have at least one element.
    #[error("Memory region '{0}' must have a non-zero size")]
    EmptyRegion(String),

    /// Identifier is not a valid region or label name.
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
