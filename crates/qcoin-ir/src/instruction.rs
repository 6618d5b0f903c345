//! Program instructions: quantum operations and classical control.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::memory::{MemoryReference, validate_identifier};
use crate::qubit::QubitId;

/// A jump target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(pub String);

impl Label {
    /// Create a label after validating its name.
    pub fn new(name: impl Into<String>) -> IrResult<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self(name))
    }

    /// The label name without the `@` prefix.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Right-hand operand of a classical instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassicalOperand {
    /// Value read from memory.
    Ref(MemoryReference),
    /// Literal value.
    Immediate(i64),
}

impl From<MemoryReference> for ClassicalOperand {
    fn from(r: MemoryReference) -> Self {
        ClassicalOperand::Ref(r)
    }
}

impl From<i64> for ClassicalOperand {
    fn from(v: i64) -> Self {
        ClassicalOperand::Immediate(v)
    }
}

impl From<i32> for ClassicalOperand {
    fn from(v: i32) -> Self {
        ClassicalOperand::Immediate(i64::from(v))
    }
}

impl fmt::Display for ClassicalOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassicalOperand::Ref(r) => write!(f, "{r}"),
            ClassicalOperand::Immediate(v) => write!(f, "{v}"),
        }
    }
}

/// A single program instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Apply a gate to the given qubits.
    Gate {
        /// The gate.
        gate: StandardGate,
        /// Operands, controls first.
        qubits: Vec<QubitId>,
    },
    /// Measure a qubit, optionally storing the outcome.
    Measure {
        /// Qubit to measure.
        qubit: QubitId,
        /// Destination, or `None` to discard the outcome.
        target: Option<MemoryReference>,
    },
    /// Reset one qubit, or every qubit when `None`.
    Reset(Option<QubitId>),
    /// Jump target marker.
    Label(Label),
    /// Unconditional jump.
    Jump(Label),
    /// Jump when the condition value is non-zero.
    JumpWhen {
        /// Target.
        label: Label,
        /// Value tested.
        condition: MemoryReference,
    },
    /// Jump when the condition value is zero.
    JumpUnless {
        /// Target.
        label: Label,
        /// Value tested.
        condition: MemoryReference,
    },
    /// `target := source`.
    Move {
        /// Destination.
        target: MemoryReference,
        /// Source value.
        source: ClassicalOperand,
    },
    /// `target := target + source`.
    Add {
        /// Destination and left operand.
        target: MemoryReference,
        /// Right operand.
        source: ClassicalOperand,
    },
    /// `target := target ^ source`.
    Xor {
        /// Destination and left operand.
        target: MemoryReference,
        /// Right operand.
        source: ClassicalOperand,
    },
    /// Logical negation of a bit (`0 → 1`, anything else `→ 0`).
    Not(MemoryReference),
    /// `target := (left == right)`.
    Eq {
        /// Destination.
        target: MemoryReference,
        /// Left operand.
        left: MemoryReference,
        /// Right operand.
        right: ClassicalOperand,
    },
    /// `target := (left < right)`.
    Lt {
        /// Destination.
        target: MemoryReference,
        /// Left operand.
        left: MemoryReference,
        /// Right operand.
        right: ClassicalOperand,
    },
    /// Stop the current shot.
    Halt,
    /// No operation.
    Nop,
}

impl Instruction {
    /// Create a gate instruction, checking arity and operand uniqueness.
    pub fn gate(
        gate: StandardGate,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<Self> {
        let qubits: Vec<_> = qubits.into_iter().collect();
        let expected = gate.num_qubits();
        if qubits.len() != expected as usize {
            return Err(IrError::QubitCountMismatch {
                gate_name: gate.name().to_string(),
                expected,
                got: qubits.len() as u32,
            });
        }
        for (i, q) in qubits.iter().enumerate() {
            if qubits[..i].contains(q) {
                return Err(IrError::DuplicateQubit {
                    qubit: *q,
                    gate_name: Some(gate.name().to_string()),
                });
            }
        }
        Ok(Instruction::Gate { gate, qubits })
    }

    /// Create a measurement into `target`.
    pub fn measure(qubit: QubitId, target: MemoryReference) -> Self {
        Instruction::Measure {
            qubit,
            target: Some(target),
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self, Instruction::Gate { .. })
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self, Instruction::Measure { .. })
    }

    /// Check if this instruction can change the program counter.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Instruction::Jump(_)
                | Instruction::JumpWhen { .. }
                | Instruction::JumpUnless { .. }
                | Instruction::Halt
        )
    }

    /// Qubits touched by this instruction.
    pub fn qubits(&self) -> Vec<QubitId> {
        match self {
            Instruction::Gate { qubits, .. } => qubits.clone(),
            Instruction::Measure { qubit, .. } | Instruction::Reset(Some(qubit)) => vec![*qubit],
            _ => vec![],
        }
    }

    /// Memory references read or written by this instruction.
    pub fn memory_references(&self) -> Vec<&MemoryReference> {
        fn operand(op: &ClassicalOperand) -> Option<&MemoryReference> {
            match op {
                ClassicalOperand::Ref(r) => Some(r),
                ClassicalOperand::Immediate(_) => None,
            }
        }

        match self {
            Instruction::Measure {
                target: Some(target),
                ..
            } => vec![target],
            Instruction::JumpWhen { condition, .. } | Instruction::JumpUnless { condition, .. } => {
                vec![condition]
            }
            Instruction::Move { target, source }
            | Instruction::Add { target, source }
            | Instruction::Xor { target, source } => {
                std::iter::once(target).chain(operand(source)).collect()
            }
            Instruction::Not(target) => vec![target],
            Instruction::Eq {
                target,
                left,
                right,
            }
            | Instruction::Lt {
                target,
                left,
                right,
            } => [target, left].into_iter().chain(operand(right)).collect(),
            _ => vec![],
        }
    }

    /// Label referenced as a jump target, if any.
    pub fn jump_target(&self) -> Option<&Label> {
        match self {
            Instruction::Jump(label)
            | Instruction::JumpWhen { label, .. }
            | Instruction::JumpUnless { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Quil mnemonic of the instruction.
    pub fn name(&self) -> &str {
        match self {
            Instruction::Gate { gate, .. } => gate.name(),
            Instruction::Measure { .. } => "MEASURE",
            Instruction::Reset(_) => "RESET",
            Instruction::Label(_) => "LABEL",
            Instruction::Jump(_) => "JUMP",
            Instruction::JumpWhen { .. } => "JUMP-WHEN",
            Instruction::JumpUnless { .. } => "JUMP-UNLESS",
            Instruction::Move { .. } => "MOVE",
            Instruction::Add { .. } => "ADD",
            Instruction::Xor { .. } => "XOR",
            Instruction::Not(_) => "NOT",
            Instruction::Eq { .. } => "EQ",
            Instruction::Lt { .. } => "LT",
            Instruction::Halt => "HALT",
            Instruction::Nop => "NOP",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            Instruction::Gate { qubits, .. } => {
                write!(f, "{name}")?;
                for q in qubits {
                    write!(f, " {q}")?;
                }
                Ok(())
            }
            Instruction::Measure { qubit, target } => match target {
                Some(target) => write!(f, "{name} {qubit} {target}"),
                None => write!(f, "{name} {qubit}"),
            },
            Instruction::Reset(Some(qubit)) => write!(f, "{name} {qubit}"),
            Instruction::Reset(None) | Instruction::Halt | Instruction::Nop => f.write_str(name),
            Instruction::Label(label) | Instruction::Jump(label) => write!(f, "{name} {label}"),
            Instruction::JumpWhen { label, condition }
            | Instruction::JumpUnless { label, condition } => {
                write!(f, "{name} {label} {condition}")
            }
            Instruction::Move { target, source }
            | Instruction::Add { target, source }
            | Instruction::Xor { target, source } => write!(f, "{name} {target} {source}"),
            Instruction::Not(target) => write!(f, "{name} {target}"),
            Instruction::Eq {
                target,
                left,
                right,
            }
            | Instruction::Lt {
                target,
                left,
                right,
            } => write!(f, "{name} {target} {left} {right}"),
        }
    }
}
