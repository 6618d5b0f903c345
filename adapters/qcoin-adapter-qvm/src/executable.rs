//! Compilation of a [`Program`] into a flat, label-resolved executable.

use rustc_hash::FxHashMap;

use qcoin_hal::{HalError, HalResult};
use qcoin_ir::{
    ClassicalOperand, Instruction, MemoryReference, MemoryRegion, MemoryType, Program,
    StandardGate,
};

use crate::qvm::MAX_SIMULATED_QUBITS;

/// Location of one memory element: region index and offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub region: usize,
    pub index: usize,
}

/// Operand of a classical instruction after name resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operand {
    Slot(Slot),
    Immediate(i64),
}

/// Binary classical operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Move,
    Add,
    Xor,
}

/// Comparison operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Lt,
}

/// A resolved instruction. Jump targets are program counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Gate {
        gate: StandardGate,
        qubits: Vec<usize>,
    },
    Measure {
        qubit: usize,
        target: Option<Slot>,
    },
    Reset(Option<usize>),
    Jump(usize),
    JumpWhen {
        pc: usize,
        condition: Slot,
    },
    JumpUnless {
        pc: usize,
        condition: Slot,
    },
    Binary {
        op: BinaryOp,
        target: Slot,
        source: Operand,
    },
    Not(Slot),
    Compare {
        op: CompareOp,
        target: Slot,
        left: Slot,
        right: Operand,
    },
    Halt,
    Nop,
}

/// A program ready to run on the QVM.
#[derive(Debug, Clone)]
pub struct Executable {
    pub(crate) ops: Vec<Op>,
    pub(crate) regions: Vec<MemoryRegion>,
    num_qubits: usize,
    num_shots: u32,
}

impl Executable {
    /// Resolve labels and memory references of `program` for a machine with
    /// `max_qubits` qubits.
    pub fn compile(program: &Program, max_qubits: usize) -> HalResult<Self> {
        let num_qubits = program.num_qubits();
        if num_qubits > MAX_SIMULATED_QUBITS as usize {
            return Err(HalError::ProgramTooLarge(format!(
                "program uses {num_qubits} qubits, the simulator supports at most {MAX_SIMULATED_QUBITS}"
            )));
        }
        if num_qubits > max_qubits {
            return Err(HalError::ProgramTooLarge(format!(
                "program uses {num_qubits} qubits, machine has {max_qubits}"
            )));
        }

        let regions = program.declarations().to_vec();
        let layout: FxHashMap<&str, usize> = regions
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.as_str(), i))
            .collect();

        let mut labels: FxHashMap<&str, usize> = FxHashMap::default();
        for (pc, inst) in program.instructions().iter().enumerate() {
            if let Instruction::Label(label) = inst {
                if labels.insert(label.name(), pc).is_some() {
                    return Err(HalError::Compilation(format!("duplicate label {label}")));
                }
            }
        }

        let resolver = Resolver {
            regions: &regions,
            layout: &layout,
            labels: &labels,
        };
        let ops = program
            .instructions()
            .iter()
            .map(|inst| resolver.resolve(inst))
            .collect::<HalResult<Vec<_>>>()?;

        Ok(Self {
            ops,
            regions,
            num_qubits,
            num_shots: program.num_shots(),
        })
    }

    /// Number of qubits the program touches.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Shots requested by the source program.
    pub fn num_shots(&self) -> u32 {
        self.num_shots
    }

    /// Declared memory regions, in declaration order.
    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    /// Number of resolved instructions.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Copy with a different shot count.
    #[must_use]
    pub fn with_shots(mut self, shots: u32) -> Self {
        self.num_shots = shots;
        self
    }
}

struct Resolver<'a> {
    regions: &'a [MemoryRegion],
    layout: &'a FxHashMap<&'a str, usize>,
    labels: &'a FxHashMap<&'a str, usize>,
}

impl Resolver<'_> {
    fn resolve(&self, inst: &Instruction) -> HalResult<Op> {
        let op = match inst {
            Instruction::Gate { gate, qubits } => Op::Gate {
                gate: *gate,
                qubits: qubits.iter().map(|q| q.index()).collect(),
            },
            Instruction::Measure { qubit, target } => Op::Measure {
                qubit: qubit.index(),
                target: target.as_ref().map(|r| self.slot(r)).transpose()?,
            },
            Instruction::Reset(qubit) => Op::Reset(qubit.map(|q| q.index())),
            Instruction::Label(_) | Instruction::Nop => Op::Nop,
            Instruction::Jump(label) => Op::Jump(self.target(label.name())?),
            Instruction::JumpWhen { label, condition } => Op::JumpWhen {
                pc: self.target(label.name())?,
                condition: self.slot(condition)?,
            },
            Instruction::JumpUnless { label, condition } => Op::JumpUnless {
                pc: self.target(label.name())?,
                condition: self.slot(condition)?,
            },
            Instruction::Move { target, source } => self.binary(BinaryOp::Move, target, source)?,
            Instruction::Add { target, source } => self.binary(BinaryOp::Add, target, source)?,
            Instruction::Xor { target, source } => self.binary(BinaryOp::Xor, target, source)?,
            Instruction::Not(target) => Op::Not(self.slot(target)?),
            Instruction::Eq {
                target,
                left,
                right,
            } => self.compare(CompareOp::Eq, target, left, right)?,
            Instruction::Lt {
                target,
                left,
                right,
            } => self.compare(CompareOp::Lt, target, left, right)?,
            Instruction::Halt => Op::Halt,
        };
        Ok(op)
    }

    fn target(&self, label: &str) -> HalResult<usize> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| HalError::Compilation(format!("undefined label @{label}")))
    }

    fn slot(&self, reference: &MemoryReference) -> HalResult<Slot> {
        let region = *self.layout.get(reference.name.as_str()).ok_or_else(|| {
            HalError::Compilation(format!("undeclared memory region {}", reference.name))
        })?;
        let size = self.regions[region].size;
        if reference.index >= size {
            return Err(HalError::Compilation(format!(
                "{reference} is out of range for {}[{size}]",
                reference.name
            )));
        }
        Ok(Slot {
            region,
            index: reference.index,
        })
    }

    fn operand(&self, operand: &ClassicalOperand) -> HalResult<Operand> {
        Ok(match operand {
            ClassicalOperand::Ref(r) => Operand::Slot(self.slot(r)?),
            ClassicalOperand::Immediate(v) => Operand::Immediate(*v),
        })
    }

    fn binary(
        &self,
        op: BinaryOp,
        target: &MemoryReference,
        source: &ClassicalOperand,
    ) -> HalResult<Op> {
        Ok(Op::Binary {
            op,
            target: self.slot(target)?,
            source: self.operand(source)?,
        })
    }

    fn compare(
        &self,
        op: CompareOp,
        target: &MemoryReference,
        left: &MemoryReference,
        right: &ClassicalOperand,
    ) -> HalResult<Op> {
        Ok(Op::Compare {
            op,
            target: self.slot(target)?,
            left: self.slot(left)?,
            right: self.operand(right)?,
        })
    }
}

/// Values a region of type `ty` can hold after a write of `value`.
pub(crate) fn coerce(ty: MemoryType, value: i64) -> i64 {
    match ty {
        MemoryType::Bit => i64::from(value != 0),
        MemoryType::Integer => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcoin_ir::Label;

    fn ro_program() -> Program {
        let mut program = Program::new();
        let ro = program.declare("ro", MemoryType::Bit, 2).unwrap();
        program.h(0).unwrap();
        program.measure_all(&ro);
        program
    }

    #[test]
    fn test_compile_simple() {
        let exe = Executable::compile(&ro_program(), 2).unwrap();
        assert_eq!(exe.num_qubits(), 2);
        assert_eq!(exe.len(), 3);
        assert_eq!(exe.regions().len(), 1);
        assert_eq!(
            exe.ops[1],
            Op::Measure {
                qubit: 0,
                target: Some(Slot {
                    region: 0,
                    index: 0
                })
            }
        );
    }

    #[test]
    fn test_compile_resolves_labels() {
        let mut program = Program::new();
        let c = program.declare("c", MemoryType::Bit, 1).unwrap();
        let mut then_branch = Program::new();
        then_branch.x(0).unwrap();
        program.if_then(c.at(0), then_branch, Program::new()).unwrap();

        let exe = Executable::compile(&program, 1).unwrap();
        let Op::JumpWhen { pc, .. } = exe.ops[0] else {
            panic!("expected JUMP-WHEN first");
        };
        assert_eq!(exe.ops[pc], Op::Nop);
    }

    #[test]
    fn test_too_many_qubits() {
        let mut program = Program::new();
        program.x(3).unwrap();
        let err = Executable::compile(&program, 2).unwrap_err();
        assert!(matches!(err, HalError::ProgramTooLarge(_)));
    }

    #[test]
    fn test_simulator_ceiling_applies_to_any_machine() {
        let mut program = Program::new();
        program.x(MAX_SIMULATED_QUBITS).unwrap();
        let err = Executable::compile(&program, 100).unwrap_err();
        assert!(matches!(err, HalError::ProgramTooLarge(msg) if msg.contains("at most")));

        let mut program = Program::new();
        program.x(70).unwrap();
        assert!(Executable::compile(&program, 100).is_err());
    }

    #[test]
    fn test_undefined_label() {
        let mut program = Program::new();
        program.jump(Label::new("NOWHERE").unwrap());
        let err = Executable::compile(&program, 1).unwrap_err();
        assert!(matches!(err, HalError::Compilation(msg) if msg.contains("NOWHERE")));
    }

    #[test]
    fn test_duplicate_label() {
        let mut program = Program::new();
        let label = Label::new("L").unwrap();
        program.label(label.clone()).label(label);
        let err = Executable::compile(&program, 1).unwrap_err();
        assert!(matches!(err, HalError::Compilation(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_undeclared_memory() {
        let mut program = Program::new();
        program.measure(0, MemoryReference::new("ro", 0));
        let err = Executable::compile(&program, 1).unwrap_err();
        assert!(matches!(err, HalError::Compilation(msg) if msg.contains("undeclared")));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut program = Program::new();
        program.declare("ro", MemoryType::Bit, 1).unwrap();
        program.measure(0, MemoryReference::new("ro", 1));
        let err = Executable::compile(&program, 1).unwrap_err();
        assert!(matches!(err, HalError::Compilation(msg) if msg.contains("out of range")));
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(MemoryType::Bit, 5), 1);
        assert_eq!(coerce(MemoryType::Bit, 0), 0);
        assert_eq!(coerce(MemoryType::Integer, -3), -3);
    }
}
