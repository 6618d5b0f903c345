//! High-level program builder API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::instruction::{ClassicalOperand, Instruction, Label};
use crate::memory::{MemoryReference, MemoryRegion, MemoryType};
use crate::qubit::QubitId;

/// Source of unique suffixes for generated labels.
///
/// Process-wide so that branches built as separate programs and spliced
/// together later never reuse a label.
static LABEL_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// A quantum program with classical memory and control flow.
///
/// Instructions are kept in program order; execution is sequential with
/// explicit jumps, so there is no gate-level DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Declared memory regions, in declaration order.
    declarations: Vec<MemoryRegion>,
    /// Instructions in program order.
    instructions: Vec<Instruction>,
    /// Number of shots the program should be executed for.
    num_shots: u32,
}

impl Program {
    /// Create a new empty program that runs for one shot.
    pub fn new() -> Self {
        Self {
            declarations: vec![],
            instructions: vec![],
            num_shots: 1,
        }
    }

    /// Create a program from a list of instructions.
    pub fn from_instructions(instructions: impl IntoIterator<Item = Instruction>) -> Self {
        let mut program = Self::new();
        program.instructions.extend(instructions);
        program
    }

    /// Generate a label that is unique for the lifetime of the process.
    pub fn fresh_label(prefix: &str) -> Label {
        let n = LABEL_COUNTER.fetch_add(1, Ordering::Relaxed);
        Label(format!("{prefix}_{n}"))
    }

    // =========================================================================
    // Memory
    // =========================================================================

    /// Declare a classical memory region.
    ///
    /// Declaring the same name again with the same type and size returns the
    /// existing region; a different shape is an error.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        ty: MemoryType,
        size: usize,
    ) -> IrResult<MemoryRegion> {
        let region = MemoryRegion::new(name, ty, size)?;
        merge_region(&mut self.declarations, region)
    }

    /// Declarations of `self` merged with those of `others`, leaving `self`
    /// untouched when any of them conflict.
    fn merged_declarations(&self, others: &[&Program]) -> IrResult<Vec<MemoryRegion>> {
        let mut merged = self.declarations.clone();
        for other in others {
            for region in &other.declarations {
                merge_region(&mut merged, region.clone())?;
            }
        }
        Ok(merged)
    }

    /// Look up a declared region by name.
    pub fn declaration(&self, name: &str) -> Option<&MemoryRegion> {
        self.declarations.iter().find(|r| r.name == name)
    }

    // =========================================================================
    // Quantum operations
    // =========================================================================

    /// Append an instruction.
    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    /// Apply a gate.
    pub fn gate(
        &mut self,
        gate: StandardGate,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        let inst = Instruction::gate(gate, qubits)?;
        Ok(self.push(inst))
    }

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: impl Into<QubitId>) -> IrResult<&mut Self> {
        self.gate(StandardGate::H, [qubit.into()])
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: impl Into<QubitId>) -> IrResult<&mut Self> {
        self.gate(StandardGate::X, [qubit.into()])
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: impl Into<QubitId>) -> IrResult<&mut Self> {
        self.gate(StandardGate::Y, [qubit.into()])
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: impl Into<QubitId>) -> IrResult<&mut Self> {
        self.gate(StandardGate::Z, [qubit.into()])
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: impl Into<QubitId>) -> IrResult<&mut Self> {
        self.gate(StandardGate::S, [qubit.into()])
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: impl Into<QubitId>) -> IrResult<&mut Self> {
        self.gate(StandardGate::T, [qubit.into()])
    }

    /// Apply CNOT gate.
    pub fn cnot(
        &mut self,
        control: impl Into<QubitId>,
        target: impl Into<QubitId>,
    ) -> IrResult<&mut Self> {
        self.gate(StandardGate::Cnot, [control.into(), target.into()])
    }

    /// Apply CZ gate.
    pub fn cz(
        &mut self,
        control: impl Into<QubitId>,
        target: impl Into<QubitId>,
    ) -> IrResult<&mut Self> {
        self.gate(StandardGate::Cz, [control.into(), target.into()])
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: impl Into<QubitId>, q2: impl Into<QubitId>) -> IrResult<&mut Self> {
        self.gate(StandardGate::Swap, [q1.into(), q2.into()])
    }

    /// Apply Toffoli gate.
    pub fn ccnot(
        &mut self,
        c1: impl Into<QubitId>,
        c2: impl Into<QubitId>,
        target: impl Into<QubitId>,
    ) -> IrResult<&mut Self> {
        self.gate(StandardGate::Ccnot, [c1.into(), c2.into(), target.into()])
    }

    /// Measure a qubit into a memory element.
    pub fn measure(&mut self, qubit: impl Into<QubitId>, target: MemoryReference) -> &mut Self {
        self.push(Instruction::measure(qubit.into(), target))
    }

    /// Measure a qubit and discard the outcome.
    pub fn measure_discard(&mut self, qubit: impl Into<QubitId>) -> &mut Self {
        self.push(Instruction::Measure {
            qubit: qubit.into(),
            target: None,
        })
    }

    /// Measure qubit `i` into `region[i]` for every element of `region`.
    pub fn measure_all(&mut self, region: &MemoryRegion) -> &mut Self {
        for (i, target) in region.references().enumerate() {
            self.measure(QubitId(i as u32), target);
        }
        self
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: impl Into<QubitId>) -> &mut Self {
        self.push(Instruction::Reset(Some(qubit.into())))
    }

    /// Reset every qubit to |0⟩.
    pub fn reset_all(&mut self) -> &mut Self {
        self.push(Instruction::Reset(None))
    }

    // =========================================================================
    // Classical operations
    // =========================================================================

    /// `MOVE target source`.
    pub fn mov(
        &mut self,
        target: MemoryReference,
        source: impl Into<ClassicalOperand>,
    ) -> &mut Self {
        self.push(Instruction::Move {
            target,
            source: source.into(),
        })
    }

    /// `ADD target source`.
    pub fn add(
        &mut self,
        target: MemoryReference,
        source: impl Into<ClassicalOperand>,
    ) -> &mut Self {
        self.push(Instruction::Add {
            target,
            source: source.into(),
        })
    }

    /// `XOR target source`.
    pub fn xor(
        &mut self,
        target: MemoryReference,
        source: impl Into<ClassicalOperand>,
    ) -> &mut Self {
        self.push(Instruction::Xor {
            target,
            source: source.into(),
        })
    }

    /// `NOT target`.
    pub fn not(&mut self, target: MemoryReference) -> &mut Self {
        self.push(Instruction::Not(target))
    }

    /// `EQ target left right`.
    pub fn equal(
        &mut self,
        target: MemoryReference,
        left: MemoryReference,
        right: impl Into<ClassicalOperand>,
    ) -> &mut Self {
        self.push(Instruction::Eq {
            target,
            left,
            right: right.into(),
        })
    }

    /// `LT target left right`.
    pub fn less_than(
        &mut self,
        target: MemoryReference,
        left: MemoryReference,
        right: impl Into<ClassicalOperand>,
    ) -> &mut Self {
        self.push(Instruction::Lt {
            target,
            left,
            right: right.into(),
        })
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    /// Place a label.
    pub fn label(&mut self, label: Label) -> &mut Self {
        self.push(Instruction::Label(label))
    }

    /// Unconditional jump.
    pub fn jump(&mut self, label: Label) -> &mut Self {
        self.push(Instruction::Jump(label))
    }

    /// Jump when `condition` is non-zero.
    pub fn jump_when(&mut self, label: Label, condition: MemoryReference) -> &mut Self {
        self.push(Instruction::JumpWhen { label, condition })
    }

    /// Jump when `condition` is zero.
    pub fn jump_unless(&mut self, label: Label, condition: MemoryReference) -> &mut Self {
        self.push(Instruction::JumpUnless { label, condition })
    }

    /// Stop the current shot.
    pub fn halt(&mut self) -> &mut Self {
        self.push(Instruction::Halt)
    }

    /// Branch on a classical value.
    ///
    /// Runs `then_branch` when `condition` is non-zero and `else_branch`
    /// otherwise. Emits:
    ///
    /// ```text
    /// JUMP-WHEN @THEN_n condition
    /// <else_branch>
    /// JUMP @END_n
    /// LABEL @THEN_n
    /// <then_branch>
    /// LABEL @END_n
    /// ```
    pub fn if_then(
        &mut self,
        condition: MemoryReference,
        then_branch: Program,
        else_branch: Program,
    ) -> IrResult<&mut Self> {
        self.declarations = self.merged_declarations(&[&else_branch, &then_branch])?;

        let then_label = Self::fresh_label("THEN");
        let end_label = Self::fresh_label("END");

        self.jump_when(then_label.clone(), condition);
        self.instructions.extend(else_branch.instructions);
        self.jump(end_label.clone());
        self.label(then_label);
        self.instructions.extend(then_branch.instructions);
        self.label(end_label);
        Ok(self)
    }

    /// Loop `body` while `condition` is non-zero.
    ///
    /// The condition is tested before every iteration, so the body must
    /// update it. Emits:
    ///
    /// ```text
    /// LABEL @WHILE_n
    /// JUMP-UNLESS @DONE_n condition
    /// <body>
    /// JUMP @WHILE_n
    /// LABEL @DONE_n
    /// ```
    pub fn while_do(&mut self, condition: MemoryReference, body: Program) -> IrResult<&mut Self> {
        self.declarations = self.merged_declarations(&[&body])?;

        let start = Self::fresh_label("WHILE");
        let done = Self::fresh_label("DONE");

        self.label(start.clone());
        self.jump_unless(done.clone(), condition);
        self.instructions.extend(body.instructions);
        self.jump(start);
        self.label(done);
        Ok(self)
    }

    /// Splice another program onto the end of this one.
    ///
    /// Declarations are merged; the shot count of `other` is ignored. On a
    /// conflicting declaration `self` is left unchanged.
    pub fn append(&mut self, other: Program) -> IrResult<&mut Self> {
        self.declarations = self.merged_declarations(&[&other])?;
        self.instructions.extend(other.instructions);
        Ok(self)
    }

    // =========================================================================
    // Execution settings
    // =========================================================================

    /// Set the number of shots the program runs for.
    pub fn wrap_in_numshots_loop(&mut self, shots: u32) -> &mut Self {
        self.num_shots = shots;
        self
    }

    /// Number of shots the program runs for.
    pub fn num_shots(&self) -> u32 {
        self.num_shots
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Get the declared memory regions.
    pub fn declarations(&self) -> &[MemoryRegion] {
        &self.declarations
    }

    /// Distinct qubits used by the program, sorted.
    pub fn qubits(&self) -> Vec<QubitId> {
        self.instructions
            .iter()
            .flat_map(Instruction::qubits)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of qubits a machine needs to run this program.
    pub fn num_qubits(&self) -> usize {
        self.qubits().last().map_or(0, |q| q.index() + 1)
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Add `region` to `declarations` unless an identical one is already there.
fn merge_region(
    declarations: &mut Vec<MemoryRegion>,
    region: MemoryRegion,
) -> IrResult<MemoryRegion> {
    if let Some(existing) = declarations.iter().find(|r| r.name == region.name) {
        if existing.ty != region.ty || existing.size != region.size {
            return Err(IrError::ConflictingDeclaration {
                name: region.name,
                existing: existing.ty,
                existing_size: existing.size,
                requested: region.ty,
                requested_size: region.size,
            });
        }
        return Ok(existing.clone());
    }
    declarations.push(region.clone());
    Ok(region)
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Extend<Instruction> for Program {
    fn extend<I: IntoIterator<Item = Instruction>>(&mut self, iter: I) {
        self.instructions.extend(iter);
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for region in &self.declarations {
            writeln!(f, "{region}")?;
        }
        for inst in &self.instructions {
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_program() {
        let program = Program::new();
        assert!(program.is_empty());
        assert_eq!(program.num_shots(), 1);
        assert_eq!(program.num_qubits(), 0);
    }

    #[test]
    fn test_declare_is_idempotent() {
        let mut program = Program::new();
        let ro = program.declare("ro", MemoryType::Bit, 2).unwrap();
        let again = program.declare("ro", MemoryType::Bit, 2).unwrap();
        assert_eq!(ro, again);
        assert_eq!(program.declarations().len(), 1);

        let err = program.declare("ro", MemoryType::Integer, 2).unwrap_err();
        assert!(matches!(err, IrError::ConflictingDeclaration { .. }));
    }

    #[test]
    fn test_fluent_api() {
        let mut program = Program::new();
        let ro = program.declare("ro", MemoryType::Bit, 2).unwrap();
        program
            .h(0)
            .unwrap()
            .cnot(0, 1)
            .unwrap()
            .measure(0, ro.at(0))
            .measure(1, ro.at(1));

        assert_eq!(program.len(), 4);
        assert_eq!(program.num_qubits(), 2);
        assert_eq!(
            program.to_string(),
            "DECLARE ro BIT[2]\nH 0\nCNOT 0 1\nMEASURE 0 ro[0]\nMEASURE 1 ro[1]\n"
        );
    }

    #[test]
    fn test_num_qubits_uses_highest_index() {
        let mut program = Program::new();
        program.h(1).unwrap();
        program.x(2).unwrap();
        assert_eq!(program.qubits(), vec![QubitId(1), QubitId(2)]);
        assert_eq!(program.num_qubits(), 3);
    }

    #[test]
    fn test_if_then_layout() {
        let mut program = Program::new();
        let verif = program.declare("verif", MemoryType::Bit, 1).unwrap();
        program.measure(0, verif.at(0));

        let mut penalty = Program::new();
        penalty.x(0).unwrap().x(2).unwrap();

        program
            .if_then(verif.at(0), Program::new(), penalty)
            .unwrap();

        let names: Vec<&str> = program.instructions().iter().map(Instruction::name).collect();
        assert_eq!(
            names,
            vec!["MEASURE", "JUMP-WHEN", "X", "X", "JUMP", "LABEL", "LABEL"]
        );

        // JUMP-WHEN targets the THEN label, JUMP targets the END label.
        let insts = program.instructions();
        let then_label = insts[1].jump_target().unwrap();
        let end_label = insts[4].jump_target().unwrap();
        assert_eq!(insts[5], Instruction::Label(then_label.clone()));
        assert_eq!(insts[6], Instruction::Label(end_label.clone()));
        assert_ne!(then_label, end_label);
    }

    #[test]
    fn test_if_then_merges_branch_declarations() {
        let mut program = Program::new();
        let test1 = program.declare("test1", MemoryType::Bit, 1).unwrap();

        let mut branch = Program::new();
        let test2 = branch.declare("test2", MemoryType::Bit, 1).unwrap();
        branch.measure(0, test2.at(0));

        program.if_then(test1.at(0), Program::new(), branch).unwrap();
        assert!(program.declaration("test2").is_some());
    }

    #[test]
    fn test_nested_branches_use_distinct_labels() {
        let mut inner = Program::new();
        let c = inner.declare("c", MemoryType::Bit, 1).unwrap();
        inner.if_then(c.at(0), Program::new(), Program::new()).unwrap();

        let mut outer = Program::new();
        outer.declare("c", MemoryType::Bit, 1).unwrap();
        outer.if_then(c.at(0), inner, Program::new()).unwrap();

        let labels: Vec<&Label> = outer
            .instructions()
            .iter()
            .filter_map(|i| match i {
                Instruction::Label(l) => Some(l),
                _ => None,
            })
            .collect();
        let unique: BTreeSet<&str> = labels.iter().map(|l| l.name()).collect();
        assert_eq!(labels.len(), 4);
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_while_do_layout() {
        let mut program = Program::new();
        let flag = program.declare("flag", MemoryType::Bit, 1).unwrap();
        program.mov(flag.at(0), 1);

        let mut body = Program::new();
        body.mov(flag.at(0), 0);
        program.while_do(flag.at(0), body).unwrap();

        let names: Vec<&str> = program.instructions().iter().map(Instruction::name).collect();
        assert_eq!(
            names,
            vec!["MOVE", "LABEL", "JUMP-UNLESS", "MOVE", "JUMP", "LABEL"]
        );
    }

    #[test]
    fn test_append_conflict_is_error() {
        let mut a = Program::new();
        a.declare("ro", MemoryType::Bit, 2).unwrap();
        let mut b = Program::new();
        b.declare("ro", MemoryType::Bit, 3).unwrap();
        assert!(a.append(b).is_err());
    }

    #[test]
    fn test_failed_branch_merge_leaves_program_unchanged() {
        let mut program = Program::new();
        let c = program.declare("c", MemoryType::Bit, 1).unwrap();
        program.h(0).unwrap();
        let before = program.clone();

        let mut else_branch = Program::new();
        else_branch.declare("c", MemoryType::Integer, 4).unwrap();
        let mut then_branch = Program::new();
        then_branch.declare("extra", MemoryType::Bit, 1).unwrap();

        let err = program
            .if_then(c.at(0), then_branch, else_branch.clone())
            .unwrap_err();
        assert!(matches!(err, IrError::ConflictingDeclaration { .. }));
        assert_eq!(program, before);

        assert!(program.while_do(c.at(0), else_branch).is_err());
        assert_eq!(program, before);
    }

    #[test]
    fn test_failed_append_keeps_earlier_declarations_out() {
        let mut a = Program::new();
        a.declare("ro", MemoryType::Bit, 2).unwrap();
        let mut b = Program::new();
        b.declare("fresh", MemoryType::Bit, 1).unwrap();
        b.declare("ro", MemoryType::Bit, 3).unwrap();
        b.x(0).unwrap();

        assert!(a.append(b).is_err());
        assert!(a.declaration("fresh").is_none());
        assert!(a.is_empty());
    }

    #[test]
    fn test_classical_builders_render() {
        let mut program = Program::new();
        let ro = program.declare("ro", MemoryType::Bit, 2).unwrap();
        let tie = program.declare("tie", MemoryType::Bit, 1).unwrap();
        let n = program.declare("n", MemoryType::Integer, 1).unwrap();
        program
            .equal(tie.at(0), ro.at(0), ro.at(1))
            .less_than(tie.at(0), n.at(0), 3);

        let text = program.to_string();
        assert!(text.contains("EQ tie[0] ro[0] ro[1]"));
        assert!(text.contains("LT tie[0] n[0] 3"));
    }

    #[test]
    fn test_wrap_in_numshots_loop() {
        let mut program = Program::new();
        program.wrap_in_numshots_loop(30);
        assert_eq!(program.num_shots(), 30);

        let copy = program.clone();
        assert_eq!(copy.num_shots(), 30);
    }

    #[test]
    fn test_program_serde() {
        let mut program = Program::new();
        let ro = program.declare("ro", MemoryType::Bit, 1).unwrap();
        program.h(0).unwrap().measure(0, ro.at(0));
        let json = serde_json::to_string(&program).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(program, back);
    }
}
