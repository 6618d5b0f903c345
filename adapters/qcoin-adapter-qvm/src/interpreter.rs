//! Shot loop: executes an [`Executable`] against a statevector and classical
//! memory.

use rand::Rng;
use tracing::trace;

use qcoin_hal::{HalError, HalResult, RegisterMap};

use crate::executable::{BinaryOp, CompareOp, Executable, Op, Operand, Slot, coerce};
use crate::statevector::Statevector;

/// Default bound on instructions executed per shot.
pub const DEFAULT_MAX_STEPS_PER_SHOT: u64 = 100_000;

/// Run every shot of `exe` and collect the final memory of each one.
pub(crate) fn execute<R: Rng + ?Sized>(
    exe: &Executable,
    rng: &mut R,
    max_steps: u64,
) -> HalResult<RegisterMap> {
    let mut machine = Machine::new(exe);
    let mut registers = RegisterMap::new();

    for shot in 0..exe.num_shots() {
        machine.reset();
        let steps = machine.run(rng, max_steps)?;
        trace!(shot, steps, "shot finished");

        for (region, values) in exe.regions().iter().zip(&machine.memory) {
            registers.push_row(&region.name, values.clone());
        }
    }

    Ok(registers)
}

struct Machine<'a> {
    exe: &'a Executable,
    state: Statevector,
    memory: Vec<Vec<i64>>,
}

impl<'a> Machine<'a> {
    fn new(exe: &'a Executable) -> Self {
        Self {
            exe,
            state: Statevector::new(exe.num_qubits()),
            memory: exe.regions().iter().map(|r| vec![0; r.size]).collect(),
        }
    }

    fn reset(&mut self) {
        self.state.reinitialize();
        for values in &mut self.memory {
            values.fill(0);
        }
    }

    fn read(&self, slot: Slot) -> i64 {
        self.memory[slot.region][slot.index]
    }

    fn write(&mut self, slot: Slot, value: i64) {
        let ty = self.exe.regions()[slot.region].ty;
        self.memory[slot.region][slot.index] = coerce(ty, value);
    }

    fn value(&self, operand: Operand) -> i64 {
        match operand {
            Operand::Slot(slot) => self.read(slot),
            Operand::Immediate(v) => v,
        }
    }

    /// Execute one shot from the first instruction. Returns the step count.
    fn run<R: Rng + ?Sized>(&mut self, rng: &mut R, max_steps: u64) -> HalResult<u64> {
        let exe = self.exe;
        let ops = &exe.ops;
        let mut pc = 0;
        let mut steps = 0u64;

        while pc < ops.len() {
            steps += 1;
            if steps > max_steps {
                return Err(HalError::Execution(format!(
                    "shot exceeded {max_steps} steps (pc {pc})"
                )));
            }

            pc = match &ops[pc] {
                Op::Gate { gate, qubits } => {
                    self.state.apply_gate(*gate, qubits);
                    pc + 1
                }
                Op::Measure { qubit, target } => {
                    let bit = self.state.measure(*qubit, rng);
                    if let Some(slot) = target {
                        self.write(*slot, i64::from(bit));
                    }
                    pc + 1
                }
                Op::Reset(Some(qubit)) => {
                    self.state.reset(*qubit, rng);
                    pc + 1
                }
                Op::Reset(None) => {
                    self.state.reinitialize();
                    pc + 1
                }
                Op::Jump(target) => *target,
                Op::JumpWhen { pc: target, condition } => {
                    if self.read(*condition) != 0 {
                        *target
                    } else {
                        pc + 1
                    }
                }
                Op::JumpUnless { pc: target, condition } => {
                    if self.read(*condition) == 0 {
                        *target
                    } else {
                        pc + 1
                    }
                }
                Op::Binary { op, target, source } => {
                    let rhs = self.value(*source);
                    let result = match op {
                        BinaryOp::Move => rhs,
                        BinaryOp::Add => self.read(*target).wrapping_add(rhs),
                        BinaryOp::Xor => self.read(*target) ^ rhs,
                    };
                    self.write(*target, result);
                    pc + 1
                }
                Op::Not(target) => {
                    let result = i64::from(self.read(*target) == 0);
                    self.write(*target, result);
                    pc + 1
                }
                Op::Compare {
                    op,
                    target,
                    left,
                    right,
                } => {
                    let (l, r) = (self.read(*left), self.value(*right));
                    let result = match op {
                        CompareOp::Eq => l == r,
                        CompareOp::Lt => l < r,
                    };
                    self.write(*target, i64::from(result));
                    pc + 1
                }
                Op::Halt => break,
                Op::Nop => pc + 1,
            };
        }

        Ok(steps)
    }
}
