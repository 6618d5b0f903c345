//! Property-based tests for the control-flow builders.
//!
//! Arbitrarily nested if/while blocks must always produce a program whose
//! jumps each land on exactly one label.

use std::collections::BTreeMap;

use proptest::prelude::*;
use qcoin_ir::{Instruction, MemoryType, Program};

/// Shape of a generated block.
#[derive(Debug, Clone)]
enum Block {
    Gate(u32),
    If(Vec<Block>, Vec<Block>),
    While(Vec<Block>),
}

fn arb_block() -> impl Strategy<Value = Block> {
    let leaf = (0_u32..3).prop_map(Block::Gate);
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (
                prop::collection::vec(inner.clone(), 0..3),
                prop::collection::vec(inner.clone(), 0..3)
            )
                .prop_map(|(t, e)| Block::If(t, e)),
            prop::collection::vec(inner, 0..3).prop_map(Block::While),
        ]
    })
}

/// Build `blocks` into a program; returns the number of if/while constructs.
fn build(blocks: &[Block]) -> (Program, usize) {
    let mut program = Program::new();
    let flag = program.declare("flag", MemoryType::Bit, 1).unwrap();
    let mut constructs = 0;

    for block in blocks {
        match block {
            Block::Gate(q) => {
                program.h(*q).unwrap();
            }
            Block::If(then_blocks, else_blocks) => {
                let (then_branch, n) = build(then_blocks);
                let (else_branch, m) = build(else_blocks);
                program.if_then(flag.at(0), then_branch, else_branch).unwrap();
                constructs += 1 + n + m;
            }
            Block::While(body) => {
                let (body, n) = build(body);
                program.while_do(flag.at(0), body).unwrap();
                constructs += 1 + n;
            }
        }
    }

    (program, constructs)
}

proptest! {
    #[test]
    fn prop_labels_unique_and_targets_resolve(blocks in prop::collection::vec(arb_block(), 1..6)) {
        let (program, constructs) = build(&blocks);

        let mut labels: BTreeMap<&str, usize> = BTreeMap::new();
        for inst in program.instructions() {
            if let Instruction::Label(label) = inst {
                *labels.entry(label.name()).or_default() += 1;
            }
        }

        prop_assert_eq!(labels.len(), 2 * constructs);
        prop_assert!(labels.values().all(|&n| n == 1));

        for inst in program.instructions() {
            if let Some(target) = inst.jump_target() {
                prop_assert!(labels.contains_key(target.name()));
            }
        }
    }

    #[test]
    fn prop_nesting_keeps_one_declaration(blocks in prop::collection::vec(arb_block(), 1..6)) {
        let (program, _) = build(&blocks);
        prop_assert_eq!(program.declarations().len(), 1);
    }
}
