// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Properties every batch must have, whatever the strategy behind it.

use opbench_common::OpcodeTable;
use opbench_common::opcode::{self, ADD, JUMP, JUMPI, POP, PUSH0, PUSH2, PUSH4, SLOAD};
use opbench_generator::disasm::{Instruction, instructions, jump_destinations};
use opbench_generator::{
    ArgumentSizes, Generator, Schedule, SynthesizedProgram, default_selection, verify,
};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn table() -> OpcodeTable {
    OpcodeTable::builtin().unwrap()
}

fn batch(table: &OpcodeTable, mnemonic: &str, schedule: &Schedule) -> Vec<SynthesizedProgram> {
    Generator::new(table, 17)
        .schedule(mnemonic, schedule, false, &ArgumentSizes::Random)
        .unwrap()
}

/// PUSH and POP instructions that are not the opcode under test.
fn scaffold_counts(program: &SynthesizedProgram, target: u8) -> (usize, usize) {
    let mut pushes = 0;
    let mut pops = 0;
    for instruction in instructions(&program.bytecode) {
        if instruction.opcode == target {
            continue;
        }
        if instruction.opcode == PUSH0 || opcode::is_push(instruction.opcode) {
            pushes += 1;
        } else if instruction.opcode == POP {
            pops += 1;
        }
    }
    (pushes, pops)
}

fn occurrences(program: &SynthesizedProgram, op: u8) -> Vec<Instruction<'_>> {
    instructions(&program.bytecode)
        .filter(|i| i.opcode == op)
        .collect()
}

#[test_case("ADD")]
#[test_case("EXP")]
#[test_case("ADDMOD")]
#[test_case("DUP16")]
#[test_case("SWAP16")]
#[test_case("POP")]
#[test_case("PUSH0")]
#[test_case("PUSH1")]
#[test_case("PUSH32")]
#[test_case("GAS")]
#[test_case("JUMPDEST")]
#[test_case("MLOAD")]
#[test_case("MSTORE")]
#[test_case("MSTORE8")]
#[test_case("KECCAK256")]
#[test_case("MCOPY")]
#[test_case("CALLDATACOPY")]
#[test_case("LOG4")]
#[test_case("JUMP")]
#[test_case("JUMPI")]
#[test_case("CALL")]
#[test_case("DELEGATECALL")]
#[test_case("CREATE")]
#[test_case("CREATE2")]
#[test_case("EXTCODESIZE")]
#[test_case("EXTCODECOPY")]
#[test_case("BALANCE")]
#[test_case("RETURN")]
#[test_case("REVERT")]
#[test_case("SLOAD_COLD")]
#[test_case("SLOAD_WARM")]
#[test_case("SSTORE_COLD_CHANGE")]
#[test_case("SSTORE_WARM_CHANGE")]
#[test_case("SSTORE_WARM_NOCHANGE")]
#[test_case("TLOAD")]
#[test_case("TSTORE")]
#[test_case("ECRECOVER")]
#[test_case("SHA2-256")]
#[test_case("MODEXP")]
#[test_case("ECPAIRING")]
#[test_case("BLAKE2F")]
#[test_case("BLS12_G2ADD")]
#[test_case("BLS12_G1MSM")]
#[test_case("BLS12_G1MSM_K0")]
#[test_case("BLS12_G2MSM_S")]
#[test_case("BLS12_PAIRING_CHECK")]
#[test_case("BLS12_MAP_FP2_TO_G2")]
fn batch_properties(mnemonic: &str) {
    let table = table();
    let schedule = Schedule::Triplet { op_count: 4 };
    let programs = batch(&table, mnemonic, &schedule);
    assert_eq!(programs.len(), 3);

    let target = Generator::new(&table, 0)
        .resolve(mnemonic)
        .unwrap()
        .spec()
        .value;
    let baseline = scaffold_counts(&programs[0], target);
    for program in &programs {
        assert_eq!(
            scaffold_counts(program, target),
            baseline,
            "{mnemonic} N={}",
            program.op_count
        );

        let trace = verify(&table, program).unwrap_or_else(|e| {
            panic!("{mnemonic} N={}: {e}", program.op_count);
        });
        assert!(trace.max_depth <= opcode::MAX_STACK_DEPTH);

        let valid = jump_destinations(&program.bytecode);
        let decoded: Vec<_> = instructions(&program.bytecode).collect();
        for pair in decoded.windows(2) {
            if pair[0].opcode == PUSH2 && matches!(pair[1].opcode, JUMP | JUMPI) {
                let destination = pair[0].immediate_value().unwrap() as usize;
                assert!(valid[destination], "{mnemonic}: {destination:#x}");
            }
        }
    }

    assert_eq!(programs, batch(&table, mnemonic, &schedule));
}

#[test]
fn add_without_occurrences_only_drains() {
    let table = table();
    let programs = Generator::new(&table, 1)
        .batch("ADD", &[0, 5, 10], 10, &ArgumentSizes::Random)
        .unwrap();

    let empty: Vec<_> = instructions(&programs[0].bytecode).collect();
    assert!(empty.iter().all(|i| i.opcode != ADD));
    let pops = empty.iter().skip_while(|i| i.opcode != POP);
    assert_eq!(pops.clone().count(), 10);
    assert!(pops.clone().all(|i| i.opcode == POP));
}

#[test]
fn add_interleaves_result_pops() {
    let table = table();
    let programs = Generator::new(&table, 1)
        .batch("ADD", &[0, 5, 10], 10, &ArgumentSizes::Random)
        .unwrap();

    let body: Vec<u8> = instructions(&programs[1].bytecode)
        .map(|i| i.opcode)
        .skip_while(|op| *op != ADD)
        .collect();
    let mut expected = vec![ADD];
    for _ in 1..5 {
        expected.extend([POP, ADD]);
    }
    expected.extend([POP; 6]);
    assert_eq!(body, expected);

    let scaffold = |program: &SynthesizedProgram| {
        instructions(&program.bytecode)
            .filter(|i| i.opcode != ADD)
            .count()
    };
    assert_eq!(scaffold(&programs[1]), scaffold(&programs[2]));
}

#[test]
fn push4_carries_its_operand() {
    let table = table();
    let programs = Generator::new(&table, 2)
        .schedule(
            "PUSH4",
            &Schedule::Triplet { op_count: 3 },
            false,
            &ArgumentSizes::Random,
        )
        .unwrap();
    let program = &programs[1];
    assert_eq!(program.op_count, 3);
    assert_eq!(program.bytecode.len(), 3 * 5);
    let pushes = occurrences(program, PUSH4);
    assert_eq!(pushes.len(), 3);
    assert!(pushes.iter().all(|i| i.immediate.len() == 4));
    assert!(occurrences(program, POP).is_empty());
}

#[test]
fn cold_sloads_touch_distinct_slots() {
    let table = table();
    let programs = Generator::new(&table, 3)
        .batch("SLOAD_COLD", &[4], 10, &ArgumentSizes::Random)
        .unwrap();
    let program = &programs[0];

    let mut slots: Vec<u64> = occurrences(program, PUSH2)
        .iter()
        .map(|i| i.immediate_value().unwrap())
        .collect();
    slots.sort();
    assert_eq!(slots, (0..10).collect::<Vec<u64>>());

    let body: Vec<u8> = instructions(&program.bytecode)
        .map(|i| i.opcode)
        .skip_while(|op| *op != SLOAD)
        .collect();
    let mut expected = vec![];
    for _ in 0..4 {
        expected.extend([SLOAD, POP]);
    }
    expected.extend([POP; 6]);
    assert_eq!(body, expected);
}

#[test]
fn shuffled_schedules_keep_their_counts() {
    let table = table();
    let schedule = Schedule::Stepped { max: 20, step: 2 };
    let mut counts: Vec<usize> = Generator::new(&table, 8)
        .schedule("MUL", &schedule, true, &ArgumentSizes::Random)
        .unwrap()
        .iter()
        .map(|p| p.op_count)
        .collect();
    counts.sort();
    assert_eq!(counts, schedule.counts());
}

#[test]
fn empty_batches_verify_for_every_default_mnemonic() {
    let table = table();
    let schedule = Schedule::Triplet { op_count: 0 };
    for mnemonic in default_selection(&table).iter() {
        let programs = batch(&table, mnemonic, &schedule);
        assert_eq!(programs.len(), 3, "{mnemonic}");
        for program in &programs {
            verify(&table, program).unwrap_or_else(|e| panic!("{mnemonic} B=0: {e}"));
        }
    }
}
