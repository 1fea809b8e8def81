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

//! Memory-touching opcodes. The region every occurrence addresses is expanded once by the
//! preamble, so no occurrence pays for expansion.

use crate::emit::Emitter;
use crate::errors::{EmitError, GenerationError};
use crate::operand::{Operand, OperandSynth};
use crate::program::ExpectedExecutions;
use crate::scaffold::Scaffold;
use crate::strategy::{BatchContext, Blueprint, Strategy};
use crate::tuning::ADDRESSABLE_BYTES;
use opbench_common::opcode::{
    CALLDATACOPY, CODECOPY, KECCAK256, LOG0, LOG4, MCOPY, MLOAD, MSTORE, MSTORE8,
};

pub(crate) struct MemoryStrategy;

struct MemoryBlueprint {
    opcode: u8,
    region: usize,
    scaffold: Scaffold,
    descriptor: u64,
}

fn offset(value: usize) -> Operand {
    assert!(value < ADDRESSABLE_BYTES, "{value:#x} does not fit a PUSH2 operand");
    Operand::word(value as u64, 2)
}

/// Exclusive bound on offsets at which `span` bytes stay inside the region. Offsets also stay
/// below `ADDRESSABLE_BYTES`, even for an empty span at the end of a full-sized region.
fn placement_bound(region: usize, span: usize) -> usize {
    region.min(ADDRESSABLE_BYTES - 1) - span + 1
}

fn placed(synth: &mut OperandSynth, region: usize, span: usize) -> Operand {
    offset(synth.below(placement_bound(region, span)))
}

impl Strategy for MemoryStrategy {
    fn prepare(
        &self,
        batch: &BatchContext,
        synth: &mut OperandSynth,
    ) -> Result<Box<dyn Blueprint>, GenerationError> {
        let spec = batch.target.spec();
        let region = batch.tuning.memory_region_bytes;

        let word_sized = matches!(spec.value, MLOAD | MSTORE | MSTORE8);
        let (arguments, descriptor) = if word_sized {
            let len = if spec.value == MSTORE8 { 1 } else { 32 };
            let off = match batch.sizes.get(0) {
                Some(off) if off + len <= region => off,
                Some(off) => {
                    return Err(batch.invalid(format!(
                        "offset {off:#x} leaves the {region:#x} byte region"
                    )));
                }
                None => synth.below(region - len + 1),
            };
            let arguments = match spec.value {
                MLOAD => vec![offset(off)],
                MSTORE => vec![offset(off), synth.wide(32)],
                _ => vec![offset(off), synth.wide(1)],
            };
            (arguments, off as u64)
        } else {
            let limit = region.min(ADDRESSABLE_BYTES - 1);
            let span = match batch.sizes.get(0) {
                Some(span) if span <= limit => span,
                Some(span) => {
                    return Err(batch.invalid(format!(
                        "span {span:#x} exceeds the {limit:#x} byte region"
                    )));
                }
                None => synth.within(0..=batch.tuning.max_memory_span.min(limit)),
            };
            let arguments = match spec.value {
                KECCAK256 => vec![placed(synth, region, span), offset(span)],
                MCOPY => vec![
                    placed(synth, region, span),
                    placed(synth, region, span),
                    offset(span),
                ],
                CALLDATACOPY | CODECOPY => {
                    vec![placed(synth, region, span), Operand::zero(), offset(span)]
                }
                LOG0..=LOG4 => {
                    let mut arguments = vec![placed(synth, region, span), offset(span)];
                    for _ in 0..(spec.value - LOG0) {
                        arguments.push(synth.wide(32));
                    }
                    arguments
                }
                other => unreachable!("{other:#04x} is not a memory-touching opcode"),
            };
            (arguments, span as u64)
        };

        let scaffold = Scaffold::new(spec, arguments, vec![], batch.batch_max);
        batch.check_depth(scaffold.plan(batch.batch_max).peak_depth())?;
        Ok(Box::new(MemoryBlueprint {
            opcode: spec.value,
            region,
            scaffold,
            descriptor,
        }))
    }
}

impl Blueprint for MemoryBlueprint {
    fn emit(&self, op_count: usize, e: &mut Emitter) -> Result<(), EmitError> {
        e.preallocate(self.region)?;
        self.scaffold.emit(op_count, e);
        Ok(())
    }

    fn arguments(&self) -> Vec<u64> {
        vec![self.descriptor]
    }

    fn expected(&self, op_count: usize) -> Option<ExpectedExecutions> {
        // The preallocation is itself an MSTORE8.
        let baseline = usize::from(self.opcode == MSTORE8);
        Some(ExpectedExecutions::new(self.opcode, baseline + op_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ArgumentSizes;
    use crate::strategy::Target;
    use crate::tuning::Tuning;
    use opbench_common::OpcodeTable;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn prepare(mnemonic: &str, sizes: ArgumentSizes) -> Box<dyn Blueprint> {
        let table = OpcodeTable::builtin().unwrap();
        let target = Target::resolve(&table, mnemonic).unwrap();
        let tuning = Tuning::default();
        let batch = BatchContext {
            target: &target,
            batch_max: 8,
            sizes: &sizes,
            tuning: &tuning,
        };
        MemoryStrategy
            .prepare(&batch, &mut OperandSynth::seeded(7))
            .unwrap()
    }

    #[test]
    fn programs_start_with_the_preallocation() {
        let blueprint = prepare("MLOAD", ArgumentSizes::Random);
        let mut e = Emitter::new();
        blueprint.emit(3, &mut e).unwrap();
        let code = e.finish().unwrap();
        assert_eq!(hex::encode(&code[..6]), "6000617fff53");
    }

    #[test_case("KECCAK256", 0x40)]
    #[test_case("MCOPY", 0x1)]
    #[test_case("LOG2", 0x0)]
    fn fixed_spans_are_descriptors(mnemonic: &str, span: usize) {
        let blueprint = prepare(mnemonic, ArgumentSizes::Fixed(vec![span]));
        assert_eq!(blueprint.arguments(), vec![span as u64]);
    }

    #[test]
    fn empty_spans_stay_addressable_in_a_full_region() {
        assert_eq!(placement_bound(ADDRESSABLE_BYTES, 0), ADDRESSABLE_BYTES - 1);
        assert_eq!(placement_bound(0x8000, 0), 0x8001);
        assert_eq!(placement_bound(0x8000, 0x20), 0x7fe1);
    }

    #[test]
    fn mcopy_is_expected_once_per_occurrence() {
        let blueprint = prepare("MCOPY", ArgumentSizes::Random);
        assert_eq!(blueprint.expected(5).unwrap().opcode, MCOPY);
        assert_eq!(blueprint.expected(5).unwrap().count, 5);
    }
}
