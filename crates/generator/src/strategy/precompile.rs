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

//! Precompiled contracts, each invoked by STATICCALL against its fixed address with an input
//! laid out in memory by the preamble. Real and no-op slots alternate as for the CALL family.

use crate::emit::Emitter;
use crate::errors::{EmitError, GenerationError};
use crate::operand::{Operand, OperandSynth};
use crate::program::ExpectedExecutions;
use crate::strategy::slots::InvocationSlots;
use crate::strategy::{BatchContext, Blueprint, Strategy, Target, curves};
use crate::tuning::ADDRESSABLE_BYTES;
use opbench_common::opcode::STATICCALL;
use strum::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Precompile {
    #[strum(serialize = "ECRECOVER")]
    EcRecover,
    #[strum(serialize = "SHA2-256")]
    Sha256,
    #[strum(serialize = "RIPEMD-160")]
    Ripemd160,
    #[strum(serialize = "IDENTITY")]
    Identity,
    #[strum(serialize = "MODEXP")]
    ModExp,
    #[strum(serialize = "ECADD")]
    EcAdd,
    #[strum(serialize = "ECMUL")]
    EcMul,
    #[strum(serialize = "ECPAIRING")]
    EcPairing,
    #[strum(serialize = "BLAKE2F")]
    Blake2f,
    #[strum(serialize = "POINTEVAL")]
    PointEvaluation,
    #[strum(serialize = "BLS12_G1ADD")]
    Bls12G1Add,
    #[strum(serialize = "BLS12_G1MSM")]
    Bls12G1Msm,
    /// One pair with its last byte missing, which the precompile rejects.
    #[strum(serialize = "BLS12_G1MSM_K0")]
    Bls12G1MsmK0,
    #[strum(serialize = "BLS12_G1MSM_K1")]
    Bls12G1MsmK1,
    #[strum(serialize = "BLS12_G1MSM_K2")]
    Bls12G1MsmK2,
    /// At most `MAX_SMALL_MSM_PAIRS` pairs.
    #[strum(serialize = "BLS12_G1MSM_S")]
    Bls12G1MsmSmall,
    #[strum(serialize = "BLS12_G2ADD")]
    Bls12G2Add,
    #[strum(serialize = "BLS12_G2MSM")]
    Bls12G2Msm,
    #[strum(serialize = "BLS12_G2MSM_K0")]
    Bls12G2MsmK0,
    #[strum(serialize = "BLS12_G2MSM_K1")]
    Bls12G2MsmK1,
    #[strum(serialize = "BLS12_G2MSM_K2")]
    Bls12G2MsmK2,
    #[strum(serialize = "BLS12_G2MSM_S")]
    Bls12G2MsmSmall,
    #[strum(serialize = "BLS12_PAIRING_CHECK")]
    Bls12PairingCheck,
    #[strum(serialize = "BLS12_MAP_FP_TO_G1")]
    Bls12MapFpToG1,
    #[strum(serialize = "BLS12_MAP_FP2_TO_G2")]
    Bls12MapFp2ToG2,
}

impl Precompile {
    pub fn address(&self) -> u8 {
        match self {
            Precompile::EcRecover => 0x01,
            Precompile::Sha256 => 0x02,
            Precompile::Ripemd160 => 0x03,
            Precompile::Identity => 0x04,
            Precompile::ModExp => 0x05,
            Precompile::EcAdd => 0x06,
            Precompile::EcMul => 0x07,
            Precompile::EcPairing => 0x08,
            Precompile::Blake2f => 0x09,
            Precompile::PointEvaluation => 0x0a,
            Precompile::Bls12G1Add => 0x0b,
            Precompile::Bls12G1Msm
            | Precompile::Bls12G1MsmK0
            | Precompile::Bls12G1MsmK1
            | Precompile::Bls12G1MsmK2
            | Precompile::Bls12G1MsmSmall => 0x0c,
            Precompile::Bls12G2Add => 0x0d,
            Precompile::Bls12G2Msm
            | Precompile::Bls12G2MsmK0
            | Precompile::Bls12G2MsmK1
            | Precompile::Bls12G2MsmK2
            | Precompile::Bls12G2MsmSmall => 0x0e,
            Precompile::Bls12PairingCheck => 0x0f,
            Precompile::Bls12MapFpToG1 => 0x10,
            Precompile::Bls12MapFp2ToG2 => 0x11,
        }
    }

    /// Variants whose input the precompile rejects. A failing call consumes all the gas it
    /// is given.
    pub fn fails(&self) -> bool {
        matches!(self, Precompile::Bls12G1MsmK0 | Precompile::Bls12G2MsmK0)
    }
}

/// Pair bound of the `_S` MSM variants.
pub const MAX_SMALL_MSM_PAIRS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    G1,
    G2,
}

impl Group {
    fn point(self, synth: &mut OperandSynth) -> Vec<u8> {
        match self {
            Group::G1 => curves::g1_point(synth),
            Group::G2 => curves::g2_point(synth),
        }
    }

    fn point_len(self) -> usize {
        match self {
            Group::G1 => 128,
            Group::G2 => 256,
        }
    }
}

/// How an MSM variant sizes its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MsmPairs {
    /// Fixed argument size, or random up to the bound.
    UpTo(usize),
    Exactly(usize),
    /// One pair with the last byte dropped.
    Truncated,
}

/// Where the call reads its input and writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    /// Written at offset 0 by the preamble.
    data: Vec<u8>,
    args_offset: usize,
    args_size: usize,
    ret_offset: usize,
    ret_size: usize,
    descriptors: Vec<u64>,
}

impl Layout {
    /// Input written at 0, output on the next word boundary after it.
    fn written(data: Vec<u8>, ret_size: usize, descriptors: Vec<u64>) -> Self {
        let args_size = data.len();
        Self {
            data,
            args_offset: 0,
            args_size,
            ret_offset: args_size.next_multiple_of(32),
            ret_size,
            descriptors,
        }
    }

    /// Memory the call touches.
    fn extent(&self) -> usize {
        (self.args_offset + self.args_size).max(self.ret_offset + self.ret_size)
    }
}

fn word(value: usize) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// A width from the fixed argument sizes, or a random one.
fn width(
    batch: &BatchContext,
    synth: &mut OperandSynth,
    idx: usize,
) -> Result<usize, GenerationError> {
    match batch.sizes.get(idx) {
        Some(width) if (1..=32).contains(&width) => Ok(width),
        Some(width) => Err(batch.invalid(format!(
            "argument {idx} is {width} bytes wide, outside 1..=32"
        ))),
        None => Ok(synth.within(1..=32)),
    }
}

/// A pair count from the fixed argument sizes, or a random one of `allowed`.
fn pair_count(
    batch: &BatchContext,
    synth: &mut OperandSynth,
    allowed: &[usize],
) -> Result<usize, GenerationError> {
    match batch.sizes.get(0) {
        Some(pairs) if allowed.contains(&pairs) => Ok(pairs),
        Some(pairs) => Err(batch.invalid(format!("{pairs} pairs is not one of {allowed:?}"))),
        None => Ok(allowed[synth.below(allowed.len())]),
    }
}

fn msm(
    group: Group,
    pairs: MsmPairs,
    batch: &BatchContext,
    synth: &mut OperandSynth,
) -> Result<Layout, GenerationError> {
    let (count, truncated) = match pairs {
        MsmPairs::UpTo(bound) => match batch.sizes.get(0) {
            Some(count) if (1..=bound).contains(&count) => (count, false),
            Some(count) => {
                return Err(batch.invalid(format!("{count} pairs is outside 1..={bound}")));
            }
            None => (synth.within(1..=bound), false),
        },
        MsmPairs::Exactly(count) => (count, false),
        MsmPairs::Truncated => (1, true),
    };
    let mut data = Vec::new();
    for _ in 0..count {
        data.extend(group.point(synth));
        data.extend_from_slice(&synth.array::<32>());
    }
    if truncated {
        data.pop();
    }
    let descriptor = if truncated { 0 } else { count as u64 };
    Ok(Layout::written(data, group.point_len(), vec![descriptor]))
}

fn layout(
    precompile: Precompile,
    batch: &BatchContext,
    synth: &mut OperandSynth,
) -> Result<Layout, GenerationError> {
    let tuning = batch.tuning;
    let material = |reason: String| GenerationError::Material {
        precompile: precompile.to_string(),
        reason,
    };

    let layout = match precompile {
        Precompile::EcRecover => {
            Layout::written(curves::ecrecover_input(synth).map_err(material)?, 32, vec![])
        }
        Precompile::Sha256 | Precompile::Ripemd160 | Precompile::Identity => {
            let bound = tuning.hash_input_bound.min(tuning.memory_region_bytes / 2);
            let args_offset = synth.below(bound);
            let args_size = synth.below(bound);
            Layout {
                data: vec![],
                args_offset,
                args_size,
                ret_offset: 0,
                ret_size: 0,
                descriptors: vec![args_offset as u64, args_size as u64],
            }
        }
        Precompile::ModExp => {
            let widths = [
                width(batch, synth, 0)?,
                width(batch, synth, 1)?,
                width(batch, synth, 2)?,
            ];
            let mut data = Vec::new();
            for w in widths {
                data.extend_from_slice(&word(w));
            }
            for w in widths {
                data.extend_from_slice(synth.wide(w).bytes());
            }
            Layout::written(data, widths[2], widths.iter().map(|w| *w as u64).collect())
        }
        Precompile::EcAdd => {
            let data = [1, 2, 1, 2].iter().flat_map(|v| word(*v)).collect();
            Layout::written(data, 64, vec![])
        }
        Precompile::EcMul => {
            let w = width(batch, synth, 0)?;
            let mut data: Vec<u8> = [1, 2].iter().flat_map(|v| word(*v)).collect();
            data.resize(data.len() + 32 - w, 0);
            data.extend_from_slice(synth.wide(w).bytes());
            Layout::written(data, 64, vec![w as u64])
        }
        Precompile::EcPairing => {
            let pairs = pair_count(batch, synth, &curves::ECPAIRING_PAIR_COUNTS)?;
            let data = curves::ecpairing_vector(pairs).map_err(material)?;
            Layout::written(data, 32, vec![pairs as u64])
        }
        Precompile::Blake2f => {
            let rounds = synth.within(0..=tuning.max_blake2f_rounds);
            let mut data = (rounds as u32).to_be_bytes().to_vec();
            data.extend_from_slice(&synth.bytes(64 + 128 + 16));
            data.push(1);
            Layout::written(data, 64, vec![rounds as u64])
        }
        Precompile::PointEvaluation => {
            Layout::written(curves::pointeval_vector().map_err(material)?, 64, vec![])
        }
        Precompile::Bls12G1Add => {
            let mut data = curves::g1_point(synth);
            data.extend(curves::g1_point(synth));
            Layout::written(data, 128, vec![])
        }
        Precompile::Bls12G2Add => {
            let mut data = curves::g2_point(synth);
            data.extend(curves::g2_point(synth));
            Layout::written(data, 256, vec![])
        }
        Precompile::Bls12G1Msm => {
            msm(Group::G1, MsmPairs::UpTo(tuning.max_msm_pairs), batch, synth)?
        }
        Precompile::Bls12G1MsmK0 => msm(Group::G1, MsmPairs::Truncated, batch, synth)?,
        Precompile::Bls12G1MsmK1 => msm(Group::G1, MsmPairs::Exactly(1), batch, synth)?,
        Precompile::Bls12G1MsmK2 => msm(Group::G1, MsmPairs::Exactly(2), batch, synth)?,
        Precompile::Bls12G1MsmSmall => {
            msm(Group::G1, MsmPairs::UpTo(MAX_SMALL_MSM_PAIRS), batch, synth)?
        }
        Precompile::Bls12G2Msm => {
            msm(Group::G2, MsmPairs::UpTo(tuning.max_msm_pairs), batch, synth)?
        }
        Precompile::Bls12G2MsmK0 => msm(Group::G2, MsmPairs::Truncated, batch, synth)?,
        Precompile::Bls12G2MsmK1 => msm(Group::G2, MsmPairs::Exactly(1), batch, synth)?,
        Precompile::Bls12G2MsmK2 => msm(Group::G2, MsmPairs::Exactly(2), batch, synth)?,
        Precompile::Bls12G2MsmSmall => {
            msm(Group::G2, MsmPairs::UpTo(MAX_SMALL_MSM_PAIRS), batch, synth)?
        }
        Precompile::Bls12PairingCheck => {
            let pairs = synth.within(1..=tuning.max_pairing_pairs);
            let mut data = Vec::new();
            for _ in 0..pairs {
                data.extend(curves::g1_point(synth));
                data.extend(curves::g2_point(synth));
            }
            Layout::written(data, 32, vec![pairs as u64])
        }
        Precompile::Bls12MapFpToG1 => Layout::written(curves::field_element(synth), 128, vec![]),
        Precompile::Bls12MapFp2ToG2 => {
            let mut data = curves::field_element(synth);
            data.extend(curves::field_element(synth));
            Layout::written(data, 256, vec![])
        }
    };
    Ok(layout)
}

pub(crate) struct PrecompileStrategy;

struct PrecompileBlueprint {
    precompile: Precompile,
    layout: Layout,
    memory: usize,
    gas: Operand,
    slots: InvocationSlots,
    batch_max: usize,
}

impl Strategy for PrecompileStrategy {
    fn prepare(
        &self,
        batch: &BatchContext,
        synth: &mut OperandSynth,
    ) -> Result<Box<dyn Blueprint>, GenerationError> {
        let Target::Precompile { precompile, call } = batch.target else {
            unreachable!("precompile strategy dispatched for {}", batch.target.mnemonic());
        };
        let layout = layout(*precompile, batch, synth)?;
        let memory = batch.tuning.memory_region_bytes.max(layout.extent());
        if memory > ADDRESSABLE_BYTES {
            return Err(batch.invalid(format!(
                "input and output need {memory:#x} bytes of memory, more than PUSH2 addresses"
            )));
        }

        let slots = InvocationSlots {
            op: call.value,
            arguments: call.removed,
            salted: false,
            sink: false,
        };
        batch.check_depth(slots.template_len() + slots.peak_above_template())?;
        Ok(Box::new(PrecompileBlueprint {
            precompile: *precompile,
            layout,
            memory,
            gas: Operand::word(
                if precompile.fails() {
                    batch.tuning.failing_call_gas
                } else {
                    batch.tuning.call_gas
                },
                4,
            ),
            slots,
            batch_max: batch.batch_max,
        }))
    }
}

impl Blueprint for PrecompileBlueprint {
    fn emit(&self, op_count: usize, e: &mut Emitter) -> Result<(), EmitError> {
        let layout = &self.layout;
        e.preallocate(self.memory)?;
        e.store_memory(0, &layout.data)?;
        e.push_offset(layout.ret_size)?;
        e.push_offset(layout.ret_offset)?;
        e.push_offset(layout.args_size)?;
        e.push_offset(layout.args_offset)?;
        e.push_word(u64::from(self.precompile.address()), 1);
        e.push(&self.gas);
        self.slots.emit(op_count, self.batch_max, e);
        Ok(())
    }

    fn arguments(&self) -> Vec<u64> {
        self.layout.descriptors.clone()
    }

    fn expected(&self, op_count: usize) -> Option<ExpectedExecutions> {
        Some(ExpectedExecutions::new(STATICCALL, op_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ArgumentSizes;
    use crate::tuning::Tuning;
    use opbench_common::OpcodeTable;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use strum::IntoEnumIterator;
    use test_case::test_case;

    fn try_layout(name: &str, sizes: ArgumentSizes) -> Result<Layout, GenerationError> {
        let table = OpcodeTable::builtin().unwrap();
        let target = Target::resolve(&table, name).unwrap();
        let tuning = Tuning::default();
        let batch = BatchContext {
            target: &target,
            batch_max: 4,
            sizes: &sizes,
            tuning: &tuning,
        };
        layout(
            Precompile::from_str(name).unwrap(),
            &batch,
            &mut OperandSynth::seeded(13),
        )
    }

    fn layout_for(name: &str, sizes: ArgumentSizes) -> Layout {
        try_layout(name, sizes).unwrap()
    }

    #[test]
    fn addresses_are_distinct_and_sequential() {
        let mut addresses: Vec<u8> = Precompile::iter().map(|p| p.address()).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses, (1..=0x11).collect::<Vec<u8>>());
    }

    #[test_case("ECRECOVER", 128, 32)]
    #[test_case("ECADD", 128, 64)]
    #[test_case("ECMUL", 96, 64)]
    #[test_case("BLAKE2F", 213, 64)]
    #[test_case("POINTEVAL", 192, 64)]
    #[test_case("BLS12_G1ADD", 256, 128)]
    #[test_case("BLS12_G2ADD", 512, 256)]
    #[test_case("BLS12_MAP_FP_TO_G1", 64, 128)]
    #[test_case("BLS12_MAP_FP2_TO_G2", 128, 256)]
    fn fixed_size_inputs(name: &str, input: usize, output: usize) {
        let layout = layout_for(name, ArgumentSizes::Random);
        assert_eq!(layout.args_size, input);
        assert_eq!(layout.data.len(), input);
        assert_eq!(layout.ret_size, output);
        assert_eq!(layout.ret_offset % 32, 0);
        assert!(layout.ret_offset >= input);
    }

    #[test_case("ECPAIRING", 192)]
    #[test_case("BLS12_G1MSM", 160)]
    #[test_case("BLS12_G1MSM_S", 160)]
    #[test_case("BLS12_G2MSM_S", 288)]
    #[test_case("BLS12_G2MSM", 288)]
    #[test_case("BLS12_PAIRING_CHECK", 384)]
    fn pair_counts_are_descriptors(name: &str, per_pair: usize) {
        let layout = layout_for(name, ArgumentSizes::Random);
        assert_eq!(layout.args_size, layout.descriptors[0] as usize * per_pair);
    }

    #[test_case(1)]
    #[test_case(2)]
    #[test_case(4)]
    #[test_case(8)]
    fn ecpairing_pair_counts(pairs: usize) {
        let layout = layout_for("ECPAIRING", ArgumentSizes::Fixed(vec![pairs]));
        assert_eq!(layout.descriptors, vec![pairs as u64]);
        assert_eq!(layout.args_size, pairs * 192);
        assert_eq!(layout.ret_offset, pairs * 192);
    }

    #[test]
    fn ecpairing_rejects_counts_without_a_vector() {
        assert!(try_layout("ECPAIRING", ArgumentSizes::Fixed(vec![3])).is_err());
    }

    #[test]
    fn ecpairing_draws_its_pair_count() {
        let mut synth = OperandSynth::seeded(2);
        let table = OpcodeTable::builtin().unwrap();
        let target = Target::resolve(&table, "ECPAIRING").unwrap();
        let tuning = Tuning::default();
        let batch = BatchContext {
            target: &target,
            batch_max: 4,
            sizes: &ArgumentSizes::Random,
            tuning: &tuning,
        };
        let counts: std::collections::BTreeSet<u64> = (0..64)
            .map(|_| layout(Precompile::EcPairing, &batch, &mut synth).unwrap().descriptors[0])
            .collect();
        assert_eq!(counts.into_iter().collect::<Vec<_>>(), vec![1, 2, 4, 8]);
    }

    #[test_case("BLS12_G1MSM_K0", 159, 0)]
    #[test_case("BLS12_G1MSM_K1", 160, 1)]
    #[test_case("BLS12_G1MSM_K2", 320, 2)]
    #[test_case("BLS12_G2MSM_K0", 287, 0)]
    #[test_case("BLS12_G2MSM_K1", 288, 1)]
    #[test_case("BLS12_G2MSM_K2", 576, 2)]
    fn msm_variants(name: &str, input: usize, descriptor: u64) {
        let layout = layout_for(name, ArgumentSizes::Random);
        assert_eq!(layout.args_size, input);
        assert_eq!(layout.descriptors, vec![descriptor]);
    }

    #[test]
    fn small_msm_is_bounded() {
        assert!(layout_for("BLS12_G1MSM_S", ArgumentSizes::Random).descriptors[0] <= 8);
        assert!(try_layout("BLS12_G2MSM_S", ArgumentSizes::Fixed(vec![9])).is_err());
        let fixed = layout_for("BLS12_G1MSM", ArgumentSizes::Fixed(vec![5]));
        assert_eq!(fixed.args_size, 5 * 160);
    }

    #[test]
    fn rejected_inputs_forward_less_gas() {
        let table = OpcodeTable::builtin().unwrap();
        let tuning = Tuning::default();
        let gas = |name: &str| {
            let target = Target::resolve(&table, name).unwrap();
            let batch = BatchContext {
                target: &target,
                batch_max: 2,
                sizes: &ArgumentSizes::Random,
                tuning: &tuning,
            };
            let blueprint = PrecompileStrategy
                .prepare(&batch, &mut OperandSynth::seeded(1))
                .unwrap();
            let mut e = Emitter::new();
            blueprint.emit(1, &mut e).unwrap();
            hex::encode(e.finish().unwrap())
        };
        assert!(gas("BLS12_G1MSM_K0").contains("6300000400"));
        assert!(gas("BLS12_G1MSM_K1").contains("63ffffffff"));
    }

    #[test]
    fn modexp_widths() {
        let layout = layout_for("MODEXP", ArgumentSizes::Fixed(vec![3, 17, 32]));
        assert_eq!(layout.descriptors, vec![3, 17, 32]);
        assert_eq!(layout.args_size, 96 + 3 + 17 + 32);
        assert_eq!(layout.ret_size, 32);
        assert_eq!(layout.data[31], 3);
        assert_eq!(layout.data[63], 17);
    }

    #[test]
    fn hashes_read_the_preallocated_region() {
        let layout = layout_for("SHA2-256", ArgumentSizes::Random);
        assert!(layout.data.is_empty());
        assert!(layout.extent() <= Tuning::default().memory_region_bytes);
        assert_eq!(
            layout.descriptors,
            vec![layout.args_offset as u64, layout.args_size as u64]
        );
    }
}
