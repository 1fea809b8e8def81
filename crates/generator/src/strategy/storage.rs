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

//! Persistent and transient storage. Every access pattern is its own selection name, so cold
//! and warm, changing and non-changing accesses are measured as separate series.

use crate::emit::Emitter;
use crate::errors::{EmitError, GenerationError};
use crate::operand::{Operand, OperandSynth};
use crate::program::ExpectedExecutions;
use crate::strategy::{BatchContext, Blueprint, Strategy, Target};
use opbench_common::opcode::{SLOAD, SSTORE};
use std::collections::HashSet;
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageAccess {
    /// A slot never touched before, one per occurrence.
    SloadCold,
    /// Slot 0, read once in the preamble.
    SloadWarm,
    /// A non-zero value into a fresh slot.
    SstoreColdChange,
    /// Zero into a fresh slot.
    SstoreColdNochange,
    /// Distinct non-zero values into slot 0, already dirtied by the preamble.
    SstoreWarmChange,
    /// Zero into slot 0, read once in the preamble.
    SstoreWarmNochange,
    Tload,
    /// Distinct non-zero values into transient slot 0.
    Tstore,
}

impl StorageAccess {
    pub fn opcode_mnemonic(&self) -> &'static str {
        match self {
            StorageAccess::SloadCold | StorageAccess::SloadWarm => "SLOAD",
            StorageAccess::SstoreColdChange
            | StorageAccess::SstoreColdNochange
            | StorageAccess::SstoreWarmChange
            | StorageAccess::SstoreWarmNochange => "SSTORE",
            StorageAccess::Tload => "TLOAD",
            StorageAccess::Tstore => "TSTORE",
        }
    }

    pub fn is_cold(&self) -> bool {
        matches!(
            self,
            StorageAccess::SloadCold
                | StorageAccess::SstoreColdChange
                | StorageAccess::SstoreColdNochange
        )
    }

    pub fn is_store(&self) -> bool {
        matches!(self.opcode_mnemonic(), "SSTORE" | "TSTORE")
    }

    /// Stores whose value differs from what the slot holds.
    pub fn changes_value(&self) -> bool {
        matches!(
            self,
            StorageAccess::SstoreColdChange
                | StorageAccess::SstoreWarmChange
                | StorageAccess::Tstore
        )
    }

    /// Executions of the opcode the preamble performs.
    fn baseline(&self) -> usize {
        usize::from(matches!(
            self,
            StorageAccess::SloadWarm | StorageAccess::SstoreWarmChange
        ))
    }
}

pub(crate) struct StorageStrategy;

struct StorageBlueprint {
    access: StorageAccess,
    opcode: u8,
    results: usize,
    /// Stack items of the preamble, each followed by `setup_op`.
    setup: Vec<Operand>,
    setup_op: Option<u8>,
    /// One group per slot of the batch, first logical argument first.
    groups: Vec<Vec<Operand>>,
}

/// A non-zero 32-byte value not in `seen`.
fn fresh_value(synth: &mut OperandSynth, seen: &mut HashSet<Operand>) -> Operand {
    loop {
        let value = synth.wide(32);
        if seen.insert(value.clone()) {
            return value;
        }
    }
}

impl Strategy for StorageStrategy {
    fn prepare(
        &self,
        batch: &BatchContext,
        synth: &mut OperandSynth,
    ) -> Result<Box<dyn Blueprint>, GenerationError> {
        let Target::Storage { access, spec } = batch.target else {
            unreachable!("storage strategy dispatched for {}", batch.target.mnemonic());
        };
        let access = *access;
        let mut seen = HashSet::new();

        let (setup, setup_op) = match access {
            StorageAccess::SloadWarm | StorageAccess::SstoreWarmNochange => {
                (vec![Operand::word(0, 2)], Some(SLOAD))
            }
            StorageAccess::SstoreWarmChange => (
                vec![fresh_value(synth, &mut seen), Operand::word(0, 2)],
                Some(SSTORE),
            ),
            _ => (vec![], None),
        };

        let groups: Vec<Vec<Operand>> = (0..batch.batch_max)
            .map(|idx| {
                let slot = if access.is_cold() { idx as u64 } else { 0 };
                let mut group = vec![Operand::word(slot, 2)];
                if access.is_store() {
                    group.push(if access.changes_value() {
                        fresh_value(synth, &mut seen)
                    } else {
                        Operand::zero()
                    });
                }
                group
            })
            .collect();

        let group_len = if access.is_store() { 2 } else { 1 };
        batch.check_depth(setup.len().max(batch.batch_max * group_len))?;
        Ok(Box::new(StorageBlueprint {
            access,
            opcode: spec.value,
            results: spec.added,
            setup,
            setup_op,
            groups,
        }))
    }
}

impl Blueprint for StorageBlueprint {
    fn emit(&self, op_count: usize, e: &mut Emitter) -> Result<(), EmitError> {
        if let Some(op) = self.setup_op {
            for operand in self.setup.iter() {
                e.push(operand);
            }
            e.op(op);
            if op == SLOAD {
                e.pop(1);
            }
        }

        for group in self.groups.iter().rev() {
            for operand in group.iter().rev() {
                e.push(operand);
            }
        }
        for _ in 0..op_count {
            e.op(self.opcode);
            e.pop(self.results);
        }
        e.pop((self.groups.len() - op_count) * self.results);
        Ok(())
    }

    fn arguments(&self) -> Vec<u64> {
        vec![]
    }

    fn expected(&self, op_count: usize) -> Option<ExpectedExecutions> {
        Some(ExpectedExecutions::new(
            self.opcode,
            self.access.baseline() + op_count,
        ))
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

    fn emit(mnemonic: &str, op_count: usize, batch_max: usize) -> String {
        let table = OpcodeTable::builtin().unwrap();
        let target = Target::resolve(&table, mnemonic).unwrap();
        let tuning = Tuning::default();
        let batch = BatchContext {
            target: &target,
            batch_max,
            sizes: &ArgumentSizes::Random,
            tuning: &tuning,
        };
        let blueprint = StorageStrategy
            .prepare(&batch, &mut OperandSynth::seeded(5))
            .unwrap();
        let mut e = Emitter::new();
        blueprint.emit(op_count, &mut e).unwrap();
        hex::encode(e.finish().unwrap())
    }

    #[test]
    fn names_round_trip() {
        for access in StorageAccess::iter() {
            assert_eq!(StorageAccess::from_str(&access.to_string()).unwrap(), access);
        }
        assert_eq!(StorageAccess::SstoreColdNochange.to_string(), "SSTORE_COLD_NOCHANGE");
    }

    #[test]
    fn cold_loads_touch_fresh_slots() {
        // Slots 2, 1, 0 pushed so slot 0 is on top, then one SLOAD and two drains.
        assert_eq!(emit("SLOAD_COLD", 1, 3), "61000261000161000054505050");
    }

    #[test]
    fn warm_loads_are_pretouched() {
        assert_eq!(emit("SLOAD_WARM", 0, 1), "610000545061000050");
    }

    #[test]
    fn nochange_stores_write_zero() {
        // Zero and slot 1, zero and slot 0, one SSTORE.
        assert_eq!(
            emit("SSTORE_COLD_NOCHANGE", 1, 2),
            "6000610001600061000055"
        );
    }
}
