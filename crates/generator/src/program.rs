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

//! The program assembler: resolves a mnemonic, prepares the batch through its strategy and
//! emits one program per repeat count.

use crate::emit::Emitter;
use crate::errors::GenerationError;
use crate::operand::OperandSynth;
use crate::schedule::Schedule;
use crate::strategy::{BatchContext, Target, strategy_for};
use crate::tuning::Tuning;
use opbench_common::OpcodeTable;
use tracing::{debug, trace};

/// Byte widths for generic arguments and sizes for the strategies that take one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ArgumentSizes {
    #[default]
    Random,
    /// Entries beyond the end of the list are drawn at random.
    Fixed(Vec<usize>),
}

impl ArgumentSizes {
    pub fn get(&self, idx: usize) -> Option<usize> {
        match self {
            ArgumentSizes::Random => None,
            ArgumentSizes::Fixed(sizes) => sizes.get(idx).copied(),
        }
    }
}

impl From<Option<Vec<usize>>> for ArgumentSizes {
    fn from(sizes: Option<Vec<usize>>) -> Self {
        sizes.map_or(ArgumentSizes::Random, ArgumentSizes::Fixed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub mnemonic: String,
    pub op_count: usize,
    pub batch_max: usize,
    pub sizes: ArgumentSizes,
}

/// An opcode that must execute exactly `count` times in the outermost frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedExecutions {
    pub opcode: u8,
    pub count: usize,
}

impl ExpectedExecutions {
    pub fn new(opcode: u8, count: usize) -> Self {
        Self { opcode, count }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedProgram {
    pub mnemonic: String,
    pub op_count: usize,
    /// At most three operand descriptors.
    pub arguments: Vec<u64>,
    pub bytecode: Vec<u8>,
    pub expected: Option<ExpectedExecutions>,
}

impl SynthesizedProgram {
    pub fn hex(&self) -> String {
        hex::encode(&self.bytecode)
    }
}

pub struct Generator<'a> {
    table: &'a OpcodeTable,
    synth: OperandSynth,
    tuning: Tuning,
}

impl<'a> Generator<'a> {
    pub fn new(table: &'a OpcodeTable, seed: u64) -> Self {
        Self {
            table,
            synth: OperandSynth::seeded(seed),
            tuning: Tuning::default(),
        }
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Result<Self, GenerationError> {
        tuning.validate().map_err(GenerationError::InvalidTuning)?;
        self.tuning = tuning;
        Ok(self)
    }

    pub fn table(&self) -> &'a OpcodeTable {
        self.table
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn resolve(&self, mnemonic: &str) -> Result<Target, GenerationError> {
        Target::resolve(self.table, mnemonic)
    }

    /// A single program, laid out for the request's batch maximum.
    pub fn generate(
        &mut self,
        request: &GenerationRequest,
    ) -> Result<SynthesizedProgram, GenerationError> {
        let programs = self.batch(
            &request.mnemonic,
            &[request.op_count],
            request.batch_max,
            &request.sizes,
        )?;
        Ok(programs
            .into_iter()
            .next()
            .expect("one program per requested count"))
    }

    /// Programs for each of `counts`, sharing one set of operands.
    pub fn batch(
        &mut self,
        mnemonic: &str,
        counts: &[usize],
        batch_max: usize,
        sizes: &ArgumentSizes,
    ) -> Result<Vec<SynthesizedProgram>, GenerationError> {
        let target = self.resolve(mnemonic)?;
        let name = target.mnemonic();
        if let Some(op_count) = counts.iter().find(|n| **n > batch_max) {
            return Err(GenerationError::InvalidRequest {
                mnemonic: name,
                reason: format!("repeat count {op_count} exceeds the batch maximum {batch_max}"),
            });
        }

        let batch = BatchContext {
            target: &target,
            batch_max,
            sizes,
            tuning: &self.tuning,
        };
        let category = target.category();
        let blueprint = strategy_for(category).prepare(&batch, &mut self.synth)?;
        debug!(mnemonic = %name, %category, batch_max, programs = counts.len(), "Prepared batch");

        let arguments = blueprint.arguments();
        counts
            .iter()
            .map(|&op_count| {
                let mut e = Emitter::new();
                let bytecode = blueprint
                    .emit(op_count, &mut e)
                    .and_then(|()| e.finish())
                    .map_err(|source| GenerationError::Emit {
                        mnemonic: name.clone(),
                        op_count,
                        batch_max,
                        source,
                    })?;
                trace!(mnemonic = %name, op_count, len = bytecode.len(), "Emitted program");
                Ok(SynthesizedProgram {
                    mnemonic: name.clone(),
                    op_count,
                    arguments: arguments.clone(),
                    bytecode,
                    expected: blueprint.expected(op_count),
                })
            })
            .collect()
    }

    /// One batch over the schedule's counts, optionally in shuffled order.
    pub fn schedule(
        &mut self,
        mnemonic: &str,
        schedule: &Schedule,
        shuffle: bool,
        sizes: &ArgumentSizes,
    ) -> Result<Vec<SynthesizedProgram>, GenerationError> {
        schedule
            .validate()
            .map_err(|reason| GenerationError::InvalidRequest {
                mnemonic: mnemonic.to_string(),
                reason,
            })?;
        let mut counts = schedule.counts();
        if shuffle {
            self.synth.shuffle(&mut counts);
        }
        self.batch(mnemonic, &counts, schedule.batch_max(), sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn seeds_reproduce_batches() {
        let table = OpcodeTable::builtin().unwrap();
        let schedule = Schedule::Triplet { op_count: 4 };
        let run = |seed| {
            Generator::new(&table, seed)
                .schedule("EXP", &schedule, false, &ArgumentSizes::Random)
                .unwrap()
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42)[1].bytecode, run(43)[1].bytecode);
    }

    #[test]
    fn counts_beyond_the_maximum_are_rejected() {
        let table = OpcodeTable::builtin().unwrap();
        let request = GenerationRequest {
            mnemonic: "ADD".to_string(),
            op_count: 11,
            batch_max: 10,
            sizes: ArgumentSizes::Random,
        };
        assert!(matches!(
            Generator::new(&table, 0).generate(&request),
            Err(GenerationError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn deep_batches_are_rejected_before_emission() {
        let table = OpcodeTable::builtin().unwrap();
        // One void and three arguments per ADDMOD slot.
        let err = Generator::new(&table, 0)
            .batch("ADDMOD", &[0, 300], 300, &ArgumentSizes::Random)
            .unwrap_err();
        assert!(matches!(err, GenerationError::StackLimit { depth: 1201, .. }));
    }

    #[test]
    fn fixed_widths_become_descriptors() {
        let table = OpcodeTable::builtin().unwrap();
        let programs = Generator::new(&table, 0)
            .batch("SIGNEXTEND", &[1], 1, &ArgumentSizes::Fixed(vec![1, 32]))
            .unwrap();
        assert_eq!(programs[0].arguments, vec![1, 32]);
        // After the void, the second argument is pushed first.
        assert_eq!(programs[0].bytecode[2], 0x7f);
    }

    #[test]
    fn invalid_tuning_is_rejected() {
        let table = OpcodeTable::builtin().unwrap();
        let tuning = Tuning {
            call_gas: u64::MAX,
            ..Tuning::default()
        };
        assert!(matches!(
            Generator::new(&table, 0).with_tuning(tuning),
            Err(GenerationError::InvalidTuning(_))
        ));
    }
}
