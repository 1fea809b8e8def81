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

//! JUMP and JUMPI. Every slot of the batch has the same length whether it jumps or not, so the
//! offsets of everything after the slot region are the same for every repeat count.

use crate::emit::Emitter;
use crate::errors::{EmitError, GenerationError};
use crate::operand::{Operand, OperandSynth};
use crate::program::ExpectedExecutions;
use crate::strategy::{BatchContext, Blueprint, Strategy};
use opbench_common::opcode::{ADD, JUMPDEST, JUMPI};

pub(crate) struct ControlStrategy;

struct ControlBlueprint {
    opcode: u8,
    /// Operands the jump consumes: the destination, and the condition for JUMPI.
    consumed: usize,
    /// One per slot, slot 0 first.
    conditions: Vec<Operand>,
    slots: usize,
}

impl Strategy for ControlStrategy {
    fn prepare(
        &self,
        batch: &BatchContext,
        synth: &mut OperandSynth,
    ) -> Result<Box<dyn Blueprint>, GenerationError> {
        let spec = batch.target.spec();
        let conditional = spec.value == JUMPI;
        let consumed = if conditional { 2 } else { 1 };
        let conditions = if conditional {
            (0..batch.batch_max)
                .map(|_| Operand::word(u64::from(synth.coin()), 1))
                .collect()
        } else {
            vec![]
        };

        // Base item, conditions, and one destination in flight.
        batch.check_depth(1 + conditions.len() + 1)?;
        Ok(Box::new(ControlBlueprint {
            opcode: spec.value,
            consumed,
            conditions,
            slots: batch.batch_max,
        }))
    }
}

impl Blueprint for ControlBlueprint {
    fn emit(&self, op_count: usize, e: &mut Emitter) -> Result<(), EmitError> {
        // Fillers fold their operands into whatever lies beneath; the base guarantees there
        // is something there.
        e.push(&Operand::zero());
        for condition in self.conditions.iter().rev() {
            e.push(condition);
        }

        for slot in 0..self.slots {
            let start = e.offset();
            let label = e.make_label();
            e.push_label(label);
            if slot < op_count {
                e.op(self.opcode);
                e.commit_label(label);
                e.repeat(JUMPDEST, self.consumed - 1);
            } else {
                e.repeat(ADD, self.consumed);
                e.commit_label(label);
            }
            assert_eq!(
                e.offset() - start,
                4 + self.consumed,
                "jump slot {slot} has the wrong length for N={op_count} B={}",
                self.slots
            );
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<u64> {
        vec![]
    }

    fn expected(&self, op_count: usize) -> Option<ExpectedExecutions> {
        Some(ExpectedExecutions::new(self.opcode, op_count))
    }
}
