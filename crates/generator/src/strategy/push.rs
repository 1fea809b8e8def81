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

//! PUSH1 through PUSH32. The operand travels in the instruction itself, so occurrences are
//! emitted back to back with nothing to pop.

use crate::emit::Emitter;
use crate::errors::{EmitError, GenerationError};
use crate::operand::OperandSynth;
use crate::program::ExpectedExecutions;
use crate::strategy::{BatchContext, Blueprint, Strategy};

pub(crate) struct PushStrategy;

struct PushBlueprint {
    opcode: u8,
    width: usize,
    /// One per slot of the batch.
    immediates: Vec<Vec<u8>>,
}

impl Strategy for PushStrategy {
    fn prepare(
        &self,
        batch: &BatchContext,
        synth: &mut OperandSynth,
    ) -> Result<Box<dyn Blueprint>, GenerationError> {
        let spec = batch.target.spec();
        let width = spec.immediate.unwrap_or(0);
        batch.check_depth(batch.batch_max)?;
        let immediates = (0..batch.batch_max).map(|_| synth.bytes(width)).collect();
        Ok(Box::new(PushBlueprint {
            opcode: spec.value,
            width,
            immediates,
        }))
    }
}

impl Blueprint for PushBlueprint {
    fn emit(&self, op_count: usize, e: &mut Emitter) -> Result<(), EmitError> {
        for immediate in &self.immediates[..op_count] {
            e.op(self.opcode);
            e.raw(immediate);
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<u64> {
        vec![self.width as u64]
    }

    fn expected(&self, op_count: usize) -> Option<ExpectedExecutions> {
        Some(ExpectedExecutions::new(self.opcode, op_count))
    }
}
