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

use crate::emit::Emitter;
use crate::errors::{EmitError, GenerationError};
use crate::operand::OperandSynth;
use crate::program::ExpectedExecutions;
use crate::scaffold::Scaffold;
use crate::strategy::{BatchContext, Blueprint, Strategy};

/// Stack-only opcodes, presented through the plain scaffold.
pub(crate) struct GenericStrategy;

struct GenericBlueprint {
    opcode: u8,
    scaffold: Scaffold,
    widths: Vec<usize>,
}

impl Strategy for GenericStrategy {
    fn prepare(
        &self,
        batch: &BatchContext,
        synth: &mut OperandSynth,
    ) -> Result<Box<dyn Blueprint>, GenerationError> {
        let spec = batch.target.spec();
        let effect = spec.stack_effect();

        let mut widths = Vec::with_capacity(effect.required);
        for idx in 0..effect.required {
            let width = match batch.sizes.get(idx) {
                Some(width) if (1..=32).contains(&width) => width,
                Some(width) => {
                    return Err(batch.invalid(format!(
                        "argument {idx} is {width} bytes wide, outside 1..=32"
                    )));
                }
                None => synth.within(1..=32),
            };
            widths.push(width);
        }
        let arguments = widths.iter().map(|width| synth.wide(*width)).collect();
        let immediate = synth.bytes(spec.immediate.unwrap_or(0));

        let scaffold = Scaffold::new(spec, arguments, immediate, batch.batch_max);
        batch.check_depth(scaffold.plan(batch.batch_max).peak_depth())?;
        Ok(Box::new(GenericBlueprint {
            opcode: spec.value,
            scaffold,
            widths,
        }))
    }
}

impl Blueprint for GenericBlueprint {
    fn emit(&self, op_count: usize, e: &mut Emitter) -> Result<(), EmitError> {
        self.scaffold.emit(op_count, e);
        Ok(())
    }

    fn arguments(&self) -> Vec<u64> {
        self.widths.iter().take(3).map(|w| *w as u64).collect()
    }

    fn expected(&self, op_count: usize) -> Option<ExpectedExecutions> {
        Some(ExpectedExecutions::new(self.opcode, op_count))
    }
}
