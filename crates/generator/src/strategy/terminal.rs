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

//! RETURN and REVERT end the frame they run in, so they are measured inside a child. The
//! preamble deploys the child running the opcode and a twin that discards the same operands and
//! stops. Every slot makes one STATICCALL, against the child in real slots and against the twin
//! otherwise.

use crate::emit::Emitter;
use crate::errors::{EmitError, GenerationError};
use crate::operand::{Operand, OperandSynth};
use crate::program::ExpectedExecutions;
use crate::strategy::context::{TemplateItem, init_returning};
use crate::strategy::slots::is_real;
use crate::strategy::{BatchContext, Blueprint, Strategy};
use opbench_common::opcode::{self, POP, PUSH2, STATICCALL};

/// Items in one STATICCALL template.
const CALL_TEMPLATE: usize = 6;

pub(crate) struct TerminalStrategy;

struct TerminalBlueprint {
    /// The callee's template beneath the twin's, bottom of the stack first.
    templates: Vec<TemplateItem>,
    batch_max: usize,
    size: usize,
    offset: usize,
}

/// A runtime that loads `size` and `offset` and ends with `tail`.
fn runtime(size: usize, offset: usize, tail: &[u8]) -> Vec<u8> {
    let [size_hi, size_lo] = (size as u16).to_be_bytes();
    let [off_hi, off_lo] = (offset as u16).to_be_bytes();
    let mut code = vec![PUSH2, size_hi, size_lo, PUSH2, off_hi, off_lo];
    code.extend_from_slice(tail);
    code
}

fn call_template(init: Vec<u8>, gas: &Operand) -> Vec<TemplateItem> {
    let mut template: Vec<_> = (0..4).map(|_| TemplateItem::Word(Operand::zero())).collect();
    template.push(TemplateItem::Deploy(init));
    template.push(TemplateItem::Word(gas.clone()));
    template
}

impl Strategy for TerminalStrategy {
    fn prepare(
        &self,
        batch: &BatchContext,
        synth: &mut OperandSynth,
    ) -> Result<Box<dyn Blueprint>, GenerationError> {
        let spec = batch.target.spec();
        let limit = batch.tuning.max_return_span;
        let size = match batch.sizes.get(0) {
            Some(size) if size <= limit => size,
            Some(size) => {
                return Err(batch.invalid(format!(
                    "returned span {size:#x} exceeds {limit:#x} bytes"
                )));
            }
            None => synth.within(0..=limit),
        };
        let offset = synth.below(limit - size + 1);

        let gas = Operand::word(batch.tuning.call_gas, 4);
        let callee = init_returning(&runtime(size, offset, &[spec.value]));
        let twin = init_returning(&runtime(size, offset, &[POP, POP]));
        let mut templates = call_template(callee, &gas);
        templates.extend(call_template(twin, &gas));

        batch.check_depth(3 * CALL_TEMPLATE + 1)?;
        Ok(Box::new(TerminalBlueprint {
            templates,
            batch_max: batch.batch_max,
            size,
            offset,
        }))
    }
}

impl Blueprint for TerminalBlueprint {
    fn emit(&self, op_count: usize, e: &mut Emitter) -> Result<(), EmitError> {
        for item in &self.templates {
            item.emit(e)?;
        }
        for slot in 0..self.batch_max {
            // The callee's template sits beneath the twin's.
            let depth = if is_real(slot, op_count, self.batch_max) {
                2 * CALL_TEMPLATE
            } else {
                CALL_TEMPLATE
            };
            e.repeat(opcode::dup_n(depth), CALL_TEMPLATE);
            e.op(STATICCALL);
            e.pop(1);
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<u64> {
        vec![self.size as u64, self.offset as u64]
    }

    fn expected(&self, _op_count: usize) -> Option<ExpectedExecutions> {
        Some(ExpectedExecutions::new(STATICCALL, self.batch_max))
    }
}
