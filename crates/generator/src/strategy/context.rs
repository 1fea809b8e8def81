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

//! Opcodes that reach another account: the CALL family, CREATE and CREATE2, and the EXTCODE*
//! and BALANCE queries.
//!
//! Programs that need a target account deploy one child in the preamble. Deployment warms the
//! account, so every later access is warm whatever the repeat count. The operand template is
//! left on the stack and each slot duplicates it.

use crate::emit::Emitter;
use crate::errors::{EmitError, GenerationError};
use crate::operand::{Operand, OperandSynth};
use crate::program::ExpectedExecutions;
use crate::strategy::slots::InvocationSlots;
use crate::strategy::{BatchContext, Blueprint, Strategy};
use opbench_common::opcode::{
    self, BALANCE, CALL, CALLCODE, CREATE, CREATE2, DELEGATECALL, EXTCODECOPY, EXTCODEHASH,
    EXTCODESIZE, MSTORE, PUSH1, RETURN, STATICCALL, STOP,
};

/// Longest runtime whose init code still fits a single memory word.
const MAX_RUNTIME_LEN: usize = 23;

/// Init code returning `runtime` as the deployed code.
pub(crate) fn init_returning(runtime: &[u8]) -> Vec<u8> {
    let len = runtime.len();
    assert!(
        (1..=MAX_RUNTIME_LEN).contains(&len),
        "runtime of {len} bytes does not fit one word of init code"
    );
    let mut init = vec![opcode::push_n(len)];
    init.extend_from_slice(runtime);
    init.extend_from_slice(&[PUSH1, 0, MSTORE, PUSH1, len as u8, PUSH1, (32 - len) as u8, RETURN]);
    init
}

/// CREATE a child from `init`, leaving its address on the stack. Overwrites memory from 0 up
/// to the word boundary past the init code.
pub(crate) fn deploy(e: &mut Emitter, init: &[u8]) -> Result<(), EmitError> {
    e.store_memory(0, init)?;
    e.push_word(init.len() as u64, 1);
    e.push(&Operand::zero());
    e.push(&Operand::zero());
    e.op(CREATE);
    Ok(())
}

#[derive(Debug, Clone)]
pub(crate) enum TemplateItem {
    Word(Operand),
    /// The address of a freshly deployed child.
    Deploy(Vec<u8>),
}

impl TemplateItem {
    pub(crate) fn emit(&self, e: &mut Emitter) -> Result<(), EmitError> {
        match self {
            TemplateItem::Word(operand) => e.push(operand),
            TemplateItem::Deploy(init) => deploy(e, init)?,
        }
        Ok(())
    }
}

pub(crate) struct ContextStrategy;

struct ContextBlueprint {
    slots: InvocationSlots,
    /// Bottom of the stack first.
    template: Vec<TemplateItem>,
    preallocate: Option<usize>,
    /// Init code stored at memory 0 for CREATE and CREATE2 to read.
    stored_init: Option<Vec<u8>>,
    batch_max: usize,
    descriptors: Vec<u64>,
}

impl Strategy for ContextStrategy {
    fn prepare(
        &self,
        batch: &BatchContext,
        synth: &mut OperandSynth,
    ) -> Result<Box<dyn Blueprint>, GenerationError> {
        use TemplateItem::{Deploy, Word};

        let spec = batch.target.spec();
        let init = init_returning(&[STOP]);
        let zero = || Word(Operand::zero());
        let gas = Word(Operand::word(batch.tuning.call_gas, 4));

        let mut preallocate = None;
        let mut stored_init = None;
        let mut descriptors = vec![];
        let mut sink = false;
        let salted = spec.value == CREATE2;

        let template = match spec.value {
            CALL | CALLCODE => {
                let mut template: Vec<_> = (0..5).map(|_| zero()).collect();
                template.extend([Deploy(init), gas]);
                template
            }
            DELEGATECALL | STATICCALL => {
                let mut template: Vec<_> = (0..4).map(|_| zero()).collect();
                template.extend([Deploy(init), gas]);
                template
            }
            EXTCODESIZE | EXTCODEHASH | BALANCE => vec![Deploy(init)],
            EXTCODECOPY => {
                let region = batch.tuning.memory_region_bytes;
                let size = match batch.sizes.get(0) {
                    Some(size) if size <= batch.tuning.max_memory_span => size,
                    Some(size) => {
                        return Err(batch.invalid(format!(
                            "copy size {size:#x} exceeds the {:#x} byte span limit",
                            batch.tuning.max_memory_span
                        )));
                    }
                    None => synth.within(0..=batch.tuning.max_memory_span),
                };
                let dest = synth.below(region - size + 1);
                preallocate = Some(region);
                descriptors.push(size as u64);
                sink = true;
                vec![
                    zero(),
                    Word(Operand::word(size as u64, 2)),
                    zero(),
                    Word(Operand::word(dest as u64, 2)),
                    Deploy(init),
                ]
            }
            CREATE | CREATE2 => {
                let template = vec![
                    Word(Operand::word(init.len() as u64, 1)),
                    zero(),
                    zero(),
                ];
                descriptors.push(init.len() as u64);
                stored_init = Some(init);
                template
            }
            other => unreachable!("{other:#04x} does not reach another account"),
        };

        let slots = InvocationSlots {
            op: spec.value,
            arguments: spec.removed - usize::from(salted),
            salted,
            sink,
        };
        assert_eq!(
            template.len(),
            slots.template_len(),
            "{} template does not match its arity",
            spec.mnemonic
        );
        batch.check_depth(slots.template_len() + slots.peak_above_template())?;

        Ok(Box::new(ContextBlueprint {
            slots,
            template,
            preallocate,
            stored_init,
            batch_max: batch.batch_max,
            descriptors,
        }))
    }
}

impl Blueprint for ContextBlueprint {
    fn emit(&self, op_count: usize, e: &mut Emitter) -> Result<(), EmitError> {
        if let Some(region) = self.preallocate {
            e.preallocate(region)?;
        }
        if let Some(init) = &self.stored_init {
            e.store_memory(0, init)?;
        }
        for item in &self.template {
            item.emit(e)?;
        }
        self.slots.emit(op_count, self.batch_max, e);
        Ok(())
    }

    fn arguments(&self) -> Vec<u64> {
        self.descriptors.clone()
    }

    fn expected(&self, op_count: usize) -> Option<ExpectedExecutions> {
        Some(ExpectedExecutions::new(self.slots.op, op_count))
    }
}
