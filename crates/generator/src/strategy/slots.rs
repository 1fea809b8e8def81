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

//! Real and no-op invocation slots for opcodes measured against a template of operands kept on
//! the stack.
//!
//! A real slot duplicates the template, jumps over a dead byte into the opcode and pops its
//! result. A no-op slot duplicates the same operands, jumps over a dead copy of the opcode and
//! folds the operands away with ADD. Both are padded with JUMPDEST to the same byte length and
//! instruction count, and both push and pop the same number of times.

use crate::emit::Emitter;
use crate::operand::Operand;
use opbench_common::opcode::{self, ADD, INVALID, JUMP, JUMPDEST};

/// Whether slot `idx` of `slots` is real when `real` of them must be, spreading the real slots
/// evenly across the batch.
pub(crate) fn is_real(idx: usize, real: usize, slots: usize) -> bool {
    (idx + 1) * real / slots > idx * real / slots
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct InvocationSlots {
    pub op: u8,
    /// Template items the opcode consumes.
    pub arguments: usize,
    /// Each slot pushes a slot-unique 32-byte salt beneath its copy of the template.
    pub salted: bool,
    /// The opcode leaves no result, so the template carries an extra item for the real path
    /// to pop.
    pub sink: bool,
}

impl InvocationSlots {
    /// Template items on the stack beneath the slots.
    pub fn template_len(&self) -> usize {
        self.arguments + usize::from(self.sink)
    }

    /// Deepest the stack gets above the template.
    pub fn peak_above_template(&self) -> usize {
        usize::from(self.salted) + self.template_len() + 1
    }

    fn salt(&self, slot: usize, e: &mut Emitter) {
        if self.salted {
            e.push(&Operand::word(slot as u64 + 1, 32));
        }
    }

    /// Operands the opcode consumes, salt included.
    fn consumed(&self) -> usize {
        self.arguments + usize::from(self.salted)
    }

    fn padding(&self) -> (usize, usize) {
        let diff = self.consumed() as isize - isize::from(self.sink) - 2;
        (diff.max(0) as usize, (-diff).max(0) as usize)
    }

    fn real(&self, slot: usize, e: &mut Emitter) {
        let (pad, _) = self.padding();
        self.salt(slot, e);
        let depth = self.template_len() + usize::from(self.salted);
        e.repeat(opcode::dup_n(depth), self.template_len());
        let label = e.make_label();
        e.push_label(label);
        e.op(JUMP);
        e.op(INVALID);
        e.commit_label(label);
        e.op(self.op);
        e.pop(1);
        e.repeat(JUMPDEST, pad);
    }

    fn noop(&self, slot: usize, e: &mut Emitter) {
        let (_, pad) = self.padding();
        self.salt(slot, e);
        let depth = self.consumed();
        e.repeat(opcode::dup_n(depth), self.arguments);
        let label = e.make_label();
        e.push_label(label);
        e.op(JUMP);
        e.op(self.op);
        e.commit_label(label);
        e.repeat(ADD, self.consumed() - 1);
        e.pop(1);
        e.repeat(JUMPDEST, pad);
    }

    /// Emit `slots` slots of which `real` invoke the opcode.
    pub fn emit(&self, real: usize, slots: usize, e: &mut Emitter) {
        let mut length = None;
        for slot in 0..slots {
            let start = e.offset();
            if is_real(slot, real, slots) {
                self.real(slot, e);
            } else {
                self.noop(slot, e);
            }
            let len = e.offset() - start;
            assert_eq!(
                *length.get_or_insert(len),
                len,
                "slot {slot} of {:#04x} differs in length for N={real} B={slots}",
                self.op
            );
        }
    }
}
