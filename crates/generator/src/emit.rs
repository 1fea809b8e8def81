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

//! Byte-level assembly buffer. Jump destinations are referenced through labels: a label is
//! pushed as a PUSH2 placeholder, committed where its JUMPDEST lands, and the placeholders are
//! patched when the buffer is finished.

use crate::errors::EmitError;
use crate::operand::Operand;
use crate::tuning::ADDRESSABLE_BYTES;
use opbench_common::opcode::{self, JUMPDEST, MSTORE, MSTORE8, POP, PUSH1, PUSH2, PUSH32};

/// A forward or backward reference to a JUMPDEST in the program being built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub u16);

#[derive(Debug)]
struct Fixup {
    label: Label,
    /// Offset of the PUSH2 immediate to patch.
    at: usize,
}

#[derive(Debug, Default)]
pub struct Emitter {
    code: Vec<u8>,
    labels: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length, i.e. the offset the next byte lands at.
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    pub fn op(&mut self, op: u8) {
        self.code.push(op);
    }

    pub fn repeat(&mut self, op: u8, count: usize) {
        self.code.extend(std::iter::repeat_n(op, count));
    }

    pub fn pop(&mut self, count: usize) {
        self.repeat(POP, count);
    }

    pub fn push(&mut self, operand: &Operand) {
        self.code.push(opcode::push_n(operand.width()));
        self.code.extend_from_slice(operand.bytes());
    }

    pub fn push_word(&mut self, value: u64, width: usize) {
        self.push(&Operand::word(value, width));
    }

    /// Push a memory offset or length as a fixed-width PUSH2.
    pub fn push_offset(&mut self, offset: usize) -> Result<(), EmitError> {
        if offset >= ADDRESSABLE_BYTES {
            return Err(EmitError::OffsetOutOfRange { offset });
        }
        self.push_word(offset as u64, 2);
        Ok(())
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    /// Write `data` into memory starting at `start`, one 32-byte MSTORE per word. A short final
    /// word is zero-padded on the right, so the bytes after `data` up to the word boundary are
    /// overwritten with zeros.
    pub fn store_memory(&mut self, start: usize, data: &[u8]) -> Result<(), EmitError> {
        for (idx, chunk) in data.chunks(32).enumerate() {
            let mut word = [0u8; 32];
            word[..chunk.len()].copy_from_slice(chunk);
            self.code.push(PUSH32);
            self.code.extend_from_slice(&word);
            self.push_offset(start + idx * 32)?;
            self.code.push(MSTORE);
        }
        Ok(())
    }

    /// Touch the last byte of `[0, bytes)` so the whole region is expanded once, up front.
    pub fn preallocate(&mut self, bytes: usize) -> Result<(), EmitError> {
        self.code.extend_from_slice(&[PUSH1, 0]);
        self.push_offset(bytes - 1)?;
        self.code.push(MSTORE8);
        Ok(())
    }

    pub fn make_label(&mut self) -> Label {
        let id = Label(self.labels.len() as u16);
        self.labels.push(None);
        id
    }

    /// Emit a PUSH2 of the label's eventual offset.
    pub fn push_label(&mut self, label: Label) {
        self.code.push(PUSH2);
        self.fixups.push(Fixup {
            label,
            at: self.code.len(),
        });
        self.code.extend_from_slice(&[0, 0]);
    }

    /// Fix the label at the current offset and emit its JUMPDEST.
    pub fn commit_label(&mut self, label: Label) {
        let position = self.code.len();
        let slot = self
            .labels
            .get_mut(label.0 as usize)
            .expect("Invalid jump fixup");
        assert!(slot.is_none(), "label {label:?} committed twice");
        *slot = Some(position);
        self.code.push(JUMPDEST);
    }

    pub fn finish(mut self) -> Result<Vec<u8>, EmitError> {
        for fixup in &self.fixups {
            let position = self.labels[fixup.label.0 as usize]
                .unwrap_or_else(|| panic!("label {:?} was never committed", fixup.label));
            if position > 0xffff {
                return Err(EmitError::DestinationOutOfRange { offset: position });
            }
            let [hi, lo] = (position as u16).to_be_bytes();
            self.code[fixup.at] = hi;
            self.code[fixup.at + 1] = lo;
        }
        Ok(self.code)
    }
}
