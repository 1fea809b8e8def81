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

use opbench_common::opcode::{self, JUMPDEST};

/// One decoded instruction. Immediates running past the end of the code are truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub offset: usize,
    pub opcode: u8,
    pub immediate: &'a [u8],
}

impl Instruction<'_> {
    /// The immediate as an integer, if it fits in eight bytes.
    pub fn immediate_value(&self) -> Option<u64> {
        let significant = self.immediate.iter().skip_while(|b| **b == 0);
        if significant.clone().count() > 8 {
            return None;
        }
        Some(significant.fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }
}

pub struct Instructions<'a> {
    code: &'a [u8],
    pc: usize,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Instruction<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let opcode = *self.code.get(self.pc)?;
        let offset = self.pc;
        let start = offset + 1;
        let end = (start + opcode::immediate_len(opcode)).min(self.code.len());
        self.pc = start + opcode::immediate_len(opcode);
        Some(Instruction {
            offset,
            opcode,
            immediate: &self.code[start..end],
        })
    }
}

pub fn instructions(code: &[u8]) -> Instructions<'_> {
    Instructions { code, pc: 0 }
}

/// Offsets holding a JUMPDEST that is an instruction, not PUSH data.
pub fn jump_destinations(code: &[u8]) -> Vec<bool> {
    let mut valid = vec![false; code.len()];
    for instruction in instructions(code) {
        if instruction.opcode == JUMPDEST {
            valid[instruction.offset] = true;
        }
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn push_data_is_not_decoded() {
        // PUSH2 0x5b5b, JUMPDEST, PUSH1 (truncated)
        let code = [0x61, 0x5b, 0x5b, 0x5b, 0x60];
        let decoded: Vec<_> = instructions(&code).map(|i| (i.offset, i.opcode)).collect();
        assert_eq!(decoded, vec![(0, 0x61), (3, 0x5b), (4, 0x60)]);
        assert_eq!(
            jump_destinations(&code),
            vec![false, false, false, true, false]
        );
    }

    #[test]
    fn immediate_values() {
        let code = [0x63, 0x00, 0x00, 0x12, 0x34];
        let first = instructions(&code).next().unwrap();
        assert_eq!(first.immediate_value(), Some(0x1234));
        let wide = [vec![0x7f], vec![0xff; 32]].concat();
        assert_eq!(instructions(&wide).next().unwrap().immediate_value(), None);
    }
}
