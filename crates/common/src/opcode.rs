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

//! Byte values of the EVM opcodes the synthesizer emits directly, independent of whichever
//! opcode table was loaded.

pub const STOP: u8 = 0x00;
pub const ADD: u8 = 0x01;
pub const KECCAK256: u8 = 0x20;
pub const BALANCE: u8 = 0x31;
pub const CALLDATACOPY: u8 = 0x37;
pub const CODECOPY: u8 = 0x39;
pub const EXTCODESIZE: u8 = 0x3b;
pub const EXTCODECOPY: u8 = 0x3c;
pub const RETURNDATACOPY: u8 = 0x3e;
pub const EXTCODEHASH: u8 = 0x3f;
pub const POP: u8 = 0x50;
pub const MLOAD: u8 = 0x51;
pub const MSTORE: u8 = 0x52;
pub const MSTORE8: u8 = 0x53;
pub const SLOAD: u8 = 0x54;
pub const SSTORE: u8 = 0x55;
pub const JUMP: u8 = 0x56;
pub const JUMPI: u8 = 0x57;
pub const JUMPDEST: u8 = 0x5b;
pub const TLOAD: u8 = 0x5c;
pub const TSTORE: u8 = 0x5d;
pub const MCOPY: u8 = 0x5e;
pub const PUSH0: u8 = 0x5f;
pub const PUSH1: u8 = 0x60;
pub const PUSH2: u8 = 0x61;
pub const PUSH4: u8 = 0x63;
pub const PUSH32: u8 = 0x7f;
pub const DUP1: u8 = 0x80;
pub const DUP16: u8 = 0x8f;
pub const SWAP1: u8 = 0x90;
pub const SWAP16: u8 = 0x9f;
pub const LOG0: u8 = 0xa0;
pub const LOG4: u8 = 0xa4;
pub const CREATE: u8 = 0xf0;
pub const CALL: u8 = 0xf1;
pub const CALLCODE: u8 = 0xf2;
pub const RETURN: u8 = 0xf3;
pub const DELEGATECALL: u8 = 0xf4;
pub const CREATE2: u8 = 0xf5;
pub const STATICCALL: u8 = 0xfa;
pub const REVERT: u8 = 0xfd;
pub const INVALID: u8 = 0xfe;
pub const SELFDESTRUCT: u8 = 0xff;

/// The largest number of items the EVM operand stack may hold.
pub const MAX_STACK_DEPTH: usize = 1024;

/// `PUSHk` for `1 <= k <= 32`.
pub fn push_n(width: usize) -> u8 {
    debug_assert!((1..=32).contains(&width), "no PUSH{width}");
    PUSH1 + (width as u8 - 1)
}

/// `DUPk` for `1 <= k <= 16`.
pub fn dup_n(depth: usize) -> u8 {
    debug_assert!((1..=16).contains(&depth), "no DUP{depth}");
    DUP1 + (depth as u8 - 1)
}

/// `SWAPk` for `1 <= k <= 16`.
pub fn swap_n(depth: usize) -> u8 {
    debug_assert!((1..=16).contains(&depth), "no SWAP{depth}");
    SWAP1 + (depth as u8 - 1)
}

/// Number of immediate bytes that follow `value` in the instruction stream.
pub fn immediate_len(value: u8) -> usize {
    if (PUSH1..=PUSH32).contains(&value) {
        (value - PUSH1 + 1) as usize
    } else {
        0
    }
}

pub fn is_push(value: u8) -> bool {
    (PUSH0..=PUSH32).contains(&value)
}

pub fn is_dup(value: u8) -> bool {
    (DUP1..=DUP16).contains(&value)
}

pub fn is_swap(value: u8) -> bool {
    (SWAP1..=SWAP16).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, 0x60)]
    #[test_case(4, 0x63)]
    #[test_case(32, 0x7f)]
    fn push_bytes(width: usize, expected: u8) {
        assert_eq!(push_n(width), expected);
        assert_eq!(immediate_len(expected), width);
    }

    #[test]
    fn dup_and_swap_ranges() {
        assert_eq!(dup_n(16), DUP16);
        assert_eq!(swap_n(16), SWAP16);
        assert!(is_dup(0x85) && !is_swap(0x85));
        assert!(is_swap(0x9a) && !is_dup(0x9a));
        assert_eq!(immediate_len(PUSH0), 0);
        assert_eq!(immediate_len(DUP1), 0);
    }
}
