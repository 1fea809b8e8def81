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

//! Parameters that depend on a particular fork's gas schedule rather than on how the programs
//! are structured. The constants are the defaults; a `Tuning` carries them through a run and
//! may be overridden from configuration.

use serde::{Deserialize, Serialize};

/// Bytes of memory touched once, up front, by every memory-touching program. Offsets and spans
/// of the repeated operations stay inside this region.
pub const MEMORY_REGION_BYTES: usize = 0x8000;

/// Largest span a single memory-touching occurrence reads or writes.
pub const MAX_MEMORY_SPAN: usize = 0x1000;

/// Gas forwarded with every call. Larger than any block limit, so the callee always receives
/// all but one 64th of what remains.
pub const CALL_GAS: u64 = 0xffff_ffff;

/// Gas forwarded to precompile calls whose input is rejected. Such a call consumes all of it.
pub const FAILING_CALL_GAS: u64 = 0x400;

/// Upper bound (exclusive) for SHA2-256, RIPEMD-160 and IDENTITY input offsets and sizes.
pub const HASH_INPUT_BOUND: usize = 1 << 14;

/// Upper bound for the BLAKE2F round count.
pub const MAX_BLAKE2F_ROUNDS: usize = 1 << 10;

/// Upper bound for the number of (point, scalar) pairs handed to the BLS12-381 MSM precompiles.
pub const MAX_MSM_PAIRS: usize = 128;

/// Upper bound for the number of (G1, G2) pairs handed to the BLS12-381 pairing check.
pub const MAX_PAIRING_PAIRS: usize = 16;

/// Largest span returned or reverted by the callee of a RETURN/REVERT program.
pub const MAX_RETURN_SPAN: usize = 0x400;

/// Highest memory offset any program may address with a PUSH2 operand.
pub(crate) const ADDRESSABLE_BYTES: usize = 0x1_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub memory_region_bytes: usize,
    pub max_memory_span: usize,
    pub call_gas: u64,
    pub failing_call_gas: u64,
    pub hash_input_bound: usize,
    pub max_blake2f_rounds: usize,
    pub max_msm_pairs: usize,
    pub max_pairing_pairs: usize,
    pub max_return_span: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            memory_region_bytes: MEMORY_REGION_BYTES,
            max_memory_span: MAX_MEMORY_SPAN,
            call_gas: CALL_GAS,
            failing_call_gas: FAILING_CALL_GAS,
            hash_input_bound: HASH_INPUT_BOUND,
            max_blake2f_rounds: MAX_BLAKE2F_ROUNDS,
            max_msm_pairs: MAX_MSM_PAIRS,
            max_pairing_pairs: MAX_PAIRING_PAIRS,
            max_return_span: MAX_RETURN_SPAN,
        }
    }
}

impl Tuning {
    /// Check the values are usable together, returning a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.memory_region_bytes < 32 || self.memory_region_bytes > ADDRESSABLE_BYTES {
            return Err(format!(
                "memory_region_bytes must be between 32 and {ADDRESSABLE_BYTES:#x}"
            ));
        }
        if self.max_memory_span > self.memory_region_bytes {
            return Err("max_memory_span exceeds memory_region_bytes".to_string());
        }
        if self.call_gas > u32::MAX as u64 || self.failing_call_gas > u32::MAX as u64 {
            return Err("call gas must fit in four bytes".to_string());
        }
        if self.hash_input_bound == 0 || self.hash_input_bound > self.memory_region_bytes / 2 {
            return Err("hash_input_bound must be between 1 and half the memory region".to_string());
        }
        if self.max_blake2f_rounds > u32::MAX as usize {
            return Err("max_blake2f_rounds must fit in four bytes".to_string());
        }
        if self.max_msm_pairs == 0 || self.max_pairing_pairs == 0 {
            return Err("pair bounds must be at least one".to_string());
        }
        if self.max_return_span > 0xffff {
            return Err("max_return_span must fit a PUSH2 operand".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Tuning::default().validate(), Ok(()));
    }

    #[test]
    fn oversized_region_is_rejected() {
        let tuning = Tuning {
            memory_region_bytes: 0x2_0000,
            ..Tuning::default()
        };
        assert!(tuning.validate().is_err());
    }
}
