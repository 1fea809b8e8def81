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

//! Deterministic operand material. Every random choice a program makes is drawn from the one
//! seeded stream owned by `OperandSynth`, in program order, so a seed reproduces a run exactly.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::RangeInclusive;

/// A stack value in the exact big-endian encoding it is pushed with. The encoding length is the
/// PUSH width, so two operands that are numerically equal but differently sized assemble to
/// different instructions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operand(Vec<u8>);

impl Operand {
    /// `value` encoded in exactly `width` bytes, truncating high bytes beyond the width.
    pub fn word(value: u64, width: usize) -> Self {
        debug_assert!((1..=32).contains(&width));
        let be = value.to_be_bytes();
        let mut bytes = vec![0u8; width];
        let n = width.min(be.len());
        bytes[width - n..].copy_from_slice(&be[be.len() - n..]);
        Self(bytes)
    }

    /// The one-byte zero pushed for padding and placeholder slots.
    pub fn zero() -> Self {
        Self(vec![0])
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        debug_assert!((1..=32).contains(&bytes.len()));
        Self(bytes)
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

pub struct OperandSynth {
    rng: ChaCha8Rng,
}

impl OperandSynth {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Random value exactly `width` bytes wide: the leading byte is never zero.
    pub fn wide(&mut self, width: usize) -> Operand {
        let mut bytes = self.bytes(width);
        bytes[0] = self.rng.random_range(1..=u8::MAX);
        Operand::from_bytes(bytes)
    }

    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.rng.fill_bytes(&mut bytes);
        bytes
    }

    pub fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.rng.fill_bytes(&mut bytes);
        bytes
    }

    /// Uniform in `[0, bound)`; zero when `bound` is zero.
    pub fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            0
        } else {
            self.rng.random_range(0..bound)
        }
    }

    pub fn within(&mut self, range: RangeInclusive<usize>) -> usize {
        self.rng.random_range(range)
    }

    pub fn coin(&mut self) -> bool {
        self.rng.random()
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
