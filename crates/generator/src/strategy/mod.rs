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

//! Per-category synthesis strategies.
//!
//! A mnemonic resolves to a `Target`, whose `Category` selects a `Strategy` from a static table.
//! The strategy prepares a `Blueprint` once per batch, drawing every random operand the batch
//! needs, and the blueprint then emits one program for each repeat count of the batch.

mod context;
mod control;
mod curves;
mod generic;
mod memory;
mod precompile;
mod push;
mod slots;
mod storage;
mod terminal;

pub use precompile::Precompile;
pub use storage::StorageAccess;

use crate::emit::Emitter;
use crate::errors::{EmitError, GenerationError};
use crate::operand::OperandSynth;
use crate::program::{ArgumentSizes, ExpectedExecutions};
use crate::tuning::Tuning;
use opbench_common::opcode::{
    self, BALANCE, CALL, CALLCODE, CALLDATACOPY, CODECOPY, CREATE, CREATE2, DELEGATECALL,
    EXTCODECOPY, EXTCODEHASH, EXTCODESIZE, INVALID, JUMP, JUMPI, KECCAK256, LOG0, LOG4, MCOPY,
    MLOAD, MSTORE, MSTORE8, PUSH1, PUSH32, RETURN, RETURNDATACOPY, REVERT, SELFDESTRUCT, SLOAD,
    SSTORE, STATICCALL, STOP, TLOAD, TSTORE,
};
use opbench_common::{OpcodeSpec, OpcodeTable, Selection};
use std::str::FromStr;
use strum::{Display, EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Category {
    Generic,
    Push,
    Memory,
    Control,
    Context,
    Terminal,
    Storage,
    Precompile,
}

/// What a batch measures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Opcode {
        spec: OpcodeSpec,
        category: Category,
    },
    Storage {
        access: StorageAccess,
        spec: OpcodeSpec,
    },
    Precompile {
        precompile: Precompile,
        /// The STATICCALL issued against the precompile.
        call: OpcodeSpec,
    },
}

impl Target {
    /// Resolve a selection name: a storage access pattern, a precompile, or a table opcode.
    pub fn resolve(table: &OpcodeTable, mnemonic: &str) -> Result<Self, GenerationError> {
        let name = mnemonic.trim().to_ascii_uppercase();
        if let Ok(access) = StorageAccess::from_str(&name) {
            let spec = table.resolve(access.opcode_mnemonic())?.clone();
            return Ok(Target::Storage { access, spec });
        }
        if let Ok(precompile) = Precompile::from_str(&name) {
            let call = table.resolve("STATICCALL")?.clone();
            return Ok(Target::Precompile { precompile, call });
        }

        let spec = table.resolve(&name)?.clone();
        match spec.value {
            SLOAD => {
                return Self::resolve(table, StorageAccess::SloadWarm.as_ref());
            }
            SSTORE => {
                return Self::resolve(table, StorageAccess::SstoreWarmChange.as_ref());
            }
            _ => {}
        }
        let category = category_of(&spec).map_err(|reason| GenerationError::Unsupported {
            mnemonic: spec.mnemonic.clone(),
            reason,
        })?;
        Ok(Target::Opcode { spec, category })
    }

    /// Canonical name used for output rows.
    pub fn mnemonic(&self) -> String {
        match self {
            Target::Opcode { spec, .. } => spec.mnemonic.clone(),
            Target::Storage { access, .. } => access.to_string(),
            Target::Precompile { precompile, .. } => precompile.to_string(),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Target::Opcode { category, .. } => *category,
            Target::Storage { .. } => Category::Storage,
            Target::Precompile { .. } => Category::Precompile,
        }
    }

    /// The opcode executed at the repeated site.
    pub fn spec(&self) -> &OpcodeSpec {
        match self {
            Target::Opcode { spec, .. } | Target::Storage { spec, .. } => spec,
            Target::Precompile { call, .. } => call,
        }
    }
}

/// Which strategy an opcode belongs to, or why it cannot be repeated at all.
pub fn category_of(spec: &OpcodeSpec) -> Result<Category, &'static str> {
    let category = match spec.value {
        STOP | INVALID | SELFDESTRUCT => return Err("it halts execution"),
        RETURNDATACOPY => return Err("it faults without return data"),
        PUSH1..=PUSH32 => Category::Push,
        MLOAD | MSTORE | MSTORE8 | KECCAK256 | MCOPY | CALLDATACOPY | CODECOPY => Category::Memory,
        LOG0..=LOG4 => Category::Memory,
        JUMP | JUMPI => Category::Control,
        CALL | CALLCODE | DELEGATECALL | STATICCALL | CREATE | CREATE2 | EXTCODESIZE
        | EXTCODEHASH | EXTCODECOPY | BALANCE => Category::Context,
        RETURN | REVERT => Category::Terminal,
        SLOAD | SSTORE | TLOAD | TSTORE => Category::Storage,
        _ => Category::Generic,
    };
    Ok(category)
}

/// Every name the built-in strategies accept: the table opcodes that can be repeated, each
/// storage access pattern in place of the raw storage opcodes, and each precompile.
pub fn default_selection(table: &OpcodeTable) -> Selection {
    let opcodes = table
        .iter()
        .filter(|spec| matches!(category_of(spec), Ok(category) if category != Category::Storage))
        .map(|spec| spec.mnemonic.clone());
    let storage = StorageAccess::iter().map(|access| access.to_string());
    let precompiles = Precompile::iter().map(|precompile| precompile.to_string());
    Selection::new(opcodes.chain(storage).chain(precompiles))
}

/// Everything a strategy may consult while preparing a batch.
pub struct BatchContext<'a> {
    pub target: &'a Target,
    /// M, the largest repeat count any program of the batch may ask for.
    pub batch_max: usize,
    pub sizes: &'a ArgumentSizes,
    pub tuning: &'a Tuning,
}

impl BatchContext<'_> {
    /// Reject a layout whose deepest point exceeds the machine stack.
    pub fn check_depth(&self, depth: usize) -> Result<(), GenerationError> {
        if depth > opcode::MAX_STACK_DEPTH {
            return Err(GenerationError::StackLimit {
                mnemonic: self.target.mnemonic(),
                batch_max: self.batch_max,
                depth,
                limit: opcode::MAX_STACK_DEPTH,
            });
        }
        Ok(())
    }

    pub fn invalid(&self, reason: impl Into<String>) -> GenerationError {
        GenerationError::InvalidRequest {
            mnemonic: self.target.mnemonic(),
            reason: reason.into(),
        }
    }
}

pub trait Strategy: Sync {
    fn prepare(
        &self,
        batch: &BatchContext,
        synth: &mut OperandSynth,
    ) -> Result<Box<dyn Blueprint>, GenerationError>;
}

/// A prepared batch. Emitting never draws randomness, so every program of a batch sees the same
/// operands.
pub trait Blueprint {
    /// Emit the program repeating the target `op_count` times. `op_count` never exceeds the
    /// batch maximum the blueprint was prepared for.
    fn emit(&self, op_count: usize, e: &mut Emitter) -> Result<(), EmitError>;

    /// Up to three values describing the operands, recorded next to each program.
    fn arguments(&self) -> Vec<u64>;

    /// How often some opcode must execute in the program for `op_count`, when that is
    /// observable from the outermost frame.
    fn expected(&self, op_count: usize) -> Option<ExpectedExecutions>;
}

static STRATEGIES: &[(Category, &dyn Strategy)] = &[
    (Category::Push, &push::PushStrategy),
    (Category::Memory, &memory::MemoryStrategy),
    (Category::Control, &control::ControlStrategy),
    (Category::Context, &context::ContextStrategy),
    (Category::Terminal, &terminal::TerminalStrategy),
    (Category::Storage, &storage::StorageStrategy),
    (Category::Precompile, &precompile::PrecompileStrategy),
];

pub fn strategy_for(category: Category) -> &'static dyn Strategy {
    STRATEGIES
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, strategy)| *strategy)
        .unwrap_or(&generic::GenericStrategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("ADD", Category::Generic)]
    #[test_case("push0", Category::Generic; "push0 takes no immediate")]
    #[test_case("PUSH17", Category::Push)]
    #[test_case("LOG3", Category::Memory)]
    #[test_case("JUMPI", Category::Control)]
    #[test_case("EXTCODECOPY", Category::Context)]
    #[test_case("REVERT", Category::Terminal)]
    #[test_case("SSTORE_COLD_CHANGE", Category::Storage)]
    #[test_case("TLOAD", Category::Storage)]
    #[test_case("BLS12_G2MSM", Category::Precompile)]
    #[test_case("sha2-256", Category::Precompile; "precompile names are case insensitive")]
    fn categories(mnemonic: &str, category: Category) {
        let table = OpcodeTable::builtin().unwrap();
        assert_eq!(Target::resolve(&table, mnemonic).unwrap().category(), category);
    }

    #[test_case("SLOAD", "SLOAD_WARM")]
    #[test_case("SSTORE", "SSTORE_WARM_CHANGE")]
    #[test_case("ECRECOVER", "ECRECOVER")]
    fn plain_storage_resolves_to_warm_access(mnemonic: &str, canonical: &str) {
        let table = OpcodeTable::builtin().unwrap();
        assert_eq!(Target::resolve(&table, mnemonic).unwrap().mnemonic(), canonical);
    }

    #[test_case("STOP")]
    #[test_case("INVALID")]
    #[test_case("SELFDESTRUCT")]
    #[test_case("RETURNDATACOPY")]
    fn unsupported(mnemonic: &str) {
        let table = OpcodeTable::builtin().unwrap();
        assert!(matches!(
            Target::resolve(&table, mnemonic),
            Err(GenerationError::Unsupported { .. })
        ));
    }

    #[test]
    fn unknown_names_are_lookup_errors() {
        let table = OpcodeTable::builtin().unwrap();
        assert!(matches!(
            Target::resolve(&table, "FROBNICATE"),
            Err(GenerationError::Table(_))
        ));
    }

    #[test]
    fn default_selection_resolves() {
        let table = OpcodeTable::builtin().unwrap();
        let selection = default_selection(&table);
        for mnemonic in selection.iter() {
            assert!(Target::resolve(&table, mnemonic).is_ok(), "{mnemonic}");
        }
        assert!(selection.iter().any(|m| m == "SSTORE_COLD_NOCHANGE"));
        assert!(selection.iter().any(|m| m == "BLS12_PAIRING_CHECK"));
        assert!(!selection.iter().any(|m| m == "SLOAD" || m == "STOP"));
    }

    #[test]
    fn every_category_has_one_strategy() {
        for category in Category::iter().filter(|c| *c != Category::Generic) {
            assert_eq!(
                STRATEGIES.iter().filter(|(c, _)| *c == category).count(),
                1,
                "{category}"
            );
        }
    }
}
