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

//! The opcode table: one immutable record per opcode byte, keyed by value and by mnemonic.
//!
//! External tables list at most one representative row for each of the PUSH, DUP and SWAP
//! families. Those families are generated here instead, so a loaded table always carries the
//! full PUSH1..PUSH32, DUP1..DUP16 and SWAP1..SWAP16 ranges regardless of what the file said.

use crate::opcode::{self, DUP1, JUMP, JUMPI, PUSH1, SWAP1, SWAP16};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const BUILTIN_TABLE: &str = include_str!("../data/opcodes.csv");

#[derive(Debug, Error)]
pub enum TableError {
    #[error("could not open {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: invalid {field} {value:?}")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error("opcode 0x{value:02x} is defined twice ({first} and {second})")]
    DuplicateValue {
        value: u8,
        first: String,
        second: String,
    },
    #[error("mnemonic {0} is defined twice")]
    DuplicateMnemonic(String),
    #[error("unknown mnemonic {0}")]
    UnknownMnemonic(String),
}

/// Metadata for a single opcode, as it appears in the opcode table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeSpec {
    pub value: u8,
    pub mnemonic: String,
    /// Items popped off the stack.
    pub removed: usize,
    /// Items pushed onto the stack.
    pub added: usize,
    /// Length in bytes of the immediate operand following the opcode, if it takes one.
    pub immediate: Option<usize>,
}

/// How an opcode looks to the stack scaffold: how deep the stack must be when it executes, how
/// many scaffold-supplied items it consumes and how many results it leaves behind.
///
/// This differs from the raw table arity for the families that only rearrange the stack, and for
/// jumps, whose destination is emitted by the control-flow strategy rather than the scaffold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEffect {
    pub required: usize,
    pub consumed: usize,
    pub produced: usize,
}

impl OpcodeSpec {
    pub fn stack_effect(&self) -> StackEffect {
        match self.value {
            v if opcode::is_dup(v) => StackEffect {
                required: self.removed,
                consumed: 0,
                produced: 1,
            },
            v if opcode::is_swap(v) => StackEffect {
                required: self.removed,
                consumed: 0,
                produced: 0,
            },
            JUMP | JUMPI => {
                let consumed = self.removed.saturating_sub(1);
                StackEffect {
                    required: consumed,
                    consumed,
                    produced: self.added,
                }
            }
            _ => StackEffect {
                required: self.removed,
                consumed: self.removed,
                produced: self.added,
            },
        }
    }

    fn push(width: usize) -> Self {
        Self {
            value: opcode::push_n(width),
            mnemonic: format!("PUSH{width}"),
            removed: 0,
            added: 1,
            immediate: Some(width),
        }
    }

    fn dup(depth: usize) -> Self {
        Self {
            value: opcode::dup_n(depth),
            mnemonic: format!("DUP{depth}"),
            removed: depth,
            added: depth + 1,
            immediate: None,
        }
    }

    fn swap(depth: usize) -> Self {
        Self {
            value: opcode::swap_n(depth),
            mnemonic: format!("SWAP{depth}"),
            removed: depth + 1,
            added: depth + 1,
            immediate: None,
        }
    }
}

impl Display for OpcodeSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02x})", self.mnemonic, self.value)
    }
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(rename = "Value")]
    value: String,
    #[serde(rename = "Mnemonic")]
    mnemonic: String,
    #[serde(rename = "Removed from stack")]
    removed: usize,
    #[serde(rename = "Added to stack")]
    added: usize,
    #[serde(rename = "Parameter", default)]
    parameter: Option<String>,
}

impl TableRow {
    fn into_spec(self, row: usize) -> Result<OpcodeSpec, TableError> {
        let digits = self
            .value
            .strip_prefix("0x")
            .or_else(|| self.value.strip_prefix("0X"))
            .unwrap_or(&self.value);
        let value = u8::from_str_radix(digits, 16).map_err(|_| TableError::InvalidField {
            row,
            field: "Value",
            value: self.value.clone(),
        })?;
        let mnemonic = self.mnemonic.trim().to_ascii_uppercase();
        if mnemonic.is_empty() {
            return Err(TableError::InvalidField {
                row,
                field: "Mnemonic",
                value: self.mnemonic,
            });
        }
        let immediate = match self.parameter.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(p) if p.len() % 2 == 0 && p.chars().all(|c| c.is_ascii_hexdigit()) => {
                Some(p.len() / 2)
            }
            Some(p) => {
                return Err(TableError::InvalidField {
                    row,
                    field: "Parameter",
                    value: p.to_string(),
                });
            }
        };
        Ok(OpcodeSpec {
            value,
            mnemonic,
            removed: self.removed,
            added: self.added,
            immediate,
        })
    }
}

/// Read-only repository of opcode metadata.
#[derive(Debug, Clone)]
pub struct OpcodeTable {
    by_value: BTreeMap<u8, OpcodeSpec>,
    by_mnemonic: HashMap<String, u8>,
}

impl OpcodeTable {
    /// The Cancun/Prague table compiled into the crate.
    pub fn builtin() -> Result<Self, TableError> {
        Self::from_reader(BUILTIN_TABLE.as_bytes())
    }

    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut specs = vec![];
        for (idx, row) in csv.deserialize::<TableRow>().enumerate() {
            // Header is line 1.
            specs.push(row?.into_spec(idx + 2)?);
        }
        Self::from_specs(specs)
    }

    /// Build a table from explicit entries. Entries in the PUSH1..SWAP16 byte range are dropped
    /// in favour of the generated families.
    pub fn from_specs(specs: impl IntoIterator<Item = OpcodeSpec>) -> Result<Self, TableError> {
        let mut table = Self {
            by_value: BTreeMap::new(),
            by_mnemonic: HashMap::new(),
        };
        let mut replaced = 0;
        for spec in specs {
            if (PUSH1..=SWAP16).contains(&spec.value) {
                replaced += 1;
                continue;
            }
            table.insert(spec)?;
        }
        let families = (1..=32)
            .map(OpcodeSpec::push)
            .chain((1..=16).map(OpcodeSpec::dup))
            .chain((1..=16).map(OpcodeSpec::swap));
        for spec in families {
            table.insert(spec)?;
        }
        debug!(
            opcodes = table.by_value.len(),
            replaced, "Built opcode table"
        );
        Ok(table)
    }

    fn insert(&mut self, spec: OpcodeSpec) -> Result<(), TableError> {
        if let Some(existing) = self.by_value.get(&spec.value) {
            return Err(TableError::DuplicateValue {
                value: spec.value,
                first: existing.mnemonic.clone(),
                second: spec.mnemonic,
            });
        }
        if self.by_mnemonic.contains_key(&spec.mnemonic) {
            return Err(TableError::DuplicateMnemonic(spec.mnemonic));
        }
        self.by_mnemonic.insert(spec.mnemonic.clone(), spec.value);
        self.by_value.insert(spec.value, spec);
        Ok(())
    }

    /// Look up an opcode by mnemonic, ignoring ASCII case.
    pub fn resolve(&self, mnemonic: &str) -> Result<&OpcodeSpec, TableError> {
        self.by_mnemonic
            .get(&mnemonic.to_ascii_uppercase())
            .and_then(|value| self.by_value.get(value))
            .ok_or_else(|| TableError::UnknownMnemonic(mnemonic.to_string()))
    }

    pub fn by_value(&self, value: u8) -> Option<&OpcodeSpec> {
        self.by_value.get(&value)
    }

    /// All opcodes in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = &OpcodeSpec> {
        self.by_value.values()
    }

    pub fn len(&self) -> usize {
        self.by_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }
}

// The family ranges must be contiguous for the range filter in `from_specs`.
const _: () = assert!(DUP1 == PUSH1 + 32 && SWAP1 == DUP1 + 16);
