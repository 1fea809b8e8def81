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

use opbench_common::TableError;
use thiserror::Error;

/// Failures while laying out bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("jump destination {offset:#x} does not fit a PUSH2 address")]
    DestinationOutOfRange { offset: usize },
    #[error("memory offset {offset:#x} does not fit a PUSH2 operand")]
    OffsetOutOfRange { offset: usize },
}

/// Configuration errors. Each is raised before any bytecode is returned to the caller.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("{mnemonic} cannot be benchmarked: {reason}")]
    Unsupported {
        mnemonic: String,
        reason: &'static str,
    },
    #[error("invalid request for {mnemonic}: {reason}")]
    InvalidRequest { mnemonic: String, reason: String },
    #[error(
        "{mnemonic} with batch maximum {batch_max} needs {depth} stack items, more than the {limit} available"
    )]
    StackLimit {
        mnemonic: String,
        batch_max: usize,
        depth: usize,
        limit: usize,
    },
    #[error("{mnemonic} N={op_count} B={batch_max}: {source}")]
    Emit {
        mnemonic: String,
        op_count: usize,
        batch_max: usize,
        #[source]
        source: EmitError,
    },
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),
    #[error("could not build {precompile} input: {reason}")]
    Material { precompile: String, reason: String },
}
