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

//! Synthesis of EVM programs that execute one operation a chosen number of times, with every
//! other cost held constant across the repeat counts of a batch.

pub use crate::config::GeneratorConfig;
pub use crate::emit::{Emitter, Label};
pub use crate::errors::{EmitError, GenerationError};
pub use crate::operand::{Operand, OperandSynth};
pub use crate::output::{OutputError, OutputFormat, ProgramWriter};
pub use crate::program::{
    ArgumentSizes, ExpectedExecutions, GenerationRequest, Generator, SynthesizedProgram,
};
pub use crate::schedule::Schedule;
pub use crate::simulate::{SimulationError, StackSimulator, Trace, verify};
pub use crate::strategy::{Category, Precompile, StorageAccess, Target, default_selection};

mod config;
pub mod disasm;
mod emit;
mod errors;
mod operand;
mod output;
mod program;
pub mod scaffold;
mod schedule;
mod simulate;
pub mod strategy;
pub mod tuning;
