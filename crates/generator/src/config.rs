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

use crate::output::OutputFormat;
use crate::program::ArgumentSizes;
use crate::schedule::Schedule;
use crate::tuning::Tuning;
use serde::{Deserialize, Serialize};

/// Everything a generation run needs besides the opcode table and the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub schedule: Schedule,
    /// Independent batches per mnemonic, each with freshly drawn operands.
    pub count: usize,
    pub shuffle_counts: bool,
    /// Fixed argument widths. Absent means random.
    pub argument_sizes: Option<Vec<usize>>,
    pub format: OutputFormat,
    pub verify: bool,
    pub tuning: Tuning,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            schedule: Schedule::default(),
            count: 1,
            shuffle_counts: false,
            argument_sizes: None,
            format: OutputFormat::default(),
            verify: false,
            tuning: Tuning::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn argument_sizes(&self) -> ArgumentSizes {
        self.argument_sizes.clone().into()
    }
}
