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

use clap::builder::ValueHint;
use clap_derive::{Parser, ValueEnum};
use eyre::eyre;
use figment::Figment;
use figment::providers::{Format as ProviderFormat, Serialized, Yaml};
use opbench_generator::{GeneratorConfig, OutputFormat, Schedule};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Hex,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Hex => OutputFormat::Hex,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "opgen", about = "Generate EVM programs repeating one operation N times")]
pub struct Args {
    #[arg(
        long,
        value_name = "opcodes-file",
        help = "Opcode table (CSV) to use instead of the built-in one",
        value_hint = ValueHint::FilePath
    )]
    pub opcodes_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "selection-file",
        help = "CSV with a Mnemonic column naming what to generate. Defaults to every supported opcode, storage access and precompile",
        value_hint = ValueHint::FilePath
    )]
    pub selection_file: Option<PathBuf>,

    #[arg(long, help = "Generate programs for this mnemonic only")]
    pub opcode: Option<String>,

    #[arg(
        long,
        help = "Emit the triplet schedule 0, n and 2n",
        conflicts_with = "max_op_count"
    )]
    pub op_count: Option<usize>,

    #[arg(long, help = "Emit a stepped schedule 0, step, ... up to this count")]
    pub max_op_count: Option<usize>,

    #[arg(long, help = "Step of the stepped schedule", requires = "max_op_count")]
    pub step_op_count: Option<usize>,

    #[arg(long, help = "Independent batches per mnemonic, each with fresh operands")]
    pub count: Option<usize>,

    #[arg(long, help = "Shuffle the repeat counts of each batch")]
    pub shuffle_counts: bool,

    #[arg(long, help = "Seed for operand generation")]
    pub seed: Option<u64>,

    #[arg(
        long,
        help = "Fixed argument widths in bytes, comma separated",
        value_delimiter = ','
    )]
    pub argument_sizes: Option<Vec<usize>>,

    #[arg(long, value_enum, help = "Output format")]
    pub format: Option<FormatArg>,

    #[arg(
        short,
        long,
        value_name = "output",
        help = "Write programs to this file instead of stdout",
        value_hint = ValueHint::FilePath
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Simulate every program and fail if its stack use or execution count is wrong"
    )]
    pub verify: bool,

    #[arg(
        long,
        value_name = "config",
        help = "Path to configuration (YAML) file to use, if any. Command line arguments override its values",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[arg(long, help = "Enable debug logging")]
    pub debug: bool,
}

impl Args {
    fn merge_config(&self, mut config: GeneratorConfig) -> Result<GeneratorConfig, eyre::Report> {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(op_count) = self.op_count {
            config.schedule = Schedule::Triplet { op_count };
        }
        if let Some(max) = self.max_op_count {
            config.schedule = Schedule::Stepped {
                max,
                step: self.step_op_count.unwrap_or(1),
            };
        }
        config.schedule.validate().map_err(|e| eyre!("Invalid schedule: {e}"))?;
        if let Some(count) = self.count {
            config.count = count;
        }
        if self.shuffle_counts {
            config.shuffle_counts = true;
        }
        if let Some(sizes) = &self.argument_sizes {
            config.argument_sizes = Some(sizes.clone());
        }
        if let Some(format) = self.format {
            config.format = format.into();
        }
        if self.verify {
            config.verify = true;
        }
        Ok(config)
    }

    /// Load the configuration file if we have it, and then merge the arguments into it.
    pub fn load_config(&self) -> Result<GeneratorConfig, eyre::Report> {
        let config = match &self.config_file {
            Some(config_path) => Figment::new()
                .merge(Serialized::defaults(GeneratorConfig::default()))
                .merge(Yaml::file(config_path))
                .extract::<GeneratorConfig>()
                .map_err(|e| {
                    eyre!("Failed to parse configuration from {config_path:?}: {e}")
                })?,
            None => GeneratorConfig::default(),
        };
        self.merge_config(config)
    }
}
