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

mod args;

use crate::args::Args;
use clap::Parser;
use eyre::{WrapErr, eyre};
use opbench_common::tracing::init_tracing;
use opbench_common::{OpcodeTable, Selection};
use opbench_generator::{Generator, GeneratorConfig, ProgramWriter, SynthesizedProgram};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{debug, info};

fn load_table(args: &Args) -> Result<OpcodeTable, eyre::Report> {
    match &args.opcodes_file {
        Some(path) => OpcodeTable::from_path(path)
            .wrap_err_with(|| format!("Unable to load opcode table {path:?}")),
        None => OpcodeTable::builtin().wrap_err("Unable to load the built-in opcode table"),
    }
}

fn load_selection(args: &Args, table: &OpcodeTable) -> Result<Selection, eyre::Report> {
    let selection = match &args.selection_file {
        Some(path) => Selection::from_path(path)
            .wrap_err_with(|| format!("Unable to load selection {path:?}"))?,
        None => opbench_generator::default_selection(table),
    };
    let selection = match &args.opcode {
        Some(mnemonic) => {
            let narrowed = selection.only(mnemonic);
            if narrowed.is_empty() {
                return Err(eyre!("{mnemonic} is not in the selection"));
            }
            narrowed
        }
        None => selection,
    };
    if selection.is_empty() {
        return Err(eyre!("Nothing selected for generation"));
    }
    Ok(selection)
}

/// Generate every batch before anything is written, so a failure leaves no partial output.
fn generate(
    table: &OpcodeTable,
    selection: &Selection,
    config: &GeneratorConfig,
) -> Result<Vec<SynthesizedProgram>, eyre::Report> {
    let mut generator = Generator::new(table, config.seed).with_tuning(config.tuning)?;
    let sizes = config.argument_sizes();
    let mut programs = vec![];
    for mnemonic in selection.iter() {
        for batch in 0..config.count {
            let generated = generator
                .schedule(mnemonic, &config.schedule, config.shuffle_counts, &sizes)
                .wrap_err_with(|| format!("Unable to generate batch {batch} of {mnemonic}"))?;
            debug!(mnemonic, batch, programs = generated.len(), "Generated batch");
            programs.extend(generated);
        }
    }

    if config.verify {
        for program in &programs {
            opbench_generator::verify(table, program).wrap_err_with(|| {
                format!(
                    "{} N={} failed verification",
                    program.mnemonic, program.op_count
                )
            })?;
        }
        info!(programs = programs.len(), "Verified programs");
    }
    Ok(programs)
}

fn main() -> Result<(), eyre::Report> {
    color_eyre::install()?;
    let args: Args = Args::parse();
    init_tracing(args.debug)?;

    let config = args.load_config()?;
    let table = load_table(&args)?;
    info!(opcodes = table.len(), "Loaded opcode table");
    let selection = load_selection(&args, &table)?;
    info!(
        mnemonics = selection.len(),
        seed = config.seed,
        schedule = ?config.schedule,
        "Generating programs"
    );

    let programs = generate(&table, &selection, &config)?;

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).wrap_err_with(|| format!("Unable to create {path:?}"))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = ProgramWriter::new(sink, config.format);
    for program in &programs {
        writer.write(program)?;
    }
    let written = writer.written();
    writer.finish()?;

    let destination = args
        .output
        .as_ref()
        .map_or_else(|| "stdout".to_string(), |path| path.display().to_string());
    info!(programs = written, %destination, format = %config.format, "Wrote programs");
    Ok(())
}
