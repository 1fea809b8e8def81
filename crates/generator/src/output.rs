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

//! Writers for the generated programs: CSV rows for the measurement harness, or bare hex lines.

use crate::program::SynthesizedProgram;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use strum::{Display, EnumString};
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// program_id, opcode, op_count, arg0, arg1, arg2, bytecode.
    #[default]
    Csv,
    /// One hex-encoded program per line.
    Hex,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("could not write programs: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not write program record: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct ProgramRecord<'a> {
    program_id: String,
    opcode: &'a str,
    op_count: usize,
    arg0: Option<u64>,
    arg1: Option<u64>,
    arg2: Option<u64>,
    bytecode: String,
}

enum Sink<W: Write> {
    Csv(csv::Writer<W>),
    Hex(W),
}

pub struct ProgramWriter<W: Write> {
    sink: Sink<W>,
    /// Programs written so far, per mnemonic.
    written: HashMap<String, usize>,
}

impl<W: Write> ProgramWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        let sink = match format {
            OutputFormat::Csv => Sink::Csv(csv::Writer::from_writer(writer)),
            OutputFormat::Hex => Sink::Hex(writer),
        };
        Self {
            sink,
            written: HashMap::new(),
        }
    }

    /// Write one program, returning its id.
    pub fn write(&mut self, program: &SynthesizedProgram) -> Result<String, OutputError> {
        let index = self.written.entry(program.mnemonic.clone()).or_default();
        let program_id = format!("{}_{}", program.mnemonic, index);
        *index += 1;

        match &mut self.sink {
            Sink::Csv(writer) => {
                let arg = |idx: usize| program.arguments.get(idx).copied();
                writer.serialize(ProgramRecord {
                    program_id: program_id.clone(),
                    opcode: &program.mnemonic,
                    op_count: program.op_count,
                    arg0: arg(0),
                    arg1: arg(1),
                    arg2: arg(2),
                    bytecode: program.hex(),
                })?;
            }
            Sink::Hex(writer) => writeln!(writer, "{}", program.hex())?,
        }
        Ok(program_id)
    }

    pub fn written(&self) -> usize {
        self.written.values().sum()
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W, OutputError> {
        match self.sink {
            Sink::Csv(writer) => writer
                .into_inner()
                .map_err(|e| OutputError::Io(e.into_error())),
            Sink::Hex(mut writer) => {
                writer.flush()?;
                Ok(writer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn program(mnemonic: &str, op_count: usize, arguments: Vec<u64>) -> SynthesizedProgram {
        SynthesizedProgram {
            mnemonic: mnemonic.to_string(),
            op_count,
            arguments,
            bytecode: vec![0x60, 0x01, 0x50],
            expected: None,
        }
    }

    #[test]
    fn csv_rows_number_programs_per_mnemonic() {
        let mut writer = ProgramWriter::new(vec![], OutputFormat::Csv);
        assert_eq!(writer.write(&program("ADD", 0, vec![4, 2])).unwrap(), "ADD_0");
        assert_eq!(writer.write(&program("MUL", 3, vec![])).unwrap(), "MUL_0");
        assert_eq!(writer.write(&program("ADD", 5, vec![4, 2])).unwrap(), "ADD_1");
        assert_eq!(writer.written(), 3);
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "program_id,opcode,op_count,arg0,arg1,arg2,bytecode\n\
             ADD_0,ADD,0,4,2,,600150\n\
             MUL_0,MUL,3,,,,600150\n\
             ADD_1,ADD,5,4,2,,600150\n"
        );
    }

    #[test]
    fn hex_lines() {
        let mut writer = ProgramWriter::new(vec![], OutputFormat::Hex);
        writer.write(&program("ADD", 0, vec![])).unwrap();
        writer.write(&program("ADD", 1, vec![])).unwrap();
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(out, "600150\n600150\n");
    }
}
