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

use crate::table::TableError;
use itertools::Itertools;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SelectionRow {
    #[serde(rename = "Mnemonic")]
    mnemonic: String,
}

/// An ordered, de-duplicated list of mnemonics to generate programs for. Entries may name
/// table opcodes, storage pseudo-mnemonics or precompiles; they are resolved by the generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(Vec<String>);

impl Selection {
    pub fn new<S: AsRef<str>>(mnemonics: impl IntoIterator<Item = S>) -> Self {
        Self(
            mnemonics
                .into_iter()
                .map(|m| m.as_ref().trim().to_ascii_uppercase())
                .filter(|m| !m.is_empty() && !m.starts_with('#'))
                .unique()
                .collect(),
        )
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
        let rows: Vec<SelectionRow> = csv.deserialize().collect::<Result<_, _>>()?;
        Ok(Self::new(rows.into_iter().map(|r| r.mnemonic)))
    }

    /// Narrow the selection to a single mnemonic. Empty if the mnemonic was not listed.
    pub fn only(&self, mnemonic: &str) -> Self {
        let wanted = mnemonic.trim().to_ascii_uppercase();
        Self(self.0.iter().filter(|m| **m == wanted).cloned().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_mnemonic_column() {
        let csv = "Mnemonic\nadd\nSLOAD_COLD\n\nADD\nECRECOVER\n";
        let selection = Selection::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(
            selection.iter().collect::<Vec<_>>(),
            vec!["ADD", "SLOAD_COLD", "ECRECOVER"]
        );
    }

    #[test]
    fn only_keeps_listed_mnemonics() {
        let selection = Selection::new(["ADD", "MUL", "SLOAD_COLD"]);
        assert_eq!(
            selection.only("mul").iter().collect::<Vec<_>>(),
            vec!["MUL"]
        );
        assert!(selection.only("SUB").is_empty());
    }

    #[test]
    fn missing_column_is_an_error() {
        let csv = "Opcode\nADD\n";
        assert!(Selection::from_reader(csv.as_bytes()).is_err());
    }
}
