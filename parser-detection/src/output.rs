// SPDX-License-Identifier: GPL-3.0-or-later

//! Writes the scan records in the format requested by the user.
//!
//! - `text` prints one tab separated line per record,
//! - `json` prints one JSON object per line (JSON lines),
//! - `cmake` prints cache entry definitions for the detected compilers.

use crate::cmake::CacheVariableType;
use crate::detection::registry::Language;
use crate::scan::Record;
use std::collections::HashSet;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Cmake,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 3] = ["text", "json", "cmake"];
}

impl TryFrom<&str> for OutputFormat {
    type Error = OutputError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "cmake" => Ok(OutputFormat::Cmake),
            _ => Err(OutputError::UnknownFormat(value.to_owned())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Cmake => "cmake",
        };
        write!(f, "{}", name)
    }
}

/// Writes the records to the writer, returns the number of entries written.
pub fn write_records<W: io::Write>(
    mut writer: W,
    format: OutputFormat,
    records: &[Record],
) -> Result<usize, OutputError> {
    let count = match format {
        OutputFormat::Text => {
            for record in records {
                writeln!(writer, "{}", record)?;
            }
            records.len()
        }
        OutputFormat::Json => {
            for record in records {
                serde_json::to_writer(&mut writer, record)?;
                writeln!(writer)?;
            }
            records.len()
        }
        OutputFormat::Cmake => {
            let definitions = cmake_definitions(records);
            for definition in &definitions {
                writeln!(writer, "{}", definition)?;
            }
            definitions.len()
        }
    };
    writer.flush()?;

    Ok(count)
}

/// The compiler cache entries of the first detected compiler per language.
fn cmake_definitions(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();

    records
        .iter()
        .filter_map(|record| record.language.map(|language| (language, record)))
        .filter(|(language, _)| seen.insert(*language))
        .map(|(language, record)| {
            CacheVariableType::FilePath.define(compiler_variable(language), &record.command)
        })
        .collect()
}

fn compiler_variable(language: Language) -> &'static str {
    match language {
        Language::C => "CMAKE_C_COMPILER",
        Language::Cxx => "CMAKE_CXX_COMPILER",
        Language::Cuda => "CMAKE_CUDA_COMPILER",
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Unknown output format: {0}")]
    UnknownFormat(String),
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}
