// SPDX-License-Identifier: GPL-3.0-or-later

//! The types of CMake cache variables.
//!
//! The detected toolchain is usually handed back to a CMake project as cache
//! entries (`-DCMAKE_C_COMPILER:FILEPATH=/usr/bin/gcc`). This module knows
//! the type tags CMake accepts in these definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheVariableType {
    /// Boolean ON/OFF value.
    Bool,
    /// Path to a file on disk.
    #[serde(rename = "FILEPATH")]
    FilePath,
    /// Path to a directory on disk.
    Path,
    /// A line of text.
    String,
    /// A line of text, not shown in the CMake GUIs.
    Internal,
}

impl CacheVariableType {
    pub const ALL: [CacheVariableType; 5] = [
        CacheVariableType::Bool,
        CacheVariableType::FilePath,
        CacheVariableType::Path,
        CacheVariableType::String,
        CacheVariableType::Internal,
    ];

    /// The type tag as it appears in a `-D<var>:<type>=<value>` argument.
    pub fn as_cmake_arg(&self) -> &'static str {
        match self {
            CacheVariableType::Bool => "BOOL",
            CacheVariableType::FilePath => "FILEPATH",
            CacheVariableType::Path => "PATH",
            CacheVariableType::String => "STRING",
            CacheVariableType::Internal => "INTERNAL",
        }
    }

    /// Formats a cache entry definition for the CMake command line.
    pub fn define(&self, name: &str, value: &str) -> String {
        format!("-D{}:{}={}", name, self.as_cmake_arg(), value)
    }
}

impl fmt::Display for CacheVariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cmake_arg())
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("Unknown CMake cache variable type: {0}")]
pub struct UnknownCacheVariableType(String);

impl FromStr for CacheVariableType {
    type Err = UnknownCacheVariableType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_cmake_arg().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCacheVariableType(s.to_owned()))
    }
}
