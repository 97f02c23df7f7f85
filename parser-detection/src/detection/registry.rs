// SPDX-License-Identifier: GPL-3.0-or-later

//! The table of known compiler drivers.
//!
//! Every entry is plain data: the literal driver name, the language the name
//! implies, the argument syntax of the toolchain and the language ids handed
//! to the external argument parser. One generic routine in the parent module
//! does the matching for all of them.
//!
//! The order of the table is the detection priority. More specific names come
//! before more general ones (`clang++` before `clang`, `c++` before `cc`), so
//! a permissive version pattern can not make a short name claim a longer one.

use serde::Serialize;
use std::fmt;

/// Language id of the C language parser.
pub const LANGUAGE_ID_C: &str = "org.eclipse.cdt.core.gcc";
/// Language id of the C++ language parser.
pub const LANGUAGE_ID_CXX: &str = "org.eclipse.cdt.core.g++";
/// Language id of the CUDA language parser.
pub const LANGUAGE_ID_CUDA: &str = "com.nvidia.cuda.toolchain.language.cuda.cu";

/// The generic language keys a caller can ask a detector about.
pub const LANGUAGE_KEYS: [&str; 3] = ["c", "cpp", "cu"];

/// The language implied by a compiler driver name.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cxx,
    Cuda,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::C => "C",
            Language::Cxx => "C++",
            Language::Cuda => "CUDA",
        };
        write!(f, "{}", name)
    }
}

/// The command line conventions of a toolchain.
///
/// It tells the caller which argument parser understands the arguments.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentSyntax {
    /// GCC and the compilers mimicking it (Clang, Intel on Linux).
    Gcc,
    /// NVIDIA CUDA compiler driver.
    Nvcc,
    /// ARM compiler toolchain (armcc, armclang).
    Arm,
    /// Microsoft Visual C++ and the compilers mimicking it.
    Msvc,
}

impl fmt::Display for ArgumentSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgumentSyntax::Gcc => "GCC",
            ArgumentSyntax::Nvcc => "NVCC",
            ArgumentSyntax::Arm => "ARM",
            ArgumentSyntax::Msvc => "MSVC",
        };
        write!(f, "{}", name)
    }
}

/// Maps a generic language key to the concrete language id.
#[derive(Debug, Eq, PartialEq)]
pub enum LanguageIds {
    /// The driver compiles one language, whatever the key is.
    Fixed(&'static str),
    /// The source file decides. Unknown keys resolve to the fallback.
    ByKey { keys: &'static [(&'static str, &'static str)], fallback: &'static str },
}

impl LanguageIds {
    pub fn resolve(&self, key: &str) -> &'static str {
        match self {
            LanguageIds::Fixed(id) => *id,
            LanguageIds::ByKey { keys, fallback } => keys
                .iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
                .map(|(_, id)| *id)
                .unwrap_or(*fallback),
        }
    }
}

/// A known compiler driver.
#[derive(Debug, Eq, PartialEq)]
pub struct Detector {
    name: &'static str,
    language: Option<Language>,
    syntax: ArgumentSyntax,
    language_ids: LanguageIds,
}

impl Detector {
    const fn new(
        name: &'static str,
        language: Option<Language>,
        syntax: ArgumentSyntax,
        language_ids: LanguageIds,
    ) -> Self {
        Self { name, language, syntax, language_ids }
    }

    /// The literal basename of the driver, without triplet, version or extension.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The language implied by the driver name, `None` when the source file decides.
    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn syntax(&self) -> ArgumentSyntax {
        self.syntax
    }

    /// Resolves a generic language key (`c`, `cpp`, `cu`) to the concrete
    /// language id understood by the argument parser of this toolchain.
    pub fn language_id(&self, key: &str) -> &'static str {
        self.language_ids.resolve(key)
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} syntax)", self.name, self.syntax)
    }
}

const C_OR_CXX: &[(&str, &str)] = &[("c", LANGUAGE_ID_C)];
const CUDA: &[(&str, &str)] = &[("cu", LANGUAGE_ID_CUDA), ("c", LANGUAGE_ID_C)];

const fn gcc_cxx(name: &'static str) -> Detector {
    Detector::new(name, Some(Language::Cxx), ArgumentSyntax::Gcc, LanguageIds::Fixed(LANGUAGE_ID_CXX))
}

const fn gcc_c(name: &'static str) -> Detector {
    Detector::new(name, Some(Language::C), ArgumentSyntax::Gcc, LanguageIds::Fixed(LANGUAGE_ID_C))
}

const fn by_source(name: &'static str, syntax: ArgumentSyntax) -> Detector {
    Detector::new(name, None, syntax, LanguageIds::ByKey { keys: C_OR_CXX, fallback: LANGUAGE_ID_CXX })
}

/// The detectors in priority order.
static DETECTORS: [Detector; 13] = [
    // GCC compatible C++ drivers
    gcc_cxx("clang++"),
    gcc_cxx("g++"),
    gcc_cxx("c++"),
    // GCC compatible C drivers
    gcc_c("clang"),
    gcc_c("gcc"),
    gcc_c("cc"),
    // Intel C/C++ on Linux
    gcc_cxx("icpc"),
    gcc_c("icc"),
    // NVIDIA CUDA
    Detector::new(
        "nvcc",
        Some(Language::Cuda),
        ArgumentSyntax::Nvcc,
        LanguageIds::ByKey { keys: CUDA, fallback: LANGUAGE_ID_CXX },
    ),
    // ARM compilers
    by_source("armclang", ArgumentSyntax::Arm),
    by_source("armcc", ArgumentSyntax::Arm),
    // MSVC and Intel C/C++ on Windows
    by_source("icl", ArgumentSyntax::Msvc),
    by_source("cl", ArgumentSyntax::Msvc),
];

/// Returns the registered detectors in priority order.
pub fn detectors() -> &'static [Detector] {
    &DETECTORS
}
