// SPDX-License-Identifier: GPL-3.0-or-later

//! Detects the compiler toolchain of a build command line.
//!
//! The detection is driven by the basename of the command only. The command
//! path is isolated by the tokenizer, the directories are stripped, and the
//! remaining name is matched against the registered detectors in priority
//! order. The matching runs in two passes:
//!
//! 1. the plain names, with optional target triplet prefix and extension,
//! 2. when the caller gave a version pattern, the same names followed by it.
//!
//! So an unversioned match always wins over a versioned one, and a version
//! pattern never changes the outcome for names which match without it.

pub mod pattern;
pub mod registry;

use crate::command_line::{CommandLine, MalformedCommandLine, PathStyle};
use pattern::{GROUP_EXTENSION, GROUP_TARGET, GROUP_VERSION};
use regex::Regex;
use registry::Detector;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which of the matching strategies recognized the command.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// The basename is the driver name (with an optional extension).
    BasenameExact,
    /// The basename carries the version suffix given by the caller.
    BasenameWithVersion,
    /// The basename carries a cross-compiler target triplet prefix.
    TargetTripletPrefixed,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchMethod::BasenameExact => "basename_exact",
            MatchMethod::BasenameWithVersion => "basename_with_version",
            MatchMethod::TargetTripletPrefixed => "target_triplet_prefixed",
        };
        write!(f, "{}", name)
    }
}

/// The outcome of a successful detection.
///
/// It is a carrier of already matched data, there is nothing to validate.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    detector: &'static Detector,
    command_line: CommandLine,
    method: MatchMethod,
    target: Option<String>,
    version: Option<String>,
    extension: bool,
}

impl Detection {
    pub fn detector(&self) -> &'static Detector {
        self.detector
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.command_line
    }

    pub fn method(&self) -> MatchMethod {
        self.method
    }

    /// The target triplet in front of the driver name, without the trailing hyphen.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The part of the basename matched by the caller's version pattern.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether the basename carried an executable file extension.
    pub fn has_extension(&self) -> bool {
        self.extension
    }

    /// Shortcut for the language id lookup of the matched detector.
    pub fn language_id(&self, key: &str) -> &'static str {
        self.detector.language_id(key)
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}: {}", self.detector, self.method, self.command_line.command())
    }
}

/// The settings of a detection run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DetectionOptions {
    /// Regular expression matching a version suffix after the driver name.
    pub version_suffix: Option<String>,
    pub style: PathStyle,
    /// Maximum number of target triplet segments in front of the driver name.
    pub triplet_segments: usize,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            version_suffix: None,
            style: PathStyle::default(),
            triplet_segments: pattern::DEFAULT_TRIPLET_SEGMENTS,
        }
    }
}

/// Errors of the detection.
///
/// Not finding a matching detector is not an error.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Malformed command line: {0}")]
    MalformedCommandLine(#[from] MalformedCommandLine),
    #[error("Invalid version suffix pattern '{pattern}': {source}")]
    InvalidVersionPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid basename pattern for '{name}': {source}")]
    InvalidBasenamePattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// A detector with all basename patterns compiled.
///
/// Building it compiles one regex per registered detector and pass, so it
/// pays off to keep it around when many command lines are checked. It is
/// immutable after construction and can be shared between threads.
#[derive(Debug)]
pub struct ParserDetector {
    style: PathStyle,
    plain: Vec<(&'static Detector, Regex)>,
    versioned: Vec<(&'static Detector, Regex)>,
}

impl ParserDetector {
    pub fn new(options: &DetectionOptions) -> Result<Self, DetectionError> {
        let plain = Self::compile(None, options)?;
        let versioned = match options.version_suffix.as_deref() {
            Some(version) => {
                Regex::new(version).map_err(|source| DetectionError::InvalidVersionPattern {
                    pattern: version.to_owned(),
                    source,
                })?;
                Self::compile(Some(version), options)?
            }
            None => vec![],
        };

        Ok(Self { style: options.style, plain, versioned })
    }

    fn compile(
        version: Option<&str>,
        options: &DetectionOptions,
    ) -> Result<Vec<(&'static Detector, Regex)>, DetectionError> {
        registry::detectors()
            .iter()
            .map(|detector| {
                pattern::basename_regex(detector.name(), version, options.style, options.triplet_segments)
                    .map(|regex| (detector, regex))
                    .map_err(|source| match version {
                        // The version pattern is the only variable part of the expression.
                        Some(version) => DetectionError::InvalidVersionPattern {
                            pattern: version.to_owned(),
                            source,
                        },
                        None => DetectionError::InvalidBasenamePattern { name: detector.name(), source },
                    })
            })
            .collect()
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    /// Tokenizes the line and detects the toolchain of its command.
    pub fn detect(&self, line: &str) -> Result<Option<Detection>, DetectionError> {
        let command_line = CommandLine::tokenize(line, self.style)?;
        Ok(self.detect_command_line(command_line))
    }

    /// Detects the toolchain of an already tokenized command line.
    pub fn detect_command_line(&self, command_line: CommandLine) -> Option<Detection> {
        let basename = self.style.basename(command_line.command());

        let (detector, captures, method) = Self::first_match(&self.plain, basename)
            .map(|(detector, captures)| {
                let method = if captures.name(GROUP_TARGET).is_some() {
                    MatchMethod::TargetTripletPrefixed
                } else {
                    MatchMethod::BasenameExact
                };
                (detector, captures, method)
            })
            .or_else(|| {
                Self::first_match(&self.versioned, basename)
                    .map(|(detector, captures)| (detector, captures, MatchMethod::BasenameWithVersion))
            })?;

        let target = captures
            .name(GROUP_TARGET)
            .map(|m| m.as_str().trim_end_matches('-').to_owned());
        let version = captures.name(GROUP_VERSION).map(|m| m.as_str().to_owned());
        let extension = captures.name(GROUP_EXTENSION).is_some();

        Some(Detection { detector, command_line, method, target, version, extension })
    }

    fn first_match<'h>(
        candidates: &[(&'static Detector, Regex)],
        basename: &'h str,
    ) -> Option<(&'static Detector, regex::Captures<'h>)> {
        candidates
            .iter()
            .find_map(|(detector, regex)| regex.captures(basename).map(|captures| (*detector, captures)))
    }
}

/// Determines the detector of a raw command line.
///
/// This is a one-shot convenience over [`ParserDetector`]: it compiles the
/// patterns for every call. `Ok(None)` means the command is not a known
/// compiler (`echo`, `cd`, ...).
///
/// # Examples
///
/// ```
/// use parser_detection::detection::determine_detector;
///
/// let detection = determine_detector("/usr/bin/clang -C blah.c", None, true).unwrap().unwrap();
/// assert_eq!(detection.detector().language_id("c"), "org.eclipse.cdt.core.gcc");
///
/// assert!(determine_detector("echo hello", None, false).unwrap().is_none());
/// ```
pub fn determine_detector(
    command_line: &str,
    version_suffix: Option<&str>,
    windows_style: bool,
) -> Result<Option<Detection>, DetectionError> {
    let options = DetectionOptions {
        version_suffix: version_suffix.map(str::to_owned),
        style: PathStyle::from_windows_flag(windows_style),
        ..DetectionOptions::default()
    };
    ParserDetector::new(&options)?.detect(command_line)
}
