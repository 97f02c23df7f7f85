// SPDX-License-Identifier: GPL-3.0-or-later

//! Runs the toolchain detection over the lines of a build log.
//!
//! A build log is mostly noise for the detection: progress messages,
//! warnings, commands of other tools. Lines which can not be tokenized are
//! skipped, the command filter of the configuration drops the commands the
//! user is not interested in, and the rest is handed to the detector. Every
//! outcome is counted in the scan statistics.

use crate::command_line::PathStyle;
use crate::config;
use crate::detection::registry::{ArgumentSyntax, LANGUAGE_KEYS, Language};
use crate::detection::{Detection, DetectionError, DetectionOptions, MatchMethod, ParserDetector};
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// One recognized compiler invocation of the build log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    /// The line number in the build log, starting from one.
    pub line: usize,
    pub command: String,
    pub arguments: String,
    pub detector: &'static str,
    pub language: Option<Language>,
    pub syntax: ArgumentSyntax,
    pub method: MatchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The language id per generic language key.
    pub language_ids: BTreeMap<&'static str, &'static str>,
}

impl Record {
    fn new(line: usize, detection: Detection) -> Self {
        let detector = detection.detector();
        let language_ids = LANGUAGE_KEYS.iter().map(|key| (*key, detector.language_id(key))).collect();

        Self {
            line,
            detector: detector.name(),
            language: detector.language(),
            syntax: detector.syntax(),
            method: detection.method(),
            target: detection.target().map(str::to_owned),
            version: detection.version().map(str::to_owned),
            language_ids,
            command: detection.command_line().command().to_owned(),
            arguments: detection.command_line().arguments().to_owned(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}\t{}", self.line, self.detector, self.method, self.command)
    }
}

/// Statistics collected during a scan.
///
/// The counters are atomic, the scanner updates them through a shared
/// reference.
#[derive(Debug, Default)]
pub struct ScanStatistics {
    /// Number of lines read from the build log.
    pub lines_read: AtomicUsize,
    /// Number of blank lines.
    pub lines_blank: AtomicUsize,
    /// Number of lines where no command token could be isolated.
    pub lines_malformed: AtomicUsize,
    /// Number of commands dropped by the include/exclude patterns.
    pub commands_filtered: AtomicUsize,
    /// Number of commands not recognized as a known compiler.
    pub commands_unrecognized: AtomicUsize,
    /// Number of commands with a detected toolchain.
    pub commands_detected: AtomicUsize,
}

impl ScanStatistics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Display for ScanStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scan statistics:")?;
        writeln!(f, "  lines read: {}", self.lines_read.load(Ordering::Relaxed))?;
        writeln!(f, "  blank lines: {}", self.lines_blank.load(Ordering::Relaxed))?;
        writeln!(f, "  malformed lines: {}", self.lines_malformed.load(Ordering::Relaxed))?;
        writeln!(f, "  filtered commands: {}", self.commands_filtered.load(Ordering::Relaxed))?;
        writeln!(f, "  unrecognized commands: {}", self.commands_unrecognized.load(Ordering::Relaxed))?;
        write!(f, "  detected commands: {}", self.commands_detected.load(Ordering::Relaxed))
    }
}

/// Selects the commands taking part in the detection.
#[derive(Debug, Default)]
pub struct CommandFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl CommandFilter {
    pub fn accepts(&self, command: &str) -> bool {
        if self.exclude.iter().any(|pattern| pattern.is_match(command)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|pattern| pattern.is_match(command))
    }
}

impl TryFrom<&config::Commands> for CommandFilter {
    type Error = ScanError;

    fn try_from(config: &config::Commands) -> Result<Self, Self::Error> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>, ScanError> {
            patterns
                .iter()
                .map(|pattern| {
                    Regex::new(pattern)
                        .map_err(|source| ScanError::InvalidCommandPattern { pattern: pattern.clone(), source })
                })
                .collect()
        };

        Ok(Self { include: compile(&config.include)?, exclude: compile(&config.exclude)? })
    }
}

impl From<&config::Detection> for DetectionOptions {
    fn from(config: &config::Detection) -> Self {
        Self {
            version_suffix: config.version_suffix.clone(),
            style: config.style,
            triplet_segments: config.triplet_segments,
        }
    }
}

/// Runs the detection line by line.
pub struct Scanner {
    detector: ParserDetector,
    filter: CommandFilter,
    statistics: Arc<ScanStatistics>,
}

impl Scanner {
    pub fn new(
        options: &DetectionOptions,
        commands: &config::Commands,
        statistics: Arc<ScanStatistics>,
    ) -> Result<Self, ScanError> {
        let detector = ParserDetector::new(options)?;
        let filter = CommandFilter::try_from(commands)?;

        Ok(Self { detector, filter, statistics })
    }

    pub fn style(&self) -> PathStyle {
        self.detector.style()
    }

    /// Scans a build log from a reader.
    ///
    /// The log is not required to be UTF-8. Invalid sequences are replaced,
    /// so a compiler message in a legacy encoding does not stop the scan.
    pub fn scan<R: BufRead>(&self, mut reader: R) -> Result<Vec<Record>, ScanError> {
        let mut records = Vec::new();
        let mut buffer = Vec::new();
        let mut number = 0;
        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer).map_err(ScanError::Read)? == 0 {
                break;
            }
            number += 1;

            let line = String::from_utf8_lossy(&buffer);
            if let Cow::Owned(_) = line {
                log::debug!("Line {number} is not valid UTF-8");
            }
            let line = line.trim_end_matches(['\n', '\r']);
            records.extend(self.scan_line(number, line));
        }
        Ok(records)
    }

    /// Scans command lines which are already in memory.
    pub fn scan_lines<I, S>(&self, lines: I) -> Vec<Record>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .enumerate()
            .filter_map(|(idx, line)| self.scan_line(idx + 1, line.as_ref()))
            .collect()
    }

    fn scan_line(&self, number: usize, line: &str) -> Option<Record> {
        ScanStatistics::increment(&self.statistics.lines_read);

        if line.trim().is_empty() {
            ScanStatistics::increment(&self.statistics.lines_blank);
            return None;
        }

        let detection = match self.detector.detect(line) {
            Ok(detection) => detection,
            Err(error) => {
                log::debug!("Line {number} skipped: {error}");
                ScanStatistics::increment(&self.statistics.lines_malformed);
                return None;
            }
        };

        match detection {
            Some(detection) if !self.filter.accepts(detection.command_line().command()) => {
                log::debug!("Line {number} filtered: {}", detection.command_line().command());
                ScanStatistics::increment(&self.statistics.commands_filtered);
                None
            }
            Some(detection) => {
                log::debug!("Line {number} detected: {detection}");
                ScanStatistics::increment(&self.statistics.commands_detected);
                Some(Record::new(number, detection))
            }
            None => {
                log::trace!("Line {number} not recognized");
                ScanStatistics::increment(&self.statistics.commands_unrecognized);
                None
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to create detector: {0}")]
    Detector(#[from] DetectionError),
    #[error("Invalid command pattern '{pattern}': {source}")]
    InvalidCommandPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Failed to read build log: {0}")]
    Read(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::registry::{LANGUAGE_ID_C, LANGUAGE_ID_CXX};

    const BUILD_LOG: &str = "\
[ 25%] Building C object CMakeFiles/app.dir/main.c.o
/usr/bin/cc -DFoo=bar -I/opt/include -o CMakeFiles/app.dir/main.c.o -c /src/main.c

[ 50%] Building CXX object CMakeFiles/app.dir/util.cpp.o
/usr/bin/arm-none-eabi-g++-9.2.0 -std=c++17 -c /src/util.cpp
\"/opt/my tools/bin/clang\" -c /src/other.c
\"/usr/bin/gcc -c /src/unterminated.c
/usr/bin/ccache /usr/bin/gcc -c /src/cached.c
";

    fn scanner(options: DetectionOptions, commands: config::Commands) -> (Scanner, Arc<ScanStatistics>) {
        let statistics = ScanStatistics::new();
        let scanner = Scanner::new(&options, &commands, Arc::clone(&statistics)).unwrap();
        (scanner, statistics)
    }

    fn posix_with_version() -> DetectionOptions {
        DetectionOptions {
            version_suffix: Some(String::from(r"-?\d+(\.\d+)*")),
            style: PathStyle::Posix,
            ..DetectionOptions::default()
        }
    }

    #[test]
    fn test_scan_build_log() {
        let (scanner, statistics) = scanner(posix_with_version(), config::Commands::default());

        let records = scanner.scan(BUILD_LOG.as_bytes()).unwrap();

        let summary: Vec<_> = records.iter().map(|r| (r.line, r.detector, r.method)).collect();
        assert_eq!(
            summary,
            vec![
                (2, "cc", MatchMethod::BasenameExact),
                (5, "g++", MatchMethod::BasenameWithVersion),
                (6, "clang", MatchMethod::BasenameExact),
            ]
        );
        assert_eq!(records[1].target.as_deref(), Some("arm-none-eabi"));
        assert_eq!(records[1].version.as_deref(), Some("-9.2.0"));
        assert_eq!(records[2].command, "/opt/my tools/bin/clang");
        assert_eq!(records[0].language_ids["c"], LANGUAGE_ID_C);
        assert_eq!(records[1].language_ids["c"], LANGUAGE_ID_CXX);

        assert_eq!(statistics.lines_read.load(Ordering::Relaxed), 8);
        assert_eq!(statistics.lines_blank.load(Ordering::Relaxed), 1);
        assert_eq!(statistics.lines_malformed.load(Ordering::Relaxed), 1);
        assert_eq!(statistics.commands_filtered.load(Ordering::Relaxed), 0);
        assert_eq!(statistics.commands_unrecognized.load(Ordering::Relaxed), 3);
        assert_eq!(statistics.commands_detected.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_scan_with_exclude_filter() {
        let commands = config::Commands { include: vec![], exclude: vec![String::from("^/opt/")] };
        let (scanner, statistics) = scanner(posix_with_version(), commands);

        let records = scanner.scan(BUILD_LOG.as_bytes()).unwrap();

        assert!(records.iter().all(|r| r.detector != "clang"));
        assert_eq!(statistics.commands_filtered.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_scan_with_include_filter() {
        let commands = config::Commands { include: vec![String::from("arm-none-eabi")], exclude: vec![] };
        let (scanner, statistics) = scanner(posix_with_version(), commands);

        let records = scanner.scan(BUILD_LOG.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].detector, "g++");
        assert_eq!(statistics.commands_filtered.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_scan_lines() {
        let options = DetectionOptions { style: PathStyle::Windows, ..DetectionOptions::default() };
        let (scanner, _) = scanner(options, config::Commands::default());

        let records = scanner.scan_lines(["C:\\MinGW\\bin\\GCC.EXE -c a.c", "cd build", "cl.exe /c a.c"]);

        let names: Vec<_> = records.iter().map(|r| (r.line, r.detector)).collect();
        assert_eq!(names, vec![(1, "gcc"), (3, "cl")]);
        assert_eq!(records[1].syntax, ArgumentSyntax::Msvc);
        assert_eq!(records[1].language, None);
    }

    #[test]
    fn test_scan_log_with_invalid_utf8() {
        let (scanner, statistics) = scanner(posix_with_version(), config::Commands::default());
        let log: &[u8] = b"/usr/bin/gcc -c a.c\ncaf\xe9 au lait\n/usr/bin/g++ -c \xe9t\xe9.cpp\r\n";

        let records = scanner.scan(log).unwrap();

        let names: Vec<_> = records.iter().map(|r| (r.line, r.detector)).collect();
        assert_eq!(names, vec![(1, "gcc"), (3, "g++")]);
        assert_eq!(records[1].arguments, "-c \u{FFFD}t\u{FFFD}.cpp");
        assert_eq!(statistics.lines_read.load(Ordering::Relaxed), 3);
        assert_eq!(statistics.commands_unrecognized.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_scan_last_line_without_newline() {
        let (scanner, _) = scanner(posix_with_version(), config::Commands::default());

        let records = scanner.scan("echo start\r\nclang -c a.c".as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line, 2);
        assert_eq!(records[0].arguments, "-c a.c");
    }

    #[test]
    fn test_invalid_command_pattern() {
        let commands = config::Commands { include: vec![String::from("(gcc")], exclude: vec![] };

        let result = Scanner::new(&DetectionOptions::default(), &commands, ScanStatistics::new());

        assert!(matches!(result, Err(ScanError::InvalidCommandPattern { .. })));
    }

    #[test]
    fn test_invalid_version_suffix() {
        let options = DetectionOptions { version_suffix: Some(String::from("[0-9")), ..DetectionOptions::default() };

        let result = Scanner::new(&options, &config::Commands::default(), ScanStatistics::new());

        assert!(matches!(result, Err(ScanError::Detector(DetectionError::InvalidVersionPattern { .. }))));
    }

    #[test]
    fn test_options_from_config() {
        let config = config::Detection {
            version_suffix: Some(String::from("40")),
            style: PathStyle::Windows,
            triplet_segments: 2,
        };

        let options = DetectionOptions::from(&config);

        assert_eq!(options.version_suffix.as_deref(), Some("40"));
        assert_eq!(options.style, PathStyle::Windows);
        assert_eq!(options.triplet_segments, 2);
    }

    #[test]
    fn test_record_serialization() {
        let (scanner, _) = scanner(posix_with_version(), config::Commands::default());
        let records = scanner.scan_lines(["arm-none-eabi-gcc -c a.c"]);

        let json = serde_json::to_value(&records[0]).unwrap();

        assert_eq!(json["detector"], "gcc");
        assert_eq!(json["method"], "target_triplet_prefixed");
        assert_eq!(json["target"], "arm-none-eabi");
        assert_eq!(json["language"], "c");
        assert_eq!(json["syntax"], "gcc");
        assert_eq!(json["language_ids"]["cpp"], LANGUAGE_ID_C);
        assert!(json.get("version").is_none());
    }

    #[test]
    fn test_statistics_display() {
        let statistics = ScanStatistics::default();
        statistics.lines_read.store(3, Ordering::Relaxed);
        statistics.commands_detected.store(1, Ordering::Relaxed);

        let text = statistics.to_string();

        assert!(text.contains("lines read: 3"));
        assert!(text.ends_with("detected commands: 1"));
    }
}
