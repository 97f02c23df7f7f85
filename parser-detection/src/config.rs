// SPDX-License-Identifier: GPL-3.0-or-later

//! This module defines the configuration of the application.
//!
//! The configuration is either loaded from a file or used with default
//! values, which are defined in the code. Command line arguments may
//! override the detection settings afterwards.
//!
//! The configuration file syntax is based on the YAML format.
//! The default configuration file name is `parser-detection.yml`.
//!
//! The configuration file location is searched in the following order:
//! 1. The current working directory
//! 2. The local configuration directory of the user
//! 3. The configuration directory of the user
//! 4. The local configuration directory of the application
//! 5. The configuration directory of the application
//!
//! ```yaml
//! schema: 1.0
//!
//! detection:
//!   version_suffix: '-?\d+(\.\d+)*'
//!   style: posix
//!   triplet_segments: 4
//!
//! commands:
//!   include: []
//!   exclude:
//!     - '^/usr/bin/ccache$'
//! ```

// Re-Export the types and the loader module content.
pub use loader::{ConfigError, Loader};
pub use types::*;
pub use validation::Validator;

mod types {
    use crate::command_line::PathStyle;
    use crate::detection::pattern::DEFAULT_TRIPLET_SEGMENTS;
    use serde::Deserialize;
    use std::fmt;

    /// Represents the application configuration.
    #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Main {
        #[serde(deserialize_with = "validate_schema_version")]
        pub schema: String,
        #[serde(default)]
        pub detection: Detection,
        #[serde(default)]
        pub commands: Commands,
    }

    impl Default for Main {
        fn default() -> Self {
            Self {
                schema: String::from(SUPPORTED_SCHEMA_VERSION),
                detection: Detection::default(),
                commands: Commands::default(),
            }
        }
    }

    impl fmt::Display for Main {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "Configuration:")?;
            let yaml_string = serde_yml::to_string(self).map_err(|_| fmt::Error)?;
            for line in yaml_string.lines() {
                writeln!(f, "{}", line)?;
            }
            Ok(())
        }
    }

    /// Settings of the toolchain detection.
    #[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Detection {
        /// Regular expression of the version suffix after the compiler name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub version_suffix: Option<String>,
        /// Path convention of the build log. The default follows the host.
        #[serde(default)]
        pub style: PathStyle,
        #[serde(default = "default_triplet_segments")]
        pub triplet_segments: usize,
    }

    impl Default for Detection {
        fn default() -> Self {
            Self {
                version_suffix: None,
                style: PathStyle::default(),
                triplet_segments: default_triplet_segments(),
            }
        }
    }

    /// Selects the command lines of a build log taking part in the detection.
    ///
    /// The patterns are regular expressions matched against the command
    /// token (the compiler path as written in the log).
    ///
    /// 1. A command matching any `exclude` pattern is filtered out.
    /// 2. An empty `include` list accepts every other command.
    /// 3. Otherwise the command has to match one of the `include` patterns.
    #[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Commands {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub include: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub exclude: Vec<String>,
    }

    pub(super) const SUPPORTED_SCHEMA_VERSION: &str = "1.0";
    pub(super) const MAX_TRIPLET_SEGMENTS: usize = 8;

    fn default_triplet_segments() -> usize {
        DEFAULT_TRIPLET_SEGMENTS
    }

    // Custom deserialization function to validate the schema version
    fn validate_schema_version<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let schema: String = Deserialize::deserialize(deserializer)?;
        if schema != SUPPORTED_SCHEMA_VERSION {
            use serde::de::Error;
            Err(Error::custom(format!(
                "Unsupported schema version: {schema}. Expected: {SUPPORTED_SCHEMA_VERSION}"
            )))
        } else {
            Ok(schema)
        }
    }
}

pub mod validation {

    use super::types::*;
    use regex::Regex;
    use thiserror::Error;

    /// Trait for validating configuration objects
    pub trait Validator<T> {
        type Error: std::error::Error;

        fn validate(config: &T) -> Result<(), Self::Error>;
    }

    /// Validation errors for configuration
    #[derive(Debug, Error)]
    pub enum ValidationError {
        #[error("Empty string value for field '{field}'")]
        EmptyString { field: String },
        #[error("Invalid regular expression for field '{field}': {message}")]
        InvalidPattern { field: String, message: String },
        #[error("Value {value} of field '{field}' is above the limit {max}")]
        OutOfRange { field: &'static str, value: usize, max: usize },
        #[error("Duplicate {field} entry at: {idx}")]
        DuplicateEntry { field: &'static str, idx: usize },
        #[error("Multiple validation errors: {errors:?}")]
        Multiple { errors: Vec<ValidationError> },
    }

    /// Combinator for collecting and handling validation errors
    #[derive(Default)]
    struct ValidationCollector {
        errors: Vec<ValidationError>,
    }

    impl ValidationCollector {
        fn new() -> Self {
            Self { errors: Vec::new() }
        }

        fn add(&mut self, error: ValidationError) {
            self.errors.push(error);
        }

        fn add_result(&mut self, result: Result<(), ValidationError>) {
            if let Err(error) = result {
                match error {
                    ValidationError::Multiple { errors } => {
                        self.errors.extend(errors);
                    }
                    single_error => self.errors.push(single_error),
                }
            }
        }

        fn finish(mut self) -> Result<(), ValidationError> {
            match self.errors.len() {
                0 => Ok(()),
                1 => Err(self.errors.remove(0)),
                _ => Err(ValidationError::Multiple { errors: self.errors }),
            }
        }
    }

    /// Checks that the value is a non-empty, compilable regular expression.
    fn check_pattern(field: String, pattern: &str) -> Result<(), ValidationError> {
        if pattern.is_empty() {
            return Err(ValidationError::EmptyString { field });
        }
        Regex::new(pattern)
            .map(|_| ())
            .map_err(|error| ValidationError::InvalidPattern { field, message: error.to_string() })
    }

    impl Validator<Main> for Main {
        type Error = ValidationError;

        fn validate(config: &Main) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            collector.add_result(Detection::validate(&config.detection));
            collector.add_result(Commands::validate(&config.commands));

            collector.finish()
        }
    }

    impl Validator<Detection> for Detection {
        type Error = ValidationError;

        fn validate(config: &Detection) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            if let Some(version_suffix) = &config.version_suffix {
                collector.add_result(check_pattern(
                    String::from("detection.version_suffix"),
                    version_suffix,
                ));
            }
            if config.triplet_segments > MAX_TRIPLET_SEGMENTS {
                collector.add(ValidationError::OutOfRange {
                    field: "detection.triplet_segments",
                    value: config.triplet_segments,
                    max: MAX_TRIPLET_SEGMENTS,
                });
            }

            collector.finish()
        }
    }

    impl Validator<Commands> for Commands {
        type Error = ValidationError;

        fn validate(config: &Commands) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            for (field, patterns) in
                [("commands.include", &config.include), ("commands.exclude", &config.exclude)]
            {
                let mut seen = std::collections::HashSet::new();
                for (idx, pattern) in patterns.iter().enumerate() {
                    collector.add_result(check_pattern(format!("{}[{}]", field, idx), pattern));
                    if !seen.insert(pattern) {
                        collector.add(ValidationError::DuplicateEntry { field, idx });
                    }
                }
            }

            collector.finish()
        }
    }

}

pub mod loader {
    use super::{Main, Validator};
    use directories::{BaseDirs, ProjectDirs};
    use log::{debug, info};
    use std::fs::OpenOptions;
    use std::path::{Path, PathBuf};
    use thiserror::Error;

    const CONFIG_FILE_NAME: &str = "parser-detection.yml";

    pub struct Loader {}

    impl Loader {
        /// Loads the configuration from the specified file or the default locations.
        ///
        /// If the configuration file is specified, it will be used. Otherwise, the default locations
        /// will be searched for the configuration file. If the configuration file is not found, the
        /// default configuration will be returned.
        pub fn load(current_directory: &Path, filename: Option<&str>) -> Result<Main, ConfigError> {
            if let Some(path) = filename {
                return Self::from_file(Path::new(path));
            }

            for location in Self::file_locations(current_directory) {
                debug!("Checking configuration file: {}", location.display());
                if location.exists() {
                    return Self::from_file(location.as_path());
                }
            }
            debug!("Configuration file not found. Using the default configuration.");
            Ok(Main::default())
        }

        /// The default locations where the configuration file can be found.
        fn file_locations(current_directory: &Path) -> Vec<PathBuf> {
            let mut locations = vec![current_directory.to_path_buf()];

            if let Some(base_dirs) = BaseDirs::new() {
                locations.push(base_dirs.config_local_dir().to_path_buf());
                locations.push(base_dirs.config_dir().to_path_buf());
            }
            if let Some(proj_dirs) = ProjectDirs::from("", "", "parser-detection") {
                locations.push(proj_dirs.config_local_dir().to_path_buf());
                locations.push(proj_dirs.config_dir().to_path_buf());
            }
            // filter out duplicate elements from the list
            locations.dedup();

            locations.iter().map(|p| p.join(CONFIG_FILE_NAME)).collect()
        }

        /// Loads the configuration from the specified file.
        pub fn from_file(path: &Path) -> Result<Main, ConfigError> {
            info!("Loading configuration file: {}", path.display());

            let reader = OpenOptions::new()
                .read(true)
                .open(path)
                .map_err(|source| ConfigError::FileAccess { path: path.to_path_buf(), source })?;

            let content: Main = Self::from_reader(reader)
                .map_err(|source| ConfigError::ParseError { path: path.to_path_buf(), source })?;

            Main::validate(&content)
                .map_err(|source| ConfigError::ValidationError { path: path.to_path_buf(), source })?;

            Ok(content)
        }

        /// Define the deserialization format of the config file.
        fn from_reader<R, T>(rdr: R) -> serde_yml::Result<T>
        where
            R: std::io::Read,
            T: serde::de::DeserializeOwned,
        {
            serde_yml::from_reader(rdr)
        }
    }

    /// Represents all possible configuration-related errors.
    #[derive(Debug, Error)]
    pub enum ConfigError {
        /// Error when opening or reading a configuration file.
        #[error("Failed to access configuration file '{path}': {source}")]
        FileAccess {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        /// Error when parsing the configuration file format.
        #[error("Failed to parse configuration from file '{path}': {source}")]
        ParseError {
            path: PathBuf,
            #[source]
            source: serde_yml::Error,
        },
        /// Error when configuration validation fails.
        #[error("Configuration validation failed for '{path}': {source}")]
        ValidationError {
            path: PathBuf,
            #[source]
            source: crate::config::validation::ValidationError,
        },
    }

}
