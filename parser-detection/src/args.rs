// SPDX-License-Identifier: GPL-3.0-or-later

//! This module contains the command line interface of the application.
//!
//! The command line parsing is implemented using the `clap` library.
//! The `Arguments` type is the structured form of the program invocation.

use crate::command_line::PathStyle;
use crate::config;
use crate::detection::DetectionOptions;
use crate::output::OutputFormat;
use anyhow::anyhow;
use clap::{ArgAction, ArgMatches, Command, arg, command};
use std::fmt;

const STYLE_NAMES: [&str; 2] = ["posix", "windows"];

/// Represents the command line arguments of the application.
#[derive(Debug, PartialEq)]
pub struct Arguments {
    // The path of the configuration file.
    pub config: Option<String>,
    // The requested verbosity of the logging.
    pub verbose: u8,
    // The detection settings which override the configuration file.
    pub version_suffix: Option<String>,
    pub style: Option<PathStyle>,
    pub format: OutputFormat,
    pub input: Input,
}

/// Where the command lines are coming from.
#[derive(Debug, PartialEq)]
pub enum Input {
    /// Command lines given on the command line, one per argument.
    Lines(Vec<String>),
    /// A build log file.
    File(String),
    /// A build log on the standard input.
    Stdin,
}

impl Arguments {
    /// Merges the command line overrides into the configured detection settings.
    pub fn detection_options(&self, config: &config::Detection) -> DetectionOptions {
        let mut options = DetectionOptions::from(config);
        if let Some(version_suffix) = &self.version_suffix {
            options.version_suffix = Some(version_suffix.clone());
        }
        if let Some(style) = self.style {
            options.style = style;
        }
        options
    }
}

impl TryFrom<ArgMatches> for Arguments {
    type Error = anyhow::Error;

    fn try_from(matches: ArgMatches) -> Result<Self, Self::Error> {
        let config = matches.get_one::<String>("config").map(String::to_string);
        let verbose = matches.get_count("verbose");
        let version_suffix = matches.get_one::<String>("version-suffix").map(String::to_string);
        let style = matches
            .get_one::<String>("style")
            .map(|style| match style.as_str() {
                "posix" => Ok(PathStyle::Posix),
                "windows" => Ok(PathStyle::Windows),
                _ => Err(anyhow!("unrecognized path style: {style}")),
            })
            .transpose()?;
        let format = matches
            .get_one::<String>("format")
            .map(|format| OutputFormat::try_from(format.as_str()))
            .transpose()?
            .unwrap_or_default();
        let input = Input::from(&matches);

        Ok(Arguments { config, verbose, version_suffix, style, format, input })
    }
}

impl From<&ArgMatches> for Input {
    fn from(matches: &ArgMatches) -> Self {
        if let Some(lines) = matches.get_many::<String>("COMMAND_LINE") {
            Input::Lines(lines.cloned().collect())
        } else if let Some(file) = matches.get_one::<String>("input") {
            Input::File(file.to_string())
        } else {
            Input::Stdin
        }
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arguments: format={}", self.format)?;
        if let Some(config) = &self.config {
            write!(f, ", config={}", config)?;
        }
        if let Some(version_suffix) = &self.version_suffix {
            write!(f, ", version-suffix={}", version_suffix)?;
        }
        if let Some(style) = self.style {
            write!(f, ", style={}", style)?;
        }
        match &self.input {
            Input::Lines(lines) => write!(f, ", input={} command line(s)", lines.len()),
            Input::File(file) => write!(f, ", input={}", file),
            Input::Stdin => write!(f, ", input=stdin"),
        }
    }
}

/// Represents the command line interface of the application.
///
/// The command lines to check are either given after `--`, one per
/// argument, or read as a build log from a file or the standard input.
pub fn cli() -> Command {
    command!()
        .about("Detects the compiler toolchain of build command lines")
        .args(&[
            arg!(-v --verbose ... "Sets the level of verbosity").action(ArgAction::Count),
            arg!(-c --config <FILE> "Path of the config file"),
            arg!(--"version-suffix" <REGEX> "Regular expression matching a version suffix of the compiler name")
                .allow_hyphen_values(true),
            arg!(--style <STYLE> "Path style of the command lines").value_parser(STYLE_NAMES),
            arg!(-f --format <FORMAT> "Output format")
                .value_parser(OutputFormat::NAMES)
                .default_value("text")
                .hide_default_value(false),
            arg!(-i --input <FILE> "Path of the build log").conflicts_with("COMMAND_LINE"),
            arg!([COMMAND_LINE] "Command lines to check, one per argument")
                .action(ArgAction::Append)
                .num_args(1..)
                .last(true),
        ])
}
