// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Context;
use parser_detection::args::{self, Input};
use parser_detection::{config, output, scan};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process::ExitCode;
use std::sync::Arc;

/// Driver function of the application.
fn main() -> anyhow::Result<ExitCode> {
    // Parse the command line arguments.
    let matches = args::cli().get_matches();
    let arguments = args::Arguments::try_from(matches)?;
    // Initialize the logging system.
    init_logging(arguments.verbose);
    // Get the package name and version from Cargo
    let pkg_name = env!("CARGO_PKG_NAME");
    let pkg_version = env!("CARGO_PKG_VERSION");
    log::info!("{pkg_name} v{pkg_version}");
    let os = env::consts::OS;
    let family = env::consts::FAMILY;
    let arch = env::consts::ARCH;
    log::info!("Running on... {family}/{os} {arch}");
    log::info!("{arguments}");

    match run(arguments) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(error) => {
            log::error!("{error:#}");
            eprintln!("{pkg_name}: {error:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// The verbosity flags set the default level, `RUST_LOG` still overrides it.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(arguments: args::Arguments) -> anyhow::Result<()> {
    // Load the configuration.
    let current_directory = env::current_dir().context("Failed to get the current directory")?;
    let configuration = config::Loader::load(&current_directory, arguments.config.as_deref())?;
    log::info!("{configuration}");

    let options = arguments.detection_options(&configuration.detection);
    let statistics = scan::ScanStatistics::new();
    let scanner = scan::Scanner::new(&options, &configuration.commands, Arc::clone(&statistics))?;
    log::debug!("Scanner configured with {} path style", scanner.style());

    let records = match &arguments.input {
        Input::Lines(lines) => scanner.scan_lines(lines),
        Input::File(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open build log: {path}"))?;
            scanner.scan(BufReader::new(file))?
        }
        Input::Stdin => scanner.scan(io::stdin().lock())?,
    };
    log::info!("{statistics}");

    let written = output::write_records(io::stdout().lock(), arguments.format, &records)?;
    log::debug!("Entries written: {written}");

    Ok(())
}
