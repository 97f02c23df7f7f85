// SPDX-License-Identifier: GPL-3.0-or-later

pub mod args;
pub mod cmake;
pub mod command_line;
pub mod config;
pub mod detection;
pub mod output;
pub mod scan;

pub use detection::determine_detector;
