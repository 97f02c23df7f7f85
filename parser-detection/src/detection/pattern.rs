// SPDX-License-Identifier: GPL-3.0-or-later

//! Construction of the regular expression that matches a compiler basename.
//!
//! A detector only knows the literal name of its driver (`gcc`, `clang++`).
//! The executable found in a build log often carries more: a cross-compiler
//! target triplet in front (`arm-none-eabi-gcc`), a version behind
//! (`gcc-9.2.0`, `clang++40`) and a file extension on Windows (`gcc.exe`).
//! This module turns the name into an anchored pattern which tolerates all
//! of these, and names the optional parts so the caller can tell which one
//! was present.

use crate::command_line::PathStyle;
use regex::Regex;

/// The number of triplet segments accepted in front of a compiler name.
///
/// `x86_64-pc-linux-gnu-` is the longest triplet in common use.
pub const DEFAULT_TRIPLET_SEGMENTS: usize = 4;

pub(crate) const GROUP_TARGET: &str = "target";
pub(crate) const GROUP_VERSION: &str = "version";
pub(crate) const GROUP_EXTENSION: &str = "extension";

/// A single triplet segment. It never contains a hyphen, so the prefix can
/// not swallow any part of the compiler name.
const TRIPLET_SEGMENT: &str = r"[A-Za-z0-9_.]+-";
const EXTENSION: &str = r"\.exe";

/// Builds the basename pattern for the given compiler name.
///
/// - `name` is a literal, it is escaped before it becomes part of the pattern.
/// - `version` is a regular expression. When present, the pattern requires
///   it right after the name.
/// - `style` selects case-insensitive matching for Windows.
/// - `triplet_segments` bounds the target triplet prefix, zero disables it.
///
/// # Examples
///
/// ```
/// use parser_detection::command_line::PathStyle;
/// use parser_detection::detection::pattern::basename_regex;
///
/// let pattern = basename_regex("g++", Some(r"-?\d+(\.\d+)*"), PathStyle::Posix, 4).unwrap();
/// assert!(pattern.is_match("arm-none-eabi-g++-9.2.0"));
/// assert!(!pattern.is_match("g++"));
/// ```
pub fn basename_regex(
    name: &str,
    version: Option<&str>,
    style: PathStyle,
    triplet_segments: usize,
) -> Result<Regex, regex::Error> {
    let mut pattern = String::from(if style.is_windows() { "(?i)^" } else { "^" });

    if triplet_segments > 0 {
        pattern.push_str(&format!(
            "(?P<{GROUP_TARGET}>(?:{TRIPLET_SEGMENT}){{1,{triplet_segments}}})?"
        ));
    }
    pattern.push_str(&regex::escape(name));
    if let Some(version) = version {
        pattern.push_str(&format!("(?P<{GROUP_VERSION}>{version})"));
    }
    pattern.push_str(&format!("(?P<{GROUP_EXTENSION}>{EXTENSION})?$"));

    Regex::new(&pattern)
}
