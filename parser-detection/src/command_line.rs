// SPDX-License-Identifier: GPL-3.0-or-later

//! Splits a raw build command line into the command token and the rest.
//!
//! Only as much of the shell grammar is understood as it takes to isolate the
//! first token: a leading double or single quote, quoted sections inside an
//! unquoted token, and backslash escapes on POSIX-style lines. The remainder
//! of the line is kept as one unparsed string, it belongs to the argument
//! parser of the detected toolchain.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The path convention of the build that produced a command line.
///
/// It decides which characters separate directories, whether a backslash
/// escapes the next character, and whether executable names compare
/// case-insensitively.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    Posix,
    Windows,
}

/// The default path style follows the host operating system.
impl Default for PathStyle {
    #[cfg(not(windows))]
    fn default() -> Self {
        PathStyle::Posix
    }

    #[cfg(windows)]
    fn default() -> Self {
        PathStyle::Windows
    }
}

impl PathStyle {
    pub fn from_windows_flag(windows_style: bool) -> Self {
        if windows_style {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, PathStyle::Windows)
    }

    /// Both slash and backslash separate directories on Windows.
    pub fn is_separator(&self, c: char) -> bool {
        match self {
            PathStyle::Posix => c == '/',
            PathStyle::Windows => c == '/' || c == '\\',
        }
    }

    /// Returns the last path component of the given command.
    ///
    /// The path is not normalized, a trailing separator yields an empty
    /// basename.
    pub fn basename<'a>(&self, path: &'a str) -> &'a str {
        path.rsplit(|c| self.is_separator(c)).next().unwrap_or(path)
    }
}

impl fmt::Display for PathStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStyle::Posix => write!(f, "posix"),
            PathStyle::Windows => write!(f, "windows"),
        }
    }
}

/// A command line split into the command and its unparsed arguments.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CommandLine {
    command: String,
    arguments: String,
}

impl CommandLine {
    /// The command token with quotes and escapes removed.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Everything after the command token and the whitespace following it.
    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    /// Splits the raw line into command and arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use parser_detection::command_line::{CommandLine, PathStyle};
    ///
    /// let line = CommandLine::tokenize("\"/us r/bi n/cc\" -DFoo=bar -C blah.c", PathStyle::Posix).unwrap();
    /// assert_eq!(line.command(), "/us r/bi n/cc");
    /// assert_eq!(line.arguments(), "-DFoo=bar -C blah.c");
    /// ```
    pub fn tokenize(line: &str, style: PathStyle) -> Result<Self, MalformedCommandLine> {
        let line = line.trim_start();
        match line.chars().next() {
            None => Err(MalformedCommandLine::Empty),
            Some(quote @ ('"' | '\'')) => Self::split_quoted(line, quote),
            Some(_) => Self::split_unquoted(line, style),
        }
    }

    /// The command is everything up to the next quote of the same kind.
    ///
    /// Nested quoting is not modeled: the first matching quote closes the
    /// token, even when it is glued to the following text.
    fn split_quoted(line: &str, quote: char) -> Result<Self, MalformedCommandLine> {
        let body = &line[quote.len_utf8()..];
        let end = body.find(quote).ok_or(MalformedCommandLine::UnterminatedQuote { quote })?;

        let command = &body[..end];
        if command.is_empty() {
            return Err(MalformedCommandLine::EmptyCommand);
        }
        let arguments = body[end + quote.len_utf8()..].trim_start();

        Ok(Self { command: command.to_owned(), arguments: arguments.to_owned() })
    }

    /// The command ends at the first whitespace that is not escaped or quoted.
    fn split_unquoted(line: &str, style: PathStyle) -> Result<Self, MalformedCommandLine> {
        let mut command = String::with_capacity(line.len());
        let mut quote: Option<char> = None;
        let mut end = line.len();

        let mut chars = line.char_indices();
        while let Some((idx, c)) = chars.next() {
            match quote {
                Some(open) if c == open => quote = None,
                Some(_) => command.push(c),
                None => match c {
                    _ if c.is_whitespace() => {
                        end = idx;
                        break;
                    }
                    '"' => quote = Some(c),
                    // An apostrophe is a plain character of a Windows path.
                    '\'' if !style.is_windows() => quote = Some(c),
                    '\\' if !style.is_windows() => match chars.next() {
                        Some((_, escaped)) => command.push(escaped),
                        None => command.push(c),
                    },
                    _ => command.push(c),
                },
            }
        }

        if let Some(quote) = quote {
            return Err(MalformedCommandLine::UnterminatedQuote { quote });
        }
        if command.is_empty() {
            return Err(MalformedCommandLine::EmptyCommand);
        }
        let arguments = line[end..].trim_start();

        Ok(Self { command, arguments: arguments.to_owned() })
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.arguments.is_empty() {
            write!(f, "{}", self.command)
        } else {
            write!(f, "{} {}", self.command, self.arguments)
        }
    }
}

/// The reasons a command token can not be isolated from a line.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum MalformedCommandLine {
    #[error("Command line is empty")]
    Empty,
    #[error("Unterminated {quote} quote in command line")]
    UnterminatedQuote { quote: char },
    #[error("Command is empty")]
    EmptyCommand,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn posix(line: &str) -> CommandLine {
        CommandLine::tokenize(line, PathStyle::Posix).unwrap()
    }

    fn windows(line: &str) -> CommandLine {
        CommandLine::tokenize(line, PathStyle::Windows).unwrap()
    }

    #[test]
    fn test_unquoted_command() {
        let result = posix("/usr/bin/gcc -c -o main.o main.c");
        assert_eq!(result.command(), "/usr/bin/gcc");
        assert_eq!(result.arguments(), "-c -o main.o main.c");
    }

    #[test]
    fn test_command_without_arguments() {
        let result = posix("  cc");
        assert_eq!(result.command(), "cc");
        assert_eq!(result.arguments(), "");
    }

    #[test]
    fn test_leading_whitespace_is_ignored() {
        let result = posix(" \t gcc \t -c main.c");
        assert_eq!(result.command(), "gcc");
        assert_eq!(result.arguments(), "-c main.c");
    }

    #[test]
    fn test_double_quoted_command() {
        let result = posix("\"/us r/bi n/cc\" -DFoo=bar \"quoted\" 'quoted' -C blah.c");
        assert_eq!(result.command(), "/us r/bi n/cc");
        assert_eq!(result.arguments(), "-DFoo=bar \"quoted\" 'quoted' -C blah.c");
    }

    #[test]
    fn test_single_quoted_command() {
        let result = posix("'C;/us r/bi n/cc' -C blah.c");
        assert_eq!(result.command(), "C;/us r/bi n/cc");
        assert_eq!(result.arguments(), "-C blah.c");
    }

    #[test]
    fn test_quoted_command_keeps_other_quote_kind() {
        let result = posix("\"it's/cc\" -c a.c");
        assert_eq!(result.command(), "it's/cc");
    }

    #[test]
    fn test_quoted_command_glued_to_arguments() {
        let result = posix("\"gcc\"-c main.c");
        assert_eq!(result.command(), "gcc");
        assert_eq!(result.arguments(), "-c main.c");
    }

    #[test]
    fn test_windows_backslash_is_a_separator() {
        let result = windows("C:\\MinGW\\bin\\gcc.exe -c main.c");
        assert_eq!(result.command(), "C:\\MinGW\\bin\\gcc.exe");
        assert_eq!(result.arguments(), "-c main.c");

        let result = windows("\"C;\\us r\\bi n\\cc.exe\" -C blah.c");
        assert_eq!(result.command(), "C;\\us r\\bi n\\cc.exe");
    }

    #[test]
    fn test_windows_apostrophe_is_literal() {
        let result = windows("C:\\Users\\O'Neil\\bin\\gcc.exe -c a.c");
        assert_eq!(result.command(), "C:\\Users\\O'Neil\\bin\\gcc.exe");
        assert_eq!(result.arguments(), "-c a.c");

        let result = windows("C:\\Users\\O'Neil\\\"my tools\"\\cl.exe /c a.c");
        assert_eq!(result.command(), "C:\\Users\\O'Neil\\my tools\\cl.exe");
    }

    #[test]
    fn test_posix_backslash_escapes() {
        let result = posix("/opt/my\\ tools/gcc -c main.c");
        assert_eq!(result.command(), "/opt/my tools/gcc");
        assert_eq!(result.arguments(), "-c main.c");

        let result = posix("gcc\\");
        assert_eq!(result.command(), "gcc\\");
    }

    #[test]
    fn test_quoted_section_inside_token() {
        let result = posix("/opt/\"my tools\"/gcc -c main.c");
        assert_eq!(result.command(), "/opt/my tools/gcc");
        assert_eq!(result.arguments(), "-c main.c");
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(CommandLine::tokenize("", PathStyle::Posix), Err(MalformedCommandLine::Empty));
        assert_eq!(CommandLine::tokenize(" \t ", PathStyle::Windows), Err(MalformedCommandLine::Empty));
        assert_eq!(
            CommandLine::tokenize("\"/usr/bin/gcc -c main.c", PathStyle::Posix),
            Err(MalformedCommandLine::UnterminatedQuote { quote: '"' })
        );
        assert_eq!(
            CommandLine::tokenize("'gcc -c main.c", PathStyle::Posix),
            Err(MalformedCommandLine::UnterminatedQuote { quote: '\'' })
        );
        assert_eq!(
            CommandLine::tokenize("/opt/'my tools/gcc", PathStyle::Posix),
            Err(MalformedCommandLine::UnterminatedQuote { quote: '\'' })
        );
        assert_eq!(CommandLine::tokenize("\"\" -c", PathStyle::Posix), Err(MalformedCommandLine::EmptyCommand));
    }

    #[test]
    fn test_basename() {
        assert_eq!(PathStyle::Posix.basename("/usr/bin/gcc"), "gcc");
        assert_eq!(PathStyle::Posix.basename("gcc"), "gcc");
        assert_eq!(PathStyle::Posix.basename("C:\\MinGW\\bin\\gcc"), "C:\\MinGW\\bin\\gcc");
        assert_eq!(PathStyle::Windows.basename("C:\\MinGW\\bin\\gcc"), "gcc");
        assert_eq!(PathStyle::Windows.basename("C:/MinGW/bin\\gcc.exe"), "gcc.exe");
        assert_eq!(PathStyle::Posix.basename("/usr/bin/"), "");
    }

    #[test]
    fn test_display() {
        assert_eq!(posix("gcc   -c main.c").to_string(), "gcc -c main.c");
        assert_eq!(posix("gcc").to_string(), "gcc");
    }

    proptest! {
        #[test]
        fn unquoted_command_line_splits_exactly(
            command in "[A-Za-z0-9_./+-]{1,24}",
            arguments in "([^\\s][ -~]{0,40})?",
        ) {
            let line = format!("{command} {arguments}");
            for style in [PathStyle::Posix, PathStyle::Windows] {
                let result = CommandLine::tokenize(&line, style).unwrap();
                prop_assert_eq!(result.command(), command.as_str());
                prop_assert_eq!(result.arguments(), arguments.as_str());
            }
        }

        #[test]
        fn quoted_command_is_returned_verbatim(
            command in "[A-Za-z0-9_./+; -]{1,24}",
            arguments in "[ -~]{0,40}",
            quote in prop::sample::select(vec!['"', '\'']),
        ) {
            let line = format!("{quote}{command}{quote} {arguments}");
            let result = CommandLine::tokenize(&line, PathStyle::Posix).unwrap();
            prop_assert_eq!(result.command(), command.as_str());
            prop_assert_eq!(result.arguments(), arguments.trim_start());
        }
    }
}
