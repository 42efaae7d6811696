//! Cosmetic passes applied to recovered content before it is written.

use std::fmt;
use std::str::FromStr;

/// Target line-ending convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eol {
    Unix,
    Dos,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown line ending '{0}' (expected unix or dos)")]
pub struct ParseEolError(String);

impl FromStr for Eol {
    type Err = ParseEolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unix" => Ok(Eol::Unix),
            "dos" | "windows" => Ok(Eol::Dos),
            other => Err(ParseEolError(other.to_string())),
        }
    }
}

impl fmt::Display for Eol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Eol::Unix => "unix",
            Eol::Dos => "dos",
        })
    }
}

/// Break after `;`, `{` and `}`, strip trailing blanks and squeeze runs of empty lines.
pub fn beautify_basic(s: &str) -> String {
    let expanded = s
        .replace(';', ";\n")
        .replace('{', "{\n")
        .replace('}', "}\n");

    let mut out = String::with_capacity(expanded.len());
    let mut prev_blank = false;
    for line in expanded.split('\n') {
        let line = line.trim_end_matches([' ', '\t']);
        if line.is_empty() {
            if prev_blank {
                continue;
            }
            prev_blank = true;
        } else {
            prev_blank = false;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Rewrite every line ending to `eol`. `None` leaves the text unchanged.
pub fn normalize_eol(s: &str, eol: Option<Eol>) -> String {
    match eol {
        None => s.to_string(),
        Some(mode) => {
            let unix = s.replace("\r\n", "\n").replace('\r', "\n");
            match mode {
                Eol::Unix => unix,
                Eol::Dos => unix.replace('\n', "\r\n"),
            }
        }
    }
}
