//! Program-image loaders: the whitespace-separated hex-text format and raw
//! binary files.
//!
//! Hex-text accepts one or many byte tokens per line. `#`, `;`, and `//`
//! start line comments; tokens may carry a `0x` prefix and embedded commas
//! or underscores, which are stripped. Every token must parse as an
//! unsigned byte. Errors carry the 1-indexed line of the offending token so
//! the host can point at it.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

/// A rejected token in a hex-text image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexParseError {
    /// Token contained non-hexadecimal characters.
    #[error("non-hex token '{token}' at line {line}")]
    NonHexToken {
        /// 1-indexed source line.
        line: usize,
        /// Offending token as written.
        token: String,
    },
    /// Token parsed but does not fit in a byte.
    #[error("byte out of range '{token}' at line {line}")]
    ByteOutOfRange {
        /// 1-indexed source line.
        line: usize,
        /// Offending token as written.
        token: String,
    },
    /// The input contained no byte tokens at all.
    #[error("no bytes in hex input")]
    Empty,
}

/// Failure to load a program image from disk.
#[derive(Debug, Error)]
pub enum LoadFileError {
    /// The file could not be read.
    #[error("cannot read '{path}': {source}")]
    Io {
        /// Path as given by the user.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file was read but is not valid hex text.
    #[error("'{path}': {source}")]
    Parse {
        /// Path as given by the user.
        path: String,
        /// First offending token.
        #[source]
        source: HexParseError,
    },
}

/// Parses a hex-text image into its byte sequence.
///
/// # Errors
///
/// Returns [`HexParseError`] for the first malformed token, or
/// [`HexParseError::Empty`] when no tokens survive comment stripping.
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>, HexParseError> {
    let mut out = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        let mut content = raw_line;
        if let Some(cut) = content.find(['#', ';']) {
            content = &content[..cut];
        }
        if let Some(cut) = content.find("//") {
            content = &content[..cut];
        }

        for token in content.split_whitespace() {
            let cleaned: String = token.chars().filter(|c| !matches!(c, ',' | '_')).collect();
            let digits = cleaned
                .strip_prefix("0x")
                .or_else(|| cleaned.strip_prefix("0X"))
                .unwrap_or(&cleaned);
            if digits.is_empty() {
                continue;
            }
            if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(HexParseError::NonHexToken {
                    line,
                    token: token.to_owned(),
                });
            }
            let value =
                u32::from_str_radix(digits, 16).map_err(|_| HexParseError::ByteOutOfRange {
                    line,
                    token: token.to_owned(),
                })?;
            if value > 0xFF {
                return Err(HexParseError::ByteOutOfRange {
                    line,
                    token: token.to_owned(),
                });
            }
            out.push(value as u8);
        }
    }

    if out.is_empty() {
        return Err(HexParseError::Empty);
    }
    Ok(out)
}

/// Reads and parses a hex-text image file.
///
/// # Errors
///
/// Returns [`LoadFileError`] on I/O failure or malformed content.
pub fn load_hex_file(path: &Path) -> Result<Vec<u8>, LoadFileError> {
    let text = fs::read_to_string(path).map_err(|source| LoadFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_hex_bytes(&text).map_err(|source| LoadFileError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Reads a raw binary image file.
///
/// # Errors
///
/// Returns [`LoadFileError::Io`] when the file cannot be read.
pub fn load_bin_file(path: &Path) -> Result<Vec<u8>, LoadFileError> {
    fs::read(path).map_err(|source| LoadFileError::Io {
        path: path.display().to_string(),
        source,
    })
}
