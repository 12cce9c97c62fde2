// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use std::path::PathBuf;

/// Error type for MOTS to COCO conversion.
///
/// Record-level problems (a bad manifest line, a missing frame, an unreadable
/// label image) are reported through this type so the pipelines can decide
/// whether to skip the record or abort the run.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// Directory traversal error.
    WalkError(walkdir::Error),
    /// ZIP archive error.
    ZipError(zip::result::ZipError),
    /// A manifest line could not be parsed.
    Parse(ParseError),
    /// A source frame referenced by the manifest does not exist.
    MissingSourceAsset(PathBuf),
    /// A label image could not be read or has an unsupported pixel format.
    DecodeError(String),
    /// A compressed RLE counts string is malformed.
    InvalidRle(String),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
    /// A COCO document failed verification.
    CocoError(String),
}

/// Failure to parse one manifest line.
///
/// Every variant is recoverable: the manifest pipeline logs it and moves on
/// to the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line has fewer fields than the manifest layout requires.
    TruncatedLine { expected: usize, found: usize },
    /// A numeric column holds something that is not an integer.
    NotAnInteger { column: usize, value: String },
    /// A column parsed but its value is unusable (degenerate box, bad mask).
    InvalidField { column: usize, reason: String },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkError(err)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipError(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::DecodeError(err.to_string())
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::TruncatedLine { expected, found } => write!(
                f,
                "Truncated line: expected {} fields, found {}",
                expected, found
            ),
            ParseError::NotAnInteger { column, value } => {
                write!(f, "Column {} is not an integer: {:?}", column, value)
            }
            ParseError::InvalidField { column, reason } => {
                write!(f, "Column {} is invalid: {}", column, reason)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::WalkError(e) => write!(f, "Directory walk error: {}", e),
            Error::ZipError(e) => write!(f, "ZIP error: {}", e),
            Error::Parse(e) => write!(f, "Parse error: {}", e),
            Error::MissingSourceAsset(p) => write!(f, "Missing source asset: {}", p.display()),
            Error::DecodeError(s) => write!(f, "Label image decode error: {}", s),
            Error::InvalidRle(s) => write!(f, "Invalid RLE: {}", s),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
            Error::CocoError(s) => write!(f, "COCO error: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::WalkError(e) => Some(e),
            Error::ZipError(e) => Some(e),
            Error::Parse(e) => Some(e),
            _ => None,
        }
    }
}
