use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure of the value parser, before a line number is attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty value field")]
    Empty,

    #[error("no decimal point")]
    MissingDecimalPoint,

    #[error("expected exactly one fractional digit")]
    BadFraction,

    #[error("unexpected byte {0:#04x} in integer part")]
    BadDigit(u8),

    #[error("integer part exceeds i32 range")]
    Overflow,

    #[error("not a decimal number")]
    NotANumber,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot open {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line} ({content:?}) has no field separator")]
    MalformedRecord { line: u64, content: String },

    #[error("line {line} ({content:?}) has an invalid value: {reason}")]
    InvalidNumberFormat {
        line: u64,
        content: String,
        reason: ParseError,
    },

    #[error("read failed after line {line}: {source}")]
    Read {
        line: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to write summary: {0}")]
    Report(#[source] io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),

    #[error("{0} channel closed unexpectedly")]
    ChannelClosed(&'static str),
}

impl PipelineError {
    pub(crate) fn invalid_number(line: u64, raw: &[u8], reason: ParseError) -> Self {
        PipelineError::InvalidNumberFormat {
            line,
            content: String::from_utf8_lossy(raw).into_owned(),
            reason,
        }
    }

    pub(crate) fn malformed(line: u64, raw: &[u8]) -> Self {
        PipelineError::MalformedRecord {
            line,
            content: String::from_utf8_lossy(raw).into_owned(),
        }
    }

    /// Line number the error refers to, if any.
    pub fn line(&self) -> Option<u64> {
        match self {
            PipelineError::MalformedRecord { line, .. }
            | PipelineError::InvalidNumberFormat { line, .. }
            | PipelineError::Read { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_cite_line_and_content() {
        let err = PipelineError::malformed(7, b"NoSeparatorHere");
        assert_eq!(err.to_string(), "line 7 (\"NoSeparatorHere\") has no field separator");
        assert_eq!(err.line(), Some(7));

        let err = PipelineError::invalid_number(3, b"Oslo;", ParseError::MissingDecimalPoint);
        assert!(err.to_string().contains("no decimal point"));
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn config_errors_have_no_line() {
        assert_eq!(PipelineError::InvalidConfig("workers".into()).line(), None);
    }
}
