// Ledger Errors - hard failures of the vault pipeline
// Numeric formatting problems are NOT here: see summary::AmountError

use std::path::PathBuf;
use thiserror::Error;

/// Every failure the pipeline surfaces to its caller.
///
/// Variants are grouped by kind:
/// - path/configuration: `InvalidPath`, `NotADirectory`, `Read`
/// - structural parse: `MissingColumn`, `MalformedRow`, `Csv`
/// - persistence: `Write`
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid {role} path: {reason}")]
    InvalidPath { role: &'static str, reason: String },

    #[error("{role} path is not a directory: {}", path.display())]
    NotADirectory { role: &'static str, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: missing required column '{column}'")]
    MissingColumn { file: String, column: &'static str },

    #[error("{file} line {line}: {message}")]
    MalformedRow {
        file: String,
        line: u64,
        message: String,
    },

    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write ledger snapshot {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LedgerError {
    /// True for errors caused by the vault/ledger paths themselves
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidPath { .. }
                | LedgerError::NotADirectory { .. }
                | LedgerError::Read { .. }
        )
    }

    /// True for errors caused by a structurally invalid CSV file
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            LedgerError::MissingColumn { .. }
                | LedgerError::MalformedRow { .. }
                | LedgerError::Csv { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_row_message_names_file_and_line() {
        let err = LedgerError::MalformedRow {
            file: "march.csv".to_string(),
            line: 7,
            message: "empty transaction id".to_string(),
        };

        assert_eq!(err.to_string(), "march.csv line 7: empty transaction id");
        assert!(err.is_parse_error());
        assert!(!err.is_path_error());
    }

    #[test]
    fn test_read_dir_is_path_error() {
        let err = LedgerError::Read {
            path: PathBuf::from("/nope"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };

        assert!(err.is_path_error());
        assert!(err.to_string().contains("/nope"));
    }
}
