//! Error types for tx2genome
//!
//! Every variant except `Io` describes a fatal problem with one input record.
//! An offset that falls beyond the aligned span is not an error; it maps to
//! `None` and is written as `-1`.

use thiserror::Error;

/// Which input table a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Transcripts,
    Queries,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Transcripts => "transcript table",
            TableKind::Queries => "query table",
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for tx2genome operations
#[derive(Debug, Error)]
pub enum Tx2GenomeError {
    /// Malformed record: field count, empty field, bad number, bad chromosome
    /// name or bad alignment string
    #[error("Format error in {table} at line {line}: {message}")]
    Format {
        table: TableKind,
        line: usize,
        message: String,
    },

    /// A transcript ID appeared twice in the transcript table
    #[error("Duplicate transcript ID '{transcript_id}' at line {line} (first defined at line {first_line})")]
    DuplicateKey {
        transcript_id: String,
        line: usize,
        first_line: usize,
    },

    /// A query referenced a transcript ID that is not in the table
    #[error("Unknown transcript ID '{transcript_id}' in {table} at line {line}")]
    Lookup {
        table: TableKind,
        transcript_id: String,
        line: usize,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Tx2GenomeError {
    pub fn format(table: TableKind, line: usize, message: impl Into<String>) -> Self {
        Tx2GenomeError::Format {
            table,
            line,
            message: message.into(),
        }
    }

    /// A record line that could not be decoded as UTF-8
    pub fn invalid_utf8(table: TableKind, line: usize) -> Self {
        Self::format(table, line, "line is not valid UTF-8")
    }

    /// Line number of the offending record, if the error is tied to one
    pub fn line(&self) -> Option<usize> {
        match self {
            Tx2GenomeError::Format { line, .. }
            | Tx2GenomeError::DuplicateKey { line, .. }
            | Tx2GenomeError::Lookup { line, .. } => Some(*line),
            Tx2GenomeError::Io(_) => None,
        }
    }

    /// True for errors describing a single bad record (as opposed to I/O)
    pub fn is_record_error(&self) -> bool {
        !matches!(self, Tx2GenomeError::Io(_))
    }
}

/// Result type alias for tx2genome operations
pub type Result<T> = std::result::Result<T, Tx2GenomeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_message() {
        let err = Tx2GenomeError::format(TableKind::Transcripts, 3, "expected 4 columns, got 2");
        assert_eq!(
            err.to_string(),
            "Format error in transcript table at line 3: expected 4 columns, got 2"
        );
        assert_eq!(err.line(), Some(3));
        assert!(err.is_record_error());
    }

    #[test]
    fn test_invalid_utf8_is_a_record_error() {
        let err = Tx2GenomeError::invalid_utf8(TableKind::Queries, 4);
        assert_eq!(err.to_string(), "Format error in query table at line 4: line is not valid UTF-8");
        assert_eq!(err.line(), Some(4));
        assert!(err.is_record_error());
    }

    #[test]
    fn test_duplicate_key_message() {
        let err = Tx2GenomeError::DuplicateKey {
            transcript_id: "TR1".to_string(),
            line: 5,
            first_line: 1,
        };
        assert!(err.to_string().contains("'TR1'"));
        assert!(err.to_string().contains("first defined at line 1"));
    }

    #[test]
    fn test_io_error_has_no_line() {
        let err = Tx2GenomeError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.line(), None);
        assert!(!err.is_record_error());
    }
}
