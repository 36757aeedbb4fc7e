use std::path::PathBuf;

use crate::status::Status;

/// Errors raised by the file context and the column cache.
///
/// Variants that concern an open file carry its diagnostic prefix
/// (`file.fits[EXTNAME]: `, with ` (row N)` when a row is relevant).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("null FITS file context")]
    NullContext,

    #[error("{prefix}current HDU is not a binary table")]
    NotBinaryTable { prefix: String },

    #[error("{prefix}file exists and clobber is not set")]
    FileExists { prefix: String },

    #[error("{prefix}could not find column: {column} {status}")]
    ColumnNotFound {
        prefix: String,
        column: String,
        status: Status,
    },

    #[error("{prefix}could not read keyword {keyword} {status}")]
    KeywordNotFound {
        prefix: String,
        keyword: String,
        status: Status,
    },

    #[error("{prefix}could not move to HDU {hdu} {status}")]
    HduNotFound {
        prefix: String,
        hdu: String,
        status: Status,
    },

    #[error("{prefix}trying to set {keyword} keyword for non-integer type column: {column}")]
    TypeMismatch {
        prefix: String,
        keyword: String,
        column: String,
    },

    #[error("{prefix}{context} {status}")]
    Engine {
        prefix: String,
        context: String,
        status: Status,
    },

    #[error("could not open file list {}: {source}", .path.display())]
    FileListOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no files found in {spec}")]
    FileListEmpty { spec: String },

    #[error("line {line} of file list {} is longer than {max} bytes", .path.display())]
    FileListLine { path: PathBuf, line: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The context is closed, or the current HDU has the wrong type.
    Precondition,
    /// A column, keyword or HDU does not exist.
    NotFound,
    /// An integer-only attribute was set on a non-integer column.
    TypeMismatch,
    /// The engine reported a failure.
    Engine,
    /// An `@` file list could not be expanded.
    FileList,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NullContext | Error::NotBinaryTable { .. } | Error::FileExists { .. } => {
                ErrorKind::Precondition
            }
            Error::ColumnNotFound { .. }
            | Error::KeywordNotFound { .. }
            | Error::HduNotFound { .. } => ErrorKind::NotFound,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::Engine { .. } => ErrorKind::Engine,
            Error::FileListOpen { .. } | Error::FileListEmpty { .. } | Error::FileListLine { .. } => {
                ErrorKind::FileList
            }
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Engine status behind the error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::ColumnNotFound { status, .. }
            | Error::KeywordNotFound { status, .. }
            | Error::HduNotFound { status, .. }
            | Error::Engine { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_not_found_message() {
        let err = Error::ColumnNotFound {
            prefix: "evt.fits[EVENTS]: ".into(),
            column: "ENERGY".into(),
            status: Status::COL_NOT_FOUND,
        };
        assert_eq!(
            err.to_string(),
            "evt.fits[EVENTS]: could not find column: ENERGY [FITS STATUS 219: named column not found]"
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), Some(Status::COL_NOT_FOUND));
    }

    #[test]
    fn type_mismatch_message() {
        let err = Error::TypeMismatch {
            prefix: "evt.fits[EVENTS]: ".into(),
            keyword: "TNULL".into(),
            column: "TIME".into(),
        };
        assert_eq!(
            err.to_string(),
            "evt.fits[EVENTS]: trying to set TNULL keyword for non-integer type column: TIME"
        );
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(err.status().is_none());
    }

    #[test]
    fn file_list_errors() {
        let err = Error::FileListEmpty {
            spec: "@list.txt".into(),
        };
        assert_eq!(err.to_string(), "no files found in @list.txt");
        assert_eq!(err.kind(), ErrorKind::FileList);
        assert_eq!(Error::NullContext.kind(), ErrorKind::Precondition);
    }
}
