use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced while parsing or executing a command.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("database not found: {}", .0.display())]
    DatabaseNotFound(PathBuf),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("not a SQLite database: {}", .0.display())]
    NotADatabase(PathBuf),
    #[error("no such table: {0}")]
    TableNotFound(String),
    #[error("table `{table}` has no `{column}` column")]
    MissingColumn { table: String, column: String },
    #[error("{} is not valid UTF-8 text", .0.display())]
    InvalidText(PathBuf),
    #[error(transparent)]
    Engine(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    MalformedArgument,
    Engine,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownCommand(_) | Error::Usage(_) | Error::InvalidArgument(_) => {
                ErrorKind::MalformedArgument
            }
            Error::DatabaseNotFound(_)
            | Error::FileNotFound(_)
            | Error::TableNotFound(_)
            | Error::MissingColumn { .. } => ErrorKind::NotFound,
            Error::NotADatabase(_) | Error::Engine(_) => ErrorKind::Engine,
            Error::InvalidText(_) | Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Maps a "no such file" I/O failure on `path` to [`Error::FileNotFound`].
    pub(crate) fn from_io(err: std::io::Error, path: impl AsRef<Path>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.as_ref().to_path_buf())
        } else {
            Error::Io(err)
        }
    }
}
