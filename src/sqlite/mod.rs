use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{Error, Result};

pub mod catalog;
pub mod dump;
pub mod header;
pub mod inspect;
pub mod maintenance;

use header::DatabaseHeader;

/// Checks that `path` names an existing database file and returns its header.
///
/// `Ok(None)` is an empty (zero-length) database.
pub fn validate(path: &Path) -> Result<Option<DatabaseHeader>> {
    if !path.is_file() {
        return Err(Error::DatabaseNotFound(path.to_path_buf()));
    }
    DatabaseHeader::read(path)
}

/// Opens an existing database. Never creates a new file.
pub fn open(path: &Path) -> Result<Connection> {
    validate(path)?;
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    debug!(path = %path.display(), "opened database");
    Ok(conn)
}

/// Quotes `name` as an SQL identifier: `a"b` becomes `"a""b"`.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes `text` as an SQL string literal: `it's` becomes `'it''s'`.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
