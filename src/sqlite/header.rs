use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use bytes::Buf;

use crate::error::{Error, Result};

pub const HEADER_SIZE: usize = 100;
pub const MAGIC: &[u8; 16] = b"SQLite format 3\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Unknown(u32),
}

impl From<u32> for TextEncoding {
    fn from(value: u32) -> Self {
        match value {
            1 => Self::Utf8,
            2 => Self::Utf16Le,
            3 => Self::Utf16Be,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => f.write_str("UTF-8"),
            Self::Utf16Le => f.write_str("UTF-16le"),
            Self::Utf16Be => f.write_str("UTF-16be"),
            Self::Unknown(v) => write!(f, "unknown ({v})"),
        }
    }
}

/// The fixed 100-byte header at the start of every database file.
#[derive(Debug, Clone)]
pub struct DatabaseHeader {
    pub page_size: u32,
    pub write_version: u8,
    pub read_version: u8,
    pub reserved_space: u8,
    pub file_change_counter: u32,
    pub database_size: u32,
    pub total_freelist_pages: u32,
    pub schema_cookie: u32,
    pub schema_format_number: u32,
    pub default_page_cache_size: u32,
    pub largest_root_b_tree_page: u32,
    pub text_encoding: TextEncoding,
    pub user_version: u32,
    pub incremental_vacuum_mode: u32,
    pub application_id: u32,
    pub sqlite_version_number: u32,
}

impl DatabaseHeader {
    /// Decodes a header, or `None` when the magic string does not match.
    pub fn parse(raw: &[u8; HEADER_SIZE]) -> Option<Self> {
        if &raw[..MAGIC.len()] != MAGIC {
            return None;
        }

        let mut buf = &raw[MAGIC.len()..];
        let page_size = match buf.get_u16() {
            // 65536 does not fit in two bytes and is stored as 1
            1 => 65_536,
            size => u32::from(size),
        };
        let write_version = buf.get_u8();
        let read_version = buf.get_u8();
        let reserved_space = buf.get_u8();
        // max/min embedded payload fraction and leaf payload fraction are fixed
        buf.advance(3);
        let file_change_counter = buf.get_u32();
        let database_size = buf.get_u32();
        // first freelist trunk page
        buf.advance(4);
        let total_freelist_pages = buf.get_u32();
        let schema_cookie = buf.get_u32();
        let schema_format_number = buf.get_u32();
        let default_page_cache_size = buf.get_u32();
        let largest_root_b_tree_page = buf.get_u32();
        let text_encoding = TextEncoding::from(buf.get_u32());
        let user_version = buf.get_u32();
        let incremental_vacuum_mode = buf.get_u32();
        let application_id = buf.get_u32();
        // reserved expansion space, then version-valid-for
        buf.advance(24);
        let sqlite_version_number = buf.get_u32();

        Some(Self {
            page_size,
            write_version,
            read_version,
            reserved_space,
            file_change_counter,
            database_size,
            total_freelist_pages,
            schema_cookie,
            schema_format_number,
            default_page_cache_size,
            largest_root_b_tree_page,
            text_encoding,
            user_version,
            incremental_vacuum_mode,
            application_id,
            sqlite_version_number,
        })
    }

    /// Reads the header of the file at `path`.
    ///
    /// A zero-length file is a valid, not yet initialised database and yields
    /// `Ok(None)`. Anything shorter than a header or with the wrong magic
    /// string is rejected.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let mut file = File::open(path).map_err(|e| Error::from_io(e, path))?;
        if file.metadata()?.len() == 0 {
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_SIZE];
        match file.read_exact(&mut raw) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(Error::NotADatabase(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }

        Self::parse(&raw)
            .map(Some)
            .ok_or_else(|| Error::NotADatabase(path.to_path_buf()))
    }

    /// Library version that last wrote the file, as `major.minor.patch`.
    pub fn sqlite_version(&self) -> String {
        let n = self.sqlite_version_number;
        format!("{}.{}.{}", n / 1_000_000, (n / 1_000) % 1_000, n % 1_000)
    }
}
