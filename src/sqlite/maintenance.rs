use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const BACKUP_SUFFIX: &str = ".backup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckMode {
    /// `PRAGMA quick_check`: skips index content verification.
    #[default]
    Quick,
    /// `PRAGMA integrity_check`.
    Full,
}

impl CheckMode {
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "quick" => Some(Self::Quick),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    fn pragma(self) -> &'static str {
        match self {
            Self::Quick => "PRAGMA quick_check",
            Self::Full => "PRAGMA integrity_check",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    /// Messages returned by the engine, verbatim.
    Problems(Vec<String>),
}

impl CheckStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Problems(messages) => f.write_str(&messages.join("\n")),
        }
    }
}

fn run_check(conn: &Connection, mode: CheckMode) -> Result<CheckStatus> {
    let mut stmt = conn.prepare(mode.pragma())?;
    let messages = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if messages.len() == 1 && messages[0] == "ok" {
        Ok(CheckStatus::Ok)
    } else {
        Ok(CheckStatus::Problems(messages))
    }
}

pub fn check(path: &Path, mode: CheckMode) -> Result<CheckStatus> {
    let conn = super::open(path)?;
    let status = run_check(&conn, mode)?;
    if !status.is_ok() {
        warn!(path = %path.display(), "consistency check reported problems");
    }
    Ok(status)
}

/// `<path>.backup`, next to the original.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Copies the database to [`backup_path`], replacing any previous backup.
pub fn backup(path: &Path) -> Result<PathBuf> {
    let target = backup_path(path);
    fs::copy(path, &target).map_err(|e| Error::from_io(e, path))?;
    info!(from = %path.display(), to = %target.display(), "backup written");
    Ok(target)
}

#[derive(Debug)]
pub struct RepairReport {
    pub backup: PathBuf,
    pub quick_check: CheckStatus,
    pub size_before: u64,
    pub size_after: u64,
}

impl fmt::Display for RepairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backup created at: {}", self.backup.display())?;
        match &self.quick_check {
            CheckStatus::Ok => writeln!(f, "Quick check passed.")?,
            problems => writeln!(f, "Quick check reported problems:\n{problems}")?,
        }
        write!(
            f,
            "Database vacuumed ({} -> {} bytes).",
            self.size_before, self.size_after
        )
    }
}

/// Backs the database up, runs a quick check, then rebuilds it with `VACUUM`.
///
/// The backup is taken before any connection is opened and is left in place
/// whatever happens afterwards.
pub fn repair(path: &Path) -> Result<RepairReport> {
    super::validate(path)?;
    let size_before = fs::metadata(path)?.len();
    let backup = backup(path)?;

    let conn = super::open(path)?;
    let quick_check = run_check(&conn, CheckMode::Quick)?;
    if !quick_check.is_ok() {
        warn!(path = %path.display(), "quick check failed, vacuuming anyway");
    }
    conn.execute_batch("VACUUM")?;
    drop(conn);

    let size_after = fs::metadata(path)?.len();
    info!(path = %path.display(), size_before, size_after, "vacuum complete");

    Ok(RepairReport {
        backup,
        quick_check,
        size_before,
        size_after,
    })
}
