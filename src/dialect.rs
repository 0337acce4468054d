//! Lexical translation of a SQLite dump toward another database's syntax.
//!
//! The rewrite is a fixed, ordered list of literal substring replacements.
//! No SQL is parsed, so any identifier or string literal that happens to
//! contain a listed keyword is rewritten too (`TEXT_INTEGER` becomes
//! `VARCHAR(255)_INT`).

use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Replacements applied for MySQL and MariaDB targets, in order.
const MYSQL_REWRITES: &[(&str, &str)] = &[
    ("AUTOINCREMENT", "AUTO_INCREMENT"),
    ("INTEGER", "INT"),
    ("TEXT", "VARCHAR(255)"),
    ("PRAGMA foreign_keys=OFF;", ""),
    ("BEGIN TRANSACTION;", "START TRANSACTION;"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
}

impl Dialect {
    /// Recognises `mysql` and `mariadb`, ignoring case.
    pub fn from_alias(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            _ => None,
        }
    }

    fn rewrites(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::MySql => MYSQL_REWRITES,
        }
    }
}

/// Translation target as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub dialect: Option<Dialect>,
}

impl Target {
    /// The name ends up in a file name, so it may not be empty or contain a path separator.
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(Error::InvalidArgument(format!(
                "target `{name}` cannot be used in a file name"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            dialect: Dialect::from_alias(name),
        })
    }
}

/// Applies the dialect's replacements and counts how many were made.
pub fn rewrite(script: &str, dialect: Option<Dialect>) -> (Cow<'_, str>, usize) {
    let Some(dialect) = dialect else {
        return (Cow::Borrowed(script), 0);
    };

    let mut text = Cow::Borrowed(script);
    let mut replaced = 0;
    for &(from, to) in dialect.rewrites() {
        let hits = text.matches(from).count();
        if hits > 0 {
            debug!(from, to, hits, "rewriting");
            replaced += hits;
            text = Cow::Owned(text.replace(from, to));
        }
    }
    (text, replaced)
}

/// `<dir>/<stem>_to_<target>.sql`, where `<stem>` drops the last extension of the dump.
pub fn output_path(dump: &Path, target: &Target) -> PathBuf {
    let stem = dump
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    dump.with_file_name(format!("{stem}_to_{}.sql", target.name))
}

#[derive(Debug)]
pub struct TranslateReport {
    pub output: PathBuf,
    pub dialect: Option<Dialect>,
    pub replacements: usize,
}

impl fmt::Display for TranslateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dialect.is_none() {
            f.write_str("No rewrite rules for this target, dump copied unchanged.\n")?;
        }
        write!(
            f,
            "Converted dump ({} replacements) written to: {}",
            self.replacements,
            self.output.display()
        )
    }
}

/// Maps the dump into memory, or `None` for an empty file, which cannot be mapped.
fn map_dump(path: &Path) -> Result<Option<Mmap>> {
    let file = File::open(path).map_err(|e| Error::from_io(e, path))?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    // SAFETY: the dump must not be truncated or rewritten while it is mapped;
    // the map lives only for the duration of one translation.
    let map = unsafe { Mmap::map(&file)? };
    Ok(Some(map))
}

/// Translates the dump at `dump` for `target` and writes it next to the input.
pub fn translate(dump: &Path, target: &Target) -> Result<TranslateReport> {
    let map = map_dump(dump)?;
    let script = match &map {
        Some(map) => {
            std::str::from_utf8(map).map_err(|_| Error::InvalidText(dump.to_path_buf()))?
        }
        None => "",
    };
    let (converted, replacements) = rewrite(script, target.dialect);

    let output = output_path(dump, target);
    fs::write(&output, converted.as_bytes()).map_err(|e| Error::from_io(e, &output))?;
    info!(from = %dump.display(), to = %output.display(), replacements, "dump translated");

    Ok(TranslateReport {
        output,
        dialect: target.dialect,
        replacements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "PRAGMA foreign_keys=OFF;
BEGIN TRANSACTION;
CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, age INTEGER);
INSERT INTO users VALUES(1,'ann',30);
COMMIT;
";

    #[test]
    fn aliases_ignore_case() {
        assert_eq!(Dialect::from_alias("MySQL"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_alias("mariadb"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_alias("postgres"), None);
    }

    #[test]
    fn mysql_rewrite() {
        let (text, replaced) = rewrite(DUMP, Some(Dialect::MySql));
        assert_eq!(
            text,
            "
START TRANSACTION;
CREATE TABLE users (id INT PRIMARY KEY AUTO_INCREMENT, name VARCHAR(255), age INT);
INSERT INTO users VALUES(1,'ann',30);
COMMIT;
"
        );
        assert_eq!(replaced, 6);
        assert!(!text.contains("INTEGER"));
    }

    #[test]
    fn no_keywords_means_unchanged_copy() {
        let plain = "INSERT INTO t VALUES(1,'x');\n";
        let (text, replaced) = rewrite(plain, Some(Dialect::MySql));
        assert!(matches!(text, Cow::Borrowed(_)));
        assert_eq!(text, plain);
        assert_eq!(replaced, 0);
    }

    #[test]
    fn unknown_target_passes_through() {
        let (text, replaced) = rewrite(DUMP, None);
        assert_eq!(text, DUMP);
        assert_eq!(replaced, 0);
    }

    #[test]
    fn identifiers_are_not_protected() {
        let (text, _) = rewrite("CREATE TABLE t (TEXT_INTEGER TEXT);", Some(Dialect::MySql));
        assert_eq!(text, "CREATE TABLE t (VARCHAR(255)_INT VARCHAR(255));");
    }

    #[test]
    fn target_names_must_fit_in_a_file_name() {
        assert!(Target::parse("mysql").is_ok());
        assert!(matches!(Target::parse("a/b"), Err(Error::InvalidArgument(_))));
        assert!(matches!(Target::parse(""), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn output_next_to_input() {
        let target = Target::parse("mysql").unwrap();
        assert_eq!(
            output_path(Path::new("/tmp/shop.sql"), &target),
            Path::new("/tmp/shop_to_mysql.sql")
        );
        assert_eq!(
            output_path(Path::new("backup.2024.sql"), &target),
            Path::new("backup.2024_to_mysql.sql")
        );
    }

    #[test]
    fn translate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("shop.sql");
        fs::write(&dump, DUMP).unwrap();

        let report = translate(&dump, &Target::parse("MariaDB").unwrap()).unwrap();
        assert_eq!(report.output, dir.path().join("shop_to_MariaDB.sql"));
        let written = fs::read_to_string(&report.output).unwrap();
        assert!(written.starts_with("\nSTART TRANSACTION;"));

        let report = translate(&dump, &Target::parse("sqlite").unwrap()).unwrap();
        assert_eq!(fs::read_to_string(&report.output).unwrap(), DUMP);
        assert!(report.to_string().starts_with("No rewrite rules"));
    }

    #[test]
    fn empty_dump_translates_to_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("empty.sql");
        fs::write(&dump, "").unwrap();

        let report = translate(&dump, &Target::parse("mysql").unwrap()).unwrap();
        assert_eq!(report.replacements, 0);
        assert_eq!(fs::read(&report.output).unwrap(), b"");
    }

    #[test]
    fn translate_errors() {
        let dir = tempfile::tempdir().unwrap();
        let target = Target::parse("mysql").unwrap();

        let missing = dir.path().join("missing.sql");
        assert!(matches!(
            translate(&missing, &target),
            Err(Error::FileNotFound(_))
        ));

        let binary = dir.path().join("binary.sql");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x41]).unwrap();
        assert!(matches!(
            translate(&binary, &target),
            Err(Error::InvalidText(_))
        ));
    }
}
