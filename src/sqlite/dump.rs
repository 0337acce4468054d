use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::info;

use super::catalog::{self, Catalog, ObjectKind};
use super::{quote_identifier, quote_literal};
use crate::error::{Error, Result};

/// Runs a query whose single text column is a complete statement minus the `;`.
fn push_rendered(conn: &Connection, sql: &str, out: &mut Vec<String>) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    for row in rows {
        out.push(format!("{};", row?));
    }
    Ok(())
}

/// `INSERT INTO "t" VALUES(...)` for every row of `table`, values rendered by `quote()`.
fn push_rows(conn: &Connection, table: &str, out: &mut Vec<String>) -> Result<()> {
    let columns = catalog::columns(conn, table)?;
    if columns.is_empty() {
        return Ok(());
    }

    // the table name sits inside a string literal of the generated query
    let ident = table.replace('"', "\"\"").replace('\'', "''");
    let values = columns
        .iter()
        .map(|c| format!("'||quote({})||'", quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT 'INSERT INTO \"{ident}\" VALUES({values})' FROM {}",
        quote_identifier(table)
    );
    push_rendered(conn, &sql, out)
}

/// The statements that recreate the database, in execution order.
///
/// Tables come first (sorted by name, each followed by its rows), then
/// indexes, triggers and views, then the autoincrement counters.
pub fn statements(conn: &Connection) -> Result<Vec<String>> {
    let catalog = Catalog::load(conn)?;
    let mut out = vec!["BEGIN TRANSACTION;".to_string()];
    let mut sequence = Vec::new();
    let mut writable_schema = false;

    let mut tables: Vec<_> = catalog
        .objects()
        .iter()
        .filter(|o| o.kind == ObjectKind::Table)
        .filter_map(|o| o.sql.as_deref().map(|sql| (o.name.as_str(), sql)))
        .collect();
    tables.sort_by_key(|(name, _)| *name);

    for (name, sql) in tables {
        if name == "sqlite_sequence" {
            sequence.push("DELETE FROM \"sqlite_sequence\";".to_string());
            push_rendered(
                conn,
                "SELECT 'INSERT INTO \"sqlite_sequence\" VALUES(' || quote(name) || ',' || quote(seq) || ')' FROM \"sqlite_sequence\"",
                &mut sequence,
            )?;
            continue;
        } else if name == "sqlite_stat1" {
            out.push("ANALYZE \"sqlite_master\";".to_string());
        } else if name.starts_with("sqlite_") {
            continue;
        } else if sql.starts_with("CREATE VIRTUAL TABLE") {
            if !writable_schema {
                writable_schema = true;
                out.push("PRAGMA writable_schema=ON;".to_string());
            }
            let name = quote_literal(name);
            out.push(format!(
                "INSERT INTO sqlite_master(type,name,tbl_name,rootpage,sql) VALUES('table',{name},{name},0,{});",
                quote_literal(sql)
            ));
            // rows live in the shadow tables, which are dumped like any other
            continue;
        } else {
            out.push(format!("{sql};"));
        }

        push_rows(conn, name, &mut out)?;
    }

    for object in catalog.objects() {
        if matches!(
            object.kind,
            ObjectKind::Index | ObjectKind::Trigger | ObjectKind::View
        ) {
            if let Some(sql) = &object.sql {
                out.push(format!("{sql};"));
            }
        }
    }

    if writable_schema {
        out.push("PRAGMA writable_schema=OFF;".to_string());
    }
    out.extend(sequence);
    out.push("COMMIT;".to_string());

    Ok(out)
}

#[derive(Debug)]
pub struct DumpReport {
    pub output: PathBuf,
    pub statements: usize,
}

impl fmt::Display for DumpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Database dump ({} statements) written to: {}",
            self.statements,
            self.output.display()
        )
    }
}

/// Writes the dump of `path` to `output`, one statement per line.
pub fn dump(path: &Path, output: &Path) -> Result<DumpReport> {
    let conn = super::open(path)?;
    let statements = statements(&conn)?;

    let file = File::create(output).map_err(|e| Error::from_io(e, output))?;
    let mut writer = BufWriter::new(file);
    for statement in &statements {
        writeln!(writer, "{statement}")?;
    }
    writer.flush()?;
    info!(from = %path.display(), to = %output.display(), statements = statements.len(), "dump written");

    Ok(DumpReport {
        output: output.to_path_buf(),
        statements: statements.len(),
    })
}
