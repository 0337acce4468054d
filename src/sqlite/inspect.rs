use std::fmt;
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::params;
use tracing::info;

use super::catalog::{self, Catalog};
use super::quote_identifier;
use crate::error::{Error, Result};

/// Column updated by [`set_value`].
pub const VALUE_COLUMN: &str = "value";

#[derive(Debug)]
pub struct TableList(pub Vec<String>);

impl fmt::Display for TableList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("No tables found in database.");
        }
        f.write_str("Tables in database:")?;
        for name in &self.0 {
            write!(f, "\n- {name}")?;
        }
        Ok(())
    }
}

pub fn list_tables(path: &Path) -> Result<TableList> {
    let conn = super::open(path)?;
    let catalog = Catalog::load(&conn)?;
    Ok(TableList(catalog.tables().map(|t| t.name.clone()).collect()))
}

/// A single SQL value printed the way a literal would be written.
struct Literal<'a>(&'a Value);

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r:?}"),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Blob(bytes) => {
                f.write_str("X'")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                f.write_str("'")
            }
        }
    }
}

#[derive(Debug)]
pub struct TableRows {
    pub table: String,
    pub rows: Vec<Vec<Value>>,
}

impl fmt::Display for TableRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return write!(f, "No rows found in table {}.", self.table);
        }
        write!(f, "Rows in table {}:", self.table)?;
        for row in &self.rows {
            f.write_str("\n(")?;
            for (i, value) in row.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", Literal(value))?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Every row of a table or view, unpaginated.
pub fn view_table(path: &Path, table: &str) -> Result<TableRows> {
    let conn = super::open(path)?;
    if Catalog::load(&conn)?.fetch_relation(table).is_none() {
        return Err(Error::TableNotFound(table.to_string()));
    }

    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_identifier(table)))?;
    let width = stmt.column_count();
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(TableRows {
        table: table.to_string(),
        rows,
    })
}

#[derive(Debug)]
pub struct UpdateReport {
    pub table: String,
    pub updated: usize,
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Updated {} row(s) in table {}.", self.updated, self.table)
    }
}

/// Sets `value = new` on every row of `table` where `value = old`.
pub fn set_value(path: &Path, table: &str, old: &str, new: &str) -> Result<UpdateReport> {
    let conn = super::open(path)?;
    if Catalog::load(&conn)?.fetch_table(table).is_none() {
        return Err(Error::TableNotFound(table.to_string()));
    }
    if !catalog::columns(&conn, table)?
        .iter()
        .any(|c| c.eq_ignore_ascii_case(VALUE_COLUMN))
    {
        return Err(Error::MissingColumn {
            table: table.to_string(),
            column: VALUE_COLUMN.to_string(),
        });
    }

    let column = quote_identifier(VALUE_COLUMN);
    let sql = format!(
        "UPDATE {} SET {column} = ?1 WHERE {column} = ?2",
        quote_identifier(table)
    );
    let updated = conn.execute(&sql, params![new, old])?;
    info!(table, updated, "value updated");

    Ok(UpdateReport {
        table: table.to_string(),
        updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sqlite::testing;

    #[test]
    fn empty_database_has_no_tables() {
        let (_dir, path) = testing::database("empty.db", "");
        let tables = list_tables(&path).unwrap();
        assert!(tables.0.is_empty());
        assert_eq!(tables.to_string(), "No tables found in database.");
    }

    #[test]
    fn tables_listed_in_catalog_order() {
        let (_dir, path) = testing::database(
            "two.db",
            "CREATE TABLE b (x); CREATE TABLE a (y); CREATE INDEX bx ON b (x);",
        );
        let tables = list_tables(&path).unwrap();
        assert_eq!(tables.0, ["b", "a"]);
        assert_eq!(tables.to_string(), "Tables in database:\n- b\n- a");
    }

    #[test]
    fn view_prints_positional_tuples() {
        let (_dir, path) = testing::database(
            "rows.db",
            "CREATE TABLE t (id INTEGER, name TEXT, score REAL, raw BLOB);
             INSERT INTO t VALUES (1, 'o''neil', 2.5, X'00FF');
             INSERT INTO t VALUES (2, NULL, 3.0, NULL);",
        );
        let rows = view_table(&path, "t").unwrap();
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(
            rows.to_string(),
            "Rows in table t:\n(1, 'o''neil', 2.5, X'00FF')\n(2, NULL, 3.0, NULL)"
        );
    }

    #[test]
    fn view_empty_and_missing_tables() {
        let (_dir, path) = testing::database("view.db", "CREATE TABLE t (id INTEGER);");
        assert_eq!(
            view_table(&path, "t").unwrap().to_string(),
            "No rows found in table t."
        );
        let err = view_table(&path, "nope").unwrap_err();
        assert!(matches!(err, Error::TableNotFound(ref t) if t == "nope"));
    }

    #[test]
    fn view_quotes_awkward_names() {
        let (_dir, path) = testing::database(
            "names.db",
            "CREATE TABLE \"order items\" (id INTEGER); INSERT INTO \"order items\" VALUES (7);",
        );
        assert_eq!(view_table(&path, "order items").unwrap().rows.len(), 1);
    }

    #[test]
    fn set_updates_matching_rows() {
        let (_dir, path) = testing::database(
            "kv.db",
            "CREATE TABLE settings (key TEXT, value TEXT);
             INSERT INTO settings VALUES ('theme', 'dark'), ('accent', 'dark'), ('font', 'mono');",
        );
        let report = set_value(&path, "settings", "dark", "light").unwrap();
        assert_eq!(report.updated, 2);
        assert_eq!(report.to_string(), "Updated 2 row(s) in table settings.");

        let conn = rusqlite::Connection::open(&path).unwrap();
        let light: i64 = conn
            .query_row(
                "SELECT count(*) FROM settings WHERE value = 'light'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(light, 2);
    }

    #[test]
    fn set_matches_integer_column_through_affinity() {
        let (_dir, path) = testing::database(
            "counters.db",
            "CREATE TABLE counters (name TEXT, value INTEGER);
             INSERT INTO counters VALUES ('hits', 5), ('misses', 5), ('errors', 50);",
        );
        let report = set_value(&path, "counters", "5", "6").unwrap();
        assert_eq!(report.updated, 2);

        let conn = rusqlite::Connection::open(&path).unwrap();
        let mut stmt = conn
            .prepare("SELECT value, typeof(value) FROM counters ORDER BY rowid")
            .unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(
            rows,
            [
                (6, "integer".to_string()),
                (6, "integer".to_string()),
                (50, "integer".to_string())
            ]
        );
    }

    #[test]
    fn table_names_ignore_case() {
        let (_dir, path) = testing::database(
            "case.db",
            "CREATE TABLE users (value TEXT); INSERT INTO users VALUES ('a');",
        );
        let report = set_value(&path, "USERS", "a", "b").unwrap();
        assert_eq!(report.updated, 1);
        let rows = view_table(&path, "Users").unwrap();
        assert_eq!(rows.rows, vec![vec![Value::Text("b".into())]]);
    }

    #[test]
    fn set_without_value_column_leaves_table_unchanged() {
        let (_dir, path) = testing::database(
            "novalue.db",
            "CREATE TABLE people (name TEXT); INSERT INTO people VALUES ('ann');",
        );
        let before = std::fs::read(&path).unwrap();

        let err = set_value(&path, "people", "ann", "bob").unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(std::fs::read(&path).unwrap(), before);
        let rows = view_table(&path, "people").unwrap();
        assert_eq!(rows.rows, vec![vec![Value::Text("ann".into())]]);
    }

    #[test]
    fn set_on_missing_table() {
        let (_dir, path) = testing::database("t.db", "CREATE TABLE t (value TEXT);");
        assert!(matches!(
            set_value(&path, "nope", "a", "b"),
            Err(Error::TableNotFound(_))
        ));
    }
}
