use rusqlite::Connection;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Index,
    View,
    Trigger,
}

impl ObjectKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "table" => Some(Self::Table),
            "index" => Some(Self::Index),
            "view" => Some(Self::View),
            "trigger" => Some(Self::Trigger),
            _ => None,
        }
    }
}

/// One row of `sqlite_master`.
#[derive(Debug, Clone)]
pub struct SchemaObject {
    pub kind: ObjectKind,
    pub name: String,
    pub sql: Option<String>,
}

impl SchemaObject {
    /// Tables the engine creates for its own bookkeeping (`sqlite_sequence`, `sqlite_stat1`, ...).
    pub fn is_internal(&self) -> bool {
        self.name.starts_with("sqlite_")
    }
}

/// Schema objects of a database in catalog order.
#[derive(Debug)]
pub struct Catalog {
    objects: Vec<SchemaObject>,
}

impl Catalog {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare("SELECT type, name, sql FROM sqlite_master ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                SchemaObject {
                    kind: ObjectKind::Table,
                    name: row.get(1)?,
                    sql: row.get(2)?,
                },
            ))
        })?;

        let mut objects = Vec::new();
        for row in rows {
            let (kind, mut object) = row?;
            // unrecognised entries are left out rather than guessed at
            let Some(kind) = ObjectKind::parse(&kind) else {
                continue;
            };
            object.kind = kind;
            objects.push(object);
        }

        Ok(Self { objects })
    }

    pub fn objects(&self) -> &[SchemaObject] {
        &self.objects
    }

    /// User tables, skipping engine-internal ones.
    pub fn tables(&self) -> impl Iterator<Item = &SchemaObject> {
        self.objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Table && !o.is_internal())
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects.iter().filter(|o| o.kind == kind).count()
    }

    /// Looks up a table or view by name, ignoring ASCII case like the engine does.
    pub fn fetch_relation(&self, name: &str) -> Option<&SchemaObject> {
        self.objects.iter().find(|o| {
            matches!(o.kind, ObjectKind::Table | ObjectKind::View)
                && o.name.eq_ignore_ascii_case(name)
        })
    }

    pub fn fetch_table(&self, name: &str) -> Option<&SchemaObject> {
        self.objects
            .iter()
            .find(|o| o.kind == ObjectKind::Table && o.name.eq_ignore_ascii_case(name))
    }
}

/// Column names of `table`, in declaration order.
pub fn columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}
