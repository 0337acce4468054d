use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::debug;

use crate::command::{self, Command};
use crate::dialect;
use crate::error::{Error, ErrorKind, Result};
use crate::sqlite::catalog::{Catalog, ObjectKind};
use crate::sqlite::{self, dump, header::DatabaseHeader, inspect, maintenance};

pub const DEFAULT_PROMPT: &str = "SQLTools : ";
const HINT: &str = "Type 'help' to list available commands.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// Summary of the file header plus catalog counts.
#[derive(Debug)]
pub struct InfoReport {
    header: Option<DatabaseHeader>,
    tables: usize,
    indexes: usize,
    triggers: usize,
    views: usize,
}

impl fmt::Display for InfoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(header) = &self.header else {
            return f.write_str("empty database (no header written yet)");
        };
        let version = header.sqlite_version();
        let fields: [(&str, &dyn fmt::Display); 19] = [
            ("database page size", &header.page_size),
            ("write format", &header.write_version),
            ("read format", &header.read_version),
            ("reserved bytes", &header.reserved_space),
            ("file change counter", &header.file_change_counter),
            ("database page count", &header.database_size),
            ("freelist page count", &header.total_freelist_pages),
            ("schema cookie", &header.schema_cookie),
            ("schema format", &header.schema_format_number),
            ("default cache size", &header.default_page_cache_size),
            ("autovacuum top root", &header.largest_root_b_tree_page),
            ("incremental vacuum", &header.incremental_vacuum_mode),
            ("text encoding", &header.text_encoding),
            ("user version", &header.user_version),
            ("application id", &header.application_id),
            ("software version", &version),
            ("number of tables", &self.tables),
            ("number of indexes", &self.indexes),
            ("number of triggers", &self.triggers),
        ];
        for (label, value) in fields {
            writeln!(f, "{label:<20} {value}")?;
        }
        write!(f, "{:<20} {}", "number of views", self.views)
    }
}

fn info(path: &Path) -> Result<InfoReport> {
    let header = sqlite::validate(path)?;
    let conn = sqlite::open(path)?;
    let catalog = Catalog::load(&conn)?;
    Ok(InfoReport {
        header,
        tables: catalog.tables().count(),
        indexes: catalog.count(ObjectKind::Index),
        triggers: catalog.count(ObjectKind::Trigger),
        views: catalog.count(ObjectKind::View),
    })
}

/// Executes commands one at a time, writing reports to `out`.
pub struct Session<W> {
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Parses and executes one line. Blank lines do nothing.
    pub fn run_line(&mut self, line: &str) -> Result<Control> {
        match Command::parse(line)? {
            Some(command) => self.execute(command),
            None => Ok(Control::Continue),
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Control> {
        debug!(?command, "executing");
        match command {
            Command::Help => write!(self.out, "{}", command::help())?,
            Command::Check(args) => {
                let status = maintenance::check(&args.db_path, args.mode)?;
                writeln!(self.out, "Integrity check: {status}")?;
            }
            Command::Repair(args) => self.report(maintenance::repair(&args.db_path)?)?,
            Command::Tables(args) => self.report(inspect::list_tables(&args.db_path)?)?,
            Command::View(args) => self.report(inspect::view_table(&args.db_path, &args.table)?)?,
            Command::Set(args) => self.report(inspect::set_value(
                &args.db_path,
                &args.table,
                &args.old,
                &args.new,
            )?)?,
            Command::Parse(args) => {
                self.report(dialect::translate(&args.dump_path, &args.target)?)?
            }
            Command::Dump(args) => self.report(dump::dump(&args.db_path, &args.output)?)?,
            Command::Info(args) => self.report(info(&args.db_path)?)?,
            Command::Exit => return Ok(Control::Exit),
        }
        Ok(Control::Continue)
    }

    fn report(&mut self, report: impl fmt::Display) -> Result<()> {
        writeln!(self.out, "{report}")?;
        Ok(())
    }
}

/// Prints a failed command to stderr.
pub fn report_error(err: &Error) {
    eprintln!("error: {err}");
    if err.kind() == ErrorKind::MalformedArgument {
        eprintln!("{HINT}");
    }
}

/// Reads commands from `input` until `exit` or end of input.
pub fn interactive(input: impl BufRead, prompt: &str) -> anyhow::Result<()> {
    let mut session = Session::new(io::stdout());
    let mut lines = input.lines();
    loop {
        print!("{prompt}");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        match session.run_line(&line?) {
            Ok(Control::Continue) => {}
            Ok(Control::Exit) => break,
            Err(err) => report_error(&err),
        }
    }
    Ok(())
}

/// Runs `lines` in order and returns how many commands failed.
///
/// Blank lines and `#` comments are skipped. With `fail_fast` the run stops
/// at the first failure.
pub fn batch<W: Write>(
    session: &mut Session<W>,
    lines: impl IntoIterator<Item = String>,
    fail_fast: bool,
) -> usize {
    let mut failures = 0;
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match session.run_line(line) {
            Ok(Control::Continue) => {}
            Ok(Control::Exit) => break,
            Err(err) => {
                report_error(&err);
                failures += 1;
                if fail_fast {
                    break;
                }
            }
        }
    }
    failures
}
