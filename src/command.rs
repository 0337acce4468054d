use std::fmt;
use std::path::PathBuf;

use nom::{
    branch::alt,
    bytes::complete::{take_till, take_till1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, verify},
    multi::separated_list0,
    sequence::delimited,
    IResult, Parser,
};

use crate::dialect::Target;
use crate::error::{Error, Result};
use crate::sqlite::maintenance::CheckMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseArgs {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckArgs {
    pub db_path: PathBuf,
    pub mode: CheckMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewArgs {
    pub db_path: PathBuf,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetArgs {
    pub db_path: PathBuf,
    pub table: String,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseArgs {
    pub dump_path: PathBuf,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpArgs {
    pub db_path: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Check(CheckArgs),
    Repair(DatabaseArgs),
    Tables(DatabaseArgs),
    View(ViewArgs),
    Set(SetArgs),
    Parse(ParseArgs),
    Dump(DumpArgs),
    Info(DatabaseArgs),
    Exit,
}

enum ArgsError {
    Arity,
    Invalid(Error),
}

impl From<Error> for ArgsError {
    fn from(err: Error) -> Self {
        ArgsError::Invalid(err)
    }
}

type Build = fn(&[String]) -> std::result::Result<Command, ArgsError>;

pub struct VerbSpec {
    pub words: &'static [&'static str],
    pub params: &'static str,
    pub summary: &'static str,
    build: Build,
}

impl fmt::Display for VerbSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.words.join(" "))?;
        if !self.params.is_empty() {
            write!(f, " {}", self.params)?;
        }
        Ok(())
    }
}

pub static VERBS: &[VerbSpec] = &[
    VerbSpec {
        words: &["help"],
        params: "",
        summary: "Show the available commands",
        build: build_help,
    },
    VerbSpec {
        words: &["check"],
        params: "<db_path> [quick|full]",
        summary: "Check the integrity of the database",
        build: build_check,
    },
    VerbSpec {
        words: &["repair"],
        params: "<db_path>",
        summary: "Back up the database, then quick-check and vacuum it",
        build: build_repair,
    },
    VerbSpec {
        words: &["tables"],
        params: "<db_path>",
        summary: "List the tables of the database",
        build: build_tables,
    },
    VerbSpec {
        words: &["tables", "value", "view"],
        params: "<db_path> <table>",
        summary: "Show every row of a table",
        build: build_view,
    },
    VerbSpec {
        words: &["tables", "value", "set"],
        params: "<db_path> <table> <old> <new>",
        summary: "Replace <old> with <new> in the `value` column of a table",
        build: build_set,
    },
    VerbSpec {
        words: &["parse"],
        params: "<dump_path> <target>",
        summary: "Convert a dump for a target database (mysql, mariadb)",
        build: build_parse,
    },
    VerbSpec {
        words: &["dump"],
        params: "<db_path> <output_file>",
        summary: "Dump the database as SQL statements",
        build: build_dump,
    },
    VerbSpec {
        words: &["info"],
        params: "<db_path>",
        summary: "Show the database file header",
        build: build_info,
    },
    VerbSpec {
        words: &["exit"],
        params: "",
        summary: "Quit the program",
        build: build_exit,
    },
    VerbSpec {
        words: &["quit"],
        params: "",
        summary: "Quit the program",
        build: build_exit,
    },
];

fn build_help(args: &[String]) -> std::result::Result<Command, ArgsError> {
    match args {
        [] => Ok(Command::Help),
        _ => Err(ArgsError::Arity),
    }
}

fn build_exit(args: &[String]) -> std::result::Result<Command, ArgsError> {
    match args {
        [] => Ok(Command::Exit),
        _ => Err(ArgsError::Arity),
    }
}

fn build_check(args: &[String]) -> std::result::Result<Command, ArgsError> {
    let (db_path, mode) = match args {
        [db_path] => (db_path, CheckMode::default()),
        [db_path, mode] => {
            let mode = CheckMode::parse(mode).ok_or_else(|| {
                Error::InvalidArgument(format!("check mode `{mode}`, expected quick or full"))
            })?;
            (db_path, mode)
        }
        _ => return Err(ArgsError::Arity),
    };
    Ok(Command::Check(CheckArgs {
        db_path: db_path.into(),
        mode,
    }))
}

fn database_args(args: &[String]) -> std::result::Result<DatabaseArgs, ArgsError> {
    match args {
        [db_path] => Ok(DatabaseArgs {
            db_path: db_path.into(),
        }),
        _ => Err(ArgsError::Arity),
    }
}

fn build_repair(args: &[String]) -> std::result::Result<Command, ArgsError> {
    database_args(args).map(Command::Repair)
}

fn build_tables(args: &[String]) -> std::result::Result<Command, ArgsError> {
    database_args(args).map(Command::Tables)
}

fn build_info(args: &[String]) -> std::result::Result<Command, ArgsError> {
    database_args(args).map(Command::Info)
}

fn build_view(args: &[String]) -> std::result::Result<Command, ArgsError> {
    match args {
        [db_path, table] => Ok(Command::View(ViewArgs {
            db_path: db_path.into(),
            table: table.clone(),
        })),
        _ => Err(ArgsError::Arity),
    }
}

fn build_set(args: &[String]) -> std::result::Result<Command, ArgsError> {
    match args {
        [db_path, table, old, new] => Ok(Command::Set(SetArgs {
            db_path: db_path.into(),
            table: table.clone(),
            old: old.clone(),
            new: new.clone(),
        })),
        _ => Err(ArgsError::Arity),
    }
}

fn build_parse(args: &[String]) -> std::result::Result<Command, ArgsError> {
    match args {
        [dump_path, target] => Ok(Command::Parse(ParseArgs {
            dump_path: dump_path.into(),
            target: Target::parse(target)?,
        })),
        _ => Err(ArgsError::Arity),
    }
}

fn build_dump(args: &[String]) -> std::result::Result<Command, ArgsError> {
    match args {
        [db_path, output] => Ok(Command::Dump(DumpArgs {
            db_path: db_path.into(),
            output: output.into(),
        })),
        _ => Err(ArgsError::Arity),
    }
}

fn quoted(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
        str::to_string,
    )
    .parse(input)
}

/// An unquoted token. It may not open with `"`, so an unclosed quote is an error.
fn bare(input: &str) -> IResult<&str, String> {
    map(
        verify(take_till1(|c: char| c.is_whitespace()), |token: &str| {
            !token.starts_with('"')
        }),
        str::to_string,
    )
    .parse(input)
}

/// Splits a command line on whitespace. A token wrapped in double quotes may
/// contain spaces; the quotes are removed.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    all_consuming(delimited(
        multispace0,
        separated_list0(multispace1, alt((quoted, bare))),
        multispace0,
    ))
    .parse(line)
    .map(|(_, tokens)| tokens)
    .map_err(|_| {
        Error::InvalidArgument("unclosed quote, or text directly after a closing quote".to_string())
    })
}

/// Finds the verb whose words prefix `tokens`, preferring the longest match.
fn lookup(tokens: &[String]) -> Option<&'static VerbSpec> {
    VERBS
        .iter()
        .filter(|spec| {
            tokens.len() >= spec.words.len()
                && spec.words.iter().zip(tokens).all(|(word, token)| word == token)
        })
        .max_by_key(|spec| spec.words.len())
}

impl Command {
    /// Parses a command line. `Ok(None)` means the line was blank.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let tokens = tokenize(line)?;
        let Some(first) = tokens.first() else {
            return Ok(None);
        };
        let spec = lookup(&tokens).ok_or_else(|| Error::UnknownCommand(first.clone()))?;

        match (spec.build)(&tokens[spec.words.len()..]) {
            Ok(command) => Ok(Some(command)),
            Err(ArgsError::Arity) => Err(Error::Usage(spec.to_string())),
            Err(ArgsError::Invalid(err)) => Err(err),
        }
    }
}

/// Usage and summary of every verb, one per line.
pub fn help() -> String {
    let usages: Vec<String> = VERBS.iter().map(|spec| spec.to_string()).collect();
    let width = usages.iter().map(String::len).max().unwrap_or_default();

    let mut text = String::from("Available commands:\n");
    for (usage, spec) in usages.iter().zip(VERBS) {
        text.push_str(&format!("  {usage:<width$}  {}\n", spec.summary));
    }
    text
}
