use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use rusqlite::types::Value;
use rythm_store::sqlite_persistence::{column_names, user_tables};
use rythm_store::{Database, Row, Store, StoreOptions};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;

use cli_style::{get_styles, TableBuilder};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the database image. Created on exit if it does not exist.
    #[clap(value_parser = parse_path)]
    pub path: PathBuf,

    /// Print rows as JSON instead of a table.
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Runs a statement and shows the last inserted id and the affected rows.
    Run { sql: String, params: Vec<String> },

    /// Shows the first row returned by a query, if any.
    Get { sql: String, params: Vec<String> },

    /// Shows every row returned by a query.
    All { sql: String, params: Vec<String> },

    /// Lists the tables and their columns.
    Tables,

    /// Writes the database image now.
    Flush,

    /// Shows the path of the current database image.
    Where,

    /// Writes the database image and closes this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

/// `null`, integers and reals are bound with their type, anything else as text.
fn parse_param(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Real(f);
    }
    Value::Text(raw.to_string())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn print_rows(rows: &[Row], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    let Some(first) = rows.first() else {
        cli_style::print_empty_list("(no rows)");
        return Ok(());
    };
    let mut table = TableBuilder::new(first.columns());
    for row in rows {
        table.add_row(row.values().iter().map(display_value).collect());
    }
    table.print();
    println!("{} row(s)", rows.len());
    Ok(())
}

struct Console {
    store: Store,
    db: Database,
    json: bool,
}

impl Console {
    fn execute(&self, command: InnerCommand) -> Result<CommandExecutionResult> {
        match command {
            InnerCommand::Run { sql, params } => {
                let values: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();
                let result = self.db.run(&sql, rusqlite::params_from_iter(values))?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    cli_style::print_key_value("last_insert_id", &result.last_insert_id.to_string());
                    cli_style::print_key_value("rows_affected", &result.rows_affected.to_string());
                }
            }
            InnerCommand::Get { sql, params } => {
                let values: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();
                let row = self.db.get(&sql, rusqlite::params_from_iter(values))?;
                print_rows(row.as_slice(), self.json)?;
            }
            InnerCommand::All { sql, params } => {
                let values: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();
                let rows = self.db.all(&sql, rusqlite::params_from_iter(values))?;
                print_rows(&rows, self.json)?;
            }
            InnerCommand::Tables => {
                let tables = self.db.with_connection(|conn| {
                    let mut tables = Vec::new();
                    for table in user_tables(conn)? {
                        let columns = column_names(conn, &table)?;
                        tables.push((table, columns));
                    }
                    Ok(tables)
                })?;
                for (table, columns) in tables {
                    cli_style::print_key_value(&table, &columns.join(", "));
                }
            }
            InnerCommand::Flush => {
                self.store.flush_now()?;
                cli_style::print_success(&format!(
                    "Database image written to {}",
                    self.store.image_path().display()
                ));
            }
            InnerCommand::Where => {
                println!("{}", self.store.image_path().display());
            }
            InnerCommand::Exit => return Ok(CommandExecutionResult::Exit),
        }
        Ok(CommandExecutionResult::Ok)
    }
}

fn execute_command(line: String, console: &Console) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            println!("{} {}", PROMPT, &line);
            match console.execute(cli.command) {
                Ok(result) => result,
                Err(err) => CommandExecutionResult::Error(format!("{}", err)),
            }
        }
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
            CommandExecutionResult::Ok
        }
    }
}

#[derive(rustyline_derive::Hinter)]
struct MyHelper {
    commands_names: Vec<String>,
}

impl MyHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        MyHelper { commands_names }
    }
}

impl Completer for MyHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for MyHelper {}
impl Validator for MyHelper {}
impl Helper for MyHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let store = Store::initialize(&StoreOptions {
        image_path: cli_args.path.clone(),
        snapshot_interval: None,
    })
    .with_context(|| format!("Failed to open database image {:?}", cli_args.path))?;

    let console = Console {
        db: store.database(),
        store,
        json: cli_args.json,
    };

    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<MyHelper, FileHistory>::with_config(config)?;
    rl.set_helper(Some(MyHelper::new()));

    loop {
        let readline = rl.readline(PROMPT);

        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &console) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        cli_style::print_error(&err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }

    console.store.close()?;
    cli_style::print_goodbye();
    Ok(())
}
