//! Command-line inspector for databases reached through the legacy adapter shim.
//!
//! Every subcommand goes through the same [`Adapter`] calls that legacy code
//! makes, so it doubles as a smoke test for a driver configuration.
//!
//! # Security Guarantees
//! - Credentials are redacted before they reach logs
//! - Passwords can be read from the terminal instead of the URL

use clap::{Args, Parser, Subcommand};
use dbshim_core::{
    Adapter, AdapterConfig, CaseFolding, FetchMode, LegacyAdapter, Result, ShimError,
    drivers::mysql::MySqlConnection, error::redact_database_url, init_logging,
};
use std::io::Write;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "dbshim")]
#[command(about = "Inspect a database through the legacy adapter shim")]
#[command(version)]
#[command(long_about = "
dbshim - Legacy adapter shim inspector

Connects through the legacy adapter contract and prints results as JSON:
- Table listings
- Normalized column descriptions
- Server version
- Paginated query results

SUPPORTED DATABASES:
- MySQL (mysql://)

EXAMPLES:
  dbshim --database-url mysql://root@localhost/shop tables
  dbshim --database-url mysql://app@localhost/shop --password-prompt describe orders
  dbshim --fetch-mode num query 'SELECT * FROM orders' --limit 10
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,

    /// Database connection URL
    #[arg(
        long,
        env = "DATABASE_URL",
        help = "Database connection string (credentials will be sanitized in logs)"
    )]
    pub database_url: Option<String>,

    /// Prompt for the password
    #[arg(long, help = "Read the connection password from the terminal")]
    pub password_prompt: bool,

    /// Default fetch style
    #[arg(
        long,
        default_value = "assoc",
        help = "Row shape for query output (assoc, num, both, obj)"
    )]
    pub fetch_mode: FetchMode,

    /// Identifier case folding
    #[arg(
        long,
        default_value = "natural",
        help = "Case folding for introspected names (natural, upper, lower)"
    )]
    pub case_folding: CaseFolding,
}

#[derive(Subcommand)]
pub enum Command {
    /// List tables in the current database
    Tables,
    /// Describe the columns of a table
    Describe(DescribeArgs),
    /// Print the server version
    Version,
    /// Run a query and print its rows
    Query(QueryArgs),
}

#[derive(Args)]
pub struct DescribeArgs {
    /// Table to describe
    pub table: String,

    /// Schema containing the table
    #[arg(long)]
    pub schema: Option<String>,
}

#[derive(Args)]
pub struct QueryArgs {
    /// SQL to run
    pub sql: String,

    /// Maximum number of rows
    #[arg(long)]
    pub limit: Option<i64>,

    /// Rows to skip before the first returned row (ignored without a limit)
    #[arg(long, default_value = "0")]
    pub offset: i64,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    let Some(database_url) = cli.database_url.as_deref() else {
        eprintln!("Error: Database URL is required");
        eprintln!("Use --help for usage information");
        std::process::exit(1);
    };

    let database_url = if cli.password_prompt {
        with_password(database_url, &read_password()?)?
    } else {
        database_url.to_string()
    };

    info!("Connecting to {}", redact_database_url(&database_url));

    let connection = Arc::new(MySqlConnection::new(&database_url)?);
    let config = AdapterConfig::default()
        .with_fetch_mode(cli.fetch_mode)
        .with_case_folding(cli.case_folding);
    let adapter = Adapter::new(connection, config);

    let result = run(&adapter, &cli.command);
    adapter.close_connection();

    let output = result.map_err(|e| {
        error!("Command failed: {}", e);
        e
    })?;
    println!("{}", output);
    Ok(())
}

/// Runs one subcommand and renders its result as pretty JSON.
fn run(adapter: &Adapter, command: &Command) -> Result<String> {
    match command {
        Command::Tables => to_json(&adapter.list_tables()?),
        Command::Describe(args) => {
            to_json(&adapter.describe_table(&args.table, args.schema.as_deref())?)
        }
        Command::Version => to_json(&adapter.server_version()),
        Command::Query(args) => {
            let sql = match args.limit {
                Some(limit) => adapter.limit(&args.sql, limit, args.offset)?,
                None => args.sql.clone(),
            };
            let rows = adapter.fetch_all(sql.as_str().into(), None)?;
            info!("Fetched {} rows", rows.len());
            to_json(&rows)
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ShimError::configuration(format!("Failed to render output: {}", e)))
}

fn read_password() -> Result<String> {
    eprint!("Enter database password: ");
    std::io::stderr().flush().map_err(|e| {
        ShimError::configuration(format!(
            "Failed to flush stderr before reading password: {}",
            e
        ))
    })?;
    rpassword::read_password()
        .map_err(|e| ShimError::configuration(format!("Failed to read password: {}", e)))
}

/// Injects `password` into the connection URL.
fn with_password(database_url: &str, password: &str) -> Result<String> {
    let mut url = url::Url::parse(database_url).map_err(|_| {
        ShimError::configuration(format!(
            "Invalid connection URL {}",
            redact_database_url(database_url)
        ))
    })?;
    url.set_password(Some(password)).map_err(|()| {
        ShimError::configuration("Connection URL cannot carry a password".to_string())
    })?;
    Ok(url.to_string())
}
