pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "shopmate",
    about = "Shopmate assistant operator CLI",
    long_about = "Run a local chat session against the fixture catalog, or apply database migrations.",
    after_help = "Examples:\n  shopmate chat\n  shopmate migrate --database-url sqlite://shopmate.db"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "Path to a shopmate.toml config file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Override the database URL")]
    database_url: Option<String>,

    #[arg(long, global = true, help = "Override the log level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Interactive chat REPL wired to the deterministic fixture collaborators")]
    Chat,
    #[command(about = "Apply pending database migrations")]
    Migrate,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let options = commands::load_options(cli.config, cli.database_url, cli.log_level);

    let result = match cli.command {
        Command::Chat => commands::chat::run(options),
        Command::Migrate => commands::migrate::run(options),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
