use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use storycheck::cli::{self, BatchArgs, ValidateArgs, EXIT_ERROR};
use storycheck::{Result, Validator};

#[derive(Parser)]
#[command(name = "storycheck")]
#[command(author = "Chris Cheng <chris.cheng@shopee.com>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Checklist validation for story documents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Config file (defaults to storycheck.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one story and print its report
    Validate(ValidateArgs),

    /// Validate every story in a directory in sequence order
    Batch(BatchArgs),

    /// List the checklist rules in execution order
    Rules,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    storycheck::logging::init(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}", format!("Error: {:#}", e).red());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Validate(args) => {
            let validator = Validator::new(cli::load_config(cli.config.as_deref())?)?;
            let outcome = cli::validate::run(args, &validator)?;
            Ok(outcome.exit_code())
        }

        Commands::Batch(args) => {
            let validator = Validator::new(cli::load_config(cli.config.as_deref())?)?;
            cli::batch::run(args, &validator)
        }

        Commands::Rules => {
            cli::rules::run();
            Ok(0)
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "storycheck", &mut io::stdout());
            Ok(0)
        }
    }
}
