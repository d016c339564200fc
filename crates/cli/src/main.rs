// comrec CLI - commission reconciliation against Google Sheets

mod config_cmd;
mod context;
mod exit_codes;
mod fetch;
mod reconcile;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use comrec_config::ConfigError;
use comrec_sheets_client::SheetsError;
use exit_codes::{sheets_exit_code, EXIT_CREDENTIALS, EXIT_IO, EXIT_MISSING_CONFIG, EXIT_SUCCESS, EXIT_USAGE};

use config_cmd::ConfigCommands;
use context::AccountArgs;

#[derive(Parser)]
#[command(name = "comrec")]
#[command(about = "Reconcile expected against received insurance commissions")]
#[command(version)]
struct Cli {
    /// Increase log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage stored spreadsheet ids
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Fetch both sheets and print the retrieval record as JSON
    #[command(after_help = "\
Examples:
  comrec fetch
  comrec fetch --account corretora-sul --output snapshot.json
  GOOGLE_APPLICATION_CREDENTIALS=sa.json comrec fetch")]
    Fetch {
        #[command(flatten)]
        account: AccountArgs,

        /// Write the JSON to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Reconcile policies against payments and print per-policy summaries
    #[command(after_help = "\
Examples:
  comrec reconcile
  comrec reconcile --json
  comrec reconcile --input snapshot.json --sort-payments")]
    Reconcile {
        #[command(flatten)]
        account: AccountArgs,

        /// Read a saved `comrec fetch` output instead of fetching
        #[arg(long, conflicts_with_all = ["account", "producao", "pagamento", "key_file"])]
        input: Option<PathBuf>,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Apply payments in date order so the last payment is the latest one
        #[arg(long)]
        sort_payments: bool,
    },

    /// Refresh periodically and print metrics after each cycle
    Watch {
        #[command(flatten)]
        account: AccountArgs,

        /// Seconds between refreshes (default: watch.refreshIntervalSecs)
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many cycles
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<SheetsError> for CliError {
    fn from(err: SheetsError) -> Self {
        let code = sheets_exit_code(&err);
        let hint = match code {
            EXIT_MISSING_CONFIG => {
                Some("run `comrec config set --producao <ID|URL> --pagamento <ID|URL>`".to_string())
            }
            EXIT_CREDENTIALS => Some(
                "set GOOGLE_SERVICE_ACCOUNT_CLIENT_EMAIL and GOOGLE_SERVICE_ACCOUNT_PRIVATE_KEY, \
                 or pass --key-file"
                    .to_string(),
            ),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation(msg) => CliError::usage(msg),
            other => CliError::io(other.to_string()),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Config(cmd) => config_cmd::cmd_config(cmd),
        Commands::Fetch { account, output } => fetch::cmd_fetch(account, output),
        Commands::Reconcile { account, input, json, sort_payments } => {
            reconcile::cmd_reconcile(account, input, json, sort_payments)
        }
        Commands::Watch { account, interval, count } => watch::cmd_watch(account, interval, count),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
