//! `comrec config` — stored spreadsheet ids and settings location.

use clap::Subcommand;

use comrec_config::{Settings, SheetsStore, DEFAULT_ACCOUNT};

use crate::exit_codes::EXIT_MISSING_CONFIG;
use crate::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Save the production and payments spreadsheet ids for an account
    #[command(after_help = "\
Examples:
  comrec config set --producao 1AbC... --pagamento 1XyZ...
  comrec config set --account filial-2 \\
      --producao https://docs.google.com/spreadsheets/d/1AbC.../edit \\
      --pagamento https://docs.google.com/spreadsheets/d/1XyZ.../edit")]
    Set {
        #[arg(long, short = 'a', default_value = DEFAULT_ACCOUNT)]
        account: String,

        /// Production spreadsheet id or URL
        #[arg(long, value_name = "ID|URL")]
        producao: String,

        /// Payments spreadsheet id or URL
        #[arg(long, value_name = "ID|URL")]
        pagamento: String,
    },

    /// Show stored ids and the effective settings
    Show {
        #[arg(long, short = 'a', default_value = DEFAULT_ACCOUNT)]
        account: String,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Set { account, producao, pagamento } => cmd_config_set(&account, &producao, &pagamento),
        ConfigCommands::Show { account, json } => cmd_config_show(&account, json),
    }
}

fn cmd_config_set(account: &str, producao: &str, pagamento: &str) -> Result<(), CliError> {
    let mut store = SheetsStore::load()?;
    let saved = store.set(account, producao, pagamento)?.clone();
    store.save()?;

    eprintln!("saved account '{}'", account.trim());
    eprintln!("  producao:  {}", saved.producao_sheet_id);
    eprintln!("  pagamento: {}", saved.pagamento_sheet_id);
    Ok(())
}

fn cmd_config_show(account: &str, json: bool) -> Result<(), CliError> {
    let store = SheetsStore::load()?;
    let settings = Settings::load();
    let sheets = store.get(account);

    if json {
        let out = serde_json::json!({
            "account": account,
            "sheets": sheets,
            "settings": settings,
            "settingsPath": Settings::config_path(),
            "sheetsPath": SheetsStore::path(),
        });
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::io(format!("cannot encode output: {}", e)))?;
        println!("{}", text);
    } else {
        println!("account:   {}", account);
        match sheets {
            Some(cfg) => {
                println!("producao:  {}", cfg.producao_sheet_id);
                println!("pagamento: {}", cfg.pagamento_sheet_id);
            }
            None => println!("sheets:    (not configured)"),
        }
        println!("api:       {}", settings.api_base);
        println!("ranges:    {} / {}", settings.policy_range, settings.payment_range);
        println!("timeout:   {}s", settings.timeout_secs);
        println!("settings:  {}", Settings::config_path().display());
    }

    if sheets.is_none() {
        return Err(CliError::new(EXIT_MISSING_CONFIG, "")
            .with_hint(format!("run `comrec config set --account {} --producao <ID|URL> --pagamento <ID|URL>`", account)));
    }
    Ok(())
}
