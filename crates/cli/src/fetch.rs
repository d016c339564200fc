//! `comrec fetch` — retrieval record as JSON, exit code from the outcome.

use std::path::PathBuf;

use comrec_sheets_client::RetrievalBody;

use crate::context::{AccountArgs, SheetsContext};
use crate::CliError;

pub fn cmd_fetch(account: AccountArgs, output: Option<PathBuf>) -> Result<(), CliError> {
    let result = SheetsContext::open(&account)
        .and_then(|ctx| ctx.service.retrieve(Some(&ctx.ids)).map_err(CliError::from));

    // Failures still produce a record, with empty lists and the error message.
    let (body, outcome) = match result {
        Ok(body) => (body, Ok(())),
        Err(err) => (RetrievalBody::failure(err.message.clone()), Err(err)),
    };

    let json = serde_json::to_string_pretty(&body)
        .map_err(|e| CliError::io(format!("cannot encode output: {}", e)))?;
    match output {
        Some(path) => {
            std::fs::write(&path, json + "\n")
                .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    outcome
}
