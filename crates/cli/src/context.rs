//! Shared setup for commands that talk to Google Sheets.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use comrec_config::{Settings, SheetsStore, DEFAULT_ACCOUNT};
use comrec_sheets_client::{
    connect, ClientOptions, RetrievalService, ServiceAccountKey, SheetIds, SheetRanges, SheetsClient,
    SheetsError,
};

use crate::CliError;

#[derive(Args, Debug, Clone, Default)]
pub struct AccountArgs {
    /// Account whose stored spreadsheet ids to use
    #[arg(long, short = 'a')]
    pub account: Option<String>,

    /// Production spreadsheet id or URL (overrides the stored one)
    #[arg(long, value_name = "ID|URL")]
    pub producao: Option<String>,

    /// Payments spreadsheet id or URL (overrides the stored one)
    #[arg(long, value_name = "ID|URL")]
    pub pagamento: Option<String>,

    /// Service-account JSON key file. Without it, GOOGLE_SERVICE_ACCOUNT_CLIENT_EMAIL +
    /// GOOGLE_SERVICE_ACCOUNT_PRIVATE_KEY or GOOGLE_APPLICATION_CREDENTIALS are used
    #[arg(long, value_name = "FILE")]
    pub key_file: Option<PathBuf>,
}

impl AccountArgs {
    pub fn account_name(&self) -> &str {
        self.account.as_deref().unwrap_or(DEFAULT_ACCOUNT)
    }

    /// Stored ids with flag overrides applied. `None` when either id is
    /// still missing.
    pub fn resolve_ids(&self) -> Result<Option<SheetIds>, CliError> {
        let store = SheetsStore::load()?;
        let stored = store.get(self.account_name());

        let pick = |flag: &Option<String>, stored: Option<&String>| -> String {
            match flag {
                Some(value) => comrec_config::extract_sheet_id(value),
                None => stored.cloned().unwrap_or_default(),
            }
        };
        let ids = SheetIds::new(
            pick(&self.producao, stored.map(|c| &c.producao_sheet_id)),
            pick(&self.pagamento, stored.map(|c| &c.pagamento_sheet_id)),
        );
        Ok(ids.validate().is_ok().then_some(ids))
    }

    /// `--key-file`, else the environment.
    pub fn service_account(&self) -> Result<ServiceAccountKey, CliError> {
        let key = match &self.key_file {
            Some(path) => ServiceAccountKey::from_json_file(path)?,
            None => ServiceAccountKey::from_env()?,
        };
        Ok(key)
    }
}

/// Ids, then credentials, then a connected retrieval service.
pub struct SheetsContext {
    pub ids: SheetIds,
    pub settings: Settings,
    pub service: RetrievalService<SheetsClient>,
}

impl SheetsContext {
    pub fn open(args: &AccountArgs) -> Result<Self, CliError> {
        let ids = args.resolve_ids()?.ok_or_else(|| {
            SheetsError::MissingConfiguration(format!(
                "spreadsheet ids not configured for account '{}'",
                args.account_name()
            ))
        })?;

        let settings = Settings::load();
        let key = args.service_account()?;
        let options = ClientOptions {
            api_base: settings.api_base.clone(),
            token_url: settings.token_url.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        };
        let client = connect(&key, &options)?;
        let ranges = SheetRanges {
            policies: settings.policy_range.clone(),
            payments: settings.payment_range.clone(),
        };
        log::debug!("using {} for account '{}'", key.client_email, args.account_name());

        Ok(Self {
            ids,
            settings,
            service: RetrievalService::new(client, ranges),
        })
    }
}
