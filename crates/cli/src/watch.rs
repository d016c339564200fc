//! `comrec watch` — periodic refresh.
//!
//! A failed cycle is reported and the previous snapshot stays current; the
//! loop keeps going.

use std::thread;
use std::time::Duration;

use comrec_recon::compute_metrics;
use comrec_sheets_client::RefreshOutcome;

use crate::context::{AccountArgs, SheetsContext};
use crate::CliError;

pub fn cmd_watch(account: AccountArgs, interval: Option<u64>, count: Option<u64>) -> Result<(), CliError> {
    let ctx = SheetsContext::open(&account)?;
    let interval = interval.unwrap_or(ctx.settings.refresh_interval_secs);
    if interval == 0 {
        return Err(CliError::usage("--interval must be at least 1 second"));
    }
    log::info!("refreshing every {}s", interval);

    let mut cycle: u64 = 0;
    loop {
        cycle += 1;
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

        match ctx.service.refresh(&ctx.ids) {
            Ok(RefreshOutcome::Updated(snapshot)) => {
                let result = snapshot.reconcile();
                let m = compute_metrics(&result.summaries);
                println!(
                    "[{now}] {} clients | received {} partial {} pending {} | {} of {} ({:.1}%)",
                    m.total_clients, m.received, m.partial, m.pending,
                    m.total_received, m.total_expected, m.overall_pct,
                );
                if result.unmatched_payments > 0 {
                    println!("[{now}] {} payment(s) matched no policy", result.unmatched_payments);
                }
            }
            Ok(RefreshOutcome::Absorbed) => {
                log::debug!("cycle {} absorbed by a refresh in flight", cycle);
            }
            Err(err) => {
                let kept = match ctx.service.latest(&ctx.ids) {
                    Some(s) => format!("keeping snapshot from {}", s.last_updated.to_rfc3339()),
                    None => "no snapshot yet".to_string(),
                };
                eprintln!("[{now}] error: {} ({})", err, kept);
            }
        }

        if count.is_some_and(|n| cycle >= n) {
            return Ok(());
        }
        thread::sleep(Duration::from_secs(interval));
    }
}
