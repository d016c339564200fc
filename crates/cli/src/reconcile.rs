//! `comrec reconcile` — per-policy commission summaries.

use std::path::{Path, PathBuf};

use serde::Serialize;

use comrec_recon::{
    compute_metrics, reconcile, sort_by_insured, sort_payments_by_date, CommissionSummary, RecordSet,
    SummaryMetrics,
};
use comrec_sheets_client::RetrievalBody;

use crate::context::{AccountArgs, SheetsContext};
use crate::exit_codes::EXIT_INPUT;
use crate::CliError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileOutput<'a> {
    summaries: &'a [CommissionSummary],
    metrics: &'a SummaryMetrics,
    unmatched_payments: usize,
}

pub fn cmd_reconcile(
    account: AccountArgs,
    input: Option<PathBuf>,
    json: bool,
    sort_payments: bool,
) -> Result<(), CliError> {
    let mut records = match input {
        Some(path) => load_snapshot(&path)?,
        None => fetch_records(&account)?,
    };
    if records.repairs.malformed_cells > 0 {
        eprintln!(
            "warning: {} malformed cell(s) read as zero",
            records.repairs.malformed_cells
        );
    }

    if sort_payments {
        sort_payments_by_date(&mut records.payments);
    }
    let mut result = reconcile(&records.policies, &records.payments);
    sort_by_insured(&mut result.summaries);
    let metrics = compute_metrics(&result.summaries);

    if json {
        let out = ReconcileOutput {
            summaries: &result.summaries,
            metrics: &metrics,
            unmatched_payments: result.unmatched_payments,
        };
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::io(format!("cannot encode output: {}", e)))?;
        println!("{text}");
    } else {
        print_table(&result.summaries, &metrics, result.unmatched_payments);
    }
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<RecordSet, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
    let body: RetrievalBody = serde_json::from_str(&text).map_err(|e| {
        CliError::new(EXIT_INPUT, format!("{}: not a `comrec fetch` record: {}", path.display(), e))
    })?;
    if let Some(error) = &body.error {
        return Err(CliError::new(
            EXIT_INPUT,
            format!("{} records a failed fetch: {}", path.display(), error),
        ));
    }
    Ok(body.into_record_set())
}

fn fetch_records(account: &AccountArgs) -> Result<RecordSet, CliError> {
    let ctx = SheetsContext::open(account)?;
    let body = ctx.service.retrieve(Some(&ctx.ids))?;
    let repairs = ctx.service.latest(&ctx.ids).map(|s| s.repairs).unwrap_or_default();
    let mut records = body.into_record_set();
    records.repairs = repairs;
    Ok(records)
}

fn print_table(summaries: &[CommissionSummary], metrics: &SummaryMetrics, unmatched: usize) {
    let insured_width = summaries
        .iter()
        .map(|s| s.insured.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(8, 40);

    println!(
        "{:<iw$}  {:<16}  {:<14}  {:>10}  {:>10}  {:>7}  {:<8}  {}",
        "SEGURADO", "APÓLICE", "SEGURADORA", "PREVISTA", "RECEBIDA", "%", "STATUS", "ÚLTIMO PGTO",
        iw = insured_width,
    );
    for s in summaries {
        let insured: String = s.insured.chars().take(insured_width).collect();
        println!(
            "{:<iw$}  {:<16}  {:<14}  {:>10}  {:>10}  {:>6.1}%  {:<8}  {}",
            insured,
            s.display_policy_id(),
            s.insurer,
            s.expected.to_string(),
            s.received.to_string(),
            s.received_pct,
            s.status.to_string(),
            s.last_payment.as_deref().unwrap_or("-"),
            iw = insured_width,
        );
    }

    println!();
    println!(
        "{} clients: {} received, {} partial, {} pending",
        metrics.total_clients, metrics.received, metrics.partial, metrics.pending
    );
    println!(
        "expected {}  received {}  ({:.1}%)",
        metrics.total_expected, metrics.total_received, metrics.overall_pct
    );
    if unmatched > 0 {
        println!("{} payment(s) matched no policy", unmatched);
    }
}
