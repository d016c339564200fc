//! Raw sheet rows → typed records.
//!
//! Mapping is positional. A missing cell yields the zero value of its type
//! and a malformed numeric cell is repaired to zero; neither aborts the
//! batch. Every repair is counted in [`RepairStats`] so upstream data-quality
//! problems stay visible.

use std::ops::AddAssign;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Money, PaymentRecord, PolicyRecord};

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

mod policy_col {
    pub const EFFECTIVE_START: usize = 0;
    pub const EFFECTIVE_END: usize = 1;
    pub const POLICY_ID: usize = 2;
    pub const INSURED: usize = 3;
    pub const INSURER: usize = 4;
    pub const INSTALLMENTS: usize = 5;
    pub const NET_PREMIUM: usize = 6;
    pub const FULL_COMMISSION: usize = 7;
    pub const EXPECTED_COMMISSION: usize = 8;
    pub const POLICY_TYPE: usize = 9;
}

mod payment_col {
    pub const INSURED: usize = 0;
    pub const INSURER: usize = 1;
    pub const POLICY_ID: usize = 2;
    pub const INSTALLMENT: usize = 3;
    pub const INSURER_PAID_ON: usize = 4;
    pub const COLLABORATOR_PAID_ON: usize = 5;
    pub const FULL_COMMISSION: usize = 6;
    pub const RECEIVED_COMMISSION: usize = 7;
}

// ---------------------------------------------------------------------------
// Tolerant parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    None,
    /// Cell absent or empty; zero substituted.
    Missing,
    /// Cell present but unparseable; zero substituted.
    Malformed,
}

/// A parsed value and whether it had to be substituted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub repair: Repair,
}

impl<T: Default> Parsed<T> {
    fn ok(value: T) -> Self {
        Self { value, repair: Repair::None }
    }

    fn substituted(repair: Repair) -> Self {
        Self { value: T::default(), repair }
    }
}

/// Per-batch repair counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairStats {
    pub missing_cells: usize,
    pub malformed_cells: usize,
    /// Rows with at least one malformed cell.
    pub rows_with_repairs: usize,
}

impl RepairStats {
    pub fn is_clean(&self) -> bool {
        self.malformed_cells == 0
    }

    fn record(&mut self, repair: Repair) {
        match repair {
            Repair::None => {}
            Repair::Missing => self.missing_cells += 1,
            Repair::Malformed => self.malformed_cells += 1,
        }
    }
}

impl AddAssign for RepairStats {
    fn add_assign(&mut self, rhs: RepairStats) {
        self.missing_cells += rhs.missing_cells;
        self.malformed_cells += rhs.malformed_cells;
        self.rows_with_repairs += rhs.rows_with_repairs;
    }
}

fn cell(row: &[String], idx: usize) -> Option<&str> {
    row.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Text cells are kept as the sheet returned them; keys trim on their own.
fn text(row: &[String], idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}

/// Parse a money cell. Accepts `1548.98`, `1548,98`, `1.548,98` and an
/// optional `R$` prefix; more than two fractional digits round half-up.
pub fn parse_money(raw: Option<&str>) -> Parsed<Money> {
    match raw {
        None => Parsed::substituted(Repair::Missing),
        Some(s) => match parse_money_str(s) {
            Some(m) => Parsed::ok(m),
            None => Parsed::substituted(Repair::Malformed),
        },
    }
}

/// Parse a count cell (installments). `10`, `10,0` and `10.00` all give 10.
pub fn parse_count(raw: Option<&str>) -> Parsed<u32> {
    match raw {
        None => Parsed::substituted(Repair::Missing),
        Some(s) => match parse_count_str(s) {
            Some(n) => Parsed::ok(n),
            None => Parsed::substituted(Repair::Malformed),
        },
    }
}

fn parse_money_str(s: &str) -> Option<Money> {
    let s = s.trim();
    let s = s.strip_prefix("R$").unwrap_or(s).trim_start();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, s),
    };

    // Comma present: pt-BR convention, `.` groups thousands.
    let normalized = if s.contains(',') {
        s.replace('.', "").replacen(',', ".", 1)
    } else {
        s.to_string()
    };

    let (units, frac) = normalized.split_once('.').unwrap_or((normalized.as_str(), ""));
    if units.is_empty() && frac.is_empty() {
        return None;
    }
    if !units.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let units: i64 = if units.is_empty() { 0 } else { units.parse().ok()? };
    let mut cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac[..2].parse().ok()?,
    };
    if frac.len() > 2 && frac.as_bytes()[2] >= b'5' {
        cents += 1;
    }

    let minor = units.checked_mul(100)?.checked_add(cents)?;
    Some(Money::from_cents(if negative { -minor } else { minor }))
}

fn parse_count_str(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u32>() {
        return Some(n);
    }
    let (units, frac) = s.split_once(|c| c == ',' || c == '.')?;
    if !frac.is_empty() && frac.bytes().all(|b| b == b'0') {
        units.parse().ok()
    } else {
        None
    }
}

/// Parse a sheet date (`dd/mm/yyyy`, or ISO `yyyy-mm-dd`).
pub fn parse_sheet_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Records plus the repairs applied while producing them.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub repairs: RepairStats,
}

struct RowRepairs<'a> {
    stats: &'a mut RepairStats,
    malformed: bool,
}

impl<'a> RowRepairs<'a> {
    fn new(stats: &'a mut RepairStats) -> Self {
        Self { stats, malformed: false }
    }

    fn take<T>(&mut self, parsed: Parsed<T>) -> T {
        self.stats.record(parsed.repair);
        if parsed.repair == Repair::Malformed {
            self.malformed = true;
        }
        parsed.value
    }

    fn finish(self) {
        if self.malformed {
            self.stats.rows_with_repairs += 1;
        }
    }
}

pub fn policy_from_row(row: &[String], stats: &mut RepairStats) -> PolicyRecord {
    use policy_col::*;

    let mut repairs = RowRepairs::new(stats);
    let record = PolicyRecord {
        effective_start: text(row, EFFECTIVE_START),
        effective_end: text(row, EFFECTIVE_END),
        policy_id: text(row, POLICY_ID),
        insured: text(row, INSURED),
        insurer: text(row, INSURER),
        installments: repairs.take(parse_count(cell(row, INSTALLMENTS))),
        net_premium: repairs.take(parse_money(cell(row, NET_PREMIUM))),
        full_commission: repairs.take(parse_money(cell(row, FULL_COMMISSION))),
        expected_commission: repairs.take(parse_money(cell(row, EXPECTED_COMMISSION))),
        policy_type: text(row, POLICY_TYPE),
    };
    repairs.finish();
    record
}

pub fn payment_from_row(row: &[String], stats: &mut RepairStats) -> PaymentRecord {
    use payment_col::*;

    let mut repairs = RowRepairs::new(stats);
    let record = PaymentRecord {
        insured: text(row, INSURED),
        insurer: text(row, INSURER),
        policy_id: text(row, POLICY_ID),
        installment: repairs.take(parse_count(cell(row, INSTALLMENT))),
        insurer_paid_on: text(row, INSURER_PAID_ON),
        collaborator_paid_on: text(row, COLLABORATOR_PAID_ON),
        full_commission: repairs.take(parse_money(cell(row, FULL_COMMISSION))),
        received_commission: repairs.take(parse_money(cell(row, RECEIVED_COMMISSION))),
    };
    repairs.finish();
    record
}

pub fn normalize_policies(rows: &[Vec<String>]) -> Normalized<PolicyRecord> {
    let mut repairs = RepairStats::default();
    let records = rows.iter().map(|row| policy_from_row(row, &mut repairs)).collect();
    if !repairs.is_clean() {
        log::warn!(
            "policies: repaired {} malformed cell(s) across {} row(s)",
            repairs.malformed_cells,
            repairs.rows_with_repairs,
        );
    }
    Normalized { records, repairs }
}

pub fn normalize_payments(rows: &[Vec<String>]) -> Normalized<PaymentRecord> {
    let mut repairs = RepairStats::default();
    let records = rows.iter().map(|row| payment_from_row(row, &mut repairs)).collect();
    if !repairs.is_clean() {
        log::warn!(
            "payments: repaired {} malformed cell(s) across {} row(s)",
            repairs.malformed_cells,
            repairs.rows_with_repairs,
        );
    }
    Normalized { records, repairs }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn money(s: &str) -> Option<i64> {
        parse_money_str(s).map(Money::cents)
    }

    #[test]
    fn money_formats() {
        assert_eq!(money("108.43"), Some(10843));
        assert_eq!(money("108,43"), Some(10843));
        assert_eq!(money("1.548,98"), Some(154898));
        assert_eq!(money("R$ 1.548,98"), Some(154898));
        assert_eq!(money("10,8"), Some(1080));
        assert_eq!(money("-24,86"), Some(-2486));
        assert_eq!(money("154"), Some(15400));
        assert_eq!(money(",5"), Some(50));
    }

    #[test]
    fn money_rounds_extra_digits() {
        assert_eq!(money("10.845"), Some(1085));
        assert_eq!(money("10.844"), Some(1084));
    }

    #[test]
    fn money_rejects_garbage() {
        assert_eq!(money("abc"), None);
        assert_eq!(money("NaN"), None);
        assert_eq!(money("inf"), None);
        assert_eq!(money("1,2,3"), None);
        assert_eq!(money("12abc"), None);
        assert_eq!(money("-"), None);
    }

    #[test]
    fn parse_flags_repairs() {
        assert_eq!(parse_money(None).repair, Repair::Missing);
        let bad = parse_money(Some("x"));
        assert_eq!(bad.repair, Repair::Malformed);
        assert_eq!(bad.value, Money::ZERO);
        assert_eq!(parse_money(Some("1,00")).repair, Repair::None);
    }

    #[test]
    fn count_formats() {
        assert_eq!(parse_count_str("10"), Some(10));
        assert_eq!(parse_count_str("10,0"), Some(10));
        assert_eq!(parse_count_str("6.00"), Some(6));
        assert_eq!(parse_count_str("6.5"), None);
        assert_eq!(parse_count_str("-1"), None);
    }

    #[test]
    fn sheet_dates() {
        assert_eq!(parse_sheet_date("20/01/2025"), NaiveDate::from_ymd_opt(2025, 1, 20));
        assert_eq!(parse_sheet_date("2025-01-20"), NaiveDate::from_ymd_opt(2025, 1, 20));
        assert_eq!(parse_sheet_date("31/02/2025"), None);
        assert_eq!(parse_sheet_date(""), None);
    }

    #[test]
    fn full_policy_row() {
        let mut stats = RepairStats::default();
        let policy = policy_from_row(
            &row(&[
                "02/01/2025", "02/01/2026", "225802", "IRACI PEREIRA SANTOS LEITE", "BRADESCO",
                "10", "1548,98", "154,90", "108,43", "Renovação",
            ]),
            &mut stats,
        );
        assert_eq!(policy.policy_id, "225802");
        assert_eq!(policy.installments, 10);
        assert_eq!(policy.net_premium.cents(), 154898);
        assert_eq!(policy.full_commission.cents(), 15490);
        assert_eq!(policy.expected_commission.cents(), 10843);
        assert_eq!(policy.policy_type, "Renovação");
        assert_eq!(stats, RepairStats::default());
    }

    #[test]
    fn text_cells_keep_sheet_whitespace() {
        let mut stats = RepairStats::default();
        let payment = payment_from_row(&row(&[" IRACI ", "BRADESCO ", " 225802", "1", "", "", "", "10,84"]), &mut stats);
        assert_eq!(payment.insured, " IRACI ");
        assert_eq!(payment.insurer, "BRADESCO ");
        assert_eq!(payment.policy_id, " 225802");
        assert_eq!(
            crate::key::Keyed::reconciliation_key(&payment),
            crate::key::ReconciliationKey::Policy("225802".into())
        );
    }

    #[test]
    fn short_policy_row_defaults() {
        // Sheets omits trailing empty cells.
        let mut stats = RepairStats::default();
        let policy = policy_from_row(&row(&["03/01/2025", "03/01/2026", "", "V", "TOKIO MARINE"]), &mut stats);
        assert_eq!(policy.policy_id, "");
        assert_eq!(policy.insured, "V");
        assert_eq!(policy.installments, 0);
        assert_eq!(policy.expected_commission, Money::ZERO);
        assert_eq!(policy.policy_type, "");
        assert_eq!(stats.missing_cells, 4);
        assert_eq!(stats.malformed_cells, 0);
        assert_eq!(stats.rows_with_repairs, 0);
    }

    #[test]
    fn malformed_payment_cells_are_repaired() {
        let normalized = normalize_payments(&[
            row(&["A", "BRADESCO", "225802", "1", "15/01/2025", "20/01/2025", "15,49", "10,84"]),
            row(&["A", "BRADESCO", "225802", "dois", "15/02/2025", "20/02/2025", "??", "10,84"]),
        ]);
        assert_eq!(normalized.records.len(), 2);
        assert_eq!(normalized.records[1].installment, 0);
        assert_eq!(normalized.records[1].full_commission, Money::ZERO);
        assert_eq!(normalized.records[1].received_commission.cents(), 1084);
        assert_eq!(normalized.repairs.malformed_cells, 2);
        assert_eq!(normalized.repairs.rows_with_repairs, 1);
    }

    #[test]
    fn empty_row_is_best_effort() {
        let normalized = normalize_policies(&[Vec::new()]);
        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.records[0], PolicyRecord::default());
    }
}
