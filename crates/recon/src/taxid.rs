//! Tax-id pipeline: credits keyed on the counterpart's tax identifier,
//! graded by payment-channel purity and emission-date windows.

use chrono::NaiveDate;
use log::debug;
use regex::Regex;

use crate::amount::{find_subset_sum, Tolerance};
use crate::classify::format_cents;
use crate::config::{ReconConfig, TaxIdConfig};
use crate::error::ReconError;
use crate::model::{
    AmountMatchKind, ConfidenceBand, Direction, MatchResult, MovementKind, ReconStatus, ReconTag,
    ReconciledTransaction, TaxIdVerdict, Transaction,
};
use crate::movement::is_bank_fee;
use crate::pool::{EntryId, EntryPool};

/// Bank transaction codes that are always fees or taxes.
const FEE_CODES: &[u32] = &[3254, 4637, 4633, 1743, 3083, 2233];
/// Debit description markers for taxes, withholdings and commissions.
const DEBIT_FEE_PATTERNS: &[&str] = &["IMPUESTO", "IVA", "SIRCREB", "IIBB", "RETENCION", "COMISION"];

const SEPARATOR: &str = " - ";

// ---------------------------------------------------------------------------
// Channel profile
// ---------------------------------------------------------------------------

/// Flags derived from a ledger entry's payment-channel descriptor, e.g.
/// `"Santander - Santander"` or `"Santander - Caja GRANDE"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelProfile {
    pub parts: usize,
    pub single: bool,
    pub multiple: bool,
    /// More than one part, all equal ignoring case.
    pub homogeneous: bool,
    pub has_account: bool,
    pub has_excluded: bool,
    /// Only the reconciled account, nothing mixed in.
    pub pure: bool,
}

impl ChannelProfile {
    pub fn parse(channel: Option<&str>, config: &TaxIdConfig) -> Self {
        let parts: Vec<String> = channel
            .unwrap_or("")
            .split(SEPARATOR)
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        let n = parts.len();
        if n == 0 {
            return Self::default();
        }

        let all_equal = parts.iter().all(|p| *p == parts[0]);
        let excluded = config.excluded_channel.as_deref().map(str::to_lowercase);
        let account = config.account_channel.as_deref().map(str::to_lowercase);

        let has_excluded = excluded
            .as_deref()
            .is_some_and(|marker| parts.iter().any(|p| p.contains(marker)));
        let (has_account, pure) = match account.as_deref() {
            Some(acct) => {
                let matching = parts.iter().filter(|p| p.contains(acct)).count();
                (matching > 0, matching > 0 && matching == n && !has_excluded)
            }
            None => (true, all_equal && !has_excluded),
        };

        Self {
            parts: n,
            single: n == 1,
            multiple: n > 1,
            homogeneous: n > 1 && all_equal,
            has_account,
            has_excluded,
            pure,
        }
    }
}

// ---------------------------------------------------------------------------
// Tax-id extraction
// ---------------------------------------------------------------------------

/// Pulls a tax id (and, when present, the sender name) out of a transfer
/// description such as `"Transferencia Recibida - De Pizza Italia Srl / Mercado Pago /30715023853"`.
#[derive(Debug, Clone)]
pub struct TaxIdExtractor {
    with_sender: Regex,
    bare: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTaxId {
    pub tax_id: String,
    pub sender: Option<String>,
}

impl TaxIdExtractor {
    pub fn new() -> Result<Self, ReconError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| ReconError::ConfigValidation(format!("tax id pattern: {e}")))
        };
        Ok(Self {
            with_sender: compile(r"De\s+(.+?)\s*/.*?(\d{11})")?,
            bare: compile(r"(\d{11})")?,
        })
    }

    pub fn extract(&self, description: &str) -> Option<ExtractedTaxId> {
        if let Some(caps) = self.with_sender.captures(description) {
            return Some(ExtractedTaxId {
                tax_id: caps[2].to_string(),
                sender: Some(caps[1].trim().to_string()),
            });
        }
        self.bare
            .captures(description)
            .map(|caps| ExtractedTaxId { tax_id: caps[1].to_string(), sender: None })
    }
}

/// Digits only: `"30-71836775-8"` → `"30718367758"`.
pub fn normalize_tax_id(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Reconcile every transaction in input order through the tax-id rules.
pub fn reconcile(
    config: &ReconConfig,
    transactions: &[Transaction],
    pool: &mut EntryPool,
) -> Result<Vec<ReconciledTransaction>, ReconError> {
    let extractor = TaxIdExtractor::new()?;
    let mut rows = Vec::with_capacity(transactions.len());

    for tx in transactions {
        let (movement, result) = match tx.direction {
            Direction::Credit => {
                (MovementKind::Collection, reconcile_credit(tx, pool, config, &extractor)?)
            }
            Direction::Debit => classify_debit(tx),
        };
        debug!(
            "tx {}: {} / {}",
            tx.id,
            result.verdict.as_ref().map(|v| v.status.to_string()).unwrap_or_default(),
            result.rationale
        );
        rows.push(ReconciledTransaction { transaction: tx.clone(), movement, result });
    }
    Ok(rows)
}

fn verdict(status: ReconStatus, tag: ReconTag, tax_id: Option<&str>) -> TaxIdVerdict {
    let band = match status {
        ReconStatus::Matched => ConfidenceBand::High,
        ReconStatus::Suggested => ConfidenceBand::Medium,
        ReconStatus::Excluded => ConfidenceBand::Low,
    };
    TaxIdVerdict { status, tag, band, tax_id: tax_id.map(str::to_string) }
}

fn excluded(tag: ReconTag, tax_id: Option<&str>, rationale: String) -> MatchResult {
    let mut result = MatchResult::no_match(rationale);
    result.verdict = Some(verdict(ReconStatus::Excluded, tag, tax_id));
    result
}

fn within_window(bank: NaiveDate, emitted: Option<NaiveDate>, days: u32) -> bool {
    match emitted {
        Some(emitted) => (bank - emitted).num_days().unsigned_abs() <= u64::from(days),
        None => true,
    }
}

/// Outcome of one evaluated credit before it becomes a `MatchResult`.
struct Graded {
    status: ReconStatus,
    tag: ReconTag,
    confidence: f64,
    rationale: String,
}

pub fn reconcile_credit(
    tx: &Transaction,
    pool: &mut EntryPool,
    config: &ReconConfig,
    extractor: &TaxIdExtractor,
) -> Result<MatchResult, ReconError> {
    let cfg = &config.tax_id;

    let tax_id = match tx.tax_id.as_deref().map(normalize_tax_id).filter(|t| !t.is_empty()) {
        Some(t) => t,
        None => match extractor.extract(&tx.description) {
            Some(found) => found.tax_id,
            None => {
                return Ok(excluded(
                    ReconTag::MissingTaxId,
                    None,
                    "no tax id in the statement description".into(),
                ))
            }
        },
    };

    let available = pool.available_for_tax_id(&tax_id);
    let preferred: Vec<EntryId> = available
        .iter()
        .copied()
        .filter(|&id| {
            let entry = pool.get(id);
            let profile = ChannelProfile::parse(entry.channel.as_deref(), cfg);
            let deprioritized = entry.status.as_deref().is_some_and(|s| {
                cfg.deprioritized_statuses.iter().any(|d| d.eq_ignore_ascii_case(s.trim()))
            });
            profile.has_account && !deprioritized
        })
        .collect();
    let candidates = if preferred.is_empty() { available } else { preferred };

    if candidates.is_empty() {
        let rationale = if pool.knows_tax_id(&tax_id) {
            format!("tax id {tax_id}: every ledger entry is already reconciled")
        } else {
            format!("tax id {tax_id} not found in the ledger")
        };
        return Ok(excluded(ReconTag::TaxIdUnknown, Some(&tax_id), rationale));
    }

    let tolerance = Tolerance { pct: cfg.tolerance_pct, abs_cents: cfg.tolerance_abs_cents };

    // Best single entry: smallest difference, earliest on ties. A zero
    // amount on either side never matches.
    let mut best: Option<(EntryId, i64)> = None;
    for &id in &candidates {
        let cents = pool.get(id).amount_cents;
        if cents <= 0 || tx.amount_cents <= 0 {
            continue;
        }
        let diff = (tx.amount_cents - cents).abs();
        if tolerance.accepts(diff, cents) && best.map_or(true, |(_, d)| diff < d) {
            best = Some((id, diff));
        }
    }

    if let Some((id, _)) = best {
        let graded = grade_single(tx, pool, id, cfg);
        pool.reserve(&[id])?;
        return Ok(build_result(tx, pool, &tax_id, &[id], AmountMatchKind::Single, graded));
    }

    let amounts: Vec<(EntryId, i64)> =
        candidates.iter().map(|&id| (id, pool.get(id).amount_cents)).collect();
    if let Some(subset) = find_subset_sum(tx.amount_cents, &amounts, tolerance, &config.subset) {
        let graded = grade_subset(pool, &subset.entries, subset.total_cents, cfg);
        pool.reserve(&subset.entries)?;
        return Ok(build_result(tx, pool, &tax_id, &subset.entries, subset.kind, graded));
    }

    let first = pool.get(candidates[0]);
    let mut result = MatchResult::no_match(format!(
        "tax id matches {}, but {} matches no outstanding entry",
        first.entity_name,
        format_cents(tx.amount_cents)
    ));
    result.level = ReconStatus::Suggested.level();
    result.entity_id = Some(first.entity_id.clone());
    result.entity_name = Some(first.entity_name.clone());
    result.confidence = 60.0;
    result.identity_score = 1.0;
    result.verdict = Some(verdict(ReconStatus::Suggested, ReconTag::AmountMismatch, Some(&tax_id)));
    Ok(result)
}

fn grade_single(tx: &Transaction, pool: &EntryPool, id: EntryId, cfg: &TaxIdConfig) -> Graded {
    let entry = pool.get(id);
    let profile = ChannelProfile::parse(entry.channel.as_deref(), cfg);
    let channel = entry.channel.as_deref().unwrap_or("");

    if profile.has_excluded {
        return Graded {
            status: ReconStatus::Excluded,
            tag: ReconTag::MixedChannel,
            confidence: 20.0,
            rationale: format!(
                "{} {}: channel mixes cash and bank ({channel})",
                entry.entity_name, entry.document
            ),
        };
    }

    if (profile.pure || (profile.single && profile.has_account))
        && within_window(tx.date, entry.emitted, cfg.strict_window_days)
    {
        let tag = if profile.single {
            ReconTag::AutoSingleChannel
        } else {
            ReconTag::AutoDuplicateChannel
        };
        return Graded {
            status: ReconStatus::Matched,
            tag,
            confidence: 95.0,
            rationale: format!(
                "tax id + amount + single account channel: {} {}",
                entry.entity_name, entry.document
            ),
        };
    }

    if within_window(tx.date, entry.emitted, cfg.loose_window_days) {
        return if profile.homogeneous {
            Graded {
                status: ReconStatus::Suggested,
                tag: ReconTag::HomogeneousChannel,
                confidence: cfg.homogeneous_confidence,
                rationale: format!(
                    "tax id + amount, channel repeated ({channel}): {}",
                    entry.entity_name
                ),
            }
        } else {
            Graded {
                status: ReconStatus::Suggested,
                tag: ReconTag::MultipleChannels,
                confidence: cfg.multiple_confidence,
                rationale: format!(
                    "tax id + amount, several channels ({channel}): {}",
                    entry.entity_name
                ),
            }
        };
    }

    let emitted = entry.emitted.map(|d| d.to_string()).unwrap_or_default();
    Graded {
        status: ReconStatus::Suggested,
        tag: ReconTag::DateWindowExceeded,
        confidence: 60.0,
        rationale: format!(
            "tax id + amount, but bank date {} is outside the window of emission {emitted}: {}",
            tx.date, entry.entity_name
        ),
    }
}

fn grade_subset(pool: &EntryPool, ids: &[EntryId], total: i64, cfg: &TaxIdConfig) -> Graded {
    let profiles: Vec<ChannelProfile> = ids
        .iter()
        .map(|&id| ChannelProfile::parse(pool.get(id).channel.as_deref(), cfg))
        .collect();
    let count = ids.len();
    let total = format_cents(total);

    if profiles.iter().any(|p| p.has_excluded) {
        Graded {
            status: ReconStatus::Excluded,
            tag: ReconTag::SumMixedChannel,
            confidence: 25.0,
            rationale: format!("sum of {count} entries matches, but one mixes cash and bank"),
        }
    } else if profiles.iter().all(|p| p.pure) {
        Graded {
            status: ReconStatus::Matched,
            tag: ReconTag::AutoSumSingleChannel,
            confidence: 90.0,
            rationale: format!("tax id + sum of {count} single-channel entries = {total}"),
        }
    } else {
        Graded {
            status: ReconStatus::Suggested,
            tag: ReconTag::SumMultipleChannels,
            confidence: 70.0,
            rationale: format!("tax id + sum of {count} entries = {total}, not all single-channel"),
        }
    }
}

fn build_result(
    tx: &Transaction,
    pool: &EntryPool,
    tax_id: &str,
    ids: &[EntryId],
    kind: AmountMatchKind,
    graded: Graded,
) -> MatchResult {
    let first = pool.get(ids[0]);
    let ledger_total: i64 = ids.iter().map(|&id| pool.get(id).amount_cents).sum();
    let diff = tx.amount_cents - ledger_total;

    MatchResult {
        level: graded.status.level(),
        entity_id: Some(first.entity_id.clone()),
        entity_name: Some(first.entity_name.clone()),
        documents: ids.iter().map(|&id| pool.get(id).document.clone()).collect(),
        entry_ids: ids.to_vec(),
        difference_cents: Some(diff),
        difference_pct: (ledger_total > 0)
            .then(|| diff.abs() as f64 / ledger_total as f64 * 100.0),
        confidence: graded.confidence,
        identity_score: 1.0,
        amount_match: Some(kind),
        rationale: graded.rationale,
        verdict: Some(verdict(graded.status, graded.tag, Some(tax_id))),
    }
}

/// Debits are never reconciled here: they are either bank fees or vendor payments.
pub fn classify_debit(tx: &Transaction) -> (MovementKind, MatchResult) {
    let upper = tx.description.to_uppercase();
    let fee = tx.transaction_code.is_some_and(|c| FEE_CODES.contains(&c))
        || DEBIT_FEE_PATTERNS.iter().any(|p| upper.contains(p))
        || is_bank_fee(&tx.normalized_description);
    let summary: String = upper.chars().take(80).collect();

    if fee {
        let mut result = MatchResult::no_match("bank fee");
        result.verdict = Some(verdict(ReconStatus::Excluded, ReconTag::BankFee, None));
        (MovementKind::BankFee, result)
    } else {
        let mut result = MatchResult::no_match(format!("debit: {summary}"));
        let mut v = verdict(ReconStatus::Excluded, ReconTag::VendorPayment, None);
        v.band = ConfidenceBand::Medium;
        result.verdict = Some(v);
        (MovementKind::VendorPayment, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKind, LedgerEntry};
    use crate::normalize::normalize_statement_text;

    fn cfg() -> ReconConfig {
        let mut c = ReconConfig::default();
        c.tax_id.account_channel = Some("santander".into());
        c.tax_id.excluded_channel = Some("caja grande".into());
        c
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn credit(description: &str, cents: i64) -> Transaction {
        Transaction {
            id: "1".into(),
            date: date("2024-03-10"),
            direction: Direction::Credit,
            description: description.into(),
            normalized_description: normalize_statement_text(description),
            amount_cents: cents,
            reference: String::new(),
            bank: "santander".into(),
            tax_id: None,
            counterpart_name: None,
            transaction_code: None,
        }
    }

    fn sale(doc: &str, cents: i64, channel: &str, emitted: &str) -> LedgerEntry {
        LedgerEntry {
            entity_id: "C-1".into(),
            entity_name: "PIZZA ITALIA SRL".into(),
            kind: EntityKind::Customer,
            document: doc.into(),
            amount_cents: cents,
            tax_id: Some("30715023853".into()),
            channel: Some(channel.into()),
            emitted: Some(date(emitted)),
            status: None,
        }
    }

    const DESC: &str = "Transf Recibida - De Pizza Italia Srl / Mercado Pago /30715023853";

    fn run_one(entries: Vec<LedgerEntry>, tx: &Transaction) -> (MatchResult, EntryPool) {
        let mut pool = EntryPool::new(entries);
        let extractor = TaxIdExtractor::new().unwrap();
        let result = reconcile_credit(tx, &mut pool, &cfg(), &extractor).unwrap();
        (result, pool)
    }

    fn tag(r: &MatchResult) -> ReconTag {
        r.verdict.as_ref().unwrap().tag
    }

    #[test]
    fn channel_profile_flags() {
        let c = cfg().tax_id;
        let p = ChannelProfile::parse(Some("Santander"), &c);
        assert!(p.single && p.has_account && p.pure && !p.homogeneous);

        let p = ChannelProfile::parse(Some("Santander - santander"), &c);
        assert!(p.multiple && p.homogeneous && p.pure);

        let p = ChannelProfile::parse(Some("Santander - Caja GRANDE"), &c);
        assert!(p.has_account && p.has_excluded && !p.pure);

        let p = ChannelProfile::parse(Some("Santander - Galicia"), &c);
        assert!(p.multiple && !p.homogeneous && !p.pure);

        assert_eq!(ChannelProfile::parse(None, &c), ChannelProfile::default());
    }

    #[test]
    fn channel_profile_without_account() {
        let c = TaxIdConfig::default();
        assert!(ChannelProfile::parse(Some("Galicia - galicia"), &c).pure);
        assert!(!ChannelProfile::parse(Some("Galicia - Macro"), &c).pure);
    }

    #[test]
    fn extraction_patterns() {
        let x = TaxIdExtractor::new().unwrap();
        let found = x.extract(DESC).unwrap();
        assert_eq!(found.tax_id, "30715023853");
        assert_eq!(found.sender.as_deref(), Some("Pizza Italia Srl"));

        let found = x.extract("DEPOSITO 20123456789").unwrap();
        assert_eq!(found.tax_id, "20123456789");
        assert!(found.sender.is_none());

        assert!(x.extract("DEPOSITO EFECTIVO").is_none());
        assert_eq!(normalize_tax_id("30-71836775-8"), "30718367758");
    }

    #[test]
    fn missing_tax_id_is_excluded() {
        let (r, pool) = run_one(vec![sale("F-1", 10_000, "Santander", "2024-03-01")], &credit("DEPOSITO EFECTIVO", 10_000));
        assert_eq!(r.level, crate::model::MatchLevel::NoMatch);
        assert_eq!(tag(&r), ReconTag::MissingTaxId);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(pool.consumed_count(), 0);
    }

    #[test]
    fn unknown_tax_id() {
        let (r, _) = run_one(vec![], &credit(DESC, 10_000));
        assert_eq!(tag(&r), ReconTag::TaxIdUnknown);
    }

    #[test]
    fn pure_single_channel_is_matched() {
        let (r, pool) = run_one(vec![sale("F-1", 10_000, "Santander", "2024-03-01")], &credit(DESC, 10_000));
        let v = r.verdict.clone().unwrap();
        assert_eq!(v.status, ReconStatus::Matched);
        assert_eq!(v.tag, ReconTag::AutoSingleChannel);
        assert_eq!(v.band, ConfidenceBand::High);
        assert_eq!(r.confidence, 95.0);
        assert_eq!(pool.consumed_count(), 1);
    }

    #[test]
    fn duplicate_channel_is_matched() {
        let (r, _) = run_one(vec![sale("F-1", 10_000, "Santander - Santander", "2024-03-01")], &credit(DESC, 10_050));
        assert_eq!(tag(&r), ReconTag::AutoDuplicateChannel);
    }

    #[test]
    fn mixed_channel_is_excluded_and_consumed() {
        let (r, pool) = run_one(vec![sale("F-1", 10_000, "Santander - Caja GRANDE", "2024-03-01")], &credit(DESC, 10_000));
        assert_eq!(r.verdict.as_ref().unwrap().status, ReconStatus::Excluded);
        assert_eq!(tag(&r), ReconTag::MixedChannel);
        assert_eq!(r.confidence, 20.0);
        assert_eq!(pool.consumed_count(), 1);
    }

    #[test]
    fn multiple_channels_is_suggested() {
        let (r, _) = run_one(vec![sale("F-1", 10_000, "Santander - Galicia", "2024-03-01")], &credit(DESC, 10_000));
        assert_eq!(tag(&r), ReconTag::MultipleChannels);
        assert_eq!(r.confidence, 75.0);
    }

    #[test]
    fn date_windows() {
        // 40 days: outside strict, inside loose.
        let (r, _) = run_one(vec![sale("F-1", 10_000, "Santander", "2024-01-30")], &credit(DESC, 10_000));
        assert_eq!(tag(&r), ReconTag::MultipleChannels);
        // 70 days: outside both.
        let (r, _) = run_one(vec![sale("F-1", 10_000, "Santander", "2023-12-31")], &credit(DESC, 10_000));
        assert_eq!(tag(&r), ReconTag::DateWindowExceeded);
        assert_eq!(r.confidence, 60.0);
    }

    #[test]
    fn sum_of_pure_entries() {
        let entries = vec![
            sale("F-1", 6_000, "Santander", "2024-03-01"),
            sale("F-2", 4_000, "Santander", "2024-03-02"),
            sale("F-3", 90_000, "Santander", "2024-03-02"),
        ];
        let (r, pool) = run_one(entries, &credit(DESC, 10_000));
        assert_eq!(tag(&r), ReconTag::AutoSumSingleChannel);
        assert_eq!(r.documents, vec!["F-1", "F-2"]);
        assert_eq!(r.amount_match, Some(AmountMatchKind::SubsetPartial));
        assert_eq!(pool.consumed_count(), 2);
    }

    #[test]
    fn sum_with_mixed_channel() {
        let entries = vec![
            sale("F-1", 6_000, "Santander - Caja GRANDE", "2024-03-01"),
            sale("F-2", 4_000, "Santander", "2024-03-02"),
        ];
        let (r, _) = run_one(entries, &credit(DESC, 10_000));
        assert_eq!(tag(&r), ReconTag::SumMixedChannel);
        assert_eq!(r.confidence, 25.0);
    }

    #[test]
    fn amount_mismatch_consumes_nothing() {
        let (r, pool) = run_one(vec![sale("F-1", 50_000, "Santander", "2024-03-01")], &credit(DESC, 10_000));
        assert_eq!(tag(&r), ReconTag::AmountMismatch);
        assert_eq!(r.entity_name.as_deref(), Some("PIZZA ITALIA SRL"));
        assert_eq!(pool.consumed_count(), 0);
    }

    #[test]
    fn overdue_entries_are_deprioritized() {
        let mut overdue = sale("F-1", 10_000, "Santander", "2024-03-01");
        overdue.status = Some("Overdue".into());
        let entries = vec![overdue, sale("F-2", 10_000, "Santander", "2024-03-01")];
        let (r, _) = run_one(entries, &credit(DESC, 10_000));
        assert_eq!(r.documents, vec!["F-2"]);
    }

    #[test]
    fn debit_classification() {
        let mut fee = credit("IMPUESTO LEY 25413", 500);
        fee.direction = Direction::Debit;
        let (movement, r) = classify_debit(&fee);
        assert_eq!(movement, MovementKind::BankFee);
        assert_eq!(r.verdict.unwrap().tag, ReconTag::BankFee);

        let mut coded = credit("DEBITO AUTOMATICO", 500);
        coded.direction = Direction::Debit;
        coded.transaction_code = Some(4637);
        assert_eq!(classify_debit(&coded).0, MovementKind::BankFee);

        let mut payment = credit("TRANSF ENVIADA ACME", 500);
        payment.direction = Direction::Debit;
        let (movement, r) = classify_debit(&payment);
        assert_eq!(movement, MovementKind::VendorPayment);
        let v = r.verdict.unwrap();
        assert_eq!(v.tag, ReconTag::VendorPayment);
        assert_eq!(v.band, ConfidenceBand::Medium);
    }

    #[test]
    fn repeated_channel_outside_strict_window_is_homogeneous() {
        // 40 days: outside strict, inside loose.
        let (r, pool) = run_one(vec![sale("F-1", 10_000, "Santander - Santander", "2024-01-30")], &credit(DESC, 10_000));
        let v = r.verdict.clone().unwrap();
        assert_eq!(v.status, ReconStatus::Suggested);
        assert_eq!(v.tag, ReconTag::HomogeneousChannel);
        assert_eq!(r.confidence, 85.0);
        assert_eq!(pool.consumed_count(), 1);
    }

    #[test]
    fn sum_with_multiple_channels_is_suggested() {
        let entries = vec![
            sale("F-1", 6_000, "Santander - Galicia", "2024-03-01"),
            sale("F-2", 4_000, "Santander", "2024-03-02"),
        ];
        let (r, pool) = run_one(entries, &credit(DESC, 10_000));
        let v = r.verdict.clone().unwrap();
        assert_eq!(v.status, ReconStatus::Suggested);
        assert_eq!(v.tag, ReconTag::SumMultipleChannels);
        assert_eq!(r.confidence, 70.0);
        assert_eq!(r.documents, vec!["F-1", "F-2"]);
        assert_eq!(pool.consumed_count(), 2);
    }

    #[test]
    fn zero_credit_never_consumes() {
        let (r, pool) = run_one(vec![sale("F-1", 50, "Santander", "2024-03-01")], &credit(DESC, 0));
        assert_eq!(tag(&r), ReconTag::AmountMismatch);
        assert!(r.entry_ids.is_empty());
        assert_eq!(pool.consumed_count(), 0);
    }
}
