use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::Pipeline;
use crate::pool::EntryId;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Money in.
    Credit,
    /// Money out.
    Debit,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credit => write!(f, "credit"),
            Self::Debit => write!(f, "debit"),
        }
    }
}

/// One bank-statement movement, already mapped to the canonical shape.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub direction: Direction,
    pub description: String,
    pub normalized_description: String,
    pub amount_cents: i64,
    pub reference: String,
    pub bank: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterpart_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_code: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Vendor,
}

impl EntityKind {
    /// Ledger side a bank movement in `direction` settles.
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Credit => Self::Customer,
            Direction::Debit => Self::Vendor,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Vendor => write!(f, "vendor"),
        }
    }
}

/// One outstanding invoice (customer) or purchase order (vendor).
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub entity_id: String,
    pub entity_name: String,
    pub kind: EntityKind,
    pub document: String,
    pub amount_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emitted: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Maps a bank-side alias and/or canonical name to a ledger entity.
#[derive(Debug, Clone, Serialize)]
pub struct AliasRecord {
    pub alias: String,
    pub name: String,
    pub entity_id: String,
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

/// Everything a run consumes, loaded wholesale before matching starts.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    /// Processed in this order; earlier transactions claim entries first.
    pub transactions: Vec<Transaction>,
    pub ledger: Vec<LedgerEntry>,
    pub aliases: Vec<AliasRecord>,
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityTier {
    Exact,
    Fuzzy,
    None,
}

/// Ordered tightest first, so `min()` picks the best tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountTier {
    Exact,
    Probable,
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountMatchKind {
    Single,
    /// Every remaining entry of the entity summed.
    SubsetTotal,
    /// A proper subset of the remaining entries.
    SubsetPartial,
}

/// Final classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLevel {
    MatchExact,
    /// Amount explained, identity uncertain.
    ProbableDudaId,
    /// Identity certain, amount unexplained (exchange / withholding difference).
    ProbableDifCambio,
    NoMatch,
}

impl MatchLevel {
    pub fn is_reconciled(self) -> bool {
        !matches!(self, Self::NoMatch)
    }
}

impl std::fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MatchExact => write!(f, "match_exact"),
            Self::ProbableDudaId => write!(f, "probable_duda_id"),
            Self::ProbableDifCambio => write!(f, "probable_dif_cambio"),
            Self::NoMatch => write!(f, "no_match"),
        }
    }
}

/// What kind of movement a bank line is, before any matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Collection,
    VendorPayment,
    BankFee,
    Other,
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collection => write!(f, "collection"),
            Self::VendorPayment => write!(f, "vendor_payment"),
            Self::BankFee => write!(f, "bank_fee"),
            Self::Other => write!(f, "other"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tax-id verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconStatus {
    Matched,
    Suggested,
    Excluded,
}

impl ReconStatus {
    pub fn level(self) -> MatchLevel {
        match self {
            Self::Matched => MatchLevel::MatchExact,
            Self::Suggested => MatchLevel::ProbableDudaId,
            Self::Excluded => MatchLevel::NoMatch,
        }
    }
}

impl std::fmt::Display for ReconStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "MATCHED"),
            Self::Suggested => write!(f, "SUGGESTED"),
            Self::Excluded => write!(f, "EXCLUDED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconTag {
    MissingTaxId,
    TaxIdUnknown,
    MixedChannel,
    AutoSingleChannel,
    AutoDuplicateChannel,
    HomogeneousChannel,
    MultipleChannels,
    DateWindowExceeded,
    SumMixedChannel,
    AutoSumSingleChannel,
    SumMultipleChannels,
    AmountMismatch,
    BankFee,
    VendorPayment,
}

impl std::fmt::Display for ReconTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MissingTaxId => "missing_tax_id",
            Self::TaxIdUnknown => "tax_id_unknown",
            Self::MixedChannel => "mixed_channel",
            Self::AutoSingleChannel => "auto_single_channel",
            Self::AutoDuplicateChannel => "auto_duplicate_channel",
            Self::HomogeneousChannel => "homogeneous_channel",
            Self::MultipleChannels => "multiple_channels",
            Self::DateWindowExceeded => "date_window_exceeded",
            Self::SumMixedChannel => "sum_mixed_channel",
            Self::AutoSumSingleChannel => "auto_sum_single_channel",
            Self::SumMultipleChannels => "sum_multiple_channels",
            Self::AmountMismatch => "amount_mismatch",
            Self::BankFee => "bank_fee",
            Self::VendorPayment => "vendor_payment",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxIdVerdict {
    pub status: ReconStatus,
    pub tag: ReconTag,
    pub band: ConfidenceBand,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Per-transaction result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub level: MatchLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    pub documents: Vec<String>,
    pub entry_ids: Vec<EntryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference_pct: Option<f64>,
    /// 0–100.
    pub confidence: f64,
    pub identity_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_match: Option<AmountMatchKind>,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<TaxIdVerdict>,
}

impl MatchResult {
    /// A result with no entity and no evidence.
    pub fn no_match(rationale: impl Into<String>) -> Self {
        Self {
            level: MatchLevel::NoMatch,
            entity_id: None,
            entity_name: None,
            documents: Vec::new(),
            entry_ids: Vec::new(),
            difference_cents: None,
            difference_pct: None,
            confidence: 0.0,
            identity_score: 0.0,
            amount_match: None,
            rationale: rationale.into(),
            verdict: None,
        }
    }

    /// Number of ledger entries this result consumed.
    pub fn entries_consumed(&self) -> usize {
        self.entry_ids.len()
    }

    pub fn is_subset_match(&self) -> bool {
        matches!(
            self.amount_match,
            Some(AmountMatchKind::SubsetTotal | AmountMatchKind::SubsetPartial)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciledTransaction {
    pub transaction: Transaction,
    pub movement: MovementKind,
    pub result: MatchResult,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Counts and amounts for one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelTally {
    pub count: usize,
    pub amount_cents: i64,
}

impl LevelTally {
    pub fn add(&mut self, amount_cents: i64) {
        self.count += 1;
        self.amount_cents += amount_cents;
    }
}

/// Breakdown for one movement direction (collections or vendor payments).
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectionSummary {
    pub total: usize,
    pub amount_cents: i64,
    pub match_exact: LevelTally,
    pub probable_duda_id: LevelTally,
    pub probable_dif_cambio: LevelTally,
    pub no_match: LevelTally,
    /// Matches that needed more than one ledger entry.
    pub subset_matches: LevelTally,
    pub reconciled: usize,
    pub reconciled_amount_cents: i64,
    /// Percent, one decimal.
    pub reconciliation_rate: f64,
    /// Ledger total outstanding for this side.
    pub ledger_amount_cents: i64,
    /// Bank total minus ledger total.
    pub gap_cents: i64,
    /// Signed sum of exchange differences (bank minus ledger).
    pub exchange_difference_net_cents: i64,
    pub exchange_difference_favor_cents: i64,
    pub exchange_difference_against_cents: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BankSummary {
    pub movements: usize,
    pub match_exact: usize,
    pub probable_duda_id: usize,
    pub probable_dif_cambio: usize,
    pub no_match: usize,
    pub credit_amount_cents: i64,
    pub debit_amount_cents: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconSummary {
    pub total_movements: usize,
    pub match_exact: usize,
    pub probable_duda_id: usize,
    pub probable_dif_cambio: usize,
    pub no_match: usize,
    pub bank_fees: usize,
    pub bank_fee_amount_cents: i64,
    /// Percentages over reconcilable movements (bank fees excluded).
    pub exact_rate: f64,
    pub probable_rate: f64,
    pub no_match_rate: f64,
    pub reconciled_rate: f64,
    pub collections: DirectionSummary,
    pub payments: DirectionSummary,
    pub unreconciled_amount_cents: i64,
    /// Tax-id pipeline only: count per status and per tag.
    pub status_counts: BTreeMap<String, usize>,
    pub tag_counts: BTreeMap<String, usize>,
    pub by_bank: BTreeMap<String, BankSummary>,
}

// ---------------------------------------------------------------------------
// Derived tables + output
// ---------------------------------------------------------------------------

/// Row of the "accepted matches" table, for re-import into the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedMatch {
    pub date: String,
    pub direction: Direction,
    pub entity_id: String,
    pub entity_name: String,
    pub tax_id: String,
    pub amount_cents: i64,
    pub documents: String,
    pub bank: String,
    pub reference: String,
    pub level: MatchLevel,
    pub rationale: String,
    pub confidence: f64,
    pub difference_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    /// Identity not found: register the bank alias for the entity.
    AddAlias,
    /// Counterpart has no tax id in the statement: identify payer by hand.
    IdentifyPayer,
    /// Tax id not on any ledger entry: register it on the customer.
    RegisterTaxId,
    /// Entry mixes cash and bank channels: split it by hand.
    SplitChannels,
    /// Outgoing movement outside this pipeline's scope.
    ReviewPayment,
    ReviewManually,
}

impl std::fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AddAlias => "add alias to the alias table",
            Self::IdentifyPayer => "identify payer manually",
            Self::RegisterTaxId => "register tax id on the ledger entity",
            Self::SplitChannels => "split payment by channel manually",
            Self::ReviewPayment => "review outgoing payment",
            Self::ReviewManually => "review manually",
        };
        f.write_str(s)
    }
}

/// Row of the "exceptions" table.
#[derive(Debug, Clone, Serialize)]
pub struct ExceptionRow {
    pub date: String,
    pub bank: String,
    pub direction: Direction,
    pub movement: MovementKind,
    pub description: String,
    pub amount_cents: i64,
    pub reference: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<ReconTag>,
    pub action: RemediationAction,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DerivedOutputs {
    pub accepted: Vec<AcceptedMatch>,
    pub exceptions: Vec<ExceptionRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub pipeline: Pipeline,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub rows: Vec<ReconciledTransaction>,
    pub derived: DerivedOutputs,
}
