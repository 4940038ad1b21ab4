//! Amount resolution: single-entry tolerance, then bounded subset-sum.

use log::warn;
use serde::Serialize;

use crate::config::{AmountTolerance, SubsetLimits};
use crate::model::{AmountMatchKind, AmountTier};
use crate::pool::EntryId;

/// Acceptance band around a target amount. Either bound is enough.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Fraction of the reference amount (0.005 = 0.5%).
    pub pct: f64,
    pub abs_cents: i64,
}

impl Tolerance {
    pub fn pct_only(pct: f64) -> Self {
        Self { pct, abs_cents: 0 }
    }

    /// `diff` is within tolerance of `reference`. Inclusive on both bounds.
    pub fn accepts(&self, diff: i64, reference: i64) -> bool {
        if reference <= 0 {
            return false;
        }
        let diff = diff.abs();
        diff <= self.abs_cents || diff as f64 / reference as f64 <= self.pct
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountMatch {
    pub tier: AmountTier,
    /// Entries backing the match, in pool order. Empty on no-match.
    pub entries: Vec<EntryId>,
    /// Bank minus ledger.
    pub difference_cents: Option<i64>,
    /// `|difference| / ledger`, in percent.
    pub difference_pct: Option<f64>,
    pub kind: Option<AmountMatchKind>,
}

impl AmountMatch {
    pub fn no_match() -> Self {
        Self {
            tier: AmountTier::NoMatch,
            entries: Vec::new(),
            difference_cents: None,
            difference_pct: None,
            kind: None,
        }
    }

    fn from_single(id: EntryId, tier: AmountTier, bank: i64, entry: i64) -> Self {
        Self {
            tier,
            entries: vec![id],
            difference_cents: Some(bank - entry),
            difference_pct: Some(percent(bank - entry, entry)),
            kind: Some(AmountMatchKind::Single),
        }
    }

    fn from_subset(subset: SubsetMatch, bank: i64) -> Self {
        let diff = bank - subset.total_cents;
        Self {
            tier: AmountTier::Exact,
            difference_pct: Some(percent(diff, subset.total_cents)),
            difference_cents: Some(diff),
            entries: subset.entries,
            kind: Some(subset.kind),
        }
    }

    pub fn is_subset(&self) -> bool {
        matches!(self.kind, Some(AmountMatchKind::SubsetTotal | AmountMatchKind::SubsetPartial))
    }
}

fn percent(diff: i64, reference: i64) -> f64 {
    if reference == 0 {
        return 0.0;
    }
    diff.abs() as f64 / reference as f64 * 100.0
}

/// Tier of one bank/ledger pair.
pub fn single_tier(bank_cents: i64, entry_cents: i64, tolerance: &AmountTolerance) -> AmountTier {
    if bank_cents <= 0 || entry_cents <= 0 {
        return AmountTier::NoMatch;
    }
    let diff = (bank_cents - entry_cents).abs();
    if Tolerance::pct_only(tolerance.exact_pct).accepts(diff, entry_cents) {
        AmountTier::Exact
    } else if (Tolerance { pct: tolerance.probable_pct, abs_cents: tolerance.probable_abs_cents })
        .accepts(diff, entry_cents)
    {
        AmountTier::Probable
    } else {
        AmountTier::NoMatch
    }
}

/// Best single entry by tier, then smallest difference, then pool order.
fn best_single(bank_cents: i64, candidates: &[(EntryId, i64)], tolerance: &AmountTolerance) -> Option<(EntryId, i64, AmountTier)> {
    let mut best: Option<(EntryId, i64, AmountTier)> = None;
    for &(id, cents) in candidates {
        let tier = single_tier(bank_cents, cents, tolerance);
        if tier == AmountTier::NoMatch {
            continue;
        }
        let diff = (bank_cents - cents).abs();
        let better = match best {
            None => true,
            Some((_, best_cents, best_tier)) => {
                (tier, diff) < (best_tier, (bank_cents - best_cents).abs())
            }
        };
        if better {
            best = Some((id, cents, tier));
        }
    }
    best
}

/// Resolve a bank amount against an entity's outstanding entries.
///
/// An exact single entry wins outright. Otherwise a subset within the
/// exact-tier percentage is preferred over a probable single entry.
pub fn resolve_amount(
    amount_cents: i64,
    candidates: &[(EntryId, i64)],
    tolerance: &AmountTolerance,
    limits: &SubsetLimits,
) -> AmountMatch {
    if amount_cents <= 0 || candidates.is_empty() {
        return AmountMatch::no_match();
    }

    let single = best_single(amount_cents, candidates, tolerance);
    if let Some((id, cents, AmountTier::Exact)) = single {
        return AmountMatch::from_single(id, AmountTier::Exact, amount_cents, cents);
    }

    if let Some(subset) =
        find_subset_sum(amount_cents, candidates, Tolerance::pct_only(tolerance.exact_pct), limits)
    {
        return AmountMatch::from_subset(subset, amount_cents);
    }

    match single {
        Some((id, cents, tier)) => AmountMatch::from_single(id, tier, amount_cents, cents),
        None => AmountMatch::no_match(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsetMatch {
    /// In pool order.
    pub entries: Vec<EntryId>,
    pub total_cents: i64,
    pub kind: AmountMatchKind,
}

/// First subset of ≥ 2 entries whose total is within `tolerance` of `target`.
///
/// The sum of every candidate is tried first. Then combinations of the
/// largest `max_candidates` entries, sorted by descending amount, are
/// enumerated by size (2 up to the cap from `limits`) in lexicographic order.
pub fn find_subset_sum(
    target: i64,
    candidates: &[(EntryId, i64)],
    tolerance: Tolerance,
    limits: &SubsetLimits,
) -> Option<SubsetMatch> {
    if target <= 0 {
        return None;
    }

    let positive: Vec<(EntryId, i64)> = candidates
        .iter()
        .copied()
        .filter(|&(id, cents)| {
            if cents <= 0 {
                warn!("subset search skips entry {} with non-positive amount {cents}", id.index());
            }
            cents > 0
        })
        .collect();
    if positive.len() < 2 {
        return None;
    }

    let total: i64 = positive.iter().map(|&(_, c)| c).sum();
    if tolerance.accepts(target - total, target) {
        return Some(SubsetMatch {
            entries: sorted_ids(positive.iter().map(|&(id, _)| id)),
            total_cents: total,
            kind: AmountMatchKind::SubsetTotal,
        });
    }

    let mut ordered = positive.clone();
    // Stable: equal amounts keep pool order.
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    ordered.truncate(limits.max_candidates.max(2));

    let cap = limits.max_size(positive.len()).min(ordered.len());
    let amounts: Vec<i64> = ordered.iter().map(|&(_, c)| c).collect();

    let mut picked: Vec<usize> = Vec::with_capacity(cap);
    for size in 2..=cap {
        picked.clear();
        if search(&amounts, size, 0, 0, target, &tolerance, &mut picked) {
            let entries = sorted_ids(picked.iter().map(|&i| ordered[i].0));
            let total_cents = picked.iter().map(|&i| amounts[i]).sum();
            let kind = if entries.len() == positive.len() {
                AmountMatchKind::SubsetTotal
            } else {
                AmountMatchKind::SubsetPartial
            };
            return Some(SubsetMatch { entries, total_cents, kind });
        }
    }
    None
}

/// Depth-first search for exactly `size` indices starting at `start`.
///
/// Amounts are positive, so an over-target partial sum that is already
/// rejected stays rejected as the subset grows.
fn search(
    amounts: &[i64],
    size: usize,
    start: usize,
    sum: i64,
    target: i64,
    tolerance: &Tolerance,
    picked: &mut Vec<usize>,
) -> bool {
    if picked.len() == size {
        return tolerance.accepts(target - sum, target);
    }
    let remaining = size - picked.len();
    for i in start..=amounts.len().saturating_sub(remaining) {
        if i >= amounts.len() {
            break;
        }
        let next = sum + amounts[i];
        if next > target && !tolerance.accepts(target - next, target) {
            continue;
        }
        picked.push(i);
        if search(amounts, size, i + 1, next, target, tolerance, picked) {
            return true;
        }
        picked.pop();
    }
    false
}

fn sorted_ids(ids: impl Iterator<Item = EntryId>) -> Vec<EntryId> {
    let mut ids: Vec<EntryId> = ids.collect();
    ids.sort();
    ids
}
