//! Identity resolution: bank-side counterpart name → alias record.

use serde::Serialize;

use crate::config::IdentityThresholds;
use crate::model::{AliasRecord, IdentityTier};
use crate::normalize::normalize;
use crate::similarity::{partial_ratio, token_set_ratio, token_sort_ratio};

const TOKEN_SET_WEIGHT: f64 = 0.45;
const TOKEN_SORT_WEIGHT: f64 = 0.30;
const PARTIAL_WEIGHT: f64 = 0.25;

/// Floor applied when a significant bank-side word appears in the canonical name.
const WORD_OVERLAP_FLOOR: f64 = 0.85;
const SIGNIFICANT_WORD_LEN: usize = 3;

/// Transfer-channel prefixes, stripped in this order.
const COUNTERPART_PREFIXES: &[&str] = &[
    "MERPAG*",
    "MP*",
    "MERCPAGO*",
    "MERPAGO ",
    "TRANSF ",
    "TRF CR ",
    "ACRED.TRANSF ",
    "CR.TRANSF ",
    "TRANSF.RECIB ",
    "TRANSF CR ",
    "ACRED TRANSF ",
    "CR TRANSF ",
    "PAG ",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdentityMatch {
    pub score: f64,
    pub tier: IdentityTier,
    /// Index into the candidate slice; `None` only when there were no candidates.
    pub alias_index: Option<usize>,
}

impl IdentityMatch {
    fn none() -> Self {
        Self { score: 0.0, tier: IdentityTier::None, alias_index: None }
    }
}

/// Counterpart name from a raw statement description: upper-cased, with
/// transfer prefixes and the trailing `-RET` marker removed.
pub fn extract_counterpart(description: &str) -> String {
    let mut desc = description.trim().to_uppercase();
    for prefix in COUNTERPART_PREFIXES {
        if let Some(rest) = desc.strip_prefix(prefix) {
            desc = rest.to_string();
        }
    }
    let trimmed = desc.trim_end();
    let trimmed = trimmed.strip_suffix("-RET").unwrap_or(trimmed);
    trimmed.trim().to_string()
}

/// Score of two already-normalized strings.
fn pair_score(bank: &str, candidate: &str) -> f64 {
    if bank.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if bank == candidate {
        return 1.0;
    }
    TOKEN_SET_WEIGHT * token_set_ratio(bank, candidate)
        + TOKEN_SORT_WEIGHT * token_sort_ratio(bank, candidate)
        + PARTIAL_WEIGHT * partial_ratio(bank, candidate)
}

fn has_word_overlap(bank: &str, canonical: &str) -> bool {
    !canonical.is_empty()
        && bank
            .split_whitespace()
            .any(|w| w.len() > SIGNIFICANT_WORD_LEN && canonical.contains(w))
}

/// Score one alias record against a normalized bank name.
pub fn score_candidate(bank_normalized: &str, candidate: &AliasRecord) -> f64 {
    let alias = normalize(&extract_counterpart(&candidate.alias));
    let canonical = normalize(&candidate.name);

    let score = pair_score(bank_normalized, &alias).max(pair_score(bank_normalized, &canonical));
    if has_word_overlap(bank_normalized, &canonical) {
        score.max(WORD_OVERLAP_FLOOR)
    } else {
        score
    }
}

/// Best candidate for `bank_text`. Ties keep the earlier candidate.
pub fn resolve_identity(
    bank_text: &str,
    candidates: &[&AliasRecord],
    thresholds: &IdentityThresholds,
) -> IdentityMatch {
    let bank = normalize(bank_text);
    if bank.is_empty() || candidates.is_empty() {
        return IdentityMatch::none();
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let score = score_candidate(&bank, candidate);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }

    let Some((index, score)) = best else {
        return IdentityMatch::none();
    };
    let tier = if score >= thresholds.exact_threshold {
        IdentityTier::Exact
    } else if score >= thresholds.fuzzy_threshold {
        IdentityTier::Fuzzy
    } else {
        IdentityTier::None
    };

    IdentityMatch { score, tier, alias_index: Some(index) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;

    fn alias(alias: &str, name: &str, id: &str) -> AliasRecord {
        AliasRecord {
            alias: alias.into(),
            name: name.into(),
            entity_id: id.into(),
            kind: EntityKind::Customer,
            tax_id: None,
        }
    }

    fn balanced() -> IdentityThresholds {
        IdentityThresholds { exact_threshold: 0.80, fuzzy_threshold: 0.55 }
    }

    #[test]
    fn extract_strips_prefix_and_ret_suffix() {
        assert_eq!(extract_counterpart("MERPAG*PRITTY-RET"), "PRITTY");
        assert_eq!(extract_counterpart("transf Acme Corp"), "ACME CORP");
        assert_eq!(extract_counterpart("TRF CR ZENITH SRL -RET"), "ZENITH SRL");
        assert_eq!(extract_counterpart("PAG PROVEEDOR"), "PROVEEDOR");
        assert_eq!(extract_counterpart("  ACME  "), "ACME");
    }

    #[test]
    fn exact_name_is_exact_tier() {
        let records = [alias("PRITTY", "Pritty S.A.", "c1")];
        let refs: Vec<&AliasRecord> = records.iter().collect();
        let m = resolve_identity("PRITTY SA", &refs, &balanced());
        assert_eq!(m.tier, IdentityTier::Exact);
        assert_eq!(m.alias_index, Some(0));
        assert!((m.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn word_overlap_boost() {
        // "pritty" shows up inside the canonical name; floor of 0.85 applies.
        let records = [alias("XQZ", "Pritty Distribuciones Norte", "c1")];
        let refs: Vec<&AliasRecord> = records.iter().collect();
        let m = resolve_identity("PRITTY", &refs, &balanced());
        assert!(m.score >= WORD_OVERLAP_FLOOR);
        assert_eq!(m.tier, IdentityTier::Exact);
    }

    #[test]
    fn unrelated_name_is_none() {
        let records = [alias("ACME", "Acme Industrial", "c1")];
        let refs: Vec<&AliasRecord> = records.iter().collect();
        let m = resolve_identity("ZENITH", &refs, &balanced());
        assert_eq!(m.tier, IdentityTier::None);
    }

    #[test]
    fn empty_pool_and_empty_text() {
        let m = resolve_identity("PRITTY", &[], &balanced());
        assert_eq!(m, IdentityMatch::none());

        let records = [alias("PRITTY", "Pritty", "c1")];
        let refs: Vec<&AliasRecord> = records.iter().collect();
        assert_eq!(resolve_identity("  S.A. ", &refs, &balanced()).tier, IdentityTier::None);
    }

    #[test]
    fn tie_keeps_earlier_candidate() {
        let records = [alias("PRITTY", "Pritty", "c1"), alias("PRITTY", "Pritty", "c2")];
        let refs: Vec<&AliasRecord> = records.iter().collect();
        let m = resolve_identity("PRITTY", &refs, &balanced());
        assert_eq!(m.alias_index, Some(0));
    }

    #[test]
    fn best_score_wins() {
        let records = [alias("ACME", "Acme", "c1"), alias("PRITTY", "Pritty", "c2")];
        let refs: Vec<&AliasRecord> = records.iter().collect();
        let m = resolve_identity("MERPAG*PRITTY", &refs, &balanced());
        assert_eq!(m.alias_index, Some(1));
    }

    #[test]
    fn fuzzy_tier_between_thresholds() {
        let records = [alias("GARCIA HNOS", "Garcia Hermanos", "c1")];
        let refs: Vec<&AliasRecord> = records.iter().collect();
        let strict = IdentityThresholds { exact_threshold: 0.999, fuzzy_threshold: 0.3 };
        let m = resolve_identity("GARCIAS", &refs, &strict);
        assert_eq!(m.tier, IdentityTier::Fuzzy, "score {}", m.score);
    }
}
