//! Ternary classification: identity tier × amount evidence → final level.

use crate::amount::AmountMatch;
use crate::identity::IdentityMatch;
use crate::model::{AmountMatchKind, AmountTier, EntityKind, IdentityTier, MatchLevel};
use crate::pool::EntryId;

/// Outcome of the priority table for one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub level: MatchLevel,
    /// Entries to reserve. Empty when the level carries no amount evidence.
    pub consume: Vec<EntryId>,
    pub rationale: String,
}

/// Apply the priority table.
///
/// | identity | amount                         | level                   |
/// |----------|--------------------------------|-------------------------|
/// | none     | any                            | no_match                |
/// | exact    | exact single / subset          | match_exact             |
/// | exact    | probable single                | probable_dif_cambio     |
/// | exact    | none, or nothing outstanding   | probable_dif_cambio (∅) |
/// | fuzzy    | exact / probable / subset      | probable_duda_id        |
/// | fuzzy    | none, or nothing outstanding   | probable_duda_id (∅)    |
///
/// Subset evidence is already preferred over a probable single entry by
/// [`crate::amount::resolve_amount`].
pub fn classify(
    identity: &IdentityMatch,
    amount: &AmountMatch,
    outstanding: usize,
    kind: EntityKind,
) -> Decision {
    let who = identity_label(identity);

    if identity.tier == IdentityTier::None {
        return Decision {
            level: MatchLevel::NoMatch,
            consume: Vec::new(),
            rationale: format!("{who}: counterpart not found"),
        };
    }

    let unmatched_level = match identity.tier {
        IdentityTier::Exact => MatchLevel::ProbableDifCambio,
        _ => MatchLevel::ProbableDudaId,
    };

    if outstanding == 0 {
        return Decision {
            level: unmatched_level,
            consume: Vec::new(),
            rationale: format!("{who} + no outstanding {}", documents_word(kind)),
        };
    }

    match (identity.tier, amount.tier) {
        (_, AmountTier::NoMatch) => Decision {
            level: unmatched_level,
            consume: Vec::new(),
            rationale: format!("{who} + no amount match"),
        },
        (IdentityTier::Exact, AmountTier::Exact) => Decision {
            level: MatchLevel::MatchExact,
            consume: amount.entries.clone(),
            rationale: format!("{who} + {}", amount_label(amount, kind)),
        },
        (IdentityTier::Exact, AmountTier::Probable) => Decision {
            level: MatchLevel::ProbableDifCambio,
            consume: amount.entries.clone(),
            rationale: format!("{who} + {}", amount_label(amount, kind)),
        },
        (_, _) => Decision {
            level: MatchLevel::ProbableDudaId,
            consume: amount.entries.clone(),
            rationale: format!("{who} + {}", amount_label(amount, kind)),
        },
    }
}

fn identity_label(identity: &IdentityMatch) -> String {
    let tier = match identity.tier {
        IdentityTier::Exact => "exact",
        IdentityTier::Fuzzy => "fuzzy",
        IdentityTier::None => "none",
    };
    format!("identity {tier} ({:.2})", identity.score)
}

fn documents_word(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Customer => "invoices",
        EntityKind::Vendor => "orders",
    }
}

fn amount_label(amount: &AmountMatch, kind: EntityKind) -> String {
    match (amount.kind, amount.tier) {
        (Some(AmountMatchKind::SubsetTotal | AmountMatchKind::SubsetPartial), _) => {
            format!("sum of {} {}", amount.entries.len(), documents_word(kind))
        }
        (_, AmountTier::Exact) => "exact amount".to_string(),
        _ => {
            let diff = amount.difference_cents.unwrap_or(0);
            let pct = amount.difference_pct.unwrap_or(0.0);
            format!("probable amount (diff {}, {pct:.2}%)", format_cents(diff))
        }
    }
}

/// `-1234` → `-12.34`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Confidence on a 0–100 scale, one decimal.
pub fn confidence(identity_score: f64) -> f64 {
    (identity_score.clamp(0.0, 1.0) * 1000.0).round() / 10.0
}
