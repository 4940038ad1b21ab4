// Property-based tests for normalization, amount tolerance, subset search
// and the engine's consumption guarantees.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use chrono::NaiveDate;
use proptest::prelude::*;

use conciliar_recon::amount::{find_subset_sum, Tolerance};
use conciliar_recon::config::{ReconConfig, SubsetLimits};
use conciliar_recon::engine::run;
use conciliar_recon::model::{
    AliasRecord, Direction, EntityKind, LedgerEntry, ReconInput, Transaction,
};
use conciliar_recon::normalize::{normalize, normalize_statement_text};
use conciliar_recon::pool::{EntryId, EntryPool};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn config_64() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(64),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Statement-ish text: names, legal forms, punctuation, accents.
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"[A-Za-z0-9 .,*/-]{0,30}",
        2 => r"[A-Za-zÁÉÍÓÚÑáéíóúñü ]{0,24}",
        1 => Just("José García S.A.".to_string()),
        1 => Just("MERPAG*PRITTY-RET".to_string()),
    ]
}

fn accent(c: char) -> char {
    match c {
        'a' => 'á',
        'e' => 'é',
        'i' => 'í',
        'o' => 'ó',
        'u' => 'ú',
        'n' => 'ñ',
        other => other,
    }
}

/// Pool of positive amounts with ids handed out by a real pool.
fn pool_ids(amounts: &[i64]) -> Vec<(EntryId, i64)> {
    let pool = EntryPool::new(amounts.iter().enumerate().map(|(i, &a)| invoice("C-1", i, a)).collect());
    pool.available_for_entity(EntityKind::Customer, "C-1")
        .into_iter()
        .map(|id| (id, pool.get(id).amount_cents))
        .collect()
}

fn invoice(entity_id: &str, n: usize, cents: i64) -> LedgerEntry {
    LedgerEntry {
        entity_id: entity_id.to_string(),
        entity_name: format!("{entity_id} SA"),
        kind: EntityKind::Customer,
        document: format!("F-{n:04}"),
        amount_cents: cents,
        tax_id: None,
        channel: None,
        emitted: None,
        status: None,
    }
}

const NAMES: &[&str] = &["PRITTY", "GARCIA HNOS", "NORTE DISTRIB", "ACME INSUMOS"];

/// Customers drawn from [`NAMES`], invoices against them, and credits whose
/// descriptions mention one of the names (or nobody) with amounts that are
/// sometimes sums of invoices.
fn arb_input() -> impl Strategy<Value = ReconInput> {
    let entries = prop::collection::vec((0..NAMES.len(), 1_000i64..500_000), 0..12);
    let txs = prop::collection::vec((0..=NAMES.len(), 1_000i64..900_000, any::<bool>()), 0..10);
    (entries, txs).prop_map(|(entries, txs)| {
        let ledger: Vec<LedgerEntry> = entries
            .iter()
            .enumerate()
            .map(|(n, &(who, cents))| invoice(&format!("C-{who}"), n, cents))
            .collect();
        let aliases = NAMES
            .iter()
            .enumerate()
            .map(|(who, name)| AliasRecord {
                alias: format!("TRANSF {name}"),
                name: name.to_string(),
                entity_id: format!("C-{who}"),
                kind: EntityKind::Customer,
                tax_id: None,
            })
            .collect();
        let transactions = txs
            .iter()
            .enumerate()
            .map(|(n, &(who, cents, reuse))| {
                let name = NAMES.get(who).copied().unwrap_or("ZENITH LOGISTICA");
                // Sometimes pay exactly one of the generated invoices.
                let amount = match ledger.get(n) {
                    Some(e) if reuse => e.amount_cents,
                    _ => cents,
                };
                let description = format!("TRANSF {name}");
                Transaction {
                    id: format!("T{n}"),
                    date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    direction: Direction::Credit,
                    normalized_description: normalize_statement_text(&description),
                    description,
                    amount_cents: amount,
                    reference: String::new(),
                    bank: "galicia".to_string(),
                    tax_id: None,
                    counterpart_name: None,
                    transaction_code: None,
                }
            })
            .collect();
        ReconInput { transactions, ledger, aliases }
    })
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn normalize_is_idempotent(text in arb_text()) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalize_ignores_accents_and_case(text in r"[a-z ]{0,24}") {
        let accented: String = text.chars().map(accent).collect();
        prop_assert_eq!(normalize(&accented.to_uppercase()), normalize(&text));
    }

    #[test]
    fn normalized_output_is_plain_tokens(text in arb_text()) {
        let out = normalize(&text);
        prop_assert!(out.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '));
        prop_assert!(!out.contains("  "));
        prop_assert_eq!(out.trim(), out.as_str());
    }
}

// ---------------------------------------------------------------------------
// Tolerance and subset search
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn absolute_tolerance_is_inclusive(reference in 1i64..10_000_000, abs in 0i64..100_000) {
        let tol = Tolerance { pct: 0.0, abs_cents: abs };
        prop_assert!(tol.accepts(abs, reference));
        prop_assert!(tol.accepts(-abs, reference));
        prop_assert!(!tol.accepts(abs + 1, reference));
    }

    #[test]
    fn subset_result_is_consistent(
        amounts in prop::collection::vec(1i64..100_000, 0..16),
        target in 1i64..400_000,
        pct in prop_oneof![Just(0.0), 0.0..0.02f64],
    ) {
        let candidates = pool_ids(&amounts);
        let tolerance = Tolerance::pct_only(pct);
        if let Some(found) = find_subset_sum(target, &candidates, tolerance, &SubsetLimits::default()) {
            prop_assert!(found.entries.len() >= 2);
            prop_assert!(found.entries.windows(2).all(|w| w[0] < w[1]));
            let total: i64 = found.entries.iter().map(|id| amounts[id.index()]).sum();
            prop_assert_eq!(total, found.total_cents);
            prop_assert!(tolerance.accepts(target - total, target));
        }
    }

    #[test]
    fn planted_subset_is_found(
        picks in prop::collection::vec((1i64..100_000, any::<bool>()), 2..9),
    ) {
        let amounts: Vec<i64> = picks.iter().map(|&(a, _)| a).collect();
        let planted: i64 = picks.iter().filter(|&&(_, p)| p).map(|&(a, _)| a).sum();
        let planted_count = picks.iter().filter(|&&(_, p)| p).count();
        prop_assume!(planted_count >= 2);

        let candidates = pool_ids(&amounts);
        let found = find_subset_sum(planted, &candidates, Tolerance::pct_only(0.0), &SubsetLimits::default());
        prop_assert!(found.is_some());
        prop_assert_eq!(found.map(|f| f.total_cents), Some(planted));
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_64())]

    #[test]
    fn entries_are_consumed_at_most_once(input in arb_input()) {
        let result = run(&ReconConfig::default(), &input).unwrap();
        let mut seen = HashSet::new();
        for row in &result.rows {
            prop_assert_eq!(row.result.documents.len(), row.result.entry_ids.len());
            for id in &row.result.entry_ids {
                prop_assert!(seen.insert(*id), "entry {} consumed twice", id.index());
            }
        }
        prop_assert_eq!(result.rows.len(), input.transactions.len());
    }

    #[test]
    fn runs_are_deterministic(input in arb_input()) {
        let config = ReconConfig::default();
        let a = run(&config, &input).unwrap();
        let b = run(&config, &input).unwrap();
        prop_assert_eq!(
            serde_json::to_value(&a.rows).unwrap(),
            serde_json::to_value(&b.rows).unwrap()
        );
    }

    #[test]
    fn reconciled_rows_clear_the_fuzzy_threshold(input in arb_input()) {
        let config = ReconConfig::default();
        let result = run(&config, &input).unwrap();
        for row in &result.rows {
            if row.result.level.is_reconciled() {
                prop_assert!(row.result.identity_score >= config.identity.fuzzy_threshold);
            }
        }
    }
}
