use log::{debug, info};

use crate::amount::resolve_amount;
use crate::classify::{classify, confidence};
use crate::config::{Pipeline, ReconConfig};
use crate::derived::build_derived;
use crate::error::ReconError;
use crate::identity::{extract_counterpart, resolve_identity};
use crate::model::{
    AliasRecord, EntityKind, MatchResult, MovementKind, ReconInput, ReconMeta, ReconResult,
    ReconciledTransaction, Transaction,
};
use crate::movement::classify_movement;
use crate::pool::{EntryId, EntryPool};
use crate::summary::compute_summary;

/// Run reconciliation per config. Returns classified rows, summary and
/// derived tables.
///
/// Transactions are processed in input order and each ledger entry backs at
/// most one of them.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    config.validate()?;

    let pipeline = select_pipeline(config.pipeline, input);
    info!(
        "reconciling {} transactions against {} ledger entries ({pipeline} pipeline)",
        input.transactions.len(),
        input.ledger.len()
    );

    let mut pool = EntryPool::new(input.ledger.clone());
    let rows = match pipeline {
        Pipeline::TaxId => crate::taxid::reconcile(config, &input.transactions, &mut pool)?,
        Pipeline::Alias | Pipeline::Auto => {
            reconcile_aliases(config, &input.transactions, &input.aliases, &mut pool)?
        }
    };

    let summary = compute_summary(&rows, &input.ledger);
    let derived = build_derived(&rows);
    info!(
        "done: {} exact, {} probable, {} no match, {} bank fees, {} entries consumed",
        summary.match_exact,
        summary.probable_duda_id + summary.probable_dif_cambio,
        summary.no_match,
        summary.bank_fees,
        pool.consumed_count()
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            pipeline,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        rows,
        derived,
    })
}

/// Resolve `auto` against the loaded ledger.
pub fn select_pipeline(requested: Pipeline, input: &ReconInput) -> Pipeline {
    match requested {
        Pipeline::Auto => {
            let keyed = input
                .ledger
                .iter()
                .any(|e| e.tax_id.is_some() && e.channel.is_some());
            if keyed {
                Pipeline::TaxId
            } else {
                Pipeline::Alias
            }
        }
        other => other,
    }
}

/// Alias pipeline: identity → amount → ternary classifier, per transaction.
pub fn reconcile_aliases(
    config: &ReconConfig,
    transactions: &[Transaction],
    aliases: &[AliasRecord],
    pool: &mut EntryPool,
) -> Result<Vec<ReconciledTransaction>, ReconError> {
    let customers: Vec<&AliasRecord> =
        aliases.iter().filter(|a| a.kind == EntityKind::Customer).collect();
    let vendors: Vec<&AliasRecord> =
        aliases.iter().filter(|a| a.kind == EntityKind::Vendor).collect();

    let mut rows = Vec::with_capacity(transactions.len());
    for tx in transactions {
        let movement = classify_movement(tx);
        let result = match movement {
            MovementKind::BankFee => MatchResult::no_match("bank fee"),
            MovementKind::Other => MatchResult::no_match("movement carries no amount"),
            MovementKind::Collection | MovementKind::VendorPayment => {
                let kind = EntityKind::for_direction(tx.direction);
                let candidates = match kind {
                    EntityKind::Customer => &customers,
                    EntityKind::Vendor => &vendors,
                };
                match_transaction(config, tx, kind, candidates, pool)?
            }
        };
        debug!("tx {}: {} ({})", tx.id, result.level, result.rationale);
        rows.push(ReconciledTransaction { transaction: tx.clone(), movement, result });
    }
    Ok(rows)
}

fn match_transaction(
    config: &ReconConfig,
    tx: &Transaction,
    kind: EntityKind,
    candidates: &[&AliasRecord],
    pool: &mut EntryPool,
) -> Result<MatchResult, ReconError> {
    let bank_name = tx
        .counterpart_name
        .clone()
        .unwrap_or_else(|| extract_counterpart(&tx.description));
    let identity = resolve_identity(&bank_name, candidates, &config.identity);
    let alias = identity.alias_index.map(|i| candidates[i]);

    let outstanding: Vec<(EntryId, i64)> = match alias {
        Some(alias) => pool
            .available_for_entity(kind, &alias.entity_id)
            .into_iter()
            .map(|id| (id, pool.get(id).amount_cents))
            .collect(),
        None => Vec::new(),
    };
    let amount = resolve_amount(tx.amount_cents, &outstanding, &config.amount, &config.subset);
    let decision = classify(&identity, &amount, outstanding.len(), kind);

    pool.reserve(&decision.consume)?;

    let mut result = MatchResult::no_match(decision.rationale);
    result.level = decision.level;
    result.identity_score = identity.score;
    if !decision.level.is_reconciled() {
        return Ok(result);
    }

    let Some(alias) = alias else {
        return Ok(result);
    };
    result.confidence = confidence(identity.score);
    result.entity_id = Some(alias.entity_id.clone());
    result.entity_name = Some(
        decision
            .consume
            .first()
            .map(|&id| pool.get(id).entity_name.clone())
            .unwrap_or_else(|| alias.name.clone()),
    );
    if !decision.consume.is_empty() {
        result.documents =
            decision.consume.iter().map(|&id| pool.get(id).document.clone()).collect();
        result.difference_cents = amount.difference_cents;
        result.difference_pct = amount.difference_pct;
        result.amount_match = amount.kind;
        result.entry_ids = decision.consume;
    }
    Ok(result)
}
