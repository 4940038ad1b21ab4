//! Derived tables layered on top of classified rows: accepted matches for
//! re-import into the ledger, and the exceptions worklist.

use crate::model::{
    AcceptedMatch, DerivedOutputs, ExceptionRow, MatchLevel, MovementKind, ReconTag,
    ReconciledTransaction, RemediationAction,
};

pub fn build_derived(rows: &[ReconciledTransaction]) -> DerivedOutputs {
    DerivedOutputs { accepted: build_accepted(rows), exceptions: build_exceptions(rows) }
}

/// One row per reconciled collection or vendor payment, in input order.
pub fn build_accepted(rows: &[ReconciledTransaction]) -> Vec<AcceptedMatch> {
    rows.iter()
        .filter(|r| {
            r.result.level.is_reconciled()
                && matches!(r.movement, MovementKind::Collection | MovementKind::VendorPayment)
        })
        .map(|r| {
            let tx = &r.transaction;
            let tax_id = r
                .result
                .verdict
                .as_ref()
                .and_then(|v| v.tax_id.clone())
                .or_else(|| tx.tax_id.clone())
                .unwrap_or_default();
            AcceptedMatch {
                date: tx.date.format("%d/%m/%Y").to_string(),
                direction: tx.direction,
                entity_id: r.result.entity_id.clone().unwrap_or_default(),
                entity_name: r.result.entity_name.clone().unwrap_or_default(),
                tax_id,
                amount_cents: tx.amount_cents,
                documents: r.result.documents.join(" + "),
                bank: tx.bank.clone(),
                reference: tx.reference.clone(),
                level: r.result.level,
                rationale: r.result.rationale.clone(),
                confidence: r.result.confidence,
                difference_cents: r.result.difference_cents.unwrap_or(0),
            }
        })
        .collect()
}

/// Every unreconciled row except bank fees, with a suggested action.
pub fn build_exceptions(rows: &[ReconciledTransaction]) -> Vec<ExceptionRow> {
    rows.iter()
        .filter(|r| r.result.level == MatchLevel::NoMatch && r.movement != MovementKind::BankFee)
        .map(|r| {
            let tx = &r.transaction;
            let tag = r.result.verdict.as_ref().map(|v| v.tag);
            ExceptionRow {
                date: tx.date.format("%d/%m/%Y").to_string(),
                bank: tx.bank.clone(),
                direction: tx.direction,
                movement: r.movement,
                description: tx.description.clone(),
                amount_cents: tx.amount_cents,
                reference: tx.reference.clone(),
                detail: r.result.rationale.clone(),
                tag,
                action: remediation(r.movement, tag),
            }
        })
        .collect()
}

fn remediation(movement: MovementKind, tag: Option<ReconTag>) -> RemediationAction {
    match tag {
        Some(ReconTag::MissingTaxId) => RemediationAction::IdentifyPayer,
        Some(ReconTag::TaxIdUnknown) => RemediationAction::RegisterTaxId,
        Some(ReconTag::MixedChannel | ReconTag::SumMixedChannel) => RemediationAction::SplitChannels,
        Some(ReconTag::VendorPayment) => RemediationAction::ReviewPayment,
        Some(_) => RemediationAction::ReviewManually,
        None => match movement {
            MovementKind::Collection | MovementKind::VendorPayment => RemediationAction::AddAlias,
            MovementKind::BankFee | MovementKind::Other => RemediationAction::ReviewManually,
        },
    }
}
