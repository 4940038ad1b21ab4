use crate::model::{
    Direction, DirectionSummary, EntityKind, LedgerEntry, MatchLevel, MovementKind,
    ReconSummary, ReconciledTransaction,
};

/// Percentage of `part` over `whole`, one decimal. Zero when `whole` is zero.
fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

/// Compute coverage and gap figures from classified rows.
///
/// Bank fees are counted apart and stay out of every rate denominator.
/// `ledger` is the full ledger as loaded, consumed or not.
pub fn compute_summary(rows: &[ReconciledTransaction], ledger: &[LedgerEntry]) -> ReconSummary {
    let mut summary = ReconSummary { total_movements: rows.len(), ..Default::default() };

    for row in rows {
        let tx = &row.transaction;
        let level = row.result.level;

        let bank = summary.by_bank.entry(tx.bank.clone()).or_default();
        bank.movements += 1;
        match tx.direction {
            Direction::Credit => bank.credit_amount_cents += tx.amount_cents,
            Direction::Debit => bank.debit_amount_cents += tx.amount_cents,
        }

        if let Some(verdict) = &row.result.verdict {
            *summary.status_counts.entry(verdict.status.to_string()).or_default() += 1;
            *summary.tag_counts.entry(verdict.tag.to_string()).or_default() += 1;
        }

        if row.movement == MovementKind::BankFee {
            summary.bank_fees += 1;
            summary.bank_fee_amount_cents += tx.amount_cents;
            continue;
        }

        match level {
            MatchLevel::MatchExact => {
                summary.match_exact += 1;
                bank.match_exact += 1;
            }
            MatchLevel::ProbableDudaId => {
                summary.probable_duda_id += 1;
                bank.probable_duda_id += 1;
            }
            MatchLevel::ProbableDifCambio => {
                summary.probable_dif_cambio += 1;
                bank.probable_dif_cambio += 1;
            }
            MatchLevel::NoMatch => {
                summary.no_match += 1;
                bank.no_match += 1;
                summary.unreconciled_amount_cents += tx.amount_cents;
            }
        }

        let side = match row.movement {
            MovementKind::Collection => &mut summary.collections,
            MovementKind::VendorPayment => &mut summary.payments,
            MovementKind::BankFee | MovementKind::Other => continue,
        };
        tally(side, row);
    }

    let reconcilable = rows.len() - summary.bank_fees;
    let probable = summary.probable_duda_id + summary.probable_dif_cambio;
    summary.exact_rate = rate(summary.match_exact, reconcilable);
    summary.probable_rate = rate(probable, reconcilable);
    summary.no_match_rate = rate(summary.no_match, reconcilable);
    summary.reconciled_rate = rate(summary.match_exact + probable, reconcilable);

    for entry in ledger {
        match entry.kind {
            EntityKind::Customer => summary.collections.ledger_amount_cents += entry.amount_cents,
            EntityKind::Vendor => summary.payments.ledger_amount_cents += entry.amount_cents,
        }
    }
    for side in [&mut summary.collections, &mut summary.payments] {
        side.reconciliation_rate = rate(side.reconciled, side.total);
        side.gap_cents = side.amount_cents - side.ledger_amount_cents;
    }

    summary
}

fn tally(side: &mut DirectionSummary, row: &ReconciledTransaction) {
    let amount = row.transaction.amount_cents;
    side.total += 1;
    side.amount_cents += amount;

    match row.result.level {
        MatchLevel::MatchExact => side.match_exact.add(amount),
        MatchLevel::ProbableDudaId => side.probable_duda_id.add(amount),
        MatchLevel::ProbableDifCambio => {
            side.probable_dif_cambio.add(amount);
            let diff = row.result.difference_cents.unwrap_or(0);
            side.exchange_difference_net_cents += diff;
            if diff > 0 {
                side.exchange_difference_favor_cents += diff;
            } else {
                side.exchange_difference_against_cents += -diff;
            }
        }
        MatchLevel::NoMatch => side.no_match.add(amount),
    }

    if row.result.level.is_reconciled() {
        side.reconciled += 1;
        side.reconciled_amount_cents += amount;
        if row.result.entries_consumed() > 1 {
            side.subset_matches.add(amount);
        }
    }
}
