//! Movement classification, ahead of any matching.

use crate::model::{Direction, MovementKind, Transaction};

/// Charges the bank levies on its own account. Matched against the
/// normalized (upper-case, single-spaced) description.
const BANK_FEE_PATTERNS: &[&str] = &[
    "COMISION",
    "IMP DEBITO",
    "IMP CREDITO",
    "IVA COMIS",
    "SELLADO",
    "MANTENIMIENTO CTA",
    "CARGO MENSUAL",
    "SEGURO CTA",
];

pub fn is_bank_fee(normalized_description: &str) -> bool {
    BANK_FEE_PATTERNS.iter().any(|p| normalized_description.contains(p))
}

/// Bank fee, collection or vendor payment. Movements that carry no money
/// are `Other`.
pub fn classify_movement(tx: &Transaction) -> MovementKind {
    if is_bank_fee(&tx.normalized_description) {
        return MovementKind::BankFee;
    }
    if tx.amount_cents == 0 {
        return MovementKind::Other;
    }
    match tx.direction {
        Direction::Credit => MovementKind::Collection,
        Direction::Debit => MovementKind::VendorPayment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_statement_text;
    use chrono::NaiveDate;

    fn tx(direction: Direction, description: &str, cents: i64) -> Transaction {
        Transaction {
            id: "1".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            direction,
            description: description.into(),
            normalized_description: normalize_statement_text(description),
            amount_cents: cents,
            reference: String::new(),
            bank: "galicia".into(),
            tax_id: None,
            counterpart_name: None,
            transaction_code: None,
        }
    }

    #[test]
    fn fee_patterns_win_over_direction() {
        assert_eq!(classify_movement(&tx(Direction::Debit, "Comisión mantenimiento", 1_500)), MovementKind::BankFee);
        assert_eq!(classify_movement(&tx(Direction::Debit, "IMP  DEBITOS Y CREDITOS", 900)), MovementKind::BankFee);
        assert_eq!(classify_movement(&tx(Direction::Credit, "IVA COMISIONES", 10)), MovementKind::BankFee);
        assert_eq!(classify_movement(&tx(Direction::Debit, "Sellado provincial", 10)), MovementKind::BankFee);
    }

    #[test]
    fn direction_decides_the_rest() {
        assert_eq!(classify_movement(&tx(Direction::Credit, "MERPAG*PRITTY", 100)), MovementKind::Collection);
        assert_eq!(classify_movement(&tx(Direction::Debit, "PAG ACME", 100)), MovementKind::VendorPayment);
        assert_eq!(classify_movement(&tx(Direction::Credit, "TRANSF", 0)), MovementKind::Other);
    }
}
