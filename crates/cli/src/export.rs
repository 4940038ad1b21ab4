//! CSV exports of the derived tables (`--export-dir`).

use std::path::{Path, PathBuf};

use conciliar_recon::classify::format_cents;
use conciliar_recon::model::{AcceptedMatch, DerivedOutputs, Direction, ExceptionRow};

use crate::exit_codes::EXIT_RECON_RUNTIME;
use crate::CliError;

pub const ACCEPTED_COLLECTIONS: &str = "accepted_collections.csv";
pub const ACCEPTED_PAYMENTS: &str = "accepted_payments.csv";
pub const EXCEPTIONS: &str = "exceptions.csv";

const ACCEPTED_HEADERS: [&str; 12] = [
    "date",
    "entity_id",
    "entity_name",
    "tax_id",
    "amount",
    "documents",
    "bank",
    "reference",
    "level",
    "confidence",
    "difference",
    "rationale",
];

const EXCEPTION_HEADERS: [&str; 10] = [
    "date",
    "bank",
    "direction",
    "movement",
    "description",
    "amount",
    "reference",
    "detail",
    "tag",
    "action",
];

fn export_err(path: &Path, e: impl std::fmt::Display) -> CliError {
    CliError { code: EXIT_RECON_RUNTIME, message: format!("cannot write {}: {e}", path.display()), hint: None }
}

/// Write the three export files into `dir`, creating it if needed.
/// Returns the paths written, in a fixed order.
pub fn write_exports(dir: &Path, derived: &DerivedOutputs) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(dir).map_err(|e| export_err(dir, e))?;

    let (collections, payments): (Vec<&AcceptedMatch>, Vec<&AcceptedMatch>) =
        derived.accepted.iter().partition(|a| a.direction == Direction::Credit);

    let paths = vec![dir.join(ACCEPTED_COLLECTIONS), dir.join(ACCEPTED_PAYMENTS), dir.join(EXCEPTIONS)];
    write_accepted(&paths[0], &collections)?;
    write_accepted(&paths[1], &payments)?;
    write_exceptions(&paths[2], &derived.exceptions)?;
    Ok(paths)
}

fn write_accepted(path: &Path, rows: &[&AcceptedMatch]) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| export_err(path, e))?;
    writer.write_record(ACCEPTED_HEADERS).map_err(|e| export_err(path, e))?;
    for a in rows {
        writer
            .write_record([
                a.date.clone(),
                a.entity_id.clone(),
                a.entity_name.clone(),
                a.tax_id.clone(),
                format_cents(a.amount_cents),
                a.documents.clone(),
                a.bank.clone(),
                a.reference.clone(),
                a.level.to_string(),
                format!("{:.1}", a.confidence),
                format_cents(a.difference_cents),
                a.rationale.clone(),
            ])
            .map_err(|e| export_err(path, e))?;
    }
    writer.flush().map_err(|e| export_err(path, e))
}

fn write_exceptions(path: &Path, rows: &[ExceptionRow]) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| export_err(path, e))?;
    writer.write_record(EXCEPTION_HEADERS).map_err(|e| export_err(path, e))?;
    for x in rows {
        writer
            .write_record([
                x.date.clone(),
                x.bank.clone(),
                x.direction.to_string(),
                x.movement.to_string(),
                x.description.clone(),
                format_cents(x.amount_cents),
                x.reference.clone(),
                x.detail.clone(),
                x.tag.map(|t| t.to_string()).unwrap_or_default(),
                x.action.to_string(),
            ])
            .map_err(|e| export_err(path, e))?;
    }
    writer.flush().map_err(|e| export_err(path, e))
}
