use std::fmt;

use crate::pool::EntryId;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (negative tolerance, inverted thresholds, etc.).
    ConfigValidation(String),
    /// Missing required column in an input file.
    MissingColumn { role: String, column: String },
    /// Date parse error.
    DateParse { role: String, record_id: String, value: String },
    /// Amount parse error.
    AmountParse { role: String, record_id: String, value: String },
    /// Any other field that cannot be interpreted (direction, kind).
    InvalidField { role: String, record_id: String, column: String, value: String },
    /// A ledger entry was reserved twice in the same run.
    EntryUnavailable(EntryId),
    /// IO error (file read, CSV framing, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { role, column } => {
                write!(f, "{role}: missing column '{column}'")
            }
            Self::DateParse { role, record_id, value } => {
                write!(f, "{role}, record '{record_id}': cannot parse date '{value}'")
            }
            Self::AmountParse { role, record_id, value } => {
                write!(f, "{role}, record '{record_id}': cannot parse amount '{value}'")
            }
            Self::InvalidField { role, record_id, column, value } => {
                write!(f, "{role}, record '{record_id}': invalid {column} '{value}'")
            }
            Self::EntryUnavailable(id) => {
                write!(f, "ledger entry #{} is already consumed in this run", id.index())
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
