//! Canonical CSV → typed records. Malformed rows are rejected here, so the
//! matching core only ever sees well-formed input.

use chrono::NaiveDate;
use log::warn;

use crate::error::ReconError;
use crate::model::{AliasRecord, Direction, EntityKind, LedgerEntry, Transaction};
use crate::normalize::normalize_statement_text;
use crate::taxid::normalize_tax_id;

/// Header positions of one CSV file.
struct Columns {
    role: &'static str,
    headers: Vec<String>,
}

impl Columns {
    fn read<R: std::io::Read>(
        role: &'static str,
        reader: &mut csv::Reader<R>,
    ) -> Result<Self, ReconError> {
        let headers = reader
            .headers()
            .map_err(|e| ReconError::Io(format!("{role}: {e}")))?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        Ok(Self { role, headers })
    }

    fn required(&self, name: &str) -> Result<usize, ReconError> {
        self.optional(name).ok_or_else(|| ReconError::MissingColumn {
            role: self.role.into(),
            column: name.into(),
        })
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn csv_reader(csv_data: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(csv_data.as_bytes())
}

fn field<'r>(record: &'r csv::StringRecord, idx: Option<usize>) -> &'r str {
    idx.and_then(|i| record.get(i)).unwrap_or("")
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Load bank-statement rows.
///
/// Required: `date,direction,description,amount`.
/// Optional: `id,reference,bank,tax_id,counterpart,code`.
pub fn load_transactions(csv_data: &str) -> Result<Vec<Transaction>, ReconError> {
    const ROLE: &str = "transactions";
    let mut reader = csv_reader(csv_data);
    let cols = Columns::read(ROLE, &mut reader)?;

    let date_idx = cols.required("date")?;
    let direction_idx = cols.required("direction")?;
    let description_idx = cols.required("description")?;
    let amount_idx = cols.required("amount")?;
    let id_idx = cols.optional("id");
    let reference_idx = cols.optional("reference");
    let bank_idx = cols.optional("bank");
    let tax_id_idx = cols.optional("tax_id");
    let counterpart_idx = cols.optional("counterpart");
    let code_idx = cols.optional("code");

    let mut rows = Vec::new();
    for (n, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::Io(format!("{ROLE}: {e}")))?;
        let id = non_empty(field(&record, id_idx)).unwrap_or_else(|| (n + 1).to_string());

        let date_str = field(&record, Some(date_idx));
        let date = parse_date(date_str).ok_or_else(|| ReconError::DateParse {
            role: ROLE.into(),
            record_id: id.clone(),
            value: date_str.into(),
        })?;

        let direction_str = field(&record, Some(direction_idx));
        let direction = parse_direction(direction_str).ok_or_else(|| ReconError::InvalidField {
            role: ROLE.into(),
            record_id: id.clone(),
            column: "direction".into(),
            value: direction_str.into(),
        })?;

        let amount_str = field(&record, Some(amount_idx));
        let mut amount_cents = parse_amount_cents(amount_str).ok_or_else(|| ReconError::AmountParse {
            role: ROLE.into(),
            record_id: id.clone(),
            value: amount_str.into(),
        })?;
        if amount_cents < 0 {
            warn!("{ROLE} row {id}: negative amount {amount_str}, direction column decides the sign");
            amount_cents = -amount_cents;
        }

        let code_str = field(&record, code_idx);
        let transaction_code = if code_str.is_empty() {
            None
        } else {
            Some(code_str.parse::<u32>().map_err(|_| ReconError::InvalidField {
                role: ROLE.into(),
                record_id: id.clone(),
                column: "code".into(),
                value: code_str.into(),
            })?)
        };

        let description = field(&record, Some(description_idx)).to_string();
        rows.push(Transaction {
            id,
            date,
            direction,
            normalized_description: normalize_statement_text(&description),
            description,
            amount_cents,
            reference: field(&record, reference_idx).to_string(),
            bank: field(&record, bank_idx).to_string(),
            tax_id: non_empty(&normalize_tax_id(field(&record, tax_id_idx))),
            counterpart_name: non_empty(field(&record, counterpart_idx)),
            transaction_code,
        });
    }
    Ok(rows)
}

/// Load outstanding ledger entries.
///
/// Required: `entity_id,entity_name,kind,document,amount`.
/// Optional: `tax_id,channel,emitted,status`.
pub fn load_ledger(csv_data: &str) -> Result<Vec<LedgerEntry>, ReconError> {
    const ROLE: &str = "ledger";
    let mut reader = csv_reader(csv_data);
    let cols = Columns::read(ROLE, &mut reader)?;

    let entity_id_idx = cols.required("entity_id")?;
    let entity_name_idx = cols.required("entity_name")?;
    let kind_idx = cols.required("kind")?;
    let document_idx = cols.required("document")?;
    let amount_idx = cols.required("amount")?;
    let tax_id_idx = cols.optional("tax_id");
    let channel_idx = cols.optional("channel");
    let emitted_idx = cols.optional("emitted");
    let status_idx = cols.optional("status");

    let mut entries = Vec::new();
    for (n, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::Io(format!("{ROLE}: {e}")))?;
        let document = field(&record, Some(document_idx)).to_string();
        let record_id = non_empty(&document).unwrap_or_else(|| (n + 1).to_string());

        let kind_str = field(&record, Some(kind_idx));
        let kind = parse_kind(kind_str).ok_or_else(|| ReconError::InvalidField {
            role: ROLE.into(),
            record_id: record_id.clone(),
            column: "kind".into(),
            value: kind_str.into(),
        })?;

        let amount_str = field(&record, Some(amount_idx));
        let amount_cents = parse_amount_cents(amount_str).ok_or_else(|| ReconError::AmountParse {
            role: ROLE.into(),
            record_id: record_id.clone(),
            value: amount_str.into(),
        })?;
        if amount_cents <= 0 {
            warn!("{ROLE} entry {record_id}: non-positive amount {amount_str} never matches");
        }

        let emitted_str = field(&record, emitted_idx);
        let emitted = if emitted_str.is_empty() {
            None
        } else {
            Some(parse_date(emitted_str).ok_or_else(|| ReconError::DateParse {
                role: ROLE.into(),
                record_id: record_id.clone(),
                value: emitted_str.into(),
            })?)
        };

        entries.push(LedgerEntry {
            entity_id: field(&record, Some(entity_id_idx)).to_string(),
            entity_name: field(&record, Some(entity_name_idx)).to_string(),
            kind,
            document,
            amount_cents,
            tax_id: non_empty(&normalize_tax_id(field(&record, tax_id_idx))),
            channel: non_empty(field(&record, channel_idx)),
            emitted,
            status: non_empty(field(&record, status_idx)),
        });
    }
    Ok(entries)
}

/// Load the alias table.
///
/// Required: `alias,name,entity_id,kind`. Optional: `tax_id`.
pub fn load_aliases(csv_data: &str) -> Result<Vec<AliasRecord>, ReconError> {
    const ROLE: &str = "aliases";
    let mut reader = csv_reader(csv_data);
    let cols = Columns::read(ROLE, &mut reader)?;

    let alias_idx = cols.required("alias")?;
    let name_idx = cols.required("name")?;
    let entity_id_idx = cols.required("entity_id")?;
    let kind_idx = cols.required("kind")?;
    let tax_id_idx = cols.optional("tax_id");

    let mut aliases = Vec::new();
    for (n, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::Io(format!("{ROLE}: {e}")))?;
        let kind_str = field(&record, Some(kind_idx));
        let kind = parse_kind(kind_str).ok_or_else(|| ReconError::InvalidField {
            role: ROLE.into(),
            record_id: (n + 1).to_string(),
            column: "kind".into(),
            value: kind_str.into(),
        })?;
        aliases.push(AliasRecord {
            alias: field(&record, Some(alias_idx)).to_string(),
            name: field(&record, Some(name_idx)).to_string(),
            entity_id: field(&record, Some(entity_id_idx)).to_string(),
            kind,
            tax_id: non_empty(&normalize_tax_id(field(&record, tax_id_idx))),
        });
    }
    Ok(aliases)
}

/// `YYYY-MM-DD` or `DD/MM/YYYY`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

pub fn parse_direction(s: &str) -> Option<Direction> {
    match s.trim().to_lowercase().as_str() {
        "credit" | "credito" | "crédito" | "cr" => Some(Direction::Credit),
        "debit" | "debito" | "débito" | "db" => Some(Direction::Debit),
        _ => None,
    }
}

pub fn parse_kind(s: &str) -> Option<EntityKind> {
    match s.trim().to_lowercase().as_str() {
        "customer" | "cliente" => Some(EntityKind::Customer),
        "vendor" | "proveedor" => Some(EntityKind::Vendor),
        _ => None,
    }
}

/// Decimal amount → cents, accepting `1234.56`, `1,234.56`, `1.234.567,89`
/// and `1234,56`. Rounds half away from zero past the second decimal.
///
/// With a single separator, it is decimal when followed by one or two
/// digits and a thousands separator when followed by exactly three.
pub fn parse_amount_cents(s: &str) -> Option<i64> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace() && *c != '$').collect();
    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    if body.is_empty() {
        return None;
    }

    let last_dot = body.rfind('.');
    let last_comma = body.rfind(',');
    let decimal_sep = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (Some(_), None) => single_separator_role(body, '.'),
        (None, Some(_)) => single_separator_role(body, ','),
        (None, None) => None,
    };

    let (whole, fraction) = match decimal_sep {
        Some(sep) => {
            let pos = body.rfind(sep)?;
            (&body[..pos], &body[pos + 1..])
        }
        None => (body, ""),
    };
    let whole: String = whole.chars().filter(|c| *c != '.' && *c != ',').collect();
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let units: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let digits: Vec<u32> = fraction.chars().filter_map(|c| c.to_digit(10)).collect();
    let mut cents = i64::from(digits.first().copied().unwrap_or(0)) * 10
        + i64::from(digits.get(1).copied().unwrap_or(0));
    if digits.get(2).copied().unwrap_or(0) >= 5 {
        cents += 1;
    }

    let total = units.checked_mul(100)?.checked_add(cents)?;
    Some(if negative { -total } else { total })
}

/// Decimal separator when `sep` occurs once and is followed by one or two
/// digits; otherwise `sep` groups thousands.
fn single_separator_role(body: &str, sep: char) -> Option<char> {
    if body.matches(sep).count() > 1 {
        return None;
    }
    let after = body.rsplit(sep).next().unwrap_or("");
    if after.len() == 3 {
        None
    } else {
        Some(sep)
    }
}
