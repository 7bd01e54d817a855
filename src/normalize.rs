//! Turns raw exported rows into chronologically ordered [`CanonicalTransaction`]s.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::money::{parse_decimal_or_zero, q2, q8};
use crate::transaction::*;
use crate::warning::Warning;

/// Untranslated CSV contents.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Inclusive range of calendar years that appear in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        self.min <= year && year <= self.max
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.min..=self.max
    }

    /// Latest ledger year that is not in the future, clamped into the range.
    pub fn default_year(&self, current_year: i32) -> i32 {
        self.max.min(current_year).clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub transactions: Vec<CanonicalTransaction>,
    pub warnings: Vec<Warning>,
    pub total_rows: usize,
    pub dropped_rows: usize,
    pub years: YearRange,
}

pub fn read_raw_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len().max(row.len()), String::new());
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.naive_utc());
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%#z") {
        return Ok(t.naive_utc());
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(t.naive_utc());
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(t);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(chrono::NaiveTime::MIN));
    }
    Err(Error::InvalidTimestamp(s.to_string()))
}

/// Maps each canonical column name to its index in the raw table.
fn resolve_columns(headers: &[String], config: &Config) -> (HashMap<String, usize>, bool) {
    let mut index = HashMap::new();
    let mut localized = false;
    for (i, header) in headers.iter().enumerate() {
        let canonical = config.canonical_column(header);
        if canonical != header.as_str() {
            localized = true;
        }
        index.entry(canonical.to_string()).or_insert(i);
    }
    (index, localized)
}

struct RowReader<'a> {
    row: &'a [String],
    row_no: usize,
    index: &'a HashMap<String, usize>,
}

impl RowReader<'_> {
    fn text(&self, column: &str) -> &str {
        self.index
            .get(column)
            .and_then(|&i| self.row.get(i))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    fn asset(&self, column: &str) -> String {
        self.text(column).trim().to_uppercase()
    }

    /// Parses a non-negative amount, substituting zero for bad or negative cells.
    fn amount(&self, column: &str, warnings: &mut Vec<Warning>) -> Decimal {
        let raw = self.text(column);
        let (value, ok) = parse_decimal_or_zero(raw);
        if !ok {
            warnings.push(Warning::UnparseableNumber {
                row: self.row_no,
                column: column.to_string(),
                raw: raw.to_string(),
            });
            return dec!(0);
        }
        if value.is_sign_negative() && !value.is_zero() {
            warnings.push(Warning::NegativeAmount {
                row: self.row_no,
                column: column.to_string(),
                value,
            });
            return dec!(0);
        }
        value
    }
}

/// Cleans a raw table: translates headers and type labels, parses numbers and
/// dates, drops unusable rows and sorts the rest by timestamp.
pub fn normalize(table: &RawTable, config: &Config) -> Result<Normalized> {
    let (index, localized) = resolve_columns(&table.headers, config);
    if localized {
        info!("localized column headers detected, translating");
    }

    let missing: Vec<String> = ESSENTIAL_COLUMNS
        .iter()
        .filter(|c| !index.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::Schema { missing });
    }

    let mut warnings = Vec::new();
    for optional in [COL_BOOK_COST, COL_DESCRIPTION] {
        if !index.contains_key(optional) {
            warnings.push(Warning::OptionalColumnMissing {
                column: optional.to_string(),
            });
        }
    }

    let total_rows = table.rows.len();
    if total_rows == 0 {
        return Err(Error::EmptyInput);
    }

    let mut dated = Vec::with_capacity(total_rows);
    for (i, row) in table.rows.iter().enumerate() {
        let reader = RowReader {
            row,
            row_no: i + 1,
            index: &index,
        };
        let raw_date = reader.text(COL_DATE);
        match parse_timestamp(raw_date) {
            Ok(ts) => dated.push((reader, ts)),
            Err(_) => warnings.push(Warning::InvalidDate {
                row: i + 1,
                raw: raw_date.to_string(),
            }),
        }
    }
    if dated.is_empty() {
        return Err(Error::NoValidDates);
    }

    let years = dated.iter().fold(
        YearRange {
            min: i32::MAX,
            max: i32::MIN,
        },
        |r, (_, ts)| YearRange {
            min: r.min.min(ts.year()),
            max: r.max.max(ts.year()),
        },
    );
    info!("detected transaction year range: {} - {}", years.min, years.max);

    let mut transactions = Vec::with_capacity(dated.len());
    for (reader, timestamp) in dated {
        let label = reader.text(COL_TYPE).trim();
        let tx_type = match config.canonical_type(label).parse::<TransactionType>() {
            Ok(t) => t,
            Err(_) => {
                warnings.push(Warning::UnsupportedType {
                    row: reader.row_no,
                    label: label.to_string(),
                });
                continue;
            }
        };

        transactions.push(CanonicalTransaction {
            timestamp,
            tx_type,
            asset_debited: reader.asset(COL_ASSET_DEBITED),
            amount_debited: q8(reader.amount(COL_AMOUNT_DEBITED, &mut warnings)),
            asset_credited: reader.asset(COL_ASSET_CREDITED),
            amount_credited: q8(reader.amount(COL_AMOUNT_CREDITED, &mut warnings)),
            market_value: q2(reader.amount(COL_MARKET_VALUE, &mut warnings)),
            book_cost: q2(reader.amount(COL_BOOK_COST, &mut warnings)),
            description: reader.text(COL_DESCRIPTION).to_string(),
        });
    }

    if transactions.is_empty() {
        return Err(Error::EmptyInput);
    }

    // Stable, so same-instant rows keep their file order.
    transactions.sort_by_key(|t| t.timestamp);

    for w in &warnings {
        debug!("{}", w);
    }

    Ok(Normalized {
        dropped_rows: total_rows - transactions.len(),
        transactions,
        warnings,
        total_rows,
        years,
    })
}
