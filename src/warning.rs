use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// A recoverable data-quality issue found while processing a ledger.
///
/// `row` values are 1-based data row numbers (the header is not counted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    InvalidDate {
        row: usize,
        raw: String,
    },
    UnparseableNumber {
        row: usize,
        column: String,
        raw: String,
    },
    NegativeAmount {
        row: usize,
        column: String,
        value: Decimal,
    },
    UnsupportedType {
        row: usize,
        label: String,
    },
    OptionalColumnMissing {
        column: String,
    },
    ZeroValueAcquisition {
        date: NaiveDateTime,
        asset: String,
        amount: Decimal,
        reward: bool,
    },
    NoPriorHoldings {
        date: NaiveDateTime,
        asset: String,
        amount: Decimal,
    },
    OverDisposition {
        date: NaiveDateTime,
        asset: String,
        requested: Decimal,
        available: Decimal,
    },
    NegativeCostBase {
        date: NaiveDateTime,
        asset: String,
        total_cost: Decimal,
    },
    UnknownPeriod {
        date: NaiveDateTime,
        label: String,
    },
    ValueOverflow {
        date: NaiveDateTime,
        asset: String,
    },
    YearTotalOverflow {
        year: i32,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::InvalidDate { row, raw } => {
                write!(f, "row {}: invalid date {:?}, row skipped", row, raw)
            }
            Warning::UnparseableNumber { row, column, raw } => write!(
                f,
                "row {}: could not parse {:?} in '{}', using 0",
                row, raw, column
            ),
            Warning::NegativeAmount { row, column, value } => write!(
                f,
                "row {}: negative value {} in '{}', using 0",
                row, value, column
            ),
            Warning::UnsupportedType { row, label } => {
                write!(f, "row {}: unsupported transaction type {:?}, row skipped", row, label)
            }
            Warning::OptionalColumnMissing { column } => {
                write!(f, "optional column '{}' missing, using defaults", column)
            }
            Warning::ZeroValueAcquisition {
                date,
                asset,
                amount,
                reward,
            } => {
                if *reward {
                    write!(
                        f,
                        "({}) reward of {} {} has zero value, assuming zero cost/income",
                        date, amount, asset
                    )
                } else {
                    write!(
                        f,
                        "({}) acquisition of {} {} has zero value, assuming zero cost",
                        date, amount, asset
                    )
                }
            }
            Warning::NoPriorHoldings { date, asset, amount } => write!(
                f,
                "({}) disposition of {} {} but no prior ACB, skipping",
                date, amount, asset
            ),
            Warning::OverDisposition {
                date,
                asset,
                requested,
                available,
            } => write!(
                f,
                "({}) disposing {} {}, only {} available, adjusting",
                date, requested, asset, available
            ),
            Warning::NegativeCostBase {
                date,
                asset,
                total_cost,
            } => write!(
                f,
                "({}) ACB cost for {} negative ({}), resetting to zero",
                date, asset, total_cost
            ),
            Warning::UnknownPeriod { date, label } => write!(
                f,
                "({}) disposition has unknown period {:?}, assigning to after_cutoff",
                date, label
            ),
            Warning::ValueOverflow { date, asset } => write!(
                f,
                "({}) {} value exceeds the representable range, skipping",
                date, asset
            ),
            Warning::YearTotalOverflow { year } => write!(
                f,
                "{} totals exceed the representable range, left out of the aggregate",
                year
            ),
        }
    }
}
