//! Taxable events emitted by the engine and their flat record form.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::normalize::parse_timestamp;

const BEFORE_CUTOFF: &str = "before_cutoff";
const AFTER_CUTOFF: &str = "after_cutoff";

/// Which side of the inclusion-rate cutoff a disposition falls on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Period {
    BeforeCutoff,
    AfterCutoff,
    /// Label read back from a record that is neither known period.
    Unrecognized(String),
}

impl Period {
    pub fn classify(date: NaiveDateTime, cutoff: NaiveDateTime) -> Self {
        if date >= cutoff {
            Period::AfterCutoff
        } else {
            Period::BeforeCutoff
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            BEFORE_CUTOFF => Period::BeforeCutoff,
            AFTER_CUTOFF => Period::AfterCutoff,
            other => Period::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Period::BeforeCutoff => BEFORE_CUTOFF,
            Period::AfterCutoff => AFTER_CUTOFF,
            Period::Unrecognized(s) => s.as_str(),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disposition {
    pub date: NaiveDateTime,
    pub asset: String,
    pub amount: Decimal,
    pub proceeds: Decimal,
    pub cost_base: Decimal,
    pub gain_loss: Decimal,
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reward {
    pub date: NaiveDateTime,
    pub asset: String,
    pub amount: Decimal,
    pub income: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaxableEvent {
    Disposition(Disposition),
    Reward(Reward),
}

/// Primitive-only form of a [`TaxableEvent`], for CSV/JSON or any other
/// boundary that cannot carry the typed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub kind: String,
    pub date: String,
    pub asset: String,
    pub amount: Decimal,
    pub proceeds: Option<Decimal>,
    pub cost_base: Option<Decimal>,
    pub gain_loss: Option<Decimal>,
    pub period: Option<String>,
    pub income: Option<Decimal>,
    pub description: Option<String>,
}

fn iso(date: NaiveDateTime) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

impl TaxableEvent {
    pub fn date(&self) -> NaiveDateTime {
        match self {
            TaxableEvent::Disposition(d) => d.date,
            TaxableEvent::Reward(r) => r.date,
        }
    }

    pub fn asset(&self) -> &str {
        match self {
            TaxableEvent::Disposition(d) => &d.asset,
            TaxableEvent::Reward(r) => &r.asset,
        }
    }

    pub fn to_record(&self) -> EventRecord {
        match self {
            TaxableEvent::Disposition(d) => EventRecord {
                kind: "disposition".to_string(),
                date: iso(d.date),
                asset: d.asset.clone(),
                amount: d.amount,
                proceeds: Some(d.proceeds),
                cost_base: Some(d.cost_base),
                gain_loss: Some(d.gain_loss),
                period: Some(d.period.label().to_string()),
                income: None,
                description: None,
            },
            TaxableEvent::Reward(r) => EventRecord {
                kind: "reward".to_string(),
                date: iso(r.date),
                asset: r.asset.clone(),
                amount: r.amount,
                proceeds: None,
                cost_base: None,
                gain_loss: None,
                period: None,
                income: Some(r.income),
                description: Some(r.description.clone()),
            },
        }
    }

    /// Rebuilds an event from its record. Missing monetary fields read as zero
    /// and a missing period is kept as an unrecognized (empty) label.
    pub fn from_record(record: EventRecord) -> Result<Self> {
        let date = parse_timestamp(&record.date)
            .map_err(|_| Error::InvalidRecord(format!("bad date {:?}", record.date)))?;
        match record.kind.as_str() {
            "disposition" => Ok(TaxableEvent::Disposition(Disposition {
                date,
                asset: record.asset,
                amount: record.amount,
                proceeds: record.proceeds.unwrap_or_default(),
                cost_base: record.cost_base.unwrap_or_default(),
                gain_loss: record.gain_loss.unwrap_or_default(),
                period: Period::from_label(record.period.as_deref().unwrap_or("")),
            })),
            "reward" => Ok(TaxableEvent::Reward(Reward {
                date,
                asset: record.asset,
                amount: record.amount,
                income: record.income.unwrap_or_default(),
                description: record.description.unwrap_or_default(),
            })),
            other => Err(Error::InvalidRecord(format!("unknown kind {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn cutoff_instant_is_after() {
        let cutoff = at(2024, 6, 25);
        assert_eq!(Period::classify(cutoff, cutoff), Period::AfterCutoff);
        let just_before = cutoff - chrono::Duration::microseconds(1);
        assert_eq!(Period::classify(just_before, cutoff), Period::BeforeCutoff);
    }

    #[test]
    fn disposition_record_keeps_period_label() {
        let event = TaxableEvent::Disposition(Disposition {
            date: at(2024, 7, 1),
            asset: "BTC".to_string(),
            amount: dec!(0.5),
            proceeds: dec!(250.00),
            cost_base: dec!(200.00),
            gain_loss: dec!(50.00),
            period: Period::AfterCutoff,
        });
        let record = event.to_record();
        assert_eq!(record.kind, "disposition");
        assert_eq!(record.date, "2024-07-01T00:00:00");
        assert_eq!(record.period.as_deref(), Some("after_cutoff"));
        assert_eq!(record.income, None);
        assert_eq!(TaxableEvent::from_record(record).unwrap(), event);
    }

    #[test]
    fn unknown_period_survives_record() {
        let record = EventRecord {
            kind: "disposition".to_string(),
            date: "2023-02-01T10:00:00".to_string(),
            asset: "ETH".to_string(),
            amount: dec!(1),
            proceeds: Some(dec!(10)),
            cost_base: Some(dec!(4)),
            gain_loss: Some(dec!(6)),
            period: Some("mid_year".to_string()),
            income: None,
            description: None,
        };
        match TaxableEvent::from_record(record).unwrap() {
            TaxableEvent::Disposition(d) => {
                assert_eq!(d.period, Period::Unrecognized("mid_year".to_string()))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_kind_and_bad_date() {
        let mut record = TaxableEvent::Reward(Reward {
            date: at(2024, 1, 1),
            asset: "BTC".to_string(),
            amount: dec!(0.0001),
            income: dec!(5),
            description: "cashback".to_string(),
        })
        .to_record();
        record.kind = "airdrop".to_string();
        assert!(matches!(
            TaxableEvent::from_record(record.clone()),
            Err(Error::InvalidRecord(_))
        ));
        record.kind = "reward".to_string();
        record.date = "yesterday".to_string();
        assert!(matches!(
            TaxableEvent::from_record(record),
            Err(Error::InvalidRecord(_))
        ));
    }

    #[test]
    fn event_json_is_tagged() {
        let event = TaxableEvent::Reward(Reward {
            date: at(2024, 1, 1),
            asset: "BTC".to_string(),
            amount: dec!(0.0001),
            income: dec!(5.00),
            description: "ShakingSats".to_string(),
        });
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["kind"], "reward");
        assert_eq!(v["income"], "5.00");
    }
}
