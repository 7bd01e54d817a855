//! Adjusted-cost-base capital gains and reward income for crypto ledgers
//! (Canadian average-cost method).
//!
//! Pipeline: [`normalize::read_raw_table`] → [`normalize::normalize`] →
//! [`engine::AcbEngine::replay`] → [`report::report_for_year`] /
//! [`report::report_for_range`].

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod money;
pub mod normalize;
pub mod report;
pub mod transaction;
pub mod warning;

use std::io::Read;

pub use config::Config;
pub use engine::{AcbEngine, Position, Replay};
pub use error::{Error, Result};
pub use event::{Disposition, EventRecord, Period, Reward, TaxableEvent};
pub use normalize::{Normalized, RawTable, YearRange};
pub use report::{AggregateReport, Report, YearReport, YearSelector};
pub use transaction::{CanonicalTransaction, TransactionType};
pub use warning::Warning;

/// A full-history replay plus what the normalizer learned about the input.
#[derive(Debug, Clone)]
pub struct History {
    pub total_rows: usize,
    pub dropped_rows: usize,
    pub years: YearRange,
    pub events: Vec<TaxableEvent>,
    pub holdings: std::collections::BTreeMap<String, Position>,
    /// Normalizer warnings first, then engine warnings.
    pub warnings: Vec<Warning>,
}

/// Reads a CSV export and replays it from the first transaction.
pub fn process_history<R: Read>(reader: R, config: &Config) -> Result<History> {
    let table = normalize::read_raw_table(reader)?;
    let normalized = normalize::normalize(&table, config)?;
    let replay = AcbEngine::from_config(config).replay(&normalized.transactions);

    let mut warnings = normalized.warnings;
    warnings.extend(replay.warnings);

    Ok(History {
        total_rows: normalized.total_rows,
        dropped_rows: normalized.dropped_rows,
        years: normalized.years,
        events: replay.events,
        holdings: replay.holdings,
        warnings,
    })
}
