//! Per-year and multi-year summaries over the engine's taxable events.

use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::{Disposition, Period, Reward, TaxableEvent};
use crate::money::q2;
use crate::normalize::YearRange;
use crate::warning::Warning;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaxSummary {
    pub before_cutoff: Decimal,
    pub after_cutoff: Decimal,
    pub reward_income: Decimal,
}

impl TaxSummary {
    pub fn total_gain_loss(&self) -> Decimal {
        q2(self.before_cutoff.saturating_add(self.after_cutoff))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub count: usize,
    pub value: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YearStats {
    pub disposition_count: usize,
    pub reward_count: usize,
    pub total_proceeds: Decimal,
    pub total_cost_disposed: Decimal,
    pub avg_gain_loss: Decimal,
    /// Highest single gain/loss in the year, 0 when there were no dispositions.
    pub largest_gain: Decimal,
    /// Lowest single gain/loss in the year, 0 when there were no dispositions.
    pub largest_loss: Decimal,
    pub reward_breakdown: BTreeMap<String, CategoryTotals>,
    pub assets_involved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearReport {
    pub year: i32,
    pub summary: TaxSummary,
    pub stats: YearStats,
    pub dispositions: Vec<Disposition>,
    pub rewards: Vec<Reward>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub total_gain_loss: Decimal,
    pub total_reward_income: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub disposition_count: usize,
    pub reward_count: usize,
    pub total_proceeds: Decimal,
    pub total_cost_disposed: Decimal,
    pub largest_gain: Decimal,
    pub largest_loss: Decimal,
    pub reward_breakdown: BTreeMap<String, CategoryTotals>,
    pub assets_involved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub first_year: i32,
    pub last_year: i32,
    pub summary: AggregateSummary,
    pub stats: AggregateStats,
    pub warnings: Vec<Warning>,
}

pub fn report_for_year(events: &[TaxableEvent], year: i32, config: &Config) -> YearReport {
    let mut summary = TaxSummary::default();
    let mut stats = YearStats::default();
    let mut dispositions = Vec::new();
    let mut rewards = Vec::new();
    let mut warnings = Vec::new();
    let mut largest_gain: Option<Decimal> = None;
    let mut largest_loss: Option<Decimal> = None;
    let mut net = dec!(0);
    let mut assets = BTreeSet::new();

    for event in events.iter().filter(|e| e.date().year() == year) {
        match event {
            TaxableEvent::Disposition(d) => {
                let before = matches!(d.period, Period::BeforeCutoff);
                let period_total = if before {
                    summary.before_cutoff
                } else {
                    summary.after_cutoff
                };
                let (Some(proceeds), Some(cost), Some(period_total), Some(new_net)) = (
                    stats.total_proceeds.checked_add(d.proceeds),
                    stats.total_cost_disposed.checked_add(d.cost_base),
                    period_total.checked_add(d.gain_loss),
                    net.checked_add(d.gain_loss),
                ) else {
                    overflow(&mut warnings, d.date, &d.asset);
                    continue;
                };

                if let Period::Unrecognized(label) = &d.period {
                    let w = Warning::UnknownPeriod {
                        date: d.date,
                        label: label.clone(),
                    };
                    warn!("{}", w);
                    warnings.push(w);
                }
                if before {
                    summary.before_cutoff = period_total;
                } else {
                    summary.after_cutoff = period_total;
                }
                net = new_net;
                stats.disposition_count += 1;
                stats.total_proceeds = proceeds;
                stats.total_cost_disposed = cost;
                assets.insert(event.asset().to_string());

                largest_gain = Some(largest_gain.map_or(d.gain_loss, |g| g.max(d.gain_loss)));
                largest_loss = Some(largest_loss.map_or(d.gain_loss, |l| l.min(d.gain_loss)));
                dispositions.push(d.clone());
            }
            TaxableEvent::Reward(r) => {
                let category = config.classify_reward(&r.description);
                let bucket_value = stats
                    .reward_breakdown
                    .get(category)
                    .map_or(dec!(0), |b| b.value);
                let (Some(income), Some(bucket_value)) = (
                    summary.reward_income.checked_add(r.income),
                    bucket_value.checked_add(r.income),
                ) else {
                    overflow(&mut warnings, r.date, &r.asset);
                    continue;
                };

                stats.reward_count += 1;
                summary.reward_income = income;
                let bucket = stats.reward_breakdown.entry(category.to_string()).or_default();
                bucket.count += 1;
                bucket.value = bucket_value;
                rewards.push(r.clone());
            }
        }
    }

    stats.avg_gain_loss = if stats.disposition_count > 0 {
        q2(net / Decimal::from(stats.disposition_count))
    } else {
        dec!(0)
    };
    stats.largest_gain = q2(largest_gain.unwrap_or_default());
    stats.largest_loss = q2(largest_loss.unwrap_or_default());
    stats.total_proceeds = q2(stats.total_proceeds);
    stats.total_cost_disposed = q2(stats.total_cost_disposed);
    for bucket in stats.reward_breakdown.values_mut() {
        bucket.value = q2(bucket.value);
    }
    stats.assets_involved = assets.into_iter().collect();

    summary.before_cutoff = q2(summary.before_cutoff);
    summary.after_cutoff = q2(summary.after_cutoff);
    summary.reward_income = q2(summary.reward_income);

    dispositions.sort_by_key(|d| d.date);
    rewards.sort_by_key(|r| r.date);

    YearReport {
        year,
        summary,
        stats,
        dispositions,
        rewards,
        warnings,
    }
}

fn overflow(warnings: &mut Vec<Warning>, date: NaiveDateTime, asset: &str) {
    let w = Warning::ValueOverflow {
        date,
        asset: asset.to_string(),
    };
    warn!("{}", w);
    warnings.push(w);
}

/// Sums the year reports for `year_lo..=year_hi`. Extremes are the min/max of
/// each year's extremes, so a year without dispositions contributes its 0.
/// A year whose totals would overflow the running sums is left out.
pub fn report_for_range(
    events: &[TaxableEvent],
    year_lo: i32,
    year_hi: i32,
    config: &Config,
) -> AggregateReport {
    let mut summary = AggregateSummary::default();
    let mut stats = AggregateStats::default();
    let mut warnings = Vec::new();
    let mut largest_gain: Option<Decimal> = None;
    let mut largest_loss: Option<Decimal> = None;
    let mut assets = BTreeSet::new();

    for year in year_lo..=year_hi {
        let yr = report_for_year(events, year, config);
        warnings.extend(yr.warnings);

        let buckets: Option<Vec<(String, CategoryTotals)>> = yr
            .stats
            .reward_breakdown
            .into_iter()
            .map(|(category, totals)| {
                let current = stats
                    .reward_breakdown
                    .get(&category)
                    .map_or(dec!(0), |b| b.value);
                let value = current.checked_add(totals.value)?;
                Some((
                    category,
                    CategoryTotals {
                        count: totals.count,
                        value,
                    },
                ))
            })
            .collect();
        let (Some(gain_loss), Some(income), Some(proceeds), Some(cost), Some(buckets)) = (
            yr.summary
                .before_cutoff
                .checked_add(yr.summary.after_cutoff)
                .and_then(|net| summary.total_gain_loss.checked_add(net)),
            summary.total_reward_income.checked_add(yr.summary.reward_income),
            stats.total_proceeds.checked_add(yr.stats.total_proceeds),
            stats.total_cost_disposed.checked_add(yr.stats.total_cost_disposed),
            buckets,
        ) else {
            let w = Warning::YearTotalOverflow { year };
            warn!("{}", w);
            warnings.push(w);
            continue;
        };

        summary.total_gain_loss = gain_loss;
        summary.total_reward_income = income;
        stats.disposition_count += yr.stats.disposition_count;
        stats.reward_count += yr.stats.reward_count;
        stats.total_proceeds = proceeds;
        stats.total_cost_disposed = cost;
        largest_gain = Some(largest_gain.map_or(yr.stats.largest_gain, |g| g.max(yr.stats.largest_gain)));
        largest_loss = Some(largest_loss.map_or(yr.stats.largest_loss, |l| l.min(yr.stats.largest_loss)));
        for (category, totals) in buckets {
            let bucket = stats.reward_breakdown.entry(category).or_default();
            bucket.count += totals.count;
            bucket.value = totals.value;
        }
        assets.extend(yr.stats.assets_involved);
    }

    summary.total_gain_loss = q2(summary.total_gain_loss);
    summary.total_reward_income = q2(summary.total_reward_income);
    stats.total_proceeds = q2(stats.total_proceeds);
    stats.total_cost_disposed = q2(stats.total_cost_disposed);
    stats.largest_gain = q2(largest_gain.unwrap_or_default());
    stats.largest_loss = q2(largest_loss.unwrap_or_default());
    for bucket in stats.reward_breakdown.values_mut() {
        bucket.value = q2(bucket.value);
    }
    stats.assets_involved = assets.into_iter().collect();

    AggregateReport {
        first_year: year_lo,
        last_year: year_hi,
        summary,
        stats,
        warnings,
    }
}

/// Which report a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearSelector {
    Year(i32),
    All,
}

impl YearSelector {
    /// Parses `"all"` or a year, rejecting years outside the ledger's range.
    pub fn parse(s: &str, years: &YearRange) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(YearSelector::All);
        }
        let year: i32 = s.parse().map_err(|_| Error::MalformedYear(s.to_string()))?;
        if !years.contains(year) {
            return Err(Error::YearOutOfRange {
                year,
                min: years.min,
                max: years.max,
            });
        }
        Ok(YearSelector::Year(year))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Report {
    Year(YearReport),
    Range(AggregateReport),
}

pub fn report(
    events: &[TaxableEvent],
    selector: YearSelector,
    years: &YearRange,
    config: &Config,
) -> Report {
    match selector {
        YearSelector::Year(y) => Report::Year(report_for_year(events, y, config)),
        YearSelector::All => Report::Range(report_for_range(events, years.min, years.max, config)),
    }
}
