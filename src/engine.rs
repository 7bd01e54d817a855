//! Average-cost (ACB) replay over a chronological transaction list.
//!
//! Each asset keeps one pool of `quantity` and `total_cost`. Acquisitions add
//! to the pool at their CAD valuation; dispositions remove units at the pool's
//! current average cost and realize `proceeds - cost_base`.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::Config;
use crate::event::{Disposition, Period, Reward, TaxableEvent};
use crate::money::{q2, q8};
use crate::transaction::{CanonicalTransaction, TransactionType};
use crate::warning::Warning;

/// Tolerance for disposing slightly more than is held.
const DISPOSAL_EPSILON: Decimal = dec!(0.000000000001);
/// Pools smaller than this are snapped to exactly zero.
const DUST_QUANTITY: Decimal = dec!(0.0000000001);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Position {
    pub quantity: Decimal,
    pub total_cost: Decimal,
}

impl Position {
    pub fn average_cost(&self) -> Decimal {
        if self.quantity.is_zero() {
            dec!(0)
        } else {
            self.total_cost / self.quantity
        }
    }
}

/// Output of one replay pass.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    pub events: Vec<TaxableEvent>,
    pub warnings: Vec<Warning>,
    /// Pools as they stand after the last transaction.
    pub holdings: BTreeMap<String, Position>,
}

#[derive(Debug, Clone, Copy)]
pub struct AcbEngine {
    cutoff: NaiveDateTime,
}

impl AcbEngine {
    pub fn new(cutoff: NaiveDateTime) -> Self {
        Self { cutoff }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cutoff)
    }

    /// Replays `transactions`, which must already be in non-decreasing
    /// timestamp order. Never fails: bad rows are skipped or adjusted and
    /// reported in [`Replay::warnings`].
    pub fn replay(&self, transactions: &[CanonicalTransaction]) -> Replay {
        let mut out = Replay::default();

        for tx in transactions {
            if tx.tx_type.is_acquisition()
                && tx.amount_credited > dec!(0)
                && !tx.asset_credited.is_empty()
            {
                if let Some(reward) = acquire(&mut out.holdings, tx, &mut out.warnings) {
                    out.events.push(TaxableEvent::Reward(reward));
                }
            } else if is_disposition(tx) {
                if let Some(d) = dispose(&mut out.holdings, tx, self.cutoff, &mut out.warnings) {
                    out.events.push(TaxableEvent::Disposition(d));
                }
            }
        }

        for w in &out.warnings {
            debug!("{}", w);
        }
        info!(
            "replayed {} transactions: {} taxable events, {} warnings",
            transactions.len(),
            out.events.len(),
            out.warnings.len()
        );
        out
    }
}

/// Replays with the cutoff from `config`.
pub fn replay(transactions: &[CanonicalTransaction], config: &Config) -> Replay {
    AcbEngine::from_config(config).replay(transactions)
}

fn is_disposition(tx: &CanonicalTransaction) -> bool {
    let taxable = match tx.tx_type {
        TransactionType::Sell => true,
        TransactionType::Send => tx.market_value > dec!(0),
        _ => false,
    };
    taxable && tx.amount_debited > dec!(0) && !tx.asset_debited.is_empty()
}

fn acquire(
    holdings: &mut BTreeMap<String, Position>,
    tx: &CanonicalTransaction,
    warnings: &mut Vec<Warning>,
) -> Option<Reward> {
    let is_reward = tx.tx_type == TransactionType::Reward;
    let mut value = if tx.market_value > dec!(0) {
        tx.market_value
    } else {
        tx.book_cost
    };
    if value <= dec!(0) {
        warnings.push(Warning::ZeroValueAcquisition {
            date: tx.timestamp,
            asset: tx.asset_credited.clone(),
            amount: tx.amount_credited,
            reward: is_reward,
        });
        value = dec!(0);
    }
    let value = q2(value);
    let amount = q8(tx.amount_credited);

    let pool = holdings.get(&tx.asset_credited).cloned().unwrap_or_default();
    let (Some(quantity), Some(total_cost)) = (
        pool.quantity.checked_add(amount),
        pool.total_cost.checked_add(value),
    ) else {
        warnings.push(Warning::ValueOverflow {
            date: tx.timestamp,
            asset: tx.asset_credited.clone(),
        });
        return None;
    };
    holdings.insert(
        tx.asset_credited.clone(),
        Position {
            quantity,
            total_cost,
        },
    );

    is_reward.then(|| Reward {
        date: tx.timestamp,
        asset: tx.asset_credited.clone(),
        amount,
        income: value,
        description: tx.description.clone(),
    })
}

fn dispose(
    holdings: &mut BTreeMap<String, Position>,
    tx: &CanonicalTransaction,
    cutoff: NaiveDateTime,
    warnings: &mut Vec<Warning>,
) -> Option<Disposition> {
    let asset = &tx.asset_debited;
    let requested = q8(tx.amount_debited);

    let pool = match holdings.get_mut(asset) {
        Some(p) if p.quantity > DISPOSAL_EPSILON => p,
        _ => {
            warnings.push(Warning::NoPriorHoldings {
                date: tx.timestamp,
                asset: asset.clone(),
                amount: requested,
            });
            return None;
        }
    };

    let amount = if requested > pool.quantity + DISPOSAL_EPSILON {
        warnings.push(Warning::OverDisposition {
            date: tx.timestamp,
            asset: asset.clone(),
            requested,
            available: pool.quantity,
        });
        pool.quantity
    } else {
        requested
    };

    let proceeds = q2(tx.market_value);
    let cost_base = pool
        .total_cost
        .checked_div(pool.quantity)
        .and_then(|unit_cost| amount.checked_mul(unit_cost))
        .map(q2);
    let gain_loss = cost_base
        .and_then(|c| proceeds.checked_sub(c))
        .map(q2);
    // Pool is left untouched when the valuation cannot be represented.
    let (Some(cost_base), Some(gain_loss)) = (cost_base, gain_loss) else {
        warnings.push(Warning::ValueOverflow {
            date: tx.timestamp,
            asset: asset.clone(),
        });
        return None;
    };

    // The pool gives up exactly the cost base it reported, so realized cost
    // can never exceed acquired cost.
    pool.quantity -= amount;
    pool.total_cost -= cost_base;
    if pool.quantity < DUST_QUANTITY {
        pool.quantity = dec!(0);
        pool.total_cost = dec!(0);
    } else if pool.total_cost < dec!(0) {
        warnings.push(Warning::NegativeCostBase {
            date: tx.timestamp,
            asset: asset.clone(),
            total_cost: pool.total_cost,
        });
        pool.total_cost = dec!(0);
    }

    Some(Disposition {
        date: tx.timestamp,
        asset: asset.clone(),
        amount,
        proceeds,
        cost_base,
        gain_loss,
        period: Period::classify(tx.timestamp, cutoff),
    })
}
