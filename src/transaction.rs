use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Canonical column headers produced by translation.
pub const COL_DATE: &str = "Date";
pub const COL_TYPE: &str = "Type";
pub const COL_AMOUNT_DEBITED: &str = "Amount Debited";
pub const COL_ASSET_DEBITED: &str = "Asset Debited";
pub const COL_AMOUNT_CREDITED: &str = "Amount Credited";
pub const COL_ASSET_CREDITED: &str = "Asset Credited";
pub const COL_MARKET_VALUE: &str = "Market Value";
pub const COL_BOOK_COST: &str = "Book Cost";
pub const COL_DESCRIPTION: &str = "Description";

pub const ESSENTIAL_COLUMNS: [&str; 7] = [
    COL_DATE,
    COL_TYPE,
    COL_AMOUNT_DEBITED,
    COL_ASSET_DEBITED,
    COL_AMOUNT_CREDITED,
    COL_ASSET_CREDITED,
    COL_MARKET_VALUE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Buy,
    Reward,
    Receive,
    Sell,
    Send,
}

impl TransactionType {
    pub fn is_acquisition(self) -> bool {
        matches!(
            self,
            TransactionType::Buy | TransactionType::Reward | TransactionType::Receive
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::Buy => "Buy",
            TransactionType::Reward => "Reward",
            TransactionType::Receive => "Receive",
            TransactionType::Sell => "Sell",
            TransactionType::Send => "Send",
        };
        f.write_str(s)
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(TransactionType::Buy),
            "reward" => Ok(TransactionType::Reward),
            "receive" => Ok(TransactionType::Receive),
            "sell" => Ok(TransactionType::Sell),
            "send" => Ok(TransactionType::Send),
            _ => Err(s.to_string()),
        }
    }
}

/// One cleaned ledger row. Amounts are already quantized and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub timestamp: NaiveDateTime,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub asset_debited: String,
    pub amount_debited: Decimal,
    pub asset_credited: String,
    pub amount_credited: Decimal,
    pub market_value: Decimal,
    pub book_cost: Decimal,
    pub description: String,
}
