//! Static translation tables and reporting rules.
//!
//! A [`Config`] is plain data handed to the normalizer, engine and reports by
//! reference. The defaults cover French-language exports; a TOML file can
//! replace any section.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::transaction::*;

pub const DEFAULT_REWARD_CATEGORY: &str = "Other Reward";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inclusion-rate change date; dispositions at or after it are `after_cutoff`.
    pub cutoff: NaiveDateTime,
    /// Source header -> canonical header.
    pub columns: BTreeMap<String, String>,
    /// Source type label -> canonical type label.
    pub types: BTreeMap<String, String>,
    /// Checked in order, first keyword hit wins.
    pub reward_categories: Vec<RewardCategory>,
    pub default_reward_category: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RewardCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

impl RewardCategory {
    fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

fn default_cutoff() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 25)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN)
}

fn french_columns() -> BTreeMap<String, String> {
    [
        ("Date", COL_DATE),
        ("Type", COL_TYPE),
        ("Montant débité", COL_AMOUNT_DEBITED),
        ("Actif débité", COL_ASSET_DEBITED),
        ("Montant crédité", COL_AMOUNT_CREDITED),
        ("Actif crédité", COL_ASSET_CREDITED),
        ("Valeur du marché", COL_MARKET_VALUE),
        ("Devise de valeur du marché", "Market Value Currency"),
        ("Coût comptable", COL_BOOK_COST),
        ("Devise du coût comptable", "Book Cost Currency"),
        ("Taux au comptant", "Spot Rate"),
        ("Taux d'achat/de vente", "Buy / Sell Rate"),
        ("Description", COL_DESCRIPTION),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn french_types() -> BTreeMap<String, String> {
    [
        ("Achat", "Buy"),
        ("Récompenses", "Reward"),
        ("Envoi", "Send"),
        ("Vente", "Sell"),
        ("Recevoir", "Receive"),
        ("Remise en bitcoins", "Reward"),
        ("Remises en Bitcoin", "Reward"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cutoff: default_cutoff(),
            columns: french_columns(),
            types: french_types(),
            reward_categories: vec![
                RewardCategory::new("ShakingSats", &["shakingsats"]),
                RewardCategory::new("Cashback/Rebate", &["cashback", "remise"]),
                RewardCategory::new("SecretSats", &["secretsats"]),
            ],
            default_reward_category: DEFAULT_REWARD_CATEGORY.to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Resolves a source header to its canonical name, if it has one.
    pub fn canonical_column<'a>(&'a self, header: &'a str) -> &'a str {
        self.columns
            .get(header)
            .map(String::as_str)
            .unwrap_or(header)
    }

    pub fn canonical_type<'a>(&'a self, label: &'a str) -> &'a str {
        self.types.get(label).map(String::as_str).unwrap_or(label)
    }

    /// Category for a reward, by case-insensitive substring match on its description.
    pub fn classify_reward(&self, description: &str) -> &str {
        let desc = description.to_lowercase();
        self.reward_categories
            .iter()
            .find(|c| {
                c.keywords
                    .iter()
                    .any(|k| !k.is_empty() && desc.contains(&k.to_lowercase()))
            })
            .map(|c| c.name.as_str())
            .unwrap_or(self.default_reward_category.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cutoff_is_june_25_2024() {
        let c = Config::default();
        assert_eq!(c.cutoff.to_string(), "2024-06-25 00:00:00");
    }

    #[test]
    fn classifies_rewards() {
        let c = Config::default();
        assert_eq!(c.classify_reward("ShakingSats daily"), "ShakingSats");
        assert_eq!(c.classify_reward("Remise en bitcoins"), "Cashback/Rebate");
        assert_eq!(c.classify_reward("card CASHBACK"), "Cashback/Rebate");
        assert_eq!(c.classify_reward("SecretSats"), "SecretSats");
        assert_eq!(c.classify_reward("staking payout"), "Other Reward");
        assert_eq!(c.classify_reward(""), "Other Reward");
    }

    #[test]
    fn translates_french_headers_and_types() {
        let c = Config::default();
        assert_eq!(c.canonical_column("Montant crédité"), "Amount Credited");
        assert_eq!(c.canonical_column("Amount Credited"), "Amount Credited");
        assert_eq!(c.canonical_type("Remises en Bitcoin"), "Reward");
        assert_eq!(c.canonical_type("Sell"), "Sell");
    }

    #[test]
    fn toml_overrides_only_given_sections() {
        let c = Config::from_toml_str(
            r#"
            cutoff = "2025-01-01T00:00:00"
            default_reward_category = "Misc"

            [[reward_categories]]
            name = "Staking"
            keywords = ["stake"]
            "#,
        )
        .unwrap();
        assert_eq!(c.cutoff.to_string(), "2025-01-01 00:00:00");
        assert_eq!(c.classify_reward("ETH stake reward"), "Staking");
        assert_eq!(c.classify_reward("cashback"), "Misc");
        assert_eq!(c.types, french_types());
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = Config::from_toml_str("cutoff = 12").unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }
}
