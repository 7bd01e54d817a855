use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crypto_acb::normalize::{normalize, read_raw_table};
use crypto_acb::report::{report_for_range, report_for_year};
use crypto_acb::{
    AcbEngine, Config, EventRecord, Period, TaxableEvent, TransactionType, Warning,
    process_history,
};

const LEDGER: &str = "\
Date,Amount Debited,Asset Debited,Amount Credited,Asset Credited,Market Value,Book Cost,Type,Description
2023-01-10 10:00:00,100,CAD,0.004,BTC,100,100,Buy,
2023-02-10 10:00:00,300,CAD,0.004,BTC,300,300,Buy,
2023-03-01 08:00:00,,,0.00001,BTC,\"0,31\",,Reward,ShakingSats
2023-05-01 10:00:00,0.004,BTC,250,CAD,250,,Sell,
2023-06-01 10:00:00,0.1,ETH,200,CAD,200,,Sell,
2024-01-05 08:00:00,,,0.00002,BTC,0.9,,Reward,Bitcoin cashback
2024-03-15 10:00:00,1000,CAD,0.5,ETH,1000,1000,Buy,
2024-06-24 23:59:59,0.002,BTC,,,180,,Send,
2024-06-25 00:00:00,0.25,ETH,600,CAD,600,,Sell,
2024-07-01 09:00:00,,,0.0001,BTC,,,Reward,Referral bonus
2024-08-01 10:00:00,1,ETH,,,2500,,Send,
2024-09-01 10:00:00,0.001,BTC,,,,,Send,
";

fn config() -> Config {
    Config::default()
}

fn dispositions(events: &[TaxableEvent]) -> Vec<&crypto_acb::Disposition> {
    events
        .iter()
        .filter_map(|e| match e {
            TaxableEvent::Disposition(d) => Some(d),
            _ => None,
        })
        .collect()
}

#[test]
fn full_history_produces_expected_events() {
    let h = process_history(LEDGER.as_bytes(), &config()).unwrap();
    assert_eq!(h.total_rows, 12);
    assert_eq!(h.dropped_rows, 0);
    assert_eq!((h.years.min, h.years.max), (2023, 2024));

    let d = dispositions(&h.events);
    // ETH sell in 2023 has no holdings; the valueless Send is not taxable.
    assert_eq!(d.len(), 4);

    // 0.008 BTC for $400, then a reward for $0.31.
    assert_eq!(d[0].asset, "BTC");
    assert_eq!(d[0].amount, dec!(0.004));
    assert_eq!(d[0].cost_base, dec!(199.91));
    assert_eq!(d[0].gain_loss, dec!(50.09));
    assert_eq!(d[0].period, Period::BeforeCutoff);

    assert_eq!(d[1].period, Period::BeforeCutoff);
    assert_eq!(d[2].asset, "ETH");
    assert_eq!(d[2].period, Period::AfterCutoff);
    assert_eq!(d[2].cost_base, dec!(500.00));
    assert_eq!(d[2].gain_loss, dec!(100.00));

    // Over-disposition of ETH: 0.25 left, 1 requested.
    assert_eq!(d[3].amount, dec!(0.25));
    assert_eq!(d[3].cost_base, dec!(500.00));
    assert_eq!(h.holdings["ETH"].quantity, dec!(0));

    assert!(h.warnings.iter().any(
        |w| matches!(w, Warning::NoPriorHoldings { asset, .. } if asset == "ETH")
    ));
    assert!(h.warnings.iter().any(|w| matches!(w, Warning::OverDisposition { .. })));
    assert!(h.warnings.iter().any(
        |w| matches!(w, Warning::ZeroValueAcquisition { reward: true, .. })
    ));
}

#[test]
fn ledger_never_goes_negative_during_replay() {
    let n = normalize(&read_raw_table(LEDGER.as_bytes()).unwrap(), &config()).unwrap();
    let engine = AcbEngine::from_config(&config());
    for end in 1..=n.transactions.len() {
        let r = engine.replay(&n.transactions[..end]);
        for (asset, p) in &r.holdings {
            assert!(p.quantity >= dec!(0), "{} quantity after {} rows", asset, end);
            assert!(p.total_cost >= dec!(0), "{} cost after {} rows", asset, end);
        }
    }
}

#[test]
fn cost_base_never_exceeds_acquired_cost() {
    let n = normalize(&read_raw_table(LEDGER.as_bytes()).unwrap(), &config()).unwrap();
    let mut acquired: HashMap<String, Decimal> = HashMap::new();
    for tx in &n.transactions {
        if tx.tx_type.is_acquisition() && tx.amount_credited > dec!(0) {
            let value = if tx.market_value > dec!(0) {
                tx.market_value
            } else {
                tx.book_cost
            };
            *acquired.entry(tx.asset_credited.clone()).or_default() += value;
        }
    }

    let r = AcbEngine::from_config(&config()).replay(&n.transactions);
    let mut realized: HashMap<String, Decimal> = HashMap::new();
    for d in dispositions(&r.events) {
        *realized.entry(d.asset.clone()).or_default() += d.cost_base;
    }
    for (asset, cost) in realized {
        assert!(cost <= acquired[&asset], "{} realized {} > acquired", asset, cost);
    }
}

#[test]
fn replaying_twice_is_identical() {
    let n = normalize(&read_raw_table(LEDGER.as_bytes()).unwrap(), &config()).unwrap();
    let engine = AcbEngine::from_config(&config());
    let a = engine.replay(&n.transactions);
    let b = engine.replay(&n.transactions);
    assert_eq!(a.events, b.events);
    assert_eq!(a.warnings, b.warnings);
    assert_eq!(a.holdings, b.holdings);
}

#[test]
fn year_and_range_reports_agree() {
    let cfg = config();
    let h = process_history(LEDGER.as_bytes(), &cfg).unwrap();

    let y2023 = report_for_year(&h.events, 2023, &cfg);
    let y2024 = report_for_year(&h.events, 2024, &cfg);
    assert_eq!(y2023.stats.reward_breakdown["ShakingSats"].count, 1);
    assert_eq!(y2024.stats.reward_breakdown["Cashback/Rebate"].value, dec!(0.90));
    assert_eq!(y2024.stats.reward_breakdown["Other Reward"].count, 1);
    assert_eq!(y2024.stats.reward_breakdown["Other Reward"].value, dec!(0));

    let all = report_for_range(&h.events, h.years.min, h.years.max, &cfg);
    assert_eq!(
        all.summary.total_gain_loss,
        y2023.summary.total_gain_loss() + y2024.summary.total_gain_loss()
    );
    assert_eq!(
        all.summary.total_reward_income,
        y2023.summary.reward_income + y2024.summary.reward_income
    );
    assert_eq!(
        all.stats.disposition_count,
        y2023.stats.disposition_count + y2024.stats.disposition_count
    );
    assert_eq!(all.stats.largest_gain, y2023.stats.largest_gain.max(y2024.stats.largest_gain));
    assert_eq!(all.stats.largest_loss, y2023.stats.largest_loss.min(y2024.stats.largest_loss));
}

#[test]
fn event_records_survive_a_csv_boundary() {
    let h = process_history(LEDGER.as_bytes(), &config()).unwrap();

    let mut wtr = csv::Writer::from_writer(Vec::new());
    for e in &h.events {
        wtr.serialize(e.to_record()).unwrap();
    }
    let bytes = wtr.into_inner().unwrap();

    let mut rdr = csv::Reader::from_reader(bytes.as_slice());
    let restored: Vec<TaxableEvent> = rdr
        .deserialize::<EventRecord>()
        .map(|r| TaxableEvent::from_record(r.unwrap()).unwrap())
        .collect();
    assert_eq!(restored, h.events);
}

#[test]
fn french_export_matches_english_export() {
    let french = "\
Date,Montant débité,Actif débité,Montant crédité,Actif crédité,Valeur du marché,Coût comptable,Type,Description
2024-01-10 10:00:00,100,CAD,\"0,5\",ETH,100,100,Achat,
2024-02-10 10:00:00,\"0,25\",ETH,80,CAD,80,,Vente,
2024-03-01 08:00:00,,,\"0,00001\",BTC,\"0,75\",,Remises en Bitcoin,Remise en bitcoins
";
    let english = "\
Date,Amount Debited,Asset Debited,Amount Credited,Asset Credited,Market Value,Book Cost,Type,Description
2024-01-10 10:00:00,100,CAD,0.5,ETH,100,100,Buy,
2024-02-10 10:00:00,0.25,ETH,80,CAD,80,,Sell,
2024-03-01 08:00:00,,,0.00001,BTC,0.75,,Reward,Remise en bitcoins
";
    let cfg = config();
    let fr = process_history(french.as_bytes(), &cfg).unwrap();
    let en = process_history(english.as_bytes(), &cfg).unwrap();
    assert_eq!(fr.events, en.events);

    let n = normalize(&read_raw_table(french.as_bytes()).unwrap(), &cfg).unwrap();
    assert_eq!(n.transactions[2].tx_type, TransactionType::Reward);
    assert_eq!(fr.events.len(), 2);
}

#[test]
fn oversized_market_values_do_not_abort_processing() {
    let ledger = "\
Date,Amount Debited,Asset Debited,Amount Credited,Asset Credited,Market Value,Book Cost,Type,Description
2024-01-01 10:00:00,,,1,BTC,50000000000000000000000000000,,Buy,
2024-01-02 10:00:00,,,1,BTC,50000000000000000000000000000,,Buy,
2024-01-03 10:00:00,0.5,BTC,100,CAD,100,,Sell,
";
    let h = process_history(ledger.as_bytes(), &config()).unwrap();
    assert_eq!(h.holdings["BTC"].quantity, dec!(0.5));
    assert_eq!(
        h.warnings
            .iter()
            .filter(|w| matches!(w, Warning::ValueOverflow { asset, .. } if asset == "BTC"))
            .count(),
        1
    );

    let d = dispositions(&h.events);
    assert_eq!(d.len(), 1);
    assert_eq!(d[0].cost_base, dec!(25000000000000000000000000000));
}
