use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use csv::WriterBuilder;
use std::fs::File;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crypto_acb::money::{format_cad, q2, q8};
use crypto_acb::report::{self, AggregateReport, Report, YearReport, YearSelector};
use crypto_acb::{Config, History, process_history};

#[derive(Parser, Debug)]
#[command(
    about = "Adjusted cost base and reward income report for a crypto transaction CSV",
    long_about = None
)]
struct Args {
    /// Exported transaction history (English or French headers)
    input: PathBuf,

    /// Tax year to report, or "all" for every year in the file
    #[arg(short, long)]
    year: Option<String>,

    /// TOML file overriding cutoff date, translation tables or reward categories
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write every taxable event as a flat CSV record
    #[arg(long)]
    events_out: Option<PathBuf>,

    /// Print the report as JSON instead of the text summary
    #[arg(long)]
    json: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    let file = File::open(&args.input)
        .with_context(|| format!("CSV not found: {}", args.input.display()))?;
    let history = process_history(file, &config)
        .with_context(|| format!("processing {}", args.input.display()))?;
    info!(
        "processed {} rows ({} dropped), {} taxable events",
        history.total_rows,
        history.dropped_rows,
        history.events.len()
    );
    for w in &history.warnings {
        warn!("{}", w);
    }

    let selector = match &args.year {
        Some(s) => YearSelector::parse(s, &history.years)?,
        None => YearSelector::Year(history.years.default_year(Local::now().year())),
    };

    if let Some(path) = &args.events_out {
        let mut wtr = WriterBuilder::new()
            .from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        for event in &history.events {
            wtr.serialize(event.to_record())?;
        }
        wtr.flush()?;
        info!("wrote {} event records to {}", history.events.len(), path.display());
    }

    let report = report::report(&history.events, selector, &history.years, &config);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match &report {
        Report::Year(r) => print_year(r),
        Report::Range(r) => print_range(r),
    }
    print_holdings(&history);
    Ok(())
}

fn print_year(r: &YearReport) {
    println!("\n=== CANADIAN CRYPTO TAX SUMMARY (ACB) ===");
    println!("Tax year: {}", r.year);
    println!("Gain/loss before cutoff: {}", format_cad(r.summary.before_cutoff));
    println!("Gain/loss after cutoff: {}", format_cad(r.summary.after_cutoff));
    println!("Net capital gain/loss: {}", format_cad(r.summary.total_gain_loss()));
    println!("Total reward income: {}", format_cad(r.summary.reward_income));

    let s = &r.stats;
    println!("\n=== STATISTICS ===");
    println!("Dispositions: {}", s.disposition_count);
    println!("Rewards: {}", s.reward_count);
    println!("Total proceeds: {}", format_cad(s.total_proceeds));
    println!("Total cost disposed: {}", format_cad(s.total_cost_disposed));
    println!("Average gain/loss: {}", format_cad(s.avg_gain_loss));
    println!("Largest gain: {}", format_cad(s.largest_gain));
    println!("Largest loss: {}", format_cad(s.largest_loss));
    if !s.assets_involved.is_empty() {
        println!("Assets disposed: {}", s.assets_involved.join(", "));
    }
    for (category, totals) in &s.reward_breakdown {
        println!("  {}: {} reward(s), {}", category, totals.count, format_cad(totals.value));
    }

    if !r.dispositions.is_empty() {
        println!("\n=== DISPOSITIONS ===");
        for d in &r.dispositions {
            println!(
                "{} {} {} proceeds={} cost={} gain={} ({})",
                d.date,
                q8(d.amount),
                d.asset,
                q2(d.proceeds),
                q2(d.cost_base),
                q2(d.gain_loss),
                d.period.label()
            );
        }
    }
}

fn print_range(r: &AggregateReport) {
    println!("\n=== CANADIAN CRYPTO TAX SUMMARY (ACB) ===");
    println!("Tax years: {} - {}", r.first_year, r.last_year);
    println!("Net capital gain/loss: {}", format_cad(r.summary.total_gain_loss));
    println!("Total reward income: {}", format_cad(r.summary.total_reward_income));

    let s = &r.stats;
    println!("\n=== STATISTICS ===");
    println!("Dispositions: {}", s.disposition_count);
    println!("Rewards: {}", s.reward_count);
    println!("Total proceeds: {}", format_cad(s.total_proceeds));
    println!("Total cost disposed: {}", format_cad(s.total_cost_disposed));
    println!("Largest gain: {}", format_cad(s.largest_gain));
    println!("Largest loss: {}", format_cad(s.largest_loss));
    if !s.assets_involved.is_empty() {
        println!("Assets disposed: {}", s.assets_involved.join(", "));
    }
    for (category, totals) in &s.reward_breakdown {
        println!("  {}: {} reward(s), {}", category, totals.count, format_cad(totals.value));
    }
}

fn print_holdings(history: &History) {
    println!("\n=== ENDING POOLS (units + ACB) ===");
    for (asset, p) in &history.holdings {
        println!(
            "{}: units={}, ACB(CAD)={}, avg_cost(CAD/unit)={}",
            asset,
            q8(p.quantity),
            q2(p.total_cost),
            q2(p.average_cost())
        );
    }
    if !history.warnings.is_empty() {
        println!("\nWarnings: {}", history.warnings.len());
    }
}
