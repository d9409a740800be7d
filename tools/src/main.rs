//! rfm-runner: headless RFM segmentation batch.
//!
//! Usage:
//!   rfm-runner --customers 500 --seed 12345 --now 2024-12-31T00:00:00Z
//!   rfm-runner --db txns.db --horizon 180 --max-score 4 --auto-adjust --bins
//!   rfm-runner --db txns.db --populate --customers 2000 --seed 7
//!   rfm-runner --config rfm.json --db txns.db --json

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rfm_core::{
    config::{MetricKind, RfmConfig},
    pipeline::{RfmPipeline, RfmReport},
    segment::total_customers,
    store::{parse_timestamp, TransactionStore},
    synthetic::{GeneratorConfig, TransactionGenerator},
    types::CustomerId,
};
use std::env;

#[derive(serde::Serialize)]
struct JsonSummary<'a> {
    now:       DateTime<Utc>,
    customers: usize,
    report:    &'a RfmReport<CustomerId>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let customers = parse_arg(&args, "--customers", 500usize);
    let json = has_flag(&args, "--json");
    let populate = has_flag(&args, "--populate");
    let db = flag_value(&args, "--db");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => RfmConfig::load(path)?,
        None => RfmConfig::default(),
    };
    apply_overrides(&args, &mut config);

    let now = match flag_value(&args, "--now") {
        Some(raw) => parse_timestamp(raw).with_context(|| format!("--now {raw}"))?,
        None => Utc::now(),
    };

    let pipeline = RfmPipeline::new(config)?;

    if !json {
        println!("rfm-runner");
        println!("  now:       {now}");
        println!("  horizon:   {} days", pipeline.config().time_horizon_days);
        println!("  source:    {}", db.unwrap_or("synthetic"));
        println!();
    }

    let generator_config = GeneratorConfig {
        customers,
        ..GeneratorConfig::default()
    };

    let report = match db {
        Some(path) => {
            let store = TransactionStore::open(path)?;
            if populate {
                store.migrate()?;
                let txns = TransactionGenerator::new(seed, generator_config).generate(now);
                let inserted = store.insert_transactions(&txns)?;
                log::info!("populated {path} with {inserted} synthetic transactions");
            }
            pipeline.run_store(&store, now)?
        }
        None => {
            let txns = TransactionGenerator::new(seed, generator_config).generate(now);
            pipeline.run(&txns, now)?
        }
    };

    if json {
        let summary = JsonSummary {
            now,
            customers: report.customers.len(),
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn apply_overrides(args: &[String], config: &mut RfmConfig) {
    config.time_horizon_days = parse_arg(args, "--horizon", config.time_horizon_days);
    for kind in MetricKind::ALL {
        let scoring = config.scoring_mut(kind);
        scoring.max_score = parse_arg(args, "--max-score", scoring.max_score);
        if has_flag(args, "--auto-adjust") {
            scoring.auto_max_score_adjust = true;
        }
        if has_flag(args, "--bins") {
            scoring.add_score_bins = true;
        }
        if has_flag(args, "--quiet") {
            scoring.print_info = false;
        }
    }
    if has_flag(args, "--bins") {
        config.use_bins = true;
    }
}

fn print_summary(report: &RfmReport<CustomerId>) {
    println!("=== SCORE BINS ===");
    for kind in MetricKind::ALL {
        let summary = report.summary(kind);
        let adjusted = if summary.max_score < summary.requested_max_score {
            format!(" (adjusted from {})", summary.requested_max_score)
        } else {
            String::new()
        };
        println!("  {} max_score={}{}", kind.name(), summary.max_score, adjusted);
        for (score, range) in summary.bins.iter() {
            println!("    {score}: {range}");
        }
    }

    println!();
    println!("=== SEGMENTS ===");
    if report.segments.is_empty() {
        println!("  (no customers in window)");
    }
    for segment in &report.segments {
        match &segment.bins {
            Some(bins) => println!(
                "  {:<6} {:>6}   r {} f {} m {}",
                segment.segment, segment.count, bins.r_bin, bins.f_bin, bins.m_bin
            ),
            None => println!("  {:<6} {:>6}", segment.segment, segment.count),
        }
    }
    println!("  total  {:>6}", total_customers(&report.segments));
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
