//! Seeded synthetic transaction tables for demos, the runner, and tests.
//!
//! Each customer gets a Pareto-distributed purchase count, a last-purchase
//! offset drawn uniformly over the history, and Pareto-distributed amounts.
//! A share of customers is dormant: all their purchases predate the
//! history window, so they drop out of any window shorter than it.

use crate::{
    metrics::TransactionRecord,
    rng::{SeededRng, Stream},
    types::Days,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub customers:        usize,
    /// Days of history before `now` in which active customers purchase.
    pub history_days:     Days,
    /// Purchase-count Pareto shape; counts start at 1.
    pub frequency_alpha:  f64,
    pub max_transactions: u64,
    pub amount_xmin:      f64,
    pub amount_alpha:     f64,
    /// Probability a customer only purchased before the history window.
    pub dormant_share:    f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            customers:        500,
            history_days:     365,
            frequency_alpha:  1.3,
            max_transactions: 60,
            amount_xmin:      5.0,
            amount_alpha:     1.8,
            dormant_share:    0.1,
        }
    }
}

pub struct TransactionGenerator {
    config:   GeneratorConfig,
    activity: SeededRng,
    timing:   SeededRng,
    amounts:  SeededRng,
}

impl TransactionGenerator {
    pub fn new(seed: u64, config: GeneratorConfig) -> Self {
        Self {
            config,
            activity: SeededRng::new(seed, Stream::Activity),
            timing:   SeededRng::new(seed, Stream::Timing),
            amounts:  SeededRng::new(seed, Stream::Amounts),
        }
    }

    /// Generate every customer's purchases, all at or before `now`.
    pub fn generate(&mut self, now: DateTime<Utc>) -> Vec<TransactionRecord> {
        let history = self.config.history_days.max(1) as u64;
        let mut txns = Vec::new();

        for i in 0..self.config.customers {
            let customer_id = format!("c-{i:06}");
            let count = (self
                .activity
                .pareto(1.0, self.config.frequency_alpha)
                .floor() as u64)
                .clamp(1, self.config.max_transactions.max(1));
            // Dormant customers sit one full history further back.
            let base_offset = if self.activity.chance(self.config.dormant_share) {
                history + 1
            } else {
                0
            };
            let last_day = base_offset + self.timing.next_u64_below(history);

            for n in 0..count {
                let day = if n == 0 {
                    last_day
                } else {
                    last_day + self.timing.next_u64_below(history - (last_day - base_offset))
                };
                let seconds = day * SECONDS_PER_DAY + self.timing.next_u64_below(SECONDS_PER_DAY);
                let amount = self
                    .amounts
                    .pareto(self.config.amount_xmin, self.config.amount_alpha);
                txns.push(TransactionRecord {
                    unit_id:   customer_id.clone(),
                    amount:    (amount * 100.0).round() / 100.0,
                    timestamp: now - Duration::seconds(seconds as i64),
                });
            }
        }

        log::debug!(
            "synthetic: {} transactions for {} customers",
            txns.len(),
            self.config.customers
        );
        txns
    }
}
