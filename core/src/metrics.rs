//! Metric extraction: transactions -> one recency/frequency/monetary row per customer.
//!
//! Only transactions inside the analysis window contribute. Customers with
//! no transaction in the window are absent from the output, not zero-filled.
//! No clock access: `now` always comes from the caller.

use crate::{
    config::MetricKind,
    error::{RfmError, RfmResult},
    types::{CustomerId, Days},
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single purchase. Implement this for whatever row type the caller holds.
pub trait Transaction {
    type UnitId: Clone + Ord;

    fn unit_id(&self) -> &Self::UnitId;
    fn amount(&self) -> f64;
    fn timestamp(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub unit_id:   CustomerId,
    pub amount:    f64,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(unit_id: impl Into<CustomerId>, amount: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            unit_id: unit_id.into(),
            amount,
            timestamp,
        }
    }
}

impl Transaction for TransactionRecord {
    type UnitId = CustomerId;

    fn unit_id(&self) -> &CustomerId {
        &self.unit_id
    }

    fn amount(&self) -> f64 {
        self.amount
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// The inclusive interval `[now - time_horizon_days, now]`.
///
/// Fields are private so every window has passed the horizon checks in `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisWindow {
    now:               DateTime<Utc>,
    start:             DateTime<Utc>,
    time_horizon_days: Days,
}

impl AnalysisWindow {
    pub fn new(now: DateTime<Utc>, time_horizon_days: Days) -> RfmResult<Self> {
        if time_horizon_days <= 0 {
            return Err(RfmError::InvalidTimeHorizon(time_horizon_days));
        }
        let start = TimeDelta::try_days(time_horizon_days)
            .and_then(|horizon| now.checked_sub_signed(horizon))
            .ok_or(RfmError::InvalidTimeHorizon(time_horizon_days))?;
        Ok(Self {
            now,
            start,
            time_horizon_days,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn time_horizon_days(&self) -> Days {
        self.time_horizon_days
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.now
    }

    /// Whole days from `ts` to `now`. Only meaningful for `ts <= now`.
    pub fn days_before(&self, ts: DateTime<Utc>) -> Days {
        (self.now - ts).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetrics<K> {
    pub unit_id:   K,
    /// Days since the most recent in-window transaction.
    pub recency:   Days,
    /// Number of in-window transactions.
    pub frequency: u64,
    /// Sum of in-window amounts.
    pub monetary:  f64,
}

impl<K> CustomerMetrics<K> {
    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Recency   => self.recency as f64,
            MetricKind::Frequency => self.frequency as f64,
            MetricKind::Monetary  => self.monetary,
        }
    }
}

/// Reduce `transactions` to one metrics row per customer, ordered by unit id.
pub fn extract_metrics<T: Transaction>(
    transactions: &[T],
    window: &AnalysisWindow,
) -> Vec<CustomerMetrics<T::UnitId>> {
    let mut by_unit: BTreeMap<T::UnitId, CustomerMetrics<T::UnitId>> = BTreeMap::new();
    let mut kept = 0usize;

    for txn in transactions {
        let ts = txn.timestamp();
        if !window.contains(ts) {
            continue;
        }
        kept += 1;
        let days_before = window.days_before(ts);

        let row = by_unit
            .entry(txn.unit_id().clone())
            .or_insert_with(|| CustomerMetrics {
                unit_id:   txn.unit_id().clone(),
                recency:   days_before,
                frequency: 0,
                monetary:  0.0,
            });
        row.recency = row.recency.min(days_before);
        row.frequency += 1;
        row.monetary += txn.amount();
    }

    log::debug!(
        "metric extraction: {kept}/{} transactions in window, {} customers",
        transactions.len(),
        by_unit.len()
    );

    by_unit.into_values().collect()
}
