//! The full batch: extract metrics, score each metric, aggregate segments.
//!
//! Stage order is fixed:
//!   1. metrics::extract_metrics   (window filter + group by customer)
//!   2. score::score_customers     (recency, frequency, monetary)
//!   3. segment::aggregate_segments

use crate::{
    config::{MetricKind, RfmConfig},
    error::RfmResult,
    metrics::{extract_metrics, AnalysisWindow, Transaction},
    score::{score_customers, ScoreAssignment, ScoreBins, ScoredCustomer},
    segment::{aggregate_segments, SegmentRecord},
    store::TransactionStore,
    types::CustomerId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// How one metric ended up being scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric:              MetricKind,
    pub requested_max_score: u32,
    pub max_score:           u32,
    pub bins:                ScoreBins,
}

impl From<ScoreAssignment> for MetricSummary {
    fn from(a: ScoreAssignment) -> Self {
        Self {
            metric:              a.metric,
            requested_max_score: a.requested_max_score,
            max_score:           a.max_score,
            bins:                a.bins,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmReport<K> {
    pub window:    AnalysisWindow,
    pub customers: Vec<ScoredCustomer<K>>,
    pub segments:  Vec<SegmentRecord>,
    pub recency:   MetricSummary,
    pub frequency: MetricSummary,
    pub monetary:  MetricSummary,
}

impl<K> RfmReport<K> {
    pub fn summary(&self, kind: MetricKind) -> &MetricSummary {
        match kind {
            MetricKind::Recency   => &self.recency,
            MetricKind::Frequency => &self.frequency,
            MetricKind::Monetary  => &self.monetary,
        }
    }
}

pub struct RfmPipeline {
    config: RfmConfig,
}

impl RfmPipeline {
    pub fn new(config: RfmConfig) -> RfmResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RfmConfig {
        &self.config
    }

    pub fn window(&self, now: DateTime<Utc>) -> RfmResult<AnalysisWindow> {
        AnalysisWindow::new(now, self.config.time_horizon_days)
    }

    pub fn run<T: Transaction>(
        &self,
        transactions: &[T],
        now: DateTime<Utc>,
    ) -> RfmResult<RfmReport<T::UnitId>> {
        let window = self.window(now)?;
        let metrics = extract_metrics(transactions, &window);
        let scored = score_customers(metrics, &self.config)?;
        let segments = aggregate_segments(&scored.customers, self.config.use_bins);

        log::info!(
            "rfm: {} customers in {} segments (window {} .. {})",
            scored.customers.len(),
            segments.len(),
            window.start(),
            window.now()
        );

        Ok(RfmReport {
            window,
            customers: scored.customers,
            segments,
            recency: scored.recency.into(),
            frequency: scored.frequency.into(),
            monetary: scored.monetary.into(),
        })
    }

    /// Run over the transactions stored in `store`, filtering the window in SQL.
    pub fn run_store(
        &self,
        store: &TransactionStore,
        now: DateTime<Utc>,
    ) -> RfmResult<RfmReport<CustomerId>> {
        let window = self.window(now)?;
        let transactions = store.load_window(&self.config.columns, &window)?;
        self.run(&transactions, now)
    }
}

/// One-shot convenience over `RfmPipeline`.
pub fn run<T: Transaction>(
    transactions: &[T],
    now: DateTime<Utc>,
    config: &RfmConfig,
) -> RfmResult<RfmReport<T::UnitId>> {
    RfmPipeline::new(config.clone())?.run(transactions, now)
}
