//! Recency-Frequency-Monetary customer segmentation.
//!
//! Transactions go through three pure stages:
//! metric extraction, per-metric quantile scoring, and segment counting.
//! See `pipeline` for the end-to-end entry point.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod quantile;
pub mod rng;
pub mod score;
pub mod segment;
pub mod store;
pub mod synthetic;
pub mod types;

pub use config::{MetricKind, MetricSpec, MetricTable, RfmConfig, ScoreConfig, ScoreOrder};
pub use error::{RfmError, RfmResult};
pub use metrics::{extract_metrics, AnalysisWindow, CustomerMetrics, Transaction, TransactionRecord};
pub use pipeline::{RfmPipeline, RfmReport};
pub use score::{assign_scores, score_customers, Score, ScoreAssignment, ScoredCustomer};
pub use segment::{aggregate_segments, SegmentRecord};
