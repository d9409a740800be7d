//! Pipeline configuration.
//!
//! RULE: nothing in the pipeline branches on a literal metric tag.
//! Tag, display name, output column names and score direction all come
//! from the `MetricTable`.

use crate::{
    error::{RfmError, RfmResult},
    types::Days,
};
use serde::{Deserialize, Serialize};

/// Default analysis horizon when a config file omits one.
pub const DEFAULT_TIME_HORIZON_DAYS: Days = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Recency,
    Frequency,
    Monetary,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [Self::Recency, Self::Frequency, Self::Monetary];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Recency   => "recency",
            Self::Frequency => "frequency",
            Self::Monetary  => "monetary",
        }
    }
}

/// Which end of the value range earns the highest score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrder {
    /// Lowest values get score 1.
    Ascending,
    /// Lowest values get the top score (smaller recency is better).
    Descending,
}

/// One row of the tag -> metric mapping.
///
/// Output column names are fixed (`r`/`f`/`m` and `*_bin`); unknown keys
/// are rejected so a table cannot appear to rename them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSpec {
    pub kind:  MetricKind,
    pub tag:   String,
    pub name:  String,
    pub order: ScoreOrder,
}

impl MetricSpec {
    pub fn new(kind: MetricKind, tag: &str, order: ScoreOrder) -> Self {
        Self {
            kind,
            tag: tag.to_string(),
            name: kind.name().to_string(),
            order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricTable {
    specs: Vec<MetricSpec>,
}

impl Default for MetricTable {
    fn default() -> Self {
        Self {
            specs: vec![
                MetricSpec::new(MetricKind::Recency, "r", ScoreOrder::Descending),
                MetricSpec::new(MetricKind::Frequency, "f", ScoreOrder::Ascending),
                MetricSpec::new(MetricKind::Monetary, "m", ScoreOrder::Ascending),
            ],
        }
    }
}

impl MetricTable {
    pub fn new(specs: Vec<MetricSpec>) -> Self {
        Self { specs }
    }

    pub fn spec(&self, kind: MetricKind) -> RfmResult<&MetricSpec> {
        self.specs
            .iter()
            .find(|s| s.kind == kind)
            .ok_or_else(|| RfmError::MissingMetric(kind.name().to_string()))
    }

    pub fn by_tag(&self, tag: &str) -> RfmResult<&MetricSpec> {
        self.specs
            .iter()
            .find(|s| s.tag == tag)
            .ok_or_else(|| RfmError::UnknownMetricTag(tag.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSpec> {
        self.specs.iter()
    }
}

/// Per-metric score assignment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Upper bound of the ordinal scale `1..=max_score`.
    pub max_score: u32,
    /// Attach the `<tag>_bin` range label to every scored row.
    pub add_score_bins: bool,
    /// Retry with `max_score - 1` on duplicate quantiles instead of failing.
    pub auto_max_score_adjust: bool,
    /// Log the score -> bin range listing.
    pub print_info: bool,
    /// Decimal places for displayed bin bounds and quantiles.
    pub round_info_val: u32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            max_score: 3,
            add_score_bins: false,
            auto_max_score_adjust: false,
            print_info: true,
            round_info_val: 3,
        }
    }
}

/// Caller-named columns of the SQLite transaction source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionColumns {
    pub table:     String,
    pub unit_id:   String,
    pub amount:    String,
    pub timestamp: String,
}

impl Default for TransactionColumns {
    fn default() -> Self {
        Self {
            table:     "transactions".into(),
            unit_id:   "customer_id".into(),
            amount:    "amount".into(),
            timestamp: "ts".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfmConfig {
    pub time_horizon_days: Days,
    pub recency:           ScoreConfig,
    pub frequency:         ScoreConfig,
    pub monetary:          ScoreConfig,
    /// Group segments by bin labels as well as by key.
    pub use_bins:          bool,
    pub metrics:           MetricTable,
    pub columns:           TransactionColumns,
}

impl Default for RfmConfig {
    fn default() -> Self {
        Self {
            time_horizon_days: DEFAULT_TIME_HORIZON_DAYS,
            recency:           ScoreConfig::default(),
            frequency:         ScoreConfig::default(),
            monetary:          ScoreConfig::default(),
            use_bins:          false,
            metrics:           MetricTable::default(),
            columns:           TransactionColumns::default(),
        }
    }
}

impl RfmConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config = Self::from_json(&content)?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> RfmResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Quiet, deterministic settings for tests: no info listing.
    pub fn default_test() -> Self {
        let quiet = ScoreConfig {
            print_info: false,
            ..ScoreConfig::default()
        };
        Self {
            time_horizon_days: 30,
            recency: quiet.clone(),
            frequency: quiet.clone(),
            monetary: quiet,
            ..Self::default()
        }
    }

    pub fn scoring(&self, kind: MetricKind) -> &ScoreConfig {
        match kind {
            MetricKind::Recency   => &self.recency,
            MetricKind::Frequency => &self.frequency,
            MetricKind::Monetary  => &self.monetary,
        }
    }

    pub fn scoring_mut(&mut self, kind: MetricKind) -> &mut ScoreConfig {
        match kind {
            MetricKind::Recency   => &mut self.recency,
            MetricKind::Frequency => &mut self.frequency,
            MetricKind::Monetary  => &mut self.monetary,
        }
    }

    pub fn validate(&self) -> RfmResult<()> {
        if self.time_horizon_days <= 0 {
            return Err(RfmError::InvalidTimeHorizon(self.time_horizon_days));
        }
        for kind in MetricKind::ALL {
            let max_score = self.scoring(kind).max_score;
            if max_score == 0 {
                return Err(RfmError::InvalidMaxScore(max_score));
            }
            self.metrics.spec(kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_maps_tags_to_metrics() {
        let table = MetricTable::default();
        assert_eq!(table.by_tag("r").unwrap().kind, MetricKind::Recency);
        assert_eq!(table.by_tag("f").unwrap().name, "frequency");
        assert_eq!(table.by_tag("m").unwrap().name, "monetary");
        assert_eq!(table.spec(MetricKind::Recency).unwrap().order, ScoreOrder::Descending);
        assert!(matches!(table.by_tag("x"), Err(RfmError::UnknownMetricTag(t)) if t == "x"));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = RfmConfig::from_json(
            r#"{ "time_horizon_days": 90, "frequency": { "max_score": 5, "auto_max_score_adjust": true } }"#,
        )
        .unwrap();
        assert_eq!(config.time_horizon_days, 90);
        assert_eq!(config.frequency.max_score, 5);
        assert!(config.frequency.auto_max_score_adjust);
        assert_eq!(config.frequency.round_info_val, 3);
        assert_eq!(config.recency, ScoreConfig::default());
        assert_eq!(config.columns.timestamp, "ts");
    }

    #[test]
    fn metric_table_loads_from_json_and_rejects_column_renames() {
        let config = RfmConfig::from_json(
            r#"{ "metrics": [
                { "kind": "recency", "tag": "R", "name": "days_idle", "order": "descending" },
                { "kind": "frequency", "tag": "F", "name": "orders", "order": "ascending" },
                { "kind": "monetary", "tag": "M", "name": "spend", "order": "ascending" }
            ] }"#,
        )
        .unwrap();
        assert_eq!(config.metrics.by_tag("R").unwrap().name, "days_idle");

        let renamed = RfmConfig::from_json(
            r#"{ "metrics": [
                { "kind": "recency", "tag": "r", "name": "recency", "order": "descending",
                  "score_column": "recency_score" }
            ] }"#,
        );
        assert!(matches!(renamed, Err(RfmError::Serialization(_))));
    }

    #[test]
    fn validate_rejects_zero_max_score_and_bad_horizon() {
        let mut config = RfmConfig::default_test();
        config.monetary.max_score = 0;
        assert!(matches!(config.validate(), Err(RfmError::InvalidMaxScore(0))));

        let mut config = RfmConfig::default_test();
        config.time_horizon_days = 0;
        assert!(matches!(config.validate(), Err(RfmError::InvalidTimeHorizon(0))));
    }

    #[test]
    fn validate_requires_every_metric_in_table() {
        let mut config = RfmConfig::default_test();
        config.metrics = MetricTable::new(vec![MetricSpec::new(
            MetricKind::Recency,
            "r",
            ScoreOrder::Descending,
        )]);
        assert!(matches!(config.validate(), Err(RfmError::MissingMetric(_))));
    }
}
