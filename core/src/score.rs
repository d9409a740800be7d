//! Score assignment: a continuous metric column -> ordinal scores `1..=max_score`.
//!
//! Cut points are the column's quantiles at `i / max_score`. Values are
//! binned right-closed against `[min - 1, q_1, ..., q_{k-1}, max + 1]`, so
//! every value lands in exactly one bin. Bin `i` (ascending by value) gets
//! label `i + 1`, or `max_score - i` for metrics scored in descending order.
//!
//! Coinciding cut points make the requested scale impossible. That is an
//! error unless `auto_max_score_adjust` is set, in which case the scale
//! shrinks one step at a time until the cut points separate. At
//! `max_score == 1` there are no cut points, so the loop always ends.

use crate::{
    config::{MetricKind, MetricSpec, MetricTable, RfmConfig, ScoreConfig, ScoreOrder},
    error::{QuantileValue, RfmError, RfmResult},
    metrics::CustomerMetrics,
    quantile::{quantiles, round_to, score_fractions, sorted_finite},
    types::SegmentKey,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An ordinal score. Displays as its label: `"1"`, `"2"`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(pub u32);

impl Score {
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed value range covered by one score, rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinRange {
    pub lower: f64,
    pub upper: f64,
}

impl fmt::Display for BinRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreBins(BTreeMap<Score, BinRange>);

impl ScoreBins {
    pub fn get(&self, score: Score) -> Option<&BinRange> {
        self.0.get(&score)
    }

    pub fn label(&self, score: Score) -> Option<String> {
        self.get(score).map(|b| b.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Score, &BinRange)> {
        self.0.iter()
    }

    /// `{"<score>": "[lo, hi]"}` for human inspection.
    pub fn listing(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(score, range)| (score.label(), range.to_string()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreAssignment {
    pub metric:              MetricKind,
    pub requested_max_score: u32,
    /// Scale actually used; below `requested_max_score` after auto adjustment.
    pub max_score:           u32,
    /// One score per input value, in input order.
    pub scores:              Vec<Score>,
    pub bins:                ScoreBins,
}

impl ScoreAssignment {
    pub fn was_adjusted(&self) -> bool {
        self.max_score < self.requested_max_score
    }

    pub fn distinct_scores(&self) -> BTreeSet<Score> {
        self.scores.iter().copied().collect()
    }

    pub fn bin_label(&self, index: usize) -> Option<String> {
        self.scores.get(index).and_then(|s| self.bins.label(*s))
    }
}

/// Score one column of values according to `spec` and `config`.
pub fn assign_scores(
    values: &[f64],
    spec: &MetricSpec,
    config: &ScoreConfig,
) -> RfmResult<ScoreAssignment> {
    if config.max_score == 0 {
        return Err(RfmError::InvalidMaxScore(config.max_score));
    }
    let sorted = sorted_finite(values, &spec.name)?;
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Ok(ScoreAssignment {
            metric:              spec.kind,
            requested_max_score: config.max_score,
            max_score:           config.max_score,
            scores:              Vec::new(),
            bins:                ScoreBins::default(),
        });
    };

    let mut max_score = config.max_score;
    let cuts = loop {
        if max_score == 1 {
            break Vec::new();
        }
        let fractions = score_fractions(max_score);
        let cuts = quantiles(&sorted, &fractions);
        if !has_duplicates(&cuts) {
            break cuts;
        }
        if !config.auto_max_score_adjust {
            let round = config.round_info_val;
            return Err(duplicate_boundary(spec, max_score, &fractions, &cuts, round));
        }
        log::warn!(
            "auto adjustment {}: max_score={} -> {}",
            spec.name,
            max_score,
            max_score - 1
        );
        max_score -= 1;
    };

    let labels: Vec<Score> = (0..max_score)
        .map(|i| match spec.order {
            ScoreOrder::Ascending  => Score(i + 1),
            ScoreOrder::Descending => Score(max_score - i),
        })
        .collect();

    let mut upper_edges = cuts.clone();
    upper_edges.push(max + 1.0);
    let scores = values
        .iter()
        .map(|&v| {
            let bin = upper_edges.partition_point(|&edge| edge < v);
            labels[bin.min(labels.len() - 1)]
        })
        .collect();

    let mut cutoffs = Vec::with_capacity(cuts.len() + 2);
    cutoffs.push(min);
    cutoffs.extend_from_slice(&cuts);
    cutoffs.push(max);
    let bins = ScoreBins(
        labels
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let range = BinRange {
                    lower: round_to(cutoffs[i], config.round_info_val),
                    upper: round_to(cutoffs[i + 1], config.round_info_val),
                };
                (label, range)
            })
            .collect(),
    );

    if config.print_info {
        let listing = serde_json::json!({ "bins_for_scores": bins.listing() });
        log::info!("{}: {}", spec.name, listing);
    }

    Ok(ScoreAssignment {
        metric: spec.kind,
        requested_max_score: config.max_score,
        max_score,
        scores,
        bins,
    })
}

/// Score `column` of a metrics table under the metric identified by `tag`.
pub fn score_metric<K>(
    rows: &[CustomerMetrics<K>],
    column: MetricKind,
    tag: &str,
    table: &MetricTable,
    config: &ScoreConfig,
) -> RfmResult<ScoreAssignment> {
    let spec = table.by_tag(tag)?;
    let values: Vec<f64> = rows.iter().map(|r| r.value(column)).collect();
    assign_scores(&values, spec, config)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCustomer<K> {
    #[serde(flatten)]
    pub metrics: CustomerMetrics<K>,
    pub r:       Score,
    pub f:       Score,
    pub m:       Score,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_bin:   Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_bin:   Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub m_bin:   Option<String>,
}

impl<K> ScoredCustomer<K> {
    pub fn score(&self, kind: MetricKind) -> Score {
        match kind {
            MetricKind::Recency   => self.r,
            MetricKind::Frequency => self.f,
            MetricKind::Monetary  => self.m,
        }
    }

    pub fn bin(&self, kind: MetricKind) -> Option<&str> {
        match kind {
            MetricKind::Recency   => self.r_bin.as_deref(),
            MetricKind::Frequency => self.f_bin.as_deref(),
            MetricKind::Monetary  => self.m_bin.as_deref(),
        }
    }

    /// Recency, frequency, monetary labels concatenated.
    pub fn segment_key(&self) -> SegmentKey {
        format!("{}{}{}", self.r, self.f, self.m)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTable<K> {
    pub customers: Vec<ScoredCustomer<K>>,
    pub recency:   ScoreAssignment,
    pub frequency: ScoreAssignment,
    pub monetary:  ScoreAssignment,
}

impl<K> ScoredTable<K> {
    pub fn assignment(&self, kind: MetricKind) -> &ScoreAssignment {
        match kind {
            MetricKind::Recency   => &self.recency,
            MetricKind::Frequency => &self.frequency,
            MetricKind::Monetary  => &self.monetary,
        }
    }
}

/// Score recency, frequency and monetary independently, each with its own settings.
pub fn score_customers<K>(
    metrics: Vec<CustomerMetrics<K>>,
    config: &RfmConfig,
) -> RfmResult<ScoredTable<K>> {
    let assign = |kind: MetricKind| -> RfmResult<ScoreAssignment> {
        let spec = config.metrics.spec(kind)?;
        score_metric(&metrics, kind, &spec.tag, &config.metrics, config.scoring(kind))
    };
    let recency = assign(MetricKind::Recency)?;
    let frequency = assign(MetricKind::Frequency)?;
    let monetary = assign(MetricKind::Monetary)?;

    let bin_for = |assignment: &ScoreAssignment, i: usize| -> Option<String> {
        if config.scoring(assignment.metric).add_score_bins {
            assignment.bin_label(i)
        } else {
            None
        }
    };

    let customers = metrics
        .into_iter()
        .enumerate()
        .map(|(i, row)| ScoredCustomer {
            metrics: row,
            r:       recency.scores[i],
            f:       frequency.scores[i],
            m:       monetary.scores[i],
            r_bin:   bin_for(&recency, i),
            f_bin:   bin_for(&frequency, i),
            m_bin:   bin_for(&monetary, i),
        })
        .collect();

    Ok(ScoredTable {
        customers,
        recency,
        frequency,
        monetary,
    })
}

fn has_duplicates(cuts: &[f64]) -> bool {
    cuts.iter()
        .enumerate()
        .any(|(i, a)| cuts[i + 1..].iter().any(|b| a == b))
}

fn duplicate_boundary(
    spec: &MetricSpec,
    max_score: u32,
    fractions: &[f64],
    cuts: &[f64],
    places: u32,
) -> RfmError {
    RfmError::DuplicateQuantileBoundary {
        metric: format!("{}_quantiles", spec.name),
        max_score,
        quantiles: fractions
            .iter()
            .zip(cuts)
            .map(|(&fraction, &value)| QuantileValue {
                fraction: round_to(fraction, places),
                value:    round_to(value, places),
            })
            .collect(),
    }
}
