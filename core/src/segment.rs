//! Segment aggregation: count customers per concatenated RFM key.

use crate::{score::ScoredCustomer, types::SegmentKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bin ranges behind a segment key. Display context only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentBins {
    pub r_bin: String,
    pub f_bin: String,
    pub m_bin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub segment: SegmentKey,
    /// Number of customers in the segment.
    pub count:   usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins:    Option<SegmentBins>,
}

/// Group scored customers by segment key, sorted by key descending.
///
/// With `use_bins` the bin labels join the grouping key. Rows scored
/// without bin labels group under empty strings.
pub fn aggregate_segments<K>(rows: &[ScoredCustomer<K>], use_bins: bool) -> Vec<SegmentRecord> {
    let mut counts: BTreeMap<(SegmentKey, Option<SegmentBins>), usize> = BTreeMap::new();

    for row in rows {
        let bins = use_bins.then(|| SegmentBins {
            r_bin: row.r_bin.clone().unwrap_or_default(),
            f_bin: row.f_bin.clone().unwrap_or_default(),
            m_bin: row.m_bin.clone().unwrap_or_default(),
        });
        *counts.entry((row.segment_key(), bins)).or_insert(0) += 1;
    }

    log::debug!("segment aggregation: {} customers, {} segments", rows.len(), counts.len());

    counts
        .into_iter()
        .rev()
        .map(|((segment, bins), count)| SegmentRecord {
            segment,
            count,
            bins,
        })
        .collect()
}

/// Total customers across all segments.
pub fn total_customers(segments: &[SegmentRecord]) -> usize {
    segments.iter().map(|s| s.count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metrics::CustomerMetrics, score::Score};

    fn row(id: u32, r: u32, f: u32, m: u32) -> ScoredCustomer<u32> {
        ScoredCustomer {
            metrics: CustomerMetrics {
                unit_id:   id,
                recency:   0,
                frequency: 1,
                monetary:  0.0,
            },
            r:     Score(r),
            f:     Score(f),
            m:     Score(m),
            r_bin: Some(format!("r{r}")),
            f_bin: Some(format!("f{f}")),
            m_bin: Some(format!("m{m}")),
        }
    }

    #[test]
    fn counts_observed_keys_in_descending_order() {
        let rows = vec![row(1, 1, 1, 1), row(2, 3, 2, 1), row(3, 1, 1, 1), row(4, 2, 3, 3)];
        let segments = aggregate_segments(&rows, false);
        let keys: Vec<(&str, usize)> =
            segments.iter().map(|s| (s.segment.as_str(), s.count)).collect();
        assert_eq!(keys, vec![("321", 1), ("233", 1), ("111", 2)]);
        assert!(segments.iter().all(|s| s.bins.is_none()));
        assert_eq!(total_customers(&segments), rows.len());
    }

    #[test]
    fn bins_ride_along_with_key() {
        let rows = vec![row(1, 2, 2, 2), row(2, 2, 2, 2)];
        let segments = aggregate_segments(&rows, true);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].count, 2);
        let bins = segments[0].bins.as_ref().unwrap();
        assert_eq!(bins.r_bin, "r2");
        assert_eq!(bins.m_bin, "m2");
    }

    #[test]
    fn empty_table_has_no_segments() {
        let rows: Vec<ScoredCustomer<u32>> = Vec::new();
        assert!(aggregate_segments(&rows, false).is_empty());
    }
}
