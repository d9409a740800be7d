//! Shared primitive types used across the entire pipeline.

/// Whole days between two instants.
pub type Days = i64;

/// The customer identifier used by the stock transaction record and the store.
pub type CustomerId = String;

/// Concatenated per-metric score labels, recency first.
pub type SegmentKey = String;
