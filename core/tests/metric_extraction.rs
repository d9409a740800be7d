use chrono::{DateTime, Duration, TimeZone, Utc};
use rfm_core::metrics::{extract_metrics, AnalysisWindow, Transaction, TransactionRecord};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap()
}

fn txn(id: &str, amount: f64, days_ago: i64) -> TransactionRecord {
    TransactionRecord::new(id, amount, now() - Duration::days(days_ago))
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// One customer, one purchase of 100 at `now`, 30-day horizon.
#[test]
fn single_transaction_at_now() {
    let window = AnalysisWindow::new(now(), 30).unwrap();
    let rows = extract_metrics(&[TransactionRecord::new("solo", 100.0, now())], &window);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].unit_id, "solo");
    assert_eq!(rows[0].recency, 0);
    assert_eq!(rows[0].frequency, 1);
    assert_eq!(rows[0].monetary, 100.0);
}

/// Transactions outside [now - horizon, now] never contribute.
#[test]
fn out_of_window_transactions_are_ignored() {
    let window = AnalysisWindow::new(now(), 30).unwrap();
    let txns = vec![
        txn("a", 10.0, 5),
        txn("a", 1_000.0, 31),                                              // too old
        TransactionRecord::new("a", 500.0, now() + Duration::hours(1)),     // future
        txn("b", 7.0, 30),                                                  // exactly on the edge
        txn("c", 99.0, 400),                                                // only old purchases
    ];

    let rows = extract_metrics(&txns, &window);
    let ids: Vec<&str> = rows.iter().map(|r| r.unit_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"], "customer c has nothing in window and must be absent");

    let a = &rows[0];
    assert_eq!(a.frequency, 1);
    assert_eq!(a.monetary, 10.0);
    assert_eq!(a.recency, 5);

    let b = &rows[1];
    assert_eq!(b.recency, 30);
}

/// frequency == count and monetary == sum of in-window rows; recency == min days.
#[test]
fn aggregates_per_customer() {
    let window = AnalysisWindow::new(now(), 90).unwrap();
    let txns = vec![
        txn("x", 12.5, 40),
        txn("y", 3.0, 2),
        txn("x", 7.5, 10),
        txn("x", 30.0, 75),
        txn("y", 4.0, 60),
    ];

    let rows = extract_metrics(&txns, &window);
    assert_eq!(rows.len(), 2);

    for row in &rows {
        let in_window: Vec<&TransactionRecord> =
            txns.iter().filter(|t| t.unit_id == row.unit_id).collect();
        assert_eq!(row.frequency, in_window.len() as u64);
        let sum: f64 = in_window.iter().map(|t| t.amount()).sum();
        assert!((row.monetary - sum).abs() < 1e-9);
    }
    assert_eq!(rows[0].recency, 10);
    assert_eq!(rows[1].recency, 2);
}

/// Callers can bring their own row type and id type.
#[test]
fn custom_transaction_type() {
    struct Order {
        account: u64,
        total_cents: i64,
        placed_at: DateTime<Utc>,
    }

    impl Transaction for Order {
        type UnitId = u64;

        fn unit_id(&self) -> &u64 {
            &self.account
        }

        fn amount(&self) -> f64 {
            self.total_cents as f64 / 100.0
        }

        fn timestamp(&self) -> DateTime<Utc> {
            self.placed_at
        }
    }

    let window = AnalysisWindow::new(now(), 10).unwrap();
    let orders = vec![
        Order { account: 20, total_cents: 250, placed_at: now() - Duration::days(1) },
        Order { account: 3, total_cents: 100, placed_at: now() - Duration::days(9) },
        Order { account: 20, total_cents: 150, placed_at: now() - Duration::days(3) },
    ];

    let rows = extract_metrics(&orders, &window);
    assert_eq!(rows.iter().map(|r| r.unit_id).collect::<Vec<_>>(), vec![3, 20]);
    assert_eq!(rows[1].frequency, 2);
    assert!((rows[1].monetary - 4.0).abs() < 1e-9);
}
