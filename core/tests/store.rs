use chrono::{DateTime, Duration, TimeZone, Utc};
use rfm_core::{
    config::{RfmConfig, TransactionColumns},
    metrics::AnalysisWindow,
    pipeline::RfmPipeline,
    store::TransactionStore,
    TransactionRecord,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

fn make_store() -> TransactionStore {
    let store = TransactionStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn txn(id: &str, amount: f64, days_ago: i64) -> TransactionRecord {
    TransactionRecord::new(id, amount, now() - Duration::days(days_ago))
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn insert_and_load_roundtrip() {
    let store = make_store();
    let txns = vec![txn("a", 10.0, 3), txn("b", 2.5, 1)];
    assert_eq!(store.insert_transactions(&txns).unwrap(), 2);

    let columns = TransactionColumns::default();
    assert_eq!(store.transaction_count(&columns).unwrap(), 2);

    let loaded = store.load_transactions(&columns).unwrap();
    // Ordered by timestamp ascending.
    assert_eq!(loaded, vec![txns[0].clone(), txns[1].clone()]);
}

#[test]
fn window_is_filtered_in_sql_inclusively() {
    let store = make_store();
    store.insert_transaction(&txn("edge", 1.0, 30)).unwrap();
    store.insert_transaction(&txn("old", 1.0, 31)).unwrap();
    store.insert_transaction(&txn("now", 1.0, 0)).unwrap();
    store
        .insert_transaction(&TransactionRecord::new("future", 1.0, now() + Duration::seconds(1)))
        .unwrap();

    let window = AnalysisWindow::new(now(), 30).unwrap();
    let loaded = store.load_window(&TransactionColumns::default(), &window).unwrap();
    let ids: Vec<&str> = loaded.iter().map(|t| t.unit_id.as_str()).collect();
    assert_eq!(ids, vec!["edge", "now"]);
}

#[test]
fn pipeline_runs_over_store() {
    let store = make_store();
    store
        .insert_transactions(&[
            txn("a", 50.0, 1),
            txn("a", 70.0, 4),
            txn("b", 5.0, 20),
            txn("c", 15.0, 9),
            txn("d", 500.0, 200),
        ])
        .unwrap();

    let mut config = RfmConfig::default_test();
    config.frequency.auto_max_score_adjust = true;
    let report = RfmPipeline::new(config).unwrap().run_store(&store, now()).unwrap();

    let ids: Vec<&str> = report.customers.iter().map(|c| c.metrics.unit_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(report.customers[0].metrics.frequency, 2);
    assert_eq!(report.customers[0].r.0, 3);
}
