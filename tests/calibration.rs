use std::collections::BTreeMap;

use qimen_forecast::adjust::{adjust, propose_adjustments};
use qimen_forecast::deviation::{
    ActualOutcome, DeviationRecord, Grade, PredictedOutcome, evaluate, grade,
};
use qimen_forecast::history::{self, DeviationHistory, MAX_HISTORY};
use qimen_forecast::store::{JsonFileStore, KvStore, SqliteStore};
use qimen_forecast::weights::{self, WeightTable, range_for};

fn record(predicted: &str, actual: &str, corners: (f64, f64)) -> DeviationRecord {
    let p = PredictedOutcome {
        result: Some(predicted.to_string()),
        score: Some(predicted.to_string()),
        metrics: BTreeMap::from([("corners".to_string(), corners.0)]),
        ..Default::default()
    };
    let a = ActualOutcome {
        score: Some(actual.to_string()),
        metrics: BTreeMap::from([("corners".to_string(), corners.1)]),
        ..Default::default()
    };
    evaluate(&p, &a).expect("result present")
}

fn assert_in_range(table: &WeightTable) {
    for (path, value) in table.leaves() {
        let segments: Vec<&str> = path.splitn(2, '.').collect();
        let (lo, hi) = range_for(&segments).expect("documented range");
        assert!(value >= lo && value <= hi, "{path}={value}");
    }
}

#[test]
fn weights_stay_in_range_over_many_adjustments() {
    let cases = [
        record("0-3", "2-2", (12.0, 1.0)),
        record("1-1", "4-0", (1.0, 12.0)),
        record("3-0", "0-3", (6.0, 5.0)),
        record("0-0", "5-4", (0.0, 14.0)),
    ];
    let mut table = WeightTable::default();
    for round in 0..200 {
        let next = adjust(&table, &cases[round % cases.len()]);
        assert_in_range(&next);
        table = next;
    }
    assert_eq!(table.prediction_thresholds.goal_expectancy, 4.0);
}

#[test]
fn adjust_never_mutates_its_input() {
    let table = WeightTable::default();
    let snapshot = table.clone();
    let record = record("2-0", "0-2", (10.0, 2.0));
    assert!(!propose_adjustments(&table, &record).is_empty());
    let next = adjust(&table, &record);
    assert_eq!(table, snapshot);
    assert_ne!(next, table);
    assert_eq!(next.version, "1.0.1");
}

#[test]
fn grade_of_seventy_two_is_good() {
    assert_eq!(grade(72.0), Grade::Good);
    assert_ne!(grade(72.0), Grade::Excellent);
    assert_ne!(grade(72.0), Grade::Pass);
}

#[test]
fn history_keeps_the_latest_fifty() {
    let mut history = DeviationHistory::new();
    for _ in 0..(MAX_HISTORY * 2) {
        history.push(record("1-0", "1-0", (5.0, 5.0)));
        assert!(history.len() <= MAX_HISTORY);
    }
    let stats = history.stats();
    assert_eq!(stats.count, MAX_HISTORY);
    assert_eq!(stats.outcomes.map(|t| t.a), Some(100));
    assert_eq!(stats.metric_errors.get("corners").copied(), Some(0.0));
}

#[test]
fn json_store_persists_weights_and_history() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("store.json");

    let mut table = WeightTable::default();
    table.prediction_thresholds.draw_margin = 0.12;
    let mut past = DeviationHistory::new();
    past.push(record("客勝", "1-1", (5.0, 5.0)));
    {
        let mut store = JsonFileStore::open(&path).expect("open store");
        weights::save(&mut store, &table).expect("save weights");
        history::save(&mut store, &past).expect("save history");
    }

    let reopened = JsonFileStore::open(&path).expect("reopen store");
    assert_eq!(weights::load(&reopened), table);
    assert_eq!(history::load(&reopened), past);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn sqlite_store_persists_across_connections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("store.sqlite3");
    {
        let mut store = SqliteStore::open(&path).expect("open sqlite");
        store.set("prediction:abc", "{}").expect("set");
        store.set("prediction:abc", "{\"v\":2}").expect("overwrite");
    }
    let store = SqliteStore::open(&path).expect("reopen sqlite");
    assert_eq!(
        store.get("prediction:abc").expect("get").as_deref(),
        Some("{\"v\":2}")
    );
}

#[test]
fn corrupt_weight_table_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = JsonFileStore::open(dir.path().join("store.json")).expect("open store");
    store.set(weights::WEIGHTS_KEY, "[1, 2, 3]").expect("set");
    assert_eq!(weights::load(&store), WeightTable::default());
}

#[test]
fn batch_pairs_fixture_evaluates_line_by_line() {
    #[derive(serde::Deserialize)]
    struct Pair {
        predicted: PredictedOutcome,
        actual: ActualOutcome,
    }

    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/pairs.jsonl");
    let raw = std::fs::read_to_string(path).expect("fixture file should be readable");
    let results: Vec<_> = raw
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            let pair: Pair = serde_json::from_str(l).expect("pair json");
            evaluate(&pair.predicted, &pair.actual)
        })
        .collect();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().map(|r| r.overall).ok(), Some(40.0));
    assert!(results[1].as_ref().is_ok_and(|r| r.grade == Grade::Excellent));
    assert!(results[2].is_err());
}
