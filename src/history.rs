use std::collections::{BTreeMap, VecDeque};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::deviation::{DeviationRecord, Grade, Winner};
use crate::predict::Prediction;
use crate::prob::{PercentTriple, percent_triple};
use crate::store::KvStore;

pub const HISTORY_KEY: &str = "qimen.history";
pub const PREDICTION_PREFIX: &str = "prediction:";
pub const MAX_HISTORY: usize = 50;

/// Most recent deviation records, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviationHistory {
    entries: VecDeque<DeviationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub count: usize,
    pub mean_overall: Option<f64>,
    pub grades: BTreeMap<Grade, usize>,
    /// Correct / partial / wrong result share, for records with a result component.
    pub outcomes: Option<PercentTriple>,
    pub metric_errors: BTreeMap<String, f64>,
}

impl DeviationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: DeviationRecord) {
        self.entries.push_back(record);
        while self.entries.len() > MAX_HISTORY {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviationRecord> {
        self.entries.iter()
    }

    pub fn stats(&self) -> HistoryStats {
        let count = self.entries.len();
        let mean_overall =
            (count > 0).then(|| self.entries.iter().map(|r| r.overall).sum::<f64>() / count as f64);

        let mut grades = BTreeMap::new();
        for record in &self.entries {
            *grades.entry(record.grade).or_insert(0) += 1;
        }

        let (mut correct, mut partial, mut wrong) = (0u32, 0u32, 0u32);
        for result in self.entries.iter().filter_map(|r| r.result.as_ref()) {
            if result.is_correct {
                correct += 1;
            } else if result.predicted.winner == Winner::Draw || result.actual.winner == Winner::Draw
            {
                partial += 1;
            } else {
                wrong += 1;
            }
        }
        let outcomes = (correct + partial + wrong > 0)
            .then(|| percent_triple(correct as f64, partial as f64, wrong as f64));

        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for m in self.entries.iter().flat_map(|r| r.metrics.iter()) {
            let slot = sums.entry(m.metric.clone()).or_insert((0.0, 0));
            slot.0 += m.normalized_error;
            slot.1 += 1;
        }
        let metric_errors = sums
            .into_iter()
            .map(|(k, (sum, n))| (k, sum / n as f64))
            .collect();

        HistoryStats {
            count,
            mean_overall,
            grades,
            outcomes,
            metric_errors,
        }
    }
}

pub fn load(store: &dyn KvStore) -> DeviationHistory {
    let raw = match store.get(HISTORY_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return DeviationHistory::new(),
        Err(err) => {
            warn!(error = %err, "history unavailable, starting empty");
            return DeviationHistory::new();
        }
    };
    match serde_json::from_str::<DeviationHistory>(&raw) {
        Ok(mut history) => {
            while history.entries.len() > MAX_HISTORY {
                history.entries.pop_front();
            }
            history
        }
        Err(err) => {
            warn!(error = %err, "persisted history is invalid, starting empty");
            DeviationHistory::new()
        }
    }
}

pub fn save(store: &mut dyn KvStore, history: &DeviationHistory) -> Result<()> {
    let json = serde_json::to_string(history).context("serialize history")?;
    store.set(HISTORY_KEY, &json).context("persist history")
}

pub fn save_prediction(store: &mut dyn KvStore, prediction: &Prediction) -> Result<()> {
    let json = serde_json::to_string(prediction).context("serialize prediction")?;
    store
        .set(&format!("{PREDICTION_PREFIX}{}", prediction.id), &json)
        .with_context(|| format!("persist prediction {}", prediction.id))
}

pub fn load_prediction(store: &dyn KvStore, id: &str) -> Result<Option<Prediction>> {
    let Some(raw) = store.get(&format!("{PREDICTION_PREFIX}{id}"))? else {
        return Ok(None);
    };
    let prediction =
        serde_json::from_str(&raw).with_context(|| format!("invalid stored prediction {id}"))?;
    Ok(Some(prediction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deviation::{ActualOutcome, PredictedOutcome, evaluate};
    use crate::store::MemoryStore;

    fn record(predicted: &str, actual: &str) -> DeviationRecord {
        let p = PredictedOutcome {
            result: Some(predicted.into()),
            ..Default::default()
        };
        let a = ActualOutcome {
            result: Some(actual.into()),
            ..Default::default()
        };
        evaluate(&p, &a).unwrap()
    }

    #[test]
    fn history_is_capped_and_evicts_oldest() {
        let mut history = DeviationHistory::new();
        for i in 0..(MAX_HISTORY + 7) {
            let mut r = record("主勝", "主勝");
            r.prediction_id = Some(i.to_string());
            history.push(r);
        }
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(
            history.iter().next().unwrap().prediction_id.as_deref(),
            Some("7")
        );
    }

    #[test]
    fn outcome_triple_sums_to_100() {
        let mut history = DeviationHistory::new();
        history.push(record("主勝", "主勝"));
        history.push(record("主勝", "和局"));
        history.push(record("主勝", "客勝"));
        let stats = history.stats();
        let outcomes = stats.outcomes.unwrap();
        assert_eq!(outcomes.sum(), 100);
        assert_eq!((outcomes.a, outcomes.b, outcomes.c), (34, 33, 33));
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn round_trips_through_store() {
        let mut store = MemoryStore::new();
        let mut history = DeviationHistory::new();
        history.push(record("和局", "1-1"));
        save(&mut store, &history).unwrap();
        assert_eq!(load(&store), history);
    }

    #[test]
    fn garbage_history_loads_empty() {
        let mut store = MemoryStore::new();
        store.set(HISTORY_KEY, "{not json").unwrap();
        assert!(load(&store).is_empty());
    }
}
