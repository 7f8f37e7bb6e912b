use std::fs;
use std::path::PathBuf;

use qimen_forecast::deviation::{ActualOutcome, Grade, PredictedOutcome, Winner, evaluate};
use qimen_forecast::predict::{self, HOME_WIN};
use qimen_forecast::scorer::{self, Reliability};
use qimen_forecast::weights::WeightTable;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn sample_chart_favours_the_questioner() {
    let raw = read_fixture("sample_chart.txt");
    let weights = WeightTable::default();
    let (chart, prediction) =
        predict::predict_transcript(&raw, &weights).expect("fixture should predict");

    assert_eq!(prediction.id, predict::fingerprint(&raw));
    assert_eq!(prediction.result, HOME_WIN);
    let o = prediction.outcome;
    assert_eq!(o.home + o.draw + o.away, 100);
    assert!(o.home > o.away);
    assert!(prediction.edge > 0.0);
    assert!(prediction.expected_goals_home > prediction.expected_goals_away);

    assert_eq!(prediction.scorelines.len(), 5);
    assert_eq!(
        prediction.most_likely_score,
        prediction.scorelines[0].label()
    );
    assert!(
        prediction
            .scorelines
            .windows(2)
            .all(|w| w[0].percent >= w[1].percent)
    );

    assert_eq!(prediction.metrics.len(), 8);
    assert!(prediction.metrics["possession"] > 50.0);

    // 青龍返首 sits in the questioner palace and is an important pattern.
    let first = prediction.key_patterns.first().expect("key patterns");
    assert_eq!(first.name, "青龍返首");
    assert!(first.important);
    // The opponent's 太白入熒 is not about the questioner's side.
    assert!(prediction.key_patterns.iter().all(|k| k.name != "太白入熒"));

    assert_eq!(prediction.score, scorer::score(&chart, &weights));
}

#[test]
fn chart_scores_stay_in_range() {
    let raw = read_fixture("sample_chart.txt");
    let weights = WeightTable::default();
    let (_, prediction) = predict::predict_transcript(&raw, &weights).unwrap();
    let s = &prediction.score;
    for v in [s.time, s.effectiveness, s.energy] {
        assert!((0.0..=100.0).contains(&v));
    }
    assert_eq!(s.interpretation, Reliability::from_total(s.total));
}

#[test]
fn verifying_the_sample_prediction() {
    let raw = read_fixture("sample_chart.txt");
    let (_, prediction) =
        predict::predict_transcript(&raw, &WeightTable::default()).expect("fixture should predict");
    let actual: ActualOutcome =
        serde_json::from_str(&read_fixture("actual_result.json")).expect("fixture json");

    let record = evaluate(&PredictedOutcome::from(&prediction), &actual).expect("evaluates");
    let result = record.result.as_ref().expect("result compared");
    assert_eq!(result.actual.winner, Winner::Home);
    assert_eq!(result.actual.goal_difference, Some(2));
    assert!(result.is_correct);

    assert_eq!(record.metrics.len(), 5);
    assert!(record.score.is_some());
    assert_eq!(record.pattern_accuracy, Some(80.0));
    assert!(record.overall > 0.0 && record.overall <= 100.0);
    assert_ne!(record.grade, Grade::Poor);
    assert_eq!(record.prediction_id.as_deref(), Some(prediction.id.as_str()));
}

#[test]
fn scoring_runs_on_the_identified_chart() {
    let raw = read_fixture("sample_chart.txt");
    let weights = WeightTable::default();
    let parsed = qimen_forecast::chart_parser::parse(&raw).expect("fixture should parse");
    assert_eq!(parsed.all_pattern_hits().count(), 0);

    let identified = qimen_forecast::identify::identify(&parsed);
    assert!(identified.all_pattern_hits().count() > 0);

    let (_, prediction) = predict::predict_transcript(&raw, &weights).expect("fixture should predict");
    assert_eq!(prediction.score, scorer::score(&identified, &weights));
}
