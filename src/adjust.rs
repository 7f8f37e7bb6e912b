use std::collections::BTreeSet;

use tracing::info;

use crate::deviation::{DeviationRecord, Winner};
use crate::weights::{Adjustment, WeightTable, apply_adjustments};

const METRIC_ERROR_THRESHOLD: f64 = 0.3;
const SCORE_DIFF_THRESHOLD: u32 = 2;
const PATTERN_LOW: f64 = 50.0;
const PATTERN_HIGH: f64 = 80.0;

/// Fixed multiplicative nudges for every significant deviation category.
/// Each category is judged on its own.
pub fn propose_adjustments(weights: &WeightTable, deviation: &DeviationRecord) -> Vec<Adjustment> {
    let mut out = Vec::new();

    if let Some(result) = deviation.result.as_ref().filter(|r| !r.is_correct) {
        let (predicted, actual) = (result.predicted.winner, result.actual.winner);
        match (predicted, actual) {
            (_, Winner::Draw) => out.push(Adjustment::multiply(
                &["prediction_thresholds", "draw_margin"],
                1.1,
                "missed a draw",
            )),
            (Winner::Draw, Winner::Home | Winner::Away) => out.push(Adjustment::multiply(
                &["prediction_thresholds", "draw_margin"],
                0.9,
                "predicted a draw in a decisive match",
            )),
            (Winner::Home, Winner::Away) | (Winner::Away, Winner::Home) => {
                out.push(Adjustment::multiply(
                    &["energy_conversion", "questioner_palace_weight"],
                    0.95,
                    "picked the wrong winner",
                ))
            }
            _ => {}
        }
    }

    for m in &deviation.metrics {
        if m.normalized_error > METRIC_ERROR_THRESHOLD {
            out.push(Adjustment::multiply(
                &["technical", m.metric.as_str()],
                0.9,
                format!("{} off by {:.0}%", m.metric, m.normalized_error * 100.0),
            ));
        }
    }

    if let Some(score) = deviation
        .score
        .as_ref()
        .filter(|s| s.total_diff >= SCORE_DIFF_THRESHOLD)
    {
        let (predicted, actual) = (score.predicted_total(), score.actual_total());
        if predicted > actual {
            out.push(Adjustment::multiply(
                &["prediction_thresholds", "goal_expectancy"],
                0.95,
                "predicted too many goals",
            ));
        } else if predicted < actual {
            out.push(Adjustment::multiply(
                &["prediction_thresholds", "goal_expectancy"],
                1.05,
                "predicted too few goals",
            ));
        }
    }

    if let Some(accuracy) = deviation.pattern_accuracy {
        let factor = if accuracy < PATTERN_LOW {
            Some(0.9)
        } else if accuracy >= PATTERN_HIGH {
            Some(1.05)
        } else {
            None
        };
        if let Some(factor) = factor {
            let mut seen = BTreeSet::new();
            for eval in &deviation.patterns {
                let Some(name) = eval.canonical.as_deref() else {
                    continue;
                };
                if !weights.pattern_weights.contains_key(name) || !seen.insert(name) {
                    continue;
                }
                out.push(Adjustment::multiply(
                    &["pattern_weights", name],
                    factor,
                    format!("pattern accuracy {accuracy:.0}"),
                ));
            }
        }
    }

    out
}

/// New weight table with the proposed nudges applied; `weights` is left untouched.
pub fn adjust(weights: &WeightTable, deviation: &DeviationRecord) -> WeightTable {
    let adjustments = propose_adjustments(weights, deviation);
    let next = apply_adjustments(weights, &adjustments);
    if !adjustments.is_empty() {
        info!(
            count = adjustments.len(),
            from = %weights.version,
            to = %next.version,
            "calibrated weight table"
        );
    }
    next
}
