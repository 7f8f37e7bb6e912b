use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::chart::{ChartRecord, PalaceKey, PalaceRecord, RepeatScope};
use crate::chart_parser;
use crate::error::ParseError;
use crate::identify::identify;
use crate::metrics::{METRICS, MetricSpec};
use crate::prob::{outcome_probs, percent_triple, score_grid};
use crate::scorer::{self, ScoreResult, palace_energy};
use crate::symbols::{self, Category, HarmKind};
use crate::weights::WeightTable;

const MAX_GOALS: u32 = 10;
const TOP_SCORELINES: usize = 5;
const REPEAT_GOAL_FACTOR: f64 = 0.9;

pub const HOME_WIN: &str = "主勝";
pub const DRAW: &str = "和局";
pub const AWAY_WIN: &str = "客勝";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeProbs {
    pub home: i32,
    pub draw: i32,
    pub away: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorelineProb {
    pub home: u32,
    pub away: u32,
    pub percent: i32,
}

impl ScorelineProb {
    pub fn label(&self) -> String {
        format!("{}-{}", self.home, self.away)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPattern {
    pub name: String,
    pub canonical: Option<String>,
    pub category: Category,
    pub palace: Option<PalaceKey>,
    pub important: bool,
}

/// Pre-match prediction payload handed to rendering and, later, verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub created_at: String,
    pub weights_version: String,
    pub outcome: OutcomeProbs,
    pub result: String,
    pub edge: f64,
    pub expected_goals_home: f64,
    pub expected_goals_away: f64,
    pub most_likely_score: String,
    pub scorelines: Vec<ScorelineProb>,
    pub metrics: BTreeMap<String, f64>,
    pub key_patterns: Vec<KeyPattern>,
    pub score: ScoreResult,
}

/// Full pipeline: parse, identify, score and predict one transcript.
pub fn predict_transcript(
    text: &str,
    weights: &WeightTable,
) -> Result<(ChartRecord, Prediction), ParseError> {
    let chart = identify(&chart_parser::parse(text)?);
    let score = scorer::score(&chart, weights);
    let mut prediction = predict(&chart, &score, weights);
    prediction.id = fingerprint(text);
    Ok((chart, prediction))
}

/// Hex SHA-256 of a transcript, used as the prediction id.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.trim().as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn predict(chart: &ChartRecord, score: &ScoreResult, weights: &WeightTable) -> Prediction {
    let thresholds = &weights.prediction_thresholds;
    let edge = side_strength(chart.questioner_palace(), weights)
        - side_strength(chart.opponent_palace(), weights)
        + thresholds.home_advantage;

    let mut goals = thresholds.goal_expectancy;
    if matches!(chart.repeat, RepeatScope::Global(_)) {
        goals *= REPEAT_GOAL_FACTOR;
    }
    let shift = thresholds.edge_scale * edge / 2.0;
    let lambda_home = (goals / 2.0 + shift).clamp(0.20, 3.80);
    let lambda_away = (goals / 2.0 - shift).clamp(0.20, 3.80);

    let grid = score_grid(lambda_home, lambda_away, MAX_GOALS);
    let (p_home, p_draw, p_away) = outcome_probs(&grid);
    let triple = percent_triple(p_home, p_draw, p_away);
    let outcome = OutcomeProbs {
        home: triple.a,
        draw: triple.b,
        away: triple.c,
    };
    let result = result_label(p_home, p_draw, p_away, thresholds.draw_margin);

    let mut ranked = grid;
    ranked.sort_by(|x, y| y.2.total_cmp(&x.2).then(x.0.cmp(&y.0)).then(x.1.cmp(&y.1)));
    let scorelines: Vec<ScorelineProb> = ranked
        .iter()
        .take(TOP_SCORELINES)
        .map(|(h, a, p)| ScorelineProb {
            home: *h,
            away: *a,
            percent: (p * 100.0).round() as i32,
        })
        .collect();
    let most_likely_score = scorelines
        .first()
        .map(ScorelineProb::label)
        .unwrap_or_else(|| "0-0".to_string());

    let metrics = predict_metrics(chart, weights);
    let key_patterns = key_patterns(chart);

    debug!(
        edge,
        lambda_home,
        lambda_away,
        result,
        most_likely = %most_likely_score,
        "built prediction"
    );

    Prediction {
        id: String::new(),
        created_at: Utc::now().to_rfc3339(),
        weights_version: weights.version.clone(),
        outcome,
        result: result.to_string(),
        edge,
        expected_goals_home: lambda_home,
        expected_goals_away: lambda_away,
        most_likely_score,
        scorelines,
        metrics,
        key_patterns,
        score: score.clone(),
    }
}

fn result_label(p_home: f64, p_draw: f64, p_away: f64, draw_margin: f64) -> &'static str {
    if (p_home - p_away).abs() < draw_margin || p_draw >= p_home.max(p_away) {
        DRAW
    } else if p_home > p_away {
        HOME_WIN
    } else {
        AWAY_WIN
    }
}

/// Palace energy plus the palace's signed pattern weights.
fn side_strength(palace: Option<&PalaceRecord>, weights: &WeightTable) -> f64 {
    let Some(palace) = palace else {
        return 0.0;
    };
    let patterns: f64 = palace
        .pattern_hits
        .iter()
        .filter_map(|h| h.canonical.as_deref())
        .map(|name| weights.pattern_weight(name))
        .sum();
    palace_energy(palace, weights) + patterns.clamp(-1.0, 1.0)
}

/// Technical metrics for the questioning side.
pub fn predict_metrics(chart: &ChartRecord, weights: &WeightTable) -> BTreeMap<String, f64> {
    let palace = chart.questioner_palace().or_else(|| chart.value_star_palace());
    METRICS
        .iter()
        .map(|spec| {
            let signal = palace.map(|p| metric_signal(p, spec)).unwrap_or(0.0);
            let value = spec.base + weights.technical_coef(spec.name) * spec.scale * signal;
            let value = (value.clamp(spec.min, spec.max) * 10.0).round() / 10.0;
            (spec.name.to_string(), value)
        })
        .collect()
}

fn metric_signal(palace: &PalaceRecord, spec: &MetricSpec) -> f64 {
    let field_sum = |field: &str| -> f64 {
        let mut s = 0.0;
        if let Some(e) = palace.door.as_deref().and_then(symbols::door) {
            s += e.impact(field);
        }
        if let Some(e) = palace.star.as_deref().and_then(symbols::star) {
            s += e.impact(field);
        }
        if let Some(e) = palace.deity.as_deref().and_then(symbols::deity) {
            s += e.impact(field);
        }
        s += palace
            .pattern_hits
            .iter()
            .map(|h| h.impact(field))
            .sum::<f64>();
        s += palace
            .harms()
            .filter_map(HarmKind::classify)
            .map(|kind| symbols::harm(kind).impact(field))
            .sum::<f64>();
        s
    };
    let direct = field_sum(spec.name);
    if spec.attack_share > 0.0 {
        direct + spec.attack_share * field_sum("attack")
    } else {
        direct
    }
}

/// Non-neutral patterns bearing on the questioning side, important ones first.
pub fn key_patterns(chart: &ChartRecord) -> Vec<KeyPattern> {
    let value_star = chart.value_star_palace().map(|p| p.key);
    let relevant = |palace: Option<PalaceKey>| -> bool {
        match (palace, chart.questioner) {
            (None, _) | (_, None) => true,
            (Some(p), Some(q)) => p == q || Some(p) == value_star,
        }
    };

    let mut out: Vec<KeyPattern> = Vec::new();
    for hit in chart.all_pattern_hits() {
        if hit.category == Category::Neutral || !relevant(hit.palace) {
            continue;
        }
        if out
            .iter()
            .any(|k| k.name == hit.name && k.palace == hit.palace)
        {
            continue;
        }
        let important = hit
            .canonical
            .as_deref()
            .is_some_and(symbols::is_important_pattern);
        out.push(KeyPattern {
            name: hit.name.clone(),
            canonical: hit.canonical.clone(),
            category: hit.category,
            palace: hit.palace,
            important,
        });
    }
    out.sort_by_key(|k| !k.important);
    out
}
