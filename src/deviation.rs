use std::collections::BTreeMap;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;
use crate::metrics::metric_spec;
use crate::predict::{KeyPattern, Prediction, ScorelineProb};
use crate::symbols::Category;

const RESULT_SHARE: f64 = 0.40;
const TECHNICAL_SHARE: f64 = 0.30;
const SCORE_SHARE: f64 = 0.20;
const PATTERN_SHARE: f64 = 0.10;

const WRONG_WINNER_PENALTY: f64 = 60.0;
const GOAL_DIFF_PENALTY: f64 = 15.0;
const SCORE_DIFF_PENALTY: f64 = 25.0;
const LISTED_SCORE_BONUS: f64 = 0.5;
const PATTERN_HIT: f64 = 80.0;
const PATTERN_MISS: f64 = 20.0;

static SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*[-:：比]\s*(\d+)").expect("score regex"));

const DRAW_WORDS: &[&str] = &["和局", "平局", "打和", "平手"];
const HOME_WORDS: &[&str] = &["主勝", "主隊勝", "主隊贏", "主贏"];
const AWAY_WORDS: &[&str] = &["客勝", "客隊勝", "客隊贏", "客贏"];

// English keywords only match whole words.
static DRAW_EN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:draw|drawn|tie|tied)\b").expect("draw regex"));
static HOME_EN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bhome\s+(?:win|won|victory)\b").expect("home regex"));
static AWAY_EN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\baway\s+(?:win|won|victory)\b").expect("away regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Home,
    Away,
    Draw,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedResult {
    pub winner: Winner,
    pub goal_difference: Option<u32>,
}

/// Reads a free-text result or a score string. Unrecognized text is `Unknown`.
pub fn normalize_result(text: &str) -> NormalizedResult {
    let lowered = text.trim().to_lowercase();
    let score = parse_score(&lowered);

    let mentions = |words: &[&str], english: &Regex| {
        words.iter().any(|w| lowered.contains(w)) || english.is_match(&lowered)
    };
    let keyword = if mentions(DRAW_WORDS, &*DRAW_EN) {
        Some(Winner::Draw)
    } else if mentions(HOME_WORDS, &*HOME_EN) {
        Some(Winner::Home)
    } else if mentions(AWAY_WORDS, &*AWAY_EN) {
        Some(Winner::Away)
    } else {
        None
    };

    let winner = keyword.unwrap_or(match score {
        Some((h, a)) if h > a => Winner::Home,
        Some((h, a)) if h < a => Winner::Away,
        Some(_) => Winner::Draw,
        None => Winner::Unknown,
    });

    NormalizedResult {
        winner,
        goal_difference: score.map(|(h, a)| h.abs_diff(a)),
    }
}

/// First `home-away` pair in the text, e.g. `2-1`, `2:1`, `2 比 1`.
pub fn parse_score(text: &str) -> Option<(u32, u32)> {
    let caps = SCORE_RE.captures(text)?;
    let home = caps.get(1)?.as_str().parse().ok()?;
    let away = caps.get(2)?.as_str().parse().ok()?;
    Some((home, away))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictedOutcome {
    #[serde(default)]
    pub prediction_id: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub scorelines: Vec<ScorelineProb>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub patterns: Vec<KeyPattern>,
}

impl From<&Prediction> for PredictedOutcome {
    fn from(p: &Prediction) -> Self {
        Self {
            prediction_id: Some(p.id.clone()),
            result: Some(p.result.clone()),
            score: Some(p.most_likely_score.clone()),
            scorelines: p.scorelines.clone(),
            metrics: p.metrics.clone(),
            patterns: p.key_patterns.clone(),
        }
    }
}

/// Post-match observation, usually loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActualOutcome {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDeviation {
    pub predicted: NormalizedResult,
    pub actual: NormalizedResult,
    pub is_correct: bool,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDeviation {
    pub metric: String,
    pub predicted: f64,
    pub actual: f64,
    pub normalized_error: f64,
    pub weight: f64,
    pub score: f64,
    pub weighted_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDeviation {
    pub predicted: (u32, u32),
    pub actual: (u32, u32),
    pub total_diff: u32,
    /// Percentage the prediction gave the actual scoreline, when it was listed.
    pub listed_probability: Option<f64>,
    pub score: f64,
}

impl ScoreDeviation {
    pub fn predicted_total(&self) -> u32 {
        self.predicted.0 + self.predicted.1
    }

    pub fn actual_total(&self) -> u32 {
        self.actual.0 + self.actual.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEvaluation {
    pub name: String,
    pub canonical: Option<String>,
    pub category: Category,
    pub matched: bool,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    Pass,
    NeedsImprovement,
    Poor,
}

impl Grade {
    pub const ALL: [Grade; 5] = [
        Grade::Excellent,
        Grade::Good,
        Grade::Pass,
        Grade::NeedsImprovement,
        Grade::Poor,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Grade::Excellent => "excellent",
            Grade::Good => "good",
            Grade::Pass => "pass",
            Grade::NeedsImprovement => "needs improvement",
            Grade::Poor => "poor",
        }
    }
}

pub fn grade(score: f64) -> Grade {
    if score >= 85.0 {
        Grade::Excellent
    } else if score >= 70.0 {
        Grade::Good
    } else if score >= 60.0 {
        Grade::Pass
    } else if score >= 50.0 {
        Grade::NeedsImprovement
    } else {
        Grade::Poor
    }
}

/// Accuracy of one verified prediction. Higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationRecord {
    #[serde(default)]
    pub prediction_id: Option<String>,
    pub result: Option<ResultDeviation>,
    pub metrics: Vec<MetricDeviation>,
    pub technical_score: Option<f64>,
    pub score: Option<ScoreDeviation>,
    pub patterns: Vec<PatternEvaluation>,
    pub pattern_accuracy: Option<f64>,
    pub overall: f64,
    pub grade: Grade,
    pub created_at: String,
}

pub fn evaluate(
    predicted: &PredictedOutcome,
    actual: &ActualOutcome,
) -> Result<DeviationRecord, ValidationError> {
    let predicted_text = result_text(&predicted.result, &predicted.score);
    let actual_text = result_text(&actual.result, &actual.score);
    if predicted_text.is_none() && actual_text.is_none() {
        return Err(ValidationError::MissingResult);
    }

    let actual_norm = actual_text.map(normalize_result);
    let result = match (predicted_text, actual_norm) {
        (Some(p), Some(a)) => Some(result_deviation(normalize_result(p), a)),
        _ => None,
    };

    let metrics = metric_deviations(&predicted.metrics, &actual.metrics);
    let technical_score = technical_score(&metrics);
    let score = score_deviation(predicted, actual);

    let actual_score = actual.score.as_deref().and_then(parse_score);
    let patterns = match actual_norm {
        Some(a) => evaluate_patterns(&predicted.patterns, a.winner, actual_score),
        None => Vec::new(),
    };
    let pattern_accuracy = mean(patterns.iter().map(|p| p.accuracy));

    let overall = overall_score(
        result.as_ref().map(|r| r.score),
        technical_score,
        score.as_ref().map(|s| s.score),
        pattern_accuracy,
    );

    debug!(
        overall,
        metrics = metrics.len(),
        patterns = patterns.len(),
        "evaluated deviation"
    );

    Ok(DeviationRecord {
        prediction_id: predicted.prediction_id.clone(),
        result,
        metrics,
        technical_score,
        score,
        patterns,
        pattern_accuracy,
        overall,
        grade: grade(overall),
        created_at: Utc::now().to_rfc3339(),
    })
}

fn result_text<'a>(result: &'a Option<String>, score: &'a Option<String>) -> Option<&'a str> {
    let non_blank = |s: &'a Option<String>| s.as_deref().filter(|t| !t.trim().is_empty());
    non_blank(result).or_else(|| non_blank(score))
}

fn result_deviation(predicted: NormalizedResult, actual: NormalizedResult) -> ResultDeviation {
    let is_correct = predicted.winner == actual.winner && predicted.winner != Winner::Unknown;
    let mut score = 100.0;
    if !is_correct {
        score -= WRONG_WINNER_PENALTY;
    }
    if let (Some(p), Some(a)) = (predicted.goal_difference, actual.goal_difference) {
        score -= GOAL_DIFF_PENALTY * p.abs_diff(a) as f64;
    }
    ResultDeviation {
        predicted,
        actual,
        is_correct,
        score: f64::max(score, 0.0),
    }
}

/// Per-metric scores for metrics present on both sides; unknown metrics are skipped.
pub fn metric_deviations(
    predicted: &BTreeMap<String, f64>,
    actual: &BTreeMap<String, f64>,
) -> Vec<MetricDeviation> {
    predicted
        .iter()
        .filter_map(|(name, &p)| {
            let a = *actual.get(name)?;
            let spec = metric_spec(name)?;
            if !p.is_finite() || !a.is_finite() {
                return None;
            }
            let normalized_error = ((p - a).abs() / spec.max_error).min(1.0);
            let score = (1.0 - normalized_error) * 100.0;
            Some(MetricDeviation {
                metric: name.clone(),
                predicted: p,
                actual: a,
                normalized_error,
                weight: spec.weight,
                score,
                weighted_score: score * spec.weight,
            })
        })
        .collect()
}

fn technical_score(metrics: &[MetricDeviation]) -> Option<f64> {
    let weight: f64 = metrics.iter().map(|m| m.weight).sum();
    if weight <= 0.0 {
        return None;
    }
    Some(metrics.iter().map(|m| m.weighted_score).sum::<f64>() / weight)
}

fn score_deviation(predicted: &PredictedOutcome, actual: &ActualOutcome) -> Option<ScoreDeviation> {
    let p = predicted.score.as_deref().and_then(parse_score)?;
    let a = actual.score.as_deref().and_then(parse_score)?;
    let total_diff = p.0.abs_diff(a.0) + p.1.abs_diff(a.1);
    let listed_probability = predicted
        .scorelines
        .iter()
        .find(|s| (s.home, s.away) == a)
        .map(|s| s.percent as f64);
    let score = 100.0 - SCORE_DIFF_PENALTY * total_diff as f64
        + LISTED_SCORE_BONUS * listed_probability.unwrap_or(0.0);
    Some(ScoreDeviation {
        predicted: p,
        actual: a,
        total_diff,
        listed_probability,
        score: score.clamp(0.0, 100.0),
    })
}

/// Auspicious patterns expect a home win or draw; inauspicious ones expect the
/// home side to lose. Neutral patterns and unknown outcomes are not scored.
fn evaluate_patterns(
    patterns: &[KeyPattern],
    winner: Winner,
    actual_score: Option<(u32, u32)>,
) -> Vec<PatternEvaluation> {
    let conceded_more = actual_score.is_some_and(|(h, a)| a > h);
    if winner == Winner::Unknown && actual_score.is_none() {
        return Vec::new();
    }
    patterns
        .iter()
        .filter_map(|p| {
            let matched = match p.category {
                Category::Auspicious => matches!(winner, Winner::Home | Winner::Draw),
                Category::Inauspicious => winner == Winner::Away || conceded_more,
                Category::Neutral => return None,
            };
            Some(PatternEvaluation {
                name: p.name.clone(),
                canonical: p.canonical.clone(),
                category: p.category,
                matched,
                accuracy: if matched { PATTERN_HIT } else { PATTERN_MISS },
            })
        })
        .collect()
}

/// Weighted combination over the components that are present.
pub fn overall_score(
    result: Option<f64>,
    technical: Option<f64>,
    score: Option<f64>,
    patterns: Option<f64>,
) -> f64 {
    let parts = [
        (result, RESULT_SHARE),
        (technical, TECHNICAL_SHARE),
        (score, SCORE_SHARE),
        (patterns, PATTERN_SHARE),
    ];
    let (sum, weight) = parts
        .iter()
        .filter_map(|(v, w)| v.map(|v| (v * w, *w)))
        .fold((0.0, 0.0), |(s, t), (v, w)| (s + v, t + w));
    if weight <= 0.0 {
        return 0.0;
    }
    (sum / weight * 10.0).round() / 10.0
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
