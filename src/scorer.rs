use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chart::{ChartRecord, PalaceRecord};
use crate::symbols;
use crate::weights::WeightTable;

const BASE_SCORE: f64 = 50.0;
const TIME_WEIGHT: f64 = 0.4;
const EFFECTIVENESS_WEIGHT: f64 = 0.3;
const ENERGY_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
    High,
    Moderate,
    LowModerate,
    Low,
}

impl Reliability {
    /// Descending thresholds; the first one met wins.
    pub fn from_total(total: i32) -> Self {
        if total >= 80 {
            Reliability::High
        } else if total >= 60 {
            Reliability::Moderate
        } else if total >= 40 {
            Reliability::LowModerate
        } else {
            Reliability::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Reliability::High => "high reliability",
            Reliability::Moderate => "moderate",
            Reliability::LowModerate => "low-moderate, caution",
            Reliability::Low => "low reliability",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub time: f64,
    pub effectiveness: f64,
    pub energy: f64,
    pub total: i32,
    pub interpretation: Reliability,
}

impl ScoreResult {
    pub fn from_parts(time: f64, effectiveness: f64, energy: f64) -> Self {
        let total = combine(time, effectiveness, energy);
        Self {
            time,
            effectiveness,
            energy,
            total,
            interpretation: Reliability::from_total(total),
        }
    }
}

pub fn combine(time: f64, effectiveness: f64, energy: f64) -> i32 {
    (TIME_WEIGHT * time + EFFECTIVENESS_WEIGHT * effectiveness + ENERGY_WEIGHT * energy).round()
        as i32
}

/// Scores an identified chart along the time, effectiveness and energy axes.
///
/// Pattern terms read `pattern_hits`, which only `identify` fills in. A chart
/// straight from `parse` scores as if it carried no patterns at all;
/// `predict::predict_transcript` runs both steps in order.
pub fn score(chart: &ChartRecord, weights: &WeightTable) -> ScoreResult {
    let time = time_score(chart, weights);
    let effectiveness = effectiveness_score(chart, weights);
    let energy = energy_score(chart, weights);
    let result = ScoreResult::from_parts(time, effectiveness, energy);
    debug!(
        time,
        effectiveness,
        energy,
        total = result.total,
        "scored chart"
    );
    result
}

pub fn time_score(chart: &ChartRecord, weights: &WeightTable) -> f64 {
    let mut s = BASE_SCORE;
    if chart.value_star_palace().is_some() {
        s += weights.time_based.value_star_bonus;
    }
    let timed = chart.all_pattern_hits().filter(|h| h.time_sensitive).count();
    s += weights.time_based.time_pattern_bonus * timed as f64;
    s.clamp(0.0, 100.0)
}

pub fn effectiveness_score(chart: &ChartRecord, weights: &WeightTable) -> f64 {
    let harm_sum: f64 = chart
        .all_harms()
        .map(|(_, label)| weights.harm_effect(label))
        .sum();
    let harm_term = harm_sum.clamp(-1.0, 0.0) * weights.effectiveness.harm_scale;

    let deltas: Vec<f64> = chart
        .all_pattern_hits()
        .map(|h| h.impact("efficiency"))
        .collect();
    let pattern_term = if deltas.is_empty() {
        0.0
    } else {
        deltas.iter().sum::<f64>() / deltas.len() as f64 * weights.effectiveness.pattern_scale
    };

    (BASE_SCORE + harm_term + pattern_term).clamp(0.0, 100.0)
}

pub fn energy_score(chart: &ChartRecord, weights: &WeightTable) -> f64 {
    let energy = &weights.energy_conversion;
    let opportunities = chart
        .all_pattern_hits()
        .filter(|h| h.energy_opportunity)
        .count();
    let value_star = chart
        .value_star_palace()
        .map(|p| palace_energy(p, weights))
        .unwrap_or(0.0);
    let questioner = chart
        .questioner_palace()
        .map(|p| palace_energy(p, weights))
        .unwrap_or(0.0);

    (BASE_SCORE
        + energy.opportunity_bonus * opportunities as f64
        + energy.value_star_palace_weight * value_star
        + energy.questioner_palace_weight * questioner)
        .clamp(0.0, 100.0)
}

/// Signed door/star/deity disposition plus harm weights, in [-1, 1].
pub fn palace_energy(palace: &PalaceRecord, weights: &WeightTable) -> f64 {
    let energy = &weights.energy_conversion;
    let mut e = 0.0;
    if let Some(entry) = palace.door.as_deref().and_then(symbols::door) {
        e += entry.category.sign() * energy.door_delta;
    }
    if let Some(entry) = palace.star.as_deref().and_then(symbols::star) {
        e += entry.category.sign() * energy.star_delta;
    }
    if let Some(entry) = palace.deity.as_deref().and_then(symbols::deity) {
        e += entry.category.sign() * energy.deity_delta;
    }
    e += palace.harms().map(|h| weights.harm_effect(h)).sum::<f64>();
    e.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::PalaceKey;

    #[test]
    fn combination_rounds_weighted_sum() {
        let r = ScoreResult::from_parts(80.0, 60.0, 50.0);
        assert_eq!(r.total, 65);
        assert_eq!(r.interpretation, Reliability::Moderate);
    }

    #[test]
    fn tiers_are_first_match_descending() {
        assert_eq!(Reliability::from_total(80), Reliability::High);
        assert_eq!(Reliability::from_total(79), Reliability::Moderate);
        assert_eq!(Reliability::from_total(40), Reliability::LowModerate);
        assert_eq!(Reliability::from_total(39), Reliability::Low);
    }

    #[test]
    fn palace_energy_is_clamped() {
        let weights = WeightTable::default();
        let mut p = PalaceRecord::empty(PalaceKey::Kan);
        p.door = Some("死門".into());
        p.star = Some("天芮".into());
        p.deity = Some("白虎".into());
        for _ in 0..5 {
            p.four_harms.push("乙入墓".into());
        }
        assert_eq!(palace_energy(&p, &weights), -1.0);

        let mut good = PalaceRecord::empty(PalaceKey::Qian);
        good.door = Some("開門".into());
        good.star = Some("天心".into());
        good.deity = Some("值符".into());
        assert!((palace_energy(&good, &weights) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn empty_chart_scores_at_base() {
        let chart = crate::chart::ChartRecord::empty();
        let r = score(&chart, &WeightTable::default());
        assert_eq!(r.time, 50.0);
        assert_eq!(r.effectiveness, 50.0);
        assert_eq!(r.energy, 50.0);
        assert_eq!(r.total, 50);
        assert_eq!(r.interpretation, Reliability::LowModerate);
    }
}
