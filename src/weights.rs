use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::KvStore;
use crate::symbols::{self, Category, HarmKind, PATTERNS};

pub const WEIGHTS_KEY: &str = "qimen.weights";
pub const DEFAULT_VERSION: &str = "1.0.0";

/// The eight technical metrics predicted and verified per match.
pub const TECHNICAL_METRICS: [&str; 8] = [
    "possession",
    "yellowCards",
    "shotsOnTarget",
    "dangerousAttacks",
    "corners",
    "fouls",
    "offsides",
    "passAccuracy",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeParams {
    pub value_star_bonus: f64,
    pub time_pattern_bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessParams {
    pub harm_scale: f64,
    pub pattern_scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyParams {
    pub opportunity_bonus: f64,
    pub value_star_palace_weight: f64,
    pub questioner_palace_weight: f64,
    pub door_delta: f64,
    pub star_delta: f64,
    pub deity_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdParams {
    pub home_advantage: f64,
    pub draw_margin: f64,
    pub goal_expectancy: f64,
    pub edge_scale: f64,
}

/// Tunable parameters for scoring and prediction.
///
/// Values are replaced, never edited in place: calibration produces a new table
/// with a bumped `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    pub version: String,
    pub time_based: TimeParams,
    pub effectiveness: EffectivenessParams,
    pub energy_conversion: EnergyParams,
    /// Metric name -> sensitivity of the metric to chart impacts.
    #[serde(default = "default_technical")]
    pub technical: BTreeMap<String, f64>,
    /// Canonical pattern name -> signed outcome weight.
    #[serde(default = "default_pattern_weights")]
    pub pattern_weights: BTreeMap<String, f64>,
    /// Harm marker (門迫/擊刑/空亡/入墓) -> impact weight.
    #[serde(default = "default_harm_effects")]
    pub four_harm_effects: BTreeMap<String, f64>,
    pub prediction_thresholds: ThresholdParams,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            time_based: TimeParams {
                value_star_bonus: 20.0,
                time_pattern_bonus: 5.0,
            },
            effectiveness: EffectivenessParams {
                harm_scale: 100.0,
                pattern_scale: 50.0,
            },
            energy_conversion: EnergyParams {
                opportunity_bonus: 10.0,
                value_star_palace_weight: 30.0,
                questioner_palace_weight: 20.0,
                door_delta: 0.3,
                star_delta: 0.2,
                deity_delta: 0.2,
            },
            technical: default_technical(),
            pattern_weights: default_pattern_weights(),
            four_harm_effects: default_harm_effects(),
            prediction_thresholds: ThresholdParams {
                home_advantage: 0.10,
                draw_margin: 0.08,
                goal_expectancy: 2.60,
                edge_scale: 0.80,
            },
        }
    }
}

fn default_technical() -> BTreeMap<String, f64> {
    let coefs = [0.30, 0.20, 0.25, 0.25, 0.20, 0.20, 0.15, 0.20];
    TECHNICAL_METRICS
        .iter()
        .zip(coefs)
        .map(|(name, c)| ((*name).to_string(), c))
        .collect()
}

fn default_pattern_weights() -> BTreeMap<String, f64> {
    PATTERNS
        .iter()
        .map(|p| {
            let magnitude = if symbols::is_important_pattern(p.name) {
                0.30
            } else {
                0.20
            };
            let w = match p.category {
                Category::Neutral => 0.0,
                other => other.sign() * magnitude,
            };
            (p.name.to_string(), w)
        })
        .collect()
}

fn default_harm_effects() -> BTreeMap<String, f64> {
    HarmKind::ALL
        .into_iter()
        .map(|kind| {
            let w = match kind {
                HarmKind::DoorPressure => -0.30,
                HarmKind::Strike => -0.35,
                HarmKind::Void => -0.25,
                HarmKind::Tomb => -0.30,
            };
            (kind.marker().to_string(), w)
        })
        .collect()
}

/// Valid range of the leaf at `path`, or `None` for an unknown path.
pub fn range_for(path: &[&str]) -> Option<(f64, f64)> {
    let range = match path {
        ["time_based", "value_star_bonus"] => (0.0, 40.0),
        ["time_based", "time_pattern_bonus"] => (0.0, 15.0),
        ["effectiveness", "harm_scale"] => (50.0, 150.0),
        ["effectiveness", "pattern_scale"] => (20.0, 80.0),
        ["energy_conversion", "opportunity_bonus"] => (0.0, 20.0),
        ["energy_conversion", "value_star_palace_weight"] => (10.0, 50.0),
        ["energy_conversion", "questioner_palace_weight"] => (10.0, 40.0),
        ["energy_conversion", "door_delta" | "star_delta" | "deity_delta"] => (0.05, 0.5),
        ["technical", _] => (0.05, 0.5),
        ["pattern_weights", _] => (-1.0, 1.0),
        ["four_harm_effects", _] => (-1.0, 0.0),
        ["prediction_thresholds", "home_advantage"] => (0.0, 0.3),
        ["prediction_thresholds", "draw_margin"] => (0.02, 0.3),
        ["prediction_thresholds", "goal_expectancy"] => (1.5, 4.0),
        ["prediction_thresholds", "edge_scale"] => (0.2, 1.5),
        _ => return None,
    };
    Some(range)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustOp {
    Multiply,
    Set,
    Delta,
}

/// One proposed change to a single weight-table leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub path: Vec<String>,
    pub op: AdjustOp,
    pub value: f64,
    pub reason: String,
}

impl Adjustment {
    pub fn multiply(path: &[&str], factor: f64, reason: impl Into<String>) -> Self {
        Self {
            path: path.iter().map(|s| (*s).to_string()).collect(),
            op: AdjustOp::Multiply,
            value: factor,
            reason: reason.into(),
        }
    }

    pub fn path_label(&self) -> String {
        self.path.join(".")
    }
}

impl WeightTable {
    /// Mutable access to one leaf by explicit traversal.
    pub fn leaf_mut(&mut self, path: &[&str]) -> Option<&mut f64> {
        let leaf = match path {
            ["time_based", "value_star_bonus"] => &mut self.time_based.value_star_bonus,
            ["time_based", "time_pattern_bonus"] => &mut self.time_based.time_pattern_bonus,
            ["effectiveness", "harm_scale"] => &mut self.effectiveness.harm_scale,
            ["effectiveness", "pattern_scale"] => &mut self.effectiveness.pattern_scale,
            ["energy_conversion", "opportunity_bonus"] => {
                &mut self.energy_conversion.opportunity_bonus
            }
            ["energy_conversion", "value_star_palace_weight"] => {
                &mut self.energy_conversion.value_star_palace_weight
            }
            ["energy_conversion", "questioner_palace_weight"] => {
                &mut self.energy_conversion.questioner_palace_weight
            }
            ["energy_conversion", "door_delta"] => &mut self.energy_conversion.door_delta,
            ["energy_conversion", "star_delta"] => &mut self.energy_conversion.star_delta,
            ["energy_conversion", "deity_delta"] => &mut self.energy_conversion.deity_delta,
            ["technical", key] => self.technical.get_mut(*key)?,
            ["pattern_weights", key] => self.pattern_weights.get_mut(*key)?,
            ["four_harm_effects", key] => self.four_harm_effects.get_mut(*key)?,
            ["prediction_thresholds", "home_advantage"] => {
                &mut self.prediction_thresholds.home_advantage
            }
            ["prediction_thresholds", "draw_margin"] => &mut self.prediction_thresholds.draw_margin,
            ["prediction_thresholds", "goal_expectancy"] => {
                &mut self.prediction_thresholds.goal_expectancy
            }
            ["prediction_thresholds", "edge_scale"] => &mut self.prediction_thresholds.edge_scale,
            _ => return None,
        };
        Some(leaf)
    }

    pub fn leaf(&self, path: &[&str]) -> Option<f64> {
        self.leaves()
            .into_iter()
            .find(|(p, _)| p.split('.').eq(path.iter().copied()))
            .map(|(_, v)| v)
    }

    /// Every numeric leaf as (dotted path, value).
    pub fn leaves(&self) -> Vec<(String, f64)> {
        let mut out = vec![
            ("time_based.value_star_bonus".to_string(), self.time_based.value_star_bonus),
            ("time_based.time_pattern_bonus".to_string(), self.time_based.time_pattern_bonus),
            ("effectiveness.harm_scale".to_string(), self.effectiveness.harm_scale),
            ("effectiveness.pattern_scale".to_string(), self.effectiveness.pattern_scale),
            (
                "energy_conversion.opportunity_bonus".to_string(),
                self.energy_conversion.opportunity_bonus,
            ),
            (
                "energy_conversion.value_star_palace_weight".to_string(),
                self.energy_conversion.value_star_palace_weight,
            ),
            (
                "energy_conversion.questioner_palace_weight".to_string(),
                self.energy_conversion.questioner_palace_weight,
            ),
            ("energy_conversion.door_delta".to_string(), self.energy_conversion.door_delta),
            ("energy_conversion.star_delta".to_string(), self.energy_conversion.star_delta),
            ("energy_conversion.deity_delta".to_string(), self.energy_conversion.deity_delta),
            (
                "prediction_thresholds.home_advantage".to_string(),
                self.prediction_thresholds.home_advantage,
            ),
            (
                "prediction_thresholds.draw_margin".to_string(),
                self.prediction_thresholds.draw_margin,
            ),
            (
                "prediction_thresholds.goal_expectancy".to_string(),
                self.prediction_thresholds.goal_expectancy,
            ),
            (
                "prediction_thresholds.edge_scale".to_string(),
                self.prediction_thresholds.edge_scale,
            ),
        ];
        for (section, map) in [
            ("technical", &self.technical),
            ("pattern_weights", &self.pattern_weights),
            ("four_harm_effects", &self.four_harm_effects),
        ] {
            out.extend(map.iter().map(|(k, v)| (format!("{section}.{k}"), *v)));
        }
        out
    }

    /// Clamps every leaf into its range; non-finite values reset to the low bound.
    pub fn sanitize(&mut self) {
        let paths: Vec<String> = self.leaves().into_iter().map(|(p, _)| p).collect();
        for path in paths {
            let segments: Vec<&str> = path.splitn(2, '.').collect();
            let Some((lo, hi)) = range_for(&segments) else {
                continue;
            };
            if let Some(leaf) = self.leaf_mut(&segments) {
                *leaf = clamp_finite(*leaf, lo, hi);
            }
        }
    }

    pub fn harm_effect(&self, label: &str) -> f64 {
        HarmKind::classify(label)
            .and_then(|kind| self.four_harm_effects.get(kind.marker()).copied())
            .unwrap_or(0.0)
    }

    pub fn pattern_weight(&self, canonical: &str) -> f64 {
        self.pattern_weights.get(canonical).copied().unwrap_or(0.0)
    }

    pub fn technical_coef(&self, metric: &str) -> f64 {
        self.technical.get(metric).copied().unwrap_or(0.0)
    }
}

fn clamp_finite(v: f64, lo: f64, hi: f64) -> f64 {
    if v.is_finite() { v.clamp(lo, hi) } else { lo }
}

/// Applies adjustments to a copy of `weights`; the input is never touched.
/// Unknown paths are skipped.
pub fn apply_adjustments(weights: &WeightTable, adjustments: &[Adjustment]) -> WeightTable {
    let mut out = weights.clone();
    let mut applied = 0usize;
    for adj in adjustments {
        let path: Vec<&str> = adj.path.iter().map(String::as_str).collect();
        let Some((lo, hi)) = range_for(&path) else {
            warn!(path = %adj.path_label(), "skipping adjustment with unknown path");
            continue;
        };
        let Some(leaf) = out.leaf_mut(&path) else {
            warn!(path = %adj.path_label(), "skipping adjustment for missing weight");
            continue;
        };
        let next = match adj.op {
            AdjustOp::Multiply => *leaf * adj.value,
            AdjustOp::Set => adj.value,
            AdjustOp::Delta => *leaf + adj.value,
        };
        *leaf = clamp_finite(next, lo, hi);
        applied += 1;
    }
    if applied > 0 {
        out.version = bump_version(&weights.version);
    }
    debug!(applied, version = %out.version, "applied weight adjustments");
    out
}

pub fn bump_version(version: &str) -> String {
    let trimmed = version.trim();
    if let Some((head, tail)) = trimmed.rsplit_once('.')
        && let Ok(n) = tail.parse::<u32>()
    {
        return format!("{head}.{}", n.saturating_add(1));
    }
    if trimmed.is_empty() {
        return DEFAULT_VERSION.to_string();
    }
    format!("{trimmed}.1")
}

/// Loads the persisted table, falling back to defaults when absent or unreadable.
pub fn load(store: &dyn KvStore) -> WeightTable {
    let raw = match store.get(WEIGHTS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return WeightTable::default(),
        Err(err) => {
            warn!(error = %err, "weight table unavailable, using defaults");
            return WeightTable::default();
        }
    };
    match from_json(&raw) {
        Ok(table) => table,
        Err(err) => {
            warn!(error = %err, "persisted weight table is invalid, using defaults");
            WeightTable::default()
        }
    }
}

pub fn save(store: &mut dyn KvStore, weights: &WeightTable) -> Result<()> {
    let json = serde_json::to_string(weights).context("serialize weight table")?;
    store.set(WEIGHTS_KEY, &json).context("persist weight table")
}

/// Parses a weight table document and clamps it into range.
pub fn from_json(raw: &str) -> Result<WeightTable> {
    let mut table: WeightTable = serde_json::from_str(raw).context("invalid weight table json")?;
    table.sanitize();
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_within_range() {
        let table = WeightTable::default();
        for (path, value) in table.leaves() {
            let segments: Vec<&str> = path.splitn(2, '.').collect();
            let (lo, hi) = range_for(&segments).expect("every leaf has a range");
            assert!(value >= lo && value <= hi, "{path}={value}");
        }
    }

    #[test]
    fn adjustments_clamp_and_bump_version() {
        let table = WeightTable::default();
        let adj = vec![
            Adjustment::multiply(&["energy_conversion", "door_delta"], 10.0, "test"),
            Adjustment {
                path: vec!["technical".into(), "fouls".into()],
                op: AdjustOp::Delta,
                value: -1.0,
                reason: "test".into(),
            },
        ];
        let next = apply_adjustments(&table, &adj);
        assert_eq!(next.energy_conversion.door_delta, 0.5);
        assert_eq!(next.technical_coef("fouls"), 0.05);
        assert_eq!(next.version, "1.0.1");
        assert_eq!(table.energy_conversion.door_delta, 0.3);
    }

    #[test]
    fn unknown_paths_leave_table_unchanged() {
        let table = WeightTable::default();
        let adj = vec![Adjustment::multiply(&["nope", "nothing"], 2.0, "test")];
        let next = apply_adjustments(&table, &adj);
        assert_eq!(next, table);
    }

    #[test]
    fn version_bump_handles_odd_strings() {
        assert_eq!(bump_version("2.3.9"), "2.3.10");
        assert_eq!(bump_version("beta"), "beta.1");
        assert_eq!(bump_version(""), DEFAULT_VERSION);
    }

    #[test]
    fn out_of_range_json_is_clamped() {
        let mut table = WeightTable::default();
        table.prediction_thresholds.draw_margin = 5.0;
        let raw = serde_json::to_string(&table).unwrap();
        let loaded = from_json(&raw).unwrap();
        assert_eq!(loaded.prediction_thresholds.draw_margin, 0.3);
    }

    #[test]
    fn harm_effect_classifies_labels() {
        let table = WeightTable::default();
        assert_eq!(table.harm_effect("死門門迫"), -0.30);
        assert_eq!(table.harm_effect("丙空亡"), -0.25);
        assert_eq!(table.harm_effect("無"), 0.0);
    }
}
