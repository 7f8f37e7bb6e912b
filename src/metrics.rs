/// One technical match metric: how it is predicted and how its error is judged.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub name: &'static str,
    pub label: &'static str,
    /// Typical per-team value with a neutral chart.
    pub base: f64,
    /// Converts a coefficient-weighted impact into metric units.
    pub scale: f64,
    /// Share of the generic `attack` impact that also moves this metric.
    pub attack_share: f64,
    pub min: f64,
    pub max: f64,
    /// Share of the technical deviation component.
    pub weight: f64,
    /// Error at which the metric scores zero.
    pub max_error: f64,
}

pub const METRICS: [MetricSpec; 8] = [
    MetricSpec {
        name: "possession",
        label: "控球率",
        base: 50.0,
        scale: 100.0,
        attack_share: 0.3,
        min: 20.0,
        max: 80.0,
        weight: 0.20,
        max_error: 20.0,
    },
    MetricSpec {
        name: "yellowCards",
        label: "黃牌",
        base: 2.0,
        scale: 10.0,
        attack_share: 0.0,
        min: 0.0,
        max: 8.0,
        weight: 0.10,
        max_error: 3.0,
    },
    MetricSpec {
        name: "shotsOnTarget",
        label: "射正",
        base: 4.5,
        scale: 10.0,
        attack_share: 0.5,
        min: 0.0,
        max: 15.0,
        weight: 0.20,
        max_error: 5.0,
    },
    MetricSpec {
        name: "dangerousAttacks",
        label: "危險進攻",
        base: 50.0,
        scale: 100.0,
        attack_share: 0.5,
        min: 10.0,
        max: 120.0,
        weight: 0.15,
        max_error: 30.0,
    },
    MetricSpec {
        name: "corners",
        label: "角球",
        base: 5.0,
        scale: 10.0,
        attack_share: 0.3,
        min: 0.0,
        max: 15.0,
        weight: 0.10,
        max_error: 5.0,
    },
    MetricSpec {
        name: "fouls",
        label: "犯規",
        base: 12.0,
        scale: 20.0,
        attack_share: 0.0,
        min: 3.0,
        max: 25.0,
        weight: 0.10,
        max_error: 8.0,
    },
    MetricSpec {
        name: "offsides",
        label: "越位",
        base: 2.0,
        scale: 5.0,
        attack_share: 0.0,
        min: 0.0,
        max: 8.0,
        weight: 0.05,
        max_error: 3.0,
    },
    MetricSpec {
        name: "passAccuracy",
        label: "傳球成功率",
        base: 80.0,
        scale: 30.0,
        attack_share: 0.0,
        min: 60.0,
        max: 95.0,
        weight: 0.10,
        max_error: 15.0,
    },
];

pub fn metric_spec(name: &str) -> Option<&'static MetricSpec> {
    METRICS.iter().find(|m| m.name == name)
}
