use std::fmt::Write;

use crate::deviation::{DeviationRecord, Grade, Winner};
use crate::history::HistoryStats;
use crate::metrics::metric_spec;
use crate::predict::Prediction;
use crate::weights::{Adjustment, WeightTable};

pub fn render_prediction(p: &Prediction) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "prediction {}", short_id(&p.id));
    let _ = writeln!(
        out,
        "  {}  ({} {}%  {} {}%  {} {}%)",
        p.result,
        crate::predict::HOME_WIN,
        p.outcome.home,
        crate::predict::DRAW,
        p.outcome.draw,
        crate::predict::AWAY_WIN,
        p.outcome.away
    );
    let _ = writeln!(
        out,
        "  expected goals {:.2} - {:.2}  edge {:+.2}",
        p.expected_goals_home, p.expected_goals_away, p.edge
    );
    let lines: Vec<String> = p
        .scorelines
        .iter()
        .map(|s| format!("{} {}%", s.label(), s.percent))
        .collect();
    let _ = writeln!(out, "  scores  {}", lines.join("  "));
    let _ = writeln!(
        out,
        "  chart   time {:.0}  effectiveness {:.0}  energy {:.0}  total {} ({})",
        p.score.time,
        p.score.effectiveness,
        p.score.energy,
        p.score.total,
        p.score.interpretation.label()
    );

    let _ = writeln!(out, "  metrics");
    for (name, value) in &p.metrics {
        let label = metric_spec(name).map(|m| m.label).unwrap_or(name.as_str());
        let _ = writeln!(out, "    {label:<8} {value:>6.1}");
    }

    if !p.key_patterns.is_empty() {
        let _ = writeln!(out, "  patterns");
        for k in &p.key_patterns {
            let palace = k.palace.map(|key| key.name()).unwrap_or("全局");
            let mark = if k.important { "*" } else { " " };
            let _ = writeln!(out, "   {mark}{} [{}] {}", k.name, k.category.label(), palace);
        }
    }
    let _ = writeln!(out, "  weights v{}", p.weights_version);
    out
}

pub fn render_deviation(d: &DeviationRecord, adjustments: &[Adjustment]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "deviation {}  overall {:.1} ({})",
        d.prediction_id.as_deref().map(short_id).unwrap_or("-"),
        d.overall,
        d.grade.label()
    );

    match &d.result {
        Some(r) => {
            let _ = writeln!(
                out,
                "  result   {} vs {}  {}  {:.0}",
                winner_label(r.predicted.winner),
                winner_label(r.actual.winner),
                if r.is_correct { "correct" } else { "wrong" },
                r.score
            );
        }
        None => {
            let _ = writeln!(out, "  result   (not compared)");
        }
    }

    if !d.metrics.is_empty() {
        let _ = writeln!(
            out,
            "  metrics  {:.1}",
            d.technical_score.unwrap_or_default()
        );
        for m in &d.metrics {
            let _ = writeln!(
                out,
                "    {:<16} pred {:>6.1}  actual {:>6.1}  err {:>4.2}  score {:>5.1}",
                m.metric, m.predicted, m.actual, m.normalized_error, m.score
            );
        }
    }

    if let Some(s) = &d.score {
        let _ = writeln!(
            out,
            "  score    {}-{} vs {}-{}  diff {}  {:.1}",
            s.predicted.0, s.predicted.1, s.actual.0, s.actual.1, s.total_diff, s.score
        );
    }

    if let Some(acc) = d.pattern_accuracy {
        let hits = d.patterns.iter().filter(|p| p.matched).count();
        let _ = writeln!(
            out,
            "  patterns {hits}/{} matched  accuracy {acc:.0}",
            d.patterns.len()
        );
    }

    if !adjustments.is_empty() {
        let _ = writeln!(out, "  adjustments");
        for a in adjustments {
            let _ = writeln!(
                out,
                "    {} x{:.2}  {}",
                a.path_label(),
                a.value,
                a.reason
            );
        }
    }
    out
}

pub fn render_stats(stats: &HistoryStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "verified matches {}", stats.count);
    if let Some(mean) = stats.mean_overall {
        let _ = writeln!(out, "  mean overall {mean:.1}");
    }
    if let Some(t) = stats.outcomes {
        let _ = writeln!(
            out,
            "  results correct {}%  partial {}%  wrong {}%",
            t.a, t.b, t.c
        );
    }
    for grade in Grade::ALL {
        let n = stats.grades.get(&grade).copied().unwrap_or(0);
        if n > 0 {
            let _ = writeln!(out, "  {:<18} {n}", grade.label());
        }
    }
    if !stats.metric_errors.is_empty() {
        let _ = writeln!(out, "  mean metric error");
        for (name, err) in &stats.metric_errors {
            let _ = writeln!(out, "    {name:<16} {err:.2}");
        }
    }
    out
}

pub fn render_weights(w: &WeightTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "weight table v{}", w.version);
    for (path, value) in w.leaves() {
        let _ = writeln!(out, "  {path:<48} {value:>8.3}");
    }
    out
}

fn winner_label(w: Winner) -> &'static str {
    match w {
        Winner::Home => crate::predict::HOME_WIN,
        Winner::Draw => crate::predict::DRAW,
        Winner::Away => crate::predict::AWAY_WIN,
        Winner::Unknown => "?",
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deviation::{ActualOutcome, PredictedOutcome, evaluate};

    #[test]
    fn deviation_report_names_grade_and_result() {
        let p = PredictedOutcome {
            result: Some("客勝".into()),
            ..Default::default()
        };
        let a = ActualOutcome {
            score: Some("1-1".into()),
            ..Default::default()
        };
        let text = render_deviation(&evaluate(&p, &a).unwrap(), &[]);
        assert!(text.contains("poor"));
        assert!(text.contains("客勝 vs 和局"));
    }

    #[test]
    fn weights_report_lists_version() {
        let text = render_weights(&WeightTable::default());
        assert!(text.starts_with("weight table v1.0.0"));
        assert!(text.contains("prediction_thresholds.draw_margin"));
    }
}
