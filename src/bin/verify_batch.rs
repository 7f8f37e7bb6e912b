use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde::Deserialize;

use qimen_forecast::config;
use qimen_forecast::deviation::{ActualOutcome, DeviationRecord, Grade, PredictedOutcome, evaluate};
use qimen_forecast::history::DeviationHistory;
use qimen_forecast::report;

#[derive(Debug, Deserialize)]
struct Pair {
    predicted: PredictedOutcome,
    actual: ActualOutcome,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    config::init_logging();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: verify_batch <pairs.jsonl>"))?;
    let raw =
        fs::read_to_string(&path).with_context(|| format!("read pairs {}", path.display()))?;

    let lines: Vec<(usize, &str)> = raw
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let outcomes: Vec<(usize, Result<DeviationRecord>)> = lines
        .par_iter()
        .map(|(idx, line)| (*idx + 1, evaluate_line(line)))
        .collect();

    let mut grades: BTreeMap<Grade, usize> = BTreeMap::new();
    let mut overall = Vec::new();
    let mut failures = Vec::new();
    let mut history = DeviationHistory::new();
    for (line_no, outcome) in outcomes {
        match outcome {
            Ok(record) => {
                *grades.entry(record.grade).or_insert(0) += 1;
                overall.push(record.overall);
                history.push(record);
            }
            Err(err) => failures.push(format!("line {line_no}: {err:#}")),
        }
    }

    println!("Batch verify complete");
    println!("File: {}", path.display());
    println!("Pairs: {} evaluated, {} failed", overall.len(), failures.len());
    if !overall.is_empty() {
        let mean = overall.iter().sum::<f64>() / overall.len() as f64;
        println!("Mean overall: {mean:.1}");
    }
    for grade in Grade::ALL {
        println!(
            "  {:<18} {}",
            grade.label(),
            grades.get(&grade).copied().unwrap_or(0)
        );
    }
    print!("{}", report::render_stats(&history.stats()));
    for failure in failures.iter().take(6) {
        println!("   - {failure}");
    }
    Ok(())
}

fn evaluate_line(line: &str) -> Result<DeviationRecord> {
    let pair: Pair = serde_json::from_str(line).context("invalid pair json")?;
    Ok(evaluate(&pair.predicted, &pair.actual)?)
}
