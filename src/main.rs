use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use qimen_forecast::adjust::propose_adjustments;
use qimen_forecast::config::{self, AppConfig};
use qimen_forecast::deviation::{ActualOutcome, PredictedOutcome, evaluate};
use qimen_forecast::store::KvStore;
use qimen_forecast::weights::{self, WeightTable, apply_adjustments};
use qimen_forecast::{history, predict, remote, report};

const USAGE: &str = "usage:
  qimen_forecast predict <chart.txt>
  qimen_forecast verify <prediction-id> <actual.json>
  qimen_forecast stats
  qimen_forecast weights [--reset | --fetch]";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    config::init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = AppConfig::from_env();
    let mut store = cfg.open_store()?;

    match args.first().map(String::as_str) {
        Some("predict") => {
            let path = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
            run_predict(&mut *store, Path::new(path))
        }
        Some("verify") => {
            let (Some(id), Some(path)) = (args.get(1), args.get(2)) else {
                return Err(anyhow!(USAGE));
            };
            run_verify(&mut *store, id, Path::new(path))
        }
        Some("stats") => {
            let stats = history::load(&*store).stats();
            print!("{}", report::render_stats(&stats));
            Ok(())
        }
        Some("weights") => run_weights(&mut *store, &cfg, args.get(1).map(String::as_str)),
        _ => {
            println!("{USAGE}");
            Ok(())
        }
    }
}

fn run_predict(store: &mut dyn KvStore, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read chart transcript {}", path.display()))?;
    let weights = weights::load(store);
    let (_, prediction) = predict::predict_transcript(&text, &weights)?;
    history::save_prediction(store, &prediction)?;
    info!(id = %prediction.id, "stored prediction");
    print!("{}", report::render_prediction(&prediction));
    println!("id {}", prediction.id);
    Ok(())
}

fn run_verify(store: &mut dyn KvStore, id: &str, path: &Path) -> Result<()> {
    let prediction = history::load_prediction(store, id)?
        .ok_or_else(|| anyhow!("no stored prediction with id {id}"))?;
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read actual result {}", path.display()))?;
    let actual: ActualOutcome = serde_json::from_str(&raw).context("invalid actual result json")?;

    let deviation = evaluate(&PredictedOutcome::from(&prediction), &actual)?;
    let current = weights::load(store);
    let adjustments = propose_adjustments(&current, &deviation);
    let next = apply_adjustments(&current, &adjustments);
    weights::save(store, &next)?;

    let mut past = history::load(store);
    past.push(deviation.clone());
    history::save(store, &past)?;

    print!("{}", report::render_deviation(&deviation, &adjustments));
    if next.version != current.version {
        println!("weights v{} -> v{}", current.version, next.version);
    }
    Ok(())
}

fn run_weights(store: &mut dyn KvStore, cfg: &AppConfig, flag: Option<&str>) -> Result<()> {
    let table = match flag {
        Some("--reset") => {
            let table = WeightTable::default();
            weights::save(store, &table)?;
            table
        }
        Some("--fetch") => {
            let url = cfg
                .defaults_url
                .as_deref()
                .context("QIMEN_DEFAULTS_URL is not set")?;
            let table = remote::fetch_default_weights(url, cfg.http_timeout)?;
            weights::save(store, &table)?;
            table
        }
        Some(other) => return Err(anyhow!("unknown weights flag {other}\n{USAGE}")),
        None => weights::load(store),
    };
    print!("{}", report::render_weights(&table));
    Ok(())
}
