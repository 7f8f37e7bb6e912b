use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::store::{JsonFileStore, KvStore, SqliteStore};

const DATA_DIR: &str = "qimen_forecast";
const JSON_FILE: &str = "store.json";
const SQLITE_FILE: &str = "store.sqlite3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Json,
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: Option<PathBuf>,
    pub store: StoreKind,
    pub defaults_url: Option<String>,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = opt_env("QIMEN_DATA_DIR")
            .map(PathBuf::from)
            .or_else(default_data_dir);
        let store = match opt_env("QIMEN_STORE")
            .map(|val| val.to_lowercase())
            .as_deref()
        {
            Some("sqlite") => StoreKind::Sqlite,
            _ => StoreKind::Json,
        };
        let http_timeout = env::var("QIMEN_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(10)
            .max(1);
        Self {
            data_dir,
            store,
            defaults_url: opt_env("QIMEN_DEFAULTS_URL"),
            http_timeout: Duration::from_secs(http_timeout),
        }
    }

    pub fn open_store(&self) -> Result<Box<dyn KvStore>> {
        let dir = self
            .data_dir
            .as_ref()
            .ok_or_else(|| anyhow!("no data dir: set QIMEN_DATA_DIR or HOME"))?;
        Ok(match self.store {
            StoreKind::Json => Box::new(JsonFileStore::open(dir.join(JSON_FILE))?),
            StoreKind::Sqlite => Box::new(SqliteStore::open(&dir.join(SQLITE_FILE))?),
        })
    }
}

/// Installs the stderr subscriber; `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qimen_forecast=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_data_dir() -> Option<PathBuf> {
    if let Some(base) = opt_env("XDG_DATA_HOME") {
        return Some(PathBuf::from(base).join(DATA_DIR));
    }
    let home = opt_env("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(DATA_DIR),
    )
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}
