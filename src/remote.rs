use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use tracing::info;

use crate::weights::{self, WeightTable};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Downloads a default weight table document and clamps it into range.
pub fn fetch_default_weights(url: &str, timeout: Duration) -> Result<WeightTable> {
    let client = http_client()?;
    let resp = client
        .get(url)
        .timeout(timeout)
        .header(USER_AGENT, "qimen-forecast/0.1")
        .send()
        .context("weight table request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading weight table body")?;
    if !status.is_success() {
        let snippet = body
            .trim()
            .replace(['\n', '\r'], " ")
            .chars()
            .take(220)
            .collect::<String>();
        return Err(anyhow!("weight table http {}: {}", status, snippet));
    }

    let table = weights::from_json(&body)?;
    info!(url, version = %table.version, "fetched default weight table");
    Ok(table)
}
