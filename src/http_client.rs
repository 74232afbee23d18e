use std::time::Duration;

use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use tracing::debug;

pub const USER_AGENT: &str = concat!("simple_fantasy/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
const CONNECT_TIMEOUT_SECS: u64 = 5;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// The process-wide client. Built on first use; later callers share the first timeout.
pub fn http_client(timeout_secs: u64) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| build_client(timeout_secs))
}

pub fn build_client(timeout_secs: u64) -> Result<Client> {
    if timeout_secs == 0 {
        bail!("http timeout must be at least one second");
    }
    debug!(timeout_secs, "building http client");
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS.min(timeout_secs)))
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build http client")
}
