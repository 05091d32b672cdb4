pub mod config;
pub mod diagnose;
pub mod generate;
pub mod history;
pub mod improve;
pub mod init;
pub mod rank;
pub mod roster;
pub mod score;

use agent_health_core::config::Config;
use agent_health_core::metrics::{self, MetricsRecord};
use anyhow::Context;
use std::path::Path;

pub(crate) fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}

pub(crate) fn load_records(path: &Path) -> anyhow::Result<Vec<MetricsRecord>> {
    metrics::load_records(path)
        .with_context(|| format!("failed to read records from {}", path.display()))
}
