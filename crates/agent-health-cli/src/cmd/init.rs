use agent_health_core::{
    config::Config, history::History, io, paths, roster::Roster,
};
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing agent-health in: {}", root.display());

    let health_dir = paths::health_dir(root);
    io::ensure_dir(&health_dir)
        .with_context(|| format!("failed to create {}", health_dir.display()))?;

    let config = if paths::config_path(root).exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
        Config::load(root).context("failed to load config")?
    } else {
        let config = Config::default();
        config.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        config
    };

    if paths::roster_path(root).exists() {
        println!("  exists:  {}", paths::ROSTER_FILE);
    } else {
        Roster::default()
            .save(root)
            .context("failed to write roster.yaml")?;
        println!("  created: {}", paths::ROSTER_FILE);
    }

    if paths::history_path(root).exists() {
        println!("  exists:  {}", paths::HISTORY_FILE);
    } else {
        History::default()
            .save(root)
            .context("failed to write history.yaml")?;
        println!("  created: {}", paths::HISTORY_FILE);
    }

    let docs = config.documents_path(root);
    io::ensure_dir(&docs).with_context(|| format!("failed to create {}", docs.display()))?;

    println!("\nagent-health initialized successfully.");
    println!("Next: agent-health roster add <name> --email <key> --role <role>");
    Ok(())
}
