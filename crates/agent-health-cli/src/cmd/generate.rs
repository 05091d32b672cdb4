use agent_health_core::metrics::RecordFormat;
use agent_health_core::roster::Roster;
use agent_health_core::synthetic::Generator;
use anyhow::Context;
use chrono::Utc;
use std::path::Path;

pub fn run(root: &Path, seed: Option<u64>, days: i64, out: Option<&Path>) -> anyhow::Result<()> {
    let roster = Roster::load(root).context("failed to load roster")?;
    if roster.agents.is_empty() {
        anyhow::bail!("roster is empty; add agents with 'agent-health roster add'");
    }

    let mut generator = match seed {
        Some(seed) => Generator::seeded(seed),
        None => Generator::from_entropy(),
    }
    .with_window_days(days);
    let records = generator.generate(&roster.agents, Utc::now());

    let format = out.map(RecordFormat::from_path).unwrap_or(RecordFormat::Json);
    let data = match format {
        RecordFormat::Json => serde_json::to_string_pretty(&records)?,
        RecordFormat::Yaml => serde_yaml::to_string(&records)?,
    };

    match out {
        Some(path) => {
            agent_health_core::io::atomic_write(path, data.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {} records to {}", records.len(), path.display());
        }
        None => println!("{data}"),
    }
    Ok(())
}
