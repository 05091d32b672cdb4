use crate::cmd::{load_config, load_records};
use crate::output::{print_json, print_table, score_cell};
use agent_health_core::pipeline::analyze;
use agent_health_core::score::ScoredAgent;
use agent_health_core::types::Status;
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, records: &Path, status: Option<&str>, json: bool) -> anyhow::Result<()> {
    let filter: Option<Status> = status
        .map(str::parse)
        .transpose()
        .context("--status must be critical, warning or healthy")?;

    let config = load_config(root)?;
    let analysis = analyze(load_records(records)?, &config)?;

    if json {
        return match filter {
            Some(s) => print_json(&analysis.in_status(s).collect::<Vec<_>>()),
            None => print_json(&analysis),
        };
    }

    let shown: Vec<(usize, &ScoredAgent)> = analysis
        .ranked
        .iter()
        .enumerate()
        .filter(|(_, a)| filter.map_or(true, |s| a.health.status == s))
        .map(|(i, a)| (i + 1, a))
        .collect();

    let rows = shown
        .iter()
        .map(|(pos, a)| {
            vec![
                pos.to_string(),
                a.identity().key.clone(),
                a.identity().role.to_string(),
                score_cell(a.health.overall),
                a.health.status.to_string(),
            ]
        })
        .collect();
    print_table(&["#", "AGENT", "ROLE", "OVERALL", "STATUS"], rows);

    println!();
    println!(
        "Team average {} | critical {} | warning {} | healthy {}",
        score_cell(analysis.team_average),
        analysis.critical.len(),
        analysis.warning.len(),
        analysis.healthy.len()
    );
    Ok(())
}
