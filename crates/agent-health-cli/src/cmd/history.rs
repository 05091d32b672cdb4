use crate::output::{print_json, print_table, score_cell};
use agent_health_core::history::History;
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, agent: Option<&str>, json: bool) -> anyhow::Result<()> {
    let history = History::load(root).context("failed to load history")?;
    let entries: Vec<_> = match agent {
        Some(key) => history.for_agent(key).collect(),
        None => history.entries.iter().collect(),
    };

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No improvement history.");
        return Ok(());
    }

    let rows = entries
        .iter()
        .map(|e| {
            let categories: Vec<&str> = e.categories.iter().map(|c| c.as_str()).collect();
            vec![
                e.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
                e.agent_key.clone(),
                e.document_id.clone(),
                score_cell(e.score_before),
                score_cell(e.target_score),
                categories.join(","),
                e.outcome.to_string(),
            ]
        })
        .collect();
    print_table(
        &["RECORDED", "AGENT", "DOCUMENT", "BEFORE", "TARGET", "CATEGORIES", "OUTCOME"],
        rows,
    );
    Ok(())
}
