use crate::cmd::{load_config, load_records};
use crate::output::{print_json, print_table, score_cell};
use agent_health_core::score::score_all;
use std::path::Path;

pub fn run(root: &Path, records: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let scored = score_all(load_records(records)?, &config.thresholds)?;

    if json {
        return print_json(&scored);
    }
    if scored.is_empty() {
        println!("No records.");
        return Ok(());
    }

    let rows = scored
        .iter()
        .map(|a| {
            let h = &a.health;
            vec![
                a.identity().key.clone(),
                a.identity().role.to_string(),
                score_cell(h.productivity),
                score_cell(h.quality),
                score_cell(h.collaboration),
                score_cell(h.reliability),
                score_cell(h.overall),
                h.status.to_string(),
            ]
        })
        .collect();
    print_table(
        &["AGENT", "ROLE", "PROD", "QUAL", "COLLAB", "REL", "OVERALL", "STATUS"],
        rows,
    );
    Ok(())
}
