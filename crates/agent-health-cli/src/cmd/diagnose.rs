use crate::cmd::{load_config, load_records};
use crate::output::{print_json, score_cell};
use agent_health_core::pipeline::analyze;
use agent_health_core::plan::ImprovementPlan;
use agent_health_core::HealthError;
use std::path::Path;

pub fn run(root: &Path, records: &Path, needle: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let analysis = analyze(load_records(records)?, &config)?;
    let agent = analysis
        .find(needle)
        .ok_or_else(|| HealthError::AgentNotFound(needle.to_string()))?;

    let plan = ImprovementPlan::build(agent, &config.thresholds, &config.policy)?;

    if json {
        return print_json(&serde_json::json!({
            "agent": agent,
            "plan": plan,
        }));
    }

    match plan {
        None => println!(
            "{} scores {} ({}); no category below {}. Nothing to fix.",
            agent.identity().key,
            score_cell(agent.health.overall),
            agent.health.status,
            config.thresholds.sub_score_trigger_threshold
        ),
        Some(plan) => {
            println!("Agent:    {}", plan.agent.key);
            println!("Document: {}", plan.document_id);
            println!();
            print!("{}", plan.instructions);
        }
    }
    Ok(())
}
