use crate::output::{print_json, print_table};
use agent_health_core::roster::{Agent, Roster};
use agent_health_core::types::Role;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum RosterSubcommand {
    /// Register an agent
    Add {
        /// Display name
        name: String,
        /// Unique key (usually an email address)
        #[arg(long)]
        email: String,
        /// Role: product-owner, backend, frontend, devops, or any other label
        #[arg(long)]
        role: String,
    },

    /// List registered agents
    List,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: RosterSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RosterSubcommand::Add { name, email, role } => add(root, name, email, &role, json),
        RosterSubcommand::List => list(root, json),
    }
}

fn load(root: &Path) -> anyhow::Result<Roster> {
    Roster::load(root).context("failed to load roster")
}

// ---------------------------------------------------------------------------
// add
// ---------------------------------------------------------------------------

fn add(root: &Path, name: String, email: String, role: &str, json: bool) -> anyhow::Result<()> {
    let mut roster = load(root)?;
    let agent = Agent::new(name, email, Role::parse(role));
    let slug = agent.identity().slug()?;
    if !agent.role.is_recognized() {
        tracing::warn!(role = %agent.role, "unrecognized role; backend templates will be used");
    }
    roster.add(agent.clone())?;
    roster.save(root).context("failed to save roster")?;

    if json {
        print_json(&serde_json::json!({ "agent": agent, "slug": slug }))?;
    } else {
        println!("Added agent '{}' ({slug}) as {}.", agent.key, agent.role);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let roster = load(root)?;
    if json {
        return print_json(&roster.agents);
    }
    if roster.agents.is_empty() {
        println!("No agents registered.");
        return Ok(());
    }

    let rows = roster
        .agents
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                a.key.clone(),
                a.role.to_string(),
                a.last_improved_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["NAME", "KEY", "ROLE", "LAST IMPROVED"], rows);
    Ok(())
}
