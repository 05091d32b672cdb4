use crate::cmd::load_config;
use crate::output::print_json;
use agent_health_core::config::WarnLevel;
use clap::Subcommand;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    if json {
        return print_json(&config);
    }

    let t = &config.thresholds;
    let p = &config.policy;
    println!("Documents dir:        {}", config.documents_dir);
    println!("Commits per window:   {}", t.min_commits_per_window);
    println!("PRs per window:       {}", t.min_prs_per_window);
    println!("Review target:        {}", t.review_target);
    println!("Critical below:       {}", t.critical_overall_threshold);
    println!("Warning below:        {}", t.warning_overall_threshold);
    println!("Diagnose below:       {}", t.sub_score_trigger_threshold);
    println!(
        "Review goal / floor:  {} / {}",
        p.review_goal, p.review_floor
    );
    println!(
        "Target:               +{} capped at {}",
        p.target_increment, p.target_cap
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
