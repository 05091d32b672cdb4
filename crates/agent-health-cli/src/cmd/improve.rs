use crate::cmd::{load_config, load_records};
use crate::output::{print_json, print_table, score_cell};
use agent_health_core::config::Config;
use agent_health_core::document::{
    DocumentMutator, DocumentStore, FsDocumentStore, MemoryDocumentStore,
};
use agent_health_core::history::{History, HistoryEntry, HistoryOutcome};
use agent_health_core::metrics::MetricsRecord;
use agent_health_core::pipeline::{analyze, AgentState, Pipeline, PipelineReport};
use agent_health_core::roster::Roster;
use agent_health_core::HealthError;
use anyhow::Context;
use std::path::Path;

pub enum Target {
    Worst,
    All,
    Agent(String),
}

pub fn run(
    root: &Path,
    records: &Path,
    target: Target,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let records = load_records(records)?;
    let fs_store = FsDocumentStore::new(config.documents_path(root));

    let report = if dry_run {
        let preview = preview_store(&fs_store, &records)?;
        execute(&config, &DocumentMutator::new(preview), records, &target)?
    } else {
        let report = execute(&config, &DocumentMutator::new(fs_store), records, &target)?;
        persist(root, &report)?;
        report
    };

    if json {
        print_json(&serde_json::json!({
            "dry_run": dry_run,
            "outcomes": report.outcomes,
        }))?;
    } else {
        print_outcomes(&report, dry_run);
    }

    let failed = report.failed().count();
    if failed > 0 {
        anyhow::bail!(
            "{failed} of {} document updates failed",
            report.outcomes.len()
        );
    }
    Ok(())
}

fn execute<S: DocumentStore>(
    config: &Config,
    mutator: &DocumentMutator<S>,
    records: Vec<MetricsRecord>,
    target: &Target,
) -> anyhow::Result<PipelineReport> {
    let pipeline = Pipeline::new(config, mutator);
    let report = match target {
        Target::Worst => pipeline.improve_worst(records)?,
        Target::All => pipeline.improve_all(records)?,
        Target::Agent(needle) => {
            let analysis = analyze(records, config)?;
            let outcome = {
                let agent = analysis
                    .find(needle)
                    .ok_or_else(|| HealthError::AgentNotFound(needle.clone()))?;
                pipeline.improve_agent(agent)
            };
            PipelineReport {
                analysis,
                outcomes: vec![outcome],
            }
        }
    };
    Ok(report)
}

/// Copy the documents the batch could touch into memory so a dry run sees
/// real content without writing it back.
fn preview_store(
    fs_store: &FsDocumentStore,
    records: &[MetricsRecord],
) -> anyhow::Result<MemoryDocumentStore> {
    let preview = MemoryDocumentStore::new();
    for record in records {
        let Ok(id) = record.agent.document_id() else {
            continue;
        };
        if let Some(doc) = fs_store
            .read(&id)
            .with_context(|| format!("failed to read definition document {id}"))?
        {
            preview.insert(doc.id, doc.content);
        }
    }
    Ok(preview)
}

fn persist(root: &Path, report: &PipelineReport) -> anyhow::Result<()> {
    let mut history = History::load(root).context("failed to load history")?;
    let mut roster = Roster::load(root).context("failed to load roster")?;

    for outcome in &report.outcomes {
        let Some(plan) = &outcome.plan else {
            continue;
        };
        let result = match outcome.state {
            AgentState::DocumentUpdated => HistoryOutcome::Applied,
            _ => HistoryOutcome::Failed,
        };
        history.record(HistoryEntry::from_plan(plan, result, outcome.error.clone()));

        if let Some(mutation) = &outcome.mutation {
            match roster.mark_improved(&mutation.agent_key, mutation.applied_at) {
                Ok(()) => {}
                Err(HealthError::AgentNotFound(key)) => {
                    tracing::warn!(agent = %key, "improved agent is not in the roster");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    history.save(root).context("failed to save history")?;
    roster.save(root).context("failed to save roster")?;
    Ok(())
}

fn print_outcomes(report: &PipelineReport, dry_run: bool) {
    let rows = report
        .outcomes
        .iter()
        .map(|o| {
            let scored = report.analysis.find(&o.agent_key);
            vec![
                o.agent_key.clone(),
                scored
                    .map(|a| score_cell(a.health.overall))
                    .unwrap_or_default(),
                scored
                    .map(|a| a.health.status.to_string())
                    .unwrap_or_default(),
                o.plan
                    .as_ref()
                    .map(|p| score_cell(p.target_score))
                    .unwrap_or_else(|| "-".to_string()),
                o.state.to_string(),
                o.error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(
        &["AGENT", "SCORE", "STATUS", "TARGET", "OUTCOME", "ERROR"],
        rows,
    );
    if dry_run {
        println!("\nDry run: no documents, history or roster were written.");
    }
}
