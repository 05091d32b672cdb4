use crate::error::Result;
use crate::paths;
use crate::plan::ImprovementPlan;
use crate::types::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOutcome {
    Applied,
    Failed,
}

impl HistoryOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryOutcome::Applied => "applied",
            HistoryOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for HistoryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub plan_id: Uuid,
    pub agent_key: String,
    pub document_id: String,
    pub score_before: f64,
    pub target_score: f64,
    pub categories: Vec<Category>,
    pub outcome: HistoryOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_plan(plan: &ImprovementPlan, outcome: HistoryOutcome, error: Option<String>) -> Self {
        Self {
            plan_id: plan.id,
            agent_key: plan.agent.key.clone(),
            document_id: plan.document_id.clone(),
            score_before: plan.current_score,
            target_score: plan.target_score,
            categories: plan.root_causes.iter().map(|c| c.category).collect(),
            outcome,
            error,
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only log of improvement attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub entries: Vec<HistoryEntry>,
}

impl History {
    /// A missing history file reads as empty.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::history_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::history_path(root), data.as_bytes())
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        tracing::debug!(agent = %entry.agent_key, plan = %entry.plan_id, outcome = %entry.outcome, "history entry");
        self.entries.push(entry);
    }

    pub fn for_agent<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a HistoryEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.agent_key.eq_ignore_ascii_case(key))
    }
}
