use crate::config::{Policy, Thresholds};
use crate::diagnose::{diagnose, RootCause};
use crate::error::Result;
use crate::metrics::AgentIdentity;
use crate::recommend::{recommend, ActionItem, Recommendation};
use crate::score::{display_score, ScoredAgent};
use crate::types::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// Heading that opens the managed section in a definition document.
pub const PLAN_MARKER: &str = "## Performance Improvement Plan";

// ---------------------------------------------------------------------------
// ImprovementPlan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementPlan {
    pub id: Uuid,
    pub agent: AgentIdentity,
    pub document_id: String,
    pub current_score: f64,
    pub status: Status,
    pub target_score: f64,
    pub root_causes: Vec<RootCause>,
    pub recommendations: Vec<Recommendation>,
    /// Markdown block ready for insertion, starting with [`PLAN_MARKER`].
    pub instructions: String,
    pub created_at: DateTime<Utc>,
}

/// `min(current + increment, cap)`. May sit below `current` for agents that
/// already score above the cap.
pub fn target_score(current: f64, policy: &Policy) -> f64 {
    (current + policy.target_increment).min(policy.target_cap)
}

impl ImprovementPlan {
    /// Diagnose and plan for one agent. `None` when there is nothing to fix.
    pub fn build(
        agent: &ScoredAgent,
        thresholds: &Thresholds,
        policy: &Policy,
    ) -> Result<Option<Self>> {
        let root_causes = diagnose(agent, thresholds);
        if root_causes.is_empty() {
            return Ok(None);
        }
        let recommendations = recommend(&root_causes, agent, thresholds, policy);
        Self::assemble(agent, root_causes, recommendations, policy).map(Some)
    }

    pub fn assemble(
        agent: &ScoredAgent,
        root_causes: Vec<RootCause>,
        recommendations: Vec<Recommendation>,
        policy: &Policy,
    ) -> Result<Self> {
        let identity = agent.identity().clone();
        let document_id = identity.document_id()?;
        let current_score = agent.health.overall;
        let mut plan = Self {
            id: Uuid::new_v4(),
            agent: identity,
            document_id,
            current_score,
            status: agent.health.status,
            target_score: target_score(current_score, policy),
            root_causes,
            recommendations,
            instructions: String::new(),
            created_at: Utc::now(),
        };
        plan.instructions = render(&plan);
        Ok(plan)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_action(action: &ActionItem) -> String {
    match &action.target {
        Some(t) => format!("{}: {} {}", action.description, t.value, t.unit),
        None => action.description.clone(),
    }
}

/// Render the plan as a markdown section. Only headings of level 3 and
/// deeper appear below the marker, so the section ends at the next level 1
/// or 2 heading.
pub fn render(plan: &ImprovementPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{PLAN_MARKER}");
    out.push('\n');
    let _ = writeln!(
        out,
        "Current score: {} ({}). Target score: {}.",
        display_score(plan.current_score),
        plan.status,
        display_score(plan.target_score)
    );
    let _ = writeln!(out, "Plan {} generated {}.", plan.id, plan.created_at.to_rfc3339());

    out.push_str("\n### Root causes\n\n");
    for cause in &plan.root_causes {
        let _ = writeln!(
            out,
            "- **{}** ({}, score {}): {}",
            cause.category.label(),
            cause.severity,
            display_score(cause.score),
            cause.issues.join("; ")
        );
    }

    out.push_str("\n### Action plan\n");
    for (i, rec) in plan.recommendations.iter().enumerate() {
        let _ = write!(out, "\n#### {}. {} ({})\n\n", i + 1, rec.title, rec.priority);
        for action in &rec.actions {
            let _ = writeln!(out, "- {}", render_action(action));
        }
    }

    out.push_str("\n### Operating instructions\n\n");
    for rec in &plan.recommendations {
        for line in &rec.instructions {
            let _ = writeln!(out, "- {line}");
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
