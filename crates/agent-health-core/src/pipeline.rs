use crate::config::Config;
use crate::document::{DocumentMutator, DocumentStore, MutationReport};
use crate::error::{HealthError, Result};
use crate::metrics::MetricsRecord;
use crate::plan::ImprovementPlan;
use crate::score::{score_all, ScoredAgent};
use crate::team::{rank, TeamAnalysis};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// AgentState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Unscored,
    Scored,
    Diagnosed,
    Planned,
    DocumentUpdated,
    DocumentUpdateFailed,
    HealthyNoAction,
}

impl AgentState {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentState::Unscored => "unscored",
            AgentState::Scored => "scored",
            AgentState::Diagnosed => "diagnosed",
            AgentState::Planned => "planned",
            AgentState::DocumentUpdated => "document_updated",
            AgentState::DocumentUpdateFailed => "document_update_failed",
            AgentState::HealthyNoAction => "healthy_no_action",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AgentState::DocumentUpdated
                | AgentState::DocumentUpdateFailed
                | AgentState::HealthyNoAction
        )
    }

    /// Forward-only; terminal states go nowhere.
    pub fn can_advance_to(self, next: AgentState) -> bool {
        use AgentState::*;
        matches!(
            (self, next),
            (Unscored, Scored)
                | (Scored, Diagnosed)
                | (Diagnosed, Planned)
                | (Diagnosed, HealthyNoAction)
                | (Diagnosed, DocumentUpdateFailed)
                | (Planned, DocumentUpdated)
                | (Planned, DocumentUpdateFailed)
        )
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AgentOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub agent_key: String,
    pub state: AgentState,
    /// States visited, in order, starting at `unscored`.
    pub trail: Vec<AgentState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ImprovementPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<MutationReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentOutcome {
    fn start(agent_key: &str) -> Self {
        Self {
            agent_key: agent_key.to_string(),
            state: AgentState::Unscored,
            trail: vec![AgentState::Unscored],
            plan: None,
            mutation: None,
            error: None,
        }
    }

    fn advance(&mut self, next: AgentState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(agent = %self.agent_key, from = %self.state, to = %next, "state change");
        self.state = next;
        self.trail.push(next);
    }
}

// ---------------------------------------------------------------------------
// PipelineReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub analysis: TeamAnalysis,
    pub outcomes: Vec<AgentOutcome>,
}

impl PipelineReport {
    pub fn improved(&self) -> impl Iterator<Item = &AgentOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == AgentState::DocumentUpdated)
    }

    pub fn failed(&self) -> impl Iterator<Item = &AgentOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == AgentState::DocumentUpdateFailed)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Score and rank a batch of records.
pub fn analyze(records: Vec<MetricsRecord>, config: &Config) -> Result<TeamAnalysis> {
    let scored = score_all(records, &config.thresholds)?;
    rank(scored)
}

pub struct Pipeline<'a, S: DocumentStore> {
    config: &'a Config,
    mutator: &'a DocumentMutator<S>,
}

impl<'a, S: DocumentStore> Pipeline<'a, S> {
    pub fn new(config: &'a Config, mutator: &'a DocumentMutator<S>) -> Self {
        Self { config, mutator }
    }

    /// Diagnose, plan and, when there is something to fix, update the
    /// agent's document. Never fails; errors end in `document_update_failed`.
    pub fn improve_agent(&self, agent: &ScoredAgent) -> AgentOutcome {
        let mut outcome = AgentOutcome::start(&agent.identity().key);
        outcome.advance(AgentState::Scored);

        let plan = ImprovementPlan::build(agent, &self.config.thresholds, &self.config.policy);
        outcome.advance(AgentState::Diagnosed);

        let plan = match plan {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                outcome.advance(AgentState::HealthyNoAction);
                return outcome;
            }
            Err(e) => {
                // No plan, so no document to address.
                tracing::warn!(agent = %outcome.agent_key, error = %e, "plan could not be built");
                outcome.error = Some(e.to_string());
                outcome.advance(AgentState::DocumentUpdateFailed);
                return outcome;
            }
        };
        outcome.advance(AgentState::Planned);

        match self.mutator.apply_plan(&plan, &plan.document_id) {
            Ok(report) => {
                outcome.mutation = Some(report);
                outcome.advance(AgentState::DocumentUpdated);
            }
            Err(e) => {
                tracing::warn!(agent = %outcome.agent_key, document = %plan.document_id, error = %e, "document update failed");
                outcome.error = Some(e.to_string());
                outcome.advance(AgentState::DocumentUpdateFailed);
            }
        }
        outcome.plan = Some(plan);
        outcome
    }

    /// Rank the team and run the lowest scorer through the pipeline.
    pub fn improve_worst(&self, records: Vec<MetricsRecord>) -> Result<PipelineReport> {
        let analysis = analyze(records, self.config)?;
        let lowest = analysis.lowest().ok_or(HealthError::EmptyTeam)?;
        let outcome = self.improve_agent(lowest);
        Ok(PipelineReport {
            analysis,
            outcomes: vec![outcome],
        })
    }

    /// Run every agent, worst first. One agent's failure does not stop the rest.
    pub fn improve_all(&self, records: Vec<MetricsRecord>) -> Result<PipelineReport> {
        let analysis = analyze(records, self.config)?;
        let outcomes = analysis
            .ranked
            .iter()
            .map(|agent| self.improve_agent(agent))
            .collect();
        let report = PipelineReport { analysis, outcomes };
        tracing::info!(
            agents = report.outcomes.len(),
            updated = report.improved().count(),
            failed = report.failed().count(),
            "improvement run finished"
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::document::MemoryDocumentStore;
    use crate::metrics::tests::record;
    use crate::plan::PLAN_MARKER;
    use crate::score::score;
    use crate::types::Role;

    fn records() -> Vec<MetricsRecord> {
        vec![
            record("Healthy Bot", Role::BackendDeveloper, (14, 6, 6, 0), 5.0, 9.0),
            record("Critical Bot", Role::FrontendDeveloper, (3, 1, 0, 4), 70.0, 2.0),
            record("Warning Bot", Role::DevOpsEngineer, (5, 2, 1, 2), 30.0, 6.0),
        ]
    }

    fn store() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        store.insert("healthy-bot-agent", "# Healthy Bot\n");
        store.insert("critical-bot-agent", "# Critical Bot\n");
        store
    }

    #[test]
    fn transitions_are_forward_only() {
        assert!(AgentState::Unscored.can_advance_to(AgentState::Scored));
        assert!(AgentState::Diagnosed.can_advance_to(AgentState::HealthyNoAction));
        assert!(!AgentState::DocumentUpdated.can_advance_to(AgentState::Unscored));
        assert!(!AgentState::Scored.can_advance_to(AgentState::Planned));
        assert!(AgentState::Diagnosed.can_advance_to(AgentState::DocumentUpdateFailed));
        assert!(!AgentState::Planned.can_advance_to(AgentState::HealthyNoAction));
        assert!(AgentState::HealthyNoAction.is_terminal());
        assert!(!AgentState::Planned.is_terminal());
    }

    #[test]
    fn improve_worst_updates_lowest_scorer() {
        let config = Config::default();
        let mutator = DocumentMutator::new(store());
        let report = Pipeline::new(&config, &mutator)
            .improve_worst(records())
            .unwrap();

        assert_eq!(report.outcomes.len(), 1);
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.agent_key, "critical-bot@agents.dev");
        assert_eq!(outcome.state, AgentState::DocumentUpdated);
        assert_eq!(
            outcome.trail,
            [
                AgentState::Unscored,
                AgentState::Scored,
                AgentState::Diagnosed,
                AgentState::Planned,
                AgentState::DocumentUpdated
            ]
        );
        let doc = mutator.store().get("critical-bot-agent").unwrap();
        assert!(doc.contains(PLAN_MARKER));
        assert_eq!(mutator.improved_agents(), ["critical-bot@agents.dev"]);
    }

    #[test]
    fn healthy_agent_is_never_mutated() {
        let config = Config::default();
        let mutator = DocumentMutator::new(store());
        let pipeline = Pipeline::new(&config, &mutator);
        let report = pipeline
            .improve_all(vec![records().remove(0)])
            .unwrap();
        assert_eq!(report.outcomes[0].state, AgentState::HealthyNoAction);
        assert!(report.outcomes[0].plan.is_none());
        assert_eq!(mutator.store().get("healthy-bot-agent").unwrap(), "# Healthy Bot\n");
        assert!(mutator.improved_agents().is_empty());
    }

    #[test]
    fn improve_all_continues_past_failures() {
        let config = Config::default();
        let mutator = DocumentMutator::new(store());
        let report = Pipeline::new(&config, &mutator)
            .improve_all(records())
            .unwrap();

        let states: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| (o.agent_key.as_str(), o.state))
            .collect();
        assert_eq!(
            states,
            [
                ("critical-bot@agents.dev", AgentState::DocumentUpdated),
                // warning-bot has no definition document
                ("warning-bot@agents.dev", AgentState::DocumentUpdateFailed),
                ("healthy-bot@agents.dev", AgentState::HealthyNoAction),
            ]
        );
        let failed: Vec<_> = report.failed().collect();
        assert!(failed[0].error.as_deref().unwrap().contains("warning-bot-agent"));
        assert!(failed[0].plan.is_some());
        assert_eq!(report.improved().count(), 1);
        assert!(mutator.store().get("warning-bot-agent").is_none());
    }

    #[test]
    fn plan_failure_skips_planned_state() {
        let config = Config::default();
        let mutator = DocumentMutator::new(store());
        let mut metrics = record("Critical Bot", Role::BackendDeveloper, (3, 1, 0, 4), 70.0, 2.0);
        metrics.agent.name = "!!!".to_string();
        metrics.agent.key = "@agents.dev".to_string();
        let health = score(&metrics, &Thresholds::default());
        let agent = ScoredAgent { metrics, health };

        let outcome = Pipeline::new(&config, &mutator).improve_agent(&agent);
        assert_eq!(
            outcome.trail,
            [
                AgentState::Unscored,
                AgentState::Scored,
                AgentState::Diagnosed,
                AgentState::DocumentUpdateFailed
            ]
        );
        assert!(outcome.plan.is_none());
        assert!(outcome.error.is_some());
        assert!(mutator.improved_agents().is_empty());
    }

    #[test]
    fn agents_sharing_a_document_stop_the_batch() {
        let config = Config::default();
        let store = MemoryDocumentStore::new();
        store.insert("bot-agent", "# Bot\n");
        let mutator = DocumentMutator::new(store);

        let mut alice = record("Bot", Role::BackendDeveloper, (3, 1, 0, 4), 70.0, 2.0);
        alice.agent.key = "alice@agents.dev".to_string();
        let mut bob = alice.clone();
        bob.agent.key = "bob@agents.dev".to_string();

        let err = Pipeline::new(&config, &mutator)
            .improve_all(vec![alice, bob])
            .unwrap_err();
        assert!(matches!(err, HealthError::InvalidMetricsRecord(_)));
        assert_eq!(mutator.store().get("bot-agent").unwrap(), "# Bot\n");
        assert!(mutator.improved_agents().is_empty());
    }

    #[test]
    fn empty_batch_is_rejected() {
        let config = Config::default();
        let mutator = DocumentMutator::new(store());
        let err = Pipeline::new(&config, &mutator)
            .improve_worst(Vec::new())
            .unwrap_err();
        assert!(matches!(err, HealthError::EmptyTeam));
    }

    #[test]
    fn invalid_record_stops_the_batch_before_scoring() {
        let config = Config::default();
        let mut batch = records();
        batch[1].agent.key.clear();
        assert!(matches!(
            analyze(batch, &config),
            Err(HealthError::InvalidMetricsRecord(_))
        ));
    }
}
