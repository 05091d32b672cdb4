use crate::error::{HealthError, Result};
use crate::score::ScoredAgent;
use crate::types::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// TeamAnalysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamAnalysis {
    /// Ascending by overall score; ties keep input order.
    pub ranked: Vec<ScoredAgent>,
    /// Keys of agents in each status bucket, in ranked order.
    pub critical: Vec<String>,
    pub warning: Vec<String>,
    pub healthy: Vec<String>,
    pub team_average: f64,
    pub computed_at: DateTime<Utc>,
}

impl TeamAnalysis {
    /// Lowest scorer. `None` only for an analysis not built by [`rank`].
    pub fn lowest(&self) -> Option<&ScoredAgent> {
        self.ranked.first()
    }

    pub fn highest(&self) -> Option<&ScoredAgent> {
        self.ranked.last()
    }

    pub fn in_status(&self, status: Status) -> impl Iterator<Item = &ScoredAgent> {
        self.ranked.iter().filter(move |a| a.health.status == status)
    }

    pub fn find(&self, needle: &str) -> Option<&ScoredAgent> {
        self.ranked.iter().find(|a| a.identity().matches(needle))
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Sort a team worst-first and bucket it by status.
pub fn rank(scored: Vec<ScoredAgent>) -> Result<TeamAnalysis> {
    if scored.is_empty() {
        return Err(HealthError::EmptyTeam);
    }

    let mut ranked = scored;
    // `sort_by` is stable, so equal scores keep their input order.
    ranked.sort_by(|a, b| {
        a.health
            .overall
            .partial_cmp(&b.health.overall)
            .unwrap_or(Ordering::Equal)
    });

    let mut critical = Vec::new();
    let mut warning = Vec::new();
    let mut healthy = Vec::new();
    for agent in &ranked {
        let key = agent.identity().key.clone();
        match agent.health.status {
            Status::Critical => critical.push(key),
            Status::Warning => warning.push(key),
            Status::Healthy => healthy.push(key),
        }
    }

    let team_average =
        ranked.iter().map(|a| a.health.overall).sum::<f64>() / ranked.len() as f64;

    Ok(TeamAnalysis {
        ranked,
        critical,
        warning,
        healthy,
        team_average,
        computed_at: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::metrics::tests::record;
    use crate::score::score_all;
    use crate::types::Role;

    fn team() -> Vec<ScoredAgent> {
        score_all(
            vec![
                record("Healthy Bot", Role::BackendDeveloper, (14, 6, 6, 0), 5.0, 9.0),
                record("Critical Bot", Role::FrontendDeveloper, (3, 1, 0, 4), 70.0, 2.0),
                record("Warning Bot", Role::DevOpsEngineer, (5, 2, 2, 2), 30.0, 6.0),
            ],
            &Thresholds::default(),
        )
        .unwrap()
    }

    #[test]
    fn empty_team_is_an_error() {
        assert!(matches!(rank(Vec::new()), Err(HealthError::EmptyTeam)));
    }

    #[test]
    fn deserialized_empty_analysis_has_no_extremes() {
        let analysis: TeamAnalysis = serde_json::from_str(
            r#"{"ranked":[],"critical":[],"warning":[],"healthy":[],"team_average":0.0,"computed_at":"2026-03-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(analysis.lowest().is_none());
        assert!(analysis.highest().is_none());
    }

    #[test]
    fn ranks_ascending_and_partitions() {
        let analysis = rank(team()).unwrap();
        let names: Vec<_> = analysis
            .ranked
            .iter()
            .map(|a| a.identity().name.as_str())
            .collect();
        assert_eq!(names, ["Critical Bot", "Warning Bot", "Healthy Bot"]);
        assert_eq!(analysis.lowest().unwrap().identity().name, "Critical Bot");
        assert_eq!(analysis.highest().unwrap().identity().name, "Healthy Bot");
        assert_eq!(analysis.critical, ["critical-bot@agents.dev"]);
        assert_eq!(analysis.warning, ["warning-bot@agents.dev"]);
        assert_eq!(analysis.healthy, ["healthy-bot@agents.dev"]);
        assert_eq!(analysis.in_status(Status::Warning).count(), 1);
    }

    #[test]
    fn team_average_is_unweighted_mean() {
        let scored = team();
        let expected =
            scored.iter().map(|a| a.health.overall).sum::<f64>() / scored.len() as f64;
        let analysis = rank(scored).unwrap();
        assert!((analysis.team_average - expected).abs() < 1e-9);
    }

    #[test]
    fn ties_keep_input_order() {
        let scored = score_all(
            vec![
                record("First", Role::BackendDeveloper, (3, 1, 0, 4), 70.0, 2.0),
                record("Second", Role::ProductOwner, (3, 1, 0, 4), 70.0, 2.0),
                record("Third", Role::DevOpsEngineer, (3, 1, 0, 4), 70.0, 2.0),
            ],
            &Thresholds::default(),
        )
        .unwrap();
        let analysis = rank(scored).unwrap();
        let names: Vec<_> = analysis
            .ranked
            .iter()
            .map(|a| a.identity().name.as_str())
            .collect();
        assert_eq!(names, ["First", "Second", "Third"]);
        assert_eq!(analysis.lowest().unwrap().identity().name, "First");
        assert_eq!(analysis.highest().unwrap().identity().name, "Third");
    }

    #[test]
    fn single_agent_is_both_extremes() {
        let scored = score_all(
            vec![record("Solo", Role::BackendDeveloper, (5, 2, 3, 0), 0.0, 8.0)],
            &Thresholds::default(),
        )
        .unwrap();
        let analysis = rank(scored).unwrap();
        let lowest = analysis.lowest().unwrap();
        let highest = analysis.highest().unwrap();
        assert_eq!(lowest.identity().key, highest.identity().key);
    }

    #[test]
    fn find_by_slug() {
        let analysis = rank(team()).unwrap();
        assert!(analysis.find("warning-bot").is_some());
        assert!(analysis.find("nobody").is_none());
    }
}
