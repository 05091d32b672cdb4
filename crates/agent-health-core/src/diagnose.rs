use crate::config::Thresholds;
use crate::metrics::MetricsRecord;
use crate::score::ScoredAgent;
use crate::types::{Category, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quality issues are reported once the debt index reaches this level.
const HIGH_DEBT_INDEX: f64 = 40.0;

// ---------------------------------------------------------------------------
// RootCause
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCause {
    pub category: Category,
    pub severity: Severity,
    /// The sub-score that triggered this cause.
    pub score: f64,
    pub issues: Vec<String>,
    /// Raw values the issues were derived from.
    pub evidence: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Diagnosis
// ---------------------------------------------------------------------------

/// One cause per category scoring strictly below the trigger threshold, in
/// fixed category order. Empty when the agent is fine.
pub fn diagnose(agent: &ScoredAgent, thresholds: &Thresholds) -> Vec<RootCause> {
    Category::all()
        .iter()
        .filter_map(|&category| {
            let score = agent.health.sub_score(category);
            if score >= thresholds.sub_score_trigger_threshold {
                return None;
            }
            let (mut issues, evidence) = match category {
                Category::Productivity => productivity_issues(&agent.metrics, thresholds),
                Category::Quality => quality_issues(&agent.metrics),
                Category::Collaboration => collaboration_issues(&agent.metrics, thresholds),
                Category::Reliability => reliability_issues(&agent.metrics, thresholds),
            };
            if issues.is_empty() {
                issues.push(format!(
                    "{} score {:.1} is below {:.0}",
                    category.as_str(),
                    score,
                    thresholds.sub_score_trigger_threshold
                ));
            }
            Some(RootCause {
                category,
                severity: category.severity(),
                score,
                issues,
                evidence,
            })
        })
        .collect()
}

type Findings = (Vec<String>, BTreeMap<String, f64>);

fn productivity_issues(m: &MetricsRecord, t: &Thresholds) -> Findings {
    let mut issues = Vec::new();
    let mut evidence = BTreeMap::new();
    evidence.insert("commits".to_string(), m.commits as f64);
    evidence.insert("pull_requests".to_string(), m.pull_requests as f64);
    evidence.insert("lines_added".to_string(), m.lines_added as f64);

    if (m.commits as f64) < t.min_commits_per_window {
        issues.push(format!(
            "insufficient commit frequency ({} commits, expected at least {})",
            m.commits, t.min_commits_per_window
        ));
    }
    if (m.pull_requests as f64) < t.min_prs_per_window {
        issues.push(format!(
            "too few pull requests opened ({}, expected at least {})",
            m.pull_requests, t.min_prs_per_window
        ));
    }
    if m.commits > 0 && m.pull_requests == 0 {
        issues.push("commits are not reaching review through pull requests".to_string());
    }
    (issues, evidence)
}

fn quality_issues(m: &MetricsRecord) -> Findings {
    let mut issues = Vec::new();
    let mut evidence = BTreeMap::new();
    evidence.insert("bugs_introduced".to_string(), m.bugs_introduced as f64);
    evidence.insert("tech_debt_index".to_string(), m.tech_debt_index);

    if m.bugs_introduced > 0 {
        issues.push(format!(
            "{} bug(s) introduced in this window",
            m.bugs_introduced
        ));
    }
    if m.tech_debt_index >= HIGH_DEBT_INDEX {
        issues.push(format!(
            "high technical debt index ({:.1})",
            m.tech_debt_index
        ));
    }
    if m.lines_removed == 0 && m.lines_added > 0 {
        evidence.insert("lines_removed".to_string(), 0.0);
        issues.push("no refactoring activity (no lines removed)".to_string());
    }
    (issues, evidence)
}

fn collaboration_issues(m: &MetricsRecord, t: &Thresholds) -> Findings {
    let mut issues = Vec::new();
    let mut evidence = BTreeMap::new();
    evidence.insert("code_reviews".to_string(), m.code_reviews as f64);

    if m.code_reviews == 0 {
        issues.push("no code reviews performed".to_string());
    } else if (m.code_reviews as f64) < t.review_target {
        issues.push(format!(
            "insufficient code review participation ({} reviews, target {})",
            m.code_reviews, t.review_target
        ));
    }
    (issues, evidence)
}

fn reliability_issues(m: &MetricsRecord, t: &Thresholds) -> Findings {
    let mut issues = Vec::new();
    let mut evidence = BTreeMap::new();
    evidence.insert("velocity".to_string(), m.velocity);

    let expected = t.sub_score_trigger_threshold / 10.0;
    if m.velocity < expected {
        issues.push(format!(
            "low delivery velocity ({:.1}, expected at least {:.1})",
            m.velocity, expected
        ));
    }
    (issues, evidence)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
