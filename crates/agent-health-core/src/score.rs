use crate::config::Thresholds;
use crate::error::{HealthError, Result};
use crate::metrics::{AgentIdentity, MetricsRecord};
use crate::types::{Category, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

pub const PRODUCTIVITY_WEIGHT: f64 = 0.30;
pub const QUALITY_WEIGHT: f64 = 0.35;
pub const COLLABORATION_WEIGHT: f64 = 0.20;
pub const RELIABILITY_WEIGHT: f64 = 0.15;

/// Quality points lost per bug introduced.
const BUG_PENALTY: f64 = 10.0;
/// Velocity is expected on a 0-10 scale.
const VELOCITY_SCALE: f64 = 10.0;

// ---------------------------------------------------------------------------
// HealthScore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub productivity: f64,
    pub quality: f64,
    pub collaboration: f64,
    pub reliability: f64,
    /// Weighted sum of the four sub-scores. Never rounded here.
    pub overall: f64,
    pub status: Status,
    pub computed_at: DateTime<Utc>,
}

impl HealthScore {
    pub fn sub_score(&self, category: Category) -> f64 {
        match category {
            Category::Productivity => self.productivity,
            Category::Quality => self.quality,
            Category::Collaboration => self.collaboration,
            Category::Reliability => self.reliability,
        }
    }
}

/// Round once, for display.
pub fn display_score(value: f64) -> String {
    format!("{value:.1}")
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Percentage of `target` reached, capped at 100. A non-positive target is
/// always met.
fn ratio_score(value: f64, target: f64) -> f64 {
    if target <= 0.0 || !target.is_finite() {
        return 100.0;
    }
    clamp_score(value / target * 100.0)
}

pub fn weighted_overall(productivity: f64, quality: f64, collaboration: f64, reliability: f64) -> f64 {
    productivity * PRODUCTIVITY_WEIGHT
        + quality * QUALITY_WEIGHT
        + collaboration * COLLABORATION_WEIGHT
        + reliability * RELIABILITY_WEIGHT
}

/// Map an overall score to a status. Monotonic: a higher score never yields
/// a worse status.
pub fn status_for(overall: f64, thresholds: &Thresholds) -> Status {
    if overall < thresholds.critical_overall_threshold {
        Status::Critical
    } else if overall < thresholds.warning_overall_threshold {
        Status::Warning
    } else {
        Status::Healthy
    }
}

/// Score one record. Total over validated input.
pub fn score(metrics: &MetricsRecord, thresholds: &Thresholds) -> HealthScore {
    let productivity = clamp_score(
        (ratio_score(metrics.commits as f64, thresholds.min_commits_per_window)
            + ratio_score(
                metrics.pull_requests as f64,
                thresholds.min_prs_per_window,
            ))
            / 2.0,
    );

    let bug_term = clamp_score(100.0 - metrics.bugs_introduced as f64 * BUG_PENALTY);
    let debt_term = clamp_score(100.0 - metrics.tech_debt_index);
    let quality = clamp_score((bug_term + debt_term) / 2.0);

    let collaboration = ratio_score(metrics.code_reviews as f64, thresholds.review_target);
    let reliability = clamp_score(metrics.velocity * VELOCITY_SCALE);

    let overall = clamp_score(weighted_overall(
        productivity,
        quality,
        collaboration,
        reliability,
    ));

    HealthScore {
        productivity,
        quality,
        collaboration,
        reliability,
        overall,
        status: status_for(overall, thresholds),
        computed_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// ScoredAgent
// ---------------------------------------------------------------------------

/// A record paired with the score computed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAgent {
    pub metrics: MetricsRecord,
    pub health: HealthScore,
}

impl ScoredAgent {
    /// Validate then score. Invalid records never reach the scoring formulas.
    pub fn evaluate(metrics: MetricsRecord, thresholds: &Thresholds) -> Result<Self> {
        metrics.validate()?;
        let health = score(&metrics, thresholds);
        Ok(Self { metrics, health })
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.metrics.agent
    }
}

/// Validate, check the batch for agents that would collide, then score.
///
/// A key may appear once per batch, and no two agents may map to the same
/// definition document.
pub fn score_all(records: Vec<MetricsRecord>, thresholds: &Thresholds) -> Result<Vec<ScoredAgent>> {
    let mut keys: HashSet<String> = HashSet::new();
    let mut documents: HashMap<String, &str> = HashMap::new();
    for record in &records {
        record.validate()?;
        let key = record.agent.key.to_ascii_lowercase();
        if !keys.insert(key) {
            return Err(HealthError::InvalidMetricsRecord(format!(
                "agent '{}' appears more than once in the batch",
                record.agent.key
            )));
        }
        let document_id = record.agent.document_id()?;
        if let Some(other) = documents.insert(document_id.clone(), &record.agent.key) {
            return Err(HealthError::InvalidMetricsRecord(format!(
                "agents '{other}' and '{}' both map to document {document_id}",
                record.agent.key
            )));
        }
    }

    records
        .into_iter()
        .map(|r| ScoredAgent::evaluate(r, thresholds))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
