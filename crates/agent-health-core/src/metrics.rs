use crate::error::{HealthError, Result};
use crate::paths;
use crate::types::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// AgentIdentity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub name: String,
    /// Stable email-like key; the agent's identity across windows.
    pub key: String,
    pub role: Role,
}

impl AgentIdentity {
    pub fn new(name: impl Into<String>, key: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            role,
        }
    }

    pub fn slug(&self) -> Result<String> {
        paths::agent_slug(&self.name, &self.key)
    }

    pub fn document_id(&self) -> Result<String> {
        Ok(paths::document_id(&self.slug()?))
    }

    /// True when `needle` names this agent by key or by slug.
    pub fn matches(&self, needle: &str) -> bool {
        self.key.eq_ignore_ascii_case(needle)
            || self.slug().map(|s| s == needle).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// ObservationWindow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ObservationWindow {
    /// The `days`-long window ending at `end`.
    pub fn ending_at(end: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: end - chrono::Duration::days(days),
            end,
        }
    }
}

// ---------------------------------------------------------------------------
// MetricsRecord
// ---------------------------------------------------------------------------

/// Activity summary for one agent over one observation window.
///
/// Counters are unsigned, so negative values are rejected when a batch is
/// parsed. The two derived inputs are floats and are checked by [`validate`].
///
/// [`validate`]: MetricsRecord::validate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub agent: AgentIdentity,
    pub window: ObservationWindow,
    pub commits: u32,
    pub pull_requests: u32,
    pub code_reviews: u32,
    pub bugs_introduced: u32,
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_removed: u64,
    pub tech_debt_index: f64,
    /// Pre-normalized by the producer to a small positive scale (roughly 0-10).
    pub velocity: f64,
}

impl MetricsRecord {
    pub fn validate(&self) -> Result<()> {
        if self.agent.name.trim().is_empty() && self.agent.key.trim().is_empty() {
            return Err(HealthError::InvalidMetricsRecord(
                "missing agent identity".to_string(),
            ));
        }
        if self.agent.key.trim().is_empty() {
            return Err(HealthError::InvalidMetricsRecord(format!(
                "agent '{}' has no key",
                self.agent.name
            )));
        }
        for (field, value) in [
            ("tech_debt_index", self.tech_debt_index),
            ("velocity", self.velocity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(HealthError::InvalidMetricsRecord(format!(
                    "{field} for '{}' must be a non-negative number, got {value}",
                    self.agent.key
                )));
            }
        }
        if self.window.end < self.window.start {
            return Err(HealthError::InvalidMetricsRecord(format!(
                "observation window for '{}' ends before it starts",
                self.agent.key
            )));
        }
        self.agent.slug().map_err(|_| {
            HealthError::InvalidMetricsRecord(format!(
                "cannot derive a slug for agent '{}'",
                self.agent.key
            ))
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Batch parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Json,
    Yaml,
}

impl RecordFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => RecordFormat::Yaml,
            _ => RecordFormat::Json,
        }
    }
}

/// Parse and validate a batch of records. Any shape error is reported as an
/// invalid record rather than a generic decode failure.
pub fn parse_records(data: &str, format: RecordFormat) -> Result<Vec<MetricsRecord>> {
    let records: Vec<MetricsRecord> = match format {
        RecordFormat::Json => serde_json::from_str(data)
            .map_err(|e| HealthError::InvalidMetricsRecord(e.to_string()))?,
        RecordFormat::Yaml => serde_yaml::from_str(data)
            .map_err(|e| HealthError::InvalidMetricsRecord(e.to_string()))?,
    };
    for record in &records {
        record.validate()?;
    }
    Ok(records)
}

pub fn load_records(path: &Path) -> Result<Vec<MetricsRecord>> {
    let data = std::fs::read_to_string(path)?;
    parse_records(&data, RecordFormat::from_path(path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn record(
        name: &str,
        role: Role,
        counters: (u32, u32, u32, u32),
        tech_debt_index: f64,
        velocity: f64,
    ) -> MetricsRecord {
        let (commits, pull_requests, code_reviews, bugs_introduced) = counters;
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        MetricsRecord {
            agent: AgentIdentity::new(
                name,
                format!("{}@agents.dev", crate::paths::slugify(name)),
                role,
            ),
            window: ObservationWindow::ending_at(end, 7),
            commits,
            pull_requests,
            code_reviews,
            bugs_introduced,
            lines_added: 0,
            lines_removed: 0,
            tech_debt_index,
            velocity,
        }
    }

    #[test]
    fn valid_record_passes() {
        let r = record("Backend Bot", Role::BackendDeveloper, (3, 1, 0, 4), 70.0, 2.0);
        r.validate().unwrap();
        assert_eq!(r.agent.document_id().unwrap(), "backend-bot-agent");
    }

    #[test]
    fn missing_identity_rejected() {
        let mut r = record("X", Role::BackendDeveloper, (1, 1, 1, 0), 0.0, 1.0);
        r.agent.name.clear();
        r.agent.key.clear();
        let err = r.validate().unwrap_err();
        assert!(err.to_string().contains("missing agent identity"));
    }

    #[test]
    fn negative_velocity_rejected() {
        let mut r = record("X", Role::BackendDeveloper, (1, 1, 1, 0), 0.0, 1.0);
        r.velocity = -0.5;
        assert!(matches!(
            r.validate(),
            Err(HealthError::InvalidMetricsRecord(_))
        ));
        r.velocity = f64::NAN;
        assert!(r.validate().is_err());
    }

    #[test]
    fn inverted_window_rejected() {
        let mut r = record("X", Role::BackendDeveloper, (1, 1, 1, 0), 0.0, 1.0);
        std::mem::swap(&mut r.window.start, &mut r.window.end);
        assert!(r.validate().is_err());
    }

    #[test]
    fn negative_counter_in_json_is_invalid_record() {
        let json = r#"[{
            "agent": {"name": "Ops", "key": "ops@agents.dev", "role": "DevOps Engineer"},
            "window": {"start": "2026-02-22T00:00:00Z", "end": "2026-03-01T00:00:00Z"},
            "commits": -1, "pull_requests": 0, "code_reviews": 0, "bugs_introduced": 0,
            "tech_debt_index": 10.0, "velocity": 3.0
        }]"#;
        assert!(matches!(
            parse_records(json, RecordFormat::Json),
            Err(HealthError::InvalidMetricsRecord(_))
        ));
    }

    #[test]
    fn yaml_batch_parses() {
        let yaml = "\
- agent:
    name: Frontend Bot
    key: frontend@agents.dev
    role: Frontend Developer
  window:
    start: 2026-02-22T00:00:00Z
    end: 2026-03-01T00:00:00Z
  commits: 6
  pull_requests: 2
  code_reviews: 3
  bugs_introduced: 1
  lines_added: 420
  lines_removed: 80
  tech_debt_index: 22.5
  velocity: 6.5
";
        let records = parse_records(yaml, RecordFormat::Yaml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent.role, Role::FrontendDeveloper);
        assert_eq!(records[0].lines_added, 420);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(RecordFormat::from_path(Path::new("m.yml")), RecordFormat::Yaml);
        assert_eq!(RecordFormat::from_path(Path::new("m.json")), RecordFormat::Json);
        assert_eq!(RecordFormat::from_path(Path::new("m")), RecordFormat::Json);
    }

    #[test]
    fn identity_matches_key_or_slug() {
        let id = AgentIdentity::new("Ana Lopez", "ana@agents.dev", Role::ProductOwner);
        assert!(id.matches("ANA@agents.dev"));
        assert!(id.matches("ana-lopez"));
        assert!(!id.matches("ana"));
    }
}
