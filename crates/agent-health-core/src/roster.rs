use crate::error::{HealthError, Result};
use crate::metrics::AgentIdentity;
use crate::paths;
use crate::types::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    pub key: String,
    pub role: Role,
    /// Set once a plan has been written into the agent's definition document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_improved_at: Option<DateTime<Utc>>,
}

impl Agent {
    pub fn new(name: impl Into<String>, key: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            role,
            last_improved_at: None,
        }
    }

    pub fn identity(&self) -> AgentIdentity {
        AgentIdentity::new(self.name.clone(), self.key.clone(), self.role.clone())
    }

    pub fn is_improved(&self) -> bool {
        self.last_improved_at.is_some()
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub agents: Vec<Agent>,
}

impl Roster {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::roster_path(root);
        if !path.exists() {
            return Err(HealthError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::roster_path(root), data.as_bytes())
    }

    /// Keys and slugs are both unique: two agents sharing a slug would share
    /// one definition document.
    pub fn add(&mut self, agent: Agent) -> Result<()> {
        let slug = agent.identity().slug()?;
        for existing in &self.agents {
            if existing.key.eq_ignore_ascii_case(&agent.key) {
                return Err(HealthError::AgentExists(agent.key));
            }
            if existing.identity().slug().ok().as_deref() == Some(slug.as_str()) {
                return Err(HealthError::AgentExists(format!(
                    "{} (slug '{slug}' is taken by {})",
                    agent.key, existing.key
                )));
            }
        }
        self.agents.push(agent);
        Ok(())
    }

    pub fn find(&self, needle: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.identity().matches(needle))
    }

    pub fn mark_improved(&mut self, key: &str, at: DateTime<Utc>) -> Result<()> {
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.key.eq_ignore_ascii_case(key))
            .ok_or_else(|| HealthError::AgentNotFound(key.to_string()))?;
        agent.last_improved_at = Some(at);
        tracing::debug!(agent = key, "marked improved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn roster() -> Roster {
        let mut r = Roster::default();
        r.add(Agent::new("Ana Lopez", "ana@agents.dev", Role::ProductOwner))
            .unwrap();
        r.add(Agent::new("Ops Bot", "ops@agents.dev", Role::DevOpsEngineer))
            .unwrap();
        r
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut r = roster();
        let err = r
            .add(Agent::new("Other", "ANA@agents.dev", Role::BackendDeveloper))
            .unwrap_err();
        assert!(matches!(err, HealthError::AgentExists(_)));
    }

    #[test]
    fn same_slug_different_key_rejected() {
        let mut r = roster();
        let err = r
            .add(Agent::new("Ana  Lopez!", "ana.lopez@other.dev", Role::BackendDeveloper))
            .unwrap_err();
        assert!(matches!(err, HealthError::AgentExists(ref msg) if msg.contains("ana-lopez")));
        assert_eq!(r.agents.len(), 2);
    }

    #[test]
    fn unsluggable_agent_rejected() {
        let mut r = Roster::default();
        assert!(r.add(Agent::new("", "", Role::BackendDeveloper)).is_err());
    }

    #[test]
    fn find_by_key_or_slug() {
        let r = roster();
        assert_eq!(r.find("ops-bot").unwrap().key, "ops@agents.dev");
        assert_eq!(r.find("ana@agents.dev").unwrap().name, "Ana Lopez");
        assert!(r.find("missing").is_none());
    }

    #[test]
    fn mark_improved_persists() {
        let dir = TempDir::new().unwrap();
        let mut r = roster();
        assert!(!r.agents[1].is_improved());
        r.mark_improved("ops@agents.dev", Utc::now()).unwrap();
        r.save(dir.path()).unwrap();

        let loaded = Roster::load(dir.path()).unwrap();
        assert!(loaded.find("ops-bot").unwrap().is_improved());
        assert!(!loaded.find("ana-lopez").unwrap().is_improved());
    }

    #[test]
    fn mark_unknown_agent_fails() {
        let mut r = roster();
        assert!(matches!(
            r.mark_improved("ghost@agents.dev", Utc::now()),
            Err(HealthError::AgentNotFound(_))
        ));
    }
}
