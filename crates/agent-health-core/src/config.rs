use crate::error::{HealthError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Targets and cut-offs consumed by scoring and diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_min_commits")]
    pub min_commits_per_window: f64,
    #[serde(default = "default_min_prs")]
    pub min_prs_per_window: f64,
    #[serde(default = "default_review_target")]
    pub review_target: f64,
    #[serde(default = "default_critical")]
    pub critical_overall_threshold: f64,
    #[serde(default = "default_warning")]
    pub warning_overall_threshold: f64,
    #[serde(default = "default_trigger")]
    pub sub_score_trigger_threshold: f64,
}

fn default_min_commits() -> f64 {
    5.0
}

fn default_min_prs() -> f64 {
    2.0
}

fn default_review_target() -> f64 {
    3.0
}

fn default_critical() -> f64 {
    60.0
}

fn default_warning() -> f64 {
    80.0
}

fn default_trigger() -> f64 {
    60.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_commits_per_window: default_min_commits(),
            min_prs_per_window: default_min_prs(),
            review_target: default_review_target(),
            critical_overall_threshold: default_critical(),
            warning_overall_threshold: default_warning(),
            sub_score_trigger_threshold: default_trigger(),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Constants used when turning root causes into plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Reviews an agent should aim for per window.
    #[serde(default = "default_review_goal")]
    pub review_goal: u32,
    /// Never ask for fewer reviews than this, even when the goal is met.
    #[serde(default = "default_review_floor")]
    pub review_floor: u32,
    #[serde(default = "default_target_increment")]
    pub target_increment: f64,
    #[serde(default = "default_target_cap")]
    pub target_cap: f64,
}

fn default_review_goal() -> u32 {
    5
}

fn default_review_floor() -> u32 {
    2
}

fn default_target_increment() -> f64 {
    25.0
}

fn default_target_cap() -> f64 {
    85.0
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            review_goal: default_review_goal(),
            review_floor: default_review_floor(),
            target_increment: default_target_increment(),
            target_cap: default_target_cap(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: u32,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub policy: Policy,
    /// Directory, relative to the project root, holding agent definition documents.
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,
}

fn default_documents_dir() -> String {
    paths::DEFAULT_DOCUMENTS_DIR.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            thresholds: Thresholds::default(),
            policy: Policy::default(),
            documents_dir: default_documents_dir(),
        }
    }
}

impl Config {
    pub fn documents_path(&self, root: &Path) -> PathBuf {
        root.join(&self.documents_dir)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(HealthError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let t = &self.thresholds;

        for (name, value) in [
            ("min_commits_per_window", t.min_commits_per_window),
            ("min_prs_per_window", t.min_prs_per_window),
            ("review_target", t.review_target),
        ] {
            if !value.is_finite() || value <= 0.0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "thresholds.{name} is {value}; the target counts as always met"
                    ),
                });
            }
        }

        for (name, value) in [
            ("critical_overall_threshold", t.critical_overall_threshold),
            ("warning_overall_threshold", t.warning_overall_threshold),
            ("sub_score_trigger_threshold", t.sub_score_trigger_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("thresholds.{name} must be within 0-100, got {value}"),
                });
            }
        }

        if t.warning_overall_threshold <= t.critical_overall_threshold {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "thresholds.warning_overall_threshold ({}) must be above critical_overall_threshold ({})",
                    t.warning_overall_threshold, t.critical_overall_threshold
                ),
            });
        }

        if self.policy.review_floor > self.policy.review_goal {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "policy.review_floor ({}) exceeds policy.review_goal ({})",
                    self.policy.review_floor, self.policy.review_goal
                ),
            });
        }

        if !(0.0..=100.0).contains(&self.policy.target_cap) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "policy.target_cap must be within 0-100, got {}",
                    self.policy.target_cap
                ),
            });
        }

        if self.documents_dir.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "documents_dir must not be empty".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_policy_values() {
        let t = Thresholds::default();
        assert_eq!(t.review_target, 3.0);
        assert_eq!(t.critical_overall_threshold, 60.0);
        assert_eq!(t.warning_overall_threshold, 80.0);
        assert_eq!(t.sub_score_trigger_threshold, 60.0);
        let p = Policy::default();
        assert_eq!(p.target_increment, 25.0);
        assert_eq!(p.target_cap, 85.0);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "version: 1\nthresholds:\n  min_commits_per_window: 8\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.thresholds.min_commits_per_window, 8.0);
        assert_eq!(cfg.thresholds.min_prs_per_window, 2.0);
        assert_eq!(cfg.policy.review_goal, 5);
        assert_eq!(cfg.documents_dir, ".claude/agents");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.thresholds.review_target = 4.0;
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.thresholds.review_target, 4.0);
    }

    #[test]
    fn load_without_init_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(HealthError::NotInitialized)
        ));
    }

    #[test]
    fn validate_default_config_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_inverted_status_thresholds() {
        let mut cfg = Config::default();
        cfg.thresholds.warning_overall_threshold = 50.0;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("must be above")));
    }

    #[test]
    fn validate_zero_target_warns() {
        let mut cfg = Config::default();
        cfg.thresholds.review_target = 0.0;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(warnings[0].message.contains("review_target"));
    }
}
