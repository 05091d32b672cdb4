use crate::error::{HealthError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const HEALTH_DIR: &str = ".agent-health";

pub const CONFIG_FILE: &str = ".agent-health/config.yaml";
pub const ROSTER_FILE: &str = ".agent-health/roster.yaml";
pub const HISTORY_FILE: &str = ".agent-health/history.yaml";

pub const DEFAULT_DOCUMENTS_DIR: &str = ".claude/agents";
pub const DOCUMENT_EXTENSION: &str = "md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn health_dir(root: &Path) -> PathBuf {
    root.join(HEALTH_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn roster_path(root: &Path) -> PathBuf {
    root.join(ROSTER_FILE)
}

pub fn history_path(root: &Path) -> PathBuf {
    root.join(HISTORY_FILE)
}

// ---------------------------------------------------------------------------
// Slugs and document ids
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(HealthError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// Lowercase, collapse every run of non-alphanumerics into one hyphen.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(64);
    slug.trim_end_matches('-').to_string()
}

/// Stable slug for an agent: derived from its display name, falling back to
/// the local part of its key when the name has no usable characters.
pub fn agent_slug(name: &str, key: &str) -> Result<String> {
    let mut slug = slugify(name);
    if slug.is_empty() {
        slug = slugify(key.split('@').next().unwrap_or(key));
    }
    validate_slug(&slug)?;
    Ok(slug)
}

/// Definition document id for an agent slug.
pub fn document_id(slug: &str) -> String {
    format!("{slug}-agent")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_slugs() {
        for slug in ["backend-bot", "a", "agent-123", "x1"] {
            validate_slug(slug).unwrap_or_else(|_| panic!("expected valid: {slug}"));
        }
    }

    #[test]
    fn invalid_slugs() {
        for slug in ["", "-leading", "trailing-", "has spaces", "UPPER", "a_b"] {
            assert!(validate_slug(slug).is_err(), "expected invalid: {slug}");
        }
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Backend Bot"), "backend-bot");
        assert_eq!(slugify("  DevOps -- Agent (v2) "), "devops-agent-v2");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn agent_slug_falls_back_to_key() {
        assert_eq!(agent_slug("Ana Lopez", "ana@example.com").unwrap(), "ana-lopez");
        assert_eq!(agent_slug("***", "ops.bot@example.com").unwrap(), "ops-bot");
        assert!(agent_slug("", "").is_err());
    }

    #[test]
    fn document_id_is_deterministic() {
        assert_eq!(document_id("frontend-bot"), "frontend-bot-agent");
        assert_eq!(document_id("frontend-bot"), document_id("frontend-bot"));
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.agent-health/config.yaml")
        );
        assert_eq!(
            history_path(root),
            PathBuf::from("/tmp/proj/.agent-health/history.yaml")
        );
    }
}
