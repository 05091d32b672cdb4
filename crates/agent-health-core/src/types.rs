use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Role tag carried by a metrics record. Unknown tags are kept verbatim so
/// they round-trip, but select the backend templates when recommending.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    ProductOwner,
    BackendDeveloper,
    FrontendDeveloper,
    DevOpsEngineer,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::ProductOwner => "Product Owner",
            Role::BackendDeveloper => "Backend Developer",
            Role::FrontendDeveloper => "Frontend Developer",
            Role::DevOpsEngineer => "DevOps Engineer",
            Role::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Role {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "productowner" | "po" => Role::ProductOwner,
            "backenddeveloper" | "backend" => Role::BackendDeveloper,
            "frontenddeveloper" | "frontend" => Role::FrontendDeveloper,
            "devopsengineer" | "devops" => Role::DevOpsEngineer,
            _ => Role::Other(s.trim().to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Role::Other(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Role::parse(&s))
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Productivity,
    Quality,
    Collaboration,
    Reliability,
}

impl Category {
    /// Fixed diagnosis order.
    pub fn all() -> &'static [Category] {
        &[
            Category::Productivity,
            Category::Quality,
            Category::Collaboration,
            Category::Reliability,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Productivity => "productivity",
            Category::Quality => "quality",
            Category::Collaboration => "collaboration",
            Category::Reliability => "reliability",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Productivity => "Productivity",
            Category::Quality => "Quality",
            Category::Collaboration => "Collaboration",
            Category::Reliability => "Reliability",
        }
    }

    /// Severity is fixed per category, independent of how far the score fell.
    pub fn severity(self) -> Severity {
        match self {
            Category::Productivity => Severity::High,
            Category::Quality => Severity::Critical,
            Category::Collaboration => Severity::Medium,
            Category::Reliability => Severity::Medium,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Declared worst-first so `Ord` follows severity: Critical < Warning < Healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Critical,
    Warning,
    Healthy,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Critical => "critical",
            Status::Warning => "warning",
            Status::Healthy => "healthy",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = crate::error::HealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Status::Critical),
            "warning" => Ok(Status::Warning),
            "healthy" => Ok(Status::Healthy),
            _ => Err(crate::error::HealthError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_lenient() {
        assert_eq!(Role::parse("Product Owner"), Role::ProductOwner);
        assert_eq!(Role::parse("backend_developer"), Role::BackendDeveloper);
        assert_eq!(Role::parse("frontend-developer"), Role::FrontendDeveloper);
        assert_eq!(Role::parse("DevOps Engineer"), Role::DevOpsEngineer);
        assert_eq!(
            Role::parse(" Data Scientist "),
            Role::Other("Data Scientist".to_string())
        );
    }

    #[test]
    fn role_serializes_as_display_name() {
        let json = serde_json::to_string(&Role::DevOpsEngineer).unwrap();
        assert_eq!(json, "\"DevOps Engineer\"");
        let parsed: Role = serde_json::from_str("\"QA Analyst\"").unwrap();
        assert_eq!(parsed, Role::Other("QA Analyst".to_string()));
        assert!(!parsed.is_recognized());
    }

    #[test]
    fn category_severity_is_fixed() {
        assert_eq!(Category::Productivity.severity(), Severity::High);
        assert_eq!(Category::Quality.severity(), Severity::Critical);
        assert_eq!(Category::Collaboration.severity(), Severity::Medium);
        assert_eq!(Category::Reliability.severity(), Severity::Medium);
    }

    #[test]
    fn status_orders_worst_first() {
        assert!(Status::Critical < Status::Warning);
        assert!(Status::Warning < Status::Healthy);
    }

    #[test]
    fn status_from_str() {
        assert_eq!("warning".parse::<Status>().unwrap(), Status::Warning);
        assert!("unknown".parse::<Status>().is_err());
    }
}
