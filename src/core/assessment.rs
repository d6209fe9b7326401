//! Critique assessment outcome.
//!
//! The critic stage classifies every draft into one of three outcomes,
//! and the workflow engine routes on it.

use serde::{Deserialize, Serialize};

/// Overall assessment of a draft report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    /// The report is ready for delivery.
    Approved,
    /// The report needs another writing pass.
    RevisionNeeded,
    /// The report needs more research before rewriting.
    ResearchInsufficient,
}

impl Assessment {
    /// Parses an assessment string (case-insensitive).
    ///
    /// Spaces and hyphens are treated as underscores, so `"Revision Needed"`
    /// and `"revision-needed"` both parse. Returns `None` for anything else.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "approved" => Some(Self::Approved),
            "revision_needed" => Some(Self::RevisionNeeded),
            "research_insufficient" => Some(Self::ResearchInsufficient),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::RevisionNeeded => "revision_needed",
            Self::ResearchInsufficient => "research_insufficient",
        }
    }
}

impl std::fmt::Display for Assessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("approved", Some(Assessment::Approved))]
    #[test_case("APPROVED", Some(Assessment::Approved))]
    #[test_case("Revision_Needed", Some(Assessment::RevisionNeeded))]
    #[test_case("revision needed", Some(Assessment::RevisionNeeded))]
    #[test_case(" research-insufficient ", Some(Assessment::ResearchInsufficient))]
    #[test_case("maybe", None)]
    #[test_case("", None)]
    fn test_assessment_parse(input: &str, expected: Option<Assessment>) {
        assert_eq!(Assessment::parse(input), expected);
    }

    #[test]
    fn test_assessment_display() {
        assert_eq!(format!("{}", Assessment::RevisionNeeded), "revision_needed");
        assert_eq!(Assessment::Approved.to_string(), "approved");
    }

    #[test]
    fn test_assessment_serialization() {
        let json = serde_json::to_string(&Assessment::ResearchInsufficient).unwrap_or_default();
        assert_eq!(json, "\"research_insufficient\"");
    }
}
