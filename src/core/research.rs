//! Structured payloads produced by the plan, research, and critique stages.
//!
//! Each payload has a deterministic `fallback` constructor derived from the
//! topic (or prior state). Stages substitute these whenever model output is
//! unavailable or fails validation, so the workflow always has a value to
//! continue with.

use serde::{Deserialize, Deserializer, Serialize};

use super::assessment::Assessment;

/// Drafts longer than this (in characters) pass the fallback critique.
pub const FALLBACK_APPROVAL_MIN_CHARS: usize = 1000;

/// Lowest allowed research depth.
pub const MIN_RESEARCH_DEPTH: u8 = 1;
/// Highest allowed research depth.
pub const MAX_RESEARCH_DEPTH: u8 = 5;

/// Research plan produced by the planning stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// Main questions the report must answer.
    pub main_questions: Vec<String>,
    /// Sub-topics to investigate.
    pub sub_topics: Vec<String>,
    /// How information should be gathered.
    pub search_strategies: Vec<String>,
    /// Kinds of sources expected to be useful.
    pub expected_sources: Vec<String>,
    /// Depth of research, 1 (shallow) to 5 (exhaustive).
    #[serde(
        default = "default_research_depth",
        deserialize_with = "deserialize_depth"
    )]
    pub research_depth: u8,
}

const fn default_research_depth() -> u8 {
    3
}

/// Accepts any JSON number and clamps it into the depth range.
fn deserialize_depth<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_depth(raw))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_depth(raw: f64) -> u8 {
    let clamped = raw
        .round()
        .clamp(f64::from(MIN_RESEARCH_DEPTH), f64::from(MAX_RESEARCH_DEPTH));
    if clamped.is_nan() {
        default_research_depth()
    } else {
        clamped as u8
    }
}

impl ResearchPlan {
    /// Deterministic plan used when planning fails.
    #[must_use]
    pub fn fallback(topic: &str) -> Self {
        Self {
            main_questions: vec![
                format!("What is the current understanding of {topic}?"),
                format!("What are the key challenges related to {topic}?"),
                format!("What are the future prospects for {topic}?"),
            ],
            sub_topics: strings(&[
                "Background and context",
                "Current state",
                "Challenges and limitations",
                "Future trends",
            ]),
            search_strategies: strings(&[
                "Literature review",
                "Current news and reports",
                "Expert opinions",
            ]),
            expected_sources: strings(&[
                "Academic papers",
                "Industry reports",
                "News articles",
                "Expert interviews",
            ]),
            research_depth: default_research_depth(),
        }
    }

    /// Checks required content and clamps the depth into range.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when no main question is present.
    pub fn validated(mut self) -> Result<Self, String> {
        if self.main_questions.iter().all(|q| q.trim().is_empty()) {
            return Err("research plan has no main questions".to_string());
        }
        self.research_depth = self
            .research_depth
            .clamp(MIN_RESEARCH_DEPTH, MAX_RESEARCH_DEPTH);
        Ok(self)
    }
}

/// Summary of one category of sources consulted during research.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Source category (e.g. "ArXiv Papers").
    pub source_type: String,
    /// Key insights from this category.
    #[serde(default)]
    pub key_insights: String,
    /// Reliability rating: high, medium, or low.
    #[serde(default)]
    pub reliability: String,
    /// Number of items consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
}

impl SourceSummary {
    fn new(source_type: &str, key_insights: String, reliability: &str) -> Self {
        Self {
            source_type: source_type.to_string(),
            key_insights,
            reliability: reliability.to_string(),
            item_count: None,
        }
    }
}

/// Synthesized research findings produced by the research stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedData {
    /// Key findings.
    pub key_findings: Vec<String>,
    /// Evidence supporting the findings.
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
    /// Conflicting viewpoints or approaches.
    #[serde(default)]
    pub conflicting_information: Vec<String>,
    /// Per-category source summaries.
    #[serde(default)]
    pub source_summaries: Vec<SourceSummary>,
    /// Quality of the gathered data, 0.0 to 1.0.
    pub data_quality_score: f64,
    /// Recent developments noted during synthesis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_trends: Vec<String>,
    /// Assessment of technical depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_depth: Option<String>,
    /// Set when the topic was rejected by the domain gate.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub domain_warning: bool,
}

impl SynthesizedData {
    /// Deterministic findings used when synthesis fails.
    #[must_use]
    pub fn fallback(topic: &str) -> Self {
        Self {
            key_findings: vec![
                format!("Current understanding of {topic} shows significant development in recent years"),
                format!("Main challenges in {topic} include scalability and adoption issues"),
                format!("Future prospects for {topic} appear promising with emerging technologies"),
            ],
            supporting_evidence: vec![
                format!("Recent studies indicate growing interest in {topic}"),
                format!("Industry reports show increasing investment in {topic}"),
                format!("Expert opinions suggest {topic} will continue evolving"),
            ],
            conflicting_information: vec![
                format!("Some sources indicate potential limitations in {topic}"),
                format!("Alternative approaches to {topic} exist with different trade-offs"),
            ],
            source_summaries: vec![
                SourceSummary::new(
                    "Academic Literature",
                    format!("Research papers provide theoretical foundation for {topic}"),
                    "high",
                ),
                SourceSummary::new(
                    "Industry Reports",
                    format!("Market analysis shows current trends in {topic}"),
                    "medium",
                ),
                SourceSummary::new(
                    "Expert Opinions",
                    format!("Industry experts share practical insights on {topic}"),
                    "medium",
                ),
            ],
            data_quality_score: 0.7,
            recent_trends: Vec::new(),
            technical_depth: None,
            domain_warning: false,
        }
    }

    /// Findings returned for topics outside the supported domain.
    #[must_use]
    pub fn domain_warning(topic: &str) -> Self {
        Self {
            key_findings: vec![
                format!("Topic '{topic}' appears to be outside the CS/IT domain"),
                "This research system is specialized for Computer Science and Information Technology topics".to_string(),
                "Please rephrase your topic to focus on CS/IT aspects".to_string(),
            ],
            supporting_evidence: strings(&[
                "System is configured for CS/IT domains only",
                "Topic does not match CS/IT keyword patterns",
            ]),
            conflicting_information: Vec::new(),
            source_summaries: vec![SourceSummary::new(
                "System Warning",
                "Topic outside CS/IT domain".to_string(),
                "high",
            )],
            data_quality_score: 0.1,
            recent_trends: Vec::new(),
            technical_depth: None,
            domain_warning: true,
        }
    }

    /// Checks required content and clamps the quality score into `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when there are no findings or
    /// the score is not a finite number.
    pub fn validated(mut self) -> Result<Self, String> {
        if self.key_findings.iter().all(|f| f.trim().is_empty()) {
            return Err("synthesized data has no key findings".to_string());
        }
        if !self.data_quality_score.is_finite() {
            return Err("data_quality_score is not a finite number".to_string());
        }
        self.data_quality_score = self.data_quality_score.clamp(0.0, 1.0);
        Ok(self)
    }
}

/// Critique of a draft report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Critique {
    /// Overall verdict.
    pub overall_assessment: Assessment,
    /// Explanation of the verdict.
    pub specific_feedback: String,
    /// What the report does well.
    #[serde(default)]
    pub strengths: Vec<String>,
    /// What the report lacks.
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Concrete improvements.
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Critique {
    /// Heuristic critique used when the critic cannot produce one.
    ///
    /// Approves drafts longer than [`FALLBACK_APPROVAL_MIN_CHARS`]; anything
    /// shorter (or absent) needs revision.
    #[must_use]
    pub fn fallback(draft: Option<&str>) -> Self {
        let long_enough = draft.is_some_and(|d| d.chars().count() > FALLBACK_APPROVAL_MIN_CHARS);
        let (overall_assessment, specific_feedback) = if long_enough {
            (
                Assessment::Approved,
                "Report meets basic quality standards and provides comprehensive coverage of the topic.",
            )
        } else {
            (
                Assessment::RevisionNeeded,
                "Report needs additional development and refinement to meet quality standards.",
            )
        };

        Self {
            overall_assessment,
            specific_feedback: specific_feedback.to_string(),
            strengths: strings(&["Addresses the research topic", "Provides structured presentation"]),
            weaknesses: strings(&[
                "Could benefit from more detailed analysis",
                "Some sections may need expansion",
            ]),
            recommendations: strings(&[
                "Continue refining the analysis",
                "Ensure all key points are well-supported",
            ]),
        }
    }

    /// Minimal approving critique substituted when the critic stage fails outright.
    #[must_use]
    pub fn minimal_approval() -> Self {
        Self {
            overall_assessment: Assessment::Approved,
            specific_feedback: "Report meets basic requirements.".to_string(),
            strengths: strings(&["Addresses the topic"]),
            weaknesses: strings(&["Could be more detailed"]),
            recommendations: strings(&["Continue improving"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
