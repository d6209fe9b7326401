//! System prompts and user-message builders for the workflow stages.
//!
//! Each stage has a compiled-in default system prompt. [`PromptSet::load`]
//! lets users override any of them with markdown files in a prompt
//! directory; `mars-rs init-prompts` writes the defaults there for editing.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::{ResearchPlan, SynthesizedData};
use crate::sources::DomainInsights;

/// System prompt for the planning stage.
pub const PLANNER_SYSTEM_PROMPT: &str = r#"You are a research planner for computer science and information technology topics. You break a topic into technical questions and decide how to investigate them.

## Instructions

Given a topic, produce a research plan with:
1. 3-5 main technical questions the report must answer.
2. 4-6 sub-topics to investigate.
3. 3-4 search strategies (paper analysis, repository review, case studies, documentation).
4. The kinds of sources expected to be useful.
5. A research depth from 1 (shallow) to 5 (exhaustive).

Cover recent developments, practical implementations, academic research and industry adoption, and performance, scalability and security concerns.

## Output Format (JSON)

```json
{
  "main_questions": ["What are the latest advances in X?", "How is X implemented in practice?"],
  "sub_topics": ["Core algorithms", "Implementation approaches", "Performance", "Security"],
  "search_strategies": ["ArXiv paper analysis", "GitHub repository review", "Industry case studies"],
  "expected_sources": ["ArXiv papers", "GitHub repositories", "IEEE/ACM publications", "Technical blogs"],
  "research_depth": 4
}
```

Return ONLY the JSON object, no surrounding text."#;

/// System prompt for research synthesis.
pub const RESEARCHER_SYSTEM_PROMPT: &str = r#"You are a CS/IT researcher. You synthesize academic papers, open source repositories, and community discussions into findings grounded in the data you are given.

## Instructions

Analyze the source data and report:
- Key technical developments and breakthroughs.
- Recent trends and industry adoption.
- Practical applications and use cases.
- Technical challenges, open problems, and research gaps.

Base every finding on the supplied data. Cite specific papers or repositories when you can.

## Output Format (JSON)

```json
{
  "key_findings": ["Finding with context"],
  "supporting_evidence": ["Evidence from a named source"],
  "conflicting_information": ["Competing approach or disagreement"],
  "source_summaries": [
    {"source_type": "ArXiv Papers", "key_insights": "...", "reliability": "high", "item_count": 5}
  ],
  "data_quality_score": 0.8,
  "recent_trends": ["Trend"],
  "technical_depth": "Assessment of technical depth"
}
```

`data_quality_score` is a number between 0.0 and 1.0. Return ONLY the JSON object."#;

/// System prompt for research expansion after a critique found gaps.
pub const EXPANDER_SYSTEM_PROMPT: &str = r"You are a researcher extending earlier work. A reviewer found the research insufficient. Fill the gaps they identified.

## Instructions

- Keep every still-valid finding from the previous research.
- Add findings, evidence, and source summaries that address the feedback.
- Use the new source data where it helps.
- Raise the data quality score only if the gaps are actually filled.

Return the expanded research in the same JSON structure as the previous findings, and nothing else.";

/// System prompt for writing the first draft.
pub const WRITER_SYSTEM_PROMPT: &str = r"You are a technical writer producing reports for computer science and IT professionals. You turn research findings into a clear, well-supported report.

## Report Structure

Use markdown headings (`#` to `####`), `- ` bullet lists, and `1. ` numbered lists only.

- Executive Summary (300-400 words)
- Technical Background (400-500 words)
- Main Technical Findings, organized by theme (1500-2000 words)
- Implementation and Practical Applications (400-600 words)
- Performance and Technical Considerations (300-400 words)
- Future Directions and Research Gaps (300-400 words)

## Guidelines

- Target 2500-3500 words.
- Use the plan's main questions to shape the sections.
- Support claims with the evidence and sources in the findings.
- Present conflicting approaches openly.
- Keep a precise, analytical tone.";

/// System prompt for revising a draft against critique feedback.
pub const REVISER_SYSTEM_PROMPT: &str = r"You are a technical editor revising a report against reviewer feedback.

## Instructions

- Address every point in the feedback.
- Keep the existing structure unless the feedback asks for a change.
- Keep the same length and depth; do not summarize the report away.
- Use the same markdown subset: headings, `- ` bullets, `1. ` numbered lists, paragraphs.

Return the complete revised report.";

/// System prompt for the critique stage.
pub const CRITIC_SYSTEM_PROMPT: &str = r#"You are a reviewer deciding whether a research report is ready to ship.

## Evaluation Criteria

Completeness, accuracy against the research data, clarity, depth of analysis, balance of viewpoints, coherence, and quality of evidence.

## Decision

- "approved": comprehensive, well written, and fully addresses the topic.
- "revision_needed": the content is sound but the writing, structure, or presentation needs work.
- "research_insufficient": the report lacks depth or misses key aspects that need more research.

## Output Format (JSON)

```json
{
  "overall_assessment": "approved" | "revision_needed" | "research_insufficient",
  "specific_feedback": "Detailed, actionable explanation of the verdict",
  "strengths": ["..."],
  "weaknesses": ["..."],
  "recommendations": ["..."]
}
```

Return ONLY the JSON object."#;

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/mars-rs/prompts";

/// Filename for the planner prompt template.
const PLANNER_FILENAME: &str = "planner.md";
/// Filename for the researcher prompt template.
const RESEARCHER_FILENAME: &str = "researcher.md";
/// Filename for the expander prompt template.
const EXPANDER_FILENAME: &str = "expander.md";
/// Filename for the writer prompt template.
const WRITER_FILENAME: &str = "writer.md";
/// Filename for the reviser prompt template.
const REVISER_FILENAME: &str = "reviser.md";
/// Filename for the critic prompt template.
const CRITIC_FILENAME: &str = "critic.md";

/// A set of system prompts for all stages.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults. Use [`PromptSet::load`] to resolve the prompt
/// directory from CLI flags, environment variables, or the default path.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// Planning stage.
    pub planner: String,
    /// Research synthesis.
    pub researcher: String,
    /// Research expansion.
    pub expander: String,
    /// First draft.
    pub writer: String,
    /// Draft revision.
    pub reviser: String,
    /// Critique stage.
    pub critic: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument
    /// 2. `MARS_PROMPT_DIR` environment variable
    /// 3. `~/.config/mars-rs/prompts/`
    ///
    /// Each file is loaded independently; a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("MARS_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            planner: load_file(PLANNER_FILENAME, PLANNER_SYSTEM_PROMPT),
            researcher: load_file(RESEARCHER_FILENAME, RESEARCHER_SYSTEM_PROMPT),
            expander: load_file(EXPANDER_FILENAME, EXPANDER_SYSTEM_PROMPT),
            writer: load_file(WRITER_FILENAME, WRITER_SYSTEM_PROMPT),
            reviser: load_file(REVISER_FILENAME, REVISER_SYSTEM_PROMPT),
            critic: load_file(CRITIC_FILENAME, CRITIC_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            planner: PLANNER_SYSTEM_PROMPT.to_string(),
            researcher: RESEARCHER_SYSTEM_PROMPT.to_string(),
            expander: EXPANDER_SYSTEM_PROMPT.to_string(),
            writer: WRITER_SYSTEM_PROMPT.to_string(),
            reviser: REVISER_SYSTEM_PROMPT.to_string(),
            critic: CRITIC_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (PLANNER_FILENAME, PLANNER_SYSTEM_PROMPT),
            (RESEARCHER_FILENAME, RESEARCHER_SYSTEM_PROMPT),
            (EXPANDER_FILENAME, EXPANDER_SYSTEM_PROMPT),
            (WRITER_FILENAME, WRITER_SYSTEM_PROMPT),
            (REVISER_FILENAME, REVISER_SYSTEM_PROMPT),
            (CRITIC_FILENAME, CRITIC_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

fn pretty<T: Serialize>(value: Option<&T>) -> String {
    value
        .and_then(|v| serde_json::to_string_pretty(v).ok())
        .unwrap_or_else(|| "(none)".to_string())
}

/// Builds the user message for the planning stage.
#[must_use]
pub fn build_planner_prompt(topic: &str) -> String {
    format!("<topic>{topic}</topic>\n\nCreate a research plan for this topic.")
}

/// Builds the user message for research synthesis over fetched source data.
///
/// Domain insights are included only when some topic family matched.
#[must_use]
pub fn build_research_prompt(
    topic: &str,
    plan: Option<&ResearchPlan>,
    source_data: &serde_json::Value,
    insights: &DomainInsights,
) -> String {
    let sources = serde_json::to_string_pretty(source_data).unwrap_or_else(|_| "{}".to_string());
    let mut prompt = format!(
        "<topic>{topic}</topic>\n\n\
         <plan>\n{}\n</plan>\n\n\
         <sources>\n{sources}\n</sources>\n\n",
        pretty(plan)
    );
    if !insights.is_empty() {
        let _ = write!(
            prompt,
            "<domain_insights>\n{}\n</domain_insights>\n\n",
            pretty(Some(insights))
        );
    }
    prompt.push_str("Synthesize the findings from these sources.");
    prompt
}

/// Builds the user message for research expansion.
#[must_use]
pub fn build_expansion_prompt(
    topic: &str,
    plan: Option<&ResearchPlan>,
    findings: &SynthesizedData,
    source_data: &serde_json::Value,
    feedback: &str,
) -> String {
    let mut prompt = format!(
        "<topic>{topic}</topic>\n\n\
         <plan>\n{}\n</plan>\n\n\
         <previous_findings>\n{}\n</previous_findings>\n\n",
        pretty(plan),
        pretty(Some(findings)),
    );
    if source_data
        .as_object()
        .is_some_and(|o| o.values().any(|v| !v.is_null()))
    {
        let sources = serde_json::to_string_pretty(source_data).unwrap_or_default();
        let _ = write!(prompt, "<new_sources>\n{sources}\n</new_sources>\n\n");
    }
    let _ = write!(
        prompt,
        "<feedback>\n{feedback}\n</feedback>\n\n\
         Expand the research to address the feedback."
    );
    prompt
}

/// Builds the user message for the first draft.
#[must_use]
pub fn build_writer_prompt(
    topic: &str,
    plan: Option<&ResearchPlan>,
    findings: Option<&SynthesizedData>,
) -> String {
    format!(
        "<topic>{topic}</topic>\n\n\
         <plan>\n{}\n</plan>\n\n\
         <findings>\n{}\n</findings>\n\n\
         Write the complete technical report.",
        pretty(plan),
        pretty(findings),
    )
}

/// Builds the user message for a revision pass.
#[must_use]
pub fn build_revision_prompt(topic: &str, draft: &str, feedback: &str) -> String {
    format!(
        "<topic>{topic}</topic>\n\n\
         <report>\n{draft}\n</report>\n\n\
         <feedback>\n{feedback}\n</feedback>\n\n\
         Provide the complete revised report."
    )
}

/// Builds the user message for the critique stage.
#[must_use]
pub fn build_critic_prompt(
    topic: &str,
    plan: Option<&ResearchPlan>,
    findings: Option<&SynthesizedData>,
    draft: &str,
) -> String {
    format!(
        "<topic>{topic}</topic>\n\n\
         <plan>\n{}\n</plan>\n\n\
         <findings>\n{}\n</findings>\n\n\
         <report>\n{draft}\n</report>\n\n\
         Evaluate this report.",
        pretty(plan),
        pretty(findings),
    )
}
