//! Research-only chat assistant support: session history and research
//! intent detection.
//!
//! A chat message either asks for research, in which case the caller hands
//! it to the workflow, or it is answered directly under
//! [`CHAT_SYSTEM_PROMPT`], which refuses anything unrelated to research.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use uuid::Uuid;

use super::fallback::FallbackClient;
use super::message::{ChatMessage, system_message};

/// System prompt for direct chat replies.
pub const CHAT_SYSTEM_PROMPT: &str = "You are a specialized research assistant. Only answer queries that are explicitly about research tasks: collecting, summarizing, or analyzing information. \
If the user's query is not related to research, respond with: 'I can only help with research-related requests.' and ask the user to rephrase it as a research request. \
Keep answers concise and cite sources when available.";

/// System prompt for the YES/NO research intent classifier.
pub const INTENT_CLASSIFIER_PROMPT: &str = "You are a strict classifier. Answer with a single word: YES or NO. \
YES means the user's message requests a research task (examples: find papers, summarize literature, collect evidence, provide citations, analyze studies). \
NO means the message is not a research request. Reply only with YES or NO and nothing else.";

/// Substrings that mark a message as a research request without asking
/// the model.
pub const RESEARCH_KEYWORDS: &[&str] = &[
    "research",
    "find",
    "search",
    "summar",
    "paper",
    "literature",
    "sources",
    "cite",
    "citations",
    "evidence",
    "survey",
    "review",
    "analyze",
    "investigate",
    "collect",
    "provide references",
];

const REFUSAL_PHRASES: &[&str] = &["i can only help with research"];

const FEW_SHOT_EXAMPLES: &[(&str, &str)] = &[
    (
        "Find recent papers about transformer neural networks and summarize their evaluation methods.",
        "YES",
    ),
    (
        "Collect citations supporting the claim that larger models generalize better.",
        "YES",
    ),
    (
        "Provide a literature review on transformer-based architectures for NLP.",
        "YES",
    ),
    ("Tell me a joke about transformers.", "NO"),
    ("What's the weather in Delhi today?", "NO"),
    ("Help me write a birthday message.", "NO"),
];

/// Returns `true` if the message contains a research keyword.
#[must_use]
pub fn mentions_research(message: &str) -> bool {
    let lower = message.to_lowercase();
    RESEARCH_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Builds the few-shot classifier input for a message.
#[must_use]
pub fn build_intent_prompt(message: &str) -> String {
    let mut prompt: String = FEW_SHOT_EXAMPLES
        .iter()
        .map(|(example, label)| format!("Message: {example}\nLabel: {label}\n"))
        .collect();
    prompt.push_str(&format!("\nMessage: {message}\nLabel:"));
    prompt
}

/// Decides whether a chat message asks for research.
///
/// Keywords decide first. Otherwise the model classifies the message; a
/// failed classification counts as "no".
pub async fn detect_research_intent(client: &FallbackClient, message: &str) -> bool {
    if mentions_research(message) {
        debug!("research intent matched by keyword");
        return true;
    }
    match client
        .generate(INTENT_CLASSIFIER_PROMPT, &build_intent_prompt(message), Some(0.0))
        .await
    {
        Ok(label) => label.trim().to_lowercase().starts_with("yes"),
        Err(e) => {
            warn!(error = %e, "intent classification failed, treating as chat");
            false
        }
    }
}

/// Returns `true` if a reply is the assistant's research-only refusal.
#[must_use]
pub fn is_refusal(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    REFUSAL_PHRASES.iter().any(|p| lower.contains(p))
}

/// In-memory chat histories keyed by session id.
///
/// Cloning shares the same store. New sessions start with
/// [`CHAT_SYSTEM_PROMPT`] as their first message.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Vec<ChatMessage>>>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Vec<ChatMessage>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `id` if that session exists, otherwise opens a new session.
    pub fn ensure(&self, id: Option<Uuid>) -> Uuid {
        let mut sessions = self.lock();
        if let Some(id) = id.filter(|id| sessions.contains_key(id)) {
            return id;
        }
        let id = Uuid::new_v4();
        sessions.insert(id, vec![system_message(CHAT_SYSTEM_PROMPT)]);
        id
    }

    /// Appends a message to a session. Unknown sessions are ignored.
    pub fn append(&self, id: Uuid, message: ChatMessage) {
        if let Some(history) = self.lock().get_mut(&id) {
            history.push(message);
        }
    }

    /// A copy of a session's history (empty for unknown sessions).
    #[must_use]
    pub fn history(&self, id: Uuid) -> Vec<ChatMessage> {
        self.lock().get(&id).cloned().unwrap_or_default()
    }

    /// Ids of every open session.
    #[must_use]
    pub fn session_ids(&self) -> Vec<Uuid> {
        self.lock().keys().copied().collect()
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no session has been opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
