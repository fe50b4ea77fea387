use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::align::aligner::AlignmentCandidate;
use crate::snapshot::snapshot_model::ElementNode;

/// Outcome of a tie-break consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Pick(usize),
    /// No usable answer: timeout, malformed reply, or "none apply".
    Defer,
}

/// Query/response pair kept for the backtrace whenever the classifier was
/// consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleExchange {
    pub prompt: String,
    pub response: Option<String>,
}

/// External classification collaborator. Returns the raw reply text, or
/// None on any transport failure; the reply itself is still untrusted.
pub trait ClassifierBackend: Send + Sync {
    fn classify(&self, prompt: &str) -> Option<String>;
}

/// Tie-breaker between near-tied alignment candidates. Never on the path
/// for a clear winner: the engine consults it only when the top two scores
/// sit within the ambiguity threshold.
pub struct Disambiguator {
    backend: Box<dyn ClassifierBackend>,
}

impl Disambiguator {
    pub fn new(backend: Box<dyn ClassifierBackend>) -> Disambiguator {
        Disambiguator { backend }
    }

    /// Ask the collaborator which candidate matches the recorded target.
    /// Any failure degrades to Defer; the exchange is returned for audit.
    pub fn disambiguate(
        &self,
        target: &ElementNode,
        candidates: &[AlignmentCandidate],
    ) -> (Choice, OracleExchange) {
        let prompt = build_prompt(target, candidates);
        let response = self.backend.classify(&prompt);
        let choice = response
            .as_deref()
            .and_then(|r| parse_choice(r, candidates.len()))
            .unwrap_or(Choice::Defer);

        (choice, OracleExchange { prompt, response })
    }
}

fn describe(el: &ElementNode) -> String {
    format!(
        "class={} id={} text={:?} center={:?} depth={}",
        el.class_name,
        el.resource_id.as_deref().unwrap_or("(none)"),
        el.text.as_deref().unwrap_or(""),
        el.bounds.center(),
        el.depth,
    )
}

fn build_prompt(target: &ElementNode, candidates: &[AlignmentCandidate]) -> String {
    let listed = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("  {}. {} (score {:.3})", i, describe(&c.element), c.score))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"A UI test step recorded against an old app version targets this element:

  {}

The current screen offers these near-tied candidates:

{}

Which candidate is the same element? Respond with ONLY valid JSON:
{{"choice": <candidate number>}} or {{"choice": null}} if none apply."#,
        describe(target),
        listed
    )
}

#[derive(Deserialize)]
struct ChoiceResponse {
    choice: Option<usize>,
}

/// Parse a reply defensively: anything but a valid in-range index defers.
fn parse_choice(response: &str, candidate_count: usize) -> Option<Choice> {
    let parsed: ChoiceResponse = serde_json::from_str(response.trim()).ok()?;
    match parsed.choice {
        Some(i) if i < candidate_count => Some(Choice::Pick(i)),
        Some(_) => Some(Choice::Defer),
        None => Some(Choice::Defer),
    }
}

// ============================================================================
// Ollama Backend
// ============================================================================

pub struct OllamaBackend {
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "qwen2.5:1.5b".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(endpoint: &str, model: &str, timeout_ms: u64) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            timeout_ms,
        }
    }
}

impl ClassifierBackend for OllamaBackend {
    fn classify(&self, prompt: &str) -> Option<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: "json",
        };

        // Bounded timeout: a stuck collaborator must degrade to Defer, not
        // stall the replay loop.
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .build()
            .ok()?;

        let response = client.post(&self.endpoint).json(&request).send().ok()?;
        let ollama_response: OllamaResponse = response.json().ok()?;
        Some(ollama_response.response)
    }
}

// ============================================================================
// Mock Backend (for testing without a live classifier)
// ============================================================================

/// Canned reply, or None to simulate an unreachable collaborator.
pub struct MockBackend {
    pub reply: Option<String>,
}

impl MockBackend {
    pub fn unreachable() -> Self {
        MockBackend { reply: None }
    }

    pub fn picking(index: usize) -> Self {
        MockBackend {
            reply: Some(format!("{{\"choice\": {}}}", index)),
        }
    }
}

impl ClassifierBackend for MockBackend {
    fn classify(&self, _prompt: &str) -> Option<String> {
        self.reply.clone()
    }
}
