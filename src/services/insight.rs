use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::domains::journal::FragmentType;
use crate::error::{EchoError, Result};
use crate::interfaces::providers::GenerativeProvider;

/// Preference-ordered model tiers, most capable and cheapest first.
pub const DEFAULT_MODEL_TIERS: [&str; 4] = [
    "gemini-2.5-flash-lite",
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-flash",
];

const FRAGMENT_FALLBACK: &str = "A quiet moment that felt worth holding onto.";
const DAILY_FALLBACK: &str =
    "The day settled quietly, shaped by moments that mattered in simple ways.";
const QUIET_DAY: &str = "The day moved gently, without many moments asking to be remembered.";

/// Terms that mark an analytical or fantasy tone; one hit makes the result
/// unusable and aborts the whole generation in favor of the fallback.
const TONE_BLOCK_LIST: &str = r"(?i)likely|probably|appears|seems|tapestry|journey|unfold|weave|cosmic";

#[derive(Debug, Clone)]
pub struct GenerationTimings {
    pub call_timeout: Duration,
    pub overload_backoff: Duration,
    pub tier_backoff: Duration,
}

impl Default for GenerationTimings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            overload_backoff: Duration::from_millis(1_500),
            tier_backoff: Duration::from_secs(1),
        }
    }
}

/// Makes the unreliable generative-language dependency behave as a total
/// function: every public operation returns some on-brand string, absorbing
/// provider errors, timeouts, overload and stylistic drift.
pub struct InsightService {
    provider: Arc<dyn GenerativeProvider>,
    tiers: Vec<String>,
    timings: GenerationTimings,
    tone_filter: Regex,
}

impl InsightService {
    pub fn new(
        provider: Arc<dyn GenerativeProvider>,
        tiers: Option<Vec<String>>,
        timings: GenerationTimings,
    ) -> Result<Self> {
        let tiers = tiers.unwrap_or_else(|| {
            DEFAULT_MODEL_TIERS
                .iter()
                .map(|model| model.to_string())
                .collect()
        });
        if tiers.is_empty() {
            return Err(EchoError::Config("no model tiers configured".to_string()));
        }
        let tone_filter =
            Regex::new(TONE_BLOCK_LIST).map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(Self {
            provider,
            tiers,
            timings,
            tone_filter,
        })
    }

    /// One reflective sentence for a captured fragment. Never errors.
    pub async fn fragment_insight(
        &self,
        content: &str,
        kind: FragmentType,
        caption: Option<&str>,
    ) -> String {
        let prompt = match kind {
            FragmentType::Text => format!(
                "You are ECHO, a personal memory companion.\n\n\
                 The user wrote:\n\"{content}\"\n\n\
                 Write ONE memorable sentence that reads like a private journal.\n\
                 Speak with gentle confidence, as if the meaning is already understood.\n\
                 Use poetic but grounded language.\n\
                 Do not sound analytical or uncertain."
            ),
            FragmentType::Link => format!(
                "You are ECHO, a personal memory companion.\n\n\
                 The user saved this link:\n\"{content}\"\n\n\
                 Write ONE memorable sentence about what this link represented in the user's day.\n\
                 Focus on intention, curiosity, or care for doing things properly.\n\
                 Speak with quiet certainty, not analysis.\n\
                 Avoid words like \"likely\", \"probably\", or \"appears\"."
            ),
            FragmentType::Image => {
                let caption = caption
                    .filter(|value| !value.trim().is_empty())
                    .unwrap_or("No caption provided");
                format!(
                    "You are ECHO, a personal memory companion.\n\n\
                     The user saved an image.\nOptional context:\n\"{caption}\"\n\n\
                     Write ONE memorable sentence about why the user chose to keep this image.\n\
                     Focus on feeling, not description.\n\
                     Speak with warmth and confidence, as if this moment is already understood.\n\
                     Avoid uncertainty or visual analysis."
                )
            }
            FragmentType::Location => format!(
                "You are ECHO, a personal memory companion.\n\n\
                 The user saved this place:\n\"{content}\"\n\n\
                 Write ONE memorable sentence about why this place mattered in that moment.\n\
                 Focus on presence and meaning, not geography.\n\
                 Use calm, reflective language with gentle confidence."
            ),
        };

        self.generate_with_fallback(&prompt, FRAGMENT_FALLBACK).await
    }

    /// A 2-3 sentence narrative over a day's fragments. An empty day yields
    /// the fixed quiet-day sentence without touching the provider.
    pub async fn daily_memory(&self, fragments: &[(FragmentType, String)]) -> String {
        if fragments.is_empty() {
            return QUIET_DAY.to_string();
        }

        let inputs = fragments
            .iter()
            .map(|(kind, content)| format!("- ({kind}) {content}"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "You are ECHO, a personal memory companion.\n\n\
             These moments were captured across one day:\n{inputs}\n\n\
             Write a short daily memory in 2-3 sentences.\n\
             Make it feel personal and reflective, like a page from a journal.\n\
             No advice. No analysis. No metaphors about journeys or time."
        );

        self.generate_with_fallback(&prompt, DAILY_FALLBACK).await
    }

    async fn generate_with_fallback(&self, prompt: &str, fallback: &str) -> String {
        for model in &self.tiers {
            match self.try_generate(model, prompt).await {
                Ok(text) => {
                    if self.tone_filter.is_match(&text) {
                        // One bad-tone hit aborts the whole generation;
                        // remaining tiers are not tried.
                        return fallback.to_string();
                    }
                    return text;
                }
                Err(err) => {
                    tracing::debug!(model = %model, error = %err, "model tier failed");
                    tokio::time::sleep(self.timings.tier_backoff).await;
                }
            }
        }

        fallback.to_string()
    }

    async fn try_generate(&self, model: &str, prompt: &str) -> Result<String> {
        const MAX_ATTEMPTS: usize = 2;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self
                .provider
                .generate(model, prompt, self.timings.call_timeout)
                .await
            {
                Ok(text) => return Ok(text),
                Err(EchoError::Overloaded(reason)) if attempts < MAX_ATTEMPTS => {
                    tracing::debug!(model = %model, reason = %reason, "provider overloaded, retrying");
                    tokio::time::sleep(self.timings.overload_backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
