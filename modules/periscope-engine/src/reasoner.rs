//! The Claude-backed connection reasoner.
//!
//! One text-completion call per organization per run. The response is
//! untrusted: candidates are parsed leniently here and rejected strictly in
//! `validate`. Every failure mode maps to a `ReasonError` variant so the
//! orchestrator can log the kind and continue with an empty candidate list.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use ai_client::util::strip_code_blocks;
use ai_client::Claude;
use periscope_common::{OrganizationContext, Target};

use crate::brief::build_reasoning_prompt;
use crate::overlap::OverlapSet;
use crate::traits::ConnectionReasoner;

/// Hard cap on candidates accepted from a single reasoning call.
pub const MAX_CONNECTIONS_PER_RUN: usize = 4;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

const SYSTEM_PROMPT: &str = "\
You are a competitive-intelligence analyst looking across an organization's \
monitored targets for connections no single-target view would surface.

HARD RULES:
1. Only propose PREDICTIVE, non-obvious connections. A connection that \
merely restates a supplied overlap (\"both operate in region X\") is \
worthless — state the forward-looking implication instead (\"both converging \
on region X predicts a pricing conflict within weeks\").
2. Only name targets from the MONITORED TARGETS list, spelled exactly as \
given. Never invent entities.
3. Every connection must cite concrete evidence drawn from the briefs.
4. Return at most 4 connections. Zero is a valid answer.

Respond with a JSON array (no surrounding prose needed). Each element:
{
  \"connection_type\": one of \"competitive_clash\", \"market_convergence\", \
\"supply_chain\", \"shared_relationship\", \"timing_correlation\", \"topic_overlap\",
  \"title\": short headline,
  \"targets_involved\": [exact target names, at least 2],
  \"shared_elements\": [the overlapping contacts/regions/topics involved],
  \"description\": what is converging and why it matters,
  \"evidence\": [specific facts from the briefs],
  \"strength\": 0.0-1.0,
  \"business_implication\": the so-what for the monitoring organization
}";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ReasonError {
    #[error("reasoning engine call failed: {0}")]
    Engine(String),

    #[error("reasoning engine call timed out after {0:?}")]
    Timeout(Duration),

    #[error("no JSON array found in reasoning response")]
    MissingPayload,

    #[error("reasoning response array failed to parse: {0}")]
    Malformed(#[source] serde_json::Error),
}

impl ReasonError {
    /// Stable tag for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ReasonError::Engine(_) => "engine",
            ReasonError::Timeout(_) => "timeout",
            ReasonError::MissingPayload => "missing_payload",
            ReasonError::Malformed(_) => "malformed",
        }
    }
}

// =============================================================================
// Raw candidates
// =============================================================================

/// A candidate connection exactly as the reasoning engine proposed it.
/// Every field is optional or defaulted — rejection is the validator's job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConnection {
    #[serde(default)]
    pub connection_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub targets_involved: Vec<String>,
    #[serde(default)]
    pub shared_elements: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub strength: Option<f64>,
    #[serde(default)]
    pub business_implication: String,
}

// =============================================================================
// Response parsing
// =============================================================================

/// Slice out the first top-level JSON array, string-aware so brackets inside
/// string values don't confuse the depth count.
pub(crate) fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a reasoning response into raw candidates. Elements that are not
/// connection-shaped objects are dropped individually; the rest survive.
pub(crate) fn parse_connections(response: &str) -> Result<Vec<RawConnection>, ReasonError> {
    let cleaned = strip_code_blocks(response);
    let array = extract_json_array(cleaned).ok_or(ReasonError::MissingPayload)?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(array).map_err(ReasonError::Malformed)?;

    let mut connections = Vec::new();
    for value in values {
        match serde_json::from_value::<RawConnection>(value) {
            Ok(connection) => connections.push(connection),
            Err(e) => debug!(error = %e, "Dropping non-object candidate element"),
        }
        if connections.len() == MAX_CONNECTIONS_PER_RUN {
            break;
        }
    }
    Ok(connections)
}

// =============================================================================
// ClaudeReasoner
// =============================================================================

/// Network-backed reasoner. Constructed once at process start and injected
/// into the engine — no shared global client.
pub struct ClaudeReasoner {
    client: Claude,
    timeout: Duration,
}

impl ClaudeReasoner {
    pub fn new(client: Claude) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ConnectionReasoner for ClaudeReasoner {
    async fn reason(
        &self,
        targets: &[Target],
        organization: &OrganizationContext,
        overlaps: &OverlapSet,
    ) -> Result<Vec<RawConnection>, ReasonError> {
        let prompt = build_reasoning_prompt(targets, organization, overlaps);

        debug!(
            targets = targets.len(),
            overlaps = overlaps.total(),
            model = self.client.model(),
            "Reasoning call"
        );

        let response = tokio::time::timeout(
            self.timeout,
            self.client.chat_completion(SYSTEM_PROMPT, &prompt),
        )
        .await
        .map_err(|_| ReasonError::Timeout(self.timeout))?
        .map_err(|e| ReasonError::Engine(e.to_string()))?;

        parse_connections(&response)
    }
}
