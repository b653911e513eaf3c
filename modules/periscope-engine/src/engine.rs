//! The detection orchestrator.
//!
//! Per organization: load → gate → overlap → reason (once) → validate →
//! score → persist. The all-organizations entry point repeats this
//! sequentially; one organization's failure never stops the rest, and at
//! most one reasoning call is in flight at a time to bound external-API
//! cost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use periscope_common::{Signal, Target};

use crate::overlap::detect_overlaps;
use crate::score::{impact_for, significance, urgency_for};
use crate::traits::{ConnectionReasoner, ProfileStore, SignalWriter};
use crate::validate::{validate, Connection};

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Fewer than two eligible targets — nothing to analyze, not an error.
    Skipped,
}

#[derive(Debug)]
pub struct OrgRunReport {
    pub organization_id: Uuid,
    pub status: RunStatus,
    pub targets_analyzed: u32,
    pub connections_detected: u32,
    pub signals_created: u32,
    pub errors: Vec<String>,
}

impl std::fmt::Display for OrgRunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            RunStatus::Skipped => write!(
                f,
                "Connection detection skipped: {} eligible targets (need 2)",
                self.targets_analyzed
            ),
            RunStatus::Completed => write!(
                f,
                "Connection detection: {} targets analyzed, {} connections detected, \
                 {} signals created ({} errors)",
                self.targets_analyzed,
                self.connections_detected,
                self.signals_created,
                self.errors.len(),
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchRunReport {
    pub organizations_processed: u32,
    pub connections_detected: u32,
    pub signals_created: u32,
    pub errors: Vec<String>,
}

impl std::fmt::Display for BatchRunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Detection batch: {} organizations, {} connections detected, \
             {} signals created ({} errors)",
            self.organizations_processed,
            self.connections_detected,
            self.signals_created,
            self.errors.len(),
        )
    }
}

// =============================================================================
// ConnectionEngine
// =============================================================================

/// Drives connection detection. All collaborators are injected — the engine
/// owns no clients and no store handles of its own.
pub struct ConnectionEngine {
    profiles: Arc<dyn ProfileStore>,
    signals: Arc<dyn SignalWriter>,
    reasoner: Arc<dyn ConnectionReasoner>,
    default_min_facts: u32,
    cancelled: Arc<AtomicBool>,
}

impl ConnectionEngine {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        signals: Arc<dyn SignalWriter>,
        reasoner: Arc<dyn ConnectionReasoner>,
        default_min_facts: u32,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            profiles,
            signals,
            reasoner,
            default_min_facts,
            cancelled,
        }
    }

    /// Run detection for one organization. Store failures propagate to the
    /// caller; reasoning failures and per-signal insert failures do not.
    pub async fn run_organization(
        &self,
        organization_id: Uuid,
        min_facts: Option<u32>,
    ) -> Result<OrgRunReport> {
        let min_facts = min_facts.unwrap_or(self.default_min_facts);

        let targets = self
            .profiles
            .get_active_targets(organization_id, min_facts)
            .await?;

        // Gate on the accumulated profile, not just the stored fact counter —
        // a target whose context hasn't caught up yet has nothing to compare.
        let eligible: Vec<Target> = targets
            .into_iter()
            .filter(|t| t.context.total_facts >= min_facts)
            .collect();

        let mut report = OrgRunReport {
            organization_id,
            status: RunStatus::Skipped,
            targets_analyzed: eligible.len() as u32,
            connections_detected: 0,
            signals_created: 0,
            errors: Vec::new(),
        };

        if eligible.len() < 2 {
            info!(
                organization_id = %organization_id,
                eligible = eligible.len(),
                "Skipping connection detection: need at least 2 eligible targets"
            );
            return Ok(report);
        }

        let organization = self
            .profiles
            .get_organization_context(organization_id)
            .await?;

        let overlaps = detect_overlaps(&eligible);
        info!(
            organization_id = %organization_id,
            targets = eligible.len(),
            relationship = overlaps.relationship.len(),
            geographic = overlaps.geographic.len(),
            topic = overlaps.topic.len(),
            "Overlaps computed"
        );

        // One reasoning call for the whole target set. Any failure is
        // recovered here: an empty candidate list is a normal outcome.
        let raw = match self.reasoner.reason(&eligible, &organization, &overlaps).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    organization_id = %organization_id,
                    kind = e.kind(),
                    error = %e,
                    "Reasoning failed, continuing with no candidates"
                );
                Vec::new()
            }
        };

        let connections = validate(raw, &eligible);
        report.connections_detected = connections.len() as u32;

        for connection in &connections {
            let signal = build_signal(organization_id, connection, &eligible);
            match self.signals.insert_signal(&signal).await {
                Ok(id) => {
                    report.signals_created += 1;
                    info!(
                        signal_id = %id,
                        title = connection.title.as_str(),
                        significance = signal.significance_score,
                        "Connection signal created"
                    );
                }
                Err(e) => {
                    warn!(
                        organization_id = %organization_id,
                        title = connection.title.as_str(),
                        error = %e,
                        "Signal insert failed, continuing with remaining connections"
                    );
                    report
                        .errors
                        .push(format!("signal insert failed for '{}': {e}", connection.title));
                }
            }
        }

        report.status = RunStatus::Completed;
        info!(organization_id = %organization_id, "{report}");
        Ok(report)
    }

    /// Run detection for every organization with enough eligible targets.
    /// Failures are collected per organization; the batch always finishes
    /// unless cancelled.
    pub async fn run_all(&self, min_facts: Option<u32>) -> Result<BatchRunReport> {
        let min_facts = min_facts.unwrap_or(self.default_min_facts);
        let organizations = self.profiles.list_organizations(min_facts).await?;

        info!(count = organizations.len(), "Detection batch starting");

        let mut batch = BatchRunReport::default();
        for organization_id in organizations {
            if self.cancelled.load(Ordering::Relaxed) {
                info!("Detection batch cancelled");
                break;
            }

            match self.run_organization(organization_id, Some(min_facts)).await {
                Ok(report) => {
                    batch.connections_detected += report.connections_detected;
                    batch.signals_created += report.signals_created;
                    batch.errors.extend(
                        report
                            .errors
                            .iter()
                            .map(|e| format!("{organization_id}: {e}")),
                    );
                }
                Err(e) => {
                    warn!(
                        organization_id = %organization_id,
                        error = %e,
                        "Organization run failed, continuing batch"
                    );
                    batch.errors.push(format!("{organization_id}: {e}"));
                }
            }
            batch.organizations_processed += 1;
        }

        info!("{batch}");
        Ok(batch)
    }
}

/// Assemble the persisted record for one validated, scored connection.
/// Built only after validation and scoring complete — never incrementally.
fn build_signal(organization_id: Uuid, connection: &Connection, targets: &[Target]) -> Signal {
    let significance_score = significance(connection, targets);
    let reasoning = if connection.evidence.is_empty() {
        connection.description.clone()
    } else {
        connection.evidence.join(" | ")
    };

    Signal {
        id: Uuid::new_v4(),
        organization_id,
        signal_type: "connection".to_string(),
        signal_subtype: connection.connection_type.to_string(),
        title: connection.title.clone(),
        description: connection.description.clone(),
        primary_target_id: connection.target_ids[0],
        primary_target_name: connection.targets_involved[0].clone(),
        related_target_ids: connection.target_ids[1..].to_vec(),
        related_target_names: connection.targets_involved[1..].to_vec(),
        confidence_score: (connection.strength * 100.0).round() as u8,
        significance_score,
        urgency: urgency_for(significance_score),
        impact_level: impact_for(connection, targets),
        evidence: serde_json::json!(connection.evidence),
        reasoning,
        pattern_data: serde_json::json!({
            "connection_type": connection.connection_type.to_string(),
            "targets_involved": connection.targets_involved,
            "shared_elements": connection.shared_elements,
            "strength": connection.strength,
        }),
        business_implication: connection.business_implication.clone(),
        source_pipeline: "connection_detection".to_string(),
        status: "active".to_string(),
        detected_at: Utc::now(),
    }
}
