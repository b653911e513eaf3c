//! Deterministic fakes and fixture builders.
//!
//! Everything the engine talks to has an in-memory stand-in here, so the
//! orchestration path and the §-level behavioral properties can be exercised
//! without Postgres or network access.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use periscope_common::{
    AccumulatedContext, OrganizationContext, Priority, RegionActivity, RelationshipProfile,
    Signal, Target, TargetType,
};

use crate::overlap::OverlapSet;
use crate::reasoner::{RawConnection, ReasonError};
use crate::traits::{ConnectionReasoner, ProfileStore, SignalWriter};

// =============================================================================
// Fixture builders
// =============================================================================

/// Builder for accumulated contexts with sensible defaults (10 facts, 2
/// recent) so the min-fact gate passes unless a test says otherwise.
#[derive(Debug, Clone, Default)]
pub struct TestContext(AccumulatedContext);

impl TestContext {
    pub fn new() -> Self {
        Self(AccumulatedContext {
            total_facts: 10,
            recent_facts: 2,
            ..Default::default()
        })
    }

    pub fn facts(mut self, total: u32, recent: u32) -> Self {
        self.0.total_facts = total;
        self.0.recent_facts = recent;
        self
    }

    pub fn relationship(self, name: &str) -> Self {
        self.relationship_with_mentions(name, 1)
    }

    pub fn relationship_with_mentions(mut self, name: &str, mentions: u32) -> Self {
        self.0.relationships.insert(
            name.to_string(),
            RelationshipProfile {
                relationship_types: vec!["partner".to_string()],
                mention_count: mentions,
                last_mentioned: None,
                sentiment_avg: 0.0,
            },
        );
        self
    }

    pub fn region(mut self, name: &str) -> Self {
        self.0.geographic_activity.insert(
            name.to_string(),
            RegionActivity {
                fact_count: 3,
                recent_facts: 1,
                dominant_type: None,
            },
        );
        self
    }

    pub fn topic(self, name: &str) -> Self {
        self.topic_with_count(name, 1)
    }

    pub fn topic_with_count(mut self, name: &str, count: u32) -> Self {
        self.0.topic_clusters.insert(name.to_string(), count);
        self
    }

    pub fn build(self) -> AccumulatedContext {
        self.0
    }
}

/// A target with a fresh id, owned by the nil organization until a store
/// assigns it.
pub fn target_with_context(name: &str, priority: Priority, ctx: TestContext) -> Target {
    let context = ctx.build();
    Target {
        id: Uuid::new_v4(),
        organization_id: Uuid::nil(),
        name: name.to_string(),
        target_type: TargetType::Competitor,
        priority,
        fact_count: context.total_facts,
        context,
    }
}

/// A raw candidate in the shape the reasoning engine emits.
pub fn raw_connection(
    connection_type: &str,
    names: &[&str],
    strength: Option<f64>,
) -> RawConnection {
    RawConnection {
        connection_type: Some(connection_type.to_string()),
        title: Some(format!("{} between {}", connection_type, names.join(" and "))),
        targets_involved: names.iter().map(|n| n.to_string()).collect(),
        shared_elements: Vec::new(),
        description: "test candidate".to_string(),
        evidence: vec!["fixture evidence".to_string()],
        strength,
        business_implication: String::new(),
    }
}

// =============================================================================
// MemoryProfileStore
// =============================================================================

#[derive(Default)]
pub struct MemoryProfileStore {
    organizations: Mutex<Vec<(Uuid, OrganizationContext)>>,
    targets: Mutex<Vec<Target>>,
    failing_orgs: Mutex<HashSet<Uuid>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an organization, returning its id.
    pub fn seed_organization(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.organizations.lock().unwrap().push((
            id,
            OrganizationContext {
                name: name.to_string(),
                industry: "testing".to_string(),
                description: format!("{name} fixture organization"),
            },
        ));
        id
    }

    pub fn add_target(&self, organization_id: Uuid, mut target: Target) -> Uuid {
        target.organization_id = organization_id;
        let id = target.id;
        self.targets.lock().unwrap().push(target);
        id
    }

    /// Make `get_active_targets` fail for this organization — simulates a
    /// store query error.
    pub fn fail_targets_for(&self, organization_id: Uuid) {
        self.failing_orgs.lock().unwrap().insert(organization_id);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_active_targets(
        &self,
        organization_id: Uuid,
        min_facts: u32,
    ) -> Result<Vec<Target>> {
        if self.failing_orgs.lock().unwrap().contains(&organization_id) {
            return Err(anyhow!("profile store unavailable"));
        }
        Ok(self
            .targets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.organization_id == organization_id && t.fact_count >= min_facts)
            .cloned()
            .collect())
    }

    async fn get_organization_context(
        &self,
        organization_id: Uuid,
    ) -> Result<OrganizationContext> {
        self.organizations
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| *id == organization_id)
            .map(|(_, ctx)| ctx.clone())
            .ok_or_else(|| anyhow!("organization {organization_id} not found"))
    }

    async fn list_organizations(&self, min_facts: u32) -> Result<Vec<Uuid>> {
        let targets = self.targets.lock().unwrap();
        Ok(self
            .organizations
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| *id)
            .filter(|org_id| {
                targets
                    .iter()
                    .filter(|t| t.organization_id == *org_id && t.fact_count >= min_facts)
                    .count()
                    >= 2
            })
            .collect())
    }
}

// =============================================================================
// MemorySignalSink
// =============================================================================

#[derive(Default)]
pub struct MemorySignalSink {
    signals: Mutex<Vec<Signal>>,
    failing_titles: Mutex<HashSet<String>>,
}

impl MemorySignalSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make inserts fail for signals with this title.
    pub fn fail_title(&self, title: &str) {
        self.failing_titles.lock().unwrap().insert(title.to_string());
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalWriter for MemorySignalSink {
    async fn insert_signal(&self, signal: &Signal) -> Result<Uuid> {
        if self.failing_titles.lock().unwrap().contains(&signal.title) {
            return Err(anyhow!("signal insert failed"));
        }
        self.signals.lock().unwrap().push(signal.clone());
        Ok(signal.id)
    }
}

// =============================================================================
// Reasoner stand-ins
// =============================================================================

/// Returns the same fixed candidates on every call, counting invocations so
/// tests can assert the reasoner was (or was not) consulted.
pub struct StubReasoner {
    responses: Vec<RawConnection>,
    calls: AtomicU32,
}

impl StubReasoner {
    pub fn returning(responses: Vec<RawConnection>) -> Self {
        Self {
            responses,
            calls: AtomicU32::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ConnectionReasoner for StubReasoner {
    async fn reason(
        &self,
        _targets: &[Target],
        _organization: &OrganizationContext,
        _overlaps: &OverlapSet,
    ) -> Result<Vec<RawConnection>, ReasonError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.responses.clone())
    }
}

/// Always fails with the configured error kind.
pub struct FailingReasoner {
    kind: &'static str,
}

impl FailingReasoner {
    pub fn engine() -> Self {
        Self { kind: "engine" }
    }

    pub fn timeout() -> Self {
        Self { kind: "timeout" }
    }

    pub fn missing_payload() -> Self {
        Self {
            kind: "missing_payload",
        }
    }
}

#[async_trait]
impl ConnectionReasoner for FailingReasoner {
    async fn reason(
        &self,
        _targets: &[Target],
        _organization: &OrganizationContext,
        _overlaps: &OverlapSet,
    ) -> Result<Vec<RawConnection>, ReasonError> {
        Err(match self.kind {
            "timeout" => ReasonError::Timeout(std::time::Duration::from_secs(45)),
            "missing_payload" => ReasonError::MissingPayload,
            _ => ReasonError::Engine("simulated engine failure".to_string()),
        })
    }
}
