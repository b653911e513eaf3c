//! Capability seams for the detection engine.
//!
//! The orchestrator only ever talks to these traits. Postgres implements the
//! store traits in periscope-store; the Claude-backed reasoner lives in
//! `reasoner`, and deterministic fakes for all three live in `testutil`.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use periscope_common::{OrganizationContext, Signal, Target};

use crate::overlap::OverlapSet;
use crate::reasoner::{RawConnection, ReasonError};

/// Read side of the profile store. Targets and their accumulated contexts
/// are owned by the upstream collection pipelines; this engine never writes
/// them.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Active targets for an organization with `fact_count >= min_facts`.
    async fn get_active_targets(
        &self,
        organization_id: Uuid,
        min_facts: u32,
    ) -> Result<Vec<Target>>;

    /// Free-text descriptive context for the organization.
    async fn get_organization_context(&self, organization_id: Uuid)
        -> Result<OrganizationContext>;

    /// Organizations that have at least two targets meeting `min_facts`,
    /// i.e. the ones worth running detection for.
    async fn list_organizations(&self, min_facts: u32) -> Result<Vec<Uuid>>;
}

/// Write side: persists validated, scored connection signals.
#[async_trait]
pub trait SignalWriter: Send + Sync {
    async fn insert_signal(&self, signal: &Signal) -> Result<Uuid>;
}

/// The external reasoning engine, behind a seam so the validator's contract
/// can be exercised without network calls.
///
/// Returns raw, untrusted candidates. Every error variant is recovered by
/// the orchestrator — a reasoning failure yields an empty candidate list,
/// never an aborted run.
#[async_trait]
pub trait ConnectionReasoner: Send + Sync {
    async fn reason(
        &self,
        targets: &[Target],
        organization: &OrganizationContext,
        overlaps: &OverlapSet,
    ) -> Result<Vec<RawConnection>, ReasonError>;
}
