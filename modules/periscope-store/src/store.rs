//! Postgres implementation of the engine's store traits.
//!
//! Targets and their accumulated contexts are written by the upstream
//! collection pipelines; this crate only reads them. Signals are
//! insert-only — re-runs append new rows.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use periscope_common::{
    AccumulatedContext, OrganizationContext, PeriscopeError, Priority, Signal, Target, TargetType,
};
use periscope_engine::{ProfileStore, SignalWriter};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row wrapper so the FromRow impl lives beside the queries that produce it.
struct TargetRow(Target);

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for TargetRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        let target_type: String = row.try_get("target_type")?;
        let priority: String = row.try_get("priority")?;
        let fact_count: i32 = row.try_get("fact_count")?;
        let context_raw: serde_json::Value = row.try_get("accumulated_context")?;

        // A context written by an older pipeline version may miss fields;
        // serde defaults fill them rather than failing the whole query.
        let context: AccumulatedContext = serde_json::from_value(context_raw).unwrap_or_default();

        Ok(TargetRow(Target {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            name: row.try_get("name")?,
            target_type: target_type.parse().unwrap_or(TargetType::Competitor),
            priority: priority.parse().unwrap_or(Priority::Medium),
            fact_count: fact_count.max(0) as u32,
            context,
        }))
    }
}

#[async_trait]
impl ProfileStore for PostgresStore {
    async fn get_active_targets(
        &self,
        organization_id: Uuid,
        min_facts: u32,
    ) -> Result<Vec<Target>> {
        let rows = sqlx::query_as::<_, TargetRow>(
            r#"
            SELECT id, organization_id, name, target_type, priority, fact_count,
                   accumulated_context
            FROM targets
            WHERE organization_id = $1
              AND status = 'active'
              AND fact_count >= $2
            ORDER BY fact_count DESC, name ASC
            "#,
        )
        .bind(organization_id)
        .bind(min_facts as i32)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn get_organization_context(
        &self,
        organization_id: Uuid,
    ) -> Result<OrganizationContext> {
        let row = sqlx::query(
            "SELECT name, industry, description FROM organizations WHERE id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| PeriscopeError::OrganizationNotFound(organization_id.to_string()))?;

        Ok(OrganizationContext {
            name: row.try_get("name")?,
            industry: row.try_get("industry")?,
            description: row.try_get("description")?,
        })
    }

    async fn list_organizations(&self, min_facts: u32) -> Result<Vec<Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            r#"
            SELECT organization_id
            FROM targets
            WHERE status = 'active' AND fact_count >= $1
            GROUP BY organization_id
            HAVING count(*) >= 2
            ORDER BY organization_id
            "#,
        )
        .bind(min_facts as i32)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl SignalWriter for PostgresStore {
    async fn insert_signal(&self, signal: &Signal) -> Result<Uuid> {
        let row = sqlx::query_as::<_, (Uuid,)>(
            r#"
            INSERT INTO signals (
                id, organization_id, signal_type, signal_subtype, title, description,
                primary_target_id, primary_target_name,
                related_target_ids, related_target_names,
                confidence_score, significance_score, urgency, impact_level,
                evidence, reasoning, pattern_data, business_implication,
                source_pipeline, status, detected_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING id
            "#,
        )
        .bind(signal.id)
        .bind(signal.organization_id)
        .bind(&signal.signal_type)
        .bind(&signal.signal_subtype)
        .bind(&signal.title)
        .bind(&signal.description)
        .bind(signal.primary_target_id)
        .bind(&signal.primary_target_name)
        .bind(&signal.related_target_ids)
        .bind(&signal.related_target_names)
        .bind(signal.confidence_score as i16)
        .bind(signal.significance_score as i16)
        .bind(signal.urgency.to_string())
        .bind(signal.impact_level.to_string())
        .bind(&signal.evidence)
        .bind(&signal.reasoning)
        .bind(&signal.pattern_data)
        .bind(&signal.business_implication)
        .bind(&signal.source_pipeline)
        .bind(&signal.status)
        .bind(signal.detected_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}
