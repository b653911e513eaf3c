//! Idempotent schema setup, run at process start.

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS organizations (
        id          UUID         PRIMARY KEY DEFAULT gen_random_uuid(),
        name        TEXT         NOT NULL,
        industry    TEXT         NOT NULL DEFAULT '',
        description TEXT         NOT NULL DEFAULT '',
        created_at  TIMESTAMPTZ  NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS targets (
        id                  UUID         PRIMARY KEY DEFAULT gen_random_uuid(),
        organization_id     UUID         NOT NULL REFERENCES organizations(id),
        name                TEXT         NOT NULL,
        target_type         TEXT         NOT NULL DEFAULT 'competitor',
        priority            TEXT         NOT NULL DEFAULT 'medium',
        status              TEXT         NOT NULL DEFAULT 'active',
        fact_count          INTEGER      NOT NULL DEFAULT 0,
        accumulated_context JSONB        NOT NULL DEFAULT '{}'::jsonb,
        created_at          TIMESTAMPTZ  NOT NULL DEFAULT now(),
        updated_at          TIMESTAMPTZ  NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_targets_org ON targets(organization_id)",
    r#"
    CREATE TABLE IF NOT EXISTS signals (
        id                   UUID         PRIMARY KEY,
        organization_id      UUID         NOT NULL REFERENCES organizations(id),
        signal_type          TEXT         NOT NULL,
        signal_subtype       TEXT         NOT NULL,
        title                TEXT         NOT NULL,
        description          TEXT         NOT NULL DEFAULT '',
        primary_target_id    UUID         NOT NULL,
        primary_target_name  TEXT         NOT NULL,
        related_target_ids   UUID[]       NOT NULL DEFAULT '{}',
        related_target_names TEXT[]       NOT NULL DEFAULT '{}',
        confidence_score     SMALLINT     NOT NULL,
        significance_score   SMALLINT     NOT NULL,
        urgency              TEXT         NOT NULL,
        impact_level         TEXT         NOT NULL,
        evidence             JSONB        NOT NULL DEFAULT '[]'::jsonb,
        reasoning            TEXT         NOT NULL DEFAULT '',
        pattern_data         JSONB        NOT NULL DEFAULT '{}'::jsonb,
        business_implication TEXT         NOT NULL DEFAULT '',
        source_pipeline      TEXT         NOT NULL,
        status               TEXT         NOT NULL DEFAULT 'active',
        detected_at          TIMESTAMPTZ  NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_signals_org_type ON signals(organization_id, signal_type)",
];

/// Apply the schema. Every statement is IF NOT EXISTS, so repeated startup
/// runs are harmless.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Schema migrations applied");
    Ok(())
}
