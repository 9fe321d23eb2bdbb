//! PostgreSQL governance store.
//!
//! Schema is initialized on connect. Save/load calls fold every transport
//! or serialization error into a structured outcome and an audit entry;
//! nothing here propagates past the call boundary.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::warn;
use vigil_types::{
    ControllerState, SuppressionSnapshot, WeightSaveReason, WeightVector, WeightsHistoryRow,
    WeightsLatestRow,
};

use crate::audit::{AuditAction, AuditEntity, AuditRing, PersistenceAuditEntry};
use crate::error::{StorageError, StorageResult};
use crate::traits::{GovernanceStore, LoadOutcome, PersistOutcome};

/// PostgreSQL-backed governance store.
pub struct PostgresStore {
    pool: PgPool,
    audit: AuditRing,
}

impl PostgresStore {
    /// Connect to PostgreSQL and initialize the schema.
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self {
            pool,
            audit: AuditRing::default(),
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> StorageResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS vigil_weights_latest (
                version BIGINT PRIMARY KEY,
                weights JSONB NOT NULL,
                controller JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS vigil_weights_history (
                id BIGSERIAL PRIMARY KEY,
                cycle BIGINT NOT NULL,
                strategy TEXT NOT NULL,
                weights JSONB NOT NULL,
                reason TEXT NOT NULL,
                meta JSONB NOT NULL,
                saved_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS vigil_weights_history_saved_at
               ON vigil_weights_history(saved_at DESC);"#,
            r#"
            CREATE TABLE IF NOT EXISTS vigil_suppression_states (
                dedup_group TEXT PRIMARY KEY,
                data JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS vigil_persistence_audit (
                id BIGSERIAL PRIMARY KEY,
                action TEXT NOT NULL,
                entity TEXT NOT NULL,
                version_or_count BIGINT NOT NULL,
                duration_ms BIGINT NOT NULL,
                success BOOLEAN NOT NULL,
                error TEXT,
                at TIMESTAMPTZ NOT NULL
            );
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Schema(e.to_string()))?;
        }
        Ok(())
    }

    /// Record an audit entry in memory and, best-effort, in the database.
    async fn record_audit(&self, entry: PersistenceAuditEntry) {
        let result = sqlx::query(
            r#"INSERT INTO vigil_persistence_audit
               (action, entity, version_or_count, duration_ms, success, error, at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(entry.action.to_string())
        .bind(entry.entity.to_string())
        .bind(entry.version_or_count)
        .bind(entry.duration_ms as i64)
        .bind(entry.success)
        .bind(entry.error.clone())
        .bind(entry.at)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            // The in-memory ring still holds the entry.
            warn!(error = %e, "audit row insert failed");
        }
        self.audit.push(entry);
    }

    fn parse_reason(raw: &str) -> WeightSaveReason {
        match raw {
            "cooldown" => WeightSaveReason::Cooldown,
            "freeze" => WeightSaveReason::Freeze,
            _ => WeightSaveReason::Applied,
        }
    }
}

#[async_trait]
impl GovernanceStore for PostgresStore {
    fn is_configured(&self) -> bool {
        true
    }

    async fn save_weights(
        &self,
        latest: &WeightsLatestRow,
        history: &WeightsHistoryRow,
    ) -> PersistOutcome {
        let start = Instant::now();

        let result: Result<(), sqlx::Error> = async {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                r#"INSERT INTO vigil_weights_latest (version, weights, controller, updated_at)
                   VALUES ($1, $2, $3, $4)
                   ON CONFLICT (version) DO UPDATE
                   SET weights = EXCLUDED.weights,
                       controller = EXCLUDED.controller,
                       updated_at = EXCLUDED.updated_at"#,
            )
            .bind(latest.version)
            .bind(serde_json::to_value(latest.weights).unwrap_or_default())
            .bind(serde_json::to_value(&latest.controller).unwrap_or_default())
            .bind(latest.updated_at)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"INSERT INTO vigil_weights_history
                   (cycle, strategy, weights, reason, meta, saved_at)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(history.cycle as i64)
            .bind(&history.strategy)
            .bind(serde_json::to_value(history.weights).unwrap_or_default())
            .bind(history.reason.to_string())
            .bind(serde_json::Value::Object(history.meta.clone()))
            .bind(history.saved_at)
            .execute(&mut *tx)
            .await?;

            tx.commit().await
        }
        .await;

        let (outcome, success, error) = match result {
            Ok(()) => (PersistOutcome::Saved, true, None),
            Err(e) => {
                let msg = e.to_string();
                (PersistOutcome::Failed(msg.clone()), false, Some(msg))
            }
        };

        self.record_audit(PersistenceAuditEntry::new(
            AuditAction::Save,
            AuditEntity::Weights,
            latest.version,
            start.elapsed().as_millis() as u64,
            success,
            error,
        ))
        .await;
        outcome
    }

    async fn load_weights(&self) -> LoadOutcome<WeightsLatestRow> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"SELECT version, weights, controller, updated_at
               FROM vigil_weights_latest
               ORDER BY updated_at DESC
               LIMIT 1"#,
        )
        .fetch_optional(&self.pool)
        .await;

        let (outcome, success, error) = match result {
            Ok(None) => (LoadOutcome::Empty, true, None),
            Ok(Some(row)) => {
                let version: i64 = row.try_get("version").unwrap_or(0);
                let weights_json: serde_json::Value =
                    row.try_get("weights").unwrap_or(serde_json::Value::Null);
                let controller_json: serde_json::Value =
                    row.try_get("controller").unwrap_or(serde_json::Value::Null);
                let updated_at: DateTime<Utc> = row.try_get("updated_at").unwrap_or_else(|_| Utc::now());

                // A corrupt column degrades to defaults instead of failing
                // the load; the weight vector is renormalized downstream.
                let weights: WeightVector =
                    serde_json::from_value(weights_json).unwrap_or_default();
                let controller: ControllerState =
                    serde_json::from_value(controller_json).unwrap_or_default();

                (
                    LoadOutcome::Loaded(WeightsLatestRow {
                        version,
                        weights,
                        controller,
                        updated_at,
                    }),
                    true,
                    None,
                )
            }
            Err(e) => {
                let msg = e.to_string();
                (LoadOutcome::Failed(msg.clone()), false, Some(msg))
            }
        };

        self.record_audit(PersistenceAuditEntry::new(
            AuditAction::Load,
            AuditEntity::Weights,
            0,
            start.elapsed().as_millis() as u64,
            success,
            error,
        ))
        .await;
        outcome
    }

    async fn save_suppression_states(&self, rows: &[SuppressionSnapshot]) -> PersistOutcome {
        let start = Instant::now();

        let result: Result<(), sqlx::Error> = async {
            let mut tx = self.pool.begin().await?;

            for row in rows {
                sqlx::query(
                    r#"INSERT INTO vigil_suppression_states (dedup_group, data, updated_at)
                       VALUES ($1, $2, $3)
                       ON CONFLICT (dedup_group) DO UPDATE
                       SET data = EXCLUDED.data,
                           updated_at = EXCLUDED.updated_at"#,
                )
                .bind(row.dedup_group.as_str())
                .bind(serde_json::to_value(row).unwrap_or_default())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await
        }
        .await;

        let (outcome, success, error) = match result {
            Ok(()) => (PersistOutcome::Saved, true, None),
            Err(e) => {
                let msg = e.to_string();
                (PersistOutcome::Failed(msg.clone()), false, Some(msg))
            }
        };

        self.record_audit(PersistenceAuditEntry::new(
            AuditAction::Save,
            AuditEntity::SuppressionState,
            rows.len() as i64,
            start.elapsed().as_millis() as u64,
            success,
            error,
        ))
        .await;
        outcome
    }

    async fn load_suppression_states(&self, limit: usize) -> LoadOutcome<Vec<SuppressionSnapshot>> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"SELECT data FROM vigil_suppression_states
               ORDER BY updated_at DESC
               LIMIT $1"#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;

        let (outcome, success, error) = match result {
            Ok(rows) if rows.is_empty() => (LoadOutcome::Empty, true, None),
            Ok(rows) => {
                let mut snapshots = Vec::with_capacity(rows.len());
                for row in rows {
                    let data: serde_json::Value =
                        row.try_get("data").unwrap_or(serde_json::Value::Null);
                    match serde_json::from_value::<SuppressionSnapshot>(data) {
                        Ok(snapshot) => snapshots.push(snapshot),
                        Err(e) => {
                            // One corrupt row must not block hydration.
                            warn!(error = %e, "skipping malformed suppression row");
                        }
                    }
                }
                (LoadOutcome::Loaded(snapshots), true, None)
            }
            Err(e) => {
                let msg = e.to_string();
                (LoadOutcome::Failed(msg.clone()), false, Some(msg))
            }
        };

        let count = match &outcome {
            LoadOutcome::Loaded(rows) => rows.len() as i64,
            _ => 0,
        };
        self.record_audit(PersistenceAuditEntry::new(
            AuditAction::Load,
            AuditEntity::SuppressionState,
            count,
            start.elapsed().as_millis() as u64,
            success,
            error,
        ))
        .await;
        outcome
    }

    async fn load_weight_history(&self, limit: usize) -> LoadOutcome<Vec<WeightsHistoryRow>> {
        let result = sqlx::query(
            r#"SELECT cycle, strategy, weights, reason, meta, saved_at
               FROM vigil_weights_history
               ORDER BY saved_at DESC
               LIMIT $1"#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;

        match result {
            Ok(rows) if rows.is_empty() => LoadOutcome::Empty,
            Ok(rows) => {
                let mut history = Vec::with_capacity(rows.len());
                for row in rows {
                    let cycle: i64 = row.try_get("cycle").unwrap_or(0);
                    let strategy: String = row
                        .try_get("strategy")
                        .unwrap_or_else(|_| "weighted_sum".to_string());
                    let weights_json: serde_json::Value =
                        row.try_get("weights").unwrap_or(serde_json::Value::Null);
                    let reason: String = row.try_get("reason").unwrap_or_default();
                    let meta_json: serde_json::Value =
                        row.try_get("meta").unwrap_or(serde_json::Value::Null);
                    let saved_at: DateTime<Utc> =
                        row.try_get("saved_at").unwrap_or_else(|_| Utc::now());

                    history.push(WeightsHistoryRow {
                        cycle: cycle.max(0) as u64,
                        strategy,
                        weights: serde_json::from_value(weights_json).unwrap_or_default(),
                        reason: Self::parse_reason(&reason),
                        meta: meta_json.as_object().cloned().unwrap_or_default(),
                        saved_at,
                    });
                }
                LoadOutcome::Loaded(history)
            }
            Err(e) => LoadOutcome::Failed(e.to_string()),
        }
    }

    fn recent_audit(&self, limit: usize) -> Vec<PersistenceAuditEntry> {
        self.audit.recent(limit)
    }
}
