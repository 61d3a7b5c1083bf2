//! Postgres-backed pick store. Ranking columns are denormalized next to a JSONB document so the
//! pending query can be served from an index while foreign fields still ride in the document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picks_core::{PickStatus, ScoredPick};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::debug;

use crate::{
    document_to_pick, merge_document, pick_to_document, PendingQuery, PickStore, StoreError,
};

#[derive(Debug, Clone)]
pub struct PgPickStore {
    pool: PgPool,
}

impl PgPickStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Settle a pick. Returns whether the id existed.
    pub async fn set_status(&self, id: &str, status: PickStatus) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE picks
               SET status = $2,
                   document = jsonb_set(document, '{status}', to_jsonb($2::text))
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PickStore for PgPickStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM picks WHERE id = $1) AS found")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("found")?)
    }

    async fn batch_upsert_merge(&self, picks: &[ScoredPick]) -> Result<usize, StoreError> {
        if picks.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for pick in picks {
            let document = Value::Object(merge_document(None, pick_to_document(pick)?));
            sqlx::query(
                r#"
                INSERT INTO picks (
                    id, sport, consensus_strength, confidence_score,
                    status, first_seen, last_updated, document
                )
                VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7)
                ON CONFLICT (id) DO UPDATE
                   SET sport = EXCLUDED.sport,
                       consensus_strength = EXCLUDED.consensus_strength,
                       confidence_score = EXCLUDED.confidence_score,
                       last_updated = EXCLUDED.last_updated,
                       document = picks.document || (EXCLUDED.document - 'firstSeen' - 'status')
                "#,
            )
            .bind(&pick.id)
            .bind(pick.sport.as_str())
            .bind(pick.consensus_strength as i32)
            .bind(pick.confidence_score)
            .bind(pick.first_seen)
            .bind(pick.last_updated)
            .bind(&document)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(count = picks.len(), "pick batch committed");
        Ok(picks.len())
    }

    async fn query_pending(&self, query: &PendingQuery) -> Result<Vec<ScoredPick>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, status, first_seen, document
              FROM picks
             WHERE status = 'pending'
               AND ($1::text IS NULL OR sport = $1)
               AND consensus_strength >= $2
             ORDER BY consensus_strength DESC, confidence_score DESC
             LIMIT $3
            "#,
        )
        .bind(query.sport.map(|s| s.as_str()))
        .bind(query.min_consensus as i32)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let status: String = row.try_get("status")?;
            let first_seen: DateTime<Utc> = row.try_get("first_seen")?;
            let document: Value = row.try_get("document")?;
            let Value::Object(mut doc) = document else {
                return Err(StoreError::Corrupt {
                    id,
                    reason: "document column is not an object".into(),
                });
            };
            // the columns are authoritative for store-owned fields
            doc.insert("status".into(), Value::String(status));
            doc.insert("firstSeen".into(), serde_json::to_value(first_seen)?);
            out.push(document_to_pick(&id, &doc)?);
        }
        Ok(out)
    }
}
