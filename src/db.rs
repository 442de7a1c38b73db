use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgQueryResult, types::Json};

use crate::{
    alexa::Attributes,
    attributes::{AttributeStore, StoreError},
};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPool::connect(database_url).await
}

pub async fn create_attributes_table(pool: &PgPool) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        "
            CREATE TABLE IF NOT EXISTS skill_attributes (
                user_id TEXT PRIMARY KEY,
                attributes JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
        ",
    )
    .execute(pool)
    .await
}

pub async fn upsert_attributes(
    pool: &PgPool,
    user_id: &str,
    attributes: &Attributes,
) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        "
            INSERT INTO skill_attributes (
                user_id,
                attributes,
                updated_at
            ) VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET
                attributes = EXCLUDED.attributes,
                updated_at = EXCLUDED.updated_at
        ",
    )
    .bind(user_id)
    .bind(Json(attributes))
    .bind(Utc::now())
    .execute(pool)
    .await
    .inspect_err(|err| {
        tracing::error!("Failed to upsert attributes for user_id={}: {}", user_id, err);
    })
}

pub async fn query_attributes(pool: &PgPool, user_id: &str) -> Result<Option<Value>, sqlx::Error> {
    let row = sqlx::query(
        "
            SELECT attributes FROM skill_attributes
                WHERE user_id = $1
        ",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| row.get::<Json<Value>, &str>("attributes").0))
}

pub struct PgAttributeStore {
    pool: PgPool,
}

impl PgAttributeStore {
    pub fn new(pool: PgPool) -> Self {
        PgAttributeStore { pool }
    }
}

#[async_trait]
impl AttributeStore for PgAttributeStore {
    async fn get(&self, user_id: &str) -> Result<Option<Attributes>, StoreError> {
        match query_attributes(&self.pool, user_id).await? {
            Some(value) => Ok(Some(serde_json::from_value::<Attributes>(value)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, user_id: &str, attributes: &Attributes) -> Result<(), StoreError> {
        upsert_attributes(&self.pool, user_id, attributes).await?;
        Ok(())
    }
}
