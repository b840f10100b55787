use super::{ClickAnalytics, ClickStats, ClickStore, MappingStore, AnnotationStore, StoreError};
use crate::configuration::DatabaseSettings;
use crate::domain::{Annotation, Mapping, NewClickEvent, NewMapping};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn from_config(config: &DatabaseSettings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations/pg")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))
    }
}

fn map_sqlx_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Query(other.to_string()),
    }
}

#[async_trait]
impl MappingStore for PostgresStore {
    async fn insert_pending(&self, new: &NewMapping) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as(
            r#"INSERT INTO mappings
                (alias, original_url, created_at, expires_at, is_active, click_count,
                 password_hash, created_by_ip)
               VALUES ($1, $2, $3, $4, true, 0, $5, $6)
               RETURNING id"#,
        )
        .bind(&new.alias)
        .bind(&new.original_url)
        .bind(Utc::now())
        .bind(new.expires_at)
        .bind(&new.password_hash)
        .bind(&new.created_by_ip)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(row.0)
    }

    async fn assign_short_key(&self, id: i64, short_key: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE mappings SET short_key = $1 WHERE id = $2")
            .bind(short_key)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn find_by_effective_key(&self, key: &str) -> Result<Option<Mapping>, StoreError> {
        sqlx::query_as::<_, Mapping>("SELECT * FROM mappings WHERE short_key = $1 OR alias = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Mapping>, StoreError> {
        sqlx::query_as::<_, Mapping>("SELECT * FROM mappings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn exists_short_key(&self, key: &str) -> Result<bool, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mappings WHERE short_key = $1")
            .bind(key)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.0 > 0)
    }

    async fn exists_alias(&self, alias: &str) -> Result<bool, StoreError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM mappings WHERE alias = $1 OR short_key = $1",
        )
        .bind(alias)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.0 > 0)
    }

    async fn increment_clicks(&self, short_key: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE mappings SET click_count = click_count + 1 WHERE short_key = $1")
            .bind(short_key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn mark_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE mappings SET is_active = false WHERE expires_at < $1 AND is_active = true",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Mapping>, StoreError> {
        sqlx::query_as::<_, Mapping>(
            "SELECT * FROM mappings WHERE is_active = true ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)
    }

    async fn update_decorations(&self, mapping: &Mapping) -> Result<(), StoreError> {
        sqlx::query(
            r#"UPDATE mappings SET
                meta_title = $1, meta_description = $2, meta_image_url = $3,
                meta_favicon_url = $4, meta_fetched_at = $5,
                ai_summary = $6, ai_category = $7, ai_tags = $8,
                ai_safety_score = $9, ai_analyzed_at = $10
               WHERE id = $11"#,
        )
        .bind(&mapping.meta_title)
        .bind(&mapping.meta_description)
        .bind(&mapping.meta_image_url)
        .bind(&mapping.meta_favicon_url)
        .bind(mapping.meta_fetched_at)
        .bind(&mapping.ai_summary)
        .bind(&mapping.ai_category)
        .bind(&mapping.ai_tags)
        .bind(mapping.ai_safety_score)
        .bind(mapping.ai_analyzed_at)
        .bind(mapping.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }
}

#[async_trait]
impl ClickStore for PostgresStore {
    async fn insert(&self, event: &NewClickEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO click_events
                (mapping_id, clicked_at, client_ip, user_agent, referer,
                 browser_name, browser_version, os_name, os_version, device_type,
                 country_code, country_name, city, region, timezone)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
        )
        .bind(event.mapping_id)
        .bind(Utc::now())
        .bind(&event.client_ip)
        .bind(&event.user_agent)
        .bind(&event.referer)
        .bind(&event.browser_name)
        .bind(&event.browser_version)
        .bind(&event.os_name)
        .bind(&event.os_version)
        .bind(event.device_type.as_str())
        .bind(&event.country_code)
        .bind(&event.country_name)
        .bind(&event.city)
        .bind(&event.region)
        .bind(&event.timezone)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn stats(&self, mapping_id: i64) -> Result<ClickStats, StoreError> {
        let row: (i64, Option<DateTime<Utc>>) = sqlx::query_as(
            "SELECT COUNT(*), MAX(clicked_at) FROM click_events WHERE mapping_id = $1",
        )
        .bind(mapping_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(ClickStats {
            total_clicks: row.0,
            last_clicked_at: row.1,
        })
    }

    async fn analytics(&self, mapping_id: i64) -> Result<ClickAnalytics, StoreError> {
        let by_country: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT COALESCE(country_code, 'unknown'), COUNT(*) FROM click_events
               WHERE mapping_id = $1 GROUP BY country_code ORDER BY 2 DESC"#,
        )
        .bind(mapping_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let by_device: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT device_type, COUNT(*) FROM click_events
               WHERE mapping_id = $1 GROUP BY device_type ORDER BY 2 DESC"#,
        )
        .bind(mapping_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let by_browser: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT COALESCE(browser_name, 'unknown'), COUNT(*) FROM click_events
               WHERE mapping_id = $1 GROUP BY browser_name ORDER BY 2 DESC"#,
        )
        .bind(mapping_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(ClickAnalytics {
            by_country,
            by_device,
            by_browser,
        })
    }
}

#[async_trait]
impl AnnotationStore for PostgresStore {
    async fn find(&self, url_hash: &str) -> Result<Option<Annotation>, StoreError> {
        sqlx::query_as::<_, Annotation>("SELECT * FROM annotations WHERE url_hash = $1")
            .bind(url_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn upsert(&self, annotation: &Annotation) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO annotations
                (url_hash, original_url, summary, category, tags, safety_score,
                 is_safe, safety_reasons, analyzed_at, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               ON CONFLICT(url_hash) DO UPDATE SET
                 original_url = excluded.original_url,
                 summary = excluded.summary,
                 category = excluded.category,
                 tags = excluded.tags,
                 safety_score = excluded.safety_score,
                 is_safe = excluded.is_safe,
                 safety_reasons = excluded.safety_reasons,
                 analyzed_at = excluded.analyzed_at,
                 expires_at = excluded.expires_at"#,
        )
        .bind(&annotation.url_hash)
        .bind(&annotation.original_url)
        .bind(&annotation.summary)
        .bind(&annotation.category)
        .bind(&annotation.tags)
        .bind(annotation.safety_score)
        .bind(annotation.is_safe)
        .bind(&annotation.safety_reasons)
        .bind(annotation.analyzed_at)
        .bind(annotation.expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }
}
