use super::{ClickAnalytics, ClickStats, ClickStore, MappingStore, AnnotationStore, StoreError};
use crate::configuration::DatabaseSettings;
use crate::domain::{Annotation, Mapping, NewClickEvent, NewMapping};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions, sqlite::SqliteJournalMode};
use std::str::FromStr;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn from_config(config: &DatabaseSettings) -> Result<Self, StoreError> {
        let pool = connect(config)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))
    }
}

async fn connect(config: &DatabaseSettings) -> Result<SqlitePool, sqlx::Error> {
    let conn_str = config.connection_string();
    let options = SqliteConnectOptions::from_str(&conn_str)?
        .create_if_missing(config.create_if_missing)
        .journal_mode(SqliteJournalMode::Wal);

    // A pooled `sqlite::memory:` connection is a fresh, empty database per
    // connection — only a single connection keeps the whole pool talking to
    // the same in-memory store, so every other pool size is pinned to 1.
    let max_connections = if conn_str == "sqlite::memory:" {
        1
    } else {
        config.max_connections
    };

    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

fn map_sqlx_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed") => {
            StoreError::Duplicate
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Query(other.to_string()),
    }
}

#[async_trait]
impl MappingStore for SqliteStore {
    async fn insert_pending(&self, new: &NewMapping) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as(
            r#"INSERT INTO mappings
                (alias, original_url, created_at, expires_at, is_active, click_count,
                 password_hash, created_by_ip)
               VALUES (?, ?, ?, ?, true, 0, ?, ?)
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
        sqlx::query("UPDATE mappings SET short_key = ? WHERE id = ?")
            .bind(short_key)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn find_by_effective_key(&self, key: &str) -> Result<Option<Mapping>, StoreError> {
        sqlx::query_as::<_, Mapping>("SELECT * FROM mappings WHERE short_key = ? OR alias = ?")
            .bind(key)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Mapping>, StoreError> {
        sqlx::query_as::<_, Mapping>("SELECT * FROM mappings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn exists_short_key(&self, key: &str) -> Result<bool, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mappings WHERE short_key = ?")
            .bind(key)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.0 > 0)
    }

    async fn exists_alias(&self, alias: &str) -> Result<bool, StoreError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM mappings WHERE alias = ? OR short_key = ?",
        )
        .bind(alias)
        .bind(alias)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.0 > 0)
    }

    async fn increment_clicks(&self, short_key: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE mappings SET click_count = click_count + 1 WHERE short_key = ?")
            .bind(short_key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn mark_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE mappings SET is_active = false WHERE expires_at < ? AND is_active = true",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Mapping>, StoreError> {
        sqlx::query_as::<_, Mapping>(
            "SELECT * FROM mappings WHERE is_active = true ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)
    }

    async fn update_decorations(&self, mapping: &Mapping) -> Result<(), StoreError> {
        sqlx::query(
            r#"UPDATE mappings SET
                meta_title = ?, meta_description = ?, meta_image_url = ?,
                meta_favicon_url = ?, meta_fetched_at = ?,
                ai_summary = ?, ai_category = ?, ai_tags = ?,
                ai_safety_score = ?, ai_analyzed_at = ?
               WHERE id = ?"#,
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
impl ClickStore for SqliteStore {
    async fn insert(&self, event: &NewClickEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO click_events
                (mapping_id, clicked_at, client_ip, user_agent, referer,
                 browser_name, browser_version, os_name, os_version, device_type,
                 country_code, country_name, city, region, timezone)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
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
            "SELECT COUNT(*), MAX(clicked_at) FROM click_events WHERE mapping_id = ?",
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
               WHERE mapping_id = ? GROUP BY country_code ORDER BY 2 DESC"#,
        )
        .bind(mapping_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let by_device: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT device_type, COUNT(*) FROM click_events
               WHERE mapping_id = ? GROUP BY device_type ORDER BY 2 DESC"#,
        )
        .bind(mapping_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let by_browser: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT COALESCE(browser_name, 'unknown'), COUNT(*) FROM click_events
               WHERE mapping_id = ? GROUP BY browser_name ORDER BY 2 DESC"#,
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
impl AnnotationStore for SqliteStore {
    async fn find(&self, url_hash: &str) -> Result<Option<Annotation>, StoreError> {
        sqlx::query_as::<_, Annotation>("SELECT * FROM annotations WHERE url_hash = ?")
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
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
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
