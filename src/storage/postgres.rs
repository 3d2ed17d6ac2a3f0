//! Postgres video repository
//!
//! Queries are runtime-checked and parameterized, so the crate builds without
//! a live database. `publication_data` is stored as JSON text. Title search
//! is a case-insensitive substring match with `%` and `_` taken literally.

use crate::core::error::StorageError;
use crate::core::traits::{NewVideo, Platform, VideoOrder, VideoQuery, VideoRecord};
use crate::orchestration::report::{PublicationRecord, PublicationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

const CREATE_VIDEOS: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        id BIGSERIAL PRIMARY KEY,
        filename TEXT NOT NULL,
        s3_key TEXT NOT NULL,
        title TEXT,
        description TEXT,
        tags TEXT[],
        file_size BIGINT NOT NULL DEFAULT 0,
        duration DOUBLE PRECISION,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_PUBLICATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS video_publications (
        id BIGSERIAL PRIMARY KEY,
        video_id BIGINT NOT NULL REFERENCES videos (id),
        platform TEXT NOT NULL,
        status TEXT NOT NULL,
        publication_data TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const SELECT_VIDEO_COLUMNS: &str = r#"
    SELECT id, filename, s3_key, title, description, tags, file_size, duration, created_at
    FROM videos
"#;

type VideoRow = (
    i64,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<Vec<String>>,
    i64,
    Option<f64>,
    DateTime<Utc>,
);

type PublicationRow = (i64, String, String, Option<String>, DateTime<Utc>);

/// `VideoRepository` over a Postgres pool
#[derive(Debug, Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the two tables when they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_VIDEOS).execute(&self.pool).await?;
        sqlx::query(CREATE_PUBLICATIONS).execute(&self.pool).await?;
        debug!("database schema ensured");
        Ok(())
    }
}

/// `ILIKE` pattern matching `term` anywhere, with its own wildcards escaped
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn order_clause(order: VideoOrder) -> &'static str {
    match order {
        VideoOrder::UploadDate => "ORDER BY created_at DESC, id DESC",
        VideoOrder::Title => "ORDER BY title DESC NULLS LAST, id DESC",
    }
}

fn video_from_row(row: VideoRow) -> VideoRecord {
    let (id, filename, s3_key, title, description, tags, file_size, duration, created_at) = row;
    VideoRecord {
        id,
        filename,
        s3_key,
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        tags: tags.unwrap_or_default(),
        file_size,
        duration: duration.unwrap_or_default(),
        created_at,
    }
}

fn publication_from_row(row: PublicationRow) -> Result<PublicationRecord, StorageError> {
    let (video_id, platform, status, data, created_at) = row;

    let platform: Platform = platform.parse().map_err(StorageError::Query)?;
    let status: PublicationStatus = status.parse().map_err(StorageError::Query)?;
    let publication_data = decode_publication_data(data.as_deref())?;

    Ok(PublicationRecord {
        video_id,
        platform,
        status,
        publication_data,
        created_at,
    })
}

/// Empty or missing payloads decode to an empty object
fn decode_publication_data(data: Option<&str>) -> Result<serde_json::Value, StorageError> {
    match data.map(str::trim) {
        None | Some("") => Ok(serde_json::json!({})),
        Some(text) => serde_json::from_str(text)
            .map_err(|e| StorageError::Query(format!("invalid publication_data: {}", e))),
    }
}

#[async_trait]
impl crate::storage::ports::VideoRepository for PgVideoRepository {
    async fn find_video(&self, id: i64) -> Result<Option<VideoRecord>, StorageError> {
        let query = format!("{} WHERE id = $1", SELECT_VIDEO_COLUMNS);
        let row: Option<VideoRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(video_from_row))
    }

    async fn list_videos(&self, query: &VideoQuery) -> Result<Vec<VideoRecord>, StorageError> {
        let sql = format!(
            "{} WHERE ($1::TEXT IS NULL OR title ILIKE $1) {}",
            SELECT_VIDEO_COLUMNS,
            order_clause(query.order_by)
        );
        let rows: Vec<VideoRow> = sqlx::query_as(&sql)
            .bind(query.search_term().map(contains_pattern))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(video_from_row).collect())
    }

    async fn insert_video(&self, video: &NewVideo) -> Result<i64, StorageError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO videos (filename, s3_key, title, description, tags, file_size, duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&video.filename)
        .bind(&video.s3_key)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.tags)
        .bind(video.file_size)
        .bind(video.duration)
        .fetch_one(&self.pool)
        .await?;

        debug!(video_id = id, s3_key = %video.s3_key, "inserted video");
        Ok(id)
    }

    async fn append_publication(&self, record: &PublicationRecord) -> Result<(), StorageError> {
        let data = serde_json::to_string(&record.publication_data)
            .map_err(|e| StorageError::Query(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO video_publications (video_id, platform, status, publication_data, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.video_id)
        .bind(record.platform.as_str())
        .bind(record.status.as_str())
        .bind(data)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn publications_for(&self, video_id: i64) -> Result<Vec<PublicationRecord>, StorageError> {
        let rows: Vec<PublicationRow> = sqlx::query_as(
            r#"
            SELECT video_id, platform, status, publication_data, created_at
            FROM video_publications
            WHERE video_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(publication_from_row).collect()
    }
}
