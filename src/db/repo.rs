use crate::db::model::{content_columns, PostRow};
use crate::db::PostStore;
use crate::error::StoreError;
use crate::model::{Lang, NewPost, Post};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool, StoreError> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)?.create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn insert_post(pool: &Pool, post: &NewPost) -> Result<i64, StoreError> {
    let (source_text, source_file, source_caption) = content_columns(&post.source);
    let (target_text, target_file, target_caption) = content_columns(&post.target);
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO posts (channel_chat, channel_msg_id, media_type, source_text, target_text, \
         source_file_id, target_file_id, source_caption, target_caption, current_lang, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(post.channel_message.chat.to_string())
    .bind(post.channel_message.message_id)
    .bind(post.source.kind().as_str())
    .bind(source_text)
    .bind(target_text)
    .bind(source_file)
    .bind(target_file)
    .bind(source_caption)
    .bind(target_caption)
    .bind(Lang::Source.as_str())
    .bind(post.created_at)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn fetch_post(pool: &Pool, id: i64) -> Result<Option<Post>, StoreError> {
    let row = sqlx::query_as::<_, PostRow>(
        "SELECT id, channel_chat, channel_msg_id, media_type, source_text, target_text, \
         source_file_id, target_file_id, source_caption, target_caption, current_lang, created_at \
         FROM posts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(PostRow::into_post).transpose()
}

#[instrument(skip_all)]
pub async fn update_current_lang(
    pool: &Pool,
    id: i64,
    expected: Lang,
    new: Lang,
) -> Result<bool, StoreError> {
    let res = sqlx::query("UPDATE posts SET current_lang = ? WHERE id = ? AND current_lang = ?")
        .bind(new.as_str())
        .bind(id)
        .bind(expected.as_str())
        .execute(pool)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// `PostStore` backed by the SQLite pool.
#[derive(Debug, Clone)]
pub struct SqlitePostStore {
    pool: Pool,
}

impl SqlitePostStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn insert(&self, post: &NewPost) -> Result<i64, StoreError> {
        insert_post(&self.pool, post).await
    }

    async fn get(&self, id: i64) -> Result<Option<Post>, StoreError> {
        fetch_post(&self.pool, id).await
    }

    async fn set_current_lang(&self, id: i64, expected: Lang, new: Lang) -> Result<bool, StoreError> {
        update_current_lang(&self.pool, id, expected, new).await
    }
}
