//! Post Store: persisted bilingual records.
//!
//! - `model`: the row shape of the `posts` table and its decoding into `Post`.
//! - `repo`: SQL-only functions plus `SqlitePostStore`, the `PostStore` implementation.
//!
//! The rest of the crate depends on the `PostStore` trait only.

use crate::error::StoreError;
use crate::model::{Lang, NewPost, Post};
use async_trait::async_trait;

pub mod model;
pub mod repo;

pub use repo::{init_pool, run_migrations, Pool, SqlitePostStore};

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Persist a freshly published post with `current_lang = source`. Returns the assigned id.
    async fn insert(&self, post: &NewPost) -> Result<i64, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<Post>, StoreError>;

    /// Compare-and-set on `current_lang`. Returns `false` if the post is gone
    /// or its language was no longer `expected`.
    async fn set_current_lang(&self, id: i64, expected: Lang, new: Lang) -> Result<bool, StoreError>;
}
