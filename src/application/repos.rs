//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::posts::{PostDraft, PostRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// All posts, newest first.
    async fn list_posts(&self) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;

    async fn create_post(&self, draft: &PostDraft) -> Result<PostRecord, RepoError>;

    /// Returns `RepoError::NotFound` when no post has this id.
    async fn update_post(&self, id: i64, draft: &PostDraft) -> Result<PostRecord, RepoError>;

    /// Returns whether a row was removed.
    async fn delete_post(&self, id: i64) -> Result<bool, RepoError>;
}
