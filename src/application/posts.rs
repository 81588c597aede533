//! Post reads and writes, with page-cache invalidation after each commit.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::application::repos::{PostsRepo, RepoError};
use crate::cache::CacheInvalidator;
use crate::domain::{
    error::DomainError,
    posts::{PostDraft, PostRecord, post_path},
};

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("post `{0}` not found")]
    NotFound(i64),
}

/// Create-or-update command from the admin editor.
#[derive(Debug, Clone)]
pub struct SavePost {
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
}

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn PostsRepo>,
    invalidator: CacheInvalidator,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostsRepo>, invalidator: CacheInvalidator) -> Self {
        Self { repo, invalidator }
    }

    pub async fn list(&self) -> Result<Vec<PostRecord>, PostServiceError> {
        Ok(self.repo.list_posts().await?)
    }

    pub async fn find(&self, id: i64) -> Result<Option<PostRecord>, PostServiceError> {
        Ok(self.repo.find_post(id).await?)
    }

    /// Create a post when `id` is absent, otherwise update it in place.
    #[instrument(skip(self, command), fields(post_id = ?command.id))]
    pub async fn save(&self, command: SavePost) -> Result<PostRecord, PostServiceError> {
        let draft = PostDraft::new(&command.title, &command.content)?;

        let post = match command.id {
            Some(id) => match self.repo.update_post(id, &draft).await {
                Ok(post) => post,
                Err(RepoError::NotFound) => return Err(PostServiceError::NotFound(id)),
                Err(err) => return Err(err.into()),
            },
            None => self.repo.create_post(&draft).await?,
        };

        if command.id.is_some() {
            self.invalidator.invalidate(&post.path());
        }
        self.invalidator.invalidate_index();

        info!(post_id = post.id, created = command.id.is_none(), "post saved");
        Ok(post)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        if !self.repo.delete_post(id).await? {
            return Err(PostServiceError::NotFound(id));
        }

        self.invalidator.invalidate(&post_path(id));
        self.invalidator.invalidate_index();

        info!(post_id = id, "post deleted");
        Ok(())
    }
}
