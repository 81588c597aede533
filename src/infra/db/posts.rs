use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::posts::{PostDraft, PostRecord};

use super::{SqliteRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PostsRepo for SqliteRepositories {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, content, created_at
            FROM posts
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, title, content, created_at FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<PostRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (title, content, created_at)
            VALUES (?, ?, ?)
            RETURNING id, title, content, created_at
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(&self, id: i64, draft: &PostDraft) -> Result<PostRecord, RepoError> {
        // RowNotFound from fetch_one maps to RepoError::NotFound.
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            UPDATE posts
            SET title = ?, content = ?
            WHERE id = ?
            RETURNING id, title, content, created_at
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_post(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
