use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use super::error::DomainError;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");

const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
}

impl PostRecord {
    pub fn path(&self) -> String {
        post_path(self.id)
    }

    pub fn human_date(&self) -> String {
        self.created_at
            .format(HUMAN_DATE_FORMAT)
            .unwrap_or_else(|_| self.created_at.date().to_string())
    }
}

/// Public path of a post, which is also its page cache key.
pub fn post_path(id: i64) -> String {
    format!("/post/{id}")
}

/// Validated title and body of a post about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn new(title: &str, content: &str) -> Result<Self, DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::EmptyTitle);
        }
        let actual = title.chars().count();
        if actual > MAX_TITLE_CHARS {
            return Err(DomainError::TitleTooLong {
                max: MAX_TITLE_CHARS,
                actual,
            });
        }

        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
        })
    }
}
