use thiserror::Error;

/// Rejected post input. Shown verbatim in the admin editor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title must be at most {max} characters, got {actual}")]
    TitleTooLong { max: usize, actual: usize },
}
