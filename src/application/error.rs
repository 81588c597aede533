use std::{error::Error as StdError, io};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{posts::PostServiceError, repos::RepoError},
    config::LoadError,
    infra::error::InfraError,
};

/// Diagnostic carried on an error response for `log_responses` to pick up.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    /// The error's message followed by each of its sources, outermost first.
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut next = error.source();
        while let Some(cause) = next {
            messages.push(cause.to_string());
            next = cause.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// A plain-text error response whose detail stays in the log.
#[derive(Debug)]
pub struct HttpError {
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            public_message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            public_message,
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.report.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.report.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<PostServiceError> for HttpError {
    fn from(error: PostServiceError) -> Self {
        const SOURCE: &str = "application::error::post_service_error";

        let (status, public_message) = match &error {
            PostServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "Post not found"),
            PostServiceError::Domain(_) => (StatusCode::BAD_REQUEST, "Invalid post"),
            PostServiceError::Repo(RepoError::Timeout) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Database busy, try again")
            }
            PostServiceError::Repo(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        HttpError::from_error(SOURCE, status, public_message, &error)
    }
}

/// Anything that stops the process from starting or serving.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("server error: {0}")]
    Server(#[source] io::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Infra(InfraError::Database(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, "Service unavailable").into_response();
        ErrorReport::from_error("application::error::AppError", status, &self)
            .attach(&mut response);
        response
    }
}
