//! Static file serving from the configured static directory.
//!
//! Files are streamed in fixed-size chunks with a declared `Content-Length`,
//! so the response cache can reject oversized assets before reading them.

use std::{
    path::{Component, Path as FsPath, PathBuf},
    sync::Arc,
};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use futures::stream;
use mime_guess::Mime;
use tokio::{fs::File, io::AsyncReadExt};
use tracing::warn;

use crate::application::error::ErrorReport;

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone)]
pub struct StaticFiles {
    root: Arc<PathBuf>,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &FsPath {
        &self.root
    }
}

/// Serve a file below the static root.
pub async fn serve_static(State(files): State<StaticFiles>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::assets::serve_static";

    let Some(relative) = sanitize_path(&path) else {
        return rejected_response(SOURCE, StatusCode::NOT_FOUND);
    };
    let full = files.root().join(&relative);

    let file = match File::open(&full).await {
        Ok(file) => file,
        Err(_) => return not_found_response(SOURCE),
    };
    let metadata = match file.metadata().await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return not_found_response(SOURCE),
    };

    let mime = mime_guess::from_path(&relative).first_or_octet_stream();
    build_response(file, metadata.len(), mime)
}

/// Reduce a request path to a relative path with only normal components.
fn sanitize_path(raw: &str) -> Option<PathBuf> {
    let candidate = raw.trim_start_matches('/');
    if candidate.is_empty() || candidate.ends_with('/') {
        return None;
    }

    let path = FsPath::new(candidate);
    if path
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        Some(path.to_path_buf())
    } else {
        None
    }
}

fn not_found_response(source: &'static str) -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

fn rejected_response(source: &'static str, status: StatusCode) -> Response {
    let mut response = status.into_response();
    ErrorReport::from_message(source, status, "Static asset request rejected")
        .attach(&mut response);
    response
}

fn build_response(file: File, len: u64, mime: Mime) -> Response {
    let mut response = Response::new(Body::from_stream(chunked(file)));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    response
}

fn chunked(file: File) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send {
    stream::unfold(Some(file), |state| async move {
        let mut file = state?;
        let mut buffer = BytesMut::with_capacity(CHUNK_SIZE);
        match file.read_buf(&mut buffer).await {
            Ok(0) => None,
            Ok(_) => Some((Ok(buffer.freeze()), Some(file))),
            Err(err) => {
                warn!(error = %err, "static file read failed");
                Some((Err(err), None))
            }
        }
    })
}
