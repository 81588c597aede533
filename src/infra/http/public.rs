use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use tracing::error;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        posts::PostServiceError,
        repos::RepoError,
    },
    domain::{contact::ObscuredContact, posts::PostRecord},
    presentation::views::{
        ErrorPageView, ImpressumTemplate, IndexTemplate, PageTemplate, PostCard, PostDetailView,
        PostTemplate, PrivacyTemplate, render_error_response, render_not_found_response,
        render_template_response,
    },
};

use super::{HttpState, logout};

pub fn build_public_router() -> Router<HttpState> {
    Router::new()
        .route("/", get(index))
        .route("/post/{id}", get(post_detail))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .route("/api/posts", get(api_posts))
        .route("/impressum", get(impressum))
        .route("/privacy", get(privacy))
        .route("/logout", get(logout))
        .fallback(markdown_page)
}

async fn index(State(state): State<HttpState>) -> Response {
    let posts = match state.posts.list().await {
        Ok(posts) => posts,
        Err(err) => return service_error_page(&state, err),
    };

    render_template_response(
        IndexTemplate {
            layout: state.layout(),
            intro_html: state.pages.intro().map(str::to_string),
            posts: posts.iter().map(PostCard::from).collect(),
        },
        StatusCode::OK,
    )
}

async fn post_detail(State(state): State<HttpState>, Path(raw): Path<String>) -> Response {
    // Invalidation only knows `post_path(id)`; other spellings are not found.
    let Some(id) = canonical_post_id(&raw) else {
        return render_not_found_response(state.layout());
    };

    match state.posts.find(id).await {
        Ok(Some(post)) => {
            let view = PostDetailView {
                published: post.human_date(),
                body_html: state.renderer.render(&post.content),
                title: post.title,
            };
            render_template_response(
                PostTemplate {
                    layout: state.layout(),
                    post: view,
                },
                StatusCode::OK,
            )
        }
        Ok(None) => render_not_found_response(state.layout()),
        Err(err) => service_error_page(&state, err),
    }
}

fn canonical_post_id(raw: &str) -> Option<i64> {
    let id = raw.parse::<i64>().ok()?;
    (id.to_string() == raw).then_some(id)
}

async fn impressum(State(state): State<HttpState>) -> Response {
    if !state.site.show_impressum {
        return render_not_found_response(state.layout());
    }

    let legal = &state.site.legal;
    let contact = ObscuredContact::new(
        legal.name.as_deref(),
        legal.address.as_deref(),
        legal.email.as_deref(),
        legal.phone.as_deref(),
    );
    render_template_response(
        ImpressumTemplate {
            layout: state.layout(),
            contact,
        },
        StatusCode::OK,
    )
}

async fn privacy(State(state): State<HttpState>) -> Response {
    if !state.site.show_privacy_policy {
        return render_not_found_response(state.layout());
    }

    render_template_response(
        PrivacyTemplate {
            layout: state.layout(),
        },
        StatusCode::OK,
    )
}

async fn markdown_page(State(state): State<HttpState>, uri: Uri) -> Response {
    let path = uri.path();
    let route = match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    };

    match state.pages.get(route) {
        Some(html) => render_template_response(
            PageTemplate {
                layout: state.layout(),
                content_html: html.to_string(),
            },
            StatusCode::OK,
        ),
        None => render_not_found_response(state.layout()),
    }
}

#[derive(Debug, Serialize)]
struct PostDto {
    id: i64,
    title: String,
    content: String,
    date: String,
}

impl From<PostRecord> for PostDto {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            date: post.created_at.format(&Rfc3339).unwrap_or_default(),
            title: post.title,
            content: post.content,
        }
    }
}

async fn api_posts(State(state): State<HttpState>) -> Result<Json<Vec<PostDto>>, HttpError> {
    let posts = state.posts.list().await?;
    Ok(Json(posts.into_iter().map(PostDto::from).collect()))
}

fn service_error_page(state: &HttpState, err: PostServiceError) -> Response {
    const SOURCE: &str = "infra::http::public::service_error_page";

    let status = match &err {
        PostServiceError::NotFound(_) => return render_not_found_response(state.layout()),
        PostServiceError::Repo(RepoError::Timeout) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(target = SOURCE, error = %err, "failed to load posts");

    let mut response = render_error_response(state.layout(), ErrorPageView::unavailable(), status);
    ErrorReport::from_error(SOURCE, status, &err).attach(&mut response);
    response
}
