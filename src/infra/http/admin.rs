//! Password-protected post management.

use axum::{
    Form, Router,
    body::Body,
    extract::{FromRef, Path, State},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::application::{
    auth::{AdminAuthenticator, AuthError},
    error::{ErrorReport, HttpError},
    posts::{PostServiceError, SavePost},
};
use crate::presentation::views::{
    AdminDashboardTemplate, AdminEditorTemplate, AdminPostRow, CacheOverview, EditorView,
    render_not_found_response, render_template_response,
};

use super::HttpState;

const REALM_CHALLENGE: &str = "Basic realm=\"folio-admin\", charset=\"UTF-8\"";

#[derive(Clone)]
pub struct AdminState {
    pub auth: AdminAuthenticator,
}

/// Authenticated administrator, available to handlers as an extension.
#[derive(Clone, Debug)]
pub struct AdminPrincipal {
    pub username: String,
}

pub fn build_admin_router(state: HttpState) -> Router<HttpState> {
    let admin_state = AdminState::from_ref(&state);

    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/new", get(new_post))
        .route("/admin/edit/{id}", get(edit_post))
        .route("/admin/save", post(save_post))
        .route("/admin/delete/{id}", post(delete_post))
        .route_layer(middleware::from_fn_with_state(admin_state, require_admin))
}

async fn require_admin(
    State(state): State<AdminState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.auth.authenticate(authorization) {
        Ok(username) => {
            let principal = AdminPrincipal { username };
            request.extensions_mut().insert(principal.clone());
            let mut response = next.run(request).await;
            response.extensions_mut().insert(principal);
            response
        }
        Err(err) => {
            if err != AuthError::Missing {
                warn!(error = %err, "admin authentication failed");
            }
            unauthorized("infra::http::admin::require_admin", &err.to_string())
        }
    }
}

/// Answer with a fresh Basic challenge so the browser forgets stored credentials.
pub async fn logout() -> Response {
    unauthorized("infra::http::admin::logout", "logged out")
}

fn unauthorized(source: &'static str, detail: &str) -> Response {
    let mut response = (StatusCode::UNAUTHORIZED, "Authentication required").into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(REALM_CHALLENGE),
    );
    ErrorReport::from_message(source, StatusCode::UNAUTHORIZED, detail).attach(&mut response);
    response
}

async fn dashboard(
    State(state): State<HttpState>,
    axum::Extension(principal): axum::Extension<AdminPrincipal>,
) -> Response {
    let posts = match state.posts.list().await {
        Ok(posts) => posts,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let stores = &state.cache.stores;
    let cache = CacheOverview {
        enabled: state.cache.config.enabled,
        stats: state.cache.stats.snapshot(),
        static_entries: stores.static_assets.len(),
        page_entries: stores.pages.len(),
        non_cacheable_entries: stores.non_cacheable.len(),
    };

    render_template_response(
        AdminDashboardTemplate {
            layout: state.layout(),
            username: principal.username,
            posts: posts.iter().map(AdminPostRow::from).collect(),
            cache,
        },
        StatusCode::OK,
    )
}

async fn new_post(State(state): State<HttpState>) -> Response {
    render_template_response(
        AdminEditorTemplate {
            layout: state.layout(),
            editor: EditorView::blank(),
        },
        StatusCode::OK,
    )
}

async fn edit_post(State(state): State<HttpState>, Path(id): Path<i64>) -> Response {
    match state.posts.find(id).await {
        Ok(Some(post)) => render_template_response(
            AdminEditorTemplate {
                layout: state.layout(),
                editor: EditorView::for_post(&post),
            },
            StatusCode::OK,
        ),
        Ok(None) => render_not_found_response(state.layout()),
        Err(err) => HttpError::from(err).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct SaveForm {
    #[serde(default)]
    id: String,
    title: String,
    #[serde(default)]
    content: String,
}

async fn save_post(State(state): State<HttpState>, Form(form): Form<SaveForm>) -> Response {
    let id = match form.id.trim() {
        "" => None,
        raw => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                return HttpError::new(
                    "infra::http::admin::save_post",
                    StatusCode::BAD_REQUEST,
                    "Invalid post id",
                    format!("`{raw}` is not a post id"),
                )
                .into_response();
            }
        },
    };

    let command = SavePost {
        id,
        title: form.title,
        content: form.content,
    };

    match state.posts.save(command.clone()).await {
        Ok(post) => {
            debug!(post_id = post.id, "redirecting to dashboard after save");
            Redirect::to("/admin").into_response()
        }
        Err(PostServiceError::Domain(err)) => {
            let editor = EditorView {
                heading: if id.is_some() { "Edit post" } else { "New post" }.to_string(),
                id,
                title: command.title,
                content: command.content,
                error: Some(err.to_string()),
            };
            let mut response = render_template_response(
                AdminEditorTemplate {
                    layout: state.layout(),
                    editor,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            );
            ErrorReport::from_error(
                "infra::http::admin::save_post",
                StatusCode::UNPROCESSABLE_ENTITY,
                &err,
            )
            .attach(&mut response);
            response
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn delete_post(State(state): State<HttpState>, Path(id): Path<i64>) -> Response {
    match state.posts.delete(id).await {
        Ok(()) => Redirect::to("/admin").into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
