use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::application::error::{ErrorReport, HttpError};
use crate::cache::CacheStatsSnapshot;
use crate::config::SocialLink;
use crate::domain::contact::ObscuredContact;
use crate::domain::pages::NavLink;
use crate::domain::posts::PostRecord;

/// Render `template`, turning an askama failure into a logged 500.
pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        HttpError::from_error(
            "presentation::views::render_template",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Template rendering failed",
            &err,
        )
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(layout: LayoutView) -> Response {
    render_error_response(layout, ErrorPageView::not_found(), StatusCode::NOT_FOUND)
}

/// Render the error page and attach a report for `log_responses`.
pub fn render_error_response(layout: LayoutView, error: ErrorPageView, status: StatusCode) -> Response {
    let message = error.title.clone();
    let mut response = render_template_response(ErrorTemplate { layout, error }, status);
    ErrorReport::from_message("presentation::views::render_error_response", status, message)
        .attach(&mut response);
    response
}

/// Site chrome shared by every public page.
#[derive(Clone)]
pub struct LayoutView {
    pub site_name: String,
    pub description: String,
    pub author: String,
    pub nav: Vec<NavLink>,
    pub copyright_year: i32,
    pub social_links: Vec<SocialLink>,
    pub show_impressum: bool,
    pub show_privacy_policy: bool,
    pub show_attribution: bool,
}

#[derive(Clone)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub published: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            href: post.path(),
            title: post.title.clone(),
            published: post.human_date(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub layout: LayoutView,
    pub intro_html: Option<String>,
    pub posts: Vec<PostCard>,
}

pub struct PostDetailView {
    pub title: String,
    pub published: String,
    pub body_html: String,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub layout: LayoutView,
    pub post: PostDetailView,
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub layout: LayoutView,
    pub content_html: String,
}

#[derive(Template)]
#[template(path = "impressum.html")]
pub struct ImpressumTemplate {
    pub layout: LayoutView,
    pub contact: ObscuredContact,
}

#[derive(Template)]
#[template(path = "privacy.html")]
pub struct PrivacyTemplate {
    pub layout: LayoutView,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            title: "Temporarily Unavailable".to_string(),
            message: "Something went wrong on our side. Please try again shortly.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub layout: LayoutView,
    pub error: ErrorPageView,
}

pub struct AdminPostRow {
    pub id: i64,
    pub title: String,
    pub published: String,
    pub href: String,
}

impl From<&PostRecord> for AdminPostRow {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            published: post.human_date(),
            href: post.path(),
        }
    }
}

/// Live view of the response cache for the dashboard.
pub struct CacheOverview {
    pub enabled: bool,
    pub stats: CacheStatsSnapshot,
    pub static_entries: usize,
    pub page_entries: usize,
    pub non_cacheable_entries: usize,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub layout: LayoutView,
    pub username: String,
    pub posts: Vec<AdminPostRow>,
    pub cache: CacheOverview,
}

pub struct EditorView {
    pub heading: String,
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    pub error: Option<String>,
}

impl EditorView {
    pub fn blank() -> Self {
        Self {
            heading: "New post".to_string(),
            id: None,
            title: String::new(),
            content: String::new(),
            error: None,
        }
    }

    pub fn for_post(post: &PostRecord) -> Self {
        Self {
            heading: format!("Edit \u{201c}{}\u{201d}", post.title),
            id: Some(post.id),
            title: post.title.clone(),
            content: post.content.clone(),
            error: None,
        }
    }
}

#[derive(Template)]
#[template(path = "admin/editor.html")]
pub struct AdminEditorTemplate {
    pub layout: LayoutView,
    pub editor: EditorView,
}
