mod admin;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router, logout};
pub use middleware::{RequestContext, log_responses, set_request_context};
pub use public::build_public_router;

use std::sync::Arc;

use axum::{Router, extract::FromRef, middleware as axum_middleware};

use crate::application::{
    auth::AdminAuthenticator, pages::SitePages, posts::PostService, render::MarkdownRenderer,
};
use crate::cache::{CacheState, response_cache_layer};
use crate::config::SiteSettings;
use crate::infra::assets::StaticFiles;
use crate::presentation::views::LayoutView;

/// Everything a request handler may need.
#[derive(Clone)]
pub struct HttpState {
    pub site: Arc<SiteSettings>,
    pub pages: Arc<SitePages>,
    pub posts: PostService,
    pub renderer: Arc<MarkdownRenderer>,
    pub static_files: StaticFiles,
    pub cache: CacheState,
    pub admin: AdminAuthenticator,
}

impl HttpState {
    pub fn layout(&self) -> LayoutView {
        LayoutView {
            site_name: self.site.name.clone(),
            description: self.site.description.clone(),
            author: self.site.author.clone(),
            nav: if self.site.show_routes_in_nav {
                self.pages.nav().to_vec()
            } else {
                Vec::new()
            },
            copyright_year: self.site.copyright_year,
            social_links: self.site.social_links.clone(),
            show_impressum: self.site.show_impressum,
            show_privacy_policy: self.site.show_privacy_policy,
            show_attribution: self.site.show_attribution,
        }
    }
}

impl FromRef<HttpState> for StaticFiles {
    fn from_ref(state: &HttpState) -> Self {
        state.static_files.clone()
    }
}

impl FromRef<HttpState> for AdminState {
    fn from_ref(state: &HttpState) -> Self {
        AdminState {
            auth: state.admin.clone(),
        }
    }
}

/// Assemble the full application router.
///
/// The response cache wraps every route; its admission policy keeps admin,
/// logout, and API traffic out of the stores.
pub fn build_router(state: HttpState) -> Router {
    let cache_state = state.cache.clone();

    build_public_router()
        .merge(build_admin_router(state.clone()))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
