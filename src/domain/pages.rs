//! Routing rules for markdown pages loaded from the content directory.

use std::path::{Component, Path};

const INDEX_ROUTE: &str = "/index";
const RESERVED_ROUTES: [&str; 5] = ["/", "/post", "/admin", "/impressum", "/privacy"];

/// Where a markdown file lands once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRoute {
    /// `index.md` at the top of the content directory; shown on the home page.
    Intro,
    /// Served at this path.
    Path(String),
    /// Collides with a built-in route and is skipped.
    Reserved(String),
}

/// Map a file path relative to the content directory to its route.
///
/// Returns `None` for non-markdown files and paths that escape the directory.
pub fn route_for(relative: &Path) -> Option<PageRoute> {
    if relative.extension().and_then(|ext| ext.to_str()) != Some("md") {
        return None;
    }

    let stem = relative.with_extension("");
    let mut route = String::new();
    for component in stem.components() {
        match component {
            Component::Normal(segment) => {
                route.push('/');
                route.push_str(segment.to_str()?);
            }
            _ => return None,
        }
    }

    if route.is_empty() {
        return None;
    }
    if route == INDEX_ROUTE {
        return Some(PageRoute::Intro);
    }
    if RESERVED_ROUTES.contains(&route.as_str()) {
        return Some(PageRoute::Reserved(route));
    }
    Some(PageRoute::Path(route))
}

/// A route with a single segment, such as `/about`, shows up in navigation.
pub fn is_top_level(route: &str) -> bool {
    route.matches('/').count() == 1
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub name: String,
    pub url: String,
}

impl NavLink {
    pub fn for_route(route: &str) -> Self {
        Self {
            name: route.trim_matches('/').to_string(),
            url: route.to_string(),
        }
    }
}
