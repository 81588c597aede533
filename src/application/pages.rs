//! Markdown content pages loaded once at startup.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::application::render::MarkdownRenderer;
use crate::domain::pages::{NavLink, PageRoute, is_top_level, route_for};
use crate::infra::error::InfraError;

/// Rendered pages keyed by route, plus the home page intro and navigation.
#[derive(Debug, Clone, Default)]
pub struct SitePages {
    intro: Option<String>,
    pages: BTreeMap<String, String>,
    nav: Vec<NavLink>,
}

impl SitePages {
    /// Walk `root` recursively and render every markdown file.
    ///
    /// A missing directory yields an empty set of pages.
    pub fn load(root: &Path, renderer: &MarkdownRenderer) -> Result<Self, InfraError> {
        let mut pages = Self::default();
        if !root.is_dir() {
            warn!(dir = %root.display(), "pages directory not found, no pages loaded");
            return Ok(pages);
        }

        let mut files = Vec::new();
        collect_files(root, &mut files)?;
        files.sort();

        for path in files {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let Some(route) = route_for(relative) else {
                continue;
            };
            let markdown = fs::read_to_string(&path).map_err(InfraError::pages(&path))?;
            pages.insert(route, renderer.render(&markdown), &path);
        }

        Ok(pages)
    }

    fn insert(&mut self, route: PageRoute, html: String, source: &Path) {
        match route {
            PageRoute::Intro => self.intro = Some(html),
            PageRoute::Reserved(route) => {
                warn!(route, file = %source.display(), "route is reserved, page skipped");
            }
            PageRoute::Path(route) => {
                debug!(route, file = %source.display(), "loaded page");
                if is_top_level(&route) {
                    self.nav.push(NavLink::for_route(&route));
                }
                self.pages.insert(route, html);
            }
        }
    }

    pub fn intro(&self) -> Option<&str> {
        self.intro.as_deref()
    }

    pub fn get(&self, route: &str) -> Option<&str> {
        self.pages.get(route).map(String::as_str)
    }

    pub fn nav(&self) -> &[NavLink] {
        &self.nav
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), InfraError> {
    for entry in fs::read_dir(dir).map_err(InfraError::pages(dir))? {
        let entry = entry.map_err(InfraError::pages(dir))?;
        let file_type = entry.file_type().map_err(InfraError::pages(dir))?;
        if file_type.is_dir() {
            collect_files(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_routes_intro_and_navigation() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.md", "Welcome *in*");
        write(dir.path(), "about.md", "# About");
        write(dir.path(), "docs/guide.md", "# Guide");
        write(dir.path(), "post.md", "# Clash");
        write(dir.path(), "notes.txt", "ignored");

        let pages = SitePages::load(dir.path(), &MarkdownRenderer::new()).unwrap();

        assert!(pages.intro().unwrap().contains("<em>in</em>"));
        assert!(pages.get("/about").unwrap().contains("<h1>About</h1>"));
        assert!(pages.get("/docs/guide").is_some());
        assert!(pages.get("/post").is_none());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages.nav(), &[NavLink::for_route("/about")]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let pages =
            SitePages::load(&dir.path().join("absent"), &MarkdownRenderer::new()).unwrap();
        assert!(pages.is_empty());
        assert!(pages.intro().is_none());
    }
}
