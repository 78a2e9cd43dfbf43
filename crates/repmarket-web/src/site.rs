//! Site root resolution.
//!
//! Pages live either at the site root or one directory below it (`pages/`),
//! so links cannot be written relative to the current document. Every
//! absolute link goes through [`SiteRoot`].

use crate::error::{Result, WebError};
use std::fmt;
use tracing::debug;
use url::Url;

/// Page directories stripped from the location when no override is set.
pub const DEFAULT_PAGE_DIRS: &[&str] = &["pages"];

/// Absolute base URL of the site, always ending in `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRoot(Url);

impl SiteRoot {
    /// Resolve the site root for a document at `location`.
    ///
    /// 1. A non-empty `override_root` wins. A relative override is joined
    ///    onto the location's origin.
    /// 2. Otherwise the root is the location's directory, with one trailing
    ///    directory from `page_dirs` stripped.
    ///
    /// Query and fragment are dropped; the result always ends in `/`.
    pub fn resolve<S: AsRef<str>>(
        override_root: Option<&str>,
        location: &str,
        page_dirs: &[S],
    ) -> Result<Self> {
        let location = parse(location)?;

        let mut root = match override_root.map(str::trim).filter(|s| !s.is_empty()) {
            Some(root) => match Url::parse(root) {
                Ok(url) => url,
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    location.join(root).map_err(|e| invalid(root, e))?
                }
                Err(e) => return Err(invalid(root, e)),
            },
            None => {
                let mut root = location.clone();
                let path = location.path();
                let dir = path.rfind('/').map_or("/", |i| &path[..=i]);
                root.set_path(strip_page_dir(dir, page_dirs));
                root
            }
        };

        root.set_query(None);
        root.set_fragment(None);
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        debug!(root = %root, "Site root resolved");
        Ok(Self(root))
    }

    /// Resolve with [`DEFAULT_PAGE_DIRS`].
    pub fn for_location(override_root: Option<&str>, location: &str) -> Result<Self> {
        Self::resolve(override_root, location, DEFAULT_PAGE_DIRS)
    }

    /// The root URL.
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// The root as text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Absolute link to the site path `path` (`/browse`, `login?x=1`, ...).
    pub fn link(&self, path: &str) -> String {
        format!("{}{}", self.0, path.trim_start_matches('/'))
    }
}

impl fmt::Display for SiteRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

fn parse(input: &str) -> Result<Url> {
    Url::parse(input.trim()).map_err(|e| invalid(input, e))
}

fn invalid(input: &str, err: url::ParseError) -> WebError {
    WebError::InvalidUrl {
        input: input.to_string(),
        reason: err.to_string(),
    }
}

fn strip_page_dir<'a, S: AsRef<str>>(dir: &'a str, page_dirs: &[S]) -> &'a str {
    for page_dir in page_dirs {
        let name = page_dir.as_ref().trim_matches('/');
        if name.is_empty() {
            continue;
        }
        if let Some(parent) = dir
            .strip_suffix('/')
            .and_then(|d| d.strip_suffix(name))
            .filter(|d| d.ends_with('/'))
        {
            return parent;
        }
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn root(override_root: Option<&str>, location: &str) -> String {
        SiteRoot::for_location(override_root, location)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_location_directory() {
        assert_eq!(
            root(None, "https://demo.example/app/index.html?x=1#top"),
            "https://demo.example/app/"
        );
        assert_eq!(root(None, "https://demo.example"), "https://demo.example/");
        assert_eq!(root(None, "https://demo.example/app/"), "https://demo.example/app/");
    }

    #[test]
    fn test_page_dir_stripped_once() {
        assert_eq!(
            root(None, "https://demo.example/app/pages/login.html"),
            "https://demo.example/app/"
        );
        assert_eq!(
            root(None, "https://demo.example/pages/pages/x.html"),
            "https://demo.example/pages/"
        );
        assert_eq!(
            root(None, "https://demo.example/subpages/x.html"),
            "https://demo.example/subpages/"
        );
        assert_eq!(
            root(None, "file:///home/riley/site/pages/dashboard.html"),
            "file:///home/riley/site/"
        );
    }

    #[test]
    fn test_custom_page_dirs() {
        let root = SiteRoot::resolve(None, "https://demo.example/app/views/a.html", &["views/"])
            .unwrap();
        assert_eq!(root.as_str(), "https://demo.example/app/");
    }

    #[test]
    fn test_override() {
        let location = "https://demo.example/app/pages/login.html";
        assert_eq!(
            root(Some("https://cdn.example/site"), location),
            "https://cdn.example/site/"
        );
        assert_eq!(root(Some("/base?v=2"), location), "https://demo.example/base/");
        assert_eq!(root(Some("   "), location), "https://demo.example/app/");
    }

    #[test]
    fn test_invalid_location() {
        let err = SiteRoot::for_location(None, "not a url").unwrap_err();
        assert!(matches!(err, WebError::InvalidUrl { .. }));
    }

    #[test]
    fn test_link() {
        let site = SiteRoot::for_location(None, "https://demo.example/app/pages/a.html").unwrap();
        assert_eq!(site.link("/browse"), "https://demo.example/app/browse");
        assert_eq!(site.link("login?redirect=%2Fx"), "https://demo.example/app/login?redirect=%2Fx");
        assert_eq!(site.link(""), "https://demo.example/app/");
    }
}
