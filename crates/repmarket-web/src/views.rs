//! Shell views: document layout, placeholder pages, not-found, error and
//! notice banners.

use crate::error::Result;
use crate::site::SiteRoot;
use askama::Template;
use repmarket_events::NoticeLevel;

#[derive(Template)]
#[template(path = "document.html")]
struct DocumentTemplate<'a> {
    title: &'a str,
    site_root: &'a str,
    header: &'a str,
    notice: Option<&'a str>,
    body: &'a str,
}

#[derive(Template)]
#[template(path = "page.html")]
struct PageTemplate<'a> {
    heading: &'a str,
    lead: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate<'a> {
    path: &'a str,
    home_href: String,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    message: &'a str,
    home_href: String,
}

#[derive(Template)]
#[template(path = "notice.html")]
struct NoticeTemplate<'a> {
    level: &'a str,
    message: &'a str,
}

/// Renders the views the shell owns.
#[derive(Debug, Clone)]
pub struct Views {
    site: SiteRoot,
}

impl Views {
    /// Create views linking under `site`.
    pub fn new(site: SiteRoot) -> Self {
        Self { site }
    }

    /// Full HTML document. `header`, `notice` and `body` are trusted markup.
    pub fn document(
        &self,
        title: &str,
        header: &str,
        notice: Option<&str>,
        body: &str,
    ) -> Result<String> {
        let template = DocumentTemplate {
            title,
            site_root: self.site.as_str(),
            header,
            notice,
            body,
        };
        Ok(template.render()?)
    }

    /// A simple content page.
    pub fn page(&self, heading: &str, lead: Option<&str>) -> Result<String> {
        Ok(PageTemplate { heading, lead }.render()?)
    }

    /// The not-found view for `path`.
    pub fn not_found(&self, path: &str) -> Result<String> {
        let template = NotFoundTemplate {
            path,
            home_href: self.site.link("/"),
        };
        Ok(template.render()?)
    }

    /// The error view.
    pub fn error(&self, message: &str) -> Result<String> {
        let template = ErrorTemplate {
            message,
            home_href: self.site.link("/"),
        };
        Ok(template.render()?)
    }

    /// A notice banner.
    pub fn notice(&self, level: NoticeLevel, message: &str) -> Result<String> {
        let level = match level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        Ok(NoticeTemplate { level, message }.render()?)
    }
}
