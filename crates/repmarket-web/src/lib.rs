//! RepMarket Web
//!
//! Markup owned by the shell:
//! - The header with role-dependent navigation, repainted on every session
//!   or route change
//! - Document layout, not-found, error and notice views
//! - Site root resolution for absolute links

pub mod error;
pub mod header;
pub mod site;
pub mod views;

pub use error::{Result, WebError};
pub use header::{nav_items, HeaderRenderer, NavItem};
pub use site::{SiteRoot, DEFAULT_PAGE_DIRS};
pub use views::Views;
