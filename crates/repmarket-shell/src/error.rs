//! Shell errors.

use crate::config::ConfigError;
use repmarket_auth::AuthError;
use repmarket_router::RouterError;
use repmarket_web::WebError;
use thiserror::Error;

/// Errors surfaced by [`Shell`](crate::Shell) operations.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Bad configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Login or registration failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Route registration failed.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// Chrome could not be rendered.
    #[error(transparent)]
    Web(#[from] WebError),
}

/// Result type for shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;
