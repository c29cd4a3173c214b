// Rendering Engine Port
//
// The core only opens a session by engine name and closes it. Navigation and
// extraction calls are driven by site adapters.

use crate::error::Result;
use async_trait::async_trait;

/// Factory for rendering sessions
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    /// Open a session on the named engine.
    ///
    /// # Errors
    /// - `AppError::Config` if `engine` is not supported (before any I/O)
    async fn open(&self, engine: &str) -> Result<Box<dyn RenderingSession>>;
}

/// One rendering session, exclusively owned by a single run
#[async_trait]
pub trait RenderingSession: Send + Sync {
    /// Navigate to `url` and load its document
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Markup of the currently loaded document
    async fn content(&self) -> Result<String>;

    /// Release the session. Further use is `AppError::InvalidState`.
    async fn close(&mut self) -> Result<()>;
}
