//! Analyzer infrastructure.
//!
//! An analyzer turns submitted source code into human readable feedback.
//! The HTTP handler only sees the `Analyzer` trait, so the bundled mock can
//! be replaced by a client for a real analysis backend without touching the
//! request path.

pub mod mock;

pub use self::mock::MockAnalyzer;

/// Failure reported by an analyzer backend.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// The backend could not produce feedback for the submitted code.
    #[error("analysis backend failed: {0}")]
    Backend(String),
}

/// Trait implemented by all analyzers. Given the submitted code, return the
/// feedback text or an error. Implementations must be shareable across
/// concurrently running requests.
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;
    async fn analyze(&self, code: &str) -> Result<String, AnalyzerError>;
}
