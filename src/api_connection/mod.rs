pub mod connection;
pub mod endpoints;

use async_trait::async_trait;

use crate::image_input::PreparedImage;
pub use connection::{ApiConnectionError, GeminiClient};

/// Capability the pipeline needs from a generative model: one prompt (plus
/// an optional image) in, free text out. Injected into the orchestrator so
/// tests can script a deterministic fake.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        image: Option<&PreparedImage>,
    ) -> Result<String, ApiConnectionError>;
}
