//! Caption provider boundary.
//!
//! Defines the interface a remote captioning backend implements plus the
//! output-parsing strategy applied to raw prediction output.
//! [`ReplicateCaptioner`] is the production implementation.

pub(crate) mod parse;
pub(crate) mod replicate;

pub use parse::CaptionParser;
pub use replicate::ReplicateCaptioner;

use crate::error::PipelineError;
use async_trait::async_trait;
use serde::Serialize;

/// A caption generated for a stored image.
#[derive(Debug, Clone, Serialize)]
pub struct CaptionResult {
    /// URL of the image the caption describes
    pub image_url: String,
    /// Extracted caption; empty when the raw output lacked the expected
    /// delimiter format
    pub caption: String,
}

/// Trait implemented by remote captioning backends.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Backend name for logging (e.g., "replicate").
    fn name(&self) -> &str;

    /// Generate a caption for the image at `image_url`.
    ///
    /// Blocks until the remote prediction reaches a terminal state; there is
    /// no client-side cap beyond what the remote API enforces.
    async fn caption(&self, image_url: &str) -> Result<CaptionResult, PipelineError>;
}
