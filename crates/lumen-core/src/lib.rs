//! Lumen Core - upload-caption-rename pipeline library.
//!
//! Lumen stores uploaded images in an object store, asks a remote prediction
//! API for a descriptive caption, and renames each stored object after its
//! caption. Batch uploads additionally produce a CSV manifest of results.
//!
//! # Architecture
//!
//! One strictly sequential pass per file, behind narrow boundaries:
//!
//! ```text
//! Upload → ObjectStore.put → CaptionProvider.caption → rename (copy+delete) → {url, caption}
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::{Config, Pipeline, ReplicateCaptioner, S3Store};
//! use std::sync::Arc;
//!
//! let config = Config::from_env()?;
//! let pipeline = Pipeline::new(
//!     Arc::new(S3Store::new(&config.storage)),
//!     Arc::new(ReplicateCaptioner::new(&config.caption)),
//!     config.storage.poll_settings(),
//! );
//! let result = pipeline.upload_single("album", file).await?;
//! ```

// Module declarations
pub mod caption;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;

// Re-exports for convenient access
pub use caption::{CaptionParser, CaptionProvider, CaptionResult, ReplicateCaptioner};
pub use config::Config;
pub use error::{
    ConfigError, LumenError, PipelineError, PipelineResult, RenamePhase, Result, StoreError,
};
pub use pipeline::{BatchMode, BatchOutcome, CaptionedUpload, Pipeline, UploadFile};
pub use store::{ObjectStore, PollSettings, S3Store};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
