//! The upload-caption-rename pipeline.
//!
//! One sequential pass per file: store the upload, request a caption for its
//! public URL, rename the stored object to the sanitized caption. Batch mode
//! runs the same pass per file with an accumulator and finishes by uploading
//! a CSV manifest of the successful results.

pub(crate) mod manifest;

use crate::caption::CaptionProvider;
use crate::error::PipelineError;
use crate::store::{self, ObjectStore, PollSettings};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// A file received from a client, decoupled from the HTTP layer.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Original filename as submitted
    pub filename: String,
    /// Raw file bytes
    pub content: Vec<u8>,
}

/// Outcome of a fully-processed upload.
#[derive(Debug, Clone, Serialize)]
pub struct CaptionedUpload {
    /// Public URL of the renamed object
    pub url: String,
    /// Caption the object was renamed after
    pub caption: String,
}

/// Outcome of a batch upload: per-file results plus the manifest URL.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub files: Vec<CaptionedUpload>,
    pub csv_url: String,
}

/// Failure policy for the per-file loop in batch mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// Log and skip failed files, keep processing the rest.
    #[default]
    BestEffort,
    /// Abort the batch on the first per-file failure.
    FailFast,
}

/// Orchestrates the object store and caption provider for upload requests.
///
/// Holds only immutable configuration and shared clients; safe to share
/// across concurrent requests.
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    captioner: Arc<dyn CaptionProvider>,
    poll: PollSettings,
    batch_mode: BatchMode,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        captioner: Arc<dyn CaptionProvider>,
        poll: PollSettings,
    ) -> Self {
        Self {
            store,
            captioner,
            poll,
            batch_mode: BatchMode::default(),
        }
    }

    /// Override the batch failure policy.
    pub fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    /// Process one upload. Any step failing aborts the request; there is no
    /// partial result.
    ///
    /// The renamed object always gets a `.jpg` extension on this path,
    /// regardless of the uploaded file's type.
    pub async fn upload_single(
        &self,
        name: &str,
        file: UploadFile,
    ) -> Result<CaptionedUpload, PipelineError> {
        validate_name(name)?;
        self.process_file(name, file, ".jpg").await
    }

    /// Process a batch of uploads sequentially, then upload a CSV manifest
    /// of the successful results under `{name}/results.csv`.
    ///
    /// Per-file failures follow the configured [`BatchMode`]; a manifest
    /// build or upload failure fails the whole batch even though per-file
    /// objects already persist.
    pub async fn upload_batch(
        &self,
        name: &str,
        files: Vec<UploadFile>,
    ) -> Result<BatchOutcome, PipelineError> {
        validate_name(name)?;
        if files.is_empty() {
            return Err(PipelineError::Validation {
                message: "batch upload requires at least one file".to_string(),
            });
        }

        let mut results = Vec::new();
        for file in files {
            // Batch files keep their original extension after rename
            let extension = file_extension(&file.filename);
            let filename = file.filename.clone();
            match self.process_file(name, file, &extension).await {
                Ok(result) => results.push(result),
                Err(e) => match self.batch_mode {
                    BatchMode::BestEffort => {
                        tracing::warn!(filename = %filename, "Skipping file: {e}");
                    }
                    BatchMode::FailFast => return Err(e),
                },
            }
        }

        let csv = manifest::build_csv(&results)?;
        let manifest_key = format!("{name}/{}", manifest::MANIFEST_FILENAME);
        self.store
            .put_object(&manifest_key, csv, "text/csv")
            .await
            .map_err(|e| PipelineError::Manifest {
                message: format!("manifest upload failed: {e}"),
            })?;
        let csv_url = self.store.public_url(&manifest_key);
        tracing::info!(csv_url = %csv_url, count = results.len(), "Batch complete");

        Ok(BatchOutcome {
            files: results,
            csv_url,
        })
    }

    /// Run store → caption → rename for one file.
    async fn process_file(
        &self,
        name: &str,
        file: UploadFile,
        renamed_extension: &str,
    ) -> Result<CaptionedUpload, PipelineError> {
        let key = format!("{name}/{}", file.filename);
        let content_type = mime_guess::from_path(&file.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        self.store
            .put_object(&key, file.content, &content_type)
            .await
            .map_err(|e| PipelineError::Upload {
                key: key.clone(),
                message: e.to_string(),
            })?;
        let url = self.store.public_url(&key);

        tracing::info!(key = %key, "Stored upload; requesting caption");
        // On caption or rename failure the object stays under its original
        // key; no compensating delete.
        let result = self.captioner.caption(&url).await?;

        let new_key = format!(
            "{name}/{}{renamed_extension}",
            sanitize_caption(&result.caption)
        );
        tracing::info!(old_key = %key, new_key = %new_key, "Renaming to captioned key");
        let final_url = store::rename(self.store.as_ref(), &key, &new_key, &self.poll).await?;

        Ok(CaptionedUpload {
            url: final_url,
            caption: result.caption,
        })
    }
}

fn validate_name(name: &str) -> Result<(), PipelineError> {
    if name.is_empty() {
        return Err(PipelineError::Validation {
            message: "missing 'name' field".to_string(),
        });
    }
    Ok(())
}

/// Derive the stored key's stem from a caption.
fn sanitize_caption(caption: &str) -> String {
    caption.replace(' ', "-")
}

/// Extension of the original filename, dot included; empty when absent.
fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::{CaptionProvider, CaptionResult};
    use crate::error::StoreError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory object store tracking calls, with per-key put failures.
    #[derive(Default)]
    struct MockStore {
        objects: Mutex<BTreeMap<String, Vec<u8>>>,
        put_calls: AtomicU32,
        fail_put_keys: Vec<String>,
        fail_delete: bool,
    }

    impl MockStore {
        fn listing(&self) -> Vec<String> {
            self.objects.lock().unwrap().keys().cloned().collect()
        }

        fn object(&self, key: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl ObjectStore for MockStore {
        async fn put_object(
            &self,
            key: &str,
            content: Vec<u8>,
            _content_type: &str,
        ) -> Result<(), StoreError> {
            self.put_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_put_keys.iter().any(|k| k == key) {
                return Err(StoreError {
                    operation: "put",
                    key: key.to_string(),
                    message: "injected failure".to_string(),
                });
            }
            self.objects.lock().unwrap().insert(key.to_string(), content);
            Ok(())
        }

        async fn copy_object(&self, source_key: &str, dest_key: &str) -> Result<(), StoreError> {
            let mut objects = self.objects.lock().unwrap();
            let content = objects.get(source_key).cloned().ok_or(StoreError {
                operation: "copy",
                key: source_key.to_string(),
                message: "source missing".to_string(),
            })?;
            objects.insert(dest_key.to_string(), content);
            Ok(())
        }

        async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
            if self.fail_delete {
                return Err(StoreError {
                    operation: "delete",
                    key: key.to_string(),
                    message: "injected failure".to_string(),
                });
            }
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        async fn object_exists(&self, key: &str) -> Result<bool, StoreError> {
            Ok(self.objects.lock().unwrap().contains_key(key))
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://bucket.example.com/{key}")
        }
    }

    /// Captioner returning a fixed or URL-derived caption, or failing.
    struct MockCaptioner {
        caption: Option<String>,
        fail: bool,
        calls: AtomicU32,
    }

    impl MockCaptioner {
        fn success(caption: &str) -> Self {
            Self {
                caption: Some(caption.to_string()),
                fail: false,
                calls: AtomicU32::new(0),
            }
        }

        /// Derive a distinct caption per image from its URL's file stem.
        fn per_file() -> Self {
            Self {
                caption: None,
                fail: false,
                calls: AtomicU32::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                caption: None,
                fail: true,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CaptionProvider for MockCaptioner {
        fn name(&self) -> &str {
            "mock"
        }

        async fn caption(&self, image_url: &str) -> Result<CaptionResult, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PipelineError::Caption {
                    image_url: image_url.to_string(),
                    message: "injected failure".to_string(),
                });
            }
            let caption = self.caption.clone().unwrap_or_else(|| {
                let stem = image_url
                    .rsplit('/')
                    .next()
                    .and_then(|f| f.split('.').next())
                    .unwrap_or("image");
                format!("picture of {stem}")
            });
            Ok(CaptionResult {
                image_url: image_url.to_string(),
                caption,
            })
        }
    }

    fn fast_poll() -> PollSettings {
        PollSettings {
            max_attempts: 2,
            interval: Duration::from_millis(1),
        }
    }

    fn pipeline(store: Arc<MockStore>, captioner: Arc<MockCaptioner>) -> Pipeline {
        Pipeline::new(store, captioner, fast_poll())
    }

    fn jpeg(filename: &str) -> UploadFile {
        UploadFile {
            filename: filename.to_string(),
            content: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[tokio::test]
    async fn test_single_upload_renames_to_sanitized_caption() {
        let store = Arc::new(MockStore::default());
        let captioner = Arc::new(MockCaptioner::success("a red bicycle"));
        let result = pipeline(store.clone(), captioner)
            .upload_single("album", jpeg("cat.jpg"))
            .await
            .unwrap();

        assert_eq!(result.caption, "a red bicycle");
        assert_eq!(
            result.url,
            "https://bucket.example.com/album/a-red-bicycle.jpg"
        );
        // Only the renamed key remains
        assert_eq!(store.listing(), vec!["album/a-red-bicycle.jpg"]);
    }

    #[tokio::test]
    async fn test_single_upload_hardcodes_jpg_extension() {
        let store = Arc::new(MockStore::default());
        let captioner = Arc::new(MockCaptioner::success("a red bicycle"));
        pipeline(store.clone(), captioner)
            .upload_single("album", jpeg("cat.png"))
            .await
            .unwrap();

        assert_eq!(store.listing(), vec!["album/a-red-bicycle.jpg"]);
    }

    #[tokio::test]
    async fn test_missing_name_has_no_side_effects() {
        let store = Arc::new(MockStore::default());
        let captioner = Arc::new(MockCaptioner::success("unused"));
        let err = pipeline(store.clone(), captioner.clone())
            .upload_single("", jpeg("cat.jpg"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation { .. }));
        assert_eq!(store.put_calls.load(Ordering::SeqCst), 0);
        assert_eq!(captioner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_caption_failure_leaves_original_object() {
        let store = Arc::new(MockStore::default());
        let captioner = Arc::new(MockCaptioner::failing());
        let err = pipeline(store.clone(), captioner)
            .upload_single("album", jpeg("cat.jpg"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Caption { .. }));
        // The upload persists under its pre-rename key
        assert_eq!(store.listing(), vec!["album/cat.jpg"]);
    }

    #[tokio::test]
    async fn test_delete_failure_surfaces_rename_error_without_rollback() {
        let store = Arc::new(MockStore {
            fail_delete: true,
            ..Default::default()
        });
        let captioner = Arc::new(MockCaptioner::success("a red bicycle"));
        let err = pipeline(store.clone(), captioner)
            .upload_single("album", jpeg("cat.jpg"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Rename { .. }));
        assert_eq!(
            store.listing(),
            vec!["album/a-red-bicycle.jpg", "album/cat.jpg"]
        );
    }

    #[tokio::test]
    async fn test_batch_skips_failed_file_and_keeps_order() {
        let store = Arc::new(MockStore {
            fail_put_keys: vec!["album/two.jpg".to_string()],
            ..Default::default()
        });
        let captioner = Arc::new(MockCaptioner::per_file());
        let outcome = pipeline(store.clone(), captioner)
            .upload_batch(
                "album",
                vec![jpeg("one.jpg"), jpeg("two.jpg"), jpeg("three.jpg")],
            )
            .await
            .unwrap();

        assert_eq!(outcome.files.len(), 2);
        assert_eq!(outcome.files[0].caption, "picture of one");
        assert_eq!(outcome.files[1].caption, "picture of three");
        assert_eq!(outcome.csv_url, "https://bucket.example.com/album/results.csv");

        let manifest = String::from_utf8(store.object("album/results.csv").unwrap()).unwrap();
        let rows: Vec<&str> = manifest.lines().collect();
        assert_eq!(rows.len(), 3); // header + 2 data rows
        assert_eq!(rows[0], "URL,Caption");
        assert!(rows[1].contains("picture-of-one.jpg"));
        assert!(rows[2].contains("picture-of-three.jpg"));
    }

    #[tokio::test]
    async fn test_batch_preserves_original_extension() {
        let store = Arc::new(MockStore::default());
        let captioner = Arc::new(MockCaptioner::success("a red bicycle"));
        pipeline(store.clone(), captioner)
            .upload_batch("album", vec![jpeg("cat.png")])
            .await
            .unwrap();

        assert!(store
            .listing()
            .contains(&"album/a-red-bicycle.png".to_string()));
    }

    #[tokio::test]
    async fn test_batch_requires_at_least_one_file() {
        let store = Arc::new(MockStore::default());
        let captioner = Arc::new(MockCaptioner::success("unused"));
        let err = pipeline(store.clone(), captioner)
            .upload_batch("album", Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation { .. }));
        assert_eq!(store.put_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_fail_fast_aborts_on_first_failure() {
        let store = Arc::new(MockStore {
            fail_put_keys: vec!["album/two.jpg".to_string()],
            ..Default::default()
        });
        let captioner = Arc::new(MockCaptioner::success("a red bicycle"));
        let err = pipeline(store.clone(), captioner)
            .with_batch_mode(BatchMode::FailFast)
            .upload_batch(
                "album",
                vec![jpeg("one.jpg"), jpeg("two.jpg"), jpeg("three.jpg")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Upload { .. }));
        // No manifest was uploaded
        assert!(store.object("album/results.csv").is_none());
    }

    #[tokio::test]
    async fn test_batch_manifest_upload_failure_fails_batch() {
        let store = Arc::new(MockStore {
            fail_put_keys: vec!["album/results.csv".to_string()],
            ..Default::default()
        });
        let captioner = Arc::new(MockCaptioner::success("a red bicycle"));
        let err = pipeline(store.clone(), captioner)
            .upload_batch("album", vec![jpeg("one.jpg")])
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Manifest { .. }));
        // The per-file object survived the manifest failure
        assert!(store
            .listing()
            .contains(&"album/a-red-bicycle.jpg".to_string()));
    }

    #[test]
    fn test_sanitize_caption_replaces_spaces() {
        assert_eq!(sanitize_caption("a dog on a beach"), "a-dog-on-a-beach");
        assert!(!sanitize_caption("many words with spaces").contains(' '));
        assert_eq!(sanitize_caption(""), "");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("cat.jpg"), ".jpg");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("no_extension"), "");
    }
}
