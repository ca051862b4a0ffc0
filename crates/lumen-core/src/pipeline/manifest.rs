//! CSV manifest for batch results.

use super::CaptionedUpload;
use crate::error::PipelineError;

/// Filename the manifest is stored under, inside the batch's name prefix.
pub(crate) const MANIFEST_FILENAME: &str = "results.csv";

/// Serialize batch results to CSV with a `URL,Caption` header row,
/// preserving result order.
pub(crate) fn build_csv(results: &[CaptionedUpload]) -> Result<Vec<u8>, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["URL", "Caption"])
        .map_err(manifest_error)?;
    for result in results {
        writer
            .write_record([result.url.as_str(), result.caption.as_str()])
            .map_err(manifest_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Manifest {
            message: e.to_string(),
        })
}

fn manifest_error(e: csv::Error) -> PipelineError {
    PipelineError::Manifest {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(url: &str, caption: &str) -> CaptionedUpload {
        CaptionedUpload {
            url: url.to_string(),
            caption: caption.to_string(),
        }
    }

    #[test]
    fn test_csv_round_trip() {
        let results = vec![upload("u1", "c1"), upload("u2", "c2")];
        let bytes = build_csv(&results).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "URL,Caption\nu1,c1\nu2,c2\n");
    }

    #[test]
    fn test_empty_results_yield_header_only() {
        let bytes = build_csv(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "URL,Caption\n");
    }

    #[test]
    fn test_caption_with_comma_is_quoted() {
        let results = vec![upload("u1", "a dog, running")];
        let bytes = build_csv(&results).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "URL,Caption\nu1,\"a dog, running\"\n"
        );
    }
}
