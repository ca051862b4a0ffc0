//! Output-parsing strategies for raw prediction output.
//!
//! The default strategy matches captioning models that emit
//! `"Caption: <text>"`. It is a property of the configured model, not a
//! universal rule, so the strategy is selectable per deployment.

use std::str::FromStr;

/// Strategy for extracting the caption from a prediction's string output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptionParser {
    /// Take the substring after the first `:`, trimmed of surrounding
    /// whitespace. Output without a colon yields an empty caption.
    #[default]
    ColonDelimited,
    /// Use the trimmed output as-is.
    Verbatim,
}

impl CaptionParser {
    /// Extract the caption from `raw`.
    pub fn parse(&self, raw: &str) -> String {
        match self {
            CaptionParser::ColonDelimited => match raw.split_once(':') {
                Some((_, rest)) => rest.trim().to_string(),
                None => String::new(),
            },
            CaptionParser::Verbatim => raw.trim().to_string(),
        }
    }
}

impl FromStr for CaptionParser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "colon-delimited" => Ok(CaptionParser::ColonDelimited),
            "verbatim" => Ok(CaptionParser::Verbatim),
            other => Err(format!("unknown caption output format: {other}")),
        }
    }
}
