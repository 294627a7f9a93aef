use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Which vision backend produced (or should produce) an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "aws")]
    Aws,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Aws => "aws",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "aws" => Ok(ProviderKind::Aws),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Image encodings the vision APIs accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Webp => "image/webp",
        }
    }

    /// Map a file extension (without the dot, any case) to a media type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            "gif" => Some(MediaType::Gif),
            "webp" => Some(MediaType::Webp),
            _ => None,
        }
    }
}

/// A loaded photo, ready to hand to an adapter.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    /// Set when the media type had to be guessed.
    pub warning: Option<String>,
}

/// One food item detected in a photo. Only constructed by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_name: String,
    pub quantity: u32,
    pub confidence: f64,
    pub is_leftover: bool,
}

/// An item record pulled out of raw provider text, not yet validated.
///
/// `is_leftover` is kept as the raw JSON value so the validator can tell a
/// missing flag from a mistyped one.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    pub item_name: String,
    pub quantity: i64,
    pub confidence: f64,
    pub is_leftover: Value,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    provider: ProviderKind,
    items: Vec<InventoryItem>,
    warnings: Vec<String>,
    #[serde(skip)]
    raw_response: String,
}

impl AnalysisResult {
    pub(crate) fn new(
        provider: ProviderKind,
        items: Vec<InventoryItem>,
        warnings: Vec<String>,
        raw_response: String,
    ) -> Self {
        Self {
            provider,
            items,
            warnings,
            raw_response,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Validated items in the order the provider reported them.
    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// The provider's reply text, kept for diagnostics. Not serialized.
    pub fn raw_response(&self) -> &str {
        &self.raw_response
    }
}
