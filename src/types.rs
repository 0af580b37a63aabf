//! Shared types exchanged between the workflow core and its collaborators.
//!
//! The upload service hands in [`UploadedImage`]s, the generation backend
//! hands back [`ArtifactRef`]s, and the export service consumes
//! [`ExportRequest`]s. All of them serialize to JSON so a presentation layer
//! can pass them across whatever boundary it has.

use crate::adjust::RenderDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An image as reported by the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: String,
    pub display_url: String,
}

impl UploadedImage {
    pub fn new(id: impl Into<String>, display_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_url: display_url.into(),
        }
    }
}

/// An uploaded image owned by a workflow session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceImage {
    pub id: String,
    /// Ties the image to the session that uploaded it.
    pub ownership_token: String,
    pub display_url: String,
}

/// Reference to a generated output image. The core never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(pub String);

impl ArtifactRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File format requested from the export collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Webp => "webp",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpeg" | "jpg" => Ok(ExportFormat::Jpeg),
            "webp" => Ok(ExportFormat::Webp),
            other => Err(format!("unknown export format '{other}' (png, jpeg, webp)")),
        }
    }
}

/// Output resolution requested from the export collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[default]
    Original,
    #[serde(rename = "2k")]
    TwoK,
    #[serde(rename = "4k")]
    FourK,
}

impl Resolution {
    /// Pixel length of the longer edge, or `None` to keep the source size.
    pub fn long_edge(self) -> Option<u32> {
        match self {
            Resolution::Original => None,
            Resolution::TwoK => Some(2048),
            Resolution::FourK => Some(4096),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resolution::Original => "original",
            Resolution::TwoK => "2k",
            Resolution::FourK => "4k",
        })
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(Resolution::Original),
            "2k" => Ok(Resolution::TwoK),
            "4k" => Ok(Resolution::FourK),
            other => Err(format!("unknown resolution '{other}' (original, 2k, 4k)")),
        }
    }
}

/// One item of an export batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Position of the artifact in the session's artifact list.
    pub index: usize,
    pub artifact: ArtifactRef,
    pub format: ExportFormat,
    pub resolution: Resolution,
    /// Adjustments to bake in at export time.
    pub render: RenderDescriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_format_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ExportFormat::Jpeg).unwrap(), "\"jpeg\"");
        let f: ExportFormat = serde_json::from_str("\"webp\"").unwrap();
        assert_eq!(f, ExportFormat::Webp);
    }

    #[test]
    fn resolution_uses_short_names() {
        assert_eq!(serde_json::to_string(&Resolution::FourK).unwrap(), "\"4k\"");
        let r: Resolution = serde_json::from_str("\"2k\"").unwrap();
        assert_eq!(r, Resolution::TwoK);
        assert_eq!(Resolution::Original.long_edge(), None);
    }

    #[test]
    fn parse_format_and_resolution() {
        assert_eq!("JPG".parse::<ExportFormat>(), Ok(ExportFormat::Jpeg));
        assert_eq!("4k".parse::<Resolution>(), Ok(Resolution::FourK));
        assert!("tiff".parse::<ExportFormat>().is_err());
        assert!("8k".parse::<Resolution>().is_err());
    }

    #[test]
    fn artifact_ref_is_transparent() {
        let a = ArtifactRef::new("https://cdn.test/x.png");
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"https://cdn.test/x.png\"");
    }
}
