use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use crate::utils::OptimizerError;

/// Image formats the optimizer accepts and can convert between.
///
/// Serialized in upper case to match the persisted settings schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum ImageType {
    JPEG,
    PNG,
    WEBP,
    GIF,
    TIFF,
}

impl ImageType {
    pub const ALL: [ImageType; 5] = [Self::JPEG, Self::PNG, Self::WEBP, Self::GIF, Self::TIFF];

    /// Get file extensions associated with this format
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::JPEG => &["jpg", "jpeg"],
            Self::PNG => &["png"],
            Self::WEBP => &["webp"],
            Self::GIF => &["gif"],
            Self::TIFF => &["tiff", "tif"],
        }
    }

    /// Check if the extension matches this format
    pub fn matches_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.extensions().contains(&ext.as_str())
    }

    /// Get the primary extension for this format
    pub fn primary_extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// Extension to write when producing this format from a file that had
    /// `original_extension`. A `.jpeg` source stays `.jpeg`.
    pub fn output_extension(&self, original_extension: &str) -> &'static str {
        match self {
            Self::JPEG if original_extension.eq_ignore_ascii_case("jpeg") => "jpeg",
            other => other.primary_extension(),
        }
    }
}

impl FromStr for ImageType {
    type Err = OptimizerError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        let ext = ext.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.matches_extension(&ext))
            .ok_or_else(|| OptimizerError::format(format!("Unsupported image format: {}", ext)))
    }
}

/// Get format from file extension
pub fn format_from_extension(path: &str) -> Result<ImageType, OptimizerError> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| OptimizerError::format(
            format!("File has no extension: {}", path)
        ))?;

    ImageType::from_str(ext)
}

/// True when the path carries an extension the optimizer understands.
pub fn is_supported_image(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ImageType::from_str(ext).is_ok())
}
