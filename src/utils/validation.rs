use crate::core::ProfileData;
use crate::utils::{OptimizerResult, ValidationError};

/// Validates the parameters of a compression profile before it is handed to
/// the optimizer.
pub fn validate_profile(profile: &ProfileData) -> OptimizerResult<()> {
    let qualities = [
        ("JPEG", profile.jpeg_quality),
        ("PNG", profile.png_quality),
        ("WEBP", profile.webp_quality),
        ("GIF", profile.gif_quality),
    ];
    for (format, quality) in qualities {
        if quality == 0 || quality > 100 {
            return Err(ValidationError::settings(format!(
                "Invalid {} quality value: {}. Must be between 1 and 100",
                format, quality
            ))
            .into());
        }
    }

    if profile.should_resize {
        if profile.resize_width == 0 {
            return Err(ValidationError::settings("Width cannot be 0").into());
        }
        if profile.resize_height == 0 {
            return Err(ValidationError::settings("Height cannot be 0").into());
        }
    }

    // Writing next to the original with no postfix and no overwrite would
    // clobber the source anyway.
    if !profile.should_overwrite && profile.postfix.is_empty() {
        return Err(ValidationError::settings(
            "A postfix is required when overwriting is disabled",
        )
        .into());
    }

    Ok(())
}
