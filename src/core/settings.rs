//! Persisted settings: compression profiles, theme and worker threads.

use serde::{Deserialize, Serialize};
use crate::utils::ImageType;

/// Id of the built-in profile. It can be edited but never deleted.
pub const DEFAULT_PROFILE_ID: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ThemeKind {
    Light,
    Dark,
    #[default]
    System,
}

/// Everything the settings file stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsData {
    pub version: u32,
    pub theme: ThemeKind,
    pub profiles: Vec<ProfileData>,
    /// Maximum number of concurrent compressions, 0 for no limit
    #[serde(default)]
    pub threads: u32,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            version: 1,
            theme: ThemeKind::System,
            profiles: vec![ProfileData::default()],
            threads: 0,
        }
    }
}

impl SettingsData {
    pub fn profile(&self, id: u32) -> Option<&ProfileData> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn profile_mut(&mut self, id: u32) -> Option<&mut ProfileData> {
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    /// The profile flagged active, falling back to the default profile.
    pub fn active_profile(&self) -> Option<&ProfileData> {
        self.profiles
            .iter()
            .find(|p| p.active)
            .or_else(|| self.profile(DEFAULT_PROFILE_ID))
    }

    /// Flags exactly one profile active. Unknown ids activate the default
    /// profile instead. Returns the id that ended up active.
    pub fn activate(&mut self, id: u32) -> u32 {
        let target = if self.profile(id).is_some() { id } else { DEFAULT_PROFILE_ID };
        for profile in &mut self.profiles {
            profile.active = profile.id == target;
        }
        target
    }
}

/// A named bundle of compression parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    pub name: String,
    pub id: u32,
    pub active: bool,
    pub should_resize: bool,
    pub should_convert: bool,
    pub should_overwrite: bool,
    #[serde(default = "default_true", alias = "add_posfix")]
    pub add_postfix: bool,
    pub convert_extension: ImageType,
    pub postfix: String,
    pub resize_width: u32,
    pub resize_height: u32,
    pub jpeg_quality: u32,
    pub png_quality: u32,
    pub webp_quality: u32,
    pub gif_quality: u32,
}

fn default_true() -> bool {
    true
}

impl Default for ProfileData {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            id: DEFAULT_PROFILE_ID,
            active: true,
            should_resize: false,
            should_convert: false,
            should_overwrite: false,
            add_postfix: true,
            convert_extension: ImageType::WEBP,
            postfix: ".min".to_string(),
            resize_width: 1000,
            resize_height: 1000,
            jpeg_quality: 80,
            png_quality: 80,
            webp_quality: 80,
            gif_quality: 80,
        }
    }
}

impl ProfileData {
    /// Default parameters under a new id and name, not active.
    pub fn with_id(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: false,
            ..Self::default()
        }
    }

    /// Quality setting for the given output format. TIFF has no quality knob
    /// of its own and uses the JPEG value.
    pub fn quality_for(&self, format: ImageType) -> u32 {
        match format {
            ImageType::JPEG | ImageType::TIFF => self.jpeg_quality,
            ImageType::PNG => self.png_quality,
            ImageType::WEBP => self.webp_quality,
            ImageType::GIF => self.gif_quality,
        }
    }

    pub fn apply(&mut self, update: &ProfileUpdate) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &update.$field {
                    self.$field = value.clone();
                })*
            };
        }
        merge!(
            name,
            should_resize,
            should_convert,
            should_overwrite,
            add_postfix,
            convert_extension,
            postfix,
            resize_width,
            resize_height,
            jpeg_quality,
            png_quality,
            webp_quality,
            gif_quality,
        );
    }
}

/// Partial edit of a profile from the settings page. `id` and `active` are
/// not editable this way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub should_resize: Option<bool>,
    pub should_convert: Option<bool>,
    pub should_overwrite: Option<bool>,
    pub add_postfix: Option<bool>,
    pub convert_extension: Option<ImageType>,
    pub postfix: Option<String>,
    pub resize_width: Option<u32>,
    pub resize_height: Option<u32>,
    pub jpeg_quality: Option<u32>,
    pub png_quality: Option<u32>,
    pub webp_quality: Option<u32>,
    pub gif_quality: Option<u32>,
}
