use std::{convert::Infallible, fmt, path::Path, str::FromStr};

use base64::Engine;
use bytes::Bytes;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "png", "jpeg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, SerializeDisplay, DeserializeFromStr)]
pub enum Condition {
    #[default]
    New,
    UkUsed,
    NaijaUsed,
}

impl Condition {
    pub const ALL: [Condition; 3] = [Condition::New, Condition::UkUsed, Condition::NaijaUsed];

    pub fn label(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::UkUsed => "UK Used",
            Condition::NaijaUsed => "Naija Used",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown condition '{0}', expected one of: New, UK Used, Naija Used")]
pub struct UnknownCondition(pub String);

impl FromStr for Condition {
    type Err = UnknownCondition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Condition::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| UnknownCondition(s.to_string()))
    }
}

/// Target platform for the caption. Labels outside the listed three are kept
/// as `Unlisted` and styled like Instagram.
#[derive(Debug, Clone, PartialEq, Eq, Default, SerializeDisplay, DeserializeFromStr)]
pub enum Platform {
    #[default]
    Instagram,
    WhatsAppStatus,
    Jiji,
    Unlisted(String),
}

impl Platform {
    pub const LISTED: [Platform; 3] = [Platform::Instagram, Platform::WhatsAppStatus, Platform::Jiji];

    /// Exact label match; anything else is kept as `Unlisted`. Blank input
    /// means no choice was made and gives the default.
    pub fn from_label(label: &str) -> Self {
        if label.trim().is_empty() {
            return Platform::default();
        }
        match label {
            "Instagram" => Platform::Instagram,
            "WhatsApp Status" => Platform::WhatsAppStatus,
            "Jiji" => Platform::Jiji,
            other => Platform::Unlisted(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::WhatsAppStatus => "WhatsApp Status",
            Platform::Jiji => "Jiji",
            Platform::Unlisted(label) => label,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Platform::from_label(s))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("unsupported file type for '{0}', upload a jpg, png or jpeg photo")]
    UnsupportedExtension(String),
    #[error("could not read '{file}' as an image: {reason}")]
    Undecodable { file: String, reason: String },
}

/// An uploaded item photo that decoded successfully.
#[derive(Clone)]
pub struct ItemPhoto {
    pub file_name: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub bytes: Bytes,
}

impl fmt::Debug for ItemPhoto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemPhoto")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &format_args!("[{} bytes]", self.bytes.len()))
            .finish()
    }
}

impl ItemPhoto {
    pub fn from_upload(file_name: &str, bytes: Bytes) -> Result<Self, UploadError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if !extension.is_some_and(|e| ACCEPTED_EXTENSIONS.contains(&e.as_str())) {
            return Err(UploadError::UnsupportedExtension(file_name.to_string()));
        }

        let undecodable = |reason: String| UploadError::Undecodable {
            file: file_name.to_string(),
            reason,
        };
        let format = image::guess_format(&bytes).map_err(|e| undecodable(e.to_string()))?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(undecodable(format!("{format:?} images are not supported")));
        }
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| undecodable(e.to_string()))?;

        Ok(Self {
            file_name: file_name.to_string(),
            mime_type: format.to_mime_type().to_string(),
            width: decoded.width(),
            height: decoded.height(),
            bytes,
        })
    }

    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64())
    }
}

/// Free-form model output, shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingResult {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SelectionRequest {
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub platform: Option<Platform>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CredentialRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct OptionsResponse {
    pub conditions: Vec<Condition>,
    pub platforms: Vec<Platform>,
    pub default_condition: Condition,
    pub default_platform: Platform,
    pub accepted_extensions: Vec<&'static str>,
}

impl Default for OptionsResponse {
    fn default() -> Self {
        Self {
            conditions: Condition::ALL.to_vec(),
            platforms: Platform::LISTED.to_vec(),
            default_condition: Condition::default(),
            default_platform: Platform::default(),
            accepted_extensions: ACCEPTED_EXTENSIONS.to_vec(),
        }
    }
}
