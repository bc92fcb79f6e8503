use serde::Serialize;
use std::fmt;

/// Allowed MIME types for video uploads
pub const VIDEO_MIME_TYPES: &[&str] = &["video/mp4"];

/// Allowed MIME types for thumbnail uploads
pub const THUMBNAIL_MIME_TYPES: &[&str] = &["image/jpeg", "image/png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Video,
    Thumbnail,
}

impl AssetClass {
    pub fn allowed_types(self) -> &'static [&'static str] {
        match self {
            AssetClass::Video => VIDEO_MIME_TYPES,
            AssetClass::Thumbnail => THUMBNAIL_MIME_TYPES,
        }
    }

    /// Name of the multipart field carrying this asset.
    pub fn field_name(self) -> &'static str {
        match self {
            AssetClass::Video => "video",
            AssetClass::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A declared content type that passed the allow-list for its asset class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedType {
    essence: String,
}

impl ValidatedType {
    pub fn as_str(&self) -> &str {
        &self.essence
    }

    /// Subtype of the media type, used as the stored file's extension
    /// (`image/png` -> `png`).
    pub fn extension(&self) -> &str {
        self.essence
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .unwrap_or(&self.essence)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Checks a client-declared content type against the allow-list of `class`.
///
/// Parameters such as `; charset=...` are ignored. Only the header is
/// inspected; see [`verify_magic_bytes`] for checking the payload itself.
pub fn validate_content_type(
    declared: Option<&str>,
    class: AssetClass,
) -> Result<ValidatedType, ValidationError> {
    let declared = declared
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError {
            code: "MISSING_CONTENT_TYPE",
            message: format!("No content type declared for {}", class),
        })?;

    let parsed: mime::Mime = declared.parse().map_err(|_| ValidationError {
        code: "INVALID_CONTENT_TYPE",
        message: format!("Invalid content type '{}'", declared),
    })?;

    let essence = parsed.essence_str().to_ascii_lowercase();
    if !class.allowed_types().contains(&essence.as_str()) {
        return Err(ValidationError {
            code: "UNSUPPORTED_MIME_TYPE",
            message: format!(
                "Content type '{}' is not allowed for {} (allowed: {})",
                essence,
                class,
                class.allowed_types().join(", ")
            ),
        });
    }

    Ok(ValidatedType { essence })
}

/// Checks that the leading bytes of a payload match its validated type.
pub fn verify_magic_bytes(header: &[u8], expected: &ValidatedType) -> Result<(), ValidationError> {
    if header.is_empty() {
        return Err(ValidationError {
            code: "EMPTY_FILE",
            message: "File appears to be empty".to_string(),
        });
    }

    match infer::get(header) {
        Some(kind) if kind.mime_type() == expected.as_str() => Ok(()),
        Some(kind) => Err(ValidationError {
            code: "CONTENT_MISMATCH",
            message: format!(
                "File content looks like '{}' but was declared as '{}'",
                kind.mime_type(),
                expected.as_str()
            ),
        }),
        None => Err(ValidationError {
            code: "UNRECOGNIZED_CONTENT",
            message: format!(
                "File content could not be identified as '{}'",
                expected.as_str()
            ),
        }),
    }
}
