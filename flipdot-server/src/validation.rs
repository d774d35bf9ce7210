//! Input validation for untrusted data.
//!
//! Everything arriving over HTTP is checked here before it reaches the store.
//! Document ranges (dimensions, durations, frame count) are checked by
//! `flipdot_core::WireDocument::into_document`.

use flipdot_core::{TextOverlayConfig, WireDocument};
use thiserror::Error;

/// Maximum length for animation names.
pub const MAX_NAME_LEN: usize = 64;
/// Maximum length for a text overlay feed URL.
pub const MAX_TEXT_URL_LEN: usize = 2048;
/// Maximum length for a text overlay field path.
pub const MAX_TEXT_FIELD_LEN: usize = 256;
/// Maximum request body size. A full 1000-frame 84x28 document is about 2.4MB.
pub const MAX_REQUEST_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Validation error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No name given where one is required.
    #[error("name is required")]
    NameMissing,
    /// Name exceeds maximum length.
    #[error("name too long (max {MAX_NAME_LEN} chars)")]
    NameTooLong,
    /// Name contains invalid characters.
    #[error("name contains invalid characters")]
    NameInvalidChars,
    /// Name starts or ends with whitespace.
    #[error("name has leading or trailing whitespace")]
    NameUntrimmed,
    /// Text overlay URL exceeds maximum length.
    #[error("text url too long (max {MAX_TEXT_URL_LEN} bytes)")]
    TextUrlTooLong,
    /// Text overlay field path exceeds maximum length.
    #[error("text field too long (max {MAX_TEXT_FIELD_LEN} bytes)")]
    TextFieldTooLong,
}

impl ValidationError {
    /// Short label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NameMissing
            | Self::NameTooLong
            | Self::NameInvalidChars
            | Self::NameUntrimmed => "name",
            Self::TextUrlTooLong | Self::TextFieldTooLong => "text",
        }
    }
}

/// Check if a character is valid in an animation name.
fn is_valid_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.')
}

/// Validate an animation name.
///
/// Valid names:
/// - 1-64 characters
/// - Alphanumeric, hyphen, underscore, space, or dot
/// - No leading or trailing space
///
/// # Errors
///
/// Returns the first rule the name breaks.
pub fn validate_animation_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::NameMissing);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    if !name.chars().all(is_valid_name_char) {
        return Err(ValidationError::NameInvalidChars);
    }
    if name.trim() != name {
        return Err(ValidationError::NameUntrimmed);
    }
    Ok(())
}

/// Validate the free-text parts of a text overlay.
///
/// # Errors
///
/// Returns [`ValidationError::TextUrlTooLong`] or
/// [`ValidationError::TextFieldTooLong`].
pub fn validate_text_overlay(text: &TextOverlayConfig) -> Result<(), ValidationError> {
    if text.url.len() > MAX_TEXT_URL_LEN {
        return Err(ValidationError::TextUrlTooLong);
    }
    if text.field.len() > MAX_TEXT_FIELD_LEN {
        return Err(ValidationError::TextFieldTooLong);
    }
    Ok(())
}

/// Pick and validate the target name for a save.
///
/// The query name wins; otherwise the body's own name; otherwise `active`.
///
/// # Errors
///
/// Returns a [`ValidationError`] for a bad name or overlay.
pub fn resolve_save_target(
    query: Option<&str>,
    doc: &WireDocument,
    active: &str,
) -> Result<String, ValidationError> {
    let name = query
        .or_else(|| doc.name.as_deref().filter(|n| !n.is_empty()))
        .unwrap_or(active);
    validate_animation_name(name)?;
    if let Some(text) = &doc.text {
        validate_text_overlay(text)?;
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: Option<&str>) -> WireDocument {
        WireDocument {
            name: name.map(str::to_string),
            w: 1,
            h: 1,
            frames: Vec::new(),
            text: None,
        }
    }

    #[test]
    fn test_valid_names() {
        assert!(validate_animation_name("default").is_ok());
        assert!(validate_animation_name("walk cycle").is_ok());
        assert!(validate_animation_name("intro_v2.1").is_ok());
        assert!(validate_animation_name("a").is_ok());
        assert!(validate_animation_name("Ski-Jump").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(
            validate_animation_name(""),
            Err(ValidationError::NameMissing)
        );
        assert!(validate_animation_name("has/slash").is_err());
        assert!(validate_animation_name("../../../etc/passwd").is_err());
        assert!(validate_animation_name("path\\traversal").is_err());
        assert!(validate_animation_name("contains<script>").is_err());
        assert!(validate_animation_name("tab\there").is_err());
        assert_eq!(
            validate_animation_name(" padded "),
            Err(ValidationError::NameUntrimmed)
        );
    }

    #[test]
    fn test_name_boundary() {
        let at_limit = "x".repeat(MAX_NAME_LEN);
        assert!(validate_animation_name(&at_limit).is_ok());

        let over_limit = "x".repeat(MAX_NAME_LEN + 1);
        assert_eq!(
            validate_animation_name(&over_limit),
            Err(ValidationError::NameTooLong)
        );
    }

    #[test]
    fn test_text_overlay_lengths() {
        let mut text = TextOverlayConfig {
            enable: true,
            url: "http://feed.local/now".to_string(),
            field: "data.value".to_string(),
            interval_ms: 5000,
        };
        assert!(validate_text_overlay(&text).is_ok());

        text.url = "x".repeat(MAX_TEXT_URL_LEN + 1);
        assert_eq!(
            validate_text_overlay(&text),
            Err(ValidationError::TextUrlTooLong)
        );
    }

    #[test]
    fn test_save_target_precedence() {
        assert_eq!(
            resolve_save_target(Some("walk"), &doc(None), "default"),
            Ok("walk".to_string())
        );
        assert_eq!(
            resolve_save_target(None, &doc(Some("run")), "default"),
            Ok("run".to_string())
        );
        assert_eq!(
            resolve_save_target(None, &doc(None), "default"),
            Ok("default".to_string())
        );
        assert_eq!(
            resolve_save_target(Some("walk"), &doc(Some("run")), "default"),
            Ok("walk".to_string())
        );
        assert_eq!(
            resolve_save_target(None, &doc(Some("bad/name")), "default"),
            Err(ValidationError::NameInvalidChars)
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ValidationError::NameTooLong;
        assert!(err.to_string().contains("64"));
        assert_eq!(err.kind(), "name");
        assert_eq!(ValidationError::TextFieldTooLong.kind(), "text");
    }
}
