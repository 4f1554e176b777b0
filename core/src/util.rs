//! Shared request-building helpers for the two HTTP clients

use crate::error::{Result, SheetAiError};

/// Reject strings that cannot travel in an HTTP header value.
///
/// Control characters (0x00-0x1F), DEL and line breaks are refused.
pub fn sanitize_for_header(value: &str, field_name: &str) -> Result<String> {
    if value.is_empty() {
        return Err(SheetAiError::InvalidConfig {
            message: format!("{} cannot be empty", field_name),
        });
    }

    for (index, ch) in value.char_indices() {
        if ch.is_control() || ch == '\u{7f}' {
            return Err(SheetAiError::InvalidConfig {
                message: format!(
                    "{} contains invalid character at position {} ({:?}). \
                    Control characters and line breaks are not allowed.",
                    field_name, index, ch
                ),
            });
        }
    }

    Ok(value.to_string())
}

/// Validate a secret for use as a `Bearer` credential
pub fn validate_bearer(secret: &str, field_name: &str) -> Result<String> {
    let trimmed = secret.trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Err(SheetAiError::MissingConfig {
            key: field_name.to_string(),
        });
    }

    sanitize_for_header(trimmed, field_name)?;

    format!("Bearer {}", trimmed)
        .parse::<reqwest::header::HeaderValue>()
        .map_err(|_| SheetAiError::InvalidConfig {
            message: format!(
                "{} results in an invalid Authorization header (length {})",
                field_name,
                trimmed.len()
            ),
        })?;

    Ok(trimmed.to_string())
}

/// Trim and check a base URL, returning it without a trailing slash
pub fn sanitize_base_url(url: &str, field_name: &str) -> Result<String> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        return Err(SheetAiError::InvalidConfig {
            message: format!("{} cannot be empty", field_name),
        });
    }

    // %2F and friends mean the value was encoded twice somewhere
    if trimmed.contains("%2F") || trimmed.contains("%3D") || trimmed.contains("%20") {
        return Err(SheetAiError::InvalidConfig {
            message: format!(
                "{} appears to contain URL-encoded characters (e.g. %2F, %3D, %20)",
                field_name
            ),
        });
    }

    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(SheetAiError::InvalidConfig {
            message: format!(
                "{} must start with 'http://' or 'https://'. Got: {}",
                field_name, trimmed
            ),
        });
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Mask a secret for display, keeping the last four characters
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
