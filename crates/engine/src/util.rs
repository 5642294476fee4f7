//! Internal helpers for input normalization.
//!
//! These utilities are **not** part of the public API, apart from
//! [`normalize_email`] which the directory exposes. They centralize text
//! cleanup so every write path enforces the same rules.

use unicode_normalization::UnicodeNormalization;

use crate::{ResultEngine, ValidationError};

/// Normalizes an email for storage and comparison (NFC, trimmed, lowercase).
///
/// Fails with [`ValidationError::InvalidEmail`] when there is no `@` with text
/// on both sides.
pub fn normalize_email(value: &str) -> ResultEngine<String> {
    let normalized: String = value.trim().nfc().collect::<String>().to_lowercase();
    match normalized.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(normalized),
        _ => Err(ValidationError::InvalidEmail(value.trim().to_string()).into()),
    }
}

/// Trims and NFC-normalizes a required text field.
pub(crate) fn normalize_required_text(value: &str, label: &'static str) -> ResultEngine<String> {
    let trimmed: String = value.trim().nfc().collect();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(label).into());
    }
    Ok(trimmed)
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.nfc().collect())
}
