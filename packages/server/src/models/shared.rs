use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed title (1-256 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 256 {
        return Err(AppError::Validation(
            "Title must be 1-256 characters".into(),
        ));
    }
    Ok(())
}

/// Light email shape check; the mailbox is never dereferenced here.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let well_formed = email.len() >= 3
        && email.len() <= 254
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.is_empty() && !domain.starts_with('.')
        });
    if !well_formed {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    Ok(())
}

/// Optional external link: when present and non-empty it must be http(s).
pub fn validate_optional_url(url: Option<&str>, field: &str) -> Result<(), AppError> {
    if let Some(url) = url {
        let url = url.trim();
        if url.is_empty() {
            return Ok(());
        }
        if url.len() > 2048 {
            return Err(AppError::Validation(format!(
                "{field} must be at most 2048 characters"
            )));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Validation(format!(
                "{field} must be an http(s) URL"
            )));
        }
    }
    Ok(())
}
