use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::error::{Result, TrackerError};

pub const MAX_NAME_LENGTH: usize = 120;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// Trimmed, non-empty, at most `MAX_NAME_LENGTH` characters.
pub fn required_name(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::invalid(format!("{} is required", field)));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(TrackerError::invalid(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

/// Blank input collapses to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Absolute http(s) URL, or nothing.
pub fn optional_url(field: &str, value: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = optional_text(value) else {
        return Ok(None);
    };
    match Url::parse(&raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(Some(raw)),
        _ => Err(TrackerError::invalid(format!("{} must be a valid URL", field))),
    }
}

pub fn email(value: &str) -> Result<String> {
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    });
    let normalized = value.trim().to_lowercase();
    if !re.is_match(&normalized) {
        return Err(TrackerError::invalid("email must be a valid email address"));
    }
    Ok(normalized)
}
