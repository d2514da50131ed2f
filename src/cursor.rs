//! Opaque pagination cursors.
//!
//! A cursor is the URL-safe, unpadded base64 of `"<created_at>::<id>"`,
//! naming one position in the `(created_at DESC, id DESC)` order.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::format_timestamp;
use crate::error::{Result, TrackerError};

const SEPARATOR: &str = "::";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

pub fn encode(created_at: &DateTime<Utc>, id: Uuid) -> String {
    let raw = format!("{}{}{}", format_timestamp(created_at), SEPARATOR, id);
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

pub fn decode(token: &str) -> Result<Cursor> {
    let invalid = || TrackerError::invalid("Invalid cursor");

    let bytes = URL_SAFE_NO_PAD.decode(token.trim()).map_err(|_| invalid())?;
    let raw = String::from_utf8(bytes).map_err(|_| invalid())?;
    let (iso, id) = raw.split_once(SEPARATOR).ok_or_else(invalid)?;
    if iso.is_empty() || id.is_empty() {
        return Err(invalid());
    }

    let created_at = DateTime::parse_from_rfc3339(iso)
        .map_err(|_| invalid())?
        .with_timezone(&Utc);
    // Stored timestamps stop at microseconds; anything finer has no exact position.
    if created_at.timestamp_subsec_nanos() % 1_000 != 0 {
        return Err(invalid());
    }
    let id = Uuid::parse_str(id).map_err(|_| invalid())?;

    Ok(Cursor { created_at, id })
}
