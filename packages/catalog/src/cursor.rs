use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_TOKEN_CHARS: usize = 512;

/// Opaque pagination token handed to clients.
///
/// Identifies the last-seen item of a page in the creation-time ordering.
/// Clients must treat the content as opaque; only round-tripping it back
/// into the next list call is supported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position a cursor encodes: the `(created_at, id)` of the last-seen item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPos {
    /// Microseconds since the Unix epoch of the last-seen item.
    pub created_at_micros: i64,
    /// Id of the last-seen item; tiebreak for equal timestamps.
    pub id: String,
}

impl CursorPos {
    pub fn new(created_at: DateTime<Utc>, id: impl Into<String>) -> Self {
        Self {
            created_at_micros: created_at.timestamp_micros(),
            id: id.into(),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.created_at_micros)
    }
}

pub fn encode(pos: &CursorPos) -> Cursor {
    let bytes = serde_json::to_vec(pos).expect("cursor position serializes");
    Cursor(URL_SAFE_NO_PAD.encode(bytes))
}

pub fn decode(cursor: &Cursor) -> Result<CursorPos> {
    let token = cursor.as_str().trim();
    if token.is_empty() {
        anyhow::bail!("cursor must not be empty");
    }
    if token.len() > MAX_TOKEN_CHARS {
        anyhow::bail!("cursor too long");
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .context("decode cursor")?;
    serde_json::from_slice(&bytes).context("parse cursor payload")
}
