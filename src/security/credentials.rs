//! `Authorization` header decoding

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Credentials presented by a client. Malformed input is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    Bearer(String),
    None,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(Self::parse)
            .unwrap_or(Self::None)
    }

    /// Decode an `Authorization` header value. Only the scheme before the
    /// first space is inspected.
    pub fn parse(value: &str) -> Self {
        let Some((scheme, payload)) = value.trim().split_once(' ') else {
            return Self::None;
        };
        let payload = payload.trim();

        if scheme.eq_ignore_ascii_case("basic") {
            Self::decode_basic(payload).unwrap_or(Self::None)
        } else if scheme.eq_ignore_ascii_case("bearer") && !payload.is_empty() {
            Self::Bearer(payload.to_string())
        } else {
            Self::None
        }
    }

    fn decode_basic(payload: &str) -> Option<Self> {
        let decoded = STANDARD.decode(payload).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::Basic {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Username for Basic credentials
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Basic { username, .. } => Some(username),
            _ => None,
        }
    }
}
