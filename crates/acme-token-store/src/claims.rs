//! Unverified JWT claim decoding.
//!
//! Nothing here checks a signature. Decoded claims are advisory: use them to
//! drive UI and refresh scheduling, never to grant access.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Seconds before `exp` at which a token counts as expiring soon.
pub const EXPIRY_WARNING_WINDOW_SECS: i64 = 5 * 60;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

// JWT segments are base64url without padding; some issuers pad or use the
// standard alphabet.
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const BASE64_STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Claims carried by an access token payload.
///
/// Wraps the raw payload object, so serializing a decoded value reproduces
/// it exactly. Accessors read leniently: a claim of an unexpected JSON type
/// reads as absent instead of failing the whole decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenClaims(Map<String, Value>);

impl TokenClaims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Subject: the user's email.
    pub fn sub(&self) -> Option<&str> {
        self.string_claim("sub")
    }

    /// Issued at, seconds since epoch.
    pub fn iat(&self) -> Option<f64> {
        self.get("iat").and_then(Value::as_f64)
    }

    /// Expiry, seconds since epoch. May be fractional.
    pub fn exp(&self) -> Option<f64> {
        self.get("exp").and_then(Value::as_f64)
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.string_claim("tenantId")
    }

    /// String items of the `roles` array; anything else is skipped.
    pub fn roles(&self) -> Vec<String> {
        self.string_list_claim("roles")
    }

    pub fn scopes(&self) -> Vec<String> {
        self.string_list_claim("scopes")
    }

    /// Expiry as a timestamp, if present and representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp_millis()
            .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
    }

    /// Whether `exp` is before `now`. Missing `exp` counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp_millis() {
            Some(exp) => exp < now.timestamp_millis() as f64,
            None => true,
        }
    }

    /// Whether `exp` falls within [`EXPIRY_WARNING_WINDOW_SECS`] of `now`.
    /// Missing `exp` counts as expiring.
    pub fn is_expiring_soon_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp_millis() {
            Some(exp) => {
                let threshold = now
                    .timestamp_millis()
                    .saturating_add(EXPIRY_WARNING_WINDOW_SECS * 1000);
                exp < threshold as f64
            }
            None => true,
        }
    }

    fn exp_millis(&self) -> Option<f64> {
        self.exp().filter(|exp| exp.is_finite()).map(|exp| exp * 1000.0)
    }

    fn string_claim(&self, claim: &str) -> Option<&str> {
        self.get(claim).and_then(Value::as_str)
    }

    fn string_list_claim(&self, claim: &str) -> Vec<String> {
        self.get(claim)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<Map<String, Value>> for TokenClaims {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// Decode a JWT payload without verifying it.
///
/// Returns `None` unless the token has exactly three dot-separated segments
/// whose middle segment is base64 of a JSON object.
pub fn decode_token(token: &str) -> Option<TokenClaims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        debug!(segments = segments.len(), "Token is not a three-part JWT");
        return None;
    }

    let payload = BASE64_URL
        .decode(segments[1])
        .or_else(|_| BASE64_STANDARD.decode(segments[1]))
        .map_err(|e| debug!(error = %e, "Token payload is not valid base64"))
        .ok()?;

    serde_json::from_slice::<Map<String, Value>>(&payload)
        .map(TokenClaims)
        .map_err(|e| debug!(error = %e, "Token payload is not a JSON object"))
        .ok()
}

/// True if the token cannot be decoded, has no `exp`, or `exp` is past.
pub fn is_token_expired(token: &str) -> bool {
    is_token_expired_at(token, Utc::now())
}

pub fn is_token_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    decode_token(token).map_or(true, |claims| claims.is_expired_at(now))
}

/// True if the token cannot be decoded, has no `exp`, or expires within five
/// minutes. An expired token is always expiring soon.
pub fn is_token_expiring_soon(token: &str) -> bool {
    is_token_expiring_soon_at(token, Utc::now())
}

pub fn is_token_expiring_soon_at(token: &str, now: DateTime<Utc>) -> bool {
    decode_token(token).map_or(true, |claims| claims.is_expiring_soon_at(now))
}

pub fn roles_from_token(token: &str) -> Vec<String> {
    decode_token(token)
        .map(|claims| claims.roles())
        .unwrap_or_default()
}

pub fn scopes_from_token(token: &str) -> Vec<String> {
    decode_token(token)
        .map(|claims| claims.scopes())
        .unwrap_or_default()
}

pub fn tenant_id_from_token(token: &str) -> Option<String> {
    decode_token(token).and_then(|claims| claims.tenant_id().map(str::to_string))
}

pub fn email_from_token(token: &str) -> Option<String> {
    decode_token(token).and_then(|claims| claims.sub().map(str::to_string))
}
