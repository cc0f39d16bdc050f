// HS256 tokens for signed embeds
use crate::domain::parameter::ParameterValues;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeSet;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 600;
const MAX_TOKEN_LEN: usize = 8 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token must have three dot-separated parts")]
    Malformed,
    #[error("token header is not HS256")]
    UnsupportedAlgorithm,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token payload is invalid: {0}")]
    InvalidPayload(String),
    #[error("token expired at {exp} (now {now})")]
    Expired { exp: i64, now: i64 },
    #[error("signing key rejected: {0}")]
    Key(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResource {
    /// Leading integer of the dashboard id, `None` when the id has none.
    pub dashboard: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedClaims {
    pub resource: TokenResource,
    #[serde(default)]
    pub params: ParameterValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_params: Option<ParameterValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_params: Option<BTreeSet<String>>,
    pub exp: i64,
}

impl SignedClaims {
    /// Whether the token was minted for `dashboard_id`.
    pub fn covers(&self, dashboard_id: &str) -> bool {
        self.resource.dashboard == leading_integer(dashboard_id)
    }
}

#[derive(Debug, Clone)]
pub struct TokenOptions<'a> {
    pub dashboard_id: &'a str,
    pub parameters: &'a ParameterValues,
    pub locked_parameters: Option<&'a ParameterValues>,
    pub hidden_parameters: Option<&'a BTreeSet<String>>,
    pub expires_in: Option<i64>,
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

pub fn generate_signed_token(
    options: &TokenOptions<'_>,
    secret: &[u8],
    now: i64,
) -> Result<String, TokenError> {
    let claims = SignedClaims {
        resource: TokenResource {
            dashboard: leading_integer(options.dashboard_id),
        },
        params: options.parameters.clone(),
        locked_params: options.locked_parameters.cloned(),
        hidden_params: options.hidden_parameters.cloned(),
        exp: now + options.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS),
    };
    encode_claims(&claims, secret)
}

pub fn encode_claims(claims: &SignedClaims, secret: &[u8]) -> Result<String, TokenError> {
    let header = Header {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };
    let header_part = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(&header).map_err(|e| TokenError::InvalidPayload(e.to_string()))?,
    );
    let payload_part = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(claims).map_err(|e| TokenError::InvalidPayload(e.to_string()))?,
    );
    let signing_input = format!("{header_part}.{payload_part}");
    let signature = URL_SAFE_NO_PAD.encode(sign(signing_input.as_bytes(), secret)?);
    Ok(format!("{signing_input}.{signature}"))
}

/// Check shape, signature and expiry; `now` is in unix seconds.
pub fn verify_signed_token(token: &str, secret: &[u8], now: i64) -> Result<SignedClaims, TokenError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(TokenError::Malformed);
    }
    let parts: Vec<&str> = token.split('.').collect();
    let [header_part, payload_part, signature_part] = parts.as_slice() else {
        return Err(TokenError::Malformed);
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_part)
        .map_err(|_| TokenError::Malformed)?;
    let header: Header = serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed)?;
    if header.alg != "HS256" {
        return Err(TokenError::UnsupportedAlgorithm);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_part)
        .map_err(|_| TokenError::Malformed)?;
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| TokenError::Key(e.to_string()))?;
    mac.update(format!("{header_part}.{payload_part}").as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_part)
        .map_err(|e| TokenError::InvalidPayload(e.to_string()))?;
    let claims: SignedClaims = serde_json::from_slice(&payload_bytes)
        .map_err(|e| TokenError::InvalidPayload(e.to_string()))?;
    if claims.exp <= now {
        return Err(TokenError::Expired { exp: claims.exp, now });
    }
    Ok(claims)
}

fn sign(input: &[u8], secret: &[u8]) -> Result<Vec<u8>, TokenError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| TokenError::Key(e.to_string()))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Optional sign followed by digits, after leading whitespace. "42-sales" → 42.
fn leading_integer(id: &str) -> Option<i64> {
    let trimmed = id.trim_start();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &[u8] = b"embedding-secret";

    fn params() -> ParameterValues {
        let mut params = ParameterValues::new();
        params.insert("region".to_string(), json!("Europe"));
        params
    }

    #[test]
    fn test_generate_and_verify() {
        let params = params();
        let options = TokenOptions {
            dashboard_id: "42",
            parameters: &params,
            locked_parameters: None,
            hidden_parameters: None,
            expires_in: None,
        };
        let token = generate_signed_token(&options, SECRET, 1_000).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = verify_signed_token(&token, SECRET, 1_500).unwrap();
        assert_eq!(claims.resource.dashboard, Some(42));
        assert_eq!(claims.exp, 1_600);
        assert_eq!(claims.params["region"], json!("Europe"));
        assert!(claims.locked_params.is_none());
    }

    #[test]
    fn test_optional_claims_are_omitted_from_payload() {
        let params = ParameterValues::new();
        let options = TokenOptions {
            dashboard_id: "customer-insights",
            parameters: &params,
            locked_parameters: None,
            hidden_parameters: None,
            expires_in: Some(60),
        };
        let token = generate_signed_token(&options, SECRET, 0).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let decoded: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();

        assert_eq!(decoded["resource"]["dashboard"], serde_json::Value::Null);
        assert!(decoded.get("locked_params").is_none());
        assert!(decoded.get("hidden_params").is_none());
        assert_eq!(decoded["exp"], json!(60));
    }

    #[test]
    fn test_locked_and_hidden_round_trip() {
        let params = params();
        let mut locked = ParameterValues::new();
        locked.insert("company_id".to_string(), json!("12345"));
        let hidden: BTreeSet<String> = ["company_id".to_string()].into();
        let options = TokenOptions {
            dashboard_id: "7",
            parameters: &params,
            locked_parameters: Some(&locked),
            hidden_parameters: Some(&hidden),
            expires_in: None,
        };
        let token = generate_signed_token(&options, SECRET, 0).unwrap();
        let claims = verify_signed_token(&token, SECRET, 10).unwrap();
        assert_eq!(claims.locked_params, Some(locked));
        assert_eq!(claims.hidden_params, Some(hidden));
    }

    #[test]
    fn test_rejects_tampering_wrong_key_and_expiry() {
        let params = params();
        let options = TokenOptions {
            dashboard_id: "1",
            parameters: &params,
            locked_parameters: None,
            hidden_parameters: None,
            expires_in: Some(10),
        };
        let token = generate_signed_token(&options, SECRET, 100).unwrap();

        assert_eq!(
            verify_signed_token(&token, b"other-secret", 100),
            Err(TokenError::BadSignature)
        );
        assert_eq!(
            verify_signed_token(&token, SECRET, 110),
            Err(TokenError::Expired { exp: 110, now: 110 })
        );

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = SignedClaims {
            resource: TokenResource { dashboard: Some(1) },
            params: ParameterValues::new(),
            locked_params: None,
            hidden_params: None,
            exp: 10_000,
        };
        parts[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        assert_eq!(
            verify_signed_token(&parts.join("."), SECRET, 100),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(verify_signed_token("abc", SECRET, 0), Err(TokenError::Malformed));
        assert_eq!(verify_signed_token("a.b.c.d", SECRET, 0), Err(TokenError::Malformed));
        assert_eq!(verify_signed_token("!!.??.##", SECRET, 0), Err(TokenError::Malformed));
    }

    #[test]
    fn test_claims_cover_only_their_dashboard() {
        let params = ParameterValues::new();
        let options = TokenOptions {
            dashboard_id: "42-sales",
            parameters: &params,
            locked_parameters: None,
            hidden_parameters: None,
            expires_in: None,
        };
        let token = generate_signed_token(&options, SECRET, 100).unwrap();
        let claims = verify_signed_token(&token, SECRET, 100).unwrap();
        assert!(claims.covers("42"));
        assert!(!claims.covers("7-finance"));
        assert!(!claims.covers("customer-insights"));
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("123"), Some(123));
        assert_eq!(leading_integer("  42-sales"), Some(42));
        assert_eq!(leading_integer("-5"), Some(-5));
        assert_eq!(leading_integer("sales-analytics"), None);
        assert_eq!(leading_integer(""), None);
    }
}
