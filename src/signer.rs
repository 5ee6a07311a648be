use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub const API_VERSION: &str = "1.0";
pub const API_VERSION_HEADER: &str = "x-adcirclive-api-version";
pub const NONCE_HEADER: &str = "x-auth-nonce";

/// Nonce ticks per second (one tick is 10 µs).
pub const NONCE_TICKS_PER_SEC: u128 = 100_000;

/// API key/secret pair issued by ADCIRC Live.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Time-derived request nonce: unix time scaled by [`NONCE_TICKS_PER_SEC`].
///
/// Two nonces sampled within the same 10 µs tick are equal; nothing here
/// forces them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nonce(pub u64);

impl Nonce {
    pub fn now() -> Self {
        Self::from_time(SystemTime::now())
    }

    pub fn from_time(time: SystemTime) -> Self {
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        let ticks = since_epoch.as_micros() * NONCE_TICKS_PER_SEC / 1_000_000;
        Self(u64::try_from(ticks).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Authentication material for exactly one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub nonce: Nonce,
    /// Lowercase hex SHA-256 of `nonce || secret`.
    pub signature: String,
    /// `base64(key:signature)`, sent as the `Authorization` header.
    pub authorization: String,
}

impl SignedRequest {
    /// Header set attached to every API call.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        headers.insert(NONCE_HEADER, HeaderValue::from(self.nonce.0));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&self.authorization)
                .context("authorization value is not a valid header")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[derive(Debug, Clone)]
pub struct Signer {
    credentials: Credentials,
}

impl Signer {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn api_key(&self) -> &str {
        &self.credentials.api_key
    }

    /// Samples the clock and signs. Call once per outgoing request.
    pub fn sign_now(&self) -> SignedRequest {
        self.sign(Nonce::now())
    }

    /// Pure signing step: same credentials and nonce give the same output.
    pub fn sign(&self, nonce: Nonce) -> SignedRequest {
        let signature = hash_nonce(nonce, &self.credentials.api_secret);
        let authorization =
            BASE64.encode(format!("{}:{}", self.credentials.api_key, signature));
        SignedRequest {
            nonce,
            signature,
            authorization,
        }
    }
}

pub(crate) fn hash_nonce(nonce: Nonce, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce.to_string().as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn signer() -> Signer {
        Signer::new(Credentials::new("alice-key", "s3cret"))
    }

    #[test]
    fn test_nonce_scales_time() {
        let t = UNIX_EPOCH + Duration::from_micros(1_700_000_000_123_456);
        assert_eq!(Nonce::from_time(t), Nonce(170_000_000_012_345));
    }

    #[test]
    fn test_nonce_increases_with_time() {
        let t1 = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        for step in [10u64, 11, 1_000, 1_000_000] {
            let t2 = t1 + Duration::from_micros(step);
            assert!(Nonce::from_time(t2) > Nonce::from_time(t1), "step {step}µs");
        }
    }

    #[test]
    fn test_nonce_before_epoch_is_zero() {
        let t = UNIX_EPOCH - Duration::from_secs(5);
        assert_eq!(Nonce::from_time(t), Nonce(0));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let nonce = Nonce(170_000_000_012_345);
        assert_eq!(signer().sign(nonce), signer().sign(nonce));
        assert_ne!(signer().sign(nonce), signer().sign(Nonce(nonce.0 + 1)));
    }

    #[test]
    fn test_signature_matches_known_digest() {
        // sha256("0s3cret")
        let signed = signer().sign(Nonce(0));
        let mut hasher = Sha256::new();
        hasher.update(b"0s3cret");
        assert_eq!(signed.signature, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_authorization_decodes_to_key_and_hex_hash() {
        let signed = signer().sign(Nonce(170_000_000_012_345));
        let decoded = String::from_utf8(BASE64.decode(&signed.authorization).unwrap()).unwrap();

        let (key, hash) = decoded.split_once(':').unwrap();
        assert_eq!(key, "alice-key");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, hash_nonce(signed.nonce, "s3cret"));
    }

    #[test]
    fn test_headers_carry_signed_values() {
        let signed = signer().sign(Nonce(42));
        let headers = signed.headers().unwrap();

        assert_eq!(headers.len(), 4);
        assert_eq!(headers[API_VERSION_HEADER], "1.0");
        assert_eq!(headers[NONCE_HEADER], "42");
        assert_eq!(headers[AUTHORIZATION], signed.authorization.as_str());
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", Credentials::new("k", "topsecret"));
        assert!(!rendered.contains("topsecret"));
        assert!(rendered.contains("<redacted>"));
    }
}
