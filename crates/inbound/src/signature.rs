use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use http::HeaderMap;
use ring::hmac;
use tracing::{error, warn};

/// Signature headers in priority order; the first one present is used.
pub const SIGNATURE_HEADERS: [&str; 2] = ["svix-signature", "webhook-signature"];

/// Prefixes relays put in front of the digest.
const DIGEST_PREFIXES: [&str; 3] = ["sha256=", "v1,", "v1="];

/// Deployment mode. Only `Development` may accept unsigned webhooks, and only
/// when no secret is configured at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployMode {
    Development,
    #[default]
    Production,
}

impl DeployMode {
    /// `development` (any case) selects development; everything else is production.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            DeployMode::Development
        } else {
            DeployMode::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == DeployMode::Development
    }
}

/// Returns the value of the first known signature header present.
pub fn signature_header(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
}

#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    secret: Option<String>,
    mode: DeployMode,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>, mode: DeployMode) -> Self {
        let secret = secret.filter(|s| !s.is_empty());
        Self { secret, mode }
    }

    pub fn mode(&self) -> DeployMode {
        self.mode
    }

    /// Decides whether a webhook body may be processed.
    ///
    /// Without a secret the check passes in development and fails closed in
    /// production. With a secret, a missing or wrong signature fails.
    pub fn check(&self, raw_body: &[u8], signature: Option<&str>) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            if self.mode.is_development() {
                warn!("No webhook secret configured, accepting unsigned request in development mode");
                return true;
            }
            error!("No webhook secret configured, rejecting request");
            return false;
        };

        match signature {
            Some(signature) => verify_signature(raw_body, signature, secret),
            None => false,
        }
    }
}

/// Verifies an HMAC-SHA256 signature over the raw request body.
///
/// The header may carry several space separated digests; any one matching is
/// enough. Each digest may be hex (optionally `sha256=` prefixed) or base64
/// (optionally `v1,` prefixed). Tag comparison is constant time.
pub fn verify_signature(raw_body: &[u8], signature_header: &str, secret: &str) -> bool {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    signature_header
        .split_whitespace()
        .filter_map(decode_digest)
        .any(|tag| hmac::verify(&key, raw_body, &tag).is_ok())
}

fn decode_digest(token: &str) -> Option<Vec<u8>> {
    let digest = DIGEST_PREFIXES
        .iter()
        .find_map(|prefix| token.strip_prefix(prefix))
        .unwrap_or(token);

    if digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex::decode(digest).ok();
    }
    BASE64_STANDARD.decode(digest).ok()
}

/// Hex HMAC-SHA256 of `raw_body`, as sent by hex-signing relays.
pub fn sign_hex(raw_body: &[u8], secret: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hex::encode(hmac::sign(&key, raw_body).as_ref())
}

/// Base64 HMAC-SHA256 of `raw_body`, as sent by base64-signing relays.
pub fn sign_base64(raw_body: &[u8], secret: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    BASE64_STANDARD.encode(hmac::sign(&key, raw_body).as_ref())
}
