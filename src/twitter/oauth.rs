//! OAuth 1.0a request signing (HMAC-SHA1), as required by the v1.1 API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

use crate::config::Credentials;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 percent-encoding; only unreserved characters pass through.
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Per-request values that must differ between calls.
#[derive(Debug, Clone)]
pub struct Nonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl Nonce {
    #[must_use]
    pub fn generate() -> Self {
        let nonce = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        Self {
            nonce,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Build the `Authorization` header for a request.
///
/// `base_url` must not carry a query string; query and form parameters go in
/// `params` so they are included in the signature.
///
/// # Errors
///
/// Returns [`InvalidLength`] if the signing key is rejected by HMAC.
pub fn authorization_header(
    credentials: &Credentials,
    method: &str,
    base_url: &str,
    params: &[(&str, String)],
    nonce: &Nonce,
) -> Result<String, InvalidLength> {
    let timestamp = nonce.timestamp.to_string();
    let oauth_params = [
        ("oauth_consumer_key", credentials.api_key.as_str()),
        ("oauth_nonce", nonce.nonce.as_str()),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let mut all: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .chain(params.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    all.sort();

    let base = signature_base_string(method, base_url, &all);
    let signature = sign(
        &base,
        &credentials.api_secret_key,
        &credentials.access_token_secret,
    )?;

    let mut header_params: Vec<(&str, String)> = oauth_params
        .iter()
        .map(|(k, v)| (*k, (*v).to_string()))
        .collect();
    header_params.push(("oauth_signature", signature));
    header_params.sort_by(|a, b| a.0.cmp(b.0));

    let rendered: Vec<String> = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect();
    Ok(format!("OAuth {}", rendered.join(", ")))
}

/// `METHOD&encoded(url)&encoded(k1=v1&k2=v2...)` over already-encoded, sorted pairs.
fn signature_base_string(method: &str, base_url: &str, sorted: &[(String, String)]) -> String {
    let param_string = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(base_url),
        encode(&param_string)
    )
}

fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> Result<String, InvalidLength> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
