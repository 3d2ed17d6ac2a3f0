//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Only the parts the X media and tweet endpoints need: header-based
//! authorization with form or query parameters included in the signature.
//! Multipart and JSON bodies are not part of the signature base string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Url;
use sha1::Sha1;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as is
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OAuth1Error {
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("invalid signing key")]
    InvalidKey,
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, RFC3986).to_string()
}

/// Consumer and token credentials of one account
pub struct OAuth1Signer<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: &'a str,
    pub token_secret: &'a str,
}

impl OAuth1Signer<'_> {
    /// `Authorization` header value for a request
    ///
    /// `params` are the form-encoded body parameters; query parameters are
    /// read from `url`.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, OAuth1Error> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = Utc::now().timestamp().to_string();
        self.authorization_header_with(method, url, params, &nonce, &timestamp)
    }

    fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, OAuth1Error> {
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.consumer_key.to_string()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", "HMAC-SHA1".to_string()),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_token", self.token.to_string()),
            ("oauth_version", "1.0".to_string()),
        ];

        let signature = self.signature(method, url, params, &oauth_params)?;
        oauth_params.push(("oauth_signature", signature));
        oauth_params.sort_by(|a, b| a.0.cmp(b.0));

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
            .collect();

        Ok(format!("OAuth {}", fields.join(", ")))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        oauth_params: &[(&str, String)],
    ) -> Result<String, OAuth1Error> {
        let parsed = Url::parse(url).map_err(|e| OAuth1Error::InvalidUrl(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| OAuth1Error::InvalidUrl(url.to_string()))?;
        let base_url = match parsed.port() {
            Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host, port, parsed.path()),
            None => format!("{}://{}{}", parsed.scheme(), host, parsed.path()),
        };

        let mut encoded: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(key, value)| (encode(&key), encode(&value)))
            .chain(params.iter().map(|(key, value)| (encode(key), encode(value))))
            .chain(
                oauth_params
                    .iter()
                    .map(|(key, value)| (encode(key), encode(value))),
            )
            .collect();
        encoded.sort();

        let parameter_string = encoded
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            encode(&base_url),
            encode(&parameter_string)
        );
        let signing_key = format!("{}&{}", encode(self.consumer_secret), encode(self.token_secret));

        let mut mac =
            HmacSha1::new_from_slice(signing_key.as_bytes()).map_err(|_| OAuth1Error::InvalidKey)?;
        mac.update(base_string.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference request from the X developer documentation
    fn signer() -> OAuth1Signer<'static> {
        OAuth1Signer {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog",
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        }
    }

    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: &str = "1318622958";
    const STATUS: &str = "Hello Ladies + Gentlemen, a signed OAuth request!";

    #[test]
    fn test_encode_reserved_characters() {
        assert_eq!(encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(encode("!"), "%21");
    }

    #[test]
    fn test_reference_signature() {
        let header = signer()
            .authorization_header_with(
                "POST",
                "https://api.twitter.com/1.1/statuses/update.json?include_entities=true",
                &[("status", STATUS)],
                NONCE,
                TIMESTAMP,
            )
            .unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
    }

    #[test]
    fn test_parameter_location_does_not_change_signature() {
        let in_query = signer()
            .authorization_header_with(
                "POST",
                "https://api.twitter.com/1.1/statuses/update.json?include_entities=true",
                &[("status", STATUS)],
                NONCE,
                TIMESTAMP,
            )
            .unwrap();
        let in_body = signer()
            .authorization_header_with(
                "POST",
                "https://api.twitter.com/1.1/statuses/update.json",
                &[("include_entities", "true"), ("status", STATUS)],
                NONCE,
                TIMESTAMP,
            )
            .unwrap();

        assert_eq!(in_query, in_body);
    }

    #[test]
    fn test_fresh_nonce_per_request() {
        let first = signer()
            .authorization_header("GET", "https://api.twitter.com/2/users/me", &[])
            .unwrap();
        let second = signer()
            .authorization_header("GET", "https://api.twitter.com/2/users/me", &[])
            .unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_url() {
        let result = signer().authorization_header("GET", "not a url", &[]);
        assert!(matches!(result, Err(OAuth1Error::InvalidUrl(_))));
    }
}
