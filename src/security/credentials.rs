//! Platform credential lookup with memory-safe handling and masking
//!
//! Secrets are held as `secrecy::SecretString` from the moment they are read so
//! they cannot leak through `Debug` output or log fields.

use crate::core::error::CredentialsError;
use crate::core::traits::Platform;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::Arc;

/// Secrets each platform needs, in the order they are checked
const PLATFORM_SECRETS: &[(Platform, &[&str])] = &[
    (
        Platform::Instagram,
        &["INSTAGRAM_ACCESS_TOKEN", "INSTAGRAM_BUSINESS_ACCOUNT_ID"],
    ),
    (
        Platform::TikTok,
        &[
            "TIKTOK_CLIENT_KEY",
            "TIKTOK_CLIENT_SECRET",
            "TIKTOK_ACCESS_TOKEN",
        ],
    ),
    (
        Platform::X,
        &[
            "X_API_KEY",
            "X_API_SECRET",
            "X_ACCESS_TOKEN",
            "X_ACCESS_TOKEN_SECRET",
        ],
    ),
    (
        Platform::Facebook,
        &["FACEBOOK_ACCESS_TOKEN", "FACEBOOK_PAGE_ID"],
    ),
];

/// Names of the secrets a platform requires
pub fn required_secrets(platform: Platform) -> &'static [&'static str] {
    PLATFORM_SECRETS
        .iter()
        .find(|(p, _)| *p == platform)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

/// Source of platform secrets
///
/// An absent secret (`None`) is distinct from an empty one.
pub trait CredentialStore: Send + Sync {
    fn secret(&self, name: &str) -> Option<SecretString>;
}

/// Credential store backed by a snapshot of environment variables
#[derive(Default)]
pub struct EnvCredentialStore {
    values: HashMap<String, SecretString>,
}

impl EnvCredentialStore {
    /// Snapshot the platform secrets of the current process environment
    pub fn from_env() -> Self {
        let vars = PLATFORM_SECRETS
            .iter()
            .flat_map(|(_, names)| names.iter())
            .filter_map(|name| env::var(name).ok().map(|value| (name.to_string(), value)))
            .collect();

        Self::from_vars(vars)
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        let values = vars
            .into_iter()
            .map(|(name, value)| (name, SecretString::new(value.into())))
            .collect();

        Self { values }
    }

    /// Required secrets that are absent or blank
    pub fn missing_for(&self, platform: Platform) -> Vec<&'static str> {
        required_secrets(platform)
            .iter()
            .copied()
            .filter(|name| {
                self.values
                    .get(*name)
                    .is_none_or(|value| value.expose_secret().trim().is_empty())
            })
            .collect()
    }
}

impl CredentialStore for EnvCredentialStore {
    fn secret(&self, name: &str) -> Option<SecretString> {
        self.values
            .get(name)
            .map(|value| SecretString::new(value.expose_secret().into()))
    }
}

/// Masks a secret for safe logging
///
/// Shows only the first 3 and last 3 characters. Secrets shorter than 10
/// characters are fully masked as "****".
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }

    let prefix: String = chars[..3].iter().collect();
    let suffix: String = chars[chars.len() - 3..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// Replaces known secret values in free text with their masked form
///
/// Every message a publisher builds from vendor output passes through one of
/// these before it reaches a log line or an audit record.
#[derive(Clone, Default)]
pub struct SecretMasker {
    secrets: Arc<[SecretString]>,
}

impl SecretMasker {
    pub fn new<'a>(values: impl IntoIterator<Item = &'a SecretString>) -> Self {
        let secrets: Vec<SecretString> = values
            .into_iter()
            .map(|value| value.expose_secret().trim())
            .filter(|value| !value.is_empty())
            .map(|value| SecretString::new(value.into()))
            .collect();

        Self {
            secrets: secrets.into(),
        }
    }

    pub fn mask(&self, text: &str) -> String {
        self.secrets.iter().fold(text.to_string(), |masked, secret| {
            let value = secret.expose_secret();
            if masked.contains(value) {
                masked.replace(value, &mask_secret(value))
            } else {
                masked
            }
        })
    }
}

impl fmt::Debug for SecretMasker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMasker")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

/// The secrets of one platform, captured when its publisher is built
pub struct PlatformSecrets {
    platform: Platform,
    values: HashMap<&'static str, SecretString>,
}

impl PlatformSecrets {
    pub fn from_store(platform: Platform, store: &dyn CredentialStore) -> Self {
        let values = required_secrets(platform)
            .iter()
            .filter_map(|name| store.secret(name).map(|value| (*name, value)))
            .collect();

        Self { platform, values }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Borrow a secret, `Missing` when absent or blank
    pub fn require(&self, name: &'static str) -> Result<&str, CredentialsError> {
        match self.values.get(name) {
            Some(value) if !value.expose_secret().trim().is_empty() => Ok(value.expose_secret()),
            _ => Err(CredentialsError::Missing {
                platform: self.platform,
                field: name,
            }),
        }
    }

    /// Masker covering every secret captured for this platform
    pub fn masker(&self) -> SecretMasker {
        SecretMasker::new(self.values.values())
    }

    /// Check every required secret, reporting the first one missing
    pub fn ensure_complete(&self) -> Result<(), CredentialsError> {
        for name in required_secrets(self.platform) {
            self.require(name)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PlatformSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort();
        f.debug_struct("PlatformSecrets")
            .field("platform", &self.platform)
            .field("present", &names)
            .finish()
    }
}
