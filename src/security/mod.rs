pub mod credentials;

pub use credentials::{
    CredentialStore, EnvCredentialStore, PlatformSecrets, SecretMasker, mask_secret,
    required_secrets,
};
