//! Credential handling for inference backends.
//!
//! Tokens are wrapped as soon as they are read and only exposed when a
//! request header is set:
//!
//! ```ignore
//! let token = ApiCredential::from_env(REPLICATE_API_TOKEN_ENV, "Replicate API token")?;
//! request.bearer_auth(token.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ProviderError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from an environment variable (including `.env`)
    Environment,
    /// Built-in placeholder for backends that accept any token
    Default,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Default => write!(f, "default"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// An API token that never shows up in `Debug` or `Display` output.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load a required credential. Unset or blank is an error.
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ProviderError> {
        Self::from_env_optional(env_var, name).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "{} not set: configure '{}' environment variable",
                name, env_var
            ))
        })
    }

    /// Load a credential that may legitimately be absent.
    pub fn from_env_optional(env_var: &str, name: &'static str) -> Option<Self> {
        std::env::var(env_var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self::new(v, CredentialSource::Environment, name))
    }

    /// Load from the environment, falling back to a fixed placeholder.
    pub fn from_env_or(env_var: &str, default: &str, name: &'static str) -> Self {
        Self::from_env_optional(env_var, name)
            .unwrap_or_else(|| Self::new(default, CredentialSource::Default, name))
    }

    /// Check availability without loading.
    pub fn is_available(env_var: &str) -> bool {
        std::env::var(env_var)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }

    /// Expose the value at the point of use. Never store the result.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}
