//! Provider and run configuration.
//!
//! A [`ProviderConfig`] is built once at startup and then only read. Run
//! settings that are not part of the CLI surface (sampling, timeouts,
//! failure policy) can come from a YAML file:
//!
//! ```yaml
//! sampling:
//!   temperature: 0.2
//!   top_p: 0.9
//!   max_new_tokens: 500
//! timeout: 90s
//! passage_timeout: 5m
//! on_backend_error: record-unknown
//! archive_fallback: true
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Temperature used when none (or zero) is configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Unknown provider '{0}': expected one of replicate, tgi, webui")]
    UnknownProvider(String),

    #[error("Unknown failure policy '{0}': expected abort or record-unknown")]
    UnknownPolicy(String),

    #[error("Provider '{0}' requires an endpoint URL (--openai-api-url)")]
    MissingEndpoint(ProviderKind),

    #[error("Endpoint must start with http:// or https://, got '{0}'")]
    InvalidEndpoint(String),

    #[error("Model identifier must not be empty")]
    EmptyModel,

    #[error("Invalid sampling parameter: {0}")]
    InvalidSampling(String),
}

/// Inference backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Hosted models on replicate.com (streaming predictions)
    Replicate,

    /// Hugging Face text-generation-inference (token streaming)
    Tgi,

    /// text-generation-webui through its OpenAI-compatible API
    Webui,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Replicate, ProviderKind::Tgi, ProviderKind::Webui];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Replicate => "replicate",
            ProviderKind::Tgi => "tgi",
            ProviderKind::Webui => "webui",
        }
    }

    /// Self-hosted backends have no default endpoint.
    pub fn requires_endpoint(self) -> bool {
        matches!(self, ProviderKind::Tgi | ProviderKind::Webui)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownProvider(s.to_string()))
    }
}

/// Sampling parameters shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// Unset or zero falls back to [`DEFAULT_TEMPERATURE`]
    pub temperature: Option<f32>,

    pub top_p: f32,

    pub max_new_tokens: u32,

    /// -1 lets the backend decide
    pub min_new_tokens: i32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: None,
            top_p: 0.9,
            max_new_tokens: 500,
            min_new_tokens: -1,
        }
    }
}

impl SamplingParams {
    /// The temperature actually sent to a backend.
    pub fn effective_temperature(&self) -> f32 {
        match self.temperature {
            Some(t) if t != 0.0 => t,
            _ => DEFAULT_TEMPERATURE,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.temperature {
            if !(0.0..=5.0).contains(&t) {
                return Err(ConfigError::InvalidSampling(format!(
                    "temperature {} outside [0, 5]",
                    t
                )));
            }
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ConfigError::InvalidSampling(format!(
                "top_p {} outside (0, 1]",
                self.top_p
            )));
        }
        if self.max_new_tokens == 0 {
            return Err(ConfigError::InvalidSampling(
                "max_new_tokens must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything needed to construct one inference backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderKind,

    /// Model identifier passed to the backend and recorded in reports
    pub model: String,

    /// Backend URL. Required for TGI and WEBUI, overrides the API base for Replicate.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub sampling: SamplingParams,

    /// Per-request timeout; `None` waits indefinitely
    #[serde(default, with = "humantime_opt")]
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            endpoint: None,
            sampling: SamplingParams::default(),
            timeout: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.sampling.temperature = Some(temperature);
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Endpoint without a trailing slash.
    pub fn endpoint_base(&self) -> Option<&str> {
        self.endpoint.as_deref().map(|e| e.trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        match self.endpoint.as_deref() {
            None if self.provider.requires_endpoint() => {
                return Err(ConfigError::MissingEndpoint(self.provider));
            }
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                return Err(ConfigError::InvalidEndpoint(url.to_string()));
            }
            _ => {}
        }

        self.sampling.validate()
    }
}

/// What to do when a backend call fails mid-statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole batch. Reports already emitted stay valid.
    #[default]
    Abort,

    /// Record the passage with an unknown decision and keep going.
    RecordUnknown,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::RecordUnknown => write!(f, "record-unknown"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "record-unknown" | "record_unknown" | "skip" => Ok(FailurePolicy::RecordUnknown),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Settings for a run that sit outside the provider identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub sampling: SamplingParams,

    /// Per-request HTTP timeout
    #[serde(with = "humantime_opt")]
    pub timeout: Option<Duration>,

    /// Bound on both calls for one passage together
    #[serde(with = "humantime_opt")]
    pub passage_timeout: Option<Duration>,

    pub on_backend_error: FailurePolicy,

    /// Retry against the web archive when the live page has no paragraphs
    pub archive_fallback: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingParams::default(),
            timeout: None,
            passage_timeout: None,
            on_backend_error: FailurePolicy::Abort,
            archive_fallback: true,
        }
    }
}

impl RunConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_yaml::from_str(yaml)?;
        config.sampling.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Combine with the provider identity given on the command line.
    pub fn provider_config(
        &self,
        provider: ProviderKind,
        model: impl Into<String>,
        endpoint: Option<String>,
    ) -> ProviderConfig {
        ProviderConfig {
            provider,
            model: model.into(),
            endpoint,
            sampling: self.sampling.clone(),
            timeout: self.timeout,
        }
    }
}

/// `Option<Duration>` written as `"90s"`, `"2m 30s"`.
mod humantime_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|r| humantime::parse_duration(&r).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("replicate".parse::<ProviderKind>().unwrap(), ProviderKind::Replicate);
        assert_eq!("TGI".parse::<ProviderKind>().unwrap(), ProviderKind::Tgi);
        assert_eq!("webui".parse::<ProviderKind>().unwrap(), ProviderKind::Webui);
        assert!(matches!(
            "openai".parse::<ProviderKind>(),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_temperature_default_policy() {
        let mut sampling = SamplingParams::default();
        assert_eq!(sampling.effective_temperature(), 0.1);

        sampling.temperature = Some(0.0);
        assert_eq!(sampling.effective_temperature(), 0.1);

        sampling.temperature = Some(0.7);
        assert_eq!(sampling.effective_temperature(), 0.7);
    }

    #[test]
    fn test_sampling_defaults() {
        let sampling = SamplingParams::default();
        assert_eq!(sampling.top_p, 0.9);
        assert_eq!(sampling.max_new_tokens, 500);
        assert_eq!(sampling.min_new_tokens, -1);
    }

    #[test]
    fn test_endpoint_required_for_self_hosted() {
        let config = ProviderConfig::new(ProviderKind::Tgi, "llama");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEndpoint(ProviderKind::Tgi))
        ));

        let config = config.with_endpoint("http://localhost:8080/");
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint_base(), Some("http://localhost:8080"));

        assert!(ProviderConfig::new(ProviderKind::Replicate, "meta/llama-2-70b-chat")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_invalid_endpoint_and_model() {
        let config = ProviderConfig::new(ProviderKind::Webui, "m").with_endpoint("localhost:5000");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidEndpoint(_))));

        let config = ProviderConfig::new(ProviderKind::Replicate, "  ");
        assert!(matches!(config.validate(), Err(ConfigError::EmptyModel)));
    }

    #[test]
    fn test_invalid_sampling() {
        let config = ProviderConfig::new(ProviderKind::Replicate, "m").with_temperature(-1.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSampling(_))));
    }

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!("abort".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert_eq!(
            "record-unknown".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::RecordUnknown
        );
        assert!("retry".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }

    #[test]
    fn test_run_config_from_yaml() {
        let yaml = r#"
sampling:
  temperature: 0.2
  max_new_tokens: 256
timeout: 90s
passage_timeout: 5m
on_backend_error: record-unknown
archive_fallback: false
"#;
        let config = RunConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.sampling.temperature, Some(0.2));
        assert_eq!(config.sampling.max_new_tokens, 256);
        assert_eq!(config.sampling.top_p, 0.9);
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.passage_timeout, Some(Duration::from_secs(300)));
        assert_eq!(config.on_backend_error, FailurePolicy::RecordUnknown);
        assert!(!config.archive_fallback);
    }

    #[test]
    fn test_run_config_defaults_from_empty_yaml() {
        let config = RunConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert!(config.archive_fallback);
    }

    #[test]
    fn test_run_config_rejects_bad_duration() {
        assert!(matches!(
            RunConfig::from_yaml("timeout: soon"),
            Err(ConfigError::YamlError(_))
        ));
    }

    #[test]
    fn test_provider_config_from_run_config() {
        let run = RunConfig {
            timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let config = run.provider_config(
            ProviderKind::Webui,
            "mistral",
            Some("https://llm.example.org/v1".to_string()),
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.model, "mistral");
        assert!(config.validate().is_ok());
    }
}
