//! Backend selection.
//!
//! The backend is chosen once at startup from a [`ProviderConfig`] and handed
//! to the judge as `Arc<dyn LlmProvider>`. Nothing downstream branches on the
//! provider kind again.
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create(&config)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{LlmProvider, ProviderError};
use crate::config::{ProviderConfig, ProviderKind};

/// Builds one kind of backend from configuration.
pub trait ProviderFactory: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Check configuration and credentials without building anything.
    fn validate_config(&self, config: &ProviderConfig) -> Result<(), ProviderError>;

    fn description(&self) -> &'static str {
        "LLM Provider"
    }
}

/// Registry of backend factories keyed by kind.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<ProviderKind, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any existing one of the same kind.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories.insert(factory.kind(), factory);
    }

    /// Validate `config` and build the backend it names.
    pub fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self.factory(config.provider)?;
        factory.validate_config(config)?;
        let provider = factory.create(config)?;

        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            endpoint = config.endpoint.as_deref().unwrap_or("default"),
            "Provider selected"
        );
        Ok(provider)
    }

    pub fn validate(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        self.factory(config.provider)?.validate_config(config)
    }

    pub fn available_kinds(&self) -> Vec<ProviderKind> {
        self.factories.keys().copied().collect()
    }

    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        self.factories.contains_key(&kind)
    }

    fn factory(&self, kind: ProviderKind) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories.get(&kind).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                kind,
                self.available_kinds()
            ))
        })
    }

    /// Registry with the three built-in backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::ReplicateProviderFactory));
        registry.register(Arc::new(super::TgiProviderFactory));
        registry.register(Arc::new(super::WebuiProviderFactory));
        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_kinds())
            .finish()
    }
}

/// Shared checks: endpoint shape, model, sampling.
pub(crate) fn validate_common(config: &ProviderConfig) -> Result<(), ProviderError> {
    config
        .validate()
        .map_err(|e| ProviderError::NotConfigured(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct MockProvider {
        name: String,
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok("mock response".to_string())
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    struct MockProviderFactory;

    impl ProviderFactory for MockProviderFactory {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Tgi
        }

        fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            Ok(Arc::new(MockProvider {
                name: format!("mock-{}", config.model),
            }))
        }

        fn validate_config(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
            validate_common(config)
        }

        fn description(&self) -> &'static str {
            "Mock provider for testing"
        }
    }

    fn tgi_config() -> ProviderConfig {
        ProviderConfig::new(ProviderKind::Tgi, "llama").with_endpoint("http://localhost:8080")
    }

    #[tokio::test]
    async fn test_registry_register_and_create() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProviderFactory));

        assert!(registry.has_provider(ProviderKind::Tgi));
        assert!(!registry.has_provider(ProviderKind::Webui));

        let provider = registry.create(&tgi_config()).unwrap();
        assert_eq!(provider.name(), "mock-llama");
        assert_eq!(provider.generate("hi").await.unwrap(), "mock response");
    }

    #[test]
    fn test_registry_unknown_provider() {
        let registry = ProviderRegistry::new();
        match registry.create(&tgi_config()) {
            Err(ProviderError::NotConfigured(msg)) => {
                assert!(msg.contains("Unknown provider type"));
            }
            _ => panic!("Expected NotConfigured error"),
        }
    }

    #[test]
    fn test_registry_validates_before_create() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProviderFactory));

        let missing_endpoint = ProviderConfig::new(ProviderKind::Tgi, "llama");
        assert!(matches!(
            registry.create(&missing_endpoint),
            Err(ProviderError::NotConfigured(_))
        ));
        assert!(registry.validate(&tgi_config()).is_ok());
    }

    #[test]
    fn test_with_defaults_has_all_kinds() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(registry.available_kinds(), ProviderKind::ALL.to_vec());
        assert!(format!("{:?}", registry).contains("Replicate"));
    }
}
