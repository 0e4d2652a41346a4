//! Assembly-time configuration.
//!
//! The registry builder (external to this crate's core concern) produces a
//! frozen [`StatementRegistry`] plus global settings; [`Configuration`]
//! bundles those with the interceptor chain, the shared cache pool, and the
//! result materializer, and is handed by reference to every session.

use crate::error::SqlBindResult;
use crate::executor::interceptor::{Interceptor, InterceptorProperties};
use crate::executor::local_cache::LocalCacheScope;
use crate::executor::{DirectMaterializer, RowMaterializer, SharedCachePool};
use crate::registry::StatementRegistry;
use std::sync::Arc;

/// Global runtime settings, supplied alongside the registry.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Master switch for the shared result cache decorator.
    pub cache_enabled: bool,
    /// Default scope of every session's local result cache.
    pub local_cache_scope: LocalCacheScope,
    /// Auto-commit for sessions opened without an explicit choice.
    pub default_auto_commit: bool,
    /// Shared-cache entries retained per statement namespace.
    pub shared_cache_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            local_cache_scope: LocalCacheScope::Session,
            default_auto_commit: false,
            shared_cache_capacity: 1024,
        }
    }
}

/// Everything shared by the sessions of one runtime instance. Constructed
/// once during an explicit initialization phase; no mutable global state.
pub struct Configuration {
    registry: Arc<StatementRegistry>,
    settings: Settings,
    interceptors: Vec<Arc<dyn Interceptor>>,
    shared_cache: Arc<SharedCachePool>,
    materializer: Arc<dyn RowMaterializer>,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("settings", &self.settings)
            .field("interceptors", &self.interceptors.len())
            .field("shared_cache", &self.shared_cache)
            .finish_non_exhaustive()
    }
}

impl Configuration {
    pub fn new(registry: StatementRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            settings: Settings::default(),
            interceptors: Vec::new(),
            shared_cache: Arc::new(SharedCachePool::with_default_capacity()),
            materializer: Arc::new(DirectMaterializer),
        }
    }

    /// Fails with a configuration error on malformed settings, e.g. a zero
    /// shared-cache capacity.
    pub fn with_settings(registry: StatementRegistry, settings: Settings) -> SqlBindResult<Self> {
        let shared_cache = Arc::new(SharedCachePool::new(settings.shared_cache_capacity)?);
        Ok(Self {
            registry: Arc::new(registry),
            settings,
            interceptors: Vec::new(),
            shared_cache,
            materializer: Arc::new(DirectMaterializer),
        })
    }

    /// Register a cross-cutting interceptor with its assembly-time
    /// properties. Registration order is invocation order.
    pub fn add_interceptor(
        &mut self,
        mut interceptor: Box<dyn Interceptor>,
        properties: InterceptorProperties,
    ) {
        interceptor.configure(&properties);
        self.interceptors.push(Arc::from(interceptor));
    }

    /// Replace the row→typed-object materializer.
    pub fn set_materializer(&mut self, materializer: Arc<dyn RowMaterializer>) {
        self.materializer = materializer;
    }

    pub fn registry(&self) -> &StatementRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    pub fn shared_cache(&self) -> &Arc<SharedCachePool> {
        &self.shared_cache
    }

    pub fn materializer(&self) -> &Arc<dyn RowMaterializer> {
        &self.materializer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;

    #[test]
    fn zero_cache_capacity_rejected_at_assembly() {
        use crate::error::SqlBindError;

        let settings = Settings {
            shared_cache_capacity: 0,
            ..Settings::default()
        };
        let err = Configuration::with_settings(RegistryBuilder::new().build(), settings)
            .unwrap_err();
        assert!(matches!(err, SqlBindError::Configuration(_)));
    }

    #[test]
    fn default_settings() {
        let settings = Settings::default();
        assert!(settings.cache_enabled);
        assert_eq!(settings.local_cache_scope, LocalCacheScope::Session);
        assert!(!settings.default_auto_commit);
    }

    #[test]
    fn interceptor_receives_properties_at_assembly() {
        use crate::executor::interceptor::Interceptor;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc as StdArc;

        struct Probe {
            configured: StdArc<AtomicBool>,
        }

        impl Interceptor for Probe {
            fn configure(&mut self, properties: &InterceptorProperties) {
                assert_eq!(properties.get("mode").map(String::as_str), Some("audit"));
                self.configured.store(true, Ordering::SeqCst);
            }
        }

        let configured = StdArc::new(AtomicBool::new(false));
        let mut config = Configuration::new(RegistryBuilder::new().build());
        let mut props = InterceptorProperties::new();
        props.insert("mode".to_string(), "audit".to_string());
        config.add_interceptor(
            Box::new(Probe {
                configured: configured.clone(),
            }),
            props,
        );
        assert!(configured.load(Ordering::SeqCst));
        assert_eq!(config.interceptors().len(), 1);
    }
}
