//! Session factory and executor-chain assembly.
//!
//! The chain is built once per session at open time, never per call:
//! interceptors (registration order, outermost first) wrap the caching
//! decorator, which wraps the primitive holding the freshly connected
//! backend.

use super::Session;
use crate::config::Configuration;
use crate::error::SqlBindResult;
use crate::executor::interceptor::InterceptedExecutor;
use crate::executor::{BackendProvider, CachingExecutor, Executor, SimpleExecutor};
use std::sync::Arc;
use tracing::debug;

pub struct SessionFactory {
    config: Arc<Configuration>,
    provider: Arc<dyn BackendProvider>,
}

impl SessionFactory {
    pub fn new(config: Configuration, provider: Arc<dyn BackendProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
        }
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// Open a session with the configured default auto-commit.
    pub fn open_session(&self) -> SqlBindResult<Session> {
        self.open_session_with(self.config.settings().default_auto_commit)
    }

    pub fn open_session_with(&self, auto_commit: bool) -> SqlBindResult<Session> {
        let backend = self.provider.connect()?;
        let settings = self.config.settings();

        let mut executor: Box<dyn Executor> = Box::new(SimpleExecutor::new(
            backend,
            self.config.materializer().clone(),
            settings.local_cache_scope,
        ));
        if settings.cache_enabled {
            executor = Box::new(CachingExecutor::new(
                executor,
                self.config.shared_cache().clone(),
            ));
        }
        // Reverse order so the first-registered interceptor ends up
        // outermost and sees calls first.
        for interceptor in self.config.interceptors().iter().rev() {
            executor = Box::new(InterceptedExecutor::new(interceptor.clone(), executor));
        }

        debug!(auto_commit, "opened session");
        Ok(Session::new(self.config.clone(), executor, auto_commit))
    }
}
