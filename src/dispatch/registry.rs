//! Named handlers and middleware.
//!
//! The registry is the module-resolution base: rule files and manifests refer
//! to callables by name, and the registry turns those names into code.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatch::handler::{EchoHandler, Handler};
use crate::dispatch::middleware::{CatchErrors, Cors, Middleware, Timing};

#[derive(Clone, Default)]
pub struct Registry {
    handlers: HashMap<String, Arc<dyn Handler>>,
    middleware: HashMap<String, Arc<dyn Middleware>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with `echo`, `timing`, `catch-errors` and `cors`.
    pub fn with_builtins() -> Self {
        Self::new()
            .with_handler("echo", EchoHandler)
            .with_middleware("timing", Timing)
            .with_middleware("catch-errors", CatchErrors)
            .with_middleware("cors", Cors)
    }

    pub fn with_handler(
        mut self,
        name: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Self {
        self.register_handler(name, handler);
        self
    }

    pub fn with_middleware(
        mut self,
        name: impl Into<String>,
        middleware: impl Middleware + 'static,
    ) -> Self {
        self.register_middleware(name, middleware);
        self
    }

    pub fn register_handler(&mut self, name: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn register_middleware(
        &mut self,
        name: impl Into<String>,
        middleware: impl Middleware + 'static,
    ) {
        self.middleware.insert(name.into(), Arc::new(middleware));
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    pub fn middleware(&self, name: &str) -> Option<Arc<dyn Middleware>> {
        self.middleware.get(name).cloned()
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn has_middleware(&self, name: &str) -> bool {
        self.middleware.contains_key(name)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        let mut middleware: Vec<_> = self.middleware.keys().collect();
        handlers.sort();
        middleware.sort();
        f.debug_struct("Registry")
            .field("handlers", &handlers)
            .field("middleware", &middleware)
            .finish()
    }
}
