use std::collections::HashMap;
use std::sync::Arc;

use crate::BiyoService;

/// Maps service names to service instances.
pub struct ServiceRegistry<R, P = ()> {
    services: HashMap<String, Arc<dyn BiyoService<R, P>>>,
}

impl<R, P> ServiceRegistry<R, P> {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Register a service under a given name, replacing any previous one.
    pub fn register<S>(&mut self, name: S, service: Arc<dyn BiyoService<R, P>>)
    where
        S: Into<String>,
    {
        self.services.insert(name.into(), service);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn BiyoService<R, P>>> {
        self.services.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

impl<R, P> Default for ServiceRegistry<R, P> {
    fn default() -> Self {
        Self::new()
    }
}
