use std::sync::Arc;

use crate::{
    backend::SessionBackend, broker::SessionBroker, config::AuthConfig,
    resolver::SessionResolver, validate::Validator,
};

/// Everything a request needs from the layer, resolved once and shared read-only.
#[derive(Clone)]
pub(crate) struct Strategy {
    pub(crate) config: AuthConfig,
    pub(crate) backend: Arc<dyn SessionBackend>,
    pub(crate) validator: Option<Arc<dyn Validator>>,
}

impl Strategy {
    pub(crate) fn resolver(&self) -> SessionResolver {
        SessionResolver::new(self.backend.clone(), self.validator.clone())
    }

    pub(crate) fn broker(&self) -> SessionBroker {
        SessionBroker::new(self.backend.clone(), self.validator.clone())
    }
}
