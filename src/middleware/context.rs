//! Per-request scope shared between the failure recorder and inner stages.
//!
//! The recorder sits outside the access guard, so it cannot see extensions the
//! guard inserts on the inner request. It opens a `RequestContext` instead and
//! the guard writes the admitted principal into it.

use std::sync::{Arc, OnceLock};

use crate::services::auth::Principal;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    principal: Arc<OnceLock<Principal>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    // First write wins.
    pub fn attach_principal(&self, principal: Principal) {
        let _ = self.principal.set(principal);
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.get()
    }
}
