//! Authentication collaborator.
//!
//! Sync only needs to know who is signed in. Sign-in flows live outside this
//! crate and publish their result through an [`AuthProvider`].

use std::sync::{Arc, RwLock};

/// Source of the currently authenticated principal.
pub trait AuthProvider: Send + Sync {
    /// Id of the signed-in principal, or `None` when signed out.
    fn current_principal(&self) -> Option<String>;
}

/// Principal holder that the host application updates on sign-in/sign-out.
///
/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    principal: Arc<RwLock<Option<String>>>,
}

impl StaticAuth {
    /// A provider with `principal` signed in
    pub fn signed_in(principal: impl Into<String>) -> Self {
        let auth = Self::default();
        auth.set_principal(Some(principal.into()));
        auth
    }

    /// A provider with nobody signed in
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Replace the current principal. Blank ids count as signed out.
    pub fn set_principal(&self, principal: Option<String>) {
        let principal = crate::util::normalize_text_option(principal);
        match self.principal.write() {
            Ok(mut guard) => *guard = principal,
            Err(poisoned) => *poisoned.into_inner() = principal,
        }
    }
}

impl AuthProvider for StaticAuth {
    fn current_principal(&self) -> Option<String> {
        match self.principal.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_out_has_no_principal() {
        assert_eq!(StaticAuth::signed_out().current_principal(), None);
    }

    #[test]
    fn clones_share_principal() {
        let auth = StaticAuth::signed_out();
        let shared = auth.clone();

        auth.set_principal(Some("user-1".to_string()));
        assert_eq!(shared.current_principal().as_deref(), Some("user-1"));

        auth.set_principal(Some("   ".to_string()));
        assert_eq!(shared.current_principal(), None);
    }
}
