//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Permission backend selection
//!
//! [`select_backend`] maps the configured selector and the availability of
//! the external authority to a backend kind without side effects.
//! [`PermissionRegistry`] applies that decision on every configuration
//! snapshot and holds the installed service behind one reference.

use parking_lot::RwLock;
use sentinel_config::{PermissionsConfig, PERM_TARGET};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AuthError, AuthResult};
use crate::permissions::{
    BridgePermissionService, ExternalAuthority, MemoryPermissionService, MirrorPermissionService,
    PermissionService, SubjectId,
};

/// Kind of permission backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Memory,
    Bridge,
    Mirror,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Bridge => write!(f, "bridge"),
            BackendKind::Mirror => write!(f, "mirror"),
        }
    }
}

/// Why the requested backend was replaced by the memory backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// An external backend was requested but no authority is available
    AuthorityUnavailable,

    /// The selector names no known backend
    UnknownSelector,
}

/// Outcome of backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSelection {
    /// Selector as configured
    pub requested: String,

    /// Backend to install
    pub kind: BackendKind,

    /// Set when `kind` is a fallback
    pub fallback: Option<FallbackReason>,
}

/// Choose a backend for `selector`
pub fn select_backend(selector: &str, authority_available: bool) -> BackendSelection {
    let normalized = selector.trim().to_ascii_lowercase();
    let requested = match normalized.as_str() {
        "memory" => Some(BackendKind::Memory),
        "bridge" | "external" | "external-bridge" => Some(BackendKind::Bridge),
        "mirror" | "external-mirror" => Some(BackendKind::Mirror),
        _ => None,
    };

    let (kind, fallback) = match requested {
        Some(BackendKind::Memory) => (BackendKind::Memory, None),
        Some(kind) if authority_available => (kind, None),
        Some(_) => (BackendKind::Memory, Some(FallbackReason::AuthorityUnavailable)),
        None => (BackendKind::Memory, Some(FallbackReason::UnknownSelector)),
    };

    BackendSelection {
        requested: selector.to_string(),
        kind,
        fallback,
    }
}

/// Installed backend
#[derive(Debug, Clone)]
enum ActiveBackend {
    Memory(Arc<MemoryPermissionService>),
    Bridge(Arc<BridgePermissionService>),
    Mirror(Arc<MirrorPermissionService>),
}

impl ActiveBackend {
    fn kind(&self) -> BackendKind {
        match self {
            ActiveBackend::Memory(_) => BackendKind::Memory,
            ActiveBackend::Bridge(_) => BackendKind::Bridge,
            ActiveBackend::Mirror(_) => BackendKind::Mirror,
        }
    }

    fn service(&self) -> Arc<dyn PermissionService> {
        match self {
            ActiveBackend::Memory(service) => service.clone(),
            ActiveBackend::Bridge(service) => service.clone(),
            ActiveBackend::Mirror(service) => service.clone(),
        }
    }
}

/// Holds the active permission service
#[derive(Debug)]
pub struct PermissionRegistry {
    /// Authority supplied by the host, if any
    authority: Option<Arc<dyn ExternalAuthority>>,

    /// Installed backend
    active: RwLock<Option<ActiveBackend>>,
}

impl PermissionRegistry {
    /// Create an empty registry
    pub fn new(authority: Option<Arc<dyn ExternalAuthority>>) -> Self {
        Self {
            authority,
            active: RwLock::new(None),
        }
    }

    /// Select and install a backend for `config`
    ///
    /// An active memory backend that stays selected is reloaded in place. An
    /// active mirror that stays selected drops its cache.
    pub fn apply_config(&self, config: &PermissionsConfig) -> BackendSelection {
        let available = self
            .authority
            .as_ref()
            .map(|authority| authority.is_available())
            .unwrap_or(false);
        let selection = select_backend(&config.backend, available);

        match selection.fallback {
            Some(FallbackReason::AuthorityUnavailable) => warn!(
                target: PERM_TARGET,
                "Permission backend '{}' requested but no external authority is available, falling back to memory",
                selection.requested
            ),
            Some(FallbackReason::UnknownSelector) => warn!(
                target: PERM_TARGET,
                "Unknown permission backend '{}', falling back to memory",
                selection.requested
            ),
            None => {}
        }

        let mut active = self.active.write();
        let next = match (selection.kind, active.as_ref(), self.authority.as_ref()) {
            (BackendKind::Memory, Some(ActiveBackend::Memory(memory)), _) => {
                memory.reload(config);
                None
            }
            (BackendKind::Mirror, Some(ActiveBackend::Mirror(mirror)), _) => {
                mirror.invalidate();
                None
            }
            (BackendKind::Bridge, Some(ActiveBackend::Bridge(_)), _) => None,
            (BackendKind::Bridge, _, Some(authority)) => Some(ActiveBackend::Bridge(Arc::new(
                BridgePermissionService::new(authority.clone()),
            ))),
            (BackendKind::Mirror, _, Some(authority)) => Some(ActiveBackend::Mirror(Arc::new(
                MirrorPermissionService::new(authority.clone()),
            ))),
            _ => Some(ActiveBackend::Memory(Arc::new(MemoryPermissionService::new(
                config,
            )))),
        };

        if let Some(next) = next {
            info!(target: PERM_TARGET, "Installed permission backend: {}", next.kind());
            *active = Some(next);
        }

        selection
    }

    /// Active service, if one is installed
    pub fn active(&self) -> Option<Arc<dyn PermissionService>> {
        self.active.read().as_ref().map(ActiveBackend::service)
    }

    /// Active service or an error when none is installed
    pub fn require_active(&self) -> AuthResult<Arc<dyn PermissionService>> {
        self.active()
            .ok_or_else(|| AuthError::backend_unavailable("no permission backend installed"))
    }

    /// Kind of the active backend
    pub fn active_kind(&self) -> Option<BackendKind> {
        self.active.read().as_ref().map(ActiveBackend::kind)
    }

    /// Active memory backend, if memory is installed
    pub fn memory(&self) -> Option<Arc<MemoryPermissionService>> {
        match self.active.read().as_ref() {
            Some(ActiveBackend::Memory(memory)) => Some(memory.clone()),
            _ => None,
        }
    }

    /// Active mirror backend, if mirror is installed
    pub fn mirror(&self) -> Option<Arc<MirrorPermissionService>> {
        match self.active.read().as_ref() {
            Some(ActiveBackend::Mirror(mirror)) => Some(mirror.clone()),
            _ => None,
        }
    }

    /// Forget cached lookups for `subject`; a no-op unless mirror is installed
    pub fn invalidate_subject(&self, subject: &SubjectId) {
        if let Some(mirror) = self.mirror() {
            mirror.invalidate_subject(subject);
        }
    }

    /// Forget every cached lookup; a no-op unless mirror is installed
    pub fn invalidate_all(&self) {
        if let Some(mirror) = self.mirror() {
            mirror.invalidate();
        }
    }

    /// Drop the installed backend
    pub fn clear(&self) {
        self.active.write().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::external::tests::MockAuthority;
    use crate::permissions::ContextFlags;
    use sentinel_config::RoleConfig;
    use std::sync::atomic::Ordering;
    use uuid::Uuid;

    fn with_backend(backend: &str) -> PermissionsConfig {
        PermissionsConfig {
            backend: backend.to_string(),
            ..PermissionsConfig::default()
        }
    }

    #[test]
    fn test_select_backend() {
        assert_eq!(select_backend("memory", false).kind, BackendKind::Memory);
        assert_eq!(select_backend(" Bridge ", true).kind, BackendKind::Bridge);
        assert_eq!(select_backend("external", true).kind, BackendKind::Bridge);
        assert_eq!(select_backend("external-bridge", true).kind, BackendKind::Bridge);
        assert_eq!(select_backend("MIRROR", true).kind, BackendKind::Mirror);
        assert_eq!(select_backend("external-mirror", true).kind, BackendKind::Mirror);
        assert_eq!(select_backend("memory", true).fallback, None);
    }

    #[test]
    fn test_select_backend_fallbacks() {
        let unavailable = select_backend("bridge", false);
        assert_eq!(unavailable.kind, BackendKind::Memory);
        assert_eq!(unavailable.fallback, Some(FallbackReason::AuthorityUnavailable));

        let unknown = select_backend("ldap", true);
        assert_eq!(unknown.kind, BackendKind::Memory);
        assert_eq!(unknown.fallback, Some(FallbackReason::UnknownSelector));
        assert_eq!(unknown.requested, "ldap");
    }

    #[test]
    fn test_registry_falls_back_without_authority() {
        let registry = PermissionRegistry::new(None);
        assert!(registry.active().is_none());
        assert!(registry.require_active().is_err());

        let selection = registry.apply_config(&with_backend("mirror"));
        assert_eq!(selection.fallback, Some(FallbackReason::AuthorityUnavailable));
        assert_eq!(registry.active_kind(), Some(BackendKind::Memory));
        assert_eq!(registry.require_active().unwrap().name(), "memory");
    }

    #[test]
    fn test_registry_reuses_active_memory() {
        let registry = PermissionRegistry::new(None);
        registry.apply_config(&with_backend("memory"));
        let first = registry.memory().unwrap();

        let mut config = with_backend("memory");
        config
            .roles
            .insert("builder".to_string(), RoleConfig::new(&["build.*"], &[], &[]));
        registry.apply_config(&config);

        let second = registry.memory().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.group_exists("builder"));
    }

    #[test]
    fn test_registry_switches_to_external() {
        let authority = MockAuthority::available();
        authority.granted.lock().push("chat.talk".to_string());
        let registry = PermissionRegistry::new(Some(authority.clone()));

        registry.apply_config(&with_backend("memory"));
        registry.apply_config(&with_backend("bridge"));
        assert_eq!(registry.active_kind(), Some(BackendKind::Bridge));
        assert!(registry.memory().is_none());

        let service = registry.active().unwrap();
        assert!(service.check(&Uuid::new_v4(), "chat.talk", &ContextFlags::new()));

        authority.available.store(false, Ordering::SeqCst);
        let selection = registry.apply_config(&with_backend("mirror"));
        assert_eq!(selection.fallback, Some(FallbackReason::AuthorityUnavailable));
        assert_eq!(registry.active_kind(), Some(BackendKind::Memory));
    }

    #[test]
    fn test_reapplying_mirror_clears_cache() {
        let authority = MockAuthority::available();
        let registry = PermissionRegistry::new(Some(authority.clone()));
        registry.apply_config(&with_backend("mirror"));

        let service = registry.active().unwrap();
        let subject = Uuid::new_v4();
        service.check(&subject, "chat.talk", &ContextFlags::new());
        service.check(&subject, "chat.talk", &ContextFlags::new());
        assert_eq!(authority.checks.load(Ordering::SeqCst), 1);

        registry.apply_config(&with_backend("mirror"));
        let service = registry.active().unwrap();
        service.check(&subject, "chat.talk", &ContextFlags::new());
        assert_eq!(authority.checks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalidate_subject_reaches_mirror() {
        let authority = MockAuthority::available();
        let registry = PermissionRegistry::new(Some(authority.clone()));
        let subject = Uuid::new_v4();
        let other = Uuid::new_v4();

        // Nothing to forget on memory
        registry.apply_config(&with_backend("memory"));
        registry.invalidate_subject(&subject);
        assert!(registry.mirror().is_none());

        registry.apply_config(&with_backend("mirror"));
        let service = registry.active().unwrap();
        service.check(&subject, "chat.talk", &ContextFlags::new());
        service.check(&other, "chat.talk", &ContextFlags::new());
        let mirror = registry.mirror().unwrap();
        assert_eq!(mirror.cached_decisions(), 2);

        registry.invalidate_subject(&subject);
        assert_eq!(mirror.cached_decisions(), 1);
        service.check(&subject, "chat.talk", &ContextFlags::new());
        assert_eq!(authority.checks.load(Ordering::SeqCst), 3);

        registry.invalidate_all();
        assert_eq!(mirror.cached_decisions(), 0);
    }
}
