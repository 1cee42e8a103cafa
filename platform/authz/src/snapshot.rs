use crate::permission::{PermissionCode, PermissionSet};
use crate::principal::PrincipalType;

/// Read-only view of the current principal, handed to every decision.
///
/// The snapshot is rebuilt from the session store on each request; nothing
/// in this crate caches or mutates it. `resolving` is true while permission
/// resolution is still in flight, in which case guarded pages must not leak
/// protected content.
#[derive(Clone, Debug, PartialEq)]
pub struct PermissionSnapshot {
    pub authenticated: bool,
    pub resolving: bool,
    pub principal: PrincipalType,
    pub permissions: PermissionSet,
}

impl PermissionSnapshot {
    /// Snapshot for a request with no session at all.
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            resolving: false,
            principal: PrincipalType::Anonymous,
            permissions: PermissionSet::new(),
        }
    }

    /// Snapshot for a session whose permissions have not resolved yet.
    pub fn resolving() -> Self {
        Self {
            resolving: true,
            ..Self::anonymous()
        }
    }

    pub fn authenticated(principal: PrincipalType, permissions: PermissionSet) -> Self {
        Self {
            authenticated: true,
            resolving: false,
            principal,
            permissions,
        }
    }

    pub fn has_permission(&self, code: &PermissionCode) -> bool {
        crate::decision::has_permission(&self.permissions, code)
    }

    pub fn has_any_permission(&self, codes: &[PermissionCode]) -> bool {
        crate::decision::has_any_permission(&self.permissions, codes)
    }

    pub fn has_all_permissions(&self, codes: &[PermissionCode]) -> bool {
        crate::decision::has_all_permissions(&self.permissions, codes)
    }
}

impl Default for PermissionSnapshot {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_snapshot_holds_nothing() {
        let snap = PermissionSnapshot::anonymous();
        assert!(!snap.authenticated);
        assert!(!snap.resolving);
        assert_eq!(snap.principal, PrincipalType::Anonymous);
        assert!(snap.permissions.is_empty());
    }

    #[test]
    fn resolving_snapshot_is_still_unauthenticated() {
        let snap = PermissionSnapshot::resolving();
        assert!(snap.resolving);
        assert!(!snap.has_permission(&"USER:LIST".into()));
    }
}
