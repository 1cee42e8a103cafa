use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// An opaque capability token granted to a principal.
///
/// By convention codes follow `RESOURCE:ACTION` (`USER:CREATE`,
/// `NOTIFICATION:LIST`), but nothing here interprets that structure; only
/// set membership matters.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(String);

impl PermissionCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PermissionCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PermissionCode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The flat set of codes held by the current principal.
///
/// Immutable once constructed; a fresh set is built whenever the session is
/// resolved, so decisions always see one consistent snapshot.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PermissionSet(HashSet<PermissionCode>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &PermissionCode) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionCode> {
        self.0.iter()
    }
}

impl<C: Into<PermissionCode>> FromIterator<C> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_exact() {
        let set: PermissionSet = ["USER:CREATE", "USER:LIST"].into_iter().collect();
        assert!(set.contains(&PermissionCode::from("USER:CREATE")));
        assert!(!set.contains(&PermissionCode::from("USER:DELETE")));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn duplicate_codes_collapse() {
        let set: PermissionSet = ["ROLE:LIST", "ROLE:LIST"].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
