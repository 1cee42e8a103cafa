use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a stored principal string does not name a known type.
///
/// Snapshot construction validates principal strings exactly once, at the
/// database boundary; decision functions only ever see the closed enum.
#[derive(Debug, Error)]
#[error("unknown principal type: {0}")]
pub struct UnknownPrincipalType(pub String);

/// The kind of actor behind the current session. Exactly one per session.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrincipalType {
    Admin,
    Organizer,
    SystemUser,
    EndUser,
    Anonymous,
}

impl PrincipalType {
    pub fn as_str(self) -> &'static str {
        match self {
            PrincipalType::Admin => "ADMIN",
            PrincipalType::Organizer => "ORGANIZER",
            PrincipalType::SystemUser => "SYSTEM_USER",
            PrincipalType::EndUser => "END_USER",
            PrincipalType::Anonymous => "ANONYMOUS",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownPrincipalType> {
        match value {
            "ADMIN" => Ok(PrincipalType::Admin),
            "ORGANIZER" => Ok(PrincipalType::Organizer),
            "SYSTEM_USER" => Ok(PrincipalType::SystemUser),
            "END_USER" => Ok(PrincipalType::EndUser),
            "ANONYMOUS" => Ok(PrincipalType::Anonymous),
            other => Err(UnknownPrincipalType(other.to_string())),
        }
    }

    /// System users are internal staff and count as admins for route
    /// admission. Organizers deliberately do not.
    pub fn is_admin_class(self) -> bool {
        matches!(self, PrincipalType::Admin | PrincipalType::SystemUser)
    }

    pub fn is_organizer(self) -> bool {
        matches!(self, PrincipalType::Organizer)
    }
}

impl std::fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_variant() {
        for variant in [
            PrincipalType::Admin,
            PrincipalType::Organizer,
            PrincipalType::SystemUser,
            PrincipalType::EndUser,
            PrincipalType::Anonymous,
        ] {
            assert_eq!(PrincipalType::parse(variant.as_str()).unwrap(), variant);
        }
    }

    #[test]
    fn parse_rejects_unknown_strings() {
        assert!(PrincipalType::parse("SUPERUSER").is_err());
        assert!(PrincipalType::parse("admin").is_err());
    }

    #[test]
    fn admin_class_covers_admin_and_system_user_only() {
        assert!(PrincipalType::Admin.is_admin_class());
        assert!(PrincipalType::SystemUser.is_admin_class());
        assert!(!PrincipalType::Organizer.is_admin_class());
        assert!(!PrincipalType::EndUser.is_admin_class());
        assert!(!PrincipalType::Anonymous.is_admin_class());
    }
}
