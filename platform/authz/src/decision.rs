use crate::permission::{PermissionCode, PermissionSet};
use crate::principal::PrincipalType;
use crate::snapshot::PermissionSnapshot;

/// Where the admin shell lives; admin-class principals are sent here when
/// they hit organizer-only pages.
pub const ADMIN_HOME: &str = "/admin";

/// Organizer landing page; organizers hitting admin-only pages are sent
/// here rather than to the login page.
pub const ORGANIZER_HOME: &str = "/dashboard";

/// Fallback redirect for everyone else.
pub const DEFAULT_REDIRECT: &str = "/login";

/// Outcome of a rendering query.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Access {
    Allowed,
    Denied,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allowed)
    }
}

/// Outcome of a page-level admission check.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RouteDecision {
    /// Principal resolution is pending; show a placeholder, never the page.
    ShowLoading,
    /// Send the client elsewhere, replacing the current history entry.
    Redirect(String),
    Allowed,
}

/// True iff `code` is in `set`.
pub fn has_permission(set: &PermissionSet, code: &PermissionCode) -> bool {
    set.contains(code)
}

/// True iff at least one of `codes` is in `set`. Empty input denies.
pub fn has_any_permission(set: &PermissionSet, codes: &[PermissionCode]) -> bool {
    codes.iter().any(|code| set.contains(code))
}

/// True iff every one of `codes` is in `set`. Empty input is vacuously
/// true; adapters are expected to pass non-empty slices, but the check must
/// not fail on the degenerate case.
pub fn has_all_permissions(set: &PermissionSet, codes: &[PermissionCode]) -> bool {
    codes.iter().all(|code| set.contains(code))
}

/// A rendering query, mirroring the gating wrapper's optional props.
///
/// At most one field is consulted per decision. When a caller fills in more
/// than one, the first present in the order `permission`, `any_of`,
/// `all_of` wins and the rest are ignored. A query with no field present
/// always denies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderQuery {
    pub permission: Option<PermissionCode>,
    pub any_of: Option<Vec<PermissionCode>>,
    pub all_of: Option<Vec<PermissionCode>>,
}

impl RenderQuery {
    pub fn single(code: impl Into<PermissionCode>) -> Self {
        Self {
            permission: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn any_of<C: Into<PermissionCode>>(codes: impl IntoIterator<Item = C>) -> Self {
        Self {
            any_of: Some(codes.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn all_of<C: Into<PermissionCode>>(codes: impl IntoIterator<Item = C>) -> Self {
        Self {
            all_of: Some(codes.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}

/// Dispatches a rendering query against the snapshot's permission set.
/// Fail-closed: an empty query denies.
pub fn evaluate_render(set: &PermissionSet, query: &RenderQuery) -> Access {
    let allowed = if let Some(code) = &query.permission {
        has_permission(set, code)
    } else if let Some(codes) = &query.any_of {
        has_any_permission(set, codes)
    } else if let Some(codes) = &query.all_of {
        has_all_permissions(set, codes)
    } else {
        false
    };
    if allowed { Access::Allowed } else { Access::Denied }
}

/// Picks one of two values by the render decision. This is the whole of
/// the conditional-rendering wrapper: callers supply both branches and the
/// snapshot decides which one survives.
pub fn gate<T>(snapshot: &PermissionSnapshot, query: &RenderQuery, granted: T, fallback: T) -> T {
    match evaluate_render(&snapshot.permissions, query) {
        Access::Allowed => granted,
        Access::Denied => fallback,
    }
}

/// Page-level admission policy.
///
/// Order matters: a resolving snapshot short-circuits to `ShowLoading`
/// before anything else is looked at, and an unauthenticated one always
/// redirects to `redirect_target`. With no required type the page is open
/// to any authenticated principal.
///
/// The two admission classes are deliberately asymmetric: admins and
/// system users are interchangeable on admin pages, while organizer pages
/// admit organizers alone. Wrong-class principals are cross-redirected to
/// their own landing page (`/dashboard` or `/admin`) instead of the login
/// page, so a misplaced click lands somewhere useful.
pub fn evaluate_route(
    snapshot: &PermissionSnapshot,
    required: Option<PrincipalType>,
    redirect_target: &str,
) -> RouteDecision {
    if snapshot.resolving {
        return RouteDecision::ShowLoading;
    }
    if !snapshot.authenticated {
        return RouteDecision::Redirect(redirect_target.to_string());
    }
    let Some(required) = required else {
        return RouteDecision::Allowed;
    };
    let current = snapshot.principal;
    if required.is_admin_class() {
        if current.is_admin_class() {
            RouteDecision::Allowed
        } else if current.is_organizer() {
            RouteDecision::Redirect(ORGANIZER_HOME.to_string())
        } else {
            RouteDecision::Redirect(redirect_target.to_string())
        }
    } else if required.is_organizer() {
        if current.is_organizer() {
            RouteDecision::Allowed
        } else if current.is_admin_class() {
            RouteDecision::Redirect(ADMIN_HOME.to_string())
        } else {
            RouteDecision::Redirect(redirect_target.to_string())
        }
    } else {
        // Required types outside the two admission classes impose no
        // further constraint beyond authentication.
        RouteDecision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(codes: &[&str]) -> PermissionSet {
        codes.iter().copied().collect()
    }

    fn authed(principal: PrincipalType) -> PermissionSnapshot {
        PermissionSnapshot::authenticated(principal, PermissionSet::new())
    }

    #[test]
    fn single_permission_is_set_membership() {
        let s = set(&["USER:CREATE", "USER:LIST"]);
        assert!(has_permission(&s, &"USER:LIST".into()));
        assert!(!has_permission(&s, &"USER:DELETE".into()));
    }

    #[test]
    fn any_permission_is_intersection() {
        let s = set(&["ROLE:LIST"]);
        assert!(has_any_permission(&s, &["USER:LIST".into(), "ROLE:LIST".into()]));
        assert!(!has_any_permission(&s, &["USER:LIST".into(), "USER:VIEW".into()]));
    }

    #[test]
    fn all_permissions_is_subset() {
        let s = set(&["USER:LIST", "USER:VIEW", "STATS:VIEW"]);
        assert!(has_all_permissions(&s, &["USER:LIST".into(), "USER:VIEW".into()]));
        assert!(!has_all_permissions(&s, &["USER:LIST".into(), "USER:DELETE".into()]));
    }

    #[test]
    fn empty_inputs_deny_any_and_vacuously_allow_all() {
        let s = set(&["USER:LIST"]);
        assert!(!has_any_permission(&s, &[]));
        assert!(has_all_permissions(&s, &[]));
        assert!(has_all_permissions(&PermissionSet::new(), &[]));
    }

    #[test]
    fn render_query_priority_is_single_then_any_then_all() {
        let s = set(&["A"]);
        // single loses, any_of would win: single takes priority, denies.
        let q = RenderQuery {
            permission: Some("B".into()),
            any_of: Some(vec!["A".into()]),
            all_of: None,
        };
        assert_eq!(evaluate_render(&s, &q), Access::Denied);

        // any_of beats all_of when single is absent.
        let q = RenderQuery {
            permission: None,
            any_of: Some(vec!["A".into()]),
            all_of: Some(vec!["B".into()]),
        };
        assert_eq!(evaluate_render(&s, &q), Access::Allowed);
    }

    #[test]
    fn empty_render_query_fails_closed() {
        let s = set(&["A"]);
        assert_eq!(evaluate_render(&s, &RenderQuery::default()), Access::Denied);
    }

    #[test]
    fn gate_selects_fallback_on_missing_permission() {
        let snap = PermissionSnapshot::authenticated(PrincipalType::EndUser, set(&["PROFILE:VIEW"]));
        let picked = gate(&snap, &RenderQuery::single("USER:CREATE"), "form", "nothing");
        assert_eq!(picked, "nothing");
        let picked = gate(&snap, &RenderQuery::single("PROFILE:VIEW"), "form", "nothing");
        assert_eq!(picked, "form");
    }

    #[test]
    fn resolving_snapshot_always_shows_loading() {
        let snap = PermissionSnapshot::resolving();
        for required in [None, Some(PrincipalType::Admin), Some(PrincipalType::Organizer)] {
            assert_eq!(
                evaluate_route(&snap, required, DEFAULT_REDIRECT),
                RouteDecision::ShowLoading
            );
        }
    }

    #[test]
    fn unauthenticated_always_redirects_to_target() {
        let snap = PermissionSnapshot::anonymous();
        assert_eq!(
            evaluate_route(&snap, Some(PrincipalType::Admin), "/signin"),
            RouteDecision::Redirect("/signin".to_string())
        );
        assert_eq!(
            evaluate_route(&snap, None, DEFAULT_REDIRECT),
            RouteDecision::Redirect(DEFAULT_REDIRECT.to_string())
        );
    }

    #[test]
    fn organizer_on_admin_pages_goes_to_dashboard() {
        assert_eq!(
            evaluate_route(
                &authed(PrincipalType::Organizer),
                Some(PrincipalType::Admin),
                DEFAULT_REDIRECT
            ),
            RouteDecision::Redirect(ORGANIZER_HOME.to_string())
        );
    }

    #[test]
    fn system_user_on_organizer_pages_goes_to_admin() {
        assert_eq!(
            evaluate_route(
                &authed(PrincipalType::SystemUser),
                Some(PrincipalType::Organizer),
                DEFAULT_REDIRECT
            ),
            RouteDecision::Redirect(ADMIN_HOME.to_string())
        );
    }

    #[test]
    fn system_user_counts_as_admin() {
        assert_eq!(
            evaluate_route(
                &authed(PrincipalType::SystemUser),
                Some(PrincipalType::Admin),
                DEFAULT_REDIRECT
            ),
            RouteDecision::Allowed
        );
    }

    #[test]
    fn end_user_on_guarded_pages_goes_to_target() {
        assert_eq!(
            evaluate_route(
                &authed(PrincipalType::EndUser),
                Some(PrincipalType::Admin),
                DEFAULT_REDIRECT
            ),
            RouteDecision::Redirect(DEFAULT_REDIRECT.to_string())
        );
        assert_eq!(
            evaluate_route(
                &authed(PrincipalType::EndUser),
                Some(PrincipalType::Organizer),
                DEFAULT_REDIRECT
            ),
            RouteDecision::Redirect(DEFAULT_REDIRECT.to_string())
        );
    }

    #[test]
    fn no_required_type_admits_any_authenticated_principal() {
        for principal in [
            PrincipalType::Admin,
            PrincipalType::Organizer,
            PrincipalType::SystemUser,
            PrincipalType::EndUser,
        ] {
            assert_eq!(
                evaluate_route(&authed(principal), None, DEFAULT_REDIRECT),
                RouteDecision::Allowed
            );
        }
    }

    #[test]
    fn required_type_outside_both_classes_only_requires_auth() {
        assert_eq!(
            evaluate_route(
                &authed(PrincipalType::EndUser),
                Some(PrincipalType::EndUser),
                DEFAULT_REDIRECT
            ),
            RouteDecision::Allowed
        );
    }
}
