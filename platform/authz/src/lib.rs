//! Authorization primitives for the EventSuite admin surfaces.
//!
//! Everything in this crate is a pure function of a [`PermissionSnapshot`]
//! and a query. The snapshot is produced elsewhere (session resolution in
//! `platform-db`); this crate holds no state and performs no I/O, which is
//! what keeps page guarding and field gating testable without a running
//! server.

mod decision;
mod permission;
mod principal;
mod snapshot;

pub use decision::{
    ADMIN_HOME, Access, DEFAULT_REDIRECT, ORGANIZER_HOME, RenderQuery, RouteDecision,
    evaluate_render, evaluate_route, gate, has_all_permissions, has_any_permission, has_permission,
};
pub use permission::{PermissionCode, PermissionSet};
pub use principal::{PrincipalType, UnknownPrincipalType};
pub use snapshot::PermissionSnapshot;
