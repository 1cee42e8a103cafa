//! Admin shell navigation, filtered through the render-gating helper.
//!
//! Each menu entry declares the permission query that would gate the
//! corresponding screen client-side; entries the snapshot cannot satisfy
//! collapse to nothing rather than erroring, so the query is safe to run
//! for any principal including anonymous ones.

use async_graphql::{Context, SimpleObject};
use platform_authz::{RenderQuery, gate};

use super::request_context;

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "NavItem")]
pub struct NavItem {
    pub key: String,
    pub label: String,
    pub href: String,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct NavPayload {
    pub items: Vec<NavItem>,
}

fn item(key: &str, label: &str, href: &str) -> NavItem {
    NavItem {
        key: key.to_string(),
        label: label.to_string(),
        href: href.to_string(),
    }
}

pub(super) fn resolve(ctx: &Context<'_>) -> async_graphql::Result<NavPayload> {
    let rc = request_context(ctx)?;
    let snapshot = &rc.snapshot;

    let entries = [
        (
            RenderQuery::single("USER:LIST"),
            item("users", "Users", "/admin/users"),
        ),
        (
            RenderQuery::single("ROLE:LIST"),
            item("roles", "Roles", "/admin/roles"),
        ),
        (
            RenderQuery::single("EVENT:LIST"),
            item("events", "Events", "/admin/events"),
        ),
        (
            RenderQuery::single("STATS:VIEW"),
            item("stats", "Statistics", "/admin/stats"),
        ),
        (
            RenderQuery::single("NOTIFICATION:LIST"),
            item("notifications", "Notifications", "/admin/notifications"),
        ),
        // Moderation shows up for anyone who can touch users or manage
        // notifications; full settings needs both management grants.
        (
            RenderQuery::any_of(["USER:UPDATE", "NOTIFICATION:MANAGE"]),
            item("moderation", "Moderation", "/admin/moderation"),
        ),
        (
            RenderQuery::all_of(["USER:UPDATE", "ROLE:LIST"]),
            item("settings", "Settings", "/admin/settings"),
        ),
    ];

    let items = entries
        .into_iter()
        .filter_map(|(query, entry)| gate(snapshot, &query, Some(entry), None))
        .collect();
    Ok(NavPayload { items })
}
