//! Database entities for the EventSuite admin server.

pub mod event;
pub mod notification;
pub mod registration;
pub mod role_permission;
pub mod session;
pub mod user;
pub mod user_identity;
pub mod user_role;
pub mod user_secret;
