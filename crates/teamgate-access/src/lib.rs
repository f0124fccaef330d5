//! Teamgate Access: permission resolution, group mutation, audit and
//! authorization guards over the `teamgate-core` repository traits.

pub mod audit;
pub mod config;
pub mod error;
pub mod guard;
mod locks;
pub mod notify;
pub mod resolver;
pub mod service;

pub use audit::AuditLog;
pub use config::AccessConfig;
pub use error::GroupError;
pub use guard::{AccessGuard, Decision, DenyReason, GuardContext};
pub use notify::MemoryNotifier;
pub use resolver::PermissionResolver;
pub use service::GroupService;
