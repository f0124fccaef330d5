//! Append-only audit log component.
//!
//! Group mutations write their entries inside the store transaction (see
//! [`GroupService`](crate::service::GroupService)); this component covers
//! standalone events such as the invitation lifecycle, and all queries.

use teamgate_core::error::{TeamgateError, TeamgateResult};
use teamgate_core::models::actor::Actor;
use teamgate_core::models::audit::{
    AuditAction, AuditLogEntry, AuditLogFilter, AuditTargetType, CreateAuditLogEntry,
};
use teamgate_core::repository::{AuditLogRepository, PaginatedResult};
use tracing::info;
use uuid::Uuid;

use crate::config::AccessConfig;

pub struct AuditLog<A: AuditLogRepository> {
    repo: A,
    config: AccessConfig,
}

impl<A: AuditLogRepository> AuditLog<A> {
    pub fn new(repo: A, config: AccessConfig) -> Self {
        Self { repo, config }
    }

    /// Pure insert. Fails only when the store is unavailable.
    pub async fn append(&self, mut entry: CreateAuditLogEntry) -> TeamgateResult<AuditLogEntry> {
        if entry.details.is_null() {
            entry.details = serde_json::Value::Object(Default::default());
        }
        let stored = self.repo.append(entry).await?;
        info!(
            audit_id = %stored.id,
            action = %stored.action,
            performed_by = %stored.performed_by,
            "audit entry appended"
        );
        Ok(stored)
    }

    /// Records an invitation lifecycle event for `group_id`.
    pub async fn record_invitation(
        &self,
        actor: &Actor,
        action: AuditAction,
        group_id: Uuid,
        invitation_id: Uuid,
        details: serde_json::Value,
    ) -> TeamgateResult<AuditLogEntry> {
        if !matches!(
            action,
            AuditAction::InvitationSent | AuditAction::InvitationAccepted | AuditAction::InvitationExpired
        ) {
            return Err(TeamgateError::Validation {
                message: format!("{action} is not an invitation event"),
            });
        }
        self.append(
            CreateAuditLogEntry::by(actor, action, AuditTargetType::Invitation)
                .group(group_id)
                .target(invitation_id)
                .details(details),
        )
        .await
    }

    /// Entries matching every set filter, newest first.
    pub async fn query(
        &self,
        filter: AuditLogFilter,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> TeamgateResult<PaginatedResult<AuditLogEntry>> {
        self.repo
            .list(filter, self.config.pagination(limit, offset))
            .await
    }
}
