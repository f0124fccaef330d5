//! Discriminated outcomes of group mutations.

use teamgate_core::error::{ErrorKind, TeamgateError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("a group with this name already exists")]
    NameTaken,

    #[error("group not found")]
    GroupNotFound,

    #[error("team not found")]
    TeamNotFound,

    #[error("user is already a member of this group")]
    MemberExists,

    #[error("user is not a member of this group")]
    MemberNotFound,

    #[error("group admins cannot remove themselves")]
    CannotRemoveSelf,

    #[error("group must keep at least one admin")]
    LastAdmin,

    #[error("group already has access to this team")]
    AccessExists,

    #[error("group has no access to this team")]
    AccessNotFound,

    #[error(transparent)]
    Store(#[from] TeamgateError),
}

impl GroupError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NameTaken => "USER_GROUP_NAME_TAKEN",
            Self::GroupNotFound => "USER_GROUP_NOT_FOUND",
            Self::TeamNotFound => "TEAM_NOT_FOUND",
            Self::MemberExists => "USER_GROUP_MEMBER_EXISTS",
            Self::MemberNotFound => "USER_GROUP_MEMBER_NOT_FOUND",
            Self::CannotRemoveSelf => "USER_GROUP_CANNOT_REMOVE_SELF",
            Self::LastAdmin => "USER_GROUP_LAST_ADMIN",
            Self::AccessExists => "USER_GROUP_TEAM_ACCESS_EXISTS",
            Self::AccessNotFound => "USER_GROUP_TEAM_ACCESS_NOT_FOUND",
            Self::Store(_) => "STORE_UNAVAILABLE",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GroupNotFound
            | Self::TeamNotFound
            | Self::MemberNotFound
            | Self::AccessNotFound => ErrorKind::NotFound,
            Self::NameTaken | Self::MemberExists | Self::AccessExists => ErrorKind::AlreadyExists,
            Self::CannotRemoveSelf | Self::LastAdmin => ErrorKind::Forbidden,
            Self::Store(err) => err.kind(),
        }
    }
}

impl From<GroupError> for TeamgateError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::Store(inner) => inner,
            GroupError::GroupNotFound
            | GroupError::TeamNotFound
            | GroupError::MemberNotFound
            | GroupError::AccessNotFound => TeamgateError::NotFound {
                entity: err.code().into(),
                id: String::new(),
            },
            GroupError::NameTaken | GroupError::MemberExists | GroupError::AccessExists => {
                TeamgateError::AlreadyExists {
                    entity: err.code().into(),
                }
            }
            GroupError::CannotRemoveSelf | GroupError::LastAdmin => TeamgateError::Forbidden {
                reason: err.to_string(),
            },
        }
    }
}
