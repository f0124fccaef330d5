//! Team access roles and their total order.
//!
//! `Owner > Editor > Viewer`. Combining grants from several sources always
//! takes the highest rank; there is no deny role.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TeamgateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamRole {
    Owner,
    Editor,
    Viewer,
}

impl TeamRole {
    pub const ALL: [TeamRole; 3] = [TeamRole::Owner, TeamRole::Editor, TeamRole::Viewer];

    pub fn rank(self) -> u8 {
        match self {
            Self::Owner => 3,
            Self::Editor => 2,
            Self::Viewer => 1,
        }
    }

    /// True when `self` grants at least the authority of `minimum`.
    pub fn meets_minimum(self, minimum: TeamRole) -> bool {
        self.rank() >= minimum.rank()
    }

    /// Highest-ranked role in `roles`, or `None` for an empty input.
    pub fn highest<I>(roles: I) -> Option<TeamRole>
    where
        I: IntoIterator<Item = TeamRole>,
    {
        roles.into_iter().max()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Editor => "EDITOR",
            Self::Viewer => "VIEWER",
        }
    }
}

impl PartialOrd for TeamRole {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TeamRole {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = TeamgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Self::Owner),
            "EDITOR" => Ok(Self::Editor),
            "VIEWER" => Ok(Self::Viewer),
            other => Err(TeamgateError::Validation {
                message: format!("unknown team role: {other}"),
            }),
        }
    }
}
