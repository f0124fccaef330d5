//! Change notification boundary.
//!
//! Notifications are published after a mutation commits. Delivery is
//! at-most-once; a lost notification never implies a lost state change.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A published change on a group-namespaced topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Fire-and-forget sink for change notifications.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, topic: &str, payload: serde_json::Value);
}

impl<N: ChangeNotifier + ?Sized> ChangeNotifier for Arc<N> {
    fn publish(&self, topic: &str, payload: serde_json::Value) {
        (**self).publish(topic, payload)
    }
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl ChangeNotifier for NullNotifier {
    fn publish(&self, _topic: &str, _payload: serde_json::Value) {}
}

pub mod topics {
    use super::Uuid;

    pub fn group_updated(group_id: Uuid) -> String {
        format!("user_group/{group_id}/updated")
    }

    pub fn member_added(group_id: Uuid) -> String {
        format!("user_group/{group_id}/member_added")
    }

    pub fn member_removed(group_id: Uuid) -> String {
        format!("user_group/{group_id}/member_removed")
    }

    pub fn team_access_changed(group_id: Uuid) -> String {
        format!("user_group/{group_id}/team_access_changed")
    }
}
