//! Access service configuration.

use serde::Deserialize;
use teamgate_core::repository::Pagination;

/// Configuration shared by the group service, audit log and notifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Page size used when the caller gives no limit (default: 50).
    pub default_page_size: u64,
    /// Upper bound applied to caller-supplied limits (default: 200).
    pub max_page_size: u64,
    /// Buffered events per topic in the in-process notifier (default: 100).
    pub notification_channel_capacity: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 200,
            notification_channel_capacity: 100,
        }
    }
}

impl AccessConfig {
    /// Normalises caller pagination: a missing or zero limit becomes the
    /// default page size, and limits are capped at `max_page_size`.
    pub fn pagination(&self, limit: Option<u64>, offset: Option<u64>) -> Pagination {
        let limit = match limit {
            Some(0) | None => self.default_page_size,
            Some(n) => n.min(self.max_page_size),
        };
        Pagination {
            offset: offset.unwrap_or(0),
            limit,
        }
    }
}
