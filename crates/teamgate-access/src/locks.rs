//! Per-group mutation locks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = DashMap<Uuid, Arc<Mutex<()>>>;

/// Serialises mutations that target the same group within this process.
///
/// An entry lives only while some caller holds or waits for it, so the map
/// stays bounded by the number of in-flight mutations.
#[derive(Clone, Default)]
pub(crate) struct GroupLocks {
    locks: Arc<LockMap>,
}

/// Held lock on one group. Releasing the last reference prunes the entry.
pub(crate) struct GroupLockGuard {
    group_id: Uuid,
    locks: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl GroupLocks {
    pub(crate) async fn acquire(&self, group_id: Uuid) -> GroupLockGuard {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = self.locks.entry(group_id).or_default().clone();
        let guard = lock.lock_owned().await;
        GroupLockGuard {
            group_id,
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for GroupLockGuard {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts.
        drop(self.guard.take());
        self.locks
            .remove_if(&self.group_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_group_is_serialised() {
        let locks = GroupLocks::default();
        let group = Uuid::new_v4();

        let guard = locks.acquire(group).await;
        let pending = tokio::time::timeout(Duration::from_millis(50), locks.acquire(group)).await;
        assert!(pending.is_err(), "second acquire should wait");

        drop(guard);
        let _again = tokio::time::timeout(Duration::from_millis(50), locks.acquire(group))
            .await
            .expect("lock released");
    }

    #[tokio::test]
    async fn different_groups_do_not_block() {
        let locks = GroupLocks::default();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let _b = tokio::time::timeout(Duration::from_millis(50), locks.acquire(Uuid::new_v4()))
            .await
            .expect("independent groups");
    }

    #[tokio::test]
    async fn released_entries_are_pruned() {
        let locks = GroupLocks::default();
        for _ in 0..100 {
            let _guard = locks.acquire(Uuid::new_v4()).await;
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_a_waiter_holds_it() {
        let locks = GroupLocks::default();
        let group = Uuid::new_v4();

        let first = locks.acquire(group).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(group).await;
            })
        };
        // Let the waiter register before releasing.
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1, "waiter still references the entry");

        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }
}
