use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::Workflow;

/// In-process serialization of writes per header.
///
/// Scans, completions and deletes hold the guard across their transaction, which makes the
/// over-collection check and the route insert atomic with respect to other writers in this
/// process. Other processes writing the same database are not covered.
#[derive(Debug, Default)]
pub struct HeaderLocks {
    enabled: bool,
    locks: DashMap<(Workflow, i64), Arc<Mutex<()>>>,
}

impl HeaderLocks {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            locks: DashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Waits for exclusive access to the header. Returns `None` when locking is disabled.
    pub async fn acquire(&self, workflow: Workflow, header_id: i64) -> Option<OwnedMutexGuard<()>> {
        if !self.enabled {
            return None;
        }
        let lock = self
            .locks
            .entry((workflow, header_id))
            .or_default()
            .clone();
        Some(lock.lock_owned().await)
    }

    /// Forgets the header's lock unless someone still holds or waits for it.
    pub fn release(&self, workflow: Workflow, header_id: i64) {
        self.locks
            .remove_if(&(workflow, header_id), |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn second_scan_waits_for_the_first() {
        let locks = Arc::new(HeaderLocks::new(true));
        let guard = locks.acquire(Workflow::Production, 1).await;
        assert!(guard.is_some());

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire(Workflow::Production, 1).await.is_some() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        assert!(contender.await.unwrap());
    }

    #[tokio::test]
    async fn headers_and_workflows_are_independent() {
        let locks = HeaderLocks::new(true);
        let _a = locks.acquire(Workflow::Production, 1).await;
        let _b = locks.acquire(Workflow::Shipping, 1).await;
        let _c = locks.acquire(Workflow::Production, 2).await;
        assert_eq!(locks.tracked(), 3);
    }

    #[tokio::test]
    async fn release_keeps_held_locks() {
        let locks = HeaderLocks::new(true);
        let guard = locks.acquire(Workflow::Subcontracting, 9).await;
        locks.release(Workflow::Subcontracting, 9);
        assert_eq!(locks.tracked(), 1);
        drop(guard);
        locks.release(Workflow::Subcontracting, 9);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn released_locks_do_not_accumulate() {
        let locks = HeaderLocks::new(true);
        for header_id in 0..1000 {
            let guard = locks.acquire(Workflow::Shipping, header_id).await;
            drop(guard);
            locks.release(Workflow::Shipping, header_id);
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn disabled_locks_hand_out_nothing() {
        let locks = HeaderLocks::disabled();
        assert!(locks.acquire(Workflow::Production, 1).await.is_none());
        assert_eq!(locks.tracked(), 0);
    }
}
