//! Use-count bookkeeping, shared across every bin.
//!
//! Modelled on `PseudosettleService`'s pending-request table: a lock
//! protects a plain `HashMap`, and callers that need to wait for a
//! not-yet-initialized entry register a `oneshot` under the same lock they
//! used to check for it, so nothing can slip between the check and the
//! registration.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tokio::sync::oneshot;

use vertex_primitives::OverlayAddress;

struct TableInner {
    counts: HashMap<OverlayAddress, u64>,
    initialized: HashSet<OverlayAddress>,
    waiters: HashMap<OverlayAddress, Vec<oneshot::Sender<()>>>,
}

/// Tracks how many times each known peer has been handed out.
///
/// `get`/`add` treat an unknown peer as count zero, so the hot
/// enumeration path never blocks; `wait` is for the narrower case of a
/// caller that specifically needs to know a peer has been through
/// [`Self::init`] (e.g. a test asserting on the initialization policy's
/// outcome) rather than just seen some use.
pub struct UseCountTable {
    inner: RwLock<TableInner>,
}

impl Default for UseCountTable {
    fn default() -> Self {
        Self::new()
    }
}

impl UseCountTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TableInner {
                counts: HashMap::new(),
                initialized: HashSet::new(),
                waiters: HashMap::new(),
            }),
        }
    }

    /// Current use count for `peer`, or 0 if it has never been seen.
    pub fn get(&self, peer: &OverlayAddress) -> u64 {
        self.inner.read().counts.get(peer).copied().unwrap_or(0)
    }

    /// Give `peer` a starting use count, overwriting any existing one.
    ///
    /// A second `init` for an already-known peer replaces its count rather
    /// than leaving the first value in place: a remove-then-readd sequence
    /// should adopt a fresh initialization, and the listener loop never
    /// calls `init` for a peer it hasn't just observed an admission event
    /// for, so there is no stale-overwrite risk in practice.
    ///
    /// Wakes any callers blocked in [`Self::wait`] for this peer.
    pub fn init(&self, peer: OverlayAddress, initial_count: u64) {
        let mut inner = self.inner.write();
        inner.counts.insert(peer, initial_count);
        inner.initialized.insert(peer);
        if let Some(waiters) = inner.waiters.remove(&peer) {
            for tx in waiters {
                let _ = tx.send(());
            }
        }
    }

    /// Increment `peer`'s use count by one and return the new value.
    ///
    /// If `peer` has never been seen, it is created with count 1: a use
    /// was observed and must not be silently dropped, even if it raced
    /// ahead of the listener that would otherwise have called `init`.
    pub fn add(&self, peer: &OverlayAddress) -> u64 {
        let mut inner = self.inner.write();
        let count = inner.counts.entry(*peer).or_insert(0);
        *count += 1;
        *count
    }

    /// Drop `peer`'s use count and initialization state entirely.
    ///
    /// A later `add` re-creates the entry at 1; a later `init` treats it
    /// as a brand new peer.
    pub fn remove(&self, peer: &OverlayAddress) {
        let mut inner = self.inner.write();
        inner.counts.remove(peer);
        inner.initialized.remove(peer);
        inner.waiters.remove(peer);
    }

    /// Wait until [`Self::init`] has been called for `peer`, then return
    /// its count.
    ///
    /// Resolves immediately if the peer is already initialized.
    pub async fn wait(&self, peer: OverlayAddress) -> u64 {
        let rx = {
            let mut inner = self.inner.write();
            if inner.initialized.contains(&peer) {
                return inner.counts.get(&peer).copied().unwrap_or(0);
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.entry(peer).or_default().push(tx);
            rx
        };

        // The sender side is only ever dropped after sending, in `init`, or
        // when the table itself is dropped; either way there is nothing
        // further to wait for once the channel resolves.
        let _ = rx.await;
        self.get(&peer)
    }

    /// Rank `keys` by their current use count, ascending, ties broken by
    /// `keys`'s own order.
    ///
    /// Keys never seen by the table are treated as count 0, same as
    /// [`Self::get`].
    pub fn snapshot(&self, keys: &[OverlayAddress]) -> Vec<(OverlayAddress, u64)> {
        let inner = self.inner.read();
        let mut entries: Vec<(OverlayAddress, u64)> = keys
            .iter()
            .map(|key| (*key, inner.counts.get(key).copied().unwrap_or(0)))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn addr(byte: u8) -> OverlayAddress {
        OverlayAddress::repeat_byte(byte)
    }

    #[test]
    fn get_on_unknown_peer_is_zero() {
        let table = UseCountTable::new();
        assert_eq!(table.get(&addr(0)), 0);
    }

    #[test]
    fn init_overwrites_an_existing_count() {
        let table = UseCountTable::new();
        let peer = addr(1);
        table.init(peer, 5);
        table.init(peer, 99);
        assert_eq!(table.get(&peer), 99);
    }

    #[test]
    fn add_increments_from_initial_count() {
        let table = UseCountTable::new();
        let peer = addr(2);
        table.init(peer, 3);
        assert_eq!(table.add(&peer), 4);
        assert_eq!(table.add(&peer), 5);
    }

    #[test]
    fn add_without_init_starts_from_zero() {
        let table = UseCountTable::new();
        let peer = addr(9);
        assert_eq!(table.add(&peer), 1);
        assert_eq!(table.get(&peer), 1);
    }

    #[test]
    fn remove_then_reinit_starts_fresh() {
        let table = UseCountTable::new();
        let peer = addr(3);
        table.init(peer, 10);
        table.add(&peer);
        table.remove(&peer);
        assert_eq!(table.get(&peer), 0);
        table.init(peer, 0);
        assert_eq!(table.get(&peer), 0);
    }

    #[test]
    fn remove_is_idempotent() {
        let table = UseCountTable::new();
        let peer = addr(4);
        table.remove(&peer);
        table.remove(&peer);
        assert_eq!(table.get(&peer), 0);
    }

    #[tokio::test]
    async fn wait_resolves_immediately_when_already_initialized() {
        let table = UseCountTable::new();
        let peer = addr(5);
        table.init(peer, 7);
        let count = table.wait(peer).await;
        assert_eq!(count, 7);
    }

    #[tokio::test]
    async fn wait_blocks_until_init_then_resolves() {
        let table = Arc::new(UseCountTable::new());
        let peer = addr(6);

        let waiter = {
            let table = table.clone();
            tokio::spawn(async move { table.wait(peer).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        table.init(peer, 42);

        let count = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait should resolve once initialized")
            .expect("waiter task should not panic");
        assert_eq!(count, 42);
    }

    #[tokio::test]
    async fn wait_ignores_a_count_created_by_add_without_init() {
        let table = Arc::new(UseCountTable::new());
        let peer = addr(10);
        table.add(&peer);

        let waiter = {
            let table = table.clone();
            tokio::spawn(async move { table.wait(peer).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        table.init(peer, 3);
        let count = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait should resolve once initialized")
            .expect("waiter task should not panic");
        assert_eq!(count, 3);
    }

    #[test]
    fn snapshot_ranks_ascending_by_count() {
        let table = UseCountTable::new();
        table.init(addr(7), 5);
        table.init(addr(8), 1);
        table.init(addr(9), 3);

        let keys = [addr(7), addr(8), addr(9)];
        let ranked = table.snapshot(&keys);
        assert_eq!(ranked, vec![(addr(8), 1), (addr(9), 3), (addr(7), 5)]);
    }

    #[test]
    fn snapshot_breaks_ties_by_key_order() {
        let table = UseCountTable::new();
        table.init(addr(1), 0);
        table.init(addr(2), 0);
        table.init(addr(3), 0);

        let keys = [addr(2), addr(3), addr(1)];
        let ranked = table.snapshot(&keys);
        assert_eq!(ranked, vec![(addr(2), 0), (addr(3), 0), (addr(1), 0)]);
    }

    #[test]
    fn snapshot_treats_unseen_keys_as_zero() {
        let table = UseCountTable::new();
        let ranked = table.snapshot(&[addr(42)]);
        assert_eq!(ranked, vec![(addr(42), 0)]);
    }
}
