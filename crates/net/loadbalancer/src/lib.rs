//! Use-count based load balancing across a Kademlia routing table's bins.
//!
//! [`PeerLoadBalancer`] sits beside an [`Overlay`] (the real routing table
//! in production, an in-memory fixture in tests) and tracks how many times
//! each peer has been handed out. Enumerating bins through the balancer
//! relative to some base address — the local node's own, or a target chunk
//! address a higher protocol is routing toward — yields peers ordered
//! least-used first, so callers that always take the front of the bin
//! spread load evenly instead of hammering whichever peer happens to sort
//! first topologically. The balancer itself never picks a peer or makes a
//! routing decision; it only returns ordered bins for the caller to choose
//! from.
//!
//! The core enumeration path is errorless: [`PeerLoadBalancer::each_bin`]
//! cannot fail. Only capability-filtered enumeration can, since the
//! overlay itself may reject an unrecognised capability key; see
//! [`LoadBalancerError`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod bin;
mod error;
mod init;
mod listener;
mod overlay;
mod table;

pub use bin::{LbBin, LbEntry, UseCallback};
pub use error::LoadBalancerError;
pub use init::InitPolicy;
pub use overlay::{AddedPeer, Bin, Overlay, RemovedPeer};
pub use table::UseCountTable;

#[cfg(any(test, feature = "test-util"))]
pub use overlay::test_support;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use vertex_primitives::OverlayAddress;

use bin::project_bin;

/// Configuration for a [`PeerLoadBalancer`].
#[derive(Debug, Clone)]
pub struct LoadBalancerConfig {
    /// How to seed a newly admitted peer's starting use count.
    pub init_policy: InitPolicy,
    /// Capacity of the broadcast channels the balancer subscribes to. Only
    /// relevant insofar as a slow consumer of the *same* channel elsewhere
    /// can cause the balancer's own listener to lag and log a warning; it
    /// does not size anything the balancer itself owns.
    pub event_channel_capacity: usize,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            init_policy: InitPolicy::LeastUsedInBin,
            event_channel_capacity: 256,
        }
    }
}

/// Tracks peer use counts for one overlay and exposes load-balanced bin
/// enumeration over it.
///
/// Dropping a `PeerLoadBalancer` stops its background listeners; callers
/// that want to wait for them to finish first should call
/// [`PeerLoadBalancer::stop`] followed by [`PeerLoadBalancer::join`].
pub struct PeerLoadBalancer {
    overlay: Arc<dyn Overlay>,
    table: Arc<UseCountTable>,
    stop_tx: watch::Sender<bool>,
    added_task: Option<JoinHandle<()>>,
    removed_task: Option<JoinHandle<()>>,
}

impl PeerLoadBalancer {
    /// Start tracking `overlay`'s peers and spawn the background listeners
    /// that keep the use-count table in sync with its admission/departure
    /// events.
    pub fn spawn(overlay: Arc<dyn Overlay>, config: LoadBalancerConfig) -> Self {
        let table = Arc::new(UseCountTable::new());
        let (stop_tx, stop_rx) = watch::channel(false);
        let (added_rx, removed_rx) = overlay.subscribe_peer_changes();

        let added_task = tokio::spawn(listener::run_added_listener(
            overlay.clone(),
            table.clone(),
            config.init_policy,
            added_rx,
            stop_rx.clone(),
        ));
        let removed_task = tokio::spawn(listener::run_removed_listener(
            table.clone(),
            removed_rx,
            stop_rx,
        ));

        debug!(init_policy = ?config.init_policy, "peer load balancer started");

        Self {
            overlay,
            table,
            stop_tx,
            added_task: Some(added_task),
            removed_task: Some(removed_task),
        }
    }

    /// Signal the background listeners to stop. Idempotent.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop the listeners and wait for them to exit.
    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.added_task.take() {
            let _ = task.await;
        }
        if let Some(task) = self.removed_task.take() {
            let _ = task.await;
        }
    }

    /// The use count recorded for `peer`, or 0 if it has never been seen.
    pub fn use_count(&self, peer: &OverlayAddress) -> u64 {
        self.table.get(peer)
    }

    /// Enumerate bins at or above `min_po`, relative to `base`, ranked
    /// least-used first within each bin, in descending proximity order.
    /// `consumer` returns `false` to stop early.
    ///
    /// `base` need not be the local node's own address: a higher protocol
    /// routing a chunk hands in the chunk's address so bins are ranked by
    /// proximity to *that*, not to the local node.
    pub fn each_bin(
        &self,
        base: OverlayAddress,
        min_po: u8,
        mut consumer: impl FnMut(LbBin) -> bool,
    ) {
        let table = &self.table;
        self.overlay.each_bin_descending(base, min_po, &mut |bin| {
            consumer(project_bin(bin, table))
        });
    }

    /// As [`Self::each_bin`], restricted to peers advertising `capability`.
    pub fn each_bin_filtered(
        &self,
        base: OverlayAddress,
        capability: &str,
        min_po: u8,
        mut consumer: impl FnMut(LbBin) -> bool,
    ) -> Result<(), LoadBalancerError> {
        let table = &self.table;
        self.overlay.each_bin_descending_filtered(base, capability, min_po, &mut |bin| {
            consumer(project_bin(bin, table))
        })
    }

    /// [`Self::each_bin`] with `base` defaulted to the local node's own
    /// overlay address, for callers enumerating their own routing table
    /// rather than routing toward some other target.
    pub fn each_bin_node_address(&self, min_po: u8, consumer: impl FnMut(LbBin) -> bool) {
        self.each_bin(self.overlay.base_address(), min_po, consumer);
    }
}

impl Drop for PeerLoadBalancer {
    fn drop(&mut self) {
        self.stop();
    }
}
