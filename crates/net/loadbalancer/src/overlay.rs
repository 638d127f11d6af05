//! The boundary between the load balancer and its Kademlia/pub-sub collaborators.
//!
//! Nothing here depends on `vertex-net-topology`'s own bin-management logic
//! or on libp2p's swarm machinery. A peer handle only needs to expose a
//! hashable identity (`KademliaPeer::overlay`); bin enumeration only needs
//! the closure-based traversal below. This narrow trait is what lets the
//! load balancer plug into a real Kademlia routing table in production and
//! into an in-memory fixture in tests without caring which.

use tokio::sync::broadcast;

use vertex_net_topology::KademliaPeer;
use vertex_primitives::OverlayAddress;

use crate::error::LoadBalancerError;

/// A snapshot of one Kademlia bin, taken at enumeration time.
///
/// Bins are plain values: callers must not retain one beyond the
/// enumeration call that produced it, since it does not track later
/// overlay changes.
#[derive(Debug, Clone)]
pub struct Bin {
    proximity_order: u8,
    peers: Vec<KademliaPeer>,
}

impl Bin {
    /// Build a bin snapshot from its proximity order and member peers.
    pub fn new(proximity_order: u8, peers: Vec<KademliaPeer>) -> Self {
        Self { proximity_order, peers }
    }

    /// The bin's proximity order relative to the enumeration's base address.
    pub fn proximity_order(&self) -> u8 {
        self.proximity_order
    }

    /// Number of peers in the bin.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the bin has no peers.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Iterate the bin's peers in the overlay's own enumeration order.
    pub fn peers(&self) -> impl Iterator<Item = &KademliaPeer> {
        self.peers.iter()
    }

    /// Consume the bin, taking ownership of its peers.
    pub fn into_peers(self) -> Vec<KademliaPeer> {
        self.peers
    }
}

/// A peer was admitted to a bin.
#[derive(Debug, Clone)]
pub struct AddedPeer {
    /// The newly connected peer.
    pub peer: KademliaPeer,
    /// The bin (proximity order) it was admitted to.
    pub proximity_order: u8,
}

/// A peer has left the overlay.
#[derive(Debug, Clone)]
pub struct RemovedPeer {
    /// The peer that disconnected.
    pub peer: KademliaPeer,
}

/// The Kademlia routing table and peer pub/sub, as consumed by the core.
///
/// Implementations are expected to wrap a real routing table and peer
/// manager built on `vertex_net_topology::KademliaPeer` in production; see
/// [`test_support::InMemoryOverlay`] for the fixture used by this crate's
/// own tests.
pub trait Overlay: Send + Sync {
    /// The local node's own overlay address.
    fn base_address(&self) -> OverlayAddress;

    /// Invoke `consumer` once per bin whose proximity order is `>= min_po`,
    /// in descending proximity-order. `consumer` returns `false` to halt
    /// enumeration early.
    fn each_bin_descending(
        &self,
        base: OverlayAddress,
        min_po: u8,
        consumer: &mut dyn FnMut(Bin) -> bool,
    );

    /// As [`Self::each_bin_descending`], but only includes peers advertising
    /// `capability`. Returns an error if the overlay does not recognise the
    /// capability key.
    fn each_bin_descending_filtered(
        &self,
        base: OverlayAddress,
        capability: &str,
        min_po: u8,
        consumer: &mut dyn FnMut(Bin) -> bool,
    ) -> Result<(), LoadBalancerError>;

    /// Invoke `consumer` once per connected peer, in descending proximity
    /// order from `base`, up to `max_po`. `consumer` returns `false` to halt.
    fn each_connection(
        &self,
        base: OverlayAddress,
        max_po: u8,
        consumer: &mut dyn FnMut(&KademliaPeer) -> bool,
    );

    /// Subscribe to the overlay's peer-change notifications: one stream for
    /// admissions, one for departures.
    fn subscribe_peer_changes(
        &self,
    ) -> (broadcast::Receiver<AddedPeer>, broadcast::Receiver<RemovedPeer>);
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_support {
    //! An in-memory [`Overlay`] fixture for this crate's own tests.

    use std::collections::{HashMap, HashSet};

    use parking_lot::RwLock;

    use super::*;

    const EVENT_CHANNEL_CAPACITY: usize = 256;

    /// An in-memory overlay: bins are populated directly by the test, and
    /// `emit_added`/`emit_removed` drive the same broadcast channels a real
    /// overlay backend would use.
    pub struct InMemoryOverlay {
        base: OverlayAddress,
        bins: RwLock<HashMap<u8, Vec<KademliaPeer>>>,
        capabilities: RwLock<HashMap<OverlayAddress, HashSet<String>>>,
        known_capabilities: RwLock<HashSet<String>>,
        added_tx: broadcast::Sender<AddedPeer>,
        removed_tx: broadcast::Sender<RemovedPeer>,
        last_enumeration_base: RwLock<Option<OverlayAddress>>,
    }

    impl InMemoryOverlay {
        /// Create an empty overlay rooted at `base`.
        pub fn new(base: OverlayAddress) -> Self {
            let (added_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
            let (removed_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
            Self {
                base,
                bins: RwLock::new(HashMap::new()),
                capabilities: RwLock::new(HashMap::new()),
                known_capabilities: RwLock::new(HashSet::new()),
                added_tx,
                removed_tx,
                last_enumeration_base: RwLock::new(None),
            }
        }

        /// The `base` most recently passed to [`Overlay::each_bin_descending`]
        /// (or its filtered variant), for tests asserting a caller threaded
        /// its own base address through rather than the overlay's own.
        pub fn last_enumeration_base(&self) -> Option<OverlayAddress> {
            *self.last_enumeration_base.read()
        }

        /// Seed a peer into a bin without emitting an event (for setting up
        /// incumbents before the listener under test starts observing).
        pub fn seed(&self, proximity_order: u8, peer: KademliaPeer) {
            self.bins.write().entry(proximity_order).or_default().push(peer);
        }

        /// Declare a capability key as one the overlay understands, and
        /// advertise it for `peer`.
        pub fn advertise_capability(&self, peer: &OverlayAddress, capability: &str) {
            self.known_capabilities.write().insert(capability.to_string());
            self.capabilities
                .write()
                .entry(*peer)
                .or_default()
                .insert(capability.to_string());
        }

        /// Emit an `Added` event and update bin membership.
        pub fn emit_added(&self, peer: KademliaPeer, proximity_order: u8) {
            self.seed(proximity_order, peer.clone());
            let _ = self.added_tx.send(AddedPeer { peer, proximity_order });
        }

        /// Emit a `Removed` event and drop the peer from its bin.
        pub fn emit_removed(&self, peer: KademliaPeer) {
            let mut bins = self.bins.write();
            for members in bins.values_mut() {
                members.retain(|p| p.overlay != peer.overlay);
            }
            drop(bins);
            let _ = self.removed_tx.send(RemovedPeer { peer });
        }
    }

    impl Overlay for InMemoryOverlay {
        fn base_address(&self) -> OverlayAddress {
            self.base
        }

        fn each_bin_descending(
            &self,
            base: OverlayAddress,
            min_po: u8,
            consumer: &mut dyn FnMut(Bin) -> bool,
        ) {
            *self.last_enumeration_base.write() = Some(base);
            let bins = self.bins.read();
            let mut pos: Vec<u8> = bins.keys().copied().filter(|po| *po >= min_po).collect();
            pos.sort_unstable_by(|a, b| b.cmp(a));
            for po in pos {
                let peers = bins.get(&po).cloned().unwrap_or_default();
                if !consumer(Bin::new(po, peers)) {
                    break;
                }
            }
        }

        fn each_bin_descending_filtered(
            &self,
            base: OverlayAddress,
            capability: &str,
            min_po: u8,
            consumer: &mut dyn FnMut(Bin) -> bool,
        ) -> Result<(), LoadBalancerError> {
            if !self.known_capabilities.read().contains(capability) {
                return Err(LoadBalancerError::FilteredEnumerationFailure {
                    capability: capability.to_string(),
                });
            }
            let capabilities = self.capabilities.read();
            self.each_bin_descending(base, min_po, &mut |bin| {
                let po = bin.proximity_order();
                let filtered: Vec<KademliaPeer> = bin
                    .into_peers()
                    .into_iter()
                    .filter(|p| {
                        capabilities
                            .get(&p.overlay)
                            .is_some_and(|caps| caps.contains(capability))
                    })
                    .collect();
                consumer(Bin::new(po, filtered))
            });
            Ok(())
        }

        fn each_connection(
            &self,
            base: OverlayAddress,
            max_po: u8,
            consumer: &mut dyn FnMut(&KademliaPeer) -> bool,
        ) {
            use vertex_primitives::Distance;

            let bins = self.bins.read();
            let mut all: Vec<&KademliaPeer> = bins
                .iter()
                .filter(|(po, _)| **po <= max_po)
                .flat_map(|(_, peers)| peers.iter())
                .collect();
            all.sort_by(|a, b| base.distance_cmp(&a.overlay, &b.overlay).reverse());
            for peer in all {
                if !consumer(peer) {
                    break;
                }
            }
        }

        fn subscribe_peer_changes(
            &self,
        ) -> (broadcast::Receiver<AddedPeer>, broadcast::Receiver<RemovedPeer>) {
            (self.added_tx.subscribe(), self.removed_tx.subscribe())
        }
    }
}
