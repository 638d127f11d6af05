//! Turns an `Overlay` bin snapshot into a ranked, usable bin.
//!
//! Each entry carries its own `on_use` callback rather than exposing the
//! use-count table directly, so a caller can mark a peer used without
//! knowing the table exists. The callback must close over its own peer's
//! address by value: building it inside a loop that instead captures a
//! shared loop variable would make every entry bump the last peer's count.

use std::collections::HashMap;
use std::sync::Arc;

use vertex_net_topology::KademliaPeer;
use vertex_primitives::OverlayAddress;

use crate::overlay::Bin;
use crate::table::UseCountTable;

/// A callback that records one use of the peer it was created for.
pub type UseCallback = Arc<dyn Fn() + Send + Sync>;

/// One peer in a ranked bin, along with the use count it was ranked by.
pub struct LbEntry {
    /// The peer handle.
    pub peer: KademliaPeer,
    /// The use count observed at ranking time. May be stale by the time
    /// the caller acts on it; `on_use` always increments the table's
    /// current value, not this snapshot.
    pub use_count: u64,
    on_use: UseCallback,
}

impl LbEntry {
    /// Record a use of this peer.
    pub fn mark_used(&self) {
        (self.on_use)();
    }
}

/// A bin's peers, ranked least-used first.
///
/// Ties keep the order the overlay enumerated them in, so two peers with
/// equal use counts don't reshuffle on every call.
pub struct LbBin {
    proximity_order: u8,
    entries: Vec<LbEntry>,
}

impl LbBin {
    /// The bin's proximity order.
    pub fn proximity_order(&self) -> u8 {
        self.proximity_order
    }

    /// Entries in the bin, least-used first.
    pub fn entries(&self) -> &[LbEntry] {
        &self.entries
    }

    /// Whether the bin has no peers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry with the lowest use count, if any.
    pub fn least_used(&self) -> Option<&LbEntry> {
        self.entries.first()
    }
}

/// Rank a raw overlay bin by each peer's current use count.
///
/// Delegates the actual ranking to [`UseCountTable::snapshot`], so ties
/// break the same way here as they would for any other caller of that
/// method: by the bin's own enumeration order. Peers with no entry in
/// `table` yet are treated as a use count of zero; the caller is expected
/// to have already awaited [`UseCountTable::wait`] for any peer it
/// specifically cares about, but ranking a whole bin should not block on
/// stragglers.
pub fn project_bin(bin: Bin, table: &Arc<UseCountTable>) -> LbBin {
    let proximity_order = bin.proximity_order();
    let peers = bin.into_peers();
    // Captured before the peers move into the lookup map: `HashMap`
    // iteration order is not the overlay's enumeration order, and
    // `snapshot`'s tie-break depends on the order `keys` is given in.
    let keys: Vec<OverlayAddress> = peers.iter().map(|peer| peer.overlay).collect();
    let mut peers_by_key: HashMap<OverlayAddress, KademliaPeer> =
        peers.into_iter().map(|peer| (peer.overlay, peer)).collect();

    let entries = table
        .snapshot(&keys)
        .into_iter()
        .map(|(key, use_count)| {
            let peer = peers_by_key
                .remove(&key)
                .expect("snapshot only ranks keys it was given");
            let table = Arc::clone(table);
            let on_use: UseCallback = Arc::new(move || {
                table.add(&key);
            });
            LbEntry { peer, use_count, on_use }
        })
        .collect();
    LbBin { proximity_order, entries }
}
