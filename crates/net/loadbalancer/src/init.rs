//! Deciding where a newly admitted peer's use count starts.
//!
//! A fresh peer with a use count of zero would always win "least used"
//! selection until every incumbent caught up, starving the rest of the bin
//! of traffic in the meantime. Both policies here instead seed the
//! newcomer's count from an existing peer's, so it enters the rotation
//! roughly where its neighbours already are.

use vertex_primitives::{OverlayAddress, MAX_PO};

use crate::overlay::Overlay;
use crate::table::UseCountTable;

/// How to pick a newly admitted peer's starting use count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPolicy {
    /// Use the lowest count among the peer's bin-mates (other peers at the
    /// same proximity order). Keeps a freshly saturated bin's traffic
    /// spread evenly rather than funnelling it all to the newcomer.
    LeastUsedInBin,
    /// Use the count of the single connected peer closest to the newcomer
    /// in overlay space, regardless of bin. Useful when bins are usually
    /// thin and "bin-mates" would often be empty.
    MostSimilarPeer,
}

impl InitPolicy {
    /// Compute the initial use count for `new_peer`, newly admitted at
    /// `proximity_order`.
    pub fn initial_count(
        self,
        overlay: &dyn Overlay,
        table: &UseCountTable,
        new_peer: &OverlayAddress,
        proximity_order: u8,
    ) -> u64 {
        match self {
            InitPolicy::LeastUsedInBin => {
                let mut result = 0;
                overlay.each_bin_descending(
                    overlay.base_address(),
                    proximity_order,
                    &mut |bin| {
                        if bin.proximity_order() > proximity_order {
                            return true;
                        }
                        result = bin
                            .peers()
                            .filter(|p| &p.overlay != new_peer)
                            .map(|p| table.get(&p.overlay))
                            .min()
                            .unwrap_or(0);
                        false
                    },
                );
                result
            }
            InitPolicy::MostSimilarPeer => {
                let mut result = 0;
                overlay.each_connection(*new_peer, MAX_PO, &mut |peer| {
                    if &peer.overlay == new_peer {
                        return true;
                    }
                    result = table.get(&peer.overlay);
                    false
                });
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::test_support::InMemoryOverlay;
    use vertex_net_topology::KademliaPeer;

    fn addr(byte: u8) -> OverlayAddress {
        OverlayAddress::repeat_byte(byte)
    }

    #[test]
    fn least_used_in_bin_picks_the_lowest_incumbent_count() {
        let local = addr(0);
        let overlay = InMemoryOverlay::new(local);
        let table = UseCountTable::new();

        let incumbents = [addr(10), addr(11), addr(12)];
        let counts = [7u64, 2u64, 9u64];
        for (peer, count) in incumbents.iter().zip(counts) {
            overlay.seed(5, KademliaPeer::new(*peer));
            table.init(*peer, count);
        }

        let newcomer = addr(13);
        overlay.seed(5, KademliaPeer::new(newcomer));

        let initial = InitPolicy::LeastUsedInBin.initial_count(&overlay, &table, &newcomer, 5);
        assert_eq!(initial, 2);
    }

    #[test]
    fn least_used_in_bin_with_no_incumbents_starts_at_zero() {
        let local = addr(0);
        let overlay = InMemoryOverlay::new(local);
        let table = UseCountTable::new();

        let newcomer = addr(20);
        overlay.seed(9, KademliaPeer::new(newcomer));

        let initial = InitPolicy::LeastUsedInBin.initial_count(&overlay, &table, &newcomer, 9);
        assert_eq!(initial, 0);
    }

    #[test]
    fn least_used_in_bin_skips_higher_proximity_order_bins() {
        let local = addr(0);
        let overlay = InMemoryOverlay::new(local);
        let table = UseCountTable::new();

        // A higher-po bin exists, but the newcomer lives at po 5: the
        // higher bin must not be mistaken for the newcomer's own.
        let closer = addr(1);
        overlay.seed(20, KademliaPeer::new(closer));
        table.init(closer, 1000);

        let bin_mate = addr(14);
        overlay.seed(5, KademliaPeer::new(bin_mate));
        table.init(bin_mate, 4);

        let newcomer = addr(13);
        overlay.seed(5, KademliaPeer::new(newcomer));

        let initial = InitPolicy::LeastUsedInBin.initial_count(&overlay, &table, &newcomer, 5);
        assert_eq!(initial, 4);
    }

    #[test]
    fn most_similar_peer_uses_the_closest_connections_count() {
        let local = addr(0);
        let overlay = InMemoryOverlay::new(local);
        let table = UseCountTable::new();

        let far = addr(0b1000_0000);
        let near = addr(0b0000_0001);
        overlay.seed(0, KademliaPeer::new(far));
        overlay.seed(7, KademliaPeer::new(near));
        table.init(far, 50);
        table.init(near, 6);

        let newcomer = addr(0b0000_0010);
        overlay.seed(6, KademliaPeer::new(newcomer));

        let initial = InitPolicy::MostSimilarPeer.initial_count(&overlay, &table, &newcomer, 6);
        assert_eq!(initial, 6);
    }
}
