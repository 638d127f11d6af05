//! Swarm Kademlia peer representation.
//!
//! # Proximity Order
//!
//! The proximity order between two addresses is the number of leading bits they
//! share. For example:
//! - PO 0: First bit differs (addresses in different halves of the address space)
//! - PO 8: First 8 bits match
//! - PO 31: Maximum PO for standard routing (capped)
//!
//! Proximity is calculated by `vertex_primitives::proximity::proximity()`.
//!
//! # Bins
//!
//! Peers are organized into bins by their proximity order. Bin N contains peers
//! with PO = N to the local address.
//!
//! This crate carries the peer handle type ([`KademliaPeer`]) that bin
//! management is built around, not a bin-management engine itself: building
//! and balancing the routing table is the responsibility of collaborator
//! crates (e.g. `vertex-net-loadbalancer`), which consume this type through
//! their own narrower traits rather than reaching into a table
//! implementation directly.

mod peer;

pub use peer::{KademliaPeer, PeerInfo};

/// Maximum proximity order for standard routing.
///
/// This caps the PO at 31, meaning bins 0-31 are used for routing. Re-exported
/// from `vertex_primitives`, which owns the proximity calculation this bounds.
pub use vertex_primitives::MAX_PO;

/// Number of bins in the routing table (MAX_PO + 1).
pub const NUM_BINS: usize = (MAX_PO as usize) + 1;
