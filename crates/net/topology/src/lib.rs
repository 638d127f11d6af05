//! Swarm Kademlia peer representation.
//!
//! This crate organizes connected peers by their proximity order (PO) to the
//! local node's overlay address. It is the routing-table collaborator that
//! `vertex-net-loadbalancer` sits on top of: the load balancer consumes
//! [`kademlia::KademliaPeer`] peer handles and bin membership through its own
//! `Overlay` trait rather than depending on this crate's bin-management logic
//! directly (see that crate's `overlay.rs` for the boundary).
//!
//! # Proximity Order
//!
//! The proximity order between two addresses is the number of leading bits
//! they share. Peers sharing a PO form a bin.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod kademlia;

pub use kademlia::{KademliaPeer, PeerInfo, MAX_PO, NUM_BINS};
