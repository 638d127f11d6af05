//! Overlay-address primitives shared across the Swarm networking crates.
//!
//! This crate contains just the pieces `vertex-net-topology` and
//! `vertex-net-loadbalancer` need: the fixed-length overlay address type,
//! XOR distance comparison, and proximity-order calculation.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

const HASH_SIZE: usize = 32;

/// Maximum proximity order for standard routing: bins 0..=31.
pub const MAX_PO: u8 = 31;
const EXTENDED_PO: u8 = MAX_PO + 5;

pub mod distaddr;
pub mod proximity;

pub use distaddr::{DistAddr, Distance};

/// A peer's position in Swarm space.
///
/// Two peers share the same key iff they share the same overlay address;
/// proximity order and XOR distance are both defined over this type.
pub type OverlayAddress = DistAddr;
