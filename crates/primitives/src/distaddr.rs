use alloy_primitives::{FixedBytes, U256};

use crate::HASH_SIZE;

// A distance address represents an address in Swarm space in the domain of nodes, or chunks, whereby
// the consumer needs to be aware of their topological distance between distance addresses.
pub type DistAddr = FixedBytes<HASH_SIZE>;

pub trait Distance {
    fn length(&self, y: &DistAddr) -> U256;
    fn raw(&self, y: &DistAddr) -> FixedBytes<HASH_SIZE>;
    fn distance_cmp(&self, x: &DistAddr, y: &DistAddr) -> std::cmp::Ordering;
}

impl Distance for DistAddr {
    // Measure the length of the distance between addresses `x` and `y` in Swarm space.
    fn length(&self, y: &DistAddr) -> U256 {
        U256::from_be_slice(self.raw(y).as_ref())
    }

    // Determine the bytes distance between addresses `x` and `y`.
    fn raw(&self, y: &DistAddr) -> FixedBytes<HASH_SIZE> {
        FixedBytes::from_slice(
            self.0
                .iter()
                .zip(y.0.iter())
                .map(|(a, b)| a ^ b)
                .collect::<Vec<u8>>()
                .as_slice(),
        )
    }

    // Compares the distances of `x` and `y` to `self` in terms of the distance metric defined in Swarm space.
    fn distance_cmp(&self, x: &DistAddr, y: &DistAddr) -> std::cmp::Ordering {
        for i in 0..HASH_SIZE {
            let dx = x[i] ^ self[i];
            let dy = y[i] ^ self[i];
            if dx == dy {
                continue;
            } else if dx < dy {
                return std::cmp::Ordering::Greater;
            }
            return std::cmp::Ordering::Less;
        }

        std::cmp::Ordering::Equal
    }
}
