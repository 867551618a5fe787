//! On-chain TON address representation.
//!
//! This is deliberately minimal: the `addr_std` form a cell actually carries
//! (workchain + 256-bit hash). User-friendly base64/CRC16/bounceable string
//! formats are a presentation-layer concern handled elsewhere.

use std::fmt;

/// An `addr_std` TON address: workchain id plus the 256-bit account hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    /// Workchain ID (-1 for masterchain, 0 for basechain).
    pub workchain: i8,
    /// 32-byte hash part of the address.
    pub hash: [u8; 32],
}

impl Address {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}
