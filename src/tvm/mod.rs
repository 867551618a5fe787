//! TVM (TON Virtual Machine) data structures and utilities.
//!
//! Implementations of the fundamental TON on-chain data structures:
//! - `BitString`: a bit-addressable buffer with cursor tracking.
//! - `Cell`: up to 1023 bits of data plus up to 4 references to other cells.
//! - `Slice`: a read-only cursor over a cell, used for parsing.
//! - `Builder`/`CellBuilder`: construction helpers for cells.
//! - `Address`: the on-chain `addr_std` representation.
//! - BoC: the Bag of Cells wire format tying all of the above together.

pub mod address;
pub mod bitstring;
pub mod boc;
pub mod builder;
pub mod cell;
pub mod slice;
#[cfg(test)]
pub mod tests;

pub use address::Address;
pub use bitstring::BitString;
pub use boc::{
    base64_to_boc, boc_to_base64, boc_to_hex, deserialize_boc, deserialize_boc_single_root,
    hex_to_boc, serialize_boc,
};
pub use builder::Builder;
pub use cell::{Cell, CellBuilder, MAX_CELL_BITS, MAX_CELL_LEVEL, MAX_CELL_REFS};
pub use slice::Slice;
