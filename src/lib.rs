//! Bag-of-Cells codec and cell/bit-string/slice data model for the TON
//! blockchain.
//!
//! This crate implements the on-chain cell graph (`tvm::Cell`), its
//! bit-addressable buffer (`tvm::BitString`) and read cursor (`tvm::Slice`),
//! and the Bag of Cells wire format that serializes and deserializes cell
//! DAGs (`tvm::boc`).

pub mod crc;
pub mod error;
pub mod tvm;
pub mod utils;

pub use error::{CellError, CellResult};
pub use tvm::{
    base64_to_boc, boc_to_base64, boc_to_hex, deserialize_boc, deserialize_boc_single_root,
    hex_to_boc, serialize_boc, Address, BitString, Builder, Cell, CellBuilder, Slice,
    MAX_CELL_BITS, MAX_CELL_LEVEL, MAX_CELL_REFS,
};
