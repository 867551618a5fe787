//! Cell implementation for the TON blockchain.
//!
//! A cell is a fundamental data structure in TON that can store up to 1023
//! bits of data and maintain up to 4 references to other cells.

use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};

use crate::error::{CellError, CellResult};
use crate::tvm::bitstring::BitString;

/// Maximum number of bits a cell can store.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can have.
pub const MAX_CELL_REFS: usize = 4;

/// Cell level range (0-3).
pub const MAX_CELL_LEVEL: u8 = 3;

/// A cell: up to 1023 bits of data, up to 4 child references, and an
/// is-exotic flag. Identity (`hash()`) is a pure function of content.
#[derive(Debug, Clone)]
pub struct Cell {
    bits: BitString,
    references: Vec<Arc<Cell>>,
    is_exotic: bool,
    hash: OnceLock<[u8; 32]>,
}

impl Cell {
    /// Creates a new empty cell.
    pub fn new() -> Self {
        Self::from_bitstring(BitString::new(MAX_CELL_BITS))
    }

    pub(crate) fn from_bitstring(bits: BitString) -> Self {
        Self {
            bits,
            references: Vec::new(),
            is_exotic: false,
            hash: OnceLock::new(),
        }
    }

    pub(crate) fn from_bitstring_exotic(bits: BitString, is_exotic: bool) -> Self {
        let mut cell = Self::from_bitstring(bits);
        cell.is_exotic = is_exotic;
        cell
    }

    /// Creates a cell holding `bit_len` bits read MSB-first out of `data`.
    pub fn with_data(data: &[u8], bit_len: usize) -> CellResult<Self> {
        if bit_len > MAX_CELL_BITS {
            return Err(CellError::CapacityOverflow(format!(
                "cell bit length {bit_len} exceeds maximum {MAX_CELL_BITS}"
            )));
        }
        let mut bits = BitString::new(MAX_CELL_BITS);
        bits.write_raw_bits(data, bit_len)?;
        Ok(Self::from_bitstring(bits))
    }

    /// Adds a reference to another cell. Invalidates the cached hash.
    pub fn add_reference(&mut self, cell: Arc<Cell>) -> CellResult<()> {
        if self.references.len() >= MAX_CELL_REFS {
            return Err(CellError::CapacityOverflow(format!(
                "cell already has the maximum of {MAX_CELL_REFS} references"
            )));
        }
        self.references.push(cell);
        self.hash = OnceLock::new();
        Ok(())
    }

    /// Marks this cell as exotic. Invalidates the cached hash.
    pub fn mark_exotic(&mut self) {
        self.is_exotic = true;
        self.hash = OnceLock::new();
    }

    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    /// Raw data bytes, top-upped (Fift-style padded) if the bit length isn't
    /// byte-aligned.
    pub fn data(&self) -> Vec<u8> {
        self.bits.get_top_upped_array()
    }

    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    pub fn is_exotic(&self) -> bool {
        self.is_exotic
    }

    /// `0` for a leaf; otherwise `1 + max(child depth)`.
    pub fn get_max_depth(&self) -> u16 {
        self.references
            .iter()
            .map(|r| r.get_max_depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// `max(child level)`; `0` for a leaf. Ordinary cells never set their own
    /// level — only exotic cells (pruned branches, out of scope here) would.
    pub fn get_max_level(&self) -> u8 {
        self.references
            .iter()
            .map(|r| r.get_max_level())
            .max()
            .unwrap_or(0)
    }

    /// `d1, d2`: the refs-count/exotic/level byte, and the bit-length byte.
    pub fn descriptors(&self) -> [u8; 2] {
        let d1 = self.references.len() as u8
            + if self.is_exotic { 8 } else { 0 }
            + 32 * self.get_max_level();
        let bit_len = self.bits.len();
        let d2 = (bit_len / 8 + bit_len.div_ceil(8)) as u8;
        [d1, d2]
    }

    /// The canonical pre-image hashed to produce [`hash`](Self::hash).
    pub fn repr(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.descriptors());
        out.extend_from_slice(&self.bits.get_top_upped_array());
        for reference in &self.references {
            out.extend_from_slice(&reference.get_max_depth().to_be_bytes());
        }
        for reference in &self.references {
            out.extend_from_slice(&reference.hash());
        }
        out
    }

    /// SHA-256 of [`repr`](Self::repr). Cached lazily; the cache is reset by
    /// any mutation.
    pub fn hash(&self) -> [u8; 32] {
        *self.hash.get_or_init(|| {
            let mut hasher = Sha256::new();
            hasher.update(self.repr());
            let digest = hasher.finalize();
            let mut out = [0u8; 32];
            out.copy_from_slice(&digest);
            out
        })
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}
impl Eq for Cell {}

/// Low-level builder for constructing cells.
///
/// This is the core, minimal builder that provides basic bit/byte operations.
/// For a higher-level API with TON-specific convenience methods, see
/// [`Builder`](crate::tvm::Builder).
///
/// # When to use CellBuilder
///
/// - Implementing low-level TLB serialization/deserialization
/// - Performance-critical code where minimal overhead is needed
/// - When you only need basic bit/byte operations
///
/// # When to use Builder instead
///
/// - Building messages, transactions, or other TON structures
/// - When you need convenience methods for addresses, coins, strings, etc.
/// - Application-level code where readability is important
pub struct CellBuilder {
    bits: BitString,
    references: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self {
            bits: BitString::new(MAX_CELL_BITS),
            references: Vec::new(),
        }
    }

    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    pub fn bits_mut(&mut self) -> &mut BitString {
        &mut self.bits
    }

    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.bits.write_bit(bit)?;
        Ok(self)
    }

    pub fn store_bits(&mut self, bits: &[u8], bit_len: usize) -> CellResult<&mut Self> {
        self.bits.write_raw_bits(bits, bit_len)?;
        Ok(self)
    }

    pub fn store_byte(&mut self, byte: u8) -> CellResult<&mut Self> {
        self.store_bits(&[byte], 8)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.store_bits(bytes, bytes.len() * 8)
    }

    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.store_bits(&value.to_be_bytes(), 32)
    }

    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.store_bits(&value.to_be_bytes(), 64)
    }

    /// Stores the `bits` least-significant bits of a 64-bit value, big-endian.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::OutOfRange(
                "cannot store more than 64 bits from a u64".into(),
            ));
        }
        self.bits
            .write_uint(&num_bigint::BigUint::from(value), bits)?;
        Ok(self)
    }

    pub fn store_reference(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        if self.references.len() >= MAX_CELL_REFS {
            return Err(CellError::CapacityOverflow(format!(
                "cannot add reference: maximum {MAX_CELL_REFS} references allowed"
            )));
        }
        self.references.push(cell);
        Ok(self)
    }

    pub fn build(self) -> CellResult<Arc<Cell>> {
        let mut cell = Cell::from_bitstring(self.bits);
        for reference in self.references {
            cell.add_reference(reference)?;
        }
        Ok(Arc::new(cell))
    }
}

impl Default for CellBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell() {
        let cell = Cell::new();
        assert_eq!(cell.bit_len(), 0);
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(cell.get_max_level(), 0);
        assert!(!cell.is_exotic());
    }

    #[test]
    fn test_cell_with_data() {
        let data = vec![0x0F];
        let cell = Cell::with_data(&data, 8).unwrap();
        assert_eq!(cell.bit_len(), 8);
        assert_eq!(cell.data()[0], 0x0F);
    }

    #[test]
    fn test_cell_builder() {
        let mut builder = CellBuilder::new();
        builder.store_byte(0xFF).unwrap();
        builder.store_u32(0x12345678).unwrap();

        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 40); // 8 + 32 bits
    }

    #[test]
    fn test_cell_builder_tracks_bit_len_and_refs() {
        let mut builder = CellBuilder::new();
        assert_eq!(builder.bit_len(), 0);
        assert_eq!(builder.ref_count(), 0);
        builder.store_u32(1).unwrap();
        let leaf = CellBuilder::new().build().unwrap();
        builder.store_reference(leaf).unwrap();
        assert_eq!(builder.bit_len(), 32);
        assert_eq!(builder.ref_count(), 1);
    }

    #[test]
    fn test_cell_hash() {
        // Empty cell: repr is just descriptors `00 00`, no refs.
        let cell = Cell::new();
        let hash = cell.hash();
        let expected: [u8; 32] = Sha256::digest([0u8, 0u8]).into();
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_hash_is_cached_and_content_addressed() {
        let a = Cell::new();
        let b = Cell::new();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash(), a.hash());
    }

    #[test]
    fn test_mutation_invalidates_cached_hash() {
        let mut cell = CellBuilder::new().build().unwrap();
        let empty_hash = cell.hash();
        let mut builder = CellBuilder::new();
        builder.store_byte(0xAB).unwrap();
        let child = builder.build().unwrap();
        Arc::get_mut(&mut cell).unwrap().add_reference(child).unwrap();
        assert_ne!(empty_hash, cell.hash());
    }

    #[test]
    fn test_refs_overflow() {
        let mut builder = CellBuilder::new();
        for _ in 0..MAX_CELL_REFS {
            let leaf = CellBuilder::new().build().unwrap();
            builder.store_reference(leaf).unwrap();
        }
        let leaf = CellBuilder::new().build().unwrap();
        assert!(builder.store_reference(leaf).is_err());
    }
}
