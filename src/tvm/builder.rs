//! Enhanced Builder for constructing cells with convenient methods.
//!
//! This module provides a high-level builder (`Builder`) that wraps the
//! low-level `CellBuilder` with additional convenience methods for common TON
//! operations.
//!
//! # Builder vs CellBuilder
//!
//! - **`CellBuilder`** (in `cell.rs`): Low-level, minimal API for basic
//!   bit/byte operations. Used internally and for performance-critical code.
//!
//! - **`Builder`** (this module): High-level wrapper with TON-specific
//!   convenience methods like `store_address()`, `store_coins()`,
//!   `store_snake_string()`, etc. Recommended for application code.
//!
//! # Examples
//!
//! ```rust
//! use ton_cells::tvm::{Builder, Address};
//!
//! let mut builder = Builder::new();
//! let addr = Address::new(0, [0u8; 32]);
//! builder.store_address(Some(&addr)).unwrap();
//! builder.store_coins(&1_000_000_000u64.into()).unwrap();
//! builder.store_string("Hello, TON!").unwrap();
//! let cell = builder.build().unwrap();
//! ```

use num_bigint::{BigInt, BigUint};
use std::sync::Arc;

use crate::error::{CellError, CellResult};
use crate::tvm::address::Address;
use crate::tvm::cell::{Cell, CellBuilder, MAX_CELL_BITS, MAX_CELL_REFS};
use crate::tvm::slice::Slice;

/// Extended builder with convenience methods.
pub struct Builder {
    inner: CellBuilder,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            inner: CellBuilder::new(),
        }
    }

    pub fn bit_len(&self) -> usize {
        self.inner.bit_len()
    }

    pub fn available_bits(&self) -> usize {
        MAX_CELL_BITS - self.bit_len()
    }

    pub fn available_bytes(&self) -> usize {
        self.available_bits() / 8
    }

    pub fn ref_count(&self) -> usize {
        self.inner.ref_count()
    }

    pub fn available_refs(&self) -> usize {
        MAX_CELL_REFS - self.ref_count()
    }

    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.inner.store_bit(bit)?;
        Ok(self)
    }

    pub fn store_bits(&mut self, bits: &[u8], bit_len: usize) -> CellResult<&mut Self> {
        self.inner.store_bits(bits, bit_len)?;
        Ok(self)
    }

    pub fn store_byte(&mut self, byte: u8) -> CellResult<&mut Self> {
        self.inner.store_byte(byte)?;
        Ok(self)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.inner.store_bytes(bytes)?;
        Ok(self)
    }

    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.inner.store_u32(value)?;
        Ok(self)
    }

    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.inner.store_u64(value)?;
        Ok(self)
    }

    /// Stores an arbitrary-width unsigned integer.
    pub fn store_uint<T: Into<BigUint>>(&mut self, value: T, bits: usize) -> CellResult<&mut Self> {
        self.inner.bits_mut().write_uint(&value.into(), bits)?;
        Ok(self)
    }

    /// Stores an arbitrary-width signed integer.
    pub fn store_int<T: Into<BigInt>>(&mut self, value: T, bits: usize) -> CellResult<&mut Self> {
        self.inner.bits_mut().write_int(&value.into(), bits)?;
        Ok(self)
    }

    pub fn store_bool(&mut self, value: bool) -> CellResult<&mut Self> {
        self.store_bit(value)
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        self.inner.store_reference(cell)?;
        Ok(self)
    }

    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> CellResult<&mut Self> {
        match cell {
            Some(c) => {
                self.store_bit(true)?;
                self.store_ref(c)?;
            }
            None => {
                self.store_bit(false)?;
            }
        }
        Ok(self)
    }

    /// Stores the contents (data + references) of another cell.
    pub fn store_cell(&mut self, cell: &Arc<Cell>) -> CellResult<&mut Self> {
        if self.ref_count() + cell.reference_count() > MAX_CELL_REFS {
            return Err(CellError::CapacityOverflow("builder refs overflow".into()));
        }
        self.store_bits(&cell.data(), cell.bit_len())?;
        for reference in cell.references() {
            self.store_ref(reference.clone())?;
        }
        Ok(self)
    }

    /// Stores the remainder of a slice (data + references).
    pub fn store_slice(&mut self, slice: &Slice) -> CellResult<&mut Self> {
        let mut cursor = slice.clone_from_current();
        let remaining_bits = cursor.remaining_bits();
        if remaining_bits > 0 {
            let bits = cursor.load_bits(remaining_bits)?;
            self.store_bits(bits.as_bytes(), remaining_bits)?;
        }
        while cursor.remaining_refs() > 0 {
            self.store_ref(cursor.load_ref()?)?;
        }
        Ok(self)
    }

    /// Stores a length-prefixed unsigned integer (`VarUInteger`).
    pub fn store_var_uint(&mut self, value: &BigUint, length_bits: usize) -> CellResult<&mut Self> {
        self.inner.bits_mut().write_var_uint(value, length_bits)?;
        Ok(self)
    }

    /// Stores coins (`VarUInteger 16`).
    pub fn store_coins(&mut self, amount: &BigUint) -> CellResult<&mut Self> {
        self.inner.bits_mut().write_grams(amount)?;
        Ok(self)
    }

    pub fn store_string(&mut self, s: &str) -> CellResult<&mut Self> {
        let bytes = s.as_bytes();
        if bytes.len() > 127 {
            return Err(CellError::OutOfRange(
                "string too long, use store_snake_string for longer strings".into(),
            ));
        }
        self.store_bytes(bytes)
    }

    /// Stores a string using snake encoding (splits across references for
    /// strings too long to fit in one cell).
    pub fn store_snake_string(&mut self, s: &str, with_prefix: bool) -> CellResult<&mut Self> {
        let mut bytes = s.as_bytes().to_vec();
        if with_prefix {
            bytes.insert(0, 0x00);
        }
        self.store_snake_bytes(&bytes)
    }

    pub fn store_snake_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        if bytes.is_empty() {
            return Ok(self);
        }

        let available = self.available_bytes();
        if bytes.len() <= available {
            return self.store_bytes(bytes);
        }

        self.store_bytes(&bytes[..available])?;

        let mut next_builder = Builder::new();
        next_builder.store_snake_bytes(&bytes[available..])?;
        self.store_ref(next_builder.build()?)?;

        Ok(self)
    }

    /// Stores a TON address (`addr_none$00` / `addr_std$10`).
    pub fn store_address(&mut self, address: Option<&Address>) -> CellResult<&mut Self> {
        match address {
            None => self.inner.bits_mut().write_address(None)?,
            Some(addr) => self
                .inner
                .bits_mut()
                .write_address(Some((addr.workchain, &addr.hash)))?,
        }
        Ok(self)
    }

    /// Stores a dictionary root (as an optional reference). Dictionary body
    /// semantics are not interpreted.
    pub fn store_dict(&mut self, dict: Option<Arc<Cell>>) -> CellResult<&mut Self> {
        self.store_maybe_ref(dict)
    }

    pub fn build(self) -> CellResult<Arc<Cell>> {
        self.inner.build()
    }

    pub fn end_cell(self) -> CellResult<Arc<Cell>> {
        self.build()
    }

    pub fn to_slice(self) -> CellResult<Slice> {
        let cell = self.build()?;
        Ok(Slice::new(cell))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let mut builder = Builder::new();
        builder.store_u32(0x12345678).unwrap();
        builder.store_byte(0xFF).unwrap();

        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 40);
    }

    #[test]
    fn test_builder_address() {
        let addr = Address::new(0, [0u8; 32]);
        let mut builder = Builder::new();
        builder.store_address(Some(&addr)).unwrap();

        let cell = builder.build().unwrap();
        // 2 bits (addr_std) + 1 bit (no anycast) + 8 bits (workchain) + 256 bits (hash) = 267 bits
        assert_eq!(cell.bit_len(), 267);
    }

    #[test]
    fn test_builder_coins() {
        let mut builder = Builder::new();
        builder.store_coins(&BigUint::from(1_000_000_000u64)).unwrap();

        let cell = builder.build().unwrap();
        assert!(cell.bit_len() > 0);
    }

    #[test]
    fn test_builder_coins_zero() {
        let mut builder = Builder::new();
        builder.store_coins(&BigUint::from(0u64)).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 4);
    }

    #[test]
    fn test_builder_string() {
        let mut builder = Builder::new();
        builder.store_string("Hello, TON!").unwrap();

        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 11 * 8);
    }

    #[test]
    fn test_builder_snake_string() {
        let long_string = "a".repeat(200);
        let mut builder = Builder::new();
        builder.store_snake_string(&long_string, false).unwrap();

        let cell = builder.build().unwrap();
        assert!(cell.reference_count() > 0);
    }

    #[test]
    fn test_builder_refs_overflow_via_store_cell() {
        let mut inner = Builder::new();
        for _ in 0..MAX_CELL_REFS {
            inner.store_ref(Builder::new().build().unwrap()).unwrap();
        }
        let full_cell = inner.build().unwrap();

        let mut outer = Builder::new();
        outer.store_ref(Builder::new().build().unwrap()).unwrap();
        assert!(outer.store_cell(&full_cell).is_err());
    }
}
