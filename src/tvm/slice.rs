//! Slice implementation for reading data from cells.
//!
//! A Slice provides a way to read data from a Cell sequentially, tracking the
//! current position in both bits and references.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use std::sync::Arc;

use crate::error::{CellError, CellResult};
use crate::tvm::address::Address;
use crate::tvm::bitstring::BitString;
use crate::tvm::cell::Cell;

/// A read-only cursor over a cell's bits and references.
#[derive(Debug, Clone)]
pub struct Slice {
    cell: Arc<Cell>,
    bit_pos: usize,
    ref_pos: usize,
}

impl Slice {
    pub fn new(cell: Arc<Cell>) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len().saturating_sub(self.bit_pos)
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.reference_count().saturating_sub(self.ref_pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    pub fn load_bit(&mut self) -> CellResult<bool> {
        if self.remaining_bits() == 0 {
            return Err(CellError::Malformed("no more bits to read".into()));
        }
        let bit = self.cell.bits().get_bit(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    /// Reads `n` bits into a fresh [`BitString`].
    pub fn load_bits(&mut self, n: usize) -> CellResult<BitString> {
        if n > self.remaining_bits() {
            return Err(CellError::Malformed(format!(
                "not enough bits remaining: requested {n}, available {}",
                self.remaining_bits()
            )));
        }
        let mut out = BitString::new(n);
        for _ in 0..n {
            let bit = self.load_bit()?;
            out.write_bit(bit)?;
        }
        Ok(out)
    }

    pub fn load_byte(&mut self) -> CellResult<u8> {
        Ok(self.load_bits(8)?.as_bytes()[0])
    }

    pub fn load_bytes(&mut self, n: usize) -> CellResult<Vec<u8>> {
        Ok(self.load_bits(n * 8)?.as_bytes().to_vec())
    }

    /// Reads `bits` bits as an arbitrary-precision unsigned integer.
    pub fn load_uint(&mut self, bits: usize) -> CellResult<BigUint> {
        if bits == 0 {
            return Ok(BigUint::zero());
        }
        if bits > self.remaining_bits() {
            return Err(CellError::Malformed(format!(
                "not enough bits remaining: requested {bits}, available {}",
                self.remaining_bits()
            )));
        }
        let mut value = BigUint::zero();
        for _ in 0..bits {
            value <<= 1u32;
            if self.load_bit()? {
                value |= BigUint::from(1u8);
            }
        }
        Ok(value)
    }

    /// Reads `bits` bits as an arbitrary-precision signed integer (inverse of
    /// [`BitString::write_int`]).
    pub fn load_int(&mut self, bits: usize) -> CellResult<BigInt> {
        if bits == 0 {
            return Err(CellError::OutOfRange(
                "signed read requires width >= 1".into(),
            ));
        }
        if bits == 1 {
            return Ok(if self.load_bit()? {
                BigInt::from(-1)
            } else {
                BigInt::zero()
            });
        }
        let negative = self.load_bit()?;
        let magnitude = self.load_uint(bits - 1)?;
        if negative {
            let bound = BigInt::from(1) << (bits - 1);
            Ok(BigInt::from_biguint(Sign::Plus, magnitude) - bound)
        } else {
            Ok(BigInt::from_biguint(Sign::Plus, magnitude))
        }
    }

    pub fn load_u16(&mut self) -> CellResult<u16> {
        let bytes = self.load_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn load_u32(&mut self) -> CellResult<u32> {
        let bytes = self.load_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn load_u64(&mut self) -> CellResult<u64> {
        let bytes = self.load_bytes(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
    }

    /// Reads a length-prefixed unsigned integer: `length_bits` bits of byte
    /// length, then that many bytes of magnitude.
    pub fn load_var_uint(&mut self, length_bits: usize) -> CellResult<BigUint> {
        let byte_len = self
            .load_uint(length_bits)?
            .to_usize()
            .ok_or_else(|| CellError::Malformed("VarUInteger length field overflowed".into()))?;
        if byte_len == 0 {
            return Ok(BigUint::zero());
        }
        self.load_uint(byte_len * 8)
    }

    /// Reads a `Grams`/`Coins` amount (`VarUInteger 16`).
    pub fn load_coins(&mut self) -> CellResult<BigUint> {
        self.load_var_uint(4)
    }

    /// Reads `addr_none$00` / `addr_std$10`; rejects anycast and any other tag.
    pub fn load_address(&mut self) -> CellResult<Option<Address>> {
        let tag = self.load_uint(2)?;
        match tag.to_u8() {
            Some(0) => Ok(None),
            Some(2) => {
                let has_anycast = self.load_bit()?;
                if has_anycast {
                    return Err(CellError::Unsupported(
                        "anycast addresses are not supported".into(),
                    ));
                }
                let workchain = self
                    .load_int(8)?
                    .to_i8()
                    .ok_or_else(|| CellError::Malformed("workchain out of i8 range".into()))?;
                let hash_bits = self.load_bits(256)?;
                let mut hash = [0u8; 32];
                hash.copy_from_slice(hash_bits.as_bytes());
                Ok(Some(Address::new(workchain, hash)))
            }
            _ => Err(CellError::Unsupported(format!(
                "unsupported address tag {:?}",
                tag
            ))),
        }
    }

    pub fn load_ref(&mut self) -> CellResult<Arc<Cell>> {
        if self.remaining_refs() == 0 {
            return Err(CellError::Malformed("no more references to read".into()));
        }
        let reference = self
            .cell
            .reference(self.ref_pos)
            .expect("remaining_refs() > 0 guarantees this index exists")
            .clone();
        self.ref_pos += 1;
        Ok(reference)
    }

    pub fn preload_ref(&self, index: usize) -> CellResult<Arc<Cell>> {
        let actual_index = self.ref_pos + index;
        self.cell
            .reference(actual_index)
            .cloned()
            .ok_or_else(|| {
                CellError::Malformed(format!("no reference at index {actual_index}"))
            })
    }

    pub fn skip_bits(&mut self, n: usize) -> CellResult<()> {
        if n > self.remaining_bits() {
            return Err(CellError::Malformed(format!(
                "cannot skip {n} bits: only {} remaining",
                self.remaining_bits()
            )));
        }
        self.bit_pos += n;
        Ok(())
    }

    pub fn skip_refs(&mut self, n: usize) -> CellResult<()> {
        if n > self.remaining_refs() {
            return Err(CellError::Malformed(format!(
                "cannot skip {n} references: only {} remaining",
                self.remaining_refs()
            )));
        }
        self.ref_pos += n;
        Ok(())
    }

    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    pub fn ref_position(&self) -> usize {
        self.ref_pos
    }

    pub fn clone_from_current(&self) -> Self {
        self.clone()
    }

    pub fn load_remaining_bits(&mut self) -> CellResult<BitString> {
        self.load_bits(self.remaining_bits())
    }

    pub fn load_remaining_refs(&mut self) -> CellResult<Vec<Arc<Cell>>> {
        let mut refs = Vec::new();
        while self.remaining_refs() > 0 {
            refs.push(self.load_ref()?);
        }
        Ok(refs)
    }
}

impl From<Arc<Cell>> for Slice {
    fn from(cell: Arc<Cell>) -> Self {
        Self::new(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvm::cell::CellBuilder;

    #[test]
    fn test_slice_load_bits() {
        let mut builder = CellBuilder::new();
        builder.store_byte(0xFF).unwrap();
        builder.store_byte(0x00).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        assert_eq!(slice.remaining_bits(), 16);

        assert_eq!(slice.load_byte().unwrap(), 0xFF);
        assert_eq!(slice.remaining_bits(), 8);
        assert_eq!(slice.load_byte().unwrap(), 0x00);
        assert_eq!(slice.remaining_bits(), 0);
    }

    #[test]
    fn test_slice_load_uint_wide() {
        let value = BigUint::from(u128::MAX) + BigUint::from(1u8);
        let mut bits = BitString::new(129);
        bits.write_uint(&value, 129).unwrap();
        let cell = Arc::new(Cell::from_bitstring(bits));

        let mut slice = Slice::new(cell);
        let read_back = slice.load_uint(129).unwrap();
        assert_eq!(read_back, value);
    }

    #[test]
    fn test_slice_load_reference() {
        let ref_cell = CellBuilder::new().build().unwrap();

        let mut builder = CellBuilder::new();
        builder.store_reference(ref_cell).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        assert_eq!(slice.remaining_refs(), 1);
        let _loaded = slice.load_ref().unwrap();
        assert_eq!(slice.remaining_refs(), 0);
    }

    #[test]
    fn test_signed_round_trip_negative() {
        let mut bits = BitString::new(16);
        bits.write_int(&BigInt::from(-5), 16).unwrap();
        let cell = Arc::new(Cell::from_bitstring(bits));
        let mut slice = Slice::new(cell);
        assert_eq!(slice.load_int(16).unwrap(), BigInt::from(-5));
    }

    #[test]
    fn test_load_address_none() {
        let mut builder = CellBuilder::new();
        builder.store_bit(false).unwrap();
        builder.store_bit(false).unwrap();
        let cell = builder.build().unwrap();
        let mut slice = Slice::new(cell);
        assert_eq!(slice.load_address().unwrap(), None);
    }
}
