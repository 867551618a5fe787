//! A fixed-capacity, cursor-tracked, most-significant-bit-first bit buffer.
//!
//! This is the low-level encoder/decoder primitive underneath [`Cell`](crate::tvm::Cell)
//! and [`Slice`](crate::tvm::Slice): it packs arbitrary-width signed and unsigned
//! integers, byte strings, TON's variable-length coin amounts, and on-chain
//! addresses into a single bit-addressable buffer, and knows how to round-trip
//! the "top-upped" padding and Fift hex conventions used on the wire.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

use crate::error::{CellError, CellResult};

/// A bit-addressable buffer with a fixed capacity and a write/read cursor.
///
/// Bits are numbered MSB-first within each byte: bit `i` lives in byte `i >> 3`
/// at mask `1 << (7 - (i & 7))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString {
    data: Vec<u8>,
    capacity: usize,
    cursor: usize,
}

impl BitString {
    /// Creates an empty bit string with room for `capacity_bits` bits.
    pub fn new(capacity_bits: usize) -> Self {
        Self {
            data: vec![0u8; capacity_bits.div_ceil(8)],
            capacity: capacity_bits,
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bits written so far.
    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    /// The bytes backing the written prefix, rounded up to a whole byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.cursor.div_ceil(8)]
    }

    /// Reads bit `i` (must be `< len()`, unchecked beyond that).
    pub fn get_bit(&self, i: usize) -> bool {
        (self.data[i / 8] >> (7 - (i % 8))) & 1 == 1
    }

    fn set_bit(&mut self, i: usize, value: bool) {
        let mask = 1u8 << (7 - (i % 8));
        if value {
            self.data[i / 8] |= mask;
        } else {
            self.data[i / 8] &= !mask;
        }
    }

    pub fn write_bit(&mut self, bit: bool) -> CellResult<()> {
        if self.cursor >= self.capacity {
            return Err(CellError::CapacityOverflow(format!(
                "cannot write past capacity of {} bits",
                self.capacity
            )));
        }
        self.set_bit(self.cursor, bit);
        self.cursor += 1;
        Ok(())
    }

    /// Writes the `width` most-significant bits of `value`, big-endian.
    pub fn write_uint(&mut self, value: &BigUint, width: usize) -> CellResult<()> {
        if width == 0 {
            if !value.is_zero() {
                return Err(CellError::OutOfRange(
                    "cannot write a non-zero value with width 0".into(),
                ));
            }
            return Ok(());
        }
        let needed = value.bits() as usize;
        if needed > width {
            return Err(CellError::OutOfRange(format!(
                "value needs {needed} bits but width is {width}"
            )));
        }
        if width > self.remaining() {
            return Err(CellError::CapacityOverflow(format!(
                "cannot write {width} bits: only {} remaining",
                self.remaining()
            )));
        }
        for i in (0..width).rev() {
            self.write_bit(value.bit(i as u64))?;
        }
        Ok(())
    }

    /// Writes a two's-complement-style signed integer of the given width.
    ///
    /// Width 1 only ever represents `-1` or `0` — there is no way to encode
    /// `+1` in a single sign bit.
    pub fn write_int(&mut self, value: &BigInt, width: usize) -> CellResult<()> {
        if width == 0 {
            return Err(CellError::OutOfRange(
                "signed write requires width >= 1".into(),
            ));
        }
        if width == 1 {
            if *value == BigInt::from(-1) {
                return self.write_bit(true);
            } else if value.is_zero() {
                return self.write_bit(false);
            }
            return Err(CellError::OutOfRange(
                "a 1-bit signed integer can only be -1 or 0".into(),
            ));
        }

        let mag_width = width - 1;
        if value.sign() == Sign::Minus {
            let bound = BigInt::from(1) << mag_width;
            let shifted = value + &bound;
            let magnitude = shifted.to_biguint().ok_or_else(|| {
                CellError::OutOfRange(format!("value does not fit in a {width}-bit signed field"))
            })?;
            self.write_bit(true)?;
            self.write_uint(&magnitude, mag_width)
        } else {
            let magnitude = value
                .to_biguint()
                .expect("non-negative BigInt always converts to BigUint");
            self.write_bit(false)?;
            self.write_uint(&magnitude, mag_width)
        }
    }

    /// Writes `bit_len` bits read MSB-first out of `bytes`.
    pub fn write_raw_bits(&mut self, bytes: &[u8], bit_len: usize) -> CellResult<()> {
        if bit_len > self.remaining() {
            return Err(CellError::CapacityOverflow(format!(
                "cannot write {bit_len} bits: only {} remaining",
                self.remaining()
            )));
        }
        let required_bytes = bit_len.div_ceil(8);
        if bytes.len() < required_bytes {
            return Err(CellError::Malformed(format!(
                "need {required_bytes} bytes for {bit_len} bits, got {}",
                bytes.len()
            )));
        }
        for i in 0..bit_len {
            let bit = (bytes[i / 8] >> (7 - (i % 8))) & 1 == 1;
            self.write_bit(bit)?;
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> CellResult<()> {
        self.write_raw_bits(bytes, bytes.len() * 8)
    }

    pub fn write_string(&mut self, s: &str) -> CellResult<()> {
        self.write_bytes(s.as_bytes())
    }

    /// Writes a length-prefixed unsigned integer: `length_bits` bits giving the
    /// byte length of the magnitude, then that many bytes of the magnitude.
    pub fn write_var_uint(&mut self, value: &BigUint, length_bits: usize) -> CellResult<()> {
        if value.is_zero() {
            return self.write_uint(&BigUint::zero(), length_bits);
        }
        let byte_len = (value.bits() as usize).div_ceil(8);
        let max_len = (1usize << length_bits) - 1;
        if byte_len > max_len {
            return Err(CellError::OutOfRange(format!(
                "value needs {byte_len} bytes, a {length_bits}-bit length field allows at most {max_len}"
            )));
        }
        self.write_uint(&BigUint::from(byte_len as u64), length_bits)?;
        self.write_uint(value, byte_len * 8)
    }

    /// Writes a `Grams`/`Coins` amount (`VarUInteger 16`): a 4-bit byte-length
    /// prefix followed by the magnitude.
    pub fn write_grams(&mut self, value: &BigUint) -> CellResult<()> {
        self.write_var_uint(value, 4)
    }

    /// Writes `addr_none$00` for `None`, or `addr_std$10` with no anycast for
    /// `Some((workchain, hash))`.
    pub fn write_address(&mut self, addr: Option<(i8, &[u8; 32])>) -> CellResult<()> {
        match addr {
            None => self.write_uint(&BigUint::zero(), 2),
            Some((workchain, hash)) => {
                self.write_uint(&BigUint::from(2u8), 2)?;
                self.write_bit(false)?;
                self.write_int(&BigInt::from(workchain), 8)?;
                self.write_bytes(hash)
            }
        }
    }

    /// Appends the first `other.len()` bits of `other`.
    pub fn write_bit_string(&mut self, other: &BitString) -> CellResult<()> {
        if other.cursor > self.remaining() {
            return Err(CellError::CapacityOverflow(format!(
                "cannot append {} bits: only {} remaining",
                other.cursor,
                self.remaining()
            )));
        }
        for i in 0..other.cursor {
            self.write_bit(other.get_bit(i))?;
        }
        Ok(())
    }

    /// Byte-aligns the written bits, Fift-style: if the cursor isn't already
    /// byte-aligned, a sentinel `1` bit is appended followed by zero padding.
    pub fn get_top_upped_array(&self) -> Vec<u8> {
        let full_bytes = self.cursor / 8;
        let rem = self.cursor % 8;
        if rem == 0 {
            return self.data[..full_bytes].to_vec();
        }
        let mut data = self.data[..=full_bytes].to_vec();
        data[full_bytes] |= 1u8 << (7 - rem);
        data
    }

    /// Inverse of [`get_top_upped_array`](Self::get_top_upped_array). When
    /// `fully_filled` is set (or `bytes` is empty) the bytes are taken as-is;
    /// otherwise the trailing sentinel bit is located (scanning at most 7
    /// bits back from the end of the last byte) and stripped.
    pub fn from_top_upped(bytes: &[u8], fully_filled: bool) -> CellResult<Self> {
        let capacity = bytes.len() * 8;
        if fully_filled || bytes.is_empty() {
            return Ok(Self {
                data: bytes.to_vec(),
                capacity,
                cursor: capacity,
            });
        }
        let last = bytes[bytes.len() - 1];
        for i in 0..7u8 {
            if (last >> i) & 1 == 1 {
                let cursor = (bytes.len() - 1) * 8 + (7 - i as usize);
                let mut data = bytes.to_vec();
                let last_idx = data.len() - 1;
                data[last_idx] &= !(1u8 << i);
                return Ok(Self {
                    data,
                    capacity,
                    cursor,
                });
            }
        }
        Err(CellError::Malformed(
            "top-upped sentinel bit not found in last byte".into(),
        ))
    }

    /// Fift's hex convention: upper-case hex, with a trailing `_` marking a
    /// one-bit sentinel inside the final nibble when the bit length isn't a
    /// multiple of 4.
    pub fn to_hex(&self) -> String {
        if self.cursor % 4 == 0 {
            hex_prefix(&self.data, self.cursor)
        } else {
            let mut data = self.data.clone();
            let byte_idx = self.cursor / 8;
            let bit_idx = 7 - (self.cursor % 8);
            let needed = byte_idx + 1;
            if data.len() < needed {
                data.resize(needed, 0);
            }
            data[byte_idx] |= 1u8 << bit_idx;
            let padded_cursor = (self.cursor + 1).div_ceil(4) * 4;
            let needed_bytes = padded_cursor.div_ceil(8);
            if data.len() < needed_bytes {
                data.resize(needed_bytes, 0);
            }
            format!("{}_", hex_prefix(&data, padded_cursor))
        }
    }

    /// Inverse of [`to_hex`](Self::to_hex).
    pub fn from_hex(s: &str) -> CellResult<Self> {
        let (body, has_underscore) = match s.strip_suffix('_') {
            Some(b) => (b, true),
            None => (s, false),
        };
        if body.is_empty() {
            return Ok(Self::new(0));
        }

        let nibble_count = body.len();
        let mut owned;
        let full_hex: &str = if nibble_count % 2 != 0 {
            owned = body.to_string();
            owned.push('0');
            &owned
        } else {
            body
        };
        let bytes = hex::decode(full_hex)?;

        if !has_underscore {
            let cursor = nibble_count * 4;
            let capacity = bytes.len() * 8;
            return Ok(Self {
                data: bytes,
                capacity,
                cursor,
            });
        }

        let last_idx = bytes.len() - 1;
        let in_high_nibble = nibble_count % 2 != 0;
        let last_nibble = if in_high_nibble {
            bytes[last_idx] >> 4
        } else {
            bytes[last_idx] & 0x0F
        };
        for i in 0..4u8 {
            if (last_nibble >> i) & 1 == 1 {
                let nibble_bit_used = 3 - i as usize;
                let cursor = (nibble_count - 1) * 4 + nibble_bit_used;
                let mut data = bytes.clone();
                let clear_mask: u8 = !(1u8 << i);
                if in_high_nibble {
                    data[last_idx] &= (clear_mask << 4) | 0x0F;
                } else {
                    data[last_idx] &= (clear_mask & 0x0F) | 0xF0;
                }
                let capacity = data.len() * 8;
                return Ok(Self {
                    data,
                    capacity,
                    cursor,
                });
            }
        }
        Err(CellError::Malformed(
            "hex sentinel nibble not found".into(),
        ))
    }
}

/// Upper-case hex of the first `bit_len` bits (`bit_len` must be a multiple of 4).
fn hex_prefix(data: &[u8], bit_len: usize) -> String {
    let nibble_count = bit_len / 4;
    let total_bytes = bit_len.div_ceil(8);
    let full_hex = hex::encode_upper(&data[..total_bytes]);
    full_hex[..nibble_count].to_string()
}
