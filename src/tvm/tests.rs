//! Cross-module integration tests for the cell/bit-string/slice data model
//! and the Bag of Cells codec.

use num_bigint::{BigInt, BigUint};
use std::sync::Arc;

use crate::tvm::*;

fn leaf_cell(byte: u8) -> Arc<Cell> {
    let mut b = CellBuilder::new();
    b.store_byte(byte).unwrap();
    b.build().unwrap()
}

#[test]
fn test_cell_with_references() {
    let child = leaf_cell(0xAA);
    let mut builder = CellBuilder::new();
    builder.store_byte(0xBB).unwrap();
    builder.store_reference(child.clone()).unwrap();
    let parent = builder.build().unwrap();

    assert_eq!(parent.reference_count(), 1);
    assert_eq!(parent.reference(0).unwrap().hash(), child.hash());
}

#[test]
fn test_builder_and_slice_round_trip() {
    let mut builder = Builder::new();
    let addr = Address::new(0, [1u8; 32]);
    builder.store_address(Some(&addr)).unwrap();
    builder.store_u32(42).unwrap();
    builder.store_bool(true).unwrap();
    builder.store_string("Hello").unwrap();
    let cell = builder.build().unwrap();

    let mut slice = Slice::new(cell);
    assert_eq!(slice.load_address().unwrap(), Some(addr));
    assert_eq!(slice.load_u32().unwrap(), 42);
    assert!(slice.load_bit().unwrap());
    assert_eq!(slice.load_bytes(5).unwrap(), b"Hello");
    assert!(slice.is_empty());
}

#[test]
fn test_boc_round_trip_with_references() {
    let ref_cell_1 = {
        let mut b = Builder::new();
        b.store_u32(111).unwrap();
        b.build().unwrap()
    };
    let ref_cell_2 = {
        let mut b = Builder::new();
        b.store_u32(222).unwrap();
        b.build().unwrap()
    };

    let mut root_builder = Builder::new();
    root_builder.store_u32(999).unwrap();
    root_builder.store_ref(ref_cell_1.clone()).unwrap();
    root_builder.store_ref(ref_cell_2.clone()).unwrap();
    let root = root_builder.build().unwrap();

    let boc = serialize_boc(&root, false, true).unwrap();
    let decoded = deserialize_boc_single_root(&boc).unwrap();

    assert_eq!(root.hash(), decoded.hash());
    assert_eq!(decoded.reference_count(), 2);
    assert_eq!(decoded.reference(0).unwrap().hash(), ref_cell_1.hash());
    assert_eq!(decoded.reference(1).unwrap().hash(), ref_cell_2.hash());
}

#[test]
fn test_snake_string_integration() {
    let long_string = "This is a very long string that should be split across \
        multiple cells when stored as a snake string. "
        .repeat(10);

    let mut builder = Builder::new();
    builder.store_snake_string(&long_string, false).unwrap();
    let cell = builder.build().unwrap();

    assert!(cell.reference_count() > 0);
}

#[test]
fn test_hash_consistency_across_apis() {
    let cell1 = Cell::with_data(&[0x11, 0x22, 0x33], 24).unwrap();

    let mut builder = CellBuilder::new();
    builder.store_bytes(&[0x11, 0x22, 0x33]).unwrap();
    let cell2 = builder.build().unwrap();

    let mut h_builder = Builder::new();
    h_builder.store_bytes(&[0x11, 0x22, 0x33]).unwrap();
    let cell3 = h_builder.build().unwrap();

    assert_eq!(cell1.hash(), cell2.hash());
    assert_eq!(cell2.hash(), cell3.hash());
}

#[test]
fn test_multiple_references_capacity() {
    let mut builder = CellBuilder::new();
    for i in 0..MAX_CELL_REFS {
        builder.store_reference(leaf_cell(i as u8)).unwrap();
    }
    let root = builder.build().unwrap();
    assert_eq!(root.reference_count(), MAX_CELL_REFS);
}

#[test]
fn test_boc_crc_makes_output_longer() {
    let mut builder = Builder::new();
    builder.store_u64(0xDEAD_BEEF_CAFE_BABE).unwrap();
    let cell = builder.build().unwrap();

    let boc_no_crc = serialize_boc(&cell, false, false).unwrap();
    let boc_with_crc = serialize_boc(&cell, false, true).unwrap();
    assert_eq!(boc_with_crc.len(), boc_no_crc.len() + 4);

    assert_eq!(
        deserialize_boc_single_root(&boc_no_crc).unwrap().hash(),
        cell.hash()
    );
    assert_eq!(
        deserialize_boc_single_root(&boc_with_crc).unwrap().hash(),
        cell.hash()
    );
}

#[test]
fn test_boc_hex_and_base64_conversions() {
    let mut builder = Builder::new();
    builder.store_u32(0xDEADBEEF).unwrap();
    let cell = builder.build().unwrap();

    let hex = boc_to_hex(&cell, false).unwrap();
    assert_eq!(hex_to_boc(&hex).unwrap().hash(), cell.hash());

    let b64 = boc_to_base64(&cell, false).unwrap();
    assert_eq!(base64_to_boc(&b64).unwrap().hash(), cell.hash());
}

/// Properties 4/5: signed and unsigned round trip across widths.
#[test]
fn test_signed_and_unsigned_round_trip_across_widths() {
    for width in 2..32usize {
        let lo = -(1i64 << (width - 1));
        let hi = (1i64 << (width - 1)) - 1;
        for n in [lo, lo + 1, -1, 0, 1, hi - 1, hi] {
            let mut builder = CellBuilder::new();
            builder
                .bits_mut()
                .write_int(&BigInt::from(n), width)
                .unwrap();
            let cell = builder.build().unwrap();
            let mut slice = Slice::new(cell);
            assert_eq!(slice.load_int(width).unwrap(), BigInt::from(n));
        }

        let max_unsigned = (BigUint::from(1u8) << width) - BigUint::from(1u8);
        for n in [BigUint::from(0u8), BigUint::from(1u8), max_unsigned] {
            let mut builder = CellBuilder::new();
            builder.bits_mut().write_uint(&n, width).unwrap();
            let cell = builder.build().unwrap();
            let mut slice = Slice::new(cell);
            assert_eq!(slice.load_uint(width).unwrap(), n);
        }
    }
}

/// Property 6: after `to_boc`, reference resolution never fails the forward
/// check, and the decoded graph is content-identical to the original.
#[test]
fn test_forward_reference_invariant_holds_after_serialization() {
    let shared = leaf_cell(0x77);
    let mut middle_builder = CellBuilder::new();
    middle_builder.store_reference(shared.clone()).unwrap();
    let middle = middle_builder.build().unwrap();

    let mut root_builder = CellBuilder::new();
    root_builder.store_reference(middle).unwrap();
    root_builder.store_reference(shared).unwrap();
    let root = root_builder.build().unwrap();

    let boc = serialize_boc(&root, false, false).unwrap();
    let decoded = deserialize_boc_single_root(&boc).unwrap();
    assert_eq!(decoded.hash(), root.hash());
}

/// S2: Fift hex convention scenarios.
#[test]
fn test_hex_convention_scenarios() {
    let mut b = BitString::new(4);
    for bit in [true, false, true, true] {
        b.write_bit(bit).unwrap();
    }
    assert_eq!(b.to_hex(), "B");

    let mut b5 = BitString::new(5);
    for bit in [true, false, true, true, true] {
        b5.write_bit(bit).unwrap();
    }
    assert_eq!(b5.to_hex(), "BC_");
}

/// S5: internal message header, bit-exact leading bits.
#[test]
fn test_internal_message_header_bit_exact() {
    let mut bits = BitString::new(4 + 2 + 267 + 4);
    bits.write_bit(false).unwrap(); // int_msg_info$0 tag
    bits.write_bit(true).unwrap(); // ihr_disabled = true
    bits.write_bit(false).unwrap(); // bounce = false
    bits.write_bit(false).unwrap(); // bounced = false
    bits.write_address(None).unwrap(); // src = addr_none
    bits.write_address(Some((0, &[0u8; 32]))).unwrap(); // dest = addr_std
    bits.write_grams(&BigUint::from(0u32)).unwrap(); // value = 0

    assert!(!bits.get_bit(0));
    assert!(bits.get_bit(1));
    assert!(!bits.get_bit(2));
    assert!(!bits.get_bit(3));
    assert!(!bits.get_bit(4)); // addr_none tag high bit
    assert!(!bits.get_bit(5)); // addr_none tag low bit
    assert!(bits.get_bit(6)); // addr_std tag high bit
    assert!(!bits.get_bit(7)); // addr_std tag low bit
}
