use crc::{Crc, CRC_32_ISCSI};

/// CRC32-C (Castagnoli), used for Bag-of-Cells integrity checks.
pub const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);
