use crc::{Crc, CRC_16_XMODEM, CRC_32_ISCSI};

/// CRC16/XMODEM, used by user-friendly addresses and get-method ids
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC32C, used by BoC checksums
pub const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);
