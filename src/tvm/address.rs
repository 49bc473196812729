//! TON Address implementation
//!
//! Internal (`addr_std`) addresses: a workchain id plus a 256-bit account hash.
//! Cells carry the raw pair; the user-friendly base64 form is produced only
//! when an address is rendered.

use crate::crc::CRC16;
use base64::Engine;
use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// User-friendly tag for bounceable addresses
const TAG_BOUNCEABLE: u8 = 0x11;

/// User-friendly tag for non-bounceable addresses
const TAG_NON_BOUNCEABLE: u8 = 0x51;

/// Flag OR-ed into the tag for testnet-only addresses
const TAG_TEST_ONLY: u8 = 0x80;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address format: {0}")]
    InvalidFormat(String),
    #[error("Invalid address tag: 0x{0:02x}")]
    InvalidTag(u8),
    #[error("Invalid address CRC")]
    InvalidCrc,
}

/// Represents a TON blockchain address
/// Equality and hashing cover the account only (workchain and hash); the
/// rendering flags do not identify an account.
#[derive(Debug, Clone)]
pub struct Address {
    /// Workchain ID (-1 for masterchain, 0 for basechain)
    pub workchain: i8,
    /// 32-byte hash part of the address
    pub hash_part: [u8; 32],
    /// Whether the address is bounceable
    pub is_bounceable: bool,
    /// Whether this is a test-only address
    pub is_test_only: bool,
}

impl Address {
    /// Creates a new bounceable address from workchain and hash part
    pub fn new(workchain: i8, hash_part: [u8; 32]) -> Self {
        Self {
            workchain,
            hash_part,
            is_bounceable: true,
            is_test_only: false,
        }
    }

    /// Parses address from raw format: "workchain:hash"
    pub fn from_hex(address: &str) -> Result<Self, AddressError> {
        let (workchain, hash_hex) = address
            .split_once(':')
            .ok_or_else(|| AddressError::InvalidFormat(address.to_string()))?;

        let workchain = workchain
            .parse::<i8>()
            .map_err(|e| AddressError::InvalidFormat(format!("workchain: {}", e)))?;

        if hash_hex.len() != 64 {
            return Err(AddressError::InvalidFormat(
                "hash part must be 64 hex characters".to_string(),
            ));
        }

        let hash_bytes =
            hex::decode(hash_hex).map_err(|e| AddressError::InvalidFormat(e.to_string()))?;
        let mut hash_part = [0u8; 32];
        hash_part.copy_from_slice(&hash_bytes);

        Ok(Self::new(workchain, hash_part))
    }

    /// Parses address from base64 user-friendly format (standard or url-safe alphabet)
    pub fn from_base64(address: &str) -> Result<Self, AddressError> {
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(address)
            .or_else(|_| base64::engine::general_purpose::STANDARD.decode(address))
            .map_err(|e| AddressError::InvalidFormat(e.to_string()))?;

        if decoded.len() != 36 {
            return Err(AddressError::InvalidFormat(format!(
                "expected 36 bytes, got {}",
                decoded.len()
            )));
        }

        let mut tag = decoded[0];
        let is_test_only = tag & TAG_TEST_ONLY != 0;
        tag &= !TAG_TEST_ONLY;

        let is_bounceable = match tag {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            _ => return Err(AddressError::InvalidTag(decoded[0])),
        };

        let expected_crc = u16::from_be_bytes([decoded[34], decoded[35]]);
        if CRC16.checksum(&decoded[..34]) != expected_crc {
            return Err(AddressError::InvalidCrc);
        }

        let mut hash_part = [0u8; 32];
        hash_part.copy_from_slice(&decoded[2..34]);

        Ok(Self {
            workchain: decoded[1] as i8,
            hash_part,
            is_bounceable,
            is_test_only,
        })
    }

    /// Renders the address in user-friendly form with explicit flags
    pub fn to_user_friendly(&self, url_safe: bool, bounceable: bool, test_only: bool) -> String {
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if test_only {
            tag |= TAG_TEST_ONLY;
        }

        let mut data = Vec::with_capacity(36);
        data.push(tag);
        data.push(self.workchain as u8);
        data.extend_from_slice(&self.hash_part);
        data.extend_from_slice(&CRC16.checksum(&data).to_be_bytes());

        if url_safe {
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&data)
        } else {
            base64::engine::general_purpose::STANDARD.encode(&data)
        }
    }

    /// Converts to raw format (workchain:hash)
    pub fn to_hex(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash_part))
    }

    /// Converts to user-friendly base64url format using the address' own flags
    pub fn to_base64(&self) -> String {
        self.to_user_friendly(true, self.is_bounceable, self.is_test_only)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(':') {
            Self::from_hex(s)
        } else {
            Self::from_base64(s)
        }
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.workchain == other.workchain && self.hash_part == other.hash_part
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.workchain.hash(state);
        self.hash_part.hash(state);
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
