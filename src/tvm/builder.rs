//! Enhanced Builder for constructing cells with convenient methods
//!
//! This module provides a high-level builder (`Builder`) that wraps the low-level
//! `CellBuilder` with TON-specific store operations: addresses, coins,
//! optional references. It mirrors the read side of [`Slice`](crate::tvm::Slice).
//!
//! # Examples
//!
//! ```rust
//! use telemint_rs::tvm::{Address, Builder, Slice};
//!
//! let mut builder = Builder::new();
//! let addr = Address::new(0, [0u8; 32]);
//! builder.store_address(Some(&addr)).unwrap();
//! builder.store_coins(1_000_000_000).unwrap();
//!
//! let mut slice = Slice::new(builder.build().unwrap());
//! assert_eq!(slice.load_address().unwrap(), Some(addr));
//! assert_eq!(slice.load_coins().unwrap(), 1_000_000_000);
//! ```

use crate::tvm::address::Address;
use crate::tvm::cell::{Cell, CellBuilder, MAX_CELL_REFS};
use crate::tvm::error::{Result, TvmError};
use std::sync::Arc;

/// Extended builder with convenience methods
pub struct Builder {
    inner: CellBuilder,
}

impl Builder {
    /// Creates a new builder
    pub fn new() -> Self {
        Self {
            inner: CellBuilder::new(),
        }
    }

    /// Returns the number of bits used
    pub fn bit_len(&self) -> usize {
        self.inner.bit_len()
    }

    /// Returns the number of references
    pub fn ref_count(&self) -> usize {
        self.inner.ref_count()
    }

    /// Returns the number of available references
    pub fn available_refs(&self) -> usize {
        MAX_CELL_REFS - self.ref_count()
    }

    /// Stores a single bit
    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self> {
        self.inner.store_bit(bit)?;
        Ok(self)
    }

    /// Stores multiple bits from a byte slice
    pub fn store_bits(&mut self, bits: &[u8], bit_len: usize) -> Result<&mut Self> {
        self.inner.store_bits(bits, bit_len)?;
        Ok(self)
    }

    /// Stores a byte
    pub fn store_byte(&mut self, byte: u8) -> Result<&mut Self> {
        self.inner.store_byte(byte)?;
        Ok(self)
    }

    /// Stores multiple bytes
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        self.inner.store_bytes(bytes)?;
        Ok(self)
    }

    /// Stores a u32 value
    pub fn store_u32(&mut self, value: u32) -> Result<&mut Self> {
        self.inner.store_u32(value)?;
        Ok(self)
    }

    /// Stores a u64 value
    pub fn store_u64(&mut self, value: u64) -> Result<&mut Self> {
        self.inner.store_u64(value)?;
        Ok(self)
    }

    /// Stores an unsigned integer with specific bit length
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self> {
        self.inner.store_uint(value, bits)?;
        Ok(self)
    }

    /// Stores a signed integer with specific bit length (two's complement)
    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self> {
        if bits == 0 || bits > 64 {
            return Err(TvmError::Overflow(format!(
                "Cannot store a signed integer in {} bits",
                bits
            )));
        }

        if bits < 64 {
            let bound = 1i64 << (bits - 1);
            if value < -bound || value >= bound {
                return Err(TvmError::Overflow(format!(
                    "Value {} does not fit in {} signed bits",
                    value, bits
                )));
            }
        }

        let unsigned = if bits == 64 {
            value as u64
        } else {
            (value as u64) & ((1u64 << bits) - 1)
        };

        self.store_uint(unsigned, bits)
    }

    /// Stores a boolean value as a single bit
    pub fn store_bool(&mut self, value: bool) -> Result<&mut Self> {
        self.store_bit(value)
    }

    /// Stores a reference to another cell
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self> {
        self.inner.store_reference(cell)?;
        Ok(self)
    }

    /// Stores an optional reference (Maybe ^Cell)
    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> Result<&mut Self> {
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

    /// Stores a variable-length unsigned integer (VarUInteger)
    pub fn store_var_uint(&mut self, value: u128, length_bits: usize) -> Result<&mut Self> {
        let byte_len = (128 - value.leading_zeros() as usize).div_ceil(8);
        if length_bits < 64 && (byte_len as u64) >> length_bits != 0 {
            return Err(TvmError::Overflow(format!(
                "Value {} needs {} bytes, more than {} length bits allow",
                value, byte_len, length_bits
            )));
        }

        self.store_uint(byte_len as u64, length_bits)?;
        let bytes = value.to_be_bytes();
        self.store_bytes(&bytes[16 - byte_len..])?;
        Ok(self)
    }

    /// Stores coins (`Grams`, VarUInteger 16)
    pub fn store_coins(&mut self, amount: u128) -> Result<&mut Self> {
        self.store_var_uint(amount, 4)
    }

    /// Stores a TON address (`addr_none` when `None`)
    pub fn store_address(&mut self, address: Option<&Address>) -> Result<&mut Self> {
        match address {
            None => {
                // addr_none$00
                self.store_uint(0b00, 2)?;
            }
            Some(addr) => {
                // addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256
                self.store_uint(0b10, 2)?;
                self.store_bit(false)?;
                self.store_int(addr.workchain as i64, 8)?;
                self.store_bytes(&addr.hash_part)?;
            }
        }
        Ok(self)
    }

    /// Builds the cell
    pub fn build(self) -> Result<Arc<Cell>> {
        self.inner.build()
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
