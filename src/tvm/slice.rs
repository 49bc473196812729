//! Slice implementation for reading data from cells
//!
//! A Slice provides a way to read data from a Cell sequentially,
//! tracking the current position in both bits and references.
//! Every failed read leaves the position untouched.

use crate::tvm::address::Address;
use crate::tvm::cell::Cell;
use crate::tvm::error::{Result, cell_bail};
use std::sync::Arc;

/// A slice for reading data from a cell
#[derive(Debug, Clone)]
pub struct Slice {
    /// The cell being read
    cell: Arc<Cell>,
    /// Current bit position in the cell
    bit_pos: usize,
    /// Current reference position
    ref_pos: usize,
}

impl Slice {
    /// Creates a new slice from a cell
    pub fn new(cell: Arc<Cell>) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Returns the number of remaining bits
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len().saturating_sub(self.bit_pos)
    }

    /// Returns the number of remaining references
    pub fn remaining_refs(&self) -> usize {
        self.cell.reference_count().saturating_sub(self.ref_pos)
    }

    /// Checks if there are any remaining bits or references
    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    fn ensure_bits(&self, n: usize) -> Result<()> {
        if n > self.remaining_bits() {
            cell_bail!(
                "Not enough bits remaining: requested {}, available {}",
                n,
                self.remaining_bits()
            );
        }
        Ok(())
    }

    fn bit_at(&self, pos: usize) -> bool {
        (self.cell.data()[pos / 8] >> (7 - (pos % 8))) & 1 == 1
    }

    /// Runs a multi-step read, rolling the position back if any step fails
    fn atomically<T>(&mut self, read: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let (bit_pos, ref_pos) = (self.bit_pos, self.ref_pos);
        let result = read(self);
        if result.is_err() {
            self.bit_pos = bit_pos;
            self.ref_pos = ref_pos;
        }
        result
    }

    /// Loads a single bit
    pub fn load_bit(&mut self) -> Result<bool> {
        self.ensure_bits(1)?;
        let bit = self.bit_at(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    /// Loads multiple bits into a byte vector, MSB-first, zero-padded at the end
    pub fn load_bits(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure_bits(n)?;

        let mut result = vec![0u8; n.div_ceil(8)];
        for i in 0..n {
            if self.bit_at(self.bit_pos + i) {
                result[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        self.bit_pos += n;

        Ok(result)
    }

    /// Loads a byte (8 bits)
    pub fn load_byte(&mut self) -> Result<u8> {
        Ok(self.load_uint(8)? as u8)
    }

    /// Loads multiple bytes
    pub fn load_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        match n.checked_mul(8) {
            Some(bits) => self.load_bits(bits),
            None => cell_bail!("Byte count {} is out of range", n),
        }
    }

    /// Loads a u16 value (16 bits, big-endian)
    pub fn load_u16(&mut self) -> Result<u16> {
        Ok(self.load_uint(16)? as u16)
    }

    /// Loads a u32 value (32 bits, big-endian)
    pub fn load_u32(&mut self) -> Result<u32> {
        Ok(self.load_uint(32)? as u32)
    }

    /// Loads a u64 value (64 bits, big-endian)
    pub fn load_u64(&mut self) -> Result<u64> {
        self.load_uint(64)
    }

    /// Loads an unsigned integer with a specific number of bits
    pub fn load_uint(&mut self, bits: usize) -> Result<u64> {
        if bits > 64 {
            cell_bail!("Cannot load {} bits into u64", bits);
        }
        self.ensure_bits(bits)?;

        let mut result = 0u64;
        for i in 0..bits {
            result = (result << 1) | self.bit_at(self.bit_pos + i) as u64;
        }
        self.bit_pos += bits;

        Ok(result)
    }

    /// Loads a two's complement signed integer with a specific number of bits
    pub fn load_int(&mut self, bits: usize) -> Result<i64> {
        if bits > 64 {
            cell_bail!("Cannot load {} bits into i64", bits);
        }

        if bits == 0 {
            return Ok(0);
        }

        let unsigned = self.load_uint(bits)?;

        let sign_bit = 1u64 << (bits - 1);
        if bits < 64 && unsigned & sign_bit != 0 {
            Ok((unsigned | (!0u64 << bits)) as i64)
        } else {
            Ok(unsigned as i64)
        }
    }

    /// Loads the next reference to another cell
    pub fn load_reference(&mut self) -> Result<Arc<Cell>> {
        match self.cell.reference(self.ref_pos) {
            Some(reference) => {
                let reference = reference.clone();
                self.ref_pos += 1;
                Ok(reference)
            }
            None => cell_bail!("No more references to read"),
        }
    }

    /// Opens an independent slice over the child at `index` (counted from the
    /// cell's first reference); this slice's position does not move
    pub fn descend(&self, index: usize) -> Result<Slice> {
        match self.cell.reference(index) {
            Some(reference) => Ok(Slice::new(reference.clone())),
            None => cell_bail!(
                "Reference index {} out of range: cell has {} references",
                index,
                self.cell.reference_count()
            ),
        }
    }

    /// Loads `Maybe ^Cell`: a presence bit followed by an optional reference
    pub fn load_maybe_ref(&mut self) -> Result<Option<Arc<Cell>>> {
        self.atomically(|s| {
            if s.load_bit()? {
                Ok(Some(s.load_reference()?))
            } else {
                Ok(None)
            }
        })
    }

    /// Skips a number of bits
    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.ensure_bits(n)?;
        self.bit_pos += n;
        Ok(())
    }

    /// Gets the underlying cell
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    /// Gets the current bit position
    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Gets the current reference position
    pub fn ref_position(&self) -> usize {
        self.ref_pos
    }

    /// Loads a variable-length integer (VarUInteger)
    /// First length_bits encode the byte length, then that many bytes of data
    pub fn load_var_uint(&mut self, length_bits: usize) -> Result<u128> {
        if length_bits > 5 {
            cell_bail!("VarUInteger length_bits {} exceeds 5", length_bits);
        }

        self.atomically(|s| {
            let byte_len = s.load_uint(length_bits)? as usize;
            if byte_len > 16 {
                cell_bail!("VarUInteger byte length {} exceeds maximum 16", byte_len);
            }

            let mut result = 0u128;
            for byte in s.load_bytes(byte_len)? {
                result = (result << 8) | byte as u128;
            }
            Ok(result)
        })
    }

    /// Loads coins (`Grams`, VarUInteger 16): 4-bit byte length, then the value
    pub fn load_coins(&mut self) -> Result<u128> {
        self.load_var_uint(4)
    }

    /// Loads a `MsgAddressInt`, or `None` for `addr_none$00`
    ///
    /// Only `addr_std$10` without anycast is accepted, the only form Telemint
    /// contracts store.
    pub fn load_address(&mut self) -> Result<Option<Address>> {
        self.atomically(|s| match s.load_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if s.load_bit()? {
                    cell_bail!("Anycast addresses are not supported");
                }
                let workchain = s.load_int(8)? as i8;
                let mut hash_part = [0u8; 32];
                hash_part.copy_from_slice(&s.load_bytes(32)?);
                Ok(Some(Address::new(workchain, hash_part)))
            }
            0b01 => cell_bail!("External address (addr_extern) where internal expected"),
            tag => cell_bail!("Unsupported address tag 0b{:02b}", tag),
        })
    }
}

impl From<Arc<Cell>> for Slice {
    fn from(cell: Arc<Cell>) -> Self {
        Self::new(cell)
    }
}
