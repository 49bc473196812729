//! Cell implementation for TON blockchain
//!
//! A cell is a fundamental data structure in TON that can store up to 1023 bits
//! of data and maintain up to 4 references to other cells. Cells are immutable
//! once built; trees of cells share children through `Arc`.

use crate::tvm::error::{Result, TvmError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maximum number of bits a cell can store
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can have
pub const MAX_CELL_REFS: usize = 4;

/// Cell level range (0-3)
pub const MAX_CELL_LEVEL: u8 = 3;

/// Maximum depth of a cell tree
pub const MAX_CELL_DEPTH: u16 = 1024;

/// Represents a cell in the TON blockchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Cell data, exactly `ceil(bit_len / 8)` bytes with unused trailing bits cleared
    data: Vec<u8>,
    /// Number of bits in the cell (not necessarily a multiple of 8)
    bit_len: usize,
    /// References to other cells
    references: Vec<Arc<Cell>>,
    /// Whether this is an exotic (special) cell
    is_exotic: bool,
    /// Level mask (3 bits); the cell level is its highest set bit
    level_mask: u8,
    /// Representation hash, computed on construction
    hash: [u8; 32],
    /// Depth of the subtree rooted at this cell
    depth: u16,
}

impl Cell {
    /// Creates a new empty cell
    pub fn new() -> Self {
        let mut cell = Self {
            data: Vec::new(),
            bit_len: 0,
            references: Vec::new(),
            is_exotic: false,
            level_mask: 0,
            hash: [0u8; 32],
            depth: 0,
        };
        cell.hash = cell.compute_hash();
        cell
    }

    /// Creates a cell with the given data and bit length and no references
    pub fn with_data(data: Vec<u8>, bit_len: usize) -> Result<Self> {
        Self::with_references(data, bit_len, Vec::new())
    }

    /// Creates an ordinary cell with data and references
    pub fn with_references(
        data: Vec<u8>,
        bit_len: usize,
        references: Vec<Arc<Cell>>,
    ) -> Result<Self> {
        let level_mask = references.iter().fold(0, |mask, r| mask | r.level_mask());
        Self::from_parts(data, bit_len, references, false, level_mask)
    }

    /// Creates a cell from its raw parts, as found in a serialized BoC
    pub fn from_parts(
        mut data: Vec<u8>,
        bit_len: usize,
        references: Vec<Arc<Cell>>,
        is_exotic: bool,
        level_mask: u8,
    ) -> Result<Self> {
        if bit_len > MAX_CELL_BITS {
            return Err(TvmError::MalformedCell(format!(
                "Cell bit length {} exceeds maximum {}",
                bit_len, MAX_CELL_BITS
            )));
        }
        if references.len() > MAX_CELL_REFS {
            return Err(TvmError::MalformedCell(format!(
                "Cell has {} references, maximum is {}",
                references.len(),
                MAX_CELL_REFS
            )));
        }
        if level_mask >> MAX_CELL_LEVEL != 0 {
            return Err(TvmError::MalformedCell(format!(
                "Invalid cell level mask {:#05b}",
                level_mask
            )));
        }

        let required_bytes = bit_len.div_ceil(8);
        if data.len() < required_bytes {
            return Err(TvmError::MalformedCell(format!(
                "Data length {} is insufficient for {} bits",
                data.len(),
                bit_len
            )));
        }

        // Normalize: drop surplus bytes and clear bits past bit_len
        data.truncate(required_bytes);
        if bit_len % 8 != 0 {
            let used = bit_len % 8;
            data[required_bytes - 1] &= 0xFFu8 << (8 - used);
        }

        let depth = references
            .iter()
            .map(|r| r.depth() + 1)
            .max()
            .unwrap_or(0);
        if depth > MAX_CELL_DEPTH {
            return Err(TvmError::MalformedCell(format!(
                "Cell depth {} exceeds maximum {}",
                depth, MAX_CELL_DEPTH
            )));
        }

        let mut cell = Self {
            data,
            bit_len,
            references,
            is_exotic,
            level_mask,
            hash: [0u8; 32],
            depth,
        };
        cell.hash = cell.compute_hash();
        Ok(cell)
    }

    /// Returns the cell's data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bits in the cell
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the cell's references
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    /// Returns whether this is an exotic cell
    pub fn is_exotic(&self) -> bool {
        self.is_exotic
    }

    /// Returns the cell's level
    pub fn level(&self) -> u8 {
        (u8::BITS - self.level_mask.leading_zeros()) as u8
    }

    /// Returns the cell's level mask
    pub fn level_mask(&self) -> u8 {
        self.level_mask
    }

    /// Computes the cell's descriptors (2 bytes)
    pub fn descriptors(&self) -> [u8; 2] {
        // d1 = r + 8*s + 32*l
        let refs_descriptor = self.references.len() as u8
            + if self.is_exotic { 8 } else { 0 }
            + self.level_mask * 32;

        // d2 = floor(b/8) + ceil(b/8)
        let bits_descriptor = (self.bit_len / 8 + self.bit_len.div_ceil(8)) as u8;

        [refs_descriptor, bits_descriptor]
    }

    /// Serializes the cell data, appending the completion bit if the last byte is partial
    pub fn serialize_data(&self) -> Vec<u8> {
        let mut result = self.data.clone();

        if self.bit_len % 8 != 0 {
            let last_byte_idx = self.bit_len / 8;
            let bits_in_last_byte = self.bit_len % 8;
            result[last_byte_idx] |= 1 << (7 - bits_in_last_byte);
        }

        result
    }

    /// Returns the depth of the cell
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Returns the representation hash of the cell
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();

        hasher.update(self.descriptors());
        hasher.update(self.serialize_data());

        for reference in &self.references {
            hasher.update(reference.depth().to_be_bytes());
        }

        for reference in &self.references {
            hasher.update(reference.hash());
        }

        hasher.finalize().into()
    }

    /// Returns the number of references
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Gets a reference by index
    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    /// Renders the data bits in Fift hex notation (`x{...}`), with a trailing `_`
    /// when the bit length is not a multiple of four
    pub fn to_fift_hex(&self) -> String {
        let hex = hex::encode_upper(self.serialize_data());
        if self.bit_len % 4 == 0 {
            hex[..self.bit_len / 4].to_string()
        } else {
            format!("{}_", &hex[..self.bit_len / 4 + 1])
        }
    }

    /// Writes each distinct cell once, numbered in first-visit order; a cell
    /// seen before is written as `-> #n`, so output stays linear in the DAG size
    fn fmt_tree(
        &self,
        f: &mut fmt::Formatter<'_>,
        indent: usize,
        seen: &mut HashMap<[u8; 32], usize>,
    ) -> fmt::Result {
        if let Some(index) = seen.get(&self.hash) {
            return writeln!(f, "{:indent$}-> #{}", "", index, indent = indent * 2);
        }
        let index = seen.len();
        seen.insert(self.hash, index);

        writeln!(
            f,
            "{:indent$}#{} {}[{}]{}",
            "",
            index,
            self.bit_len,
            self.to_fift_hex(),
            if self.is_exotic { " (exotic)" } else { "" },
            indent = indent * 2
        )?;
        for reference in &self.references {
            reference.fmt_tree(f, indent + 1, seen)?;
        }
        Ok(())
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0, &mut HashMap::new())
    }
}

/// Low-level builder for constructing cells
///
/// This is the core, minimal builder that provides basic bit/byte operations.
/// For a higher-level API with TON-specific convenience methods, see [`Builder`](crate::tvm::Builder).
///
/// # Example
///
/// ```rust
/// use telemint_rs::tvm::CellBuilder;
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// builder.store_byte(0xFF).unwrap();
/// let cell = builder.build().unwrap();
/// assert_eq!(cell.bit_len(), 40);
/// ```
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Creates a new cell builder
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            bit_len: 0,
            references: Vec::new(),
        }
    }

    /// Returns the number of bits stored so far
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the number of references stored so far
    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Stores bits from a byte slice
    pub fn store_bits(&mut self, bits: &[u8], bit_len: usize) -> Result<&mut Self> {
        if self.bit_len + bit_len > MAX_CELL_BITS {
            return Err(TvmError::Overflow(format!(
                "Cannot store {} bits: would exceed maximum cell size",
                bit_len
            )));
        }

        if bits.len() < bit_len.div_ceil(8) {
            return Err(TvmError::Overflow(format!(
                "Insufficient data for {} bits",
                bit_len
            )));
        }

        for i in 0..bit_len {
            let bit = (bits[i / 8] >> (7 - (i % 8))) & 1;

            let target_byte_idx = self.bit_len / 8;
            if target_byte_idx >= self.data.len() {
                self.data.push(0);
            }

            if bit == 1 {
                self.data[target_byte_idx] |= 1 << (7 - (self.bit_len % 8));
            }

            self.bit_len += 1;
        }

        Ok(self)
    }

    /// Stores a byte
    pub fn store_byte(&mut self, byte: u8) -> Result<&mut Self> {
        self.store_bits(&[byte], 8)
    }

    /// Stores multiple bytes
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        self.store_bits(bytes, bytes.len() * 8)
    }

    /// Stores a u32 value
    pub fn store_u32(&mut self, value: u32) -> Result<&mut Self> {
        self.store_bits(&value.to_be_bytes(), 32)
    }

    /// Stores a u64 value
    pub fn store_u64(&mut self, value: u64) -> Result<&mut Self> {
        self.store_bits(&value.to_be_bytes(), 64)
    }

    /// Stores the least significant `bits` of the value in big-endian bit order
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self> {
        if bits > 64 {
            return Err(TvmError::Overflow(
                "Cannot store more than 64 bits from u64".to_string(),
            ));
        }
        if bits < 64 && value >> bits != 0 {
            return Err(TvmError::Overflow(format!(
                "Value {} does not fit in {} bits",
                value, bits
            )));
        }

        let mut temp = vec![0u8; bits.div_ceil(8)];
        for i in 0..bits {
            if (value >> (bits - 1 - i)) & 1 != 0 {
                temp[i / 8] |= 1 << (7 - (i % 8));
            }
        }

        self.store_bits(&temp, bits)
    }

    /// Stores a single bit
    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self> {
        self.store_bits(&[if bit { 0x80 } else { 0x00 }], 1)
    }

    /// Adds a reference to another cell
    pub fn store_reference(&mut self, cell: Arc<Cell>) -> Result<&mut Self> {
        if self.references.len() >= MAX_CELL_REFS {
            return Err(TvmError::Overflow(format!(
                "Cannot add reference: maximum {} references allowed",
                MAX_CELL_REFS
            )));
        }
        self.references.push(cell);
        Ok(self)
    }

    /// Builds the cell
    pub fn build(self) -> Result<Arc<Cell>> {
        Ok(Arc::new(Cell::with_references(
            self.data,
            self.bit_len,
            self.references,
        )?))
    }
}

impl Default for CellBuilder {
    fn default() -> Self {
        Self::new()
    }
}
