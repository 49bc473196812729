//! Bag of Cells (BoC) serialization and deserialization
//!
//! BoC is the serialization format TON uses to move cell trees around. The
//! deserializer accepts arbitrary bytes: anything inconsistent with the format
//! is reported as [`TvmError::MalformedBoc`], never a panic.
//!
//! Parsing happens in two passes. Cells are first read into an arena where
//! references are plain indices; once every cell is known the arena is linked
//! into `Arc` cells, children before parents, so references may point either
//! forward or backward in the stream. Each arena slot becomes exactly one
//! `Arc`, which keeps shared subtrees shared.

use crate::tvm::cell::{Cell, MAX_CELL_BITS, MAX_CELL_REFS};
use crate::tvm::error::{Result, TvmError, boc_bail};
use byteorder::{BigEndian, ByteOrder};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// BoC magic number for standard format
const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

/// BoC magic number for legacy indexed format
const BOC_INDEXED_MAGIC: u32 = 0x68ff65f3;

/// BoC magic number for legacy indexed format with CRC32C
const BOC_INDEXED_CRC32C_MAGIC: u32 = 0xacc3a728;

/// Widest reference index the format allows
const MAX_SIZE_BYTES: usize = 4;

/// Widest offset the format allows
const MAX_OFFSET_BYTES: usize = 8;

/// Smallest serialized cell: two descriptor bytes
const MIN_CELL_BYTES: usize = 2;

/// Parsed BoC header
#[derive(Debug)]
struct Header {
    size_bytes: usize,
    has_crc32c: bool,
    cells_count: usize,
    roots: Vec<usize>,
    cells_size: usize,
}

/// A cell as read from the stream, with references still unresolved
#[derive(Debug)]
struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
    is_exotic: bool,
    level_mask: u8,
}

/// Bounds-checked big-endian reader over the input bytes
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_bytes(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if n > self.remaining() {
            boc_bail!(
                "Unexpected end of data reading {}: need {} bytes, {} left",
                what,
                n,
                self.remaining()
            );
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.read_bytes(1, what)?[0])
    }

    fn read_uint(&mut self, size: usize, what: &str) -> Result<usize> {
        let bytes = self.read_bytes(size, what)?;
        let value = BigEndian::read_uint(bytes, size);
        usize::try_from(value)
            .map_err(|_| TvmError::MalformedBoc(format!("{} {} does not fit in usize", what, value)))
    }
}

/// Whether `bytes` begins with one of the BoC magic numbers
pub fn has_boc_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 4
        && matches!(
            BigEndian::read_u32(bytes),
            BOC_GENERIC_MAGIC | BOC_INDEXED_MAGIC | BOC_INDEXED_CRC32C_MAGIC
        )
}

/// Deserializes a Bag of Cells (BoC) into its first root cell
pub fn deserialize_boc(data: &[u8]) -> Result<Arc<Cell>> {
    deserialize_boc_roots(data)?
        .into_iter()
        .next()
        .ok_or_else(|| TvmError::MalformedBoc("BoC has no roots".to_string()))
}

/// Deserializes a Bag of Cells (BoC) into all of its root cells
pub fn deserialize_boc_roots(data: &[u8]) -> Result<Vec<Arc<Cell>>> {
    let mut reader = Reader::new(data);
    let header = parse_header(&mut reader)?;

    log::trace!(
        "BoC header: {} cells, {} roots, {} bytes of cell data, ref size {}",
        header.cells_count,
        header.roots.len(),
        header.cells_size,
        header.size_bytes
    );

    let cells_start = reader.pos;
    let cells_data = reader.read_bytes(header.cells_size, "cells")?;

    if header.has_crc32c {
        let crc_bytes = reader.read_bytes(4, "CRC32C")?;
        let expected_crc = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let actual_crc = crate::crc::CRC32C.checksum(&data[..cells_start + header.cells_size]);
        if expected_crc != actual_crc {
            boc_bail!(
                "CRC32C mismatch: expected 0x{:08x}, got 0x{:08x}",
                expected_crc,
                actual_crc
            );
        }
    }

    if reader.remaining() != 0 {
        boc_bail!("{} trailing bytes after BoC", reader.remaining());
    }

    let raw_cells = parse_cells(cells_data, header.cells_count, header.size_bytes)?;
    let cells = link_cells(raw_cells)?;

    Ok(header.roots.iter().map(|&idx| cells[idx].clone()).collect())
}

fn parse_header(reader: &mut Reader<'_>) -> Result<Header> {
    let magic = reader.read_uint(4, "magic")? as u32;

    let (has_idx, has_crc32c, size_bytes, has_root_list) = match magic {
        BOC_GENERIC_MAGIC => {
            let flags_and_size = reader.read_u8("flags")?;
            let has_idx = flags_and_size & 0x80 != 0;
            let has_crc32c = flags_and_size & 0x40 != 0;
            // 0x20 is has_cache_bits, which only affects the index we skip anyway
            if flags_and_size & 0x18 != 0 {
                boc_bail!("Reserved flag bits set: 0x{:02x}", flags_and_size);
            }
            (has_idx, has_crc32c, (flags_and_size & 0x07) as usize, true)
        }
        BOC_INDEXED_MAGIC | BOC_INDEXED_CRC32C_MAGIC => {
            let size_bytes = reader.read_u8("size")? as usize;
            (true, magic == BOC_INDEXED_CRC32C_MAGIC, size_bytes, false)
        }
        _ => boc_bail!("Invalid BoC magic number: 0x{:08x}", magic),
    };

    if size_bytes == 0 || size_bytes > MAX_SIZE_BYTES {
        boc_bail!("Invalid size_bytes: {}", size_bytes);
    }

    let offset_bytes = reader.read_u8("offset size")? as usize;
    if offset_bytes == 0 || offset_bytes > MAX_OFFSET_BYTES {
        boc_bail!("Invalid offset_bytes: {}", offset_bytes);
    }

    let cells_count = reader.read_uint(size_bytes, "cell count")?;
    let roots_count = reader.read_uint(size_bytes, "root count")?;
    let absent_count = reader.read_uint(size_bytes, "absent count")?;
    let cells_size = reader.read_uint(offset_bytes, "total cells size")?;

    if roots_count == 0 {
        boc_bail!("BoC declares no roots");
    }
    if roots_count > cells_count {
        boc_bail!("{} roots declared for {} cells", roots_count, cells_count);
    }
    if absent_count != 0 {
        boc_bail!("Absent cells are not supported ({} declared)", absent_count);
    }
    // Every cell takes at least its two descriptor bytes
    if cells_count > cells_size / MIN_CELL_BYTES {
        boc_bail!(
            "{} cells cannot fit in {} bytes of cell data",
            cells_count,
            cells_size
        );
    }
    if cells_size > reader.remaining() {
        boc_bail!(
            "Declared cells size {} exceeds the {} bytes available",
            cells_size,
            reader.remaining()
        );
    }

    let roots = if has_root_list {
        let mut roots = Vec::with_capacity(roots_count.min(reader.remaining() / size_bytes));
        for _ in 0..roots_count {
            let root = reader.read_uint(size_bytes, "root index")?;
            if root >= cells_count {
                boc_bail!("Invalid root index: {} (of {} cells)", root, cells_count);
            }
            roots.push(root);
        }
        roots
    } else {
        (0..roots_count).collect()
    };

    if has_idx {
        let index_size = cells_count
            .checked_mul(offset_bytes)
            .ok_or_else(|| TvmError::MalformedBoc("Index size overflows".to_string()))?;
        reader.read_bytes(index_size, "index")?;
    }

    Ok(Header {
        size_bytes,
        has_crc32c,
        cells_count,
        roots,
        cells_size,
    })
}

fn parse_cells(data: &[u8], count: usize, size_bytes: usize) -> Result<Vec<RawCell>> {
    let mut reader = Reader::new(data);
    let mut cells = Vec::with_capacity(count);

    for idx in 0..count {
        let d1 = reader.read_u8("cell descriptor")?;
        let d2 = reader.read_u8("cell descriptor")?;

        let ref_count = (d1 & 0x07) as usize;
        let is_exotic = d1 & 0x08 != 0;
        let with_hashes = d1 & 0x10 != 0;
        let level_mask = d1 >> 5;

        if ref_count > MAX_CELL_REFS {
            boc_bail!("Cell {} declares {} references", idx, ref_count);
        }

        if with_hashes {
            // Stored hashes and depths are recomputed, skip them
            let hash_count = level_mask.count_ones() as usize + 1;
            reader.read_bytes(hash_count * (32 + 2), "stored hashes")?;
        }

        // d2 = floor(b/8) + ceil(b/8): even for whole bytes, odd when the last byte is partial
        let data_size = (d2 as usize).div_ceil(2);
        let cell_data = reader.read_bytes(data_size, "cell data")?;

        let bit_len = if d2 % 2 == 0 {
            data_size * 8
        } else {
            // Partial last byte: strip the completion bit (the lowest set bit)
            let last_byte = cell_data[data_size - 1];
            if last_byte == 0 {
                boc_bail!("Cell {} is missing its completion bit", idx);
            }
            (data_size - 1) * 8 + 7 - last_byte.trailing_zeros() as usize
        };

        if bit_len > MAX_CELL_BITS {
            boc_bail!("Cell {} has {} bits, maximum is {}", idx, bit_len, MAX_CELL_BITS);
        }

        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let ref_idx = reader.read_uint(size_bytes, "reference index")?;
            if ref_idx >= count {
                boc_bail!("Cell {} references index {} of {} cells", idx, ref_idx, count);
            }
            refs.push(ref_idx);
        }

        cells.push(RawCell {
            data: cell_data.to_vec(),
            bit_len,
            refs,
            is_exotic,
            level_mask,
        });
    }

    if reader.remaining() != 0 {
        boc_bail!(
            "{} bytes of cell data left over after {} cells",
            reader.remaining(),
            count
        );
    }

    Ok(cells)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Open,
    Done,
}

/// Second pass: turn the index arena into linked cells, rejecting cycles
fn link_cells(raw_cells: Vec<RawCell>) -> Result<Vec<Arc<Cell>>> {
    let count = raw_cells.len();
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; count];
    let mut state = vec![Visit::New; count];

    for start in 0..count {
        if state[start] == Visit::Done {
            continue;
        }

        // Iterative post-order walk, so deep chains cannot exhaust the stack
        let mut stack = vec![start];
        while let Some(&idx) = stack.last() {
            match state[idx] {
                Visit::Done => {
                    stack.pop();
                }
                Visit::New => {
                    state[idx] = Visit::Open;
                    for &child in &raw_cells[idx].refs {
                        match state[child] {
                            Visit::Open => boc_bail!("Reference cycle through cell {}", child),
                            Visit::New => stack.push(child),
                            Visit::Done => {}
                        }
                    }
                }
                Visit::Open => {
                    let raw = &raw_cells[idx];
                    let mut references = Vec::with_capacity(raw.refs.len());
                    for &child in &raw.refs {
                        match &built[child] {
                            Some(cell) => references.push(cell.clone()),
                            None => boc_bail!("Reference cycle through cell {}", child),
                        }
                    }

                    let cell = Cell::from_parts(
                        raw.data.clone(),
                        raw.bit_len,
                        references,
                        raw.is_exotic,
                        raw.level_mask,
                    )
                    .map_err(|e| TvmError::MalformedBoc(format!("Cell {}: {}", idx, e)))?;

                    built[idx] = Some(Arc::new(cell));
                    state[idx] = Visit::Done;
                    stack.pop();
                }
            }
        }
    }

    built
        .into_iter()
        .enumerate()
        .map(|(idx, cell)| {
            cell.ok_or_else(|| TvmError::MalformedBoc(format!("Cell {} was never linked", idx)))
        })
        .collect()
}

/// Serializes a cell and its references into a Bag of Cells (BoC) format
///
/// The root is written first and every cell precedes the cells it references;
/// identical subtrees are stored once.
pub fn serialize_boc(root: &Arc<Cell>, has_crc32c: bool) -> Result<Vec<u8>> {
    let cells = collect_cells(root);

    let cell_index: HashMap<[u8; 32], usize> = cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| (cell.hash(), idx))
        .collect();

    let size_bytes = bytes_needed(cells.len());

    let mut serialized_cells = Vec::with_capacity(cells.len());
    for cell in &cells {
        serialized_cells.push(serialize_cell(cell, &cell_index, size_bytes)?);
    }

    let cells_size: usize = serialized_cells.iter().map(|c| c.len()).sum();
    let offset_bytes = bytes_needed(cells_size);

    let mut result = Vec::new();

    result.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());

    // has_idx = 0, has_cache_bits = 0
    let flags = if has_crc32c { 0x40 } else { 0x00 };
    result.push(flags | size_bytes as u8);
    result.push(offset_bytes as u8);

    write_uint(&mut result, cells.len(), size_bytes);
    // One root, no absent cells
    write_uint(&mut result, 1, size_bytes);
    write_uint(&mut result, 0, size_bytes);
    write_uint(&mut result, cells_size, offset_bytes);
    // The root is always cell 0
    write_uint(&mut result, 0, size_bytes);

    for cell_data in serialized_cells {
        result.extend_from_slice(&cell_data);
    }

    if has_crc32c {
        let crc = crate::crc::CRC32C.checksum(&result);
        result.extend_from_slice(&crc.to_le_bytes());
    }

    Ok(result)
}

fn serialize_cell(
    cell: &Arc<Cell>,
    cell_index: &HashMap<[u8; 32], usize>,
    size_bytes: usize,
) -> Result<Vec<u8>> {
    let mut result = Vec::new();

    result.extend_from_slice(&cell.descriptors());
    result.extend_from_slice(&cell.serialize_data());

    for reference in cell.references() {
        let ref_idx = cell_index
            .get(&reference.hash())
            .ok_or_else(|| TvmError::MalformedCell("Reference not found in cell map".to_string()))?;
        write_uint(&mut result, *ref_idx, size_bytes);
    }

    Ok(result)
}

/// Unique cells in topological order: reverse post-order of a depth-first walk
fn collect_cells(root: &Arc<Cell>) -> Vec<Arc<Cell>> {
    let mut post_order = Vec::new();
    let mut visited = HashSet::new();
    collect_cells_recursive(root, &mut post_order, &mut visited);
    post_order.reverse();
    post_order
}

fn collect_cells_recursive(
    cell: &Arc<Cell>,
    cells: &mut Vec<Arc<Cell>>,
    visited: &mut HashSet<[u8; 32]>,
) {
    if !visited.insert(cell.hash()) {
        return;
    }

    for reference in cell.references() {
        collect_cells_recursive(reference, cells, visited);
    }

    cells.push(cell.clone());
}

fn bytes_needed(value: usize) -> usize {
    if value == 0 {
        return 1;
    }

    let bits = (usize::BITS - value.leading_zeros()) as usize;
    bits.div_ceil(8)
}

fn write_uint(buf: &mut Vec<u8>, value: usize, size: usize) {
    let bytes = (value as u64).to_be_bytes();
    buf.extend_from_slice(&bytes[8 - size..]);
}

/// Converts a hex string to a BoC
pub fn hex_to_boc(hex: &str) -> Result<Arc<Cell>> {
    let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes =
        hex::decode(&hex).map_err(|e| TvmError::MalformedBoc(format!("Failed to decode hex: {}", e)))?;
    deserialize_boc(&bytes)
}

/// Converts a BoC to a hex string
pub fn boc_to_hex(cell: &Arc<Cell>, has_crc32c: bool) -> Result<String> {
    let bytes = serialize_boc(cell, has_crc32c)?;
    Ok(hex::encode(bytes))
}

/// Converts a BoC to base64
pub fn boc_to_base64(cell: &Arc<Cell>, has_crc32c: bool) -> Result<String> {
    use base64::Engine;
    let bytes = serialize_boc(cell, has_crc32c)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Converts a base64 string to a BoC
pub fn base64_to_boc(b64: &str) -> Result<Arc<Cell>> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| TvmError::MalformedBoc(format!("Failed to decode base64: {}", e)))?;
    deserialize_boc(&bytes)
}
