//! TVM (TON Virtual Machine) data structures and utilities
//!
//! This module provides the read side of TON's cell model:
//! - Cell: The basic data structure that can store up to 1023 bits and up to 4 references
//! - Slice: A cursor for sequentially reading cell data
//! - BoC: Bag of Cells serialization format for encoding cells into byte arrays
//! - Builder: Convenience builder for assembling cells
//! - Address: TON internal address handling

pub mod address;
pub mod boc;
pub mod builder;
pub mod cell;
pub mod error;
pub mod slice;

pub use address::{Address, AddressError};
pub use boc::{
    base64_to_boc, boc_to_base64, boc_to_hex, deserialize_boc, deserialize_boc_roots,
    has_boc_magic, hex_to_boc, serialize_boc,
};
pub use builder::Builder;
pub use cell::{Cell, CellBuilder, MAX_CELL_BITS, MAX_CELL_DEPTH, MAX_CELL_LEVEL, MAX_CELL_REFS};
pub use error::TvmError;
pub use slice::Slice;
