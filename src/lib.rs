//! boc - bag of cells codec
//!
//! binary codec and hashing engine for the cell DAG data model. a cell holds
//! up to 1023 payload bits and up to 4 ordered references to child cells; a
//! bag of cells serializes one or more cell trees behind a small header.
//!
//! # Core concepts
//!
//! - **BitString**: fixed-capacity bit buffer with the top-up padding convention
//! - **Cell**: payload bits plus up to 4 child references, optionally exotic
//! - **Hash**: SHA-256 over descriptors, payload, child depths and child hashes
//! - **Bag of cells**: preorder-linearized cells behind a header, optional
//!   offset index and crc32c trailer
//!
//! # Hash format
//!
//! cell hash = SHA256(d1 | d2 | top-upped payload | child depths... | child hashes...)
//!
//! where d1 = refs count, d2 = ceil(bits/8) + floor(bits/8),
//! and each child depth is 2 bytes big endian.
//!
//! # Example usage
//!
//! ```
//! use boc::{deserialize_boc, Cell};
//! use std::sync::Arc;
//!
//! let mut child = Cell::new();
//! child.bits_mut().write_uint(0b1011, 4).unwrap();
//!
//! let mut root = Cell::new();
//! root.add_reference(Arc::new(child)).unwrap();
//!
//! let bytes = root.to_boc().unwrap();
//! let roots = deserialize_boc(&bytes).unwrap();
//! assert_eq!(roots[0].hash(), root.hash());
//! ```

mod cell;
mod config;
mod error;
mod hash;

pub mod bits;
pub mod boc;
pub mod text;

pub use bits::{BitReader, BitString, CELL_MAX_BITS};
pub use boc::{
    deserialize_boc, deserialize_boc_base64, deserialize_boc_hex, parse_header, serialize,
    topological_sort, BocFormat, BocHeader, Linearization, SerializeOptions,
};
pub use cell::{Cell, MAX_REFS};
pub use config::Config;
pub use error::{Error, IoResultExt, Result};
pub use hash::Hash;
