//! the bag-of-cells container format.
//!
//! ```text
//! magic           4 bytes   b5ee9c72 | 68ff65f3 | acc3a728
//! flags/size      1 byte    full: index, crc, cache bits, 2 custom, 3-bit size_bytes
//!                           lean: size_bytes
//! offset_bytes    1 byte
//! cells           size_bytes
//! roots           size_bytes
//! absent          size_bytes
//! total size      offset_bytes
//! root list       roots * size_bytes
//! index           cells * offset_bytes      (optional)
//! cell data       total size
//! crc32c          4 bytes, little endian    (optional)
//! ```
//!
//! each cell is `d1 d2 payload refs...` where d1 holds the reference count
//! (decode also honours the exotic bit 0x08), d2 the payload length, and each reference is a
//! `size_bytes`-wide index of a later cell.

mod de;
mod header;
mod ser;
mod topo;

pub use de::{deserialize_boc, deserialize_boc_base64, deserialize_boc_hex};
pub use header::{parse_header, BocFormat, BocHeader, MAGIC_FULL, MAGIC_LEAN, MAGIC_LEAN_CRC};
pub use ser::{serialize, SerializeOptions};
pub use topo::{topological_sort, Linearization};
