use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bits::BitString;
use crate::boc::header::MAGIC_FULL;
use crate::boc::topo::{topological_sort, Linearization};
use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::hash::repr_without_refs;

/// knobs for the full-format header
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializeOptions {
    /// emit the per-cell offset index
    pub index: bool,
    /// append a crc32c trailer
    pub crc32: bool,
    /// set the has-cache-bits flag
    pub cache_bits: bool,
    /// 2-bit custom flags
    pub flags: u8,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            index: true,
            crc32: true,
            cache_bits: false,
            flags: 0,
        }
    }
}

/// smallest number of bytes able to hold `value`, at least one
fn byte_width(value: u64) -> usize {
    ((64 - value.leading_zeros()) as usize).div_ceil(8).max(1)
}

/// descriptors, payload and `ref_size`-wide reference indices of one cell
fn cell_repr(cell: &Cell, linear: &Linearization<'_>, ref_size: usize) -> Result<Vec<u8>> {
    let mut repr = repr_without_refs(cell);
    for child in cell.references() {
        let hash = child.hash();
        let index = linear.index_of(&hash).ok_or(Error::CircularReference(hash))?;
        repr.extend_from_slice(&(index as u64).to_be_bytes()[8 - ref_size..]);
    }
    Ok(repr)
}

/// serialize the tree below `root` as a single-root full-format bag of cells
///
/// reference indices are written `size_bytes` wide, the same width the
/// decoder reads them with.
pub fn serialize(root: &Cell, opts: &SerializeOptions) -> Result<Vec<u8>> {
    if opts.flags > 0b11 {
        return Err(Error::InvalidHeader(format!(
            "custom flags {} do not fit in 2 bits",
            opts.flags
        )));
    }

    let linear = topological_sort(root)?;
    let cells_count = linear.len();
    let size_bytes = byte_width(cells_count as u64);

    let mut reprs = Vec::with_capacity(cells_count);
    let mut offsets = Vec::with_capacity(cells_count);
    let mut full_size = 0usize;
    for cell in &linear.cells {
        offsets.push(full_size);
        let repr = cell_repr(cell, &linear, size_bytes)?;
        full_size += repr.len();
        reprs.push(repr);
    }
    let offset_bytes = byte_width(full_size as u64);

    let index_size = if opts.index {
        cells_count * offset_bytes
    } else {
        0
    };
    let total_bytes = 4 + 1 + 1 + 4 * size_bytes + offset_bytes + index_size + full_size;
    let mut out = BitString::new(total_bytes * 8);

    out.write_bytes(&MAGIC_FULL)?;
    out.write_bits(&[opts.index, opts.crc32, opts.cache_bits])?;
    out.write_uint(opts.flags as u64, 2)?;
    out.write_uint(size_bytes as u64, 3)?;
    out.write_uint(offset_bytes as u64, 8)?;
    out.write_uint(cells_count as u64, size_bytes * 8)?;
    // one root, no absent cells
    out.write_uint(1, size_bytes * 8)?;
    out.write_uint(0, size_bytes * 8)?;
    out.write_uint(full_size as u64, offset_bytes * 8)?;
    // the root is always linearized first
    out.write_uint(0, size_bytes * 8)?;

    if opts.index {
        for offset in &offsets {
            out.write_uint(*offset as u64, offset_bytes * 8)?;
        }
    }
    for repr in &reprs {
        out.write_bytes(repr)?;
    }

    let (mut bytes, _) = out.top_upped_array();
    if opts.crc32 {
        let crc = crc32c::crc32c(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
    }

    debug!(
        cells = cells_count,
        size_bytes,
        offset_bytes,
        bytes = bytes.len(),
        "serialized boc"
    );

    Ok(bytes)
}
