use std::sync::Arc;

use tracing::{debug, trace};

use crate::boc::header::{parse_header, ByteReader};
use crate::cell::{Cell, MAX_REFS};
use crate::error::{Error, Result};
use crate::text;

/// a decoded cell whose references are still raw indices
struct RawCell {
    cell: Cell,
    refs: Vec<usize>,
}

/// decode one cell descriptor, its payload and its reference indices
fn read_cell(input: &mut ByteReader<'_>, ref_size: usize) -> Result<RawCell> {
    let descriptors = input.take(2, "cell descriptors")?;
    let (d1, d2) = (descriptors[0], descriptors[1]);

    let exotic = d1 & 0x08 != 0;
    let refs_count = (d1 % 8) as usize;
    if refs_count > MAX_REFS {
        return Err(Error::TooManyReferences(refs_count));
    }
    let data_len = d2.div_ceil(2) as usize;
    let fullfilled = d2 % 2 == 0;

    let mut cell = if exotic {
        Cell::new_exotic()
    } else {
        Cell::new()
    };

    input.ensure(1, data_len + ref_size * refs_count, "cell data")?;
    let data = input.take(data_len, "cell data")?;
    cell.bits_mut().set_top_upped_array(data, fullfilled)?;

    let mut refs = Vec::with_capacity(refs_count);
    for _ in 0..refs_count {
        let r = input.read_uint(ref_size, "cell data")?;
        refs.push(usize::try_from(r).unwrap_or(usize::MAX));
    }

    Ok(RawCell { cell, refs })
}

/// decode a bag of cells and return its root cells
///
/// cells are linked from last to first; every reference must point to a
/// later cell than the one holding it. nothing is returned on error.
pub fn deserialize_boc(boc: &[u8]) -> Result<Vec<Arc<Cell>>> {
    let header = parse_header(boc)?;
    let count = header.cells_count;

    let mut input = ByteReader::new(header.cells_data);
    let mut raw = Vec::new();
    for i in 0..count {
        raw.push(read_cell(&mut input, header.size_bytes)?);
        trace!(cell = i, "decoded cell descriptor");
    }
    if input.remaining() > 0 {
        return Err(Error::TrailingCellData(input.remaining()));
    }

    let mut linked: Vec<Option<Arc<Cell>>> = vec![None; count];
    for (i, RawCell { mut cell, refs }) in raw.into_iter().enumerate().rev() {
        for r in refs {
            if r >= count {
                return Err(Error::ReferenceOutOfRange {
                    cell: i,
                    reference: r,
                    count,
                });
            }
            // a cell cannot reference itself or anything before it
            let child = match linked.get(r) {
                Some(Some(child)) if r > i => child.clone(),
                _ => return Err(Error::TopologicalOrder { cell: i, reference: r }),
            };
            cell.add_reference(child)?;
        }
        linked[i] = Some(Arc::new(cell));
    }

    let mut roots = Vec::with_capacity(header.root_list.len());
    for &root in &header.root_list {
        let cell = linked
            .get(root)
            .cloned()
            .flatten()
            .ok_or(Error::RootOutOfRange {
                root: root as u64,
                count,
            })?;
        roots.push(cell);
    }

    debug!(cells = count, roots = roots.len(), "deserialized boc");
    Ok(roots)
}

/// decode a hex-encoded bag of cells
pub fn deserialize_boc_hex(s: &str) -> Result<Vec<Arc<Cell>>> {
    deserialize_boc(&text::decode_hex(s)?)
}

/// decode a base64-encoded bag of cells
pub fn deserialize_boc_base64(s: &str) -> Result<Vec<Arc<Cell>>> {
    deserialize_boc(&text::decode_base64(s)?)
}
