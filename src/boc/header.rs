use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};

/// magic prefix of the generic format with a flags byte
pub const MAGIC_FULL: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];
/// magic prefix of the lean format: always indexed, no checksum
pub const MAGIC_LEAN: [u8; 4] = [0x68, 0xff, 0x65, 0xf3];
/// magic prefix of the lean format with crc32c trailer
pub const MAGIC_LEAN_CRC: [u8; 4] = [0xac, 0xc3, 0xa7, 0x28];

/// integer fields are at most this many bytes wide
const MAX_FIELD_BYTES: usize = 8;

/// header variant selected by the magic prefix
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BocFormat {
    Full,
    Lean,
    LeanCrc,
}

impl BocFormat {
    pub fn from_magic(magic: [u8; 4]) -> Option<Self> {
        match magic {
            MAGIC_FULL => Some(BocFormat::Full),
            MAGIC_LEAN => Some(BocFormat::Lean),
            MAGIC_LEAN_CRC => Some(BocFormat::LeanCrc),
            _ => None,
        }
    }

    pub fn magic(&self) -> [u8; 4] {
        match self {
            BocFormat::Full => MAGIC_FULL,
            BocFormat::Lean => MAGIC_LEAN,
            BocFormat::LeanCrc => MAGIC_LEAN_CRC,
        }
    }
}

impl fmt::Display for BocFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BocFormat::Full => write!(f, "full"),
            BocFormat::Lean => write!(f, "lean"),
            BocFormat::LeanCrc => write!(f, "lean+crc32c"),
        }
    }
}

/// parsed container header; borrows the cell data from the input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BocHeader<'a> {
    pub format: BocFormat,
    pub has_index: bool,
    pub has_crc32: bool,
    pub has_cache_bits: bool,
    /// 2-bit custom flags (full format only)
    pub flags: u8,
    /// width of counters, root indices and cell references
    pub size_bytes: usize,
    /// width of the data size and index entries
    pub offset_bytes: usize,
    pub cells_count: usize,
    pub roots_count: usize,
    pub absent_count: u64,
    pub total_cells_size: usize,
    pub root_list: Vec<usize>,
    /// per-cell byte offsets, consumed but not needed for decoding
    pub index: Vec<u64>,
    pub cells_data: &'a [u8],
}

/// bounds-checked big-endian reader over a byte slice
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// take `n` bytes, failing with the name of the missing segment
    pub fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::NotEnoughBytes { what });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self, what: &'static str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    /// read an `n`-byte big-endian unsigned integer, `n <= 8`
    pub fn read_uint(&mut self, n: usize, what: &'static str) -> Result<u64> {
        let bytes = self.take(n, what)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    /// make sure `count` items of `width` bytes are available
    pub fn ensure(&self, count: usize, width: usize, what: &'static str) -> Result<()> {
        match count.checked_mul(width) {
            Some(n) if n <= self.remaining() => Ok(()),
            _ => Err(Error::NotEnoughBytes { what }),
        }
    }
}

fn check_width(name: &str, width: usize) -> Result<()> {
    if width == 0 || width > MAX_FIELD_BYTES {
        return Err(Error::InvalidHeader(format!(
            "{} width {} outside 1..={}",
            name, width, MAX_FIELD_BYTES
        )));
    }
    Ok(())
}

fn to_usize(value: u64, name: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::InvalidHeader(format!("{} {} is too large", name, value)))
}

/// parse and validate a serialized bag of cells up to its cell data
///
/// every declared length is checked against the remaining input before it
/// is used. when the header announces a checksum, the crc32c of all bytes
/// before the trailer must match. nothing may follow the last segment.
pub fn parse_header(boc: &[u8]) -> Result<BocHeader<'_>> {
    let mut input = ByteReader::new(boc);

    let mut magic = [0u8; 4];
    magic.copy_from_slice(input.take(4, "magic prefix")?);
    let format = BocFormat::from_magic(magic).ok_or(Error::UnknownMagic(magic))?;

    let flags_byte = input.read_u8("flags")?;
    let (has_index, has_crc32, has_cache_bits, flags, size_bytes) = match format {
        BocFormat::Full => (
            flags_byte & 0x80 != 0,
            flags_byte & 0x40 != 0,
            flags_byte & 0x20 != 0,
            (flags_byte >> 3) & 0x03,
            (flags_byte & 0x07) as usize,
        ),
        BocFormat::Lean => (true, false, false, 0, flags_byte as usize),
        BocFormat::LeanCrc => (true, true, false, 0, flags_byte as usize),
    };

    let offset_bytes = input.read_u8("cells counters")? as usize;
    check_width("size", size_bytes)?;
    check_width("offset", offset_bytes)?;

    input.ensure(1, 3 * size_bytes + offset_bytes, "cells counters")?;
    let cells_count = to_usize(input.read_uint(size_bytes, "cells counters")?, "cell count")?;
    let roots_count = to_usize(input.read_uint(size_bytes, "cells counters")?, "root count")?;
    let absent_count = input.read_uint(size_bytes, "cells counters")?;
    let total_cells_size = to_usize(
        input.read_uint(offset_bytes, "cells counters")?,
        "total cells size",
    )?;

    input.ensure(roots_count, size_bytes, "root list")?;
    let mut root_list = Vec::with_capacity(roots_count);
    for _ in 0..roots_count {
        let root = input.read_uint(size_bytes, "root list")?;
        if root >= cells_count as u64 {
            return Err(Error::RootOutOfRange {
                root,
                count: cells_count,
            });
        }
        root_list.push(root as usize);
    }

    let mut index = Vec::new();
    if has_index {
        input.ensure(cells_count, offset_bytes, "index")?;
        index.reserve(cells_count);
        for _ in 0..cells_count {
            index.push(input.read_uint(offset_bytes, "index")?);
        }
    }

    let cells_data = input.take(total_cells_size, "cells data")?;

    if has_crc32 {
        let covered = input.position();
        let trailer = input.take(4, "crc32c hashsum")?;
        let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let computed = crc32c::crc32c(&boc[..covered]);
        if stored != computed {
            return Err(Error::ChecksumMismatch { stored, computed });
        }
    }

    if input.remaining() > 0 {
        return Err(Error::TrailingBytes(input.remaining()));
    }

    debug!(
        %format,
        cells = cells_count,
        roots = roots_count,
        size_bytes,
        offset_bytes,
        has_index,
        has_crc32,
        "parsed boc header"
    );

    Ok(BocHeader {
        format,
        has_index,
        has_crc32,
        has_cache_bits,
        flags,
        size_bytes,
        offset_bytes,
        cells_count,
        roots_count,
        absent_count,
        total_cells_size,
        root_list,
        index,
        cells_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// full header, 1-byte widths, one empty cell, no index or crc
    fn minimal() -> Vec<u8> {
        let mut b = MAGIC_FULL.to_vec();
        b.extend_from_slice(&[0x01, 0x01]); // flags: size_bytes=1; offset_bytes=1
        b.extend_from_slice(&[1, 1, 0]); // cells, roots, absent
        b.push(2); // total cells size
        b.push(0); // root index
        b.extend_from_slice(&[0, 0]); // empty cell
        b
    }

    #[test]
    fn test_parse_minimal() {
        let data = minimal();
        let h = parse_header(&data).unwrap();
        assert_eq!(h.format, BocFormat::Full);
        assert!(!h.has_index && !h.has_crc32 && !h.has_cache_bits);
        assert_eq!(h.size_bytes, 1);
        assert_eq!(h.offset_bytes, 1);
        assert_eq!(h.cells_count, 1);
        assert_eq!(h.roots_count, 1);
        assert_eq!(h.root_list, vec![0]);
        assert_eq!(h.cells_data, &[0, 0]);
    }

    #[test]
    fn test_flag_bits() {
        let mut data = minimal();
        data[4] = 0b1011_1001; // index, cache bits, custom flags 0b11, size 1
        data.insert(11, 0); // one index entry before cell data
        let h = parse_header(&data).unwrap();
        assert!(h.has_index);
        assert!(!h.has_crc32);
        assert!(h.has_cache_bits);
        assert_eq!(h.flags, 0b11);
        assert_eq!(h.index, vec![0]);
    }

    #[test]
    fn test_lean_formats() {
        let mut data = MAGIC_LEAN.to_vec();
        data.extend_from_slice(&[1, 1, 1, 1, 0, 2, 0, 0, 0, 0]);
        let h = parse_header(&data).unwrap();
        assert_eq!(h.format, BocFormat::Lean);
        assert!(h.has_index && !h.has_crc32);
        assert_eq!(h.index, vec![0]);

        let mut data = MAGIC_LEAN_CRC.to_vec();
        data.extend_from_slice(&[1, 1, 1, 1, 0, 2, 0, 0, 0, 0]);
        let crc = crc32c::crc32c(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        let h = parse_header(&data).unwrap();
        assert_eq!(h.format, BocFormat::LeanCrc);
        assert!(h.has_index && h.has_crc32);
    }

    #[test]
    fn test_format_magic() {
        for format in [BocFormat::Full, BocFormat::Lean, BocFormat::LeanCrc] {
            assert_eq!(BocFormat::from_magic(format.magic()), Some(format));
        }
        assert_eq!(BocFormat::from_magic([0; 4]), None);
    }

    #[test]
    fn test_unknown_magic() {
        let mut data = minimal();
        data[0] = 0x00;
        assert!(matches!(parse_header(&data), Err(Error::UnknownMagic(_))));
    }

    #[test]
    fn test_too_short_for_magic() {
        assert!(matches!(
            parse_header(&MAGIC_FULL[..3]),
            Err(Error::NotEnoughBytes {
                what: "magic prefix"
            })
        ));
        assert!(matches!(
            parse_header(&MAGIC_FULL),
            Err(Error::NotEnoughBytes { what: "flags" })
        ));
    }

    #[test]
    fn test_missing_segments_are_named() {
        let data = minimal();
        let expect = |len: usize, what: &str| match parse_header(&data[..len]) {
            Err(Error::NotEnoughBytes { what: got }) => assert_eq!(got, what, "len {}", len),
            other => panic!("len {}: unexpected {:?}", len, other),
        };
        expect(5, "cells counters");
        expect(9, "cells counters");
        expect(10, "root list");
        expect(11, "cells data");
        expect(12, "cells data");
    }

    #[test]
    fn test_bad_widths() {
        let mut data = minimal();
        data[4] = 0x00; // size_bytes = 0
        assert!(matches!(parse_header(&data), Err(Error::InvalidHeader(_))));

        let mut data = MAGIC_LEAN.to_vec();
        data.extend_from_slice(&[200, 1, 0, 0, 0, 0]);
        assert!(matches!(parse_header(&data), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_root_out_of_range() {
        let mut data = minimal();
        data[10] = 1;
        assert!(matches!(
            parse_header(&data),
            Err(Error::RootOutOfRange { root: 1, count: 1 })
        ));
    }

    #[test]
    fn test_huge_counts_do_not_allocate() {
        let mut data = MAGIC_FULL.to_vec();
        data.extend_from_slice(&[0x84, 0x01]); // index, size_bytes=4
        data.extend_from_slice(&0xffff_ffffu32.to_be_bytes()); // cells
        data.extend_from_slice(&0xffff_ffffu32.to_be_bytes()); // roots
        data.extend_from_slice(&[0, 0, 0, 0, 0]);
        assert!(matches!(
            parse_header(&data),
            Err(Error::NotEnoughBytes { what: "root list" })
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut data = minimal();
        data.push(0xff);
        assert!(matches!(parse_header(&data), Err(Error::TrailingBytes(1))));
    }

    #[test]
    fn test_checksum_trailer_missing() {
        let mut data = minimal();
        data[4] |= 0x40;
        assert!(matches!(
            parse_header(&data),
            Err(Error::NotEnoughBytes {
                what: "crc32c hashsum"
            })
        ));
    }
}
