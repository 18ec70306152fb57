use std::fmt;

use crate::error::{Error, Result};

/// maximum payload of a single cell, in bits
pub const CELL_MAX_BITS: usize = 1023;

/// fixed-capacity, append-only bit buffer
///
/// bits are stored most-significant first. bits past the cursor are
/// always zero, so two strings with equal content compare equal.
#[derive(Clone, PartialEq, Eq)]
pub struct BitString {
    buf: Vec<u8>,
    capacity: usize,
    cursor: usize,
}

impl BitString {
    /// create an empty bit string holding at most `capacity` bits
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity.div_ceil(8)],
            capacity,
            cursor: 0,
        }
    }

    /// create an empty bit string sized for a cell payload
    pub fn for_cell() -> Self {
        Self::new(CELL_MAX_BITS)
    }

    /// total number of bits this string can hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// number of bits written so far
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// number of bits that can still be written
    pub fn bits_left(&self) -> usize {
        self.capacity - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// written bytes; the last one may be partially used
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.cursor.div_ceil(8)]
    }

    /// read the bit at position `n`
    pub fn get_bit(&self, n: usize) -> Result<bool> {
        if n >= self.cursor {
            return Err(Error::ReadOutOfBounds {
                requested: n + 1,
                available: self.cursor,
            });
        }
        Ok(self.bit_at(n))
    }

    pub(crate) fn bit_at(&self, n: usize) -> bool {
        self.buf[n / 8] & (0x80 >> (n % 8)) != 0
    }

    fn reserve(&self, bits: usize) -> Result<()> {
        if bits > self.bits_left() {
            return Err(Error::BitOverflow {
                requested: bits,
                available: self.bits_left(),
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if bit {
            self.buf[self.cursor / 8] |= 0x80 >> (self.cursor % 8);
        }
        self.cursor += 1;
    }

    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.reserve(1)?;
        self.push_bit(bit);
        Ok(())
    }

    pub fn write_bits(&mut self, bits: &[bool]) -> Result<()> {
        self.reserve(bits.len())?;
        for &bit in bits {
            self.push_bit(bit);
        }
        Ok(())
    }

    /// append the low `width` bits of `value`, most significant first
    pub fn write_uint(&mut self, value: u64, width: usize) -> Result<()> {
        if width > 64 || (width < 64 && value >> width != 0) {
            return Err(Error::UintOverflow { value, width });
        }
        self.reserve(width)?;
        for i in (0..width).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len() * 8)?;
        if self.cursor % 8 == 0 {
            let start = self.cursor / 8;
            self.buf[start..start + bytes.len()].copy_from_slice(bytes);
            self.cursor += bytes.len() * 8;
        } else {
            for &byte in bytes {
                for i in (0..8).rev() {
                    self.push_bit((byte >> i) & 1 == 1);
                }
            }
        }
        Ok(())
    }

    /// append the content of another bit string
    pub fn write_bit_string(&mut self, other: &BitString) -> Result<()> {
        self.reserve(other.cursor)?;
        for n in 0..other.cursor {
            self.push_bit(other.bit_at(n));
        }
        Ok(())
    }

    /// export as whole bytes using the top-up convention
    ///
    /// when the bit count is not a multiple of 8, a single `1` bit is placed
    /// right after the last real bit and the rest of the byte stays zero.
    /// the flag is true when no terminator was needed.
    pub fn top_upped_array(&self) -> (Vec<u8>, bool) {
        let mut out = self.data().to_vec();
        let rem = self.cursor % 8;
        if rem == 0 {
            return (out, true);
        }
        if let Some(last) = out.last_mut() {
            *last |= 0x80 >> rem;
        }
        (out, false)
    }

    /// replace the content with a top-upped byte array
    ///
    /// the exact bit count is recovered from the terminator bit when the
    /// array is not fullfilled.
    pub fn set_top_upped_array(&mut self, data: &[u8], fullfilled: bool) -> Result<()> {
        let (bits, terminator) = if fullfilled {
            (data.len() * 8, None)
        } else {
            let last = *data.last().ok_or(Error::InvalidPadding)?;
            if last == 0 {
                return Err(Error::InvalidPadding);
            }
            let tz = last.trailing_zeros() as usize;
            (data.len() * 8 - tz - 1, Some(tz))
        };
        if bits > self.capacity || data.len() > self.buf.len() {
            return Err(Error::BitOverflow {
                requested: bits,
                available: self.capacity,
            });
        }

        self.buf.fill(0);
        self.buf[..data.len()].copy_from_slice(data);
        if let Some(tz) = terminator {
            self.buf[data.len() - 1] &= !(1u8 << tz);
        }
        self.cursor = bits;
        Ok(())
    }

    /// fift-style hex rendering
    ///
    /// lengths that are not a multiple of 4 get a terminator bit and a
    /// trailing `_`.
    pub fn to_hex_string(&self) -> String {
        let rem = self.cursor % 4;
        let nibbles = self.cursor.div_ceil(4);
        let mut bytes = self.data().to_vec();
        if rem != 0 {
            let pos = self.cursor;
            bytes[pos / 8] |= 0x80 >> (pos % 8);
        }

        let mut s = hex::encode_upper(&bytes);
        s.truncate(nibbles);
        if rem != 0 {
            s.push('_');
        }
        s
    }
}

impl Default for BitString {
    fn default() -> Self {
        Self::for_cell()
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{{{}}}", self.to_hex_string())
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitString({}/{}, {})", self.cursor, self.capacity, self)
    }
}
