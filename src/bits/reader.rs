use crate::bits::BitString;
use crate::error::{Error, Result};

/// cursor-based reader over the written bits of a [`BitString`]
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    bits: &'a BitString,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bits: &'a BitString) -> Self {
        Self { bits, pos: 0 }
    }

    /// bits consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// bits left to read
    pub fn remaining(&self) -> usize {
        self.bits.cursor() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<usize> {
        if n > self.remaining() {
            return Err(Error::ReadOutOfBounds {
                requested: n,
                available: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(start)
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        let at = self.take(1)?;
        Ok(self.bits.bit_at(at))
    }

    /// read `width` bits as a big-endian unsigned integer
    pub fn read_uint(&mut self, width: usize) -> Result<u64> {
        if width > 64 {
            return Err(Error::UintOverflow {
                value: u64::MAX,
                width,
            });
        }
        let start = self.take(width)?;
        let mut value = 0u64;
        for n in start..start + width {
            value = (value << 1) | self.bits.bit_at(n) as u64;
        }
        Ok(value)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let start = self.take(n * 8)?;
        if start % 8 == 0 {
            let at = start / 8;
            return Ok(self.bits.data()[at..at + n].to_vec());
        }
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let mut byte = 0u8;
            for b in 0..8 {
                byte = (byte << 1) | self.bits.bit_at(start + i * 8 + b) as u8;
            }
            out.push(byte);
        }
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }
}
