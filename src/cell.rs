use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::bits::{BitReader, BitString};
use crate::boc::{self, SerializeOptions};
use crate::error::{Error, Result};
use crate::hash::{self, CellMeta, Hash};
use crate::text;

/// maximum number of references a cell can hold
pub const MAX_REFS: usize = 4;

/// a node of the cell DAG: up to 1023 payload bits and up to 4 ordered
/// references to child cells.
///
/// children are shared through `Arc` and therefore frozen; only a cell that
/// is still uniquely owned can be mutated. hash and depth are computed on
/// first access and cached until the next mutation.
#[derive(Clone)]
pub struct Cell {
    bits: BitString,
    exotic: bool,
    refs: Vec<Arc<Cell>>,
    meta: OnceLock<CellMeta>,
}

impl Cell {
    /// create an empty ordinary cell
    pub fn new() -> Self {
        Self {
            bits: BitString::for_cell(),
            exotic: false,
            refs: Vec::with_capacity(MAX_REFS),
            meta: OnceLock::new(),
        }
    }

    /// create an empty exotic cell
    pub fn new_exotic() -> Self {
        let mut cell = Self::new();
        cell.exotic = true;
        cell
    }

    pub fn is_exotic(&self) -> bool {
        self.exotic
    }

    /// payload bits
    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    /// mutable payload; clears the cached hash
    pub fn bits_mut(&mut self) -> &mut BitString {
        self.meta.take();
        &mut self.bits
    }

    /// start reading the payload from its first bit
    pub fn begin_parse(&self) -> BitReader<'_> {
        BitReader::new(&self.bits)
    }

    /// number of payload bits written
    pub fn bit_size(&self) -> usize {
        self.bits.cursor()
    }

    /// append a child reference
    pub fn add_reference(&mut self, child: Arc<Cell>) -> Result<&mut Self> {
        if self.refs.len() == MAX_REFS {
            return Err(Error::ReferencesFull);
        }
        self.meta.take();
        self.refs.push(child);
        Ok(self)
    }

    /// child references in insertion order
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    pub fn refs_count(&self) -> usize {
        self.refs.len()
    }

    /// content hash committing to payload, kind, depth and all descendants
    pub fn hash(&self) -> Hash {
        hash::cell_meta(self).hash
    }

    pub fn hash_hex(&self) -> String {
        self.hash().to_hex()
    }

    /// 0 for a leaf, otherwise 1 + the deepest child
    pub fn max_depth(&self) -> u32 {
        hash::cell_meta(self).depth
    }

    pub(crate) fn cached_meta(&self) -> Option<&CellMeta> {
        self.meta.get()
    }

    pub(crate) fn meta_or_init(&self, f: impl FnOnce() -> CellMeta) -> &CellMeta {
        self.meta.get_or_init(f)
    }

    /// serialize with index and crc32c
    pub fn to_boc(&self) -> Result<Vec<u8>> {
        self.to_boc_with(&SerializeOptions::default())
    }

    pub fn to_boc_with(&self, opts: &SerializeOptions) -> Result<Vec<u8>> {
        boc::serialize(self, opts)
    }

    pub fn to_boc_hex(&self) -> Result<String> {
        self.to_boc_hex_with(&SerializeOptions::default())
    }

    pub fn to_boc_hex_with(&self, opts: &SerializeOptions) -> Result<String> {
        Ok(text::encode_hex(&self.to_boc_with(opts)?))
    }

    pub fn to_boc_base64(&self) -> Result<String> {
        self.to_boc_base64_with(&SerializeOptions::default())
    }

    pub fn to_boc_base64_with(&self, opts: &SerializeOptions) -> Result<String> {
        Ok(text::encode_base64(&self.to_boc_with(opts)?))
    }

    /// indented rendering, one `x{HEX}` line per cell
    ///
    /// diagnostic only, shared subtrees are printed every time they occur.
    pub fn to_tree_string(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(&Cell, usize)> = vec![(self, 0)];
        while let Some((cell, indent)) = stack.pop() {
            for _ in 0..indent {
                out.push(' ');
            }
            out.push_str(&cell.bits.to_string());
            out.push('\n');
            for child in cell.refs.iter().rev() {
                stack.push((child.as_ref(), indent + 1));
            }
        }
        out
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Cell {
    // unlink uniquely owned descendants iteratively so long chains do not
    // recurse through Arc drops
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.refs);
        while let Some(child) = stack.pop() {
            if let Ok(mut cell) = Arc::try_unwrap(child) {
                stack.append(&mut cell.refs);
            }
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.bits)
            .field("exotic", &self.exotic)
            .field("refs", &self.refs.len())
            .field("hash", &self.meta.get().map(|m| m.hash))
            .finish()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_tree_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(value: u64, width: usize) -> Arc<Cell> {
        let mut cell = Cell::new();
        cell.bits_mut().write_uint(value, width).unwrap();
        Arc::new(cell)
    }

    #[test]
    fn test_fifth_reference_fails() {
        let mut cell = Cell::new();
        let children: Vec<_> = (0..4).map(|i| leaf(i, 8)).collect();
        for child in &children {
            cell.add_reference(child.clone()).unwrap();
        }
        assert!(matches!(
            cell.add_reference(leaf(9, 8)),
            Err(Error::ReferencesFull)
        ));

        assert_eq!(cell.refs_count(), 4);
        for (got, want) in cell.references().iter().zip(&children) {
            assert!(Arc::ptr_eq(got, want));
        }
    }

    #[test]
    fn test_add_reference_chains() {
        let mut cell = Cell::new();
        cell.add_reference(leaf(1, 1))
            .unwrap()
            .add_reference(leaf(0, 1))
            .unwrap();
        assert_eq!(cell.refs_count(), 2);
    }

    #[test]
    fn test_hash_deterministic() {
        let a = leaf(0xabc, 12);
        assert_eq!(a.hash(), a.hash());
        assert_eq!(a.hash(), leaf(0xabc, 12).hash());
    }

    #[test]
    fn test_hash_hex() {
        let cell = leaf(0b1011, 4);
        assert_eq!(cell.hash_hex(), cell.hash().to_hex());
        assert_eq!(cell.hash_hex().len(), 64);
    }

    #[test]
    fn test_single_bit_changes_hash() {
        assert_ne!(leaf(0b1010, 4).hash(), leaf(0b1011, 4).hash());
        // same value, different length
        assert_ne!(leaf(0b1, 1).hash(), leaf(0b01, 2).hash());
    }

    #[test]
    fn test_reference_order_changes_hash() {
        let (a, b) = (leaf(1, 8), leaf(2, 8));
        let mut ab = Cell::new();
        ab.add_reference(a.clone()).unwrap();
        ab.add_reference(b.clone()).unwrap();
        let mut ba = Cell::new();
        ba.add_reference(b).unwrap();
        ba.add_reference(a).unwrap();
        assert_ne!(ab.hash(), ba.hash());
    }

    #[test]
    fn test_descendant_changes_root_hash() {
        let build = |deep: u64| {
            let mut mid = Cell::new();
            mid.add_reference(leaf(deep, 8)).unwrap();
            let mut root = Cell::new();
            root.add_reference(Arc::new(mid)).unwrap();
            root.hash()
        };
        assert_ne!(build(1), build(2));
    }

    #[test]
    fn test_exotic_hashes_like_ordinary() {
        assert_eq!(Cell::new_exotic().hash(), Hash::from_data(&[0, 0]));
        assert_eq!(Cell::new_exotic().hash(), Cell::new().hash());
    }

    #[test]
    fn test_mutation_invalidates_cache() {
        let mut cell = Cell::new();
        let empty = cell.hash();
        cell.bits_mut().write_bit(true).unwrap();
        let one_bit = cell.hash();
        assert_ne!(empty, one_bit);
        cell.add_reference(leaf(0, 0)).unwrap();
        assert_ne!(one_bit, cell.hash());
    }

    #[test]
    fn test_max_depth() {
        assert_eq!(Cell::new().max_depth(), 0);

        let n = 5;
        let mut current = Arc::new(Cell::new());
        for _ in 1..n {
            let mut next = Cell::new();
            next.add_reference(current).unwrap();
            current = Arc::new(next);
        }
        assert_eq!(current.max_depth(), n - 1);

        // depth follows the deepest branch
        let mut wide = Cell::new();
        wide.add_reference(leaf(0, 1)).unwrap();
        wide.add_reference(current).unwrap();
        assert_eq!(wide.max_depth(), n);
    }

    #[test]
    fn test_begin_parse() {
        let cell = leaf(0xbeef, 16);
        let mut r = cell.begin_parse();
        assert_eq!(r.read_uint(8).unwrap(), 0xbe);
        assert_eq!(r.read_uint(8).unwrap(), 0xef);
        assert!(r.read_bit().is_err());
    }

    #[test]
    fn test_tree_string() {
        let mut child = Cell::new();
        child.bits_mut().write_bytes(&[0x12]).unwrap();
        child.add_reference(leaf(0b1, 1)).unwrap();
        let mut root = Cell::new();
        root.bits_mut().write_bytes(&[0xff]).unwrap();
        root.add_reference(Arc::new(child)).unwrap();
        root.add_reference(leaf(0, 0)).unwrap();

        assert_eq!(root.to_tree_string(), "x{FF}\n x{12}\n  x{C_}\n x{}\n");
    }
}
