use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::cell::Cell;
use crate::Error;

/// SHA-256 digest identifying a cell and its whole subtree
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// zero hash (useful as sentinel)
    pub const ZERO: Hash = Hash([0u8; 32]);

    /// create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// digest arbitrary data
    pub fn from_data(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// parse from hex string
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidHex(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidHex(s.to_string()))?;
        Ok(Self(arr))
    }

    /// get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..12])
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// memoized per-cell hashing results
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CellMeta {
    pub hash: Hash,
    pub depth: u32,
}

/// descriptor bytes d1 (refs count) and d2 (payload length)
///
/// d2 = ceil(bits/8) + floor(bits/8): even when the payload is byte aligned,
/// odd when the last byte carries a terminator bit. the exotic bit is read
/// on decode but never written.
pub(crate) fn descriptors(cell: &Cell) -> [u8; 2] {
    let bits = cell.bit_size();
    let d1 = cell.references().len() as u8;
    let d2 = (bits.div_ceil(8) + bits / 8) as u8;
    [d1, d2]
}

/// d1, d2 and the top-upped payload, shared by hashing and the wire format
pub(crate) fn repr_without_refs(cell: &Cell) -> Vec<u8> {
    let (payload, _) = cell.bits().top_upped_array();
    let mut repr = Vec::with_capacity(2 + payload.len());
    repr.extend_from_slice(&descriptors(cell));
    repr.extend_from_slice(&payload);
    repr
}

/// hash and depth of a cell, filling the memo of every unhashed descendant
///
/// walks with an explicit stack so deep chains cannot exhaust the call stack.
pub(crate) fn cell_meta(root: &Cell) -> CellMeta {
    if let Some(meta) = root.cached_meta() {
        return *meta;
    }

    let mut stack: Vec<&Cell> = vec![root];
    while let Some(&top) = stack.last() {
        if top.cached_meta().is_some() {
            stack.pop();
            continue;
        }
        let pending: Vec<&Cell> = top
            .references()
            .iter()
            .map(|r| r.as_ref())
            .filter(|r| r.cached_meta().is_none())
            .collect();
        if pending.is_empty() {
            top.meta_or_init(|| compute_meta(top));
            stack.pop();
        } else {
            stack.extend(pending);
        }
    }

    *root.meta_or_init(|| compute_meta(root))
}

/// hash a cell whose children are already memoized
fn compute_meta(cell: &Cell) -> CellMeta {
    let refs = cell.references();
    let children: Vec<CellMeta> = refs.iter().map(|r| cell_meta(r)).collect();

    let mut hasher = Sha256::new();
    hasher.update(repr_without_refs(cell));

    // max depth is truncated to its 2-byte field
    for child in &children {
        hasher.update((child.depth as u16).to_be_bytes());
    }
    for child in &children {
        hasher.update(child.hash.as_bytes());
    }

    let depth = children
        .iter()
        .map(|c| c.depth + 1)
        .max()
        .unwrap_or(0);

    CellMeta {
        hash: Hash(hasher.finalize().into()),
        depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn leaf(bits: &[bool]) -> Cell {
        let mut cell = Cell::new();
        cell.bits_mut().write_bits(bits).unwrap();
        cell
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let original =
            Hash::from_hex("abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789")
                .unwrap();
        let hex = original.to_hex();
        let parsed = Hash::from_hex(&hex).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_hash_invalid_hex() {
        assert!(Hash::from_hex("not valid hex").is_err());
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex(
            "abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789ff"
        )
        .is_err());
    }

    #[test]
    fn test_hash_serde_json() {
        let h = Hash::from_data(b"cell");
        let json = serde_json::to_string(&h).unwrap();
        assert!(json.contains(&h.to_hex()));
        let parsed: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn test_descriptors() {
        assert_eq!(descriptors(&Cell::new()), [0, 0]);
        assert_eq!(descriptors(&leaf(&[true, false, true, true])), [0, 1]);

        let mut cell = Cell::new_exotic();
        cell.bits_mut().write_bytes(&[0; 3]).unwrap();
        cell.add_reference(Arc::new(Cell::new())).unwrap();
        assert_eq!(descriptors(&cell), [0x01, 6]);

        let mut full = Cell::new();
        full.bits_mut().write_uint(0, 63).unwrap();
        for _ in 0..15 {
            full.bits_mut().write_uint(0, 64).unwrap();
        }
        assert_eq!(full.bit_size(), 1023);
        assert_eq!(descriptors(&full), [0, 255]);
    }

    #[test]
    fn test_leaf_hash_matches_repr_digest() {
        let cell = leaf(&[true, false, true, true]);
        assert_eq!(repr_without_refs(&cell), vec![0x00, 0x01, 0xb8]);
        assert_eq!(cell.hash(), Hash::from_data(&[0x00, 0x01, 0xb8]));
    }

    #[test]
    fn test_parent_hash_layout() {
        let child = Arc::new(leaf(&[true]));
        let mut parent = Cell::new();
        parent.add_reference(child.clone()).unwrap();

        let mut expected = vec![0x01, 0x00];
        expected.extend_from_slice(&[0x00, 0x00]);
        expected.extend_from_slice(child.hash().as_bytes());
        assert_eq!(parent.hash(), Hash::from_data(&expected));
    }

    #[test]
    fn test_depth_enters_hash() {
        // same child hash cannot differ in depth, but the depth bytes still
        // shift the digest relative to a flat repr without them
        let child = Arc::new(Cell::new());
        let mut parent = Cell::new();
        parent.add_reference(child.clone()).unwrap();

        let mut without_depth = vec![0x01, 0x00];
        without_depth.extend_from_slice(child.hash().as_bytes());
        assert_ne!(parent.hash(), Hash::from_data(&without_depth));
    }

    #[test]
    fn test_deep_chain_is_stack_safe() {
        let mut current = Arc::new(Cell::new());
        for _ in 0..100_000 {
            let mut next = Cell::new();
            next.add_reference(current).unwrap();
            current = Arc::new(next);
        }
        assert_eq!(current.max_depth(), 100_000);
        assert_ne!(current.hash(), Hash::ZERO);
    }
}
