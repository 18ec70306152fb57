use std::collections::{HashMap, HashSet};

use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::hash::Hash;

/// cells reachable from a root in preorder, with their assigned indices
#[derive(Debug)]
pub struct Linearization<'a> {
    pub cells: Vec<&'a Cell>,
    pub indices: HashMap<Hash, usize>,
}

impl Linearization<'_> {
    /// index assigned to the cell with the given hash
    pub fn index_of(&self, hash: &Hash) -> Option<usize> {
        self.indices.get(hash).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// depth-first preorder listing of the graph below `root`
///
/// a parent always precedes its children, so every reference points to a
/// larger index. any cell reached twice under the same hash is rejected,
/// shared subtrees included.
pub fn topological_sort(root: &Cell) -> Result<Linearization<'_>> {
    let mut seen = HashSet::new();
    let mut cells = Vec::new();
    let mut stack = vec![root];

    while let Some(cell) = stack.pop() {
        let hash = cell.hash();
        if !seen.insert(hash) {
            return Err(Error::CircularReference(hash));
        }
        cells.push(cell);
        stack.extend(cell.references().iter().rev().map(|r| r.as_ref()));
    }

    let indices = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| (cell.hash(), i))
        .collect();

    Ok(Linearization { cells, indices })
}
