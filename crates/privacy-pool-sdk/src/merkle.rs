//! Fixed-depth incremental Merkle tree mirroring the pool's on-chain
//! tree-with-history. Empty positions hash as the per-level zero values, so a
//! tree holding `n` leaves has the same root as the chain after `n` deposits.

use ark_bn254::Fr;

use crate::error::{Result, SdkError};
use crate::mimc::{hash_left_right, zero_leaf};

pub const TREE_DEPTH: usize = 20;
pub const MAX_TREE_DEPTH: usize = 32;
pub const ROOT_HISTORY_SIZE: usize = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf: Fr,
    pub leaf_index: u64,
    /// Sibling hashes from the leaf level upwards.
    pub path_elements: Vec<Fr>,
    /// 0 when the node on the path is a left child, 1 when it is a right child.
    pub path_indices: Vec<u8>,
    pub root: Fr,
}

#[derive(Clone, Debug)]
pub struct MerkleTree {
    depth: usize,
    zeros: Vec<Fr>,
    /// `layers[0]` holds the leaves; `layers[depth]` holds the root once non-empty.
    layers: Vec<Vec<Fr>>,
    roots: Vec<Fr>,
    current_root_index: usize,
    history_size: usize,
}

impl MerkleTree {
    pub fn new(depth: usize) -> Result<Self> {
        Self::with_history(depth, ROOT_HISTORY_SIZE)
    }

    pub fn with_history(depth: usize, history_size: usize) -> Result<Self> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(SdkError::MerkleTree(format!(
                "Tree depth must be between 1 and {}, got {}",
                MAX_TREE_DEPTH, depth
            )));
        }
        if history_size == 0 {
            return Err(SdkError::MerkleTree("Root history size must be non-zero".into()));
        }

        let zeros = compute_zeros(depth);
        // The on-chain tree seeds its history with `zeros[depth - 1]`, not the
        // hash of two empty subtrees; the first insert yields the true root.
        let empty_root = zeros[depth - 1];
        Ok(Self {
            depth,
            zeros,
            layers: vec![Vec::new(); depth + 1],
            roots: vec![empty_root],
            current_root_index: 0,
            history_size,
        })
    }

    /// Build a tree by inserting `leaves` in order.
    pub fn from_leaves<I>(depth: usize, history_size: usize, leaves: I) -> Result<Self>
    where
        I: IntoIterator<Item = Fr>,
    {
        let mut tree = Self::with_history(depth, history_size)?;
        for leaf in leaves {
            tree.insert(leaf)?;
        }
        Ok(tree)
    }

    pub fn insert(&mut self, leaf: Fr) -> Result<u64> {
        let index = self.layers[0].len();
        if index as u64 >= self.capacity() {
            return Err(SdkError::MerkleTree("Merkle tree is full".into()));
        }
        self.layers[0].push(leaf);

        let mut current = index;
        for level in 0..self.depth {
            let parent = current / 2;
            let left = self.node(level, parent * 2);
            let right = self.node(level, parent * 2 + 1);
            let hash = hash_left_right(&left, &right);

            let upper = &mut self.layers[level + 1];
            if parent < upper.len() {
                upper[parent] = hash;
            } else {
                upper.push(hash);
            }
            current = parent;
        }

        let root = self.layers[self.depth][0];
        self.current_root_index = (self.current_root_index + 1) % self.history_size;
        if self.roots.len() < self.history_size {
            self.roots.push(root);
        } else {
            self.roots[self.current_root_index] = root;
        }

        Ok(index as u64)
    }

    pub fn root(&self) -> Fr {
        self.roots[self.current_root_index]
    }

    pub fn is_known_root(&self, root: &Fr) -> bool {
        self.roots.iter().any(|r| r == root)
    }

    /// Raw ring buffer, indexed like the on-chain `roots` vector.
    pub fn roots(&self) -> &[Fr] {
        &self.roots
    }

    pub fn current_root_index(&self) -> usize {
        self.current_root_index
    }

    /// Root history, most recent first.
    pub fn root_history(&self) -> Vec<Fr> {
        let len = self.roots.len();
        (0..len)
            .map(|offset| self.roots[(self.current_root_index + len - offset) % len])
            .collect()
    }

    pub fn proof(&self, leaf_index: u64) -> Result<MerkleProof> {
        let leaf = *self
            .layers[0]
            .get(leaf_index as usize)
            .ok_or_else(|| SdkError::MerkleTree(format!("Leaf index {} out of bounds", leaf_index)))?;

        let mut path_elements = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);
        let mut current = leaf_index as usize;
        for level in 0..self.depth {
            path_indices.push((current & 1) as u8);
            path_elements.push(self.node(level, current ^ 1));
            current /= 2;
        }

        Ok(MerkleProof {
            leaf,
            leaf_index,
            path_elements,
            path_indices,
            root: self.root(),
        })
    }

    pub fn compute_root(proof: &MerkleProof) -> Fr {
        proof
            .path_elements
            .iter()
            .zip(&proof.path_indices)
            .fold(proof.leaf, |current, (sibling, &is_right)| {
                if is_right == 0 {
                    hash_left_right(&current, sibling)
                } else {
                    hash_left_right(sibling, &current)
                }
            })
    }

    pub fn verify_proof(root: &Fr, proof: &MerkleProof) -> bool {
        if proof.path_elements.len() != proof.path_indices.len()
            || proof.path_indices.iter().any(|&b| b > 1)
        {
            return false;
        }
        Self::compute_root(proof) == *root
    }

    pub fn leaf(&self, index: u64) -> Option<Fr> {
        self.layers[0].get(index as usize).copied()
    }

    pub fn leaf_index_of(&self, leaf: &Fr) -> Option<u64> {
        self.layers[0].iter().position(|l| l == leaf).map(|i| i as u64)
    }

    pub fn leaves(&self) -> &[Fr] {
        &self.layers[0]
    }

    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Zero value of each level, `zeros()[depth]` being the root of a
    /// fully padded empty tree.
    pub fn zeros(&self) -> &[Fr] {
        &self.zeros
    }

    /// Root reported before the first deposit, matching the chain.
    pub fn empty_root(&self) -> Fr {
        self.zeros[self.depth - 1]
    }

    fn node(&self, level: usize, index: usize) -> Fr {
        self.layers[level]
            .get(index)
            .copied()
            .unwrap_or(self.zeros[level])
    }
}

fn compute_zeros(depth: usize) -> Vec<Fr> {
    let mut zeros = Vec::with_capacity(depth + 1);
    let mut current = zero_leaf();
    zeros.push(current);
    for _ in 0..depth {
        current = hash_left_right(&current, &current);
        zeros.push(current);
    }
    zeros
}
