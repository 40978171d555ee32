//! Blake2s Merkle mountain range proofs, as produced by Mithril aggregators

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{crypto::blake2s_256, error::CardanoClientError};

/// Largest range, in nodes, a proof may describe. Position arithmetic below it cannot overflow.
pub const MAX_MMR_SIZE: u64 = 1 << 62;

/// A node of a Mithril Merkle tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MKTreeNode {
    /// Node hash, or raw leaf bytes
    pub hash: Vec<u8>,
}

impl MKTreeNode {
    /// Wraps raw bytes
    #[must_use]
    pub const fn new(hash: Vec<u8>) -> Self {
        Self { hash }
    }

    /// `Blake2s256(self || other)`
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut data = Vec::with_capacity(self.hash.len() + other.hash.len());
        data.extend_from_slice(&self.hash);
        data.extend_from_slice(&other.hash);
        Self::new(blake2s_256(&data).to_vec())
    }

    /// Lowercase hex of the hash
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

impl From<&str> for MKTreeNode {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

/// A batch inclusion proof of leaves in a Merkle mountain range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MKProof {
    /// Root of the range
    pub inner_root: MKTreeNode,
    /// Proven leaves with their node positions
    pub inner_leaves: Vec<(u64, MKTreeNode)>,
    /// Size in nodes of the range
    pub inner_proof_size: u64,
    /// Sibling and peak hashes needed to recompute the root
    pub inner_proof_items: Vec<MKTreeNode>,
}

impl MKProof {
    /// The root this proof claims
    #[must_use]
    pub const fn root(&self) -> &MKTreeNode {
        &self.inner_root
    }

    /// Recomputes the root from the leaves and proof items and compares it to `inner_root`
    ///
    /// # Errors
    /// Returns [`CardanoClientError::InvalidMkProof`] if a leaf position is not a leaf, the
    /// proof is malformed, or the computed root differs.
    pub fn verify(&self) -> Result<(), CardanoClientError> {
        if self.inner_proof_size > MAX_MMR_SIZE {
            return Err(CardanoClientError::InvalidMkProof(format!(
                "range of {} nodes exceeds {MAX_MMR_SIZE}",
                self.inner_proof_size
            )));
        }
        let leaves = self
            .inner_leaves
            .iter()
            .map(|(pos, node)| {
                leaf_pos_to_index(*pos)
                    .map(|index| (leaf_index_to_pos(index), node.clone()))
                    .ok_or_else(|| {
                        CardanoClientError::InvalidMkProof(format!("position {pos} is not a leaf"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let root = calculate_root(leaves, self.inner_proof_size, &self.inner_proof_items)?;
        if root != self.inner_root {
            return Err(CardanoClientError::InvalidMkProof(format!(
                "computed root {} differs from {}",
                root.to_hex(),
                self.inner_root.to_hex()
            )));
        }
        Ok(())
    }

    /// Checks that every one of `leaves` is among the proven leaves
    ///
    /// # Errors
    /// Returns [`CardanoClientError::LeafNotInProof`] naming the first missing leaf.
    pub fn contains(&self, leaves: &[MKTreeNode]) -> Result<(), CardanoClientError> {
        for leaf in leaves {
            if !self.inner_leaves.iter().any(|(_, node)| node == leaf) {
                return Err(CardanoClientError::LeafNotInProof(leaf.to_hex()));
            }
        }
        Ok(())
    }
}

/// Number of nodes of a range whose last leaf has index `index`
#[must_use]
pub const fn leaf_index_to_mmr_size(index: u64) -> u64 {
    let leaves = index.saturating_add(1);
    leaves.saturating_mul(2) - leaves.count_ones() as u64
}

/// Node position of the leaf with index `index`
#[must_use]
pub const fn leaf_index_to_pos(index: u64) -> u64 {
    leaf_index_to_mmr_size(index) - index.saturating_add(1).trailing_zeros() as u64 - 1
}

/// Leaf index of the node at `pos`, if that node is a leaf
#[must_use]
pub fn leaf_pos_to_index(pos: u64) -> Option<u64> {
    if pos >= MAX_MMR_SIZE {
        return None;
    }
    let (mut left, mut right) = (0u64, pos);
    while left <= right {
        let mid = left + (right - left) / 2;
        match leaf_index_to_pos(mid).cmp(&pos) {
            std::cmp::Ordering::Equal => return Some(mid),
            std::cmp::Ordering::Less => left = mid + 1,
            std::cmp::Ordering::Greater => {
                if mid == 0 {
                    return None;
                }
                right = mid - 1;
            }
        }
    }
    None
}

/// Height of the node at `pos`, leaves being at height 0
#[must_use]
pub const fn pos_height_in_tree(pos: u64) -> u32 {
    const fn all_ones(n: u64) -> bool {
        n != 0 && n.count_zeros() == n.leading_zeros()
    }
    const fn jump_left(n: u64) -> u64 {
        let bit_length = 64 - n.leading_zeros();
        let most_significant_bits = 1u64 << (bit_length - 1);
        n - (most_significant_bits - 1)
    }

    let mut n = pos + 1;
    while !all_ones(n) {
        n = jump_left(n);
    }
    64 - n.leading_zeros() - 1
}

const fn parent_offset(height: u32) -> u64 {
    2 << height
}

const fn sibling_offset(height: u32) -> u64 {
    (2 << height) - 1
}

const fn peak_pos_by_height(height: u32) -> u64 {
    (1 << (height + 1)) - 2
}

const fn left_peak_height_pos(mmr_size: u64) -> (u32, u64) {
    let mut height = 1;
    let mut prev_pos = 0;
    let mut pos = peak_pos_by_height(height);
    while pos < mmr_size {
        height += 1;
        prev_pos = pos;
        pos = peak_pos_by_height(height);
    }
    (height - 1, prev_pos)
}

const fn right_peak(mut height: u32, mut pos: u64, mmr_size: u64) -> Option<(u32, u64)> {
    pos += sibling_offset(height);
    while pos > mmr_size - 1 {
        if height == 0 {
            return None;
        }
        pos -= parent_offset(height - 1);
        height -= 1;
    }
    Some((height, pos))
}

/// Positions of the peaks of a range of `mmr_size` nodes, left to right. Empty above
/// [`MAX_MMR_SIZE`].
#[must_use]
pub fn peaks(mmr_size: u64) -> Vec<u64> {
    if mmr_size == 0 || mmr_size > MAX_MMR_SIZE {
        return Vec::new();
    }
    let (mut height, mut pos) = left_peak_height_pos(mmr_size);
    let mut positions = vec![pos];
    while height > 0 {
        let Some(peak) = right_peak(height, pos, mmr_size) else {
            break;
        };
        (height, pos) = peak;
        positions.push(pos);
    }
    positions
}

fn corrupted(what: &str) -> CardanoClientError {
    CardanoClientError::InvalidMkProof(format!("corrupted proof: {what}"))
}

fn calculate_peak_root<'a, I: Iterator<Item = &'a MKTreeNode>>(
    leaves: Vec<(u64, MKTreeNode)>,
    peak_pos: u64,
    proof_items: &mut I,
) -> Result<MKTreeNode, CardanoClientError> {
    let mut queue: VecDeque<(u64, MKTreeNode, u32)> =
        leaves.into_iter().map(|(pos, node)| (pos, node, 0)).collect();

    while let Some((pos, node, height)) = queue.pop_front() {
        if pos == peak_pos {
            if queue.is_empty() {
                return Ok(node);
            }
            return Err(corrupted("leaves beyond peak"));
        }

        let is_right_sibling = pos_height_in_tree(pos + 1) > height;
        let sibling_pos = if is_right_sibling {
            pos.checked_sub(sibling_offset(height))
                .ok_or_else(|| corrupted("sibling before first node"))?
        } else {
            pos + sibling_offset(height)
        };
        let sibling = if queue.front().is_some_and(|(p, _, _)| *p == sibling_pos) {
            queue
                .pop_front()
                .map(|(_, n, _)| n)
                .ok_or_else(|| corrupted("sibling vanished"))?
        } else {
            proof_items
                .next()
                .cloned()
                .ok_or_else(|| corrupted("missing sibling"))?
        };
        let (parent_pos, parent) = if is_right_sibling {
            (pos + 1, sibling.merge(&node))
        } else {
            (pos + parent_offset(height), node.merge(&sibling))
        };

        if parent_pos > peak_pos {
            return Err(corrupted("parent beyond peak"));
        }
        queue.push_back((parent_pos, parent, height + 1));
    }
    Err(corrupted("no leaves under peak"))
}

fn calculate_peaks_hashes(
    mut leaves: Vec<(u64, MKTreeNode)>,
    mmr_size: u64,
    proof_items: &[MKTreeNode],
) -> Result<Vec<MKTreeNode>, CardanoClientError> {
    if mmr_size == 1 && leaves.len() == 1 && leaves[0].0 == 0 {
        return Ok(leaves.into_iter().map(|(_, node)| node).collect());
    }

    leaves.sort_by_key(|(pos, _)| *pos);
    leaves.dedup_by_key(|(pos, _)| *pos);
    let mut proof_items = proof_items.iter();
    let mut peak_hashes = Vec::new();

    for peak_pos in peaks(mmr_size) {
        let split = leaves.partition_point(|(pos, _)| *pos <= peak_pos);
        let rest = leaves.split_off(split);
        let under_peak = std::mem::replace(&mut leaves, rest);

        let peak_root = if under_peak.len() == 1 && under_peak[0].0 == peak_pos {
            under_peak.into_iter().map(|(_, node)| node).next()
        } else if under_peak.is_empty() {
            proof_items.next().cloned()
        } else {
            Some(calculate_peak_root(under_peak, peak_pos, &mut proof_items)?)
        };
        match peak_root {
            Some(root) => peak_hashes.push(root),
            None => break,
        }
    }

    if !leaves.is_empty() {
        return Err(corrupted("leaves beyond the range"));
    }
    if let Some(rhs_peaks) = proof_items.next() {
        peak_hashes.push(rhs_peaks.clone());
    }
    if proof_items.next().is_some() {
        return Err(corrupted("unused proof items"));
    }
    Ok(peak_hashes)
}

/// Bags peak hashes right to left as `merge(right, left)`
fn bag_peaks(mut peak_hashes: Vec<MKTreeNode>) -> Result<MKTreeNode, CardanoClientError> {
    while peak_hashes.len() > 1 {
        let (Some(right), Some(left)) = (peak_hashes.pop(), peak_hashes.pop()) else {
            break;
        };
        peak_hashes.push(right.merge(&left));
    }
    peak_hashes.pop().ok_or_else(|| corrupted("no peaks"))
}

/// Root of a range of `mmr_size` nodes given some of its leaves and the matching proof items
///
/// # Errors
/// Returns [`CardanoClientError::InvalidMkProof`] if the inputs do not form a proof.
pub fn calculate_root(
    leaves: Vec<(u64, MKTreeNode)>,
    mmr_size: u64,
    proof_items: &[MKTreeNode],
) -> Result<MKTreeNode, CardanoClientError> {
    if leaves.is_empty() {
        return Err(corrupted("no leaves"));
    }
    if mmr_size > MAX_MMR_SIZE {
        return Err(corrupted("range too large"));
    }
    if leaves.iter().any(|(pos, _)| *pos >= mmr_size) {
        return Err(corrupted("leaf beyond the range"));
    }
    bag_peaks(calculate_peaks_hashes(leaves, mmr_size, proof_items)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(s: &str) -> MKTreeNode {
        MKTreeNode::from(s)
    }

    /// Four leaves at positions 0, 1, 3, 4 under a single peak at 6
    fn four_leaf_range() -> ([MKTreeNode; 4], MKTreeNode, MKTreeNode, MKTreeNode) {
        let l = [leaf("a"), leaf("b"), leaf("c"), leaf("d")];
        let n2 = l[0].merge(&l[1]);
        let n5 = l[2].merge(&l[3]);
        let root = n2.merge(&n5);
        (l, n2, n5, root)
    }

    #[test]
    fn position_helpers_match_the_mmr_layout() {
        let positions: Vec<u64> = (0..8).map(leaf_index_to_pos).collect();
        assert_eq!(positions, vec![0, 1, 3, 4, 7, 8, 10, 11]);
        assert_eq!(leaf_index_to_mmr_size(3), 7);
        assert_eq!(leaf_index_to_mmr_size(4), 8);

        for (index, pos) in positions.iter().enumerate() {
            assert_eq!(leaf_pos_to_index(*pos), Some(index as u64));
        }
        assert_eq!(leaf_pos_to_index(2), None);
        assert_eq!(leaf_pos_to_index(6), None);

        assert_eq!(pos_height_in_tree(0), 0);
        assert_eq!(pos_height_in_tree(2), 1);
        assert_eq!(pos_height_in_tree(6), 2);
        assert_eq!(pos_height_in_tree(7), 0);

        assert_eq!(peaks(1), vec![0]);
        assert_eq!(peaks(4), vec![2, 3]);
        assert_eq!(peaks(7), vec![6]);
        assert_eq!(peaks(11), vec![6, 9, 10]);
    }

    #[test]
    fn oversized_positions_and_sizes_are_rejected() {
        assert_eq!(leaf_pos_to_index(u64::MAX), None);
        assert_eq!(leaf_pos_to_index(MAX_MMR_SIZE), None);
        assert!(peaks(u64::MAX).is_empty());
        assert!(leaf_index_to_pos(u64::MAX) > 0);

        let (l, n2, _, root) = four_leaf_range();
        let proof = MKProof {
            inner_root: root,
            inner_leaves: vec![(u64::MAX, l[2].clone())],
            inner_proof_size: 7,
            inner_proof_items: vec![l[3].clone(), n2],
        };
        assert!(matches!(proof.verify(), Err(CardanoClientError::InvalidMkProof(_))));

        let proof = MKProof {
            inner_leaves: vec![(3, l[2].clone())],
            inner_proof_size: u64::MAX,
            ..proof
        };
        assert!(matches!(proof.verify(), Err(CardanoClientError::InvalidMkProof(_))));

        assert!(matches!(
            calculate_root(vec![(u64::MAX, leaf("a"))], u64::MAX, &[]),
            Err(CardanoClientError::InvalidMkProof(_))
        ));
        assert!(matches!(
            calculate_root(vec![(9, leaf("a"))], 7, &[]),
            Err(CardanoClientError::InvalidMkProof(_))
        ));
    }

    #[test]
    fn single_leaf_proof_in_four_leaf_range() {
        let (l, n2, _, root) = four_leaf_range();
        let proof = MKProof {
            inner_root: root,
            inner_leaves: vec![(3, l[2].clone())],
            inner_proof_size: 7,
            inner_proof_items: vec![l[3].clone(), n2],
        };
        proof.verify().unwrap();
        proof.contains(&[leaf("c")]).unwrap();
        assert!(matches!(
            proof.contains(&[leaf("c"), leaf("a")]),
            Err(CardanoClientError::LeafNotInProof(_))
        ));
    }

    #[test]
    fn batch_proof_merges_neighbouring_leaves() {
        let (l, _, n5, root) = four_leaf_range();
        let proof = MKProof {
            inner_root: root,
            inner_leaves: vec![(1, l[1].clone()), (0, l[0].clone())],
            inner_proof_size: 7,
            inner_proof_items: vec![n5],
        };
        proof.verify().unwrap();
    }

    #[test]
    fn peaks_are_bagged_right_to_left() {
        let l = [leaf("a"), leaf("b"), leaf("c")];
        let n2 = l[0].merge(&l[1]);
        let root = l[2].merge(&n2);
        let proof = MKProof {
            inner_root: root.clone(),
            inner_leaves: vec![(0, l[0].clone())],
            inner_proof_size: 4,
            inner_proof_items: vec![l[1].clone(), l[2].clone()],
        };
        proof.verify().unwrap();

        let lone_peak = MKProof {
            inner_root: root,
            inner_leaves: vec![(3, l[2].clone())],
            inner_proof_size: 4,
            inner_proof_items: vec![n2],
        };
        lone_peak.verify().unwrap();
    }

    #[test]
    fn single_node_range_is_its_own_root() {
        let proof = MKProof {
            inner_root: leaf("only"),
            inner_leaves: vec![(0, leaf("only"))],
            inner_proof_size: 1,
            inner_proof_items: vec![],
        };
        proof.verify().unwrap();
    }

    #[test]
    fn tampering_is_detected() {
        let (l, n2, _, root) = four_leaf_range();
        let valid = MKProof {
            inner_root: root,
            inner_leaves: vec![(3, l[2].clone())],
            inner_proof_size: 7,
            inner_proof_items: vec![l[3].clone(), n2.clone()],
        };

        let mut wrong_leaf = valid.clone();
        wrong_leaf.inner_leaves[0].1 = leaf("x");
        assert!(matches!(wrong_leaf.verify(), Err(CardanoClientError::InvalidMkProof(_))));

        let mut wrong_root = valid.clone();
        wrong_root.inner_root = n2;
        assert!(wrong_root.verify().is_err());

        let mut not_a_leaf = valid.clone();
        not_a_leaf.inner_leaves[0].0 = 2;
        assert!(not_a_leaf.verify().is_err());

        let mut extra_item = valid.clone();
        extra_item.inner_proof_items.push(leaf("spare"));
        assert!(extra_item.verify().is_err());

        let mut missing_item = valid.clone();
        missing_item.inner_proof_items.pop();
        assert!(missing_item.verify().is_err());

        let mut no_leaves = valid;
        no_leaves.inner_leaves.clear();
        assert!(no_leaves.verify().is_err());
    }

    #[test]
    fn proof_reads_aggregator_json() {
        let json = r#"{
            "inner_root": {"hash": [1, 2]},
            "inner_leaves": [[3, {"hash": [99]}]],
            "inner_proof_size": 7,
            "inner_proof_items": [{"hash": [4]}]
        }"#;
        let proof: MKProof = serde_json::from_str(json).unwrap();
        assert_eq!(proof.inner_leaves, vec![(3, MKTreeNode::new(vec![99]))]);
        assert_eq!(proof.inner_root.to_hex(), "0102");
    }
}
