//! Authenticated trees with per-level arities.
//!
//! A tree over `N` leaf digests is described by an arity schedule
//! `a₁, …, a_d` (level `k` has `a₁·…·a_k` nodes, missing leaves are the
//! all-zero [`NULL_DIGEST`]), an optional truncation depth `t` and an
//! expansion flag:
//!
//! * **plain** trees authenticate a sorted set of leaves with the minimal
//!   merged sibling list; when truncated, the walk stops at depth `t` and
//!   every depth-`t` node that cannot be recomputed is emitted as well, so the
//!   verifier rebuilds the root from that level;
//! * **expanded** trees (perfect trees only) emit the full row of depth-`t`
//!   root pre-images followed by one fixed-size sub-path per opened leaf, which
//!   gives a constant path size and accepts indices in any order.
//!
//! Node compression is delegated to [`HashBackend::compress`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{Digest, HashBackend, NULL_DIGEST};
use crate::parallel::map_indices;

/// Serializable tree parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Number of leaves.
    pub nb_leaves: usize,
    /// Arity of each level, from the root downwards.
    pub arity: Vec<usize>,
    /// Depth at which authentication stops, if any.
    #[serde(default)]
    pub truncated: Option<usize>,
    /// Whether paths use the constant-size expanded format.
    #[serde(default)]
    pub expanded: bool,
}

impl TreeConfig {
    /// Plain, untruncated tree parameters.
    pub fn new(nb_leaves: usize, arity: Vec<usize>) -> Self {
        Self {
            nb_leaves,
            arity,
            truncated: None,
            expanded: false,
        }
    }

    /// Sets the truncation depth.
    pub fn with_truncation(mut self, depth: usize) -> Self {
        self.truncated = Some(depth);
        self
    }

    /// Switches to the expanded path format.
    pub fn with_expansion(mut self) -> Self {
        self.expanded = true;
        self
    }
}

/// Validated tree geometry, shared by prover and verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeShape {
    nb_leaves: usize,
    arity: Vec<usize>,
    truncated: Option<usize>,
    expanded: bool,
    depth_width: Vec<usize>,
    subtree: Option<Box<TreeShape>>,
}

impl TreeShape {
    /// Validates `config` and precomputes the level widths.
    pub fn new(config: &TreeConfig) -> Result<Self> {
        if config.nb_leaves == 0 {
            return Err(Error::Config("a tree needs at least one leaf".into()));
        }
        if config.arity.is_empty() || config.arity.iter().any(|&a| a < 2) {
            return Err(Error::Config(format!(
                "arity schedule {:?} must be non-empty with every arity >= 2",
                config.arity
            )));
        }
        let capacity = config
            .arity
            .iter()
            .try_fold(1usize, |acc, &a| acc.checked_mul(a))
            .ok_or_else(|| Error::Config("tree capacity overflows usize".into()))?;
        if capacity < config.nb_leaves {
            return Err(Error::Config(format!(
                "arity schedule {:?} holds {capacity} leaves, {} requested",
                config.arity, config.nb_leaves
            )));
        }
        if let Some(t) = config.truncated {
            if t > config.arity.len() {
                return Err(Error::Config(format!(
                    "truncation depth {t} exceeds tree depth {}",
                    config.arity.len()
                )));
            }
        }
        if config.expanded && capacity != config.nb_leaves {
            return Err(Error::Config(
                "expanded trees must be perfect (leaf count equal to capacity)".into(),
            ));
        }
        Ok(Self::from_parts(
            config.nb_leaves,
            config.arity.clone(),
            config.truncated,
            config.expanded,
        ))
    }

    fn from_parts(
        nb_leaves: usize,
        arity: Vec<usize>,
        truncated: Option<usize>,
        expanded: bool,
    ) -> Self {
        let mut depth_width = Vec::with_capacity(arity.len() + 1);
        depth_width.push(1usize);
        for &a in &arity {
            let last = depth_width[depth_width.len() - 1];
            depth_width.push(last * a);
        }
        let subtree = expanded.then(|| {
            let t = truncated.unwrap_or(0);
            Box::new(Self::from_parts(
                nb_leaves / depth_width[t],
                arity[t..].to_vec(),
                None,
                false,
            ))
        });
        Self {
            nb_leaves,
            arity,
            truncated,
            expanded,
            depth_width,
            subtree,
        }
    }

    /// Number of leaves.
    pub fn nb_leaves(&self) -> usize {
        self.nb_leaves
    }

    /// Number of levels below the root.
    pub fn depth(&self) -> usize {
        self.arity.len()
    }

    /// Whether [`AuthenticatedTree::authentication_path`] expects sorted indices.
    pub fn requires_sorted_indices(&self) -> bool {
        !self.expanded
    }

    /// Whether the path size depends on which leaves are opened.
    pub fn has_variable_path_size(&self) -> bool {
        !self.expanded
    }

    fn stop_depth(&self) -> usize {
        self.truncated.unwrap_or(0)
    }

    fn branch_siblings(&self) -> usize {
        self.arity[self.stop_depth()..].iter().map(|a| a - 1).sum()
    }

    /// Exact number of digests in the path for `indices`.
    pub fn path_size(&self, indices: &[usize]) -> usize {
        if self.expanded {
            return self.max_path_size(indices.len());
        }
        let mut count = 0usize;
        let remaining = self.walk(indices, |_, _| count += 1);
        let stop = self.stop_depth();
        if stop > 0 {
            count += self.depth_width[stop] - remaining.len();
        }
        count
    }

    /// Worst-case number of digests in a path opening `nb_queries` leaves.
    pub fn max_path_size(&self, nb_queries: usize) -> usize {
        let top = self.depth_width[self.stop_depth()];
        if self.expanded {
            top + nb_queries * self.branch_siblings()
        } else {
            top - 1 + nb_queries * self.branch_siblings()
        }
    }

    /// Hashes `leaves` into a tree.
    pub fn build<H: HashBackend>(&self, hasher: &H, leaves: Vec<Digest>) -> Result<AuthenticatedTree> {
        if leaves.len() != self.nb_leaves {
            return Err(Error::Shape(format!(
                "tree expects {} leaves, got {}",
                self.nb_leaves,
                leaves.len()
            )));
        }
        let levels = self.expand_from_depth(hasher, self.depth(), leaves);
        Ok(AuthenticatedTree {
            shape: self.clone(),
            levels,
        })
    }

    fn expand_from_depth<H: HashBackend>(
        &self,
        hasher: &H,
        depth: usize,
        mut nodes: Vec<Digest>,
    ) -> Vec<Vec<Digest>> {
        nodes.resize(self.depth_width[depth], NULL_DIGEST);
        let mut levels = vec![Vec::new(); depth + 1];
        levels[depth] = nodes;
        for dp in (0..depth).rev() {
            let arity = self.arity[dp];
            let below = &levels[dp + 1];
            let level = map_indices(self.depth_width[dp], |num| {
                hasher.compress(&below[num * arity..(num + 1) * arity])
            });
            levels[dp] = level;
        }
        levels
    }

    /// Walks the sorted `indices` up to the stop depth, reporting every
    /// sibling that has to be supplied and returning the nodes left at the
    /// stop depth.
    fn walk(&self, indices: &[usize], mut sibling: impl FnMut(usize, usize)) -> VecDeque<usize> {
        let stop = self.stop_depth();
        let mut queue: VecDeque<(usize, usize)> =
            indices.iter().map(|&i| (self.depth(), i)).collect();
        while let Some(&(dp, _)) = queue.front() {
            if dp == stop {
                break;
            }
            let Some((_, index)) = queue.pop_front() else {
                break;
            };
            let arity = self.arity[dp - 1];
            let first = index - index % arity;
            let end = first + arity;
            let mut current = Some(index);
            for i in first..end {
                if current == Some(i) {
                    current = match queue.front() {
                        Some(&(d, j)) if d == dp && j < end => {
                            queue.pop_front();
                            Some(j)
                        }
                        _ => None,
                    };
                } else {
                    sibling(dp, i);
                }
            }
            queue.push_back((dp - 1, index / arity));
        }
        queue.into_iter().map(|(_, i)| i).collect()
    }

    fn check_indices(&self, indices: impl Iterator<Item = usize> + Clone) -> bool {
        if indices.clone().any(|i| i >= self.nb_leaves) {
            return false;
        }
        if self.requires_sorted_indices() {
            let mut prev = None;
            for i in indices {
                if prev.map_or(false, |p| p >= i) {
                    return false;
                }
                prev = Some(i);
            }
        }
        true
    }

    /// Recomputes the root from opened `(index, leaf)` pairs and a path.
    ///
    /// Returns `None` when the indices are out of range (or unsorted for a
    /// plain tree), when the path has the wrong length, or when an expanded
    /// sub-path does not lead to its root pre-image.
    pub fn root_from_path<H: HashBackend>(
        &self,
        hasher: &H,
        opened: &[(usize, Digest)],
        path: &[Digest],
    ) -> Option<Digest> {
        if opened.is_empty() || !self.check_indices(opened.iter().map(|(i, _)| *i)) {
            return None;
        }
        if self.expanded {
            self.expanded_root(hasher, opened, path)
        } else {
            self.plain_root(hasher, opened, path)
        }
    }

    fn plain_root<H: HashBackend>(
        &self,
        hasher: &H,
        opened: &[(usize, Digest)],
        path: &[Digest],
    ) -> Option<Digest> {
        let stop = self.stop_depth();
        let mut auth = path.iter();
        let mut queue: VecDeque<(usize, usize, Digest)> =
            opened.iter().map(|&(i, d)| (self.depth(), i, d)).collect();
        while let Some(&(dp, _, _)) = queue.front() {
            if dp == stop {
                break;
            }
            let (_, index, digest) = queue.pop_front()?;
            let arity = self.arity[dp - 1];
            let first = index - index % arity;
            let end = first + arity;
            let mut children = Vec::with_capacity(arity);
            let mut current = Some((index, digest));
            for i in first..end {
                match current {
                    Some((j, node)) if j == i => {
                        children.push(node);
                        current = match queue.front() {
                            Some(&(d, k, next)) if d == dp && k < end => {
                                queue.pop_front();
                                Some((k, next))
                            }
                            _ => None,
                        };
                    }
                    _ => children.push(*auth.next()?),
                }
            }
            queue.push_back((dp - 1, index / arity, hasher.compress(&children)));
        }
        let root = if stop > 0 {
            let mut nodes = Vec::with_capacity(self.depth_width[stop]);
            for num in 0..self.depth_width[stop] {
                match queue.front() {
                    Some(&(_, i, node)) if i == num => {
                        queue.pop_front();
                        nodes.push(node);
                    }
                    _ => nodes.push(*auth.next()?),
                }
            }
            self.expand_from_depth(hasher, stop, nodes)[0][0]
        } else {
            if queue.len() != 1 {
                return None;
            }
            queue.pop_front()?.2
        };
        auth.next().is_none().then_some(root)
    }

    fn expanded_root<H: HashBackend>(
        &self,
        hasher: &H,
        opened: &[(usize, Digest)],
        path: &[Digest],
    ) -> Option<Digest> {
        let subtree = self.subtree.as_ref()?;
        let stop = self.stop_depth();
        let nb_preimages = self.depth_width[stop];
        let sub_size = subtree.max_path_size(1);
        if path.len() != nb_preimages + opened.len() * sub_size {
            return None;
        }
        let (preimages, sub_paths) = path.split_at(nb_preimages);
        let root = self.expand_from_depth(hasher, stop, preimages.to_vec())[0][0];
        let sub_leaves = subtree.nb_leaves;
        for (k, &(index, leaf)) in opened.iter().enumerate() {
            let sub_path = &sub_paths[k * sub_size..(k + 1) * sub_size];
            let preimage =
                subtree.plain_root(hasher, &[(index % sub_leaves, leaf)], sub_path)?;
            if preimage != preimages[index / sub_leaves] {
                return None;
            }
        }
        Some(root)
    }
}

/// A fully hashed tree, owning every level.
#[derive(Debug, Clone)]
pub struct AuthenticatedTree {
    shape: TreeShape,
    levels: Vec<Vec<Digest>>,
}

impl AuthenticatedTree {
    /// Root digest.
    pub fn root(&self) -> Digest {
        self.levels[0][0]
    }

    /// Geometry the tree was built with.
    pub fn shape(&self) -> &TreeShape {
        &self.shape
    }

    /// Nodes at `depth` (`0` is the root level).
    pub fn nodes_at_depth(&self, depth: usize) -> &[Digest] {
        &self.levels[depth]
    }

    /// Authentication path for the leaves at `indices`.
    ///
    /// # Panics
    ///
    /// Panics if `indices` is empty, contains an index `>= nb_leaves`, or (for
    /// plain trees) is not strictly increasing.
    pub fn authentication_path(&self, indices: &[usize]) -> Vec<Digest> {
        let shape = &self.shape;
        assert!(!indices.is_empty(), "at least one leaf must be opened");
        assert!(
            shape.check_indices(indices.iter().copied()),
            "opened indices out of range or not strictly increasing"
        );
        if shape.expanded {
            let stop = shape.stop_depth();
            let mut path = self.levels[stop].clone();
            for &leaf in indices {
                let mut index = leaf;
                for dp in (stop + 1..=shape.depth()).rev() {
                    let arity = shape.arity[dp - 1];
                    let first = index - index % arity;
                    path.extend(
                        (first..first + arity)
                            .filter(|&i| i != index)
                            .map(|i| self.levels[dp][i]),
                    );
                    index /= arity;
                }
            }
            return path;
        }
        let mut path = Vec::with_capacity(shape.path_size(indices));
        let remaining = shape.walk(indices, |dp, i| path.push(self.levels[dp][i]));
        let stop = shape.stop_depth();
        if stop > 0 {
            let mut remaining = remaining.into_iter().peekable();
            for num in 0..shape.depth_width[stop] {
                if remaining.peek() == Some(&num) {
                    remaining.next();
                } else {
                    path.push(self.levels[stop][num]);
                }
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Domain, ShakeHasher};
    use proptest::prelude::*;
    use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

    fn leaves(n: usize) -> Vec<Digest> {
        (0..n)
            .map(|i| ShakeHasher.hash(Domain::DecsLeaf, &[&(i as u64).to_le_bytes()]))
            .collect()
    }

    fn roundtrip(config: &TreeConfig, indices: &[usize]) {
        let shape = TreeShape::new(config).unwrap();
        let leaves = leaves(config.nb_leaves);
        let tree = shape.build(&ShakeHasher, leaves.clone()).unwrap();
        let path = tree.authentication_path(indices);
        assert_eq!(path.len(), shape.path_size(indices));
        assert!(path.len() <= shape.max_path_size(indices.len()));
        let opened: Vec<(usize, Digest)> = indices.iter().map(|&i| (i, leaves[i])).collect();
        assert_eq!(
            shape.root_from_path(&ShakeHasher, &opened, &path),
            Some(tree.root())
        );

        let mut forged = opened.clone();
        forged[0].1[0] ^= 1;
        assert_ne!(
            shape.root_from_path(&ShakeHasher, &forged, &path),
            Some(tree.root())
        );
        if !path.is_empty() {
            let mut short = path.clone();
            short.pop();
            assert_ne!(
                shape.root_from_path(&ShakeHasher, &opened, &short),
                Some(tree.root())
            );
        }
        let mut long = path;
        long.push(NULL_DIGEST);
        assert_eq!(shape.root_from_path(&ShakeHasher, &opened, &long), None);
    }

    #[test]
    fn binary_tree_single_leaf() {
        roundtrip(&TreeConfig::new(8, vec![2, 2, 2]), &[5]);
    }

    #[test]
    fn mixed_arity_partial_tree() {
        roundtrip(&TreeConfig::new(10, vec![3, 2, 2]), &[0, 1, 7, 9]);
    }

    #[test]
    fn truncated_tree_rebuilds_from_cut_level() {
        let config = TreeConfig::new(16, vec![4, 4]).with_truncation(1);
        roundtrip(&config, &[2, 3, 14]);
        let shape = TreeShape::new(&config).unwrap();
        // two siblings per opened block plus the untouched level-1 nodes
        assert_eq!(shape.path_size(&[2, 3, 14]), 2 + 3 + 2);
        roundtrip(&TreeConfig::new(9, vec![3, 3]).with_truncation(2), &[4]);
    }

    #[test]
    fn expanded_paths_have_constant_size() {
        let config = TreeConfig::new(16, vec![2, 4, 2])
            .with_truncation(1)
            .with_expansion();
        let shape = TreeShape::new(&config).unwrap();
        assert!(!shape.requires_sorted_indices());
        assert!(!shape.has_variable_path_size());
        assert_eq!(shape.path_size(&[1]), 2 + 4);
        roundtrip(&config, &[11, 3, 4]);
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        assert!(TreeShape::new(&TreeConfig::new(9, vec![2, 4])).is_err());
        assert!(TreeShape::new(&TreeConfig::new(4, vec![1, 4])).is_err());
        assert!(TreeShape::new(&TreeConfig::new(4, vec![2, 2]).with_truncation(3)).is_err());
        assert!(TreeShape::new(&TreeConfig::new(7, vec![2, 4]).with_expansion()).is_err());
        let shape = TreeShape::new(&TreeConfig::new(4, vec![2, 2])).unwrap();
        assert!(shape.build(&ShakeHasher, leaves(3)).is_err());
    }

    #[test]
    fn unsorted_or_out_of_range_openings_reject() {
        let shape = TreeShape::new(&TreeConfig::new(8, vec![2, 2, 2])).unwrap();
        let leaves = leaves(8);
        let tree = shape.build(&ShakeHasher, leaves.clone()).unwrap();
        let path = tree.authentication_path(&[1, 6]);
        let swapped = [(6, leaves[6]), (1, leaves[1])];
        assert_eq!(shape.root_from_path(&ShakeHasher, &swapped, &path), None);
        assert_eq!(
            shape.root_from_path(&ShakeHasher, &[(8, NULL_DIGEST)], &path),
            None
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn paths_roundtrip_for_any_geometry(
            arity in proptest::collection::vec(2usize..5, 1..4),
            seed in any::<u64>(),
            truncation in 0usize..5,
            expanded in any::<bool>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let capacity: usize = arity.iter().product();
            let nb_leaves = if expanded { capacity } else { rng.gen_range(1..=capacity) };
            let mut config = TreeConfig::new(nb_leaves, arity.clone());
            if truncation <= arity.len() {
                config = config.with_truncation(truncation);
            }
            if expanded {
                config = config.with_expansion();
            }
            let count = rng.gen_range(1..=nb_leaves);
            let mut indices = sample(&mut rng, nb_leaves, count).into_vec();
            if !expanded {
                indices.sort_unstable();
            }
            roundtrip(&config, &indices);
        }
    }
}
