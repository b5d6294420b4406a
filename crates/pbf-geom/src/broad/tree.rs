// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Dynamic bounding-volume tree over fattened AABBs.
//!
//! Leaves store the caller's tight bound inflated by a fixed margin so small
//! motions are absorbed without restructuring. Internal nodes always hold the
//! exact union of their two children. After every insertion or removal the
//! ancestors of the touched node are rebalanced with a single AVL-style rotation
//! and refit bottom-up.
//!
//! Nodes live in a [`NodePool`]; handles are slot indices and remain valid as
//! the pool grows.

use crate::broad::policy::{AreaCostPolicy, Descend, InsertionPolicy};
use crate::broad::pool::NodePool;
use crate::broad::{Bounded, ProxyHandle, SpatialIndex};
use crate::error::{GeomError, InvariantViolation};
use crate::types::aabb::Aabb;

#[derive(Debug, Clone)]
struct LeafNode {
    bound: Aabb,
    parent: Option<usize>,
}

#[derive(Debug, Clone)]
struct InternalNode {
    bound: Aabb,
    parent: Option<usize>,
    left: usize,
    right: usize,
    height: u32,
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl TreeNode {
    fn bound(&self) -> &Aabb {
        match self {
            Self::Leaf(leaf) => &leaf.bound,
            Self::Internal(node) => &node.bound,
        }
    }

    fn parent(&self) -> Option<usize> {
        match self {
            Self::Leaf(leaf) => leaf.parent,
            Self::Internal(node) => node.parent,
        }
    }

    fn set_parent(&mut self, parent: Option<usize>) {
        match self {
            Self::Leaf(leaf) => leaf.parent = parent,
            Self::Internal(node) => node.parent = parent,
        }
    }

    fn height(&self) -> u32 {
        match self {
            Self::Leaf(_) => 0,
            Self::Internal(node) => node.height,
        }
    }
}

/// Read-only view of a tree node, handed to [`InsertionPolicy`]
/// implementations and diagnostics.
#[derive(Debug, Copy, Clone)]
pub struct NodeRef<'a> {
    pool: &'a NodePool<TreeNode>,
    index: usize,
}

impl<'a> NodeRef<'a> {
    /// Slot index of the node.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Stored bound (fattened for leaves, exact union for internal nodes).
    #[must_use]
    pub fn bound(&self) -> &'a Aabb {
        self.pool.at(self.index).bound()
    }

    /// `0` for leaves, `1 + max(child heights)` otherwise.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pool.at(self.index).height()
    }

    /// Returns `true` for leaf nodes.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.pool.at(self.index), TreeNode::Leaf(_))
    }

    /// Left and right children, or `None` for a leaf.
    #[must_use]
    pub fn children(&self) -> Option<(Self, Self)> {
        match self.pool.at(self.index) {
            TreeNode::Leaf(_) => None,
            TreeNode::Internal(node) => Some((
                Self { pool: self.pool, index: node.left },
                Self { pool: self.pool, index: node.right },
            )),
        }
    }

    /// Parent node, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.pool
            .at(self.index)
            .parent()
            .map(|index| Self { pool: self.pool, index })
    }
}

/// Pooled, self-balancing bounding-volume hierarchy.
///
/// `P` decides where new leaves are inserted; the default minimizes added area.
#[derive(Debug, Clone)]
pub struct DynamicBoundsTree<P = AreaCostPolicy> {
    pool: NodePool<TreeNode>,
    root: Option<usize>,
    leaf_count: usize,
    margin: f64,
    policy: P,
}

impl Default for DynamicBoundsTree<AreaCostPolicy> {
    fn default() -> Self {
        Self::from_parts(0.0, AreaCostPolicy)
    }
}

impl DynamicBoundsTree<AreaCostPolicy> {
    /// Creates an empty tree that fattens leaves by `margin` on every side.
    pub fn new(margin: f64) -> Result<Self, GeomError> {
        Self::with_policy(margin, AreaCostPolicy)
    }
}

impl<P: InsertionPolicy> DynamicBoundsTree<P> {
    /// Creates an empty tree with a custom insertion policy.
    pub fn with_policy(margin: f64, policy: P) -> Result<Self, GeomError> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(GeomError::InvalidMargin(margin));
        }
        Ok(Self::from_parts(margin, policy))
    }

    fn from_parts(margin: f64, policy: P) -> Self {
        Self { pool: NodePool::default(), root: None, leaf_count: 0, margin, policy }
    }

    /// Fattening margin applied to leaf bounds.
    #[must_use]
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Active nodes, leaves and internal nodes alike.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.pool.active()
    }

    /// Root node view, `None` when the tree is empty.
    #[must_use]
    pub fn root_ref(&self) -> Option<NodeRef<'_>> {
        self.root.map(|index| NodeRef { pool: &self.pool, index })
    }

    /// Height of the whole tree; `None` when empty.
    #[must_use]
    pub fn height(&self) -> Option<u32> {
        self.root.map(|root| self.node(root).height())
    }

    /// Fattened bound stored for a leaf.
    #[must_use]
    pub fn fat_aabb(&self, handle: ProxyHandle) -> Option<&Aabb> {
        match self.pool.get(handle.index()) {
            Some(TreeNode::Leaf(leaf)) => Some(&leaf.bound),
            _ => None,
        }
    }

    /// Free slots in the order the next allocations will take them.
    #[must_use]
    pub fn free_slots(&self) -> Vec<usize> {
        self.pool.free_indices()
    }

    /// Handles of every leaf, in slot order.
    pub fn leaves(&self) -> impl Iterator<Item = ProxyHandle> + '_ {
        self.pool.iter().filter_map(|(index, node)| match node {
            TreeNode::Leaf(_) => Some(ProxyHandle::from_index(index)),
            TreeNode::Internal(_) => None,
        })
    }

    /// Bounds of every internal node, in slot order (debug drawing).
    pub fn internal_bounds(&self) -> impl Iterator<Item = &Aabb> + '_ {
        self.pool.iter().filter_map(|(_, node)| match node {
            TreeNode::Internal(internal) => Some(&internal.bound),
            TreeNode::Leaf(_) => None,
        })
    }

    /// Checks every structural invariant from scratch. O(n).
    ///
    /// Heights and bounds are recomputed from the leaves up rather than read
    /// from the cached fields being verified.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let free = self.pool.free_len();
        let active = self.pool.active();
        let capacity = self.pool.capacity();
        if free + active != capacity {
            return Err(InvariantViolation::PoolAccounting { free, active, capacity });
        }

        let Some(root) = self.root else {
            if active != 0 {
                return Err(InvariantViolation::Unreachable { reachable: 0, active });
            }
            return check_leaf_count(0, self.leaf_count);
        };
        if self.node(root).parent().is_some() {
            return Err(InvariantViolation::RootHasParent(root));
        }

        let mut census = Census::default();
        self.validate_subtree(root, &mut census)?;
        if census.reachable != active {
            return Err(InvariantViolation::Unreachable { reachable: census.reachable, active });
        }
        check_leaf_count(census.leaves, self.leaf_count)
    }

    /// Returns `(height, exact bound)` of the subtree at `index`.
    fn validate_subtree(
        &self,
        index: usize,
        census: &mut Census,
    ) -> Result<(u32, Aabb), InvariantViolation> {
        census.reachable += 1;
        match self.node(index) {
            TreeNode::Leaf(leaf) => {
                census.leaves += 1;
                Ok((0, leaf.bound))
            }
            TreeNode::Internal(node) => {
                let mut computed = [(0, Aabb::default()); 2];
                for (slot, child) in [node.left, node.right].into_iter().enumerate() {
                    let Some(child_node) = self.pool.get(child) else {
                        return Err(InvariantViolation::DanglingChild { parent: index, child });
                    };
                    if child_node.parent() != Some(index) {
                        return Err(InvariantViolation::ParentMismatch {
                            child,
                            expected: index,
                            found: child_node.parent(),
                        });
                    }
                    computed[slot] = self.validate_subtree(child, census)?;
                }
                let height = 1 + computed[0].0.max(computed[1].0);
                if height != node.height {
                    return Err(InvariantViolation::HeightMismatch {
                        node: index,
                        cached: node.height,
                        computed: height,
                    });
                }
                let bound = computed[0].1.union(&computed[1].1);
                if !bound.approx_eq(&node.bound, Aabb::EPSILON) {
                    return Err(InvariantViolation::BoundMismatch(index));
                }
                Ok((height, bound))
            }
        }
    }

    #[cfg(feature = "validate")]
    fn debug_validate(&self) {
        if let Err(violation) = self.validate() {
            unreachable!("dynamic bounds tree corrupted: {violation}");
        }
    }

    #[cfg(not(feature = "validate"))]
    #[allow(clippy::unused_self)]
    fn debug_validate(&self) {}

    // ---------------------------------------------------------------------
    // Node access
    // ---------------------------------------------------------------------

    fn node(&self, index: usize) -> &TreeNode {
        self.pool.at(index)
    }

    fn internal(&self, index: usize) -> &InternalNode {
        match self.node(index) {
            TreeNode::Internal(node) => node,
            TreeNode::Leaf(_) => unreachable!("node {index} is a leaf, expected internal"),
        }
    }

    fn internal_mut(&mut self, index: usize) -> &mut InternalNode {
        match self.pool.at_mut(index) {
            TreeNode::Internal(node) => node,
            TreeNode::Leaf(_) => unreachable!("node {index} is a leaf, expected internal"),
        }
    }

    fn bound(&self, index: usize) -> Aabb {
        *self.node(index).bound()
    }

    fn height_of(&self, index: usize) -> u32 {
        self.node(index).height()
    }

    fn parent(&self, index: usize) -> Option<usize> {
        self.node(index).parent()
    }

    fn set_parent(&mut self, index: usize, parent: Option<usize>) {
        self.pool.at_mut(index).set_parent(parent);
    }

    /// Re-points whichever child slot of `parent` holds `old` to `new`.
    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        let node = self.internal_mut(parent);
        if node.left == old {
            node.left = new;
        } else {
            assert_eq!(node.right, old, "node {old} is not a child of {parent}");
            node.right = new;
        }
    }

    /// Swaps `old` for `new` under `parent`, or at the root when there is none.
    fn relink_parent(&mut self, parent: Option<usize>, old: usize, new: usize) {
        match parent {
            Some(parent) => self.replace_child(parent, old, new),
            None => self.root = Some(new),
        }
    }

    fn is_active_leaf(&self, index: usize) -> bool {
        matches!(self.pool.get(index), Some(TreeNode::Leaf(_)))
    }

    fn expect_leaf(&self, handle: ProxyHandle) -> usize {
        let index = handle.index();
        assert!(self.is_active_leaf(index), "handle {handle} is not an active leaf");
        index
    }

    // ---------------------------------------------------------------------
    // Structure maintenance
    // ---------------------------------------------------------------------

    /// Links an allocated, detached leaf into the tree.
    fn insert_leaf(&mut self, leaf: usize) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            self.set_parent(leaf, None);
            return;
        };

        let leaf_bound = self.bound(leaf);
        let mut index = root;
        while let TreeNode::Internal(node) = self.node(index) {
            let view = NodeRef { pool: &self.pool, index };
            index = match self.policy.choose(&leaf_bound, view) {
                Descend::StopHere => break,
                Descend::Left => node.left,
                Descend::Right => node.right,
            };
        }

        let sibling = index;
        let old_parent = self.parent(sibling);
        let new_parent = self.pool.allocate(TreeNode::Internal(InternalNode {
            bound: leaf_bound.union(&self.bound(sibling)),
            parent: old_parent,
            left: sibling,
            right: leaf,
            height: self.height_of(sibling) + 1,
        }));
        self.relink_parent(old_parent, sibling, new_parent);
        self.set_parent(sibling, Some(new_parent));
        self.set_parent(leaf, Some(new_parent));

        self.refit_from(Some(new_parent));
    }

    /// Unlinks `leaf` from the tree without freeing its slot.
    ///
    /// The leaf's former parent is freed; its sibling takes the parent's place.
    fn detach_leaf(&mut self, leaf: usize) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }

        let Some(parent) = self.parent(leaf) else {
            unreachable!("non-root leaf {leaf} has no parent");
        };
        let grand_parent = self.parent(parent);
        let node = self.internal(parent);
        let sibling = if node.left == leaf {
            node.right
        } else {
            assert_eq!(node.right, leaf, "leaf {leaf} is not a child of {parent}");
            node.left
        };

        self.relink_parent(grand_parent, parent, sibling);
        self.set_parent(sibling, grand_parent);
        self.refit_from(grand_parent);
        self.pool.release(parent);
        self.set_parent(leaf, None);
    }

    /// Rebalances and recomputes height/bound from `start` up to the root.
    fn refit_from(&mut self, start: Option<usize>) {
        let mut cursor = start;
        while let Some(index) = cursor {
            let index = self.balance(index);
            let (left, right) = {
                let node = self.internal(index);
                (node.left, node.right)
            };
            let height = 1 + self.height_of(left).max(self.height_of(right));
            let bound = self.bound(left).union(&self.bound(right));
            let node = self.internal_mut(index);
            node.height = height;
            node.bound = bound;
            cursor = node.parent;
        }
    }

    /// Performs at most one rotation at `a` and returns the subtree root.
    fn balance(&mut self, a: usize) -> usize {
        let TreeNode::Internal(node) = self.node(a) else {
            return a;
        };
        let (b, c) = (node.left, node.right);
        let skew = i64::from(self.height_of(c)) - i64::from(self.height_of(b));
        if skew > 1 {
            self.rotate_left(a, b, c)
        } else if skew < -1 {
            self.rotate_right(a, b, c)
        } else {
            a
        }
    }

    /// Promotes the right child `c` of `a`.
    ///
    /// ```text
    ///       A                C
    ///      / \              / \
    ///     B   C     =>     A   F|G   (taller of F/G stays under C)
    ///        / \          / \
    ///       F   G        B   G|F
    /// ```
    fn rotate_left(&mut self, a: usize, b: usize, c: usize) -> usize {
        let (f, g) = {
            let node = self.internal(c);
            (node.left, node.right)
        };

        let a_parent = self.parent(a);
        self.internal_mut(c).left = a;
        self.set_parent(c, a_parent);
        self.set_parent(a, Some(c));
        self.relink_parent(a_parent, a, c);

        let (keep, moved) = if self.height_of(f) > self.height_of(g) { (f, g) } else { (g, f) };
        self.internal_mut(c).right = keep;
        self.internal_mut(a).right = moved;
        self.set_parent(moved, Some(a));

        self.refit_pair(a, b, moved);
        self.refit_pair(c, a, keep);
        c
    }

    /// Promotes the left child `b` of `a`.
    ///
    /// ```text
    ///         A            B
    ///        / \          / \
    ///       B   C   =>   A   D|E   (taller of D/E stays under B)
    ///      / \          / \
    ///     D   E       E|D  C
    /// ```
    fn rotate_right(&mut self, a: usize, b: usize, c: usize) -> usize {
        let (d, e) = {
            let node = self.internal(b);
            (node.left, node.right)
        };

        let a_parent = self.parent(a);
        self.internal_mut(b).left = a;
        self.set_parent(b, a_parent);
        self.set_parent(a, Some(b));
        self.relink_parent(a_parent, a, b);

        let (keep, moved) = if self.height_of(d) > self.height_of(e) { (d, e) } else { (e, d) };
        self.internal_mut(b).right = keep;
        self.internal_mut(a).left = moved;
        self.set_parent(moved, Some(a));

        self.refit_pair(a, moved, c);
        self.refit_pair(b, a, keep);
        b
    }

    /// Sets `node`'s height and bound from the two given children.
    fn refit_pair(&mut self, node: usize, x: usize, y: usize) {
        let height = 1 + self.height_of(x).max(self.height_of(y));
        let bound = self.bound(x).union(&self.bound(y));
        let internal = self.internal_mut(node);
        internal.height = height;
        internal.bound = bound;
    }

    fn fattened<B: Bounded + ?Sized>(&self, item: &B) -> Aabb {
        item.aabb().inflated(self.margin, self.margin)
    }
}

#[derive(Default)]
struct Census {
    reachable: usize,
    leaves: usize,
}

fn check_leaf_count(counted: usize, recorded: usize) -> Result<(), InvariantViolation> {
    if counted == recorded {
        Ok(())
    } else {
        Err(InvariantViolation::LeafCount { counted, recorded })
    }
}

impl<P: InsertionPolicy> SpatialIndex for DynamicBoundsTree<P> {
    fn add<B: Bounded + ?Sized>(&mut self, item: &B) -> ProxyHandle {
        let bound = self.fattened(item);
        let leaf = self.pool.allocate(TreeNode::Leaf(LeafNode { bound, parent: None }));
        self.insert_leaf(leaf);
        self.leaf_count += 1;
        self.debug_validate();
        ProxyHandle::from_index(leaf)
    }

    fn remove(&mut self, handle: ProxyHandle) {
        let leaf = self.expect_leaf(handle);
        self.detach_leaf(leaf);
        self.pool.release(leaf);
        self.leaf_count -= 1;
        self.debug_validate();
    }

    fn update<B: Bounded + ?Sized>(&mut self, handle: ProxyHandle, item: &B) -> bool {
        let leaf = self.expect_leaf(handle);
        if self.bound(leaf).contains(&item.aabb()) {
            return false;
        }
        // Detach and reinsert in place: same slot, so the handle survives.
        self.detach_leaf(leaf);
        let bound = self.fattened(item);
        if let TreeNode::Leaf(node) = self.pool.at_mut(leaf) {
            node.bound = bound;
        }
        self.insert_leaf(leaf);
        self.debug_validate();
        true
    }

    fn query_into(&self, aabb: &Aabb, strictly_contained: bool, out: &mut Vec<ProxyHandle>) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack: Vec<usize> = Vec::with_capacity(32);
        stack.push(root);
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            if !aabb.overlaps(node.bound()) {
                continue;
            }
            match node {
                TreeNode::Leaf(leaf) => {
                    if !strictly_contained || aabb.contains(&leaf.bound) {
                        out.push(ProxyHandle::from_index(index));
                    }
                }
                TreeNode::Internal(internal) => {
                    stack.push(internal.right);
                    stack.push(internal.left);
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.leaf_count
    }

    fn contains(&self, handle: ProxyHandle) -> bool {
        self.is_active_leaf(handle.index())
    }

    fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    fn free_count(&self) -> usize {
        self.pool.free_len()
    }
}
