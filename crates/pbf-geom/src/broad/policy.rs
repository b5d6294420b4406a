// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::broad::tree::NodeRef;
use crate::types::aabb::Aabb;

/// Decision taken at an internal node while walking down to insert a leaf.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Descend {
    /// Pair the new leaf with this node under a fresh parent.
    StopHere,
    /// Continue into the left child.
    Left,
    /// Continue into the right child.
    Right,
}

/// Chooses where a new leaf lands in a [`DynamicBoundsTree`].
///
/// `node` is always an internal node; its children can be inspected through
/// [`NodeRef::children`].
///
/// [`DynamicBoundsTree`]: crate::broad::tree::DynamicBoundsTree
pub trait InsertionPolicy {
    /// Picks the next step for a leaf with fattened bound `leaf`.
    fn choose(&self, leaf: &Aabb, node: NodeRef<'_>) -> Descend;
}

/// Surface-area heuristic: minimize the total area added to the tree.
///
/// Costs compared at each internal node `N` for a leaf `L`:
/// - stop here: `2 · area(N ∪ L)` (a new parent spanning both),
/// - descend into child `C`: `area(C ∪ L) + 2 · (area(N ∪ L) − area(N))`, minus
///   `area(C)` when `C` is internal since that area is already paid for.
///
/// Ties favor stopping; an exact left/right tie descends right.
#[derive(Debug, Default, Copy, Clone)]
pub struct AreaCostPolicy;

impl AreaCostPolicy {
    fn child_cost(leaf: &Aabb, child: NodeRef<'_>, descend_cost: f64) -> f64 {
        let mut cost = leaf.union(child.bound()).area() + descend_cost;
        if !child.is_leaf() {
            cost -= child.bound().area();
        }
        cost
    }
}

impl InsertionPolicy for AreaCostPolicy {
    fn choose(&self, leaf: &Aabb, node: NodeRef<'_>) -> Descend {
        let Some((left, right)) = node.children() else {
            return Descend::StopHere;
        };
        let node_area = node.bound().area();
        let union_area = node.bound().union(leaf).area();

        let parent_cost = 2.0 * union_area;
        let descend_cost = 2.0 * (union_area - node_area);
        let left_cost = Self::child_cost(leaf, left, descend_cost);
        let right_cost = Self::child_cost(leaf, right, descend_cost);

        if parent_cost <= left_cost && parent_cost <= right_cost {
            Descend::StopHere
        } else if left_cost < right_cost {
            Descend::Left
        } else {
            Descend::Right
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broad::tree::DynamicBoundsTree;
    use crate::broad::SpatialIndex;
    use glam::DVec2;

    fn unit_at(x: f64, y: f64) -> Aabb {
        Aabb::from_center_half_extents(DVec2::new(x, y), 0.5, 0.5)
    }

    fn two_leaf_tree(a: Aabb, b: Aabb) -> DynamicBoundsTree {
        let mut tree = DynamicBoundsTree::new(0.0).unwrap_or_default();
        tree.add(&a);
        tree.add(&b);
        tree
    }

    #[test]
    fn leaf_far_away_stops_at_root() {
        let tree = two_leaf_tree(unit_at(0.0, 0.0), unit_at(1.0, 0.0));
        let root = tree.root_ref().map(|r| AreaCostPolicy.choose(&unit_at(100.0, 100.0), r));
        assert_eq!(root, Some(Descend::StopHere));
    }

    #[test]
    fn leaf_inside_descends_toward_cheaper_child() {
        let tree = two_leaf_tree(unit_at(0.0, 0.0), unit_at(10.0, 0.0));
        let near_left = unit_at(1.0, 0.0);
        let near_right = unit_at(9.0, 0.0);
        let policy = AreaCostPolicy;
        let left = tree.root_ref().map(|r| policy.choose(&near_left, r));
        let right = tree.root_ref().map(|r| policy.choose(&near_right, r));
        // The first leaf is the left child, the second is the right child.
        assert_eq!(left, Some(Descend::Left));
        assert_eq!(right, Some(Descend::Right));
    }
}
