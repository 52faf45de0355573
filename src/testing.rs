//! An in-memory [`Order`] implementation for use in tests.
//!
//! The real position provider in a collaborative setting is a list CRDT's
//! allocator; this mock only has to produce *some* valid tree
//! deterministically, so that the list can be exercised without one.

use {
    crate::{
        error::{Error, Result},
        order::{ChildLink, Order, OrderNode, ParentLink},
        position::{NodeId, Position},
    },
    log::trace,
    std::collections::HashMap,
};

/// An in-memory position tree with a deterministic allocator.
///
/// Allocation rules:
/// - inserting after [`Position::min`] creates a node under the root,
///   anchored before root slot 0;
/// - inserting after the last slot ever handed out on a non-root node, with
///   no child anchored past it, extends that node in place;
/// - otherwise a new node is created under `prev`'s node, anchored at
///   `prev.slot + 1`.
///
/// A new node sorts *before* existing siblings with the same anchor, which
/// puts it immediately after `prev` in list order and therefore strictly
/// between `prev` and its successor. Created ids are `"{replica}{counter}"`,
/// e.g. `A1`, `A2`, …
pub struct MockOrder {
    nodes: HashMap<NodeId, OrderNode>,
    /// per-node count of slots handed out so far
    watermarks: HashMap<NodeId, usize>,
    replica: String,
    counter: u64,
}

impl MockOrder {
    pub fn new() -> Self {
        Self::with_replica("A")
    }

    pub fn with_replica(replica: impl Into<String>) -> Self {
        let root = OrderNode::root();
        let mut nodes = HashMap::new();
        let mut watermarks = HashMap::new();
        // the root hands out slots 0 and 1 only and never grows
        watermarks.insert(root.id.clone(), 2);
        nodes.insert(root.id.clone(), root);

        Self {
            nodes,
            watermarks,
            replica: replica.into(),
            counter: 0,
        }
    }

    /// Graft a node with a fixed id under `parent`, anchored before the
    /// parent's slot `anchor` and with `slots` addressable slots. For tests
    /// that need a specific tree shape.
    ///
    /// Panics on a duplicate id or an unknown parent.
    pub fn add_node(
        &mut self,
        id: impl Into<NodeId>,
        parent: &NodeId,
        anchor: usize,
        slots: usize,
    ) -> NodeId {
        let id = id.into();
        assert!(!self.nodes.contains_key(&id), "duplicate node id {id}");

        let parent_node = self
            .nodes
            .get_mut(parent)
            .unwrap_or_else(|| panic!("unknown parent node {parent}"));
        parent_node.insert_child(ChildLink {
            id: id.clone(),
            anchor,
        });

        self.nodes.insert(id.clone(), OrderNode {
            id: id.clone(),
            parent: Some(ParentLink {
                id: parent.clone(),
                anchor,
            }),
            children: vec![],
        });
        self.watermarks.insert(id.clone(), slots);

        id
    }
}

impl Order for MockOrder {
    fn node(&self, id: &NodeId) -> Option<&OrderNode> {
        self.nodes.get(id)
    }

    fn create_positions(
        &mut self,
        prev: &Position,
        _next: &Position,
        count: usize,
    ) -> Result<(Position, Option<NodeId>)> {
        assert!(count > 0, "cannot allocate zero positions");

        let (parent_id, anchor) = if prev.is_min() {
            (NodeId::root(), 0)
        } else {
            let node = self.nodes.get(&prev.node).ok_or_else(|| Error::MissingNode {
                id: prev.node.clone(),
            })?;
            let watermark = self.watermarks.get(&prev.node).copied().unwrap_or(0);

            // if prev is the newest slot of its node and no child is anchored
            // past it, nothing can ever sort between prev and the slots that
            // would extend the node, so no new node is needed
            let extendable = !prev.node.is_root()
                && prev.slot + 1 == watermark
                && node.children.iter().all(|child| child.anchor <= prev.slot);
            if extendable {
                self.watermarks.insert(prev.node.clone(), watermark + count);
                trace!("extended node {} to {} slots", prev.node, watermark + count);
                return Ok((Position::new(prev.node.clone(), prev.slot + 1), None));
            }

            (prev.node.clone(), prev.slot + 1)
        };

        self.counter += 1;
        let id = NodeId::new(format!("{}{}", self.replica, self.counter));
        let parent_node = self
            .nodes
            .get_mut(&parent_id)
            .ok_or_else(|| Error::MissingNode {
                id: parent_id.clone(),
            })?;
        parent_node.insert_child(ChildLink {
            id: id.clone(),
            anchor,
        });

        self.nodes.insert(id.clone(), OrderNode {
            id: id.clone(),
            parent: Some(ParentLink {
                id: parent_id,
                anchor,
            }),
            children: vec![],
        });
        self.watermarks.insert(id.clone(), count);
        trace!("created node {id} with {count} slots");

        Ok((Position::new(id.clone(), 0), Some(id)))
    }
}

impl Default for MockOrder {
    fn default() -> Self {
        Self::new()
    }
}
