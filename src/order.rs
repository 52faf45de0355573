use {
    crate::{
        error::Result,
        position::{NodeId, Position},
    },
    serde::{Deserialize, Serialize},
};

/// A node of the externally maintained position tree, as exposed by an
/// [`Order`] implementation.
///
/// List order interleaves a node's own slots with its children: a child with
/// `anchor = a` sits immediately before slot `a` of its parent. Children are
/// kept in list order, which means non-decreasing anchor; ties among equal
/// anchors are broken by the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNode {
    pub id: NodeId,
    /// `None` for the root node.
    pub parent: Option<ParentLink>,
    pub children: Vec<ChildLink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub id: NodeId,
    /// The parent slot this node is anchored immediately before.
    pub anchor: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildLink {
    pub id: NodeId,
    pub anchor: usize,
}

impl OrderNode {
    pub fn root() -> Self {
        Self {
            id: NodeId::root(),
            parent: None,
            children: vec![],
        }
    }

    /// Insert a child link, keeping the anchor order. The new child goes
    /// before existing children with the same anchor: a freshly allocated
    /// node must sort immediately after the position it was created after,
    /// and older same-anchor siblings come after it in list order.
    pub fn insert_child(&mut self, new_child: ChildLink) {
        for (pos, child) in self.children.iter().enumerate() {
            if child.anchor >= new_child.anchor {
                self.children.insert(pos, new_child);
                return;
            }
        }

        self.children.push(new_child);
    }
}

/// The position provider: owns the tree of nodes that defines the total order
/// of positions, and allocates fresh positions on demand.
///
/// The list reads the tree through this trait but never mutates it; the only
/// write entry point is [`create_positions`](Order::create_positions), called
/// by the insert operations.
pub trait Order {
    /// Resolve a node id. Returns `None` if the id is unknown; the reserved
    /// sentinel ids are never resolvable.
    fn node(&self, id: &NodeId) -> Option<&OrderNode>;

    /// Allocate `count` consecutive positions strictly between `prev` and
    /// `next` in list order, possibly creating one new node. Returns the
    /// first allocated position and the id of the created node, if any.
    ///
    /// `prev` may be [`Position::min`] and `next` may be [`Position::max`].
    /// The result must be deterministic given the current tree state. On
    /// error, the tree is left unchanged.
    fn create_positions(
        &mut self,
        prev: &Position,
        next: &Position,
        count: usize,
    ) -> Result<(Position, Option<NodeId>)>;
}
