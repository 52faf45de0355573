use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Identifier of a node in the position tree.
///
/// Node ids are opaque strings chosen by the position provider. Three ids are
/// reserved and must not be assigned to ordinary nodes:
///
/// | id     | meaning                                    |
/// | ------ | ------------------------------------------ |
/// | `ROOT` | the root node of the position tree         |
/// | `MIN`  | carrier of the minimum sentinel position   |
/// | `MAX`  | carrier of the maximum sentinel position   |
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

pub const ROOT_ID: &str = "ROOT";

const MIN_ID: &str = "MIN";
const MAX_ID: &str = "MAX";

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self(ROOT_ID.into())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId(\"{}\")", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A location in the tree-structured total order: a node of the position tree
/// together with one of that node's slot indices.
///
/// A position exists independently of whether a value is currently stored at
/// it; the list maps a sparse subset of positions to values.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub node: NodeId,
    pub slot: usize,
}

impl Position {
    pub fn new(node: impl Into<NodeId>, slot: usize) -> Self {
        Self {
            node: node.into(),
            slot,
        }
    }

    /// The sentinel position that precedes every storable position.
    ///
    /// Sentinels live on reserved non-tree node ids, so they can never be
    /// stored or returned by an index lookup; they only serve as endpoints
    /// when inserting at the edges of the list.
    pub fn min() -> Self {
        Self::new(MIN_ID, 0)
    }

    /// The sentinel position that follows every storable position.
    pub fn max() -> Self {
        Self::new(MAX_ID, 0)
    }

    pub fn is_min(&self) -> bool {
        self.node.0 == MIN_ID
    }

    pub fn is_max(&self) -> bool {
        self.node.0 == MAX_ID
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({}, {})", self.node, self.slot)
    }
}
