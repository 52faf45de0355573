use poslist::{NodeId, Position};

pub fn pos(node: &NodeId, slot: usize) -> Position {
    Position::new(node.clone(), slot)
}
