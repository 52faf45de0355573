use crate::position::{NodeId, Position};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("position ({node}, {slot}) is not valid for writing: {reason}")]
    InvalidPosition {
        node: NodeId,
        slot: usize,
        reason: &'static str,
    },

    #[error("cannot insert after position ({}, {}): {reason}", prev.node, prev.slot)]
    InvalidInsertion {
        prev: Position,
        reason: &'static str,
    },

    #[error("node {id} not found in the order")]
    MissingNode {
        id: NodeId,
    },

    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
    },

    #[error("count {count} out of bounds at index {index} for list of length {len}")]
    InvalidCount {
        index: usize,
        count: usize,
        len: usize,
    },

    #[error("list state corrupted: {reason}")]
    InvariantViolation {
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
