//! An indexable list over tree-structured positions.
//!
//! A collaborative position allocator (typically a list CRDT) hands out
//! *positions*: opaque `(node, slot)` pairs drawn from a tree-shaped total
//! order. This crate is the local view on top of such an allocator: it maps a
//! sparse set of positions to values and answers, in either direction, "what
//! value sits at this position" and "what position sits at this list index".
//!
//! Three layers:
//!
//! | layer                   | description                                             |
//! | ----------------------- | ------------------------------------------------------- |
//! | [`SparseItems`]         | one node's slots, as alternating present/absent runs    |
//! | [`ItemList`]            | the core: per-node records, index math, iteration, save |
//! | [`List`] / [`Outline`]  | value-carrying and presence-only façades                |
//!
//! The position tree itself lives behind the [`Order`] trait and is never
//! mutated by the list, except that inserts ask it to allocate fresh
//! positions. [`testing::MockOrder`] provides a deterministic in-memory
//! implementation for tests.

pub mod error;
pub mod item;
pub mod item_list;
pub mod list;
pub mod order;
pub mod outline;
pub mod position;
pub mod sparse;
pub mod testing;

pub use {
    error::{Error, Result},
    item::{CountItems, ItemManager, ValueItems},
    item_list::{Entries, IndexSearch, ItemList, NodeData},
    list::{List, ListSavedState},
    order::{ChildLink, Order, OrderNode, ParentLink},
    outline::{Outline, OutlineSavedState},
    position::{NodeId, Position, ROOT_ID},
    sparse::{ItemSlicer, SparseItems},
};
