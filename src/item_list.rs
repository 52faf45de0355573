use {
    crate::{
        error::{Error, Result},
        item::ItemManager,
        order::{ChildLink, Order, OrderNode},
        position::{NodeId, Position},
        sparse::{ItemSlicer, SparseItems},
    },
    log::debug,
    std::{
        cell::RefCell,
        collections::{BTreeMap, HashMap},
        ops::{Bound, RangeBounds},
    },
};

/// Per-node record. A record exists for a node if and only if the node or one
/// of its descendants currently holds a present value (`total > 0`); absence
/// of a record is semantically a zero total with empty values.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeData<M: ItemManager> {
    /// Number of present values in this node and all of its descendants.
    total: usize,
    /// Number of present parent slots strictly before this node's anchor.
    /// Kept up to date so index lookups never re-scan the parent's run list.
    parent_values_before: usize,
    /// This node's own slots, as a sparse sequence.
    values: SparseItems<M>,
}

impl<M: ItemManager> NodeData<M> {
    fn new(parent_values_before: usize) -> Self {
        Self {
            total: 0,
            parent_values_before,
            values: SparseItems::new(),
        }
    }
}

#[cfg(feature = "debug")]
impl<M: ItemManager> NodeData<M> {
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn parent_values_before(&self) -> usize {
        self.parent_values_before
    }

    pub fn values(&self) -> &SparseItems<M> {
        &self.values
    }
}

/// What an index lookup should report for a position that holds no value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexSearch {
    /// `None` for an absent position.
    Exact,
    /// The index of the closest present position to the left, `None` if there
    /// is none.
    Left,
    /// The index the position would occupy, i.e. the index of the closest
    /// present position to the right (`len` if there is none). Always `Some`.
    Right,
}

/// A list of values keyed by tree-structured positions, indexable in both
/// directions: position to list index and list index to position.
///
/// The position tree itself is owned by an [`Order`] implementation; the list
/// only stores, per node, a record of the values living on that node's slots
/// plus the derived counters that make index translation logarithmic in the
/// tree depth. Every operation takes the order as a parameter, the same one
/// each time.
///
/// | method                                       | description                                  |
/// | -------------------------------------------- | -------------------------------------------- |
/// | `set`, `delete`                              | write or erase values at known positions     |
/// | `insert`, `insert_at`                        | allocate fresh positions and write to them   |
/// | `get`, `has`, `get_at`                       | point reads                                  |
/// | `index_of_position`, `position_at`           | translate between positions and list indices |
/// | `entries`                                    | iterate a slice in list order                |
/// | `save`, `load`                               | convert to/from a position-addressed mapping |
pub struct ItemList<M: ItemManager> {
    state: HashMap<NodeId, NodeData<M>>,
    len: usize,
    /// Single-entry memo for the number of values preceding a node's whole
    /// subtree. Dropped on any write outside the memoized node; kept on
    /// writes to the node itself, since the count does not depend on the
    /// subtree's interior.
    before_cache: RefCell<Option<(NodeId, usize)>>,
}

impl<M: ItemManager> ItemList<M> {
    pub fn new() -> Self {
        Self {
            state: HashMap::new(),
            len: 0,
            before_cache: RefCell::new(None),
        }
    }

    /// Number of present values in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The value at `pos`, or `None` if the position holds no value.
    pub fn get(&self, order: &dyn Order, pos: &Position) -> Result<Option<M::Value>> {
        resolve(order, &pos.node)?;
        Ok(self
            .state
            .get(&pos.node)
            .and_then(|data| data.values.get_info(pos.slot).0))
    }

    pub fn has(&self, order: &dyn Order, pos: &Position) -> Result<bool> {
        resolve(order, &pos.node)?;
        Ok(self
            .state
            .get(&pos.node)
            .is_some_and(|data| data.values.get_info(pos.slot).1))
    }

    /// The value at list index `index`.
    pub fn get_at(&self, order: &dyn Order, index: usize) -> Result<M::Value> {
        let pos = self.position_at(order, index)?;
        self.get(order, &pos)?.ok_or(Error::InvariantViolation {
            reason: "position resolved from an index holds no value",
        })
    }

    /// Write `item` over the positions starting at `start`, overwriting
    /// whatever was there. Writing an empty item is a no-op beyond resolving
    /// the node.
    pub fn set(&mut self, order: &dyn Order, start: &Position, item: M::Item) -> Result<()> {
        resolve(order, &start.node)?;

        let count = M::len(&item);
        if count == 0 {
            return Ok(());
        }
        check_root_bounds(start, count)?;

        let data = self.ensure_record(order, &start.node)?;
        let displaced = data.values.set(start.slot, item);
        let delta = count as isize - displaced.size() as isize;

        self.finish_mutation(order, &start.node, delta)
    }

    /// Erase `count` positions starting at `start`. Erasing already-absent
    /// positions is a no-op, not an error.
    pub fn delete(&mut self, order: &dyn Order, start: &Position, count: usize) -> Result<()> {
        resolve(order, &start.node)?;

        if count == 0 {
            return Ok(());
        }
        check_root_bounds(start, count)?;

        // no record means nothing present on the node or below it
        let Some(data) = self.state.get_mut(&start.node) else {
            return Ok(());
        };
        let displaced = data.values.delete(start.slot, count);
        let delta = -(displaced.size() as isize);

        self.finish_mutation(order, &start.node, delta)
    }

    /// Allocate fresh positions immediately after `prev` (which may be
    /// [`Position::min`]) and write `item` to them. Returns the first new
    /// position and the id of the node the order created, if any.
    pub fn insert(
        &mut self,
        order: &mut dyn Order,
        prev: &Position,
        item: M::Item,
    ) -> Result<(Position, Option<NodeId>)> {
        let count = M::len(&item);
        if count == 0 {
            return Err(Error::InvalidInsertion {
                prev: prev.clone(),
                reason: "cannot insert an empty item",
            });
        }
        if prev.is_max() {
            return Err(Error::InvalidInsertion {
                prev: prev.clone(),
                reason: "no position exists after the maximum sentinel",
            });
        }

        let next_index = if prev.is_min() {
            0
        } else {
            match self.index_of_position(&*order, prev, IndexSearch::Left)? {
                Some(index) => index + 1,
                None => 0,
            }
        };
        let next = if next_index == self.len {
            Position::max()
        } else {
            self.position_at(&*order, next_index)?
        };

        let (start, created) = order.create_positions(prev, &next, count)?;
        debug!(
            "allocated {count} positions at ({}, {}), new node: {:?}",
            start.node, start.slot, created,
        );
        self.set(&*order, &start, item)?;

        Ok((start, created))
    }

    /// Allocate fresh positions so the first value of `item` ends up at list
    /// index `index` (which may equal `len`, meaning append), and write
    /// `item` to them.
    pub fn insert_at(
        &mut self,
        order: &mut dyn Order,
        index: usize,
        item: M::Item,
    ) -> Result<(Position, Option<NodeId>)> {
        if index > self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }

        let prev = if index == 0 {
            Position::min()
        } else {
            self.position_at(&*order, index - 1)?
        };

        self.insert(order, &prev, item)
    }

    /// Erase the values at list indices `[index, index + count)`.
    pub fn delete_at(&mut self, order: &dyn Order, index: usize, count: usize) -> Result<()> {
        if count == 0 {
            return if index <= self.len {
                Ok(())
            } else {
                Err(Error::IndexOutOfBounds {
                    index,
                    len: self.len,
                })
            };
        }
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        if self.len - index < count {
            return Err(Error::InvalidCount {
                index,
                count,
                len: self.len,
            });
        }

        // resolve all the positions up front; deleting shifts the indices but
        // not the positions
        let positions = (index..index + count)
            .map(|i| self.position_at(order, i))
            .collect::<Result<Vec<_>>>()?;
        for pos in &positions {
            self.delete(order, pos, 1)?;
        }

        Ok(())
    }

    /// Forget all values. The position tree is not touched.
    pub fn clear(&mut self) {
        self.state.clear();
        self.len = 0;
        *self.before_cache.borrow_mut() = None;
    }

    /// The list index of `pos`. For a present position, returns its index
    /// regardless of `search`; for an absent one, see [`IndexSearch`].
    pub fn index_of_position(
        &self,
        order: &dyn Order,
        pos: &Position,
        search: IndexSearch,
    ) -> Result<Option<usize>> {
        let node = resolve(order, &pos.node)?;

        let (present, own_before) = match self.state.get(&pos.node) {
            Some(data) => {
                let (_, present, before) = data.values.get_info(pos.slot);
                (present, before)
            },
            None => (false, 0),
        };

        // values in subtrees anchored at or before this slot also precede it
        let mut values_before = own_before;
        for link in &node.children {
            if link.anchor > pos.slot {
                break;
            }
            if let Some(child) = self.state.get(&link.id) {
                values_before += child.total;
            }
        }

        let base = values_before + self.values_before_subtree(order, &pos.node)?;

        Ok(if present {
            Some(base)
        } else {
            match search {
                IndexSearch::Exact => None,
                IndexSearch::Left => base.checked_sub(1),
                IndexSearch::Right => Some(base),
            }
        })
    }

    /// The position currently holding list index `index`.
    pub fn position_at(&self, order: &dyn Order, index: usize) -> Result<Position> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }

        let mut remaining = index;
        let mut current = NodeId::root();

        'descend: loop {
            let node = resolve(order, &current)?;
            let data = self.state.get(&current).ok_or(Error::InvariantViolation {
                reason: "index descent reached a node without a record",
            })?;

            // walk the children in list order; between two recorded children,
            // `parent_values_before` tells how many of this node's own values
            // sit in between, without scanning the run list
            let mut prev_before = 0;
            let mut from_slot = 0;
            for link in &node.children {
                let Some(child) = self.state.get(&link.id) else {
                    continue;
                };
                let values_between = child
                    .parent_values_before
                    .checked_sub(prev_before)
                    .ok_or(Error::InvariantViolation {
                        reason: "child offsets are out of order",
                    })?;

                if remaining < values_between {
                    return position_in_values(data, &current, from_slot, remaining);
                }
                remaining -= values_between;

                if remaining < child.total {
                    current = link.id.clone();
                    continue 'descend;
                }
                remaining -= child.total;

                prev_before = child.parent_values_before;
                from_slot = link.anchor;
            }

            // past the last recorded child: the index must fall among this
            // node's remaining own values
            let values_after = data
                .values
                .size()
                .checked_sub(prev_before)
                .ok_or(Error::InvariantViolation {
                    reason: "child offset exceeds the node's value count",
                })?;
            if remaining < values_after {
                return position_in_values(data, &current, from_slot, remaining);
            }

            return Err(Error::InvariantViolation {
                reason: "index descent exhausted a node's children",
            });
        }
    }

    /// Iterate the `(position, value)` pairs of list indices within `range`,
    /// in list order.
    ///
    /// The iterator is single-pass and must not outlive a mutation of the
    /// list; subtrees wholly before the range are skipped without being
    /// walked, and deep trees are handled with an explicit stack rather than
    /// recursion.
    pub fn entries<'a>(
        &'a self,
        order: &'a dyn Order,
        range: impl RangeBounds<usize>,
    ) -> Result<Entries<'a, M>> {
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end + 1,
            Bound::Excluded(&end) => end,
            Bound::Unbounded => self.len,
        };
        let end = end.min(self.len);

        let mut stack = vec![];
        if start < end {
            let root_id = NodeId::root();
            if let Some(root_data) = self.state.get(&root_id) {
                let root_node = resolve(order, &root_id)?;
                stack.push(Frame::new(root_node, root_data));
            }
        }

        Ok(Entries {
            list: self,
            order,
            stack,
            index: 0,
            start,
            end,
        })
    }

    /// Convert the list into a mapping from node id to the encoding of that
    /// node's sparse sequence. Exactly the nodes with a non-empty sequence
    /// appear; nodes that only carry descendants are reconstructed on load.
    pub fn save<S>(&self, encode: impl Fn(&SparseItems<M>) -> S) -> BTreeMap<NodeId, S> {
        self.state
            .iter()
            .filter(|(_, data)| !data.values.is_empty())
            .map(|(id, data)| (id.clone(), encode(&data.values)))
            .collect()
    }

    /// Replace the list's contents with a previously saved mapping. Fails
    /// fast with [`Error::MissingNode`] on the first id unknown to `order`;
    /// the list must then be treated as garbage (partial state is not rolled
    /// back).
    pub fn load<S>(
        &mut self,
        order: &dyn Order,
        saved: impl IntoIterator<Item = (NodeId, S)>,
        decode: impl Fn(S) -> SparseItems<M>,
    ) -> Result<()> {
        self.clear();

        for (id, stored) in saved {
            let mut values = decode(stored);
            values.trim();
            if values.is_empty() {
                continue;
            }

            let delta = values.size() as isize;
            let data = self.ensure_record(order, &id)?;
            data.values = values;
            self.finish_mutation(order, &id, delta)?;
        }
        debug!("loaded {} values across {} nodes", self.len, self.state.len());

        Ok(())
    }

    /// Number of values that precede the entire subtree rooted at `node_id`,
    /// memoized for the most recently queried node.
    fn values_before_subtree(&self, order: &dyn Order, node_id: &NodeId) -> Result<usize> {
        if let Some((cached_id, cached)) = self.before_cache.borrow().as_ref() {
            if cached_id == node_id {
                return Ok(*cached);
            }
        }

        let mut total = 0;
        let mut current = node_id.clone();
        loop {
            let node = resolve(order, &current)?;
            let Some(parent_link) = &node.parent else {
                break;
            };

            // the parent's own values before this node's anchor; prefer the
            // maintained offset, fall back to scanning when there's no record
            total += match self.state.get(&current) {
                Some(data) => data.parent_values_before,
                None => self
                    .state
                    .get(&parent_link.id)
                    .map_or(0, |parent| parent.values.present_before(parent_link.anchor)),
            };

            // plus the subtrees of all earlier siblings
            let parent = resolve(order, &parent_link.id)?;
            for link in &parent.children {
                if link.id == current {
                    break;
                }
                if let Some(sibling) = self.state.get(&link.id) {
                    total += sibling.total;
                }
            }

            current = parent_link.id.clone();
        }

        *self.before_cache.borrow_mut() = Some((node_id.clone(), total));
        Ok(total)
    }

    /// Get or create the record for `id`, seeding `parent_values_before`
    /// from the parent's current values on creation.
    fn ensure_record(&mut self, order: &dyn Order, id: &NodeId) -> Result<&mut NodeData<M>> {
        if !self.state.contains_key(id) {
            let parent = resolve(order, id)?.parent.clone();
            let parent_values_before = parent.map_or(0, |link| {
                self.state
                    .get(&link.id)
                    .map_or(0, |data| data.values.present_before(link.anchor))
            });
            self.state.insert(id.clone(), NodeData::new(parent_values_before));
        }

        Ok(self.state.get_mut(id).expect("record was just created"))
    }

    /// Restore the derived state after `node_id`'s values changed by `delta`
    /// present slots: drop the memo if it points elsewhere, propagate the
    /// delta through the ancestor totals (dropping records that hit zero),
    /// then refresh the offsets of the node's direct children. Totals must be
    /// settled before the offsets so that children deleted by the walk are
    /// skipped naturally.
    fn finish_mutation(&mut self, order: &dyn Order, node_id: &NodeId, delta: isize) -> Result<()> {
        {
            let mut cache = self.before_cache.borrow_mut();
            if cache.as_ref().map(|(id, _)| id) != Some(node_id) {
                *cache = None;
            }
        }

        if delta != 0 {
            let mut current = node_id.clone();
            loop {
                let total = {
                    let data = self.ensure_record(order, &current)?;
                    let total = data.total as isize + delta;
                    if total < 0 {
                        return Err(Error::InvariantViolation {
                            reason: "a subtree total went negative",
                        });
                    }
                    data.total = total as usize;
                    data.total
                };
                if total == 0 {
                    self.state.remove(&current);
                }

                match &resolve(order, &current)?.parent {
                    Some(link) => current = link.id.clone(),
                    None => break,
                }
            }

            self.len = (self.len as isize + delta) as usize;
        }

        for link in resolve(order, node_id)?.children.iter() {
            let parent_values_before = self
                .state
                .get(node_id)
                .map_or(0, |data| data.values.present_before(link.anchor));
            if let Some(child) = self.state.get_mut(&link.id) {
                child.parent_values_before = parent_values_before;
            }
        }

        Ok(())
    }

}

impl<M: ItemManager> Default for ItemList<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "debug")]
impl<M: ItemManager> ItemList<M> {
    /// All node records, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = (&NodeId, &NodeData<M>)> {
        self.state.iter()
    }

    /// Check every structural invariant of the list against `order`. Intended
    /// for tests and debugging; normal operations maintain these on their
    /// own.
    pub fn validate(&self, order: &dyn Order) -> Result<()> {
        let mut grand_total = 0;

        for (id, data) in &self.state {
            let node = resolve(order, id)?;

            if data.total == 0 {
                return Err(Error::InvariantViolation {
                    reason: "a record exists with a zero total",
                });
            }

            let mut expected_total = data.values.size();
            grand_total += data.values.size();
            for link in &node.children {
                if let Some(child) = self.state.get(&link.id) {
                    expected_total += child.total;
                }
            }
            if data.total != expected_total {
                return Err(Error::InvariantViolation {
                    reason: "a subtree total disagrees with its parts",
                });
            }

            if let Some(parent_link) = &node.parent {
                let expected_before = self
                    .state
                    .get(&parent_link.id)
                    .map_or(0, |parent| parent.values.present_before(parent_link.anchor));
                if data.parent_values_before != expected_before {
                    return Err(Error::InvariantViolation {
                        reason: "a child offset disagrees with its parent's values",
                    });
                }
            }

            let runs = data.values.runs().collect::<Vec<_>>();
            if runs.iter().any(|(_, len)| *len == 0) {
                return Err(Error::InvariantViolation {
                    reason: "a sparse sequence contains an empty run",
                });
            }
            if runs.windows(2).any(|pair| pair[0].0 == pair[1].0) {
                return Err(Error::InvariantViolation {
                    reason: "a sparse sequence contains adjacent runs of equal presence",
                });
            }
            if let Some((false, _)) = runs.last() {
                return Err(Error::InvariantViolation {
                    reason: "a sparse sequence ends in an absent run",
                });
            }
        }

        if grand_total != self.len {
            return Err(Error::InvariantViolation {
                reason: "the sum of node values disagrees with the list length",
            });
        }

        Ok(())
    }
}

fn resolve<'a>(order: &'a dyn Order, id: &NodeId) -> Result<&'a OrderNode> {
    order.node(id).ok_or_else(|| Error::MissingNode { id: id.clone() })
}

fn check_root_bounds(start: &Position, count: usize) -> Result<()> {
    if start.node.is_root() && start.slot + count - 1 > 1 {
        return Err(Error::InvalidPosition {
            node: start.node.clone(),
            slot: start.slot + count - 1,
            reason: "the root node only has slots 0 and 1",
        });
    }
    Ok(())
}

fn position_in_values<M: ItemManager>(
    data: &NodeData<M>,
    node_id: &NodeId,
    from_slot: usize,
    k: usize,
) -> Result<Position> {
    let slot = data
        .values
        .find_present_index(from_slot, k)
        .ok_or(Error::InvariantViolation {
            reason: "fewer values on the node than its counters claim",
        })?;
    Ok(Position {
        node: node_id.clone(),
        slot,
    })
}

struct Frame<'a, M: ItemManager> {
    node: &'a OrderNode,
    slicer: ItemSlicer<'a, M>,
    /// present values between the previous visit point and the next child's
    /// anchor (or the end of the node), materialized in slot order
    pending: std::vec::IntoIter<(usize, M::Value)>,
    next_child: usize,
}

impl<'a, M: ItemManager> Frame<'a, M> {
    fn new(node: &'a OrderNode, data: &'a NodeData<M>) -> Self {
        let mut slicer = data.values.slicer();
        let pending = slicer
            .next_slice(node.children.first().map(|link| link.anchor))
            .into_iter();
        Frame {
            node,
            slicer,
            pending,
            next_child: 0,
        }
    }
}

/// In-order iterator over a slice of the list, driven by an explicit stack of
/// per-node frames so that tree depth never translates into call-stack depth.
pub struct Entries<'a, M: ItemManager> {
    list: &'a ItemList<M>,
    order: &'a dyn Order,
    stack: Vec<Frame<'a, M>>,
    index: usize,
    start: usize,
    end: usize,
}

impl<'a, M: ItemManager> Iterator for Entries<'a, M> {
    type Item = Result<(Position, M::Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;

            if let Some((slot, value)) = frame.pending.next() {
                if self.index >= self.end {
                    self.stack.clear();
                    return None;
                }
                let position = Position {
                    node: frame.node.id.clone(),
                    slot,
                };
                let emit = self.index >= self.start;
                self.index += 1;
                if emit {
                    return Some(Ok((position, value)));
                }
                continue;
            }

            // own values up to the next child are drained; descend into the
            // child, or pop if there are no children left
            let node: &'a OrderNode = frame.node;
            if frame.next_child >= node.children.len() {
                self.stack.pop();
                continue;
            }

            let link: &'a ChildLink = &node.children[frame.next_child];
            frame.next_child += 1;
            let end_slot = node.children.get(frame.next_child).map(|next| next.anchor);
            frame.pending = frame.slicer.next_slice(end_slot).into_iter();

            if let Some(child_data) = self.list.state.get(&link.id) {
                if self.index + child_data.total > self.start {
                    let child_node = match resolve(self.order, &link.id) {
                        Ok(node) => node,
                        Err(err) => {
                            self.stack.clear();
                            return Some(Err(err));
                        },
                    };
                    self.stack.push(Frame::new(child_node, child_data));
                } else {
                    // the whole subtree sits before the requested slice
                    self.index += child_data.total;
                }
            }
        }
    }
}
