use {
    crate::{
        error::Result,
        item::ValueItems,
        item_list::{Entries, IndexSearch, ItemList},
        order::Order,
        position::{NodeId, Position},
        sparse::SparseItems,
    },
    std::{collections::BTreeMap, fmt, ops::RangeBounds},
};

/// Saved form of a [`List`]: for each node with values, a mapping from slot
/// index to value. Nodes are emitted in lexicographic id order, so the
/// serialization of a given state is byte-stable; loading does not depend on
/// the order.
pub type ListSavedState<T> = BTreeMap<NodeId, BTreeMap<usize, T>>;

/// A value-carrying list over tree-structured positions: the thin façade over
/// [`ItemList`] that most callers want.
///
/// Every method takes the [`Order`] that owns the position tree; pass the
/// same order to every call on a given list.
pub struct List<T>
where
    T: Clone + fmt::Debug + PartialEq,
{
    items: ItemList<ValueItems<T>>,
}

impl<T> List<T>
where
    T: Clone + fmt::Debug + PartialEq,
{
    pub fn new() -> Self {
        Self {
            items: ItemList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Put `value` at `pos`, overwriting any previous value there.
    pub fn set(&mut self, order: &dyn Order, pos: &Position, value: T) -> Result<()> {
        self.items.set(order, pos, vec![value])
    }

    /// Put consecutive `values` starting at `start`.
    pub fn set_run(&mut self, order: &dyn Order, start: &Position, values: Vec<T>) -> Result<()> {
        self.items.set(order, start, values)
    }

    /// Remove the value at `pos`, if any.
    pub fn delete(&mut self, order: &dyn Order, pos: &Position) -> Result<()> {
        self.items.delete(order, pos, 1)
    }

    /// Remove the values at `count` consecutive positions starting at `start`.
    pub fn delete_run(&mut self, order: &dyn Order, start: &Position, count: usize) -> Result<()> {
        self.items.delete(order, start, count)
    }

    pub fn get(&self, order: &dyn Order, pos: &Position) -> Result<Option<T>> {
        self.items.get(order, pos)
    }

    pub fn has(&self, order: &dyn Order, pos: &Position) -> Result<bool> {
        self.items.has(order, pos)
    }

    pub fn get_at(&self, order: &dyn Order, index: usize) -> Result<T> {
        self.items.get_at(order, index)
    }

    /// Insert `values` at freshly allocated positions immediately after
    /// `prev`, which may be [`Position::min`] to insert at the front.
    pub fn insert(
        &mut self,
        order: &mut dyn Order,
        prev: &Position,
        values: Vec<T>,
    ) -> Result<(Position, Option<NodeId>)> {
        self.items.insert(order, prev, values)
    }

    /// Insert `values` so the first one lands at list index `index`;
    /// `index == len` appends.
    pub fn insert_at(
        &mut self,
        order: &mut dyn Order,
        index: usize,
        values: Vec<T>,
    ) -> Result<(Position, Option<NodeId>)> {
        self.items.insert_at(order, index, values)
    }

    /// Remove the values at list indices `[index, index + count)`.
    pub fn delete_at(&mut self, order: &dyn Order, index: usize, count: usize) -> Result<()> {
        self.items.delete_at(order, index, count)
    }

    pub fn clear(&mut self) {
        self.items.clear()
    }

    pub fn index_of_position(
        &self,
        order: &dyn Order,
        pos: &Position,
        search: IndexSearch,
    ) -> Result<Option<usize>> {
        self.items.index_of_position(order, pos, search)
    }

    pub fn position_at(&self, order: &dyn Order, index: usize) -> Result<Position> {
        self.items.position_at(order, index)
    }

    /// Iterate `(position, value)` pairs for the list indices in `range`.
    pub fn entries<'a>(
        &'a self,
        order: &'a dyn Order,
        range: impl RangeBounds<usize>,
    ) -> Result<Entries<'a, ValueItems<T>>> {
        self.items.entries(order, range)
    }

    /// All values in list order.
    pub fn values(&self, order: &dyn Order) -> Result<Vec<T>> {
        self.items
            .entries(order, ..)?
            .map(|entry| entry.map(|(_, value)| value))
            .collect()
    }

    pub fn save(&self) -> ListSavedState<T> {
        self.items.save(|values| {
            let mut slicer = values.slicer();
            slicer.next_slice(None).into_iter().collect()
        })
    }

    pub fn load(&mut self, order: &dyn Order, saved: ListSavedState<T>) -> Result<()> {
        self.items.load(order, saved, |stored| {
            let mut values = SparseItems::new();
            // BTreeMap iterates in slot order, so each set appends
            for (slot, value) in stored {
                values.set(slot, vec![value]);
            }
            values
        })
    }
}

impl<T> Default for List<T>
where
    T: Clone + fmt::Debug + PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}
