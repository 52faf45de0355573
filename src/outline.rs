use {
    crate::{
        error::Result,
        item::CountItems,
        item_list::{IndexSearch, ItemList},
        order::Order,
        position::{NodeId, Position},
        sparse::SparseItems,
    },
    std::{collections::BTreeMap, ops::RangeBounds},
};

/// Saved form of an [`Outline`]: for each node, the alternating
/// `[present, absent, present, …]` run lengths of its slots, starting with a
/// present length (possibly zero).
pub type OutlineSavedState = BTreeMap<NodeId, Vec<usize>>;

/// The presence-only counterpart of [`List`](crate::list::List): it tracks
/// *which* positions are in the list, but stores no values. Useful when the
/// values live elsewhere and only the ordering is needed.
pub struct Outline {
    items: ItemList<CountItems>,
}

impl Outline {
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

    /// Mark `pos` as present.
    pub fn add(&mut self, order: &dyn Order, pos: &Position) -> Result<()> {
        self.items.set(order, pos, 1)
    }

    /// Mark `count` consecutive positions starting at `start` as present.
    pub fn add_run(&mut self, order: &dyn Order, start: &Position, count: usize) -> Result<()> {
        self.items.set(order, start, count)
    }

    /// Mark `pos` as absent.
    pub fn delete(&mut self, order: &dyn Order, pos: &Position) -> Result<()> {
        self.items.delete(order, pos, 1)
    }

    /// Mark `count` consecutive positions starting at `start` as absent.
    pub fn delete_run(&mut self, order: &dyn Order, start: &Position, count: usize) -> Result<()> {
        self.items.delete(order, start, count)
    }

    pub fn has(&self, order: &dyn Order, pos: &Position) -> Result<bool> {
        self.items.has(order, pos)
    }

    /// Allocate `count` fresh positions immediately after `prev` and mark
    /// them present.
    pub fn insert(
        &mut self,
        order: &mut dyn Order,
        prev: &Position,
        count: usize,
    ) -> Result<(Position, Option<NodeId>)> {
        self.items.insert(order, prev, count)
    }

    /// Allocate `count` fresh positions at list index `index` and mark them
    /// present; `index == len` appends.
    pub fn insert_at(
        &mut self,
        order: &mut dyn Order,
        index: usize,
        count: usize,
    ) -> Result<(Position, Option<NodeId>)> {
        self.items.insert_at(order, index, count)
    }

    /// Mark the positions at list indices `[index, index + count)` absent.
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

    /// The present positions at the list indices in `range`, in list order.
    pub fn positions<'a>(
        &'a self,
        order: &'a dyn Order,
        range: impl RangeBounds<usize>,
    ) -> Result<impl Iterator<Item = Result<Position>> + 'a> {
        Ok(self
            .items
            .entries(order, range)?
            .map(|entry| entry.map(|(pos, ())| pos)))
    }

    pub fn save(&self) -> OutlineSavedState {
        self.items.save(|values| {
            let mut lengths = vec![];
            for (present, len) in values.runs() {
                if lengths.is_empty() && !present {
                    // the encoding starts with a present length
                    lengths.push(0);
                }
                lengths.push(len);
            }
            lengths
        })
    }

    pub fn load(&mut self, order: &dyn Order, saved: OutlineSavedState) -> Result<()> {
        self.items.load(order, saved, |lengths| {
            let mut values = SparseItems::new();
            for (i, len) in lengths.into_iter().enumerate() {
                if i % 2 == 0 {
                    values.push_item(len);
                } else {
                    values.push_absent(len);
                }
            }
            values
        })
    }
}

impl Default for Outline {
    fn default() -> Self {
        Self::new()
    }
}
