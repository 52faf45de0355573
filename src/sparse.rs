use {
    crate::item::ItemManager,
    std::fmt,
};

/// One run of a sparse sequence: either an item covering a stretch of present
/// slots, or a stretch of absent slots.
#[derive(Clone, Debug, PartialEq)]
pub enum Run<I> {
    Present(I),
    Absent(usize),
}

/// A slot-indexed sparse sequence, stored as alternating present/absent runs.
///
/// Invariants, maintained across every edit:
/// - no empty run;
/// - no two adjacent runs of the same presence;
/// - the last run, if any, is present (trailing absence is dropped).
///
/// An empty `runs` vector therefore means "no present slot at all". The
/// nominal length of the sequence is meaningless; only the run structure
/// matters.
pub struct SparseItems<M: ItemManager> {
    runs: Vec<Run<M::Item>>,
}

impl<M: ItemManager> SparseItems<M> {
    pub fn new() -> Self {
        Self { runs: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Total number of present slots.
    pub fn size(&self) -> usize {
        self.runs
            .iter()
            .filter_map(|run| match run {
                Run::Present(item) => Some(M::len(item)),
                Run::Absent(_) => None,
            })
            .sum()
    }

    /// Write `item` over the slots `[start, start + len(item))`, returning the
    /// exact sub-sequence previously occupying that range.
    pub fn set(&mut self, start: usize, item: M::Item) -> Self {
        let count = M::len(&item);
        self.splice(start, count, Some(item))
    }

    /// Write `count` absent slots starting at `start`, returning the exact
    /// sub-sequence previously occupying that range.
    pub fn delete(&mut self, start: usize, count: usize) -> Self {
        self.splice(start, count, None)
    }

    /// The value at `slot` (if present), whether the slot is present, and the
    /// number of present slots in `[0, slot)`. Runs in O(#runs).
    pub fn get_info(&self, slot: usize) -> (Option<M::Value>, bool, usize) {
        let mut present_before = 0;
        let mut run_start = 0;

        for run in &self.runs {
            let len = run_len::<M>(run);
            if slot < run_start + len {
                return match run {
                    Run::Present(item) => {
                        let value = M::get(item, slot - run_start);
                        (Some(value), true, present_before)
                    },
                    Run::Absent(_) => (None, false, present_before),
                };
            }
            if let Run::Present(item) = run {
                present_before += M::len(item);
            }
            run_start += len;
        }

        // past the end of the last run; everything present comes before
        (None, false, present_before)
    }

    /// Number of present slots in `[0, slot)`.
    pub fn present_before(&self, slot: usize) -> usize {
        self.get_info(slot).2
    }

    /// The slot holding the `k`-th (zero-based) present value at or after
    /// `from_slot`, or `None` if there are fewer than `k + 1` such values.
    pub fn find_present_index(&self, from_slot: usize, k: usize) -> Option<usize> {
        let mut remaining = k;
        let mut run_start = 0;

        for run in &self.runs {
            let len = run_len::<M>(run);
            if let Run::Present(_) = run {
                let lo = run_start.max(from_slot);
                if lo < run_start + len {
                    let available = run_start + len - lo;
                    if remaining < available {
                        return Some(lo + remaining);
                    }
                    remaining -= available;
                }
            }
            run_start += len;
        }

        None
    }

    /// Append a present item at the end of the sequence, merging with a
    /// trailing present run. Used when decoding saved states.
    pub fn push_item(&mut self, item: M::Item) {
        push_run::<M>(&mut self.runs, Run::Present(item));
    }

    /// Append `count` absent slots at the end of the sequence. Used when
    /// decoding saved states; call [`trim`](Self::trim) when done.
    pub fn push_absent(&mut self, count: usize) {
        push_run::<M>(&mut self.runs, Run::Absent(count));
    }

    /// Drop a trailing absent run.
    pub fn trim(&mut self) {
        if let Some(Run::Absent(_)) = self.runs.last() {
            self.runs.pop();
        }
    }

    /// The run structure as `(present, length)` pairs. Used when encoding
    /// saved states.
    pub fn runs(&self) -> impl Iterator<Item = (bool, usize)> + '_ {
        self.runs.iter().map(|run| match run {
            Run::Present(item) => (true, M::len(item)),
            Run::Absent(count) => (false, *count),
        })
    }

    /// A single-pass, resumable iterator over the present slots, in slot
    /// order. Each [`next_slice`](ItemSlicer::next_slice) call continues from
    /// where the previous one stopped.
    pub fn slicer(&self) -> ItemSlicer<'_, M> {
        ItemSlicer {
            runs: &self.runs,
            run_idx: 0,
            offset: 0,
            slot: 0,
        }
    }

    /// Overwrite `[start, start + count)` with one run: `Some(item)` writes
    /// presence, `None` writes absence. Returns the displaced sub-sequence.
    fn splice(&mut self, start: usize, count: usize, replacement: Option<M::Item>) -> Self {
        if count == 0 {
            return Self::new();
        }

        let end = start + count;
        let mut before = vec![];
        let mut displaced = vec![];
        let mut after = vec![];
        let mut run_start = 0;

        for run in self.runs.drain(..) {
            let len = run_len::<M>(&run);
            let run_end = run_start + len;

            if run_end <= start {
                push_run::<M>(&mut before, run);
            } else if run_start >= end {
                push_run::<M>(&mut after, run);
            } else {
                // the run overlaps the spliced range; carve it into the parts
                // before `start`, inside `[start, end)`, and after `end`
                let cut_lo = start.saturating_sub(run_start);
                let cut_hi = (end - run_start).min(len);
                if cut_lo > 0 {
                    push_run::<M>(&mut before, slice_run::<M>(&run, 0, cut_lo));
                }
                push_run::<M>(&mut displaced, slice_run::<M>(&run, cut_lo, cut_hi));
                if cut_hi < len {
                    push_run::<M>(&mut after, slice_run::<M>(&run, cut_hi, len));
                }
            }

            run_start = run_end;
        }

        // the write may land past the old end of the sequence
        if run_start < start {
            push_run::<M>(&mut before, Run::Absent(start - run_start));
        }

        self.runs = before;
        match replacement {
            Some(item) => push_run::<M>(&mut self.runs, Run::Present(item)),
            None => push_run::<M>(&mut self.runs, Run::Absent(count)),
        }
        for run in after {
            push_run::<M>(&mut self.runs, run);
        }
        self.trim();

        let mut displaced = Self { runs: displaced };
        displaced.trim();
        displaced
    }
}

fn run_len<M: ItemManager>(run: &Run<M::Item>) -> usize {
    match run {
        Run::Present(item) => M::len(item),
        Run::Absent(count) => *count,
    }
}

fn slice_run<M: ItemManager>(run: &Run<M::Item>, start: usize, end: usize) -> Run<M::Item> {
    match run {
        Run::Present(item) => Run::Present(M::slice(item, start, end)),
        Run::Absent(_) => Run::Absent(end - start),
    }
}

/// Push a run onto `runs`, merging with the last run if the presence matches
/// and dropping empty runs, so the alternation invariant holds.
fn push_run<M: ItemManager>(runs: &mut Vec<Run<M::Item>>, run: Run<M::Item>) {
    if run_len::<M>(&run) == 0 {
        return;
    }

    let merged = match (runs.pop(), run) {
        (Some(Run::Present(last)), Run::Present(item)) => Run::Present(M::merge(last, item)),
        (Some(Run::Absent(last)), Run::Absent(count)) => Run::Absent(last + count),
        (Some(prev), run) => {
            runs.push(prev);
            run
        },
        (None, run) => run,
    };

    runs.push(merged);
}

pub struct ItemSlicer<'a, M: ItemManager> {
    runs: &'a [Run<M::Item>],
    run_idx: usize,
    /// slots already consumed within the current run
    offset: usize,
    /// absolute slot of the next unconsumed position
    slot: usize,
}

impl<'a, M: ItemManager> ItemSlicer<'a, M> {
    /// Yield all present `(slot, value)` pairs from the resume point up to,
    /// but not including, `end_slot` (to the end of the sequence if `None`).
    pub fn next_slice(&mut self, end_slot: Option<usize>) -> Vec<(usize, M::Value)> {
        let mut out = vec![];

        while self.run_idx < self.runs.len() {
            if let Some(end) = end_slot {
                if self.slot >= end {
                    break;
                }
            }

            let run = &self.runs[self.run_idx];
            let len = run_len::<M>(run);
            let left_in_run = len - self.offset;
            let take = match end_slot {
                Some(end) => left_in_run.min(end - self.slot),
                None => left_in_run,
            };

            if let Run::Present(item) = run {
                for i in 0..take {
                    out.push((self.slot + i, M::get(item, self.offset + i)));
                }
            }

            self.slot += take;
            self.offset += take;
            if self.offset == len {
                self.run_idx += 1;
                self.offset = 0;
            }
        }

        out
    }
}

impl<M: ItemManager> Default for SparseItems<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ItemManager> Clone for SparseItems<M> {
    fn clone(&self) -> Self {
        Self {
            runs: self.runs.clone(),
        }
    }
}

impl<M: ItemManager> fmt::Debug for SparseItems<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.runs).finish()
    }
}

impl<M: ItemManager> PartialEq for SparseItems<M> {
    fn eq(&self, other: &Self) -> bool {
        self.runs == other.runs
    }
}

#[cfg(test)]
use crate::item::{CountItems, ValueItems};

#[cfg(test)]
type Chars = SparseItems<ValueItems<char>>;

#[cfg(test)]
fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

#[test]
fn setting_merges_adjacent_present_runs() {
    let mut seq = Chars::new();
    seq.set(0, chars("ab"));
    seq.set(2, chars("cd"));

    assert_eq!(seq.size(), 4);
    assert_eq!(seq.runs().collect::<Vec<_>>(), vec![(true, 4)]);
    assert_eq!(seq.get_info(3), (Some('d'), true, 3));
}

#[test]
fn setting_past_the_end_pads_with_absence() {
    let mut seq = Chars::new();
    seq.set(5, chars("a"));

    assert_eq!(seq.size(), 1);
    assert_eq!(seq.runs().collect::<Vec<_>>(), vec![(false, 5), (true, 1)]);
    assert_eq!(seq.get_info(0), (None, false, 0));
    assert_eq!(seq.get_info(5), (Some('a'), true, 0));
}

#[test]
fn deleting_the_middle_splits_a_run() {
    let mut seq = Chars::new();
    seq.set(0, chars("abc"));
    let displaced = seq.delete(1, 1);

    assert_eq!(displaced.size(), 1);
    assert_eq!(seq.size(), 2);
    assert_eq!(seq.runs().collect::<Vec<_>>(), vec![(true, 1), (false, 1), (true, 1)]);
    assert_eq!(seq.get_info(1), (None, false, 1));
    assert_eq!(seq.get_info(2), (Some('c'), true, 1));
}

#[test]
fn displaced_records_the_overwritten_range() {
    // slots 0-1 present, 2-3 absent, 4-5 present
    let mut seq = Chars::new();
    seq.set(0, chars("ab"));
    seq.set(4, chars("cd"));

    let displaced = seq.set(1, chars("xyz"));

    // [1, 4) previously held "b" and two absent slots
    assert_eq!(displaced.size(), 1);
    assert_eq!(displaced.runs().collect::<Vec<_>>(), vec![(true, 1)]);
    // the write bridges the gap into one present run
    assert_eq!(seq.size(), 6);
    assert_eq!(seq.runs().collect::<Vec<_>>(), vec![(true, 6)]);
    assert_eq!(seq.get_info(3), (Some('z'), true, 3));
    assert_eq!(seq.get_info(4), (Some('c'), true, 4));
}

#[test]
fn deleting_everything_trims_to_empty() {
    let mut seq = Chars::new();
    seq.set(0, chars("abc"));
    let displaced = seq.delete(0, 5);

    assert_eq!(displaced.size(), 3);
    assert!(seq.is_empty());
    assert_eq!(seq.runs().count(), 0);
}

#[test]
fn deleting_nothing_is_a_noop() {
    let mut seq = Chars::new();
    seq.set(0, chars("ab"));
    let displaced = seq.delete(1, 0);

    assert!(displaced.is_empty());
    assert_eq!(seq.size(), 2);
}

#[test]
fn finding_present_indices() {
    // present slots: 2, 3, 8
    let mut seq = Chars::new();
    seq.push_absent(2);
    seq.push_item(chars("ab"));
    seq.push_absent(4);
    seq.push_item(chars("c"));

    assert_eq!(seq.find_present_index(0, 0), Some(2));
    assert_eq!(seq.find_present_index(0, 1), Some(3));
    assert_eq!(seq.find_present_index(0, 2), Some(8));
    assert_eq!(seq.find_present_index(3, 0), Some(3));
    assert_eq!(seq.find_present_index(3, 1), Some(8));
    assert_eq!(seq.find_present_index(4, 0), Some(8));
    assert_eq!(seq.find_present_index(9, 0), None);
    assert_eq!(seq.find_present_index(0, 3), None);
}

#[test]
fn slicing_resumes_where_it_stopped() {
    // present slots: 2, 3, 8
    let mut seq = Chars::new();
    seq.push_absent(2);
    seq.push_item(chars("ab"));
    seq.push_absent(4);
    seq.push_item(chars("c"));

    let mut slicer = seq.slicer();
    assert_eq!(slicer.next_slice(Some(3)), vec![(2, 'a')]);
    assert_eq!(slicer.next_slice(Some(3)), vec![]);
    assert_eq!(slicer.next_slice(Some(9)), vec![(3, 'b'), (8, 'c')]);
    assert_eq!(slicer.next_slice(None), vec![]);
}

#[test]
fn count_items_track_presence_only() {
    let mut seq = SparseItems::<CountItems>::new();
    seq.set(0, 3);
    let displaced = seq.delete(1, 1);

    assert_eq!(displaced.size(), 1);
    assert_eq!(seq.size(), 2);
    assert_eq!(seq.runs().collect::<Vec<_>>(), vec![(true, 1), (false, 1), (true, 1)]);
    assert_eq!(seq.get_info(2), (Some(()), true, 1));
}
