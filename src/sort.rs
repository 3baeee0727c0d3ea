//! In-place quicksort and deduplication of binding tables.

use tracing::warn;

use crate::binding::Bindings;
use crate::column::Rid;
use crate::compare::{Comparator, KeyColumn, RowOrder, compare_with_key};

impl Bindings {
    /// Sorts all rows by the columns flagged `sort`, in declaration order.
    ///
    /// Every bound column is first padded with nulls to the table length.
    /// Not stable: rows with equal keys may come out in any order.
    pub fn sort(&mut self) {
        let cols = self.sort_columns();
        if cols.is_empty() {
            warn!("sort called with no sort columns set, ignoring");
            return;
        }
        self.sort_by_columns(&cols);
    }

    /// Sorts by an explicit column order, regardless of the `sort` flags.
    pub(crate) fn sort_by_columns(&mut self, cols: &[usize]) {
        self.pad();
        let length = self.len();
        if length < 2 {
            return;
        }
        // explicit stack rather than recursion, ranges are inclusive
        let mut pending = vec![(0, length - 1)];
        while let Some((left, right)) = pending.pop() {
            if right <= left {
                continue;
            }
            let pivot = self.partition(cols, left, right);
            if pivot > left {
                pending.push((left, pivot - 1));
            }
            pending.push((pivot + 1, right));
        }
    }

    fn partition(&mut self, cols: &[usize], left: usize, right: usize) -> usize {
        let pivot = (left + right) / 2;
        // values move while partitioning, so the pivot key is captured up front
        let key: Vec<Rid> = cols.iter().map(|c| self.column_at(*c).value(pivot)).collect();
        self.swap_rows(pivot, right);
        let mut store = left;
        for p in left..right {
            if compare_with_key(self, p, cols, &key).is_le() {
                self.swap_rows(store, p);
                store += 1;
            }
        }
        self.swap_rows(right, store);
        store
    }

    /// Drops every row equal (on the `sort` columns) to the row after it.
    ///
    /// Meant to run right after a sort on the same columns; only the sort
    /// columns are compacted, the others are left as they are.
    pub fn uniq(&mut self) {
        let cols = self.sort_columns();
        let length = self.len();
        if cols.is_empty() || length == 0 {
            return;
        }
        let key: Vec<KeyColumn> = cols.iter().map(|c| KeyColumn::same(*c)).collect();
        let survivors: Vec<bool> = {
            let cmp = Comparator::new(&key, length, length);
            (0..length)
                .map(|row| row + 1 == length || cmp.compare(self, row, self, row + 1) != RowOrder::Equal)
                .collect()
        };
        for col in cols {
            self.column_at_mut(col)
                .retain_rows(|row| survivors.get(row).copied().unwrap_or(false));
        }
    }
}
