//! Row comparison over the current join/sort key.
//!
//! Comparing is not a plain total order: while joining, a null on either
//! side matches anything (inner-join semantics only), and two equal values
//! bound in different arms of the same union are reported as
//! [`RowOrder::UnionConflict`] so that they are never collapsed into one row.

use std::cmp::Ordering;

use tracing::trace;

use crate::binding::Bindings;
use crate::column::{RID_NULL, Rid};
use crate::context::{MergeFlags, UnionGroups};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    Less,
    Equal,
    Greater,
    /// Equal values that come from mutually exclusive union arms.
    UnionConflict,
}

/// One join column: its position in the left and in the right table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyColumn {
    pub left: usize,
    pub right: usize,
}

impl KeyColumn {
    /// Key for comparing a table with itself.
    pub fn same(i: usize) -> Self {
        Self { left: i, right: i }
    }
}

/// Compares a row of one table with a row of another over a fixed key.
///
/// With `groups` set the comparison is a join comparison: nulls act as
/// wildcards (unless merging an `OPTIONAL`) and union tags are consulted.
#[derive(Debug, Clone, Copy)]
pub struct Comparator<'a> {
    groups: Option<&'a UnionGroups>,
    flags: MergeFlags,
    key: &'a [KeyColumn],
    left_len: usize,
    right_len: usize,
}

impl<'a> Comparator<'a> {
    pub fn new(key: &'a [KeyColumn], left_len: usize, right_len: usize) -> Self {
        Self {
            groups: None,
            flags: MergeFlags::NONE,
            key,
            left_len,
            right_len,
        }
    }
    pub fn joining(mut self, groups: &'a UnionGroups, flags: MergeFlags) -> Self {
        self.groups = Some(groups);
        self.flags = flags;
        self
    }

    pub fn compare(&self, left: &Bindings, p1: usize, right: &Bindings, p2: usize) -> RowOrder {
        if p1 >= self.left_len {
            trace!(p1, "compare: left past end");
            return RowOrder::Greater;
        }
        if p2 >= self.right_len {
            trace!(p2, "compare: right past end");
            return RowOrder::Less;
        }
        for k in self.key {
            let a = left.column_at(k.left);
            let b = right.column_at(k.right);
            let av = a.value(p1);
            let bv = b.value(p2);
            if self.groups.is_some() && !self.flags.optional && (av == RID_NULL || bv == RID_NULL) {
                continue;
            }
            match av.cmp(&bv) {
                Ordering::Greater => return RowOrder::Greater,
                Ordering::Less => return RowOrder::Less,
                Ordering::Equal => {}
            }
            let (u1, u2) = (a.tag(p1), b.tag(p2));
            if let Some(groups) = self.groups {
                if u1 != u2 && groups.group(u1) == groups.group(u2) {
                    trace!(column = a.name(), u1, u2, "compare: union different");
                    return RowOrder::UnionConflict;
                }
            }
        }
        RowOrder::Equal
    }
}

/// Compares row `p` of `b` with a snapshot of key values (`key[i]` pairs with `cols[i]`).
pub fn compare_with_key(b: &Bindings, p: usize, cols: &[usize], key: &[Rid]) -> Ordering {
    for (col, w) in cols.iter().zip(key) {
        match b.column_at(*col).value(p).cmp(w) {
            Ordering::Equal => {}
            decided => return decided,
        }
    }
    Ordering::Equal
}

impl Bindings {
    /// Compares row `p1` of `self` with row `p2` of `other` over the columns
    /// flagged `sort` in both, outside of any join.
    pub fn compare_rows(&self, p1: usize, other: &Bindings, p2: usize) -> RowOrder {
        let key: Vec<KeyColumn> = self
            .sort_columns()
            .into_iter()
            .filter_map(|left| {
                other
                    .position(self.column_at(left).name())
                    .filter(|right| other.column_at(*right).sort())
                    .map(|right| KeyColumn { left, right })
            })
            .collect();
        Comparator::new(&key, self.len(), other.len()).compare(self, p1, other, p2)
    }
}
