//! The merge engine: folds the bindings of one block (`from`) into the
//! bindings accumulated so far (`to`).
//!
//! Two paths exist. When the tables share no join column and there is
//! nothing to intersect, `from` is simply appended (a union). Otherwise both
//! tables are sorted on the join key and walked together as a classic
//! merge join, honoring `OPTIONAL`, union-arm separation and the soft row
//! limit of restricted queries.

// rows of `to` that found a partner are tracked as a set of row numbers
use roaring::RoaringTreemap;
use tracing::{debug, warn};

use crate::binding::Bindings;
use crate::column::{BlockId, Column, RID_NULL};
use crate::compare::{Comparator, KeyColumn, RowOrder};
use crate::context::{MergeFlags, QueryContext, TRUNCATION_WARNING, UnionGroups};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePath {
    /// No join column: `from` rows were appended to `to`.
    Append,
    /// Sort-merge join on at least one column, or a cross product.
    Join,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub path: MergePath,
    /// Join key, by variable name.
    pub key: Vec<String>,
    /// Rows in `to` after the merge.
    pub rows: usize,
    /// Whether the soft limit cut the merge short.
    pub truncated: bool,
}

/// A column of `to` and, when `from` knows the same variable, its position there.
#[derive(Debug, Clone, Copy)]
struct ColumnPair {
    from: Option<usize>,
    to: usize,
}

/// Merges `from` into `to` for block `block`.
///
/// Variables of `from` unknown to `to` are declared in `to` first, which is
/// the only way this can fail (the variable limit of `to`). Names listed in
/// `project` are marked projected in `to` afterwards.
pub fn merge(
    ctx: &mut QueryContext,
    block: BlockId,
    from: &mut Bindings,
    to: &mut Bindings,
    project: &[&str],
    flags: MergeFlags,
) -> Result<MergeSummary> {
    for i in 0..from.width() {
        let column = from.column_at(i);
        if to.position(column.name()).is_none() {
            let (appears, depends) = (column.appears(), column.depends());
            let t = to.declare(column.name(), column.projected())?;
            let target = to.column_at_mut(t);
            target.set_appears(appears);
            target.set_depends(depends);
        }
    }
    from.clear_sort();
    to.clear_sort();
    let pairs: Vec<ColumnPair> = (0..to.width())
        .map(|t| ColumnPair {
            from: from.position(to.column_at(t).name()),
            to: t,
        })
        .collect();

    let mut key = Vec::new();
    let mut used = 0;
    let mut used_first_in_union = 0;
    for pair in &pairs {
        let Some(f) = pair.from else { continue };
        let (fc, tc) = (from.column_at(f), to.column_at(pair.to));
        if !fc.bound() || !tc.bound() {
            continue;
        }
        // first bound in this union arm: joining on it would filter other arms
        let first_in_union = flags.union && fc.bound_in_block(block) == 1;
        if fc.used() {
            used += 1;
            if first_in_union {
                used_first_in_union += 1;
            }
        }
        if !first_in_union {
            debug!(block, variable = tc.name(), "join on");
            key.push(KeyColumn { left: f, right: pair.to });
        }
    }
    for k in &key {
        from.column_at_mut(k.left).set_sort(true);
        to.column_at_mut(k.right).set_sort(true);
    }
    let key_names = key
        .iter()
        .map(|k| to.column_at(k.right).name().to_string())
        .collect();

    let summary = if key.is_empty()
        && (from.is_empty() || (used == used_first_in_union && used > 0))
    {
        append_all(block, from, to, &pairs);
        debug!(block, rows = to.len(), "append all");
        MergeSummary {
            path: MergePath::Append,
            key: key_names,
            rows: to.len(),
            truncated: false,
        }
    } else {
        let truncated = join(ctx, block, from, to, &pairs, &key, flags);
        debug!(block, rows = to.len(), truncated, "merged");
        MergeSummary {
            path: MergePath::Join,
            key: key_names,
            rows: to.len(),
            truncated,
        }
    };
    for name in project {
        if let Some(column) = to.column_mut(name) {
            column.mark_projected(true);
        }
    }
    Ok(summary)
}

/// Union of two tables with nothing to join on: each column bound on one side
/// only is materialized as nulls on the other, then `from` rows go after `to` rows.
fn append_all(block: BlockId, from: &mut Bindings, to: &mut Bindings, pairs: &[ColumnPair]) {
    from.pad();
    to.pad();
    let (len_f, len_t) = (from.len(), to.len());
    for pair in pairs {
        let source = pair.from.map(|f| from.column_at(f)).filter(|c| c.bound());
        let target = to.column_at_mut(pair.to);
        if source.is_none() && !target.bound() {
            continue;
        }
        if !target.bound() {
            target.fill_null(len_t);
        }
        match source {
            Some(column) => {
                for row in 0..len_f {
                    target.push(column.value(row), column.tag(row));
                }
                target.add_bound_in_block(block, column.bound_in_block(block));
            }
            None => target.push_n(RID_NULL, 0, len_f),
        }
        target.set_bound(true);
    }
}

/// The sort-merge path. Returns whether the soft limit stopped the scan.
fn join(
    ctx: &mut QueryContext,
    block: BlockId,
    from: &mut Bindings,
    to: &mut Bindings,
    pairs: &[ColumnPair],
    key: &[KeyColumn],
    flags: MergeFlags,
) -> bool {
    from.pad();
    to.pad();
    let len_t = to.len();
    for pair in pairs {
        let target = to.column_at(pair.to);
        let in_key = key.iter().any(|k| k.right == pair.to);
        if in_key || target.used() || target.bound() {
            continue;
        }
        if pair.from.is_some_and(|f| from.column_at(f).bound()) {
            debug!(variable = target.name(), "replace");
            to.column_at_mut(pair.to).fill_null(len_t);
        }
    }

    if !key.is_empty() {
        let from_cols: Vec<usize> = key.iter().map(|k| k.left).collect();
        let to_cols: Vec<usize> = key.iter().map(|k| k.right).collect();
        from.sort_by_columns(&from_cols);
        to.sort_by_columns(&to_cols);
    }

    let limit = ctx.soft_limit();
    let (full_f, full_t) = (from.len(), to.len());
    if let Some(limit) = limit {
        from.truncate(limit);
        to.truncate(limit);
    }
    let (len_f, len_t) = (from.len(), to.len());
    // rows cut here never reach the scan
    let dropped = len_f < full_f || len_t < full_t;
    if dropped {
        debug!(block, from = full_f, to = full_t, ?limit, "pre-truncated to soft limit");
    }

    let mut scan = Scan {
        groups: ctx.union_groups(),
        block,
        flags,
        pairs,
        cmp: Comparator::new(key, len_f, len_t).joining(ctx.union_groups(), flags),
        len_f,
        len_t,
        matched: RoaringTreemap::new(),
        appended: 0,
        limit,
    };
    let truncated = scan.run(from, to) || dropped;
    let matched = scan.matched;

    if !flags.retains_unmatched() {
        to.retain_rows(|row| row >= len_t || matched.contains(row as u64));
    }
    if truncated {
        warn!(block, soft_limit = ?limit, "soft limit reached, truncating results");
        ctx.warn(TRUNCATION_WARNING);
    }
    truncated
}

struct Scan<'a> {
    groups: &'a UnionGroups,
    block: BlockId,
    flags: MergeFlags,
    pairs: &'a [ColumnPair],
    cmp: Comparator<'a>,
    len_f: usize,
    len_t: usize,
    matched: RoaringTreemap,
    appended: usize,
    limit: Option<usize>,
}

impl Scan<'_> {
    /// Rows the merge has produced so far, as they will appear in `to`.
    fn produced(&self) -> usize {
        let kept = if self.flags.retains_unmatched() {
            self.len_t
        } else {
            self.matched.len() as usize
        };
        kept + self.appended
    }

    fn at_limit(&self) -> bool {
        self.limit.is_some_and(|limit| self.produced() >= limit)
    }

    /// Walks both tables. Returns true when the soft limit stopped it before
    /// a row could be produced.
    fn run(&mut self, from: &Bindings, to: &mut Bindings) -> bool {
        let (mut fpos, mut tpos) = (0, 0);
        while fpos < self.len_f || tpos < self.len_t {
            match self.cmp.compare(from, fpos, to, tpos) {
                RowOrder::Equal => match self.equal_run(from, to, fpos, tpos) {
                    Some((fp, tp)) => {
                        fpos = fp;
                        tpos = tp;
                    }
                    None => return true,
                },
                RowOrder::Less => {
                    // no partner for the from row: kept only as an optional row
                    if self.flags.optional {
                        if self.at_limit() {
                            return true;
                        }
                        self.append_from_row(from, to, fpos);
                    }
                    fpos += 1;
                }
                RowOrder::Greater => {
                    // no partner for the to row: it stays in place when
                    // unmatched rows are retained and is dropped afterwards otherwise
                    tpos += 1;
                }
                RowOrder::UnionConflict => {
                    if self.at_limit() {
                        return true;
                    }
                    self.append_from_row(from, to, fpos);
                    self.matched.insert(tpos as u64);
                    fpos += 1;
                    tpos += 1;
                }
            }
        }
        false
    }

    /// Cross product of the run of mutually equal rows starting at
    /// (`fpos`, `tpos`). Returns where the scan resumes, or `None` when the
    /// soft limit was hit inside the run.
    fn equal_run(
        &mut self,
        from: &Bindings,
        to: &mut Bindings,
        fpos: usize,
        tpos: usize,
    ) -> Option<(usize, usize)> {
        let mut fp = fpos;
        let mut tp = tpos;
        while self.cmp.compare(from, fp, to, tpos) == RowOrder::Equal {
            tp = tpos;
            while self.cmp.compare(from, fp, to, tp) == RowOrder::Equal {
                if fp == fpos {
                    if !self.flags.retains_unmatched() && self.at_limit() {
                        return None;
                    }
                    self.overwrite(from, to, fp, tp);
                    self.matched.insert(tp as u64);
                } else {
                    if self.at_limit() {
                        return None;
                    }
                    self.append_combined(from, to, fp, tp);
                }
                tp += 1;
            }
            fp += 1;
        }
        Some((fp, tp))
    }

    fn source<'b>(&self, from: &'b Bindings, pair: &ColumnPair) -> Option<&'b Column> {
        pair.from.map(|f| from.column_at(f)).filter(|c| c.bound())
    }

    /// Writes the bound, non-null values of from row `fp` into to row `tp`.
    fn overwrite(&self, from: &Bindings, to: &mut Bindings, fp: usize, tp: usize) {
        for pair in self.pairs {
            let Some(column) = self.source(from, pair) else { continue };
            let val = column.value(fp);
            if val == RID_NULL {
                continue;
            }
            to.column_at_mut(pair.to).set(tp, val, column.tag(fp));
        }
    }

    /// Appends from row `fp`, null where `from` has nothing.
    fn append_from_row(&mut self, from: &Bindings, to: &mut Bindings, fp: usize) {
        for pair in self.pairs {
            let source = self.source(from, pair);
            let target = to.column_at_mut(pair.to);
            if source.is_none() && !target.bound() {
                continue;
            }
            match source {
                Some(column) if fp < column.len() => target.push(column.value(fp), column.tag(fp)),
                _ => target.push(RID_NULL, 0),
            }
        }
        self.appended += 1;
    }

    /// Appends the combination of from row `fp` with to row `tp`.
    fn append_combined(&mut self, from: &Bindings, to: &mut Bindings, fp: usize, tp: usize) {
        for pair in self.pairs {
            let source = self.source(from, pair);
            let target = to.column_at_mut(pair.to);
            if source.is_none() && !target.bound() {
                continue;
            }
            let from_val = source
                .map(|c| (c.value(fp), c.tag(fp)))
                .filter(|(val, _)| *val != RID_NULL);
            match from_val {
                Some((val, tag)) => target.push(val, tag),
                None => {
                    let appears = source.map_or(target.appears(), Column::appears);
                    let tag = if self.groups.same_union(self.block, appears) {
                        self.block
                    } else {
                        0
                    };
                    let val = target.value(tp);
                    target.push(val, tag);
                }
            }
        }
        self.appended += 1;
    }
}
