//! The binding table: an ordered, capacity-bounded set of [`Column`]s where
//! row `r` is the tuple of every bound column's value at `r`.
//!
//! Columns keep the order in which their variables first appeared; only rows
//! are ever reordered (see the `sort` module). Lookup by name goes through a
//! name index so repeated access stays cheap, but names are unique and the
//! first column with a name is the only one.

use std::collections::HashMap;

use tracing::{error, warn};

use crate::column::{BlockId, Column, MAX_VARS, NameHasher, RID_NULL, Rid};
use crate::context::QueryContext;
use crate::error::{BindingError, Result};

#[derive(Debug, Clone)]
pub struct Bindings {
    columns: Vec<Column>,
    index: HashMap<String, usize, NameHasher>,
    capacity: usize,
}

impl Default for Bindings {
    fn default() -> Self {
        Self::new()
    }
}

impl Bindings {
    pub fn new() -> Self {
        Self::with_capacity(MAX_VARS)
    }
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::new(),
            index: HashMap::default(),
            capacity,
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    /// Number of declared columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }
    /// Longest value sequence across the bound columns.
    pub fn len(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| c.bound())
            .map(Column::len)
            .max()
            .unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.position(name).map(|i| &mut self.columns[i])
    }
    pub fn column_at(&self, i: usize) -> &Column {
        &self.columns[i]
    }
    pub(crate) fn column_at_mut(&mut self, i: usize) -> &mut Column {
        &mut self.columns[i]
    }

    /// Returns the position of `name`, declaring an unbound column for it if needed.
    pub fn declare(&mut self, name: &str, projected: bool) -> Result<usize> {
        if let Some(i) = self.position(name) {
            return Ok(i);
        }
        if self.columns.len() >= self.capacity {
            error!(limit = self.capacity, variable = name, "variable limit exceeded");
            return Err(BindingError::VariableLimit {
                name: name.to_string(),
                limit: self.capacity,
            });
        }
        self.columns.push(Column::new(name, projected));
        self.index.insert(name.to_string(), self.columns.len() - 1);
        Ok(self.columns.len() - 1)
    }

    /// Adds a single value for `name`, creating the column on first sight.
    ///
    /// A new column that is given [`RID_NULL`] is only declared, not bound.
    /// An existing column always gets the value appended and becomes bound.
    pub fn add(&mut self, name: &str, val: Rid, projected: bool) -> Result<&mut Column> {
        self.add_tagged(name, val, 0, projected)
    }

    /// Like [`Bindings::add`], recording the union block the value was bound under.
    pub fn add_tagged(
        &mut self,
        name: &str,
        val: Rid,
        tag: BlockId,
        projected: bool,
    ) -> Result<&mut Column> {
        let existed = self.position(name).is_some();
        let i = self.declare(name, projected)?;
        let column = &mut self.columns[i];
        if existed || val != RID_NULL {
            column.push(val, tag);
            column.set_bound(true);
        }
        column.mark_projected(projected);
        Ok(column)
    }

    /// Appends a whole vector of values for `name` and marks it bound.
    /// Tags are appended as 0; callers that bind inside a union re-tag.
    pub fn add_vector(&mut self, name: &str, vals: &[Rid]) -> Result<()> {
        let i = self.declare(name, false)?;
        let column = &mut self.columns[i];
        for val in vals {
            column.push(*val, 0);
        }
        column.set_bound(true);
        Ok(())
    }

    /// Value of `name` at `row` and whether the column is bound.
    ///
    /// Unknown or unbound columns give [`RID_NULL`]; a row past the end is
    /// logged and also gives [`RID_NULL`].
    pub fn value(&self, name: &str, row: usize) -> (Rid, bool) {
        match self.try_value(name, row) {
            Ok(found) => found,
            Err(e) => {
                error!(%e, "binding lookup failed");
                (RID_NULL, true)
            }
        }
    }

    pub fn try_value(&self, name: &str, row: usize) -> Result<(Rid, bool)> {
        let Some(column) = self.column(name) else {
            return Ok((RID_NULL, false));
        };
        if !column.bound() {
            return Ok((RID_NULL, false));
        }
        match column.vals().get(row) {
            Some(val) => Ok((*val, true)),
            None => Err(BindingError::OutOfRange {
                name: name.to_string(),
                row,
                length: column.len(),
            }),
        }
    }

    /// All values of `name` together with its bound flag.
    pub fn values(&self, name: &str) -> Option<(bool, &[Rid])> {
        self.column(name).map(|c| (c.bound(), c.vals()))
    }

    pub fn set_used(&mut self, name: &str) -> bool {
        match self.column_mut(name) {
            Some(column) => {
                column.set_used(true);
                true
            }
            None => false,
        }
    }
    pub fn clear_used_all(&mut self) {
        for column in &mut self.columns {
            column.set_used(false);
        }
    }
    pub fn is_projected(&self, name: &str) -> bool {
        self.column(name).is_some_and(Column::projected)
    }
    /// Attaches an opaque filter expression to `name`; false if `name` is unknown.
    pub fn set_expression(&mut self, name: &str, expression: &str) -> bool {
        match self.column_mut(name) {
            Some(column) => {
                column.set_expression(Some(expression.to_string()));
                true
            }
            None => false,
        }
    }
    pub fn note_bound_in_block(&mut self, name: &str, block: BlockId, count: u32) -> bool {
        match self.column_mut(name) {
            Some(column) => {
                column.add_bound_in_block(block, count);
                true
            }
            None => false,
        }
    }

    /// Empties the values of one column without removing it.
    pub fn clear_vector(&mut self, name: &str) {
        if let Some(column) = self.column_mut(name) {
            column.clear_values();
        }
    }
    /// Empties every column and clears its bound flag.
    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.clear_values();
            column.set_bound(false);
        }
    }
    /// A table with the same columns and flags but no values and nothing bound,
    /// used to start a sub-evaluation from an identical structure.
    pub fn copy_and_clear(&self) -> Self {
        Self {
            columns: self.columns.iter().map(Column::structure).collect(),
            index: self.index.clone(),
            capacity: self.capacity,
        }
    }
    pub fn truncate(&mut self, length: usize) {
        for column in &mut self.columns {
            column.truncate(length);
        }
    }
    /// Pads every bound column with nulls up to the table length.
    pub fn pad(&mut self) {
        let length = self.len();
        for column in self.columns.iter_mut().filter(|c| c.bound()) {
            column.pad_to(length);
        }
    }

    pub fn any_bound(&self) -> bool {
        self.columns.iter().any(Column::bound)
    }

    /// Whether a pattern whose variable slots are `slots` touches any bound
    /// column. A column first bound inside this block's union that has not
    /// been bound in this block yet does not count.
    pub fn bound_intersects(
        &self,
        ctx: &QueryContext,
        block: BlockId,
        slots: &[Option<&str>],
    ) -> bool {
        self.columns.iter().filter(|c| c.bound()).any(|column| {
            let named = slots.iter().flatten().any(|s| *s == column.name());
            named
                && !(ctx.union_groups().same_union(block, column.appears())
                    && column.bound_in_block(block) == 0)
        })
    }

    /// Appends `count` copies of `row` of every column not yet used as a join
    /// key to the same-named column of `to`.
    pub fn copy_row_unused(&self, row: usize, count: usize, to: &mut Bindings) -> Result<()> {
        for column in self.columns.iter().filter(|c| !c.used()) {
            let val = column.value(row);
            let i = to.declare(column.name(), column.projected())?;
            let target = to.column_at_mut(i);
            target.push_n(val, 0, count);
            if count > 0 {
                target.set_bound(true);
            }
        }
        Ok(())
    }

    /// Bound flag and values of each projected column, in column order.
    pub fn projection(&self) -> Vec<(&str, bool, &[Rid])> {
        self.columns
            .iter()
            .filter(|c| c.projected())
            .map(|c| (c.name(), c.bound(), c.vals()))
            .collect()
    }

    /// Positions of the columns flagged `sort`, in declaration order.
    pub fn sort_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.sort())
            .map(|(i, _)| i)
            .collect()
    }
    /// Flags exactly the named columns as the sort key; unknown names are ignored.
    pub fn set_sort_columns(&mut self, names: &[&str]) {
        for column in &mut self.columns {
            let selected = names.contains(&column.name());
            column.set_sort(selected);
        }
        if names.iter().any(|n| self.position(n).is_none()) {
            warn!(?names, "sort requested on unknown variables");
        }
    }
    pub fn clear_sort(&mut self) {
        for column in &mut self.columns {
            column.set_sort(false);
        }
    }

    pub(crate) fn swap_rows(&mut self, x: usize, y: usize) {
        if x == y {
            return;
        }
        for column in self.columns.iter_mut().filter(|c| c.bound()) {
            column.swap_rows(x, y);
        }
    }
    pub(crate) fn retain_rows(&mut self, keep: impl Fn(usize) -> bool) {
        for column in self.columns.iter_mut().filter(|c| c.bound()) {
            column.retain_rows(&keep);
        }
    }
}
