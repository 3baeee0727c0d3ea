// the name index of a binding table hashes variable names with seahash
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;

// ------------- Rid -------------
/// An opaque resource identifier, as handed out by the storage backend.
pub type Rid = u64;

/// Marks "this row has no value for this column".
pub const RID_NULL: Rid = 0x8000_0000_0000_0000;

/// Graph-pattern block number, also used as the union-block tag of a value.
pub type BlockId = usize;

/// Upper bound on distinct variables in one binding table.
pub const MAX_VARS: usize = 256;
/// Upper bound on blocks in one query.
pub const MAX_BLOCKS: usize = 256;

pub type NameHasher = BuildHasherDefault<SeaHasher>;

// ------------- Column -------------
/// One variable's bindings: the values and, in parallel, the union block
/// each value was bound under (0 when not bound inside a union branch).
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    vals: Vec<Rid>,
    ubs: Vec<BlockId>,
    bound: bool,
    proj: bool,
    used: bool,
    need_val: bool,
    sort: bool,
    appears: Option<BlockId>,
    depends: Option<BlockId>,
    bound_in_block: Vec<u32>,
    expression: Option<String>,
}

impl Column {
    pub fn new(name: &str, projected: bool) -> Self {
        Self {
            name: name.to_owned(),
            vals: Vec::new(),
            ubs: Vec::new(),
            bound: false,
            proj: projected,
            used: false,
            need_val: projected,
            sort: false,
            appears: None,
            depends: None,
            bound_in_block: Vec::new(),
            expression: None,
        }
    }
    // The name is only exposed through a getter so that it stays
    // immutable once the column exists.
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn vals(&self) -> &[Rid] {
        &self.vals
    }
    pub fn ubs(&self) -> &[BlockId] {
        &self.ubs
    }
    pub fn len(&self) -> usize {
        self.vals.len()
    }
    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }
    pub fn bound(&self) -> bool {
        self.bound
    }
    pub fn projected(&self) -> bool {
        self.proj
    }
    pub fn used(&self) -> bool {
        self.used
    }
    pub fn need_val(&self) -> bool {
        self.need_val
    }
    pub fn sort(&self) -> bool {
        self.sort
    }
    pub fn appears(&self) -> Option<BlockId> {
        self.appears
    }
    pub fn depends(&self) -> Option<BlockId> {
        self.depends
    }
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }
    /// Value at `row`, or [`RID_NULL`] past the end of the column.
    pub fn value(&self, row: usize) -> Rid {
        self.vals.get(row).copied().unwrap_or(RID_NULL)
    }
    /// Union tag at `row`, or 0 past the end of the column.
    pub fn tag(&self, row: usize) -> BlockId {
        self.ubs.get(row).copied().unwrap_or(0)
    }
    pub fn bound_in_block(&self, block: BlockId) -> u32 {
        self.bound_in_block.get(block).copied().unwrap_or(0)
    }

    pub fn set_used(&mut self, used: bool) {
        self.used = used;
    }
    pub fn set_sort(&mut self, sort: bool) {
        self.sort = sort;
    }
    pub fn set_appears(&mut self, block: Option<BlockId>) {
        self.appears = block;
    }
    pub fn set_depends(&mut self, block: Option<BlockId>) {
        self.depends = block;
    }
    pub fn set_expression(&mut self, expression: Option<String>) {
        self.expression = expression;
    }
    pub fn mark_projected(&mut self, projected: bool) {
        self.proj |= projected;
        self.need_val |= projected;
    }
    pub fn add_bound_in_block(&mut self, block: BlockId, count: u32) {
        if self.bound_in_block.len() <= block {
            self.bound_in_block.resize(block + 1, 0);
        }
        self.bound_in_block[block] += count;
    }

    pub(crate) fn set_bound(&mut self, bound: bool) {
        self.bound = bound;
    }
    pub(crate) fn push(&mut self, val: Rid, tag: BlockId) {
        self.vals.push(val);
        self.ubs.push(tag);
    }
    pub(crate) fn push_n(&mut self, val: Rid, tag: BlockId, count: usize) {
        self.vals.resize(self.vals.len() + count, val);
        self.ubs.resize(self.ubs.len() + count, tag);
    }
    /// Writes a value and its tag at `row`, padding with nulls as needed.
    pub(crate) fn set(&mut self, row: usize, val: Rid, tag: BlockId) {
        if row >= self.vals.len() {
            self.pad_to(row + 1);
        }
        self.vals[row] = val;
        self.ubs[row] = tag;
    }
    pub(crate) fn pad_to(&mut self, length: usize) {
        if self.vals.len() < length {
            self.vals.resize(length, RID_NULL);
        }
        // tags follow the values, whatever the caller did before
        self.ubs.resize(self.vals.len(), 0);
    }
    pub(crate) fn truncate(&mut self, length: usize) {
        self.vals.truncate(length);
        self.ubs.truncate(length);
    }
    pub(crate) fn swap_rows(&mut self, x: usize, y: usize) {
        let length = x.max(y) + 1;
        if self.vals.len() < length {
            self.pad_to(length);
        }
        self.vals.swap(x, y);
        self.ubs.swap(x, y);
    }
    /// Replaces the contents with `length` unbound (null) rows and marks the column bound.
    pub(crate) fn fill_null(&mut self, length: usize) {
        self.vals.clear();
        self.ubs.clear();
        self.push_n(RID_NULL, 0, length);
        self.bound = true;
    }
    pub(crate) fn clear_values(&mut self) {
        self.vals.clear();
        self.ubs.clear();
    }
    /// Keeps only the rows for which `keep` answers true, in their current order.
    pub(crate) fn retain_rows(&mut self, keep: impl Fn(usize) -> bool) {
        let mut out = 0;
        for row in 0..self.vals.len() {
            if keep(row) {
                self.vals[out] = self.vals[row];
                self.ubs[out] = self.ubs[row];
                out += 1;
            }
        }
        self.truncate(out);
    }
    /// Copy of the structure and flags with no values and `bound` cleared.
    pub(crate) fn structure(&self) -> Self {
        Self {
            name: self.name.clone(),
            vals: Vec::with_capacity(self.vals.capacity()),
            ubs: Vec::with_capacity(self.ubs.capacity()),
            bound: false,
            proj: self.proj,
            used: self.used,
            need_val: self.need_val,
            sort: self.sort,
            appears: self.appears,
            depends: self.depends,
            bound_in_block: self.bound_in_block.clone(),
            expression: self.expression.clone(),
        }
    }
}
