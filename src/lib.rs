//! Bindmerge – the binding tables and join engine at the core of a SPARQL
//! query evaluator.
//!
//! A query is evaluated block by block. Each block produces a *binding
//! table*: one column per variable, one row per solution, every cell a
//! 64-bit resource id ([`Rid`]) or [`RID_NULL`] for "unbound". The tables of
//! consecutive blocks are folded together by [`merge`], which is either a
//! plain append (nothing in common) or a sort-merge join on the shared
//! bound variables, honoring:
//! * `OPTIONAL` – rows without a partner survive, padded with nulls.
//! * `UNION` – values carry the block they were bound in, and equal values
//!   from different arms of the same union are kept apart.
//! * Restricted mode – a soft row limit that truncates a merge and leaves a
//!   warning in the [`QueryContext`].
//!
//! ## Modules
//! * [`column`] – A single variable: values, union tags and flags.
//! * [`binding`] – The [`Bindings`] table and its accessors.
//! * [`compare`] – Row comparison with wildcard nulls and union conflicts.
//! * [`sort`] – In-place quicksort and deduplication on the sort columns.
//! * [`merge`] – The merge engine.
//! * [`context`] – Per-query state: union groups, soft limit, warnings.
//! * [`dump`] – The fixed-width debug rendering of a table.
//! * [`plan`] – A JSON block plan and the driver that folds it.
//! * [`settings`] – Layered configuration.
//!
//! ## Quick Start
//! ```
//! use bindmerge::{Bindings, MergeFlags, QueryContext, merge};
//! let mut ctx = QueryContext::new();
//! let mut to = Bindings::new();
//! to.add_vector("x", &[1, 2]).unwrap();
//! to.add_vector("y", &[10, 20]).unwrap();
//! let mut from = to.copy_and_clear();
//! from.add_vector("x", &[1]).unwrap();
//! from.add_vector("z", &[100]).unwrap();
//! merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).unwrap();
//! assert_eq!(to.len(), 1);
//! assert_eq!(to.value("z", 0), (100, true));
//! ```

pub mod binding;
pub mod column;
pub mod compare;
pub mod context;
pub mod dump;
pub mod error;
pub mod merge;
pub mod plan;
pub mod settings;
pub mod sort;

pub use binding::Bindings;
pub use column::{BlockId, Column, MAX_BLOCKS, MAX_VARS, RID_NULL, Rid};
pub use compare::RowOrder;
pub use context::{MergeFlags, QueryContext, TRUNCATION_WARNING};
pub use error::{BindingError, Result};
pub use merge::{MergePath, MergeSummary, merge};
pub use plan::{Evaluation, Plan};
pub use settings::Settings;
