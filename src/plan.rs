//! A JSON description of the bindings each block produced, and the driver
//! that folds them together the way the pattern evaluator does: block 0
//! seeds the accumulated table, every later block is filled into an empty
//! copy of its structure and then merged.
//!
//! ```json
//! {
//!   "union_groups": [0, 1, 1],
//!   "blocks": [
//!     { "columns": [{ "name": "x", "values": [1, 2], "projected": true }] },
//!     { "union": true, "columns": [{ "name": "y", "values": [10], "tags": [1] }] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::binding::Bindings;
use crate::column::{BlockId, MAX_BLOCKS, RID_NULL, Rid};
use crate::context::{MergeFlags, QueryContext};
use crate::error::{BindingError, Result};
use crate::merge::{MergeSummary, merge};
use crate::settings::Settings;

#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub union_groups: Vec<u32>,
    pub blocks: Vec<BlockPlan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockPlan {
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub union: bool,
    /// Extra variables to project once this block is merged.
    #[serde(default)]
    pub project: Vec<String>,
    pub columns: Vec<ColumnPlan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnPlan {
    pub name: String,
    /// `null` stands for an unbound cell.
    pub values: Vec<Option<Rid>>,
    #[serde(default)]
    pub tags: Vec<BlockId>,
    #[serde(default)]
    pub projected: bool,
    #[serde(default)]
    pub used: bool,
}

/// Outcome of running a plan.
#[derive(Debug)]
pub struct Evaluation {
    pub bindings: Bindings,
    pub merges: Vec<MergeSummary>,
    pub warnings: Vec<String>,
}

/// The projected variables of an evaluation, row by row. Unbound cells are `null`.
#[derive(Debug, Serialize)]
pub struct ProjectionResponse {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub limited: bool,
    pub rows: Vec<Vec<Option<Rid>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Evaluation {
    pub fn response(&self) -> ProjectionResponse {
        let projected = self.bindings.projection();
        let row_count = self.bindings.len();
        let rows = (0..row_count)
            .map(|row| {
                projected
                    .iter()
                    .map(|(_, bound, vals)| {
                        vals.get(row)
                            .copied()
                            .filter(|val| *bound && *val != RID_NULL)
                    })
                    .collect()
            })
            .collect();
        ProjectionResponse {
            columns: projected.iter().map(|(name, _, _)| name.to_string()).collect(),
            row_count,
            limited: self.merges.iter().any(|m| m.truncated),
            rows,
            warnings: self.warnings.clone(),
        }
    }
}

impl BlockPlan {
    pub fn flags(&self) -> MergeFlags {
        MergeFlags {
            optional: self.optional,
            union: self.union,
        }
    }

    fn fill(&self, b: &mut Bindings, block: BlockId) -> Result<()> {
        for column in &self.columns {
            if !column.tags.is_empty() && column.tags.len() != column.values.len() {
                return Err(BindingError::Input(format!(
                    "variable '{}' has {} values but {} tags",
                    column.name,
                    column.values.len(),
                    column.tags.len()
                )));
            }
            b.declare(&column.name, column.projected)?;
            if column.values.is_empty() {
                // bound to the empty list
                b.add_vector(&column.name, &[])?;
            }
            for (row, val) in column.values.iter().copied().enumerate() {
                let tag = column.tags.get(row).copied().unwrap_or(0);
                b.add_tagged(&column.name, val.unwrap_or(RID_NULL), tag, column.projected)?;
            }
            if let Some(target) = b.column_mut(&column.name) {
                if column.used {
                    target.set_used(true);
                }
                target.add_bound_in_block(block, 1);
                if target.appears().is_none() {
                    target.set_appears(Some(block));
                }
            }
        }
        Ok(())
    }
}

impl Plan {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn run(&self, settings: &Settings) -> Result<Evaluation> {
        if self.blocks.len() > MAX_BLOCKS {
            return Err(BindingError::BlockLimit {
                block: self.blocks.len() - 1,
                limit: MAX_BLOCKS,
            });
        }
        let mut ctx = QueryContext::from_settings(settings);
        for (block, group) in self.union_groups.iter().enumerate() {
            ctx.set_union_group(block, *group)?;
        }
        let mut to = Bindings::with_capacity(settings.max_vars);
        let mut merges = Vec::new();
        for (block, plan) in self.blocks.iter().enumerate() {
            let mut from = to.copy_and_clear();
            plan.fill(&mut from, block)?;
            if block == 0 {
                to = from;
                continue;
            }
            let project: Vec<&str> = plan.project.iter().map(String::as_str).collect();
            let summary = merge(&mut ctx, block, &mut from, &mut to, &project, plan.flags())?;
            info!(block, rows = summary.rows, path = ?summary.path, truncated = summary.truncated, "block merged");
            merges.push(summary);
        }
        Ok(Evaluation {
            bindings: to,
            merges,
            warnings: ctx.into_warnings(),
        })
    }
}
