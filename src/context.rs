//! Query-level state shared by reference across every merge of one query.

use std::ops;

use crate::column::{BlockId, MAX_BLOCKS};
use crate::error::{BindingError, Result};
use crate::settings::Settings;

/// Message recorded when the soft limit cuts a merge short.
pub const TRUNCATION_WARNING: &str =
    "some results have been dropped to prevent overunning time allocation";

/// Block id to union-group id. Group 0 means "not inside a union".
#[derive(Debug, Clone, Default)]
pub struct UnionGroups {
    groups: Vec<u32>,
}

impl UnionGroups {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn group(&self, block: BlockId) -> u32 {
        self.groups.get(block).copied().unwrap_or(0)
    }
    pub fn set(&mut self, block: BlockId, group: u32) -> Result<()> {
        if block >= MAX_BLOCKS {
            return Err(BindingError::BlockLimit { block, limit: MAX_BLOCKS });
        }
        if self.groups.len() <= block {
            self.groups.resize(block + 1, 0);
        }
        self.groups[block] = group;
        Ok(())
    }
    /// True when `block` is inside a union and `appears` belongs to that same union.
    pub fn same_union(&self, block: BlockId, appears: Option<BlockId>) -> bool {
        let group = self.group(block);
        match appears {
            Some(appears) => group > 0 && group == self.group(appears),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    union_groups: UnionGroups,
    restricted: bool,
    soft_limit: usize,
    warnings: Vec<String>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }
    /// Context in restricted mode: merges stop once `soft_limit` rows exist.
    pub fn restricted(soft_limit: usize) -> Self {
        Self {
            restricted: true,
            soft_limit,
            ..Self::default()
        }
    }
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            restricted: settings.restricted,
            soft_limit: settings.soft_limit,
            ..Self::default()
        }
    }
    pub fn union_groups(&self) -> &UnionGroups {
        &self.union_groups
    }
    pub fn union_group(&self, block: BlockId) -> u32 {
        self.union_groups.group(block)
    }
    pub fn set_union_group(&mut self, block: BlockId, group: u32) -> Result<()> {
        self.union_groups.set(block, group)
    }
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }
    /// The row limit merges stop at, only in restricted mode.
    pub fn soft_limit(&self) -> Option<usize> {
        self.restricted.then_some(self.soft_limit)
    }
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

// ------------- Merge flags -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeFlags {
    pub optional: bool,
    pub union: bool,
}

impl MergeFlags {
    pub const NONE: Self = Self { optional: false, union: false };
    pub const OPTIONAL: Self = Self { optional: true, union: false };
    pub const UNION: Self = Self { optional: false, union: true };

    /// Whether unmatched rows of the accumulating table survive the merge.
    pub fn retains_unmatched(&self) -> bool {
        self.optional || self.union
    }
}

impl ops::BitOr for MergeFlags {
    type Output = Self;
    fn bitor(self, other: Self) -> Self {
        Self {
            optional: self.optional || other.optional,
            union: self.union || other.union,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_membership() {
        let mut groups = UnionGroups::new();
        groups.set(2, 1).unwrap();
        groups.set(3, 1).unwrap();
        groups.set(4, 2).unwrap();
        assert!(groups.same_union(3, Some(2)));
        assert!(!groups.same_union(4, Some(2)));
        assert!(!groups.same_union(3, None));
        // group 0 is not a union
        assert!(!groups.same_union(0, Some(1)));
        assert_eq!(groups.group(200), 0);
        assert!(matches!(
            groups.set(MAX_BLOCKS, 1),
            Err(BindingError::BlockLimit { block: MAX_BLOCKS, .. })
        ));
    }

    #[test]
    fn soft_limit_applies_only_when_restricted() {
        let unrestricted = Settings {
            soft_limit: 10,
            ..Settings::default()
        };
        let ctx = QueryContext::from_settings(&unrestricted);
        assert!(!ctx.is_restricted());
        assert_eq!(ctx.soft_limit(), None);
        assert_eq!(QueryContext::restricted(10).soft_limit(), Some(10));
        assert!((MergeFlags::OPTIONAL | MergeFlags::UNION).retains_unmatched());
        assert!(!MergeFlags::NONE.retains_unmatched());
    }
}
