//! Combining per-term results into a single keep/drop decision.

use std::fmt;

use serde::Serialize;

use crate::index::IdSet;

/// What one resolved term adds to the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contribution {
    /// Narrow the result to these ids (intersected with other inclusions).
    Include(IdSet),
    /// Remove these ids (unioned with other exclusions).
    Exclude(IdSet),
    /// A prefix term that matched no index keys. Omitted from both lists.
    Nothing,
}

impl Contribution {
    /// Size of the contributed set, or `None` for [`Contribution::Nothing`].
    pub fn size(&self) -> Option<usize> {
        match self {
            Contribution::Include(ids) | Contribution::Exclude(ids) => Some(ids.len()),
            Contribution::Nothing => None,
        }
    }

    /// The contributed set, or `None` for [`Contribution::Nothing`].
    pub fn ids(&self) -> Option<&IdSet> {
        match self {
            Contribution::Include(ids) | Contribution::Exclude(ids) => Some(ids),
            Contribution::Nothing => None,
        }
    }
}

/// How a decision's id set restricts records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Keep exactly the records in the set.
    KeepOnly,
    /// Keep every record except those in the set.
    DropOnly,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::KeepOnly => write!(f, "keep"),
            Mode::DropOnly => write!(f, "drop"),
        }
    }
}

/// Final outcome of evaluating a term expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub mode: Mode,
    pub ids: IdSet,
}

impl Decision {
    pub fn keep_only(ids: IdSet) -> Self {
        Self {
            mode: Mode::KeepOnly,
            ids,
        }
    }

    pub fn drop_only(ids: IdSet) -> Self {
        Self {
            mode: Mode::DropOnly,
            ids,
        }
    }

    /// Apply this decision to a record query.
    pub fn apply<R: Restrict>(&self, records: R) -> R {
        match self.mode {
            Mode::KeepOnly => records.keep_ids(&self.ids),
            Mode::DropOnly => records.drop_ids(&self.ids),
        }
    }
}

/// Combine term contributions.
///
/// With any inclusion, the result keeps the intersection of all inclusions
/// minus the union of all exclusions. Without inclusions it drops the union
/// of the exclusions, which may be empty.
pub fn combine<I>(contributions: I) -> Decision
where
    I: IntoIterator<Item = Contribution>,
{
    let mut include: Option<IdSet> = None;
    let mut exclude = IdSet::new();

    for contribution in contributions {
        match contribution {
            Contribution::Include(ids) => {
                include = Some(match include {
                    None => ids,
                    Some(acc) => acc.intersection(&ids).copied().collect(),
                });
            }
            Contribution::Exclude(ids) => exclude.extend(ids),
            Contribution::Nothing => {}
        }
    }

    match include {
        Some(mut good) => {
            good.retain(|id| !exclude.contains(id));
            Decision::keep_only(good)
        }
        None => Decision::drop_only(exclude),
    }
}

/// A record query that can be narrowed by identifier membership.
///
/// Both methods compose with whatever filters the query already carries.
pub trait Restrict: Sized {
    /// Keep only records whose id is in `ids`.
    fn keep_ids(self, ids: &IdSet) -> Self;

    /// Keep only records whose id is not in `ids`.
    fn drop_ids(self, ids: &IdSet) -> Self;
}

/// Apply an optional decision; `None` (no terms) passes records through.
pub fn apply<R: Restrict>(decision: Option<&Decision>, records: R) -> R {
    match decision {
        Some(decision) => decision.apply(records),
        None => records,
    }
}
