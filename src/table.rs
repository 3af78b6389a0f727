//! # Preference tables
//!
//! The [`PreferenceTable`] is the single shared mutable structure both
//! phases of the solver operate on. Per member it holds the ordered list of
//! remaining candidates, most preferred first, together with a static rank
//! matrix for O(1) preference comparisons and a [`BitVec`] filter recording
//! which pairs are still mutually listed.
//!
//! Lists only ever shrink, and they shrink in lockstep: whenever `b` leaves
//! `a`'s list, `a` leaves `b`'s list in the same [`remove_pair`] call. The
//! filter is what lets the table notice when that invariant has been broken
//! by a defective caller, instead of silently producing a lopsided table.
//!
//! [`remove_pair`]: PreferenceTable::remove_pair

use std::fmt;

use bitvec::vec::BitVec;
use thiserror::Error;

use crate::roster::Member;

/// A violation of the table's internal symmetry. Signals a defect in the
/// solver, never a property of the input preferences.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("removal of {a} <-> {b} is asymmetric: the reverse reference is already gone")]
    AsymmetricPair { a: Member, b: Member },
    #[error("{a} <-> {b} has already been removed from both lists")]
    AbsentPair { a: Member, b: Member },
    #[error("the preference list of {0} lost the shape phase 2 relies on")]
    BrokenList(Member),
    #[error("collapsed table is not symmetric: {a} pairs with {b}, but {b} does not pair back")]
    LopsidedCollapse { a: Member, b: Member },
}

#[derive(Debug, Clone)]
pub struct PreferenceTable {
    /// Remaining candidates per member, most preferred first.
    lists: Vec<Vec<Member>>,
    /// `ranks[a][b]` is `b`'s position in `a`'s *original* ranking. Removals
    /// never reorder, so relative comparisons stay valid for the whole run.
    ranks: Vec<Vec<usize>>,
    /// Row-major `n x n` filter: bit `a * n + b` is set while `b` is still
    /// on `a`'s list.
    mutual: BitVec,
}

impl PreferenceTable {
    /// Builds a table from already-validated, already-interned lists.
    ///
    /// The lists are trusted to be symmetric and duplicate-free; feeding
    /// anything else in produces a table whose operations will surface
    /// [`IntegrityError`]s. Validated construction goes through
    /// [`Roster::intern`](crate::roster::Roster::intern).
    pub fn from_ranked_lists(lists: Vec<Vec<Member>>) -> Self {
        let n = lists.len();
        let mut ranks = vec![vec![usize::MAX; n]; n];
        let mut mutual = BitVec::repeat(false, n * n);
        for (owner, list) in lists.iter().enumerate() {
            for (position, candidate) in list.iter().enumerate() {
                ranks[owner][candidate.0] = position;
                mutual.set(owner * n + candidate.0, true);
            }
        }
        PreferenceTable {
            lists,
            ranks,
            mutual,
        }
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn members(&self) -> impl Iterator<Item = Member> {
        (0..self.lists.len()).map(Member)
    }

    /// The remaining candidates of `member`, most preferred first.
    pub fn list(&self, member: Member) -> &[Member] {
        &self.lists[member.0]
    }

    pub fn len_of(&self, member: Member) -> usize {
        self.lists[member.0].len()
    }

    /// True when `member`'s list has exactly one remaining entry.
    pub fn is_singleton(&self, member: Member) -> bool {
        self.lists[member.0].len() == 1
    }

    /// True when `member`'s list has no remaining entry. Terminal
    /// instability signal.
    pub fn is_empty(&self, member: Member) -> bool {
        self.lists[member.0].is_empty()
    }

    pub fn first(&self, member: Member) -> Option<Member> {
        self.lists[member.0].first().copied()
    }

    pub fn second(&self, member: Member) -> Option<Member> {
        self.lists[member.0].get(1).copied()
    }

    pub fn last(&self, member: Member) -> Option<Member> {
        self.lists[member.0].last().copied()
    }

    /// Whether `a` and `b` still list each other.
    pub fn contains_pair(&self, a: Member, b: Member) -> bool {
        self.mutual[self.slot(a, b)] && self.mutual[self.slot(b, a)]
    }

    /// Whether `owner` ranks `a` strictly above `b`.
    pub fn prefers(&self, owner: Member, a: Member, b: Member) -> bool {
        self.ranks[owner.0][a.0] < self.ranks[owner.0][b.0]
    }

    /// The remaining entries of `owner`'s list that `owner` ranks strictly
    /// below `pivot`.
    pub fn ranked_below(&self, owner: Member, pivot: Member) -> Vec<Member> {
        let ranks = &self.ranks[owner.0];
        self.lists[owner.0]
            .iter()
            .copied()
            .filter(|candidate| ranks[candidate.0] > ranks[pivot.0])
            .collect()
    }

    /// Removes `b` from `a`'s list and `a` from `b`'s list atomically.
    ///
    /// Fails if the pair is only half-present (the reverse reference is
    /// already gone) or fully absent; both indicate a solver defect rather
    /// than anything about the input.
    pub fn remove_pair(&mut self, a: Member, b: Member) -> Result<(), IntegrityError> {
        let ab = self.slot(a, b);
        let ba = self.slot(b, a);
        match (self.mutual[ab], self.mutual[ba]) {
            (true, true) => {
                self.mutual.set(ab, false);
                self.mutual.set(ba, false);
                self.lists[a.0].retain(|&m| m != b);
                self.lists[b.0].retain(|&m| m != a);
                Ok(())
            }
            (false, false) => Err(IntegrityError::AbsentPair { a, b }),
            _ => Err(IntegrityError::AsymmetricPair { a, b }),
        }
    }

    fn slot(&self, a: Member, b: Member) -> usize {
        a.0 * self.lists.len() + b.0
    }
}

impl fmt::Display for PreferenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for member in self.members() {
            write!(f, "{member}:")?;
            for candidate in self.list(member) {
                write!(f, " {candidate}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
