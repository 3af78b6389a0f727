//! # Phase 2: rotation elimination
//!
//! After trimming, any list longer than one entry hides a *rotation*: a
//! cyclic dependency among second-choice and last-choice pointers that can
//! never settle into a unique assignment on its own. This module finds
//! rotations and eliminates them until every list is a singleton (the
//! matching) or a list runs dry (no stable matching exists).
//!
//! A rotation is discovered by growing two parallel sequences,
//!
//! - `p[i + 1]` = the last-ranked entry of `q[i]`'s list,
//! - `q[i]` = the second-ranked entry of `p[i]`'s list,
//!
//! starting from any member whose list is still long, until a `p` value
//! repeats; the stretch between the two occurrences is the rotation. The
//! search is a plain loop over a growable vector rather than recursion:
//! lists only shrink, the member universe is finite, and a `p` value can
//! only repeat once, so the loop is bounded by the cohort size.
//!
//! Eliminating the rotation means every `q[i]` lets go of everything it
//! ranks below `p[i]`. Removals are symmetric as everywhere else, and the
//! same unordered pair can be condemned from both of its ends, so the marks
//! are deduplicated before they are applied.

use ahash::AHashSet;

use crate::matching::{NoStableMatching, PairingError};
use crate::roster::Member;
use crate::table::{IntegrityError, PreferenceTable};

/// A rotation: the cyclic run of `(p, q)` pairs whose second-choice /
/// last-choice pointers feed back into themselves. Exists only within one
/// elimination step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    pairs: Vec<(Member, Member)>,
}

impl Rotation {
    /// Finds the rotation reachable from `start`, whose list must still
    /// hold at least two entries.
    pub fn find(table: &PreferenceTable, start: Member) -> Result<Self, IntegrityError> {
        let mut chain = vec![start];
        let mut seconds = Vec::new();
        loop {
            let current = chain[chain.len() - 1];
            let second = table
                .second(current)
                .ok_or(IntegrityError::BrokenList(current))?;
            let next = table
                .last(second)
                .ok_or(IntegrityError::BrokenList(second))?;
            seconds.push(second);
            if let Some(first_seen) = chain.iter().position(|&m| m == next) {
                let pairs = chain[first_seen..]
                    .iter()
                    .copied()
                    .zip(seconds[first_seen..].iter().copied())
                    .collect();
                return Ok(Rotation { pairs });
            }
            chain.push(next);
        }
    }

    /// The `(p, q)` pairs of the cycle, in discovery order.
    pub fn pairs(&self) -> &[(Member, Member)] {
        &self.pairs
    }

    /// Removes every pair this rotation renders impossible. Fails with
    /// [`NoStableMatching::ExhaustedList`] the moment a removal empties
    /// either side's list.
    pub fn eliminate(&self, table: &mut PreferenceTable) -> Result<(), PairingError> {
        let mut seen = AHashSet::new();
        let mut marks = Vec::new();
        for &(p, q) in &self.pairs {
            for dropped in table.ranked_below(q, p) {
                let key = if dropped < q { (dropped, q) } else { (q, dropped) };
                if seen.insert(key) {
                    marks.push((q, dropped));
                }
            }
        }

        for (owner, dropped) in marks {
            table.remove_pair(owner, dropped)?;
            for side in [owner, dropped] {
                if table.is_empty(side) {
                    return Err(NoStableMatching::ExhaustedList { member: side }.into());
                }
            }
        }
        Ok(())
    }
}

/// Eliminates rotations, member by member in table order, until every list
/// is a singleton. On success the collapsed table *is* the matching.
pub fn eliminate_rotations(table: &mut PreferenceTable) -> Result<(), PairingError> {
    for member in table.members() {
        while table.len_of(member) > 1 {
            let rotation = Rotation::find(table, member)?;
            rotation.eliminate(table)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    /// The reduced table phase 1 leaves behind for
    /// `{A: CBD, B: ACD, C: DBA, D: BAC}` (members 0..=3 in that order).
    fn reduced_square() -> PreferenceTable {
        PreferenceTable::from_ranked_lists(vec![
            vec![Member(2), Member(1)],
            vec![Member(0), Member(2), Member(3)],
            vec![Member(3), Member(1), Member(0)],
            vec![Member(1), Member(2)],
        ])
    }

    #[test]
    fn rotation_is_found_from_a_long_list() {
        let table = reduced_square();
        let rotation = Rotation::find(&table, Member(0)).unwrap();
        assert_eq!(
            rotation.pairs(),
            &[(Member(0), Member(1)), (Member(3), Member(2))]
        );
    }

    #[test]
    fn elimination_collapses_the_square() {
        let mut table = reduced_square();
        eliminate_rotations(&mut table).unwrap();

        assert_eq!(table.list(Member(0)), &[Member(1)]);
        assert_eq!(table.list(Member(1)), &[Member(0)]);
        assert_eq!(table.list(Member(2)), &[Member(3)]);
        assert_eq!(table.list(Member(3)), &[Member(2)]);
    }

    #[test]
    fn rotation_that_drains_a_list_is_fatal() {
        // A three-cycle of mutual second choices has nowhere to settle.
        let mut table = PreferenceTable::from_ranked_lists(vec![
            vec![Member(1), Member(2)],
            vec![Member(2), Member(0)],
            vec![Member(0), Member(1)],
        ]);
        let err = eliminate_rotations(&mut table).unwrap_err();
        assert!(matches!(
            err,
            PairingError::NoStableMatching(NoStableMatching::ExhaustedList { .. })
        ));
    }

    #[test]
    fn search_skips_the_tail_before_the_cycle() {
        // Starting from 0 walks 0 -> 2 -> 4 before the chain closes back on
        // 2; the rotation is the 2/4 stretch and 0 is left alone.
        let mut table = PreferenceTable::from_ranked_lists(vec![
            vec![Member(5), Member(1)],
            vec![Member(0), Member(2)],
            vec![Member(1), Member(3), Member(5)],
            vec![Member(2), Member(4)],
            vec![Member(3), Member(5)],
            vec![Member(0), Member(4), Member(2)],
        ]);
        let rotation = Rotation::find(&table, Member(0)).unwrap();
        assert_eq!(
            rotation.pairs(),
            &[(Member(2), Member(3)), (Member(4), Member(5))]
        );
        rotation.eliminate(&mut table).unwrap();
        assert_eq!(table.list(Member(0)), &[Member(5), Member(1)]);
    }
}
