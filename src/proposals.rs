//! # Phase 1: proposals
//!
//! Every member proposes to the best candidate still on its list; a
//! candidate holds on to the best proposal it has seen so far and sheds the
//! rest. The loop is driven by a pending-work deque in the style of a Kahn
//! worklist, with one twist: a member whose held proposal is evicted goes
//! back to the *front* of the deque so it re-proposes before any untouched
//! member advances.
//!
//! Every rejection and every eviction permanently removes the corresponding
//! pair from the shared [`PreferenceTable`], so phase 1 doubles as the first
//! round of list reduction. A member that runs out of candidates simply ends
//! the round without a proposal; [`ProposalRecord::is_complete`] catches
//! that afterwards.

use std::collections::VecDeque;

use itertools::Itertools;

use crate::roster::Member;
use crate::table::{IntegrityError, PreferenceTable};

/// Who proposed to whom, and who is holding whose proposal, at the end of
/// phase 1. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalRecord {
    /// `proposed_to[p]` is the member currently holding `p`'s proposal.
    proposed_to: Vec<Option<Member>>,
    /// `holds[c]` is the proposer whose proposal `c` currently holds.
    holds: Vec<Option<Member>>,
}

impl ProposalRecord {
    /// Runs the propose/accept/reject process over `table`.
    pub fn run(table: &mut PreferenceTable) -> Result<Self, IntegrityError> {
        let n = table.len();
        let mut record = ProposalRecord {
            proposed_to: vec![None; n],
            holds: vec![None; n],
        };
        let mut pending: VecDeque<Member> = table.members().collect();

        while let Some(proposer) = pending.pop_front() {
            while let Some(candidate) = table.first(proposer) {
                match record.holds[candidate.0] {
                    None => {
                        record.accept(candidate, proposer);
                        break;
                    }
                    Some(held) if table.prefers(candidate, proposer, held) => {
                        // Eviction: the displaced member retries first.
                        record.proposed_to[held.0] = None;
                        record.accept(candidate, proposer);
                        pending.push_front(held);
                        table.remove_pair(candidate, held)?;
                        break;
                    }
                    Some(_) => {
                        table.remove_pair(proposer, candidate)?;
                    }
                }
            }
        }
        Ok(record)
    }

    fn accept(&mut self, acceptor: Member, proposer: Member) {
        self.proposed_to[proposer.0] = Some(acceptor);
        self.holds[acceptor.0] = Some(proposer);
    }

    /// The member currently holding `member`'s proposal, if any.
    pub fn proposed_to(&self, member: Member) -> Option<Member> {
        self.proposed_to[member.0]
    }

    /// The proposer whose proposal `member` currently holds, if any.
    pub fn holds(&self, member: Member) -> Option<Member> {
        self.holds[member.0]
    }

    /// Whether the record is a fully resolved, collision-free assignment:
    /// everyone proposed somewhere, everyone holds a proposal, and no two
    /// members ended up on the same target or the same source.
    ///
    /// Anything short of that means the instance has no stable matching.
    pub fn is_complete(&self) -> bool {
        self.proposed_to.iter().all(Option::is_some)
            && self.holds.iter().all(Option::is_some)
            && self.proposed_to.iter().flatten().all_unique()
            && self.holds.iter().flatten().all_unique()
    }

    /// `(member, held proposer)` for every member holding a proposal.
    pub fn held_pairs(&self) -> impl Iterator<Item = (Member, Member)> + '_ {
        self.holds
            .iter()
            .enumerate()
            .filter_map(|(i, held)| held.map(|h| (Member(i), h)))
    }
}

impl PreferenceTable {
    /// Trims every list down to (and including) the proposer its owner is
    /// holding: an owner will never settle for anyone it ranks below the
    /// best proposal it already has. Dropped candidates lose the owner from
    /// their own lists in the same operation.
    pub fn truncate_below_held(&mut self, record: &ProposalRecord) -> Result<(), IntegrityError> {
        for (owner, held) in record.held_pairs() {
            for dropped in self.ranked_below(owner, held) {
                self.remove_pair(owner, dropped)?;
            }
        }
        Ok(())
    }
}
