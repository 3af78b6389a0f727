//! # Stable matchings
//!
//! The terminal artifact of a solver run, and the entry point that produces
//! it. [`find_stable_pairing`] threads one exclusively owned
//! [`PreferenceTable`] through the pipeline (validate, propose, check,
//! trim, eliminate rotations) and either hands back a [`StableMatching`]
//! or one [`PairingError`]; partial results are never surfaced.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use thiserror::Error;

use crate::proposals::ProposalRecord;
use crate::roster::{Member, Roster, TableError};
use crate::rotation::eliminate_rotations;
use crate::table::{IntegrityError, PreferenceTable};

/// The instance itself admits no stable matching. The two variants record
/// where the solver noticed; callers rarely need to distinguish them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NoStableMatching {
    #[error("phase 1 ended with an incomplete or colliding proposal record")]
    IncompleteProposals,
    #[error("rotation elimination exhausted the preference list of {member}")]
    ExhaustedList { member: Member },
}

/// Everything [`find_stable_pairing`] can fail with, over one consistent
/// channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PairingError {
    /// The caller's input violates the preference-table contract. The only
    /// error that is the caller's to fix.
    #[error("invalid preference table: {0}")]
    InvalidTable(#[from] TableError),
    /// The preferences are well formed but cannot be stably paired.
    #[error("no stable matching exists: {0}")]
    NoStableMatching(#[from] NoStableMatching),
    /// The solver caught itself violating its own invariants.
    #[error("integrity violation: {0}")]
    Integrity(#[from] IntegrityError),
}

/// A complete, symmetric pairing: every participant maps to exactly one
/// partner and `partner[partner[p]] == p`. Immutable once produced.
///
/// Iteration follows the input order of the participants.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StableMatching<P: Eq + Hash> {
    partners: IndexMap<P, P>,
}

impl<P: Clone + Eq + Hash> StableMatching<P> {
    /// Reinterprets a fully collapsed table (every list a singleton) as the
    /// matching, translating members back into the caller's keys.
    pub(crate) fn from_collapsed(
        roster: &Roster<P>,
        table: &PreferenceTable,
    ) -> Result<Self, IntegrityError> {
        let mut partners = IndexMap::with_capacity(roster.len());
        for member in table.members() {
            if !table.is_singleton(member) {
                return Err(IntegrityError::BrokenList(member));
            }
            let Some(partner) = table.first(member) else {
                return Err(IntegrityError::BrokenList(member));
            };
            if table.first(partner) != Some(member) {
                return Err(IntegrityError::LopsidedCollapse {
                    a: member,
                    b: partner,
                });
            }
            partners.insert(
                roster.key_of(member).clone(),
                roster.key_of(partner).clone(),
            );
        }
        Ok(StableMatching { partners })
    }
}

impl<P: Eq + Hash> StableMatching<P> {
    pub fn partner_of(&self, participant: &P) -> Option<&P> {
        self.partners.get(participant)
    }

    /// Every `(participant, partner)` entry, both directions included.
    pub fn iter(&self) -> impl Iterator<Item = (&P, &P)> {
        self.partners.iter()
    }

    /// Each unordered pair exactly once, in input order of its earlier
    /// participant.
    pub fn pairs(&self) -> impl Iterator<Item = (&P, &P)> {
        self.partners
            .iter()
            .filter(|(a, b)| self.partners.get_index_of(*a) < self.partners.get_index_of(*b))
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}

impl<P: fmt::Display + Eq + Hash> fmt::Display for StableMatching<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (a, b)) in self.pairs().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{a} ↔ {b}")?;
        }
        Ok(())
    }
}

/// Computes a stable matching for a pool of mutually ranking participants,
/// or reports that none exists.
///
/// `preferences` must rank, for every participant, every *other*
/// participant exactly once. The input is copied; the caller's data is
/// never mutated.
///
/// # Examples
///
/// ```
/// use lovebird::matching::find_stable_pairing;
///
/// let matching = find_stable_pairing([
///     ("A", vec!["B", "C", "D"]),
///     ("B", vec!["A", "C", "D"]),
///     ("C", vec!["D", "B", "A"]),
///     ("D", vec!["C", "B", "A"]),
/// ])
/// .unwrap();
///
/// assert_eq!(matching.partner_of(&"A"), Some(&"B"));
/// assert_eq!(matching.partner_of(&"D"), Some(&"C"));
/// ```
pub fn find_stable_pairing<P, R>(
    preferences: impl IntoIterator<Item = (P, R)>,
) -> Result<StableMatching<P>, PairingError>
where
    P: Clone + Eq + Hash + fmt::Debug,
    R: IntoIterator<Item = P>,
{
    let (roster, mut table) = Roster::intern(preferences)?;
    let record = ProposalRecord::run(&mut table)?;
    if !record.is_complete() {
        return Err(NoStableMatching::IncompleteProposals.into());
    }
    table.truncate_below_held(&record)?;
    eliminate_rotations(&mut table)?;
    Ok(StableMatching::from_collapsed(&roster, &table)?)
}
