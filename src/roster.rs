//! Participant interning.
//!
//! Callers identify participants by any hashable key (names, integers, ...).
//! The solver itself works on dense [`Member`] indices so that rank lookups
//! and membership filters are plain array accesses. A [`Roster`] owns the
//! mapping between the two worlds and is the only place where caller input
//! is validated.

use std::fmt;
use std::hash::Hash;

use derive_more::{From, Into};
use indexmap::IndexSet;
use thiserror::Error;

use crate::table::PreferenceTable;

/// Dense index of a participant, assigned in input order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Member(pub usize);

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ways a caller-supplied preference table can be malformed.
///
/// These are the only errors that are the caller's responsibility to fix;
/// everything else the solver reports is a property of the preferences
/// themselves. Offending keys are rendered into the message at construction
/// so the error type stays independent of the key type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("participant {0} is listed more than once")]
    DuplicateParticipant(String),
    #[error("participant {0} ranks itself")]
    SelfReference(String),
    #[error("participant {owner} ranks {entry} more than once")]
    DuplicateEntry { owner: String, entry: String },
    #[error("participant {owner} ranks {entry}, which is not in the cohort")]
    UnknownParticipant { owner: String, entry: String },
    #[error("participant {owner} ranks {got} of {expected} other participants")]
    IncompleteRanking {
        owner: String,
        got: usize,
        expected: usize,
    },
}

/// The fixed universe of participants for one solver run.
///
/// Interning copies the caller's keys, so a run never mutates caller data.
#[derive(Debug, Clone)]
pub struct Roster<P> {
    keys: IndexSet<P>,
}

impl<P: Clone + Eq + Hash + fmt::Debug> Roster<P> {
    /// Validates the caller's preference mapping and interns it into a
    /// [`Roster`] plus the starting [`PreferenceTable`].
    ///
    /// Each participant must rank every *other* participant exactly once:
    /// no self-reference, no duplicates, no omissions, no strangers.
    pub fn intern<R>(
        preferences: impl IntoIterator<Item = (P, R)>,
    ) -> Result<(Self, PreferenceTable), TableError>
    where
        R: IntoIterator<Item = P>,
    {
        let rows: Vec<(P, Vec<P>)> = preferences
            .into_iter()
            .map(|(key, ranking)| (key, ranking.into_iter().collect()))
            .collect();

        let mut keys = IndexSet::with_capacity(rows.len());
        for (key, _) in &rows {
            if !keys.insert(key.clone()) {
                return Err(TableError::DuplicateParticipant(format!("{key:?}")));
            }
        }

        let n = keys.len();
        let mut lists = Vec::with_capacity(n);
        for (owner_idx, (owner, ranking)) in rows.iter().enumerate() {
            if ranking.len() != n - 1 {
                return Err(TableError::IncompleteRanking {
                    owner: format!("{owner:?}"),
                    got: ranking.len(),
                    expected: n - 1,
                });
            }
            let mut seen = vec![false; n];
            let mut list = Vec::with_capacity(ranking.len());
            for entry in ranking {
                let Some(idx) = keys.get_index_of(entry) else {
                    return Err(TableError::UnknownParticipant {
                        owner: format!("{owner:?}"),
                        entry: format!("{entry:?}"),
                    });
                };
                if idx == owner_idx {
                    return Err(TableError::SelfReference(format!("{owner:?}")));
                }
                if seen[idx] {
                    return Err(TableError::DuplicateEntry {
                        owner: format!("{owner:?}"),
                        entry: format!("{entry:?}"),
                    });
                }
                seen[idx] = true;
                list.push(Member(idx));
            }
            lists.push(list);
        }

        Ok((Roster { keys }, PreferenceTable::from_ranked_lists(lists)))
    }
}

impl<P> Roster<P> {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_of(&self, member: Member) -> &P {
        &self.keys[member.0]
    }

    pub fn member_of(&self, key: &P) -> Option<Member>
    where
        P: Eq + Hash,
    {
        self.keys.get_index_of(key).map(Member)
    }

    pub fn members(&self) -> impl Iterator<Item = Member> {
        (0..self.keys.len()).map(Member)
    }
}
