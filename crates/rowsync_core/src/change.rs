//! Change types and the fold transition table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a single captured change.
///
/// Every change-log row carries one of these; a produced net change carries
/// one as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    /// A row was inserted.
    Insert,
    /// A row was updated (possibly changing its primary key).
    Update,
    /// A row was deleted.
    Delete,
}

impl ChangeType {
    /// Converts to the one-letter code stored in the log.
    pub fn to_code(&self) -> char {
        match self {
            ChangeType::Insert => 'I',
            ChangeType::Update => 'U',
            ChangeType::Delete => 'D',
        }
    }

    /// Converts from the one-letter log code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'I' => Some(ChangeType::Insert),
            'U' => Some(ChangeType::Update),
            'D' => Some(ChangeType::Delete),
            _ => None,
        }
    }

    /// Parses a log code column value such as `"U"`.
    pub fn from_code_str(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_code(c),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeType::Insert => "insert",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Running state while folding log rows for one record.
///
/// `None` is both the initial state and the result of a change sequence
/// that cancels out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetChangeType {
    /// Nothing folded yet, or the folded changes cancelled out.
    #[default]
    None,
    /// Net effect is an insert.
    Insert,
    /// Net effect is an update.
    Update,
    /// Net effect is a delete.
    Delete,
}

impl NetChangeType {
    /// Folds one incoming change into the running state.
    ///
    /// | current \ incoming | I | U | D |
    /// |---|---|---|---|
    /// | None   | I | U | D |
    /// | Insert | I | I | N |
    /// | Update | U | U | D |
    /// | Delete | U | U | D |
    ///
    /// Insert+Insert, Update+Insert, Delete+Update and Delete+Delete do not
    /// occur under correct capture; they resolve to the entry above instead
    /// of failing. See [`NetChangeType::is_unexpected`].
    #[must_use]
    pub fn fold(self, incoming: ChangeType) -> NetChangeType {
        use ChangeType as C;
        use NetChangeType as N;

        match (self, incoming) {
            (N::None, C::Insert) => N::Insert,
            (N::None, C::Update) => N::Update,
            (N::None, C::Delete) => N::Delete,

            (N::Insert, C::Insert) => N::Insert,
            (N::Insert, C::Update) => N::Insert,
            (N::Insert, C::Delete) => N::None,

            (N::Update, C::Insert) => N::Update,
            (N::Update, C::Update) => N::Update,
            (N::Update, C::Delete) => N::Delete,

            (N::Delete, C::Insert) => N::Update,
            (N::Delete, C::Update) => N::Update,
            (N::Delete, C::Delete) => N::Delete,
        }
    }

    /// Returns true for the (current, incoming) pairs that correct capture
    /// never produces.
    pub fn is_unexpected(self, incoming: ChangeType) -> bool {
        matches!(
            (self, incoming),
            (NetChangeType::Insert, ChangeType::Insert)
                | (NetChangeType::Update, ChangeType::Insert)
                | (NetChangeType::Delete, ChangeType::Update)
                | (NetChangeType::Delete, ChangeType::Delete)
        )
    }

    /// Translates the folded state into the change a consumer must apply.
    ///
    /// Returns `None` when nothing is left to apply.
    pub fn to_change_type(self) -> Option<ChangeType> {
        match self {
            NetChangeType::None => None,
            NetChangeType::Insert => Some(ChangeType::Insert),
            NetChangeType::Update => Some(ChangeType::Update),
            NetChangeType::Delete => Some(ChangeType::Delete),
        }
    }

    /// Returns true if the state carries no net effect.
    pub fn is_none(self) -> bool {
        self == NetChangeType::None
    }
}

impl From<ChangeType> for NetChangeType {
    fn from(change: ChangeType) -> Self {
        NetChangeType::None.fold(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CHANGES: [ChangeType; 3] = [ChangeType::Insert, ChangeType::Update, ChangeType::Delete];
    const ALL_STATES: [NetChangeType; 4] = [
        NetChangeType::None,
        NetChangeType::Insert,
        NetChangeType::Update,
        NetChangeType::Delete,
    ];

    #[test]
    fn change_codes() {
        for change in ALL_CHANGES {
            assert_eq!(ChangeType::from_code(change.to_code()), Some(change));
        }
        assert_eq!(ChangeType::from_code('X'), None);
        assert_eq!(ChangeType::from_code_str("D"), Some(ChangeType::Delete));
        assert_eq!(ChangeType::from_code_str("DD"), None);
        assert_eq!(ChangeType::from_code_str(""), None);
    }

    #[test]
    fn transition_table_matches_reference() {
        use ChangeType::{Delete as D, Insert as I, Update as U};
        use NetChangeType as N;

        let expected = [
            (N::None, [N::Insert, N::Update, N::Delete]),
            (N::Insert, [N::Insert, N::Insert, N::None]),
            (N::Update, [N::Update, N::Update, N::Delete]),
            (N::Delete, [N::Update, N::Update, N::Delete]),
        ];

        for (current, row) in expected {
            for (incoming, result) in [I, U, D].into_iter().zip(row) {
                assert_eq!(
                    current.fold(incoming),
                    result,
                    "{current:?} + {incoming:?}"
                );
            }
        }
    }

    #[test]
    fn unexpected_pairs() {
        let unexpected: Vec<_> = ALL_STATES
            .iter()
            .flat_map(|s| ALL_CHANGES.iter().map(move |c| (*s, *c)))
            .filter(|(s, c)| s.is_unexpected(*c))
            .collect();

        assert_eq!(
            unexpected,
            vec![
                (NetChangeType::Insert, ChangeType::Insert),
                (NetChangeType::Update, ChangeType::Insert),
                (NetChangeType::Delete, ChangeType::Update),
                (NetChangeType::Delete, ChangeType::Delete),
            ]
        );
    }

    #[test]
    fn insert_then_delete_cancels() {
        let state = NetChangeType::None
            .fold(ChangeType::Insert)
            .fold(ChangeType::Update)
            .fold(ChangeType::Delete);
        assert!(state.is_none());
        assert_eq!(state.to_change_type(), None);
    }

    #[test]
    fn delete_then_insert_is_update() {
        let state = NetChangeType::from(ChangeType::Delete).fold(ChangeType::Insert);
        assert_eq!(state.to_change_type(), Some(ChangeType::Update));
    }
}
