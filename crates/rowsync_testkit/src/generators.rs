//! Property-based test generators using proptest.
//!
//! Provides strategies for generating change sequences and composite keys
//! that respect the capture invariants.

use proptest::prelude::*;
use rowsync_core::{ChangeType, CompositeKey};

/// Strategy for generating a single change type.
pub fn change_type_strategy() -> impl Strategy<Value = ChangeType> {
    prop_oneof![
        Just(ChangeType::Insert),
        Just(ChangeType::Update),
        Just(ChangeType::Delete),
    ]
}

/// Strategy for generating a sequence of changes to one record.
pub fn change_sequence_strategy(
    min_len: usize,
    max_len: usize,
) -> impl Strategy<Value = Vec<ChangeType>> {
    prop::collection::vec(change_type_strategy(), min_len..max_len)
}

/// Strategy for generating key column names.
pub fn column_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for generating key values that never contain `separator`.
pub fn key_value_strategy(separator: &'static str) -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9 _.:@-]{0,16}")
        .expect("Invalid regex")
        .prop_filter("value must not contain the separator", move |v| {
            !v.contains(separator)
        })
}

/// Strategy for generating composite keys with distinct columns.
pub fn composite_key_strategy(separator: &'static str) -> impl Strategy<Value = CompositeKey> {
    prop::collection::btree_map(
        column_name_strategy().prop_filter("column must not contain the separator", move |c| {
            !c.contains(separator)
        }),
        key_value_strategy(separator),
        1..4,
    )
    .prop_map(|fields| fields.into_iter().collect())
}

/// One captured change against a small pool of tables and keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOperation {
    /// Index into the table pool.
    pub table: usize,
    /// Index into the key pool for the key before the change.
    pub key: usize,
    /// Index into the key pool for the key after an update.
    pub new_key: usize,
    /// Type of change.
    pub change_type: ChangeType,
}

/// Strategy for generating a log operation over `tables` tables and `keys`
/// keys.
pub fn log_operation_strategy(tables: usize, keys: usize) -> impl Strategy<Value = LogOperation> {
    (
        0..tables.max(1),
        0..keys.max(1),
        0..keys.max(1),
        change_type_strategy(),
    )
        .prop_map(|(table, key, new_key, change_type)| LogOperation {
            table,
            key,
            new_key,
            change_type,
        })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn sequence_length_in_range(seq in change_sequence_strategy(1, 6)) {
            prop_assert!(!seq.is_empty());
            prop_assert!(seq.len() < 6);
        }

        #[test]
        fn composite_key_avoids_separator(key in composite_key_strategy("|")) {
            prop_assert!(!key.is_empty());
            for (name, value) in key.iter() {
                prop_assert!(!name.contains('|'));
                prop_assert!(!value.contains('|'));
            }
        }

        #[test]
        fn log_operation_indices_in_pool(op in log_operation_strategy(2, 3)) {
            prop_assert!(op.table < 2);
            prop_assert!(op.key < 3);
            prop_assert!(op.new_key < 3);
        }
    }
}
