//! Schema introspection collaborator.

use crate::error::{StoreError, StoreResult};
use rowsync_core::Role;
use std::collections::HashMap;

/// Primary-key discovery for tables in either database.
pub trait SchemaSource {
    /// Returns the primary-key column names of `table`, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTable`] if the table does not exist, or
    /// another store error if introspection fails.
    fn primary_key_columns(&self, role: Role, table: &str) -> StoreResult<Vec<String>>;
}

/// A schema with fixed primary-key columns per (role, table).
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    tables: HashMap<(Role, String), Vec<String>>,
}

impl StaticSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table's primary-key columns for one role.
    #[must_use]
    pub fn with_table<S: Into<String>>(
        mut self,
        role: Role,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.tables.insert(
            (role, table.into()),
            columns.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Registers a table with the same primary-key columns in both roles.
    #[must_use]
    pub fn with_shared_table<S: Into<String>>(
        self,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        let table = table.into();
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.with_table(Role::Left, table.clone(), columns.clone())
            .with_table(Role::Right, table, columns)
    }
}

impl SchemaSource for StaticSchema {
    fn primary_key_columns(&self, role: Role, table: &str) -> StoreResult<Vec<String>> {
        self.tables
            .get(&(role, table.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::UnknownTable {
                role,
                table: table.to_string(),
            })
    }
}

impl<S: SchemaSource + ?Sized> SchemaSource for &S {
    fn primary_key_columns(&self, role: Role, table: &str) -> StoreResult<Vec<String>> {
        (**self).primary_key_columns(role, table)
    }
}
