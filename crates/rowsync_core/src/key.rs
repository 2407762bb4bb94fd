//! Composite primary-key codec.
//!
//! Keys are stored in the change log as one delimited string:
//! `name<sep>value<sep>name<sep>value...`. The same separator joins a name to
//! its value and one pair to the next.
//!
//! No escaping is performed. A separator occurring inside a column name or
//! value corrupts the pairing; when that yields an odd number of elements or
//! a repeated column, decoding fails with [`KeyError::Malformed`], otherwise
//! the misaligned key is returned as-is. Choosing a separator that never
//! occurs in key data is an operational constraint.

use crate::error::{KeyError, KeyResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: &str = "|";

/// An ordered column → value mapping identifying one row.
///
/// Column order is significant and follows the primary-key column order
/// of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeKey {
    fields: Vec<(String, String)>,
}

impl CompositeKey {
    /// Creates an empty key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column, builder style.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(column, value);
        self
    }

    /// Appends a column/value pair.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.push((column.into(), value.into()));
    }

    /// Returns the value of a column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over (column, value) pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the column names in key order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the key has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CompositeKey {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("}")
    }
}

/// Encodes and decodes composite keys with one separator token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    separator: String,
}

impl KeyCodec {
    /// Creates a codec using the given separator.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::EmptySeparator`] if `separator` is empty.
    pub fn new(separator: impl Into<String>) -> KeyResult<Self> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(KeyError::EmptySeparator);
        }
        Ok(Self { separator })
    }

    /// Returns the separator token.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Encodes a key in its own column order.
    pub fn encode(&self, key: &CompositeKey) -> String {
        self.encode_fields(key.iter())
    }

    /// Encodes an ordered sequence of (column, value) pairs.
    pub fn encode_fields<'a, I>(&self, fields: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut encoded = String::new();
        for (i, (name, value)) in fields.into_iter().enumerate() {
            if i > 0 {
                encoded.push_str(&self.separator);
            }
            encoded.push_str(name);
            encoded.push_str(&self.separator);
            encoded.push_str(value);
        }
        encoded
    }

    /// Encodes a key in the given primary-key column order.
    ///
    /// Columns of `key` that are not listed in `columns` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::MissingColumn`] if a listed column has no value.
    pub fn encode_with_columns<S: AsRef<str>>(
        &self,
        columns: &[S],
        key: &CompositeKey,
    ) -> KeyResult<String> {
        let mut fields = Vec::with_capacity(columns.len());
        for column in columns {
            let column = column.as_ref();
            let value = key.get(column).ok_or_else(|| KeyError::MissingColumn {
                column: column.to_string(),
            })?;
            fields.push((column, value));
        }
        Ok(self.encode_fields(fields))
    }

    /// Decodes a key read from the log.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Malformed`] if the elements cannot be paired or a
    /// column appears twice.
    pub fn decode(&self, raw: &str) -> KeyResult<CompositeKey> {
        if raw.is_empty() {
            return Ok(CompositeKey::new());
        }

        let parts: Vec<&str> = raw.split(self.separator.as_str()).collect();
        if parts.len() % 2 != 0 {
            return Err(KeyError::malformed(
                raw,
                format!("{} elements cannot be paired", parts.len()),
            ));
        }

        let mut key = CompositeKey::new();
        for pair in parts.chunks_exact(2) {
            if key.get(pair[0]).is_some() {
                return Err(KeyError::malformed(
                    raw,
                    format!("column {:?} appears more than once", pair[0]),
                ));
            }
            key.push(pair[0], pair[1]);
        }
        Ok(key)
    }
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}
