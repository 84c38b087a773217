//! Cross-reference token table
//!
//! Commands record identifiers the remote system assigned (for example a
//! certificate template id) so payloads parsed later in the same run can refer
//! to them as `${key}`. Each key may be written once; recording the same value
//! again is accepted, a different value is an error.

use std::collections::BTreeMap;

/// Errors raised by [`TokenTable`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token '{key}' is already set to '{existing}', refusing to overwrite with '{attempted}'")]
    Conflict {
        key: String,
        existing: String,
        attempted: String,
    },
}

/// Write-once key/value store shared by the commands of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTable {
    values: BTreeMap<String, String>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value.
    ///
    /// ```
    /// use declarative::TokenTable;
    ///
    /// let mut tokens = TokenTable::new();
    /// tokens.insert("template-id", "42").unwrap();
    /// tokens.insert("template-id", "42").unwrap();
    /// assert!(tokens.insert("template-id", "43").is_err());
    /// ```
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), TokenError> {
        let key = key.into();
        let value = value.into();
        match self.values.get(&key) {
            Some(existing) if *existing == value => Ok(()),
            Some(existing) => Err(TokenError::Conflict {
                key,
                existing: existing.clone(),
                attempted: value,
            }),
            None => {
                self.values.insert(key, value);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every `${key}` whose key is recorded. Unknown tokens stay as written.
    ///
    /// ```
    /// use declarative::TokenTable;
    ///
    /// let mut tokens = TokenTable::new();
    /// tokens.insert("app-name", "orders").unwrap();
    /// assert_eq!(
    ///     tokens.substitute("${app-name}-content uses ${unknown}"),
    ///     "orders-content uses ${unknown}"
    /// );
    /// ```
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match self.values.get(key) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push_str("${");
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}
