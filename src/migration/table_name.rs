//! Ledger table identifier

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the ledger table, optionally schema-qualified
///
/// Deserialises from either `"migrations"` or `["app", "migrations"]`. The serialised
/// JSON form feeds the advisory lock id, so the two spellings never share a lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableName {
    Plain(String),
    Qualified(Vec<String>),
}

impl TableName {
    pub fn qualified(schema: impl Into<String>, table: impl Into<String>) -> Self {
        TableName::Qualified(vec![schema.into(), table.into()])
    }

    /// Identifier parts, outermost first
    pub fn parts(&self) -> Vec<&str> {
        match self {
            TableName::Plain(name) => vec![name.as_str()],
            TableName::Qualified(parts) => parts.iter().map(String::as_str).collect(),
        }
    }

    /// Quoted SQL identifier, e.g. `"app"."migrations"`
    pub fn to_sql(&self) -> String {
        self.parts()
            .into_iter()
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        TableName::Plain(name.to_string())
    }
}

impl From<String> for TableName {
    fn from(name: String) -> Self {
        TableName::Plain(name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts().join("."))
    }
}

fn quote_ident(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_sql_quotes_each_part() {
        assert_eq!(TableName::from("migrations").to_sql(), "\"migrations\"");
        assert_eq!(
            TableName::qualified("app", "migrations").to_sql(),
            "\"app\".\"migrations\""
        );
    }

    #[test]
    fn test_to_sql_escapes_quotes() {
        assert_eq!(TableName::from("we\"ird").to_sql(), "\"we\"\"ird\"");
    }

    #[test]
    fn test_display() {
        assert_eq!(TableName::qualified("app", "m").to_string(), "app.m");
    }

    #[test]
    fn test_deserialize_both_forms() {
        let plain: TableName = serde_json::from_str("\"migrations\"").unwrap();
        assert_eq!(plain, TableName::from("migrations"));

        let qualified: TableName = serde_json::from_str("[\"app\",\"migrations\"]").unwrap();
        assert_eq!(qualified, TableName::qualified("app", "migrations"));
    }
}
