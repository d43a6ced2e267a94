//! Recursive WHERE-clause structure with boolean connectors

use crate::Operator;

/// The boolean joiner preceding a predicate entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// One entry in a predicate tree.
///
/// Entries that bind a value (`Normal`, `In`) stage it in the owning
/// builder's binding store at append time; the entry itself only records what
/// the grammar needs to emit text. The connector of the first entry in any
/// tree is ignored at render time.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereEntry {
    /// `column op ?`
    Normal {
        column: String,
        operator: Operator,
        connector: Connector,
    },
    /// A verbatim SQL fragment
    Raw { sql: String, connector: Connector },
    /// `left op right` where both sides are column references
    ColumnCompare {
        left: String,
        operator: Operator,
        right: String,
        connector: Connector,
    },
    /// `[NOT] EXISTS (subquery)` - the subquery is rendered at construction
    Exists {
        sql: String,
        negated: bool,
        connector: Connector,
    },
    /// `column [NOT] IN (?)` - the whole list collapses to one placeholder
    In {
        column: String,
        negated: bool,
        connector: Connector,
    },
    /// `column [NOT] IN (subquery)`
    InSub {
        column: String,
        sql: String,
        negated: bool,
        connector: Connector,
    },
    /// A parenthesized sub-tree
    Nested {
        children: PredicateTree,
        connector: Connector,
    },
}

impl WhereEntry {
    pub fn connector(&self) -> Connector {
        match self {
            WhereEntry::Normal { connector, .. }
            | WhereEntry::Raw { connector, .. }
            | WhereEntry::ColumnCompare { connector, .. }
            | WhereEntry::Exists { connector, .. }
            | WhereEntry::In { connector, .. }
            | WhereEntry::InSub { connector, .. }
            | WhereEntry::Nested { connector, .. } => *connector,
        }
    }
}

/// Ordered collection of [`WhereEntry`] values forming one WHERE clause
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateTree {
    entries: Vec<WhereEntry>,
}

impl PredicateTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: WhereEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[WhereEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_text() {
        assert_eq!(Connector::And.as_str(), "AND");
        assert_eq!(Connector::Or.as_str(), "OR");
    }

    #[test]
    fn test_entry_connector_access() {
        let entry = WhereEntry::Normal {
            column: "age".to_string(),
            operator: Operator::GT,
            connector: Connector::Or,
        };
        assert_eq!(entry.connector(), Connector::Or);

        let nested = WhereEntry::Nested {
            children: PredicateTree::new(),
            connector: Connector::And,
        };
        assert_eq!(nested.connector(), Connector::And);
    }

    #[test]
    fn test_tree_preserves_insertion_order() {
        let mut tree = PredicateTree::new();
        tree.push(WhereEntry::Raw {
            sql: "a = 1".to_string(),
            connector: Connector::And,
        });
        tree.push(WhereEntry::Raw {
            sql: "b = 2".to_string(),
            connector: Connector::Or,
        });

        assert_eq!(tree.len(), 2);
        assert!(matches!(&tree.entries()[0], WhereEntry::Raw { sql, .. } if sql == "a = 1"));
        assert!(matches!(&tree.entries()[1], WhereEntry::Raw { sql, .. } if sql == "b = 2"));
    }
}
