//! Join descriptors

use crate::predicate::PredicateTree;

/// JOIN types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
            JoinType::Right => write!(f, "RIGHT"),
            JoinType::Cross => write!(f, "CROSS"),
        }
    }
}

/// One registered join: target table plus its ON conditions.
///
/// The ON conditions are a predicate tree of their own, scoped to the join;
/// any values they bind are merged into the parent builder's join bucket at
/// the moment the descriptor is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinDescriptor {
    pub join_type: JoinType,
    pub table: String,
    pub on: PredicateTree,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_type_display() {
        assert_eq!(JoinType::Inner.to_string(), "INNER");
        assert_eq!(JoinType::Left.to_string(), "LEFT");
        assert_eq!(JoinType::Right.to_string(), "RIGHT");
        assert_eq!(JoinType::Cross.to_string(), "CROSS");
    }
}
