//! Condition model: match/group trees evaluated against a single entity

use crate::graph::entity::Entity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Addressable field of an entity
///
/// The string form is the public addressing scheme: `"ID"`, `"Value"`,
/// `"Context"`, `"Properties.<name>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Id,
    Value,
    Context,
    Property(String),
}

impl Field {
    /// Parse the string-keyed addressing scheme
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ID" | "Id" | "id" => Field::Id,
            "Value" => Field::Value,
            "Context" => Field::Context,
            other => match other.strip_prefix("Properties.") {
                Some(name) => Field::Property(name.to_string()),
                None => Field::Property(other.to_string()),
            },
        }
    }

    /// Read this field off an entity; missing properties yield `None`
    pub fn get(&self, entity: &Entity) -> Option<String> {
        match self {
            Field::Id => Some(entity.id.as_u64().to_string()),
            Field::Value => Some(entity.value.clone()),
            Field::Context => Some(entity.context.clone()),
            Field::Property(name) => entity.get_property(name).map(str::to_string),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Id => write!(f, "ID"),
            Field::Value => write!(f, "Value"),
            Field::Context => write!(f, "Context"),
            Field::Property(name) => write!(f, "Properties.{}", name),
        }
    }
}

impl From<&str> for Field {
    fn from(raw: &str) -> Self {
        Field::parse(raw)
    }
}

/// Comparison operator of a match node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Neq,
    Prefix,
    Suffix,
    Contain,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Comma-separated set membership
    In,
}

impl Operator {
    /// Parse an operator from its string token
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "==" => Operator::Eq,
            "!=" => Operator::Neq,
            "prefix" => Operator::Prefix,
            "suffix" => Operator::Suffix,
            "contain" => Operator::Contain,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "in" => Operator::In,
            _ => return None,
        })
    }
}

/// Boolean connective of a group node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupOp {
    And,
    Or,
}

/// A condition tree node
///
/// Evaluation is recursive: AND short-circuits on the first false operand, OR
/// on the first true one. Negation inverts the final boolean of a node after
/// its children were evaluated. A match against a missing property is false,
/// and a numeric comparison with an unparseable side is false — never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Match {
        field: Field,
        op: Operator,
        value: String,
        negated: bool,
    },
    Group {
        op: GroupOp,
        operands: Vec<Condition>,
        negated: bool,
    },
}

impl Condition {
    pub fn matches(field: impl Into<Field>, op: Operator, value: impl Into<String>) -> Self {
        Condition::Match {
            field: field.into(),
            op,
            value: value.into(),
            negated: false,
        }
    }

    pub fn all(operands: Vec<Condition>) -> Self {
        Condition::Group {
            op: GroupOp::And,
            operands,
            negated: false,
        }
    }

    pub fn any(operands: Vec<Condition>) -> Self {
        Condition::Group {
            op: GroupOp::Or,
            operands,
            negated: false,
        }
    }

    pub fn negate(mut self) -> Self {
        match &mut self {
            Condition::Match { negated, .. } | Condition::Group { negated, .. } => {
                *negated = !*negated;
            }
        }
        self
    }

    /// Evaluate this tree against one entity
    pub fn evaluate(&self, entity: &Entity) -> bool {
        match self {
            Condition::Match {
                field,
                op,
                value,
                negated,
            } => {
                let hit = match field.get(entity) {
                    Some(actual) => evaluate_match(&actual, *op, value),
                    None => false,
                };
                hit != *negated
            }
            Condition::Group {
                op,
                operands,
                negated,
            } => {
                let hit = match op {
                    GroupOp::And => operands.iter().all(|c| c.evaluate(entity)),
                    GroupOp::Or => operands.iter().any(|c| c.evaluate(entity)),
                };
                hit != *negated
            }
        }
    }
}

fn evaluate_match(actual: &str, op: Operator, expected: &str) -> bool {
    match op {
        Operator::Eq => actual == expected,
        Operator::Neq => actual != expected,
        Operator::Prefix => actual.starts_with(expected),
        Operator::Suffix => actual.ends_with(expected),
        Operator::Contain => actual.contains(expected),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            // Unparseable numeric sides fail the match, never the query
            match (actual.parse::<i64>(), expected.parse::<i64>()) {
                (Ok(a), Ok(b)) => match op {
                    Operator::Gt => a > b,
                    Operator::Gte => a >= b,
                    Operator::Lt => a < b,
                    Operator::Lte => a <= b,
                    _ => unreachable!(),
                },
                _ => false,
            }
        }
        Operator::In => expected.split(',').any(|candidate| candidate == actual),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{EntityId, TypeId};

    fn entity(value: &str) -> Entity {
        let mut e = Entity::new(TypeId::new(1), value);
        e.id = EntityId::new(7);
        e
    }

    #[test]
    fn test_field_parsing_round_trip() {
        assert_eq!(Field::parse("ID"), Field::Id);
        assert_eq!(Field::parse("Value"), Field::Value);
        assert_eq!(Field::parse("Context"), Field::Context);
        assert_eq!(
            Field::parse("Properties.color"),
            Field::Property("color".to_string())
        );
        assert_eq!(format!("{}", Field::Property("color".to_string())), "Properties.color");
    }

    #[test]
    fn test_operator_token_parsing() {
        for (token, operator) in [
            ("==", Operator::Eq),
            ("!=", Operator::Neq),
            ("prefix", Operator::Prefix),
            ("suffix", Operator::Suffix),
            ("contain", Operator::Contain),
            (">", Operator::Gt),
            (">=", Operator::Gte),
            ("<", Operator::Lt),
            ("<=", Operator::Lte),
            ("in", Operator::In),
        ] {
            assert_eq!(Operator::parse(token), Some(operator));
        }
        assert_eq!(Operator::parse("=~"), None);
        assert_eq!(Operator::parse(""), None);
    }

    #[test]
    fn test_string_operators() {
        let e = entity("lighthouse");
        assert!(Condition::matches("Value", Operator::Eq, "lighthouse").evaluate(&e));
        assert!(Condition::matches("Value", Operator::Prefix, "light").evaluate(&e));
        assert!(Condition::matches("Value", Operator::Suffix, "house").evaluate(&e));
        assert!(Condition::matches("Value", Operator::Contain, "tho").evaluate(&e));
        assert!(Condition::matches("Value", Operator::Neq, "dark").evaluate(&e));
    }

    #[test]
    fn test_numeric_operators_and_malformed_values() {
        let e = entity("42");
        assert!(Condition::matches("Value", Operator::Gt, "41").evaluate(&e));
        assert!(Condition::matches("Value", Operator::Gte, "42").evaluate(&e));
        assert!(Condition::matches("Value", Operator::Lt, "100").evaluate(&e));
        assert!(!Condition::matches("Value", Operator::Lt, "7").evaluate(&e));

        // Unparseable comparison value is a non-match, not an error
        assert!(!Condition::matches("Value", Operator::Gt, "abc").evaluate(&e));
        assert!(!Condition::matches("Value", Operator::Lt, "abc").evaluate(&entity("xyz")));
    }

    #[test]
    fn test_in_operator_splits_on_commas() {
        let e = entity("blue");
        assert!(Condition::matches("Value", Operator::In, "red,blue,green").evaluate(&e));
        assert!(!Condition::matches("Value", Operator::In, "red,green").evaluate(&e));
    }

    #[test]
    fn test_missing_property_is_false() {
        let e = entity("x");
        let cond = Condition::matches("Properties.ghost", Operator::Eq, "");
        assert!(!cond.evaluate(&e));
        // Negation of a missing-property match is true
        assert!(cond.negate().evaluate(&e));
    }

    #[test]
    fn test_id_field_compares_as_string() {
        let e = entity("x");
        assert!(Condition::matches("ID", Operator::Eq, "7").evaluate(&e));
        assert!(Condition::matches("ID", Operator::Lt, "10").evaluate(&e));
    }

    #[test]
    fn test_group_evaluation_and_negation() {
        let e = entity("A");
        let or_groups = Condition::any(vec![
            Condition::all(vec![Condition::matches("Value", Operator::Eq, "A")]),
            Condition::all(vec![Condition::matches("Value", Operator::Eq, "B")]),
        ]);
        assert!(or_groups.evaluate(&e));
        assert!(!or_groups.clone().negate().evaluate(&e));

        let and_group = Condition::all(vec![
            Condition::matches("Value", Operator::Eq, "A"),
            Condition::matches("Value", Operator::Neq, "A"),
        ]);
        assert!(!and_group.evaluate(&e));
    }
}
