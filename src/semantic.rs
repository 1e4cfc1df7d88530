//! Flattens statement trees into `{command, target, values}` records.

use crate::parser::{target_keywords, value_keywords, Node};
use crate::token::Kind;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedValue {
    pub index: usize,
    pub key: Kind,
    pub value: String,
    pub annotation: Option<Kind>,
}

impl AnnotatedValue {
    fn from_node(node: &Node, key: Kind) -> Option<Self> {
        let value = node.value.as_deref().filter(|v| !v.is_empty())?;
        Some(Self {
            index: node.index,
            key,
            value: value.to_string(),
            annotation: node.annotation,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticCommand {
    pub command: AnnotatedValue,
    pub target: Option<AnnotatedValue>,
    pub values: Vec<AnnotatedValue>,
}

pub fn normalize(statement: &Node) -> SemanticCommand {
    SemanticCommand {
        command: AnnotatedValue {
            index: statement.index,
            key: statement.kind,
            value: statement
                .value
                .clone()
                .unwrap_or_else(|| statement.kind.to_string()),
            annotation: None,
        },
        target: statement_target(statement),
        values: statement_values(statement),
    }
}

/// The last annotated literal of the target clause for keywords that have
/// one, otherwise the last annotated bare literal.
fn statement_target(statement: &Node) -> Option<AnnotatedValue> {
    let clauses = target_keywords(statement.kind);

    let candidate = if clauses.is_empty() {
        statement
            .children
            .iter()
            .filter(|child| child.is_bare_literal() && child.annotation.is_some())
            .last()
    } else {
        statement
            .children
            .iter()
            .filter(|child| child.keyword && clauses.contains(&child.kind))
            .flat_map(|clause| clause.children.iter())
            .filter(|literal| literal.annotation.is_some())
            .last()
    };

    candidate.and_then(|node| AnnotatedValue::from_node(node, node.kind))
}

fn statement_values(statement: &Node) -> Vec<AnnotatedValue> {
    let clauses = value_keywords(statement.kind);
    let keyed_by_clause = matches!(statement.kind, Kind::Listen | Kind::Read | Kind::Delete);
    let mut values = Vec::new();

    for child in &statement.children {
        if child.keyword {
            if !clauses.contains(&child.kind) {
                continue;
            }
            for literal in &child.children {
                let key = if keyed_by_clause { child.kind } else { literal.kind };
                values.extend(AnnotatedValue::from_node(literal, key));
            }
        } else if statement.kind != Kind::Listen {
            values.extend(AnnotatedValue::from_node(child, child.kind));
        }
    }

    values
}
