use crate::error::ParseError;
use crate::token::{Kind, Token};
use tracing::debug;

/// Statement tree node. A top-level node is a separator keyword owning its
/// literals and sub-keyword clauses; a clause node owns the literals that
/// directly follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub index: usize,
    pub kind: Kind,
    pub value: Option<String>,
    pub keyword: bool,
    pub annotation: Option<Kind>,
    pub children: Vec<Node>,
}

impl Node {
    fn keyword(token: &Token) -> Self {
        Self {
            index: token.index,
            kind: token.kind,
            value: token.value.clone(),
            keyword: true,
            annotation: None,
            children: Vec::new(),
        }
    }

    fn literal(token: &Token) -> Self {
        Self {
            index: token.index,
            kind: token.kind,
            value: token.value.clone(),
            keyword: false,
            annotation: None,
            children: Vec::new(),
        }
    }

    /// A literal child that carries a value and isn't a clause.
    pub fn is_bare_literal(&self) -> bool {
        !self.keyword && self.value.as_deref().map_or(false, |v| !v.is_empty())
    }
}

/// Sub-keywords whose literals name a statement's target.
pub fn target_keywords(kind: Kind) -> &'static [Kind] {
    match kind {
        Kind::Fetch => &[Kind::From],
        Kind::Delete | Kind::Send | Kind::Edit => &[Kind::In],
        _ => &[],
    }
}

/// Sub-keywords whose literals become statement values.
pub fn value_keywords(kind: Kind) -> &'static [Kind] {
    match kind {
        Kind::Listen => &[Kind::Include, Kind::Exclude],
        Kind::Read | Kind::Delete => &[Kind::Limit, Kind::Before, Kind::After, Kind::Around],
        Kind::Edit => &[Kind::With],
        _ => &[],
    }
}

pub struct Parser {
    tokens: Vec<Token>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn parse(&self) -> Result<Vec<Node>, ParseError> {
        let statements = self.statements()?;
        debug!(statements = statements.len(), "split source into statements");

        statements
            .iter()
            .map(|statement| build_statement(statement))
            .collect()
    }

    /// Groups tokens into semicolon-delimited statements, dropping
    /// whitespace, newlines and comments. Empty statements are skipped.
    pub fn statements(&self) -> Result<Vec<Vec<Token>>, ParseError> {
        let mut statements = Vec::new();
        let mut current = Vec::new();

        for token in &self.tokens {
            match token.kind {
                Kind::Error => return Err(ParseError::new(token.index, Kind::Error)),
                Kind::Semicolon | Kind::EOF => {
                    if !current.is_empty() {
                        statements.push(std::mem::take(&mut current));
                    }
                    if token.kind == Kind::EOF {
                        break;
                    }
                }
                kind if kind.is_noop() => continue,
                _ => current.push(token.clone()),
            }
        }

        if !current.is_empty() {
            statements.push(current);
        }

        Ok(statements)
    }
}

fn build_statement(statement: &[Token]) -> Result<Node, ParseError> {
    let head = match statement.first() {
        Some(head) => head,
        None => return Err(ParseError::new(0, Kind::Error)),
    };

    if !head.kind.is_separator() {
        return Err(ParseError::new(head.index, Kind::Error));
    }

    let mut node = Node::keyword(head);
    let mut i = 1;

    while i < statement.len() {
        let token = &statement[i];

        if token.kind.is_literal() {
            let (leaf, next) = annotated_literal(statement, i);
            node.children.push(leaf);
            i = next;
        } else if token.kind.is_keyword() {
            let mut clause = Node::keyword(token);
            i += 1;
            while i < statement.len() && statement[i].kind.is_literal() {
                let (leaf, next) = annotated_literal(statement, i);
                clause.children.push(leaf);
                i = next;
            }
            node.children.push(clause);
        } else {
            debug!(index = token.index, kind = ?token.kind, "dropping annotation with no literal");
            i += 1;
        }
    }

    Ok(node)
}

/// Builds a leaf for the literal at `i`, attaching the annotation that
/// directly follows it. Returns the leaf and the index after it.
fn annotated_literal(statement: &[Token], i: usize) -> (Node, usize) {
    let mut leaf = Node::literal(&statement[i]);
    match statement.get(i + 1) {
        Some(next) if next.kind.is_annotation() => {
            leaf.annotation = Some(next.kind);
            (leaf, i + 2)
        }
        _ => (leaf, i + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> Result<Vec<Node>, ParseError> {
        Parser::new(Lexer::new(src).tokenize()).parse()
    }

    #[test]
    fn one_tree_per_statement() {
        let trees = parse("SHOW; RAW;\nSHOW \"1\"g").unwrap();
        let kinds: Vec<Kind> = trees.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![Kind::Show, Kind::Raw, Kind::Show]);
    }

    #[test]
    fn empty_statements_and_comments_are_skipped() {
        let trees = parse(";; # nothing here\n  RAW ;").unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].kind, Kind::Raw);
    }

    #[test]
    fn literals_carry_annotations() {
        let trees = parse("USE \"tok\"t \"1\"g 5;").unwrap();
        let children = &trees[0].children;
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].value.as_deref(), Some("tok"));
        assert_eq!(children[0].annotation, Some(Kind::t));
        assert_eq!(children[1].annotation, Some(Kind::g));
        assert_eq!(children[2].kind, Kind::Number);
        assert_eq!(children[2].annotation, None);
    }

    #[test]
    fn clauses_own_following_literals() {
        let trees = parse("FETCH \"u1\"u FROM \"c1\"c \"c2\"c FROM \"g1\"g;").unwrap();
        let children = &trees[0].children;
        assert_eq!(children.len(), 3);

        assert!(!children[0].keyword);
        assert_eq!(children[1].kind, Kind::From);
        assert!(children[1].keyword);
        assert_eq!(children[1].children.len(), 2);
        assert_eq!(children[1].children[1].value.as_deref(), Some("c2"));
        assert_eq!(children[2].children[0].annotation, Some(Kind::g));
    }

    #[test]
    fn clause_without_literals_is_kept_empty() {
        let trees = parse("DELETE LIMIT IN \"1\"c;").unwrap();
        let children = &trees[0].children;
        assert_eq!(children[0].kind, Kind::Limit);
        assert!(children[0].children.is_empty());
        assert_eq!(children[1].kind, Kind::In);
        assert_eq!(children[1].children.len(), 1);
    }

    #[test]
    fn statement_must_start_with_separator() {
        let err = parse("RAW; FROM \"1\"g;").unwrap_err();
        assert_eq!(err.index, 5);
        assert_eq!(err.kind, Kind::Error);

        let err = parse("\"hi\";").unwrap_err();
        assert_eq!(err.index, 0);
    }

    #[test]
    fn error_tokens_are_fatal() {
        let err = parse("SEND \"hi\" @ IN \"1\"c;").unwrap_err();
        assert_eq!(err.index, 10);

        let err = parse("SEND bogus;").unwrap_err();
        assert_eq!(err.index, 5);
    }

    #[test]
    fn annotation_without_literal_is_dropped() {
        let trees = parse("SEND c \"hi\"g;").unwrap();
        let children = &trees[0].children;
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].value.as_deref(), Some("hi"));
        assert_eq!(children[0].annotation, Some(Kind::g));
    }

    #[test]
    fn grammar_table() {
        assert_eq!(target_keywords(Kind::Fetch), &[Kind::From]);
        assert_eq!(target_keywords(Kind::Edit), &[Kind::In]);
        assert!(target_keywords(Kind::Read).is_empty());
        assert_eq!(value_keywords(Kind::Edit), &[Kind::With]);
        assert_eq!(value_keywords(Kind::Listen), &[Kind::Include, Kind::Exclude]);
        assert!(value_keywords(Kind::Send).is_empty());
    }
}
