//! XPath 1.0 subset evaluated against the in-memory document.
//! Spec: <https://www.w3.org/TR/1999/REC-xpath-19991116/>
//!
//! Supported: location paths with the child, descendant, descendant-or-self, parent, ancestor,
//! ancestor-or-self, following-sibling, preceding-sibling, self and attribute axes, the `/`,
//! `//`, `.`, `..` and `@` abbreviations, name, `*`, `node()` and `text()` tests, predicates,
//! unions, `and`/`or`, comparisons, and the functions `contains`, `starts-with`, `not`,
//! `position`, `last`, `count`, `string`, `string-length` and `normalize-space`.

use crate::document::{Document, NodeKind};
use crate::{DomAccess as _, NodeKey};
use indextree::NodeId;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    /// `/`
    Slash,
    /// `//`
    DoubleSlash,
    /// `.`
    Dot,
    /// `..`
    DotDot,
    /// `@`
    At,
    /// `*`
    Star,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Comma,
    /// `|`
    Pipe,
    Compare(CompareOp),
    Literal(String),
    Number(f64),
    Name(String),
    /// `name::`
    AxisName(String),
    /// `name(`
    Function(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();
    while let Some(character) = rest.chars().next() {
        let (token, consumed) = match character {
            '/' if rest.starts_with("//") => (Token::DoubleSlash, 2),
            '/' => (Token::Slash, 1),
            '.' if rest.starts_with("..") => (Token::DotDot, 2),
            '.' if !rest
                .as_bytes()
                .get(1)
                .is_some_and(u8::is_ascii_digit) =>
            {
                (Token::Dot, 1)
            }
            '@' => (Token::At, 1),
            '*' => (Token::Star, 1),
            '[' => (Token::OpenBracket, 1),
            ']' => (Token::CloseBracket, 1),
            '(' => (Token::OpenParen, 1),
            ')' => (Token::CloseParen, 1),
            ',' => (Token::Comma, 1),
            '|' => (Token::Pipe, 1),
            '=' => (Token::Compare(CompareOp::Equal), 1),
            '!' if rest.starts_with("!=") => (Token::Compare(CompareOp::NotEqual), 2),
            '<' if rest.starts_with("<=") => (Token::Compare(CompareOp::LessOrEqual), 2),
            '<' => (Token::Compare(CompareOp::Less), 1),
            '>' if rest.starts_with(">=") => (Token::Compare(CompareOp::GreaterOrEqual), 2),
            '>' => (Token::Compare(CompareOp::Greater), 1),
            '"' | '\'' => {
                let body = rest.get(1..).unwrap_or_default();
                let end = body
                    .find(character)
                    .ok_or_else(|| "unterminated string literal".to_owned())?;
                (
                    Token::Literal(body.get(..end).unwrap_or_default().to_owned()),
                    end.saturating_add(2),
                )
            }
            digit if digit.is_ascii_digit() || digit == '.' => {
                let end = rest
                    .find(|ch: char| !ch.is_ascii_digit() && ch != '.')
                    .unwrap_or(rest.len());
                let text = rest.get(..end).unwrap_or_default();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number `{text}`"))?;
                (Token::Number(number), end)
            }
            letter if letter.is_alphabetic() || letter == '_' => {
                let end = rest
                    .find(|ch: char| !(ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.')))
                    .unwrap_or(rest.len());
                let name = rest.get(..end).unwrap_or_default().to_owned();
                let after = rest.get(end..).unwrap_or_default().trim_start();
                let skipped = rest.len().saturating_sub(after.len());
                if after.starts_with("::") {
                    (Token::AxisName(name), skipped.saturating_add(2))
                } else if after.starts_with('(') {
                    (Token::Function(name), skipped.saturating_add(1))
                } else {
                    (Token::Name(name), end)
                }
            }
            other => return Err(format!("unexpected character `{other}`")),
        };
        tokens.push(token);
        rest = rest.get(consumed..).unwrap_or_default().trim_start();
    }
    Ok(tokens)
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
    Union(Vec<Expr>),
    Path(PathExpr),
    Literal(String),
    Number(f64),
    Call(String, Vec<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
struct PathExpr {
    /// Absolute paths start at the document node rather than the context node.
    is_absolute: bool,
    steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    SelfAxis,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        let axis = match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "parent" => Self::Parent,
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "following-sibling" => Self::FollowingSibling,
            "preceding-sibling" => Self::PrecedingSibling,
            "self" => Self::SelfAxis,
            "attribute" => Self::Attribute,
            _ => return None,
        };
        Some(axis)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Wildcard,
    Node,
    Text,
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        self.index = self.index.saturating_add(1);
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.bump() {
            Some(token) if token == *expected => Ok(()),
            Some(token) => Err(format!("expected {expected:?}, found {token:?}")),
            None => Err(format!("expected {expected:?}, found end of expression")),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(name)) if name == keyword)
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.is_keyword("or") {
            self.bump();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_compare()?;
        while self.is_keyword("and") {
            self.bump();
            let right = self.parse_compare()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_compare(&mut self) -> Result<Expr, String> {
        let left = self.parse_union()?;
        if let Some(Token::Compare(operator)) = self.peek().cloned() {
            self.bump();
            let right = self.parse_union()?;
            return Ok(Expr::Compare(Box::new(left), operator, Box::new(right)));
        }
        Ok(left)
    }

    fn parse_union(&mut self) -> Result<Expr, String> {
        let first = self.parse_primary()?;
        if self.peek() != Some(&Token::Pipe) {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.peek() == Some(&Token::Pipe) {
            self.bump();
            parts.push(self.parse_primary()?);
        }
        Ok(Expr::Union(parts))
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.peek().cloned() {
            Some(Token::Literal(text)) => {
                self.bump();
                Ok(Expr::Literal(text))
            }
            Some(Token::Number(number)) => {
                self.bump();
                Ok(Expr::Number(number))
            }
            Some(Token::OpenParen) => {
                self.bump();
                let inner = self.parse_or()?;
                self.expect(&Token::CloseParen)?;
                Ok(inner)
            }
            Some(Token::Function(name)) if name != "node" && name != "text" => {
                self.bump();
                let mut args = Vec::new();
                if self.peek() != Some(&Token::CloseParen) {
                    args.push(self.parse_or()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.bump();
                        args.push(self.parse_or()?);
                    }
                }
                self.expect(&Token::CloseParen)?;
                Ok(Expr::Call(name, args))
            }
            Some(_) => self.parse_path().map(Expr::Path),
            None => Err("unexpected end of expression".to_owned()),
        }
    }

    fn parse_path(&mut self) -> Result<PathExpr, String> {
        let mut steps = Vec::new();
        let is_absolute = match self.peek() {
            Some(Token::Slash) => {
                self.bump();
                if !self.at_step_start() {
                    return Ok(PathExpr {
                        is_absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.bump();
                steps.push(descendant_or_self());
                true
            }
            _ => false,
        };
        steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.bump();
                }
                Some(Token::DoubleSlash) => {
                    self.bump();
                    steps.push(descendant_or_self());
                }
                _ => break,
            }
            steps.push(self.parse_step()?);
        }
        Ok(PathExpr { is_absolute, steps })
    }

    fn at_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Dot
                    | Token::DotDot
                    | Token::At
                    | Token::Star
                    | Token::Name(_)
                    | Token::AxisName(_)
                    | Token::Function(_)
            )
        )
    }

    fn parse_step(&mut self) -> Result<Step, String> {
        let axis = match self.peek().cloned() {
            Some(Token::Dot) => {
                self.bump();
                return Ok(Step {
                    axis: Axis::SelfAxis,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            Some(Token::DotDot) => {
                self.bump();
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            Some(Token::At) => {
                self.bump();
                Axis::Attribute
            }
            Some(Token::AxisName(name)) => {
                self.bump();
                Axis::from_name(&name).ok_or_else(|| format!("unsupported axis `{name}`"))?
            }
            _ => Axis::Child,
        };
        let test = match self.bump() {
            Some(Token::Star) => NodeTest::Wildcard,
            Some(Token::Name(name)) => NodeTest::Name(name.to_ascii_lowercase()),
            Some(Token::Function(name)) if name == "node" => {
                self.expect(&Token::CloseParen)?;
                NodeTest::Node
            }
            Some(Token::Function(name)) if name == "text" => {
                self.expect(&Token::CloseParen)?;
                NodeTest::Text
            }
            Some(token) => return Err(format!("expected a node test, found {token:?}")),
            None => return Err("expected a node test".to_owned()),
        };
        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::OpenBracket) {
            self.bump();
            predicates.push(self.parse_or()?);
            self.expect(&Token::CloseBracket)?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }
}

fn descendant_or_self() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::Node,
        predicates: Vec::new(),
    }
}

fn parse(expression: &str) -> Result<Expr, String> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err("empty expression".to_owned());
    }
    let mut parser = Parser { tokens, index: 0 };
    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(format!("unexpected trailing token {token:?}"));
    }
    Ok(expr)
}

#[derive(Clone, Debug)]
enum Value {
    Nodes(Vec<NodeKey>),
    /// Values of selected attributes.
    Attributes(Vec<String>),
    Text(String),
    Number(f64),
    Bool(bool),
}

#[derive(Clone, Copy)]
struct Context {
    node: NodeKey,
    position: usize,
    size: usize,
}

struct Evaluator<'doc> {
    document: &'doc Document,
    order: HashMap<NodeKey, usize>,
}

impl Evaluator<'_> {
    fn string_value(&self, node: NodeKey) -> String {
        self.document.text_content(node)
    }

    fn to_text(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|&node| self.string_value(node))
                .unwrap_or_default(),
            Value::Attributes(values) => values.first().cloned().unwrap_or_default(),
            Value::Text(text) => text.clone(),
            Value::Number(number) => format_number(*number),
            Value::Bool(flag) => flag.to_string(),
        }
    }

    fn to_number(&self, value: &Value) -> f64 {
        match value {
            Value::Number(number) => *number,
            Value::Bool(flag) => f64::from(u8::from(*flag)),
            Value::Nodes(_) | Value::Attributes(_) | Value::Text(_) => {
                self.to_text(value).trim().parse::<f64>().unwrap_or(f64::NAN)
            }
        }
    }

    fn to_bool(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Attributes(values) => !values.is_empty(),
            Value::Text(text) => !text.is_empty(),
            Value::Number(number) => *number != 0.0 && !number.is_nan(),
            Value::Bool(flag) => *flag,
        }
    }

    /// String values of each member when `value` is a set.
    fn members(&self, value: &Value) -> Option<Vec<String>> {
        match value {
            Value::Nodes(nodes) => Some(
                nodes
                    .iter()
                    .map(|&node| self.string_value(node))
                    .collect(),
            ),
            Value::Attributes(values) => Some(values.clone()),
            Value::Text(_) | Value::Number(_) | Value::Bool(_) => None,
        }
    }

    fn compare(&self, left: &Value, operator: CompareOp, right: &Value) -> bool {
        let left_items = self.members(left);
        let right_items = self.members(right);
        match (left_items, right_items) {
            (Some(lefts), Some(rights)) => lefts.iter().any(|left_text| {
                rights
                    .iter()
                    .any(|right_text| compare_scalars(left_text, operator, right_text, false))
            }),
            (Some(lefts), None) => {
                let numeric = matches!(right, Value::Number(_));
                let right_text = self.to_text(right);
                if let Value::Bool(flag) = right {
                    return compare_bools(!lefts.is_empty(), operator, *flag);
                }
                lefts
                    .iter()
                    .any(|left_text| compare_scalars(left_text, operator, &right_text, numeric))
            }
            (None, Some(rights)) => {
                let numeric = matches!(left, Value::Number(_));
                let left_text = self.to_text(left);
                if let Value::Bool(flag) = left {
                    return compare_bools(*flag, operator, !rights.is_empty());
                }
                rights
                    .iter()
                    .any(|right_text| compare_scalars(&left_text, operator, right_text, numeric))
            }
            (None, None) => {
                if let (Value::Bool(_), _) | (_, Value::Bool(_)) = (left, right) {
                    return compare_bools(self.to_bool(left), operator, self.to_bool(right));
                }
                let numeric = matches!(left, Value::Number(_)) || matches!(right, Value::Number(_));
                compare_scalars(&self.to_text(left), operator, &self.to_text(right), numeric)
            }
        }
    }

    fn evaluate(&self, expr: &Expr, context: Context) -> Result<Value, String> {
        match expr {
            Expr::Or(left, right) => Ok(Value::Bool(
                self.to_bool(&self.evaluate(left, context)?)
                    || self.to_bool(&self.evaluate(right, context)?),
            )),
            Expr::And(left, right) => Ok(Value::Bool(
                self.to_bool(&self.evaluate(left, context)?)
                    && self.to_bool(&self.evaluate(right, context)?),
            )),
            Expr::Compare(left, operator, right) => {
                let left_value = self.evaluate(left, context)?;
                let right_value = self.evaluate(right, context)?;
                Ok(Value::Bool(self.compare(&left_value, *operator, &right_value)))
            }
            Expr::Union(parts) => {
                let mut nodes = Vec::new();
                for part in parts {
                    match self.evaluate(part, context)? {
                        Value::Nodes(found) => nodes.extend(found),
                        _ => return Err("union operands must be node-sets".to_owned()),
                    }
                }
                Ok(Value::Nodes(self.in_document_order(nodes)))
            }
            Expr::Path(path) => self.evaluate_path(path, context),
            Expr::Literal(text) => Ok(Value::Text(text.clone())),
            Expr::Number(number) => Ok(Value::Number(*number)),
            Expr::Call(name, args) => self.call(name, args, context),
        }
    }

    fn call(&self, name: &str, args: &[Expr], context: Context) -> Result<Value, String> {
        let values = args
            .iter()
            .map(|arg| self.evaluate(arg, context))
            .collect::<Result<Vec<_>, _>>()?;
        let text_arg = |index: usize| {
            values
                .get(index)
                .map_or_else(|| self.string_value(context.node), |value| self.to_text(value))
        };
        let value = match (name, values.len()) {
            ("position", 0) => Value::Number(context.position as f64),
            ("last", 0) => Value::Number(context.size as f64),
            ("true", 0) => Value::Bool(true),
            ("false", 0) => Value::Bool(false),
            ("not", 1) => Value::Bool(!values.first().is_some_and(|value| self.to_bool(value))),
            ("count", 1) => match values.first() {
                Some(Value::Nodes(nodes)) => Value::Number(nodes.len() as f64),
                Some(Value::Attributes(items)) => Value::Number(items.len() as f64),
                _ => return Err("count() expects a node-set".to_owned()),
            },
            ("string", 0 | 1) => Value::Text(text_arg(0)),
            ("string-length", 0 | 1) => Value::Number(text_arg(0).chars().count() as f64),
            ("normalize-space", 0 | 1) => Value::Text(
                text_arg(0)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            ("contains", 2) => Value::Bool(text_arg(0).contains(&text_arg(1))),
            ("starts-with", 2) => Value::Bool(text_arg(0).starts_with(&text_arg(1))),
            _ => {
                return Err(format!(
                    "unsupported function {name}() with {} arguments",
                    values.len()
                ));
            }
        };
        Ok(value)
    }

    fn evaluate_path(&self, path: &PathExpr, context: Context) -> Result<Value, String> {
        let mut current = vec![if path.is_absolute {
            NodeKey::ROOT
        } else {
            context.node
        }];
        let last_index = path.steps.len().saturating_sub(1);
        for (index, step) in path.steps.iter().enumerate() {
            if step.axis == Axis::Attribute {
                if index != last_index {
                    return Err("attribute steps must end the path".to_owned());
                }
                return Ok(Value::Attributes(self.select_attributes(&current, &step.test)));
            }
            let mut next = Vec::new();
            for &node in &current {
                let mut candidates: Vec<NodeKey> = self
                    .axis_nodes(node, step.axis)
                    .into_iter()
                    .filter(|&candidate| self.passes_test(candidate, &step.test))
                    .collect();
                for predicate in &step.predicates {
                    candidates = self.filter_by_predicate(candidates, predicate)?;
                }
                next.extend(candidates);
            }
            current = self.in_document_order(next);
        }
        Ok(Value::Nodes(current))
    }

    fn filter_by_predicate(
        &self,
        candidates: Vec<NodeKey>,
        predicate: &Expr,
    ) -> Result<Vec<NodeKey>, String> {
        let size = candidates.len();
        let mut kept = Vec::new();
        for (offset, node) in candidates.into_iter().enumerate() {
            let inner = Context {
                node,
                position: offset.saturating_add(1),
                size,
            };
            let keep = match self.evaluate(predicate, inner)? {
                Value::Number(number) => (number - inner.position as f64).abs() < f64::EPSILON,
                other => self.to_bool(&other),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    fn select_attributes(&self, nodes: &[NodeKey], test: &NodeTest) -> Vec<String> {
        let mut values = Vec::new();
        for &node in nodes {
            for (name, value) in self.document.attributes(node) {
                let wanted = match test {
                    NodeTest::Name(expected) => name == *expected,
                    NodeTest::Wildcard | NodeTest::Node => true,
                    NodeTest::Text => false,
                };
                if wanted {
                    values.push(value);
                }
            }
        }
        values
    }

    fn passes_test(&self, node: NodeKey, test: &NodeTest) -> bool {
        let Some(data) = self.document.node(node) else {
            return false;
        };
        match (test, &data.kind) {
            (NodeTest::Node, _) => true,
            (NodeTest::Text, NodeKind::Text { .. }) => true,
            (NodeTest::Wildcard, NodeKind::Element { .. }) => true,
            (NodeTest::Name(expected), NodeKind::Element { tag }) => tag == expected,
            _ => false,
        }
    }

    /// Nodes along `axis` from `node`, in axis order (reverse axes nearest first).
    fn axis_nodes(&self, node: NodeKey, axis: Axis) -> Vec<NodeKey> {
        let Some(id) = self.document.node_id(node) else {
            return Vec::new();
        };
        let arena = &self.document.arena;
        let ids: Vec<NodeId> = match axis {
            Axis::Child => id.children(arena).collect(),
            Axis::Descendant => id.descendants(arena).skip(1).collect(),
            Axis::DescendantOrSelf => id.descendants(arena).collect(),
            Axis::Parent => id.ancestors(arena).skip(1).take(1).collect(),
            Axis::Ancestor => id.ancestors(arena).skip(1).collect(),
            Axis::AncestorOrSelf => id.ancestors(arena).collect(),
            Axis::FollowingSibling => id.following_siblings(arena).skip(1).collect(),
            Axis::PrecedingSibling => id.preceding_siblings(arena).skip(1).collect(),
            Axis::SelfAxis => vec![id],
            Axis::Attribute => Vec::new(),
        };
        ids.into_iter()
            .filter_map(|child| self.document.key_of(child))
            .collect()
    }

    fn in_document_order(&self, mut nodes: Vec<NodeKey>) -> Vec<NodeKey> {
        nodes.sort_by_key(|node| (self.order.get(node).copied().unwrap_or(usize::MAX), *node));
        nodes.dedup();
        nodes
    }
}

fn compare_scalars(left: &str, operator: CompareOp, right: &str, numeric: bool) -> bool {
    let relational = !matches!(operator, CompareOp::Equal | CompareOp::NotEqual);
    if numeric || relational {
        let left_number = left.trim().parse::<f64>().unwrap_or(f64::NAN);
        let right_number = right.trim().parse::<f64>().unwrap_or(f64::NAN);
        return match operator {
            CompareOp::Equal => (left_number - right_number).abs() < f64::EPSILON,
            CompareOp::NotEqual => (left_number - right_number).abs() >= f64::EPSILON
                || left_number.is_nan()
                || right_number.is_nan(),
            CompareOp::Less => left_number < right_number,
            CompareOp::LessOrEqual => left_number <= right_number,
            CompareOp::Greater => left_number > right_number,
            CompareOp::GreaterOrEqual => left_number >= right_number,
        };
    }
    match operator {
        CompareOp::NotEqual => left != right,
        _ => left == right,
    }
}

fn compare_bools(left: bool, operator: CompareOp, right: bool) -> bool {
    match operator {
        CompareOp::Equal => left == right,
        CompareOp::NotEqual => left != right,
        CompareOp::Less => !left & right,
        CompareOp::LessOrEqual => left <= right,
        CompareOp::Greater => left & !right,
        CompareOp::GreaterOrEqual => left >= right,
    }
}

fn format_number(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_owned()
    } else if number.fract() == 0.0 && number.is_finite() {
        format!("{number:.0}")
    } else {
        number.to_string()
    }
}

/// Evaluate `expression` with `context` as the context node and return the selected nodes in
/// document order.
pub(crate) fn evaluate(
    document: &Document,
    context: NodeKey,
    expression: &str,
) -> Result<Vec<NodeKey>, String> {
    let expr = parse(expression)?;
    let order = document
        .root
        .descendants(&document.arena)
        .filter_map(|id| document.key_of(id))
        .enumerate()
        .map(|(index, key)| (key, index))
        .collect();
    let evaluator = Evaluator { document, order };
    let start = Context {
        node: context,
        position: 1,
        size: 1,
    };
    match evaluator.evaluate(&expr, start)? {
        Value::Nodes(nodes) => Ok(nodes),
        _ => Err(format!("`{expression}` does not select nodes")),
    }
}
