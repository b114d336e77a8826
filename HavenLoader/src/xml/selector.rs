//! XPath-subset selectors
//!
//! Supports the location paths mod authors write in patch files and the
//! fixed expressions used by the merge and texture passes:
//!
//! - absolute and relative paths: `/data/Item`, `Item/stats`
//! - descendants: `//re`, `regions//re`
//! - wildcards and shortcuts: `*`, `.`, `..`
//! - top-level unions: `//t | //re`
//! - predicates with `@attr`, `@*`, literals, numbers, relative paths,
//!   `= != < <= > >=`, `and`, `or`, and the functions `last()`,
//!   `position()`, `count()`, `not()`, `contains()`, `starts-with()`,
//!   `text()`, `true()`, `false()`
//!
//! Positional predicates are evaluated per parent, as in XPath step
//! semantics: `//re[last()]` is the last `re` child of each parent.

use std::fmt;

use super::document::{NodeId, XmlDocument};
use crate::error::{Error, Result};

/// A parsed selector expression.
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    expr: Expr,
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Selector {
    /// Parse an expression.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSelector`] on syntax errors.
    pub fn parse(source: &str) -> Result<Selector> {
        let invalid = |message: String| Error::InvalidSelector {
            selector: source.to_string(),
            message,
        };
        let tokens = tokenize(source).map_err(invalid)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_expr().map_err(invalid)?;
        if let Some(tok) = parser.peek() {
            return Err(invalid(format!("unexpected token {tok:?}")));
        }
        Ok(Selector {
            source: source.trim().to_string(),
            expr,
        })
    }

    /// Evaluate against `doc` starting at `context`.
    ///
    /// Returns matching elements in document order, without duplicates.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSelector`] if the expression does not select nodes.
    pub fn select(&self, doc: &XmlDocument, context: NodeId) -> Result<Vec<NodeId>> {
        let eval = Evaluator::new(doc);
        match eval.eval(&self.expr, Context::single(context)) {
            Value::Nodes(nodes) => Ok(nodes.into_iter().filter(|&n| doc.is_element(n)).collect()),
            _ => Err(Error::InvalidSelector {
                selector: self.source.clone(),
                message: "expression does not select elements".to_string(),
            }),
        }
    }
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Pipe,
    Dot,
    DotDot,
    Star,
    Cmp(CmpOp),
    Literal(String),
    Number(f64),
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn tokenize(source: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            _ if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '@' => {
                tokens.push(Token::At);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Cmp(CmpOp::Eq));
                i += 1;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Cmp(CmpOp::Ne));
                i += 2;
            }
            '<' | '>' => {
                let (op, len) = match (c, next) {
                    ('<', Some('=')) => (CmpOp::Le, 2),
                    ('<', _) => (CmpOp::Lt, 1),
                    (_, Some('=')) => (CmpOp::Ge, 2),
                    _ => (CmpOp::Gt, 1),
                };
                tokens.push(Token::Cmp(op));
                i += len;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| "unterminated string literal".to_string())?;
                tokens.push(Token::Literal(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '.' if next == Some('.') => {
                tokens.push(Token::DotDot);
                i += 2;
            }
            '.' if !next.is_some_and(|n| n.is_ascii_digit()) => {
                tokens.push(Token::Dot);
                i += 1;
            }
            _ if c.is_ascii_digit() || c == '.' || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{text}'"))?;
                tokens.push(Token::Number(value));
            }
            _ if is_name_start(c) => {
                let start = i;
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            _ => return Err(format!("unexpected character '{c}'")),
        }
    }
    Ok(tokens)
}

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone)]
enum Expr {
    Path(LocationPath),
    Literal(String),
    Number(f64),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Function(Function, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Last,
    Position,
    Count,
    Not,
    Contains,
    StartsWith,
    Text,
    True,
    False,
}

impl Function {
    fn lookup(name: &str) -> Option<(Function, usize)> {
        Some(match name {
            "last" => (Function::Last, 0),
            "position" => (Function::Position, 0),
            "count" => (Function::Count, 1),
            "not" => (Function::Not, 1),
            "contains" => (Function::Contains, 2),
            "starts-with" => (Function::StartsWith, 2),
            "text" => (Function::Text, 0),
            "true" => (Function::True, 0),
            "false" => (Function::False, 0),
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
    /// Trailing `@name` / `@*`: the path yields attribute values.
    attribute: Option<NameTest>,
}

#[derive(Debug, Clone)]
struct Step {
    /// Preceded by `//` (descendant-or-self, then child).
    descendant: bool,
    kind: StepKind,
    predicates: Vec<Expr>,
}

#[derive(Debug, Clone)]
enum StepKind {
    Child(NameTest),
    Parent,
    SelfNode,
}

#[derive(Debug, Clone)]
enum NameTest {
    Any,
    Name(String),
}

impl NameTest {
    fn matches(&self, name: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Name(n) => n == name,
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type ParseResult<T> = std::result::Result<T, String>;

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> ParseResult<()> {
        match self.next() {
            Some(ref tok) if tok == expected => Ok(()),
            Some(tok) => Err(format!("expected {expected:?}, found {tok:?}")),
            None => Err(format!("expected {expected:?}, found end of expression")),
        }
    }

    fn peek_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == word)
    }

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.next();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_compare()?;
        while self.peek_keyword("and") {
            self.next();
            let right = self.parse_compare()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_compare(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_union()?;
        while let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.next();
            let right = self.parse_union()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_union(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_primary()?;
        while self.peek() == Some(&Token::Pipe) {
            self.next();
            let right = self.parse_primary()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            Some(Token::Literal(s)) => {
                let s = s.clone();
                self.next();
                Ok(Expr::Literal(s))
            }
            Some(Token::Number(n)) => {
                let n = *n;
                self.next();
                Ok(Expr::Number(n))
            }
            Some(Token::LParen) => {
                self.next();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::LParen) => {
                let name = name.clone();
                self.parse_function(&name)
            }
            Some(_) => Ok(Expr::Path(self.parse_path()?)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn parse_function(&mut self, name: &str) -> ParseResult<Expr> {
        let (function, arity) =
            Function::lookup(name).ok_or_else(|| format!("unknown function '{name}()'"))?;
        self.next();
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            args.push(self.parse_expr()?);
            while self.peek() == Some(&Token::Comma) {
                self.next();
                args.push(self.parse_expr()?);
            }
        }
        self.expect(&Token::RParen)?;
        if args.len() != arity {
            return Err(format!(
                "{name}() takes {arity} argument(s), {} given",
                args.len()
            ));
        }
        Ok(Expr::Function(function, args))
    }

    fn parse_path(&mut self) -> ParseResult<LocationPath> {
        let mut path = LocationPath {
            absolute: false,
            steps: Vec::new(),
            attribute: None,
        };
        let mut descendant = false;
        match self.peek() {
            Some(Token::Slash) => {
                self.next();
                path.absolute = true;
                if !self.starts_step() {
                    return Ok(path);
                }
            }
            Some(Token::DoubleSlash) => {
                self.next();
                path.absolute = true;
                descendant = true;
            }
            _ => {}
        }

        loop {
            if self.peek() == Some(&Token::At) {
                self.next();
                path.attribute = Some(self.parse_name_test()?);
                return Ok(path);
            }
            let step = self.parse_step(descendant)?;
            path.steps.push(step);
            match self.peek() {
                Some(Token::Slash) => {
                    self.next();
                    descendant = false;
                }
                Some(Token::DoubleSlash) => {
                    self.next();
                    descendant = true;
                }
                _ => return Ok(path),
            }
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::Dot | Token::DotDot | Token::At)
        )
    }

    fn parse_name_test(&mut self) -> ParseResult<NameTest> {
        match self.next() {
            Some(Token::Star) => Ok(NameTest::Any),
            Some(Token::Name(n)) => Ok(NameTest::Name(n)),
            Some(tok) => Err(format!("expected a name, found {tok:?}")),
            None => Err("expected a name, found end of expression".to_string()),
        }
    }

    fn parse_step(&mut self, descendant: bool) -> ParseResult<Step> {
        let kind = match self.peek() {
            Some(Token::Dot) => {
                self.next();
                StepKind::SelfNode
            }
            Some(Token::DotDot) => {
                self.next();
                StepKind::Parent
            }
            _ => StepKind::Child(self.parse_name_test()?),
        };
        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.next();
            predicates.push(self.parse_expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(Step {
            descendant,
            kind,
            predicates,
        })
    }
}

// ============================================================================
// Evaluation
// ============================================================================

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<NodeId>),
    /// Attribute values (a node-set of attributes, flattened to strings).
    Strings(Vec<String>),
    Str(String),
    Num(f64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy)]
struct Context {
    node: NodeId,
    position: usize,
    size: usize,
}

impl Context {
    fn single(node: NodeId) -> Self {
        Self {
            node,
            position: 1,
            size: 1,
        }
    }
}

struct Evaluator<'a> {
    doc: &'a XmlDocument,
    order: Vec<usize>,
}

impl<'a> Evaluator<'a> {
    fn new(doc: &'a XmlDocument) -> Self {
        Self {
            doc,
            order: doc.document_order(),
        }
    }

    fn sort_unique(&self, nodes: &mut Vec<NodeId>) {
        nodes.sort_by_key(|n| self.order[n.index()]);
        nodes.dedup();
    }

    fn eval(&self, expr: &Expr, ctx: Context) -> Value {
        match expr {
            Expr::Literal(s) => Value::Str(s.clone()),
            Expr::Number(n) => Value::Num(*n),
            Expr::Path(path) => self.eval_path(path, ctx.node),
            Expr::Or(a, b) => Value::Bool(
                self.to_bool(&self.eval(a, ctx)) || self.to_bool(&self.eval(b, ctx)),
            ),
            Expr::And(a, b) => Value::Bool(
                self.to_bool(&self.eval(a, ctx)) && self.to_bool(&self.eval(b, ctx)),
            ),
            Expr::Compare(op, a, b) => {
                Value::Bool(self.compare(*op, &self.eval(a, ctx), &self.eval(b, ctx)))
            }
            Expr::Union(a, b) => match (self.eval(a, ctx), self.eval(b, ctx)) {
                (Value::Nodes(mut x), Value::Nodes(y)) => {
                    x.extend(y);
                    self.sort_unique(&mut x);
                    Value::Nodes(x)
                }
                (x, y) => {
                    let mut strings = self.strings(&x);
                    strings.extend(self.strings(&y));
                    Value::Strings(strings)
                }
            },
            Expr::Function(function, args) => self.eval_function(*function, args, ctx),
        }
    }

    fn eval_function(&self, function: Function, args: &[Expr], ctx: Context) -> Value {
        match function {
            Function::Last => Value::Num(ctx.size as f64),
            Function::Position => Value::Num(ctx.position as f64),
            Function::True => Value::Bool(true),
            Function::False => Value::Bool(false),
            Function::Text => Value::Str(self.doc.text(ctx.node).unwrap_or_default()),
            Function::Count => {
                let count = match self.eval(&args[0], ctx) {
                    Value::Nodes(n) => n.len(),
                    Value::Strings(s) => s.len(),
                    _ => 0,
                };
                Value::Num(count as f64)
            }
            Function::Not => Value::Bool(!self.to_bool(&self.eval(&args[0], ctx))),
            Function::Contains | Function::StartsWith => {
                let haystack = self.to_string(&self.eval(&args[0], ctx));
                let needle = self.to_string(&self.eval(&args[1], ctx));
                Value::Bool(if function == Function::Contains {
                    haystack.contains(&needle)
                } else {
                    haystack.starts_with(&needle)
                })
            }
        }
    }

    fn eval_path(&self, path: &LocationPath, context: NodeId) -> Value {
        let mut current = if path.absolute {
            vec![self.doc.document_node()]
        } else {
            vec![context]
        };
        for step in &path.steps {
            current = self.eval_step(step, &current);
        }
        match &path.attribute {
            None => Value::Nodes(current),
            Some(test) => {
                let mut values = Vec::new();
                for node in current {
                    if let Some(element) = self.doc.element(node) {
                        values.extend(
                            element
                                .attributes
                                .iter()
                                .filter(|(k, _)| test.matches(k))
                                .map(|(_, v)| v.clone()),
                        );
                    }
                }
                Value::Strings(values)
            }
        }
    }

    fn eval_step(&self, step: &Step, context: &[NodeId]) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &node in context {
            let origins = if step.descendant {
                self.doc.descendants(node)
            } else {
                vec![node]
            };
            for origin in origins {
                let candidates: Vec<NodeId> = match &step.kind {
                    StepKind::Child(test) => self
                        .doc
                        .element_children(origin)
                        .filter(|&c| self.doc.name(c).is_some_and(|n| test.matches(n)))
                        .collect(),
                    StepKind::Parent => self.doc.parent(origin).into_iter().collect(),
                    StepKind::SelfNode => vec![origin],
                };
                out.extend(self.filter(candidates, &step.predicates));
            }
        }
        self.sort_unique(&mut out);
        out
    }

    fn filter(&self, mut nodes: Vec<NodeId>, predicates: &[Expr]) -> Vec<NodeId> {
        for predicate in predicates {
            let size = nodes.len();
            nodes = nodes
                .into_iter()
                .enumerate()
                .filter(|&(i, node)| {
                    let ctx = Context {
                        node,
                        position: i + 1,
                        size,
                    };
                    match self.eval(predicate, ctx) {
                        Value::Num(n) => (n - (i + 1) as f64).abs() < f64::EPSILON,
                        other => self.to_bool(&other),
                    }
                })
                .map(|(_, node)| node)
                .collect();
        }
        nodes
    }

    // ==================== Conversions ====================

    fn strings(&self, value: &Value) -> Vec<String> {
        match value {
            Value::Nodes(nodes) => nodes.iter().map(|&n| self.doc.string_value(n)).collect(),
            Value::Strings(s) => s.clone(),
            other => vec![self.to_string(other)],
        }
    }

    fn to_bool(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(n) => !n.is_empty(),
            Value::Strings(s) => !s.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    fn to_string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(_) | Value::Strings(_) => {
                self.strings(value).into_iter().next().unwrap_or_default()
            }
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn compare(&self, op: CmpOp, left: &Value, right: &Value) -> bool {
        let is_set = |v: &Value| matches!(v, Value::Nodes(_) | Value::Strings(_));
        match (left, right) {
            (Value::Bool(_), _) | (_, Value::Bool(_)) => {
                let (a, b) = (self.to_bool(left), self.to_bool(right));
                compare_numbers(op, f64::from(u8::from(a)), f64::from(u8::from(b)))
            }
            _ if is_set(left) && is_set(right) => {
                let rights = self.strings(right);
                self.strings(left)
                    .iter()
                    .any(|l| rights.iter().any(|r| compare_strings(op, l, r)))
            }
            _ if is_set(left) => self
                .strings(left)
                .iter()
                .any(|l| compare_atoms(op, &Value::Str(l.clone()), right)),
            _ if is_set(right) => self
                .strings(right)
                .iter()
                .any(|r| compare_atoms(op, left, &Value::Str(r.clone()))),
            _ => compare_atoms(op, left, right),
        }
    }
}

fn parse_number(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn compare_numbers(op: CmpOp, a: f64, b: f64) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

fn compare_strings(op: CmpOp, a: &str, b: &str) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        _ => compare_numbers(op, parse_number(a), parse_number(b)),
    }
}

/// Compare two scalar values (strings or numbers).
fn compare_atoms(op: CmpOp, left: &Value, right: &Value) -> bool {
    let number = |v: &Value| match v {
        Value::Num(n) => *n,
        Value::Str(s) => parse_number(s),
        _ => f64::NAN,
    };
    let text = |v: &Value| match v {
        Value::Str(s) => s.clone(),
        Value::Num(n) => format_number(*n),
        _ => String::new(),
    };
    let numeric = matches!(left, Value::Num(_)) || matches!(right, Value::Num(_));
    match op {
        CmpOp::Eq | CmpOp::Ne if !numeric => compare_strings(op, &text(left), &text(right)),
        _ => compare_numbers(op, number(left), number(right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"
        <data>
            <Item mid="1" name="Pipe"><stats hp="10"/></Item>
            <Item mid="2" name="Bolt"><stats hp="20"/></Item>
            <Item mid="3"><label>Cable</label></Item>
            <Monster cid="7"/>
        </data>"#;

    fn names(doc: &XmlDocument, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .map(|&n| {
                doc.attribute(n, "mid")
                    .or_else(|| doc.attribute(n, "hp"))
                    .unwrap_or_else(|| doc.name(n).unwrap())
                    .to_string()
            })
            .collect()
    }

    fn select(doc: &XmlDocument, expr: &str) -> Vec<String> {
        names(doc, &doc.select(expr).unwrap())
    }

    #[test]
    fn test_absolute_and_descendant_paths() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert_eq!(select(&doc, "/data/Item"), ["1", "2", "3"]);
        assert_eq!(select(&doc, "//stats"), ["10", "20"]);
        assert_eq!(select(&doc, "/data//stats"), ["10", "20"]);
        assert_eq!(select(&doc, "/data/*[@cid]"), ["Monster"]);
        assert!(select(&doc, "/nothing/here").is_empty());
    }

    #[test]
    fn test_attribute_predicates() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert_eq!(select(&doc, "/data/Item[@mid='2']"), ["2"]);
        assert_eq!(select(&doc, r#"/data/Item[@mid="2"]/stats"#), ["20"]);
        assert_eq!(select(&doc, "//Item[@name]"), ["1", "2"]);
        assert_eq!(select(&doc, "//Item[@mid != '1' and @name]"), ["2"]);
        assert_eq!(select(&doc, "//Item[@mid='1' or @mid='3']"), ["1", "3"]);
        assert_eq!(select(&doc, "//Item[not(@name)]"), ["3"]);
        assert_eq!(select(&doc, "//Item[@mid | @cid]"), ["1", "2", "3"]);
        assert_eq!(select(&doc, "//stats[@hp > 15]"), ["20"]);
    }

    #[test]
    fn test_positional_predicates() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert_eq!(select(&doc, "/data/Item[last()]"), ["3"]);
        assert_eq!(select(&doc, "/data/Item[2]"), ["2"]);
        assert_eq!(select(&doc, "/data/Item[@name][last()]"), ["2"]);
        assert_eq!(select(&doc, "/data/Item[position() < 3]"), ["1", "2"]);
    }

    #[test]
    fn test_child_text_and_functions() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert_eq!(select(&doc, "//Item[label='Cable']"), ["3"]);
        assert_eq!(select(&doc, "//label[text()='Cable']/.."), ["3"]);
        assert_eq!(select(&doc, "//Item[contains(@name, 'ol')]"), ["2"]);
        assert_eq!(select(&doc, "//Item[starts-with(@name, 'P')]"), ["1"]);
        assert_eq!(select(&doc, "/data[count(Item) = 3]"), ["data"]);
    }

    #[test]
    fn test_union_and_parent() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert_eq!(select(&doc, "//Monster | //Item[@mid='1']"), ["1", "Monster"]);
        assert_eq!(select(&doc, "//stats[@hp='10']/.."), ["1"]);
        assert_eq!(select(&doc, "//stats/./.."), ["1", "2"]);
    }

    #[test]
    fn test_relative_from_context() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        let item = doc.select_first("/data/Item[@mid='2']").unwrap().unwrap();
        let selector = Selector::parse("stats").unwrap();
        let found = selector.select(&doc, item).unwrap();
        assert_eq!(names(&doc, &found), ["20"]);
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(Selector::parse("/data/Item[").is_err());
        assert!(Selector::parse("/data/Item[@mid='1]").is_err());
        assert!(Selector::parse("frobnicate()").is_err());
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert!(doc.select("'just a string'").is_err());
    }
}
