//! Parsing of the expression language used in `{{ .. }}` and in statement
//! arguments.
//!
//! The parser is a recursive descent parser with one function per precedence
//! level, from `parse_cond` (lowest) down to `parse_primary`.

use crate::types::ast;
use crate::types::span::Span;
use crate::{Error, Result, Value};

/// Parse an expression spanning `span` in `source`.
pub fn parse(source: &str, span: Span) -> Result<ast::Expr> {
    let mut parser = Parser::new(source, span)?;
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse the argument of a `for` statement, `<var>[, <var>...] in <expr>`.
pub fn parse_for(source: &str, span: Span) -> Result<(Vec<ast::Ident>, ast::Expr)> {
    let mut parser = Parser::new(source, span)?;
    let parens = parser.eat_punct("(");
    let mut vars = vec![parser.expect_ident()?];
    while parser.eat_punct(",") {
        if parens && parser.is_punct(")") {
            break;
        }
        vars.push(parser.expect_ident()?);
    }
    if parens {
        parser.expect_punct(")")?;
    }
    parser.expect_keyword("in")?;
    let iterable = parser.parse_expr()?;
    parser.expect_end()?;
    Ok((vars, iterable))
}

/// Returns whether `s` is a valid identifier.
pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_continue),
        _ => false,
    }
}

/// The maximum depth of a parsed expression tree.
const MAX_DEPTH: usize = 128;

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "if", "else", "lambda", "True", "False", "None",
];

const PUNCTS: &[&str] = &[
    "**", "//", "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "<", ">", "(", ")", "[", "]",
    "{", "}", ",", ":", ".",
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Keyword(&'static str),
    Punct(&'static str),
    Integer(i64),
    Float(f64),
    String(String),
}

struct Parser<'source> {
    source: &'source str,
    tokens: Vec<(Token, Span)>,
    cursor: usize,
    /// The depth of the expression tree at the cursor.
    depth: usize,
    /// The end of the expression, used to point at unexpected ends.
    end: Span,
}

impl<'source> Parser<'source> {
    fn new(source: &'source str, span: Span) -> Result<Self> {
        let tokens = tokenize(source, span)?;
        Ok(Self {
            source,
            tokens,
            cursor: 0,
            depth: 0,
            end: Span::from(span.n..span.n),
        })
    }

    fn parse_expr(&mut self) -> Result<ast::Expr> {
        self.nested(|p| {
            p.descend()?;
            p.parse_cond()
        })
    }

    /// Runs `f` and restores the depth afterwards.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let depth = self.depth;
        let result = f(self);
        self.depth = depth;
        result
    }

    /// Goes one level deeper into the expression tree.
    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let span = self.peek().map_or(self.end, |(_, span)| span);
            return Err(Error::syntax(
                "expression is nested too deeply",
                self.source,
                span,
            ));
        }
        Ok(())
    }

    fn parse_cond(&mut self) -> Result<ast::Expr> {
        let then = self.parse_or()?;
        if !self.eat_keyword("if") {
            return Ok(then);
        }
        let cond = self.parse_or()?;
        self.expect_keyword("else")?;
        let otherwise = self.parse_expr()?;
        let span = then.span().combine(otherwise.span());
        Ok(ast::Expr::Cond(Box::new(ast::Cond {
            cond,
            then,
            otherwise,
            span,
        })))
    }

    fn parse_or(&mut self) -> Result<ast::Expr> {
        self.nested(|p| {
            let mut lhs = p.parse_and()?;
            while p.eat_keyword("or") {
                p.descend()?;
                let rhs = p.parse_and()?;
                lhs = logical(ast::LogicalOp::Or, lhs, rhs);
            }
            Ok(lhs)
        })
    }

    fn parse_and(&mut self) -> Result<ast::Expr> {
        self.nested(|p| {
            let mut lhs = p.parse_not()?;
            while p.eat_keyword("and") {
                p.descend()?;
                let rhs = p.parse_not()?;
                lhs = logical(ast::LogicalOp::And, lhs, rhs);
            }
            Ok(lhs)
        })
    }

    fn parse_not(&mut self) -> Result<ast::Expr> {
        match self.peek() {
            Some((Token::Keyword("not"), span)) => self.nested(|p| {
                p.cursor += 1;
                p.descend()?;
                let expr = p.parse_not()?;
                Ok(unary(ast::UnaryOp::Not, expr, span))
            }),
            _ => self.parse_compare(),
        }
    }

    fn parse_compare(&mut self) -> Result<ast::Expr> {
        let first = self.parse_sum()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some((Token::Punct("=="), _)) => ast::CompareOp::Eq,
                Some((Token::Punct("!="), _)) => ast::CompareOp::Ne,
                Some((Token::Punct("<"), _)) => ast::CompareOp::Lt,
                Some((Token::Punct("<="), _)) => ast::CompareOp::Le,
                Some((Token::Punct(">"), _)) => ast::CompareOp::Gt,
                Some((Token::Punct(">="), _)) => ast::CompareOp::Ge,
                Some((Token::Keyword("in"), _)) => ast::CompareOp::In,
                Some((Token::Keyword("not"), _)) => {
                    // Only `not in` may follow an operand, `not` alone is a
                    // prefix operator.
                    match self.tokens.get(self.cursor + 1) {
                        Some((Token::Keyword("in"), _)) => {
                            self.cursor += 1;
                            ast::CompareOp::NotIn
                        }
                        _ => break,
                    }
                }
                Some((Token::Keyword("is"), _)) => {
                    if let Some((Token::Keyword("not"), _)) = self.tokens.get(self.cursor + 1) {
                        self.cursor += 1;
                        ast::CompareOp::IsNot
                    } else {
                        ast::CompareOp::Is
                    }
                }
                _ => break,
            };
            self.cursor += 1;
            rest.push((op, self.parse_sum()?));
        }
        let span = match rest.last() {
            None => return Ok(first),
            Some((_, last)) => first.span().combine(last.span()),
        };
        Ok(ast::Expr::Compare(Box::new(ast::Compare { first, rest, span })))
    }

    fn parse_sum(&mut self) -> Result<ast::Expr> {
        self.nested(|p| {
            let mut lhs = p.parse_term()?;
            loop {
                let op = match p.peek() {
                    Some((Token::Punct("+"), _)) => ast::BinaryOp::Add,
                    Some((Token::Punct("-"), _)) => ast::BinaryOp::Sub,
                    _ => break,
                };
                p.cursor += 1;
                p.descend()?;
                let rhs = p.parse_term()?;
                lhs = binary(op, lhs, rhs);
            }
            Ok(lhs)
        })
    }

    fn parse_term(&mut self) -> Result<ast::Expr> {
        self.nested(|p| {
            let mut lhs = p.parse_unary()?;
            loop {
                let op = match p.peek() {
                    Some((Token::Punct("*"), _)) => ast::BinaryOp::Mul,
                    Some((Token::Punct("/"), _)) => ast::BinaryOp::Div,
                    Some((Token::Punct("//"), _)) => ast::BinaryOp::FloorDiv,
                    Some((Token::Punct("%"), _)) => ast::BinaryOp::Rem,
                    _ => break,
                };
                p.cursor += 1;
                p.descend()?;
                let rhs = p.parse_unary()?;
                lhs = binary(op, lhs, rhs);
            }
            Ok(lhs)
        })
    }

    fn parse_unary(&mut self) -> Result<ast::Expr> {
        let op = match self.peek() {
            Some((Token::Punct("-"), span)) => (ast::UnaryOp::Neg, span),
            Some((Token::Punct("+"), span)) => (ast::UnaryOp::Pos, span),
            _ => return self.parse_power(),
        };
        self.nested(|p| {
            p.cursor += 1;
            p.descend()?;
            let expr = p.parse_unary()?;
            Ok(unary(op.0, expr, op.1))
        })
    }

    fn parse_power(&mut self) -> Result<ast::Expr> {
        let base = self.parse_postfix()?;
        if self.eat_punct("**") {
            let exp = self.nested(|p| {
                p.descend()?;
                p.parse_unary()
            })?;
            return Ok(binary(ast::BinaryOp::Pow, base, exp));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<ast::Expr> {
        self.nested(Self::parse_postfix_chain)
    }

    fn parse_postfix_chain(&mut self) -> Result<ast::Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(self.peek(), Some((Token::Punct("." | "[" | "("), _))) {
                self.descend()?;
            }
            if self.eat_punct(".") {
                let name = self.expect_ident()?;
                let span = expr.span().combine(name.span);
                expr = ast::Expr::Attr(Box::new(ast::Attr {
                    base: expr,
                    name,
                    span,
                }));
            } else if self.eat_punct("[") {
                expr = self.parse_subscript(expr)?;
            } else if self.eat_punct("(") {
                let (args, end) = self.parse_args()?;
                let span = expr.span().combine(end);
                expr = ast::Expr::Call(Box::new(ast::Call {
                    func: expr,
                    args,
                    span,
                }));
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parses the inside of `[..]` after a value, the `[` is already consumed.
    fn parse_subscript(&mut self, base: ast::Expr) -> Result<ast::Expr> {
        let start = match self.is_punct(":") {
            true => None,
            false => Some(self.parse_expr()?),
        };
        if !self.eat_punct(":") {
            let end = self.expect_punct("]")?;
            let span = base.span().combine(end);
            return match start {
                Some(index) => Ok(ast::Expr::Index(Box::new(ast::Index { base, index, span }))),
                None => Err(self.err_expected("expression")),
            };
        }
        let stop = match self.is_punct("]") {
            true => None,
            false => Some(self.parse_expr()?),
        };
        let end = self.expect_punct("]")?;
        let span = base.span().combine(end);
        Ok(ast::Expr::Slice(Box::new(ast::Slice {
            base,
            start,
            stop,
            span,
        })))
    }

    /// Parses call arguments, the `(` is already consumed. Returns the
    /// arguments and the span of the closing `)`.
    fn parse_args(&mut self) -> Result<(Vec<ast::Arg>, Span)> {
        let mut args = Vec::new();
        loop {
            if let Some(end) = self.eat_punct_span(")") {
                return Ok((args, end));
            }
            let arg = match self.peek() {
                Some((Token::Keyword("lambda"), span)) => {
                    self.cursor += 1;
                    ast::Arg::Lambda(self.parse_lambda(span)?)
                }
                _ => ast::Arg::Expr(self.parse_expr()?),
            };
            args.push(arg);
            if !self.eat_punct(",") {
                let end = self.expect_punct(")")?;
                return Ok((args, end));
            }
        }
    }

    fn parse_lambda(&mut self, begin: Span) -> Result<ast::Lambda> {
        let mut params = Vec::new();
        if !self.is_punct(":") {
            params.push(self.expect_ident()?);
            while self.eat_punct(",") {
                params.push(self.expect_ident()?);
            }
        }
        self.expect_punct(":")?;
        let body = self.parse_expr()?;
        let span = begin.combine(body.span());
        Ok(ast::Lambda { params, body, span })
    }

    fn parse_primary(&mut self) -> Result<ast::Expr> {
        let (tk, span) = match self.tokens.get(self.cursor) {
            Some(next) => next.clone(),
            None => return Err(self.err_expected("expression")),
        };
        self.cursor += 1;
        let literal = |value| Ok(ast::Expr::Literal(ast::Literal { value, span }));
        match tk {
            Token::Integer(i) => literal(Value::Integer(i)),
            Token::Float(f) => literal(Value::Float(f)),
            Token::String(s) => literal(Value::String(s)),
            Token::Keyword("True") => literal(Value::Bool(true)),
            Token::Keyword("False") => literal(Value::Bool(false)),
            Token::Keyword("None") => literal(Value::None),
            Token::Keyword("lambda") => Err(Error::syntax(
                "lambda is only allowed as a function argument",
                self.source,
                span,
            )),
            Token::Ident(name) => Ok(ast::Expr::Var(ast::Ident { name, span })),
            Token::Punct("(") => self.parse_parens(span),
            Token::Punct("[") => {
                let (items, end) = self.parse_items("]")?;
                let span = span.combine(end);
                Ok(ast::Expr::List(ast::List { items, span }))
            }
            Token::Punct("{") => self.parse_map(span),
            tk => Err(Error::syntax(
                format!("unexpected {}", tk.human()),
                self.source,
                span,
            )),
        }
    }

    /// Parses a parenthesized expression or a tuple, which is treated as a
    /// list.
    fn parse_parens(&mut self, begin: Span) -> Result<ast::Expr> {
        if let Some(end) = self.eat_punct_span(")") {
            let span = begin.combine(end);
            return Ok(ast::Expr::List(ast::List {
                items: Vec::new(),
                span,
            }));
        }
        let first = self.parse_expr()?;
        if !self.eat_punct(",") {
            self.expect_punct(")")?;
            return Ok(first);
        }
        let (mut rest, end) = self.parse_items(")")?;
        let mut items = vec![first];
        items.append(&mut rest);
        let span = begin.combine(end);
        Ok(ast::Expr::List(ast::List { items, span }))
    }

    /// Parses comma separated expressions up to and including `close`.
    fn parse_items(&mut self, close: &'static str) -> Result<(Vec<ast::Expr>, Span)> {
        let mut items = Vec::new();
        loop {
            if let Some(end) = self.eat_punct_span(close) {
                return Ok((items, end));
            }
            items.push(self.parse_expr()?);
            if !self.eat_punct(",") {
                let end = self.expect_punct(close)?;
                return Ok((items, end));
            }
        }
    }

    fn parse_map(&mut self, begin: Span) -> Result<ast::Expr> {
        let mut entries = Vec::new();
        loop {
            if let Some(end) = self.eat_punct_span("}") {
                let span = begin.combine(end);
                return Ok(ast::Expr::Map(ast::MapLit { entries, span }));
            }
            let key = self.parse_expr()?;
            self.expect_punct(":")?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            if !self.eat_punct(",") {
                let end = self.expect_punct("}")?;
                let span = begin.combine(end);
                return Ok(ast::Expr::Map(ast::MapLit { entries, span }));
            }
        }
    }

    fn peek(&self) -> Option<(&Token, Span)> {
        self.tokens.get(self.cursor).map(|(tk, span)| (tk, *span))
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Some((Token::Punct(p), _)) if *p == punct)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        self.eat_punct_span(punct).is_some()
    }

    fn eat_punct_span(&mut self, punct: &str) -> Option<Span> {
        match self.peek() {
            Some((Token::Punct(p), span)) if *p == punct => {
                self.cursor += 1;
                Some(span)
            }
            _ => None,
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some((Token::Keyword(k), _)) if *k == keyword => {
                self.cursor += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_punct(&mut self, punct: &'static str) -> Result<Span> {
        self.eat_punct_span(punct)
            .ok_or_else(|| self.err_expected(&format!("`{punct}`")))
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<()> {
        match self.eat_keyword(keyword) {
            true => Ok(()),
            false => Err(self.err_expected(&format!("keyword `{keyword}`"))),
        }
    }

    fn expect_ident(&mut self) -> Result<ast::Ident> {
        match self.tokens.get(self.cursor) {
            Some((Token::Ident(name), span)) => {
                let ident = ast::Ident {
                    name: name.clone(),
                    span: *span,
                };
                self.cursor += 1;
                Ok(ident)
            }
            _ => Err(self.err_expected("identifier")),
        }
    }

    fn expect_end(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some((tk, span)) => Err(Error::syntax(
                format!("unexpected {}", tk.human()),
                self.source,
                span,
            )),
        }
    }

    fn err_expected(&self, what: &str) -> Error {
        match self.peek() {
            Some((tk, span)) => Error::syntax(
                format!("expected {what}, found {}", tk.human()),
                self.source,
                span,
            ),
            None => Error::syntax(
                format!("expected {what}, found end of expression"),
                self.source,
                self.end,
            ),
        }
    }
}

fn logical(op: ast::LogicalOp, lhs: ast::Expr, rhs: ast::Expr) -> ast::Expr {
    let span = lhs.span().combine(rhs.span());
    ast::Expr::Logical(Box::new(ast::Logical { op, lhs, rhs, span }))
}

fn binary(op: ast::BinaryOp, lhs: ast::Expr, rhs: ast::Expr) -> ast::Expr {
    let span = lhs.span().combine(rhs.span());
    ast::Expr::Binary(Box::new(ast::Binary { op, lhs, rhs, span }))
}

fn unary(op: ast::UnaryOp, expr: ast::Expr, begin: Span) -> ast::Expr {
    let span = begin.combine(expr.span());
    ast::Expr::Unary(Box::new(ast::Unary { op, expr, span }))
}

////////////////////////////////////////////////////////////////////////////////
// Tokenizer
////////////////////////////////////////////////////////////////////////////////

fn tokenize(source: &str, span: Span) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut iter = source[span].char_indices().peekable();
    let offset = span.m;

    while let Some((i, c)) = iter.next() {
        let i = offset + i;
        let next = |iter: &mut std::iter::Peekable<std::str::CharIndices<'_>>| {
            iter.peek().map(|(j, _)| offset + j).unwrap_or(span.n)
        };

        if c.is_whitespace() {
            continue;
        }

        if is_ident_start(c) {
            while matches!(iter.peek(), Some(&(_, c)) if is_ident_continue(c)) {
                iter.next();
            }
            let j = next(&mut iter);
            let word = &source[i..j];
            let tk = match KEYWORDS.iter().find(|k| **k == word) {
                Some(k) => Token::Keyword(*k),
                None => Token::Ident(word.to_owned()),
            };
            tokens.push((tk, Span::from(i..j)));
            continue;
        }

        if c.is_ascii_digit() {
            let mut is_float = false;
            while matches!(iter.peek(), Some(&(_, c)) if c.is_ascii_digit() || c == '_') {
                iter.next();
            }
            let mut ahead = iter.clone();
            if let Some((_, '.')) = ahead.next() {
                // `1.` is a float but `1.real` would be attribute access.
                if !matches!(ahead.peek(), Some(&(_, c)) if is_ident_start(c)) {
                    is_float = true;
                    iter.next();
                    while matches!(iter.peek(), Some(&(_, c)) if c.is_ascii_digit() || c == '_')
                    {
                        iter.next();
                    }
                }
            }
            let mut ahead = iter.clone();
            if let Some((_, 'e' | 'E')) = ahead.next() {
                if let Some(&(_, '+' | '-')) = ahead.peek() {
                    ahead.next();
                }
                if matches!(ahead.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
                    is_float = true;
                    iter = ahead;
                    while matches!(iter.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
                        iter.next();
                    }
                }
            }
            let j = next(&mut iter);
            let digits = source[i..j].replace('_', "");
            let span = Span::from(i..j);
            let tk = if is_float {
                digits
                    .parse()
                    .map(Token::Float)
                    .map_err(|_| Error::syntax("invalid float literal", source, span))?
            } else {
                digits
                    .parse()
                    .map(Token::Integer)
                    .map_err(|_| Error::syntax("invalid integer literal", source, span))?
            };
            tokens.push((tk, span));
            continue;
        }

        if c == '"' || c == '\'' {
            let mut value = String::new();
            let mut closed = false;
            while let Some((_, d)) = iter.next() {
                match d {
                    d if d == c => {
                        closed = true;
                        break;
                    }
                    '\\' => match iter.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 'r')) => value.push('\r'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, '0')) => value.push('\0'),
                        Some((_, e @ ('\\' | '\'' | '"'))) => value.push(e),
                        Some((_, e)) => {
                            value.push('\\');
                            value.push(e);
                        }
                        None => break,
                    },
                    d => value.push(d),
                }
            }
            let j = next(&mut iter);
            let span = Span::from(i..j);
            if !closed {
                return Err(Error::syntax("undelimited string", source, span));
            }
            tokens.push((Token::String(value), span));
            continue;
        }

        let rest = &source[i..span.n];
        match PUNCTS.iter().find(|p| rest.starts_with(**p)) {
            Some(p) => {
                for _ in 1..p.len() {
                    iter.next();
                }
                tokens.push((Token::Punct(*p), Span::from(i..i + p.len())));
            }
            None => {
                let span = Span::from(i..i + c.len_utf8());
                return Err(Error::syntax("unexpected character", source, span));
            }
        }
    }

    Ok(tokens)
}

#[cfg(feature = "unicode")]
fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

#[cfg(feature = "unicode")]
fn is_ident_continue(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

#[cfg(not(feature = "unicode"))]
fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

#[cfg(not(feature = "unicode"))]
fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

impl Token {
    fn human(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier `{name}`"),
            Self::Keyword(k) => format!("keyword `{k}`"),
            Self::Punct(p) => format!("`{p}`"),
            Self::Integer(_) => String::from("integer"),
            Self::Float(_) => String::from("float"),
            Self::String(_) => String::from("string"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(source: &str) -> Result<ast::Expr> {
        parse(source, Span::from(0..source.len()))
    }

    #[test]
    fn parse_precedence() {
        let expr = parse_all("1 + 2 * 3").unwrap();
        match expr {
            ast::Expr::Binary(add) => {
                assert_eq!(add.op, ast::BinaryOp::Add);
                assert!(matches!(add.rhs, ast::Expr::Binary(ref mul) if mul.op == ast::BinaryOp::Mul));
            }
            expr => panic!("unexpected expression {expr:?}"),
        }
    }

    #[test]
    fn parse_nested_too_deeply() {
        for source in [
            format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000)),
            format!("{}1", "not ".repeat(10_000)),
            format!("{}1", "-".repeat(10_000)),
            vec!["1"; 10_000].join(" + "),
            vec!["2"; 10_000].join(" ** "),
            format!("x{}", ".y".repeat(10_000)),
        ] {
            let err = parse_all(&source).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::Syntax);
            assert_eq!(err.message(), "expression is nested too deeply");
        }
        let source = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        parse_all(&source).unwrap();
        parse_all(&vec!["1"; 50].join(" + ")).unwrap();
    }

    #[test]
    fn parse_power_binds_tighter_than_negation() {
        let expr = parse_all("-2 ** 2").unwrap();
        match expr {
            ast::Expr::Unary(neg) => {
                assert_eq!(neg.op, ast::UnaryOp::Neg);
                assert!(matches!(neg.expr, ast::Expr::Binary(ref pow) if pow.op == ast::BinaryOp::Pow));
            }
            expr => panic!("unexpected expression {expr:?}"),
        }
    }

    #[test]
    fn parse_chained_compare() {
        let expr = parse_all("a < b <= c not in d").unwrap();
        match expr {
            ast::Expr::Compare(cmp) => {
                let ops: Vec<_> = cmp.rest.iter().map(|(op, _)| *op).collect();
                assert_eq!(
                    ops,
                    [ast::CompareOp::Lt, ast::CompareOp::Le, ast::CompareOp::NotIn]
                );
            }
            expr => panic!("unexpected expression {expr:?}"),
        }
    }

    #[test]
    fn parse_call_with_lambda() {
        let expr = parse_all("map(lambda x, y: x * y, [1, 2], (3, 4))").unwrap();
        match expr {
            ast::Expr::Call(call) => {
                assert_eq!(call.args.len(), 3);
                assert!(matches!(&call.args[0], ast::Arg::Lambda(l) if l.params.len() == 2));
                assert!(matches!(&call.args[2], ast::Arg::Expr(ast::Expr::List(l)) if l.items.len() == 2));
            }
            expr => panic!("unexpected expression {expr:?}"),
        }
    }

    #[test]
    fn parse_spans_are_absolute() {
        let source = "{{ user.name }}";
        let expr = parse(source, Span::from(3..12)).unwrap();
        assert_eq!(expr.span(), Span::from(3..12));
        assert_eq!(&source[expr.span()], "user.name");
    }

    #[test]
    fn parse_literals() {
        let expr = parse_all(r#"{'a': 1.5e3, "b": [True, None, 'x\n']}"#).unwrap();
        assert!(matches!(expr, ast::Expr::Map(ref m) if m.entries.len() == 2));
    }

    #[test]
    fn parse_for_header() {
        let source = "k, v in d.items()";
        let (vars, _) = parse_for(source, Span::from(0..source.len())).unwrap();
        let names: Vec<_> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["k", "v"]);
    }

    #[test]
    fn parse_err_lambda_outside_call() {
        let err = parse_all("lambda x: x").unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "
   |
 1 | lambda x: x
   | ^^^^^^ lambda is only allowed as a function argument
"
        );
    }

    #[test]
    fn parse_err_trailing_tokens() {
        let err = parse_all("a b").unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "
   |
 1 | a b
   |   ^ unexpected identifier `b`
"
        );
    }

    #[test]
    fn parse_err_undelimited_string() {
        let err = parse_all("'abc").unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "
   |
 1 | 'abc
   | ^^^^ undelimited string
"
        );
    }

    #[test]
    fn is_ident_checks() {
        assert!(is_ident("content"));
        assert!(is_ident("_x1"));
        assert!(!is_ident("1x"));
        assert!(!is_ident("a-b"));
        assert!(!is_ident(""));
    }
}
