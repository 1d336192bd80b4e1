use std::path::PathBuf;
use std::sync::Arc;

use crate::compile::expr;
use crate::compile::inherit::BlockRegistry;
use crate::compile::lex::{EndKind, Lexer, Token};
use crate::types::node::{Header, Node, NodeKind};
use crate::types::program::{Expression, Origin};
use crate::types::span::Span;
use crate::{Error, Loader, Result, Template};

/// The maximum number of control constructs and blocks that may be open at
/// once.
const MAX_NESTING: usize = 128;

/// A parser that turns a token stream into a flat sequence of [`Node`]s.
///
/// Nesting is tracked with an explicit depth plus two stacks:
/// - A stack of open control constructs e.g. `{% if cond %} ... {% else %}`.
/// - A stack of open blocks e.g. `{% block content %}`.
///
/// Both are needed because blocks do not affect the depth of their content
/// but must still be properly nested with the control constructs.
pub struct Parser<'a> {
    /// The loader used to resolve `extends` and `include`.
    loader: &'a Loader,

    /// A lexer that tokenizes the template source.
    tokens: Lexer<'a>,

    origin: Arc<Origin>,

    /// The paths of the templates currently being loaded, used to detect
    /// recursive `extends` and `include` statements.
    loading: &'a mut Vec<PathBuf>,

    autoescape: bool,

    /// The current nesting depth.
    depth: usize,

    /// The open blocks and the spans of their `block` statements.
    blocks: Vec<(String, Span)>,

    /// The open control constructs.
    controls: Vec<Open>,

    nodes: Vec<Node>,
    parent: Option<Arc<Template>>,
    registry: BlockRegistry,
}

/// The output of the parser.
pub struct Parsed {
    pub nodes: Vec<Node>,
    pub parent: Option<Arc<Template>>,
    pub registry: BlockRegistry,
}

/// An open control construct.
struct Open {
    construct: Construct,
    /// The span of the opening statement.
    span: Span,
    /// The number of open blocks when the construct was opened.
    blocks: usize,
}

#[derive(Clone, Copy)]
enum Construct {
    If { has_else: bool },
    For { has_else: bool },
    While { has_else: bool },
    Try { has_except: bool, has_finally: bool },
}

impl<'a> Parser<'a> {
    /// Construct a new parser.
    pub fn new(
        loader: &'a Loader,
        source: &'a str,
        origin: Arc<Origin>,
        loading: &'a mut Vec<PathBuf>,
        autoescape: bool,
    ) -> Self {
        Self {
            loader,
            tokens: Lexer::new(source),
            origin,
            loading,
            autoescape,
            depth: 0,
            blocks: Vec::new(),
            controls: Vec::new(),
            nodes: Vec::new(),
            parent: None,
            registry: BlockRegistry::default(),
        }
    }

    /// Parses the template.
    pub fn parse(mut self) -> Result<Parsed> {
        while let Some((literal, tk, span)) = self.tokens.next()? {
            if !literal.is_empty() {
                let m = span.m - literal.len();
                self.push_text(literal, Span::from(m..span.m));
            }

            match tk {
                Token::Variable { span, .. } => {
                    let expr = self.expression(span)?;
                    self.push(
                        NodeKind::Output {
                            expr,
                            escape: self.autoescape,
                        },
                        self.depth,
                        span,
                    );
                }
                Token::EndTag {
                    kind: EndKind::Block,
                } => self.end_block(span)?,
                Token::EndTag { kind } => self.end_control(kind, span)?,
                Token::Statement {
                    keyword,
                    arg,
                    arg_span,
                } => self.statement(keyword, arg, arg_span, span)?,
            }
        }

        if !self.tokens.is_empty() {
            let rest = self.tokens.remaining();
            let n = self.source().len();
            self.push_text(rest, Span::from(n - rest.len()..n));
        }

        if let Some(open) = self.controls.last() {
            let msg = format!("unclosed {}, expected {}", open.human(), open.end().human());
            return Err(self.err(msg, open.span));
        }
        if let Some((_, span)) = self.blocks.last() {
            return Err(self.err("unclosed `block`, expected `endblock`", *span));
        }

        Ok(Parsed {
            nodes: self.nodes,
            parent: self.parent,
            registry: self.registry,
        })
    }

    fn statement(&mut self, keyword: &str, arg: &str, arg_span: Span, span: Span) -> Result<()> {
        match keyword {
            "include" => self.include(arg, arg_span, span),
            "extends" => self.extends(arg, arg_span, span),
            "block" => self.block(arg, arg_span, span),

            "if" => {
                let cond = self.expression(arg_span)?;
                self.open(Construct::If { has_else: false }, Header::If(cond), span)
            }
            "for" => {
                let (vars, iterable) = expr::parse_for(self.source(), arg_span)?;
                let iterable = Expression {
                    origin: self.origin.clone(),
                    expr: iterable,
                };
                self.open(
                    Construct::For { has_else: false },
                    Header::For { vars, iterable },
                    span,
                )
            }
            "while" => {
                let cond = self.expression(arg_span)?;
                self.open(Construct::While { has_else: false }, Header::While(cond), span)
            }
            "try" => {
                self.expect_no_arg(arg, arg_span)?;
                self.open(
                    Construct::Try {
                        has_except: false,
                        has_finally: false,
                    },
                    Header::Try,
                    span,
                )
            }

            "elif" => {
                let cond = self.expression(arg_span)?;
                self.continue_with(Header::Elif(cond), span, |c| match c {
                    Construct::If { has_else: false } => Some(*c),
                    _ => None,
                })
            }
            "else" => {
                self.expect_no_arg(arg, arg_span)?;
                self.continue_with(Header::Else, span, |c| match c {
                    Construct::If { has_else } if !*has_else => {
                        Some(Construct::If { has_else: true })
                    }
                    Construct::For { has_else } if !*has_else => {
                        Some(Construct::For { has_else: true })
                    }
                    Construct::While { has_else } if !*has_else => {
                        Some(Construct::While { has_else: true })
                    }
                    _ => None,
                })
            }
            "except" => {
                if !arg.is_empty() {
                    return Err(self.err("only a bare `except` is supported", arg_span));
                }
                self.continue_with(Header::Except, span, |c| match c {
                    Construct::Try {
                        has_except: false,
                        has_finally: false,
                    } => Some(Construct::Try {
                        has_except: true,
                        has_finally: false,
                    }),
                    _ => None,
                })
            }
            "finally" => {
                self.expect_no_arg(arg, arg_span)?;
                self.continue_with(Header::Finally, span, |c| match c {
                    Construct::Try {
                        has_except,
                        has_finally: false,
                    } => Some(Construct::Try {
                        has_except: *has_except,
                        has_finally: true,
                    }),
                    _ => None,
                })
            }

            keyword => Err(self.err(format!("unknown directive `{keyword}`"), span)),
        }
    }

    /// Handles `{% include "name" %}` by inlining the nodes of the included
    /// template at the current depth.
    fn include(&mut self, arg: &str, arg_span: Span, span: Span) -> Result<()> {
        let name = self.template_name(arg, arg_span, span)?;
        let template = self.load(&name, arg_span)?;
        let current = self.current_block();
        for node in &template.nodes {
            let mut node = node.clone();
            node.depth += self.depth;
            if node.depth > MAX_NESTING {
                return Err(self.err("statements are nested too deeply", arg_span));
            }
            match node.block.take() {
                Some(block) => {
                    self.registry.nest(&block, current.as_deref());
                    node.block = Some(block);
                }
                None => node.block = current.clone(),
            }
            self.nodes.push(node);
        }
        Ok(())
    }

    /// Handles `{% extends "name" %}` which must come before anything else.
    fn extends(&mut self, arg: &str, arg_span: Span, span: Span) -> Result<()> {
        if !self.nodes.is_empty() || self.parent.is_some() {
            return Err(self.err("`extends` must be the first statement in the template", span));
        }
        let name = self.template_name(arg, arg_span, span)?;
        self.parent = Some(self.load(&name, arg_span)?);
        Ok(())
    }

    fn block(&mut self, arg: &str, arg_span: Span, span: Span) -> Result<()> {
        if !expr::is_ident(arg) {
            let span = if arg.is_empty() { span } else { arg_span };
            return Err(self.err("expected block name", span));
        }
        let current = self.current_block();
        if !self.registry.declare(arg, current.as_deref()) {
            return Err(self.err(format!("block `{arg}` is already declared"), arg_span));
        }
        self.check_nesting(span)?;
        self.blocks.push((arg.to_owned(), span));
        self.push(
            NodeKind::Control(Header::BlockStart(arg.to_owned())),
            self.depth,
            span,
        );
        Ok(())
    }

    fn end_block(&mut self, span: Span) -> Result<()> {
        if self.blocks.is_empty() {
            return Err(self.err("unexpected `endblock`", span));
        }
        if let Some(open) = self.controls.last() {
            if open.blocks == self.blocks.len() {
                let msg = format!("expected {}, found `endblock`", open.end().human());
                return Err(self.err(msg, span));
            }
        }
        let name = self.current_block().unwrap_or_default();
        self.push(NodeKind::Control(Header::BlockEnd(name)), self.depth, span);
        self.blocks.pop();
        Ok(())
    }

    /// Pushes the header of a control construct and opens a new depth level.
    fn open(&mut self, construct: Construct, header: Header, span: Span) -> Result<()> {
        self.check_nesting(span)?;
        self.push(NodeKind::Control(header), self.depth, span);
        self.controls.push(Open {
            construct,
            span,
            blocks: self.blocks.len(),
        });
        self.depth += 1;
        Ok(())
    }

    fn check_nesting(&self, span: Span) -> Result<()> {
        if self.controls.len() + self.blocks.len() >= MAX_NESTING {
            return Err(self.err("statements are nested too deeply", span));
        }
        Ok(())
    }

    /// Pushes a continuation header like `else` one level shallower than the
    /// body it follows. `next` returns the updated construct state or `None`
    /// if the continuation is not allowed here.
    fn continue_with<F>(&mut self, header: Header, span: Span, next: F) -> Result<()>
    where
        F: FnOnce(&Construct) -> Option<Construct>,
    {
        let blocks = self.blocks.len();
        let updated = match self.controls.last() {
            Some(open) if open.blocks == blocks => next(&open.construct),
            _ => None,
        };
        match (updated, self.controls.last_mut()) {
            (Some(construct), Some(open)) => open.construct = construct,
            _ => return Err(self.err(format!("unexpected {}", header.human()), span)),
        }
        self.push(NodeKind::Control(header), self.depth - 1, span);
        Ok(())
    }

    fn end_control(&mut self, kind: EndKind, span: Span) -> Result<()> {
        let open = match self.controls.last() {
            Some(open) => open,
            None => return Err(self.err(format!("unexpected {}", kind.human()), span)),
        };
        if open.end() != kind {
            let msg = format!("expected {}, found {}", open.end().human(), kind.human());
            return Err(self.err(msg, span));
        }
        if open.blocks != self.blocks.len() {
            let msg = format!("expected `endblock`, found {}", kind.human());
            return Err(self.err(msg, span));
        }
        if let Construct::Try {
            has_except: false,
            has_finally: false,
        } = open.construct
        {
            return Err(self.err("expected `except` or `finally` before `endtry`", span));
        }
        self.controls.pop();
        self.depth -= 1;
        Ok(())
    }

    fn load(&mut self, name: &str, span: Span) -> Result<Arc<Template>> {
        let path = self.loader.resolve(name);
        if self.loading.contains(&path) {
            let msg = format!("template `{name}` is recursively extended or included");
            return Err(self.err(msg, span));
        }
        self.loader.load_nested(name, self.loading)
    }

    fn template_name(&self, arg: &str, arg_span: Span, span: Span) -> Result<String> {
        let name: String = arg.chars().filter(|c| !matches!(c, '"' | '\'')).collect();
        let name = name.trim();
        if name.is_empty() {
            let span = if arg.is_empty() { span } else { arg_span };
            return Err(self.err("expected template name", span));
        }
        Ok(name.to_owned())
    }

    fn expression(&self, span: Span) -> Result<Expression> {
        if span.m == span.n {
            return Err(self.err("expected expression", span));
        }
        Ok(Expression {
            origin: self.origin.clone(),
            expr: expr::parse(self.source(), span)?,
        })
    }

    fn expect_no_arg(&self, arg: &str, arg_span: Span) -> Result<()> {
        match arg.is_empty() {
            true => Ok(()),
            false => Err(self.err("unexpected argument", arg_span)),
        }
    }

    fn push_text(&mut self, text: &str, span: Span) {
        self.push(NodeKind::Text(text.to_owned()), self.depth, span);
    }

    fn push(&mut self, kind: NodeKind, depth: usize, span: Span) {
        let block = self.current_block();
        self.nodes.push(Node {
            kind,
            depth,
            block,
            origin: self.origin.clone(),
            span,
        });
    }

    fn current_block(&self) -> Option<String> {
        self.blocks.last().map(|(name, _)| name.clone())
    }

    fn source(&self) -> &'a str {
        self.tokens.source
    }

    fn err(&self, msg: impl Into<String>, span: Span) -> Error {
        self.origin.err_syntax(msg, span)
    }
}

impl Open {
    fn end(&self) -> EndKind {
        match self.construct {
            Construct::If { .. } => EndKind::If,
            Construct::For { .. } => EndKind::For,
            Construct::While { .. } => EndKind::While,
            Construct::Try { .. } => EndKind::Try,
        }
    }

    fn human(&self) -> &'static str {
        match self.construct {
            Construct::If { .. } => "`if`",
            Construct::For { .. } => "`for`",
            Construct::While { .. } => "`while`",
            Construct::Try { .. } => "`try`",
        }
    }
}
