//! Defines a compiled [`Program`] which is a tree of [`Instr`] that can be
//! executed by the renderer.

use std::sync::Arc;

use crate::types::ast;
use crate::types::span::Span;
use crate::Error;

/// The template an expression or node was written in.
///
/// Included and inherited content keeps pointing at its own source so that
/// errors raised while rendering it show the right excerpt.
#[derive(Debug)]
pub struct Origin {
    pub name: Option<String>,
    pub source: Arc<str>,
}

/// A parsed expression along with where it came from.
#[derive(Debug, Clone)]
pub struct Expression {
    pub origin: Arc<Origin>,
    pub expr: ast::Expr,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub instrs: Vec<Instr>,
}

#[derive(Debug, Clone)]
pub enum Instr {
    /// Emit literal template text
    EmitRaw(String),

    /// Evaluate and emit an expression, optionally HTML escaped
    Emit { expr: Expression, escape: bool },

    /// `if` / `elif` branches and the optional `else` body
    If {
        branches: Vec<Branch>,
        otherwise: Option<Vec<Instr>>,
    },

    For {
        vars: Vec<ast::Ident>,
        iterable: Expression,
        body: Vec<Instr>,
        otherwise: Option<Vec<Instr>>,
    },

    While {
        cond: Expression,
        body: Vec<Instr>,
        otherwise: Option<Vec<Instr>>,
    },

    Try {
        body: Vec<Instr>,
        except: Option<Vec<Instr>>,
        finally: Option<Vec<Instr>>,
    },

    /// A named block, the placeholder children override
    Block { name: String, body: Vec<Instr> },
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub cond: Expression,
    pub body: Vec<Instr>,
}

impl Origin {
    pub fn new(name: Option<&str>, source: &str) -> Self {
        Self {
            name: name.map(String::from),
            source: Arc::from(source),
        }
    }

    /// Construct a syntax error pointing into this source.
    pub fn err_syntax(&self, msg: impl Into<String>, span: Span) -> Error {
        Error::syntax(msg, &self.source, span).with_template_name(self.name.as_deref())
    }

    /// Construct a render error pointing into this source.
    pub fn err_render(&self, msg: impl Into<String>, span: Span) -> Error {
        Error::render(msg, &self.source, span).with_template_name(self.name.as_deref())
    }
}
