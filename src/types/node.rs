//! The flat node sequence produced by the parser.
//!
//! Nesting is expressed with a `depth` per node rather than with ownership,
//! which makes inlining included templates a matter of shifting depths.
//! [`lower`][crate::compile::lower] turns the sequence into a tree.

use std::sync::Arc;

use crate::types::ast;
use crate::types::program::{Expression, Origin};
use crate::types::span::Span;

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// The nesting depth, zero at the top level of a template.
    pub depth: usize,
    /// The innermost block this node was declared in.
    pub block: Option<String>,
    pub origin: Arc<Origin>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Text(String),
    Output { expr: Expression, escape: bool },
    Control(Header),
}

#[derive(Debug, Clone)]
pub enum Header {
    If(Expression),
    Elif(Expression),
    Else,
    For {
        vars: Vec<ast::Ident>,
        iterable: Expression,
    },
    While(Expression),
    Try,
    Except,
    Finally,
    BlockStart(String),
    BlockEnd(String),
}

impl Header {
    pub fn human(&self) -> &'static str {
        match self {
            Self::If(_) => "`if`",
            Self::Elif(_) => "`elif`",
            Self::Else => "`else`",
            Self::For { .. } => "`for`",
            Self::While(_) => "`while`",
            Self::Try => "`try`",
            Self::Except => "`except`",
            Self::Finally => "`finally`",
            Self::BlockStart(_) => "`block`",
            Self::BlockEnd(_) => "`endblock`",
        }
    }
}
