//! AST representing an expression.
//!
//! Every span is an absolute byte range into the source of the template the
//! expression was written in.

use crate::types::span::Span;
use crate::Value;

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Var(Ident),
    List(List),
    Map(MapLit),
    Attr(Box<Attr>),
    Index(Box<Index>),
    Slice(Box<Slice>),
    Call(Box<Call>),
    Unary(Box<Unary>),
    Binary(Box<Binary>),
    Compare(Box<Compare>),
    Logical(Box<Logical>),
    Cond(Box<Cond>),
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub value: Value,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct List {
    pub items: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MapLit {
    pub entries: Vec<(Expr, Expr)>,
    pub span: Span,
}

/// `base.name`
#[derive(Debug, Clone)]
pub struct Attr {
    pub base: Expr,
    pub name: Ident,
    pub span: Span,
}

/// `base[index]`
#[derive(Debug, Clone)]
pub struct Index {
    pub base: Expr,
    pub index: Expr,
    pub span: Span,
}

/// `base[start:stop]`
#[derive(Debug, Clone)]
pub struct Slice {
    pub base: Expr,
    pub start: Option<Expr>,
    pub stop: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub func: Expr,
    pub args: Vec<Arg>,
    pub span: Span,
}

/// A call argument, lambdas are only valid in this position.
#[derive(Debug, Clone)]
pub enum Arg {
    Expr(Expr),
    Lambda(Lambda),
}

#[derive(Debug, Clone)]
pub struct Lambda {
    pub params: Vec<Ident>,
    pub body: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Unary {
    pub op: UnaryOp,
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone)]
pub struct Binary {
    pub op: BinaryOp,
    pub lhs: Expr,
    pub rhs: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
    Pow,
}

/// A possibly chained comparison, e.g. `a < b <= c`.
#[derive(Debug, Clone)]
pub struct Compare {
    pub first: Expr,
    pub rest: Vec<(CompareOp, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone)]
pub struct Logical {
    pub op: LogicalOp,
    pub lhs: Expr,
    pub rhs: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// `then if cond else otherwise`
#[derive(Debug, Clone)]
pub struct Cond {
    pub cond: Expr,
    pub then: Expr,
    pub otherwise: Expr,
    pub span: Span,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(lit) => lit.span,
            Self::Var(ident) => ident.span,
            Self::List(list) => list.span,
            Self::Map(map) => map.span,
            Self::Attr(attr) => attr.span,
            Self::Index(index) => index.span,
            Self::Slice(slice) => slice.span,
            Self::Call(call) => call.span,
            Self::Unary(unary) => unary.span,
            Self::Binary(binary) => binary.span,
            Self::Compare(cmp) => cmp.span,
            Self::Logical(logical) => logical.span,
            Self::Cond(cond) => cond.span,
        }
    }
}

impl Arg {
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(expr) => expr.span(),
            Self::Lambda(lambda) => lambda.span,
        }
    }
}

impl BinaryOp {
    pub fn human(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Rem => "%",
            Self::Pow => "**",
        }
    }
}

impl CompareOp {
    pub fn human(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Is => "is",
            Self::IsNot => "is not",
        }
    }
}
