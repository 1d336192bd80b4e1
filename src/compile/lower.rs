//! Turns the flat node sequence into a tree of [`Instr`].
//!
//! A node belongs to the body of the closest preceding header with a smaller
//! depth. Continuation headers like `else` sit at the depth of the header
//! they continue.

use crate::types::node::{Header, Node, NodeKind};
use crate::types::program::{Branch, Instr};
use crate::Result;

/// Lower a node sequence into instructions.
///
/// The sequence may start at any depth, the smallest depth found is treated
/// as the top level. This allows a block fragment cut out of a deeper part of
/// a template to be lowered on its own.
pub fn lower(nodes: &[Node]) -> Result<Vec<Instr>> {
    let base = nodes.iter().map(|n| n.depth).min().unwrap_or(0);
    let mut lowerer = Lowerer { nodes, cursor: 0 };
    let instrs = lowerer.body(base)?;
    match lowerer.peek() {
        None => Ok(instrs),
        Some(node) => Err(lowerer.unexpected(node)),
    }
}

struct Lowerer<'n> {
    nodes: &'n [Node],
    cursor: usize,
}

impl<'n> Lowerer<'n> {
    /// Lowers consecutive nodes at `depth` into a body. Stops at the first
    /// node that is shallower or that continues or ends an enclosing
    /// construct.
    fn body(&mut self, depth: usize) -> Result<Vec<Instr>> {
        let mut instrs = Vec::new();
        while let Some(node) = self.peek() {
            if node.depth < depth {
                break;
            }
            if node.depth > depth {
                return Err(self.unexpected(node));
            }
            let header = match &node.kind {
                NodeKind::Text(text) => {
                    self.cursor += 1;
                    match instrs.last_mut() {
                        Some(Instr::EmitRaw(prev)) => prev.push_str(text),
                        _ => instrs.push(Instr::EmitRaw(text.clone())),
                    }
                    continue;
                }
                NodeKind::Output { expr, escape } => {
                    self.cursor += 1;
                    instrs.push(Instr::Emit {
                        expr: expr.clone(),
                        escape: *escape,
                    });
                    continue;
                }
                NodeKind::Control(header) => header,
            };
            let instr = match header {
                Header::If(cond) => {
                    self.cursor += 1;
                    let mut branches = vec![Branch {
                        cond: cond.clone(),
                        body: self.body(depth + 1)?,
                    }];
                    while let Some(cond) = self.continuation(depth, |h| match h {
                        Header::Elif(cond) => Some(cond.clone()),
                        _ => None,
                    }) {
                        branches.push(Branch {
                            cond,
                            body: self.body(depth + 1)?,
                        });
                    }
                    let otherwise = self.otherwise(depth)?;
                    Instr::If {
                        branches,
                        otherwise,
                    }
                }
                Header::For { vars, iterable } => {
                    self.cursor += 1;
                    let body = self.body(depth + 1)?;
                    Instr::For {
                        vars: vars.clone(),
                        iterable: iterable.clone(),
                        body,
                        otherwise: self.otherwise(depth)?,
                    }
                }
                Header::While(cond) => {
                    self.cursor += 1;
                    let body = self.body(depth + 1)?;
                    Instr::While {
                        cond: cond.clone(),
                        body,
                        otherwise: self.otherwise(depth)?,
                    }
                }
                Header::Try => {
                    self.cursor += 1;
                    let body = self.body(depth + 1)?;
                    let except = match self.continuation(depth, |h| match h {
                        Header::Except => Some(()),
                        _ => None,
                    }) {
                        Some(()) => Some(self.body(depth + 1)?),
                        None => None,
                    };
                    let finally = match self.continuation(depth, |h| match h {
                        Header::Finally => Some(()),
                        _ => None,
                    }) {
                        Some(()) => Some(self.body(depth + 1)?),
                        None => None,
                    };
                    Instr::Try {
                        body,
                        except,
                        finally,
                    }
                }
                Header::BlockStart(name) => {
                    self.cursor += 1;
                    let body = self.body_until_end(depth, name)?;
                    Instr::Block {
                        name: name.clone(),
                        body,
                    }
                }
                Header::Elif(_)
                | Header::Else
                | Header::Except
                | Header::Finally
                | Header::BlockEnd(_) => break,
            };
            instrs.push(instr);
        }
        Ok(instrs)
    }

    /// Lowers the body of a block, which shares the depth of its markers.
    fn body_until_end(&mut self, depth: usize, name: &str) -> Result<Vec<Instr>> {
        let body = self.body(depth)?;
        match self.peek() {
            Some(Node {
                kind: NodeKind::Control(Header::BlockEnd(end)),
                depth: d,
                ..
            }) if *d == depth && end == name => {
                self.cursor += 1;
                Ok(body)
            }
            Some(node) => Err(self.unexpected(node)),
            None => Err(crate::Error::new(
                crate::ErrorKind::Syntax,
                format!("unclosed block `{name}`"),
            )),
        }
    }

    /// Consumes the `else` of an `if`, `for` or `while` and lowers its body.
    fn otherwise(&mut self, depth: usize) -> Result<Option<Vec<Instr>>> {
        match self.continuation(depth, |h| match h {
            Header::Else => Some(()),
            _ => None,
        }) {
            Some(()) => Ok(Some(self.body(depth + 1)?)),
            None => Ok(None),
        }
    }

    /// Consumes the next node if it is a header at `depth` accepted by `f`.
    fn continuation<T, F>(&mut self, depth: usize, f: F) -> Option<T>
    where
        F: FnOnce(&Header) -> Option<T>,
    {
        let node = self.peek()?;
        if node.depth != depth {
            return None;
        }
        let t = match &node.kind {
            NodeKind::Control(header) => f(header)?,
            _ => return None,
        };
        self.cursor += 1;
        Some(t)
    }

    fn peek(&self) -> Option<&'n Node> {
        self.nodes.get(self.cursor)
    }

    fn unexpected(&self, node: &Node) -> crate::Error {
        let what = match &node.kind {
            NodeKind::Control(header) => header.human(),
            NodeKind::Text(_) => "text",
            NodeKind::Output { .. } => "expression",
        };
        node.origin.err_syntax(format!("unexpected {what}"), node.span)
    }
}
