//! Template inheritance.
//!
//! A child template only contributes the content of its blocks. Its program
//! is the parent's program with the body of every overridden block replaced
//! by the child's version of it. The block placeholders survive the merge so
//! that a grandchild can override them again.

use std::collections::BTreeMap;

use crate::compile::lower;
use crate::types::node::{Header, Node, NodeKind};
use crate::types::program::{Branch, Instr, Program};
use crate::Result;

/// The blocks declared in a template and how they nest.
#[derive(Debug, Default, Clone)]
pub struct BlockRegistry {
    /// The blocks declared directly in the template, in order.
    declared: Vec<String>,
    /// Maps each known block to the block it is nested in.
    parents: BTreeMap<String, Option<String>>,
}

impl BlockRegistry {
    /// Declares a block in the template, returns `false` if a block with the
    /// same name was already declared.
    pub fn declare(&mut self, name: &str, parent: Option<&str>) -> bool {
        if self.declared.iter().any(|d| d == name) {
            return false;
        }
        self.declared.push(name.to_owned());
        self.parents
            .insert(name.to_owned(), parent.map(String::from));
        true
    }

    /// Records a block that came from an included template.
    pub fn nest(&mut self, name: &str, parent: Option<&str>) {
        self.parents
            .entry(name.to_owned())
            .or_insert_with(|| parent.map(String::from));
    }

    /// Whether `block` is `ancestor` or nested somewhere inside it.
    pub fn is_within(&self, block: &str, ancestor: &str) -> bool {
        let mut current = Some(block);
        // Bounded in case an include produced a cycle in the parent links.
        for _ in 0..=self.parents.len() {
            match current {
                Some(name) if name == ancestor => return true,
                Some(name) => {
                    current = self.parents.get(name).and_then(|p| p.as_deref());
                }
                None => return false,
            }
        }
        false
    }

    pub fn declared(&self) -> &[String] {
        &self.declared
    }
}

/// Merges the blocks of a child template into its parent's program.
pub fn merge(parent: &Program, nodes: &[Node], registry: &BlockRegistry) -> Result<Program> {
    let mut overrides = BTreeMap::new();
    for name in registry.declared() {
        let fragment: Vec<Node> = nodes
            .iter()
            .filter(|node| match &node.block {
                Some(block) => registry.is_within(block, name) && !is_marker_of(node, name),
                None => false,
            })
            .cloned()
            .collect();
        overrides.insert(name.as_str(), lower::lower(&fragment)?);
    }

    let mut active = Vec::new();
    let instrs = resolve(&parent.instrs, &overrides, &mut active);

    let mut placed = Vec::new();
    collect_blocks(&instrs, &mut placed);
    for name in registry.declared() {
        if !placed.contains(&name.as_str()) {
            tracing::debug!(block = %name, "block has no placeholder in the parent template");
        }
    }

    Ok(Program { instrs })
}

fn is_marker_of(node: &Node, name: &str) -> bool {
    match &node.kind {
        NodeKind::Control(Header::BlockStart(n)) | NodeKind::Control(Header::BlockEnd(n)) => {
            n == name
        }
        _ => false,
    }
}

/// Copies `instrs` replacing the body of every overridden block.
fn resolve<'o>(
    instrs: &[Instr],
    overrides: &'o BTreeMap<&str, Vec<Instr>>,
    active: &mut Vec<&'o str>,
) -> Vec<Instr> {
    instrs
        .iter()
        .map(|instr| match instr {
            Instr::Block { name, body } => {
                let body = match overrides.get_key_value(name.as_str()) {
                    Some((&key, replacement)) if !active.contains(&key) => {
                        active.push(key);
                        let body = resolve(replacement, overrides, active);
                        active.pop();
                        body
                    }
                    _ => resolve(body, overrides, active),
                };
                Instr::Block {
                    name: name.clone(),
                    body,
                }
            }
            Instr::If {
                branches,
                otherwise,
            } => Instr::If {
                branches: branches
                    .iter()
                    .map(|b| Branch {
                        cond: b.cond.clone(),
                        body: resolve(&b.body, overrides, active),
                    })
                    .collect(),
                otherwise: resolve_opt(otherwise, overrides, active),
            },
            Instr::For {
                vars,
                iterable,
                body,
                otherwise,
            } => Instr::For {
                vars: vars.clone(),
                iterable: iterable.clone(),
                body: resolve(body, overrides, active),
                otherwise: resolve_opt(otherwise, overrides, active),
            },
            Instr::While {
                cond,
                body,
                otherwise,
            } => Instr::While {
                cond: cond.clone(),
                body: resolve(body, overrides, active),
                otherwise: resolve_opt(otherwise, overrides, active),
            },
            Instr::Try {
                body,
                except,
                finally,
            } => Instr::Try {
                body: resolve(body, overrides, active),
                except: resolve_opt(except, overrides, active),
                finally: resolve_opt(finally, overrides, active),
            },
            instr => instr.clone(),
        })
        .collect()
}

fn resolve_opt<'o>(
    instrs: &Option<Vec<Instr>>,
    overrides: &'o BTreeMap<&str, Vec<Instr>>,
    active: &mut Vec<&'o str>,
) -> Option<Vec<Instr>> {
    instrs
        .as_ref()
        .map(|instrs| resolve(instrs, overrides, active))
}

fn collect_blocks<'i>(instrs: &'i [Instr], names: &mut Vec<&'i str>) {
    for instr in instrs {
        match instr {
            Instr::Block { name, body } => {
                names.push(name.as_str());
                collect_blocks(body, names);
            }
            Instr::If {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    collect_blocks(&branch.body, names);
                }
                if let Some(body) = otherwise {
                    collect_blocks(body, names);
                }
            }
            Instr::For {
                body, otherwise, ..
            }
            | Instr::While {
                body, otherwise, ..
            } => {
                collect_blocks(body, names);
                if let Some(body) = otherwise {
                    collect_blocks(body, names);
                }
            }
            Instr::Try {
                body,
                except,
                finally,
            } => {
                collect_blocks(body, names);
                for body in [except, finally].into_iter().flatten() {
                    collect_blocks(body, names);
                }
            }
            Instr::EmitRaw(_) | Instr::Emit { .. } => {}
        }
    }
}
