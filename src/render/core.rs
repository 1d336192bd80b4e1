use crate::fmt;
use crate::functions::Functions;
use crate::render::iter::{unpack, Items};
use crate::render::stack::Stack;
use crate::types::program::{Expression, Instr};
use crate::{ErrorKind, Result};

/// Interprets a compiled program.
///
/// `'r` is the lifetime of the program and `'a` the lifetime of the render
/// context.
pub struct Renderer<'r, 'a> {
    pub(super) functions: &'r Functions,
    pub(super) stack: Stack<'r, 'a>,
}

impl<'r, 'a> Renderer<'r, 'a> {
    pub fn new(functions: &'r Functions, stack: Stack<'r, 'a>) -> Self {
        Self { functions, stack }
    }

    pub fn render(&mut self, instrs: &'r [Instr], out: &mut String) -> Result<()> {
        for instr in instrs {
            match instr {
                Instr::EmitRaw(raw) => out.push_str(raw),

                Instr::Emit { expr, escape } => {
                    let value = self.eval(expr)?;
                    let s = fmt::to_str(&value);
                    match escape {
                        true => out.push_str(&fmt::escape_html(&s)),
                        false => out.push_str(&s),
                    }
                }

                Instr::If {
                    branches,
                    otherwise,
                } => {
                    let mut taken = false;
                    for branch in branches {
                        if self.eval(&branch.cond)?.is_truthy() {
                            self.render(&branch.body, out)?;
                            taken = true;
                            break;
                        }
                    }
                    if let (false, Some(otherwise)) = (taken, otherwise) {
                        self.render(otherwise, out)?;
                    }
                }

                Instr::For {
                    vars,
                    iterable,
                    body,
                    otherwise,
                } => {
                    let items = self.iterate(iterable)?;
                    self.stack.push_frame();
                    for item in items {
                        match &vars[..] {
                            [var] => self.stack.bind(&var.name, item),
                            vars => {
                                let values = unpack(item, vars.len()).map_err(|msg| {
                                    iterable.origin.err_render(msg, iterable.expr.span())
                                })?;
                                for (var, value) in vars.iter().zip(values) {
                                    self.stack.bind(&var.name, value);
                                }
                            }
                        }
                        self.render(body, out)?;
                    }
                    self.stack.pop_frame();
                    if let Some(otherwise) = otherwise {
                        self.render(otherwise, out)?;
                    }
                }

                Instr::While {
                    cond,
                    body,
                    otherwise,
                } => {
                    while self.eval(cond)?.is_truthy() {
                        self.render(body, out)?;
                    }
                    if let Some(otherwise) = otherwise {
                        self.render(otherwise, out)?;
                    }
                }

                Instr::Try {
                    body,
                    except,
                    finally,
                } => {
                    let len = self.stack.len();
                    // A failing body discards its partial output.
                    let mut scratch = String::new();
                    let result = match self.render(body, &mut scratch) {
                        Ok(()) => {
                            out.push_str(&scratch);
                            Ok(())
                        }
                        Err(err) => {
                            self.stack.truncate(len);
                            match except {
                                Some(except) if err.kind() == ErrorKind::Render => {
                                    tracing::debug!(error = %err, "recovering from render error");
                                    self.render(except, out)
                                }
                                _ => Err(err),
                            }
                        }
                    };
                    if let Some(finally) = finally {
                        self.render(finally, out)?;
                    }
                    result?;
                }

                Instr::Block { body, .. } => self.render(body, out)?,
            }
        }
        Ok(())
    }

    fn iterate(&mut self, iterable: &'r Expression) -> Result<Items<'a>> {
        let value = self.eval(iterable)?;
        let human = value.human();
        Items::new(value).ok_or_else(|| {
            iterable.origin.err_render(
                format!("expected iterable, but expression evaluated to {human}"),
                iterable.expr.span(),
            )
        })
    }
}
