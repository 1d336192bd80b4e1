//! Render a compiled template against a context.

mod core;
mod eval;
pub(crate) mod iter;
mod stack;
pub(crate) mod value;

use crate::render::core::Renderer;
use crate::render::stack::Stack;
use crate::{Error, ErrorKind, Result, Template, Value};

/// Renders the template's program against the context.
///
/// The context must be a map or `None`. The output is passed through
/// [`collapse_whitespace`].
pub(crate) fn template(template: &Template, context: &Value) -> Result<String> {
    let context = match context {
        Value::Map(map) => Some(map),
        Value::None => None,
        value => {
            return Err(Error::new(
                ErrorKind::Render,
                format!("render context must be a map, found {}", value.human()),
            )
            .with_template_name(template.name()))
        }
    };

    let mut out = String::with_capacity(template.source().len());
    Renderer::new(&template.functions, Stack::new(context))
        .render(&template.program.instrs, &mut out)?;
    Ok(collapse_whitespace(&out))
}

/// Replaces every maximal run of whitespace that contains a line break with a
/// single `\n` followed by the whitespace after the run's last line break.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find(char::is_whitespace) {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        let end = rest
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(rest.len());
        let run = &rest[..end];
        match run.rfind('\n') {
            Some(j) => {
                out.push('\n');
                out.push_str(&run[j + 1..]);
            }
            None => out.push_str(run),
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}
