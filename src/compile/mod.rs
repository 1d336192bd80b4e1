//! Compile the template into a program that can be executed by the renderer.
//!
//! This process has three stages:
//! - The lexer chunks the template source into literal text and directives.
//! - The parser turns the directives into a flat sequence of nodes, inlining
//!   included templates and loading the parent template.
//! - The nodes are lowered into a program, or merged into the parent's
//!   program if the template extends another one.

mod expr;
pub(crate) mod inherit;
mod lex;
mod lower;
mod parse;

use std::path::PathBuf;
use std::sync::Arc;

use crate::types::program::{Origin, Program};
use crate::{Loader, Result, Template};

/// Compile a template.
///
/// `loading` holds the paths of the templates that are currently being
/// loaded, the template being compiled may not extend or include any of them.
pub(crate) fn template(
    loader: &Loader,
    source: &str,
    name: Option<&str>,
    loading: &mut Vec<PathBuf>,
) -> Result<Template> {
    tracing::trace!(name, "compiling template");

    let origin = Arc::new(Origin::new(name, source));
    let parsed =
        parse::Parser::new(loader, source, origin.clone(), loading, loader.autoescape()).parse()?;

    let program = match &parsed.parent {
        Some(parent) => inherit::merge(&parent.program, &parsed.nodes, &parsed.registry)?,
        None => Program {
            instrs: lower::lower(&parsed.nodes)?,
        },
    };

    Ok(Template::from_parts(
        origin,
        loader,
        parsed.nodes,
        parsed.parent,
        program,
    ))
}
