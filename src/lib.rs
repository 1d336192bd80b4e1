//! A small template engine with blocks, inheritance and a cached loader.
//!
//! # Features
//!
//! ### Syntax
//!
//! - Expressions: `{{ user.name.upper() }}`
//! - Conditionals: `{% if user.enabled %} ... {% elif user.invited %} ... {% else %} ... {% endif %}`
//! - Loops: `{% for key, value in items %} ... {% endfor %}` and
//!   `{% while n > 0 %} ... {% endwhile %}`
//! - Error handling: `{% try %} ... {% except %} ... {% finally %} ... {% endtry %}`
//! - Inheritance: `{% extends "base.html" %}` with `{% block title %} ... {% endblock %}`
//! - Nested templates: `{% include "nav.html" %}`
//!
//! ### Engine
//!
//! - Templates are compiled once, errors point into the template source
//! - A loader that resolves names under a root directory and keeps an LRU
//!   cache of compiled templates
//! - Builtin functions like `len`, `range` and `sorted`, methods on strings,
//!   lists and maps and user defined functions
//! - Optional HTML escaping of interpolated values
//! - Render using any [`serde`] serializable values
//! - Convenient macro for quick rendering:
//!   `flango::value!{ name: "John", age: 42 }`
//!
//! # Getting started
//!
//! Your entry point is the [`Loader`] struct. The loader stores the root
//! directory, user functions and compiled templates. Generally, you only need
//! to construct one loader during the lifetime of a program.
//!
//! ```no_run
//! let loader = flango::Loader::new("templates");
//! ```
//!
//! Templates are loaded by name, relative to the root, using
//! [`.load`][Loader::load] which returns a shared compiled [`Template`].
//!
//! ```no_run
//! # let loader = flango::Loader::new("templates");
//! let template = loader.load("hello.html")?;
//! let result = template.render(flango::value!{ user: { name: "John Smith" }})?;
//! # Ok::<(), flango::Error>(())
//! ```
//!
//! If the template source does not live in a file you can compile it
//! directly, the template will not be cached.
//!
//! ```
//! let loader = flango::Loader::new(".");
//! let template = loader.compile("Hello {{ user.name }}!")?;
//! let result = template.render(flango::value!{ user: { name: "John Smith" }})?;
//! assert_eq!(result, "Hello John Smith!");
//! # Ok::<(), flango::Error>(())
//! ```
//!
//! # Examples
//!
//! ### Render using structured data
//!
//! Here is the same example as above except using derived data.
//!
//! ```
//! #[derive(serde::Serialize)]
//! struct Context { user: User }
//!
//! #[derive(serde::Serialize)]
//! struct User { name: String }
//!
//! let ctx = Context { user: User { name: "John Smith".into() } };
//!
//! let result = flango::Template::new("Hello {{ user.name }}")?.render(&ctx)?;
//!
//! assert_eq!(result, "Hello John Smith");
//! # Ok::<(), flango::Error>(())
//! ```
//!
//! ### Call functions and methods
//!
//! ```
//! let template = flango::Template::new(
//!     "{{ ', '.join(sorted(names, lambda n: n.lower())) }} ({{ len(names) }})",
//! )?;
//! let result = template.render(flango::value! { names: ["bob", "Alice", "carol"] })?;
//!
//! assert_eq!(result, "Alice, bob, carol (3)");
//! # Ok::<(), flango::Error>(())
//! ```
//!
//! Functions can also be registered on the loader, see the [`Function`]
//! trait.
//!
//! ### Render a template to an `impl io::Write`
//!
//! You can render a template directly to a buffer implementing [`io::Write`]
//! by using [`.render_to_writer()`][Template::render_to_writer].
//!
//! ```
//! use std::io;
//!
//! let stdout = io::BufWriter::new(io::stdout());
//!
//! flango::Template::new("Hello {{ user.name }}")?
//!     .render_to_writer(stdout, flango::value! { user: { name: "John Smith" }})?;
//! #
//! # Ok::<(), flango::Error>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod cache;
mod compile;
mod error;
mod fmt;
mod functions;
mod loader;
mod macros;
mod render;
mod types;
mod value;

use std::fmt as std_fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use crate::error::{Error, ErrorKind};
pub use crate::functions::{Function, FunctionArg, FunctionArgs, FunctionReturn};
pub use crate::loader::{Loader, LoaderBuilder};
#[cfg(feature = "serde")]
pub use crate::value::to_value;
pub use crate::value::{List, Map, Value};

use crate::functions::Functions;
use crate::types::node::Node;
use crate::types::program::{Origin, Program};

/// A type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A compiled template.
///
/// Templates are immutable once compiled and can be shared between threads.
/// A template that extends another one holds on to its parent.
pub struct Template {
    origin: Arc<Origin>,
    root: PathBuf,
    pub(crate) nodes: Vec<Node>,
    parent: Option<Arc<Template>>,
    autoescape: bool,
    pub(crate) functions: Arc<Functions>,
    pub(crate) program: Program,
}

impl Template {
    /// Compile a template using a default [`Loader`] rooted at the current
    /// directory.
    ///
    /// # Examples
    ///
    /// ```
    /// let template = flango::Template::new("{% for x in range(3) %}{{ x }}{% endfor %}")?;
    /// assert_eq!(template.render(flango::value! {})?, "012");
    /// # Ok::<(), flango::Error>(())
    /// ```
    pub fn new(source: &str) -> Result<Self> {
        Loader::new(".").compile(source)
    }

    pub(crate) fn from_parts(
        origin: Arc<Origin>,
        loader: &Loader,
        nodes: Vec<Node>,
        parent: Option<Arc<Template>>,
        program: Program,
    ) -> Self {
        Self {
            origin,
            root: loader.root().to_path_buf(),
            nodes,
            parent,
            autoescape: loader.autoescape(),
            functions: loader.functions().clone(),
            program,
        }
    }

    /// Render the template to a string using the provided value.
    ///
    /// The value must serialize to a map or to `None`.
    #[cfg(feature = "serde")]
    #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
    #[inline]
    pub fn render<S>(&self, ctx: S) -> Result<String>
    where
        S: serde::Serialize,
    {
        render::template(self, &to_value(ctx)?)
    }

    /// Render the template to a string using a [`Value`].
    #[inline]
    pub fn render_from(&self, ctx: &Value) -> Result<String> {
        render::template(self, ctx)
    }

    /// Render the template to a writer using the provided value.
    #[cfg(feature = "serde")]
    #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
    pub fn render_to_writer<W, S>(&self, mut writer: W, ctx: S) -> Result<()>
    where
        W: io::Write,
        S: serde::Serialize,
    {
        let out = self.render(ctx)?;
        writer.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Returns the name of the template, `None` if it was compiled from
    /// source.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.origin.name.as_deref()
    }

    /// Returns the original template source.
    #[inline]
    pub fn source(&self) -> &str {
        &self.origin.source
    }

    /// Returns the template this template extends, if any.
    #[inline]
    pub fn parent(&self) -> Option<&Template> {
        self.parent.as_deref()
    }

    /// Returns whether `{{ expr }}` output is HTML escaped.
    #[inline]
    pub fn autoescape(&self) -> bool {
        self.autoescape
    }

    /// Returns the directory names in `extends` and `include` resolve
    /// against.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl std_fmt::Debug for Template {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name())
            .field("root", &self.root)
            .field("parent", &self.parent().and_then(Template::name))
            .field("autoescape", &self.autoescape)
            .finish_non_exhaustive()
    }
}
