use std::cmp::max;
use std::fmt;
use std::io;

use crate::types::span::Span;

/// An error that can occur during template loading, compilation or rendering.
///
/// The default [`Display`][fmt::Display] implementation gives a short one
/// line description. The alternate form (`{:#}`) and the [`Debug`][fmt::Debug]
/// implementation render an excerpt of the template source with the
/// offending region underlined.
#[derive(Clone)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
    name: Option<String>,
    span: Option<(String, Span)>,
}

/// Describes the category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed or mismatched directive, raised while compiling.
    Syntax,
    /// An `extends`, `include` or loaded template does not exist.
    NotFound,
    /// An expression could not be evaluated, raised while rendering.
    Render,
    /// Reading a template or writing the rendered output failed.
    Io,
    /// The render context could not be converted into a [`Value`][crate::Value].
    Serialize,
}

impl Error {
    pub(crate) fn syntax(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::with_span(ErrorKind::Syntax, msg, source, span)
    }

    pub(crate) fn render(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::with_span(ErrorKind::Render, msg, source, span)
    }

    /// Construct an error without any location information.
    pub(crate) fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            name: None,
            span: None,
        }
    }

    pub(crate) fn not_found(path: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            msg: format!("template `{path}` does not exist"),
            name: None,
            span: None,
        }
    }

    pub(crate) fn io(err: io::Error, path: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Io,
            msg: format!("failed to read template `{path}`: {err}"),
            name: None,
            span: None,
        }
    }

    fn with_span(
        kind: ErrorKind,
        msg: impl Into<String>,
        source: &str,
        span: impl Into<Span>,
    ) -> Self {
        Self {
            kind,
            msg: msg.into(),
            name: None,
            span: Some((source.to_owned(), span.into())),
        }
    }

    /// Attach the name of the template the error occurred in, unless one is
    /// already set by a more deeply nested template.
    pub(crate) fn with_template_name(mut self, name: Option<&str>) -> Self {
        if self.name.is_none() {
            self.name = name.map(String::from);
        }
        self
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the name of the template this error occurred in, if known.
    pub fn template_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the error message without any location information.
    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self {
            kind: ErrorKind::Io,
            msg: format!("io error: {err}"),
            name: None,
            span: None,
        }
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self {
            kind: ErrorKind::Serialize,
            msg: msg.to_string(),
            name: None,
            span: None,
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some((source, span)) => fmt_pretty(self, source, *span, f),
            None => fmt::Display::fmt(self, f),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some((source, span)) if f.alternate() => fmt_pretty(self, source, *span, f),
            Some((_, span)) => {
                if let Some(name) = &self.name {
                    write!(f, "{name}: ")?;
                }
                write!(f, "{} between bytes {} and {}", self.msg, span.m, span.n)
            }
            None => {
                if let Some(name) = &self.name {
                    write!(f, "{name}: ")?;
                }
                write!(f, "{}", self.msg)
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Syntax => "syntax error",
            Self::NotFound => "template not found",
            Self::Render => "render error",
            Self::Io => "io error",
            Self::Serialize => "serialize error",
        };
        f.write_str(s)
    }
}

fn fmt_pretty(err: &Error, source: &str, span: Span, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let lines: Vec<_> = source.split_terminator('\n').collect();
    let (line, col) = to_line_col(&lines, span.m);
    let width = max(1, str_width(&source[span]));
    let code = lines
        .get(line)
        .or_else(|| lines.last())
        .copied()
        .unwrap_or_default();

    let num = (line + 1).to_string();
    let pad = str_width(&num);
    let pipe = "|";
    let underline = "^".repeat(width);

    if let Some(name) = &err.name {
        write!(f, "\n {0:pad$}--> {name}:{num}:{col}", "", col = col + 1)?;
    }

    write!(
        f,
        "\n \
        {0:pad$} {pipe}\n \
        {num:>} {pipe} {code}\n \
        {0:pad$} {pipe} {underline:>width$} {msg}\n",
        "",
        pad = pad,
        pipe = pipe,
        num = num,
        code = code,
        underline = underline,
        width = col + width,
        msg = err.msg
    )
}

fn to_line_col(lines: &[&str], offset: usize) -> (usize, usize) {
    let mut n = 0;
    for (i, line) in lines.iter().enumerate() {
        let len = line.len() + 1;
        if n + len > offset {
            return (i, str_width(&line[..offset - n]));
        }
        n += len;
    }
    (
        lines.len().saturating_sub(1),
        lines.last().map(|l| str_width(l)).unwrap_or(0),
    )
}

#[cfg(feature = "unicode")]
fn str_width(s: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(s)
}

#[cfg(not(feature = "unicode"))]
fn str_width(s: &str) -> usize {
    s.chars().count()
}
