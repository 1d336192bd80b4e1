use crate::types::span::Span;
use crate::{Error, Result};

/// A lexer that splits template source into literal text and directives.
///
/// The lexer is implemented as a fallible iterator. The parser should
/// repeatedly call the [`.next()?`][Lexer::next] method which returns the
/// literal text preceding the next directive along with the directive
/// itself, until [`None`] is returned. Whatever is left after that is
/// available through [`.remaining()`][Lexer::remaining].
#[derive(Debug)]
pub struct Lexer<'source> {
    /// The original template source.
    pub source: &'source str,

    /// A cursor over the template source.
    cursor: usize,
}

/// A directive found in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'source> {
    /// An interpolation, e.g. `{{ user.name }}`
    Variable {
        /// The trimmed expression.
        expr: &'source str,
        /// The span of the trimmed expression.
        span: Span,
    },

    /// An end tag, e.g. `{% endif %}`
    EndTag { kind: EndKind },

    /// Any other statement, e.g. `{% for x in xs %}`
    Statement {
        /// The leading identifier.
        keyword: &'source str,
        /// The trimmed remainder after the keyword.
        arg: &'source str,
        /// The span of the remainder.
        arg_span: Span,
    },
}

/// The construct closed by an end tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndKind {
    If,
    For,
    While,
    Block,
    Try,
}

impl<'source> Lexer<'source> {
    /// Construct a new lexer.
    pub fn new(source: &'source str) -> Self {
        Self { source, cursor: 0 }
    }

    /// Returns the literal text before the next directive, the directive and
    /// the span of the whole directive including its delimiters.
    #[allow(clippy::type_complexity)]
    pub fn next(&mut self) -> Result<Option<(&'source str, Token<'source>, Span)>> {
        let mut i = self.cursor;
        loop {
            // xxxxxxx{{ xxxxx }}xxxx
            //    ^   ^ ^     ^ ^
            //    i   j k     l m
            let j = match find_begin(self.source, i) {
                Some(j) => j,
                None => return Ok(None),
            };
            let k = j + 2;
            let end = match &self.source[j..k] {
                "{{" => "}}",
                _ => "%}",
            };
            let l = match self.source[k..].find(end) {
                Some(l) => k + l,
                None => {
                    // An unclosed opener is literal text, keep looking after
                    // it.
                    i = j + 1;
                    continue;
                }
            };
            let m = l + 2;
            let span = Span::from(j..m);
            let tk = match end {
                "}}" => self.lex_variable(k, l, span)?,
                _ => self.lex_statement(k, l, span)?,
            };
            let literal = &self.source[self.cursor..j];
            self.cursor = m;
            return Ok(Some((literal, tk, span)));
        }
    }

    /// Returns the source after the last directive returned.
    pub fn remaining(&self) -> &'source str {
        &self.source[self.cursor..]
    }

    /// Whether the whole source has been consumed.
    pub fn is_empty(&self) -> bool {
        self.cursor == self.source.len()
    }

    fn lex_variable(&self, k: usize, l: usize, span: Span) -> Result<Token<'source>> {
        let (expr, expr_span) = trimmed(self.source, k, l);
        if expr.is_empty() {
            return Err(Error::syntax("expected expression", self.source, span));
        }
        Ok(Token::Variable {
            expr,
            span: expr_span,
        })
    }

    fn lex_statement(&self, k: usize, l: usize, span: Span) -> Result<Token<'source>> {
        let (stmt, stmt_span) = trimmed(self.source, k, l);
        if stmt.is_empty() {
            return Err(Error::syntax("expected statement", self.source, span));
        }

        let kind = match stmt {
            "endif" => Some(EndKind::If),
            "endfor" => Some(EndKind::For),
            "endwhile" => Some(EndKind::While),
            "endblock" => Some(EndKind::Block),
            "endtry" => Some(EndKind::Try),
            _ => None,
        };
        if let Some(kind) = kind {
            return Ok(Token::EndTag { kind });
        }

        let n = stmt
            .char_indices()
            .find(|&(_, c)| !is_word(c))
            .map(|(n, _)| n)
            .unwrap_or(stmt.len());
        if n == 0 {
            return Err(Error::syntax("expected keyword", self.source, stmt_span));
        }
        let keyword = &stmt[..n];
        let (arg, arg_span) = trimmed(self.source, stmt_span.m + n, stmt_span.n);
        Ok(Token::Statement {
            keyword,
            arg,
            arg_span,
        })
    }
}

/// Finds the next `{{` or `{%` at or after `i`.
fn find_begin(source: &str, mut i: usize) -> Option<usize> {
    while let Some(j) = source[i..].find('{') {
        let j = i + j;
        match source.as_bytes().get(j + 1) {
            Some(b'{') | Some(b'%') => return Some(j),
            _ => i = j + 1,
        }
    }
    None
}

/// Returns `source[i..j]` trimmed and its span.
fn trimmed(source: &str, i: usize, j: usize) -> (&str, Span) {
    let s = &source[i..j];
    let start = i + (s.len() - s.trim_start().len());
    let end = j - (s.len() - s.trim_end().len());
    let end = end.max(start);
    (&source[start..end], Span::from(start..end))
}

#[cfg(feature = "unicode")]
fn is_word(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_continue(c)
}

#[cfg(not(feature = "unicode"))]
fn is_word(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

impl EndKind {
    pub fn human(&self) -> &'static str {
        match self {
            Self::If => "`endif`",
            Self::For => "`endfor`",
            Self::While => "`endwhile`",
            Self::Block => "`endblock`",
            Self::Try => "`endtry`",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Result<(Vec<(&str, Token<'_>)>, &str)> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some((literal, tk, _)) = lexer.next()? {
            tokens.push((literal, tk));
        }
        Ok((tokens, lexer.remaining()))
    }

    #[test]
    fn lex_empty() {
        let (tokens, rest) = lex("").unwrap();
        assert!(tokens.is_empty());
        assert_eq!(rest, "");
    }

    #[test]
    fn lex_raw() {
        let (tokens, rest) = lex("lorem ipsum").unwrap();
        assert!(tokens.is_empty());
        assert_eq!(rest, "lorem ipsum");
    }

    #[test]
    fn lex_variable() {
        let (tokens, rest) = lex("Hello, {{  name }}!").unwrap();
        assert_eq!(
            tokens,
            [(
                "Hello, ",
                Token::Variable {
                    expr: "name",
                    span: Span::from(11..15)
                }
            )]
        );
        assert_eq!(rest, "!");
    }

    #[test]
    fn lex_end_tags() {
        let (tokens, _) = lex("{% endif %}{%endfor%}{% endwhile %}{% endblock %}{% endtry %}").unwrap();
        let kinds: Vec<_> = tokens
            .into_iter()
            .map(|(_, tk)| match tk {
                Token::EndTag { kind } => kind,
                tk => panic!("unexpected token {tk:?}"),
            })
            .collect();
        assert_eq!(
            kinds,
            [
                EndKind::If,
                EndKind::For,
                EndKind::While,
                EndKind::Block,
                EndKind::Try
            ]
        );
    }

    #[test]
    fn lex_statement() {
        let (tokens, _) = lex("{% for  i in range(10)  %}").unwrap();
        assert_eq!(
            tokens,
            [(
                "",
                Token::Statement {
                    keyword: "for",
                    arg: "i in range(10)",
                    arg_span: Span::from(8..22),
                }
            )]
        );
    }

    #[test]
    fn lex_statement_without_argument() {
        let (tokens, _) = lex("{% else %}").unwrap();
        assert_eq!(
            tokens,
            [(
                "",
                Token::Statement {
                    keyword: "else",
                    arg: "",
                    arg_span: Span::from(7..7),
                }
            )]
        );
    }

    #[test]
    fn lex_unclosed_is_literal() {
        let (tokens, rest) = lex("a {{ b").unwrap();
        assert!(tokens.is_empty());
        assert_eq!(rest, "a {{ b");

        let (tokens, rest) = lex("a {{ b {% else %} c").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].0, "a {{ b ");
        assert_eq!(rest, " c");
    }

    #[test]
    fn lex_first_closer_wins() {
        let (tokens, rest) = lex("{{ a }} }}").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(rest, " }}");
    }

    #[test]
    fn lex_err_empty_variable() {
        let err = lex("x {{ }}").unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "
   |
 1 | x {{ }}
   |   ^^^^^ expected expression
"
        );
    }

    #[test]
    fn lex_err_not_a_keyword() {
        let err = lex("{% 'x' %}").unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "
   |
 1 | {% 'x' %}
   |    ^^^ expected keyword
"
        );
    }
}
