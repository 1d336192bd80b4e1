//! Formatting of values for output.
//!
//! Values are displayed the way `str()` displays them: `None`, `True` and
//! `False`, floats always with a fractional part or an exponent, and lists
//! and maps with their items quoted.

use std::fmt::Write;

use crate::Value;

/// Returns the display form of a value, as emitted by `{{ expr }}`.
pub fn to_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        _ => repr(value),
    }
}

/// Returns the quoted form of a value, used for items of lists and maps.
pub fn repr(value: &Value) -> String {
    let mut s = String::new();
    write_repr(&mut s, value);
    s
}

fn write_repr(s: &mut String, value: &Value) {
    match value {
        Value::None => s.push_str("None"),
        Value::Bool(true) => s.push_str("True"),
        Value::Bool(false) => s.push_str("False"),
        Value::Integer(i) => {
            let _ = write!(s, "{i}");
        }
        Value::Float(f) => s.push_str(&float(*f)),
        Value::String(string) => write_quoted(s, string),
        Value::List(list) => {
            s.push('[');
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                write_repr(s, item);
            }
            s.push(']');
        }
        Value::Map(map) => {
            s.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                write_quoted(s, key);
                s.push_str(": ");
                write_repr(s, item);
            }
            s.push('}');
        }
    }
}

fn write_quoted(s: &mut String, string: &str) {
    let quote = if string.contains('\'') && !string.contains('"') {
        '"'
    } else {
        '\''
    };
    s.push(quote);
    for c in string.chars() {
        match c {
            '\\' => s.push_str("\\\\"),
            '\n' => s.push_str("\\n"),
            '\r' => s.push_str("\\r"),
            '\t' => s.push_str("\\t"),
            c if c == quote => {
                s.push('\\');
                s.push(c);
            }
            c => s.push(c),
        }
    }
    s.push(quote);
}

/// Formats a float, switching to exponent notation for very large and very
/// small magnitudes.
pub fn float(f: f64) -> String {
    if f.is_nan() {
        return String::from("nan");
    }
    if f.is_infinite() {
        return String::from(if f > 0.0 { "inf" } else { "-inf" });
    }
    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let e = format!("{f:e}");
        return match e.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => e,
        };
    }
    let s = f.to_string();
    if s.contains('.') {
        s
    } else {
        s + ".0"
    }
}

/// Escapes the HTML special characters `&`, `<`, `>`, `"` and `'`.
pub fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_str_scalars() {
        assert_eq!(to_str(&Value::None), "None");
        assert_eq!(to_str(&Value::Bool(true)), "True");
        assert_eq!(to_str(&Value::Integer(-7)), "-7");
        assert_eq!(to_str(&Value::from("hi")), "hi");
    }

    #[test]
    fn to_str_floats() {
        assert_eq!(to_str(&Value::Float(2.0)), "2.0");
        assert_eq!(to_str(&Value::Float(1.5)), "1.5");
        assert_eq!(to_str(&Value::Float(0.1)), "0.1");
        assert_eq!(to_str(&Value::Float(1e20)), "1e+20");
        assert_eq!(to_str(&Value::Float(1.5e-7)), "1.5e-07");
    }

    #[test]
    fn to_str_collections() {
        let list = Value::from(vec![Value::from(1), Value::from("a"), Value::None]);
        assert_eq!(to_str(&list), "[1, 'a', None]");
        let map = Value::from([("a", Value::from(1)), ("b", Value::from("it's"))]);
        assert_eq!(to_str(&map), r#"{'a': 1, 'b': "it's"}"#);
    }

    #[test]
    fn escape_html_all() {
        assert_eq!(escape_html(r#"<b>&"'"#), "&lt;b&gt;&amp;&quot;&#039;");
    }
}
