//! Methods on strings, lists and maps.

use crate::fmt;
use crate::render::iter::items;
use crate::render::value::equals;
use crate::Value;

type Result<T> = std::result::Result<T, String>;

/// Calls the method `name` on `value`.
pub fn call(value: &Value, name: &str, args: Vec<Value>) -> Result<Value> {
    match value {
        Value::String(s) => string(s, name, args),
        Value::List(list) => match name {
            "index" => {
                let [x] = exactly::<1>(name, args)?;
                list.iter()
                    .position(|v| equals(v, &x))
                    .map(Value::from)
                    .ok_or_else(|| format!("{} is not in list", fmt::repr(&x)))
            }
            "count" => {
                let [x] = exactly::<1>(name, args)?;
                Ok(Value::from(list.iter().filter(|v| equals(v, &x)).count()))
            }
            _ => Err(unknown(value, name)),
        },
        Value::Map(map) => match name {
            "keys" => {
                exactly::<0>(name, args)?;
                Ok(map.keys().map(Value::from).collect())
            }
            "values" => {
                exactly::<0>(name, args)?;
                Ok(map.values().cloned().collect())
            }
            "items" => {
                exactly::<0>(name, args)?;
                Ok(map
                    .iter()
                    .map(|(k, v)| Value::List(vec![Value::from(k), v.clone()]))
                    .collect())
            }
            "get" => {
                let (key, default) = match <[Value; 2]>::try_from(args) {
                    Ok([key, default]) => (key, default),
                    Err(args) => {
                        let [key] = exactly::<1>(name, args)?;
                        (key, Value::None)
                    }
                };
                match key {
                    Value::String(key) => Ok(map.get(&key).cloned().unwrap_or(default)),
                    _ => Ok(default),
                }
            }
            _ => Err(unknown(value, name)),
        },
        _ => Err(unknown(value, name)),
    }
}

fn string(s: &str, name: &str, args: Vec<Value>) -> Result<Value> {
    match name {
        "upper" => {
            exactly::<0>(name, args)?;
            Ok(Value::from(s.to_uppercase()))
        }
        "lower" => {
            exactly::<0>(name, args)?;
            Ok(Value::from(s.to_lowercase()))
        }
        "strip" | "lstrip" | "rstrip" => {
            let chars = match optional_str(name, args)? {
                Some(chars) => chars.chars().collect(),
                None => Vec::new(),
            };
            let pat = |c: char| match chars.is_empty() {
                true => c.is_whitespace(),
                false => chars.contains(&c),
            };
            let stripped = match name {
                "strip" => s.trim_matches(pat),
                "lstrip" => s.trim_start_matches(pat),
                _ => s.trim_end_matches(pat),
            };
            Ok(Value::from(stripped))
        }
        "split" => {
            let (sep, max) = match args.len() {
                0 => (None, None),
                1 | 2 => {
                    let mut args = args.into_iter();
                    let sep = match args.next() {
                        Some(Value::String(sep)) => Some(sep),
                        Some(Value::None) | None => None,
                        Some(v) => return Err(expected_str(name, &v)),
                    };
                    let max = match args.next() {
                        Some(Value::Integer(i)) if i >= 0 => usize::try_from(i).ok(),
                        Some(Value::Integer(_)) | None => None,
                        Some(v) => {
                            return Err(format!(
                                "split() maxsplit must be an integer, not {}",
                                v.human()
                            ))
                        }
                    };
                    (sep, max)
                }
                n => return Err(arity(name, "at most 2", n)),
            };
            split(s, sep.as_deref(), max)
        }
        "join" => {
            let [iterable] = exactly::<1>(name, args)?;
            let parts = items(&iterable)
                .ok_or_else(|| format!("{} is not iterable", iterable.human()))?;
            let mut joined = Vec::with_capacity(parts.len());
            for part in parts {
                match part {
                    Value::String(part) => joined.push(part),
                    v => {
                        return Err(format!(
                            "join() expected string items, found {}",
                            v.human()
                        ))
                    }
                }
            }
            Ok(Value::from(joined.join(s)))
        }
        "replace" => {
            let mut args = args.into_iter();
            let (old, new, count) = match (args.next(), args.next(), args.next(), args.next()) {
                (Some(Value::String(old)), Some(Value::String(new)), None, None) => {
                    (old, new, None)
                }
                (
                    Some(Value::String(old)),
                    Some(Value::String(new)),
                    Some(Value::Integer(count)),
                    None,
                ) => (old, new, usize::try_from(count).ok()),
                _ => return Err(String::from("replace() expected two strings and an optional count")),
            };
            Ok(Value::from(match count {
                Some(count) => s.replacen(&old, &new, count),
                None => s.replace(&old, &new),
            }))
        }
        "startswith" => {
            let prefix = required_str(name, args)?;
            Ok(Value::Bool(s.starts_with(&prefix)))
        }
        "endswith" => {
            let suffix = required_str(name, args)?;
            Ok(Value::Bool(s.ends_with(&suffix)))
        }
        "find" => {
            let sub = required_str(name, args)?;
            Ok(match s.find(&sub) {
                Some(i) => Value::from(s[..i].chars().count()),
                None => Value::Integer(-1),
            })
        }
        "count" => {
            let sub = required_str(name, args)?;
            let n = match sub.is_empty() {
                true => s.chars().count() + 1,
                false => s.matches(&sub).count(),
            };
            Ok(Value::from(n))
        }
        "title" => {
            exactly::<0>(name, args)?;
            let mut titled = String::with_capacity(s.len());
            let mut prev_cased = false;
            for c in s.chars() {
                match prev_cased {
                    true => titled.extend(c.to_lowercase()),
                    false => titled.extend(c.to_uppercase()),
                }
                prev_cased = c.is_alphabetic();
            }
            Ok(Value::from(titled))
        }
        "capitalize" => {
            exactly::<0>(name, args)?;
            let mut chars = s.chars();
            let capitalized: String = match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            };
            Ok(Value::from(capitalized))
        }
        _ => Err(format!("string has no method `{name}`")),
    }
}

fn split(s: &str, sep: Option<&str>, max: Option<usize>) -> Result<Value> {
    let parts: Vec<&str> = match (sep, max) {
        (Some(""), _) => return Err(String::from("empty separator")),
        (Some(sep), Some(max)) => s.splitn(max + 1, sep).collect(),
        (Some(sep), None) => s.split(sep).collect(),
        (None, None) => s.split_whitespace().collect(),
        (None, Some(max)) => {
            let mut parts = Vec::new();
            let mut rest = s.trim_start();
            while !rest.is_empty() {
                if parts.len() == max {
                    parts.push(rest);
                    break;
                }
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                parts.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            parts
        }
    };
    Ok(parts.into_iter().map(Value::from).collect())
}

fn exactly<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N]> {
    <[Value; N]>::try_from(args).map_err(|args| arity(name, &N.to_string(), args.len()))
}

fn required_str(name: &str, args: Vec<Value>) -> Result<String> {
    match exactly::<1>(name, args)? {
        [Value::String(s)] => Ok(s),
        [v] => Err(expected_str(name, &v)),
    }
}

fn optional_str(name: &str, args: Vec<Value>) -> Result<Option<String>> {
    match args.len() {
        0 => Ok(None),
        _ => match exactly::<1>(name, args)? {
            [Value::String(s)] => Ok(Some(s)),
            [Value::None] => Ok(None),
            [v] => Err(expected_str(name, &v)),
        },
    }
}

fn expected_str(name: &str, v: &Value) -> String {
    format!("{name}() expected string argument, found {}", v.human())
}

fn arity(name: &str, expected: &str, found: usize) -> String {
    format!("{name}() expected {expected} arguments, found {found}")
}

fn unknown(value: &Value, name: &str) -> String {
    format!("{} has no method `{name}`", value.human())
}
