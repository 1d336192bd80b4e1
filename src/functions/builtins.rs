//! Builtin functions.

use std::cmp::Ordering;

use crate::fmt;
use crate::functions::{Arg, CallError, Callable, Invoke};
use crate::render::iter::items;
use crate::render::value::{binary, order, MAX_LEN};
use crate::types::ast::BinaryOp;
use crate::Value;

type Result<T> = std::result::Result<T, CallError>;

/// A builtin function.
pub type Builtin = for<'r> fn(&mut dyn Invoke<'r>, Vec<Arg<'r>>) -> Result<Value>;

/// Returns the builtin function with the given name.
pub fn lookup(name: &str) -> Option<Builtin> {
    let f: Builtin = match name {
        "len" => len,
        "abs" => abs,
        "str" => str,
        "int" => int,
        "float" => float,
        "bool" => bool,
        "list" => list,
        "range" => range,
        "sum" => sum,
        "min" => min,
        "max" => max,
        "sorted" => sorted,
        "reversed" => reversed,
        "enumerate" => enumerate,
        "zip" => zip,
        "map" => map,
        "filter" => filter,
        "round" => round,
        "any" => any,
        "all" => all,
        "escape" => escape,
        _ => return None,
    };
    Some(f)
}

fn len<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let [v] = exactly::<1>("len", args)?;
    let n = match &v {
        Value::String(s) => s.chars().count(),
        Value::List(l) => l.len(),
        Value::Map(m) => m.len(),
        v => return Err(format!("object of type {} has no len()", v.human()).into()),
    };
    Ok(Value::from(n))
}

fn abs<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let [v] = exactly::<1>("abs", args)?;
    match v {
        Value::Bool(b) => Ok(Value::Integer(i64::from(b))),
        Value::Integer(i) => i
            .checked_abs()
            .map(Value::Integer)
            .ok_or_else(|| "integer overflow".into()),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        v => Err(format!("bad operand type for abs(): {}", v.human()).into()),
    }
}

fn str<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    match optional::<1>("str", args)? {
        [None] => Ok(Value::from("")),
        [Some(v)] => Ok(Value::String(fmt::to_str(&v))),
    }
}

fn int<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let v = match optional::<1>("int", args)? {
        [None] => return Ok(Value::Integer(0)),
        [Some(v)] => v,
    };
    match v {
        Value::Bool(b) => Ok(Value::Integer(i64::from(b))),
        Value::Integer(i) => Ok(Value::Integer(i)),
        Value::Float(f) if f.is_finite() && f.trunc().abs() < i64::MAX as f64 => {
            Ok(Value::Integer(f.trunc() as i64))
        }
        Value::Float(f) => Err(format!("cannot convert float {} to integer", fmt::float(f)).into()),
        Value::String(s) => s
            .trim()
            .replace('_', "")
            .parse()
            .map(Value::Integer)
            .map_err(|_| format!("invalid literal for int(): {}", fmt::repr(&Value::String(s))).into()),
        v => Err(format!("int() argument must be a string or a number, not {}", v.human()).into()),
    }
}

fn float<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let v = match optional::<1>("float", args)? {
        [None] => return Ok(Value::Float(0.0)),
        [Some(v)] => v,
    };
    match v {
        Value::Bool(b) => Ok(Value::Float(f64::from(u8::from(b)))),
        Value::Integer(i) => Ok(Value::Float(i as f64)),
        Value::Float(f) => Ok(Value::Float(f)),
        Value::String(s) => s.trim().parse().map(Value::Float).map_err(|_| {
            format!(
                "could not convert string to float: {}",
                fmt::repr(&Value::String(s))
            )
            .into()
        }),
        v => Err(format!("float() argument must be a string or a number, not {}", v.human()).into()),
    }
}

fn bool<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    match optional::<1>("bool", args)? {
        [None] => Ok(Value::Bool(false)),
        [Some(v)] => Ok(Value::Bool(v.is_truthy())),
    }
}

fn list<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    match optional::<1>("list", args)? {
        [None] => Ok(Value::List(Vec::new())),
        [Some(v)] => iterable(&v).map(Value::List),
    }
}

fn range<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let args = values("range", args)?;
    let ints = args
        .iter()
        .map(|v| match v {
            Value::Integer(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            v => Err(CallError::from(format!(
                "range() expected integer arguments, found {}",
                v.human()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    let (start, stop, step) = match ints[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => return Err(arity("range", "1 to 3", ints.len())),
    };
    if step == 0 {
        return Err("range() arg 3 must not be zero".into());
    }
    let (m, n, k) = (i128::from(start), i128::from(stop), i128::from(step));
    let len = match step > 0 {
        true => (n - m + k - 1) / k,
        false => (m - n - k - 1) / -k,
    };
    if len > MAX_LEN as i128 {
        return Err("range() result too large".into());
    }
    let mut list = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        list.push(Value::Integer(i));
        i = match i.checked_add(step) {
            Some(i) => i,
            None => break,
        };
    }
    Ok(Value::List(list))
}

fn sum<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let (items, start) = match <[_; 2]>::try_from(values("sum", args)?) {
        Ok([items, start]) => (items, start),
        Err(args) => match <[_; 1]>::try_from(args) {
            Ok([items]) => (items, Value::Integer(0)),
            Err(args) => return Err(arity("sum", "1 or 2", args.len())),
        },
    };
    iterable(&items)?
        .iter()
        .try_fold(start, |acc, v| binary(BinaryOp::Add, &acc, v))
        .map_err(CallError::from)
}

fn min<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    extreme("min", args, Ordering::Less)
}

fn max<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    extreme("max", args, Ordering::Greater)
}

fn extreme(name: &str, args: Vec<Arg<'_>>, wanted: Ordering) -> Result<Value> {
    let mut args = values(name, args)?;
    let candidates = match args.len() {
        0 => return Err(arity(name, "at least 1", 0)),
        1 => iterable(&args.remove(0))?,
        _ => args,
    };
    let mut best: Option<Value> = None;
    for v in candidates {
        best = match best {
            None => Some(v),
            Some(b) => match order(&v, &b) {
                Some(ord) if ord == wanted => Some(v),
                Some(_) => Some(b),
                None => return Err(not_comparable(&v, &b)),
            },
        };
    }
    best.ok_or_else(|| format!("{name}() arg is an empty sequence").into())
}

fn sorted<'r>(invoke: &mut dyn Invoke<'r>, mut args: Vec<Arg<'r>>) -> Result<Value> {
    let key = match args.len() {
        1 => None,
        2 => match args.pop() {
            Some(Arg::Callable(f)) => Some(f),
            _ => return Err("sorted() key must be a function".into()),
        },
        n => return Err(arity("sorted", "1 or 2", n)),
    };
    let [v] = exactly::<1>("sorted", args)?;
    let list = iterable(&v)?;

    let mut keyed = Vec::with_capacity(list.len());
    for item in list {
        let k = match key {
            Some(f) => invoke.invoke(f, vec![item.clone()])?,
            None => item.clone(),
        };
        keyed.push((k, item));
    }

    let mut err = None;
    keyed.sort_by(|(a, _), (b, _)| match order(a, b) {
        Some(ord) => ord,
        None => {
            err.get_or_insert_with(|| not_comparable(a, b));
            Ordering::Equal
        }
    });
    match err {
        Some(err) => Err(err),
        None => Ok(keyed.into_iter().map(|(_, item)| item).collect()),
    }
}

fn reversed<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let [v] = exactly::<1>("reversed", args)?;
    let mut list = iterable(&v)?;
    list.reverse();
    Ok(Value::List(list))
}

fn enumerate<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let mut args = values("enumerate", args)?;
    let start = match args.len() {
        1 => 0,
        2 => match args.pop() {
            Some(Value::Integer(i)) => i,
            Some(v) => {
                return Err(format!("enumerate() start must be an integer, not {}", v.human()).into())
            }
            None => 0,
        },
        n => return Err(arity("enumerate", "1 or 2", n)),
    };
    let list = iterable(&args[0])?;
    Ok(list
        .into_iter()
        .zip(start..)
        .map(|(item, i)| Value::List(vec![Value::Integer(i), item]))
        .collect())
}

fn zip<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let lists = values("zip", args)?
        .iter()
        .map(iterable)
        .collect::<Result<Vec<_>>>()?;
    let n = lists.iter().map(Vec::len).min().unwrap_or(0);
    Ok((0..n)
        .map(|i| Value::List(lists.iter().map(|l| l[i].clone()).collect()))
        .collect())
}

fn map<'r>(invoke: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let (f, v) = callable_and_value("map", args)?;
    let f = f.ok_or("map() expected a function")?;
    iterable(&v)?
        .into_iter()
        .map(|item| invoke.invoke(f, vec![item]))
        .collect::<Result<Vec<_>>>()
        .map(Value::List)
}

fn filter<'r>(invoke: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let (f, v) = callable_and_value("filter", args)?;
    let mut kept = Vec::new();
    for item in iterable(&v)? {
        let keep = match f {
            Some(f) => invoke.invoke(f, vec![item.clone()])?.is_truthy(),
            None => item.is_truthy(),
        };
        if keep {
            kept.push(item);
        }
    }
    Ok(Value::List(kept))
}

fn round<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let mut args = values("round", args)?;
    let digits = match args.len() {
        1 => None,
        2 => match args.pop() {
            Some(Value::Integer(d)) => Some(d),
            Some(Value::None) | None => None,
            Some(v) => {
                return Err(format!("round() ndigits must be an integer, not {}", v.human()).into())
            }
        },
        n => return Err(arity("round", "1 or 2", n)),
    };
    match (&args[0], digits) {
        (Value::Integer(i), _) => Ok(Value::Integer(*i)),
        (Value::Bool(b), _) => Ok(Value::Integer(i64::from(*b))),
        (Value::Float(f), None) => {
            let r = round_half_even(*f);
            if r.is_finite() && r.abs() < i64::MAX as f64 {
                Ok(Value::Integer(r as i64))
            } else {
                Err(format!("cannot convert float {} to integer", fmt::float(*f)).into())
            }
        }
        (Value::Float(f), Some(d)) => {
            let scale = 10f64.powi(i32::try_from(d).unwrap_or(if d < 0 { i32::MIN } else { i32::MAX }));
            let scaled = f * scale;
            if !scaled.is_finite() || scale == 0.0 {
                return Ok(Value::Float(*f));
            }
            Ok(Value::Float(round_half_even(scaled) / scale))
        }
        (v, _) => Err(format!("type {} doesn't define round()", v.human()).into()),
    }
}

/// Rounds to the nearest integer, ties to even.
fn round_half_even(f: f64) -> f64 {
    if (f - f.trunc()).abs() == 0.5 {
        2.0 * (f / 2.0).round()
    } else {
        f.round()
    }
}

fn any<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let [v] = exactly::<1>("any", args)?;
    Ok(Value::Bool(iterable(&v)?.iter().any(Value::is_truthy)))
}

fn all<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let [v] = exactly::<1>("all", args)?;
    Ok(Value::Bool(iterable(&v)?.iter().all(Value::is_truthy)))
}

fn escape<'r>(_: &mut dyn Invoke<'r>, args: Vec<Arg<'r>>) -> Result<Value> {
    let [v] = exactly::<1>("escape", args)?;
    Ok(Value::String(fmt::escape_html(&fmt::to_str(&v))))
}

////////////////////////////////////////////////////////////////////////////////
// Argument helpers
////////////////////////////////////////////////////////////////////////////////

/// Unwraps the arguments into values, functions are not allowed.
fn values(name: &str, args: Vec<Arg<'_>>) -> Result<Vec<Value>> {
    args.into_iter()
        .map(|arg| match arg {
            Arg::Value(v) => Ok(v),
            Arg::Callable(_) => Err(format!("{name}() does not accept a function argument").into()),
        })
        .collect()
}

fn exactly<const N: usize>(name: &str, args: Vec<Arg<'_>>) -> Result<[Value; N]> {
    let args = values(name, args)?;
    <[Value; N]>::try_from(args).map_err(|args| arity(name, &N.to_string(), args.len()))
}

fn optional<const N: usize>(name: &str, args: Vec<Arg<'_>>) -> Result<[Option<Value>; N]> {
    let args = values(name, args)?;
    if args.len() > N {
        return Err(arity(name, &format!("at most {N}"), args.len()));
    }
    let mut out = [(); N].map(|_| None);
    for (slot, v) in out.iter_mut().zip(args) {
        *slot = Some(v);
    }
    Ok(out)
}

/// Splits the arguments of `map` and `filter`. `None` stands for the missing
/// function of `filter(None, xs)`.
fn callable_and_value<'r>(
    name: &str,
    args: Vec<Arg<'r>>,
) -> Result<(Option<Callable<'r>>, Value)> {
    let mut args = args.into_iter();
    match (args.next(), args.next(), args.next()) {
        (Some(Arg::Callable(f)), Some(Arg::Value(v)), None) => Ok((Some(f), v)),
        (Some(Arg::Value(Value::None)), Some(Arg::Value(v)), None) => Ok((None, v)),
        (Some(_), Some(_), None) => Err(format!("{name}() expected a function and an iterable").into()),
        (a, b, c) => {
            let n = [a.is_some(), b.is_some(), c.is_some()]
                .iter()
                .filter(|x| **x)
                .count()
                + args.count();
            Err(arity(name, "2", n))
        }
    }
}

fn iterable(v: &Value) -> Result<Vec<Value>> {
    items(v).ok_or_else(|| format!("{} is not iterable", v.human()).into())
}

fn arity(name: &str, expected: &str, found: usize) -> CallError {
    CallError::from(format!(
        "{name}() expected {expected} arguments, found {found}"
    ))
}

fn not_comparable(a: &Value, b: &Value) -> CallError {
    CallError::from(format!(
        "`<` not supported between {} and {}",
        a.human(),
        b.human()
    ))
}
