//! Operators, comparisons and lookups on [`Value`]s.
//!
//! These return plain messages as errors, the caller attaches the span of the
//! offending expression.

use std::cmp::Ordering;

use crate::types::ast::{BinaryOp, CompareOp};
use crate::value::ValueCow;
use crate::Value;

type Result<T> = std::result::Result<T, String>;

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Self> {
        match *value {
            Value::Bool(b) => Some(Self::Int(i64::from(b))),
            Value::Integer(i) => Some(Self::Int(i)),
            Value::Float(f) => Some(Self::Float(f)),
            _ => None,
        }
    }

    fn float(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Mul, Value::String(s), n) | (BinaryOp::Mul, n, Value::String(s))
            if is_int(n) =>
        {
            let n = times(n);
            repeat_len(s.len(), n)?;
            Ok(Value::String(s.repeat(n)))
        }
        (BinaryOp::Mul, Value::List(list), n) | (BinaryOp::Mul, n, Value::List(list))
            if is_int(n) =>
        {
            let len = repeat_len(list.len(), times(n))?;
            Ok(Value::List(list.iter().cloned().cycle().take(len).collect()))
        }
        _ => match (Num::of(lhs), Num::of(rhs)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => int_op(op, a, b),
            (Some(a), Some(b)) => float_op(op, a.float(), b.float()),
            _ => Err(format!(
                "unsupported operand types for `{}`: {} and {}",
                op.human(),
                lhs.human(),
                rhs.human()
            )),
        },
    }
}

/// The maximum length of a string (in bytes) or a list built by an operator
/// or builtin from a template supplied count.
pub const MAX_LEN: usize = 1 << 24;

/// Returns `len * n` if it is at most [`MAX_LEN`].
fn repeat_len(len: usize, n: usize) -> Result<usize> {
    len.checked_mul(n)
        .filter(|&total| total <= MAX_LEN)
        .ok_or_else(|| String::from("repetition too large"))
}

fn is_int(value: &Value) -> bool {
    matches!(value, Value::Integer(_) | Value::Bool(_))
}

fn times(value: &Value) -> usize {
    match Num::of(value) {
        Some(Num::Int(n)) => usize::try_from(n).unwrap_or(0),
        _ => 0,
    }
}

fn int_op(op: BinaryOp, a: i64, b: i64) -> Result<Value> {
    let overflow = || String::from("integer overflow");
    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Integer).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::Integer).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::Integer).ok_or_else(overflow),
        BinaryOp::Div => match b {
            0 => Err(String::from("division by zero")),
            _ => Ok(Value::Float(a as f64 / b as f64)),
        },
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(String::from("integer division by zero"));
            }
            let q = a.checked_div(b).ok_or_else(overflow)?;
            match a % b != 0 && ((a < 0) != (b < 0)) {
                true => Ok(Value::Integer(q - 1)),
                false => Ok(Value::Integer(q)),
            }
        }
        BinaryOp::Rem => {
            if b == 0 {
                return Err(String::from("integer modulo by zero"));
            }
            let r = a.checked_rem(b).ok_or_else(overflow)?;
            match r != 0 && ((r < 0) != (b < 0)) {
                true => Ok(Value::Integer(r + b)),
                false => Ok(Value::Integer(r)),
            }
        }
        BinaryOp::Pow => match u32::try_from(b) {
            Ok(exp) => a.checked_pow(exp).map(Value::Integer).ok_or_else(overflow),
            Err(_) if b < 0 => Ok(Value::Float((a as f64).powf(b as f64))),
            Err(_) => Err(overflow()),
        },
    }
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Result<Value> {
    let f = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Rem if b == 0.0 => {
            return Err(String::from("float division by zero"));
        }
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Rem => {
            let r = a % b;
            match r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                true => r + b,
                false => r,
            }
        }
        BinaryOp::Pow => a.powf(b),
    };
    Ok(Value::Float(f))
}

/// Negation and unary plus.
pub fn negate(value: &Value, negative: bool) -> Result<Value> {
    match (Num::of(value), negative) {
        (Some(Num::Int(i)), true) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| String::from("integer overflow")),
        (Some(Num::Int(i)), false) => Ok(Value::Integer(i)),
        (Some(Num::Float(f)), true) => Ok(Value::Float(-f)),
        (Some(Num::Float(f)), false) => Ok(Value::Float(f)),
        (None, _) => Err(format!(
            "bad operand type for unary `{}`: {}",
            if negative { "-" } else { "+" },
            value.human()
        )),
    }
}

pub fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool> {
    match op {
        CompareOp::Eq => Ok(equals(lhs, rhs)),
        CompareOp::Ne => Ok(!equals(lhs, rhs)),
        CompareOp::In => contains(rhs, lhs),
        CompareOp::NotIn => contains(rhs, lhs).map(|b| !b),
        CompareOp::Is => Ok(identical(lhs, rhs)),
        CompareOp::IsNot => Ok(!identical(lhs, rhs)),
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let ord = match (Num::of(lhs), Num::of(rhs)) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
                // Comparisons involving NaN are always false.
                (Some(a), Some(b)) => match a.float().partial_cmp(&b.float()) {
                    Some(ord) => Some(ord),
                    None => return Ok(false),
                },
                _ => order(lhs, rhs),
            };
            let ord = ord.ok_or_else(|| {
                format!(
                    "`{}` not supported between {} and {}",
                    op.human(),
                    lhs.human(),
                    rhs.human()
                )
            })?;
            Ok(match op {
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Le => ord != Ordering::Greater,
                CompareOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            })
        }
    }
}

/// Equality where integers, floats and booleans compare by numeric value.
pub fn equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::None, Value::None) => true,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| equals(a, b))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).map_or(false, |other| equals(v, other)))
        }
        _ => match (Num::of(lhs), Num::of(rhs)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
            (Some(a), Some(b)) => a.float() == b.float(),
            _ => false,
        },
    }
}

/// Total order used by comparisons and sorting, `None` if the values are not
/// comparable.
pub fn order(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                if !equals(x, y) {
                    return order(x, y);
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => match (Num::of(lhs), Num::of(rhs)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
            (Some(a), Some(b)) => a.float().partial_cmp(&b.float()),
            _ => None,
        },
    }
}

/// `None` is only ever identical to `None` and booleans to equal booleans.
/// Other values have no identity and are never identical.
fn identical(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

/// Implements `item in container`.
pub fn contains(container: &Value, item: &Value) -> Result<bool> {
    match (container, item) {
        (Value::String(s), Value::String(sub)) => Ok(s.contains(sub.as_str())),
        (Value::String(_), item) => Err(format!(
            "`in <string>` requires string as left operand, not {}",
            item.human()
        )),
        (Value::List(list), item) => Ok(list.iter().any(|v| equals(v, item))),
        (Value::Map(map), Value::String(key)) => Ok(map.contains_key(key)),
        (Value::Map(_), _) => Ok(false),
        (container, _) => Err(format!("{} is not a container", container.human())),
    }
}

/// Looks up `value.name`, only maps have attributes.
pub fn attr<'a>(value: ValueCow<'a>, name: &str) -> Result<ValueCow<'a>> {
    let not_found = || format!("key `{name}` not found in map");
    match value {
        ValueCow::Borrowed(Value::Map(map)) => {
            map.get(name).map(ValueCow::Borrowed).ok_or_else(not_found)
        }
        ValueCow::Owned(Value::Map(mut map)) => {
            map.remove(name).map(ValueCow::Owned).ok_or_else(not_found)
        }
        value => Err(format!(
            "cannot access attribute `{name}` of {}",
            value.human()
        )),
    }
}

/// Looks up `value[index]`.
pub fn index<'a>(value: ValueCow<'a>, index: &Value) -> Result<ValueCow<'a>> {
    match (value, index) {
        (ValueCow::Borrowed(Value::List(list)), Value::Integer(i)) => {
            let i = position(*i, list.len()).ok_or("list index out of range")?;
            Ok(ValueCow::Borrowed(&list[i]))
        }
        (ValueCow::Owned(Value::List(mut list)), Value::Integer(i)) => {
            let i = position(*i, list.len()).ok_or("list index out of range")?;
            Ok(ValueCow::Owned(list.swap_remove(i)))
        }
        (value, Value::Integer(i)) if matches!(&*value, Value::String(_)) => {
            let s = match &*value {
                Value::String(s) => s,
                _ => unreachable!(),
            };
            let i = position(*i, s.chars().count()).ok_or("string index out of range")?;
            let c = s.chars().nth(i).ok_or("string index out of range")?;
            Ok(ValueCow::Owned(Value::from(c)))
        }
        (ValueCow::Borrowed(Value::Map(map)), Value::String(key)) => map
            .get(key)
            .map(ValueCow::Borrowed)
            .ok_or_else(|| format!("key `{key}` not found in map")),
        (ValueCow::Owned(Value::Map(mut map)), Value::String(key)) => map
            .remove(key)
            .map(ValueCow::Owned)
            .ok_or_else(|| format!("key `{key}` not found in map")),
        (value, index) => Err(format!(
            "cannot index {} with {}",
            value.human(),
            index.human()
        )),
    }
}

/// Resolves a possibly negative index into a position in `0..len`.
fn position(i: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let i = if i < 0 { i + len } else { i };
    match (0..len).contains(&i) {
        true => usize::try_from(i).ok(),
        false => None,
    }
}

/// Implements `value[start:stop]` on lists and strings, clamping the bounds
/// like Python does.
pub fn slice(value: &Value, start: Option<&Value>, stop: Option<&Value>) -> Result<Value> {
    let bound = |v: Option<&Value>| match v {
        None | Some(Value::None) => Ok(None),
        Some(Value::Integer(i)) => Ok(Some(*i)),
        Some(v) => Err(format!("slice indices must be integers, not {}", v.human())),
    };
    let (start, stop) = (bound(start)?, bound(stop)?);
    match value {
        Value::List(list) => {
            let (m, n) = clamp(list.len(), start, stop);
            Ok(Value::List(list[m..n].to_vec()))
        }
        Value::String(s) => {
            let (m, n) = clamp(s.chars().count(), start, stop);
            Ok(Value::String(s.chars().skip(m).take(n - m).collect()))
        }
        value => Err(format!("cannot slice {}", value.human())),
    }
}

fn clamp(len: usize, start: Option<i64>, stop: Option<i64>) -> (usize, usize) {
    let n = i64::try_from(len).unwrap_or(i64::MAX);
    let fix = |i: i64| {
        let i = if i < 0 { (i + n).max(0) } else { i.min(n) };
        usize::try_from(i).unwrap_or(0)
    };
    let m = start.map_or(0, fix);
    let n = stop.map_or(len, fix);
    (m, n.max(m))
}
