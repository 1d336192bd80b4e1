use std::slice;
use std::vec;

use crate::value::{btree_map, ValueCow};
use crate::Value;

/// An iterator over the items of an iterable value.
///
/// Lists yield their items, maps their keys and strings their characters.
/// Items borrowed from the render context stay borrowed.
pub enum Items<'a> {
    ListBorrowed(slice::Iter<'a, Value>),
    KeysBorrowed(btree_map::Keys<'a, String, Value>),
    Owned(vec::IntoIter<Value>),
}

impl<'a> Items<'a> {
    /// Returns an iterator over `value` or `None` if it is not iterable.
    pub fn new(value: ValueCow<'a>) -> Option<Self> {
        match value {
            ValueCow::Borrowed(Value::List(list)) => Some(Self::ListBorrowed(list.iter())),
            ValueCow::Borrowed(Value::Map(map)) => Some(Self::KeysBorrowed(map.keys())),
            ValueCow::Owned(Value::List(list)) => Some(Self::Owned(list.into_iter())),
            ValueCow::Owned(Value::Map(map)) => Some(Self::Owned(
                map.into_keys().map(Value::String).collect::<Vec<_>>().into_iter(),
            )),
            value => match &*value {
                Value::String(s) => Some(Self::Owned(
                    s.chars().map(Value::from).collect::<Vec<_>>().into_iter(),
                )),
                _ => None,
            },
        }
    }
}

impl<'a> Iterator for Items<'a> {
    type Item = ValueCow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::ListBorrowed(iter) => iter.next().map(ValueCow::Borrowed),
            Self::KeysBorrowed(iter) => iter.next().map(|k| ValueCow::Owned(Value::from(k))),
            Self::Owned(iter) => iter.next().map(ValueCow::Owned),
        }
    }
}

/// Collects the items of an iterable value, used by the builtin functions.
pub fn items(value: &Value) -> Option<Vec<Value>> {
    Items::new(ValueCow::Borrowed(value)).map(|items| items.map(ValueCow::into_owned).collect())
}

/// Splits a loop item across multiple loop variables.
pub fn unpack(item: ValueCow<'_>, n: usize) -> Result<Vec<ValueCow<'_>>, String> {
    let err = |human: &str| format!("cannot unpack {human} into {n} variables");
    match item {
        ValueCow::Borrowed(Value::List(list)) if list.len() == n => {
            Ok(list.iter().map(ValueCow::Borrowed).collect())
        }
        ValueCow::Owned(Value::List(list)) if list.len() == n => {
            Ok(list.into_iter().map(ValueCow::Owned).collect())
        }
        item => match &*item {
            Value::List(list) => Err(err(&format!("list of length {}", list.len()))),
            item => Err(err(item.human())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_of_each_iterable() {
        assert_eq!(items(&Value::from("ab")), Some(vec![Value::from("a"), Value::from("b")]));
        let map = Value::from([("x", 1), ("y", 2)]);
        assert_eq!(items(&map), Some(vec![Value::from("x"), Value::from("y")]));
        assert_eq!(items(&Value::from(1)), None);
    }

    #[test]
    fn unpack_pairs() {
        let pair = Value::from(vec![1, 2]);
        let vars = unpack(ValueCow::Borrowed(&pair), 2).unwrap();
        assert_eq!(*vars[1], Value::from(2));
        let err = unpack(ValueCow::Borrowed(&pair), 3).unwrap_err();
        assert_eq!(err, "cannot unpack list of length 2 into 3 variables");
        let err = unpack(ValueCow::Owned(Value::from(1)), 2).unwrap_err();
        assert_eq!(err, "cannot unpack integer into 2 variables");
    }
}
