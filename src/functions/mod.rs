//! Functions callable from template expressions.
//!
//! There are three kinds:
//! - User functions registered with
//!   [`LoaderBuilder::function`][crate::LoaderBuilder::function].
//! - The builtin functions like `len` and `sorted`, see [`builtins`].
//! - Methods on strings, lists and maps like `"a b".split()`, see
//!   [`methods`].

mod args;
pub(crate) mod builtins;
pub(crate) mod methods;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use crate::types::ast;
use crate::types::program::Origin;
use crate::{Error, Value};

/// A type erased user function.
pub(crate) type FunctionFn = dyn Fn(Vec<Value>) -> Result<Value, String> + Send + Sync + 'static;

/// The user functions of a loader by name.
pub(crate) type Functions = BTreeMap<String, Arc<FunctionFn>>;

pub(crate) fn new<F, R, A>(f: F) -> Arc<FunctionFn>
where
    F: Function<R, A> + Send + Sync + 'static,
    R: FunctionReturn,
    A: FunctionArgs,
{
    Arc::new(move |values: Vec<Value>| -> Result<Value, String> {
        let args = A::from_values(values)?;
        let result = Function::call(&f, args);
        FunctionReturn::to_value(result)
    })
}

/// Represents any user function.
///
/// This trait is used by the
/// [`LoaderBuilder::function`][crate::LoaderBuilder::function] method to
/// abstract over a variety of function and closure types with different
/// argument types, return types and arity. The renderer checks the number and
/// type of arguments when the function is called.
///
/// [`Function`] is implemented for functions with up to four arguments that
/// return any of the following types.
///
/// - `R` where `R` implements `Into<Value>`
/// - `Result<R, E>` where `R` implements `Into<Value>` and `E` implements
///   [`Display`]
///
/// Arguments can be any of the following owned types.
/// - [`bool`]
/// - [`i64`] and the other integer types
/// - [`f64`], integers are converted
/// - [`String`]
/// - [`Vec<Value>`]
/// - [`BTreeMap<String, Value>`][std::collections::BTreeMap]
/// - [`Value`]
///
/// ## Examples
///
/// ```
/// let loader = flango::Loader::builder(".")
///     .function("shout", |s: String| format!("{}!", s.to_uppercase()))
///     .function("ratio", |a: f64, b: f64| {
///         if b == 0.0 {
///             Err("ratio of zero")
///         } else {
///             Ok(a / b)
///         }
///     })
///     .build();
///
/// let result = loader
///     .compile("{{ shout('hi') }} {{ ratio(1, 4) }}")?
///     .render(flango::value! {})?;
/// assert_eq!(result, "HI! 0.25");
/// # Ok::<(), flango::Error>(())
/// ```
pub trait Function<R, A> {
    #[doc(hidden)]
    fn call(&self, args: A) -> R;
}

/// The arguments of a [`Function`], implemented for tuples.
pub trait FunctionArgs: Sized {
    #[doc(hidden)]
    fn from_values(values: Vec<Value>) -> Result<Self, String>;
}

/// A single argument of a [`Function`].
pub trait FunctionArg: Sized {
    #[doc(hidden)]
    fn from_value(v: Value) -> args::Result<Self>;
}

/// The return type of a [`Function`].
pub trait FunctionReturn {
    #[doc(hidden)]
    fn to_value(self) -> Result<Value, String>;
}

////////////////////////////////////////////////////////////////////////////////
// Function
////////////////////////////////////////////////////////////////////////////////

macro_rules! impl_function {
    ($($arg:ident)*) => {
        impl<Func, R, $($arg,)*> Function<R, ($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> R,
            $($arg: FunctionArg,)*
        {
            #[allow(non_snake_case)]
            fn call(&self, ($($arg,)*): ($($arg,)*)) -> R {
                self($($arg),*)
            }
        }

        impl<$($arg,)*> FunctionArgs for ($($arg,)*)
        where
            $($arg: FunctionArg,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn from_values(values: Vec<Value>) -> Result<Self, String> {
                let expected = <[&str]>::len(&[$(stringify!($arg)),*]);
                if values.len() != expected {
                    return Err(format!(
                        "function expected {} arguments, found {}",
                        expected,
                        values.len()
                    ));
                }
                let mut values = values.into_iter();
                $(
                    let $arg = match values.next() {
                        Some(v) => $arg::from_value(v).map_err(err_expected_arg)?,
                        None => return Err(String::from("missing argument")),
                    };
                )*
                Ok(($($arg,)*))
            }
        }
    };
}

impl_function! {}
impl_function! { A }
impl_function! { A B }
impl_function! { A B C }
impl_function! { A B C D }

fn err_expected_arg(err: args::Error) -> String {
    match err {
        args::Error::Type(exp, got) => {
            format!("function expected {exp} argument, found {got}")
        }
        args::Error::TryFromInt(ty, i) => {
            format!("function expected {ty} argument, but {i} is out of range")
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// FunctionReturn
////////////////////////////////////////////////////////////////////////////////

impl<T> FunctionReturn for T
where
    T: Into<Value>,
{
    fn to_value(self) -> Result<Value, String> {
        Ok(self.into())
    }
}

impl<T, E> FunctionReturn for Result<T, E>
where
    T: Into<Value>,
    E: Display,
{
    fn to_value(self) -> Result<Value, String> {
        self.map(Into::into).map_err(|e| e.to_string())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Builtins and higher order functions
////////////////////////////////////////////////////////////////////////////////

/// An argument passed to a builtin function.
pub(crate) enum Arg<'r> {
    Value(Value),
    Callable(Callable<'r>),
}

/// A function passed as an argument, e.g. `map(lambda x: x * 2, xs)` or
/// `sorted(xs, len)`.
#[derive(Clone, Copy)]
pub(crate) enum Callable<'r> {
    Lambda {
        lambda: &'r ast::Lambda,
        origin: &'r Origin,
    },
    Named(&'r str),
}

/// Calls a [`Callable`], implemented by the renderer.
pub(crate) trait Invoke<'r> {
    fn invoke(&mut self, f: Callable<'r>, args: Vec<Value>) -> Result<Value, CallError>;
}

/// The error returned by a builtin function.
///
/// A message is attached to the span of the call. An error is raised from
/// inside a lambda body and already points at the right place.
#[derive(Debug)]
pub(crate) enum CallError {
    Message(String),
    Error(Error),
}

impl From<String> for CallError {
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

impl From<&str> for CallError {
    fn from(msg: &str) -> Self {
        Self::Message(msg.to_owned())
    }
}

impl From<Error> for CallError {
    fn from(err: Error) -> Self {
        Self::Error(err)
    }
}
