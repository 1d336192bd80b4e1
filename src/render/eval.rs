//! Expression evaluation.

use crate::functions::{builtins, methods, Arg, CallError, Callable, Invoke};
use crate::render::core::Renderer;
use crate::render::value;
use crate::types::ast;
use crate::types::program::{Expression, Origin};
use crate::types::span::Span;
use crate::value::{Map, ValueCow};
use crate::{Error, Result, Value};

impl<'r, 'a> Renderer<'r, 'a> {
    pub fn eval(&mut self, expression: &'r Expression) -> Result<ValueCow<'a>> {
        self.eval_expr(&expression.origin, &expression.expr)
    }

    pub(super) fn eval_expr(
        &mut self,
        origin: &'r Origin,
        expr: &'r ast::Expr,
    ) -> Result<ValueCow<'a>> {
        let err = |msg: String, span: Span| origin.err_render(msg, span);

        match expr {
            ast::Expr::Literal(lit) => Ok(ValueCow::Owned(lit.value.clone())),

            ast::Expr::Var(ident) => match self.stack.lookup(&ident.name) {
                Some(value) => Ok(value),
                None if self.is_function(&ident.name) => Err(err(
                    format!("function `{}` can only be called", ident.name),
                    ident.span,
                )),
                None => Err(err(format!("`{}` is not defined", ident.name), ident.span)),
            },

            ast::Expr::List(list) => {
                let mut items = Vec::with_capacity(list.items.len());
                for item in &list.items {
                    items.push(self.eval_expr(origin, item)?.into_owned());
                }
                Ok(ValueCow::Owned(Value::List(items)))
            }

            ast::Expr::Map(map) => {
                let mut entries = Map::new();
                for (key, value) in &map.entries {
                    let k = match self.eval_expr(origin, key)?.into_owned() {
                        Value::String(k) => k,
                        k => {
                            return Err(err(
                                format!("map key must be a string, found {}", k.human()),
                                key.span(),
                            ))
                        }
                    };
                    let v = self.eval_expr(origin, value)?.into_owned();
                    entries.insert(k, v);
                }
                Ok(ValueCow::Owned(Value::Map(entries)))
            }

            ast::Expr::Attr(attr) => {
                let base = self.eval_expr(origin, &attr.base)?;
                value::attr(base, &attr.name.name).map_err(|msg| err(msg, attr.name.span))
            }

            ast::Expr::Index(index) => {
                let base = self.eval_expr(origin, &index.base)?;
                let i = self.eval_expr(origin, &index.index)?;
                value::index(base, &i).map_err(|msg| err(msg, index.index.span()))
            }

            ast::Expr::Slice(slice) => {
                let base = self.eval_expr(origin, &slice.base)?;
                let start = self.eval_opt(origin, slice.start.as_ref())?;
                let stop = self.eval_opt(origin, slice.stop.as_ref())?;
                value::slice(&base, start.as_deref(), stop.as_deref())
                    .map(ValueCow::Owned)
                    .map_err(|msg| err(msg, slice.span))
            }

            ast::Expr::Call(call) => self.eval_call(origin, call).map(ValueCow::Owned),

            ast::Expr::Unary(unary) => {
                let v = self.eval_expr(origin, &unary.expr)?;
                let result = match unary.op {
                    ast::UnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
                    ast::UnaryOp::Neg => value::negate(&v, true),
                    ast::UnaryOp::Pos => value::negate(&v, false),
                };
                result
                    .map(ValueCow::Owned)
                    .map_err(|msg| err(msg, unary.span))
            }

            ast::Expr::Binary(binary) => {
                let lhs = self.eval_expr(origin, &binary.lhs)?;
                let rhs = self.eval_expr(origin, &binary.rhs)?;
                value::binary(binary.op, &lhs, &rhs)
                    .map(ValueCow::Owned)
                    .map_err(|msg| err(msg, binary.span))
            }

            ast::Expr::Compare(cmp) => {
                let mut lhs = self.eval_expr(origin, &cmp.first)?;
                for (op, expr) in &cmp.rest {
                    let rhs = self.eval_expr(origin, expr)?;
                    let ok = value::compare(*op, &lhs, &rhs).map_err(|msg| err(msg, cmp.span))?;
                    if !ok {
                        return Ok(ValueCow::Owned(Value::Bool(false)));
                    }
                    lhs = rhs;
                }
                Ok(ValueCow::Owned(Value::Bool(true)))
            }

            ast::Expr::Logical(logical) => {
                let lhs = self.eval_expr(origin, &logical.lhs)?;
                match (logical.op, lhs.is_truthy()) {
                    (ast::LogicalOp::And, false) | (ast::LogicalOp::Or, true) => Ok(lhs),
                    _ => self.eval_expr(origin, &logical.rhs),
                }
            }

            ast::Expr::Cond(cond) => match self.eval_expr(origin, &cond.cond)?.is_truthy() {
                true => self.eval_expr(origin, &cond.then),
                false => self.eval_expr(origin, &cond.otherwise),
            },
        }
    }

    fn eval_opt(
        &mut self,
        origin: &'r Origin,
        expr: Option<&'r ast::Expr>,
    ) -> Result<Option<ValueCow<'a>>> {
        expr.map(|expr| self.eval_expr(origin, expr)).transpose()
    }

    fn eval_call(&mut self, origin: &'r Origin, call: &'r ast::Call) -> Result<Value> {
        let err = |msg: String| origin.err_render(msg, call.span);

        match &call.func {
            // A method call, e.g. `name.upper()`
            ast::Expr::Attr(attr) => {
                let base = self.eval_expr(origin, &attr.base)?;
                let args = self.args(origin, &call.args)?;
                reject_callables(origin, &args, &call.args, || {
                    format!("method `{}` does not accept a function argument", attr.name.name)
                })?;
                let args = args
                    .into_iter()
                    .filter_map(|arg| match arg {
                        Arg::Value(v) => Some(v),
                        Arg::Callable(_) => None,
                    })
                    .collect();
                methods::call(&base, &attr.name.name, args).map_err(err)
            }

            // A function call, e.g. `len(xs)`
            ast::Expr::Var(ident) if !self.stack.contains(&ident.name) => {
                let args = self.args(origin, &call.args)?;
                if self.functions.contains_key(&ident.name) {
                    reject_callables(origin, &args, &call.args, || {
                        format!("function `{}` does not accept a function argument", ident.name)
                    })?;
                }
                match self.call_function(&ident.name, args) {
                    Some(Ok(value)) => Ok(value),
                    Some(Err(CallError::Message(msg))) => Err(err(msg)),
                    Some(Err(CallError::Error(e))) => Err(e),
                    None => Err(origin.err_render(
                        format!("`{}` is not defined", ident.name),
                        ident.span,
                    )),
                }
            }

            func => {
                let value = self.eval_expr(origin, func)?;
                Err(origin.err_render(
                    format!("{} is not callable", value.human()),
                    func.span(),
                ))
            }
        }
    }

    /// Evaluates call arguments. Lambdas and bare function names are passed
    /// as callables.
    fn args(&mut self, origin: &'r Origin, args: &'r [ast::Arg]) -> Result<Vec<Arg<'r>>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            let arg = match arg {
                ast::Arg::Lambda(lambda) => Arg::Callable(Callable::Lambda { lambda, origin }),
                ast::Arg::Expr(ast::Expr::Var(ident))
                    if !self.stack.contains(&ident.name) && self.is_function(&ident.name) =>
                {
                    Arg::Callable(Callable::Named(&ident.name))
                }
                ast::Arg::Expr(expr) => Arg::Value(self.eval_expr(origin, expr)?.into_owned()),
            };
            out.push(arg);
        }
        Ok(out)
    }

    /// Calls a user function or a builtin, returns `None` if neither exists.
    /// User functions shadow builtins.
    fn call_function(
        &mut self,
        name: &str,
        args: Vec<Arg<'r>>,
    ) -> Option<std::result::Result<Value, CallError>> {
        if let Some(f) = self.functions.get(name) {
            let f = f.clone();
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                match arg {
                    Arg::Value(v) => values.push(v),
                    Arg::Callable(_) => {
                        let msg = format!("function `{name}` does not accept a function argument");
                        return Some(Err(CallError::Message(msg)));
                    }
                }
            }
            return Some(f(values).map_err(CallError::Message));
        }
        let f = builtins::lookup(name)?;
        Some(f(self, args))
    }

    fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name) || builtins::lookup(name).is_some()
    }
}

impl<'r, 'a> Invoke<'r> for Renderer<'r, 'a> {
    fn invoke(
        &mut self,
        f: Callable<'r>,
        args: Vec<Value>,
    ) -> std::result::Result<Value, CallError> {
        match f {
            Callable::Lambda { lambda, origin } => {
                if args.len() != lambda.params.len() {
                    return Err(CallError::Message(format!(
                        "lambda expected {} arguments, found {}",
                        lambda.params.len(),
                        args.len()
                    )));
                }
                self.stack.push_frame();
                for (param, value) in lambda.params.iter().zip(args) {
                    self.stack.bind(&param.name, ValueCow::Owned(value));
                }
                let result = self.eval_expr(origin, &lambda.body);
                self.stack.pop_frame();
                Ok(result?.into_owned())
            }
            Callable::Named(name) => {
                let args = args.into_iter().map(Arg::Value).collect();
                match self.call_function(name, args) {
                    Some(result) => result,
                    None => Err(CallError::Error(Error::new(
                        crate::ErrorKind::Render,
                        format!("`{name}` is not defined"),
                    ))),
                }
            }
        }
    }
}

/// Fails at the first argument that was passed as a callable.
fn reject_callables<F>(origin: &Origin, args: &[Arg<'_>], exprs: &[ast::Arg], msg: F) -> Result<()>
where
    F: FnOnce() -> String,
{
    match args
        .iter()
        .zip(exprs)
        .find(|(arg, _)| matches!(arg, Arg::Callable(_)))
    {
        Some((_, expr)) => Err(origin.err_render(msg(), expr.span())),
        None => Ok(()),
    }
}
