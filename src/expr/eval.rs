// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tree-walking evaluation of [`crate::expr::ast::Expr`]/[`Stmt`] against a
//! [`Scope`], per spec.md §4.C.

use std::sync::Arc;

use linked_hash_map::LinkedHashMap;

use crate::{
    error::{EvalError, EvalResult},
    expr::{
        ast::{AssignTarget, BinaryOp, Expr, Literal, Stmt, UnaryOp},
        function::Function,
        host::HostResolver,
        parser,
    },
    scope::Scope,
    source::Source,
    value::{Number, Value},
};

/// The shared entry point for every embedded-script surface: `def`/`eval`
/// RHS text, function bodies, and dynamic-outline expressions.
///
/// Pure with respect to the `scope` it is handed (spec.md §4.C): it never
/// mutates anything the caller didn't explicitly ask it to, via `scope`
/// itself. All side effects (variable bindings) happen through `Scope::set`
/// calls the evaluator makes on the scope it was given.
pub struct Evaluator {
    host_resolver: Arc<dyn HostResolver>,
}

impl Evaluator {
    #[must_use]
    pub fn new(host_resolver: Arc<dyn HostResolver>) -> Self {
        Self { host_resolver }
    }

    /// Evaluates `source` as a single expression and returns its value.
    pub async fn eval(&self, source: Arc<Source>, text: &str, line: usize, col: usize, scope: &Scope) -> EvalResult<Value> {
        let expr = parser::parse_expr_str(source, text, line, col)?;
        self.eval_expr(&expr, scope).await
    }

    /// Executes `source` as a sequence of statements for side effects;
    /// returns the value of the last expression statement (or `undefined`).
    pub async fn exec(&self, source: Arc<Source>, text: &str, line: usize, col: usize, scope: &Scope) -> EvalResult<Value> {
        let program = parser::parse_program_str(source, text, line, col)?;
        let mut last = Value::Undefined;
        for stmt in &program {
            match self.exec_stmt(stmt, scope).await? {
                ExecFlow::Value(v) => last = v,
                ExecFlow::Return(v) => return Ok(v),
            }
        }
        Ok(last)
    }

    /// Parses `source` as a function literal body and wraps it with
    /// `scope` as its captured defining scope.
    pub fn define_function(&self, params: Vec<String>, body: Vec<Stmt>, scope: &Scope) -> Function {
        Function::new(params, body, scope.clone())
    }

    /// Invokes `function` with `args`; `caller_scope` is unused by the
    /// function body itself (closures capture their defining scope, not
    /// the call site) but is threaded through so a future host-call
    /// extension can attribute `this`-like context if ever needed.
    pub async fn call(&self, function: &Function, args: &[Value], _caller_scope: &Scope) -> EvalResult<Value> {
        let call_scope = function.captured_scope.child();
        for (name, value) in function.params.iter().zip(args.iter()) {
            call_scope.set(name.clone(), value.clone());
        }
        for name in function.params.iter().skip(args.len()) {
            call_scope.set(name.clone(), Value::Undefined);
        }
        let mut result = Value::Undefined;
        for stmt in &function.body {
            match self.exec_stmt_boxed(stmt, &call_scope).await? {
                ExecFlow::Value(v) => result = v,
                ExecFlow::Return(v) => return Ok(v),
            }
        }
        Ok(result)
    }

    async fn exec_stmt(&self, stmt: &Stmt, scope: &Scope) -> EvalResult<ExecFlow> {
        self.exec_stmt_inner(stmt, scope).await
    }

    // Boxed indirection point for the mutually-recursive call() / exec()
    // paths; named separately so the call-stack is easy to read from a
    // panic backtrace.
    fn exec_stmt_boxed<'a>(
        &'a self,
        stmt: &'a Stmt,
        scope: &'a Scope,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = EvalResult<ExecFlow>> + 'a>> {
        Box::pin(self.exec_stmt_inner(stmt, scope))
    }

    async fn exec_stmt_inner(&self, stmt: &Stmt, scope: &Scope) -> EvalResult<ExecFlow> {
        match stmt {
            Stmt::Expr(expr) => Ok(ExecFlow::Value(self.eval_expr(expr, scope).await?)),
            Stmt::Var(name, expr) => {
                let value = self.eval_expr(expr, scope).await?;
                scope.set(name.clone(), value.clone());
                Ok(ExecFlow::Value(value))
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(e) => self.eval_expr(e, scope).await?,
                    None => Value::Undefined,
                };
                Ok(ExecFlow::Return(value))
            }
        }
    }

    fn eval_expr<'a>(&'a self, expr: &'a Expr, scope: &'a Scope) -> std::pin::Pin<Box<dyn std::future::Future<Output = EvalResult<Value>> + 'a>> {
        Box::pin(async move {
            match expr {
                Expr::Literal(lit, _) => Ok(literal_value(lit)),
                Expr::Ident(name, _) => Ok(scope.get(name)),
                Expr::Array(items, _) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval_expr(item, scope).await?);
                    }
                    Ok(Value::list(values))
                }
                Expr::Object(entries, _) => {
                    let mut map = LinkedHashMap::new();
                    for (key, value_expr) in entries {
                        map.insert(key.clone(), self.eval_expr(value_expr, scope).await?);
                    }
                    Ok(Value::map(map))
                }
                Expr::Member { target, name, optional, span } => {
                    let base = self.eval_expr(target, scope).await?;
                    self.member_get(&base, name, *optional, *span, scope)
                }
                Expr::Index { target, index, optional, span } => {
                    let base = self.eval_expr(target, scope).await?;
                    let index_value = self.eval_expr(index, scope).await?;
                    self.index_get(&base, &index_value, *optional, *span)
                }
                Expr::Call { callee, args, span } => self.eval_call(callee, args, scope, *span).await,
                Expr::FunctionDef { params, body, .. } => {
                    Ok(Value::Func(self.define_function(params.clone(), body.clone(), scope)))
                }
                Expr::Unary { op, expr, span } => {
                    let value = self.eval_expr(expr, scope).await?;
                    eval_unary(*op, &value, *span)
                }
                Expr::Binary { op, lhs, rhs, span } => {
                    if matches!(op, BinaryOp::And) {
                        let l = self.eval_expr(lhs, scope).await?;
                        if !l.is_truthy() {
                            return Ok(l);
                        }
                        return self.eval_expr(rhs, scope).await;
                    }
                    if matches!(op, BinaryOp::Or) {
                        let l = self.eval_expr(lhs, scope).await?;
                        if l.is_truthy() {
                            return Ok(l);
                        }
                        return self.eval_expr(rhs, scope).await;
                    }
                    let l = self.eval_expr(lhs, scope).await?;
                    let r = self.eval_expr(rhs, scope).await?;
                    eval_binary(*op, &l, &r, *span)
                }
                Expr::Assign { target, value, span } => {
                    let v = self.eval_expr(value, scope).await?;
                    self.assign(target, v.clone(), scope, *span).await?;
                    Ok(v)
                }
                Expr::HostLookup { type_name, .. } => {
                    self.host_resolver.resolve_type(type_name).await
                }
            }
        })
    }

    async fn eval_call(&self, callee: &Expr, args: &[Expr], scope: &Scope, span: crate::error::Span) -> EvalResult<Value> {
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval_expr(arg, scope).await?);
        }

        // `Host.lookup('x').member(...)` dispatches through the host
        // resolver rather than ordinary function invocation.
        if let Expr::Member { target, name, .. } = callee {
            let base = self.eval_expr(target, scope).await?;
            if let Value::Host(_) = &base {
                return self.host_resolver.invoke(&base, name, &arg_values).await;
            }
            if let Value::Karate(api) = &base {
                return call_karate_method(api, name, &arg_values, span, scope).await;
            }
        }

        let callee_value = self.eval_expr(callee, scope).await?;
        match callee_value {
            Value::Func(function) => self.call(&function, &arg_values, scope).await,
            other => Err(EvalError::new(span, format!("'{}' is not callable", other.type_name()))),
        }
    }

    fn member_get(&self, base: &Value, name: &str, optional: bool, span: crate::error::Span, scope: &Scope) -> EvalResult<Value> {
        match base {
            Value::Map(m) => Ok(m.lock().unwrap().get(name).cloned().unwrap_or(Value::Undefined)),
            Value::Undefined | Value::Null if optional => Ok(Value::Undefined),
            Value::Host(_) => Ok(Value::Undefined),
            // Property-style reads: `karate.properties`, `karate.env`,
            // `karate.config` (spec.md §6). Everything else on `karate` is
            // a method, handled in `eval_call`'s `Value::Karate` branch.
            Value::Karate(api) => Ok(match name {
                "properties" => api.properties(),
                "env" => api.env(),
                "config" => api.config_snapshot(scope),
                _ => Value::Undefined,
            }),
            other => Err(EvalError::new(span, format!("cannot read member '{name}' of {}", other.type_name()))),
        }
    }

    fn index_get(&self, base: &Value, index: &Value, optional: bool, span: crate::error::Span) -> EvalResult<Value> {
        match (base, index) {
            (Value::List(l), Value::Num(n)) => {
                let list = l.lock().unwrap();
                let idx = n.as_f64() as i64;
                if idx < 0 {
                    return Ok(Value::Undefined);
                }
                Ok(list.get(idx as usize).cloned().unwrap_or(Value::Undefined))
            }
            (Value::Map(m), Value::Str(key)) => Ok(m.lock().unwrap().get(key).cloned().unwrap_or(Value::Undefined)),
            (Value::Undefined | Value::Null, _) if optional => Ok(Value::Undefined),
            (other, _) => Err(EvalError::new(span, format!("cannot index into {}", other.type_name()))),
        }
    }

    async fn assign(&self, target: &AssignTarget, value: Value, scope: &Scope, span: crate::error::Span) -> EvalResult<()> {
        match target {
            AssignTarget::Ident(name) => {
                scope.set(name.clone(), value);
                Ok(())
            }
            AssignTarget::Member { target, name } => {
                let base = self.eval_expr(target, scope).await?;
                match base {
                    Value::Map(m) => {
                        m.lock().unwrap().insert(name.clone(), value);
                        Ok(())
                    }
                    other => Err(EvalError::new(span, format!("cannot assign member on {}", other.type_name()))),
                }
            }
            AssignTarget::Index { target, index } => {
                let base = self.eval_expr(target, scope).await?;
                let index_value = self.eval_expr(index, scope).await?;
                match (base, index_value) {
                    (Value::List(l), Value::Num(n)) => {
                        let idx = n.as_f64() as usize;
                        let mut list = l.lock().unwrap();
                        if idx >= list.len() {
                            list.resize(idx + 1, Value::Undefined);
                        }
                        list[idx] = value;
                        Ok(())
                    }
                    (Value::Map(m), Value::Str(key)) => {
                        m.lock().unwrap().insert(key, value);
                        Ok(())
                    }
                    (other, _) => Err(EvalError::new(span, format!("cannot assign index on {}", other.type_name()))),
                }
            }
        }
    }
}

enum ExecFlow {
    Value(Value),
    Return(Value),
}

/// Dispatches a `karate.<name>(...)` call to [`crate::karate_api::KarateApi`]
/// (spec.md §6). Zero-arg property names (`properties`/`env`/`config`) are
/// also callable as a convenience, matching the source's permissive style.
async fn call_karate_method(
    api: &Arc<crate::karate_api::KarateApi>,
    name: &str,
    args: &[Value],
    span: crate::error::Span,
    scope: &Scope,
) -> EvalResult<Value> {
    match name {
        "properties" => Ok(api.properties()),
        "env" => Ok(api.env()),
        "config" => Ok(api.config_snapshot(scope)),
        "log" => {
            api.log(args);
            Ok(Value::Undefined)
        }
        "embed" => {
            let bytes = match args.first() {
                Some(Value::Bytes(b)) => b.clone(),
                Some(Value::Str(s)) => s.clone().into_bytes(),
                Some(other) => other.display_string().into_bytes(),
                None => Vec::new(),
            };
            let mime_type = match args.get(1) {
                Some(Value::Str(s)) => s.clone(),
                _ => "text/plain".to_string(),
            };
            api.embed(bytes, mime_type);
            Ok(Value::Undefined)
        }
        "call" | "callSingle" => {
            let path = match args.first() {
                Some(Value::Str(s)) => s.clone(),
                _ => return Err(EvalError::new(span, format!("karate.{name} requires a string path argument"))),
            };
            let arg = args.get(1).cloned().unwrap_or(Value::Undefined);
            let result = if name == "call" { api.call(&path, arg).await } else { api.call_single(&path, arg).await };
            result.map_err(|e| EvalError::new(span, e.to_string()))
        }
        "get" => {
            let key = match args.first() {
                Some(Value::Str(s)) => s.clone(),
                _ => return Err(EvalError::new(span, "karate.get requires a string variable name".to_string())),
            };
            let value = scope.get(&key);
            match value {
                Value::Undefined => Ok(args.get(1).cloned().unwrap_or(Value::Null)),
                other => Ok(other),
            }
        }
        "set" => {
            let key = match args.first() {
                Some(Value::Str(s)) => s.clone(),
                _ => return Err(EvalError::new(span, "karate.set requires a string variable name".to_string())),
            };
            let value = args.get(1).cloned().unwrap_or(Value::Undefined);
            scope.set(key, value);
            Ok(Value::Undefined)
        }
        "setup" => {
            let name = match args.first() {
                Some(Value::Str(s)) => Some(s.clone()),
                _ => None,
            };
            api.setup(name.as_deref()).await.map_err(|e| EvalError::new(span, e.to_string()))
        }
        other => Err(EvalError::new(span, format!("karate.{other} is not a recognised function"))),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Undefined => Value::Undefined,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Num(n) => Value::float(*n),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

fn eval_unary(op: UnaryOp, value: &Value, span: crate::error::Span) -> EvalResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Num(Number::Int(i)) => Ok(Value::int(-i)),
            Value::Num(Number::Float(f)) => Ok(Value::float(-f)),
            other => Err(EvalError::new(span, format!("cannot negate {}", other.type_name()))),
        },
    }
}

fn eval_binary(op: BinaryOp, lhs: &Value, rhs: &Value, span: crate::error::Span) -> EvalResult<Value> {
    use BinaryOp::{Add, Div, Eq, Gt, Gte, Lt, Lte, Mod, Mul, NotEq, Sub};
    match op {
        Eq => Ok(Value::Bool(lhs.deep_eq(rhs))),
        NotEq => Ok(Value::Bool(!lhs.deep_eq(rhs))),
        Add => match (lhs, rhs) {
            (Value::Str(a), b) => Ok(Value::Str(format!("{a}{}", b.display_string()))),
            (a, Value::Str(b)) if !matches!(a, Value::Str(_)) => Ok(Value::Str(format!("{}{b}", a.display_string()))),
            (Value::Num(a), Value::Num(b)) => Ok(numeric_result(a.as_f64() + b.as_f64(), *a, *b)),
            _ => Err(EvalError::new(span, format!("cannot add {} and {}", lhs.type_name(), rhs.type_name()))),
        },
        Sub | Mul | Div | Mod => {
            let (Value::Num(a), Value::Num(b)) = (lhs, rhs) else {
                return Err(EvalError::new(span, format!("cannot apply arithmetic to {} and {}", lhs.type_name(), rhs.type_name())));
            };
            let result = match op {
                Sub => a.as_f64() - b.as_f64(),
                Mul => a.as_f64() * b.as_f64(),
                Div => a.as_f64() / b.as_f64(),
                Mod => a.as_f64() % b.as_f64(),
                _ => unreachable!(),
            };
            Ok(numeric_result(result, *a, *b))
        }
        Lt | Lte | Gt | Gte => {
            let (Value::Num(a), Value::Num(b)) = (lhs, rhs) else {
                return Err(EvalError::new(span, format!("cannot compare {} and {}", lhs.type_name(), rhs.type_name())));
            };
            let (a, b) = (a.as_f64(), b.as_f64());
            Ok(Value::Bool(match op {
                Lt => a < b,
                Lte => a <= b,
                Gt => a > b,
                Gte => a >= b,
                _ => unreachable!(),
            }))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit ops handled by the caller"),
    }
}

fn numeric_result(result: f64, a: Number, b: Number) -> Value {
    if matches!((a, b), (Number::Int(_), Number::Int(_))) && result.fract() == 0.0 {
        Value::int(result as i64)
    } else {
        Value::float(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::RunConfig, expr::host::UnsupportedHostResolver, karate_api::KarateApi, scope::Scope, source::Source};

    fn evaluator() -> Evaluator {
        Evaluator::new(Arc::new(UnsupportedHostResolver))
    }

    fn scope_with_karate() -> Scope {
        let scope = Scope::root();
        let api = Arc::new(KarateApi::new(RunConfig::default()));
        scope.set("karate", Value::Karate(api));
        scope
    }

    #[tokio::test]
    async fn karate_properties_and_env_are_readable_as_member_access() {
        let mut config = RunConfig::default();
        config.env = "e2e".to_string();
        let scope = Scope::root();
        scope.set("karate", Value::Karate(Arc::new(KarateApi::new(config))));

        let source = Arc::new(Source::new("t.feature", ""));
        let env = evaluator().eval(source.clone(), "karate.env", 0, 0, &scope).await.unwrap();
        assert_eq!(env, Value::from("e2e"));
    }

    #[tokio::test]
    async fn karate_log_call_does_not_error_and_returns_undefined() {
        let scope = scope_with_karate();
        let source = Arc::new(Source::new("t.feature", ""));
        let result = evaluator().eval(source, "karate.log('hello', 1)", 0, 0, &scope).await.unwrap();
        assert_eq!(result, Value::Undefined);
    }

    #[tokio::test]
    async fn karate_call_single_without_dispatcher_surfaces_as_eval_error() {
        let scope = scope_with_karate();
        let source = Arc::new(Source::new("t.feature", ""));
        let result = evaluator().eval(source, "karate.callSingle('x.feature')", 0, 0, &scope).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn karate_config_reflects_scope_snapshot() {
        let scope = Scope::root();
        scope.set("foo", Value::int(42));
        scope.set("karate", Value::Karate(Arc::new(KarateApi::new(RunConfig::default()))));

        let source = Arc::new(Source::new("t.feature", ""));
        let config = evaluator().eval(source, "karate.config", 0, 0, &scope).await.unwrap();
        match config {
            Value::Map(m) => assert_eq!(m.lock().unwrap().get("foo"), Some(&Value::int(42))),
            other => panic!("expected map, got {other:?}"),
        }
    }
}
