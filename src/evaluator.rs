use crate::ast::{AssignTarget, BinaryOp, Expr, LogicalOp, Program, UnaryOp};
use crate::error::{SiltError, Span};
use crate::value::{Closure, NativeFunction, Object, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Handle into the evaluator's environment arena. Closures hold one of
/// these to keep referring to their defining scope after it is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvId(usize);

#[derive(Debug)]
struct Environment {
    values: HashMap<String, Value>,
    parent: Option<EnvId>,
    this_value: Option<Value>,
}

/// How an evaluation step left its expression. `return`, `break`, and
/// `continue` travel up the call stack as ordinary return values until the
/// matching handler (function call or loop) consumes them; the span records
/// where the exit originated for top-level error reports.
enum Flow {
    Normal(Value),
    Return(Value, Span),
    Break(Value, Span),
    Continue(Value, Span),
}

/// Unwraps a `Normal` evaluation result, returning any control-flow exit
/// to the caller untouched.
macro_rules! eval_value {
    ($self:expr, $expr:expr, $env:expr) => {
        match $self.eval($expr, $env)? {
            Flow::Normal(value) => value,
            other => return Ok(other),
        }
    };
}

pub struct Evaluator {
    envs: Vec<Environment>,
    globals: EnvId,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            envs: vec![Environment {
                values: HashMap::new(),
                parent: None,
                this_value: None,
            }],
            globals: EnvId(0),
        }
    }

    /// Registers a host function in the root environment. The function
    /// receives its evaluated arguments; an `Err` becomes a type error at
    /// the call site.
    pub fn register_native<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        let native = NativeFunction {
            name: name.to_string(),
            func: Box::new(func),
        };
        self.define(self.globals, name, Value::Native(Rc::new(native)));
    }

    /// Binds an arbitrary value in the root environment.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.define(self.globals, name, value);
    }

    /// Evaluates a program under the root environment and returns the value
    /// of its last top-level expression.
    pub fn evaluate(&mut self, program: &Program) -> Result<Value, SiltError> {
        let mut result = Value::Undefined;
        for expr in &program.body {
            match self.eval(expr, self.globals)? {
                Flow::Normal(value) => result = value,
                Flow::Return(_, span) => {
                    return Err(SiltError::control_flow_error(
                        span,
                        "'return' outside of a function".to_string(),
                    ));
                }
                Flow::Break(_, span) => {
                    return Err(SiltError::control_flow_error(
                        span,
                        "'break' with no enclosing loop".to_string(),
                    ));
                }
                Flow::Continue(_, span) => {
                    return Err(SiltError::control_flow_error(
                        span,
                        "'continue' with no enclosing loop".to_string(),
                    ));
                }
            }
        }
        Ok(result)
    }

    fn eval(&mut self, expr: &Expr, env: EnvId) -> Result<Flow, SiltError> {
        match expr {
            Expr::Literal { value, .. } => Ok(Flow::Normal(value.clone())),
            Expr::Variable { name, span } => self
                .lookup(env, name)
                .map(Flow::Normal)
                .ok_or_else(|| SiltError::undefined_variable(span.clone(), name)),
            Expr::This { .. } => Ok(Flow::Normal(self.current_this(env))),
            Expr::List { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(eval_value!(self, element, env));
                }
                Ok(Flow::Normal(Value::list(items)))
            }
            Expr::Object { entries, .. } => {
                let mut object = Object::new();
                for (key, value_expr) in entries {
                    let value = eval_value!(self, value_expr, env);
                    object.set(key.clone(), value);
                }
                Ok(Flow::Normal(Value::object(object)))
            }
            Expr::Block { body, .. } => {
                let block_env = self.new_env(Some(env), None);
                let mut result = Value::Undefined;
                for expr in body {
                    result = eval_value!(self, expr, block_env);
                }
                Ok(Flow::Normal(result))
            }
            Expr::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let condition_value = eval_value!(self, condition, env);
                if condition_value.is_truthy() {
                    self.eval(then_branch, env)
                } else if let Some(else_expr) = else_branch {
                    self.eval(else_expr, env)
                } else {
                    Ok(Flow::Normal(Value::Undefined))
                }
            }
            Expr::While {
                condition, body, ..
            } => {
                let mut results = Vec::new();
                loop {
                    let condition_value = eval_value!(self, condition, env);
                    if !condition_value.is_truthy() {
                        break;
                    }
                    match self.eval(body, env)? {
                        Flow::Normal(value) => {
                            if !value.is_undefined() {
                                results.push(value);
                            }
                        }
                        Flow::Break(value, _) => {
                            if !value.is_undefined() {
                                results.push(value);
                            }
                            break;
                        }
                        Flow::Continue(value, _) => {
                            if !value.is_undefined() {
                                results.push(value);
                            }
                        }
                        flow @ Flow::Return(..) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal(Value::list(results)))
            }
            Expr::For {
                binding,
                iterable,
                body,
                span,
            } => {
                let iterable_value = eval_value!(self, iterable, env);
                // Snapshot the elements up front so body mutations of the
                // list cannot shift the iteration underneath us
                let items: Vec<Value> = match iterable_value {
                    Value::List(list) => list.borrow().clone(),
                    other => {
                        return Err(SiltError::type_error(
                            span.clone(),
                            format!("Cannot iterate over a {}", other.type_name()),
                        ));
                    }
                };

                let mut results = Vec::new();
                'iteration: for item in items {
                    let loop_env = self.new_env(Some(env), None);
                    self.define(loop_env, binding, item);
                    match self.eval(body, loop_env)? {
                        Flow::Normal(value) => {
                            if !value.is_undefined() {
                                results.push(value);
                            }
                        }
                        Flow::Break(value, _) => {
                            if !value.is_undefined() {
                                results.push(value);
                            }
                            break 'iteration;
                        }
                        Flow::Continue(value, _) => {
                            if !value.is_undefined() {
                                results.push(value);
                            }
                        }
                        flow @ Flow::Return(..) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal(Value::list(results)))
            }
            Expr::Unary {
                operator,
                operand,
                span,
            } => {
                let operand_value = eval_value!(self, operand, env);
                match operator {
                    UnaryOp::Not => Ok(Flow::Normal(Value::Bool(!operand_value.is_truthy()))),
                    UnaryOp::Negate => match operand_value {
                        Value::Number(n) => Ok(Flow::Normal(Value::Number(-n))),
                        other => Err(SiltError::type_error(
                            span.clone(),
                            format!("Cannot negate a {}", other.type_name()),
                        )),
                    },
                }
            }
            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left_value = eval_value!(self, left, env);
                match operator {
                    LogicalOp::Or => {
                        if left_value.is_truthy() {
                            Ok(Flow::Normal(left_value))
                        } else {
                            self.eval(right, env)
                        }
                    }
                    LogicalOp::And => {
                        if !left_value.is_truthy() {
                            Ok(Flow::Normal(left_value))
                        } else {
                            self.eval(right, env)
                        }
                    }
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                let left_value = eval_value!(self, left, env);
                let right_value = eval_value!(self, right, env);
                self.binary_op(operator, left_value, right_value, span)
                    .map(Flow::Normal)
            }
            Expr::Function { params, body, .. } => {
                Ok(Flow::Normal(Value::Closure(Rc::new(Closure {
                    params: params.clone(),
                    body: Rc::new((**body).clone()),
                    env,
                    this: None,
                }))))
            }
            Expr::Call { callee, args, span } => {
                let callee_value = eval_value!(self, callee, env);
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(eval_value!(self, arg, env));
                }
                self.call_value(callee_value, arg_values, span)
            }
            Expr::Member { object, name, span } => {
                let object_value = eval_value!(self, object, env);
                self.get_member(&object_value, name, span).map(Flow::Normal)
            }
            Expr::Index {
                object,
                index,
                span,
            } => {
                let object_value = eval_value!(self, object, env);
                let index_value = eval_value!(self, index, env);
                self.get_index(&object_value, &index_value, span)
                    .map(Flow::Normal)
            }
            Expr::Assign {
                target,
                value,
                ..
            } => {
                let value = eval_value!(self, value, env);
                match target {
                    AssignTarget::Variable { name, .. } => {
                        self.assign_variable(env, name, value.clone());
                        Ok(Flow::Normal(value))
                    }
                    AssignTarget::Index {
                        object,
                        index,
                        span,
                    } => {
                        let object_value = eval_value!(self, object, env);
                        let index_value = eval_value!(self, index, env);
                        self.set_index(&object_value, &index_value, value.clone(), span)?;
                        Ok(Flow::Normal(value))
                    }
                    AssignTarget::Member { object, name, span } => {
                        let object_value = eval_value!(self, object, env);
                        match object_value {
                            Value::Object(entries) => {
                                entries.borrow_mut().set(name.clone(), value.clone());
                                Ok(Flow::Normal(value))
                            }
                            other => Err(SiltError::type_error(
                                span.clone(),
                                format!(
                                    "Cannot assign property '{}' on a {}",
                                    name,
                                    other.type_name()
                                ),
                            )),
                        }
                    }
                }
            }
            Expr::Return { value, span } => {
                let value = match value {
                    Some(expr) => eval_value!(self, expr, env),
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value, span.clone()))
            }
            Expr::Break { value, span } => {
                let value = match value {
                    Some(expr) => eval_value!(self, expr, env),
                    None => Value::Undefined,
                };
                Ok(Flow::Break(value, span.clone()))
            }
            Expr::Continue { value, span } => {
                let value = match value {
                    Some(expr) => eval_value!(self, expr, env),
                    None => Value::Undefined,
                };
                Ok(Flow::Continue(value, span.clone()))
            }
        }
    }

    fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        span: &Span,
    ) -> Result<Flow, SiltError> {
        match callee {
            Value::Closure(closure) => {
                let call_env = self.new_env(Some(closure.env), closure.this.clone());
                for (i, param) in closure.params.iter().enumerate() {
                    let value = args.get(i).cloned().unwrap_or(Value::Undefined);
                    self.define(call_env, param, value);
                }
                match self.eval(closure.body.as_ref(), call_env)? {
                    Flow::Normal(value) => Ok(Flow::Normal(value)),
                    Flow::Return(value, _) => Ok(Flow::Normal(value)),
                    // break/continue keep unwinding to the caller's loop
                    flow => Ok(flow),
                }
            }
            Value::Native(native) => {
                let result = (native.func)(&args)
                    .map_err(|message| SiltError::type_error(span.clone(), message))?;
                Ok(Flow::Normal(result))
            }
            other => Err(SiltError::type_error_with_help(
                span.clone(),
                format!("Cannot call a {}", other.type_name()),
                "Only functions can be called.".to_string(),
            )),
        }
    }

    fn get_member(&self, object: &Value, key: &str, span: &Span) -> Result<Value, SiltError> {
        match object {
            Value::Object(entries) => {
                let value = entries
                    .borrow()
                    .get(key)
                    .cloned()
                    .unwrap_or(Value::Undefined);
                Ok(bind_this(value, object))
            }
            other => Err(SiltError::type_error_with_help(
                span.clone(),
                format!(
                    "Cannot access property '{}' on a {}",
                    key,
                    other.type_name()
                ),
                "Property access works on objects.".to_string(),
            )),
        }
    }

    fn get_index(&self, object: &Value, index: &Value, span: &Span) -> Result<Value, SiltError> {
        match (object, index) {
            (Value::List(list), Value::Number(n)) => {
                // 1-based: index 1 is the first element; reads out of range
                // yield undefined
                let value = if *n >= 1.0 && n.fract() == 0.0 {
                    list.borrow()
                        .get(*n as usize - 1)
                        .cloned()
                        .unwrap_or(Value::Undefined)
                } else {
                    Value::Undefined
                };
                Ok(bind_this(value, object))
            }
            (Value::List(_), other) => Err(SiltError::type_error(
                span.clone(),
                format!("List index must be a number, got a {}", other.type_name()),
            )),
            (Value::Object(entries), Value::String(key)) => {
                let value = entries
                    .borrow()
                    .get(key)
                    .cloned()
                    .unwrap_or(Value::Undefined);
                Ok(bind_this(value, object))
            }
            (Value::Object(_), other) => Err(SiltError::type_error(
                span.clone(),
                format!("Object key must be a string, got a {}", other.type_name()),
            )),
            (other, _) => Err(SiltError::type_error_with_help(
                span.clone(),
                format!("Cannot index a {}", other.type_name()),
                "Indexing works on lists and objects.".to_string(),
            )),
        }
    }

    fn set_index(
        &self,
        object: &Value,
        index: &Value,
        value: Value,
        span: &Span,
    ) -> Result<(), SiltError> {
        match (object, index) {
            (Value::List(list), Value::Number(n)) => {
                if *n < 1.0 || n.fract() != 0.0 {
                    return Err(SiltError::type_error(
                        span.clone(),
                        format!("Invalid list index {}", index),
                    ));
                }
                let slot = *n as usize - 1;
                let mut items = list.borrow_mut();
                if slot >= items.len() {
                    items.resize(slot + 1, Value::Undefined);
                }
                items[slot] = value;
                Ok(())
            }
            (Value::List(_), other) => Err(SiltError::type_error(
                span.clone(),
                format!("List index must be a number, got a {}", other.type_name()),
            )),
            (Value::Object(entries), Value::String(key)) => {
                entries.borrow_mut().set(key.clone(), value);
                Ok(())
            }
            (Value::Object(_), other) => Err(SiltError::type_error(
                span.clone(),
                format!("Object key must be a string, got a {}", other.type_name()),
            )),
            (other, _) => Err(SiltError::type_error_with_help(
                span.clone(),
                format!("Cannot index a {}", other.type_name()),
                "Indexing works on lists and objects.".to_string(),
            )),
        }
    }

    /// Binary operators are overloaded per operand type pair; combinations
    /// outside the table are type errors rather than coercions.
    fn binary_op(
        &self,
        operator: &BinaryOp,
        left: Value,
        right: Value,
        span: &Span,
    ) -> Result<Value, SiltError> {
        match operator {
            BinaryOp::Add => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::String(l), Value::String(r)) => Ok(Value::String(l + &r)),
                (Value::List(l), Value::List(r)) => {
                    let mut items = l.borrow().clone();
                    items.extend(r.borrow().iter().cloned());
                    Ok(Value::list(items))
                }
                (Value::Object(l), Value::Object(r)) => {
                    // Key union; the right operand wins on conflicts
                    let mut merged = l.borrow().clone();
                    for (key, value) in r.borrow().iter() {
                        merged.set(key.clone(), value.clone());
                    }
                    Ok(Value::object(merged))
                }
                (l, r) => Err(operand_error("add", &l, &r, span)),
            },
            BinaryOp::Subtract => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l - r)),
                (Value::String(l), Value::String(r)) => {
                    Ok(Value::String(l.replacen(r.as_str(), "", 1)))
                }
                (Value::List(l), Value::List(r)) => {
                    let removed = r.borrow();
                    let items: Vec<Value> = l
                        .borrow()
                        .iter()
                        .filter(|item| !removed.iter().any(|other| *item == other))
                        .cloned()
                        .collect();
                    Ok(Value::list(items))
                }
                (Value::Object(l), Value::Object(r)) => {
                    // Drop keys whose value deep-equals the right operand's
                    // value under the same key
                    let removed = r.borrow();
                    let mut kept = Object::new();
                    for (key, value) in l.borrow().iter() {
                        if removed.get(key) != Some(value) {
                            kept.set(key.clone(), value.clone());
                        }
                    }
                    Ok(Value::object(kept))
                }
                (l, r) => Err(operand_error("subtract", &l, &r, span)),
            },
            BinaryOp::Multiply => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l * r)),
                (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
                    let count = repeat_count(n, span)?;
                    Ok(Value::String(s.repeat(count)))
                }
                (Value::List(l), Value::Number(n)) | (Value::Number(n), Value::List(l)) => {
                    let count = repeat_count(n, span)?;
                    let items = l.borrow();
                    let mut repeated = Vec::with_capacity(items.len() * count);
                    for _ in 0..count {
                        repeated.extend(items.iter().cloned());
                    }
                    Ok(Value::list(repeated))
                }
                (l, r) => Err(operand_error("multiply", &l, &r, span)),
            },
            BinaryOp::Divide => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l / r)),
                (l, r) => Err(operand_error("divide", &l, &r, span)),
            },
            BinaryOp::Modulo => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l % r)),
                (l, r) => Err(operand_error("take the remainder of", &l, &r, span)),
            },
            BinaryOp::Equal => Ok(Value::Bool(left == right)),
            BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
            BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => self.compare(operator, left, right, span),
        }
    }

    /// Ordering comparisons: numeric order on numbers, containment on
    /// strings, subset relations on lists and objects. The collection forms
    /// are partial orders, so '<' means proper subset.
    fn compare(
        &self,
        operator: &BinaryOp,
        left: Value,
        right: Value,
        span: &Span,
    ) -> Result<Value, SiltError> {
        let result = match (&left, &right) {
            (Value::Number(l), Value::Number(r)) => match operator {
                BinaryOp::Less => l < r,
                BinaryOp::LessEqual => l <= r,
                BinaryOp::Greater => l > r,
                BinaryOp::GreaterEqual => l >= r,
                _ => unreachable!(),
            },
            (Value::String(l), Value::String(r)) => match operator {
                BinaryOp::Less => r.contains(l.as_str()) && l != r,
                BinaryOp::LessEqual => r.contains(l.as_str()),
                BinaryOp::Greater => l.contains(r.as_str()) && l != r,
                BinaryOp::GreaterEqual => l.contains(r.as_str()),
                _ => unreachable!(),
            },
            (Value::List(l), Value::List(r)) => match operator {
                BinaryOp::Less => list_subset(l, r) && !list_subset(r, l),
                BinaryOp::LessEqual => list_subset(l, r),
                BinaryOp::Greater => list_subset(r, l) && !list_subset(l, r),
                BinaryOp::GreaterEqual => list_subset(r, l),
                _ => unreachable!(),
            },
            (Value::Object(l), Value::Object(r)) => match operator {
                BinaryOp::Less => object_subset(l, r) && !object_subset(r, l),
                BinaryOp::LessEqual => object_subset(l, r),
                BinaryOp::Greater => object_subset(r, l) && !object_subset(l, r),
                BinaryOp::GreaterEqual => object_subset(r, l),
                _ => unreachable!(),
            },
            (l, r) => return Err(operand_error("compare", l, r, span)),
        };
        Ok(Value::Bool(result))
    }

    fn new_env(&mut self, parent: Option<EnvId>, this_value: Option<Value>) -> EnvId {
        let id = EnvId(self.envs.len());
        self.envs.push(Environment {
            values: HashMap::new(),
            parent,
            this_value,
        });
        id
    }

    fn define(&mut self, env: EnvId, name: &str, value: Value) {
        self.envs[env.0].values.insert(name.to_string(), value);
    }

    fn lookup(&self, env: EnvId, name: &str) -> Option<Value> {
        let mut current = Some(env);
        while let Some(id) = current {
            let environment = &self.envs[id.0];
            if let Some(value) = environment.values.get(name) {
                return Some(value.clone());
            }
            current = environment.parent;
        }
        None
    }

    /// Walks outward for an existing binding to overwrite; when the name is
    /// bound nowhere in the chain, creates it in the innermost scope.
    fn assign_variable(&mut self, env: EnvId, name: &str, value: Value) {
        let mut current = Some(env);
        while let Some(id) = current {
            if self.envs[id.0].values.contains_key(name) {
                self.envs[id.0].values.insert(name.to_string(), value);
                return;
            }
            current = self.envs[id.0].parent;
        }
        self.envs[env.0].values.insert(name.to_string(), value);
    }

    fn current_this(&self, env: EnvId) -> Value {
        let mut current = Some(env);
        while let Some(id) = current {
            let environment = &self.envs[id.0];
            if let Some(value) = &environment.this_value {
                return value.clone();
            }
            current = environment.parent;
        }
        Value::Undefined
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// A closure fetched out of a collection becomes a method: it is returned
/// re-bound to the collection as its `this`.
fn bind_this(value: Value, owner: &Value) -> Value {
    match value {
        Value::Closure(closure) => Value::Closure(Rc::new(closure.bind(owner.clone()))),
        other => other,
    }
}

fn operand_error(verb: &str, left: &Value, right: &Value, span: &Span) -> SiltError {
    SiltError::type_error(
        span.clone(),
        format!(
            "Cannot {} {} and {}",
            verb,
            left.type_name(),
            right.type_name()
        ),
    )
}

fn repeat_count(n: f64, span: &Span) -> Result<usize, SiltError> {
    if n < 0.0 || n.fract() != 0.0 {
        return Err(SiltError::type_error(
            span.clone(),
            "Repeat count must be a non-negative integer".to_string(),
        ));
    }
    Ok(n as usize)
}

fn list_subset(a: &Rc<RefCell<Vec<Value>>>, b: &Rc<RefCell<Vec<Value>>>) -> bool {
    let b = b.borrow();
    a.borrow().iter().all(|item| b.iter().any(|other| item == other))
}

fn object_subset(a: &Rc<RefCell<Object>>, b: &Rc<RefCell<Object>>) -> bool {
    let b = b.borrow();
    a.borrow().iter().all(|(key, value)| b.get(key) == Some(value))
}
