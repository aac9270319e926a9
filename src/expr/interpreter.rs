use std::cmp::Ordering;

use super::ExpressionError;
use super::parser::{BinaryOp, Expr, Script};
use crate::interface::Context;
use crate::value::{Value, ValueTy};

type EvalResult = Result<Value, ExpressionError>;

pub(crate) struct Interpreter<'a> {
    context: Option<&'a Context>,
    lenient: bool,
}

impl<'a> Interpreter<'a> {
    pub(crate) const fn new(context: Option<&'a Context>, lenient: bool) -> Self {
        Self { context, lenient }
    }

    pub(crate) fn run(&self, script: &Script) -> EvalResult {
        let mut last = Value::Null;
        for statement in &script.statements {
            last = self.eval(statement)?;
        }
        Ok(last)
    }

    fn eval(&self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(value) => Ok(Value::Bool(*value)),
            Expr::Int(value) => Ok(Value::Int(*value)),
            Expr::Float(value) => Ok(Value::Float(*value)),
            Expr::Str(value) => Ok(Value::Str(value.clone())),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Path(path) => self.resolve_path(path),
            Expr::Property { target, name } => {
                let target = self.eval(target)?;
                self.property(target, name)
            }
            Expr::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                self.index(target, &index)
            }
            Expr::Call {
                target,
                method,
                args,
            } => {
                let target = self.eval(target)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(target, method, &args)
            }
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.is_truthy())),
            Expr::Neg(inner) => self.negate(self.eval(inner)?),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    /// Resolves a dotted path. The longest prefix is tried as a single
    /// context key first, then shorter ones, with the remaining names read as
    /// properties of the bound value.
    fn resolve_path(&self, path: &[String]) -> EvalResult {
        let full_name = path.join(".");
        let Some(context) = self.context else {
            return Err(ExpressionError::NoContext { name: full_name });
        };

        for split in (1..=path.len()).rev() {
            let name = path.get(..split).map(|head| head.join(".")).unwrap_or_default();
            if let Some(bound) = context.get(&name) {
                let mut current = bound.clone();
                for property in path.iter().skip(split) {
                    current = self.property(current, property)?;
                }
                return Ok(current);
            }
        }

        if self.lenient {
            return Ok(Value::Null);
        }
        Err(ExpressionError::UndefinedVariable { name: full_name })
    }

    fn property(&self, target: Value, name: &str) -> EvalResult {
        if let Value::Map(mut entries) = target {
            if let Some(value) = entries.remove(name) {
                return Ok(value);
            }
            return self.undefined_property(name, ValueTy::Map);
        }
        self.undefined_property(name, target.ty())
    }

    fn undefined_property(&self, name: &str, ty: ValueTy) -> EvalResult {
        if self.lenient {
            return Ok(Value::Null);
        }
        Err(ExpressionError::UndefinedProperty {
            name: name.to_owned(),
            ty,
        })
    }

    fn index(&self, target: Value, index: &Value) -> EvalResult {
        match (target, index) {
            (Value::List(items), Value::Int(position)) => {
                let len = items.len();
                element(items, *position, len)
            }
            (Value::Str(text), Value::Int(position)) => {
                let chars: Vec<char> = text.chars().collect();
                char_at(&chars, *position)
            }
            (Value::Map(entries), Value::Str(key)) => self.property(Value::Map(entries), key),
            (Value::Null, _) if self.lenient => Ok(Value::Null),
            (target, index) => Err(mismatch("[]", &target, index)),
        }
    }

    fn negate(&self, value: Value) -> EvalResult {
        match value {
            Value::Int(value) => value
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| overflow("-")),
            Value::Float(value) => Ok(Value::Float(-value)),
            Value::Null if self.lenient => Ok(Value::Int(0)),
            other => Err(mismatch("-", &Value::Int(0), &other)),
        }
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> EvalResult {
        match op {
            BinaryOp::Or => {
                if self.eval(left)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }
            BinaryOp::And => {
                if !self.eval(left)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }
            _ => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.apply(op, left, right)
            }
        }
    }

    fn apply(&self, op: BinaryOp, left: Value, right: Value) -> EvalResult {
        match op {
            BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
            BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ordering = compare(&left, &right)
                    .ok_or_else(|| mismatch(op.symbol(), &left, &right))?;
                let result = match op {
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::Le => ordering != Ordering::Greater,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(Value::Bool(result))
            }
            BinaryOp::Add if is_string(&left) || is_string(&right) => {
                self.concatenate(left, right)
            }
            _ => self.arithmetic(op, left, right),
        }
    }

    fn concatenate(&self, left: Value, right: Value) -> EvalResult {
        if !self.lenient && (left.is_null() || right.is_null()) {
            return Err(mismatch("+", &left, &right));
        }
        let mut out = left.to_text();
        right.render_into(&mut out);
        Ok(Value::Str(out))
    }

    fn arithmetic(&self, op: BinaryOp, left: Value, right: Value) -> EvalResult {
        let symbol = op.symbol();
        let (left_ty, right_ty) = (left.ty(), right.ty());
        let (Some(left), Some(right)) = (self.numeric(left), self.numeric(right)) else {
            return Err(ExpressionError::TypeMismatch {
                operation: symbol.to_owned(),
                left: left_ty,
                right: right_ty,
            });
        };

        if let (Value::Int(left), Value::Int(right)) = (&left, &right) {
            let (left, right) = (*left, *right);
            if matches!(op, BinaryOp::Div | BinaryOp::Rem) && right == 0 {
                return Err(ExpressionError::DivisionByZero);
            }
            let result = match op {
                BinaryOp::Add => left.checked_add(right),
                BinaryOp::Sub => left.checked_sub(right),
                BinaryOp::Mul => left.checked_mul(right),
                BinaryOp::Div => left.checked_div(right),
                _ => left.checked_rem(right),
            };
            return result.map(Value::Int).ok_or_else(|| overflow(symbol));
        }

        let (left, right) = (as_float(&left), as_float(&right));
        if matches!(op, BinaryOp::Div | BinaryOp::Rem) && right == 0.0 {
            return Err(ExpressionError::DivisionByZero);
        }
        let result = match op {
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
            BinaryOp::Div => left / right,
            _ => left % right,
        };
        Ok(Value::Float(result))
    }

    /// Numeric view of an operand; lenient null counts as zero.
    fn numeric(&self, value: Value) -> Option<Value> {
        match value {
            Value::Int(_) | Value::Float(_) => Some(value),
            Value::Null if self.lenient => Some(Value::Int(0)),
            _ => None,
        }
    }

    fn call(&self, target: Value, method: &str, args: &[Value]) -> EvalResult {
        if method == "toString" {
            expect_arity(method, args, 0)?;
            return Ok(Value::Str(target.to_text()));
        }

        match target {
            Value::Str(text) => string_method(&text, method, args),
            Value::List(items) => list_method(items, method, args),
            Value::Map(mut entries) => match method {
                "size" | "length" => {
                    expect_arity(method, args, 0)?;
                    Ok(Value::Int(length(entries.len())))
                }
                "isEmpty" => {
                    expect_arity(method, args, 0)?;
                    Ok(Value::Bool(entries.is_empty()))
                }
                "get" => {
                    let key = string_arg(method, args)?;
                    Ok(entries.remove(key).unwrap_or_default())
                }
                "containsKey" => {
                    let key = string_arg(method, args)?;
                    Ok(Value::Bool(entries.contains_key(key)))
                }
                _ => Err(unknown_method(method, ValueTy::Map)),
            },
            Value::Null if self.lenient => Ok(Value::Null),
            other => Err(unknown_method(method, other.ty())),
        }
    }
}

fn string_method(text: &str, method: &str, args: &[Value]) -> EvalResult {
    let chars: Vec<char> = text.chars().collect();
    match method {
        "length" | "size" => {
            expect_arity(method, args, 0)?;
            Ok(Value::Int(length(chars.len())))
        }
        "isEmpty" => {
            expect_arity(method, args, 0)?;
            Ok(Value::Bool(chars.is_empty()))
        }
        "charAt" => {
            expect_arity(method, args, 1)?;
            char_at(&chars, int_arg(method, args, 0)?)
        }
        "substring" => {
            if !(1..=2).contains(&args.len()) {
                return Err(ExpressionError::WrongArity {
                    method: method.to_owned(),
                    expected: "1 or 2".to_owned(),
                    found: args.len(),
                });
            }
            let start = int_arg(method, args, 0)?;
            let end = match args.get(1) {
                Some(_) => int_arg(method, args, 1)?,
                None => length(chars.len()),
            };
            let out_of_bounds = |index| ExpressionError::IndexOutOfBounds {
                index,
                len: chars.len(),
            };
            let start_at = usize::try_from(start).map_err(|_| out_of_bounds(start))?;
            let end_at = usize::try_from(end).map_err(|_| out_of_bounds(end))?;
            if start_at > end_at {
                return Err(out_of_bounds(start));
            }
            chars
                .get(start_at..end_at)
                .map(|slice| Value::Str(slice.iter().collect()))
                .ok_or_else(|| out_of_bounds(end))
        }
        "indexOf" => {
            let needle = string_arg(method, args)?;
            let index = text
                .find(needle)
                .and_then(|byte_index| text.get(..byte_index))
                .map_or(-1, |head| length(head.chars().count()));
            Ok(Value::Int(index))
        }
        "contains" => Ok(Value::Bool(text.contains(string_arg(method, args)?))),
        "startsWith" => Ok(Value::Bool(text.starts_with(string_arg(method, args)?))),
        "endsWith" => Ok(Value::Bool(text.ends_with(string_arg(method, args)?))),
        "toUpperCase" => {
            expect_arity(method, args, 0)?;
            Ok(Value::Str(text.to_uppercase()))
        }
        "toLowerCase" => {
            expect_arity(method, args, 0)?;
            Ok(Value::Str(text.to_lowercase()))
        }
        "trim" => {
            expect_arity(method, args, 0)?;
            Ok(Value::Str(text.trim().to_owned()))
        }
        "concat" => {
            expect_arity(method, args, 1)?;
            let mut out = text.to_owned();
            if let Some(arg) = args.first() {
                arg.render_into(&mut out);
            }
            Ok(Value::Str(out))
        }
        _ => Err(unknown_method(method, ValueTy::String)),
    }
}

fn list_method(items: Vec<Value>, method: &str, args: &[Value]) -> EvalResult {
    match method {
        "size" | "length" => {
            expect_arity(method, args, 0)?;
            Ok(Value::Int(length(items.len())))
        }
        "isEmpty" => {
            expect_arity(method, args, 0)?;
            Ok(Value::Bool(items.is_empty()))
        }
        "get" => {
            expect_arity(method, args, 1)?;
            let position = int_arg(method, args, 0)?;
            let len = items.len();
            element(items, position, len)
        }
        "contains" => {
            expect_arity(method, args, 1)?;
            let needle = args.first().unwrap_or(&Value::Null);
            Ok(Value::Bool(items.iter().any(|item| values_equal(item, needle))))
        }
        _ => Err(unknown_method(method, ValueTy::List)),
    }
}

fn element(items: Vec<Value>, position: i64, len: usize) -> EvalResult {
    usize::try_from(position)
        .ok()
        .and_then(|at| items.into_iter().nth(at))
        .ok_or(ExpressionError::IndexOutOfBounds {
            index: position,
            len,
        })
}

fn char_at(chars: &[char], position: i64) -> EvalResult {
    usize::try_from(position)
        .ok()
        .and_then(|at| chars.get(at))
        .map(|c| Value::Str(c.to_string()))
        .ok_or(ExpressionError::IndexOutOfBounds {
            index: position,
            len: chars.len(),
        })
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            as_float(left) == as_float(right)
        }
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(left), Value::Int(right)) => Some(left.cmp(right)),
        (Value::Str(left), Value::Str(right)) => Some(left.cmp(right)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            as_float(left).partial_cmp(&as_float(right))
        }
        _ => None,
    }
}

fn as_float(value: &Value) -> f64 {
    match value {
        Value::Int(value) => *value as f64,
        Value::Float(value) => *value,
        _ => 0.0,
    }
}

const fn is_string(value: &Value) -> bool {
    matches!(value, Value::Str(_))
}

fn length(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn expect_arity(method: &str, args: &[Value], expected: usize) -> Result<(), ExpressionError> {
    if args.len() == expected {
        return Ok(());
    }
    Err(ExpressionError::WrongArity {
        method: method.to_owned(),
        expected: expected.to_string(),
        found: args.len(),
    })
}

fn int_arg(method: &str, args: &[Value], position: usize) -> Result<i64, ExpressionError> {
    match args.get(position) {
        Some(Value::Int(value)) => Ok(*value),
        Some(other) => Err(ExpressionError::TypeMismatch {
            operation: method.to_owned(),
            left: ValueTy::Integer,
            right: other.ty(),
        }),
        None => Err(ExpressionError::WrongArity {
            method: method.to_owned(),
            expected: (position + 1).to_string(),
            found: args.len(),
        }),
    }
}

fn string_arg<'v>(method: &str, args: &'v [Value]) -> Result<&'v str, ExpressionError> {
    expect_arity(method, args, 1)?;
    match args.first() {
        Some(Value::Str(value)) => Ok(value),
        other => Err(ExpressionError::TypeMismatch {
            operation: method.to_owned(),
            left: ValueTy::String,
            right: other.map_or(ValueTy::Null, Value::ty),
        }),
    }
}

fn mismatch(operation: &str, left: &Value, right: &Value) -> ExpressionError {
    ExpressionError::TypeMismatch {
        operation: operation.to_owned(),
        left: left.ty(),
        right: right.ty(),
    }
}

fn overflow(operation: &str) -> ExpressionError {
    ExpressionError::Overflow {
        operation: operation.to_owned(),
    }
}

fn unknown_method(method: &str, ty: ValueTy) -> ExpressionError {
    ExpressionError::UnknownMethod {
        method: method.to_owned(),
        ty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse;

    fn context() -> Context {
        let mut context = Context::new();
        context
            .insert("hello", "hi")
            .insert("hi", "Hello World!")
            .insert("foo", "abcdef")
            .insert("count", 3)
            .insert("ratio", 0.5)
            .insert("tags", vec!["a", "b"])
            .insert("hello.world", "dotted")
            .insert(
                "user",
                [("name", Value::from("Ann")), ("age", Value::from(41))]
                    .into_iter()
                    .collect::<Value>(),
            );
        context
    }

    fn eval_with(source: &str, context: Option<&Context>, lenient: bool) -> EvalResult {
        Interpreter::new(context, lenient).run(&parse(source).unwrap())
    }

    fn eval(source: &str) -> Value {
        eval_with(source, Some(&context()), false).unwrap()
    }

    fn eval_err(source: &str) -> ExpressionError {
        eval_with(source, Some(&context()), false).unwrap_err()
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(eval("7 / 2"), Value::Int(3));
        assert_eq!(eval("7 % 4"), Value::Int(3));
        assert_eq!(eval("count * ratio"), Value::Float(1.5));
        assert_eq!(eval("-count"), Value::Int(-3));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_arithmetic_errors() {
        assert_eq!(eval_err("1 / 0"), ExpressionError::DivisionByZero);
        assert_eq!(eval_err("1.0 % 0"), ExpressionError::DivisionByZero);
        assert!(matches!(
            eval_err("9223372036854775807 + 1"),
            ExpressionError::Overflow { .. }
        ));
        assert!(matches!(
            eval_err("true * 2"),
            ExpressionError::TypeMismatch { left: ValueTy::Boolean, .. }
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_string_concatenation() {
        assert_eq!(eval("hello + '.world'"), Value::from("hi.world"));
        assert_eq!(eval("'n=' + count"), Value::from("n=3"));
        assert_eq!(eval("count + '!'"), Value::from("3!"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_comparison_and_logic() {
        assert_eq!(eval("count > 2 && count <= 3"), Value::Bool(true));
        assert_eq!(eval("count == 3.0"), Value::Bool(true));
        assert_eq!(eval("'a' < 'b'"), Value::Bool(true));
        assert_eq!(eval("hello != 'hi' || !false"), Value::Bool(true));
        assert_eq!(eval("count > 5 ? 'big' : 'small'"), Value::from("small"));
        // short circuit skips the undefined name
        assert_eq!(eval("false && missing"), Value::Bool(false));
        assert!(matches!(
            eval_err("'a' < 1"),
            ExpressionError::TypeMismatch { .. }
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_path_resolution() {
        assert_eq!(eval("hello.world"), Value::from("dotted"));
        assert_eq!(eval("user.name"), Value::from("Ann"));
        assert_eq!(eval("user['age']"), Value::Int(41));
        assert_eq!(eval("tags[1]"), Value::from("b"));
        assert!(matches!(
            eval_err("user.email"),
            ExpressionError::UndefinedProperty { ty: ValueTy::Map, .. }
        ));
        assert_eq!(
            eval_err("nope.at.all"),
            ExpressionError::UndefinedVariable {
                name: "nope.at.all".to_owned()
            }
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_missing_context() {
        assert_eq!(
            eval_with("hello", None, true).unwrap_err(),
            ExpressionError::NoContext {
                name: "hello".to_owned()
            }
        );
        assert_eq!(eval_with("1 + 1", None, false).unwrap(), Value::Int(2));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_lenient_mode() {
        let context = context();
        let lenient = |source: &str| eval_with(source, Some(&context), true).unwrap();
        assert_eq!(lenient("missing"), Value::Null);
        assert_eq!(lenient("user.email"), Value::Null);
        assert_eq!(lenient("missing + 1"), Value::Int(1));
        assert_eq!(lenient("'x' + missing"), Value::from("x"));
        assert_eq!(lenient("missing.trim()"), Value::Null);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_string_methods() {
        assert_eq!(eval("foo.substring(2,4)"), Value::from("cd"));
        assert_eq!(eval("foo.substring(3)"), Value::from("def"));
        assert_eq!(eval("hi.charAt(4)"), Value::from("o"));
        assert_eq!(eval("foo.indexOf('cd')"), Value::Int(2));
        assert_eq!(eval("foo.indexOf('z')"), Value::Int(-1));
        assert_eq!(eval("foo.length()"), Value::Int(6));
        assert_eq!(eval("foo.startsWith('ab') && foo.endsWith('ef')"), Value::Bool(true));
        assert_eq!(eval("' pad '.trim().toUpperCase()"), Value::from("PAD"));
        assert_eq!(eval("hello.concat(count)"), Value::from("hi3"));
        assert_eq!(eval("count.toString()"), Value::from("3"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_method_errors() {
        assert_eq!(
            eval_err("hi.charAt(-2)"),
            ExpressionError::IndexOutOfBounds {
                index: -2,
                len: 12
            }
        );
        assert!(matches!(
            eval_err("foo.substring(4, 2)"),
            ExpressionError::IndexOutOfBounds { .. }
        ));
        assert!(matches!(
            eval_err("foo.frobnicate()"),
            ExpressionError::UnknownMethod { ty: ValueTy::String, .. }
        ));
        assert!(matches!(
            eval_err("foo.trim(1)"),
            ExpressionError::WrongArity { found: 1, .. }
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_collection_methods() {
        assert_eq!(eval("tags.size()"), Value::Int(2));
        assert_eq!(eval("tags.contains('b')"), Value::Bool(true));
        assert_eq!(eval("tags.get(0)"), Value::from("a"));
        assert_eq!(eval("[1, 2, 3].isEmpty()"), Value::Bool(false));
        assert_eq!(eval("user.containsKey('age')"), Value::Bool(true));
        assert_eq!(eval("user.get('nope')"), Value::Null);
        assert!(matches!(
            eval_err("tags[5]"),
            ExpressionError::IndexOutOfBounds { index: 5, len: 2 }
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_last_statement_wins() {
        assert_eq!(eval("1; 'two'; count"), Value::Int(3));
    }
}
