//! Runtime values and their arithmetic.
//!
//! Template values are dynamically typed. Integers and doubles combine with
//! the usual promotion rule, numeric strings are parsed on demand, and `Null`
//! behaves like the integer zero. Integer results wrap like 32-bit signed
//! integers.

use crate::error::ValueError;
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A value the template cannot compute with, carried through untouched.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}

/// Opaque values are equal only when they share the same allocation.
impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Double(f64),
    String(String),
    Other(Opaque),
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Double(x) => write!(f, "{}", format_double(*x)),
            Value::String(s) => f.write_str(s),
            Value::Other(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

fn format_double(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_string()
    } else if x == f64::INFINITY {
        "Infinity".to_string()
    } else if x == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        x.to_string()
    }
}

/// A value after numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Double(x) => x,
        }
    }
}

/// Truncate to 32-bit two's complement, the width integer results wrap at.
fn wrap(n: i64) -> i64 {
    n as i32 as i64
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Other(o) => o.type_name(),
        }
    }

    fn to_number(&self) -> Result<Number, ValueError> {
        match self {
            Value::Null => Ok(Number::Int(0)),
            Value::Integer(n) => Ok(Number::Int(*n)),
            Value::Double(x) => Ok(Number::Double(*x)),
            Value::String(s) => parse_numeric(s),
            Value::Other(o) => Err(ValueError::TypeMismatch {
                type_name: o.type_name().to_string(),
            }),
        }
    }

    /// Numeric view of this value, for callers that need a plain `f64`.
    pub fn as_f64(&self) -> Result<f64, ValueError> {
        self.to_number().map(Number::as_f64)
    }

    fn binary(
        &self,
        rhs: &Value,
        int_op: impl FnOnce(i64, i64) -> Result<i64, ValueError>,
        double_op: impl FnOnce(f64, f64) -> f64,
    ) -> Result<Value, ValueError> {
        match (self.to_number()?, rhs.to_number()?) {
            (Number::Int(a), Number::Int(b)) => Ok(Value::Integer(wrap(int_op(a, b)?))),
            (a, b) => Ok(Value::Double(double_op(a.as_f64(), b.as_f64()))),
        }
    }

    pub fn add(&self, rhs: &Value) -> Result<Value, ValueError> {
        self.binary(rhs, |a, b| Ok(a.wrapping_add(b)), |a, b| a + b)
    }

    pub fn subtract(&self, rhs: &Value) -> Result<Value, ValueError> {
        self.binary(rhs, |a, b| Ok(a.wrapping_sub(b)), |a, b| a - b)
    }

    pub fn multiply(&self, rhs: &Value) -> Result<Value, ValueError> {
        self.binary(rhs, |a, b| Ok(a.wrapping_mul(b)), |a, b| a * b)
    }

    pub fn divide(&self, rhs: &Value) -> Result<Value, ValueError> {
        self.binary(
            rhs,
            |a, b| {
                if b == 0 {
                    Err(ValueError::DivisionByZero)
                } else {
                    Ok(a.wrapping_div(b))
                }
            },
            |a, b| a / b,
        )
    }

    pub fn power(&self, rhs: &Value) -> Result<Value, ValueError> {
        match (self.to_number()?, rhs.to_number()?) {
            (Number::Int(base), Number::Int(exp)) => match u32::try_from(exp) {
                Ok(exp) => Ok(Value::Integer(i64::from((base as i32).wrapping_pow(exp)))),
                Err(_) => Ok(Value::Double((base as f64).powf(exp as f64))),
            },
            (base, exp) => Ok(Value::Double(base.as_f64().powf(exp.as_f64()))),
        }
    }

    /// Dispatches one of the echo operators `+ - * / ^`.
    pub fn apply_operator(&self, op: char, rhs: &Value) -> Result<Value, ValueError> {
        match op {
            '+' => self.add(rhs),
            '-' => self.subtract(rhs),
            '*' => self.multiply(rhs),
            '/' => self.divide(rhs),
            '^' => self.power(rhs),
            _ => Err(ValueError::TypeMismatch {
                type_name: format!("operator `{op}`"),
            }),
        }
    }

    /// In-place `add`, as loops step their counter.
    pub fn increment(&mut self, step: &Value) -> Result<(), ValueError> {
        *self = self.add(step)?;
        Ok(())
    }

    pub fn compare(&self, rhs: &Value) -> Result<Ordering, ValueError> {
        match (self.to_number()?, rhs.to_number()?) {
            (Number::Int(a), Number::Int(b)) => Ok(a.cmp(&b)),
            // NaN compares as equal, which keeps loops from spinning forever.
            (a, b) => Ok(a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal)),
        }
    }
}

fn parse_numeric(s: &str) -> Result<Number, ValueError> {
    let parsed = if s.contains(['.', 'e', 'E']) {
        s.parse().map(Number::Double).ok()
    } else {
        s.parse().map(Number::Int).ok()
    };
    parsed.ok_or_else(|| ValueError::NotNumeric(s.to_string()))
}
