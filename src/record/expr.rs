use super::error::{RecordError, RecordResult};
use super::record::Record;
use super::schema::Schema;
use super::value::Value;

/// Comparison operators of the predicate language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Lt,
}

/// A predicate expression tree evaluated against `(record, schema)`.
///
/// Comparisons are typed: both sides must carry the same dynamic type, and
/// ordering is defined for `INT`, `FLOAT`, and `TEXT` (byte-wise) only.
/// `And`/`Or` short-circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(Value),
    Attr(usize),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Reference to attribute `index` of the scanned record
    pub fn attr(index: usize) -> Expr {
        Expr::Attr(index)
    }

    /// Literal operand
    pub fn val(value: impl Into<Value>) -> Expr {
        Expr::Const(value.into())
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Cmp(CmpOp::Eq, Box::new(lhs), Box::new(rhs))
    }

    pub fn lt(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Cmp(CmpOp::Lt, Box::new(lhs), Box::new(rhs))
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Expr {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expr) -> Expr {
        Expr::Not(Box::new(inner))
    }

    /// Evaluate the tree against one record under its schema.
    pub fn eval(&self, record: &Record, schema: &Schema) -> RecordResult<Value> {
        match self {
            Expr::Const(value) => Ok(value.clone()),
            Expr::Attr(index) => record.get_attr(schema, *index),
            Expr::Cmp(op, lhs, rhs) => {
                let lhs = lhs.eval(record, schema)?;
                let rhs = rhs.eval(record, schema)?;
                compare(*op, &lhs, &rhs)
            }
            Expr::And(lhs, rhs) => {
                if !expect_bool(lhs.eval(record, schema)?)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(expect_bool(rhs.eval(record, schema)?)?))
            }
            Expr::Or(lhs, rhs) => {
                if expect_bool(lhs.eval(record, schema)?)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(expect_bool(rhs.eval(record, schema)?)?))
            }
            Expr::Not(inner) => Ok(Value::Bool(!expect_bool(inner.eval(record, schema)?)?)),
        }
    }
}

fn expect_bool(value: Value) -> RecordResult<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(RecordError::TypeMismatch {
            expected: "BOOL".to_string(),
            actual: other.type_name().to_string(),
        }),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> RecordResult<Value> {
    let result = match (op, lhs, rhs) {
        (CmpOp::Eq, Value::Int(a), Value::Int(b)) => a == b,
        (CmpOp::Eq, Value::Float(a), Value::Float(b)) => a == b,
        (CmpOp::Eq, Value::Bool(a), Value::Bool(b)) => a == b,
        (CmpOp::Eq, Value::Text(a), Value::Text(b)) => a == b,
        (CmpOp::Lt, Value::Int(a), Value::Int(b)) => a < b,
        (CmpOp::Lt, Value::Float(a), Value::Float(b)) => a < b,
        (CmpOp::Lt, Value::Text(a), Value::Text(b)) => a.as_bytes() < b.as_bytes(),
        _ => {
            return Err(RecordError::TypeMismatch {
                expected: lhs.type_name().to_string(),
                actual: rhs.type_name().to_string(),
            });
        }
    };
    Ok(Value::Bool(result))
}
