// vim: tw=80
//! The dynamic value model shared by every part of the engine.
//!
//! Arguments, return values, raised errors, and whole call descriptions are
//! all expressed as [`Value`]s so that one expectation record can describe
//! any method of any [`Subject`](crate::subject::Subject).  `Value` carries
//! its own notion of type ([`Kind`]) used by type matchers and by spy
//! return validation.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::subject::Subject;

/// The type of a [`Value`], used where a matcher accepts any value of a
/// kind instead of one literal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    Void,
    Nil,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Type,
    Fake,
    Seq,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Void => "Void",
            Kind::Nil => "Nil",
            Kind::Bool => "Bool",
            Kind::Int => "Int",
            Kind::Float => "Float",
            Kind::Str => "Str",
            Kind::List => "List",
            Kind::Map => "Map",
            Kind::Type => "Type",
            Kind::Fake => "Fake",
            Kind::Seq => "Seq",
        };
        f.write_str(s)
    }
}

/// A dynamically typed value.
///
/// `Void` is the "nothing was configured" sentinel returned by a matched
/// expectation with no outcome; it is distinct from an explicit `Nil`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Void,
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A type used as a value, e.g. as a spy's expected return slot.
    Type(Kind),
    /// A nested fake target, produced by dotted-name chaining.
    Fake(Subject),
    /// A lazy finite sequence, produced by `and_yield` stubs.
    Seq(LazySeq),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Void => Kind::Void,
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Type(_) => Kind::Type,
            Value::Fake(_) => Kind::Fake,
            Value::Seq(_) => Kind::Seq,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn as_fake(&self) -> Option<&Subject> {
        match self {
            Value::Fake(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<LazySeq> {
        match self {
            Value::Seq(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("void"),
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Type(k) => write!(f, "{k}"),
            Value::Fake(s) => write!(f, "fake:{}", s.label()),
            Value::Seq(s) => write!(f, "seq(len={})", s.remaining()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Kind> for Value {
    fn from(k: Kind) -> Self {
        Value::Type(k)
    }
}

impl From<Subject> for Value {
    fn from(s: Subject) -> Self {
        Value::Fake(s)
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Value {
    fn from((a, b): (A, B)) -> Self {
        Value::List(vec![a.into(), b.into()])
    }
}

impl<A: Into<Value>, B: Into<Value>, C: Into<Value>> From<(A, B, C)> for Value {
    fn from((a, b, c): (A, B, C)) -> Self {
        Value::List(vec![a.into(), b.into(), c.into()])
    }
}

/// A finite lazy sequence.  Each `and_yield` call produces a fresh one, so
/// two calls never share consumption state.
#[derive(Clone, Debug)]
pub struct LazySeq {
    values: Rc<Vec<Value>>,
    pos: usize,
}

impl LazySeq {
    pub(crate) fn new(values: Rc<Vec<Value>>) -> Self {
        LazySeq { values, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.values.len() - self.pos
    }
}

impl Iterator for LazySeq {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let v = self.values.get(self.pos).cloned();
        if v.is_some() {
            self.pos += 1;
        }
        v
    }
}

impl PartialEq for LazySeq {
    fn eq(&self, other: &Self) -> bool {
        self.values[self.pos..] == other.values[other.pos..]
    }
}

/// A raised error propagating out of a stubbed or spied call: the analog of
/// a thrown exception, identified by a label and carrying a message.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{label}: {message}")]
pub struct Thrown {
    pub label: String,
    pub message: String,
}

impl Thrown {
    pub fn new(label: impl Into<String>, message: impl Into<String>) -> Self {
        Thrown {
            label: label.into(),
            message: message.into(),
        }
    }

    /// Build the message from constructor arguments, the way the exception
    /// class would render them.
    pub fn with_args(label: impl Into<String>, args: Vec<Value>) -> Self {
        let message = args
            .iter()
            .map(|a| match a {
                // Bare message fragments read better unquoted.
                Value::Str(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        Thrown {
            label: label.into(),
            message,
        }
    }
}

/// The actual arguments of one intercepted call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Call {
    pub positional: Vec<Value>,
    pub keyword: BTreeMap<String, Value>,
}

impl Call {
    pub fn new(positional: Vec<Value>, keyword: BTreeMap<String, Value>) -> Self {
        Call { positional, keyword }
    }

    pub fn positional(positional: Vec<Value>) -> Self {
        Call {
            positional,
            keyword: BTreeMap::new(),
        }
    }

    pub fn none() -> Self {
        Call::default()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arg in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
            first = false;
        }
        for (k, v) in &self.keyword {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// Render `method(args)` for diagnostics.
pub(crate) fn format_call(method: &str, call: &Call) -> String {
    format!("{method}({call})")
}

/// Build a `Vec<Value>` from a list of convertible expressions.
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::Value>::new() };
    ($($v:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($v)),+]
    };
}

/// Build a keyword-argument map from `name: value` pairs.
#[macro_export]
macro_rules! kwargs {
    () => {
        ::std::collections::BTreeMap::<::std::string::String, $crate::Value>::new()
    };
    ($($k:ident : $v:expr),+ $(,)?) => {{
        let mut map = ::std::collections::BTreeMap::new();
        $(map.insert(::std::string::String::from(stringify!($k)),
                     $crate::Value::from($v));)+
        map
    }};
}
