// vim: tw=80
//! Argument matching.
//!
//! A declared argument pattern is a sequence of positional [`Matcher`]s
//! plus a map of keyword matchers.  Each matcher is a small tagged variant:
//! literal equality, type-of, regex, wildcard, or an arbitrary
//! [`Predicate`] from the `predicates` crate.

use std::collections::BTreeMap;
use std::fmt;

use predicates::prelude::*;
use predicates_tree::CaseTreeExt;
use regex::Regex;

use crate::value::{Call, Kind, Value};

/// Decides whether one actual argument satisfies one declared slot.
pub enum Matcher {
    /// Equal by value.
    Eq(Value),
    /// Any value of the given kind.
    TypeOf(Kind),
    /// A string value matching the regex.
    Pattern(Regex),
    /// Anything at all.
    Any,
    /// An arbitrary predicate over the actual value.
    Pred(Box<dyn Predicate<Value>>),
}

impl Matcher {
    pub fn eq(v: impl Into<Value>) -> Self {
        Matcher::Eq(v.into())
    }

    pub fn type_of(k: Kind) -> Self {
        Matcher::TypeOf(k)
    }

    /// Panics on an invalid regex, which is a configuration error.
    pub fn pattern(re: &str) -> Self {
        match Regex::new(re) {
            Ok(r) => Matcher::Pattern(r),
            Err(e) => panic!("invalid argument pattern {re:?}: {e}"),
        }
    }

    pub fn any() -> Self {
        Matcher::Any
    }

    pub fn pred<P: Predicate<Value> + 'static>(p: P) -> Self {
        Matcher::Pred(Box::new(p))
    }

    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            Matcher::Eq(expected) => expected == actual,
            Matcher::TypeOf(kind) => actual.kind() == *kind,
            Matcher::Pattern(re) => match actual {
                Value::Str(s) => re.is_match(s),
                _ => false,
            },
            Matcher::Any => true,
            Matcher::Pred(p) => p.eval(actual),
        }
    }

    /// Render why `actual` failed a predicate matcher, if it did.
    pub(crate) fn explain(&self, actual: &Value) -> Option<String> {
        match self {
            Matcher::Pred(p) => {
                p.find_case(false, actual).map(|c| c.tree().to_string())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Eq(v) => write!(f, "{v}"),
            Matcher::TypeOf(k) => write!(f, "<{k}>"),
            Matcher::Pattern(re) => write!(f, "/{}/", re.as_str()),
            Matcher::Any => f.write_str("_"),
            Matcher::Pred(p) => write!(f, "{p}"),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({self})")
    }
}

impl From<Value> for Matcher {
    fn from(v: Value) -> Self {
        Matcher::Eq(v)
    }
}

impl From<Kind> for Matcher {
    fn from(k: Kind) -> Self {
        Matcher::TypeOf(k)
    }
}

impl From<Regex> for Matcher {
    fn from(re: Regex) -> Self {
        Matcher::Pattern(re)
    }
}

/// A declared argument pattern.  An explicit empty pattern accepts only
/// calls made with no arguments; "match any call" is the absence of a
/// pattern, handled one level up in the expectation.
#[derive(Debug, Default)]
pub struct ArgPattern {
    positional: Vec<Matcher>,
    keyword: BTreeMap<String, Matcher>,
}

impl ArgPattern {
    pub fn of(positional: Vec<Matcher>) -> Self {
        ArgPattern {
            positional,
            keyword: BTreeMap::new(),
        }
    }

    /// Add a keyword slot to the pattern.
    pub fn kwarg(mut self, name: &str, m: impl Into<Matcher>) -> Self {
        self.keyword.insert(name.to_owned(), m.into());
        self
    }

    pub fn matches(&self, call: &Call) -> bool {
        if call.positional.len() != self.positional.len()
            || call.keyword.len() != self.keyword.len()
        {
            return false;
        }
        for (actual, slot) in call.positional.iter().zip(&self.positional) {
            if !slot.matches(actual) {
                return false;
            }
        }
        for (name, slot) in &self.keyword {
            match call.keyword.get(name) {
                Some(actual) if slot.matches(actual) => {}
                _ => return false,
            }
        }
        true
    }

    /// Per-slot mismatch diagnostics for predicate matchers.
    pub(crate) fn explain(&self, call: &Call) -> Option<String> {
        let mut out = String::new();
        for (actual, slot) in call.positional.iter().zip(&self.positional) {
            if let Some(tree) = slot.explain(actual) {
                out.push_str(&tree);
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

impl fmt::Display for ArgPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for m in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{m}")?;
            first = false;
        }
        for (k, m) in &self.keyword {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{k}={m}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<Vec<Matcher>> for ArgPattern {
    fn from(positional: Vec<Matcher>) -> Self {
        ArgPattern::of(positional)
    }
}

impl From<Vec<Value>> for ArgPattern {
    fn from(values: Vec<Value>) -> Self {
        ArgPattern::of(values.into_iter().map(Matcher::Eq).collect())
    }
}
