// vim: tw=80
//! The runtime-installed callable that stands in for an intercepted slot.
//!
//! At invocation time the interceptor resolves which expectation matches
//! the actual arguments, applies guard, count, and ordering checks, and
//! executes the expectation's configured behavior.  The session registry
//! borrow is always released before any user-supplied closure (guard,
//! replacement, original implementation) runs, so stubbed code is free to
//! call back into other mocked subjects.

use std::rc::Rc;

use crate::error::Error;
use crate::expectation::{describe_call, Expectation, Raise, ReturnPolicy};
use crate::registry;
use crate::subject::Subject;
use crate::value::{Call, LazySeq, Thrown, Value};

/// Replace the slot's body with an interceptor for `method`.  The previous
/// body is saved inside the slot for restoration.
pub(crate) fn install(subject: &Subject, method: &str) {
    let s = subject.clone();
    let m = method.to_owned();
    subject.install(method, Rc::new(move |call| dispatch(&s, &m, call)));
}

fn dispatch(subject: &Subject, method: &str, call: &Call) -> Result<Value, Error> {
    let found =
        registry::with_session(|s| s.find_match(subject, method, call));
    let Some(exp) = found else {
        let candidates = registry::with_session(|s| {
            s.mismatch_report(subject, method, call)
        });
        return Err(Error::UnexpectedCall {
            call: describe_call(method, call),
            candidates,
        });
    };
    if let Some(guard) = exp.guard() {
        if !guard() {
            return Err(Error::StateGuard {
                call: describe_call(method, call),
            });
        }
    }
    exp.record_call()?;
    if exp.is_ordered() {
        registry::with_session(|s| s.check_order(subject, method, call, &exp))?;
    }
    perform(&exp, method, call)
}

/// Execute the configured behavior of a matched expectation.
fn perform(exp: &Expectation, method: &str, call: &Call) -> Result<Value, Error> {
    if exp.is_pass_through() {
        return pass_through(exp, method, call);
    }
    if let Some(f) = exp.replacement() {
        return Ok(f(call));
    }
    if let Some(values) = exp.yields() {
        return Ok(Value::Seq(LazySeq::new(values)));
    }
    match exp.next_outcome() {
        Some(ReturnPolicy::Return(v)) => Ok(v),
        Some(ReturnPolicy::Raise(Raise::Exact(t))) => Err(Error::Thrown(t)),
        Some(ReturnPolicy::Raise(Raise::Matching { label, pattern })) => {
            // A pattern spec carries no concrete message to raise; the
            // pattern itself is the best rendition available.
            Err(Error::Thrown(Thrown::new(label, pattern.as_str())))
        }
        None => Ok(Value::Void),
    }
}

/// Spy behavior: run the original implementation, classify anything it
/// throws against the declared exception spec, and validate its return
/// value against the declared expected return.
fn pass_through(
    exp: &Expectation,
    method: &str,
    call: &Call,
) -> Result<Value, Error> {
    let original = exp.original().ok_or_else(|| {
        Error::Config(format!("no original implementation to spy on for {method}"))
    })?;
    match original(call) {
        Ok(v) => validate_return(exp, method, call, v),
        Err(Error::Thrown(t)) => classify_thrown(exp, t),
        Err(other) => Err(other),
    }
}

fn classify_thrown(exp: &Expectation, thrown: Thrown) -> Result<Value, Error> {
    match exp.first_outcome() {
        Some(ReturnPolicy::Raise(Raise::Exact(expected))) => {
            if expected.label != thrown.label {
                Err(Error::ExceptionClass {
                    expected: expected.label,
                    raised: thrown.label,
                })
            } else if expected.message != thrown.message {
                Err(Error::ExceptionMessage {
                    expected: expected.message,
                    raised: thrown.message,
                })
            } else {
                // The declared error happened: the spy absorbs it.
                Ok(Value::Void)
            }
        }
        Some(ReturnPolicy::Raise(Raise::Matching { label, pattern })) => {
            if label != thrown.label {
                Err(Error::ExceptionClass {
                    expected: label,
                    raised: thrown.label,
                })
            } else if !pattern.is_match(&thrown.message) {
                Err(Error::ExceptionMessage {
                    expected: format!("/{}/", pattern.as_str()),
                    raised: thrown.message,
                })
            } else {
                Ok(Value::Void)
            }
        }
        _ => Err(Error::Thrown(thrown)),
    }
}

fn validate_return(
    exp: &Expectation,
    method: &str,
    call: &Call,
    actual: Value,
) -> Result<Value, Error> {
    match exp.first_outcome() {
        Some(ReturnPolicy::Return(expected)) => {
            if return_matches(&expected, &actual) {
                Ok(actual)
            } else {
                Err(Error::ReturnMismatch {
                    call: describe_call(method, call),
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                })
            }
        }
        _ => Ok(actual),
    }
}

/// Scalar equality, or per-element equality-or-kind for list-like returns.
fn return_matches(expected: &Value, actual: &Value) -> bool {
    if actual.is_void() {
        return true;
    }
    let expected_slots: &[Value] = match expected {
        Value::List(items) => items,
        one => std::slice::from_ref(one),
    };
    let actual_slots: &[Value] = match actual {
        Value::List(items) => items,
        one => std::slice::from_ref(one),
    };
    if expected_slots.len() != actual_slots.len() {
        return false;
    }
    expected_slots
        .iter()
        .zip(actual_slots)
        .all(|(e, a)| match e {
            Value::Type(kind) => a.kind() == *kind,
            other => other == a,
        })
}

#[cfg(test)]
mod t {
    use super::*;

    #[test]
    fn return_matching_accepts_kind_slots() {
        let expected = Value::List(vec![
            Value::Type(crate::value::Kind::Str),
            Value::Type(crate::value::Kind::Str),
        ]);
        let actual = Value::from(("real", "stuff"));
        assert!(return_matches(&expected, &actual));
        assert!(!return_matches(&expected, &Value::from(("real", 5))));
    }

    #[test]
    fn return_matching_rejects_arity_drift() {
        let expected = Value::from(("a", "b"));
        assert!(!return_matches(&expected, &Value::from("a")));
    }
}
