// vim: tw=80
//! The declarative record of one stubbed-method contract.
//!
//! An [`Expectation`] is a cheaply clonable handle; the facade, the session
//! registry, and test code all share the same record.  Every fluent
//! modifier takes `&self` and hands back a clone, so declarations chain
//! fluently while every handle stays live.
//!
//! Configuration misuse (contradictory modifiers, a second `at_least`,
//! `replace_with` on top of a queued outcome) panics immediately: that is
//! how a Rust test library raises synchronously from inside a fluent
//! chain.  Call-time and verification failures flow as `Result`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use regex::Regex;

use crate::error::Error;
use crate::matcher::ArgPattern;
use crate::subject::{Callable, Subject};
use crate::value::{format_call, Call, Thrown, Value};

/// The exception half of an outcome: either a concrete error to raise, or
/// a label-plus-pattern spec a spy classifies thrown errors against.
#[derive(Clone, Debug)]
pub(crate) enum Raise {
    Exact(Thrown),
    Matching { label: String, pattern: Regex },
}

/// One queued outcome of a call.
#[derive(Clone, Debug)]
pub(crate) enum ReturnPolicy {
    Return(Value),
    Raise(Raise),
}

/// Call-count contract.  `exactly` excludes the bounds and vice versa;
/// `at_least` and `at_most` may be combined into a range.
#[derive(Clone, Copy, Debug, Default)]
struct CallPolicy {
    exactly: Option<usize>,
    at_least: Option<usize>,
    at_most: Option<usize>,
}

fn times_word(n: usize) -> &'static str {
    if n == 1 {
        "time"
    } else {
        "times"
    }
}

impl CallPolicy {
    fn is_set(&self) -> bool {
        self.exactly.is_some() || self.at_least.is_some()
            || self.at_most.is_some()
    }

    fn describe(&self) -> String {
        match (self.exactly, self.at_least, self.at_most) {
            (Some(n), _, _) => format!("exactly {n} {}", times_word(n)),
            (None, Some(a), Some(b)) => {
                format!("at least {a} and at most {b} {}", times_word(b))
            }
            (None, Some(a), None) => format!("at least {a} {}", times_word(a)),
            (None, None, Some(b)) => format!("at most {b} {}", times_word(b)),
            (None, None, None) => String::from("any number of times"),
        }
    }

    /// The bound that fails fast mid-test, if any.
    fn ceiling(&self) -> Option<usize> {
        self.exactly.or(self.at_most)
    }

    fn satisfied_by(&self, count: usize) -> bool {
        if let Some(n) = self.exactly {
            return count == n;
        }
        if let Some(a) = self.at_least {
            if count < a {
                return false;
            }
        }
        if let Some(b) = self.at_most {
            if count > b {
                return false;
            }
        }
        true
    }
}

/// A pending `at_least`/`at_most` modifier waiting for its count.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Pending {
    #[default]
    None,
    AtLeast,
    AtMost,
}

pub(crate) struct ExpectState {
    method: String,
    subject: Subject,
    pattern: Option<ArgPattern>,
    outcomes: VecDeque<ReturnPolicy>,
    one_by_one: bool,
    yields: Option<Rc<Vec<Value>>>,
    replacement: Option<Rc<dyn Fn(&Call) -> Value>>,
    pass_through: bool,
    guard: Option<Rc<dyn Fn() -> bool>>,
    ordered: bool,
    policy: CallPolicy,
    pending: Pending,
    times_called: usize,
    original: Option<Callable>,
    reported: bool,
}

/// Declarative contract for one stubbed method signature.
#[derive(Clone)]
pub struct Expectation(Rc<RefCell<ExpectState>>);

impl Expectation {
    pub(crate) fn new(
        subject: Subject,
        method: &str,
        original: Option<Callable>,
        pass_through: bool,
    ) -> Self {
        Expectation(Rc::new(RefCell::new(ExpectState {
            method: method.to_owned(),
            subject,
            pattern: None,
            outcomes: VecDeque::new(),
            one_by_one: false,
            yields: None,
            replacement: None,
            pass_through,
            guard: None,
            ordered: false,
            policy: CallPolicy::default(),
            pending: Pending::default(),
            times_called: 0,
            original,
            reported: false,
        })))
    }

    /// The subject this expectation is attached to.
    pub fn subject(&self) -> Subject {
        self.0.borrow().subject.clone()
    }

    /// Narrow this expectation to calls matching the given pattern.  An
    /// explicit empty pattern accepts only argument-free calls.
    pub fn with_args(&self, pattern: impl Into<ArgPattern>) -> Expectation {
        self.0.borrow_mut().pattern = Some(pattern.into());
        self.clone()
    }

    /// Queue a value to return.  Queued outcomes are consumed round-robin:
    /// an exhausted queue starts over from its front.
    pub fn and_return(&self, value: impl Into<Value>) -> Expectation {
        let value = value.into();
        let mut state = self.0.borrow_mut();
        state.reject_replacement("and_return");
        if state.one_by_one {
            if let Value::List(items) = value {
                state
                    .outcomes
                    .extend(items.into_iter().map(ReturnPolicy::Return));
                return self.clone();
            }
        }
        state.outcomes.push_back(ReturnPolicy::Return(value));
        self.clone()
    }

    /// Treat queued multi-value returns as one value per call instead of a
    /// list per call.
    pub fn one_by_one(&self) -> Expectation {
        let mut state = self.0.borrow_mut();
        if !state.one_by_one {
            state.one_by_one = true;
            let saved: Vec<ReturnPolicy> = state.outcomes.drain(..).collect();
            for policy in saved {
                match policy {
                    ReturnPolicy::Return(Value::List(items)) => {
                        state
                            .outcomes
                            .extend(items.into_iter().map(ReturnPolicy::Return));
                    }
                    other => state.outcomes.push_back(other),
                }
            }
        }
        self.clone()
    }

    /// Queue an error to raise.
    pub fn and_raise(&self, thrown: Thrown) -> Expectation {
        let mut state = self.0.borrow_mut();
        state.reject_replacement("and_raise");
        state
            .outcomes
            .push_back(ReturnPolicy::Raise(Raise::Exact(thrown)));
        self.clone()
    }

    /// Queue an error spec whose message is a regex.  Only meaningful on a
    /// spy, which classifies the real thrown error against it.
    pub fn and_raise_matching(&self, label: &str, pattern: &str) -> Expectation {
        let re = match Regex::new(pattern) {
            Ok(r) => r,
            Err(e) => panic!("invalid exception pattern {pattern:?}: {e}"),
        };
        let mut state = self.0.borrow_mut();
        state.reject_replacement("and_raise_matching");
        state.outcomes.push_back(ReturnPolicy::Raise(Raise::Matching {
            label: label.to_owned(),
            pattern: re,
        }));
        self.clone()
    }

    /// Make each matched call return a fresh lazy sequence of the given
    /// values.
    pub fn and_yield(&self, values: Vec<Value>) -> Expectation {
        let mut state = self.0.borrow_mut();
        state.reject_replacement("and_yield");
        let combined = match state.yields.take() {
            Some(prior) => {
                let mut all = (*prior).clone();
                all.extend(values);
                all
            }
            None => values,
        };
        state.yields = Some(Rc::new(combined));
        self.clone()
    }

    /// Forward matched calls to `f`, bypassing the outcome queue entirely.
    pub fn replace_with<F>(&self, f: F) -> Expectation
    where
        F: Fn(&Call) -> Value + 'static,
    {
        let mut state = self.0.borrow_mut();
        if !state.outcomes.is_empty() || state.yields.is_some() {
            panic!(
                "{}",
                Error::Config(String::from(
                    "replace_with cannot be combined with and_return, \
                     and_raise, or and_yield"
                ))
            );
        }
        if state.replacement.is_some() {
            panic!(
                "{}",
                Error::Config(String::from("replace_with can only be given once"))
            );
        }
        if state.pass_through {
            panic!(
                "{}",
                Error::Config(String::from(
                    "replace_with cannot be combined with should_call"
                ))
            );
        }
        state.replacement = Some(Rc::new(f));
        self.clone()
    }

    /// Expect exactly `n` calls, or apply a pending `at_least`/`at_most`
    /// modifier to `n`.
    pub fn times(&self, n: usize) -> Expectation {
        let mut state = self.0.borrow_mut();
        match state.pending {
            Pending::None => {
                if state.policy.at_least.is_some()
                    || state.policy.at_most.is_some()
                {
                    panic!(
                        "{}",
                        Error::Config(String::from(
                            "an exact call count cannot be combined with \
                             at_least or at_most"
                        ))
                    );
                }
                state.policy.exactly = Some(n);
            }
            Pending::AtLeast => {
                state.check_no_exact("at_least");
                if state.policy.at_least.is_some() {
                    panic!(
                        "{}",
                        Error::Config(String::from(
                            "at_least can only be given once"
                        ))
                    );
                }
                state.policy.at_least = Some(n);
            }
            Pending::AtMost => {
                state.check_no_exact("at_most");
                if state.policy.at_most.is_some() {
                    panic!(
                        "{}",
                        Error::Config(String::from(
                            "at_most can only be given once"
                        ))
                    );
                }
                state.policy.at_most = Some(n);
            }
        }
        state.pending = Pending::None;
        self.clone()
    }

    /// Shortcut for `times(1)`.
    pub fn once(&self) -> Expectation {
        self.times(1)
    }

    /// Shortcut for `times(2)`.
    pub fn twice(&self) -> Expectation {
        self.times(2)
    }

    /// Shortcut for `times(0)`.
    pub fn never(&self) -> Expectation {
        self.times(0)
    }

    /// Turn the next count into a lower bound: `at_least().twice()`.
    pub fn at_least(&self) -> Expectation {
        let mut state = self.0.borrow_mut();
        if state.pending != Pending::None {
            panic!(
                "{}",
                Error::Config(String::from(
                    "at_least cannot follow another pending modifier"
                ))
            );
        }
        state.pending = Pending::AtLeast;
        self.clone()
    }

    /// Turn the next count into an upper bound: `at_most().once()`.
    pub fn at_most(&self) -> Expectation {
        let mut state = self.0.borrow_mut();
        if state.pending != Pending::None {
            panic!(
                "{}",
                Error::Config(String::from(
                    "at_most cannot follow another pending modifier"
                ))
            );
        }
        state.pending = Pending::AtMost;
        self.clone()
    }

    /// Make this expectation respect declaration order relative to the
    /// other ordered expectations on the same subject.
    pub fn ordered(&self) -> Expectation {
        self.0.borrow_mut().ordered = true;
        self.clone()
    }

    /// Gate matching on a state precondition evaluated at call time.
    pub fn when<F>(&self, guard: F) -> Expectation
    where
        F: Fn() -> bool + 'static,
    {
        self.0.borrow_mut().guard = Some(Rc::new(guard));
        self.clone()
    }

    /// Compare the recorded call count against the declared contract.
    /// Idempotent: a failure is reported once; later calls pass.
    pub fn verify(&self) -> Result<(), Error> {
        let mut state = self.0.borrow_mut();
        if state.reported || !state.policy.is_set() {
            return Ok(());
        }
        if state.policy.satisfied_by(state.times_called) {
            return Ok(());
        }
        state.reported = true;
        Err(Error::CallCount {
            call: state.describe(),
            policy: state.policy.describe(),
            actual: state.times_called,
        })
    }

    /// Restore the intercepted slot.  Safe to call more than once and safe
    /// when several expectations share one method.
    pub fn reset(&self) {
        let (subject, method) = {
            let state = self.0.borrow();
            (state.subject.clone(), state.method.clone())
        };
        subject.uninstall(&method);
    }

    // Call-time entry points, used by the interceptor.

    pub(crate) fn method(&self) -> String {
        self.0.borrow().method.clone()
    }

    pub(crate) fn matches(&self, call: &Call) -> bool {
        let state = self.0.borrow();
        match &state.pattern {
            None => true,
            Some(p) => p.matches(call),
        }
    }

    pub(crate) fn is_ordered(&self) -> bool {
        self.0.borrow().ordered
    }

    pub(crate) fn times_called(&self) -> usize {
        self.0.borrow().times_called
    }

    pub(crate) fn guard(&self) -> Option<Rc<dyn Fn() -> bool>> {
        self.0.borrow().guard.clone()
    }

    pub(crate) fn is_pass_through(&self) -> bool {
        self.0.borrow().pass_through
    }

    pub(crate) fn replacement(&self) -> Option<Rc<dyn Fn(&Call) -> Value>> {
        self.0.borrow().replacement.clone()
    }

    pub(crate) fn yields(&self) -> Option<Rc<Vec<Value>>> {
        self.0.borrow().yields.clone()
    }

    pub(crate) fn original(&self) -> Option<Callable> {
        self.0.borrow().original.clone()
    }

    /// Record one matched call, failing fast when an exact or at-most
    /// bound is already exceeded.
    pub(crate) fn record_call(&self) -> Result<(), Error> {
        let mut state = self.0.borrow_mut();
        state.times_called += 1;
        if let Some(limit) = state.policy.ceiling() {
            if state.times_called > limit {
                state.reported = true;
                return Err(Error::CallCount {
                    call: state.describe(),
                    policy: state.policy.describe(),
                    actual: state.times_called,
                });
            }
        }
        Ok(())
    }

    /// Pop the front outcome and rotate it to the back.
    pub(crate) fn next_outcome(&self) -> Option<ReturnPolicy> {
        let mut state = self.0.borrow_mut();
        let front = state.outcomes.pop_front()?;
        state.outcomes.push_back(front.clone());
        Some(front)
    }

    /// Peek the front outcome without rotating; spies validate against it.
    pub(crate) fn first_outcome(&self) -> Option<ReturnPolicy> {
        self.0.borrow().outcomes.front().cloned()
    }

    pub(crate) fn same_record(&self, other: &Expectation) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// `method(pattern)` for diagnostics.
    pub(crate) fn describe(&self) -> String {
        self.0.borrow().describe()
    }

    pub(crate) fn describe_mismatch(&self, call: &Call) -> Option<String> {
        let state = self.0.borrow();
        state.pattern.as_ref().and_then(|p| p.explain(call))
    }
}

impl ExpectState {
    fn describe(&self) -> String {
        match &self.pattern {
            Some(p) => format!("{}({p})", self.method),
            None => format!("{}()", self.method),
        }
    }

    fn reject_replacement(&self, what: &str) {
        if self.replacement.is_some() {
            panic!(
                "{}",
                Error::Config(format!(
                    "{what} cannot be combined with replace_with"
                ))
            );
        }
    }

    fn check_no_exact(&self, what: &str) {
        if self.policy.exactly.is_some() {
            panic!(
                "{}",
                Error::Config(format!(
                    "{what} cannot be combined with an exact call count"
                ))
            );
        }
    }
}

impl std::fmt::Debug for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Expectation({})", self.describe())
    }
}

/// Format `method(args)` the way expectation descriptions are formatted.
pub(crate) fn describe_call(method: &str, call: &Call) -> String {
    format_call(method, call)
}
