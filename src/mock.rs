// vim: tw=80
//! The facade test code holds while a target is under mock.
//!
//! A [`Mock`] wraps one [`Subject`] and is the entry point for declaring
//! expectations on it.  Declaration-time misuse (a reserved name, a method
//! the real target does not define, mocking a sealed builtin) panics with
//! the rendered [`Error`] message, surfacing the mistake at the line that
//! made it.

use crate::error::Error;
use crate::expectation::Expectation;
use crate::interceptor;
use crate::registry;
use crate::subject::{Subject, SlotKind, TargetKind, CONSTRUCTOR};
use crate::value::Value;

/// Method names owned by the mocking surface itself; replacing one would
/// clobber the machinery a test is talking to.
const RESERVED: &[&str] = &["should_receive", "should_call", "new_instances"];

/// Handle representing "this subject is now mocked".
#[derive(Clone, Debug)]
pub struct Mock {
    subject: Subject,
}

/// Build a freestanding fake with no backing real implementation.
pub fn fake() -> Mock {
    fake_named("fake")
}

/// Build a named freestanding fake.
pub fn fake_named(label: &str) -> Mock {
    let subject = Subject::fake(label);
    registry::with_session(|s| s.ensure_entry(&subject));
    Mock { subject }
}

/// Put an existing subject (object, class, or module) under partial mock.
///
/// Invoking this twice on the same subject within one test returns a
/// facade for the same underlying state rather than re-wrapping.  A
/// subject left intercepted by some earlier test is reported as already
/// mocked; see [`mock_forced`].
pub fn mock(subject: &Subject) -> Mock {
    if subject.is_sealed() {
        panic!(
            "{}",
            Error::Builtin {
                target: subject.label().to_owned()
            }
        );
    }
    let fresh_here = registry::with_session(|s| !s.has_entry(subject));
    if fresh_here && subject.has_interceptors() {
        panic!(
            "{}",
            Error::AlreadyMocked {
                target: subject.label().to_owned()
            }
        );
    }
    registry::with_session(|s| s.ensure_entry(subject));
    Mock {
        subject: subject.clone(),
    }
}

/// Like [`mock`], but first strips interceptors another test leaked onto
/// the subject, restoring the saved slot bodies.
pub fn mock_forced(subject: &Subject) -> Mock {
    let fresh_here = registry::with_session(|s| !s.has_entry(subject));
    if fresh_here && subject.has_interceptors() {
        subject.force_restore_all();
    }
    mock(subject)
}

impl Mock {
    /// The subject under mock.
    pub fn subject(&self) -> Subject {
        self.subject.clone()
    }

    /// Define a plain attribute on a freestanding fake.
    pub fn attr(&self, name: &str, value: impl Into<Value>) -> Mock {
        if self.subject.kind() != TargetKind::Fake {
            panic!(
                "{}",
                Error::Config(format!(
                    "attributes can only be declared on fakes, not on {}",
                    self.subject.label()
                ))
            );
        }
        self.subject.set(name, value);
        self.clone()
    }

    /// Inline trivial stub: `should_receive(name).and_return(value)`.
    pub fn stub(&self, name: &str, value: impl Into<Value>) -> Mock {
        self.should_receive(name).and_return(value);
        self.clone()
    }

    /// Declare an expectation on `name`, replacing the slot with an
    /// interceptor.  Dotted names chain through nested fakes.
    pub fn should_receive(&self, name: &str) -> Expectation {
        self.expect(name, false)
    }

    /// Declare a spy on `name`: the original implementation still runs,
    /// while calls are counted and validated.
    pub fn should_call(&self, name: &str) -> Expectation {
        if self.subject.original_callable(name).is_none() {
            panic!(
                "{}",
                Error::Config(format!(
                    "{} has no original implementation of {} to spy on",
                    self.subject.label(),
                    name
                ))
            );
        }
        if self.subject.kind() == TargetKind::Class {
            match self.subject.slot_kind(name) {
                Some(SlotKind::StaticMethod) | Some(SlotKind::ClassMethod) => {}
                _ => panic!(
                    "{}",
                    Error::Config(format!(
                        "should_call on a class requires a static or class \
                         method; {} is neither",
                        name
                    ))
                ),
            }
        }
        self.expect(name, true)
    }

    /// Override construction of a class: future instantiations yield the
    /// given fakes in round-robin order instead of running the normal
    /// constructor.
    pub fn new_instances(&self, objs: Vec<Value>) -> Expectation {
        if self.subject.kind() != TargetKind::Class {
            panic!(
                "{}",
                Error::Config(String::from(
                    "new_instances can only be called on a class mock"
                ))
            );
        }
        if self.subject.is_intercepted(CONSTRUCTOR) {
            panic!(
                "{}",
                Error::Config(String::from(
                    "the constructor is already stubbed; new_instances \
                     cannot override it again"
                ))
            );
        }
        let exp = self.install_expectation(CONSTRUCTOR, false);
        for obj in objs {
            exp.and_return(obj);
        }
        registry::with_session(|s| s.mark_constructor_overridden(&self.subject));
        exp
    }

    fn expect(&self, name: &str, pass_through: bool) -> Expectation {
        if RESERVED.contains(&name) {
            panic!(
                "{}",
                Error::ReservedName {
                    method: name.to_owned()
                }
            );
        }
        if registry::with_session(|s| s.constructor_overridden(&self.subject)) {
            panic!(
                "{}",
                Error::Config(String::from(
                    "cannot use should_receive with new_instances"
                ))
            );
        }
        if let Some((head, rest)) = name.split_once('.') {
            return self.chain(head, rest);
        }
        if self.subject.kind() != TargetKind::Fake
            && !self.subject.has_slot(name)
        {
            panic!(
                "{}",
                Error::NoSuchMethod {
                    target: self.subject.label().to_owned(),
                    method: name.to_owned(),
                }
            );
        }
        self.install_expectation(name, pass_through)
    }

    /// Wire `head` to return a nested fake and declare the remaining path
    /// on that fake.
    fn chain(&self, head: &str, rest: &str) -> Expectation {
        let label = format!("{}.{}", self.subject.label(), head);
        let nested = Subject::fake(&label);
        self.should_receive(head).and_return(Value::Fake(nested.clone()));
        mock(&nested).should_receive(rest)
    }

    fn install_expectation(&self, name: &str, pass_through: bool) -> Expectation {
        // Captured before installation so the expectation can restore and
        // pass through to the true implementation.  Re-stubbing the same
        // method reads the body saved by the first installation.
        let original = self.subject.original_callable(name);
        if !self.subject.is_intercepted(name) {
            interceptor::install(&self.subject, name);
        }
        let exp = Expectation::new(
            self.subject.clone(),
            name,
            original,
            pass_through,
        );
        registry::with_session(|s| s.add_expectation(&self.subject, exp.clone()));
        exp
    }
}
