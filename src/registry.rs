// vim: tw=80
//! The per-test correlation table tying subjects to their expectations.
//!
//! Each thread owns one session, which makes parallel test execution safe
//! without any locking: a test and everything it mocks live on one thread,
//! and [`teardown`] drains only that thread's table.  Runner glue has a
//! single obligation: call `teardown()` exactly once after each test
//! completes, before the next test's setup begins.

use std::cell::RefCell;

use crate::error::Error;
use crate::expectation::{describe_call, Expectation};
use crate::subject::Subject;
use crate::value::Call;

pub(crate) struct Entry {
    pub subject: Subject,
    pub expectations: Vec<Expectation>,
    /// Set by `new_instances`; blocks later `should_receive` calls.
    pub constructor_overridden: bool,
}

/// Insertion-ordered table from subject identity to expectation list.
/// Declaration order is what ordering enforcement and last-declared-wins
/// matching are defined against.
#[derive(Default)]
pub(crate) struct Session {
    entries: Vec<Entry>,
}

impl Session {
    fn entry(&self, subject: &Subject) -> Option<&Entry> {
        self.entries.iter().find(|e| e.subject == *subject)
    }

    fn entry_mut(&mut self, subject: &Subject) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.subject == *subject)
    }

    pub fn has_entry(&self, subject: &Subject) -> bool {
        self.entry(subject).is_some()
    }

    pub fn ensure_entry(&mut self, subject: &Subject) {
        if !self.has_entry(subject) {
            self.entries.push(Entry {
                subject: subject.clone(),
                expectations: Vec::new(),
                constructor_overridden: false,
            });
        }
    }

    pub fn add_expectation(&mut self, subject: &Subject, exp: Expectation) {
        self.ensure_entry(subject);
        self.entry_mut(subject)
            .expect("entry just ensured")
            .expectations
            .push(exp);
    }

    pub fn constructor_overridden(&self, subject: &Subject) -> bool {
        self.entry(subject).is_some_and(|e| e.constructor_overridden)
    }

    pub fn mark_constructor_overridden(&mut self, subject: &Subject) {
        if let Some(e) = self.entry_mut(subject) {
            e.constructor_overridden = true;
        }
    }

    /// The expectation a call resolves to: the most recently declared one
    /// for this method whose pattern accepts the arguments, which is why
    /// the list is searched in reverse.
    pub fn find_match(
        &self,
        subject: &Subject,
        method: &str,
        call: &Call,
    ) -> Option<Expectation> {
        let entry = self.entry(subject)?;
        entry
            .expectations
            .iter()
            .rev()
            .find(|e| e.method() == method && e.matches(call))
            .cloned()
    }

    /// Render the declared patterns a failed call was tried against.
    pub fn mismatch_report(
        &self,
        subject: &Subject,
        method: &str,
        call: &Call,
    ) -> String {
        let Some(entry) = self.entry(subject) else {
            return String::new();
        };
        let mut out = String::new();
        for e in entry.expectations.iter().filter(|e| e.method() == method) {
            out.push_str("\n  declared: ");
            out.push_str(&e.describe());
            if let Some(tree) = e.describe_mismatch(call) {
                out.push('\n');
                out.push_str(&tree);
            }
        }
        out
    }

    /// Ordering enforcement for a matched, ordered call: every ordered,
    /// as-yet-uncalled expectation declared earlier on the same subject
    /// must itself accept this call, or the sequence is violated.
    /// Unordered expectations never block.
    pub fn check_order(
        &self,
        subject: &Subject,
        method: &str,
        call: &Call,
        matched: &Expectation,
    ) -> Result<(), Error> {
        let Some(entry) = self.entry(subject) else {
            return Ok(());
        };
        for e in &entry.expectations {
            if e.same_record(matched)
                || (e.method() == method && e.matches(call))
            {
                break;
            }
            if e.is_ordered() && e.times_called() == 0 {
                return Err(Error::CallOrder {
                    called: describe_call(method, call),
                    blocked: e.describe(),
                });
            }
        }
        Ok(())
    }

    fn drain(&mut self) -> Vec<Entry> {
        std::mem::take(&mut self.entries)
    }
}

thread_local! {
    static SESSION: RefCell<Session> = RefCell::new(Session::default());
}

pub(crate) fn with_session<R>(f: impl FnOnce(&mut Session) -> R) -> R {
    SESSION.with(|s| f(&mut s.borrow_mut()))
}

/// End-of-test orchestration: restore every intercepted slot, then verify
/// every expectation, then clear the table.
///
/// Reset-before-verify is a strict ordering requirement: verification
/// failures are test-visible, and they must never leave a class or module
/// in a mocked state for the next test.  The first verification failure is
/// returned after all resets and all verifications have run.
pub fn teardown() -> Result<(), Error> {
    let entries = with_session(Session::drain);
    for entry in &entries {
        for exp in &entry.expectations {
            exp.reset();
        }
    }
    let mut first_err = None;
    for entry in &entries {
        for exp in &entry.expectations {
            if let Err(e) = exp.verify() {
                first_err.get_or_insert(e);
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Drop guard for runner glue: runs [`teardown`] at scope exit and panics
/// on a verification failure, unless the test is already panicking.
#[derive(Default)]
pub struct TeardownGuard {}

impl TeardownGuard {
    pub fn new() -> Self {
        TeardownGuard {}
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        let result = teardown();
        if !std::thread::panicking() {
            if let Err(e) = result {
                panic!("{e}");
            }
        }
    }
}
