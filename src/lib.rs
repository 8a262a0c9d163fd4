// vim: tw=80
//! A flexible runtime test-double library for Rust.
//!
//! Standin lets a test declare expectations on the methods of any
//! [`Subject`] — an explicit stand-in for an object, class, or module —
//! intercepting calls, substituting return values or raised errors,
//! counting invocations, enforcing call order, and restoring the original
//! state at the end of the test.
//!
//! The basic idea:
//! * Reach collaborators through a [`Subject`]: a handle holding named
//!   callable slots.  Production code calls `subject.call("name", args)`.
//! * In your test, put the subject under mock with [`mock`] (or build a
//!   freestanding fake with [`fake`]) and declare expectations with
//!   [`Mock::should_receive`].  Each expectation can have an argument
//!   pattern, queued outcomes, a call-count contract, and an ordering
//!   constraint.
//! * Finish the test with [`teardown`], which restores every intercepted
//!   slot and then verifies every expectation.  Runner glue only has to
//!   guarantee one thing: `teardown()` runs exactly once after each test.
//!
//! # Getting started
//!
//! ```
//! use standin::*;
//!
//! let user = Subject::object("user")
//!     .method("get_name", |_| Ok(Value::from("mike")));
//!
//! mock(&user).should_receive("get_name").and_return("john");
//! assert_eq!(Value::from("john"),
//!            user.call("get_name", &Call::none()).unwrap());
//!
//! teardown().unwrap();
//! assert_eq!(Value::from("mike"),
//!            user.call("get_name", &Call::none()).unwrap());
//! ```
//!
//! # Return values
//!
//! Queued outcomes are consumed round-robin: a one-entry queue always
//! returns the same value, a longer queue cycles.  `and_raise` entries mix
//! into the same queue, alternating returns with raised errors.
//! [`Expectation::one_by_one`] splits multi-value returns into one value
//! per call, and [`Expectation::and_yield`] turns the stub into a producer
//! of fresh lazy sequences.  An expectation with no configured outcome
//! returns the [`Value::Void`] sentinel, which is distinct from an
//! explicit nil.
//!
//! # Matching arguments
//!
//! ```
//! use standin::*;
//!
//! let plan = Subject::object("plan")
//!     .method("activate", |_| Ok(Value::Nil));
//! mock(&plan).should_receive("activate")
//!     .with_args(vec![Matcher::eq("premium"), Matcher::type_of(Kind::Int)])
//!     .and_return(true);
//!
//! let got = plan.call("activate",
//!                     &Call::positional(args!["premium", 3])).unwrap();
//! assert_eq!(Value::from(true), got);
//! # teardown().unwrap();
//! ```
//!
//! All expectations for a method are searched most-recently-declared
//! first, so later declarations narrow or override earlier ones while a
//! patternless fallback stays reachable.  A call no declared pattern
//! accepts fails immediately with an unexpected-call error rather than at
//! teardown.
//!
//! # Call counts, ordering, spies
//!
//! `times(n)`, `once()`, `twice()`, `never()`, and the `at_least()` /
//! `at_most()` modifiers form the call-count contract; exceeding an exact
//! or at-most bound fails eagerly at the offending call.  `ordered()`
//! expectations on one subject must be satisfied in declaration order.
//! [`Mock::should_call`] declares a spy: the original implementation
//! still runs, while the call is counted and its return value (or raised
//! error) is validated against the declared expectation.
//!
//! # Teardown discipline
//!
//! [`teardown`] always resets before it verifies: a failing test never
//! leaves a mocked class or module visible to the next test.  Each thread
//! owns its own session table, so parallel test threads cannot see each
//! other's mocks.  [`TeardownGuard`] adapts this contract to plain
//! `#[test]` functions as a drop guard.

mod error;
mod expectation;
mod interceptor;
mod matcher;
mod mock;
mod registry;
mod subject;
mod value;

pub use error::Error;
pub use expectation::Expectation;
pub use matcher::{ArgPattern, Matcher};
pub use mock::{fake, fake_named, mock, mock_forced, Mock};
pub use registry::{teardown, TeardownGuard};
pub use subject::{Callable, SlotKind, Subject, TargetKind};
pub use value::{Call, Kind, LazySeq, Thrown, Value};

pub use predicates::prelude::{predicate, Predicate};
