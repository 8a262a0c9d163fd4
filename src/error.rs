// vim: tw=80
//! Failure taxonomy for the expectation engine.
//!
//! Call-time failures (an unexpected call, an ordering violation, an
//! exceeded call count) and teardown-time verification failures all flow as
//! [`Error`] values through `Result`, so they escape to the test framework
//! unmodified.  Declaration-time misuse panics with the same rendered
//! messages; see the crate docs.

use thiserror::Error;

use crate::value::Thrown;

/// Any failure the engine can report.
#[derive(Clone, Debug, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A call arrived at an intercepted method with no expectation whose
    /// argument pattern accepts it.
    #[error("unexpected call {call}{candidates}")]
    UnexpectedCall {
        call: String,
        /// Rendered descriptions of the declared patterns that were tried.
        candidates: String,
    },

    /// An ordered expectation was satisfied out of declaration order.
    #[error("{called} called before {blocked}")]
    CallOrder { called: String, blocked: String },

    /// A call matched an expectation whose `when` guard evaluated false.
    #[error("{call} called in an unexpected state")]
    StateGuard { call: String },

    /// A call-count contract was violated, either eagerly (an exact or
    /// at-most bound exceeded mid-test) or at verification time.
    #[error("{call} expected to be called {policy}, called {actual} times")]
    CallCount {
        call: String,
        policy: String,
        actual: usize,
    },

    /// A spied call threw an error whose label does not match the declared
    /// expectation.
    #[error("expected {expected}, raised {raised}")]
    ExceptionClass { expected: String, raised: String },

    /// A spied call threw an error of the right label but with the wrong
    /// message.
    #[error("expected message {expected}, raised {raised}")]
    ExceptionMessage { expected: String, raised: String },

    /// A spied call returned a value that does not satisfy the declared
    /// expected return value.
    #[error("{call} expected to return {expected}, returned {actual}")]
    ReturnMismatch {
        call: String,
        expected: String,
        actual: String,
    },

    /// `should_receive` named a method the real target does not define.
    #[error("{target} does not define method {method}")]
    NoSuchMethod { target: String, method: String },

    /// `should_receive` named a method reserved by the mocking surface.
    #[error("unable to replace the reserved method {method}")]
    ReservedName { method: String },

    /// The target is a sealed builtin that cannot accept slot mutation.
    #[error("{target} is a sealed builtin and cannot be mocked; consider \
             wrapping it in a type you control")]
    Builtin { target: String },

    /// The target was left in a mocked state by some earlier test.
    #[error("{target} is already mocked by another test; use mock_forced to \
             override")]
    AlreadyMocked { target: String },

    /// Invalid combination of expectation modifiers or facade misuse.
    #[error("{0}")]
    Config(String),

    /// A user-raised error propagating out of a stubbed or spied call.
    #[error(transparent)]
    Thrown(#[from] Thrown),
}

impl Error {
    /// True for the user-raised variant, false for engine failures.
    pub fn is_thrown(&self) -> bool {
        matches!(self, Error::Thrown(_))
    }
}
