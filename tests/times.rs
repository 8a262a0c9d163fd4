// vim: tw=80
//! Call-count policies: exact counts, lower and upper bounds, and the
//! points at which violations surface.

use standin::*;

fn foo() -> Subject {
    Subject::object("foo").method("method1", |_| Ok(Value::Nil))
}

#[test]
fn exactly_once_is_satisfied_by_one_call() {
    let foo = foo();
    mock(&foo).should_receive("method1").once();
    foo.call("method1", &Call::none()).unwrap();
    teardown().unwrap();
}

#[test]
fn unmet_exact_count_fails_at_teardown() {
    let foo = foo();
    mock(&foo).should_receive("method1").once();
    match teardown().unwrap_err() {
        Error::CallCount {
            policy, actual, ..
        } => {
            assert_eq!("exactly 1 time", policy);
            assert_eq!(0, actual);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn exceeding_an_exact_count_fails_at_the_call() {
    let foo = foo();
    mock(&foo).should_receive("method1").once();
    foo.call("method1", &Call::none()).unwrap();
    let err = foo.call("method1", &Call::none()).unwrap_err();
    assert!(matches!(err, Error::CallCount { actual: 2, .. }));
    // The failure was already reported; teardown stays quiet.
    teardown().unwrap();
}

#[test]
fn at_least_twice_needs_two_calls() {
    let foo = foo();
    mock(&foo).should_receive("method1").at_least().twice();
    foo.call("method1", &Call::none()).unwrap();
    match teardown().unwrap_err() {
        Error::CallCount { policy, actual, .. } => {
            assert_eq!("at least 2 times", policy);
            assert_eq!(1, actual);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn at_least_permits_any_surplus() {
    let foo = foo();
    mock(&foo).should_receive("method1").at_least().once();
    for _ in 0..5 {
        foo.call("method1", &Call::none()).unwrap();
    }
    teardown().unwrap();
}

#[test]
fn at_most_once_rejects_the_second_call_eagerly() {
    let foo = foo();
    mock(&foo).should_receive("method1").at_most().once();
    foo.call("method1", &Call::none()).unwrap();
    let err = foo.call("method1", &Call::none()).unwrap_err();
    assert!(matches!(err, Error::CallCount { actual: 2, .. }));
    teardown().unwrap();
}

#[test]
fn at_most_is_satisfied_by_zero_calls() {
    let foo = foo();
    mock(&foo).should_receive("method1").at_most().twice();
    teardown().unwrap();
}

#[test]
fn bounds_can_be_combined_into_a_range() {
    let foo = foo();
    mock(&foo)
        .should_receive("method1")
        .at_least()
        .once()
        .at_most()
        .times(3);
    foo.call("method1", &Call::none()).unwrap();
    foo.call("method1", &Call::none()).unwrap();
    teardown().unwrap();
}

#[test]
fn never_fails_on_the_first_call() {
    let foo = foo();
    mock(&foo).should_receive("method1").never();
    let err = foo.call("method1", &Call::none()).unwrap_err();
    assert!(matches!(err, Error::CallCount { actual: 1, .. }));
    teardown().unwrap();
}

#[test]
fn never_passes_teardown_when_left_alone() {
    let foo = foo();
    mock(&foo).should_receive("method1").never();
    teardown().unwrap();
}

#[test]
#[should_panic(expected = "cannot be combined with an exact call count")]
fn exact_and_bound_counts_are_mutually_exclusive() {
    let foo = foo();
    mock(&foo).should_receive("method1").once().at_least().twice();
}

#[test]
fn counts_are_tracked_per_expectation() {
    let foo = foo();
    let m = mock(&foo);
    m.should_receive("method1").with_args(args!["a"]).once();
    m.should_receive("method1").with_args(args!["b"]).twice();
    foo.call("method1", &Call::positional(args!["a"])).unwrap();
    foo.call("method1", &Call::positional(args!["b"])).unwrap();
    foo.call("method1", &Call::positional(args!["b"])).unwrap();
    teardown().unwrap();
}
