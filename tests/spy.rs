// vim: tw=80
//! Spies: pass-through to the real implementation with return validation
//! and thrown-error classification layered on top.

use standin::*;

fn user() -> Subject {
    Subject::object("user")
        .method("get_name", |_| Ok(Value::from("mike")))
        .method("get_stuff", |_| Ok(Value::from(("real", "stuff"))))
        .method("fail", |_| {
            Err(Thrown::new("DbError", "connection lost").into())
        })
}

#[test]
fn spy_runs_the_original_and_returns_its_value() {
    let user = user();
    mock(&user).should_call("get_name").once();
    assert_eq!(
        Value::from("mike"),
        user.call("get_name", &Call::none()).unwrap()
    );
    teardown().unwrap();
}

#[test]
fn spy_validates_the_declared_return_value() {
    let user = user();
    mock(&user).should_call("get_name").and_return("mike");
    assert_eq!(
        Value::from("mike"),
        user.call("get_name", &Call::none()).unwrap()
    );
    teardown().unwrap();
}

#[test]
fn spy_rejects_a_mismatched_return_value() {
    let user = user();
    mock(&user).should_call("get_name").and_return("john");
    match user.call("get_name", &Call::none()).unwrap_err() {
        Error::ReturnMismatch {
            expected, actual, ..
        } => {
            assert_eq!("\"john\"", expected);
            assert_eq!("\"mike\"", actual);
        }
        other => panic!("unexpected {other:?}"),
    }
    teardown().unwrap();
}

#[test]
fn spy_accepts_kind_slots_in_the_declared_return() {
    let user = user();
    mock(&user)
        .should_call("get_stuff")
        .and_return((Value::Type(Kind::Str), Value::Type(Kind::Str)));
    assert_eq!(
        Value::from(("real", "stuff")),
        user.call("get_stuff", &Call::none()).unwrap()
    );
    teardown().unwrap();
}

#[test]
fn spy_absorbs_a_declared_error() {
    let user = user();
    mock(&user)
        .should_call("fail")
        .and_raise(Thrown::new("DbError", "connection lost"));
    // The declared error was raised, so the call reports success.
    assert_eq!(Value::Void, user.call("fail", &Call::none()).unwrap());
    teardown().unwrap();
}

#[test]
fn spy_reports_a_wrong_error_class() {
    let user = user();
    mock(&user)
        .should_call("fail")
        .and_raise(Thrown::new("TimeoutError", "connection lost"));
    match user.call("fail", &Call::none()).unwrap_err() {
        Error::ExceptionClass { expected, raised } => {
            assert_eq!("TimeoutError", expected);
            assert_eq!("DbError", raised);
        }
        other => panic!("unexpected {other:?}"),
    }
    teardown().unwrap();
}

#[test]
fn spy_reports_a_wrong_error_message() {
    let user = user();
    mock(&user)
        .should_call("fail")
        .and_raise(Thrown::new("DbError", "out of disk"));
    match user.call("fail", &Call::none()).unwrap_err() {
        Error::ExceptionMessage { expected, raised } => {
            assert_eq!("out of disk", expected);
            assert_eq!("connection lost", raised);
        }
        other => panic!("unexpected {other:?}"),
    }
    teardown().unwrap();
}

#[test]
fn spy_matches_error_messages_by_pattern() {
    let user = user();
    mock(&user)
        .should_call("fail")
        .and_raise_matching("DbError", "^connection");
    assert_eq!(Value::Void, user.call("fail", &Call::none()).unwrap());
    teardown().unwrap();
}

#[test]
fn spy_reports_a_pattern_mismatch() {
    let user = user();
    mock(&user)
        .should_call("fail")
        .and_raise_matching("DbError", "^timeout");
    let err = user.call("fail", &Call::none()).unwrap_err();
    assert!(matches!(err, Error::ExceptionMessage { .. }));
    teardown().unwrap();
}

#[test]
fn spy_without_an_error_spec_propagates_the_error() {
    let user = user();
    mock(&user).should_call("fail");
    assert_eq!(
        Error::Thrown(Thrown::new("DbError", "connection lost")),
        user.call("fail", &Call::none()).unwrap_err()
    );
    teardown().unwrap();
}

#[test]
#[should_panic(expected = "should_call")]
fn spying_a_class_instance_method_is_an_error() {
    let class = Subject::class("User")
        .method("get_name", |_| Ok(Value::from("mike")));
    mock(&class).should_call("get_name");
}

#[test]
fn spying_a_class_static_method_is_allowed() {
    let class = Subject::class("User")
        .static_method("version", |_| Ok(Value::from(2)));
    mock(&class).should_call("version").and_return(2);
    assert_eq!(Value::from(2), class.call("version", &Call::none()).unwrap());
    teardown().unwrap();
}

#[test]
fn guard_gates_matching_on_runtime_state() {
    use std::cell::Cell;
    use std::rc::Rc;

    let powered = Rc::new(Cell::new(false));
    let radio = Subject::object("radio")
        .method("play", |_| Ok(Value::Nil));
    let gate = Rc::clone(&powered);
    mock(&radio)
        .should_receive("play")
        .and_return("music")
        .when(move || gate.get());

    let err = radio.call("play", &Call::none()).unwrap_err();
    assert!(matches!(err, Error::StateGuard { .. }));

    powered.set(true);
    assert_eq!(
        Value::from("music"),
        radio.call("play", &Call::none()).unwrap()
    );
    teardown().unwrap();
}
