// vim: tw=80
//! Freestanding fakes: attribute declaration, trivial stubs, and dotted
//! call chains through nested fakes.

use standin::*;

#[test]
fn a_fake_accepts_any_declared_method() {
    let m = fake();
    m.should_receive("anything").and_return(42);
    assert_eq!(
        Value::from(42),
        m.subject().call("anything", &Call::none()).unwrap()
    );
    teardown().unwrap();
}

#[test]
fn fake_attributes_are_plain_values() {
    let m = fake_named("plan").attr("name", "premium").attr("seats", 10);
    let plan = m.subject();
    assert_eq!(Value::from("premium"), plan.get("name").unwrap());
    assert_eq!(Value::from(10), plan.get("seats").unwrap());
    teardown().unwrap();
}

#[test]
#[should_panic(expected = "attributes can only be declared on fakes")]
fn attributes_are_rejected_on_real_targets() {
    let obj = Subject::object("obj").method("ping", |_| Ok(Value::Nil));
    mock(&obj).attr("name", "nope");
}

#[test]
fn stub_chains_into_multiple_methods() {
    let m = fake()
        .stub("width", 20)
        .stub("height", 30);
    let s = m.subject();
    assert_eq!(Value::from(20), s.call("width", &Call::none()).unwrap());
    assert_eq!(Value::from(30), s.call("height", &Call::none()).unwrap());
    teardown().unwrap();
}

#[test]
fn dotted_names_chain_through_nested_fakes() {
    let m = fake_named("db");
    m.should_receive("session.query").and_return("rows");
    let db = m.subject();
    let session = db
        .call("session", &Call::none())
        .unwrap()
        .as_fake()
        .cloned()
        .expect("a nested fake");
    assert_eq!(
        Value::from("rows"),
        session.call("query", &Call::none()).unwrap()
    );
    teardown().unwrap();
}

#[test]
fn deeply_dotted_names_chain_recursively() {
    let m = fake_named("app");
    m.should_receive("config.db.url").and_return("postgres://x");
    let app = m.subject();
    let config = app
        .call("config", &Call::none())
        .unwrap()
        .as_fake()
        .cloned()
        .expect("a nested fake");
    let db = config
        .call("db", &Call::none())
        .unwrap()
        .as_fake()
        .cloned()
        .expect("a nested fake");
    assert_eq!(
        Value::from("postgres://x"),
        db.call("url", &Call::none()).unwrap()
    );
    teardown().unwrap();
}

#[test]
fn chained_expectations_carry_their_own_modifiers() {
    let m = fake_named("db");
    m.should_receive("session.commit").once();
    let db = m.subject();
    let session = db
        .call("session", &Call::none())
        .unwrap()
        .as_fake()
        .cloned()
        .expect("a nested fake");
    session.call("commit", &Call::none()).unwrap();
    teardown().unwrap();
}

#[test]
fn fakes_returned_as_values_compare_by_identity() {
    let m = fake_named("singleton");
    let s = m.subject();
    assert_eq!(Value::Fake(s.clone()), Value::Fake(s));
    teardown().unwrap();
}

#[test]
fn a_fake_can_return_another_fake_explicitly() {
    let inner = fake_named("inner");
    inner.should_receive("ping").and_return("pong");
    let outer = fake_named("outer");
    outer.should_receive("inner").and_return(inner.subject());
    let got = outer
        .subject()
        .call("inner", &Call::none())
        .unwrap()
        .as_fake()
        .cloned()
        .expect("a fake");
    assert_eq!(Value::from("pong"), got.call("ping", &Call::none()).unwrap());
    teardown().unwrap();
}
