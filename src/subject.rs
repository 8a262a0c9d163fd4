// vim: tw=80
//! The explicit indirection layer that stands in for "any live object".
//!
//! A [`Subject`] is a handle with identity semantics holding named slots.
//! Production code under test reaches its collaborators through subjects
//! (`subject.call("get_name", ...)`), which is what lets the mock facade
//! substitute a slot's callable and restore it afterwards without any
//! runtime reflection.  A slot records its descriptor kind so that a
//! static method, class method, or property is re-wrapped correctly when
//! the interceptor is removed.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;
use crate::value::{Call, Value};

/// The slot name driving [`Subject::instantiate`] on class subjects.
pub(crate) const CONSTRUCTOR: &str = "new";

/// A callable slot body.  User errors flow out as `Error::Thrown`.
pub type Callable = Rc<dyn Fn(&Call) -> Result<Value, Error>>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// What sort of target a subject models.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetKind {
    Object,
    Class,
    Module,
    /// A freestanding fake with no backing real implementation.  Slots may
    /// be created on it freely.
    Fake,
}

/// The descriptor kind of one slot, preserved across install and reset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotKind {
    Method,
    StaticMethod,
    ClassMethod,
    Property,
    Constructor,
    Attribute,
}

pub(crate) enum SlotBody {
    Callable(Callable),
    Attr(Value),
}

impl Clone for SlotBody {
    fn clone(&self) -> Self {
        match self {
            SlotBody::Callable(c) => SlotBody::Callable(Rc::clone(c)),
            SlotBody::Attr(v) => SlotBody::Attr(v.clone()),
        }
    }
}

/// What a slot held before an interceptor was installed.
enum Saved {
    /// The slot did not exist; reset removes it entirely.
    Absent,
    Prior { kind: SlotKind, body: SlotBody },
}

struct Slot {
    kind: SlotKind,
    body: SlotBody,
    saved: Option<Saved>,
}

struct SubjectInner {
    id: u64,
    label: String,
    kind: TargetKind,
    sealed: bool,
    slots: RefCell<BTreeMap<String, Slot>>,
}

/// A mockable target: object, class, module, or freestanding fake.
///
/// Cloning shares the underlying slots; equality is identity.
#[derive(Clone)]
pub struct Subject(Rc<SubjectInner>);

impl Subject {
    fn with_kind(label: &str, kind: TargetKind, sealed: bool) -> Self {
        Subject(Rc::new(SubjectInner {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            label: label.to_owned(),
            kind,
            sealed,
            slots: RefCell::new(BTreeMap::new()),
        }))
    }

    pub fn object(label: &str) -> Self {
        Subject::with_kind(label, TargetKind::Object, false)
    }

    pub fn class(label: &str) -> Self {
        Subject::with_kind(label, TargetKind::Class, false)
    }

    pub fn module(label: &str) -> Self {
        Subject::with_kind(label, TargetKind::Module, false)
    }

    /// A sealed builtin: refuses slot mutation, so mocking it fails with a
    /// message suggesting a wrapper.
    pub fn builtin(label: &str) -> Self {
        Subject::with_kind(label, TargetKind::Module, true)
    }

    pub(crate) fn fake(label: &str) -> Self {
        Subject::with_kind(label, TargetKind::Fake, false)
    }

    fn define(self, name: &str, kind: SlotKind, body: SlotBody) -> Self {
        self.0.slots.borrow_mut().insert(
            name.to_owned(),
            Slot {
                kind,
                body,
                saved: None,
            },
        );
        self
    }

    pub fn method<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Call) -> Result<Value, Error> + 'static,
    {
        self.define(name, SlotKind::Method, SlotBody::Callable(Rc::new(f)))
    }

    pub fn static_method<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Call) -> Result<Value, Error> + 'static,
    {
        self.define(name, SlotKind::StaticMethod, SlotBody::Callable(Rc::new(f)))
    }

    pub fn class_method<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Call) -> Result<Value, Error> + 'static,
    {
        self.define(name, SlotKind::ClassMethod, SlotBody::Callable(Rc::new(f)))
    }

    pub fn property<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Call) -> Result<Value, Error> + 'static,
    {
        self.define(name, SlotKind::Property, SlotBody::Callable(Rc::new(f)))
    }

    pub fn constructor<F>(self, f: F) -> Self
    where
        F: Fn(&Call) -> Result<Value, Error> + 'static,
    {
        self.define(CONSTRUCTOR, SlotKind::Constructor,
                    SlotBody::Callable(Rc::new(f)))
    }

    pub fn attr(self, name: &str, value: impl Into<Value>) -> Self {
        self.define(name, SlotKind::Attribute, SlotBody::Attr(value.into()))
    }

    /// Set or replace a plain attribute in place.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.0.slots.borrow_mut().insert(
            name.to_owned(),
            Slot {
                kind: SlotKind::Attribute,
                body: SlotBody::Attr(value.into()),
                saved: None,
            },
        );
    }

    /// Invoke a callable slot.
    pub fn call(&self, name: &str, call: &Call) -> Result<Value, Error> {
        let callable = {
            let slots = self.0.slots.borrow();
            let slot = slots.get(name).ok_or_else(|| Error::NoSuchMethod {
                target: self.label().to_owned(),
                method: name.to_owned(),
            })?;
            match (&slot.body, slot.kind) {
                (_, SlotKind::Property) => {
                    return Err(Error::Config(format!(
                        "{} is a property of {}; read it with prop()",
                        name,
                        self.label()
                    )));
                }
                (SlotBody::Callable(c), _) => Rc::clone(c),
                (SlotBody::Attr(_), _) => {
                    return Err(Error::Config(format!(
                        "attribute {} of {} is not callable",
                        name,
                        self.label()
                    )));
                }
            }
        };
        callable(call)
    }

    /// Read a property slot by evaluating its callable.
    pub fn prop(&self, name: &str) -> Result<Value, Error> {
        let callable = {
            let slots = self.0.slots.borrow();
            let slot = slots.get(name).ok_or_else(|| Error::NoSuchMethod {
                target: self.label().to_owned(),
                method: name.to_owned(),
            })?;
            match &slot.body {
                SlotBody::Callable(c) => Rc::clone(c),
                SlotBody::Attr(v) => return Ok(v.clone()),
            }
        };
        callable(&Call::none())
    }

    /// Run the constructor slot.  Only meaningful on class subjects.
    pub fn instantiate(&self, call: &Call) -> Result<Value, Error> {
        if self.kind() != TargetKind::Class {
            return Err(Error::Config(format!(
                "{} is not a class and cannot be instantiated",
                self.label()
            )));
        }
        self.call(CONSTRUCTOR, call)
    }

    /// Read a plain attribute.  Callable slots yield `None`.
    pub fn get(&self, name: &str) -> Option<Value> {
        let slots = self.0.slots.borrow();
        match slots.get(name).map(|s| &s.body) {
            Some(SlotBody::Attr(v)) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.0.slots.borrow().contains_key(name)
    }

    pub fn slot_kind(&self, name: &str) -> Option<SlotKind> {
        self.0.slots.borrow().get(name).map(|s| s.kind)
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn kind(&self) -> TargetKind {
        self.0.kind
    }

    pub fn is_sealed(&self) -> bool {
        self.0.sealed
    }

    /// Replace a slot's body with an interceptor, remembering what was
    /// there.  Installing over an already-intercepted slot keeps the first
    /// saved state so repeated re-stubbing still restores correctly.
    pub(crate) fn install(&self, name: &str, interceptor: Callable) {
        let mut slots = self.0.slots.borrow_mut();
        match slots.get_mut(name) {
            Some(slot) => {
                if slot.saved.is_none() {
                    slot.saved = Some(Saved::Prior {
                        kind: slot.kind,
                        body: slot.body.clone(),
                    });
                }
                slot.body = SlotBody::Callable(interceptor);
            }
            None => {
                slots.insert(
                    name.to_owned(),
                    Slot {
                        kind: SlotKind::Method,
                        body: SlotBody::Callable(interceptor),
                        saved: Some(Saved::Absent),
                    },
                );
            }
        }
    }

    /// Restore a slot to its pre-interception state.  No-op when the slot
    /// is not intercepted, so resetting several expectations that share one
    /// method is harmless.
    pub(crate) fn uninstall(&self, name: &str) {
        let mut slots = self.0.slots.borrow_mut();
        let remove = match slots.get_mut(name) {
            Some(slot) => match slot.saved.take() {
                Some(Saved::Prior { kind, body }) => {
                    slot.kind = kind;
                    slot.body = body;
                    false
                }
                Some(Saved::Absent) => true,
                None => false,
            },
            None => false,
        };
        if remove {
            slots.remove(name);
        }
    }

    pub(crate) fn is_intercepted(&self, name: &str) -> bool {
        self.0
            .slots
            .borrow()
            .get(name)
            .is_some_and(|s| s.saved.is_some())
    }

    pub(crate) fn has_interceptors(&self) -> bool {
        self.0.slots.borrow().values().any(|s| s.saved.is_some())
    }

    /// The callable in place before interception, used by spies and by
    /// reset.  `None` when the slot did not exist or held an attribute.
    pub(crate) fn original_callable(&self, name: &str) -> Option<Callable> {
        let slots = self.0.slots.borrow();
        let slot = slots.get(name)?;
        let body = match &slot.saved {
            Some(Saved::Prior { body, .. }) => body,
            Some(Saved::Absent) => return None,
            None => &slot.body,
        };
        match body {
            SlotBody::Callable(c) => Some(Rc::clone(c)),
            SlotBody::Attr(_) => None,
        }
    }

    /// Tear every interceptor out, restoring saved bodies.  Used by the
    /// forced re-wrap path when a previous test leaked mocked state.
    pub(crate) fn force_restore_all(&self) {
        let names: Vec<String> = self
            .0
            .slots
            .borrow()
            .iter()
            .filter(|(_, s)| s.saved.is_some())
            .map(|(n, _)| n.clone())
            .collect();
        for name in names {
            self.uninstall(&name);
        }
    }
}

impl PartialEq for Subject {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Subject {}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subject({:?}, {:?})", self.0.label, self.0.kind)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.label)
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::args;

    #[test]
    fn call_reaches_the_slot() {
        let user = Subject::object("user")
            .method("get_name", |_| Ok(Value::from("mike")));
        let got = user.call("get_name", &Call::none()).unwrap();
        assert_eq!(Value::from("mike"), got);
    }

    #[test]
    fn missing_slot_is_an_error() {
        let user = Subject::object("user");
        let err = user.call("nope", &Call::none()).unwrap_err();
        assert!(matches!(err, Error::NoSuchMethod { .. }));
    }

    #[test]
    fn install_then_uninstall_restores_identity() {
        let user = Subject::object("user")
            .method("get_name", |_| Ok(Value::from("mike")));
        user.install("get_name", Rc::new(|_| Ok(Value::from("john"))));
        assert_eq!(
            Value::from("john"),
            user.call("get_name", &Call::none()).unwrap()
        );
        assert!(user.is_intercepted("get_name"));
        user.uninstall("get_name");
        assert_eq!(
            Value::from("mike"),
            user.call("get_name", &Call::none()).unwrap()
        );
        assert!(!user.has_interceptors());
    }

    #[test]
    fn uninstall_removes_slots_that_did_not_exist() {
        let user = Subject::fake("fake");
        user.install("made_up", Rc::new(|_| Ok(Value::Nil)));
        assert!(user.has_slot("made_up"));
        user.uninstall("made_up");
        assert!(!user.has_slot("made_up"));
    }

    #[test]
    fn property_reads_through_prop() {
        let user = Subject::object("user")
            .property("name", |_| Ok(Value::from("mike")));
        assert_eq!(Value::from("mike"), user.prop("name").unwrap());
        assert!(user.call("name", &Call::none()).is_err());
    }

    #[test]
    fn constructor_runs_via_instantiate() {
        let group = Subject::class("Group")
            .constructor(|c| Ok(Value::List(c.positional.clone())));
        let got = group.instantiate(&Call::positional(args![1])).unwrap();
        assert_eq!(Value::List(args![1]), got);
    }

    #[test]
    fn identity_not_structure() {
        let a = Subject::object("x");
        let b = Subject::object("x");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
