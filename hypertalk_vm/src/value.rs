//! The tagged value that doubles as the VM's stack cell.
//!
//! User-visible variants follow the language's "everything is a string"
//! coercion rules; the bookkeeping variants (`InstructionIndex`,
//! `StackIndex`, `ParameterCount`) share the representation so frames can
//! live directly on the value stack, but every coercion refuses them with a
//! distinct internal error.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::vm::error::RuntimeError;

/// References are resolved transitively; the parser never emits a cycle,
/// but native-object misuse could, so the walk is capped.
const MAX_REFERENCE_DEPTH: usize = 64;

/// Host-owned object surfaced to property access.
///
/// Equality between native values compares `id`. The `id` property itself
/// is read-only and answered by the runtime, never by `get_property`.
pub trait NativeObject {
    fn id(&self) -> i64;
    fn get_property(&self, name: &str) -> Result<Value, RuntimeError>;
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), RuntimeError>;
}

/// Owning handle to a native object
pub type NativeObjectRef = Rc<RefCell<dyn NativeObject>>;
/// Non-owning observer handle; access after the owner dropped the object
/// fails with `ObjectDoesNotExist`
pub type WeakNativeObjectRef = Weak<RefCell<dyn NativeObject>>;

/// One stack cell.
#[derive(Clone, Default)]
pub enum Value {
    /// Distinguishable absence: default return value, missing parameters,
    /// freshly reserved locals. Coerces to "" but is not a number.
    #[default]
    Unset,
    /// An explicitly empty string
    Empty,
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    /// Stack index of another value; resolved transitively
    Reference(usize),
    /// Saved program counter (frame bookkeeping)
    InstructionIndex(isize),
    /// Saved base pointer (frame bookkeeping)
    StackIndex(isize),
    /// Caller-supplied argument count (frame bookkeeping)
    ParameterCount(usize),
    NativeObject(NativeObjectRef),
    WeakNativeObject(WeakNativeObjectRef),
}

impl Value {
    /// Build a string value; the empty string becomes `Empty`.
    pub fn string(text: impl Into<String>) -> Value {
        let text = text.into();
        if text.is_empty() {
            Value::Empty
        } else {
            Value::String(text)
        }
    }

    pub fn native(object: NativeObjectRef) -> Value {
        Value::NativeObject(object)
    }

    pub fn weak_native(object: NativeObjectRef) -> Value {
        Value::WeakNativeObject(Rc::downgrade(&object))
    }

    /// If this is a reference, walk the chain and return the index of the
    /// ultimate non-reference target. None for non-references, dangling
    /// indices, and walks that exceed the depth cap.
    pub fn reference_index(&self, stack: &[Value]) -> Option<usize> {
        let mut index = match self {
            Value::Reference(index) => *index,
            _ => return None,
        };
        for _ in 0..MAX_REFERENCE_DEPTH {
            match stack.get(index)? {
                Value::Reference(next) => index = *next,
                _ => return Some(index),
            }
        }
        None
    }

    /// Follow references to the underlying cell
    fn resolve<'a>(&'a self, stack: &'a [Value]) -> Result<&'a Value, RuntimeError> {
        match self {
            Value::Reference(_) => {
                let index = self
                    .reference_index(stack)
                    .ok_or(RuntimeError::StackIndexOutOfRange)?;
                stack.get(index).ok_or(RuntimeError::StackIndexOutOfRange)
            }
            other => Ok(other),
        }
    }

    /// A concrete copy of the value, with any reference chain followed
    pub fn resolved(&self, stack: &[Value]) -> Result<Value, RuntimeError> {
        Ok(self.resolve(stack)?.clone())
    }

    // ==================== Coercions ====================

    pub fn as_string(&self, stack: &[Value]) -> Result<String, RuntimeError> {
        match self.resolve(stack)? {
            Value::Unset | Value::Empty => Ok(String::new()),
            Value::String(text) => Ok(text.clone()),
            Value::Integer(value) => Ok(value.to_string()),
            Value::Double(value) => Ok(format_double(*value)),
            Value::Boolean(true) => Ok("true".to_string()),
            Value::Boolean(false) => Ok("false".to_string()),
            Value::Reference(_) => Err(RuntimeError::StackIndexOutOfRange),
            Value::InstructionIndex(_) => Err(RuntimeError::InstructionIndexAccessed),
            Value::StackIndex(_) => Err(RuntimeError::StackIndexAccessed),
            Value::ParameterCount(_) => Err(RuntimeError::ParameterCountAccessed),
            Value::NativeObject(_) | Value::WeakNativeObject(_) => {
                Err(RuntimeError::NativeObjectAccessed)
            }
        }
    }

    /// Integer coercion. Malformed strings read as 0; doubles convert only
    /// when they are exactly integral.
    pub fn as_integer(&self, stack: &[Value]) -> Result<i64, RuntimeError> {
        match self.resolve(stack)? {
            Value::Unset | Value::Empty => Err(RuntimeError::ExpectedIntegerHere),
            Value::String(text) => Ok(text.trim().parse::<i64>().unwrap_or(0)),
            Value::Integer(value) => Ok(*value),
            Value::Double(value) => {
                if value.fract() == 0.0
                    && *value >= i64::MIN as f64
                    && *value <= i64::MAX as f64
                {
                    Ok(*value as i64)
                } else {
                    Err(RuntimeError::ExpectedIntegerHere)
                }
            }
            Value::Boolean(_) => Err(RuntimeError::ExpectedIntegerHere),
            Value::Reference(_) => Err(RuntimeError::StackIndexOutOfRange),
            Value::InstructionIndex(_) => Err(RuntimeError::InstructionIndexAccessed),
            Value::StackIndex(_) => Err(RuntimeError::StackIndexAccessed),
            Value::ParameterCount(_) => Err(RuntimeError::ParameterCountAccessed),
            Value::NativeObject(_) | Value::WeakNativeObject(_) => {
                Err(RuntimeError::NativeObjectAccessed)
            }
        }
    }

    /// Number coercion. The empty string reads as 0.0, malformed strings
    /// as 0.0; Unset is not a number.
    pub fn as_double(&self, stack: &[Value]) -> Result<f64, RuntimeError> {
        match self.resolve(stack)? {
            Value::Unset => Err(RuntimeError::ExpectedNumberHere),
            Value::Empty => Ok(0.0),
            Value::String(text) => Ok(text.trim().parse::<f64>().unwrap_or(0.0)),
            Value::Integer(value) => Ok(*value as f64),
            Value::Double(value) => Ok(*value),
            Value::Boolean(_) => Err(RuntimeError::ExpectedNumberHere),
            Value::Reference(_) => Err(RuntimeError::StackIndexOutOfRange),
            Value::InstructionIndex(_) => Err(RuntimeError::InstructionIndexAccessed),
            Value::StackIndex(_) => Err(RuntimeError::StackIndexAccessed),
            Value::ParameterCount(_) => Err(RuntimeError::ParameterCountAccessed),
            Value::NativeObject(_) | Value::WeakNativeObject(_) => {
                Err(RuntimeError::NativeObjectAccessed)
            }
        }
    }

    /// Boolean coercion: only booleans and the strings "true"/"false"
    /// (case-insensitive) succeed.
    pub fn as_boolean(&self, stack: &[Value]) -> Result<bool, RuntimeError> {
        match self.resolve(stack)? {
            Value::Boolean(value) => Ok(*value),
            Value::String(text) => {
                if text.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(RuntimeError::ExpectedBooleanHere)
                }
            }
            Value::InstructionIndex(_) => Err(RuntimeError::InstructionIndexAccessed),
            Value::StackIndex(_) => Err(RuntimeError::StackIndexAccessed),
            Value::ParameterCount(_) => Err(RuntimeError::ParameterCountAccessed),
            Value::NativeObject(_) | Value::WeakNativeObject(_) => {
                Err(RuntimeError::NativeObjectAccessed)
            }
            _ => Err(RuntimeError::ExpectedBooleanHere),
        }
    }

    // ==================== Bookkeeping accessors ====================
    //
    // Used by the runtime when tearing down frames; a mismatch means the
    // stack layout is corrupt.

    pub fn as_instruction_index(&self) -> Result<isize, RuntimeError> {
        match self {
            Value::InstructionIndex(value) => Ok(*value),
            _ => Err(RuntimeError::StackIndexOutOfRange),
        }
    }

    pub fn as_stack_index(&self) -> Result<isize, RuntimeError> {
        match self {
            Value::StackIndex(value) => Ok(*value),
            _ => Err(RuntimeError::StackIndexOutOfRange),
        }
    }

    pub fn as_parameter_count(&self) -> Result<usize, RuntimeError> {
        match self {
            Value::ParameterCount(value) => Ok(*value),
            _ => Err(RuntimeError::StackIndexOutOfRange),
        }
    }

    // ==================== Properties ====================

    /// Read a property. Native objects answer their own properties (plus
    /// the built-in read-only `id`); every other value has only `length`.
    pub fn property_value(&self, name: &str, stack: &[Value]) -> Result<Value, RuntimeError> {
        match self {
            Value::Reference(_) => self.resolve(stack)?.property_value(name, stack),
            Value::NativeObject(object) => native_property(object, name),
            Value::WeakNativeObject(weak) => {
                let object = weak.upgrade().ok_or(RuntimeError::ObjectDoesNotExist)?;
                native_property(&object, name)
            }
            _ => {
                if name.eq_ignore_ascii_case("length") {
                    Ok(Value::Integer(self.as_string(stack)?.chars().count() as i64))
                } else {
                    Err(RuntimeError::UnknownProperty {
                        name: name.to_string(),
                    })
                }
            }
        }
    }

    /// Write a property. Only native objects have writable properties;
    /// `length` and `id` are read-only.
    pub fn set_property(
        &self,
        name: &str,
        value: Value,
        stack: &[Value],
    ) -> Result<(), RuntimeError> {
        match self {
            Value::Reference(_) => self.resolve(stack)?.set_property(name, value, stack),
            Value::NativeObject(object) => native_set_property(object, name, value),
            Value::WeakNativeObject(weak) => {
                let object = weak.upgrade().ok_or(RuntimeError::ObjectDoesNotExist)?;
                native_set_property(&object, name, value)
            }
            _ => {
                if name.eq_ignore_ascii_case("length") {
                    Err(RuntimeError::ReadOnlyProperty {
                        name: name.to_string(),
                    })
                } else {
                    Err(RuntimeError::UnknownProperty {
                        name: name.to_string(),
                    })
                }
            }
        }
    }
}

fn native_property(object: &NativeObjectRef, name: &str) -> Result<Value, RuntimeError> {
    if name.eq_ignore_ascii_case("id") {
        Ok(Value::Integer(object.borrow().id()))
    } else {
        object.borrow().get_property(name)
    }
}

fn native_set_property(
    object: &NativeObjectRef,
    name: &str,
    value: Value,
) -> Result<(), RuntimeError> {
    if name.eq_ignore_ascii_case("id") {
        Err(RuntimeError::ReadOnlyProperty {
            name: name.to_string(),
        })
    } else {
        object.borrow_mut().set_property(name, value)
    }
}

/// Doubles that are exactly integral print in integer form.
fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::string(value)
    }
}

impl PartialEq for Value {
    /// Structural equality, case-sensitive on string content; native
    /// objects compare by id.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unset, Value::Unset) => true,
            (Value::Empty, Value::Empty) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            (Value::InstructionIndex(a), Value::InstructionIndex(b)) => a == b,
            (Value::StackIndex(a), Value::StackIndex(b)) => a == b,
            (Value::ParameterCount(a), Value::ParameterCount(b)) => a == b,
            (Value::NativeObject(a), Value::NativeObject(b)) => {
                a.borrow().id() == b.borrow().id()
            }
            (Value::NativeObject(a), Value::WeakNativeObject(b))
            | (Value::WeakNativeObject(b), Value::NativeObject(a)) => b
                .upgrade()
                .is_some_and(|b| a.borrow().id() == b.borrow().id()),
            (Value::WeakNativeObject(a), Value::WeakNativeObject(b)) => {
                match (a.upgrade(), b.upgrade()) {
                    (Some(a), Some(b)) => a.borrow().id() == b.borrow().id(),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => write!(f, "Unset"),
            Value::Empty => write!(f, "Empty"),
            Value::String(text) => write!(f, "String({:?})", text),
            Value::Integer(value) => write!(f, "Integer({})", value),
            Value::Double(value) => write!(f, "Double({})", value),
            Value::Boolean(value) => write!(f, "Boolean({})", value),
            Value::Reference(index) => write!(f, "Reference({})", index),
            Value::InstructionIndex(value) => write!(f, "InstructionIndex({})", value),
            Value::StackIndex(value) => write!(f, "StackIndex({})", value),
            Value::ParameterCount(value) => write!(f, "ParameterCount({})", value),
            Value::NativeObject(object) => {
                write!(f, "NativeObject(id={})", object.borrow().id())
            }
            Value::WeakNativeObject(weak) => match weak.upgrade() {
                Some(object) => write!(f, "WeakNativeObject(id={})", object.borrow().id()),
                None => write!(f, "WeakNativeObject(dead)"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_STACK: &[Value] = &[];

    #[test]
    fn test_empty_string_constructor() {
        assert_eq!(Value::string(""), Value::Empty);
        assert_eq!(Value::string("x"), Value::String("x".to_string()));
    }

    #[test]
    fn test_as_string() {
        assert_eq!(Value::Unset.as_string(NO_STACK).unwrap(), "");
        assert_eq!(Value::Empty.as_string(NO_STACK).unwrap(), "");
        assert_eq!(Value::Integer(-7).as_string(NO_STACK).unwrap(), "-7");
        assert_eq!(Value::Double(5.0).as_string(NO_STACK).unwrap(), "5");
        assert_eq!(Value::Double(2.5).as_string(NO_STACK).unwrap(), "2.5");
        assert_eq!(Value::Boolean(true).as_string(NO_STACK).unwrap(), "true");
    }

    #[test]
    fn test_as_integer() {
        assert_eq!(Value::string("42").as_integer(NO_STACK).unwrap(), 42);
        assert_eq!(Value::string("nope").as_integer(NO_STACK).unwrap(), 0);
        assert_eq!(Value::Double(3.0).as_integer(NO_STACK).unwrap(), 3);
        assert_eq!(
            Value::Double(3.5).as_integer(NO_STACK),
            Err(RuntimeError::ExpectedIntegerHere)
        );
        assert_eq!(
            Value::Unset.as_integer(NO_STACK),
            Err(RuntimeError::ExpectedIntegerHere)
        );
        assert_eq!(
            Value::Boolean(true).as_integer(NO_STACK),
            Err(RuntimeError::ExpectedIntegerHere)
        );
    }

    #[test]
    fn test_as_double() {
        assert_eq!(Value::Empty.as_double(NO_STACK).unwrap(), 0.0);
        assert_eq!(Value::string("2.5").as_double(NO_STACK).unwrap(), 2.5);
        assert_eq!(Value::string("junk").as_double(NO_STACK).unwrap(), 0.0);
        assert_eq!(
            Value::Unset.as_double(NO_STACK),
            Err(RuntimeError::ExpectedNumberHere)
        );
    }

    #[test]
    fn test_as_boolean() {
        assert!(Value::Boolean(true).as_boolean(NO_STACK).unwrap());
        assert!(Value::string("TRUE").as_boolean(NO_STACK).unwrap());
        assert!(!Value::string("false").as_boolean(NO_STACK).unwrap());
        assert_eq!(
            Value::Integer(1).as_boolean(NO_STACK),
            Err(RuntimeError::ExpectedBooleanHere)
        );
    }

    #[test]
    fn test_bookkeeping_cells_refuse_coercion() {
        assert_eq!(
            Value::InstructionIndex(3).as_string(NO_STACK),
            Err(RuntimeError::InstructionIndexAccessed)
        );
        assert_eq!(
            Value::StackIndex(2).as_integer(NO_STACK),
            Err(RuntimeError::StackIndexAccessed)
        );
        assert_eq!(
            Value::ParameterCount(1).as_boolean(NO_STACK),
            Err(RuntimeError::ParameterCountAccessed)
        );
    }

    #[test]
    fn test_reference_chain_resolution() {
        let stack = vec![
            Value::Integer(99),
            Value::Reference(0),
            Value::Reference(1),
        ];
        assert_eq!(Value::Reference(2).reference_index(&stack), Some(0));
        assert_eq!(Value::Reference(2).as_integer(&stack).unwrap(), 99);
        assert_eq!(Value::Reference(7).reference_index(&stack), None);
    }

    #[test]
    fn test_reference_cycle_is_capped() {
        let stack = vec![Value::Reference(1), Value::Reference(0)];
        assert_eq!(Value::Reference(0).reference_index(&stack), None);
    }

    #[test]
    fn test_length_property() {
        let value = Value::string("Four");
        assert_eq!(
            value.property_value("length", NO_STACK).unwrap(),
            Value::Integer(4)
        );
        assert_eq!(
            value.property_value("width", NO_STACK),
            Err(RuntimeError::UnknownProperty {
                name: "width".to_string()
            })
        );
        assert_eq!(
            value.set_property("length", Value::Integer(1), NO_STACK),
            Err(RuntimeError::ReadOnlyProperty {
                name: "length".to_string()
            })
        );
    }

    #[derive(Debug)]
    struct Widget {
        id: i64,
        title: String,
    }

    impl NativeObject for Widget {
        fn id(&self) -> i64 {
            self.id
        }

        fn get_property(&self, name: &str) -> Result<Value, RuntimeError> {
            if name.eq_ignore_ascii_case("title") {
                Ok(Value::string(self.title.clone()))
            } else {
                Err(RuntimeError::UnknownProperty {
                    name: name.to_string(),
                })
            }
        }

        fn set_property(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
            if name.eq_ignore_ascii_case("title") {
                self.title = value.as_string(&[])?;
                Ok(())
            } else {
                Err(RuntimeError::UnknownProperty {
                    name: name.to_string(),
                })
            }
        }
    }

    fn widget(id: i64, title: &str) -> Rc<RefCell<Widget>> {
        Rc::new(RefCell::new(Widget {
            id,
            title: title.to_string(),
        }))
    }

    #[test]
    fn test_native_object_properties() {
        let object = widget(12, "OK");
        let value = Value::native(object.clone());

        assert_eq!(
            value.property_value("title", NO_STACK).unwrap(),
            Value::string("OK")
        );
        assert_eq!(
            value.property_value("id", NO_STACK).unwrap(),
            Value::Integer(12)
        );
        assert_eq!(
            value.set_property("id", Value::Integer(1), NO_STACK),
            Err(RuntimeError::ReadOnlyProperty {
                name: "id".to_string()
            })
        );

        value
            .set_property("title", Value::string("Cancel"), NO_STACK)
            .unwrap();
        assert_eq!(object.borrow().title, "Cancel");
    }

    #[test]
    fn test_dead_weak_reference_fails() {
        let object = widget(3, "gone");
        let value = Value::weak_native(object.clone());
        drop(object);

        assert_eq!(
            value.property_value("title", NO_STACK),
            Err(RuntimeError::ObjectDoesNotExist)
        );
    }

    #[test]
    fn test_native_equality_is_by_id() {
        let a = widget(5, "a");
        let b = widget(5, "b");
        let c = widget(6, "c");

        assert_eq!(Value::native(a.clone()), Value::native(b));
        assert_ne!(Value::native(a.clone()), Value::native(c));
        assert_eq!(Value::weak_native(a.clone()), Value::native(a.clone()));
    }
}
