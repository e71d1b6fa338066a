//! Script values detached from any script state.
//!
//! A [`Variant`] carries a script value between states and threads: event
//! payloads, channel messages, thread arguments. Objects inside a variant are
//! retained, so a variant keeps its objects alive until it is dropped.
//!
//! Tables are shared on clone and are stored as key/value pairs in the order
//! they were read.

use std::fmt;
use std::sync::Arc;

use crate::{Object, StrongRef};

/// A tagged script value.
#[derive(Clone)]
pub enum Variant {
    Nil,
    Boolean(bool),
    Number(f64),
    /// Raw bytes; script strings need not be UTF-8.
    String(Vec<u8>),
    /// Opaque pointer-sized value, passed through untouched.
    LightUserData(usize),
    Object(StrongRef<dyn Object>),
    Table(Arc<Vec<(Variant, Variant)>>),
}

impl Variant {
    /// Script-facing name of this variant's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Nil => "nil",
            Variant::Boolean(_) => "boolean",
            Variant::Number(_) => "number",
            Variant::String(_) => "string",
            Variant::LightUserData(_) => "lightuserdata",
            Variant::Object(_) => "userdata",
            Variant::Table(_) => "table",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Variant::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Variant::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string's text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()?).ok()
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&StrongRef<dyn Object>> {
        match self {
            Variant::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&[(Variant, Variant)]> {
        match self {
            Variant::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Build a table variant from a sequence, keyed `1..=n`.
    pub fn sequence(values: impl IntoIterator<Item = Variant>) -> Self {
        let pairs = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Variant::Number((i + 1) as f64), v))
            .collect();
        Variant::Table(Arc::new(pairs))
    }

    /// Look a key up in a table variant.
    pub fn get(&self, key: &Variant) -> Option<&Variant> {
        self.as_table()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variant::Nil, Variant::Nil) => true,
            (Variant::Boolean(a), Variant::Boolean(b)) => a == b,
            (Variant::Number(a), Variant::Number(b)) => a == b,
            (Variant::String(a), Variant::String(b)) => a == b,
            (Variant::LightUserData(a), Variant::LightUserData(b)) => a == b,
            (Variant::Object(a), Variant::Object(b)) => a.ptr_eq(b),
            (Variant::Table(a), Variant::Table(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.len() == b.len() && a.iter().all(|(k, v)| other.get(k) == Some(v)))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Nil => write!(f, "Nil"),
            Variant::Boolean(b) => write!(f, "Boolean({})", b),
            Variant::Number(n) => write!(f, "Number({})", n),
            Variant::String(s) => write!(f, "String({:?})", String::from_utf8_lossy(s)),
            Variant::LightUserData(p) => write!(f, "LightUserData({:#x})", p),
            Variant::Object(o) => write!(f, "Object({}: {})", o.type_info().name(), o.identity()),
            Variant::Table(t) => f.debug_map().entries(t.iter().map(|(k, v)| (k, v))).finish(),
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Boolean(value)
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Variant::Number(value)
    }
}

impl From<i32> for Variant {
    fn from(value: i32) -> Self {
        Variant::Number(value as f64)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.as_bytes().to_vec())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(value.into_bytes())
    }
}

impl From<&[u8]> for Variant {
    fn from(value: &[u8]) -> Self {
        Variant::String(value.to_vec())
    }
}

impl From<Vec<u8>> for Variant {
    fn from(value: Vec<u8>) -> Self {
        Variant::String(value)
    }
}

impl From<StrongRef<dyn Object>> for Variant {
    fn from(value: StrongRef<dyn Object>) -> Self {
        Variant::Object(value)
    }
}
