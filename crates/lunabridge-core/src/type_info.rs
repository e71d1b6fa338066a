//! Static type descriptors with single inheritance.
//!
//! Every native object kind exposed to scripts has exactly one [`Type`],
//! declared as a `static` so its address is its identity:
//!
//! ```
//! use lunabridge_core::{Type, OBJECT_TYPE};
//!
//! static DATA: Type = Type::new("Data", Some(&OBJECT_TYPE));
//! static BYTE_DATA: Type = Type::new("ByteData", Some(&DATA));
//!
//! assert!(BYTE_DATA.is_a(&DATA));
//! assert!(BYTE_DATA.is_a(&OBJECT_TYPE));
//! assert!(!DATA.is_a(&BYTE_DATA));
//! ```
//!
//! Descriptors are immutable after construction, so ancestry queries need no
//! synchronisation. A parent chain is validated to be acyclic when the type is
//! registered with the process-wide type registry.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;

use crate::TypeHash;

/// Root of every type exposed through the bridge.
pub static OBJECT_TYPE: Type = Type::new("Object", None);

/// Base type of every module singleton.
pub static MODULE_TYPE: Type = Type::new("Module", Some(&OBJECT_TYPE));

/// Identity and parent link of a native object kind.
pub struct Type {
    name: &'static str,
    parent: Option<&'static Type>,
}

impl Type {
    /// Create a descriptor. Intended for `static` items only.
    pub const fn new(name: &'static str, parent: Option<&'static Type>) -> Self {
        Self { name, parent }
    }

    /// The unique name of this type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The direct parent, or `None` for a root type.
    pub fn parent(&self) -> Option<&'static Type> {
        self.parent
    }

    /// Name-derived hash, used as registry key.
    pub fn hash(&self) -> TypeHash {
        TypeHash::from_name(self.name)
    }

    /// True if `other` is this type or one of its ancestors.
    ///
    /// The chain must be acyclic; registration rejects types for which it is not.
    pub fn is_a(&self, other: &Type) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ptr::eq(ty, other) {
                return true;
            }
            current = ty.parent;
        }
        false
    }

    /// Iterate this type followed by each ancestor up to the root.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Number of links between this type and its root.
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::hash(self, state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("name", &self.name)
            .field("parent", &self.parent.map(|p| p.name))
            .finish()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Iterator over a type's ancestry chain, see [`Type::ancestors`].
pub struct Ancestors<'a> {
    next: Option<&'a Type>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Type;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}
