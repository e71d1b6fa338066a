//! Deterministic hash-based identity for exposed types and native functions.
//!
//! [`TypeHash`] is a 64-bit hash computed from a name. The same name always
//! produces the same hash, so registries can key on it without assigning
//! sequential ids at registration time.
//!
//! # Examples
//!
//! ```
//! use lunabridge_core::TypeHash;
//!
//! let a = TypeHash::from_name("Channel");
//! let b = TypeHash::from_name("Channel");
//! assert_eq!(a, b);
//!
//! let f = TypeHash::from_function("thread", "newChannel");
//! assert_ne!(f, TypeHash::from_name("newChannel"));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Types and functions sharing a name still produce distinct hashes.
pub mod hash_constants {
    /// Separator constant for path components (namespace / function name).
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for native function hashes.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;
}

/// A deterministic 64-bit hash identifying a type or a native function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a function hash from the namespace it is installed in and its name.
    ///
    /// Methods use the owning type's name as namespace.
    #[inline]
    pub fn from_function(namespace: &str, name: &str) -> Self {
        let ns = xxh64(namespace.as_bytes(), 0);
        let hash = (hash_constants::FUNCTION ^ ns)
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(xxh64(name.as_bytes(), 0));
        TypeHash(hash)
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_deterministic() {
        assert_eq!(TypeHash::from_name("ByteData"), TypeHash::from_name("ByteData"));
        assert_ne!(TypeHash::from_name("ByteData"), TypeHash::from_name("DataView"));
    }

    #[test]
    fn function_hash_depends_on_namespace() {
        let a = TypeHash::from_function("thread", "new");
        let b = TypeHash::from_function("data", "new");
        assert_ne!(a, b);
    }

    #[test]
    fn function_and_type_domains_differ() {
        assert_ne!(TypeHash::from_name("push"), TypeHash::from_function("", "push"));
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::from_name("Object").is_empty());
    }

    #[test]
    fn display_is_hex() {
        let s = format!("{}", TypeHash(0xff));
        assert_eq!(s, "0x00000000000000ff");
    }
}
