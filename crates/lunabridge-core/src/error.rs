//! Error types shared by every layer of the bridge.
//!
//! ## Error Hierarchy
//!
//! ```text
//! RegistrationError  - startup configuration errors (duplicate types, cycles, missing modules)
//! ConversionError    - a script value could not become the requested native value
//! NativeError        - anything a native function can fail with; converted to a
//!                      script-level error at the bridge boundary
//! ```
//!
//! `NativeError` messages are what scripts see, so their `Display` output is
//! worded for script authors.

use thiserror::Error;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while registering types and modules.
///
/// These indicate a misconfigured build and are not meant to be recovered
/// from by scripts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Another descriptor already uses this name.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// Walking the parent chain of this type never reaches a root.
    #[error("type '{0}' has a cyclic parent chain")]
    CyclicAncestry(String),

    /// The object registered as a module does not derive from `Module`.
    #[error("type '{0}' is not a module type")]
    NotAModule(String),

    /// A module another module depends on has not been registered.
    #[error("required module '{0}' is not registered")]
    MissingModule(String),
}

// ============================================================================
// Conversion Errors
// ============================================================================

/// Errors converting between script values and native values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The value has the wrong type.
    #[error("{expected} expected, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A number is not representable in the target type.
    #[error("number {value} cannot be represented as {target_type}")]
    NumberRange { value: f64, target_type: &'static str },

    /// String data is not valid UTF-8.
    #[error("invalid UTF-8 string data")]
    InvalidUtf8,

    /// A table contains itself, directly or through nested tables.
    #[error("cannot convert recursive table")]
    RecursiveTable,

    /// The value's type has no variant representation.
    #[error("cannot convert value of type '{type_name}'")]
    Unsupported { type_name: String },

    /// Userdata was found where only plain values are allowed.
    #[error("userdata is not allowed here")]
    UserdataNotAllowed,
}

// ============================================================================
// Native Errors
// ============================================================================

/// Errors produced by native functions called from scripts.
#[derive(Debug, Error)]
pub enum NativeError {
    /// Bad argument at a script-visible position (1-based).
    #[error("bad argument #{index} to '{function}' ({source})")]
    Argument {
        index: usize,
        function: String,
        #[source]
        source: ConversionError,
    },

    /// Wrong number of arguments.
    #[error("{message}")]
    ArgumentCount { message: String },

    /// An enum name is not one of the valid options.
    #[error("Invalid {enum_name} '{value}', expected one of: {}", quote_list(.options))]
    InvalidEnum {
        enum_name: &'static str,
        value: String,
        options: Vec<&'static str>,
    },

    /// A proxy's native object was already released.
    #[error("Cannot use object after it has been released.")]
    Released,

    /// Module lookup failed.
    #[error("Tried to get nonexistent module {0}.")]
    MissingModule(String),

    /// Module lookup found an object of the wrong type.
    #[error("Incorrect module {0}")]
    IncorrectModule(String),

    /// A conversion failed outside argument extraction.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Registration failed while a script was opening a module.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// An I/O operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Native code panicked.
    #[error("native function panicked: {message}")]
    Panic { message: String },

    /// Runtime failure reported by a subsystem; shown verbatim.
    #[error("{0}")]
    Runtime(String),

    /// An error raised by the script engine itself while native code ran.
    #[error("{0}")]
    Script(String),
}

impl NativeError {
    /// Create a runtime error with the given message.
    pub fn runtime(message: impl Into<String>) -> Self {
        NativeError::Runtime(message.into())
    }

    /// Create an argument type error.
    pub fn type_error(
        index: usize,
        function: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        NativeError::Argument {
            index,
            function: function.into(),
            source: ConversionError::TypeMismatch {
                expected: expected.into(),
                actual: actual.into(),
            },
        }
    }
}

fn quote_list(options: &[&str]) -> String {
    options
        .iter()
        .map(|o| format!("'{o}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for native functions.
pub type NativeResult<T> = Result<T, NativeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_duplicate_type() {
        let err = RegistrationError::DuplicateType("Image".into());
        assert_eq!(err.to_string(), "duplicate type: Image");
    }

    #[test]
    fn conversion_type_mismatch() {
        let err = ConversionError::TypeMismatch {
            expected: "Channel".into(),
            actual: "number".into(),
        };
        assert_eq!(err.to_string(), "Channel expected, got number");
    }

    #[test]
    fn argument_error_names_function_and_index() {
        let err = NativeError::type_error(2, "push", "Channel", "nil");
        assert_eq!(
            err.to_string(),
            "bad argument #2 to 'push' (Channel expected, got nil)"
        );
    }

    #[test]
    fn enum_error_lists_options() {
        let err = NativeError::InvalidEnum {
            enum_name: "encode format",
            value: "rot13".into(),
            options: vec!["base64", "hex"],
        };
        assert_eq!(
            err.to_string(),
            "Invalid encode format 'rot13', expected one of: 'base64', 'hex'"
        );
    }

    #[test]
    fn runtime_error_is_verbatim() {
        assert_eq!(NativeError::runtime("disk full").to_string(), "disk full");
    }

    #[test]
    fn released_message() {
        assert!(NativeError::Released.to_string().contains("released"));
    }

    #[test]
    fn conversion_converts_into_native() {
        let err: NativeError = ConversionError::RecursiveTable.into();
        assert!(matches!(err, NativeError::Conversion(_)));
        assert_eq!(err.to_string(), "cannot convert recursive table");
    }

    #[test]
    fn io_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: NativeError = io.into();
        assert_eq!(err.to_string(), "disk full");
    }
}
