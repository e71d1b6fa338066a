//! Core types of the lunabridge scripting bridge.
//!
//! This crate has no script engine dependency. It defines what every engine
//! subsystem needs in order to expose native objects to scripts:
//!
//! - [`Type`] - static type descriptors with single inheritance
//! - [`Object`], [`StrongRef`], [`WeakRef`] - atomically reference-counted native objects
//! - [`Module`] - subsystem singletons
//! - [`Variant`] - script values that can cross states and threads
//! - [`NativeError`], [`ConversionError`], [`RegistrationError`] - the error taxonomy

mod error;
mod module;
mod object;
mod type_hash;
mod type_info;
mod variant;

pub use error::{ConversionError, NativeError, NativeResult, RegistrationError};
pub use module::{Module, ModuleKind};
pub use object::{AsAny, Object, ObjectId, StaticType, StrongRef, WeakRef};
pub use type_hash::{TypeHash, hash_constants};
pub use type_info::{Ancestors, MODULE_TYPE, OBJECT_TYPE, Type};
pub use variant::Variant;
