//! Types and lazy type resolution of expressions.

mod deferred;
mod resolution;
mod types;

pub(crate) use deferred::TypeSlot;
pub use deferred::{TypeBinding, TypeError, TypeErrorKind, TypeResult};
pub use types::{name_to_type, Aggregate, Field, Record, StackKind, Type, DEFAULT_STRING_SIZE};
