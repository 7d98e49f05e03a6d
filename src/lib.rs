//! Tether: a thin ORM layer.
//!
//! Models are declared with [`model!`], their fields are coerced between storage and
//! application values by [`FieldKind`], and relations are resolved lazily through any
//! [`Executor`].
pub use tether_core::*;
