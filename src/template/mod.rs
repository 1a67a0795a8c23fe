//! Placeholder templates and reactive bindings
//!
//! Templates are markup strings containing `{key}` placeholders resolved
//! against the primary store and `{namespace.key}` placeholders resolved
//! against a named context.
//!
//! # Example
//!
//! ```text
//! <p>Hello {name}, you have {cart.count} items</p>
//! ```

pub mod binder;
pub mod placeholder;
mod resolver;

pub use binder::{
    bind_subtree, bound_elements, refresh, resolve_top_level, BindFailure, BindingRecord,
    Refresh, BINDING_ATTR, SLOT_TAG, TEMPLATE_ATTR,
};
pub use placeholder::{dependencies, Placeholder};
pub use resolver::{resolve, resolve_escaped, Lookup, StateScope};
