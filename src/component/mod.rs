//! Components: custom tags replaced by rendered markup
//!
//! A component is a tag name plus a render function `(attrs, inner) ->
//! markup`. Each instance of the tag is rendered once when it appears in the
//! document and replaced in place by the result. Later updates reach the
//! rendered markup only through binding records.

pub mod mount;
mod registry;

pub use mount::{attribute, attributes, serialize_attributes, MAX_MOUNTS_PER_PASS};
pub use registry::{
    is_valid_tag, Component, ComponentDescriptor, ComponentError, ComponentInfo,
    ComponentRegistry, Registration, RenderError, RenderFn, TagSource,
};
