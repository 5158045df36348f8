//! Symbolic type and method descriptors for the Javelin type engine.
//!
//! Descriptors use the JVM internal form throughout: `I` for `int`,
//! `Ljava/lang/String;` for a class reference, `[D` for `double[]`, and
//! `(params)ret` for method signatures. This crate is the leaf of the
//! workspace; it knows nothing about loaded types and operates purely on
//! descriptor strings.

#![forbid(unsafe_code)]

mod basic;
mod error;
mod field;
mod kind;
mod package;

pub use crate::basic::erase_to_basic;
pub use crate::error::{DescriptorError, Result};
pub use crate::field::{
    parse_field_descriptor, parse_method_descriptor, FieldType, MethodDescriptor, ReturnType,
};
pub use crate::kind::ValueKind;
pub use crate::package::runtime_package;

/// Descriptor of the array type with `dims` extra dimensions over `component`.
///
/// There is no array of `void`; asking for one is an error rather than a
/// panic because the request can legitimately arrive from guest code.
pub fn array_descriptor(component: &str, dims: usize) -> Result<String> {
    if component == "V" {
        return Err(DescriptorError::NoArrayOfVoid);
    }
    let mut out = String::with_capacity(component.len() + dims);
    for _ in 0..dims {
        out.push('[');
    }
    out.push_str(component);
    Ok(out)
}

/// Strips one array dimension, yielding the component descriptor.
pub fn component_descriptor(descriptor: &str) -> Option<&str> {
    descriptor.strip_prefix('[')
}
