//! Runtime type representation and resolution for the Javelin guest VM.
//!
//! This crate models loaded classes, interfaces, arrays, and primitives as
//! one closed type-hierarchy abstraction and answers the hot-path questions
//! a running VM asks of it: assignability, nearest common ancestor, symbolic
//! field/method resolution, and polymorphic-signature (method-handle)
//! intrinsic resolution. Derived structure — hierarchy depth, supertype
//! chains, interface closures, array types, reflective mirrors — is computed
//! on first demand and cached for the lifetime of the owning [`Context`].
//!
//! Class-file parsing, bytecode execution, and heap management live in
//! collaborating subsystems: types are defined from already-resolved parts
//! via [`Context::define_class`], dispatch tables are published by the
//! linker, and allocation goes through the [`Allocator`] seam.

#![forbid(unsafe_code)]

mod context;
mod error;
mod init;
mod intrinsics;
mod lookup;
mod member;
mod object;
mod ty;

pub use javelin_descriptor::ValueKind;

pub use crate::context::{ClassSpec, Context, LoaderId};
pub use crate::error::{GuestError, InitFailure, LinkageKind};
pub use crate::init::{ClassInitializer, InitState};
pub use crate::intrinsics::{
    IntrinsicKind, InvocationNode, InvocationNodeRef, SignatureCanonicalizer,
};
pub use crate::lookup::LookupStats;
pub use crate::member::{access_flags, Field, FieldRef, FieldSpec, Method, MethodRef, MethodSpec};
pub use crate::object::{Allocator, BumpAllocator, Instance};
pub use crate::ty::{Type, TypeRef};
