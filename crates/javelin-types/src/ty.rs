use std::fmt;
use std::ptr;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use tracing::debug;

use javelin_descriptor::ValueKind;

use crate::context::{Context, ContextInner, LoaderId};
use crate::error::GuestError;
use crate::init::{ClassInitializer, InitControl};
use crate::member::{access_flags, FieldRef, MethodRef};
use crate::object::Instance;

/// Shared handle to a loaded type. Identity is pointer identity and is
/// meaningful only within one execution context.
pub type TypeRef = Arc<Type>;

/// A loaded type: class, interface, array, or primitive.
///
/// The base identity (name, descriptor, superclass, direct interfaces,
/// declared members) is fixed at creation by the loading subsystem. Every
/// derived structure is computed on first demand and published exactly once
/// through its own cell; concurrent readers either wait for the in-flight
/// computation or observe the published value.
pub struct Type {
    name: String,
    descriptor: String,
    kind: ValueKind,
    access_flags: u16,
    loader: LoaderId,
    context: Weak<ContextInner>,
    superclass: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    variant: TypeVariant,

    array_class: OnceCell<TypeRef>,
    mirror: OnceCell<Instance>,
    depth: OnceCell<usize>,
    // Proper ancestors only, root first. `self` is appended on demand so the
    // cache never holds a handle to its own allocation.
    ancestors: OnceCell<Vec<TypeRef>>,
    transitive_interfaces: OnceCell<Vec<TypeRef>>,
    runtime_package: OnceCell<String>,
}

pub(crate) enum TypeVariant {
    Primitive,
    Object(ObjectData),
    Array(ArrayData),
}

pub(crate) struct ObjectData {
    pub(crate) fields: Vec<FieldRef>,
    pub(crate) methods: Vec<MethodRef>,
    pub(crate) field_table: Vec<FieldRef>,
    pub(crate) static_field_table: Vec<FieldRef>,
    pub(crate) vtable: OnceCell<Vec<MethodRef>>,
    pub(crate) statics: OnceCell<Instance>,
    pub(crate) init: InitControl,
    pub(crate) initializer: Option<Arc<dyn ClassInitializer>>,
}

pub(crate) struct ArrayData {
    pub(crate) component: TypeRef,
}

/// Creation-time identity of a type, supplied by the loading subsystem.
pub(crate) struct TypeHeader {
    pub(crate) name: String,
    pub(crate) descriptor: String,
    pub(crate) kind: ValueKind,
    pub(crate) access_flags: u16,
    pub(crate) loader: LoaderId,
    pub(crate) context: Weak<ContextInner>,
    pub(crate) superclass: Option<TypeRef>,
    pub(crate) interfaces: Vec<TypeRef>,
}

impl Type {
    pub(crate) fn from_parts(header: TypeHeader, variant: TypeVariant) -> Type {
        Type {
            name: header.name,
            descriptor: header.descriptor,
            kind: header.kind,
            access_flags: header.access_flags,
            loader: header.loader,
            context: header.context,
            superclass: header.superclass,
            interfaces: header.interfaces,
            variant,
            array_class: OnceCell::new(),
            mirror: OnceCell::new(),
            depth: OnceCell::new(),
            ancestors: OnceCell::new(),
            transitive_interfaces: OnceCell::new(),
            runtime_package: OnceCell::new(),
        }
    }

    /// Symbolic name: internal class name, primitive name, or array descriptor.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Symbolic type descriptor (`Lfoo/Bar;`, `I`, `[J`, ...).
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn value_kind(&self) -> ValueKind {
        self.kind
    }

    pub fn access_flags(&self) -> u16 {
        self.access_flags
    }

    pub fn loader(&self) -> LoaderId {
        self.loader
    }

    /// The owning execution context. Types never outlive their context.
    pub fn context(&self) -> Context {
        Context::from_inner(
            self.context
                .upgrade()
                .expect("execution context dropped while types are live"),
        )
    }

    pub fn same_context(&self, other: &Type) -> bool {
        Weak::ptr_eq(&self.context, &other.context)
    }

    /// Resolved superclass. `None` for the root object type and primitives.
    pub fn superclass(&self) -> Option<&TypeRef> {
        self.superclass.as_ref()
    }

    /// Direct super-interfaces as supplied at creation.
    pub fn interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }

    pub fn is_primitive(&self) -> bool {
        self.kind.is_primitive()
    }

    pub fn is_array(&self) -> bool {
        matches!(self.variant, TypeVariant::Array(_))
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & access_flags::ACC_INTERFACE != 0
    }

    pub fn is_final(&self) -> bool {
        self.access_flags & access_flags::ACC_FINAL != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & access_flags::ACC_ABSTRACT != 0
    }

    /// Component type of an array, `None` otherwise.
    pub fn component(&self) -> Option<&TypeRef> {
        match &self.variant {
            TypeVariant::Array(data) => Some(&data.component),
            _ => None,
        }
    }

    pub(crate) fn object_data(&self) -> Option<&ObjectData> {
        match &self.variant {
            TypeVariant::Object(data) => Some(data),
            _ => None,
        }
    }

    /// True exactly for the universal object root.
    pub fn is_java_lang_object(&self) -> bool {
        self.superclass.is_none() && !self.is_interface() && self.kind == ValueKind::Object
    }

    /// Innermost component of an array type; `self` for everything else.
    pub fn elemental_type(self: &Arc<Self>) -> TypeRef {
        let mut current = self.clone();
        loop {
            let next = match &current.variant {
                TypeVariant::Array(data) => data.component.clone(),
                _ => return current,
            };
            current = next;
        }
    }

    fn elemental(&self) -> &Type {
        let mut current = self;
        while let TypeVariant::Array(data) = &current.variant {
            current = &data.component;
        }
        current
    }

    /// Final-bit test appropriate for hierarchies: arrays are marked final,
    /// so the elemental type's flag is what actually matters.
    pub fn is_leaf(&self) -> bool {
        self.elemental().is_final()
    }

    /// A primary type participates in the superclass chain (i.e. is not an
    /// interface, looked at through any number of array dimensions).
    pub fn is_primary_type(&self) -> bool {
        debug_assert!(!self.is_primitive());
        !self.elemental().is_interface()
    }

    /// Supertype used for the hierarchy chain. Differs from the declared
    /// superclass for arrays, which are covariant in their component.
    pub fn supertype(&self) -> Option<TypeRef> {
        match &self.variant {
            TypeVariant::Primitive => None,
            TypeVariant::Array(data) => {
                let root = self.context().object_type().clone();
                if data.component.is_primitive() || data.component.is_java_lang_object() {
                    return Some(root);
                }
                let component_super = data
                    .component
                    .supertype()
                    .expect("non-primitive component has a supertype");
                Some(
                    component_super
                        .array_class()
                        .expect("supertypes are never void"),
                )
            }
            TypeVariant::Object(_) => {
                if self.is_interface() {
                    Some(self.context().object_type().clone())
                } else {
                    self.superclass.clone()
                }
            }
        }
    }

    /// Distance from the root object type; the root and primitives are 0.
    pub fn hierarchy_depth(&self) -> usize {
        *self.depth.get_or_init(|| match self.supertype() {
            None => 0,
            Some(sup) => sup.hierarchy_depth() + 1,
        })
    }

    fn ancestors(&self) -> &[TypeRef] {
        self.ancestors.get_or_init(|| match self.supertype() {
            None => Vec::new(),
            Some(sup) => {
                let mut chain = sup.ancestors().to_vec();
                chain.push(sup);
                debug!(ty = %self.name, depth = chain.len(), "built supertype chain");
                chain
            }
        })
    }

    /// Depth-ordered supertype chain: index 0 is the root object type, index
    /// `hierarchy_depth(self)` is `self`.
    pub fn supertype_index(self: &Arc<Self>) -> Vec<TypeRef> {
        let mut chain = self.ancestors().to_vec();
        chain.push(self.clone());
        chain
    }

    fn supertype_at(&self, depth: usize) -> &Type {
        if depth == self.hierarchy_depth() {
            self
        } else {
            &self.ancestors()[depth]
        }
    }

    fn supertype_ref_at(self: &Arc<Self>, depth: usize) -> TypeRef {
        if depth == self.hierarchy_depth() {
            self.clone()
        } else {
            self.ancestors()[depth].clone()
        }
    }

    /// Full set of interfaces this type implements, directly or through
    /// ancestors and superinterfaces. Memoized; order is deterministic.
    pub fn transitive_interfaces(&self) -> &[TypeRef] {
        self.transitive_interfaces.get_or_init(|| {
            let mut closure: Vec<TypeRef> = Vec::new();
            if let Some(sup) = self.superclass() {
                for iface in sup.transitive_interfaces() {
                    push_unique(&mut closure, iface);
                }
            }
            for iface in &self.interfaces {
                push_unique(&mut closure, iface);
                for inherited in iface.transitive_interfaces() {
                    push_unique(&mut closure, inherited);
                }
            }
            closure
        })
    }

    /// Same-as-or-supertype-of test, identical in meaning to
    /// `Class.isAssignableFrom`.
    ///
    /// Object types resolve in O(1) through the memoized supertype chain;
    /// interfaces scan the (small, memoized) transitive closure.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        debug_assert!(
            self.same_context(other),
            "type identities from different execution contexts are not comparable"
        );
        if self.is_primitive() || other.is_primitive() {
            // Primitives never widen here; identity was already checked.
            return false;
        }
        if let (TypeVariant::Array(this), TypeVariant::Array(that)) = (&self.variant, &other.variant)
        {
            return this.component.is_assignable_from(&that.component);
        }
        if self.is_interface() {
            return other
                .transitive_interfaces()
                .iter()
                .any(|iface| ptr::eq(iface.as_ref(), self));
        }
        let depth = self.hierarchy_depth();
        other.hierarchy_depth() >= depth && ptr::eq(other.supertype_at(depth), self)
    }

    /// Nearest common ancestor of two types.
    ///
    /// Unequal primitives have none (`None`, an invalid query the caller may
    /// recover from). Any two reference types in one context meet at the
    /// root; not meeting there is an upstream bug and aborts.
    pub fn closest_common_supertype(self: &Arc<Self>, other: &TypeRef) -> Option<TypeRef> {
        if self.is_primitive() || other.is_primitive() {
            return Arc::ptr_eq(self, other).then(|| self.clone());
        }
        debug_assert!(
            self.same_context(other),
            "type identities from different execution contexts are not comparable"
        );
        let mut depth = self.hierarchy_depth().min(other.hierarchy_depth());
        loop {
            if ptr::eq(self.supertype_at(depth), other.supertype_at(depth)) {
                return Some(self.supertype_ref_at(depth));
            }
            if depth == 0 {
                panic!(
                    "no common supertype for {} and {}: reference types must meet at the root",
                    self.name, other.name
                );
            }
            depth -= 1;
        }
    }

    /// The array type with `self` as component. `None` for `void`, which has
    /// no array type.
    ///
    /// Derivation is single-flight: within one context exactly one array
    /// type exists per (component, dimension) pair.
    pub fn array_class(self: &Arc<Self>) -> Option<TypeRef> {
        if self.kind == ValueKind::Void {
            return None;
        }
        let array = self
            .array_class
            .get_or_init(|| self.context().derive_array_class(self));
        Some(array.clone())
    }

    /// Array type `dims` dimensions above `self`, derived one step at a time.
    pub fn array_class_dims(self: &Arc<Self>, dims: usize) -> Option<TypeRef> {
        debug_assert!(dims > 0);
        let mut array = self.array_class()?;
        for _ in 1..dims {
            array = array.array_class()?;
        }
        Some(array)
    }

    /// The reflective handle for this type; created at most once.
    pub fn mirror(self: &Arc<Self>) -> Instance {
        self.mirror
            .get_or_init(|| {
                debug!(ty = %self.name, "creating reflective mirror");
                self.context().allocate_mirror()
            })
            .clone()
    }

    /// Package name derived from the type descriptor; cached. Arrays have no
    /// runtime package of their own.
    pub fn runtime_package(&self) -> &str {
        self.runtime_package.get_or_init(|| {
            debug_assert!(!self.is_array(), "arrays do not have a runtime package");
            javelin_descriptor::runtime_package(&self.descriptor).to_string()
        })
    }

    /// True iff both types were defined by the same loading authority and
    /// live in the same named package.
    pub fn same_runtime_package(&self, other: &Type) -> bool {
        self.loader == other.loader && self.runtime_package() == other.runtime_package()
    }

    /// Statics holder for a class type, allocated on first request.
    pub fn statics(self: &Arc<Self>) -> Option<Instance> {
        let data = self.object_data()?;
        Some(
            data.statics
                .get_or_init(|| self.context().allocate_statics(self))
                .clone(),
        )
    }

    /// Runs the initialization protocol, then hands out the statics holder.
    pub fn try_initialize_and_get_statics(self: &Arc<Self>) -> Result<Option<Instance>, GuestError> {
        self.safe_initialize()?;
        Ok(self.statics())
    }

    /// Allocates a fresh instance of this type through the context's
    /// allocation seam.
    pub fn allocate_instance(self: &Arc<Self>) -> Instance {
        self.context().allocate_instance(self)
    }

    /// Allocates an array with `self` as component type. `None` for `void`.
    pub fn allocate_array(self: &Arc<Self>, length: usize) -> Option<Instance> {
        let array = self.array_class()?;
        Some(self.context().allocate_array(&array, length))
    }
}

fn push_unique(closure: &mut Vec<TypeRef>, ty: &TypeRef) {
    if !closure.iter().any(|existing| Arc::ptr_eq(existing, ty)) {
        closure.push(ty.clone());
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("descriptor", &self.descriptor)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
