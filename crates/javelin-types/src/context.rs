use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::debug;

use javelin_descriptor::{array_descriptor, ValueKind};

use crate::error::{GuestError, LinkageKind};
use crate::init::{ClassInitializer, InitControl};
use crate::intrinsics::{
    default_canonicalizer, IntrinsicKind, IntrinsicTable, InvocationNodeRef, SignatureCanonicalizer,
};
use crate::lookup::LookupStats;
use crate::member::{access_flags, Field, FieldRef, FieldSpec, Method, MethodRef, MethodSpec};
use crate::object::{Allocator, BumpAllocator, Instance};
use crate::ty::{ArrayData, ObjectData, Type, TypeHeader, TypeRef, TypeVariant};

/// Identity of the class-loading authority that defined a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId(pub u32);

impl LoaderId {
    pub const BOOT: LoaderId = LoaderId(0);
}

/// One isolated execution context: the per-context type table, the
/// well-known root types, the guest-error factory, and the allocation seam.
///
/// Contexts are cheap cloneable handles. Types from different contexts are
/// fully isolated and must never be compared or mixed.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
    types: Mutex<HashMap<String, TypeRef>>,
    well_known: WellKnown,
    allocator: Box<dyn Allocator>,
    canonicalizer: SignatureCanonicalizer,
    intrinsics: IntrinsicTable,
    stats: LookupStats,
}

struct WellKnown {
    object: TypeRef,
    class: TypeRef,
    cloneable: TypeRef,
    serializable: TypeRef,
    throwable: TypeRef,
    exception: TypeRef,
    error: TypeRef,
    linkage_error: TypeRef,
    exception_in_initializer_error: TypeRef,
    no_class_def_found_error: TypeRef,
    verify_error: TypeRef,
    class_format_error: TypeRef,
    incompatible_class_change_error: TypeRef,
    method_handle: TypeRef,
    primitives: Vec<TypeRef>,
}

impl Context {
    pub fn new() -> Context {
        Self::build(Box::new(BumpAllocator::default()), default_canonicalizer)
    }

    pub fn with_allocator(allocator: Box<dyn Allocator>) -> Context {
        Self::build(allocator, default_canonicalizer)
    }

    /// Builds a context with a caller-supplied `LinkTo*` signature
    /// canonicalization rule.
    pub fn with_canonicalizer(canonicalizer: SignatureCanonicalizer) -> Context {
        Self::build(Box::new(BumpAllocator::default()), canonicalizer)
    }

    fn build(allocator: Box<dyn Allocator>, canonicalizer: SignatureCanonicalizer) -> Context {
        let inner = Arc::new_cyclic(|weak| {
            let mut boot = Bootstrap {
                weak,
                types: HashMap::new(),
            };

            let object = boot.class(
                "java/lang/Object",
                None,
                &[],
                vec![
                    MethodSpec::new("getClass", "()Ljava/lang/Class;", access_flags::ACC_PUBLIC | access_flags::ACC_FINAL | access_flags::ACC_NATIVE),
                    MethodSpec::new("hashCode", "()I", access_flags::ACC_PUBLIC | access_flags::ACC_NATIVE),
                    MethodSpec::new("equals", "(Ljava/lang/Object;)Z", access_flags::ACC_PUBLIC),
                    MethodSpec::new("toString", "()Ljava/lang/String;", access_flags::ACC_PUBLIC),
                ],
            );
            let class = boot.class("java/lang/Class", Some(&object), &[], vec![]);
            let cloneable = boot.interface("java/lang/Cloneable", &object, &[]);
            let serializable = boot.interface("java/io/Serializable", &object, &[]);
            let throwable = boot.class("java/lang/Throwable", Some(&object), &[&serializable], vec![]);
            let exception = boot.class("java/lang/Exception", Some(&throwable), &[], vec![]);
            let error = boot.class("java/lang/Error", Some(&throwable), &[], vec![]);
            let linkage_error = boot.class("java/lang/LinkageError", Some(&error), &[], vec![]);
            let exception_in_initializer_error = boot.class(
                "java/lang/ExceptionInInitializerError",
                Some(&linkage_error),
                &[],
                vec![],
            );
            let no_class_def_found_error =
                boot.class("java/lang/NoClassDefFoundError", Some(&linkage_error), &[], vec![]);
            let verify_error = boot.class("java/lang/VerifyError", Some(&linkage_error), &[], vec![]);
            let class_format_error =
                boot.class("java/lang/ClassFormatError", Some(&linkage_error), &[], vec![]);
            let incompatible_class_change_error = boot.class(
                "java/lang/IncompatibleClassChangeError",
                Some(&linkage_error),
                &[],
                vec![],
            );
            let method_handle = boot.class(
                "java/lang/invoke/MethodHandle",
                Some(&object),
                &[],
                anchor_method_specs(),
            );

            let primitives = ValueKind::PRIMITIVES
                .iter()
                .map(|&kind| boot.primitive(kind))
                .collect();

            ContextInner {
                types: Mutex::new(boot.types),
                well_known: WellKnown {
                    object,
                    class,
                    cloneable,
                    serializable,
                    throwable,
                    exception,
                    error,
                    linkage_error,
                    exception_in_initializer_error,
                    no_class_def_found_error,
                    verify_error,
                    class_format_error,
                    incompatible_class_change_error,
                    method_handle,
                    primitives,
                },
                allocator,
                canonicalizer,
                intrinsics: IntrinsicTable::default(),
                stats: LookupStats::default(),
            }
        });
        debug!("bootstrapped execution context");
        Context { inner }
    }

    pub(crate) fn from_inner(inner: Arc<ContextInner>) -> Context {
        Context { inner }
    }

    /// Defines a new class or interface type from already-resolved parts.
    ///
    /// This is the loading-subsystem contract: superclass and interfaces are
    /// `TypeRef`s from this context, members arrive in declaration order,
    /// and the base identity is immutable afterwards. Duplicate definitions
    /// for one descriptor fail with a guest `LinkageError`.
    pub fn define_class(&self, spec: ClassSpec) -> Result<TypeRef, GuestError> {
        let descriptor = format!("L{};", spec.name);
        let superclass = spec
            .superclass
            .clone()
            .unwrap_or_else(|| self.object_type().clone());
        debug_assert!(
            superclass.same_context(self.object_type()),
            "superclass resolved in a foreign context"
        );
        debug_assert!(
            spec.interfaces
                .iter()
                .all(|iface| iface.same_context(self.object_type())),
            "interface resolved in a foreign context"
        );

        let (fields, methods, field_table, static_field_table) =
            build_members(&spec.fields, &spec.methods);
        let ty = Arc::new(Type::from_parts(
            TypeHeader {
                name: spec.name.clone(),
                descriptor: descriptor.clone(),
                kind: ValueKind::Object,
                access_flags: spec.access_flags,
                loader: spec.loader,
                context: Arc::downgrade(&self.inner),
                superclass: Some(superclass),
                interfaces: spec.interfaces,
            },
            TypeVariant::Object(ObjectData {
                fields,
                methods,
                field_table,
                static_field_table,
                vtable: OnceCell::new(),
                statics: OnceCell::new(),
                init: InitControl::new(),
                initializer: spec.initializer,
            }),
        ));

        let mut types = self.inner.types.lock();
        if types.contains_key(&descriptor) {
            return Err(self.guest_error(
                self.linkage_error(),
                format!("attempted duplicate class definition for {}", spec.name),
            ));
        }
        types.insert(descriptor, ty.clone());
        debug!(ty = %ty.name(), "defined class");
        Ok(ty)
    }

    /// Looks up an already-registered type by its descriptor string.
    pub fn type_by_descriptor(&self, descriptor: &str) -> Option<TypeRef> {
        self.inner.types.lock().get(descriptor).cloned()
    }

    /// The primitive type for a kind. Primitives are bootstrapped with the
    /// context and unique within it.
    pub fn primitive(&self, kind: ValueKind) -> &TypeRef {
        debug_assert!(kind.is_primitive());
        self.inner
            .well_known
            .primitives
            .iter()
            .find(|ty| ty.value_kind() == kind)
            .expect("primitive kinds are bootstrapped with the context")
    }

    pub fn object_type(&self) -> &TypeRef {
        &self.inner.well_known.object
    }

    pub fn class_type(&self) -> &TypeRef {
        &self.inner.well_known.class
    }

    pub fn cloneable_type(&self) -> &TypeRef {
        &self.inner.well_known.cloneable
    }

    pub fn serializable_type(&self) -> &TypeRef {
        &self.inner.well_known.serializable
    }

    pub fn throwable_type(&self) -> &TypeRef {
        &self.inner.well_known.throwable
    }

    pub fn exception_type(&self) -> &TypeRef {
        &self.inner.well_known.exception
    }

    pub fn error_type(&self) -> &TypeRef {
        &self.inner.well_known.error
    }

    pub fn linkage_error(&self) -> &TypeRef {
        &self.inner.well_known.linkage_error
    }

    pub fn exception_in_initializer_error(&self) -> &TypeRef {
        &self.inner.well_known.exception_in_initializer_error
    }

    pub fn no_class_def_found_error(&self) -> &TypeRef {
        &self.inner.well_known.no_class_def_found_error
    }

    pub fn method_handle_type(&self) -> &TypeRef {
        &self.inner.well_known.method_handle
    }

    pub(crate) fn linkage_error_class(&self, kind: LinkageKind) -> &TypeRef {
        let wk = &self.inner.well_known;
        match kind {
            LinkageKind::Verify => &wk.verify_error,
            LinkageKind::ClassFormat => &wk.class_format_error,
            LinkageKind::IncompatibleClassChange => &wk.incompatible_class_change_error,
            LinkageKind::NoClassDefFound => &wk.no_class_def_found_error,
        }
    }

    /// Builds a guest error of `class` with a message.
    pub fn guest_error(&self, class: &TypeRef, message: impl Into<String>) -> GuestError {
        GuestError::new(class.clone(), Some(message.into()), None)
    }

    /// Builds a guest error of `class` carrying `cause`.
    pub fn guest_error_with_cause(&self, class: &TypeRef, cause: GuestError) -> GuestError {
        GuestError::new(class.clone(), None, Some(cause))
    }

    pub fn stats(&self) -> &LookupStats {
        &self.inner.stats
    }

    pub(crate) fn allocate_instance(&self, class: &TypeRef) -> Instance {
        self.inner.allocator.allocate_instance(class)
    }

    pub(crate) fn allocate_array(&self, class: &TypeRef, length: usize) -> Instance {
        self.inner.allocator.allocate_array(class, length)
    }

    pub(crate) fn allocate_mirror(&self) -> Instance {
        self.inner.allocator.allocate_instance(self.class_type())
    }

    pub(crate) fn allocate_statics(&self, class: &TypeRef) -> Instance {
        self.inner.allocator.allocate_instance(class)
    }

    /// Creates and registers the one-dimension-up array type for
    /// `component`. Callers hold the component's publish-once cell, so a
    /// given (component, dimension) pair is derived exactly once.
    pub(crate) fn derive_array_class(&self, component: &TypeRef) -> TypeRef {
        let descriptor = array_descriptor(component.descriptor(), 1)
            .expect("void is rejected before array derivation");
        let wk = &self.inner.well_known;
        let array = Arc::new(Type::from_parts(
            TypeHeader {
                name: descriptor.clone(),
                descriptor: descriptor.clone(),
                kind: ValueKind::Object,
                access_flags: (component.access_flags() & access_flags::ACC_PUBLIC)
                    | access_flags::ACC_FINAL
                    | access_flags::ACC_ABSTRACT,
                loader: component.loader(),
                context: Arc::downgrade(&self.inner),
                superclass: Some(wk.object.clone()),
                interfaces: vec![wk.cloneable.clone(), wk.serializable.clone()],
            },
            TypeVariant::Array(ArrayData {
                component: component.clone(),
            }),
        ));
        self.inner.types.lock().insert(descriptor, array.clone());
        debug!(component = %component.name(), array = %array.name(), "derived array class");
        array
    }

    pub(crate) fn resolve_intrinsic(&self, kind: IntrinsicKind, signature: &str) -> InvocationNodeRef {
        let canonical = if kind.is_link_to() {
            (self.inner.canonicalizer)(signature)
        } else {
            signature.to_string()
        };
        self.inner
            .intrinsics
            .resolve(kind, canonical, || self.anchor_method(kind))
    }

    fn anchor_method(&self, kind: IntrinsicKind) -> MethodRef {
        let method_handle = self.method_handle_type();
        let data = method_handle
            .object_data()
            .expect("MethodHandle is a class type");
        data.methods
            .iter()
            .find(|m| m.name() == kind.anchor_name())
            .cloned()
            .unwrap_or_else(|| {
                panic!(
                    "well-known anchor method {} missing from {}",
                    kind.anchor_name(),
                    method_handle.name()
                )
            })
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("types", &self.inner.types.lock().len())
            .finish_non_exhaustive()
    }
}

/// Class description handed to [`Context::define_class`].
pub struct ClassSpec {
    name: String,
    access_flags: u16,
    superclass: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    fields: Vec<FieldSpec>,
    methods: Vec<MethodSpec>,
    initializer: Option<Arc<dyn ClassInitializer>>,
    loader: LoaderId,
}

impl ClassSpec {
    /// A public class extending the root object type by default.
    pub fn new(name: impl Into<String>) -> ClassSpec {
        ClassSpec {
            name: name.into(),
            access_flags: access_flags::ACC_PUBLIC,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            initializer: None,
            loader: LoaderId::BOOT,
        }
    }

    /// A public interface.
    pub fn interface(name: impl Into<String>) -> ClassSpec {
        let mut spec = Self::new(name);
        spec.access_flags =
            access_flags::ACC_PUBLIC | access_flags::ACC_INTERFACE | access_flags::ACC_ABSTRACT;
        spec
    }

    pub fn access_flags(mut self, flags: u16) -> ClassSpec {
        self.access_flags = flags;
        self
    }

    pub fn extends(mut self, superclass: &TypeRef) -> ClassSpec {
        self.superclass = Some(superclass.clone());
        self
    }

    pub fn implements(mut self, interface: &TypeRef) -> ClassSpec {
        self.interfaces.push(interface.clone());
        self
    }

    pub fn field(mut self, field: FieldSpec) -> ClassSpec {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodSpec) -> ClassSpec {
        self.methods.push(method);
        self
    }

    pub fn initializer(mut self, initializer: impl ClassInitializer + 'static) -> ClassSpec {
        self.initializer = Some(Arc::new(initializer));
        self
    }

    pub fn loader(mut self, loader: LoaderId) -> ClassSpec {
        self.loader = loader;
        self
    }
}

fn build_members(
    fields: &[FieldSpec],
    methods: &[MethodSpec],
) -> (Vec<FieldRef>, Vec<MethodRef>, Vec<FieldRef>, Vec<FieldRef>) {
    let mut declared = Vec::with_capacity(fields.len());
    let mut field_table = Vec::new();
    let mut static_field_table = Vec::new();
    for spec in fields {
        let is_static = spec.access_flags & access_flags::ACC_STATIC != 0;
        let slot = if is_static {
            static_field_table.len()
        } else {
            field_table.len()
        };
        let field = Arc::new(Field::new(
            spec.name.clone(),
            spec.descriptor.clone(),
            spec.access_flags,
            slot,
        ));
        if is_static {
            static_field_table.push(field.clone());
        } else {
            field_table.push(field.clone());
        }
        declared.push(field);
    }
    let methods = methods
        .iter()
        .map(|spec| {
            Arc::new(Method::new(
                spec.name.clone(),
                spec.signature.clone(),
                spec.access_flags,
            ))
        })
        .collect();
    (declared, methods, field_table, static_field_table)
}

fn anchor_method_specs() -> Vec<MethodSpec> {
    const POLY: u16 = access_flags::ACC_PUBLIC
        | access_flags::ACC_FINAL
        | access_flags::ACC_NATIVE
        | access_flags::ACC_VARARGS;
    const POLY_STATIC: u16 = POLY | access_flags::ACC_STATIC;
    const SIG: &str = "([Ljava/lang/Object;)Ljava/lang/Object;";
    vec![
        MethodSpec::new("invoke", SIG, POLY),
        MethodSpec::new("invokeExact", SIG, POLY),
        MethodSpec::new("invokeBasic", SIG, POLY),
        MethodSpec::new("linkToInterface", SIG, POLY_STATIC),
        MethodSpec::new("linkToSpecial", SIG, POLY_STATIC),
        MethodSpec::new("linkToStatic", SIG, POLY_STATIC),
        MethodSpec::new("linkToVirtual", SIG, POLY_STATIC),
    ]
}

/// Bootstrap helper: builds the well-known types before the context handle
/// exists, registering each one in the nascent type table.
struct Bootstrap<'a> {
    weak: &'a Weak<ContextInner>,
    types: HashMap<String, TypeRef>,
}

impl Bootstrap<'_> {
    fn class(
        &mut self,
        name: &str,
        superclass: Option<&TypeRef>,
        interfaces: &[&TypeRef],
        methods: Vec<MethodSpec>,
    ) -> TypeRef {
        self.object_type(
            name,
            access_flags::ACC_PUBLIC,
            superclass,
            interfaces,
            methods,
        )
    }

    fn interface(&mut self, name: &str, object: &TypeRef, extends: &[&TypeRef]) -> TypeRef {
        self.object_type(
            name,
            access_flags::ACC_PUBLIC | access_flags::ACC_INTERFACE | access_flags::ACC_ABSTRACT,
            Some(object),
            extends,
            vec![],
        )
    }

    fn object_type(
        &mut self,
        name: &str,
        flags: u16,
        superclass: Option<&TypeRef>,
        interfaces: &[&TypeRef],
        methods: Vec<MethodSpec>,
    ) -> TypeRef {
        let descriptor = format!("L{name};");
        let (fields, methods, field_table, static_field_table) = build_members(&[], &methods);
        let ty = Arc::new(Type::from_parts(
            TypeHeader {
                name: name.to_string(),
                descriptor: descriptor.clone(),
                kind: ValueKind::Object,
                access_flags: flags,
                loader: LoaderId::BOOT,
                context: self.weak.clone(),
                superclass: superclass.cloned(),
                interfaces: interfaces.iter().map(|i| (*i).clone()).collect(),
            },
            TypeVariant::Object(ObjectData {
                fields,
                methods,
                field_table,
                static_field_table,
                vtable: OnceCell::new(),
                statics: OnceCell::new(),
                init: InitControl::new(),
                initializer: None,
            }),
        ));
        self.types.insert(descriptor, ty.clone());
        ty
    }

    fn primitive(&mut self, kind: ValueKind) -> TypeRef {
        let name = kind.primitive_name().expect("primitive kind");
        let descriptor = kind.descriptor_char().to_string();
        let ty = Arc::new(Type::from_parts(
            TypeHeader {
                name: name.to_string(),
                descriptor: descriptor.clone(),
                kind,
                access_flags: access_flags::ACC_PUBLIC
                    | access_flags::ACC_FINAL
                    | access_flags::ACC_ABSTRACT,
                loader: LoaderId::BOOT,
                context: self.weak.clone(),
                superclass: None,
                interfaces: Vec::new(),
            },
            TypeVariant::Primitive,
        ));
        self.types.insert(descriptor, ty.clone());
        ty
    }
}
