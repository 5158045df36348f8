use std::sync::atomic::{AtomicU64, Ordering};

use crate::member::{FieldRef, MethodRef};
use crate::ty::Type;

/// Running totals of symbolic lookups answered through a context.
#[derive(Debug, Default)]
pub struct LookupStats {
    declared_field_lookups: AtomicU64,
    field_lookups: AtomicU64,
    declared_method_lookups: AtomicU64,
    method_lookups: AtomicU64,
}

impl LookupStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn declared_field_lookups(&self) -> u64 {
        self.declared_field_lookups.load(Ordering::Relaxed)
    }

    pub fn field_lookups(&self) -> u64 {
        self.field_lookups.load(Ordering::Relaxed)
    }

    pub fn declared_method_lookups(&self) -> u64 {
        self.declared_method_lookups.load(Ordering::Relaxed)
    }

    pub fn method_lookups(&self) -> u64 {
        self.method_lookups.load(Ordering::Relaxed)
    }
}

impl Type {
    /// Field declared directly on this type, matched by exact
    /// name+descriptor. A miss is `None`, never an error.
    pub fn lookup_declared_field(&self, name: &str, descriptor: &str) -> Option<FieldRef> {
        LookupStats::bump(&self.context().stats().declared_field_lookups);
        self.declared_field(name, descriptor)
    }

    // Declared member scans are linear; declared lists are small and the
    // found/None contract is what matters here.
    fn declared_field(&self, name: &str, descriptor: &str) -> Option<FieldRef> {
        let data = self.object_data()?;
        data.fields
            .iter()
            .find(|field| field.name() == name && field.descriptor() == descriptor)
            .cloned()
    }

    /// Field declared on this type or inherited through the superclass
    /// chain; terminates at the root with `None`.
    pub fn lookup_field(&self, name: &str, descriptor: &str) -> Option<FieldRef> {
        LookupStats::bump(&self.context().stats().field_lookups);
        let mut current = Some(self);
        while let Some(ty) = current {
            if let Some(field) = ty.declared_field(name, descriptor) {
                return Some(field);
            }
            current = ty.superclass().map(|sup| sup.as_ref());
        }
        None
    }

    /// Method declared directly on this type, matched by exact
    /// name+signature.
    pub fn lookup_declared_method(&self, name: &str, signature: &str) -> Option<MethodRef> {
        LookupStats::bump(&self.context().stats().declared_method_lookups);
        self.declared_method(name, signature)
    }

    fn declared_method(&self, name: &str, signature: &str) -> Option<MethodRef> {
        let data = self.object_data()?;
        data.methods
            .iter()
            .find(|method| method.name() == name && method.signature() == signature)
            .cloned()
    }

    /// Method resolution: declared, then the superclass chain, then the
    /// transitive interface closure.
    pub fn lookup_method(&self, name: &str, signature: &str) -> Option<MethodRef> {
        LookupStats::bump(&self.context().stats().method_lookups);
        let mut current = Some(self);
        while let Some(ty) = current {
            if let Some(method) = ty.declared_method(name, signature) {
                return Some(method);
            }
            current = ty.superclass().map(|sup| sup.as_ref());
        }
        for iface in self.transitive_interfaces() {
            if let Some(method) = iface.declared_method(name, signature) {
                return Some(method);
            }
        }
        None
    }

    /// Fixed-slot virtual dispatch into the table published by the linking
    /// subsystem. O(1); `None` when the slot is out of range or no table has
    /// been published yet.
    pub fn vtable_lookup(&self, index: usize) -> Option<MethodRef> {
        let data = self.object_data()?;
        data.vtable.get().and_then(|table| table.get(index).cloned())
    }

    /// Installs the dispatch table built by the linking subsystem. Published
    /// exactly once.
    pub fn publish_vtable(&self, table: Vec<MethodRef>) {
        let Some(data) = self.object_data() else {
            panic!("vtable published for non-class type {}", self.name());
        };
        if data.vtable.set(table).is_err() {
            panic!("vtable already published for {}", self.name());
        }
    }

    /// Instance field at a fixed slot, in declaration order.
    pub fn field_table_lookup(&self, slot: usize) -> Option<FieldRef> {
        self.object_data()?.field_table.get(slot).cloned()
    }

    /// Static field at a fixed slot, in declaration order.
    pub fn static_field_table_lookup(&self, slot: usize) -> Option<FieldRef> {
        self.object_data()?.static_field_table.get(slot).cloned()
    }

    /// The `<clinit>` method, if this type declares one.
    pub fn class_initializer(&self) -> Option<MethodRef> {
        self.declared_method("<clinit>", "()V")
    }
}
