use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::ty::TypeRef;

/// Opaque handle to an allocated guest object.
///
/// The engine hands these out for mirrors, statics holders, and explicit
/// allocation requests; it attaches no heap semantics beyond the owning
/// class and a stable identity.
#[derive(Debug, Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

#[derive(Debug)]
struct InstanceInner {
    class: TypeRef,
    id: u64,
    array_length: Option<usize>,
}

impl Instance {
    pub fn class(&self) -> &TypeRef {
        &self.inner.class
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn array_length(&self) -> Option<usize> {
        self.inner.array_length
    }

    /// Handle identity: two clones of the same allocation compare equal.
    pub fn same_as(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Allocation seam: the engine requests fresh instance handles and leaves
/// placement, layout, and collection to the embedder.
pub trait Allocator: Send + Sync {
    fn allocate_instance(&self, class: &TypeRef) -> Instance;

    fn allocate_array(&self, class: &TypeRef, length: usize) -> Instance;
}

/// Default allocator: hands out handles with monotonically increasing ids.
#[derive(Debug, Default)]
pub struct BumpAllocator {
    next_id: AtomicU64,
}

impl BumpAllocator {
    fn fresh(&self, class: &TypeRef, array_length: Option<usize>) -> Instance {
        Instance {
            inner: Arc::new(InstanceInner {
                class: class.clone(),
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                array_length,
            }),
        }
    }
}

impl Allocator for BumpAllocator {
    fn allocate_instance(&self, class: &TypeRef) -> Instance {
        self.fresh(class, None)
    }

    fn allocate_array(&self, class: &TypeRef, length: usize) -> Instance {
        self.fresh(class, Some(length))
    }
}
