use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::member::MethodRef;
use crate::ty::Type;

/// The closed set of polymorphic-signature (method-handle) intrinsics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
    InvokeGeneric,
    InvokeBasic,
    LinkToInterface,
    LinkToSpecial,
    LinkToStatic,
    LinkToVirtual,
}

impl IntrinsicKind {
    /// Maps a symbolic method name to its intrinsic kind.
    pub fn of_method_name(name: &str) -> Option<IntrinsicKind> {
        Some(match name {
            "invoke" | "invokeExact" => IntrinsicKind::InvokeGeneric,
            "invokeBasic" => IntrinsicKind::InvokeBasic,
            "linkToInterface" => IntrinsicKind::LinkToInterface,
            "linkToSpecial" => IntrinsicKind::LinkToSpecial,
            "linkToStatic" => IntrinsicKind::LinkToStatic,
            "linkToVirtual" => IntrinsicKind::LinkToVirtual,
            _ => return None,
        })
    }

    /// Name of the well-known anchor method this kind resolves against.
    pub fn anchor_name(self) -> &'static str {
        match self {
            IntrinsicKind::InvokeGeneric => "invoke",
            IntrinsicKind::InvokeBasic => "invokeBasic",
            IntrinsicKind::LinkToInterface => "linkToInterface",
            IntrinsicKind::LinkToSpecial => "linkToSpecial",
            IntrinsicKind::LinkToStatic => "linkToStatic",
            IntrinsicKind::LinkToVirtual => "linkToVirtual",
        }
    }

    /// `LinkTo*` kinds canonicalize their signature before resolution.
    pub fn is_link_to(self) -> bool {
        matches!(
            self,
            IntrinsicKind::LinkToInterface
                | IntrinsicKind::LinkToSpecial
                | IntrinsicKind::LinkToStatic
                | IntrinsicKind::LinkToVirtual
        )
    }
}

/// Executable call-site node produced by intrinsic resolution.
///
/// Opaque to this engine; the interpreter consumes it. Exactly one node
/// exists per (kind, canonical signature) within a context.
#[derive(Debug)]
pub struct InvocationNode {
    kind: IntrinsicKind,
    anchor: MethodRef,
    signature: String,
}

pub type InvocationNodeRef = Arc<InvocationNode>;

impl InvocationNode {
    pub fn kind(&self) -> IntrinsicKind {
        self.kind
    }

    /// The well-known polymorphic method this node was resolved against.
    pub fn anchor(&self) -> &MethodRef {
        &self.anchor
    }

    /// The canonical signature this node is specialized for.
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

/// Pluggable signature canonicalization applied before `LinkTo*` resolution.
pub type SignatureCanonicalizer = fn(&str) -> String;

/// Default canonicalization: basic-form erasure of the full signature.
pub(crate) fn default_canonicalizer(signature: &str) -> String {
    javelin_descriptor::erase_to_basic(signature, true)
        .unwrap_or_else(|err| panic!("malformed polymorphic signature {signature}: {err}"))
}

#[derive(Default)]
pub(crate) struct IntrinsicTable {
    nodes: Mutex<HashMap<(IntrinsicKind, String), InvocationNodeRef>>,
}

impl IntrinsicTable {
    /// Single-flight node lookup: the first resolver for a (kind, signature)
    /// pair materializes the node under the table lock, later callers get
    /// the same handle.
    pub(crate) fn resolve(
        &self,
        kind: IntrinsicKind,
        signature: String,
        anchor: impl FnOnce() -> MethodRef,
    ) -> InvocationNodeRef {
        let mut nodes = self.nodes.lock();
        nodes
            .entry((kind, signature))
            .or_insert_with_key(|(kind, signature)| {
                debug!(?kind, %signature, "materializing invocation node");
                Arc::new(InvocationNode {
                    kind: *kind,
                    anchor: anchor(),
                    signature: signature.clone(),
                })
            })
            .clone()
    }
}

impl Type {
    /// Resolves a polymorphic-signature call site named against this type.
    ///
    /// Returns `None` for names that are not method-handle intrinsics. A
    /// declared native variable-arity method whose name reaches this
    /// resolver without being a known intrinsic is an unimplemented
    /// method-handle form and aborts.
    pub fn lookup_polysig_method(&self, name: &str, signature: &str) -> Option<InvocationNodeRef> {
        match IntrinsicKind::of_method_name(name) {
            Some(kind) => Some(self.context().resolve_intrinsic(kind, signature)),
            None => {
                if let Some(data) = self.object_data() {
                    let unknown_form = data
                        .methods
                        .iter()
                        .any(|m| m.is_native() && m.is_varargs() && m.name() == name);
                    if unknown_form {
                        panic!("unimplemented method handle invoke form: {name}{signature}");
                    }
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_name_mapping() {
        assert_eq!(
            IntrinsicKind::of_method_name("invokeExact"),
            Some(IntrinsicKind::InvokeGeneric)
        );
        assert_eq!(
            IntrinsicKind::of_method_name("linkToStatic"),
            Some(IntrinsicKind::LinkToStatic)
        );
        assert_eq!(IntrinsicKind::of_method_name("toString"), None);
    }

    #[test]
    fn link_to_kinds() {
        assert!(IntrinsicKind::LinkToVirtual.is_link_to());
        assert!(!IntrinsicKind::InvokeGeneric.is_link_to());
        assert!(!IntrinsicKind::InvokeBasic.is_link_to());
    }
}
