use std::sync::Arc;

use pretty_assertions::assert_eq;

use javelin_types::{access_flags, ClassSpec, Context, IntrinsicKind, MethodSpec};

#[test]
fn invoke_and_invoke_exact_share_a_node() {
    let ctx = Context::new();
    let mh = ctx.method_handle_type();
    let sig = "(Ljava/lang/String;I)Ljava/lang/Object;";

    let invoke = mh.lookup_polysig_method("invoke", sig).unwrap();
    let exact = mh.lookup_polysig_method("invokeExact", sig).unwrap();
    assert!(Arc::ptr_eq(&invoke, &exact));
    assert_eq!(invoke.kind(), IntrinsicKind::InvokeGeneric);
    // Generic invocation keeps the call-site signature verbatim.
    assert_eq!(invoke.signature(), sig);
    assert_eq!(invoke.anchor().name(), "invoke");
    assert_eq!(
        invoke.anchor().signature(),
        "([Ljava/lang/Object;)Ljava/lang/Object;"
    );
}

#[test]
fn distinct_signatures_get_distinct_nodes() {
    let ctx = Context::new();
    let mh = ctx.method_handle_type();
    let a = mh.lookup_polysig_method("invokeBasic", "(I)I").unwrap();
    let b = mh.lookup_polysig_method("invokeBasic", "(J)J").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a.kind(), IntrinsicKind::InvokeBasic);
    assert_eq!(b.kind(), IntrinsicKind::InvokeBasic);
}

#[test]
fn link_to_signatures_are_canonicalized_before_memoization() {
    let ctx = Context::new();
    let mh = ctx.method_handle_type();

    // Reference and array parameters erase to Object, sub-int widths to int,
    // so these call sites resolve to one node.
    let a = mh
        .lookup_polysig_method("linkToStatic", "(Ljava/lang/String;Z[Ldemo/Row;)V")
        .unwrap();
    let b = mh
        .lookup_polysig_method("linkToStatic", "(Ldemo/Other;S[[I)V")
        .unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.kind(), IntrinsicKind::LinkToStatic);
    assert_eq!(
        a.signature(),
        "(Ljava/lang/Object;ILjava/lang/Object;)V"
    );
    assert_eq!(a.anchor().name(), "linkToStatic");

    // Wide primitives keep their width through erasure.
    let wide = mh
        .lookup_polysig_method("linkToVirtual", "(Ldemo/Recv;JD)J")
        .unwrap();
    assert_eq!(wide.signature(), "(Ljava/lang/Object;JD)J");

    // Same erased signature, different kind: different node.
    let special = mh
        .lookup_polysig_method("linkToSpecial", "(Ldemo/Other;S[[I)V")
        .unwrap();
    assert!(!Arc::ptr_eq(&a, &special));
}

#[test]
fn non_intrinsic_names_resolve_to_nothing() {
    let ctx = Context::new();
    assert!(ctx
        .method_handle_type()
        .lookup_polysig_method("toString", "()Ljava/lang/String;")
        .is_none());

    let plain = ctx.define_class(ClassSpec::new("demo/Plain")).unwrap();
    assert!(plain
        .lookup_polysig_method("frobnicate", "()V")
        .is_none());
}

#[test]
#[should_panic(expected = "unimplemented method handle invoke form")]
fn unknown_native_varargs_form_aborts() {
    let ctx = Context::new();
    let handle = ctx
        .define_class(
            ClassSpec::new("demo/ExoticHandle").method(MethodSpec::new(
                "invokeExotic",
                "([Ljava/lang/Object;)Ljava/lang/Object;",
                access_flags::ACC_PUBLIC
                    | access_flags::ACC_NATIVE
                    | access_flags::ACC_VARARGS,
            )),
        )
        .unwrap();
    let _ = handle.lookup_polysig_method("invokeExotic", "(I)V");
}
