use std::error::Error as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use javelin_types::{ClassSpec, Context, InitFailure, InitState, LinkageKind, TypeRef};

#[test]
fn primitives_and_arrays_need_no_initialization() {
    let ctx = Context::new();
    let int = ctx.primitive(javelin_types::ValueKind::Int);
    assert_eq!(int.initialization_state(), InitState::Initialized);
    assert!(int.safe_initialize().is_ok());

    let object_array = ctx.object_type().array_class().unwrap();
    assert_eq!(object_array.initialization_state(), InitState::Initialized);
    assert!(object_array.safe_initialize().is_ok());
}

#[test]
fn initializer_runs_exactly_once() {
    let ctx = Context::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let class = ctx
        .define_class(ClassSpec::new("demo/Settled").initializer(move |_: &TypeRef| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

    assert_eq!(class.initialization_state(), InitState::Uninitialized);
    class.safe_initialize().unwrap();
    class.safe_initialize().unwrap();
    assert_eq!(class.initialization_state(), InitState::Initialized);
    assert!(class.is_initialized());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn superclass_initializes_before_subclass() {
    let ctx = Context::new();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let trace = order.clone();
    let parent = ctx
        .define_class(ClassSpec::new("demo/Parent").initializer(move |_: &TypeRef| {
            trace.lock().push("parent");
            Ok(())
        }))
        .unwrap();
    let trace = order.clone();
    let child = ctx
        .define_class(
            ClassSpec::new("demo/Child")
                .extends(&parent)
                .initializer(move |_: &TypeRef| {
                    trace.lock().push("child");
                    Ok(())
                }),
        )
        .unwrap();

    child.safe_initialize().unwrap();
    assert_eq!(*order.lock(), vec!["parent", "child"]);
    assert!(parent.is_initialized());
}

#[test]
fn guest_exception_is_wrapped_with_cause_and_retried() {
    let ctx = Context::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let raising = ctx.clone();
    let class = ctx
        .define_class(ClassSpec::new("demo/Flaky").initializer(move |_: &TypeRef| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(InitFailure::GuestException(
                raising.guest_error(raising.exception_type(), "boot failed"),
            ))
        }))
        .unwrap();

    let err = class.safe_initialize().unwrap_err();
    assert!(Arc::ptr_eq(err.class(), ctx.exception_in_initializer_error()));
    let cause = err.cause().unwrap();
    assert!(Arc::ptr_eq(cause.class(), ctx.exception_type()));
    assert_eq!(cause.message(), Some("boot failed"));
    assert_eq!(err.source().unwrap().to_string(), cause.to_string());

    // The failed attempt does not poison the type: the next request runs
    // the whole sequence again.
    assert_eq!(class.initialization_state(), InitState::Uninitialized);
    class.safe_initialize().unwrap_err();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn error_side_throwables_propagate_unwrapped() {
    let ctx = Context::new();
    let raising = ctx.clone();
    let class = ctx
        .define_class(ClassSpec::new("demo/Doomed").initializer(move |_: &TypeRef| {
            Err(InitFailure::GuestException(
                raising.guest_error(raising.error_type(), "out of metaspace"),
            ))
        }))
        .unwrap();

    let err = class.safe_initialize().unwrap_err();
    assert!(Arc::ptr_eq(err.class(), ctx.error_type()));
    assert_eq!(err.message(), Some("out of metaspace"));
    assert!(err.cause().is_none());
}

#[test]
fn linkage_failure_marks_the_type_erroneous_for_good() {
    let ctx = Context::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let class = ctx
        .define_class(ClassSpec::new("demo/Broken").initializer(move |_: &TypeRef| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(InitFailure::Linkage {
                kind: LinkageKind::Verify,
                message: "bad stack map".to_string(),
            })
        }))
        .unwrap();

    let err = class.safe_initialize().unwrap_err();
    assert_eq!(err.class().descriptor(), "Ljava/lang/VerifyError;");
    assert_eq!(err.message(), Some("bad stack map"));
    assert_eq!(class.initialization_state(), InitState::Erroneous);

    // Later attempts re-signal without re-running the initializer.
    let again = class.safe_initialize().unwrap_err();
    assert!(Arc::ptr_eq(again.class(), ctx.no_class_def_found_error()));
    assert_eq!(again.message(), Some("Could not initialize class demo/Broken"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn superclass_failure_fails_the_subclass() {
    let ctx = Context::new();
    let parent = ctx
        .define_class(ClassSpec::new("demo/BadParent").initializer(|_: &TypeRef| {
            Err(InitFailure::Linkage {
                kind: LinkageKind::IncompatibleClassChange,
                message: "layout changed".to_string(),
            })
        }))
        .unwrap();
    let child = ctx
        .define_class(ClassSpec::new("demo/Heir").extends(&parent))
        .unwrap();

    let err = child.safe_initialize().unwrap_err();
    assert_eq!(
        err.class().descriptor(),
        "Ljava/lang/IncompatibleClassChangeError;"
    );
    assert_eq!(parent.initialization_state(), InitState::Erroneous);
    // The subclass itself is not poisoned; it fails again on the parent.
    assert_eq!(child.initialization_state(), InitState::Uninitialized);
    let again = child.safe_initialize().unwrap_err();
    assert!(Arc::ptr_eq(again.class(), ctx.no_class_def_found_error()));
}

#[test]
fn recursive_reference_during_initialization_is_allowed() {
    let ctx = Context::new();
    let observed = Arc::new(Mutex::new(None));
    let seen = observed.clone();
    let class = ctx
        .define_class(ClassSpec::new("demo/SelfRef").initializer(
            move |class: &TypeRef| {
                *seen.lock() = Some(class.initialization_state());
                // A re-entrant request must observe the in-flight run and
                // return without deadlocking.
                class.safe_initialize().map_err(InitFailure::GuestException)
            },
        ))
        .unwrap();

    class.safe_initialize().unwrap();
    assert_eq!(*observed.lock(), Some(InitState::Initializing));
    assert!(class.is_initialized());
}

#[test]
fn statics_holder_is_created_once_and_gated_on_initialization() {
    let ctx = Context::new();
    let class = ctx.define_class(ClassSpec::new("demo/Holder")).unwrap();
    let statics = class.try_initialize_and_get_statics().unwrap().unwrap();
    assert!(statics.same_as(&class.statics().unwrap()));
    assert!(class.is_initialized());

    // Arrays have no statics holder.
    let array = class.array_class().unwrap();
    assert!(array.statics().is_none());

    let broken = ctx
        .define_class(ClassSpec::new("demo/NoStatics").initializer(|_: &TypeRef| {
            Err(InitFailure::Linkage {
                kind: LinkageKind::ClassFormat,
                message: "truncated class file".to_string(),
            })
        }))
        .unwrap();
    assert!(broken.try_initialize_and_get_statics().is_err());
}
