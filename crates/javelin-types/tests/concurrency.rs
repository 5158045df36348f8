use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use javelin_types::{
    ClassSpec, Context, InitFailure, InitState, LinkageKind, TypeRef,
};

const THREADS: usize = 8;

fn spawn_all<T: Send>(count: usize, f: impl Fn() -> T + Sync) -> Vec<T> {
    thread::scope(|scope| {
        let handles: Vec<_> = (0..count).map(|_| scope.spawn(&f)).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn racing_array_derivation_yields_one_type() {
    let ctx = Context::new();
    let class = ctx.define_class(ClassSpec::new("demo/Elem")).unwrap();

    let derived: Vec<TypeRef> =
        spawn_all(THREADS, || class.array_class().unwrap());
    for ty in &derived[1..] {
        assert!(Arc::ptr_eq(ty, &derived[0]));
    }
}

#[test]
fn racing_multi_dimensional_derivation_agrees_at_every_rank() {
    let ctx = Context::new();
    let class = ctx.define_class(ClassSpec::new("demo/Deep")).unwrap();

    let derived: Vec<TypeRef> =
        spawn_all(THREADS, || class.array_class_dims(3).unwrap());

    // All threads got the same rank-3 type, and walking the component chain
    // down to the element meets the same intermediate types everywhere.
    for ty in &derived[1..] {
        assert!(Arc::ptr_eq(ty, &derived[0]));
    }
    let mut current = derived[0].clone();
    for _ in 0..3 {
        current = current.component().unwrap().clone();
    }
    assert!(Arc::ptr_eq(&current, &class));
    let rank_two = ctx.type_by_descriptor("[[Ldemo/Deep;").unwrap();
    assert!(Arc::ptr_eq(
        derived[0].component().unwrap(),
        &rank_two
    ));
}

#[test]
fn racing_mirror_requests_yield_one_instance() {
    let ctx = Context::new();
    let class = ctx.define_class(ClassSpec::new("demo/Mirrored")).unwrap();

    let mirrors = spawn_all(THREADS, || class.mirror());
    for mirror in &mirrors[1..] {
        assert!(mirror.same_as(&mirrors[0]));
    }
}

#[test]
fn racing_intrinsic_resolution_yields_one_node() {
    let ctx = Context::new();
    let mh = ctx.method_handle_type();
    let sig = "(Ldemo/Recv;I)Ljava/lang/Object;";

    let nodes = spawn_all(THREADS, || {
        mh.lookup_polysig_method("linkToVirtual", sig).unwrap()
    });
    for node in &nodes[1..] {
        assert!(Arc::ptr_eq(node, &nodes[0]));
    }
}

#[test]
fn racing_initialization_runs_the_hook_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let ctx = Context::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let class = ctx
        .define_class(ClassSpec::new("demo/Race").initializer(move |_: &TypeRef| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

    spawn_all(THREADS, || {
        class.safe_initialize().unwrap();
    });
    assert!(class.is_initialized());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

/// A gate the initializer hook blocks on until the test opens it.
fn gated(release: &Arc<(Mutex<bool>, Condvar)>) {
    let (lock, cvar) = &**release;
    let mut open = lock.lock();
    while !*open {
        cvar.wait(&mut open);
    }
}

fn open_gate(release: &Arc<(Mutex<bool>, Condvar)>) {
    let (lock, cvar) = &**release;
    *lock.lock() = true;
    cvar.notify_all();
}

#[test]
fn concurrent_caller_waits_for_a_successful_run() {
    let ctx = Context::new();
    let release = Arc::new((Mutex::new(false), Condvar::new()));
    let gate = release.clone();
    let class = ctx
        .define_class(ClassSpec::new("demo/Slow").initializer(move |_: &TypeRef| {
            gated(&gate);
            Ok(())
        }))
        .unwrap();

    thread::scope(|scope| {
        let first = scope.spawn(|| class.safe_initialize());
        while class.initialization_state() != InitState::Initializing {
            thread::yield_now();
        }
        let second = scope.spawn(|| class.safe_initialize());

        // The second caller must not report success while the run is still
        // in flight.
        thread::sleep(Duration::from_millis(50));
        assert!(!second.is_finished());
        assert_eq!(class.initialization_state(), InitState::Initializing);

        open_gate(&release);
        first.join().unwrap().unwrap();
        second.join().unwrap().unwrap();
    });
    assert!(class.is_initialized());
}

#[test]
fn concurrent_caller_observes_a_failed_run() {
    let ctx = Context::new();
    let release = Arc::new((Mutex::new(false), Condvar::new()));
    let gate = release.clone();
    let class = ctx
        .define_class(ClassSpec::new("demo/SlowBroken").initializer(move |_: &TypeRef| {
            gated(&gate);
            Err(InitFailure::Linkage {
                kind: LinkageKind::Verify,
                message: "bad stack map".to_string(),
            })
        }))
        .unwrap();

    thread::scope(|scope| {
        let first = scope.spawn(|| class.safe_initialize());
        while class.initialization_state() != InitState::Initializing {
            thread::yield_now();
        }
        let second = scope.spawn(|| class.safe_initialize());
        thread::sleep(Duration::from_millis(50));
        assert!(!second.is_finished());

        open_gate(&release);
        let first_err = first.join().unwrap().unwrap_err();
        assert_eq!(first_err.class().descriptor(), "Ljava/lang/VerifyError;");
        // The waiter wakes to the published failure, never to a mid-flight Ok.
        let second_err = second.join().unwrap().unwrap_err();
        assert!(Arc::ptr_eq(second_err.class(), ctx.no_class_def_found_error()));
    });
    assert_eq!(class.initialization_state(), InitState::Erroneous);
}
